pub mod actor_creator;
pub mod container_gate;
pub mod deferred_constructor;
