pub mod object_references;
pub mod rpc;
pub mod spawn_data;
pub mod world_type;
