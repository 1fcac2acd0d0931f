pub mod reference_registry;
pub mod rpc_queue;
pub mod update_resolver;
