
pub use entity_builder::{field_update, TestEntityBuilder};
pub use rpc_builder::{command_request, invocation, multicast};
pub use test_receiver::TestReceiver;
