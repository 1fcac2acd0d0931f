pub mod helpers;
pub mod test_world;

pub use helpers::*;
pub use test_protocol::protocol;
pub use test_schema::{FieldWrite, TestInvocation, TestValue};
pub use test_world::{ExecutedRpc, LocalValue, TestObject, TestWorld};
