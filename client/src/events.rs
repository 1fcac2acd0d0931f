use std::time::Duration;

use fabric_shared::{Authority, ComponentId, EntityId, ObjectHandle, RequestId};

use crate::{correlation::pending_requests::ReliableRpcParams, world::actor_channel::ChannelObjectPair};

/// Something the embedding engine should observe or act on, in the order the
/// receiver produced it.
#[derive(Debug)]
pub enum ReceiverEvent {
    /// A local object was built for a remote entity.
    EntityConstructed {
        entity_id: EntityId,
        object: ObjectHandle,
    },
    /// A constructed entity was torn down.
    EntityRemoved(EntityId),
    AuthorityChanged {
        entity_id: EntityId,
        component_id: ComponentId,
        authority: Authority,
    },
    /// The object of this pair no longer waits on any reference.
    ReferencesResolved(ChannelObjectPair),
    /// A command request was handled and must be acknowledged.
    SendCommandResponse {
        request_id: RequestId,
        entity_id: EntityId,
        component_id: ComponentId,
    },
    /// A reliable command failed and should be sent again after `delay`.
    RetryReliableRpc {
        params: ReliableRpcParams,
        delay: Duration,
    },
}
