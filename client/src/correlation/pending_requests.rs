use std::collections::HashSet;

use log::debug;

use fabric_shared::{
    CommandIndex, ComponentId, CreateEntityResult, EntityId, EntityQueryResult, ObjectHandle,
    ReserveEntityIdsResult, RpcInvocation,
};

use crate::correlation::correlation_table::{Continuation, CorrelationTable};

/// A continuation, optionally owned by a local object. When the owner is
/// destroyed the response is no longer wanted.
#[derive(Debug)]
pub struct PendingResponse<R> {
    pub owner: Option<ObjectHandle>,
    pub continuation: Continuation<R>,
}

impl<R> PendingResponse<R> {
    pub fn new(owner: Option<ObjectHandle>, continuation: Continuation<R>) -> Self {
        Self {
            owner,
            continuation,
        }
    }

    fn is_owned_by(&self, objects: &HashSet<ObjectHandle>) -> bool {
        self.owner
            .map(|owner| objects.contains(&owner))
            .unwrap_or(false)
    }
}

pub type PendingConstruction = PendingResponse<CreateEntityResult>;
pub type PendingReservation = PendingResponse<ReserveEntityIdsResult>;
pub type PendingQuery = PendingResponse<EntityQueryResult>;

/// Everything needed to send a reliable command again.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReliableRpcParams {
    pub target: ObjectHandle,
    pub entity_id: EntityId,
    pub component_id: ComponentId,
    pub command_index: CommandIndex,
    pub invocation: RpcInvocation,
    /// How many times the command has been sent so far.
    pub attempts: u32,
}

impl ReliableRpcParams {
    pub fn new(
        target: ObjectHandle,
        entity_id: EntityId,
        component_id: ComponentId,
        command_index: CommandIndex,
        invocation: RpcInvocation,
    ) -> Self {
        Self {
            target,
            entity_id,
            component_id,
            command_index,
            invocation,
            attempts: 1,
        }
    }
}

/// The four correlation domains the receiver answers.
pub struct PendingRequests {
    pub constructions: CorrelationTable<PendingConstruction>,
    pub reservations: CorrelationTable<PendingReservation>,
    pub queries: CorrelationTable<PendingQuery>,
    pub reliable_rpcs: CorrelationTable<ReliableRpcParams>,
}

impl Default for PendingRequests {
    fn default() -> Self {
        Self::new()
    }
}

impl PendingRequests {
    pub fn new() -> Self {
        Self {
            constructions: CorrelationTable::new("entity creation"),
            reservations: CorrelationTable::new("entity id reservation"),
            queries: CorrelationTable::new("entity query"),
            reliable_rpcs: CorrelationTable::new("reliable command"),
        }
    }

    /// Drops every request owned by one of `objects`.
    pub fn drop_owned_by(&mut self, objects: &HashSet<ObjectHandle>) -> usize {
        if objects.is_empty() {
            return 0;
        }

        let dropped = self
            .constructions
            .drop_where(|pending| pending.is_owned_by(objects))
            + self
                .reservations
                .drop_where(|pending| pending.is_owned_by(objects))
            + self
                .queries
                .drop_where(|pending| pending.is_owned_by(objects))
            + self
                .reliable_rpcs
                .drop_where(|params| objects.contains(&params.target));

        if dropped > 0 {
            debug!("Dropped {} pending requests of destroyed objects", dropped);
        }
        dropped
    }

    pub fn len(&self) -> usize {
        self.constructions.len()
            + self.reservations.len()
            + self.queries.len()
            + self.reliable_rpcs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
