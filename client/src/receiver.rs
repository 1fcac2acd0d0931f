use std::collections::HashSet;

use log::{debug, error, info, warn};

use fabric_shared::{
    Authority, CommandRequest, CommandResponseResult, ComponentBinding, ComponentData,
    ComponentId, ComponentRole, ComponentUpdate, ConstructionError, ContainerId,
    CreateEntityResult, EntityId, EntityQueryResult, ObjectHandle, ObjectRef, ObjectRefResolver,
    ObjectWorld, Protocol, ReadRpc, RequestId, ReserveEntityIdsResult, WorkerOp,
};

use crate::{
    construct::{
        actor_creator::ActorCreator,
        deferred_constructor::{ConstructionState, DeferredConstructionRecord, DeferredConstructor},
    },
    correlation::{
        correlation_table::Continuation,
        pending_requests::{PendingRequests, PendingResponse, ReliableRpcParams},
    },
    critical_section::{CriticalSectionBatch, CriticalSectionBatcher},
    error::{CorrelationError, ReceiverError},
    events::ReceiverEvent,
    receiver_config::ReceiverConfig,
    resolve::{
        reference_registry::ReferenceRegistry,
        rpc_queue::{PendingIncomingRpc, RpcQueue},
        update_resolver::UpdateResolver,
    },
    world::{
        actor_channel::{ActorChannel, ChannelMap, ChannelObjectPair},
        object_ref_map::ObjectRefMap,
    },
};

/// Receives the operation stream of the worker fabric and reconstructs it
/// into an [`ObjectWorld`].
///
/// All handlers run to completion on the caller's thread. Anything that
/// cannot be applied yet is parked and resumed by a later operation, a
/// container load, or a resolution.
pub struct Receiver {
    config: ReceiverConfig,
    protocol: Protocol,
    batcher: CriticalSectionBatcher,
    constructor: DeferredConstructor,
    channels: ChannelMap,
    object_refs: ObjectRefMap,
    update_resolver: UpdateResolver,
    rpc_queue: RpcQueue,
    pending_requests: PendingRequests,
    events: Vec<ReceiverEvent>,
}

impl Receiver {
    pub fn new(config: ReceiverConfig, mut protocol: Protocol) -> Self {
        if !protocol.is_locked() {
            protocol.lock();
        }

        Self {
            config,
            protocol,
            batcher: CriticalSectionBatcher::new(),
            constructor: DeferredConstructor::new(),
            channels: ChannelMap::new(),
            object_refs: ObjectRefMap::new(),
            update_resolver: UpdateResolver::new(),
            rpc_queue: RpcQueue::new(),
            pending_requests: PendingRequests::new(),
            events: Vec::new(),
        }
    }

    /// Routes one delivered operation to its handler.
    pub fn process_op<W: ObjectWorld>(&mut self, world: &mut W, op: WorkerOp) {
        match op {
            WorkerOp::CriticalSection(in_section) => self.on_critical_section(world, in_section),
            WorkerOp::AddEntity(entity_id) => self.on_add_entity(world, entity_id),
            WorkerOp::RemoveEntity(entity_id) => self.on_remove_entity(world, entity_id),
            WorkerOp::AddComponent(entity_id, data) => self.on_add_component(world, entity_id, data),
            WorkerOp::AuthorityChange(entity_id, component_id, authority) => {
                self.on_authority_change(world, entity_id, component_id, authority)
            }
            WorkerOp::ComponentUpdate(entity_id, update) => {
                self.on_component_update(world, entity_id, update)
            }
            WorkerOp::CommandRequest {
                request_id,
                entity_id,
                request,
            } => self.on_command_request(world, request_id, entity_id, request),
            WorkerOp::CommandResponse { request_id, result } => {
                self.on_command_response(world, request_id, result)
            }
            WorkerOp::ReserveEntityIdsResponse { request_id, result } => {
                self.on_reserve_entity_ids_response(world, request_id, result)
            }
            WorkerOp::CreateEntityResponse { request_id, result } => {
                self.on_create_entity_response(world, request_id, result)
            }
            WorkerOp::EntityQueryResponse { request_id, result } => {
                self.on_entity_query_response(world, request_id, result)
            }
        }
    }

    // Critical sections

    pub fn on_critical_section<W: ObjectWorld>(&mut self, world: &mut W, in_section: bool) {
        if in_section {
            self.batcher.enter();
        } else if let Some(batch) = self.batcher.leave() {
            self.drain(world, batch);
        }
    }

    pub fn on_add_entity<W: ObjectWorld>(&mut self, world: &mut W, entity_id: EntityId) {
        if self.batcher.in_critical_section() {
            self.batcher.buffer_add_entity(entity_id);
            return;
        }
        let batch = CriticalSectionBatch {
            added_entities: vec![entity_id],
            ..Default::default()
        };
        self.drain(world, batch);
    }

    pub fn on_remove_entity<W: ObjectWorld>(&mut self, world: &mut W, entity_id: EntityId) {
        if self.batcher.in_critical_section() {
            self.batcher.buffer_remove_entity(entity_id);
            return;
        }
        self.remove_entity(world, entity_id);
    }

    pub fn on_add_component<W: ObjectWorld>(
        &mut self,
        world: &mut W,
        entity_id: EntityId,
        data: ComponentData,
    ) {
        if self.batcher.in_critical_section() {
            self.batcher.buffer_add_component(entity_id, data);
            return;
        }
        let mut touched = Vec::new();
        self.route_added_component(world, entity_id, data, &mut touched);
        for entity_id in touched {
            self.advance_construction(world, entity_id);
        }
    }

    pub fn on_authority_change<W: ObjectWorld>(
        &mut self,
        world: &mut W,
        entity_id: EntityId,
        component_id: ComponentId,
        authority: Authority,
    ) {
        if self.batcher.in_critical_section() {
            self.batcher
                .buffer_authority_change(entity_id, component_id, authority);
            return;
        }
        self.apply_authority_change(world, entity_id, component_id, authority);
    }

    /// Applies a burst: removals, then additions, then authority changes, then
    /// resolutions reported while the burst was open.
    fn drain<W: ObjectWorld>(&mut self, world: &mut W, batch: CriticalSectionBatch) {
        for entity_id in batch.removed_entities {
            self.remove_entity(world, entity_id);
        }

        let mut touched = Vec::new();
        for entity_id in batch.added_entities {
            self.begin_entity(entity_id, &mut touched);
        }
        for pending in batch.added_components {
            self.route_added_component(world, pending.entity_id, pending.data, &mut touched);
        }
        for entity_id in touched {
            self.advance_construction(world, entity_id);
        }

        for change in batch.authority_changes {
            self.apply_authority_change(
                world,
                change.entity_id,
                change.component_id,
                change.authority,
            );
        }

        for resolution in batch.resolutions {
            self.resolve_now(world, resolution.object_ref, resolution.object);
        }
    }

    // Construction

    fn begin_entity(&mut self, entity_id: EntityId, touched: &mut Vec<EntityId>) {
        if self.channels.contains(&entity_id) {
            warn!("Entity {} is already constructed, ignoring add", entity_id);
            return;
        }
        if !self.constructor.begin(entity_id) {
            debug!("Entity {} is already awaiting construction", entity_id);
        }
        if !touched.contains(&entity_id) {
            touched.push(entity_id);
        }
    }

    fn route_added_component<W: ObjectWorld>(
        &mut self,
        world: &mut W,
        entity_id: EntityId,
        data: ComponentData,
        touched: &mut Vec<EntityId>,
    ) {
        if self.constructor.contains(&entity_id) {
            self.constructor.add_component(entity_id, data);
            if !touched.contains(&entity_id) {
                touched.push(entity_id);
            }
            return;
        }

        if let Err(error) =
            self.apply_to_live_entity(world, entity_id, data.component_id, &data.payload)
        {
            log_routing_error("add component", entity_id, data.component_id, &error);
        }
    }

    /// Moves the construction of `entity_id` on as far as its preconditions
    /// allow, building it once they all hold.
    fn advance_construction<W: ObjectWorld>(&mut self, world: &mut W, entity_id: EntityId) {
        let Some(state) = self.constructor.state(&entity_id).cloned() else {
            return;
        };

        match state {
            ConstructionState::Collecting => {
                let Some(record) = self.constructor.record(&entity_id) else {
                    return;
                };
                match world.read_spawn_data(entity_id, &record.components) {
                    Ok(spawn_data) => {
                        if self.constructor.set_spawn_data(entity_id, spawn_data)
                            != Some(ConstructionState::Ready)
                        {
                            return;
                        }
                    }
                    Err(ConstructionError::SpawnDataMissing { .. }) => {
                        debug!("Entity {} has no spawn data yet, still collecting", entity_id);
                        return;
                    }
                    Err(error) => {
                        warn!("Skipping entity {}: {}", entity_id, error);
                        self.constructor.remove(&entity_id);
                        return;
                    }
                }
            }
            ConstructionState::WaitingOnContainer(_) => return,
            ConstructionState::Ready => {}
        }

        if let Some(record) = self.constructor.take_ready(&entity_id) {
            self.construct(world, record);
        }
    }

    fn construct<W: ObjectWorld>(&mut self, world: &mut W, record: DeferredConstructionRecord) {
        let mut creator = ActorCreator {
            bindings: &self.protocol.component_bindings,
            channels: &mut self.channels,
            object_refs: &mut self.object_refs,
            update_resolver: &mut self.update_resolver,
            events: &mut self.events,
        };
        let Some(registered) = creator.construct(world, record) else {
            return;
        };

        for (object_ref, object) in registered {
            self.resolve_now(world, object_ref, object);
        }
    }

    /// Signals that a streaming container finished loading. Entities that
    /// were waiting on it are built now, in the order they were deferred.
    pub fn on_container_loaded<W: ObjectWorld>(&mut self, world: &mut W, container: &ContainerId) {
        let ready = self.constructor.on_container_loaded(container);
        if !ready.is_empty() {
            info!(
                "Container {} loaded, constructing {} deferred entities",
                container,
                ready.len()
            );
        }
        for entity_id in ready {
            self.advance_construction(world, entity_id);
        }
    }

    /// Signals that a streaming container was unloaded. Later spawns inside it
    /// wait again.
    pub fn on_container_unloaded(&mut self, container: &ContainerId) {
        self.constructor.on_container_unloaded(container);
    }

    // Removal

    fn remove_entity<W: ObjectWorld>(&mut self, world: &mut W, entity_id: EntityId) {
        if self.constructor.remove(&entity_id).is_some() {
            info!("Entity {} removed before it was constructed", entity_id);
            return;
        }

        let Some(channel) = self.channels.close(&entity_id) else {
            info!("Received remove for unknown entity {}", entity_id);
            return;
        };

        let dropped_pairs = self.update_resolver.remove_channel(&channel.handle());
        let objects: HashSet<ObjectHandle> =
            channel.object_refs().map(|(_, object)| object).collect();
        self.object_refs.unregister_entity(entity_id);
        self.pending_requests.drop_owned_by(&objects);

        world.destroy(&channel.root());
        debug!(
            "Removed entity {} with {} unresolved objects",
            entity_id, dropped_pairs
        );
        self.events.push(ReceiverEvent::EntityRemoved(entity_id));
    }

    // Authority

    fn apply_authority_change<W: ObjectWorld>(
        &mut self,
        world: &mut W,
        entity_id: EntityId,
        component_id: ComponentId,
        authority: Authority,
    ) {
        if let Some(channel) = self.channels.get_mut(&entity_id) {
            channel.set_authority(component_id, authority);
            let target = self
                .protocol
                .component_bindings
                .get(&component_id)
                .and_then(|binding| channel.object_at(binding.offset))
                .unwrap_or_else(|| channel.root());
            world.on_authority_change(&target, component_id, authority);
            self.events.push(ReceiverEvent::AuthorityChanged {
                entity_id,
                component_id,
                authority,
            });
            return;
        }

        if self
            .constructor
            .add_authority(entity_id, component_id, authority)
        {
            debug!(
                "Holding authority change for entity {} until it is constructed",
                entity_id
            );
            return;
        }

        info!(
            "Authority change for component {} of unknown entity {}",
            component_id, entity_id
        );
    }

    // Updates and invocations

    pub fn on_component_update<W: ObjectWorld>(
        &mut self,
        world: &mut W,
        entity_id: EntityId,
        update: ComponentUpdate,
    ) {
        let component_id = update.component_id;
        if let Err(error) = self.try_component_update(world, entity_id, update) {
            log_routing_error("component update", entity_id, component_id, &error);
        }
    }

    /// Applies an update to a constructed entity. Property updates for an
    /// entity still awaiting construction are folded into its record.
    pub fn try_component_update<W: ObjectWorld>(
        &mut self,
        world: &mut W,
        entity_id: EntityId,
        update: ComponentUpdate,
    ) -> Result<(), ReceiverError> {
        let component_id = update.component_id;
        if self.constructor.contains(&entity_id) {
            let binding = self.binding(component_id)?;
            if binding.role.carries_properties() {
                self.constructor
                    .add_component(entity_id, ComponentData::new(component_id, update.payload));
                return Ok(());
            }
            return Err(ReceiverError::UnknownEntity { entity_id });
        }

        self.apply_to_live_entity(world, entity_id, component_id, &update.payload)
    }

    fn apply_to_live_entity<W: ObjectWorld>(
        &mut self,
        world: &mut W,
        entity_id: EntityId,
        component_id: ComponentId,
        payload: &[u8],
    ) -> Result<(), ReceiverError> {
        let binding = self.binding(component_id)?;
        let pair = self.target_pair(world, entity_id, component_id)?;

        match binding.role {
            ComponentRole::Spawn | ComponentRole::Data | ComponentRole::Handover => {
                self.update_resolver.apply_update(
                    world,
                    &self.object_refs,
                    pair,
                    binding.role,
                    component_id,
                    payload,
                )?;
            }
            ComponentRole::MulticastRpc => {
                let invocations =
                    world.read_multicast(&pair.object, component_id, payload, &self.object_refs)?;
                for read in invocations {
                    self.dispatch_or_queue(world, pair.object, entity_id, component_id, read);
                }
            }
            ComponentRole::CommandRpc => {
                debug!(
                    "Ignoring state for command component {} of entity {}",
                    component_id, entity_id
                );
            }
        }
        Ok(())
    }

    /// Handles a command request. A response is always emitted, whether the
    /// command ran, was queued, or failed to decode.
    pub fn on_command_request<W: ObjectWorld>(
        &mut self,
        world: &mut W,
        request_id: RequestId,
        entity_id: EntityId,
        request: CommandRequest,
    ) {
        let component_id = request.component_id;
        if let Err(error) = self.try_command_request(world, entity_id, &request) {
            log_routing_error("command request", entity_id, component_id, &error);
        }
        self.events.push(ReceiverEvent::SendCommandResponse {
            request_id,
            entity_id,
            component_id,
        });
    }

    pub fn try_command_request<W: ObjectWorld>(
        &mut self,
        world: &mut W,
        entity_id: EntityId,
        request: &CommandRequest,
    ) -> Result<(), ReceiverError> {
        self.binding(request.component_id)?;
        let pair = self.target_pair(world, entity_id, request.component_id)?;
        let read = world.read_command(
            &pair.object,
            request.component_id,
            request.command_index,
            &request.payload,
            &self.object_refs,
        )?;
        self.dispatch_or_queue(world, pair.object, entity_id, request.component_id, read);
        Ok(())
    }

    fn dispatch_or_queue<W: ObjectWorld>(
        &mut self,
        world: &mut W,
        target: ObjectHandle,
        entity_id: EntityId,
        component_id: ComponentId,
        read: ReadRpc,
    ) {
        if read.is_ready() {
            if let Err(error) = world.apply_rpc(&target, &read.invocation, &self.object_refs) {
                warn!(
                    "Discarding function {} on entity {}: {}",
                    read.invocation.function, entity_id, error
                );
            }
            return;
        }

        self.rpc_queue.enqueue(PendingIncomingRpc::new(
            target,
            entity_id,
            component_id,
            read.invocation,
            read.unresolved_refs,
        ));
    }

    fn dispatch_ready_rpcs<W: ObjectWorld>(&mut self, world: &mut W) {
        for rpc in self.rpc_queue.take_ready() {
            if !world.is_alive(&rpc.target) {
                info!(
                    "Dropping function {} queued for destroyed object of entity {}",
                    rpc.invocation.function, rpc.entity_id
                );
                continue;
            }
            if let Err(error) = world.apply_rpc(&rpc.target, &rpc.invocation, &self.object_refs) {
                warn!(
                    "Discarding queued function {} on entity {}: {}",
                    rpc.invocation.function, rpc.entity_id, error
                );
            }
        }
    }

    // Resolution

    /// Reports that `object` now exists locally as `object_ref`. Updates and
    /// invocations waiting on it are replayed, after the current critical
    /// section if one is open.
    pub fn resolve_pending_operations<W: ObjectWorld>(
        &mut self,
        world: &mut W,
        object: ObjectHandle,
        object_ref: ObjectRef,
    ) {
        self.object_refs.register(object_ref, object);

        if self.batcher.in_critical_section() && self.config.queue_resolutions_in_critical_section
        {
            debug!("Queueing resolution of {} until the critical section ends", object_ref);
            self.batcher.buffer_resolution(object, object_ref);
            return;
        }
        self.resolve_now(world, object_ref, object);
    }

    fn resolve_now<W: ObjectWorld>(
        &mut self,
        world: &mut W,
        object_ref: ObjectRef,
        object: ObjectHandle,
    ) {
        let fully_resolved =
            self.update_resolver
                .resolve(world, &self.object_refs, &object_ref, &object);
        for pair in fully_resolved {
            self.events.push(ReceiverEvent::ReferencesResolved(pair));
        }

        if self.rpc_queue.on_resolved(&object_ref) > 0 {
            self.dispatch_ready_rpcs(world);
        }
    }

    // Correlation

    pub fn register_pending_construction(
        &mut self,
        request_id: RequestId,
        owner: Option<ObjectHandle>,
        continuation: Continuation<CreateEntityResult>,
    ) -> Result<(), CorrelationError> {
        self.pending_requests
            .constructions
            .register(request_id, PendingResponse::new(owner, continuation))
    }

    pub fn register_reserve_entity_ids(
        &mut self,
        request_id: RequestId,
        owner: Option<ObjectHandle>,
        continuation: Continuation<ReserveEntityIdsResult>,
    ) -> Result<(), CorrelationError> {
        self.pending_requests
            .reservations
            .register(request_id, PendingResponse::new(owner, continuation))
    }

    pub fn register_entity_query(
        &mut self,
        request_id: RequestId,
        owner: Option<ObjectHandle>,
        continuation: Continuation<EntityQueryResult>,
    ) -> Result<(), CorrelationError> {
        self.pending_requests
            .queries
            .register(request_id, PendingResponse::new(owner, continuation))
    }

    pub fn register_pending_reliable_rpc(
        &mut self,
        request_id: RequestId,
        params: ReliableRpcParams,
    ) -> Result<(), CorrelationError> {
        self.pending_requests
            .reliable_rpcs
            .register(request_id, params)
    }

    pub fn on_create_entity_response<W: ObjectWorld>(
        &mut self,
        world: &W,
        request_id: RequestId,
        result: CreateEntityResult,
    ) {
        let pending = self.pending_requests.constructions.take(&request_id);
        deliver_response(world, "entity creation", request_id, pending, result);
    }

    pub fn on_reserve_entity_ids_response<W: ObjectWorld>(
        &mut self,
        world: &W,
        request_id: RequestId,
        result: ReserveEntityIdsResult,
    ) {
        let pending = self.pending_requests.reservations.take(&request_id);
        deliver_response(world, "entity id reservation", request_id, pending, result);
    }

    pub fn on_entity_query_response<W: ObjectWorld>(
        &mut self,
        world: &W,
        request_id: RequestId,
        result: EntityQueryResult,
    ) {
        let pending = self.pending_requests.queries.take(&request_id);
        deliver_response(world, "entity query", request_id, pending, result);
    }

    /// Completes a reliable command. Failures are retried with a doubling
    /// delay until the attempt budget runs out.
    pub fn on_command_response<W: ObjectWorld>(
        &mut self,
        world: &W,
        request_id: RequestId,
        result: CommandResponseResult,
    ) {
        let Some(mut params) = self.pending_requests.reliable_rpcs.take(&request_id) else {
            return;
        };

        let failure = match result {
            Ok(_) => {
                debug!(
                    "Command {} on entity {} acknowledged",
                    params.command_index, params.entity_id
                );
                return;
            }
            Err(failure) => failure,
        };

        if !world.is_alive(&params.target) {
            info!(
                "Command {} on entity {} failed after its sender was destroyed",
                params.command_index, params.entity_id
            );
            return;
        }

        if params.attempts < self.config.max_command_attempts {
            let delay = self.config.retry_delay(params.attempts);
            warn!(
                "Command {} on entity {} failed ({}), retrying in {:?}",
                params.command_index, params.entity_id, failure, delay
            );
            params.attempts += 1;
            self.events
                .push(ReceiverEvent::RetryReliableRpc { params, delay });
        } else {
            error!(
                "Command {} on entity {} failed after {} attempts: {}",
                params.command_index, params.entity_id, params.attempts, failure
            );
        }
    }

    // Helpers

    fn binding(
        &self,
        component_id: ComponentId,
    ) -> Result<ComponentBinding, ReceiverError> {
        self.protocol
            .component_bindings
            .get(&component_id)
            .copied()
            .ok_or(ReceiverError::NoBinding { component_id })
    }

    fn target_pair<W: ObjectWorld>(
        &self,
        world: &W,
        entity_id: EntityId,
        component_id: ComponentId,
    ) -> Result<ChannelObjectPair, ReceiverError> {
        let binding = self.binding(component_id)?;
        let channel = self
            .channels
            .get(&entity_id)
            .ok_or(ReceiverError::UnknownEntity { entity_id })?;
        let object = channel
            .object_at(binding.offset)
            .ok_or(ReceiverError::NoTargetObject {
                entity_id,
                offset: binding.offset,
            })?;
        if !world.is_alive(&object) {
            return Err(ReceiverError::TargetDestroyed { entity_id });
        }
        Ok(channel.pair(object))
    }

    pub fn take_events(&mut self) -> Vec<ReceiverEvent> {
        std::mem::take(&mut self.events)
    }

    // Accessors

    pub fn config(&self) -> &ReceiverConfig {
        &self.config
    }

    pub fn protocol(&self) -> &Protocol {
        &self.protocol
    }

    pub fn in_critical_section(&self) -> bool {
        self.batcher.in_critical_section()
    }

    pub fn is_entity_constructed(&self, entity_id: &EntityId) -> bool {
        self.channels.contains(entity_id)
    }

    pub fn construction_state(&self, entity_id: &EntityId) -> Option<&ConstructionState> {
        self.constructor.state(entity_id)
    }

    pub fn channel(&self, entity_id: &EntityId) -> Option<&ActorChannel> {
        self.channels.get(entity_id)
    }

    pub fn object_for_ref(&self, object_ref: &ObjectRef) -> Option<ObjectHandle> {
        self.object_refs.object_from_ref(object_ref)
    }

    pub fn ref_for_object(&self, object: &ObjectHandle) -> Option<ObjectRef> {
        self.object_refs.ref_from_object(object)
    }

    pub fn reference_registry(&self) -> &ReferenceRegistry {
        self.update_resolver.registry()
    }

    pub fn rpc_queue(&self) -> &RpcQueue {
        &self.rpc_queue
    }

    pub fn deferred_constructor(&self) -> &DeferredConstructor {
        &self.constructor
    }

    pub fn pending_requests(&self) -> &PendingRequests {
        &self.pending_requests
    }
}

fn deliver_response<W: ObjectWorld, R>(
    world: &W,
    domain: &str,
    request_id: RequestId,
    pending: Option<PendingResponse<R>>,
    response: R,
) {
    let Some(pending) = pending else {
        return;
    };
    if let Some(owner) = pending.owner {
        if !world.is_alive(&owner) {
            info!(
                "Dropping {} response {}: requester was destroyed",
                domain, request_id
            );
            return;
        }
    }
    pending.continuation.deliver(response);
}

fn log_routing_error(
    operation: &str,
    entity_id: EntityId,
    component_id: ComponentId,
    error: &ReceiverError,
) {
    match error {
        ReceiverError::UnknownEntity { .. } | ReceiverError::TargetDestroyed { .. } => {
            info!("Dropping {} for component {}: {}", operation, component_id, error);
        }
        _ => {
            warn!(
                "Discarding {} for component {} of entity {}: {}",
                operation, component_id, entity_id, error
            );
        }
    }
}
