use std::collections::HashSet;

use crate::{
    component::ComponentData,
    component_bindings::ComponentRole,
    error::{ConstructionError, SchemaError},
    handle::ObjectHandle,
    types::{Authority, CommandIndex, ComponentId, EntityId, ObjectOffset, RepIndex},
    world::{
        object_references::ObjectReferencesMap,
        rpc::{ReadRpc, RpcInvocation},
        spawn_data::{InstantiatedObject, SpawnData},
    },
    ObjectRef,
};

/// Maps remote identities to local objects, for the objects that already
/// exist locally.
pub trait ObjectRefResolver {
    fn object_from_ref(&self, object_ref: &ObjectRef) -> Option<ObjectHandle>;
    fn ref_from_object(&self, object: &ObjectHandle) -> Option<ObjectRef>;
}

/// Result of writing one payload into an object.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AppliedFields {
    /// Top-level field offsets the payload wrote, resolved or not.
    pub written: Vec<ObjectOffset>,
    /// Fields that still point at objects that are not local yet.
    pub unresolved: ObjectReferencesMap,
}

impl AppliedFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_fully_resolved(&self) -> bool {
        self.unresolved.is_empty()
    }
}

/// The local object graph the receiver reconstructs remote state into.
///
/// Implementors own the objects, the schema decode, and the property
/// reflection; the receiver only sequences calls and parks whatever cannot
/// be resolved yet.
pub trait ObjectWorld {
    /// Whether `object` still refers to a live object.
    fn is_alive(&self, object: &ObjectHandle) -> bool;

    /// Decodes spawn data out of the components collected for an entity.
    fn read_spawn_data(
        &self,
        entity_id: EntityId,
        components: &[ComponentData],
    ) -> Result<SpawnData, ConstructionError>;

    /// Selects a template for `spawn_data` and builds the local objects.
    /// Must leave nothing behind on failure.
    fn instantiate(
        &mut self,
        entity_id: EntityId,
        spawn_data: &SpawnData,
    ) -> Result<InstantiatedObject, ConstructionError>;

    /// Called once every buffered component has been applied.
    fn finalize(&mut self, object: &ObjectHandle);

    fn destroy(&mut self, object: &ObjectHandle);

    /// Writes a component payload into `object`, reporting which fields
    /// still reference objects `resolver` does not know.
    fn apply_component(
        &mut self,
        object: &ObjectHandle,
        role: ComponentRole,
        component_id: ComponentId,
        payload: &[u8],
        resolver: &dyn ObjectRefResolver,
    ) -> Result<AppliedFields, SchemaError>;

    /// Sets a single reference field at `path` to `target`.
    fn write_reference(
        &mut self,
        object: &ObjectHandle,
        path: &[ObjectOffset],
        target: &ObjectHandle,
    ) -> Result<(), SchemaError>;

    /// Decodes a stored struct buffer again at `path` and returns the
    /// references that are still unresolved.
    fn reapply_struct(
        &mut self,
        object: &ObjectHandle,
        path: &[ObjectOffset],
        buffer: &[u8],
        bit_length: u32,
        resolver: &dyn ObjectRefResolver,
    ) -> Result<HashSet<ObjectRef>, SchemaError>;

    /// Fires changed notifications for the given replicated properties.
    fn notify_changed(&mut self, object: &ObjectHandle, rep_indices: &[RepIndex]);

    /// Decodes a command request addressed to `object`.
    fn read_command(
        &self,
        object: &ObjectHandle,
        component_id: ComponentId,
        command_index: CommandIndex,
        payload: &[u8],
        resolver: &dyn ObjectRefResolver,
    ) -> Result<ReadRpc, SchemaError>;

    /// Decodes the multicast invocations carried by a component update.
    fn read_multicast(
        &self,
        object: &ObjectHandle,
        component_id: ComponentId,
        payload: &[u8],
        resolver: &dyn ObjectRefResolver,
    ) -> Result<Vec<ReadRpc>, SchemaError>;

    /// Decodes the arguments of `invocation` and executes it on `object`.
    fn apply_rpc(
        &mut self,
        object: &ObjectHandle,
        invocation: &RpcInvocation,
        resolver: &dyn ObjectRefResolver,
    ) -> Result<(), SchemaError>;

    fn on_authority_change(
        &mut self,
        object: &ObjectHandle,
        component_id: ComponentId,
        authority: Authority,
    );
}
