//! Simple ObjectWorld implementation for receiver testing.
//! Objects are plain field maps decoded with the test schema.

use std::collections::{BTreeMap, HashMap, HashSet};

use fabric_shared::{
    AppliedFields, Authority, CommandIndex, ComponentData, ComponentId, ComponentRole,
    ConstructionError, EntityId, FunctionIndex, HandleAllocator, InstantiatedObject, ObjectHandle,
    ObjectOffset, ObjectRef, ObjectRefResolver, ObjectReferenceSet, ObjectReferencesMap,
    ObjectWorld, ReadRpc, RepIndex, RpcInvocation, SchemaError, SpawnData,
};

use crate::{
    test_protocol::{CHARACTER_CLASS, CRATE_CLASS, SPAWN_COMPONENT, WEAPON_OFFSET},
    test_schema::{
        decode_args, decode_fields, decode_multicast, decode_spawn, decode_value, encode_args,
        encode_value, TestValue,
    },
};

/// A field value after references have been mapped to local objects.
/// References that were not local at write time are `Object(None)`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LocalValue {
    Int(i32),
    Object(Option<ObjectHandle>),
    Struct(Vec<LocalValue>),
    Array(Vec<LocalValue>),
}

pub struct TestObject {
    pub entity_id: Option<EntityId>,
    pub class: String,
    pub offset: ObjectOffset,
    pub fields: BTreeMap<ObjectOffset, LocalValue>,
    pub finalized: bool,
    children: Vec<ObjectHandle>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecutedRpc {
    pub object: ObjectHandle,
    pub function: FunctionIndex,
    pub args: Vec<LocalValue>,
}

// TestWorld - HashMap-based object store
pub struct TestWorld {
    allocator: HandleAllocator,
    objects: HashMap<ObjectHandle, TestObject>,
    classes: HashMap<String, Vec<ObjectOffset>>,
    startup_objects: HashSet<String>,
    max_command_index: CommandIndex,
    pub notifications: Vec<(ObjectHandle, Vec<RepIndex>)>,
    pub executed_rpcs: Vec<ExecutedRpc>,
    pub authority_changes: Vec<(ObjectHandle, ComponentId, Authority)>,
    pub instantiated: Vec<(EntityId, ObjectHandle)>,
    pub finalized: Vec<ObjectHandle>,
    pub destroyed: Vec<ObjectHandle>,
}

impl Default for TestWorld {
    fn default() -> Self {
        let mut world = Self {
            allocator: HandleAllocator::new(),
            objects: HashMap::new(),
            classes: HashMap::new(),
            startup_objects: HashSet::new(),
            max_command_index: 16,
            notifications: Vec::new(),
            executed_rpcs: Vec::new(),
            authority_changes: Vec::new(),
            instantiated: Vec::new(),
            finalized: Vec::new(),
            destroyed: Vec::new(),
        };
        world.register_class(CHARACTER_CLASS, &[WEAPON_OFFSET]);
        world.register_class(CRATE_CLASS, &[]);
        world
    }
}

impl TestWorld {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `class` instantiable, with a sub-object at each of
    /// `subobject_offsets`.
    pub fn register_class(&mut self, class: &str, subobject_offsets: &[ObjectOffset]) {
        self.classes
            .insert(class.to_string(), subobject_offsets.to_vec());
    }

    /// Declares a pre-placed object that spawn data may adopt by path.
    pub fn register_startup_object(&mut self, path: &str) {
        self.startup_objects.insert(path.to_string());
    }

    /// Creates an object that does not belong to any remote entity.
    pub fn spawn_local(&mut self, class: &str) -> ObjectHandle {
        let handle = self.allocator.allocate();
        self.objects.insert(
            handle,
            TestObject {
                entity_id: None,
                class: class.to_string(),
                offset: ObjectRef::ROOT_OFFSET,
                fields: BTreeMap::new(),
                finalized: true,
                children: Vec::new(),
            },
        );
        handle
    }

    pub fn object(&self, handle: &ObjectHandle) -> Option<&TestObject> {
        if !self.allocator.is_alive(handle) {
            return None;
        }
        self.objects.get(handle)
    }

    pub fn field(&self, handle: &ObjectHandle, offset: ObjectOffset) -> Option<&LocalValue> {
        self.object(handle)?.fields.get(&offset)
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Root objects instantiated for `entity_id`, oldest first.
    pub fn roots_of(&self, entity_id: EntityId) -> Vec<ObjectHandle> {
        self.instantiated
            .iter()
            .filter(|(id, _)| *id == entity_id)
            .map(|(_, root)| *root)
            .collect()
    }

    /// Live root objects for `entity_id`.
    pub fn live_roots_of(&self, entity_id: EntityId) -> Vec<ObjectHandle> {
        self.roots_of(entity_id)
            .into_iter()
            .filter(|root| self.is_alive(root))
            .collect()
    }

    pub fn rpcs_on(&self, object: &ObjectHandle) -> Vec<&ExecutedRpc> {
        self.executed_rpcs
            .iter()
            .filter(|rpc| rpc.object == *object)
            .collect()
    }

    fn object_mut(&mut self, handle: &ObjectHandle) -> Result<&mut TestObject, SchemaError> {
        if !self.allocator.is_alive(handle) {
            return Err(SchemaError::UnknownObject);
        }
        self.objects
            .get_mut(handle)
            .ok_or(SchemaError::UnknownObject)
    }
}

// Internal helper functions
fn localize(
    value: &TestValue,
    resolver: &dyn ObjectRefResolver,
    unresolved: &mut HashSet<ObjectRef>,
) -> LocalValue {
    match value {
        TestValue::Int(int) => LocalValue::Int(*int),
        TestValue::Null => LocalValue::Object(None),
        TestValue::Ref(object_ref) => match resolver.object_from_ref(object_ref) {
            Some(object) => LocalValue::Object(Some(object)),
            None => {
                unresolved.insert(*object_ref);
                LocalValue::Object(None)
            }
        },
        TestValue::Struct(values) => LocalValue::Struct(
            values
                .iter()
                .map(|value| localize(value, resolver, unresolved))
                .collect(),
        ),
        TestValue::Array(values) => LocalValue::Array(
            values
                .iter()
                .map(|value| localize(value, resolver, unresolved))
                .collect(),
        ),
    }
}

fn localize_all(
    values: &[TestValue],
    resolver: &dyn ObjectRefResolver,
) -> (Vec<LocalValue>, HashSet<ObjectRef>) {
    let mut unresolved = HashSet::new();
    let local = values
        .iter()
        .map(|value| localize(value, resolver, &mut unresolved))
        .collect();
    (local, unresolved)
}

/// What still waits on a reference inside `value`, shaped the way the value
/// is.
fn reference_set(
    rep_index: RepIndex,
    value: &TestValue,
    resolver: &dyn ObjectRefResolver,
) -> Option<ObjectReferenceSet> {
    match value {
        TestValue::Ref(object_ref) if resolver.object_from_ref(object_ref).is_none() => {
            Some(ObjectReferenceSet::single(rep_index, *object_ref))
        }
        TestValue::Struct(_) => {
            let mut unresolved = HashSet::new();
            localize(value, resolver, &mut unresolved);
            if unresolved.is_empty() {
                return None;
            }
            let buffer = encode_value(value);
            let bit_length = (buffer.len() * 8) as u32;
            Some(ObjectReferenceSet::structured(
                rep_index, buffer, bit_length, unresolved,
            ))
        }
        TestValue::Array(elements) => {
            let mut element_sets = ObjectReferencesMap::new();
            for (index, element) in elements.iter().enumerate() {
                if let Some(set) = reference_set(rep_index, element, resolver) {
                    element_sets.insert(index as ObjectOffset, set);
                }
            }
            if element_sets.is_empty() {
                None
            } else {
                Some(ObjectReferenceSet::array(rep_index, element_sets))
            }
        }
        _ => None,
    }
}

fn unknown_field(path: &[ObjectOffset]) -> SchemaError {
    SchemaError::UnknownField {
        path: path.to_vec(),
    }
}

fn value_at_path<'v>(
    fields: &'v mut BTreeMap<ObjectOffset, LocalValue>,
    path: &[ObjectOffset],
) -> Result<&'v mut LocalValue, SchemaError> {
    let (first, rest) = path.split_first().ok_or_else(|| unknown_field(path))?;
    let value = fields.get_mut(first).ok_or_else(|| unknown_field(path))?;
    element_at(value, rest, path)
}

fn element_at<'v>(
    value: &'v mut LocalValue,
    rest: &[ObjectOffset],
    path: &[ObjectOffset],
) -> Result<&'v mut LocalValue, SchemaError> {
    match rest.split_first() {
        None => Ok(value),
        Some((index, rest)) => match value {
            LocalValue::Array(elements) => {
                let element = elements
                    .get_mut(*index as usize)
                    .ok_or_else(|| unknown_field(path))?;
                element_at(element, rest, path)
            }
            _ => Err(unknown_field(path)),
        },
    }
}

impl ObjectWorld for TestWorld {
    fn is_alive(&self, object: &ObjectHandle) -> bool {
        self.allocator.is_alive(object)
    }

    fn read_spawn_data(
        &self,
        entity_id: EntityId,
        components: &[ComponentData],
    ) -> Result<SpawnData, ConstructionError> {
        let spawn = components
            .iter()
            .find(|data| data.component_id == SPAWN_COMPONENT)
            .ok_or(ConstructionError::SpawnDataMissing { entity_id })?;
        decode_spawn(&spawn.payload)
            .map_err(|source| ConstructionError::MalformedSpawnData { entity_id, source })
    }

    fn instantiate(
        &mut self,
        entity_id: EntityId,
        spawn_data: &SpawnData,
    ) -> Result<InstantiatedObject, ConstructionError> {
        let subobject_offsets = self.classes.get(&spawn_data.class).cloned().ok_or_else(|| {
            ConstructionError::ClassNotFound {
                entity_id,
                class: spawn_data.class.clone(),
            }
        })?;
        if let Some(path) = &spawn_data.stable_path {
            if !self.startup_objects.contains(path) {
                return Err(ConstructionError::TemplateNotFound {
                    entity_id,
                    path: path.clone(),
                });
            }
        }

        let root = self.allocator.allocate();
        let mut instantiated = InstantiatedObject::new(root);
        let mut children = Vec::new();
        for offset in subobject_offsets {
            let child = self.allocator.allocate();
            self.objects.insert(
                child,
                TestObject {
                    entity_id: Some(entity_id),
                    class: format!("{}.{}", spawn_data.class, offset),
                    offset,
                    fields: BTreeMap::new(),
                    finalized: false,
                    children: Vec::new(),
                },
            );
            children.push(child);
            instantiated = instantiated.with_subobject(offset, child);
        }
        self.objects.insert(
            root,
            TestObject {
                entity_id: Some(entity_id),
                class: spawn_data.class.clone(),
                offset: ObjectRef::ROOT_OFFSET,
                fields: BTreeMap::new(),
                finalized: false,
                children,
            },
        );
        self.instantiated.push((entity_id, root));

        Ok(instantiated)
    }

    fn finalize(&mut self, object: &ObjectHandle) {
        if let Some(test_object) = self.objects.get_mut(object) {
            test_object.finalized = true;
            self.finalized.push(*object);
        }
    }

    fn destroy(&mut self, object: &ObjectHandle) {
        if !self.allocator.is_alive(object) {
            return;
        }
        let Some(test_object) = self.objects.remove(object) else {
            return;
        };
        for child in &test_object.children {
            self.objects.remove(child);
            self.allocator.release(child);
        }
        self.allocator.release(object);
        self.destroyed.push(*object);
    }

    fn apply_component(
        &mut self,
        object: &ObjectHandle,
        role: ComponentRole,
        component_id: ComponentId,
        payload: &[u8],
        resolver: &dyn ObjectRefResolver,
    ) -> Result<AppliedFields, SchemaError> {
        if role == ComponentRole::Spawn {
            decode_spawn(payload)?;
            return Ok(AppliedFields::new());
        }

        let writes = decode_fields(payload)
            .map_err(|reason| SchemaError::MalformedPayload { component_id, reason })?;
        let test_object = self.object_mut(object)?;

        let mut applied = AppliedFields::new();
        for write in writes {
            let mut unresolved = HashSet::new();
            let local = localize(&write.value, resolver, &mut unresolved);
            test_object.fields.insert(write.offset, local);
            applied.written.push(write.offset);
            if let Some(set) = reference_set(write.rep_index, &write.value, resolver) {
                applied.unresolved.insert(write.offset, set);
            }
        }
        Ok(applied)
    }

    fn write_reference(
        &mut self,
        object: &ObjectHandle,
        path: &[ObjectOffset],
        target: &ObjectHandle,
    ) -> Result<(), SchemaError> {
        let test_object = self.object_mut(object)?;
        let value = value_at_path(&mut test_object.fields, path)?;
        *value = LocalValue::Object(Some(*target));
        Ok(())
    }

    fn reapply_struct(
        &mut self,
        object: &ObjectHandle,
        path: &[ObjectOffset],
        buffer: &[u8],
        _bit_length: u32,
        resolver: &dyn ObjectRefResolver,
    ) -> Result<HashSet<ObjectRef>, SchemaError> {
        let decoded = decode_value(buffer).map_err(|reason| SchemaError::MalformedBuffer {
            path: path.to_vec(),
            reason,
        })?;
        let mut unresolved = HashSet::new();
        let local = localize(&decoded, resolver, &mut unresolved);

        let test_object = self.object_mut(object)?;
        let value = value_at_path(&mut test_object.fields, path)?;
        *value = local;
        Ok(unresolved)
    }

    fn notify_changed(&mut self, object: &ObjectHandle, rep_indices: &[RepIndex]) {
        self.notifications.push((*object, rep_indices.to_vec()));
    }

    fn read_command(
        &self,
        object: &ObjectHandle,
        component_id: ComponentId,
        command_index: CommandIndex,
        payload: &[u8],
        resolver: &dyn ObjectRefResolver,
    ) -> Result<ReadRpc, SchemaError> {
        if !self.is_alive(object) {
            return Err(SchemaError::UnknownObject);
        }
        if command_index >= self.max_command_index {
            return Err(SchemaError::UnknownCommand {
                component_id,
                command_index,
            });
        }
        let args = decode_args(payload)
            .map_err(|reason| SchemaError::MalformedPayload { component_id, reason })?;
        let (_, unresolved_refs) = localize_all(&args, resolver);

        Ok(ReadRpc {
            invocation: RpcInvocation::new(command_index, payload.to_vec()),
            unresolved_refs,
        })
    }

    fn read_multicast(
        &self,
        object: &ObjectHandle,
        component_id: ComponentId,
        payload: &[u8],
        resolver: &dyn ObjectRefResolver,
    ) -> Result<Vec<ReadRpc>, SchemaError> {
        if !self.is_alive(object) {
            return Err(SchemaError::UnknownObject);
        }
        let invocations = decode_multicast(payload)
            .map_err(|reason| SchemaError::MalformedPayload { component_id, reason })?;

        Ok(invocations
            .into_iter()
            .map(|invocation| {
                let (_, unresolved_refs) = localize_all(&invocation.args, resolver);
                ReadRpc {
                    invocation: RpcInvocation::new(
                        invocation.function,
                        encode_args(&invocation.args),
                    ),
                    unresolved_refs,
                }
            })
            .collect())
    }

    fn apply_rpc(
        &mut self,
        object: &ObjectHandle,
        invocation: &RpcInvocation,
        resolver: &dyn ObjectRefResolver,
    ) -> Result<(), SchemaError> {
        if !self.is_alive(object) {
            return Err(SchemaError::UnknownObject);
        }
        let args = decode_args(&invocation.payload).map_err(|reason| {
            SchemaError::MalformedBuffer {
                path: Vec::new(),
                reason,
            }
        })?;
        let (args, _) = localize_all(&args, resolver);

        self.executed_rpcs.push(ExecutedRpc {
            object: *object,
            function: invocation.function,
            args,
        });
        Ok(())
    }

    fn on_authority_change(
        &mut self,
        object: &ObjectHandle,
        component_id: ComponentId,
        authority: Authority,
    ) {
        self.authority_changes
            .push((*object, component_id, authority));
    }
}
