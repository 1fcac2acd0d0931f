use std::collections::HashMap;

use log::warn;

use fabric_shared::{EntityId, ObjectHandle, ObjectRef, ObjectRefResolver};

/// Two-way map between remote object references and the local objects
/// constructed for them.
#[derive(Default)]
pub struct ObjectRefMap {
    ref_to_object: HashMap<ObjectRef, ObjectHandle>,
    object_to_ref: HashMap<ObjectHandle, ObjectRef>,
}

impl ObjectRefMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Maps `object_ref` to `object`, replacing whatever either side was
    /// mapped to before.
    pub fn register(&mut self, object_ref: ObjectRef, object: ObjectHandle) {
        if let Some(previous) = self.ref_to_object.insert(object_ref, object) {
            if previous != object {
                warn!(
                    "Reference {} was still mapped to {:?}, remapping to {:?}",
                    object_ref, previous, object
                );
                self.object_to_ref.remove(&previous);
            }
        }
        if let Some(previous_ref) = self.object_to_ref.insert(object, object_ref) {
            if previous_ref != object_ref {
                self.ref_to_object.remove(&previous_ref);
            }
        }
    }

    pub fn unregister(&mut self, object_ref: &ObjectRef) -> Option<ObjectHandle> {
        let object = self.ref_to_object.remove(object_ref)?;
        self.object_to_ref.remove(&object);
        Some(object)
    }

    /// Removes every reference that belongs to `entity_id`.
    pub fn unregister_entity(&mut self, entity_id: EntityId) -> Vec<ObjectRef> {
        let refs: Vec<ObjectRef> = self
            .ref_to_object
            .keys()
            .filter(|object_ref| object_ref.entity() == entity_id)
            .copied()
            .collect();
        for object_ref in &refs {
            self.unregister(object_ref);
        }
        refs
    }

    pub fn contains(&self, object_ref: &ObjectRef) -> bool {
        self.ref_to_object.contains_key(object_ref)
    }

    pub fn len(&self) -> usize {
        self.ref_to_object.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ref_to_object.is_empty()
    }
}

impl ObjectRefResolver for ObjectRefMap {
    fn object_from_ref(&self, object_ref: &ObjectRef) -> Option<ObjectHandle> {
        self.ref_to_object.get(object_ref).copied()
    }

    fn ref_from_object(&self, object: &ObjectHandle) -> Option<ObjectRef> {
        self.object_to_ref.get(object).copied()
    }
}
