use std::collections::{BTreeMap, HashMap};

use log::warn;

use fabric_shared::{
    Authority, ComponentId, EntityId, InstantiatedObject, ObjectHandle, ObjectOffset, ObjectRef,
};

/// Identifies one opening of an entity's channel. Reopening a channel for the
/// same entity yields a new generation, so subscriptions made against the old
/// channel never match the new one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelHandle {
    pub entity_id: EntityId,
    pub generation: u32,
}

/// The unit of subscription for unresolved references: one object, seen
/// through the channel that replicates it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelObjectPair {
    pub channel: ChannelHandle,
    pub object: ObjectHandle,
}

impl ChannelObjectPair {
    pub fn new(channel: ChannelHandle, object: ObjectHandle) -> Self {
        Self { channel, object }
    }
}

/// Replication state for one constructed entity.
pub struct ActorChannel {
    handle: ChannelHandle,
    objects: BTreeMap<ObjectOffset, ObjectHandle>,
    authority: HashMap<ComponentId, Authority>,
}

impl ActorChannel {
    fn new(handle: ChannelHandle, instantiated: &InstantiatedObject) -> Self {
        let mut objects = BTreeMap::new();
        objects.insert(ObjectRef::ROOT_OFFSET, instantiated.root);
        for (offset, object) in &instantiated.subobjects {
            if *offset == ObjectRef::ROOT_OFFSET {
                warn!(
                    "Entity {} reported a sub-object at the root offset, ignoring it",
                    handle.entity_id
                );
                continue;
            }
            objects.insert(*offset, *object);
        }

        Self {
            handle,
            objects,
            authority: HashMap::new(),
        }
    }

    pub fn handle(&self) -> ChannelHandle {
        self.handle
    }

    pub fn entity_id(&self) -> EntityId {
        self.handle.entity_id
    }

    pub fn root(&self) -> ObjectHandle {
        self.objects[&ObjectRef::ROOT_OFFSET]
    }

    pub fn object_at(&self, offset: ObjectOffset) -> Option<ObjectHandle> {
        self.objects.get(&offset).copied()
    }

    /// Every object of the channel with the reference that addresses it.
    pub fn object_refs(&self) -> impl Iterator<Item = (ObjectRef, ObjectHandle)> + '_ {
        let entity_id = self.handle.entity_id;
        self.objects
            .iter()
            .map(move |(offset, object)| (ObjectRef::new(entity_id, *offset), *object))
    }

    pub fn pair(&self, object: ObjectHandle) -> ChannelObjectPair {
        ChannelObjectPair::new(self.handle, object)
    }

    pub fn authority(&self, component_id: &ComponentId) -> Authority {
        self.authority
            .get(component_id)
            .copied()
            .unwrap_or(Authority::NotAuthoritative)
    }

    pub(crate) fn set_authority(&mut self, component_id: ComponentId, authority: Authority) {
        self.authority.insert(component_id, authority);
    }
}

/// Open channels, keyed by entity.
pub struct ChannelMap {
    channels: HashMap<EntityId, ActorChannel>,
    next_generation: u32,
}

impl Default for ChannelMap {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelMap {
    pub fn new() -> Self {
        Self {
            channels: HashMap::new(),
            next_generation: 0,
        }
    }

    /// Opens a channel for a freshly instantiated entity. Returns `None` if
    /// the entity already has one.
    pub(crate) fn open(
        &mut self,
        entity_id: EntityId,
        instantiated: &InstantiatedObject,
    ) -> Option<ChannelHandle> {
        if self.channels.contains_key(&entity_id) {
            return None;
        }

        let handle = ChannelHandle {
            entity_id,
            generation: self.next_generation,
        };
        self.next_generation = self.next_generation.wrapping_add(1);
        self.channels
            .insert(entity_id, ActorChannel::new(handle, instantiated));
        Some(handle)
    }

    pub(crate) fn close(&mut self, entity_id: &EntityId) -> Option<ActorChannel> {
        self.channels.remove(entity_id)
    }

    pub fn get(&self, entity_id: &EntityId) -> Option<&ActorChannel> {
        self.channels.get(entity_id)
    }

    pub(crate) fn get_mut(&mut self, entity_id: &EntityId) -> Option<&mut ActorChannel> {
        self.channels.get_mut(entity_id)
    }

    pub fn contains(&self, entity_id: &EntityId) -> bool {
        self.channels.contains_key(entity_id)
    }

    /// Whether `handle` still names the currently open channel of its entity.
    pub fn is_open(&self, handle: &ChannelHandle) -> bool {
        self.channels
            .get(&handle.entity_id)
            .map(|channel| channel.handle == *handle)
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}
