use log::{debug, info, warn};

use fabric_shared::{ComponentBindings, ObjectHandle, ObjectRef, ObjectWorld, SpawnData};

use crate::{
    construct::deferred_constructor::DeferredConstructionRecord,
    events::ReceiverEvent,
    resolve::update_resolver::UpdateResolver,
    world::{actor_channel::ChannelMap, object_ref_map::ObjectRefMap},
};

/// Builds the local objects for an entity whose construction record is ready.
pub struct ActorCreator<'a> {
    pub bindings: &'a ComponentBindings,
    pub channels: &'a mut ChannelMap,
    pub object_refs: &'a mut ObjectRefMap,
    pub update_resolver: &'a mut UpdateResolver,
    pub events: &'a mut Vec<ReceiverEvent>,
}

impl<'a> ActorCreator<'a> {
    /// Instantiates, registers, and populates the entity of `record`.
    ///
    /// Returns the references that became resolvable, so pending work waiting
    /// on them can be replayed. Returns `None` if nothing was built.
    pub fn construct<W: ObjectWorld>(
        &mut self,
        world: &mut W,
        record: DeferredConstructionRecord,
    ) -> Option<Vec<(ObjectRef, ObjectHandle)>> {
        let entity_id = record.entity_id;
        let Some(spawn_data) = record.spawn_data.as_ref() else {
            warn!("Entity {} reached construction without spawn data", entity_id);
            return None;
        };

        let instantiated = match world.instantiate(entity_id, spawn_data) {
            Ok(instantiated) => instantiated,
            Err(error) => {
                warn!("Skipping entity {}: {}", entity_id, error);
                return None;
            }
        };

        let Some(channel_handle) = self.channels.open(entity_id, &instantiated) else {
            warn!(
                "Entity {} already has an open channel, discarding new object",
                entity_id
            );
            world.destroy(&instantiated.root);
            return None;
        };
        let channel = self.channels.get_mut(&entity_id)?;

        let registered: Vec<(ObjectRef, ObjectHandle)> = channel.object_refs().collect();
        for (object_ref, object) in &registered {
            self.object_refs.register(*object_ref, *object);
        }
        debug!(
            "Constructing entity {} ({}) with {} objects",
            entity_id,
            describe(spawn_data),
            registered.len()
        );

        for data in &record.components {
            let Some(binding) = self.bindings.get(&data.component_id) else {
                warn!(
                    "Entity {} carries unbound component {}, skipping",
                    entity_id, data.component_id
                );
                continue;
            };
            if !binding.role.carries_properties() {
                continue;
            }
            let Some(object) = channel.object_at(binding.offset) else {
                warn!(
                    "Entity {} has no object at offset {} for component {}",
                    entity_id, binding.offset, data.component_id
                );
                continue;
            };

            let pair = channel.pair(object);
            if let Err(error) = self.update_resolver.apply_update(
                world,
                &*self.object_refs,
                pair,
                binding.role,
                data.component_id,
                &data.payload,
            ) {
                warn!(
                    "Discarding component {} of entity {}: {}",
                    data.component_id, entity_id, error
                );
            }
        }

        let root = channel.root();
        world.finalize(&root);

        info!("Constructed entity {} on channel {:?}", entity_id, channel_handle);
        self.events.push(ReceiverEvent::EntityConstructed {
            entity_id,
            object: root,
        });

        for (component_id, authority) in &record.pending_authority {
            channel.set_authority(*component_id, *authority);
            let target = self
                .bindings
                .get(component_id)
                .and_then(|binding| channel.object_at(binding.offset))
                .unwrap_or(root);
            world.on_authority_change(&target, *component_id, *authority);
            self.events.push(ReceiverEvent::AuthorityChanged {
                entity_id,
                component_id: *component_id,
                authority: *authority,
            });
        }

        Some(registered)
    }
}

fn describe(spawn_data: &SpawnData) -> String {
    match (&spawn_data.stable_path, &spawn_data.container) {
        (Some(path), _) => format!("{} at `{}`", spawn_data.class, path),
        (None, Some(container)) => format!("{} in {}", spawn_data.class, container),
        (None, None) => spawn_data.class.clone(),
    }
}
