use std::collections::BTreeSet;

use log::{info, warn};

use fabric_shared::{
    ComponentId, ComponentRole, ObjectHandle, ObjectOffset, ObjectRef, ObjectRefResolver,
    ObjectReferenceSet, ObjectReferencesMap, ObjectWorld, RepIndex, SchemaError,
};

use crate::{
    resolve::reference_registry::ReferenceRegistry,
    world::actor_channel::{ChannelHandle, ChannelObjectPair},
};

/// Writes property payloads into local objects and replays the parts that
/// referenced objects which were not local yet.
#[derive(Default)]
pub struct UpdateResolver {
    registry: ReferenceRegistry,
}

impl UpdateResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn registry(&self) -> &ReferenceRegistry {
        &self.registry
    }

    /// Writes `payload` into the object of `pair` and records every position
    /// that still points at an unresolved reference.
    ///
    /// Positions the payload overwrites replace whatever was parked for them.
    /// Positions that were parked and are now resolved get a single changed
    /// notification.
    pub fn apply_update<W: ObjectWorld>(
        &mut self,
        world: &mut W,
        resolver: &dyn ObjectRefResolver,
        pair: ChannelObjectPair,
        role: ComponentRole,
        component_id: ComponentId,
        payload: &[u8],
    ) -> Result<(), SchemaError> {
        let applied = world.apply_component(&pair.object, role, component_id, payload, resolver)?;

        let mut map = self.registry.take_unresolved(&pair);
        let mut changed = BTreeSet::new();
        for offset in &applied.written {
            if applied.unresolved.contains_key(offset) {
                continue;
            }
            if let Some(previous) = map.remove(offset) {
                changed.insert(previous.rep_index());
            }
        }
        for (offset, set) in applied.unresolved {
            map.insert(offset, set);
        }
        self.registry.store(pair, map);

        if !changed.is_empty() {
            let rep_indices: Vec<RepIndex> = changed.into_iter().collect();
            world.notify_changed(&pair.object, &rep_indices);
        }

        Ok(())
    }

    /// Replays every parked position that waits on `object_ref`, now that it
    /// resolves to `resolved`.
    ///
    /// Returns the pairs left with nothing unresolved. Pairs whose object was
    /// destroyed in the meantime are dropped here. Resolving a reference
    /// nobody waits on does nothing.
    pub fn resolve<W: ObjectWorld>(
        &mut self,
        world: &mut W,
        resolver: &dyn ObjectRefResolver,
        object_ref: &ObjectRef,
        resolved: &ObjectHandle,
    ) -> Vec<ChannelObjectPair> {
        let mut fully_resolved = Vec::new();

        for pair in self.registry.subscribers(object_ref) {
            if !world.is_alive(&pair.object) {
                info!(
                    "Object {:?} of entity {} was destroyed while waiting on {}",
                    pair.object, pair.channel.entity_id, object_ref
                );
                self.registry.remove_pair(&pair);
                continue;
            }

            let mut map = self.registry.take_unresolved(&pair);
            let mut changed = BTreeSet::new();
            let mut path = Vec::new();
            resolve_map(
                world,
                resolver,
                &pair.object,
                &mut map,
                &mut path,
                object_ref,
                resolved,
                &mut changed,
            );
            let now_resolved = map.is_empty();
            self.registry.store(pair, map);

            if !changed.is_empty() {
                let rep_indices: Vec<RepIndex> = changed.into_iter().collect();
                world.notify_changed(&pair.object, &rep_indices);
            }
            if now_resolved {
                fully_resolved.push(pair);
            }
        }

        fully_resolved
    }

    /// Forgets every pair of a closed channel.
    pub fn remove_channel(&mut self, channel: &ChannelHandle) -> usize {
        self.registry.remove_channel(channel)
    }
}

/// Replays `map` against `target` resolving to `resolved`, removing every
/// position that no longer waits on anything.
#[allow(clippy::too_many_arguments)]
fn resolve_map<W: ObjectWorld>(
    world: &mut W,
    resolver: &dyn ObjectRefResolver,
    object: &ObjectHandle,
    map: &mut ObjectReferencesMap,
    path: &mut Vec<ObjectOffset>,
    target: &ObjectRef,
    resolved: &ObjectHandle,
    changed: &mut BTreeSet<RepIndex>,
) {
    let mut finished = Vec::new();

    for (offset, set) in map.iter_mut() {
        if !set.contains_ref(target) {
            continue;
        }
        path.push(*offset);

        match set {
            ObjectReferenceSet::Single { rep_index, .. } => {
                if let Err(error) = world.write_reference(object, path, resolved) {
                    warn!("Dropping reference at {:?}: {}", path, error);
                } else {
                    changed.insert(*rep_index);
                }
                finished.push(*offset);
            }
            ObjectReferenceSet::Struct {
                rep_index,
                buffer,
                bit_length,
                unresolved_refs,
            } => match world.reapply_struct(object, path, buffer, *bit_length, resolver) {
                Ok(remaining) => {
                    changed.insert(*rep_index);
                    *unresolved_refs = remaining;
                    if unresolved_refs.is_empty() {
                        finished.push(*offset);
                    }
                }
                Err(error) => {
                    warn!("Dropping struct at {:?}: {}", path, error);
                    finished.push(*offset);
                }
            },
            ObjectReferenceSet::Array {
                rep_index,
                elements,
            } => {
                let mut element_changes = BTreeSet::new();
                resolve_map(
                    world,
                    resolver,
                    object,
                    elements,
                    path,
                    target,
                    resolved,
                    &mut element_changes,
                );
                if !element_changes.is_empty() {
                    changed.insert(*rep_index);
                }
                if elements.is_empty() {
                    finished.push(*offset);
                }
            }
        }

        path.pop();
    }

    for offset in finished {
        map.remove(&offset);
    }
}
