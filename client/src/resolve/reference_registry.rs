use std::collections::{BTreeSet, HashMap, HashSet};

use fabric_shared::{collect_map_refs, ObjectRef, ObjectReferencesMap};

use crate::world::actor_channel::{ChannelHandle, ChannelObjectPair};

/// Who is waiting on which reference.
///
/// `incoming_refs` maps a reference to every pair with at least one field that
/// still points at it. `unresolved` holds, per pair, the structural positions
/// that are still unresolved. A pair is only present in either map while it
/// has something outstanding.
#[derive(Default)]
pub struct ReferenceRegistry {
    incoming_refs: HashMap<ObjectRef, BTreeSet<ChannelObjectPair>>,
    unresolved: HashMap<ChannelObjectPair, ObjectReferencesMap>,
    pair_refs: HashMap<ChannelObjectPair, HashSet<ObjectRef>>,
}

impl ReferenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pairs subscribed to `object_ref`, in a stable order.
    pub fn subscribers(&self, object_ref: &ObjectRef) -> Vec<ChannelObjectPair> {
        self.incoming_refs
            .get(object_ref)
            .map(|pairs| pairs.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn is_subscribed(&self, object_ref: &ObjectRef, pair: &ChannelObjectPair) -> bool {
        self.incoming_refs
            .get(object_ref)
            .map(|pairs| pairs.contains(pair))
            .unwrap_or(false)
    }

    pub fn unresolved(&self, pair: &ChannelObjectPair) -> Option<&ObjectReferencesMap> {
        self.unresolved.get(pair)
    }

    /// References `pair` is still waiting on.
    pub fn refs_of(&self, pair: &ChannelObjectPair) -> HashSet<ObjectRef> {
        self.pair_refs.get(pair).cloned().unwrap_or_default()
    }

    /// Takes the unresolved positions of `pair` out for replay. The pair's
    /// subscriptions stay in place until [`store`](Self::store) is called.
    pub(crate) fn take_unresolved(&mut self, pair: &ChannelObjectPair) -> ObjectReferencesMap {
        self.unresolved.remove(pair).unwrap_or_default()
    }

    /// Replaces the unresolved positions of `pair` and brings the reverse
    /// index in line with them.
    pub(crate) fn store(&mut self, pair: ChannelObjectPair, map: ObjectReferencesMap) {
        let current = collect_map_refs(&map);
        let previous = self.pair_refs.remove(&pair).unwrap_or_default();

        for object_ref in previous.difference(&current) {
            self.unsubscribe(object_ref, &pair);
        }
        for object_ref in current.difference(&previous) {
            self.incoming_refs
                .entry(*object_ref)
                .or_default()
                .insert(pair);
        }

        if map.is_empty() {
            self.unresolved.remove(&pair);
        } else {
            self.unresolved.insert(pair, map);
            self.pair_refs.insert(pair, current);
        }
    }

    /// Forgets every subscription of `pair`.
    pub(crate) fn remove_pair(&mut self, pair: &ChannelObjectPair) {
        self.unresolved.remove(pair);
        if let Some(refs) = self.pair_refs.remove(pair) {
            for object_ref in &refs {
                self.unsubscribe(object_ref, pair);
            }
        }
    }

    /// Forgets every pair replicated through `channel`. Returns how many there
    /// were.
    pub(crate) fn remove_channel(&mut self, channel: &ChannelHandle) -> usize {
        let pairs: Vec<ChannelObjectPair> = self
            .pair_refs
            .keys()
            .filter(|pair| pair.channel == *channel)
            .copied()
            .collect();
        for pair in &pairs {
            self.remove_pair(pair);
        }
        pairs.len()
    }

    fn unsubscribe(&mut self, object_ref: &ObjectRef, pair: &ChannelObjectPair) {
        let mut now_empty = false;
        if let Some(pairs) = self.incoming_refs.get_mut(object_ref) {
            pairs.remove(pair);
            now_empty = pairs.is_empty();
        }
        if now_empty {
            self.incoming_refs.remove(object_ref);
        }
    }

    /// Number of distinct references something is waiting on.
    pub fn pending_ref_count(&self) -> usize {
        self.incoming_refs.len()
    }

    /// Number of pairs with at least one unresolved position.
    pub fn unresolved_pair_count(&self) -> usize {
        self.unresolved.len()
    }

    pub fn is_empty(&self) -> bool {
        self.incoming_refs.is_empty() && self.unresolved.is_empty()
    }
}
