use log::{debug, warn};

use fabric_shared::{Authority, ComponentData, ComponentId, EntityId, ObjectHandle, ObjectRef};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingAddComponent {
    pub entity_id: EntityId,
    pub data: ComponentData,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PendingAuthorityChange {
    pub entity_id: EntityId,
    pub component_id: ComponentId,
    pub authority: Authority,
}

/// A resolution reported while a section was open.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QueuedResolution {
    pub object: ObjectHandle,
    pub object_ref: ObjectRef,
}

/// Everything buffered between the outermost enter and leave.
///
/// The receiver drains it in field order: removals, additions, authority,
/// then resolutions.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CriticalSectionBatch {
    pub removed_entities: Vec<EntityId>,
    pub added_entities: Vec<EntityId>,
    pub added_components: Vec<PendingAddComponent>,
    pub authority_changes: Vec<PendingAuthorityChange>,
    pub resolutions: Vec<QueuedResolution>,
}

impl CriticalSectionBatch {
    pub fn is_empty(&self) -> bool {
        self.removed_entities.is_empty()
            && self.added_entities.is_empty()
            && self.added_components.is_empty()
            && self.authority_changes.is_empty()
            && self.resolutions.is_empty()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SectionState {
    Idle,
    InSection { depth: u32 },
}

/// Groups the operations the transport delivers as one burst so that none of
/// them is observed until the burst is complete.
pub struct CriticalSectionBatcher {
    state: SectionState,
    batch: CriticalSectionBatch,
}

impl Default for CriticalSectionBatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl CriticalSectionBatcher {
    pub fn new() -> Self {
        Self {
            state: SectionState::Idle,
            batch: CriticalSectionBatch::default(),
        }
    }

    pub fn in_critical_section(&self) -> bool {
        matches!(self.state, SectionState::InSection { .. })
    }

    pub fn depth(&self) -> u32 {
        match self.state {
            SectionState::Idle => 0,
            SectionState::InSection { depth } => depth,
        }
    }

    /// Opens a section. Nested enters continue the outer one.
    pub fn enter(&mut self) {
        self.state = match self.state {
            SectionState::Idle => SectionState::InSection { depth: 1 },
            SectionState::InSection { depth } => {
                debug!("Nested critical section at depth {}", depth + 1);
                SectionState::InSection { depth: depth + 1 }
            }
        };
    }

    /// Closes a section. Only the outermost leave yields the batch; the
    /// batcher is idle again by the time it is returned.
    pub fn leave(&mut self) -> Option<CriticalSectionBatch> {
        match self.state {
            SectionState::Idle => {
                warn!("Received critical section end without a matching start");
                None
            }
            SectionState::InSection { depth } if depth > 1 => {
                self.state = SectionState::InSection { depth: depth - 1 };
                None
            }
            SectionState::InSection { .. } => {
                self.state = SectionState::Idle;
                Some(std::mem::take(&mut self.batch))
            }
        }
    }

    pub fn buffer_add_entity(&mut self, entity_id: EntityId) {
        self.batch.added_entities.push(entity_id);
    }

    /// Buffers a removal. If the same burst added the entity, that add is
    /// cancelled together with everything buffered for it.
    pub fn buffer_remove_entity(&mut self, entity_id: EntityId) {
        let batch = &mut self.batch;
        if batch.added_entities.contains(&entity_id) {
            debug!(
                "Entity {} was added and removed in the same critical section",
                entity_id
            );
            batch.added_entities.retain(|added| *added != entity_id);
            batch
                .added_components
                .retain(|pending| pending.entity_id != entity_id);
            batch
                .authority_changes
                .retain(|pending| pending.entity_id != entity_id);
        }
        if !batch.removed_entities.contains(&entity_id) {
            batch.removed_entities.push(entity_id);
        }
    }

    pub fn buffer_add_component(&mut self, entity_id: EntityId, data: ComponentData) {
        self.batch
            .added_components
            .push(PendingAddComponent { entity_id, data });
    }

    pub fn buffer_authority_change(
        &mut self,
        entity_id: EntityId,
        component_id: ComponentId,
        authority: Authority,
    ) {
        self.batch.authority_changes.push(PendingAuthorityChange {
            entity_id,
            component_id,
            authority,
        });
    }

    pub fn buffer_resolution(&mut self, object: ObjectHandle, object_ref: ObjectRef) {
        self.batch
            .resolutions
            .push(QueuedResolution { object, object_ref });
    }

    /// What has been buffered so far in the open section.
    pub fn pending(&self) -> &CriticalSectionBatch {
        &self.batch
    }
}
