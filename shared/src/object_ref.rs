use std::fmt;

use crate::types::{EntityId, ObjectOffset};

/// Remote identity of a replicated object: the entity it belongs to, plus the
/// offset of the sub-object inside that entity.
///
/// Offset `0` always addresses the entity's root object.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectRef {
    entity: EntityId,
    offset: ObjectOffset,
}

impl ObjectRef {
    pub const ROOT_OFFSET: ObjectOffset = 0;

    pub fn new(entity: EntityId, offset: ObjectOffset) -> Self {
        Self { entity, offset }
    }

    pub fn root(entity: EntityId) -> Self {
        Self::new(entity, Self::ROOT_OFFSET)
    }

    pub fn entity(&self) -> EntityId {
        self.entity
    }

    pub fn offset(&self) -> ObjectOffset {
        self.offset
    }

    pub fn is_root(&self) -> bool {
        self.offset == Self::ROOT_OFFSET
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}:{})", self.entity, self.offset)
    }
}
