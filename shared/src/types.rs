use std::fmt;

pub type EntityId = i64;
pub type ComponentId = u32;
pub type RequestId = i64;
pub type CommandIndex = u32;
pub type ObjectOffset = u32;
pub type RepIndex = u16;

/// Identifies a streaming container (a sub-level that loads independently of
/// the world it belongs to).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContainerId(String);

impl ContainerId {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A contiguous block of entity ids handed out by a reservation request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EntityIdRange {
    pub first: EntityId,
    pub count: u32,
}

impl EntityIdRange {
    pub fn new(first: EntityId, count: u32) -> Self {
        Self { first, count }
    }

    pub fn single(entity_id: EntityId) -> Self {
        Self::new(entity_id, 1)
    }

    pub fn contains(&self, entity_id: EntityId) -> bool {
        entity_id >= self.first && entity_id < self.first + self.count as i64
    }

    pub fn iter(&self) -> impl Iterator<Item = EntityId> {
        let first = self.first;
        (0..self.count as i64).map(move |i| first + i)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Authority {
    NotAuthoritative,
    Authoritative,
    AuthorityLossImminent,
}

impl Authority {
    pub fn is_authoritative(self) -> bool {
        match self {
            Authority::Authoritative | Authority::AuthorityLossImminent => true,
            Authority::NotAuthoritative => false,
        }
    }
}
