use std::collections::{BTreeMap, HashSet};

use crate::{
    types::{ObjectOffset, RepIndex},
    ObjectRef,
};

/// Unresolved references at each structural position of a replicated object,
/// keyed by field offset (or by element index, inside an array).
pub type ObjectReferencesMap = BTreeMap<ObjectOffset, ObjectReferenceSet>;

/// The references still outstanding at one structural position.
///
/// The shape is fixed when the set is built and never changes afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ObjectReferenceSet {
    /// A single object-reference field.
    Single {
        rep_index: RepIndex,
        object_ref: ObjectRef,
    },
    /// A struct-shaped field whose serialized form is replayed once the
    /// references inside it resolve.
    Struct {
        rep_index: RepIndex,
        buffer: Vec<u8>,
        bit_length: u32,
        unresolved_refs: HashSet<ObjectRef>,
    },
    /// An array field; each element keeps its own set.
    Array {
        rep_index: RepIndex,
        elements: ObjectReferencesMap,
    },
}

impl ObjectReferenceSet {
    pub fn single(rep_index: RepIndex, object_ref: ObjectRef) -> Self {
        Self::Single {
            rep_index,
            object_ref,
        }
    }

    pub fn structured(
        rep_index: RepIndex,
        buffer: Vec<u8>,
        bit_length: u32,
        unresolved_refs: HashSet<ObjectRef>,
    ) -> Self {
        Self::Struct {
            rep_index,
            buffer,
            bit_length,
            unresolved_refs,
        }
    }

    pub fn array(rep_index: RepIndex, elements: ObjectReferencesMap) -> Self {
        Self::Array {
            rep_index,
            elements,
        }
    }

    pub fn rep_index(&self) -> RepIndex {
        match self {
            Self::Single { rep_index, .. }
            | Self::Struct { rep_index, .. }
            | Self::Array { rep_index, .. } => *rep_index,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Single { .. } => "Single",
            Self::Struct { .. } => "Struct",
            Self::Array { .. } => "Array",
        }
    }

    /// Adds every reference this set is still waiting on to `output`.
    pub fn collect_refs(&self, output: &mut HashSet<ObjectRef>) {
        match self {
            Self::Single { object_ref, .. } => {
                output.insert(*object_ref);
            }
            Self::Struct {
                unresolved_refs, ..
            } => {
                output.extend(unresolved_refs.iter().copied());
            }
            Self::Array { elements, .. } => {
                for element in elements.values() {
                    element.collect_refs(output);
                }
            }
        }
    }

    pub fn refs(&self) -> HashSet<ObjectRef> {
        let mut output = HashSet::new();
        self.collect_refs(&mut output);
        output
    }

    pub fn contains_ref(&self, target: &ObjectRef) -> bool {
        match self {
            Self::Single { object_ref, .. } => object_ref == target,
            Self::Struct {
                unresolved_refs, ..
            } => unresolved_refs.contains(target),
            Self::Array { elements, .. } => {
                elements.values().any(|element| element.contains_ref(target))
            }
        }
    }

    /// True once nothing in the set is outstanding.
    pub fn is_resolved(&self) -> bool {
        match self {
            Self::Single { .. } => false,
            Self::Struct {
                unresolved_refs, ..
            } => unresolved_refs.is_empty(),
            Self::Array { elements, .. } => elements.is_empty(),
        }
    }
}

/// Every reference any set in `map` is still waiting on.
pub fn collect_map_refs(map: &ObjectReferencesMap) -> HashSet<ObjectRef> {
    let mut output = HashSet::new();
    for set in map.values() {
        set.collect_refs(&mut output);
    }
    output
}
