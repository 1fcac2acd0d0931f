use crate::{
    handle::ObjectHandle,
    types::{ContainerId, ObjectOffset},
};

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Location {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Location {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rotation {
    pub pitch: f32,
    pub yaw: f32,
    pub roll: f32,
}

impl Rotation {
    pub fn new(pitch: f32, yaw: f32, roll: f32) -> Self {
        Self { pitch, yaw, roll }
    }
}

/// Everything needed to pick a template and build the local object for an
/// entity, decoded from its spawn components.
#[derive(Clone, Debug, PartialEq)]
pub struct SpawnData {
    pub class: String,
    pub location: Location,
    pub rotation: Rotation,
    /// Path of a pre-placed object to adopt instead of spawning a new one.
    pub stable_path: Option<String>,
    /// Streaming container the spawn point lives in, if any.
    pub container: Option<ContainerId>,
}

impl SpawnData {
    pub fn new(class: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            location: Location::default(),
            rotation: Rotation::default(),
            stable_path: None,
            container: None,
        }
    }

    pub fn with_transform(mut self, location: Location, rotation: Rotation) -> Self {
        self.location = location;
        self.rotation = rotation;
        self
    }

    pub fn with_stable_path(mut self, path: impl Into<String>) -> Self {
        self.stable_path = Some(path.into());
        self
    }

    pub fn in_container(mut self, container: ContainerId) -> Self {
        self.container = Some(container);
        self
    }
}

/// The local objects a world built for one entity: the root, plus any
/// sub-objects addressable by offset.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InstantiatedObject {
    pub root: ObjectHandle,
    pub subobjects: Vec<(ObjectOffset, ObjectHandle)>,
}

impl InstantiatedObject {
    pub fn new(root: ObjectHandle) -> Self {
        Self {
            root,
            subobjects: Vec::new(),
        }
    }

    pub fn with_subobject(mut self, offset: ObjectOffset, handle: ObjectHandle) -> Self {
        self.subobjects.push((offset, handle));
        self
    }
}
