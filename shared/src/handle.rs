use log::warn;

/// Weak, generation-checked reference to a local object.
///
/// Holding a handle never keeps the object alive. Once the slot it points to is
/// released the generation moves on, and every outstanding handle to the old
/// occupant stops resolving.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectHandle {
    index: u32,
    generation: u32,
}

impl ObjectHandle {
    pub fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

struct Slot {
    generation: u32,
    occupied: bool,
}

/// Generational slot allocator for [`ObjectHandle`]s.
///
/// Worlds embedding the receiver may use this to hand out handles whose
/// liveness can be checked cheaply.
pub struct HandleAllocator {
    slots: Vec<Slot>,
    free_indices: Vec<u32>,
    live_count: usize,
}

impl Default for HandleAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl HandleAllocator {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_indices: Vec::new(),
            live_count: 0,
        }
    }

    pub fn allocate(&mut self) -> ObjectHandle {
        self.live_count += 1;

        if let Some(index) = self.free_indices.pop() {
            let slot = &mut self.slots[index as usize];
            slot.occupied = true;
            return ObjectHandle::new(index, slot.generation);
        }

        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            occupied: true,
        });
        ObjectHandle::new(index, 0)
    }

    /// Releases the slot behind `handle`. Returns false if the handle was
    /// already stale.
    pub fn release(&mut self, handle: &ObjectHandle) -> bool {
        if !self.is_alive(handle) {
            warn!("Attempted to release stale object handle {:?}", handle);
            return false;
        }

        let slot = &mut self.slots[handle.index as usize];
        slot.occupied = false;
        slot.generation = slot.generation.wrapping_add(1);
        self.free_indices.push(handle.index);
        self.live_count -= 1;
        true
    }

    pub fn is_alive(&self, handle: &ObjectHandle) -> bool {
        match self.slots.get(handle.index as usize) {
            Some(slot) => slot.occupied && slot.generation == handle.generation,
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.live_count
    }

    pub fn is_empty(&self) -> bool {
        self.live_count == 0
    }
}
