use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use log::debug;

use fabric_shared::{ComponentId, EntityId, ObjectHandle, ObjectRef, RpcInvocation};

pub type RpcHandle = u64;

/// An invocation parked until every object its arguments reference is local.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingIncomingRpc {
    pub target: ObjectHandle,
    pub entity_id: EntityId,
    pub component_id: ComponentId,
    pub invocation: RpcInvocation,
    pub unresolved_refs: HashSet<ObjectRef>,
}

impl PendingIncomingRpc {
    pub fn new(
        target: ObjectHandle,
        entity_id: EntityId,
        component_id: ComponentId,
        invocation: RpcInvocation,
        unresolved_refs: HashSet<ObjectRef>,
    ) -> Self {
        Self {
            target,
            entity_id,
            component_id,
            invocation,
            unresolved_refs,
        }
    }
}

/// Parks invocations by every reference they wait on and hands them back, in
/// the order they became ready, once the last one resolves.
#[derive(Default)]
pub struct RpcQueue {
    next_handle: RpcHandle,
    pending: HashMap<RpcHandle, PendingIncomingRpc>,
    waiting_ref_to_handles: HashMap<ObjectRef, BTreeSet<RpcHandle>>,
    ready_handles: VecDeque<RpcHandle>,
}

impl RpcQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, rpc: PendingIncomingRpc) -> RpcHandle {
        let handle = self.next_handle;
        self.next_handle = self.next_handle.wrapping_add(1);

        if rpc.unresolved_refs.is_empty() {
            self.ready_handles.push_back(handle);
        } else {
            debug!(
                "Queueing function {} on entity {} until {:?} resolve",
                rpc.invocation.function, rpc.entity_id, rpc.unresolved_refs
            );
            for object_ref in &rpc.unresolved_refs {
                self.waiting_ref_to_handles
                    .entry(*object_ref)
                    .or_default()
                    .insert(handle);
            }
        }

        self.pending.insert(handle, rpc);
        handle
    }

    /// Marks `object_ref` as resolved for every invocation waiting on it.
    /// Returns how many invocations became ready as a result.
    pub fn on_resolved(&mut self, object_ref: &ObjectRef) -> usize {
        let Some(handles) = self.waiting_ref_to_handles.remove(object_ref) else {
            return 0;
        };

        let mut newly_ready = 0;
        for handle in handles {
            let Some(rpc) = self.pending.get_mut(&handle) else {
                continue;
            };
            if rpc.unresolved_refs.remove(object_ref) && rpc.unresolved_refs.is_empty() {
                self.ready_handles.push_back(handle);
                newly_ready += 1;
            }
        }
        newly_ready
    }

    /// Removes and returns every ready invocation, oldest-ready first.
    pub fn take_ready(&mut self) -> Vec<PendingIncomingRpc> {
        let mut ready = Vec::with_capacity(self.ready_handles.len());
        while let Some(handle) = self.ready_handles.pop_front() {
            if let Some(rpc) = self.pending.remove(&handle) {
                ready.push(rpc);
            }
        }
        ready
    }

    pub fn remove(&mut self, handle: &RpcHandle) -> Option<PendingIncomingRpc> {
        let rpc = self.pending.remove(handle)?;
        for object_ref in &rpc.unresolved_refs {
            let mut now_empty = false;
            if let Some(handles) = self.waiting_ref_to_handles.get_mut(object_ref) {
                handles.remove(handle);
                now_empty = handles.is_empty();
            }
            if now_empty {
                self.waiting_ref_to_handles.remove(object_ref);
            }
        }
        self.ready_handles.retain(|ready| ready != handle);
        Some(rpc)
    }

    pub fn contains(&self, handle: &RpcHandle) -> bool {
        self.pending.contains_key(handle)
    }

    /// Number of invocations waiting on `object_ref`.
    pub fn waiting_on(&self, object_ref: &ObjectRef) -> usize {
        self.waiting_ref_to_handles
            .get(object_ref)
            .map(|handles| handles.len())
            .unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
