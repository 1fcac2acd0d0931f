use std::collections::HashSet;

use crate::ObjectRef;

pub type FunctionIndex = u32;

/// An encoded remote-procedure invocation: which function, and the argument
/// bits as received.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RpcInvocation {
    pub function: FunctionIndex,
    pub payload: Vec<u8>,
    pub bit_length: u64,
}

impl RpcInvocation {
    pub fn new(function: FunctionIndex, payload: Vec<u8>) -> Self {
        let bit_length = payload.len() as u64 * 8;
        Self {
            function,
            payload,
            bit_length,
        }
    }
}

/// An invocation decoded from a command request or multicast update, with the
/// argument references that were not yet local at decode time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReadRpc {
    pub invocation: RpcInvocation,
    pub unresolved_refs: HashSet<ObjectRef>,
}

impl ReadRpc {
    pub fn ready(invocation: RpcInvocation) -> Self {
        Self {
            invocation,
            unresolved_refs: HashSet::new(),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.unresolved_refs.is_empty()
    }
}
