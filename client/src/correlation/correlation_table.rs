use std::{collections::HashMap, sync::mpsc};

use log::info;

use fabric_shared::RequestId;

use crate::error::CorrelationError;

/// Where a response goes once it arrives.
pub enum Continuation<R> {
    /// Send the response down a channel someone is receiving on.
    Channel(mpsc::Sender<R>),
    /// Invoke a completion handler with the response.
    Callback(Box<dyn FnOnce(R)>),
}

impl<R> Continuation<R> {
    pub fn callback(handler: impl FnOnce(R) + 'static) -> Self {
        Self::Callback(Box::new(handler))
    }

    pub fn deliver(self, response: R) {
        match self {
            Continuation::Channel(sender) => {
                if sender.send(response).is_err() {
                    info!("Response receiver was dropped before the response arrived");
                }
            }
            Continuation::Callback(handler) => handler(response),
        }
    }
}

impl<R> std::fmt::Debug for Continuation<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Continuation::Channel(_) => f.write_str("Continuation::Channel"),
            Continuation::Callback(_) => f.write_str("Continuation::Callback"),
        }
    }
}

/// Outstanding requests of one kind, keyed by request id.
///
/// An entry leaves the table exactly once, either when its response is taken
/// or when it is dropped, so a duplicate response never finds it.
pub struct CorrelationTable<C> {
    domain: &'static str,
    next_request_id: RequestId,
    entries: HashMap<RequestId, C>,
}

impl<C> CorrelationTable<C> {
    pub fn new(domain: &'static str) -> Self {
        Self {
            domain,
            next_request_id: 1,
            entries: HashMap::new(),
        }
    }

    pub fn domain(&self) -> &'static str {
        self.domain
    }

    /// Hands out a request id unused by this table.
    pub fn issue(&mut self) -> RequestId {
        loop {
            let request_id = self.next_request_id;
            self.next_request_id = self.next_request_id.wrapping_add(1);
            if !self.entries.contains_key(&request_id) {
                return request_id;
            }
        }
    }

    pub fn register(&mut self, request_id: RequestId, entry: C) -> Result<(), CorrelationError> {
        if self.entries.contains_key(&request_id) {
            return Err(CorrelationError::DuplicateRequest {
                domain: self.domain,
                request_id,
            });
        }
        self.entries.insert(request_id, entry);
        Ok(())
    }

    /// Removes and returns the entry for `request_id`, if one is outstanding.
    pub fn take(&mut self, request_id: &RequestId) -> Option<C> {
        let entry = self.entries.remove(request_id);
        if entry.is_none() {
            info!(
                "No pending {} request with id {}, dropping response",
                self.domain, request_id
            );
        }
        entry
    }

    /// Drops every entry matching `predicate`. Returns how many were dropped.
    pub fn drop_where(&mut self, mut predicate: impl FnMut(&C) -> bool) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !predicate(entry));
        before - self.entries.len()
    }

    pub fn contains(&self, request_id: &RequestId) -> bool {
        self.entries.contains_key(request_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
