//! Request/response correlation. Each outstanding request holds a message id
//! mapped to a single-shot result slot; replies resolve exactly one slot, in
//! whatever order they arrive.

use crate::error::LdapError;
use crate::proto::ProtocolOp;
use std::collections::HashMap;
use tokio::sync::oneshot;

pub type ResponseSlot = oneshot::Receiver<Result<ProtocolOp, LdapError>>;

#[derive(Debug, Default)]
pub struct Correlator {
    next_id: i32,
    pending: HashMap<i32, oneshot::Sender<Result<ProtocolOp, LdapError>>>,
    closed: bool,
}

impl Correlator {
    pub fn new() -> Self {
        Self {
            next_id: 0,
            pending: HashMap::new(),
            closed: false,
        }
    }

    /// Allocate a fresh message id. Ids start at 1 and increment; on reaching
    /// `i32::MAX` the counter wraps back to 1, skipping ids that are still
    /// pending (id 0 is reserved for unsolicited notifications by RFC 4511).
    pub fn next_id(&mut self) -> i32 {
        loop {
            self.next_id = if self.next_id == i32::MAX {
                1
            } else {
                self.next_id + 1
            };
            if !self.pending.contains_key(&self.next_id) {
                return self.next_id;
            }
        }
    }

    /// Register a pending slot for `id`. The id must come from `next_id`, so
    /// no two in-flight requests can share one. Refused once the correlator
    /// has failed: registration and the liveness check are one decision under
    /// the correlator lock, so a slot can never be orphaned by a concurrent
    /// `fail_all`.
    pub fn register(&mut self, id: i32) -> Result<ResponseSlot, LdapError> {
        if self.closed {
            return Err(LdapError::Closed);
        }
        let (tx, rx) = oneshot::channel();
        let prev = self.pending.insert(id, tx);
        debug_assert!(prev.is_none(), "duplicate pending message id {}", id);
        Ok(rx)
    }

    /// Resolve the slot registered for `id` with a decoded reply, removing it.
    /// A reply whose waiter has been cancelled still removes the slot and is
    /// otherwise a no-op. An unknown id is a correlation error: either the
    /// server violated the protocol or our bookkeeping is broken.
    pub fn resolve(&mut self, id: i32, response: ProtocolOp) -> Result<(), LdapError> {
        match self.pending.remove(&id) {
            Some(tx) => {
                // Send failure means the caller went away (timeout/cancel);
                // the reply is dropped on the floor by design.
                let _ = tx.send(Ok(response));
                Ok(())
            }
            None => Err(LdapError::Correlation(id)),
        }
    }

    /// Remove a slot without resolving it (caller cancelled or the write
    /// failed before the request went out).
    pub fn deregister(&mut self, id: i32) {
        self.pending.remove(&id);
    }

    /// Fail every outstanding request with the same error and refuse any
    /// later `register`. Used on transport failure, framing corruption and
    /// close.
    pub fn fail_all(&mut self, err: &LdapError) {
        self.closed = true;
        for (_, tx) in self.pending.drain() {
            let _ = tx.send(Err(err.clone()));
        }
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}
