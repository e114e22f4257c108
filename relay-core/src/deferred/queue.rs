use std::{collections::VecDeque, fmt};

use crate::Result;

use super::GenericDeferred;

/// An ordered queue of deferred calls of any signature.
///
/// Calls are dispatched in the order they were pushed. Dispatching stops at
/// the first call that fails.
#[derive(Default)]
pub struct DeferredQueue {
    pending: VecDeque<Box<dyn GenericDeferred>>,
}

impl DeferredQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a deferred call to the back of the queue.
    pub fn push<D: GenericDeferred>(&mut self, deferred: D) {
        self.push_boxed(Box::new(deferred));
    }

    /// Adds an already boxed deferred call to the back of the queue.
    pub fn push_boxed(&mut self, deferred: Box<dyn GenericDeferred>) {
        self.pending.push_back(deferred);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Returns an iterator over the queued calls, front first.
    pub fn iter(&self) -> impl Iterator<Item = &dyn GenericDeferred> {
        self.pending.iter().map(AsRef::as_ref)
    }

    /// Dispatches every queued call and keeps them queued.
    ///
    /// # Errors
    ///
    /// Returns the error of the first call that fails. Calls after it are not
    /// dispatched.
    pub fn dispatch_all(&self) -> Result<()> {
        crate::trace!("dispatching {} deferred calls", self.pending.len());
        self.pending
            .iter()
            .try_for_each(|deferred| deferred.dispatch_erased())
    }

    /// Dispatches queued calls front to back, removing each one that succeeds.
    ///
    /// Returns the number of calls dispatched.
    ///
    /// # Errors
    ///
    /// Returns the error of the first call that fails. The failing call stays
    /// at the front of the queue, followed by every call that was not reached.
    pub fn drain_dispatch(&mut self) -> Result<usize> {
        let mut dispatched = 0;
        while let Some(deferred) = self.pending.front() {
            if let Err(error) = deferred.dispatch_erased() {
                crate::debug!("deferred call failed after {dispatched} dispatched: {error}");
                return Err(error);
            }
            self.pending.pop_front();
            dispatched += 1;
        }
        Ok(dispatched)
    }

    /// Removes and drops every queued call.
    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

impl fmt::Debug for DeferredQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeferredQueue")
            .field("len", &self.pending.len())
            .finish()
    }
}

impl<D: GenericDeferred> Extend<D> for DeferredQueue {
    fn extend<T: IntoIterator<Item = D>>(&mut self, iter: T) {
        for deferred in iter {
            self.push(deferred);
        }
    }
}
