use crate::continuation::Continuation;
use std::collections::VecDeque;

/// The continuations waiting on one promise.
///
/// Entries leave in registration order, except that Finally entries wait
/// until no other entry is queued. Dequeuing the first non-Finally entry is
/// the same as stably sorting Finally entries last and popping the head, and
/// it keeps holding when handlers append to the chain mid-drain.
#[derive(Debug, Default)]
pub(crate) struct Chain {
    entries: VecDeque<Continuation>,
}

impl Chain {
    pub(crate) fn push(&mut self, continuation: Continuation) {
        self.entries.push_back(continuation);
    }

    pub(crate) fn dequeue(&mut self) -> Option<Continuation> {
        match self.entries.iter().position(|c| !c.is_finally()) {
            Some(index) => self.entries.remove(index),
            None => self.entries.pop_front(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}
