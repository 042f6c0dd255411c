use crate::promise::WeakPromise;
use crate::{Reason, Value};

/// The observable state of a promise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Pending,
    Resolved,
    Rejected,
}

/// What a promise currently holds.
///
/// `Linked` is the adoption state: a handler returned another promise and
/// this one now waits for it. It reads as [`State::Pending`], but it is not
/// open to external settlement.
#[derive(Debug, Clone, Default)]
pub(crate) enum Settlement {
    #[default]
    Pending,
    Linked(WeakPromise),
    Resolved(Value),
    Rejected(Reason),
}

impl Settlement {
    pub(crate) fn state(&self) -> State {
        match self {
            Settlement::Pending | Settlement::Linked(_) => State::Pending,
            Settlement::Resolved(_) => State::Resolved,
            Settlement::Rejected(_) => State::Rejected,
        }
    }

    /// Open to `resolve`/`reject` from outside the chain.
    pub(crate) fn is_open(&self) -> bool {
        matches!(self, Settlement::Pending)
    }

    /// The settled outcome, `None` while pending or linked.
    pub(crate) fn outcome(&self) -> Option<Result<Value, Reason>> {
        match self {
            Settlement::Resolved(value) => Some(Ok(value.clone())),
            Settlement::Rejected(reason) => Some(Err(reason.clone())),
            Settlement::Pending | Settlement::Linked(_) => None,
        }
    }

    pub(crate) fn from_outcome(outcome: Result<Value, Reason>) -> Self {
        match outcome {
            Ok(Value::Promise(_)) => Settlement::Rejected(Reason::resolved_with_promise()),
            Ok(value) => Settlement::Resolved(value),
            Err(reason) => Settlement::Rejected(reason),
        }
    }
}
