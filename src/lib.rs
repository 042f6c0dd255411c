//! Single-threaded promises whose continuations run in a fixed order,
//! exactly once, with rejections travelling down the chain until a handler
//! claims them.
//!
//! A [`Promise`] owns its chain: `then`, `catch` and `finally` append to it
//! and drain it right away when the promise has already settled. Handlers
//! declare the type they accept ([`TypeTag`]), so a run of `catch_kind`
//! calls behaves as a typed multi-catch. A [`Deferred`] pairs a promise
//! with processes that a [`Driver`] (or any loop of your own) calls until
//! the work is done.
//!
//! There are no threads and no timers: a promise only moves when someone
//! settles it, waits on it, or drives its deferred.
use std::time::Duration;

mod chain;
mod continuation;
mod deferred;
mod dispatch;
mod driver;
mod future;
mod promise;
mod reason;
mod settlement;
mod value;
mod wait;

pub use continuation::Kind;
pub use deferred::{Deferred, Spawned};
pub use dispatch::TypeTag;
pub use driver::{Driver, DriverConfig};
pub use future::Settled;
pub use promise::{Promise, Resolver};
pub use reason::{ErrorKind, Reason};
pub use settlement::State;
pub use value::Value;
pub use wait::WaitOptions;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// A drain finished with a rejection no handler claimed.
    #[error("unhandled rejection: {0}")]
    Unhandled(Reason),
    /// `wait(true)` found the promise rejected.
    #[error("promise rejected: {0}")]
    Rejected(Reason),
    #[error("Promise::wait() is only possible when a wait task is set")]
    WaitTaskNotSet,
    #[error("the wait task called wait() on its own promise")]
    ReentrantWait,
    #[error("promise still pending after waiting {0:?}")]
    WaitTimedOut(Duration),
    #[error("driver stopped after {0} ticks with work remaining")]
    TickLimit(u64),
}

impl Error {
    /// The rejection behind this error, if there is one.
    pub fn reason(&self) -> Option<&Reason> {
        match self {
            Error::Unhandled(reason) | Error::Rejected(reason) => Some(reason),
            _ => None,
        }
    }
}
