use crate::{Promise, Reason, Value};
use std::future::{Future, IntoFuture};
use std::pin::Pin;
use std::task::{Context, Poll};

/// Resolves once the promise has settled and its chain has drained.
///
/// Awaiting does not register a continuation, so it neither handles a
/// rejection nor changes the value later handlers see.
///
/// # Examples
///
/// ```
/// use promise_chain::{Promise, Value};
/// use futures::executor::block_on;
///
/// let (promise, resolver) = Promise::pending();
/// resolver.resolve("Hi")?;
/// assert_eq!(block_on(promise.settled()), Ok(Value::from("Hi")));
/// # Ok::<(), promise_chain::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct Settled {
    promise: Promise,
}

impl Future for Settled {
    type Output = Result<Value, Reason>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.promise.outcome() {
            Some(outcome) => Poll::Ready(outcome),
            None => {
                self.promise.add_waker(cx.waker());
                Poll::Pending
            }
        }
    }
}

impl Promise {
    pub fn settled(&self) -> Settled {
        Settled {
            promise: self.clone(),
        }
    }
}

impl IntoFuture for Promise {
    type Output = Result<Value, Reason>;
    type IntoFuture = Settled;

    fn into_future(self) -> Self::IntoFuture {
        Settled { promise: self }
    }
}
