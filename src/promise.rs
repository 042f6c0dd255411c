use crate::chain::Chain;
use crate::continuation::{Continuation, Handler, Kind};
use crate::settlement::{Settlement, State};
use crate::wait::WaitTask;
use crate::{Error, ErrorKind, Reason, TypeTag, Value};
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::task::Waker;
use tracing::{debug, trace, warn};

/// A value that may not exist yet.
///
/// `Promise` is a cheap handle; clones refer to the same promise. `then`,
/// `catch` and `finally` append to the promise's own chain and hand back
/// the same handle, so a fluent chain is one promise whose value is
/// replaced by each handler in turn.
///
/// # Examples
///
/// ```
/// use promise_chain::{Promise, Value};
/// use std::{cell::RefCell, rc::Rc};
///
/// let seen = Rc::new(RefCell::new(None));
/// let (promise, resolver) = Promise::pending();
/// let slot = seen.clone();
/// promise
///     .then(|v: Value| Ok(v.as_int().unwrap_or(0) + 1))?
///     .then(move |v: Value| {
///         *slot.borrow_mut() = v.as_int();
///         Ok(v)
///     })?;
/// resolver.resolve(5)?;
/// assert_eq!(*seen.borrow(), Some(6));
/// # Ok::<(), promise_chain::Error>(())
/// ```
#[derive(Clone)]
pub struct Promise {
    inner: Rc<RefCell<Inner>>,
}

#[derive(Default)]
pub(crate) struct Inner {
    settlement: Settlement,
    chain: Chain,
    /// Rejections a Catch answered with `Null`, or that were forwarded to
    /// an adopting promise. They stay rejected but no longer count as
    /// unhandled.
    handled: Vec<Reason>,
    draining: bool,
    pub(crate) wait_task: Option<WaitTask>,
    wakers: Vec<Waker>,
}

/// Non-owning reference held by [`Settlement::Linked`].
#[derive(Debug, Clone)]
pub(crate) struct WeakPromise(Weak<RefCell<Inner>>);

impl WeakPromise {
    fn upgrade(&self) -> Option<Promise> {
        self.0.upgrade().map(|inner| Promise { inner })
    }
}

/// The settling capabilities handed to a promise's executor.
#[derive(Clone)]
pub struct Resolver {
    promise: Promise,
}

impl Resolver {
    /// Resolve the promise and drain its chain. Ignored unless the promise
    /// is still pending; resolving with a promise rejects instead.
    pub fn resolve(&self, value: impl Into<Value>) -> Result<(), Error> {
        self.promise.settle(Ok(value.into()))
    }

    /// Reject the promise and drain its chain. Ignored unless the promise
    /// is still pending.
    pub fn reject(&self, reason: Reason) -> Result<(), Error> {
        self.promise.settle(Err(reason))
    }

    /// Drain whatever the chain holds against the current settlement.
    pub fn complete(&self) -> Result<(), Error> {
        self.promise.drain()
    }

    pub fn promise(&self) -> Promise {
        self.promise.clone()
    }
}

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver").field("promise", &self.promise).finish()
    }
}

impl Promise {
    /// Create a promise and pass its [`Resolver`] to `executor`.
    pub fn new<F>(executor: F) -> Self
    where
        F: FnOnce(Resolver),
    {
        let (promise, resolver) = Self::pending();
        executor(resolver);
        promise
    }

    pub fn pending() -> (Self, Resolver) {
        let promise = Self::with_settlement(Settlement::Pending);
        let resolver = Resolver {
            promise: promise.clone(),
        };
        (promise, resolver)
    }

    /// An already resolved promise. A promise given as the value yields a
    /// rejected one instead.
    pub fn resolved(value: impl Into<Value>) -> Self {
        Self::with_settlement(Settlement::from_outcome(Ok(value.into())))
    }

    /// An already rejected promise. Nothing is raised until a drain finds
    /// the rejection unhandled.
    pub fn rejected(reason: Reason) -> Self {
        Self::with_settlement(Settlement::Rejected(reason))
    }

    fn with_settlement(settlement: Settlement) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                settlement,
                ..Inner::default()
            })),
        }
    }

    pub fn state(&self) -> State {
        self.inner.borrow().settlement.state()
    }

    /// Whether both handles refer to the same promise.
    pub fn same(&self, other: &Promise) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn then<F, R>(&self, on_success: F) -> Result<Promise, Error>
    where
        F: FnMut(Value) -> Result<R, Reason> + 'static,
        R: Into<Value>,
    {
        self.then_as(TypeTag::Any, on_success)
    }

    /// `then` with a declared parameter type; values of another type skip
    /// the handler.
    ///
    /// A Then is never called with [`Value::Null`], whatever it declares:
    /// `TypeTag::Null` and `TypeTag::Nullable(_)` only widen what a Catch or
    /// Finally accepts.
    pub fn then_as<F, R>(&self, accepts: TypeTag, on_success: F) -> Result<Promise, Error>
    where
        F: FnMut(Value) -> Result<R, Reason> + 'static,
        R: Into<Value>,
    {
        self.register(Continuation::then(Handler::new(accepts, on_success)))
    }

    /// A Then carrying both handlers. A failure thrown by `on_success` is
    /// not seen by `on_failure`; it goes to the continuations after this one.
    pub fn then_with<F, R, G, S>(&self, on_success: F, on_failure: G) -> Result<Promise, Error>
    where
        F: FnMut(Value) -> Result<R, Reason> + 'static,
        R: Into<Value>,
        G: FnMut(Reason) -> Result<S, Reason> + 'static,
        S: Into<Value>,
    {
        self.register(Continuation::then_with(
            Handler::new(TypeTag::Any, on_success),
            Handler::for_reason(TypeTag::Any, on_failure),
        ))
    }

    pub fn catch<F, R>(&self, on_failure: F) -> Result<Promise, Error>
    where
        F: FnMut(Reason) -> Result<R, Reason> + 'static,
        R: Into<Value>,
    {
        self.catch_as(TypeTag::Any, on_failure)
    }

    /// A Catch that only sees rejections of `kind` or a kind below it.
    pub fn catch_kind<F, R>(&self, kind: ErrorKind, on_failure: F) -> Result<Promise, Error>
    where
        F: FnMut(Reason) -> Result<R, Reason> + 'static,
        R: Into<Value>,
    {
        self.catch_as(TypeTag::Error(kind), on_failure)
    }

    pub fn catch_as<F, R>(&self, accepts: TypeTag, on_failure: F) -> Result<Promise, Error>
    where
        F: FnMut(Reason) -> Result<R, Reason> + 'static,
        R: Into<Value>,
    {
        self.register(Continuation::catch(Handler::for_reason(accepts, on_failure)))
    }

    /// Runs after every other continuation of the same drain, with the
    /// resolved value or the rejection as a [`Value::Error`].
    pub fn finally<F, R>(&self, on_either: F) -> Result<Promise, Error>
    where
        F: FnMut(Value) -> Result<R, Reason> + 'static,
        R: Into<Value>,
    {
        self.finally_as(TypeTag::Any, on_either)
    }

    pub fn finally_as<F, R>(&self, accepts: TypeTag, on_either: F) -> Result<Promise, Error>
    where
        F: FnMut(Value) -> Result<R, Reason> + 'static,
        R: Into<Value>,
    {
        self.register(Continuation::finally(Handler::new(accepts, on_either)))
    }

    fn register(&self, continuation: Continuation) -> Result<Promise, Error> {
        self.inner.borrow_mut().chain.push(continuation);
        self.drain()?;
        Ok(self.clone())
    }

    pub(crate) fn outcome(&self) -> Option<Result<Value, Reason>> {
        self.inner.borrow().settlement.outcome()
    }

    pub(crate) fn inner(&self) -> &Rc<RefCell<Inner>> {
        &self.inner
    }

    pub(crate) fn add_waker(&self, waker: &Waker) {
        let mut inner = self.inner.borrow_mut();
        if !inner.wakers.iter().any(|w| w.will_wake(waker)) {
            inner.wakers.push(waker.clone());
        }
    }

    fn downgrade(&self) -> WeakPromise {
        WeakPromise(Rc::downgrade(&self.inner))
    }

    fn settle(&self, outcome: Result<Value, Reason>) -> Result<(), Error> {
        {
            let mut inner = self.inner.borrow_mut();
            if !inner.settlement.is_open() {
                trace!(state = ?inner.settlement.state(), "promise already settled, ignoring");
                return Ok(());
            }
            inner.settlement = Settlement::from_outcome(outcome);
            trace!(state = ?inner.settlement.state(), "promise settled");
        }
        self.drain()
    }

    /// Run the chain against the current settlement.
    ///
    /// A drain requested while one is already running on this promise
    /// returns at once; the running loop picks up whatever was appended or
    /// changed. Only the outermost drain reports an unhandled rejection.
    pub(crate) fn drain(&self) -> Result<(), Error> {
        {
            let mut inner = self.inner.borrow_mut();
            if inner.draining {
                return Ok(());
            }
            inner.draining = true;
        }
        let ran = self.run_chain();
        let wakers = {
            let mut inner = self.inner.borrow_mut();
            inner.draining = false;
            if inner.settlement.state() != State::Pending {
                std::mem::take(&mut inner.wakers)
            } else {
                Vec::new()
            }
        };
        wakers.into_iter().for_each(Waker::wake);
        ran?;
        self.check_unhandled()
    }

    /// A failure coming back from another promise's drain does not stop
    /// this one: the rest of the chain still runs and the first such
    /// failure is returned at the end.
    fn run_chain(&self) -> Result<(), Error> {
        let mut failed = None;
        loop {
            let (continuation, outcome) = {
                let mut inner = self.inner.borrow_mut();
                let Some(outcome) = inner.settlement.outcome() else {
                    break;
                };
                let Some(continuation) = inner.chain.dequeue() else {
                    break;
                };
                (continuation, outcome)
            };
            if let Err(error) = self.dispatch(continuation, outcome) {
                debug!(%error, "downstream drain failed, finishing this chain first");
                failed.get_or_insert(error);
            }
        }
        failed.map_or(Ok(()), Err)
    }

    fn dispatch(&self, continuation: Continuation, outcome: Result<Value, Reason>) -> Result<(), Error> {
        let (kind, on_success, on_failure) = match continuation {
            Continuation::Adopter(adopter) => {
                if let Err(reason) = &outcome {
                    self.mark_handled(reason);
                }
                return adopter.settle_adopted(outcome);
            }
            Continuation::Handlers {
                kind,
                on_success,
                on_failure,
            } => (kind, on_success, on_failure),
        };
        match (kind, outcome) {
            (Kind::Finally, outcome) => match on_success.or(on_failure) {
                Some(handler) => self.run_finally(handler, outcome),
                None => Ok(()),
            },
            (_, Ok(value)) => match on_success {
                Some(_) if value.is_null() => {
                    trace!("empty value, then handler not invoked");
                    Ok(())
                }
                Some(handler) => self.run_success(handler, value),
                None => Ok(()),
            },
            (_, Err(reason)) => match on_failure {
                Some(handler) => self.run_failure(handler, reason),
                None => Ok(()),
            },
        }
    }

    fn run_success(&self, mut handler: Handler, value: Value) -> Result<(), Error> {
        if !handler.accepts(&value) {
            trace!(value = value.type_name(), "then handler declines value type");
            return Ok(());
        }
        match handler.call(value) {
            Ok(Value::Promise(target)) => self.adopt(target),
            Ok(value) => {
                self.replace(Settlement::Resolved(value));
                Ok(())
            }
            Err(thrown) => {
                self.replace(Settlement::Rejected(thrown));
                Ok(())
            }
        }
    }

    fn run_failure(&self, mut handler: Handler, reason: Reason) -> Result<(), Error> {
        let value = Value::Error(reason.clone());
        if !handler.accepts(&value) {
            trace!(%reason, "catch handler declines rejection kind");
            return Ok(());
        }
        match handler.call(value) {
            Ok(Value::Promise(target)) => {
                self.mark_handled(&reason);
                self.adopt(target)
            }
            Ok(Value::Null) => {
                self.mark_handled(&reason);
                Ok(())
            }
            Ok(value) => {
                self.replace(Settlement::Resolved(value));
                Ok(())
            }
            Err(thrown) => {
                self.replace(Settlement::Rejected(thrown));
                Ok(())
            }
        }
    }

    fn run_finally(&self, mut handler: Handler, outcome: Result<Value, Reason>) -> Result<(), Error> {
        let was_resolved = outcome.is_ok();
        let value = outcome.unwrap_or_else(Value::Error);
        if !handler.accepts(&value) {
            trace!(value = value.type_name(), "finally handler declines value type");
            return Ok(());
        }
        match handler.call(value) {
            Ok(Value::Promise(target)) => self.adopt(target),
            Ok(Value::Null) => Ok(()),
            Ok(value) if was_resolved => {
                self.replace(Settlement::Resolved(value));
                Ok(())
            }
            Ok(_) => Ok(()),
            Err(thrown) => {
                self.replace(Settlement::Rejected(thrown));
                Ok(())
            }
        }
    }

    /// Park the rest of the chain until `target` settles, then take on its
    /// outcome and drain again.
    fn adopt(&self, target: Promise) -> Result<(), Error> {
        if target.links_to(self) {
            debug!("promise would adopt itself, rejecting");
            self.replace(Settlement::Rejected(Reason::new(
                ErrorKind::PromiseResolvedWithPromise,
                "A Promise cannot adopt itself.",
            )));
            return Ok(());
        }
        debug!(adopted = ?target.state(), "adopting promise");
        self.replace(Settlement::Linked(target.downgrade()));
        target.register(Continuation::Adopter(self.clone()))?;
        Ok(())
    }

    /// Whether following `self` and its adoption links reaches `other`.
    fn links_to(&self, other: &Promise) -> bool {
        let mut current = Some(self.clone());
        while let Some(promise) = current {
            if promise.same(other) {
                return true;
            }
            current = match &promise.inner.borrow().settlement {
                Settlement::Linked(target) => target.upgrade(),
                _ => None,
            };
        }
        false
    }

    fn settle_adopted(&self, outcome: Result<Value, Reason>) -> Result<(), Error> {
        {
            let mut inner = self.inner.borrow_mut();
            if !matches!(inner.settlement, Settlement::Linked(_)) {
                return Ok(());
            }
            inner.settlement = Settlement::from_outcome(outcome);
            trace!(state = ?inner.settlement.state(), "adopted promise settled");
        }
        self.drain()
    }

    fn replace(&self, settlement: Settlement) {
        self.inner.borrow_mut().settlement = settlement;
    }

    fn mark_handled(&self, reason: &Reason) {
        let mut inner = self.inner.borrow_mut();
        if !inner.handled.iter().any(|handled| handled.same(reason)) {
            inner.handled.push(reason.clone());
        }
    }

    fn check_unhandled(&self) -> Result<(), Error> {
        let inner = self.inner.borrow();
        match &inner.settlement {
            Settlement::Rejected(reason) if !inner.handled.iter().any(|h| h.same(reason)) => {
                warn!(%reason, "unhandled rejection");
                Err(Error::Unhandled(reason.clone()))
            }
            _ => Ok(()),
        }
    }
}

impl fmt::Debug for Promise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.try_borrow() {
            Ok(inner) => f
                .debug_struct("Promise")
                .field("state", &inner.settlement.state())
                .field("chain", &inner.chain.len())
                .finish(),
            Err(_) => f.debug_struct("Promise").finish_non_exhaustive(),
        }
    }
}
