//! Deferreds: a promise plus the incremental work that settles it.
use crate::{Error, Promise, Reason, Resolver, State, Value};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use tracing::{debug, trace};

/// Deferreds returned by a process. They become dependents of the
/// deferred that ran the process.
#[derive(Debug, Default)]
pub enum Spawned {
    #[default]
    Nothing,
    One(Deferred),
    Many(Vec<Deferred>),
}

impl Spawned {
    fn into_vec(self) -> Vec<Deferred> {
        match self {
            Spawned::Nothing => Vec::new(),
            Spawned::One(deferred) => vec![deferred],
            Spawned::Many(deferreds) => deferreds,
        }
    }
}

impl From<()> for Spawned {
    fn from(_: ()) -> Self {
        Spawned::Nothing
    }
}

impl From<Deferred> for Spawned {
    fn from(deferred: Deferred) -> Self {
        Spawned::One(deferred)
    }
}

impl From<Option<Deferred>> for Spawned {
    fn from(deferred: Option<Deferred>) -> Self {
        deferred.map_or(Spawned::Nothing, Spawned::One)
    }
}

impl From<Vec<Deferred>> for Spawned {
    fn from(deferreds: Vec<Deferred>) -> Self {
        Spawned::Many(deferreds)
    }
}

type Process = Rc<RefCell<Box<dyn FnMut() -> Result<Spawned, Error>>>>;

/// A promise together with the means to settle it and the processes that
/// move its work forward.
///
/// A deferred is active until it has been settled and every dependent it
/// picked up from its processes has finished. Completion callbacks fire
/// once, when it stops being active.
///
/// # Examples
///
/// ```
/// use promise_chain::{Deferred, Value};
/// use std::{cell::Cell, rc::Rc};
///
/// let deferred = Deferred::new();
/// let done = Rc::new(Cell::new(false));
/// let flag = done.clone();
/// deferred.add_complete_callback(move || flag.set(true));
/// deferred.promise().then(|v: Value| Ok(v))?;
/// deferred.resolve(123)?;
/// assert!(done.get());
/// assert!(!deferred.is_active());
/// # Ok::<(), promise_chain::Error>(())
/// ```
#[derive(Clone)]
pub struct Deferred {
    resolver: Resolver,
    inner: Rc<RefCell<Inner>>,
}

struct Inner {
    processes: Vec<Process>,
    on_complete: Vec<Box<dyn FnOnce()>>,
    dependents: Vec<Deferred>,
    active: bool,
    completing: bool,
}

impl Default for Deferred {
    fn default() -> Self {
        Self::new()
    }
}

impl Deferred {
    pub fn new() -> Self {
        let (_, resolver) = Promise::pending();
        Self {
            resolver,
            inner: Rc::new(RefCell::new(Inner {
                processes: Vec::new(),
                on_complete: Vec::new(),
                dependents: Vec::new(),
                active: true,
                completing: false,
            })),
        }
    }

    pub fn with_process<F, R>(process: F) -> Self
    where
        F: FnMut() -> Result<R, Error> + 'static,
        R: Into<Spawned>,
    {
        let deferred = Self::new();
        deferred.add_process(process);
        deferred
    }

    /// The promise this deferred settles.
    pub fn promise(&self) -> Promise {
        self.resolver.promise()
    }

    pub fn resolve(&self, value: impl Into<Value>) -> Result<(), Error> {
        self.resolver.resolve(value)?;
        self.complete()
    }

    pub fn reject(&self, reason: Reason) -> Result<(), Error> {
        self.resolver.reject(reason)?;
        self.complete()
    }

    /// Add a unit of work. Each call should do as little as it can; any
    /// deferreds it returns are tracked as dependents.
    pub fn add_process<F, R>(&self, mut process: F)
    where
        F: FnMut() -> Result<R, Error> + 'static,
        R: Into<Spawned>,
    {
        let process: Box<dyn FnMut() -> Result<Spawned, Error>> =
            Box::new(move || process().map(Into::into));
        self.inner.borrow_mut().processes.push(Rc::new(RefCell::new(process)));
    }

    pub fn process_count(&self) -> usize {
        self.inner.borrow().processes.len()
    }

    /// Run every process once, then let each active dependent do the same.
    ///
    /// A process that is already running further up the stack is skipped.
    pub fn process(&self) -> Result<(), Error> {
        let processes = self.inner.borrow().processes.clone();
        for process in processes {
            let spawned = match process.try_borrow_mut() {
                Ok(mut run) => (&mut **run)()?,
                Err(_) => continue,
            };
            let mut inner = self.inner.borrow_mut();
            for dependent in spawned.into_vec() {
                if !inner.dependents.iter().any(|known| known.same(&dependent)) {
                    inner.dependents.push(dependent);
                }
            }
        }

        let dependents = self.inner.borrow().dependents.clone();
        for dependent in dependents.iter().filter(|d| d.is_active()) {
            dependent.process()?;
        }
        Ok(())
    }

    pub fn is_active(&self) -> bool {
        self.inner.borrow().active
    }

    pub fn has_active_dependents(&self) -> bool {
        self.inner.borrow().dependents.iter().any(Deferred::is_active)
    }

    pub fn add_complete_callback<F>(&self, callback: F)
    where
        F: FnOnce() + 'static,
    {
        self.inner.borrow_mut().on_complete.push(Box::new(callback));
    }

    /// Whether both handles refer to the same deferred.
    pub fn same(&self, other: &Deferred) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Drain the promise, re-running processes until the promise has
    /// settled and no dependent is active, then fire the completion
    /// callbacks. Runs to the end at most once.
    fn complete(&self) -> Result<(), Error> {
        {
            let mut inner = self.inner.borrow_mut();
            if !inner.active || inner.completing {
                return Ok(());
            }
            inner.completing = true;
        }
        let finished = self.run_completion();
        self.inner.borrow_mut().completing = false;
        finished?;

        let callbacks = {
            let mut inner = self.inner.borrow_mut();
            inner.active = false;
            std::mem::take(&mut inner.on_complete)
        };
        debug!(callbacks = callbacks.len(), "deferred complete");
        for callback in callbacks {
            callback();
        }
        Ok(())
    }

    fn run_completion(&self) -> Result<(), Error> {
        let mut round = 0u64;
        loop {
            if round > 0 {
                self.process()?;
            }
            self.resolver.complete()?;
            round += 1;
            if self.promise().state() != State::Pending && !self.has_active_dependents() {
                return Ok(());
            }
            trace!(round, "deferred still has work outstanding");
        }
    }
}

impl fmt::Debug for Deferred {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.try_borrow() {
            Ok(inner) => f
                .debug_struct("Deferred")
                .field("promise", &self.resolver.promise())
                .field("active", &inner.active)
                .field("processes", &inner.processes.len())
                .field("dependents", &inner.dependents.len())
                .finish(),
            Err(_) => f.debug_struct("Deferred").finish_non_exhaustive(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Deferred, Spawned};
    use crate::{Error, ErrorKind, Reason, State, Value};
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn test_empty_process_list() {
        assert_eq!(Deferred::new().process_count(), 0);
    }

    #[test]
    fn test_construct_with_process() {
        let deferred = Deferred::with_process(|| Ok(()));
        assert_eq!(deferred.process_count(), 1);
    }

    #[test]
    fn test_resolve_completes() -> Result<(), Error> {
        let deferred = Deferred::new();
        assert!(deferred.is_active());
        deferred.resolve(123)?;
        assert!(!deferred.is_active());
        assert_eq!(deferred.promise().state(), State::Resolved);
        Ok(())
    }

    #[test]
    fn test_complete_callback_only_fires_once() -> Result<(), Error> {
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        let deferred = Deferred::new();
        deferred.add_complete_callback(move || counter.set(counter.get() + 1));
        deferred.promise().catch(|_| Ok(()))?;
        deferred.resolve(123)?;
        deferred.reject(Reason::new(ErrorKind::Exception, "Example"))?;
        assert_eq!(calls.get(), 1);
        Ok(())
    }

    #[test]
    fn test_process_registers_each_dependent_once() -> Result<(), Error> {
        let child = Deferred::new();
        let returned = child.clone();
        let parent = Deferred::with_process(move || Ok(vec![returned.clone(), returned.clone()]));
        parent.process()?;
        parent.process()?;
        assert!(parent.has_active_dependents());
        child.resolve(Value::Null)?;
        assert!(!parent.has_active_dependents());
        Ok(())
    }

    #[test]
    fn test_process_resolving_its_own_deferred() -> Result<(), Error> {
        let calls = Rc::new(Cell::new(0));
        let deferred = Deferred::new();
        let handle = deferred.clone();
        let counter = calls.clone();
        deferred.add_process(move || {
            counter.set(counter.get() + 1);
            if counter.get() == 3 {
                handle.resolve("finished")?;
            }
            Ok(Spawned::Nothing)
        });
        while deferred.is_active() {
            deferred.process()?;
        }
        assert_eq!(calls.get(), 3);
        assert_eq!(deferred.promise().state(), State::Resolved);
        Ok(())
    }
}
