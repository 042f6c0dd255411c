//! Blocking on a promise by polling a caller-supplied task.
use crate::{Error, Promise, State, Value};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::debug;

/// How [`Promise::wait`] paces its polling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WaitOptions {
    /// Sleep between two calls of the wait task.
    pub delay: Duration,
    /// Give up once this much time has passed with the promise pending.
    pub timeout: Option<Duration>,
}

impl WaitOptions {
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

type PollFn = Box<dyn FnMut() -> Result<(), Error>>;

#[derive(Clone)]
pub(crate) struct WaitTask {
    poll: Rc<RefCell<PollFn>>,
    options: WaitOptions,
}

impl fmt::Debug for WaitTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WaitTask").field("options", &self.options).finish_non_exhaustive()
    }
}

impl Promise {
    /// Register the task [`wait`](Promise::wait) calls while the promise is
    /// pending. The task is expected to settle the promise sooner or later.
    pub fn set_wait_task<F>(&self, poll: F, delay: Duration)
    where
        F: FnMut() -> Result<(), Error> + 'static,
    {
        self.set_wait_task_with(poll, WaitOptions::default().with_delay(delay));
    }

    pub fn set_wait_task_with<F>(&self, poll: F, options: WaitOptions)
    where
        F: FnMut() -> Result<(), Error> + 'static,
    {
        self.inner().borrow_mut().wait_task = Some(WaitTask {
            poll: Rc::new(RefCell::new(Box::new(poll))),
            options,
        });
    }

    /// Call the wait task until the promise leaves pending, then drain.
    ///
    /// With `unwrap` the settled value is returned: `Ok(None)` when it is
    /// the empty value, [`Error::Rejected`] when the promise ended in a
    /// handled rejection. Without `unwrap` the result is always `Ok(None)`.
    pub fn wait(&self, unwrap: bool) -> Result<Option<Value>, Error> {
        let task = self.inner().borrow().wait_task.clone().ok_or(Error::WaitTaskNotSet)?;
        let started = Instant::now();
        let mut polls = 0u64;
        while self.state() == State::Pending {
            if let Some(timeout) = task.options.timeout {
                if started.elapsed() >= timeout {
                    debug!(polls, ?timeout, "wait timed out");
                    return Err(Error::WaitTimedOut(timeout));
                }
            }
            {
                let mut poll = task.poll.try_borrow_mut().map_err(|_| Error::ReentrantWait)?;
                (&mut **poll)()?;
            }
            polls += 1;
            if self.state() == State::Pending && !task.options.delay.is_zero() {
                thread::sleep(task.options.delay);
            }
        }
        debug!(polls, "wait finished");
        self.drain()?;
        if !unwrap {
            return Ok(None);
        }

        let captured = Rc::new(RefCell::new(None));
        let slot = Rc::clone(&captured);
        self.then(move |value: Value| {
            *slot.borrow_mut() = Some(value.clone());
            Ok(value)
        })?;
        if let Some(Err(reason)) = self.outcome() {
            return Err(Error::Rejected(reason));
        }
        let value = captured.borrow_mut().take();
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::WaitOptions;
    use crate::{Error, Promise, Value};
    use std::time::Duration;

    #[test]
    fn test_options_builder() {
        let options = WaitOptions::default()
            .with_delay(Duration::from_millis(5))
            .with_timeout(Duration::from_secs(1));
        assert_eq!(options.delay, Duration::from_millis(5));
        assert_eq!(options.timeout, Some(Duration::from_secs(1)));
    }

    #[test]
    fn test_timeout_stops_a_wait_that_never_settles() {
        let (promise, _resolver) = Promise::pending();
        promise.set_wait_task_with(
            || Ok(()),
            WaitOptions::default()
                .with_delay(Duration::from_millis(1))
                .with_timeout(Duration::from_millis(20)),
        );
        assert_eq!(
            promise.wait(true),
            Err(Error::WaitTimedOut(Duration::from_millis(20)))
        );
    }

    #[test]
    fn test_wait_on_settled_promise_skips_polling() -> Result<(), Error> {
        let promise = Promise::resolved("done");
        promise.set_wait_task(|| Err(Error::WaitTaskNotSet), Duration::ZERO);
        assert_eq!(promise.wait(true)?, Some(Value::from("done")));
        Ok(())
    }
}
