#[cfg(test)]
mod tests {
    use promise_chain::{Error, ErrorKind, Promise, Reason, Resolver, Value, WaitOptions};
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;
    use std::time::Duration;

    /// A pending promise whose wait task resolves it after `polls` calls.
    fn settles_after(polls: u32, value: &'static str) -> (Promise, Rc<Cell<u32>>) {
        let count = Rc::new(Cell::new(0));
        let captured: Rc<RefCell<Option<Resolver>>> = Rc::default();
        let slot = captured.clone();
        let promise = Promise::new(move |resolver| *slot.borrow_mut() = Some(resolver));
        let counter = count.clone();
        promise.set_wait_task(
            move || {
                if counter.get() >= polls {
                    if let Some(resolver) = captured.borrow().as_ref() {
                        resolver.resolve(value)?;
                    }
                } else {
                    counter.set(counter.get() + 1);
                }
                Ok(())
            },
            Duration::ZERO,
        );
        (promise, count)
    }

    #[test]
    fn test_wait_polls_until_resolved() -> Result<(), Error> {
        let (promise, count) = settles_after(10, "Done!");
        assert_eq!(promise.wait(true)?, Some(Value::from("Done!")));
        assert_eq!(count.get(), 10);
        Ok(())
    }

    #[test]
    fn test_wait_without_unwrap() -> Result<(), Error> {
        let (promise, count) = settles_after(10, "Done!");
        assert_eq!(promise.wait(false)?, None);
        assert_eq!(count.get(), 10);
        Ok(())
    }

    #[test]
    fn test_wait_with_no_wait_task() {
        let (promise, _resolver) = Promise::pending();
        assert_eq!(promise.wait(true), Err(Error::WaitTaskNotSet));
    }

    #[test]
    fn test_wait_sees_chain_result() -> Result<(), Error> {
        let (promise, _) = settles_after(3, "raw");
        promise.then(|v: Value| Ok(format!("{}!", v.as_str().unwrap_or_default())))?;
        assert_eq!(promise.wait(true)?, Some(Value::from("raw!")));
        Ok(())
    }

    #[test]
    fn test_wait_on_handled_rejection() -> Result<(), Error> {
        let reason = Reason::new(ErrorKind::Runtime, "gave up");
        let (promise, resolver) = Promise::pending();
        promise.catch(|_| Ok(()))?;
        let to_reject = reason.clone();
        promise.set_wait_task_with(
            move || resolver.reject(to_reject.clone()),
            WaitOptions::default().with_timeout(Duration::from_secs(5)),
        );
        assert_eq!(promise.wait(true), Err(Error::Rejected(reason)));
        Ok(())
    }

    #[test]
    fn test_wait_on_already_resolved_skips_task() -> Result<(), Error> {
        let polled = Rc::new(Cell::new(false));
        let flag = polled.clone();
        let promise = Promise::resolved(9);
        promise.set_wait_task(
            move || {
                flag.set(true);
                Ok(())
            },
            Duration::ZERO,
        );
        assert_eq!(promise.wait(true)?, Some(Value::from(9)));
        assert!(!polled.get());
        Ok(())
    }
}
