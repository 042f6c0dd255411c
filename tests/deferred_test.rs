#[cfg(test)]
mod tests {
    use promise_chain::{Deferred, Driver, DriverConfig, Error, ErrorKind, Reason, State, Value};
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    /// A deferred whose single process resolves it on the given call.
    fn finishing_on(call: u32) -> Deferred {
        let deferred = Deferred::new();
        let handle = deferred.clone();
        let mut calls = 0;
        deferred.add_process(move || {
            calls += 1;
            if calls == call {
                handle.resolve(i64::from(calls))?;
            }
            Ok(())
        });
        deferred
    }

    #[test]
    fn test_unhandled_rejection_surfaces_at_resolve() -> Result<(), Error> {
        let deferred = Deferred::new();
        deferred
            .promise()
            .then(|_| Err::<Value, _>(Reason::new(ErrorKind::Runtime, "There was an error!")))?;

        let result = deferred.resolve("error");
        let message = result.as_ref().err().and_then(Error::reason).map(Reason::message);
        assert_eq!(message, Some("There was an error!"));
        assert!(matches!(result, Err(Error::Unhandled(_))));
        Ok(())
    }

    #[test]
    fn test_reject_chain_through_nested_deferred() -> Result<(), Error> {
        let then_calls = Rc::new(Cell::new(0));
        let catch_calls = Rc::new(Cell::new(0));
        let outer = Deferred::new();
        let (then_count, catch_count) = (then_calls.clone(), catch_calls.clone());
        outer
            .promise()
            .then(move |_| {
                then_count.set(then_count.get() + 1);
                Ok(())
            })?
            .catch(move |_| {
                catch_count.set(catch_count.get() + 1);
                Ok(())
            })?;

        let inner = Deferred::new();
        let forward = outer.clone();
        inner
            .promise()
            .then(|message: Value| {
                if message.as_str() == Some("") {
                    return Err(Reason::new(ErrorKind::Exception, "Message is empty"));
                }
                Ok(message)
            })?
            .catch(move |reason: Reason| {
                forward
                    .reject(reason)
                    .map_err(|e| Reason::new(ErrorKind::Runtime, e.to_string()))
            })?;

        inner.resolve("")?;
        assert_eq!(then_calls.get(), 0);
        assert_eq!(catch_calls.get(), 1);
        assert_eq!(outer.promise().state(), State::Rejected);
        Ok(())
    }

    #[test]
    fn test_completion_waits_for_every_dependent() -> Result<(), Error> {
        let parent = Deferred::new();
        let children = Rc::new(RefCell::new(Vec::new()));
        for _ in 0..2 {
            let mut child = Some(finishing_on(2));
            let spawned = children.clone();
            parent.add_process(move || {
                if let Some(child) = &child {
                    spawned.borrow_mut().push(child.clone());
                }
                Ok(child.take())
            });
        }

        let finished_when_complete = Rc::new(Cell::new(None));
        let slot = finished_when_complete.clone();
        let observed = children.clone();
        parent.add_complete_callback(move || {
            slot.set(Some(observed.borrow().iter().all(|c: &Deferred| !c.is_active())));
        });

        parent.process()?;
        assert_eq!(children.borrow().len(), 2);
        assert!(parent.has_active_dependents());

        parent.resolve("parent done")?;
        assert_eq!(finished_when_complete.get(), Some(true));
        assert!(!parent.is_active());
        assert!(!parent.has_active_dependents());
        Ok(())
    }

    #[test]
    fn test_dependents_driven_through_driver() -> Result<(), Error> {
        let parent = finishing_on(3);
        let child = finishing_on(5);
        let returned = child.clone();
        parent.add_process(move || Ok(returned.clone()));

        let completed = Rc::new(Cell::new(false));
        let flag = completed.clone();
        parent.add_complete_callback(move || flag.set(true));

        let mut driver = Driver::with_config(DriverConfig::default().with_max_ticks(10));
        driver.add(parent.clone());
        driver.run()?;

        assert!(completed.get());
        assert!(!child.is_active());
        assert_eq!(parent.promise().state(), State::Resolved);
        Ok(())
    }

    #[test]
    fn test_driver_run_until_promise() -> Result<(), Error> {
        let seen = Rc::new(RefCell::new(None));
        let slot = seen.clone();
        let deferred = finishing_on(4);
        let promise = deferred.promise();
        promise.then(move |v: Value| {
            *slot.borrow_mut() = v.as_int();
            Ok(v)
        })?;

        let mut driver = Driver::new();
        driver.add(deferred);
        driver.run_until(&promise)?;
        assert_eq!(*seen.borrow(), Some(4));
        assert!(driver.is_empty());
        Ok(())
    }

    #[test]
    fn test_process_error_stops_driver() {
        let failure = Error::Rejected(Reason::new(ErrorKind::Runtime, "process failed"));
        let raised = failure.clone();
        let deferred = Deferred::with_process(move || Err::<(), _>(raised.clone()));
        let mut driver = Driver::new();
        driver.add(deferred.clone());
        assert_eq!(driver.run(), Err(failure));
        assert!(deferred.is_active());
    }
}
