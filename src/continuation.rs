use crate::{ErrorKind, Promise, Reason, TypeTag, Value};
use std::fmt;

/// Which registration method produced a continuation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Then,
    Catch,
    Finally,
}

type Callback = Box<dyn FnMut(Value) -> Result<Value, Reason>>;

/// One callback together with the type it declares for its parameter.
pub(crate) struct Handler {
    accepts: TypeTag,
    callback: Callback,
}

impl Handler {
    pub(crate) fn new<F, R>(accepts: TypeTag, mut callback: F) -> Self
    where
        F: FnMut(Value) -> Result<R, Reason> + 'static,
        R: Into<Value>,
    {
        Self {
            accepts,
            callback: Box::new(move |value| callback(value).map(Into::into)),
        }
    }

    /// A handler whose callback takes the rejection reason directly.
    pub(crate) fn for_reason<F, R>(accepts: TypeTag, mut callback: F) -> Self
    where
        F: FnMut(Reason) -> Result<R, Reason> + 'static,
        R: Into<Value>,
    {
        Self::new(accepts, move |value| match value {
            Value::Error(reason) => callback(reason).map(Into::into),
            other => Err(Reason::new(
                ErrorKind::Type,
                format!("failure handler invoked with a {} value", other.type_name()),
            )),
        })
    }

    pub(crate) fn accepts(&self, value: &Value) -> bool {
        self.accepts.accepts(value)
    }

    pub(crate) fn call(&mut self, value: Value) -> Result<Value, Reason> {
        (self.callback)(value)
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler").field("accepts", &self.accepts).finish_non_exhaustive()
    }
}

/// An entry in a promise's chain.
#[derive(Debug)]
pub(crate) enum Continuation {
    /// Registered through `then`, `catch` or `finally`.
    Handlers {
        kind: Kind,
        on_success: Option<Handler>,
        on_failure: Option<Handler>,
    },
    /// Hands this promise's settlement to a promise that adopted it.
    Adopter(Promise),
}

impl Continuation {
    pub(crate) fn then(on_success: Handler) -> Self {
        Continuation::Handlers {
            kind: Kind::Then,
            on_success: Some(on_success),
            on_failure: None,
        }
    }

    pub(crate) fn then_with(on_success: Handler, on_failure: Handler) -> Self {
        Continuation::Handlers {
            kind: Kind::Then,
            on_success: Some(on_success),
            on_failure: Some(on_failure),
        }
    }

    pub(crate) fn catch(on_failure: Handler) -> Self {
        Continuation::Handlers {
            kind: Kind::Catch,
            on_success: None,
            on_failure: Some(on_failure),
        }
    }

    /// A finally handler takes either side, so it sits in the success slot.
    pub(crate) fn finally(on_either: Handler) -> Self {
        Continuation::Handlers {
            kind: Kind::Finally,
            on_success: Some(on_either),
            on_failure: None,
        }
    }

    pub(crate) fn is_finally(&self) -> bool {
        matches!(
            self,
            Continuation::Handlers {
                kind: Kind::Finally,
                ..
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::{Continuation, Handler};
    use crate::{ErrorKind, Reason, TypeTag, Value};

    #[test]
    fn test_handler_converts_result() {
        let mut handler = Handler::new(TypeTag::Int, |v: Value| Ok(v.as_int().unwrap_or(0) * 2));
        assert!(handler.accepts(&Value::from(2)));
        assert!(!handler.accepts(&Value::from("2")));
        assert_eq!(handler.call(Value::from(2)), Ok(Value::from(4)));
    }

    #[test]
    fn test_reason_handler_unwraps_error_value() {
        let mut handler = Handler::for_reason(TypeTag::Any, |r: Reason| Ok(r.message().to_owned()));
        let reason = Reason::new(ErrorKind::Runtime, "boom");
        assert_eq!(handler.call(Value::from(reason)), Ok(Value::from("boom")));
        assert!(handler.call(Value::from(1)).is_err());
    }

    #[test]
    fn test_only_finally_is_finally() {
        let noop = || Handler::new(TypeTag::Any, |_| Ok(()));
        assert!(Continuation::finally(noop()).is_finally());
        assert!(!Continuation::then(noop()).is_finally());
        assert!(!Continuation::catch(noop()).is_finally());
    }
}
