//! Rejection reasons and the error-kind hierarchy typed catches match on.
use std::fmt;
use std::rc::Rc;

/// The kind of a rejection. Kinds form a single-rooted tree under
/// [`ErrorKind::Throwable`]; a catch declared for a kind also catches every
/// kind below it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Throwable,
    Exception,
    Error,
    Logic,
    InvalidArgument,
    Runtime,
    Range,
    Overflow,
    Type,
    Value,
    Arithmetic,
    DivisionByZero,
    Promise,
    PromiseResolvedWithPromise,
}

impl ErrorKind {
    /// The kind directly above this one, `None` for the root.
    pub fn parent(self) -> Option<ErrorKind> {
        use ErrorKind::*;
        match self {
            Throwable => None,
            Exception | Error => Some(Throwable),
            Logic | Runtime | Promise => Some(Exception),
            InvalidArgument => Some(Logic),
            Range | Overflow => Some(Runtime),
            Type | Value | Arithmetic => Some(Error),
            DivisionByZero => Some(Arithmetic),
            PromiseResolvedWithPromise => Some(Promise),
        }
    }

    /// True when `self` is `ancestor` or lies below it.
    pub fn is_a(self, ancestor: ErrorKind) -> bool {
        let mut kind = Some(self);
        while let Some(k) = kind {
            if k == ancestor {
                return true;
            }
            kind = k.parent();
        }
        false
    }

    pub fn name(self) -> &'static str {
        use ErrorKind::*;
        match self {
            Throwable => "Throwable",
            Exception => "Exception",
            Error => "Error",
            Logic => "LogicError",
            InvalidArgument => "InvalidArgumentError",
            Runtime => "RuntimeError",
            Range => "RangeError",
            Overflow => "OverflowError",
            Type => "TypeError",
            Value => "ValueError",
            Arithmetic => "ArithmeticError",
            DivisionByZero => "DivisionByZeroError",
            Promise => "PromiseError",
            PromiseResolvedWithPromise => "PromiseResolvedWithPromiseError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Why a promise was rejected.
///
/// Clones share identity: two `Reason`s are equal only when they come from
/// the same [`Reason::new`] call, which is what the handled-rejection
/// bookkeeping relies on.
#[derive(Clone, thiserror::Error)]
#[error("{inner}")]
pub struct Reason {
    inner: Rc<Inner>,
}

#[derive(Debug, thiserror::Error)]
#[error("{kind}: {message}")]
struct Inner {
    kind: ErrorKind,
    message: String,
}

pub(crate) const RESOLVED_WITH_PROMISE: &str =
    "A Promise must not be resolved with another Promise.";

impl Reason {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            inner: Rc::new(Inner {
                kind,
                message: message.into(),
            }),
        }
    }

    pub(crate) fn resolved_with_promise() -> Self {
        Self::new(ErrorKind::PromiseResolvedWithPromise, RESOLVED_WITH_PROMISE)
    }

    pub fn kind(&self) -> ErrorKind {
        self.inner.kind
    }

    pub fn message(&self) -> &str {
        &self.inner.message
    }

    pub fn is_a(&self, kind: ErrorKind) -> bool {
        self.inner.kind.is_a(kind)
    }

    /// Identity comparison; `==` does the same.
    pub fn same(&self, other: &Reason) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl PartialEq for Reason {
    fn eq(&self, other: &Self) -> bool {
        self.same(other)
    }
}

impl fmt::Debug for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reason")
            .field("kind", &self.inner.kind)
            .field("message", &self.inner.message)
            .finish()
    }
}
