//! Type-directed dispatch.
//!
//! Every handler is registered with the type it declares for its parameter.
//! Before a handler runs, the settled value (or the rejection, seen as a
//! [`Value::Error`]) is checked against that type; a mismatch skips the
//! whole continuation without touching the settlement. This is what lets a
//! chain of `catch_kind` calls act as a typed multi-catch.
use crate::{ErrorKind, Value};

/// The declared parameter type of a handler.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TypeTag {
    /// Accepts everything, `Null` included.
    #[default]
    Any,
    Null,
    Bool,
    Int,
    Float,
    /// `Int` or `Float`.
    Number,
    Str,
    List,
    Promise,
    /// An error of this kind or any kind below it.
    Error(ErrorKind),
    /// The inner type, or `Null`.
    Nullable(Box<TypeTag>),
    /// Any one of the listed types.
    OneOf(Vec<TypeTag>),
}

impl TypeTag {
    pub fn nullable(self) -> TypeTag {
        TypeTag::Nullable(Box::new(self))
    }

    /// Whether a handler declaring `self` may be invoked with `value`.
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            TypeTag::Any => true,
            TypeTag::Nullable(inner) => value.is_null() || inner.accepts(value),
            TypeTag::OneOf(tags) => tags.iter().any(|tag| tag.accepts(value)),
            TypeTag::Null => value.is_null(),
            _ if value.is_null() => false,
            TypeTag::Bool => matches!(value, Value::Bool(_)),
            TypeTag::Int => matches!(value, Value::Int(_)),
            TypeTag::Float => matches!(value, Value::Float(_)),
            TypeTag::Number => matches!(value, Value::Int(_) | Value::Float(_)),
            TypeTag::Str => matches!(value, Value::Str(_)),
            TypeTag::List => matches!(value, Value::List(_)),
            TypeTag::Promise => matches!(value, Value::Promise(_)),
            TypeTag::Error(kind) => match value {
                Value::Error(reason) => reason.is_a(*kind),
                _ => false,
            },
        }
    }
}

impl From<ErrorKind> for TypeTag {
    fn from(kind: ErrorKind) -> Self {
        TypeTag::Error(kind)
    }
}
