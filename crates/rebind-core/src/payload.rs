//! Tagged payload values with structural equality.
//!
//! Items carry their business data as a [`Payload`] rather than an opaque
//! boxed value so that change detection is plain structural comparison
//! instead of reflection-style downcasting. The same representation doubles
//! as the dependency value stored in memoization slots.

use std::sync::Arc;

/// A structured value compared field-by-field.
///
/// Cheap to clone: text and byte variants share their backing storage.
#[derive(Clone, Debug)]
pub enum Payload {
    Unit,
    Bool(bool),
    Int(i64),
    /// Compared by bit pattern, so `NaN == NaN` holds and equality stays an
    /// equivalence relation (memo slots rely on that).
    Float(f64),
    Text(Arc<str>),
    Bytes(Arc<[u8]>),
    List(Vec<Payload>),
    /// Ordered field/value pairs. Field order is part of the identity.
    Record(Vec<(Arc<str>, Payload)>),
}

impl Payload {
    /// Convenience constructor for a text payload.
    pub fn text(value: impl AsRef<str>) -> Self {
        Self::Text(Arc::from(value.as_ref()))
    }

    /// Convenience constructor for a record payload.
    pub fn record(fields: impl IntoIterator<Item = (&'static str, Payload)>) -> Self {
        Self::Record(
            fields
                .into_iter()
                .map(|(name, value)| (Arc::from(name), value))
                .collect(),
        )
    }
}

impl PartialEq for Payload {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Unit, Self::Unit) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a.to_bits() == b.to_bits(),
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Bytes(a), Self::Bytes(b)) => a == b,
            (Self::List(a), Self::List(b)) => a == b,
            (Self::Record(a), Self::Record(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Payload {}

impl Default for Payload {
    fn default() -> Self {
        Self::Unit
    }
}

impl From<()> for Payload {
    fn from(_: ()) -> Self {
        Self::Unit
    }
}

impl From<bool> for Payload {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i32> for Payload {
    fn from(value: i32) -> Self {
        Self::Int(value.into())
    }
}

impl From<i64> for Payload {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<u32> for Payload {
    fn from(value: u32) -> Self {
        Self::Int(value.into())
    }
}

impl From<usize> for Payload {
    fn from(value: usize) -> Self {
        Self::Int(value as i64)
    }
}

impl From<f32> for Payload {
    fn from(value: f32) -> Self {
        Self::Float(value.into())
    }
}

impl From<f64> for Payload {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for Payload {
    fn from(value: &str) -> Self {
        Self::Text(Arc::from(value))
    }
}

impl From<String> for Payload {
    fn from(value: String) -> Self {
        Self::Text(Arc::from(value.as_str()))
    }
}

impl From<Vec<Payload>> for Payload {
    fn from(value: Vec<Payload>) -> Self {
        Self::List(value)
    }
}
