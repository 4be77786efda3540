//! Bind values

/**
This enum represents a value to bind to a statement.
 */
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// String representation
    String(String),
    /// i64 representation
    I64(i64),
    /// i32 representation
    I32(i32),
    /// i16 representation
    I16(i16),
    /// Bool representation
    Bool(bool),
    /// f64 representation
    F64(f64),
    /// f32 representation
    F32(f32),
    /// null representation
    Null,
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

macro_rules! impl_from {
    ($variant:ident, $T:path) => {
        impl From<$T> for Value {
            fn from(value: $T) -> Self {
                Value::$variant(value)
            }
        }
    };
}
impl_from!(I64, i64);
impl_from!(I32, i32);
impl_from!(I16, i16);
impl_from!(Bool, bool);
impl_from!(F64, f64);
impl_from!(F32, f32);
