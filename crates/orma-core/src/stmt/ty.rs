use super::Value;
use crate::{Error, Result};

/// The type of a value flowing through the pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum Type {
    /// Boolean value
    Bool,

    /// Signed 32-bit integer
    I32,

    /// Signed 64-bit integer
    I64,

    /// 64-bit floating point
    F64,

    /// String type
    String,

    /// Raw bytes
    Bytes,

    /// UUID
    Uuid,

    /// A fixed-length tuple where each item can have a different type. Used
    /// for embeddables and composite identifiers.
    Record(Vec<Type>),

    /// A list of a single type
    List(Box<Type>),

    /// The null type can be cast to any type.
    Null,

    /// A type that could not be inferred (e.g. an untyped parameter)
    #[default]
    Unknown,
}

impl Type {
    pub fn list(ty: impl Into<Self>) -> Self {
        Self::List(Box::new(ty.into()))
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::I32 | Self::I64 | Self::F64)
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, Self::I32 | Self::I64)
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }

    /// The value used when a constructor argument has no matching selection.
    pub fn zero_value(&self) -> Value {
        match self {
            Self::Bool => Value::Bool(false),
            Self::I32 => Value::I32(0),
            Self::I64 => Value::I64(0),
            Self::F64 => Value::F64(0.0),
            Self::String => Value::String(String::new()),
            Self::Bytes => Value::Bytes(vec![]),
            Self::Record(fields) => {
                Value::record_from_vec(fields.iter().map(Type::zero_value).collect())
            }
            Self::List(_) => Value::List(vec![]),
            Self::Uuid | Self::Null | Self::Unknown => Value::Null,
        }
    }

    /// Coerces a value extracted from the database into this type.
    ///
    /// Drivers report storage types (SQLite has no boolean or 32-bit integer
    /// storage), so extraction narrows or widens as needed.
    pub fn cast(&self, value: Value) -> Result<Value> {
        if value.is_null() {
            return Ok(value);
        }

        Ok(match (self, value) {
            (Self::Unknown | Self::Null, value) => value,
            (Self::Bool, Value::Bool(v)) => Value::Bool(v),
            (Self::Bool, Value::I64(v)) => Value::Bool(v != 0),
            (Self::Bool, Value::I32(v)) => Value::Bool(v != 0),
            (Self::I32, Value::I32(v)) => Value::I32(v),
            (Self::I32, Value::I64(v)) => match i32::try_from(v) {
                Ok(v) => Value::I32(v),
                Err(_) => return Err(Error::type_conversion(Value::I64(v), "i32")),
            },
            (Self::I64, Value::I64(v)) => Value::I64(v),
            (Self::I64, Value::I32(v)) => Value::I64(v as i64),
            (Self::F64, Value::F64(v)) => Value::F64(v),
            (Self::F64, Value::I64(v)) => Value::F64(v as f64),
            (Self::F64, Value::I32(v)) => Value::F64(v as f64),
            (Self::String, Value::String(v)) => Value::String(v),
            (Self::Bytes, Value::Bytes(v)) => Value::Bytes(v),
            (Self::Uuid, Value::Uuid(v)) => Value::Uuid(v),
            (Self::Uuid, Value::String(v)) => Value::Uuid(v.parse()?),
            (Self::Uuid, Value::Bytes(v)) => match uuid::Uuid::from_slice(&v) {
                Ok(v) => Value::Uuid(v),
                Err(_) => return Err(Error::type_conversion(Value::Bytes(v), "uuid")),
            },
            (Self::Record(tys), Value::Record(record)) if tys.len() == record.len() => {
                let fields = tys
                    .iter()
                    .zip(record.fields)
                    .map(|(ty, value)| ty.cast(value))
                    .collect::<Result<Vec<_>>>()?;
                Value::record_from_vec(fields)
            }
            (Self::List(ty), Value::List(items)) => Value::List(
                items
                    .into_iter()
                    .map(|item| ty.cast(item))
                    .collect::<Result<_>>()?,
            ),
            (ty, value) => return Err(Error::type_conversion(value, ty.name())),
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::F64 => "f64",
            Self::String => "string",
            Self::Bytes => "bytes",
            Self::Uuid => "uuid",
            Self::Record(_) => "record",
            Self::List(_) => "list",
            Self::Null => "null",
            Self::Unknown => "unknown",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cast_narrows_sqlite_integers() {
        assert_eq!(Type::I32.cast(Value::I64(7)).unwrap(), Value::I32(7));
        assert_eq!(Type::Bool.cast(Value::I64(1)).unwrap(), Value::Bool(true));
        assert_eq!(Type::Bool.cast(Value::I64(0)).unwrap(), Value::Bool(false));
    }

    #[test]
    fn cast_out_of_range_is_type_conversion() {
        let err = Type::I32.cast(Value::I64(i64::MAX)).unwrap_err();
        assert!(err.is_type_conversion());
    }

    #[test]
    fn cast_passes_null_through() {
        assert_eq!(Type::String.cast(Value::Null).unwrap(), Value::Null);
    }

    #[test]
    fn zero_values() {
        assert_eq!(Type::I64.zero_value(), Value::I64(0));
        assert_eq!(Type::String.zero_value(), Value::String(String::new()));
        assert_eq!(
            Type::Record(vec![Type::Bool, Type::I32]).zero_value(),
            Value::record_from_vec(vec![Value::Bool(false), Value::I32(0)])
        );
    }
}
