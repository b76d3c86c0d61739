use orma_core::{
    stmt::{self, Value as CoreValue},
    Error, Result,
};
use rusqlite::{
    types::{FromSqlError, ToSql, ToSqlOutput, Value as SqlValue, ValueRef},
    Row,
};

#[derive(Debug)]
pub struct Value(CoreValue);

impl From<CoreValue> for Value {
    fn from(value: CoreValue) -> Self {
        Self(value)
    }
}

impl Value {
    /// Converts this SQLite driver value into the core Orma value.
    pub fn into_inner(self) -> CoreValue {
        self.0
    }

    /// Converts a SQLite value within a row to an Orma value. The column type
    /// picks between representations sharing one storage class.
    pub fn from_sql(row: &Row, index: usize, ty: &stmt::Type) -> Result<Self> {
        let value: SqlValue = row.get(index).map_err(Error::driver_operation_failed)?;

        let core_value = match value {
            SqlValue::Null => CoreValue::Null,
            SqlValue::Integer(value) => match ty {
                stmt::Type::Bool => CoreValue::Bool(value != 0),
                stmt::Type::I32 => match i32::try_from(value) {
                    Ok(value) => CoreValue::I32(value),
                    Err(_) => return Err(Error::type_conversion(CoreValue::I64(value), "i32")),
                },
                stmt::Type::F64 => CoreValue::F64(value as f64),
                _ => CoreValue::I64(value),
            },
            SqlValue::Real(value) => CoreValue::F64(value),
            SqlValue::Text(value) => match ty {
                stmt::Type::Uuid => CoreValue::Uuid(value.parse()?),
                _ => CoreValue::String(value),
            },
            SqlValue::Blob(value) => match ty {
                stmt::Type::Uuid => match uuid::Uuid::from_slice(&value) {
                    Ok(value) => CoreValue::Uuid(value),
                    Err(_) => return Err(Error::type_conversion(CoreValue::Bytes(value), "uuid")),
                },
                _ => CoreValue::Bytes(value),
            },
        };

        Ok(Value(core_value))
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        use stmt::Value;

        match &self.0 {
            Value::Bool(true) => Ok(ToSqlOutput::Owned(SqlValue::Integer(1))),
            Value::Bool(false) => Ok(ToSqlOutput::Owned(SqlValue::Integer(0))),
            Value::I32(v) => Ok(ToSqlOutput::Owned(SqlValue::Integer(*v as i64))),
            Value::I64(v) => Ok(ToSqlOutput::Owned(SqlValue::Integer(*v))),
            Value::F64(v) => Ok(ToSqlOutput::Owned(SqlValue::Real(*v))),
            Value::String(v) => Ok(ToSqlOutput::Borrowed(ValueRef::Text(v.as_bytes()))),
            Value::Bytes(v) => Ok(ToSqlOutput::Borrowed(ValueRef::Blob(&v[..]))),
            Value::Uuid(v) => Ok(ToSqlOutput::Owned(SqlValue::Text(v.to_string()))),
            Value::Null => Ok(ToSqlOutput::Owned(SqlValue::Null)),
            value @ (Value::Record(_) | Value::List(_)) => Err(
                rusqlite::Error::ToSqlConversionFailure(Box::new(FromSqlError::Other(
                    format!("cannot bind a {} as a SQLite parameter", value.kind_name()).into(),
                ))),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_storage_classes() {
        let connection = rusqlite::Connection::open_in_memory().unwrap();
        let id = uuid::Uuid::new_v4();

        let params = [
            Value::from(CoreValue::Bool(true)),
            Value::from(CoreValue::I32(7)),
            Value::from(CoreValue::Uuid(id)),
            Value::from(CoreValue::Null),
        ];

        let mut stmt = connection.prepare("SELECT ?1, ?2, ?3, ?4").unwrap();
        let mut rows = stmt.query(rusqlite::params_from_iter(params.iter())).unwrap();
        let row = rows.next().unwrap().unwrap();

        let tys = [
            stmt::Type::Bool,
            stmt::Type::I32,
            stmt::Type::Uuid,
            stmt::Type::String,
        ];
        let values: Vec<_> = tys
            .iter()
            .enumerate()
            .map(|(index, ty)| Value::from_sql(row, index, ty).unwrap().into_inner())
            .collect();

        assert_eq!(
            values,
            vec![
                CoreValue::Bool(true),
                CoreValue::I32(7),
                CoreValue::Uuid(id),
                CoreValue::Null
            ]
        );
    }

    #[test]
    fn records_cannot_be_bound() {
        let value = Value::from(CoreValue::record_from_vec(vec![CoreValue::I64(1)]));
        assert!(value.to_sql().is_err());
    }
}
