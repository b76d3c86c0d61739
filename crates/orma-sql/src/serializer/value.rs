use super::{Comma, Params, ToSql};

use orma_core::{
    sql::JdbcParameter,
    stmt::{Value, ValueRecord},
};

/// Literals are inlined. Values with no portable literal syntax (bytes and
/// UUIDs) are bound as parameters instead.
impl ToSql for &Value {
    fn to_sql<P: Params>(self, f: &mut super::Formatter<'_, P>) {
        use std::fmt::Write;

        match self {
            Value::Null => fmt!(f, "NULL"),
            Value::Bool(true) if f.serializer.is_sqlite() => fmt!(f, "1"),
            Value::Bool(false) if f.serializer.is_sqlite() => fmt!(f, "0"),
            Value::Bool(true) => fmt!(f, "TRUE"),
            Value::Bool(false) => fmt!(f, "FALSE"),
            Value::I32(v) => {
                let _ = write!(f.dst, "{v}");
            }
            Value::I64(v) => {
                let _ = write!(f.dst, "{v}");
            }
            Value::F64(v) => {
                let _ = write!(f.dst, "{v:?}");
            }
            Value::String(v) => {
                f.dst.push('\'');
                f.dst.push_str(&v.replace('\'', "''"));
                f.dst.push('\'');
            }
            Value::Record(record) => record.to_sql(f),
            Value::List(items) => {
                fmt!(f, "(" Comma(items) ")");
            }
            value @ (Value::Bytes(_) | Value::Uuid(_)) => {
                let param = JdbcParameter::value(value.clone(), value.infer_ty());
                let placeholder = f.params.push(&param);
                fmt!(f, placeholder);
            }
        }
    }
}

impl ToSql for &ValueRecord {
    fn to_sql<P: Params>(self, f: &mut super::Formatter<'_, P>) {
        fmt!(f, "(" Comma(self.iter()) ")");
    }
}
