use super::Operation;

use crate::stmt::{Type, Value};

#[derive(Debug, Clone)]
pub struct QuerySql {
    /// Rendered SQL text with placeholders for the driver's flavor
    pub sql: String,

    /// Values for the placeholders, in placeholder order
    pub params: Vec<Value>,

    /// Column types of the returned rows. `None` when the statement returns
    /// an affected-row count.
    pub ret: Option<Vec<Type>>,
}

impl From<QuerySql> for Operation {
    fn from(value: QuerySql) -> Self {
        Self::QuerySql(value)
    }
}
