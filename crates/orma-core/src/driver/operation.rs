mod query_sql;
pub use query_sql::QuerySql;

mod transaction;
pub use transaction::Transaction;

#[derive(Debug, Clone)]
pub enum Operation {
    /// Execute a SQL statement
    QuerySql(QuerySql),

    /// Execute a transaction lifecycle op
    Transaction(Transaction),
}

impl Operation {
    pub fn as_query_sql(&self) -> Option<&QuerySql> {
        match self {
            Self::QuerySql(query) => Some(query),
            _ => None,
        }
    }

    pub fn is_transaction(&self) -> bool {
        matches!(self, Self::Transaction(_))
    }
}
