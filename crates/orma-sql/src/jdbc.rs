//! Rendered statements: SQL text plus the binders that produce parameter
//! values at execution time.

use indexmap::IndexSet;
use orma_core::{
    driver::operation::QuerySql,
    sql::{Expectation, JdbcParameter, JdbcParameterBindings, ParameterBinder},
    stmt::{Type, Value},
    Result,
};

/// A rendered select.
#[derive(Debug, Clone)]
pub struct JdbcSelect {
    pub sql: String,

    /// One binder per placeholder, in placeholder order
    pub binders: Vec<JdbcParameter>,

    /// Type of each column of the result rows, by values-array position
    pub values_mapping: Vec<Type>,

    /// Tables read by the statement, used to decide auto-flush
    pub affected_table_names: IndexSet<String>,
}

/// A rendered insert, update, or delete.
#[derive(Debug, Clone)]
pub struct JdbcMutation {
    pub sql: String,

    /// One binder per placeholder, in placeholder order
    pub binders: Vec<JdbcParameter>,

    pub table_name: String,

    pub expectation: Expectation,

    /// Type of the generated identifier read back, if any
    pub returning: Option<Type>,
}

impl JdbcSelect {
    /// Resolves every binder and packages the statement for the driver.
    pub fn bind(&self, bindings: &impl JdbcParameterBindings) -> Result<QuerySql> {
        Ok(QuerySql {
            sql: self.sql.clone(),
            params: bind(&self.binders, bindings)?,
            ret: Some(self.values_mapping.clone()),
        })
    }
}

impl JdbcMutation {
    pub fn bind(&self, bindings: &impl JdbcParameterBindings) -> Result<QuerySql> {
        Ok(QuerySql {
            sql: self.sql.clone(),
            params: bind(&self.binders, bindings)?,
            ret: self.returning.clone().map(|ty| vec![ty]),
        })
    }
}

fn bind(binders: &[JdbcParameter], bindings: &impl JdbcParameterBindings) -> Result<Vec<Value>> {
    binders
        .iter()
        .map(|binder| match &binder.binder {
            ParameterBinder::Value(value) => Ok(value.clone()),
            _ => bindings.resolve(binder),
        })
        .collect()
}
