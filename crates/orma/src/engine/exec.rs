//! The execution boundary: the only place the engine awaits the database.

use orma_core::{
    driver::{operation::QuerySql, Connection, Operation, Response},
    sql::{JdbcParameter, JdbcParameterBindings, ParameterBinder},
    stmt::Value,
    Error, Result,
};

use std::time::Duration;

/// Bindings of statements the engine builds itself: every value is known
/// when the statement is built, except an identifier generated by an
/// earlier insert of the same mutation group.
#[derive(Debug, Default)]
pub(crate) struct StaticBindings<'a> {
    pub(crate) generated_id: Option<&'a Value>,
}

/// Executes one operation, failing with a timeout error when the database
/// does not answer in time.
pub(crate) async fn exec(
    connection: &mut dyn Connection,
    op: impl Into<Operation>,
    timeout: Option<Duration>,
) -> Result<Response> {
    let op = op.into();

    match &op {
        Operation::QuerySql(QuerySql { sql, params, .. }) => {
            tracing::debug!(sql = %sql, params = params.len(), "executing statement");
        }
        Operation::Transaction(transaction) => {
            tracing::debug!(?transaction, "executing transaction operation");
        }
    }

    match timeout {
        Some(duration) => tokio::time::timeout(duration, connection.exec(op))
            .await
            .map_err(|_| Error::query_timeout(duration))?,
        None => connection.exec(op).await,
    }
}

impl JdbcParameterBindings for StaticBindings<'_> {
    fn resolve(&self, parameter: &JdbcParameter) -> Result<Value> {
        match &parameter.binder {
            ParameterBinder::Value(value) => Ok(value.clone()),
            ParameterBinder::GeneratedIdentifier => self
                .generated_id
                .map(|id| id.clone())
                .ok_or_else(|| Error::invalid_statement("no identifier was generated yet")),
            ParameterBinder::Query { parameter, .. } => Err(Error::invalid_statement(format!(
                "no value bound for parameter {}",
                parameter.label
            ))),
        }
    }
}
