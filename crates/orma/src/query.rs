mod bindings;
pub(crate) use bindings::{Binding, BindingResolver};
pub use bindings::QueryParameterBindings;

use crate::{engine::QueryOptions, session::EntityKey, Instance, Session};

use orma_core::{
    sqm::{ParameterLabel, SqmStatement},
    stmt::{LockMode, Value},
    Error, Result,
};

use indexmap::IndexMap;
use std::time::Duration;

/// An executable query created by a session.
///
/// The statement is a private copy of the interpreted query, so parameters
/// bound here never leak into other executions of the same query string.
#[derive(Debug)]
pub struct Query<'a> {
    session: &'a mut Session,
    sqm: SqmStatement,
    bindings: QueryParameterBindings,
    options: QueryOptions,
}

/// One value of a result row.
#[derive(Debug)]
pub enum ResultValue {
    Scalar(Value),

    /// A managed entity; `None` for the unmatched side of an outer join
    Entity(Option<EntityKey>),

    /// A registered instantiation target
    Instance(Instance),

    /// `select new list(...)`
    List(Vec<ResultValue>),

    /// `select new map(...)`, keyed by alias or by argument position
    Map(IndexMap<String, ResultValue>),

    /// A row of several selections
    Tuple(Vec<ResultValue>),
}

impl<'a> Query<'a> {
    pub(crate) fn new(session: &'a mut Session, sqm: SqmStatement) -> Self {
        let bindings = QueryParameterBindings::new(sqm.parameters());

        Self {
            session,
            sqm,
            bindings,
            options: QueryOptions::default(),
        }
    }

    pub fn set_parameter(&mut self, name: &str, value: impl Into<Value>) -> Result<&mut Self> {
        self.bindings.bind(
            ParameterLabel::Named(name.to_string()),
            Binding::Single(value.into()),
        )?;
        Ok(self)
    }

    /// Binds a collection to a parameter used as an `in` list operand.
    pub fn set_parameter_list<I, V>(&mut self, name: &str, values: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.bindings.bind(
            ParameterLabel::Named(name.to_string()),
            Binding::Multi(values.into_iter().map(Into::into).collect()),
        )?;
        Ok(self)
    }

    pub fn set_positional(&mut self, position: usize, value: impl Into<Value>) -> Result<&mut Self> {
        self.bindings.bind(
            ParameterLabel::Positional(position),
            Binding::Single(value.into()),
        )?;
        Ok(self)
    }

    pub fn set_max_results(&mut self, max_results: usize) -> &mut Self {
        self.options.max_results = Some(max_results);
        self
    }

    pub fn set_first_result(&mut self, first_result: usize) -> &mut Self {
        self.options.first_result = Some(first_result);
        self
    }

    pub fn set_lock_mode(&mut self, lock_mode: LockMode) -> &mut Self {
        self.options.lock_mode = lock_mode;
        self
    }

    pub fn set_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.options.timeout = Some(timeout);
        self
    }

    pub fn statement(&self) -> &SqmStatement {
        &self.sqm
    }

    pub fn bindings(&self) -> &QueryParameterBindings {
        &self.bindings
    }

    pub async fn list(&mut self) -> Result<Vec<ResultValue>> {
        let Some(select) = self.sqm.as_select() else {
            return Err(Error::invalid_statement(
                "`list` requires a select statement; use `execute_update`",
            ));
        };

        self.bindings.verify_all_bound()?;

        self.session
            .engine()
            .list(select, &self.bindings, &self.options)
            .await
    }

    /// The only result; fails when there is none or several.
    pub async fn single_result(&mut self) -> Result<ResultValue> {
        match self.unique_result().await? {
            Some(result) => Ok(result),
            None => Err(Error::record_not_found("query returned no result")),
        }
    }

    /// The only result, if any; fails when there are several.
    pub async fn unique_result(&mut self) -> Result<Option<ResultValue>> {
        let mut results = self.list().await?;

        if results.len() > 1 {
            return Err(Error::too_many_records(format!(
                "query returned {} results where at most one was expected",
                results.len()
            )));
        }

        Ok(results.pop())
    }

    /// Executes an update or delete statement, returning the affected row
    /// count.
    pub async fn execute_update(&mut self) -> Result<u64> {
        if self.sqm.is_select() {
            return Err(Error::invalid_statement(
                "`execute_update` requires an update or delete statement",
            ));
        }

        self.bindings.verify_all_bound()?;

        self.session
            .engine()
            .execute_dml(&self.sqm, &self.bindings, self.options.timeout)
            .await
    }
}

impl ResultValue {
    pub fn as_scalar(&self) -> Option<&Value> {
        match self {
            Self::Scalar(value) => Some(value),
            _ => None,
        }
    }

    /// The entity key of an entity result; `None` for other results and
    /// unmatched outer joins.
    pub fn as_entity(&self) -> Option<&EntityKey> {
        match self {
            Self::Entity(key) => key.as_ref(),
            _ => None,
        }
    }

    pub fn as_instance(&self) -> Option<&Instance> {
        match self {
            Self::Instance(instance) => Some(instance),
            _ => None,
        }
    }

    pub fn as_tuple(&self) -> Option<&[ResultValue]> {
        match self {
            Self::Tuple(values) | Self::List(values) => Some(values),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&IndexMap<String, ResultValue>> {
        match self {
            Self::Map(values) => Some(values),
            _ => None,
        }
    }

    pub fn into_scalar(self) -> Result<Value> {
        match self {
            Self::Scalar(value) => Ok(value),
            other => Err(Error::invalid_statement(format!(
                "expected a scalar result; got {other:?}"
            ))),
        }
    }
}
