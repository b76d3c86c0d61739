use orma_core::{
    schema::TypeConfiguration,
    sql::{JdbcParameter, JdbcParameterBindings, ParameterBinder},
    sqm::{ParameterLabel, SqmParameter},
    stmt::{Type, Value},
    Error, Result,
};

use indexmap::IndexMap;
use std::sync::Arc;

/// Values bound to the parameters of one query.
#[derive(Debug, Clone)]
pub struct QueryParameterBindings {
    parameters: Vec<Arc<SqmParameter>>,
    bindings: IndexMap<ParameterLabel, Binding>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Binding {
    Single(Value),

    /// A collection bound to an `in` list operand
    Multi(Vec<Value>),
}

/// Resolves the query parameters of a compiled statement against the
/// bindings, converting values to their relational form.
pub(crate) struct BindingResolver<'a> {
    pub(crate) bindings: &'a QueryParameterBindings,
    pub(crate) types: &'a TypeConfiguration,
}

impl QueryParameterBindings {
    pub(crate) fn new(parameters: Vec<Arc<SqmParameter>>) -> Self {
        Self {
            parameters,
            bindings: IndexMap::new(),
        }
    }

    pub(crate) fn bind(&mut self, label: ParameterLabel, binding: Binding) -> Result<()> {
        let parameter = self
            .parameters
            .iter()
            .find(|parameter| parameter.label == label)
            .ok_or_else(|| {
                Error::invalid_statement(format!("query has no parameter {label}"))
            })?;

        if matches!(binding, Binding::Multi(_)) && !parameter.allow_multi_valued {
            return Err(Error::invalid_statement(format!(
                "parameter {label} is not an `in` list operand and cannot be bound to a list"
            )));
        }

        self.bindings.insert(label, binding);
        Ok(())
    }

    pub(crate) fn get(&self, parameter: &SqmParameter) -> Option<&Binding> {
        self.bindings.get(&parameter.label)
    }

    pub fn is_bound(&self, label: &ParameterLabel) -> bool {
        self.bindings.contains_key(label)
    }

    /// Fails on the first parameter without a binding.
    pub(crate) fn verify_all_bound(&self) -> Result<()> {
        match self
            .parameters
            .iter()
            .find(|parameter| !self.bindings.contains_key(&parameter.label))
        {
            Some(parameter) => Err(Error::invalid_statement(format!(
                "no value bound for parameter {}",
                parameter.label
            ))),
            None => Ok(()),
        }
    }
}

impl JdbcParameterBindings for BindingResolver<'_> {
    fn resolve(&self, parameter: &JdbcParameter) -> Result<Value> {
        let ParameterBinder::Query {
            parameter: query_parameter,
            index,
        } = &parameter.binder
        else {
            return Err(Error::invalid_statement(
                "query statements bind only query parameters",
            ));
        };

        let unbound = || {
            Error::invalid_statement(format!(
                "no value bound for parameter {}",
                query_parameter.label
            ))
        };

        let value = match (self.bindings.get(query_parameter).ok_or_else(unbound)?, index) {
            (Binding::Single(value), None) => value.clone(),
            (Binding::Multi(values), Some(index)) => {
                values.get(*index).cloned().ok_or_else(unbound)?
            }
            (Binding::Single(_), Some(_)) | (Binding::Multi(_), None) => {
                return Err(Error::invalid_statement(format!(
                    "parameter {} was rebound with a different cardinality",
                    query_parameter.label
                )))
            }
        };

        match parameter.converter.as_deref() {
            Some(converter) => self.types.to_relational(Some(converter), value),
            None if parameter.ty == Type::Unknown => Ok(value),
            None => parameter.ty.cast(value),
        }
    }
}
