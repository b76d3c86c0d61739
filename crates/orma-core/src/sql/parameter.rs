use crate::{
    sqm::SqmParameter,
    stmt::{Type, Value},
    Result,
};

use std::sync::Arc;

/// A `?` placeholder and how its value is obtained.
#[derive(Debug, Clone, PartialEq)]
pub struct JdbcParameter {
    pub binder: ParameterBinder,

    /// Relational type of the bound value
    pub ty: Type,

    /// Attribute converter applied to query-parameter values before binding
    pub converter: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParameterBinder {
    /// Value known when the AST was built, already in relational form
    Value(Value),

    /// A query parameter, resolved from the execution's bindings. `index`
    /// selects one element of a list-valued binding expanded into several
    /// placeholders.
    Query {
        parameter: Arc<SqmParameter>,
        index: Option<usize>,
    },

    /// Identifier generated by an earlier insert of the same mutation group
    GeneratedIdentifier,
}

/// Supplies values for the parameters of one execution.
pub trait JdbcParameterBindings {
    /// The value bound to `parameter`, in relational form.
    fn resolve(&self, parameter: &JdbcParameter) -> Result<Value>;
}

impl JdbcParameter {
    pub fn value(value: impl Into<Value>, ty: Type) -> Self {
        Self {
            binder: ParameterBinder::Value(value.into()),
            ty,
            converter: None,
        }
    }

    pub fn query(parameter: &Arc<SqmParameter>, index: Option<usize>, ty: Type) -> Self {
        Self {
            binder: ParameterBinder::Query {
                parameter: parameter.clone(),
                index,
            },
            ty,
            converter: None,
        }
    }

    pub fn generated_identifier(ty: Type) -> Self {
        Self {
            binder: ParameterBinder::GeneratedIdentifier,
            ty,
            converter: None,
        }
    }

    pub fn with_converter(mut self, converter: Option<&str>) -> Self {
        self.converter = converter.map(str::to_string);
        self
    }

    /// The value when it is fixed at build time.
    pub fn static_value(&self) -> Option<&Value> {
        match &self.binder {
            ParameterBinder::Value(value) => Some(value),
            _ => None,
        }
    }
}
