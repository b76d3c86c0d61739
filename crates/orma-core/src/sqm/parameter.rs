use super::SqmCopyContext;
use crate::stmt::Type;

use std::{fmt, sync::Arc};

/// A query parameter.
///
/// Every occurrence of the same parameter in a tree shares one `Arc`, so a
/// single binding covers all occurrences. Values are supplied at execution
/// time through the query's parameter bindings and never stored here.
#[derive(Debug, PartialEq)]
pub struct SqmParameter {
    pub label: ParameterLabel,

    /// Type declared by the caller or inferred from the parameter's context
    pub ty: Option<Type>,

    /// True when the parameter appears as an `in` list operand, where a
    /// collection binding expands to one JDBC parameter per element
    pub allow_multi_valued: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParameterLabel {
    /// `:name`
    Named(String),

    /// `?1`
    Positional(usize),

    /// Created by the builder API without a label
    Anonymous(usize),
}

impl SqmParameter {
    pub fn named(name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            label: ParameterLabel::Named(name.into()),
            ty: None,
            allow_multi_valued: false,
        })
    }

    pub fn positional(position: usize) -> Arc<Self> {
        Arc::new(Self {
            label: ParameterLabel::Positional(position),
            ty: None,
            allow_multi_valued: false,
        })
    }

    pub fn anonymous(id: usize, ty: Type) -> Arc<Self> {
        Arc::new(Self {
            label: ParameterLabel::Anonymous(id),
            ty: Some(ty),
            allow_multi_valued: false,
        })
    }

    pub fn name(&self) -> Option<&str> {
        match &self.label {
            ParameterLabel::Named(name) => Some(name),
            _ => None,
        }
    }

    pub fn position(&self) -> Option<usize> {
        match &self.label {
            ParameterLabel::Positional(position) => Some(*position),
            _ => None,
        }
    }

    /// Copies the shared parameter once per copy context.
    pub fn copy(this: &Arc<Self>, context: &mut SqmCopyContext) -> Arc<Self> {
        context.copy(this, |_| Self {
            label: this.label.clone(),
            ty: this.ty.clone(),
            allow_multi_valued: this.allow_multi_valued,
        })
    }
}

impl fmt::Display for ParameterLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(name) => write!(f, ":{name}"),
            Self::Positional(position) => write!(f, "?{position}"),
            Self::Anonymous(id) => write!(f, "<param{id}>"),
        }
    }
}
