use super::{SqmCopyContext, SqmParameter, SqmPath, SqmQuerySpec};
use crate::stmt::{ArithmeticOp, Type, Value};

use std::sync::Arc;

/// An object-query expression.
#[derive(Debug, PartialEq)]
pub enum SqmExpr {
    Path(SqmPath),

    Literal(Value),

    Parameter(Arc<SqmParameter>),

    Function(SqmFunction),

    Arithmetic(SqmArithmetic),

    /// Unary minus
    Negated(Box<SqmExpr>),

    /// Row value constructor
    Tuple(Vec<SqmExpr>),

    /// Scalar subquery
    Subquery(Box<SqmQuerySpec>),
}

#[derive(Debug, PartialEq)]
pub struct SqmFunction {
    pub name: SqmFunctionName,

    /// Empty for `count(*)`
    pub args: Vec<SqmExpr>,

    pub distinct: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqmFunctionName {
    Upper,
    Lower,
    Length,
    Concat,
    Coalesce,
    Abs,
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

#[derive(Debug, PartialEq)]
pub struct SqmArithmetic {
    pub op: ArithmeticOp,
    pub lhs: Box<SqmExpr>,
    pub rhs: Box<SqmExpr>,
}

impl SqmExpr {
    pub fn literal(value: impl Into<Value>) -> Self {
        Self::Literal(value.into())
    }

    pub fn parameter(parameter: &Arc<SqmParameter>) -> Self {
        Self::Parameter(parameter.clone())
    }

    pub fn function(name: SqmFunctionName, args: Vec<SqmExpr>) -> Self {
        Self::Function(SqmFunction {
            name,
            args,
            distinct: false,
        })
    }

    pub fn arithmetic(lhs: impl Into<Self>, op: ArithmeticOp, rhs: impl Into<Self>) -> Self {
        Self::Arithmetic(SqmArithmetic {
            op,
            lhs: Box::new(lhs.into()),
            rhs: Box::new(rhs.into()),
        })
    }

    pub fn as_path(&self) -> Option<&SqmPath> {
        match self {
            Self::Path(path) => Some(path),
            _ => None,
        }
    }

    pub fn is_aggregate(&self) -> bool {
        matches!(self, Self::Function(func) if func.name.is_aggregate())
    }

    /// The expression's type as far as it can be inferred without bindings.
    pub fn ty(&self) -> Type {
        match self {
            Self::Path(path) => path.ty.clone(),
            Self::Literal(value) => value.infer_ty(),
            Self::Parameter(param) => param.ty.clone().unwrap_or(Type::Unknown),
            Self::Function(func) => func.ty(),
            Self::Arithmetic(arithmetic) => {
                let lhs = arithmetic.lhs.ty();
                let rhs = arithmetic.rhs.ty();

                if lhs == Type::F64 || rhs == Type::F64 {
                    Type::F64
                } else if lhs.is_unknown() {
                    rhs
                } else if rhs.is_unknown() || lhs == rhs {
                    lhs
                } else {
                    Type::I64
                }
            }
            Self::Negated(expr) => expr.ty(),
            Self::Tuple(exprs) => Type::Record(exprs.iter().map(SqmExpr::ty).collect()),
            Self::Subquery(query) => match query.select_clause.selections.first() {
                Some(selection) => selection.node.ty(),
                None => Type::Unknown,
            },
        }
    }

    pub fn copy(&self, context: &mut SqmCopyContext) -> Self {
        match self {
            Self::Path(path) => Self::Path(path.copy(context)),
            Self::Literal(value) => Self::Literal(value.clone()),
            Self::Parameter(param) => Self::Parameter(SqmParameter::copy(param, context)),
            Self::Function(func) => Self::Function(SqmFunction {
                name: func.name,
                args: func.args.iter().map(|arg| arg.copy(context)).collect(),
                distinct: func.distinct,
            }),
            Self::Arithmetic(arithmetic) => Self::Arithmetic(SqmArithmetic {
                op: arithmetic.op,
                lhs: Box::new(arithmetic.lhs.copy(context)),
                rhs: Box::new(arithmetic.rhs.copy(context)),
            }),
            Self::Negated(expr) => Self::Negated(Box::new(expr.copy(context))),
            Self::Tuple(exprs) => Self::Tuple(exprs.iter().map(|expr| expr.copy(context)).collect()),
            Self::Subquery(query) => Self::Subquery(Box::new(query.copy(context))),
        }
    }
}

impl SqmFunction {
    pub fn ty(&self) -> Type {
        use SqmFunctionName::*;

        let first = || self.args.first().map(SqmExpr::ty).unwrap_or(Type::Unknown);

        match self.name {
            Upper | Lower | Concat => Type::String,
            Length | Count => Type::I64,
            Avg => Type::F64,
            Sum => match first() {
                Type::F64 => Type::F64,
                _ => Type::I64,
            },
            Abs | Min | Max => first(),
            Coalesce => self
                .args
                .iter()
                .map(SqmExpr::ty)
                .find(|ty| !ty.is_unknown() && *ty != Type::Null)
                .unwrap_or(Type::Unknown),
        }
    }
}

impl SqmFunctionName {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name.to_ascii_lowercase().as_str() {
            "upper" => Self::Upper,
            "lower" => Self::Lower,
            "length" => Self::Length,
            "concat" => Self::Concat,
            "coalesce" => Self::Coalesce,
            "abs" => Self::Abs,
            "count" => Self::Count,
            "sum" => Self::Sum,
            "avg" => Self::Avg,
            "min" => Self::Min,
            "max" => Self::Max,
            _ => return None,
        })
    }

    pub fn is_aggregate(self) -> bool {
        matches!(
            self,
            Self::Count | Self::Sum | Self::Avg | Self::Min | Self::Max
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Upper => "upper",
            Self::Lower => "lower",
            Self::Length => "length",
            Self::Concat => "concat",
            Self::Coalesce => "coalesce",
            Self::Abs => "abs",
            Self::Count => "count",
            Self::Sum => "sum",
            Self::Avg => "avg",
            Self::Min => "min",
            Self::Max => "max",
        }
    }
}

impl From<Value> for SqmExpr {
    fn from(value: Value) -> Self {
        Self::Literal(value)
    }
}

impl From<&Arc<SqmParameter>> for SqmExpr {
    fn from(value: &Arc<SqmParameter>) -> Self {
        Self::Parameter(value.clone())
    }
}
