use super::{JdbcParameter, QuerySpec};
use crate::stmt::{ArithmeticOp, Type, Value};

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Column(ColumnReference),

    /// A `?` placeholder
    Parameter(JdbcParameter),

    Literal(Value),

    Function(Function),

    Arithmetic(Arithmetic),

    /// Unary minus
    Negated(Box<Expression>),

    /// Row value constructor, `(a, b)`
    Tuple(Vec<Expression>),

    /// Scalar subquery
    Subquery(Box<QuerySpec>),

    /// `*`, only valid as a `count` argument
    Star,
}

/// A column of a table reference, `i1_0.title`.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnReference {
    /// Identification variable of the table reference; `None` in single-table
    /// mutations, which are rendered unqualified
    pub qualifier: Option<String>,

    pub column: String,

    /// Relational type of the column
    pub ty: Type,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: &'static str,
    pub args: Vec<Expression>,
    pub distinct: bool,
    pub ty: Type,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Arithmetic {
    pub op: ArithmeticOp,
    pub lhs: Box<Expression>,
    pub rhs: Box<Expression>,
    pub ty: Type,
}

impl Expression {
    pub fn column(qualifier: Option<&str>, column: &str, ty: Type) -> Self {
        Self::Column(ColumnReference {
            qualifier: qualifier.map(str::to_string),
            column: column.to_string(),
            ty,
        })
    }

    pub fn as_column(&self) -> Option<&ColumnReference> {
        match self {
            Self::Column(column) => Some(column),
            _ => None,
        }
    }

    /// Relational type produced by the expression.
    pub fn ty(&self) -> Type {
        match self {
            Self::Column(column) => column.ty.clone(),
            Self::Parameter(param) => param.ty.clone(),
            Self::Literal(value) => value.infer_ty(),
            Self::Function(func) => func.ty.clone(),
            Self::Arithmetic(arithmetic) => arithmetic.ty.clone(),
            Self::Negated(expr) => expr.ty(),
            Self::Tuple(exprs) => Type::Record(exprs.iter().map(Expression::ty).collect()),
            Self::Subquery(query) => match query.select_clause.selections.first() {
                Some(selection) => selection.expression.ty(),
                None => Type::Unknown,
            },
            Self::Star => Type::Unknown,
        }
    }

    /// Number of JDBC parameters in the expression, counted in render order.
    pub fn jdbc_parameter_count(&self) -> usize {
        match self {
            Self::Parameter(_) => 1,
            Self::Function(func) => func.args.iter().map(Expression::jdbc_parameter_count).sum(),
            Self::Arithmetic(arithmetic) => {
                arithmetic.lhs.jdbc_parameter_count() + arithmetic.rhs.jdbc_parameter_count()
            }
            Self::Negated(expr) => expr.jdbc_parameter_count(),
            Self::Tuple(exprs) => exprs.iter().map(Expression::jdbc_parameter_count).sum(),
            Self::Column(_) | Self::Literal(_) | Self::Subquery(_) | Self::Star => 0,
        }
    }
}

impl From<ColumnReference> for Expression {
    fn from(value: ColumnReference) -> Self {
        Self::Column(value)
    }
}

impl From<JdbcParameter> for Expression {
    fn from(value: JdbcParameter) -> Self {
        Self::Parameter(value)
    }
}

impl From<Value> for Expression {
    fn from(value: Value) -> Self {
        Self::Literal(value)
    }
}
