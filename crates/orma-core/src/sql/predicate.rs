use super::{Expression, QuerySpec};
use crate::{sqm::JunctionKind, stmt::BinaryOp};

/// A boolean-valued node of the SQL AST.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Comparison(Comparison),
    Junction(Junction),
    Negated(Box<Predicate>),
    NullCheck(NullCheck),
    InList(InList),
    InSubquery(InSubquery),
    Exists(Exists),
    Like(Like),
    Between(Between),
    BooleanExpr(Expression),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub lhs: Expression,
    pub op: BinaryOp,
    pub rhs: Expression,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Junction {
    pub kind: JunctionKind,
    pub predicates: Vec<Predicate>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NullCheck {
    pub expr: Expression,
    pub negated: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InList {
    pub expr: Expression,
    pub list: Vec<Expression>,
    pub negated: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InSubquery {
    pub expr: Expression,
    pub subquery: Box<QuerySpec>,
    pub negated: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Exists {
    pub subquery: Box<QuerySpec>,
    pub negated: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Like {
    pub expr: Expression,
    pub pattern: Expression,
    pub escape: Option<Expression>,
    pub negated: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Between {
    pub expr: Expression,
    pub low: Expression,
    pub high: Expression,
    pub negated: bool,
}

impl Predicate {
    pub fn comparison(lhs: impl Into<Expression>, op: BinaryOp, rhs: impl Into<Expression>) -> Self {
        Self::Comparison(Comparison {
            lhs: lhs.into(),
            op,
            rhs: rhs.into(),
        })
    }

    pub fn eq(lhs: impl Into<Expression>, rhs: impl Into<Expression>) -> Self {
        Self::comparison(lhs, BinaryOp::Eq, rhs)
    }

    pub fn is_null(expr: impl Into<Expression>) -> Self {
        Self::NullCheck(NullCheck {
            expr: expr.into(),
            negated: false,
        })
    }

    /// Conjunction. Nested conjunctions are flattened, keeping left-to-right
    /// order.
    pub fn and(lhs: Self, rhs: Self) -> Self {
        Self::junction(JunctionKind::And, lhs, rhs)
    }

    pub fn or(lhs: Self, rhs: Self) -> Self {
        Self::junction(JunctionKind::Or, lhs, rhs)
    }

    /// Conjunction of all `predicates`; `None` when empty.
    pub fn and_all(predicates: impl IntoIterator<Item = Self>) -> Option<Self> {
        predicates.into_iter().reduce(Self::and)
    }

    pub fn not(predicate: Self) -> Self {
        Self::Negated(Box::new(predicate))
    }

    fn junction(kind: JunctionKind, lhs: Self, rhs: Self) -> Self {
        let mut predicates = vec![];

        for operand in [lhs, rhs] {
            match operand {
                Self::Junction(junction) if junction.kind == kind => {
                    predicates.extend(junction.predicates)
                }
                operand => predicates.push(operand),
            }
        }

        Self::Junction(Junction { kind, predicates })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stmt::{Type, Value};

    fn col(name: &str) -> Expression {
        Expression::column(Some("t1_0"), name, Type::I64)
    }

    #[test]
    fn and_flattens_left_to_right() {
        let a = Predicate::eq(col("a"), Value::I64(1));
        let b = Predicate::eq(col("b"), Value::I64(2));
        let c = Predicate::eq(col("c"), Value::I64(3));

        let Predicate::Junction(junction) =
            Predicate::and(Predicate::and(a.clone(), b.clone()), c.clone())
        else {
            panic!("expected junction");
        };

        assert_eq!(junction.kind, JunctionKind::And);
        assert_eq!(junction.predicates, vec![a, b, c]);
    }

    #[test]
    fn and_all_of_nothing() {
        assert!(Predicate::and_all(vec![]).is_none());
    }
}
