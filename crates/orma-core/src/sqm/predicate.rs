use super::{SqmCopyContext, SqmExpr, SqmQuerySpec};
use crate::stmt::BinaryOp;

/// A boolean-valued node of the object-query model.
#[derive(Debug, PartialEq)]
pub enum SqmPredicate {
    Comparison(SqmComparison),
    Junction(SqmJunction),
    Negated(Box<SqmPredicate>),
    IsNull(SqmIsNull),
    InList(SqmInList),
    InSubquery(SqmInSubquery),
    Exists(SqmExists),
    Like(SqmLike),
    Between(SqmBetween),

    /// A boolean-typed expression used as a predicate: `where i.open`
    BooleanExpr(SqmExpr),
}

#[derive(Debug, PartialEq)]
pub struct SqmComparison {
    pub lhs: SqmExpr,
    pub op: BinaryOp,
    pub rhs: SqmExpr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JunctionKind {
    And,
    Or,
}

/// Conjunction or disjunction, evaluated left to right.
#[derive(Debug, PartialEq)]
pub struct SqmJunction {
    pub kind: JunctionKind,
    pub predicates: Vec<SqmPredicate>,
}

#[derive(Debug, PartialEq)]
pub struct SqmIsNull {
    pub expr: SqmExpr,
    pub negated: bool,
}

#[derive(Debug, PartialEq)]
pub struct SqmInList {
    pub expr: SqmExpr,
    pub list: Vec<SqmExpr>,
    pub negated: bool,
}

#[derive(Debug, PartialEq)]
pub struct SqmInSubquery {
    pub expr: SqmExpr,
    pub subquery: Box<SqmQuerySpec>,
    pub negated: bool,
}

#[derive(Debug, PartialEq)]
pub struct SqmExists {
    pub subquery: Box<SqmQuerySpec>,
    pub negated: bool,
}

#[derive(Debug, PartialEq)]
pub struct SqmLike {
    pub expr: SqmExpr,
    pub pattern: SqmExpr,
    pub escape: Option<SqmExpr>,
    pub negated: bool,
}

#[derive(Debug, PartialEq)]
pub struct SqmBetween {
    pub expr: SqmExpr,
    pub low: SqmExpr,
    pub high: SqmExpr,
    pub negated: bool,
}

impl SqmPredicate {
    pub fn comparison(lhs: impl Into<SqmExpr>, op: BinaryOp, rhs: impl Into<SqmExpr>) -> Self {
        Self::Comparison(SqmComparison {
            lhs: lhs.into(),
            op,
            rhs: rhs.into(),
        })
    }

    pub fn eq(lhs: impl Into<SqmExpr>, rhs: impl Into<SqmExpr>) -> Self {
        Self::comparison(lhs, BinaryOp::Eq, rhs)
    }

    pub fn is_null(expr: impl Into<SqmExpr>) -> Self {
        Self::IsNull(SqmIsNull {
            expr: expr.into(),
            negated: false,
        })
    }

    pub fn in_list(expr: impl Into<SqmExpr>, list: Vec<SqmExpr>) -> Self {
        Self::InList(SqmInList {
            expr: expr.into(),
            list,
            negated: false,
        })
    }

    /// Conjoins `rhs` onto `lhs`, flattening into an existing conjunction so
    /// that predicates keep their left-to-right order.
    pub fn and(lhs: Self, rhs: Self) -> Self {
        match lhs {
            Self::Junction(mut junction) if junction.kind == JunctionKind::And => {
                junction.predicates.push(rhs);
                Self::Junction(junction)
            }
            lhs => Self::Junction(SqmJunction {
                kind: JunctionKind::And,
                predicates: vec![lhs, rhs],
            }),
        }
    }

    pub fn or(lhs: Self, rhs: Self) -> Self {
        match lhs {
            Self::Junction(mut junction) if junction.kind == JunctionKind::Or => {
                junction.predicates.push(rhs);
                Self::Junction(junction)
            }
            lhs => Self::Junction(SqmJunction {
                kind: JunctionKind::Or,
                predicates: vec![lhs, rhs],
            }),
        }
    }

    pub fn not(predicate: Self) -> Self {
        Self::Negated(Box::new(predicate))
    }

    pub fn copy(&self, context: &mut SqmCopyContext) -> Self {
        match self {
            Self::Comparison(p) => Self::Comparison(SqmComparison {
                lhs: p.lhs.copy(context),
                op: p.op,
                rhs: p.rhs.copy(context),
            }),
            Self::Junction(p) => Self::Junction(SqmJunction {
                kind: p.kind,
                predicates: p.predicates.iter().map(|p| p.copy(context)).collect(),
            }),
            Self::Negated(p) => Self::Negated(Box::new(p.copy(context))),
            Self::IsNull(p) => Self::IsNull(SqmIsNull {
                expr: p.expr.copy(context),
                negated: p.negated,
            }),
            Self::InList(p) => Self::InList(SqmInList {
                expr: p.expr.copy(context),
                list: p.list.iter().map(|expr| expr.copy(context)).collect(),
                negated: p.negated,
            }),
            Self::InSubquery(p) => Self::InSubquery(SqmInSubquery {
                expr: p.expr.copy(context),
                subquery: Box::new(p.subquery.copy(context)),
                negated: p.negated,
            }),
            Self::Exists(p) => Self::Exists(SqmExists {
                subquery: Box::new(p.subquery.copy(context)),
                negated: p.negated,
            }),
            Self::Like(p) => Self::Like(SqmLike {
                expr: p.expr.copy(context),
                pattern: p.pattern.copy(context),
                escape: p.escape.as_ref().map(|escape| escape.copy(context)),
                negated: p.negated,
            }),
            Self::Between(p) => Self::Between(SqmBetween {
                expr: p.expr.copy(context),
                low: p.low.copy(context),
                high: p.high.copy(context),
                negated: p.negated,
            }),
            Self::BooleanExpr(expr) => Self::BooleanExpr(expr.copy(context)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stmt::Value;

    fn lit(v: i64) -> SqmExpr {
        SqmExpr::Literal(Value::I64(v))
    }

    #[test]
    fn and_flattens_left_to_right() {
        let a = SqmPredicate::eq(lit(1), lit(1));
        let b = SqmPredicate::eq(lit(2), lit(2));
        let c = SqmPredicate::eq(lit(3), lit(3));

        let SqmPredicate::Junction(junction) = SqmPredicate::and(SqmPredicate::and(a, b), c) else {
            panic!("expected junction");
        };

        assert_eq!(junction.kind, JunctionKind::And);
        assert_eq!(junction.predicates.len(), 3);
        assert_eq!(junction.predicates[0], SqmPredicate::eq(lit(1), lit(1)));
        assert_eq!(junction.predicates[2], SqmPredicate::eq(lit(3), lit(3)));
    }

    #[test]
    fn and_does_not_flatten_disjunction() {
        let or = SqmPredicate::or(
            SqmPredicate::eq(lit(1), lit(1)),
            SqmPredicate::eq(lit(2), lit(2)),
        );
        let SqmPredicate::Junction(junction) =
            SqmPredicate::and(or, SqmPredicate::eq(lit(3), lit(3)))
        else {
            panic!("expected junction");
        };

        assert_eq!(junction.kind, JunctionKind::And);
        assert_eq!(junction.predicates.len(), 2);
    }
}
