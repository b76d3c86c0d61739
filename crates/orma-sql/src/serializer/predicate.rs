use super::{Comma, Delimited, Params, ToSql};

use orma_core::{sql::Predicate, sqm::JunctionKind};

impl ToSql for &Predicate {
    fn to_sql<P: Params>(self, f: &mut super::Formatter<'_, P>) {
        use Predicate::*;

        match self {
            Comparison(p) => {
                let lhs = &p.lhs;
                let rhs = &p.rhs;
                fmt!(f, lhs " " p.op.as_str() " " rhs);
            }
            Junction(p) if p.predicates.is_empty() => match p.kind {
                JunctionKind::And => fmt!(f, "1 = 1"),
                JunctionKind::Or => fmt!(f, "1 = 0"),
            },
            Junction(p) => {
                let delim = match p.kind {
                    JunctionKind::And => " AND ",
                    JunctionKind::Or => " OR ",
                };
                fmt!(f, Delimited(p.predicates.iter().map(Operand), delim));
            }
            Negated(p) => {
                let p = &**p;
                fmt!(f, "NOT (" p ")");
            }
            NullCheck(p) => {
                let expr = &p.expr;
                let op = if p.negated { " IS NOT NULL" } else { " IS NULL" };
                fmt!(f, expr op);
            }
            // An empty list matches nothing
            InList(p) if p.list.is_empty() => {
                let always = if p.negated { "1 = 1" } else { "1 = 0" };
                fmt!(f, always);
            }
            InList(p) => {
                let expr = &p.expr;
                let op = if p.negated { " NOT IN (" } else { " IN (" };
                fmt!(f, expr op Comma(&p.list) ")");
            }
            InSubquery(p) => {
                let expr = &p.expr;
                let subquery = &*p.subquery;
                let op = if p.negated { " NOT IN (" } else { " IN (" };
                fmt!(f, expr op subquery ")");
            }
            Exists(p) => {
                let subquery = &*p.subquery;
                let op = if p.negated { "NOT EXISTS (" } else { "EXISTS (" };
                fmt!(f, op subquery ")");
            }
            Like(p) => {
                let expr = &p.expr;
                let pattern = &p.pattern;
                let op = if p.negated { " NOT LIKE " } else { " LIKE " };
                fmt!(f, expr op pattern);

                if let Some(escape) = &p.escape {
                    fmt!(f, " ESCAPE " escape);
                }
            }
            Between(p) => {
                let expr = &p.expr;
                let low = &p.low;
                let high = &p.high;
                let op = if p.negated { " NOT BETWEEN " } else { " BETWEEN " };
                fmt!(f, expr op low " AND " high);
            }
            BooleanExpr(expr) => expr.to_sql(f),
        }
    }
}

/// A junction operand; nested junctions are parenthesized.
struct Operand<'a>(&'a Predicate);

impl ToSql for Operand<'_> {
    fn to_sql<P: Params>(self, f: &mut super::Formatter<'_, P>) {
        match self.0 {
            Predicate::Junction(junction) if junction.predicates.len() > 1 => {
                let p = self.0;
                fmt!(f, "(" p ")");
            }
            p => p.to_sql(f),
        }
    }
}
