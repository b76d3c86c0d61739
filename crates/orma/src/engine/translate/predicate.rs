use super::{expr::TypeHint, Translator};
use crate::query::Binding;

use orma_core::{
    sql::{
        Between, Exists, Expression, InList, InSubquery, Junction, Like, NullCheck, Predicate,
    },
    sqm::{SqmExpr, SqmPredicate},
    stmt::{Type, Value},
    Error, Result,
};

impl Translator<'_> {
    pub(crate) fn predicate(&mut self, predicate: &SqmPredicate) -> Result<Predicate> {
        Ok(match predicate {
            SqmPredicate::Comparison(comparison) => {
                let embedded_parameter = |lhs: &SqmExpr, rhs: &SqmExpr| {
                    self.is_embedded(lhs) && matches!(rhs, SqmExpr::Parameter(_))
                };

                if embedded_parameter(&comparison.lhs, &comparison.rhs)
                    || embedded_parameter(&comparison.rhs, &comparison.lhs)
                {
                    return Err(Error::not_yet_implemented(
                        "comparing an embedded value with a parameter",
                    ));
                }

                let lhs_hint = self.hint(&comparison.rhs);
                let rhs_hint = self.hint(&comparison.lhs);

                Predicate::comparison(
                    self.expr(&comparison.lhs, lhs_hint.as_ref())?,
                    comparison.op,
                    self.expr(&comparison.rhs, rhs_hint.as_ref())?,
                )
            }
            SqmPredicate::Junction(junction) => Predicate::Junction(Junction {
                kind: junction.kind,
                predicates: junction
                    .predicates
                    .iter()
                    .map(|predicate| self.predicate(predicate))
                    .collect::<Result<_>>()?,
            }),
            SqmPredicate::Negated(predicate) => Predicate::not(self.predicate(predicate)?),
            SqmPredicate::IsNull(is_null) => match &is_null.expr {
                SqmExpr::Path(path) if self.is_embedded(&is_null.expr) => {
                    // An embedded value is null when all of its columns are
                    let predicates = self
                        .path_columns(path)?
                        .into_iter()
                        .map(|column| Ok(Predicate::is_null(self.column(&path.lhs, column)?)))
                        .collect::<Result<Vec<_>>>()?;

                    let all_null = Predicate::and_all(predicates)
                        .ok_or_else(|| Error::invalid_statement("embeddable without columns"))?;

                    if is_null.negated {
                        Predicate::not(all_null)
                    } else {
                        all_null
                    }
                }
                expr => Predicate::NullCheck(NullCheck {
                    expr: self.expr(expr, None)?,
                    negated: is_null.negated,
                }),
            },
            SqmPredicate::InList(in_list) => {
                let hint = self.hint(&in_list.expr);
                let mut list = vec![];

                for item in &in_list.list {
                    match item {
                        // A list binding expands to one placeholder per element
                        SqmExpr::Parameter(parameter) => match self.binding(parameter) {
                            Some(Binding::Multi(values)) => {
                                for index in 0..values.len() {
                                    list.push(
                                        self.parameter(parameter, Some(index), hint.as_ref())
                                            .into(),
                                    );
                                }
                            }
                            _ => list.push(self.parameter(parameter, None, hint.as_ref()).into()),
                        },
                        item => list.push(self.expr(item, hint.as_ref())?),
                    }
                }

                Predicate::InList(InList {
                    expr: self.expr(&in_list.expr, None)?,
                    list,
                    negated: in_list.negated,
                })
            }
            SqmPredicate::InSubquery(in_subquery) => Predicate::InSubquery(InSubquery {
                expr: self.expr(&in_subquery.expr, None)?,
                subquery: Box::new(self.subquery(&in_subquery.subquery)?),
                negated: in_subquery.negated,
            }),
            SqmPredicate::Exists(exists) => Predicate::Exists(Exists {
                subquery: Box::new(self.subquery(&exists.subquery)?),
                negated: exists.negated,
            }),
            SqmPredicate::Like(like) => {
                let hint = TypeHint {
                    ty: Type::String,
                    converter: None,
                };

                Predicate::Like(Like {
                    expr: self.expr(&like.expr, None)?,
                    pattern: self.expr(&like.pattern, Some(&hint))?,
                    escape: like
                        .escape
                        .as_ref()
                        .map(|escape| self.expr(escape, Some(&hint)))
                        .transpose()?,
                    negated: like.negated,
                })
            }
            SqmPredicate::Between(between) => {
                let hint = self.hint(&between.expr);

                Predicate::Between(Between {
                    expr: self.expr(&between.expr, None)?,
                    low: self.expr(&between.low, hint.as_ref())?,
                    high: self.expr(&between.high, hint.as_ref())?,
                    negated: between.negated,
                })
            }
            SqmPredicate::BooleanExpr(expr) => {
                let converter = self.hint(expr).and_then(|hint| hint.converter);

                match converter {
                    // `where i.open` on a converted column compares with the
                    // converted form of `true`
                    Some(converter) => {
                        let truth = self.types.to_relational(Some(&converter), Value::Bool(true))?;
                        Predicate::eq(self.expr(expr, None)?, Expression::Literal(truth))
                    }
                    None => Predicate::BooleanExpr(self.expr(expr, None)?),
                }
            }
        })
    }
}
