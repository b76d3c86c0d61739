use super::{
    SqmCopyContext, SqmExpr, SqmFromClause, SqmPredicate, SqmRestriction, SqmSelectClause,
    SqmSelection, SqmSortSpecification,
};
use crate::{Error, Result};

/// One select level of an object query: the outer query or a subquery.
#[derive(Debug, Default, PartialEq)]
pub struct SqmQuerySpec {
    pub select_clause: SqmSelectClause,
    pub from_clause: SqmFromClause,
    where_clause: SqmRestriction,
    pub group_by: Vec<SqmExpr>,
    having_clause: SqmRestriction,
    pub order_by: Vec<SqmSortSpecification>,
    limit: Option<SqmExpr>,
    offset: Option<SqmExpr>,
}

impl SqmQuerySpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_selection(&mut self, selection: SqmSelection) -> Result<()> {
        self.select_clause.add_selection(selection)
    }

    pub fn selections(&self) -> &[SqmSelection] {
        &self.select_clause.selections
    }

    pub fn where_clause(&self) -> Option<&SqmPredicate> {
        self.where_clause.predicate()
    }

    pub fn set_where_clause_restrictions(&mut self, predicate: SqmPredicate) -> Result<()> {
        self.where_clause.set("where", predicate)
    }

    pub fn add_restriction(&mut self, predicate: SqmPredicate) {
        self.where_clause.add(predicate);
    }

    pub fn having_clause(&self) -> Option<&SqmPredicate> {
        self.having_clause.predicate()
    }

    pub fn set_having_clause_restrictions(&mut self, predicate: SqmPredicate) -> Result<()> {
        self.having_clause.set("having", predicate)
    }

    pub fn add_having_restriction(&mut self, predicate: SqmPredicate) {
        self.having_clause.add(predicate);
    }

    pub fn add_group_by(&mut self, expr: SqmExpr) {
        self.group_by.push(expr);
    }

    pub fn add_sort_specification(&mut self, sort: SqmSortSpecification) {
        self.order_by.push(sort);
    }

    pub fn limit(&self) -> Option<&SqmExpr> {
        self.limit.as_ref()
    }

    pub fn set_limit(&mut self, limit: SqmExpr) -> Result<()> {
        if self.limit.is_some() {
            return Err(Error::invalid_statement("limit already set"));
        }
        self.limit = Some(limit);
        Ok(())
    }

    pub fn offset(&self) -> Option<&SqmExpr> {
        self.offset.as_ref()
    }

    pub fn set_offset(&mut self, offset: SqmExpr) -> Result<()> {
        if self.offset.is_some() {
            return Err(Error::invalid_statement("offset already set"));
        }
        self.offset = Some(offset);
        Ok(())
    }

    /// Deep copy. The from clause is copied first so that every path can
    /// resolve the copy of the from-element it references.
    pub fn copy(&self, context: &mut SqmCopyContext) -> Self {
        let from_clause = self.from_clause.copy(context);

        Self {
            select_clause: self.select_clause.copy(context),
            from_clause,
            where_clause: self.where_clause.copy(context),
            group_by: self.group_by.iter().map(|expr| expr.copy(context)).collect(),
            having_clause: self.having_clause.copy(context),
            order_by: self.order_by.iter().map(|sort| sort.copy(context)).collect(),
            limit: self.limit.as_ref().map(|expr| expr.copy(context)),
            offset: self.offset.as_ref().map(|expr| expr.copy(context)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stmt::Value;

    fn eq(v: i64) -> SqmPredicate {
        SqmPredicate::eq(SqmExpr::literal(v), SqmExpr::literal(v))
    }

    #[test]
    fn second_where_set_fails() {
        let mut spec = SqmQuerySpec::new();
        spec.set_where_clause_restrictions(eq(1)).unwrap();

        let err = spec.set_where_clause_restrictions(eq(2)).unwrap_err();
        assert!(err.is_invalid_statement());
        assert!(err.to_string().contains("already set"), "{err}");

        // The first restriction is kept
        assert_eq!(spec.where_clause(), Some(&eq(1)));
    }

    #[test]
    fn add_restriction_conjoins() {
        let mut spec = SqmQuerySpec::new();
        spec.add_restriction(eq(1));
        assert_eq!(spec.where_clause(), Some(&eq(1)));

        spec.add_restriction(eq(2));
        assert_eq!(
            spec.where_clause(),
            Some(&SqmPredicate::and(eq(1), eq(2)))
        );

        // Setting after adding fails too
        assert!(spec.set_where_clause_restrictions(eq(3)).is_err());
    }

    #[test]
    fn having_follows_the_same_rules() {
        let mut spec = SqmQuerySpec::new();
        spec.set_having_clause_restrictions(eq(1)).unwrap();
        assert!(spec.set_having_clause_restrictions(eq(2)).is_err());

        spec.add_having_restriction(eq(2));
        assert_eq!(
            spec.having_clause(),
            Some(&SqmPredicate::and(eq(1), eq(2)))
        );
        assert!(spec.where_clause().is_none());
    }

    #[test]
    fn limit_and_offset_are_set_once() {
        let mut spec = SqmQuerySpec::new();
        spec.set_limit(SqmExpr::literal(10)).unwrap();
        spec.set_offset(SqmExpr::literal(5)).unwrap();

        assert!(spec.set_limit(SqmExpr::literal(20)).is_err());
        assert!(spec.set_offset(SqmExpr::literal(0)).is_err());
        assert_eq!(spec.limit(), Some(&SqmExpr::Literal(Value::I32(10))));
    }
}
