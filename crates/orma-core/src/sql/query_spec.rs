use super::{Expression, FromClause, Predicate};
use crate::{
    stmt::{Direction, LockMode, NullPrecedence},
    Error, Result,
};

/// One select level of the SQL AST, the root query or a subquery.
#[derive(Debug, Clone, PartialEq)]
pub struct QuerySpec {
    /// Top-level query, as opposed to a subquery. Paging and locking are
    /// only rendered for the root.
    pub is_root: bool,

    pub select_clause: SelectClause,

    pub from_clause: FromClause,

    where_clause: Option<Predicate>,

    pub group_by: Vec<Expression>,

    having_clause: Option<Predicate>,

    pub order_by: Vec<SortSpecification>,

    limit: Option<Expression>,

    offset: Option<Expression>,

    pub lock_mode: LockMode,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectClause {
    pub distinct: bool,
    pub selections: Vec<SqlSelection>,
}

/// One entry of the select list.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlSelection {
    pub expression: Expression,

    /// Position in the row's values array (0-based)
    pub values_array_position: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SortSpecification {
    pub expression: Expression,
    pub direction: Direction,
    pub nulls: Option<NullPrecedence>,
}

impl QuerySpec {
    pub fn new(is_root: bool) -> Self {
        Self {
            is_root,
            select_clause: SelectClause::default(),
            from_clause: FromClause::default(),
            where_clause: None,
            group_by: vec![],
            having_clause: None,
            order_by: vec![],
            limit: None,
            offset: None,
            lock_mode: LockMode::None,
        }
    }

    pub fn where_clause(&self) -> Option<&Predicate> {
        self.where_clause.as_ref()
    }

    pub fn set_where_clause_restrictions(&mut self, predicate: Predicate) -> Result<()> {
        set_once(&mut self.where_clause, "where clause restriction", predicate)
    }

    /// Conjoins `predicate` with the current where clause.
    pub fn add_restriction(&mut self, predicate: Predicate) {
        conjoin(&mut self.where_clause, predicate);
    }

    pub fn having_clause(&self) -> Option<&Predicate> {
        self.having_clause.as_ref()
    }

    pub fn set_having_clause_restrictions(&mut self, predicate: Predicate) -> Result<()> {
        set_once(&mut self.having_clause, "having clause restriction", predicate)
    }

    pub fn add_having_restriction(&mut self, predicate: Predicate) {
        conjoin(&mut self.having_clause, predicate);
    }

    pub fn add_group_by(&mut self, expression: Expression) {
        self.group_by.push(expression);
    }

    pub fn add_sort_specification(&mut self, sort: SortSpecification) {
        self.order_by.push(sort);
    }

    pub fn limit(&self) -> Option<&Expression> {
        self.limit.as_ref()
    }

    pub fn set_limit(&mut self, limit: Expression) -> Result<()> {
        set_once(&mut self.limit, "limit", limit)
    }

    pub fn offset(&self) -> Option<&Expression> {
        self.offset.as_ref()
    }

    pub fn set_offset(&mut self, offset: Expression) -> Result<()> {
        set_once(&mut self.offset, "offset", offset)
    }
}

impl SelectClause {
    /// Appends `expression` to the select list and returns its values-array
    /// position.
    pub fn add_selection(&mut self, expression: Expression) -> usize {
        let position = self.selections.len();
        self.selections.push(SqlSelection {
            expression,
            values_array_position: position,
        });
        position
    }
}

impl SqlSelection {
    /// 1-based position in the JDBC result set
    pub fn jdbc_position(&self) -> usize {
        self.values_array_position + 1
    }
}

impl SortSpecification {
    pub fn new(expression: Expression, direction: Direction) -> Self {
        Self {
            expression,
            direction,
            nulls: None,
        }
    }
}

fn set_once<T>(slot: &mut Option<T>, what: &str, value: T) -> Result<()> {
    if slot.is_some() {
        return Err(Error::invalid_statement(format!("{what} already set")));
    }
    *slot = Some(value);
    Ok(())
}

fn conjoin(slot: &mut Option<Predicate>, predicate: Predicate) {
    *slot = Some(match slot.take() {
        Some(existing) => Predicate::and(existing, predicate),
        None => predicate,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stmt::{Type, Value};

    fn restriction(n: i64) -> Predicate {
        Predicate::eq(Expression::column(Some("t1_0"), "id", Type::I64), Value::I64(n))
    }

    #[test]
    fn where_is_set_once() {
        let mut spec = QuerySpec::new(true);
        spec.set_where_clause_restrictions(restriction(1)).unwrap();

        let err = spec.set_where_clause_restrictions(restriction(2)).unwrap_err();
        assert!(err.is_invalid_statement());
        assert_eq!(spec.where_clause(), Some(&restriction(1)));
    }

    #[test]
    fn add_restriction_conjoins() {
        let mut spec = QuerySpec::new(true);
        spec.add_restriction(restriction(1));
        spec.add_restriction(restriction(2));

        assert_eq!(
            spec.where_clause(),
            Some(&Predicate::and(restriction(1), restriction(2)))
        );
    }

    #[test]
    fn limit_and_offset_are_set_once() {
        let mut spec = QuerySpec::new(true);
        spec.set_limit(Value::I64(10).into()).unwrap();
        spec.set_offset(Value::I64(5).into()).unwrap();

        assert!(spec.set_limit(Value::I64(1).into()).unwrap_err().is_invalid_statement());
        assert!(spec.set_offset(Value::I64(1).into()).unwrap_err().is_invalid_statement());
    }

    #[test]
    fn selections_are_positioned() {
        let mut clause = SelectClause::default();
        assert_eq!(clause.add_selection(Value::I64(1).into()), 0);
        assert_eq!(clause.add_selection(Value::I64(2).into()), 1);
        assert_eq!(clause.selections[1].jdbc_position(), 2);
    }
}
