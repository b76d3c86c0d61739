use super::{ColumnReference, Expression, Predicate, QuerySpec, TableReference};

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Select(SelectStatement),
    Update(UpdateStatement),
    Delete(DeleteStatement),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectStatement {
    pub query_spec: QuerySpec,
}

/// Single-table update produced from an object-level update statement.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateStatement {
    pub target: TableReference,
    pub assignments: Vec<Assignment>,
    pub restriction: Option<Predicate>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub column: ColumnReference,
    pub value: Expression,
}

/// Single-table delete produced from an object-level delete statement.
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteStatement {
    pub target: TableReference,
    pub restriction: Option<Predicate>,
}

impl SelectStatement {
    pub fn new(query_spec: QuerySpec) -> Self {
        Self { query_spec }
    }
}

impl From<SelectStatement> for Statement {
    fn from(value: SelectStatement) -> Self {
        Self::Select(value)
    }
}

impl From<UpdateStatement> for Statement {
    fn from(value: UpdateStatement) -> Self {
        Self::Update(value)
    }
}

impl From<DeleteStatement> for Statement {
    fn from(value: DeleteStatement) -> Self {
        Self::Delete(value)
    }
}
