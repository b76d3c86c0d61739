use super::{ColumnReference, JdbcParameter};
use crate::{Error, Result};

/// One write against one physical table.
#[derive(Debug, Clone, PartialEq)]
pub enum TableMutation {
    Insert(TableInsert),
    Update(TableUpdate),
    Delete(TableDelete),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableInsert {
    pub table_name: String,
    pub values: Vec<ColumnValueBinding>,

    /// Generated column read back after the insert
    pub returning: Option<ColumnReference>,

    pub expectation: Expectation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableUpdate {
    pub table_name: String,
    pub values: Vec<ColumnValueBinding>,

    /// Key columns plus the optimistic-lock column, if any
    pub restrictions: Vec<ColumnValueBinding>,

    pub expectation: Expectation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableDelete {
    pub table_name: String,
    pub restrictions: Vec<ColumnValueBinding>,
    pub expectation: Expectation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnValueBinding {
    pub column: String,
    pub value: JdbcParameter,
}

/// Affected-row count a mutation must produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expectation {
    /// Any count is acceptable
    None,

    RowCount(u64),
}

impl TableMutation {
    pub fn table_name(&self) -> &str {
        match self {
            Self::Insert(insert) => &insert.table_name,
            Self::Update(update) => &update.table_name,
            Self::Delete(delete) => &delete.table_name,
        }
    }

    pub fn expectation(&self) -> Expectation {
        match self {
            Self::Insert(insert) => insert.expectation,
            Self::Update(update) => update.expectation,
            Self::Delete(delete) => delete.expectation,
        }
    }

    pub fn is_insert(&self) -> bool {
        matches!(self, Self::Insert(_))
    }

    pub fn as_insert(&self) -> Option<&TableInsert> {
        match self {
            Self::Insert(insert) => Some(insert),
            _ => None,
        }
    }
}

impl ColumnValueBinding {
    pub fn new(column: impl Into<String>, value: JdbcParameter) -> Self {
        Self {
            column: column.into(),
            value,
        }
    }
}

impl Expectation {
    /// Checks the affected-row count reported for a mutation of `table_name`.
    pub fn verify(self, table_name: &str, affected: u64) -> Result<()> {
        match self {
            Self::RowCount(expected) if expected != affected => {
                Err(Error::condition_failed(format!(
                    "unexpected row count for `{table_name}`: expected {expected}, got {affected}"
                )))
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_count_expectation() {
        assert!(Expectation::RowCount(1).verify("issues", 1).is_ok());
        assert!(Expectation::None.verify("issues", 7).is_ok());

        let err = Expectation::RowCount(1).verify("issues", 0).unwrap_err();
        assert!(err.is_condition_failed());
        assert!(err.to_string().contains("`issues`"));
    }
}
