use crate::{
    stmt::{Value, ValueRecord},
    Error, Result,
};

#[derive(Debug, Clone)]
pub struct Response {
    pub rows: Rows,
}

#[derive(Debug, Clone)]
pub enum Rows {
    /// Number of rows impacted by the operation
    Count(u64),

    /// Returned rows, one record per row in select-list order
    Values(Vec<ValueRecord>),
}

impl Response {
    pub fn count(count: u64) -> Self {
        Self {
            rows: Rows::Count(count),
        }
    }

    pub fn values(rows: Vec<ValueRecord>) -> Self {
        Self {
            rows: Rows::Values(rows),
        }
    }

    pub fn empty_values() -> Self {
        Self::values(vec![])
    }
}

impl Rows {
    pub fn is_count(&self) -> bool {
        matches!(self, Self::Count(_))
    }

    pub fn is_values(&self) -> bool {
        matches!(self, Self::Values(_))
    }

    /// Number of affected rows. A row-returning statement counts its rows.
    pub fn affected(&self) -> u64 {
        match self {
            Self::Count(count) => *count,
            Self::Values(rows) => rows.len() as u64,
        }
    }

    pub fn into_values(self) -> Result<Vec<ValueRecord>> {
        match self {
            Self::Values(rows) => Ok(rows),
            Self::Count(count) => Err(Error::type_conversion(
                Value::I64(count as i64),
                "rows",
            )),
        }
    }
}
