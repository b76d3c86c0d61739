use crate::stmt::Type;

use std::fmt;

/// A database table
#[derive(Debug)]
pub struct Table {
    /// Uniquely identifies a table
    pub id: TableId,

    /// Name of the table, including any configured prefix
    pub name: String,

    /// The table's columns
    pub columns: Vec<Column>,

    /// Primary key columns, in key order
    pub primary_key: Vec<ColumnId>,
}

/// Uniquely identifies a table
#[derive(PartialEq, Eq, Clone, Copy, Hash, PartialOrd, Ord)]
pub struct TableId(pub usize);

#[derive(Debug, PartialEq)]
pub struct Column {
    /// Uniquely identifies the column in the metamodel.
    pub id: ColumnId,

    /// The name of the column in the database.
    pub name: String,

    /// The relational type of the column (after any attribute converter).
    pub ty: Type,

    /// Whether or not the column is nullable
    pub nullable: bool,

    /// True if the column is part of the table's primary key
    pub primary_key: bool,

    /// True if the database generates the value on insert
    pub auto_increment: bool,
}

#[derive(PartialEq, Eq, Clone, Copy, Hash, PartialOrd, Ord)]
pub struct ColumnId {
    pub table: TableId,
    pub index: usize,
}

impl Table {
    pub(crate) fn new(id: TableId, name: String) -> Self {
        Self {
            id,
            name,
            columns: vec![],
            primary_key: vec![],
        }
    }

    pub fn column(&self, id: impl Into<ColumnId>) -> &Column {
        let id = id.into();
        assert_eq!(id.table, self.id, "column belongs to a different table");
        &self.columns[id.index]
    }

    pub fn column_by_name(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|column| column.name == name)
    }

    pub fn primary_key_columns(&self) -> impl ExactSizeIterator<Item = &Column> + '_ {
        self.primary_key
            .iter()
            .map(|column_id| &self.columns[column_id.index])
    }
}

impl From<&Column> for ColumnId {
    fn from(value: &Column) -> Self {
        value.id
    }
}

impl fmt::Debug for TableId {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "TableId({})", self.0)
    }
}

impl fmt::Debug for ColumnId {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "ColumnId({}/{})", self.table.0, self.index)
    }
}
