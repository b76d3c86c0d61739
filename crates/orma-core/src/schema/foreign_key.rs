use super::ColumnId;

/// Column pairs joining a referring table to a referenced table.
///
/// `columns[i]` on the key side refers to `target_columns[i]` on the target
/// side, which is always the referenced table's primary key.
#[derive(Debug, Clone, PartialEq)]
pub struct ForeignKey {
    pub columns: Vec<ColumnId>,
    pub target_columns: Vec<ColumnId>,
}

impl ForeignKey {
    pub fn pairs(&self) -> impl Iterator<Item = (ColumnId, ColumnId)> + '_ {
        self.columns
            .iter()
            .copied()
            .zip(self.target_columns.iter().copied())
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }
}
