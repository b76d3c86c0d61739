#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

/// Placement of nulls in a sort specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NullPrecedence {
    First,
    Last,
}

impl Direction {
    pub fn is_desc(self) -> bool {
        matches!(self, Self::Desc)
    }
}
