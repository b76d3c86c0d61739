#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum JoinType {
    #[default]
    Inner,
    Left,
}

impl JoinType {
    pub fn is_left(self) -> bool {
        matches!(self, Self::Left)
    }
}
