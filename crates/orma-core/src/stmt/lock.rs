/// Row lock requested when loading or querying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LockMode {
    /// No lock beyond what the isolation level provides.
    #[default]
    None,

    /// `FOR SHARE`
    PessimisticRead,

    /// `FOR UPDATE`
    PessimisticWrite,
}

impl LockMode {
    pub fn is_none(self) -> bool {
        matches!(self, Self::None)
    }
}
