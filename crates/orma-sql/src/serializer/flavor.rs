use super::Serializer;

use orma_core::driver::Dialect;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Flavor {
    Postgresql,
    Sqlite,
    Mysql,
}

impl Serializer {
    pub fn sqlite() -> Serializer {
        Serializer {
            flavor: Flavor::Sqlite,
        }
    }

    pub fn postgresql() -> Serializer {
        Serializer {
            flavor: Flavor::Postgresql,
        }
    }

    pub fn mysql() -> Serializer {
        Serializer {
            flavor: Flavor::Mysql,
        }
    }

    /// Serializer for the dialect a driver reports in its capability.
    pub fn for_dialect(dialect: Dialect) -> Serializer {
        match dialect {
            Dialect::Sqlite => Self::sqlite(),
            Dialect::Postgresql => Self::postgresql(),
            Dialect::Mysql => Self::mysql(),
        }
    }

    pub(super) fn is_sqlite(&self) -> bool {
        self.flavor == Flavor::Sqlite
    }

    pub(super) fn is_mysql(&self) -> bool {
        self.flavor == Flavor::Mysql
    }
}
