#[derive(Debug)]
pub struct Capability {
    /// SQL dialect spoken by the database
    pub dialect: Dialect,

    /// Supports `INSERT ... RETURNING` for reading back generated identifiers.
    pub returning: bool,

    /// Supports row-level locking with `FOR UPDATE` / `FOR SHARE`.
    pub select_for_update: bool,

    /// Name of the implicit physical row locator, if the database has one.
    pub row_id: Option<&'static str>,
}

impl Capability {
    /// SQLite capabilities.
    pub const SQLITE: Self = Self {
        dialect: Dialect::Sqlite,
        returning: true,
        select_for_update: false,
        row_id: Some("rowid"),
    };

    /// PostgreSQL capabilities
    pub const POSTGRESQL: Self = Self {
        dialect: Dialect::Postgresql,
        returning: true,
        select_for_update: true,
        row_id: Some("ctid"),
    };

    /// MySQL capabilities
    pub const MYSQL: Self = Self {
        dialect: Dialect::Mysql,
        returning: false,
        select_for_update: true,
        row_id: None,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Sqlite,
    Postgresql,
    Mysql,
}
