use orma::driver::{Capability, Driver};
use orma_driver_sqlite::Sqlite;

use crate::Setup;

#[derive(Default)]
pub struct SetupSqlite;

impl SetupSqlite {
    pub fn new() -> Self {
        Self
    }
}

impl Setup for SetupSqlite {
    fn driver(&self) -> orma::Result<Box<dyn Driver>> {
        Ok(Box::new(Sqlite::in_memory()?))
    }

    fn capability(&self) -> &'static Capability {
        &Capability::SQLITE
    }
}
