#[macro_use]
mod macros;

pub mod db;

mod db_test;
pub use db_test::DbTest;

mod exec_log;
pub use exec_log::ExecLog;

mod fixtures;
pub use fixtures::{issue_tracker, seed, Seed, Summary};

mod logging_driver;
pub use logging_driver::{DriverOp, LoggingDriver};

pub mod prelude;

use orma::driver::{Capability, Driver};

pub trait Setup: Send + Sync + 'static {
    /// A driver over a fresh, empty database.
    fn driver(&self) -> orma::Result<Box<dyn Driver>>;

    fn capability(&self) -> &'static Capability;
}
