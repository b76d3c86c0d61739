//! Contract between the engine and a database driver.

mod capability;
pub use capability::{Capability, Dialect};

pub mod operation;
pub use operation::Operation;

mod response;
pub use response::{Response, Rows};

use crate::{async_trait, Result};

use std::{borrow::Cow, fmt::Debug};

#[async_trait]
pub trait Driver: Debug + Send + Sync + 'static {
    /// URL the driver connects to
    fn url(&self) -> Cow<'_, str>;

    /// Describes the database's capabilities, which inform SQL rendering.
    fn capability(&self) -> &'static Capability;

    /// Opens a new connection. Each session owns one connection.
    async fn connect(&self) -> Result<Box<dyn Connection>>;
}

#[async_trait]
pub trait Connection: Debug + Send + 'static {
    /// Executes a database operation
    async fn exec(&mut self, op: Operation) -> Result<Response>;
}
