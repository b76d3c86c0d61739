pub mod jdbc;
pub use jdbc::{JdbcMutation, JdbcSelect};

pub mod serializer;
pub use serializer::{Params, Placeholder, Serializer};
