mod engine;

pub mod instantiator;
pub use instantiator::{Instance, Instantiator};

pub mod query;
pub use query::{Query, QueryParameterBindings, ResultValue};

pub mod session;
pub use session::{
    AttributeValue, Element, Entity, EntityKey, EntityView, LoadOptions, PersistentCollection,
    Session,
};

pub mod session_factory;
pub use session_factory::{SessionFactory, Settings};

pub use orma_core::{driver, schema, sqm, stmt, Error, Result};
