use super::{connect, SessionFactory, Settings, Shared};
use crate::Instantiator;

use orma_core::{
    driver::Driver,
    schema::{self, AttributeConverter, EmbeddableBuilder, EntityBuilder, TypeConfiguration},
    stmt::{Type, Value},
    Result,
};
use orma_sql::Serializer;

use indexmap::IndexMap;
use std::{any::Any, sync::Arc, sync::Mutex, time::Duration};

#[derive(Default)]
pub struct Builder {
    /// Schema builder
    core: schema::Builder,

    type_configuration: TypeConfiguration,

    instantiators: IndexMap<String, Instantiator>,

    settings: Settings,
}

impl Builder {
    pub fn entity(&mut self, name: &str, f: impl FnOnce(&mut EntityBuilder)) -> &mut Self {
        self.core.entity(name, f);
        self
    }

    pub fn embeddable(&mut self, name: &str, f: impl FnOnce(&mut EmbeddableBuilder)) -> &mut Self {
        self.core.embeddable(name, f);
        self
    }

    /// Set the table name prefix for all tables
    pub fn table_name_prefix(&mut self, prefix: &str) -> &mut Self {
        self.core.table_name_prefix(prefix);
        self
    }

    /// Registers an attribute converter that mappings refer to by name.
    pub fn converter(&mut self, name: &str, converter: impl AttributeConverter) -> &mut Self {
        self.type_configuration.register(name, converter);
        self
    }

    /// Registers a `select new Name(...)` target.
    pub fn instantiator<F, T>(&mut self, name: &str, params: &[(&str, Type)], factory: F) -> &mut Self
    where
        F: Fn(Vec<Value>) -> Result<T> + Send + Sync + 'static,
        T: Any + Send,
    {
        self.instantiators
            .insert(name.to_string(), Instantiator::new(name, params, factory));
        self
    }

    pub fn strict_compliance(&mut self, strict: bool) -> &mut Self {
        self.settings.strict_compliance = strict;
        self
    }

    pub fn multi_load_batch_size(&mut self, size: usize) -> &mut Self {
        self.settings.multi_load_batch_size = size;
        self
    }

    pub fn query_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.settings.query_timeout = Some(timeout);
        self
    }

    /// Connects to the database at `url`, choosing the driver by scheme.
    pub async fn connect(&mut self, url: &str) -> Result<SessionFactory> {
        let driver = connect::driver(url)?;
        self.build_with(driver)
    }

    pub async fn build(&mut self, driver: impl Driver) -> Result<SessionFactory> {
        self.build_with(Arc::new(driver))
    }

    fn build_with(&mut self, driver: Arc<dyn Driver>) -> Result<SessionFactory> {
        let metamodel = self.core.build(&self.type_configuration)?;
        let serializer = Serializer::for_dialect(driver.capability().dialect);

        tracing::debug!(
            entities = metamodel.entities.len(),
            tables = metamodel.tables.len(),
            "built session factory"
        );

        Ok(SessionFactory {
            shared: Arc::new(Shared {
                metamodel,
                type_configuration: self.type_configuration.clone(),
                instantiators: std::mem::take(&mut self.instantiators),
                driver,
                serializer,
                settings: self.settings.clone(),
                hql_cache: Mutex::new(IndexMap::new()),
            }),
        })
    }
}
