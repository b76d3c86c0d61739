mod builder;
pub use builder::Builder;

mod connect;

use crate::{Instantiator, Session};

use orma_core::{
    driver::{operation::QuerySql, Driver, Operation},
    schema::{Metamodel, TypeConfiguration},
    sqm::{parse_hql, ParseOptions, SqmStatement},
    Result,
};
use orma_sql::Serializer;

use indexmap::IndexMap;
use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

/// Shared, immutable runtime state from which sessions are opened.
///
/// Clones share the driver and the query interpretation cache.
#[derive(Debug, Clone)]
pub struct SessionFactory {
    shared: Arc<Shared>,
}

#[derive(Debug)]
pub(crate) struct Shared {
    pub(crate) metamodel: Metamodel,
    pub(crate) type_configuration: TypeConfiguration,
    pub(crate) instantiators: IndexMap<String, Instantiator>,
    pub(crate) driver: Arc<dyn Driver>,
    pub(crate) serializer: Serializer,
    pub(crate) settings: Settings,

    /// Interpreted queries by query string
    hql_cache: Mutex<IndexMap<String, SqmStatement>>,
}

#[derive(Debug, Clone)]
pub struct Settings {
    /// Reject HQL constructs JPQL does not allow
    pub strict_compliance: bool,

    /// Most identifiers bound in one multi-id select
    pub multi_load_batch_size: usize,

    /// Default statement timeout
    pub query_timeout: Option<Duration>,
}

impl SessionFactory {
    pub fn builder() -> Builder {
        Builder::default()
    }

    pub(crate) fn shared(&self) -> &Shared {
        &self.shared
    }

    pub async fn open_session(&self) -> Result<Session> {
        self.open(None).await
    }

    /// Opens a session whose multi-tenant entities are restricted to
    /// `tenant`.
    pub async fn open_session_with_tenant(&self, tenant: &str) -> Result<Session> {
        self.open(Some(tenant.to_string())).await
    }

    async fn open(&self, tenant: Option<String>) -> Result<Session> {
        let connection = self.shared.driver.connect().await?;
        tracing::debug!(url = %self.shared.driver.url(), ?tenant, "opened session");
        Ok(Session::new(self.clone(), connection, tenant))
    }

    pub fn metamodel(&self) -> &Metamodel {
        &self.shared.metamodel
    }

    pub fn settings(&self) -> &Settings {
        &self.shared.settings
    }

    pub fn driver(&self) -> &dyn Driver {
        &*self.shared.driver
    }

    /// Creates every mapped table that does not exist yet.
    pub async fn create_schema(&self) -> Result<()> {
        let mut connection = self.shared.driver.connect().await?;

        for table in &self.shared.metamodel.tables {
            let sql = self.shared.serializer.serialize_create_table(table);
            tracing::debug!(sql = %sql, "creating table");

            connection
                .exec(Operation::QuerySql(QuerySql {
                    sql,
                    params: vec![],
                    ret: None,
                }))
                .await?;
        }

        Ok(())
    }

    /// Interprets an HQL string. Interpretations are cached by query string;
    /// each call returns a private copy.
    pub fn interpret_hql(&self, hql: &str) -> Result<SqmStatement> {
        let mut cache = self
            .shared
            .hql_cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(sqm) = cache.get(hql) {
            tracing::trace!(hql, "query interpretation cache hit");
            return Ok(sqm.copy());
        }

        let sqm = parse_hql(
            &self.shared.metamodel,
            hql,
            ParseOptions {
                strict_compliance: self.shared.settings.strict_compliance,
            },
        )?;

        let copy = sqm.copy();
        cache.insert(hql.to_string(), sqm);
        Ok(copy)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            strict_compliance: false,
            multi_load_batch_size: 100,
            query_timeout: None,
        }
    }
}
