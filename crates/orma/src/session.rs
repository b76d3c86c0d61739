mod entity;
pub use entity::{AttributeValue, Element, Entity, EntityKey, EntityView, PersistentCollection};

mod persistence_context;
pub(crate) use persistence_context::{EntityState, PersistenceContext};

use crate::{engine::Engine, Query, SessionFactory};

use orma_core::{
    driver::{operation::Transaction, Connection},
    schema::{AttributeId, EntityType, Metamodel},
    sqm::SqmStatement,
    stmt::{LockMode, Value},
    Error, Result,
};

use std::time::Duration;

/// A unit of work against the database.
///
/// The session owns one connection and a persistence context holding at most
/// one managed entity per key. Sessions are not shared between tasks.
#[derive(Debug)]
pub struct Session {
    factory: SessionFactory,
    connection: Box<dyn Connection>,
    context: PersistenceContext,
    tenant: Option<String>,
}

/// Options of a load by identifier.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub lock_mode: LockMode,

    /// Fail with a record-not-found error instead of returning `None`
    pub strict: bool,

    pub timeout: Option<Duration>,
}

impl Session {
    pub(crate) fn new(
        factory: SessionFactory,
        connection: Box<dyn Connection>,
        tenant: Option<String>,
    ) -> Self {
        Self {
            factory,
            connection,
            context: PersistenceContext::default(),
            tenant,
        }
    }

    pub(crate) fn engine(&mut self) -> Engine<'_> {
        Engine::new(
            self.factory.shared(),
            &mut *self.connection,
            &mut self.context,
            self.tenant.as_deref(),
        )
    }

    pub fn factory(&self) -> &SessionFactory {
        &self.factory
    }

    pub fn metamodel(&self) -> &Metamodel {
        self.factory.metamodel()
    }

    pub fn tenant(&self) -> Option<&str> {
        self.tenant.as_deref()
    }

    /// Loads an entity by identifier; `None` when no row matches.
    pub async fn find(&mut self, entity: &str, id: impl Into<Value>) -> Result<Option<EntityKey>> {
        self.find_with_options(entity, id, &LoadOptions::default())
            .await
    }

    /// Loads an entity by identifier, failing when no row matches.
    pub async fn find_strict(&mut self, entity: &str, id: impl Into<Value>) -> Result<EntityKey> {
        let options = LoadOptions {
            strict: true,
            ..LoadOptions::default()
        };

        match self.find_with_options(entity, id, &options).await? {
            Some(key) => Ok(key),
            None => Err(Error::record_not_found(entity)),
        }
    }

    pub async fn find_with_options(
        &mut self,
        entity: &str,
        id: impl Into<Value>,
        options: &LoadOptions,
    ) -> Result<Option<EntityKey>> {
        let entity = self.entity_type(entity)?.id;
        self.engine().find(entity, id.into(), options).await
    }

    /// Loads several entities by identifier in batches. The result is
    /// aligned with `ids`, with `None` for identifiers that match no row.
    pub async fn find_multiple<I, V>(&mut self, entity: &str, ids: I) -> Result<Vec<Option<EntityKey>>>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let entity = self.entity_type(entity)?.id;
        let ids = ids.into_iter().map(Into::into).collect();
        self.engine().find_multiple(entity, ids).await
    }

    /// A key for the entity without reading it. The entity becomes a proxy
    /// unless it is already managed.
    pub fn get_reference(&mut self, entity: &str, id: impl Into<Value>) -> Result<EntityKey> {
        let key = {
            let entity = self.entity_type(entity)?;
            EntityKey::new(entity.id, entity.identifier.ty.cast(id.into())?)
        };
        self.context.register_proxy(key.clone());
        Ok(key)
    }

    /// Reads the state of a proxy; a no-op for initialized entities.
    pub async fn initialize(&mut self, key: &EntityKey) -> Result<()> {
        self.engine().initialize(key).await
    }

    /// Loads a collection of a managed entity; a no-op once loaded.
    pub async fn initialize_collection(&mut self, key: &EntityKey, name: &str) -> Result<()> {
        let attribute = self.attribute(key, name)?;
        self.engine().initialize_collection(key, attribute).await
    }

    pub fn is_initialized(&self, key: &EntityKey) -> bool {
        self.context.is_initialized(key)
    }

    /// Read access to an initialized managed entity.
    pub fn entity(&self, key: &EntityKey) -> Result<EntityView<'_>> {
        let metamodel = self.factory.metamodel();

        let (key, holder) = self.context.get_key_value(key).ok_or_else(|| {
            Error::invalid_statement(format!(
                "{} is not managed by the session",
                key.describe(metamodel)
            ))
        })?;

        let state = holder.state.as_ref().ok_or_else(|| {
            Error::invalid_statement(format!(
                "{} is an uninitialized proxy",
                key.describe(metamodel)
            ))
        })?;

        Ok(EntityView::new(
            metamodel.entity(key.entity),
            key,
            &state.values,
            state.version,
        ))
    }

    /// Assigns a basic or embedded attribute. Written on the next flush.
    pub async fn set(&mut self, key: &EntityKey, name: &str, value: impl Into<Value>) -> Result<()> {
        self.engine()
            .set(key, name, AttributeValue::Value(value.into()))
            .await
    }

    pub async fn set_reference(
        &mut self,
        key: &EntityKey,
        name: &str,
        target: Option<&EntityKey>,
    ) -> Result<()> {
        self.engine()
            .set(key, name, AttributeValue::Reference(target.cloned()))
            .await
    }

    /// Replaces the elements of a collection.
    pub async fn set_collection(
        &mut self,
        key: &EntityKey,
        name: &str,
        elements: Vec<Element>,
    ) -> Result<()> {
        self.engine()
            .set(
                key,
                name,
                AttributeValue::Collection(PersistentCollection::initialized(elements)),
            )
            .await
    }

    /// Inserts a new entity, which becomes managed.
    pub async fn persist(&mut self, entity: Entity) -> Result<EntityKey> {
        self.engine().persist(entity).await
    }

    /// Writes the changes of every managed entity.
    pub async fn flush(&mut self) -> Result<()> {
        self.engine().flush().await
    }

    /// Writes the changes of one entity.
    pub async fn update(&mut self, key: &EntityKey) -> Result<()> {
        self.engine().flush_entity(key).await
    }

    /// Deletes an entity, which stops being managed.
    pub async fn remove(&mut self, key: &EntityKey) -> Result<()> {
        self.engine().remove(key).await
    }

    pub fn contains(&self, key: &EntityKey) -> bool {
        self.context.contains(key)
    }

    /// Stops managing an entity. Unflushed changes are lost.
    pub fn evict(&mut self, key: &EntityKey) {
        self.context.remove(key);
    }

    /// Stops managing every entity. Unflushed changes are lost.
    pub fn clear(&mut self) {
        self.context.clear();
    }

    /// Interprets an HQL query.
    pub fn create_query(&mut self, hql: &str) -> Result<Query<'_>> {
        let sqm = self.factory.interpret_hql(hql)?;
        Ok(Query::new(self, sqm))
    }

    /// A query over an already built statement. The statement is copied, so
    /// it can be executed again with other bindings.
    pub fn create_selection_query(&mut self, sqm: &SqmStatement) -> Result<Query<'_>> {
        if !sqm.is_select() {
            return Err(Error::invalid_statement(
                "selection queries require a select statement",
            ));
        }

        Ok(Query::new(self, sqm.copy()))
    }

    /// Executes an HQL update or delete without parameters.
    pub async fn execute_update(&mut self, hql: &str) -> Result<u64> {
        self.create_query(hql)?.execute_update().await
    }

    pub async fn begin(&mut self) -> Result<()> {
        self.engine().transaction(Transaction::Start).await
    }

    /// Flushes, then commits.
    pub async fn commit(&mut self) -> Result<()> {
        let mut engine = self.engine();
        engine.flush().await?;
        engine.transaction(Transaction::Commit).await
    }

    /// Rolls back and clears the persistence context, whose state may no
    /// longer match the database.
    pub async fn rollback(&mut self) -> Result<()> {
        let result = self.engine().transaction(Transaction::Rollback).await;
        self.context.clear();
        result
    }

    fn entity_type(&self, name: &str) -> Result<&EntityType> {
        self.factory.metamodel().resolve_entity(name)
    }

    fn attribute(&self, key: &EntityKey, name: &str) -> Result<AttributeId> {
        let entity = self.factory.metamodel().entity(key.entity);

        match entity.attribute(name) {
            Some(attribute) if attribute.is_plural() => Ok(attribute.id),
            Some(_) => Err(Error::invalid_statement(format!(
                "`{}.{name}` is not a collection",
                entity.name
            ))),
            None => Err(Error::invalid_statement(format!(
                "entity `{}` has no attribute `{name}`",
                entity.name
            ))),
        }
    }
}
