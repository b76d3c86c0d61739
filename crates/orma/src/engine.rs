//! Executes session operations: translates them to SQL, runs the statements,
//! and assembles the rows into the persistence context.

mod alias;
mod assemble;
mod domain_result;
mod exec;
mod mutation;
mod translate;

pub(crate) use translate::QueryOptions;

use assemble::{Pending, RowProcessingState};
use domain_result::{DomainResult, SelectPlan};
use exec::StaticBindings;
use mutation::MutationBuilder;
use translate::Translator;

use crate::{
    query::{BindingResolver, QueryParameterBindings, ResultValue},
    session::{
        AttributeValue, Entity, EntityKey, EntityState, LoadOptions, PersistenceContext,
    },
    session_factory::Shared,
};

use orma_core::{
    driver::{
        operation::{QuerySql, Transaction},
        Connection,
    },
    schema::{AttributeId, EntityId, Generation},
    sql::MutationGroup,
    sqm::{SqmSelectStatement, SqmStatement},
    stmt::{LockMode, Value, ValueRecord},
    Error, Result,
};

use indexmap::{IndexMap, IndexSet};
use std::{collections::HashSet, time::Duration};

pub(crate) struct Engine<'a> {
    shared: &'a Shared,
    connection: &'a mut dyn Connection,
    context: &'a mut PersistenceContext,
    tenant: Option<&'a str>,
}

impl<'a> Engine<'a> {
    pub(crate) fn new(
        shared: &'a Shared,
        connection: &'a mut dyn Connection,
        context: &'a mut PersistenceContext,
        tenant: Option<&'a str>,
    ) -> Self {
        Self {
            shared,
            connection,
            context,
            tenant,
        }
    }

    fn translator(&self) -> Translator<'a> {
        Translator::new(self.shared, self.tenant)
    }

    fn mutations(&self) -> MutationBuilder<'a> {
        let shared = self.shared;

        MutationBuilder::new(
            &shared.metamodel,
            &shared.type_configuration,
            shared.driver.capability(),
            self.tenant,
        )
    }

    fn timeout(&self, timeout: Option<Duration>) -> Option<Duration> {
        timeout.or(self.shared.settings.query_timeout)
    }

    /// Executes a select query and assembles its rows.
    pub(crate) async fn list(
        &mut self,
        stmt: &SqmSelectStatement,
        bindings: &QueryParameterBindings,
        options: &QueryOptions,
    ) -> Result<Vec<ResultValue>> {
        let shared = self.shared;
        let plan = self
            .translator()
            .with_bindings(bindings)
            .translate_select(stmt, options)?;
        tracing::trace!(results = plan.results.len(), "translated select");

        let jdbc = shared.serializer.serialize_select(&plan.statement);
        self.auto_flush(&jdbc.affected_table_names).await?;

        let resolver = BindingResolver {
            bindings,
            types: &shared.type_configuration,
        };
        let rows = self
            .select(&plan, jdbc.bind(&resolver)?, self.timeout(options.timeout))
            .await?;

        Ok(rows
            .into_iter()
            .map(|mut row| {
                if row.len() == 1 {
                    row.remove(0)
                } else {
                    ResultValue::Tuple(row)
                }
            })
            .collect())
    }

    /// Executes an update or delete statement.
    pub(crate) async fn execute_dml(
        &mut self,
        stmt: &SqmStatement,
        bindings: &QueryParameterBindings,
        timeout: Option<Duration>,
    ) -> Result<u64> {
        let shared = self.shared;
        let mut translator = self.translator().with_bindings(bindings);

        let jdbc = match stmt {
            SqmStatement::Update(update) => shared
                .serializer
                .serialize_update(&translator.translate_update(update)?),
            SqmStatement::Delete(delete) => shared
                .serializer
                .serialize_delete(&translator.translate_delete(delete)?),
            SqmStatement::Select(_) => {
                return Err(Error::invalid_statement(
                    "select statements cannot be executed as updates",
                ))
            }
        };

        self.auto_flush(&IndexSet::from([jdbc.table_name.clone()]))
            .await?;

        let resolver = BindingResolver {
            bindings,
            types: &shared.type_configuration,
        };
        let query = jdbc.bind(&resolver)?;
        let timeout = self.timeout(timeout);
        let response = exec::exec(&mut *self.connection, query, timeout).await?;

        Ok(response.rows.affected())
    }

    /// Loads one entity by identifier. Managed state is returned without a
    /// select unless a lock is requested.
    pub(crate) async fn find(
        &mut self,
        entity: EntityId,
        id: Value,
        options: &LoadOptions,
    ) -> Result<Option<EntityKey>> {
        let shared = self.shared;
        let entity_type = shared.metamodel.entity(entity);
        let key = EntityKey::new(entity, entity_type.identifier.ty.cast(id)?);

        if options.lock_mode.is_none() && self.context.is_initialized(&key) {
            return Ok(Some(key));
        }

        let found = self
            .load(
                entity,
                std::slice::from_ref(&key.id),
                options.lock_mode,
                self.timeout(options.timeout),
            )
            .await?;

        match found.into_iter().next() {
            Some(key) => Ok(Some(key)),
            None if options.strict => Err(Error::record_not_found(key.describe(&shared.metamodel))),
            None => Ok(None),
        }
    }

    /// Loads several entities by identifier, skipping the ones already
    /// managed. Results follow the order of `ids`.
    pub(crate) async fn find_multiple(
        &mut self,
        entity: EntityId,
        ids: Vec<Value>,
    ) -> Result<Vec<Option<EntityKey>>> {
        let shared = self.shared;
        let ty = &shared.metamodel.entity(entity).identifier.ty;

        let keys = ids
            .into_iter()
            .map(|id| Ok(EntityKey::new(entity, ty.cast(id)?)))
            .collect::<Result<Vec<_>>>()?;

        let missing: IndexSet<Value> = keys
            .iter()
            .filter(|key| !self.context.is_initialized(key))
            .map(|key| key.id.clone())
            .collect();

        let missing: Vec<Value> = missing.into_iter().collect();
        let batch_size = self.shared.settings.multi_load_batch_size.max(1);

        for chunk in missing.chunks(batch_size) {
            self.load(entity, chunk, LockMode::None, self.timeout(None))
                .await?;
        }

        Ok(keys
            .into_iter()
            .map(|key| self.context.is_initialized(&key).then_some(key))
            .collect())
    }

    /// Reads the state of a proxy.
    pub(crate) async fn initialize(&mut self, key: &EntityKey) -> Result<()> {
        if self.context.is_initialized(key) {
            return Ok(());
        }

        tracing::debug!(key = ?key, "initializing proxy");

        let found = self
            .load(
                key.entity,
                std::slice::from_ref(&key.id),
                LockMode::None,
                self.timeout(None),
            )
            .await?;

        if found.is_empty() {
            return Err(Error::record_not_found(key.describe(&self.shared.metamodel)));
        }

        Ok(())
    }

    /// Loads a collection of an initialized owner.
    pub(crate) async fn initialize_collection(
        &mut self,
        owner: &EntityKey,
        attribute: AttributeId,
    ) -> Result<()> {
        self.initialize(owner).await?;

        if self.is_collection_initialized(owner, attribute) {
            return Ok(());
        }

        let pending = self.load_collection(owner, attribute).await?;
        self.resolve_pending(pending).await
    }

    /// Loads entities by identifier and everything they load immediately.
    async fn load(
        &mut self,
        entity: EntityId,
        ids: &[Value],
        lock_mode: LockMode,
        timeout: Option<Duration>,
    ) -> Result<Vec<EntityKey>> {
        let (keys, pending) = self.load_rows(entity, ids, lock_mode, timeout).await?;
        self.resolve_pending(pending).await?;
        Ok(keys)
    }

    async fn load_rows(
        &mut self,
        entity: EntityId,
        ids: &[Value],
        lock_mode: LockMode,
        timeout: Option<Duration>,
    ) -> Result<(Vec<EntityKey>, Pending)> {
        let plan = self.translator().load_by_id(entity, ids, lock_mode)?;
        let jdbc = self.shared.serializer.serialize_select(&plan.statement);
        let query = jdbc.bind(&StaticBindings::default())?;

        let rows = exec::exec(&mut *self.connection, query, timeout)
            .await?
            .rows
            .into_values()?;

        let (rows, pending) = self.assemble(&plan, rows)?;

        let keys = rows
            .into_iter()
            .filter_map(|row| match row.into_iter().next() {
                Some(ResultValue::Entity(key)) => key,
                _ => None,
            })
            .collect();

        Ok((keys, pending))
    }

    async fn load_collection(
        &mut self,
        owner: &EntityKey,
        attribute: AttributeId,
    ) -> Result<Pending> {
        let plan = self.translator().load_collection(attribute, &owner.id)?;
        let jdbc = self.shared.serializer.serialize_select(&plan.statement);
        let query = jdbc.bind(&StaticBindings::default())?;

        let timeout = self.timeout(None);
        let rows = exec::exec(&mut *self.connection, query, timeout)
            .await?
            .rows
            .into_values()?;

        let mut state = RowProcessingState::new(self.shared, self.context);
        state.begin_collection(owner, &plan.result);

        for row in &rows {
            state.collection_row(owner, &plan.result, row)?;
        }

        Ok(state.finish())
    }

    /// Runs a translated select and assembles its rows, then performs the
    /// loads the rows call for.
    async fn select(
        &mut self,
        plan: &SelectPlan,
        query: QuerySql,
        timeout: Option<Duration>,
    ) -> Result<Vec<Vec<ResultValue>>> {
        let rows = exec::exec(&mut *self.connection, query, timeout)
            .await?
            .rows
            .into_values()?;

        let (rows, pending) = self.assemble(plan, rows)?;
        self.resolve_pending(pending).await?;
        Ok(rows)
    }

    fn assemble(
        &mut self,
        plan: &SelectPlan,
        rows: Vec<ValueRecord>,
    ) -> Result<(Vec<Vec<ResultValue>>, Pending)> {
        // Joined collections repeat the root row once per element
        let distinct_roots = plan.collection_fetch
            && plan
                .results
                .iter()
                .all(|result| matches!(result, DomainResult::Entity(_)));

        let mut state = RowProcessingState::new(self.shared, self.context);
        let mut seen = HashSet::new();
        let mut assembled = vec![];

        for row in &rows {
            let values = state.row(&plan.results, row)?;

            if distinct_roots {
                let keys: Vec<Option<EntityKey>> = values
                    .iter()
                    .map(|value| value.as_entity().cloned())
                    .collect();

                if !seen.insert(keys) {
                    continue;
                }
            }

            assembled.push(values);
        }

        let pending = state.finish();

        let assembled = match plan.in_memory_paging {
            Some(paging) => paging.apply(assembled),
            None => assembled,
        };

        Ok((assembled, pending))
    }

    /// Loads immediate references and eager collections until none is left.
    async fn resolve_pending(&mut self, mut pending: Pending) -> Result<()> {
        // Keys that matched no row stay proxies; they are not retried
        let mut attempted = HashSet::new();

        loop {
            pending.references.retain(|key| !attempted.contains(key));

            if pending.is_empty() {
                return Ok(());
            }

            let mut next = Pending::default();
            let mut by_entity: IndexMap<EntityId, Vec<Value>> = IndexMap::new();

            for key in pending.references {
                by_entity.entry(key.entity).or_default().push(key.id.clone());
                attempted.insert(key);
            }

            let batch_size = self.shared.settings.multi_load_batch_size.max(1);

            for (entity, ids) in by_entity {
                for chunk in ids.chunks(batch_size) {
                    let (_, more) = self
                        .load_rows(entity, chunk, LockMode::None, self.timeout(None))
                        .await?;
                    next.merge(more);
                }
            }

            for (owner, attribute) in pending.collections {
                if self.context.is_initialized(&owner)
                    && !self.is_collection_initialized(&owner, attribute)
                {
                    next.merge(self.load_collection(&owner, attribute).await?);
                }
            }

            pending = next;
        }
    }

    fn is_collection_initialized(&self, owner: &EntityKey, attribute: AttributeId) -> bool {
        self.context
            .state(owner)
            .and_then(|state| state.values[attribute.index].as_collection())
            .is_some_and(|collection| collection.is_initialized())
    }

    /// Inserts a new entity and manages it.
    pub(crate) async fn persist(&mut self, entity: Entity) -> Result<EntityKey> {
        let shared = self.shared;
        let metamodel = &shared.metamodel;
        let entity_type = metamodel.resolve_entity(&entity.name)?;
        let mutations = self.mutations();

        let id = match (entity_type.identifier.generation, entity.id) {
            (Generation::Assigned, Some(id)) => {
                let id = entity_type.identifier.ty.cast(id)?;

                if id.is_null() {
                    return Err(Error::invalid_statement(format!(
                        "entity `{}` requires an assigned identifier",
                        entity_type.name
                    )));
                }

                let key = EntityKey::new(entity_type.id, id.clone());
                if self.context.is_initialized(&key) {
                    return Err(Error::invalid_statement(format!(
                        "{} is already managed by the session",
                        key.describe(metamodel)
                    )));
                }

                Some(id)
            }
            (_, id) => id,
        };

        let values = mutations.initial_values(entity_type, entity.values)?;
        let version = entity_type.version.as_ref().map(|_| 0);
        let group = mutations.insert(entity_type, id.as_ref(), &values, version)?;

        let generated = self.execute_group(&group).await?;

        let id = match id.or(generated) {
            Some(id) => entity_type.identifier.ty.cast(id)?,
            None => {
                return Err(Error::invalid_statement(format!(
                    "no identifier was generated for `{}`",
                    entity_type.name
                )))
            }
        };

        let key = EntityKey::new(entity_type.id, id);
        tracing::debug!(key = ?key, "persisted entity");

        self.context
            .initialize(key.clone(), EntityState::new(values, version, None));
        Ok(key)
    }

    /// Writes the changed state of every managed entity.
    pub(crate) async fn flush(&mut self) -> Result<()> {
        for key in self.context.dirty_keys() {
            self.flush_entity(&key).await?;
        }

        Ok(())
    }

    /// Writes the changed state of one entity.
    pub(crate) async fn flush_entity(&mut self, key: &EntityKey) -> Result<()> {
        let group = {
            let Some(state) = self.context.state(key) else {
                return Ok(());
            };

            if !state.is_dirty() {
                return Ok(());
            }

            let entity = self.shared.metamodel.entity(key.entity);
            self.mutations().update(entity, key, state)?
        };

        self.execute_group(&group).await.map_err(|err| {
            if err.is_condition_failed() {
                Error::condition_failed(format!(
                    "{} was updated or deleted by another transaction",
                    key.describe(&self.shared.metamodel)
                ))
                .context(err)
            } else {
                err
            }
        })?;

        if let Some(state) = self.context.state_mut(key) {
            state.synchronize();

            if let Some(version) = &mut state.version {
                *version += 1;
            }
        }

        tracing::debug!(key = ?key, "flushed entity");
        Ok(())
    }

    /// Deletes a managed entity and stops managing it.
    pub(crate) async fn remove(&mut self, key: &EntityKey) -> Result<()> {
        self.initialize(key).await?;

        let group = {
            let state = self.context.state(key).ok_or_else(|| {
                Error::record_not_found(key.describe(&self.shared.metamodel))
            })?;
            let entity = self.shared.metamodel.entity(key.entity);
            self.mutations().delete(entity, key, state)?
        };

        self.execute_group(&group).await?;
        self.context.remove(key);

        tracing::debug!(key = ?key, "removed entity");
        Ok(())
    }

    /// Assigns a new value to an attribute of a managed entity.
    pub(crate) async fn set(
        &mut self,
        key: &EntityKey,
        name: &str,
        value: AttributeValue,
    ) -> Result<()> {
        self.initialize(key).await?;

        let shared = self.shared;
        let entity = shared.metamodel.entity(key.entity);
        let attribute = entity.attribute(name).ok_or_else(|| {
            Error::invalid_statement(format!(
                "entity `{}` has no attribute `{name}`",
                entity.name
            ))
        })?;
        let value = self.mutations().check_value(attribute, value)?;

        let state = self
            .context
            .state_mut(key)
            .ok_or_else(|| Error::record_not_found(key.describe(&shared.metamodel)))?;
        state.values[attribute.id.index] = value;
        Ok(())
    }

    pub(crate) async fn transaction(&mut self, op: Transaction) -> Result<()> {
        exec::exec(&mut *self.connection, op, None).await?;
        Ok(())
    }

    /// Flushes before a query that reads tables with pending changes.
    async fn auto_flush(&mut self, tables: &IndexSet<String>) -> Result<()> {
        let dirty = self.context.dirty_tables(&self.shared.metamodel);

        if dirty.iter().any(|table| tables.contains(table)) {
            tracing::debug!(?tables, "auto-flushing before query");
            self.flush().await?;
        }

        Ok(())
    }

    /// Runs the mutations of a group in order, checking each expectation.
    /// Returns the identifier generated by the primary insert, if any.
    async fn execute_group(&mut self, group: &MutationGroup) -> Result<Option<Value>> {
        let mut generated = None;

        for mutation in group.execution_order() {
            let jdbc = self.shared.serializer.serialize_table_mutation(mutation);
            let query = jdbc.bind(&StaticBindings {
                generated_id: generated.as_ref(),
            })?;

            let timeout = self.timeout(None);
            let response = exec::exec(&mut *self.connection, query, timeout).await?;

            if jdbc.returning.is_some() {
                let rows = response.rows.into_values()?;
                jdbc.expectation.verify(&jdbc.table_name, rows.len() as u64)?;

                generated = rows
                    .into_iter()
                    .next()
                    .and_then(|row| row.into_vec().into_iter().next());
            } else {
                jdbc.expectation
                    .verify(&jdbc.table_name, response.rows.affected())?;
            }
        }

        Ok(generated)
    }
}
