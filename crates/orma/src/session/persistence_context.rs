use super::{AttributeValue, EntityKey};

use orma_core::{schema::Metamodel, stmt::Value};

use indexmap::IndexMap;

/// The session's identity map: at most one holder per entity key.
#[derive(Debug, Default)]
pub(crate) struct PersistenceContext {
    holders: IndexMap<EntityKey, EntityHolder>,
}

/// A managed entity. Without state the entity is a proxy: its identity is
/// known but its row has not been read.
#[derive(Debug, Default)]
pub(crate) struct EntityHolder {
    pub(crate) state: Option<EntityState>,
}

#[derive(Debug, Clone)]
pub(crate) struct EntityState {
    /// One value per attribute, indexed like the entity's attributes
    pub(crate) values: Vec<AttributeValue>,

    /// Values as last read from or written to the database
    pub(crate) snapshot: Vec<AttributeValue>,

    pub(crate) version: Option<i64>,

    pub(crate) row_id: Option<Value>,
}

impl PersistenceContext {
    pub(crate) fn get_key_value(&self, key: &EntityKey) -> Option<(&EntityKey, &EntityHolder)> {
        self.holders.get_key_value(key)
    }

    pub(crate) fn state(&self, key: &EntityKey) -> Option<&EntityState> {
        self.holders.get(key).and_then(|holder| holder.state.as_ref())
    }

    pub(crate) fn state_mut(&mut self, key: &EntityKey) -> Option<&mut EntityState> {
        self.holders
            .get_mut(key)
            .and_then(|holder| holder.state.as_mut())
    }

    pub(crate) fn contains(&self, key: &EntityKey) -> bool {
        self.holders.contains_key(key)
    }

    pub(crate) fn is_initialized(&self, key: &EntityKey) -> bool {
        self.state(key).is_some()
    }

    /// Registers a proxy unless the key is already managed.
    pub(crate) fn register_proxy(&mut self, key: EntityKey) {
        self.holders.entry(key).or_default();
    }

    /// Stores loaded state. State already held for the key wins; a proxy is
    /// initialized in place.
    pub(crate) fn initialize(&mut self, key: EntityKey, state: EntityState) {
        let holder = self.holders.entry(key).or_default();

        if holder.state.is_none() {
            holder.state = Some(state);
        }
    }

    pub(crate) fn remove(&mut self, key: &EntityKey) -> Option<EntityHolder> {
        self.holders.shift_remove(key)
    }

    pub(crate) fn clear(&mut self) {
        self.holders.clear();
    }

    /// Keys of initialized entities whose state differs from their snapshot.
    pub(crate) fn dirty_keys(&self) -> Vec<EntityKey> {
        self.holders
            .iter()
            .filter(|(_, holder)| holder.state.as_ref().is_some_and(EntityState::is_dirty))
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Names of the tables dirty entities would write to on flush.
    pub(crate) fn dirty_tables(&self, metamodel: &Metamodel) -> Vec<String> {
        let mut tables = vec![];

        for key in self.dirty_keys() {
            let entity = metamodel.entity(key.entity);

            for table in entity.tables() {
                tables.push(metamodel.table(table).name.clone());
            }

            for attribute in entity.plural_attributes() {
                if let Some(plural) = attribute.as_plural() {
                    tables.push(metamodel.table(plural.table).name.clone());
                }
            }
        }

        tables
    }
}

impl EntityState {
    pub(crate) fn new(values: Vec<AttributeValue>, version: Option<i64>, row_id: Option<Value>) -> Self {
        Self {
            snapshot: values.clone(),
            values,
            version,
            row_id,
        }
    }

    pub(crate) fn is_dirty(&self) -> bool {
        self.values != self.snapshot
    }

    /// Marks the current values as written.
    pub(crate) fn synchronize(&mut self) {
        self.snapshot = self.values.clone();
    }
}
