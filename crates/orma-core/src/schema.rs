//! Runtime metamodel: entities, attributes, and their relational mapping.
//!
//! Built once through [`Builder`] and shared read-only afterwards.

mod attribute;
pub use attribute::{
    Attribute, AttributeId, AttributeTy, BasicAttribute, EmbeddedAttribute, FetchStyle,
    FetchTiming, ToOne,
};

mod builder;
pub use builder::{
    BasicBuilder, Builder, EmbeddableBuilder, EmbeddedBuilder, EntityBuilder, PluralBuilder,
    ToOneBuilder,
};

mod embeddable;
pub use embeddable::{EmbeddableField, EmbeddableId, EmbeddableType};

mod entity;
pub use entity::{
    Discriminator, EntityId, EntityType, Generation, Identifier, RowId, SecondaryTable, TenantId,
    Version,
};

mod foreign_key;
pub use foreign_key::ForeignKey;

mod navigable;
pub use navigable::{Navigable, NavigablePath, NavigableRole};

mod plural;
pub use plural::{CollectionClassification, CollectionElement, PluralAttribute};

mod table;
pub use table::{Column, ColumnId, Table, TableId};

mod type_configuration;
pub use type_configuration::{
    AttributeConverter, EnumAsStringConverter, NumericBooleanConverter, TrueFalseConverter,
    TypeConfiguration, YesNoConverter,
};

mod verify;

mod visit;
pub use visit::{visit_entity, CollectNavigables, NavigableVisitor};

use crate::{Error, Result};

use indexmap::IndexMap;

#[derive(Debug)]
pub struct Metamodel {
    pub entities: Vec<EntityType>,

    pub embeddables: Vec<EmbeddableType>,

    pub tables: Vec<Table>,

    entity_lookup: IndexMap<String, EntityId>,
}

impl Metamodel {
    pub fn builder() -> Builder {
        Builder::default()
    }

    pub(crate) fn new(
        entities: Vec<EntityType>,
        embeddables: Vec<EmbeddableType>,
        tables: Vec<Table>,
        entity_lookup: IndexMap<String, EntityId>,
    ) -> Self {
        Self {
            entities,
            embeddables,
            tables,
            entity_lookup,
        }
    }

    #[track_caller]
    pub fn entity(&self, id: impl Into<EntityId>) -> &EntityType {
        &self.entities[id.into().0]
    }

    pub fn entity_by_name(&self, name: &str) -> Option<&EntityType> {
        self.entity_lookup.get(name).map(|id| self.entity(*id))
    }

    /// Looks up an entity by name, failing with a mapping error.
    pub fn resolve_entity(&self, name: &str) -> Result<&EntityType> {
        self.entity_by_name(name)
            .ok_or_else(|| Error::mapping(format!("unknown entity `{name}`")))
    }

    pub fn embeddable(&self, id: EmbeddableId) -> &EmbeddableType {
        &self.embeddables[id.0]
    }

    pub fn table(&self, id: impl Into<TableId>) -> &Table {
        &self.tables[id.into().0]
    }

    pub fn table_by_name(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|table| table.name == name)
    }

    pub fn column(&self, id: impl Into<ColumnId>) -> &Column {
        let id = id.into();
        self.table(id.table).column(id)
    }

    pub fn attribute(&self, id: AttributeId) -> &Attribute {
        &self.entity(id.entity).attributes[id.index]
    }

    /// Finds the navigable with the given role.
    pub fn navigable(&self, role: &str) -> Option<Navigable<'_>> {
        let entity_name = role.split('.').next()?;
        let entity = self.entity_by_name(entity_name)?;

        let mut collect = CollectNavigables::default();
        visit_entity(entity, &mut collect);

        collect
            .navigables
            .into_iter()
            .find(|navigable| navigable.role() == role)
    }
}

impl From<&EntityType> for EntityId {
    fn from(value: &EntityType) -> Self {
        value.id
    }
}

impl From<&Table> for TableId {
    fn from(value: &Table) -> Self {
        value.id
    }
}
