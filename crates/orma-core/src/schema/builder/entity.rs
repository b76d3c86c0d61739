use crate::{
    schema::{CollectionClassification, FetchStyle, FetchTiming, Generation},
    stmt::{Type, Value},
};

/// Declares one entity. Names are resolved when the metamodel is built.
#[derive(Debug)]
pub struct EntityBuilder {
    pub(super) name: String,
    pub(super) table: Option<String>,
    pub(super) secondary_tables: Vec<SecondaryTableDecl>,
    pub(super) identifier: Option<IdentifierDecl>,
    pub(super) discriminator: Option<(String, Value)>,
    pub(super) tenant_column: Option<String>,
    pub(super) version: Option<(String, String)>,
    pub(super) row_id: Option<String>,
    pub(super) attributes: Vec<AttributeDecl>,
}

#[derive(Debug)]
pub(super) struct SecondaryTableDecl {
    pub(super) name: String,
    pub(super) key_column: Option<String>,
    pub(super) optional: bool,
}

#[derive(Debug)]
pub(super) struct IdentifierDecl {
    pub(super) name: String,
    pub(super) column: String,
    pub(super) ty: Type,
    pub(super) generation: Generation,
}

#[derive(Debug)]
pub(super) struct AttributeDecl {
    pub(super) name: String,
    pub(super) kind: AttributeDeclKind,
}

#[derive(Debug)]
pub(super) enum AttributeDeclKind {
    Basic(Type, BasicBuilder),
    Embedded(String, EmbeddedBuilder),
    ToOne(String, ToOneBuilder),
    OneToMany(String, PluralBuilder),
    ElementCollection(Type, PluralBuilder),
}

/// Options of a basic attribute.
#[derive(Debug, Default)]
pub struct BasicBuilder {
    pub(super) column: Option<String>,
    pub(super) converter: Option<String>,
    pub(super) nullable: Option<bool>,
    pub(super) table: Option<String>,
}

/// Options of an embedded attribute.
#[derive(Debug, Default)]
pub struct EmbeddedBuilder {
    pub(super) column_prefix: Option<String>,
    pub(super) table: Option<String>,
}

/// Options of a to-one association.
#[derive(Debug, Default)]
pub struct ToOneBuilder {
    pub(super) join_column: Option<String>,
    pub(super) fetch: FetchStyle,
    pub(super) timing: FetchTiming,
    pub(super) optional: Option<bool>,
}

/// Options of a collection attribute.
#[derive(Debug)]
pub struct PluralBuilder {
    pub(super) classification: CollectionClassification,
    pub(super) table: Option<String>,
    pub(super) key_column: Option<String>,
    pub(super) index_column: Option<String>,
    pub(super) collection_id_column: Option<String>,
    pub(super) element_column: Option<String>,
    pub(super) converter: Option<String>,
    pub(super) fetch: FetchStyle,
    pub(super) timing: FetchTiming,
}

/// Declares an embeddable type.
#[derive(Debug)]
pub struct EmbeddableBuilder {
    pub(super) name: String,
    pub(super) fields: Vec<(String, Type, Option<String>)>,
}

impl EntityBuilder {
    pub(super) fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            table: None,
            secondary_tables: vec![],
            identifier: None,
            discriminator: None,
            tenant_column: None,
            version: None,
            row_id: None,
            attributes: vec![],
        }
    }

    /// Primary table name. Defaults to the entity name.
    pub fn table(&mut self, name: &str) -> &mut Self {
        self.table = Some(name.to_string());
        self
    }

    /// Adds a table joined to the primary table by the identifier. The key
    /// column defaults to the identifier column name.
    pub fn secondary_table(&mut self, name: &str, key_column: Option<&str>) -> &mut Self {
        self.secondary_tables.push(SecondaryTableDecl {
            name: name.to_string(),
            key_column: key_column.map(str::to_string),
            optional: false,
        });
        self
    }

    /// Marks the last secondary table optional: its row is written only when
    /// one of its columns holds a value.
    pub fn optional(&mut self) -> &mut Self {
        if let Some(secondary) = self.secondary_tables.last_mut() {
            secondary.optional = true;
        }
        self
    }

    pub fn id(&mut self, name: &str, ty: Type) -> &mut Self {
        self.identifier = Some(IdentifierDecl {
            name: name.to_string(),
            column: name.to_string(),
            ty,
            generation: Generation::Assigned,
        });
        self
    }

    pub fn id_column(&mut self, column: &str) -> &mut Self {
        if let Some(identifier) = &mut self.identifier {
            identifier.column = column.to_string();
        }
        self
    }

    pub fn generated_identity(&mut self) -> &mut Self {
        if let Some(identifier) = &mut self.identifier {
            identifier.generation = Generation::Identity;
        }
        self
    }

    pub fn discriminator(&mut self, column: &str, value: impl Into<Value>) -> &mut Self {
        self.discriminator = Some((column.to_string(), value.into()));
        self
    }

    pub fn tenant_column(&mut self, column: &str) -> &mut Self {
        self.tenant_column = Some(column.to_string());
        self
    }

    /// Optimistic lock version stored in an integer column of the same name.
    pub fn version(&mut self, name: &str) -> &mut Self {
        self.version = Some((name.to_string(), name.to_string()));
        self
    }

    pub fn row_id(&mut self, column: &str) -> &mut Self {
        self.row_id = Some(column.to_string());
        self
    }

    pub fn basic(&mut self, name: &str, ty: Type) -> &mut Self {
        self.basic_with(name, ty, |_| {})
    }

    pub fn basic_with(
        &mut self,
        name: &str,
        ty: Type,
        f: impl FnOnce(&mut BasicBuilder),
    ) -> &mut Self {
        let mut builder = BasicBuilder::default();
        f(&mut builder);
        self.push(name, AttributeDeclKind::Basic(ty, builder))
    }

    pub fn embedded(&mut self, name: &str, embeddable: &str) -> &mut Self {
        self.embedded_with(name, embeddable, |_| {})
    }

    pub fn embedded_with(
        &mut self,
        name: &str,
        embeddable: &str,
        f: impl FnOnce(&mut EmbeddedBuilder),
    ) -> &mut Self {
        let mut builder = EmbeddedBuilder::default();
        f(&mut builder);
        self.push(
            name,
            AttributeDeclKind::Embedded(embeddable.to_string(), builder),
        )
    }

    pub fn many_to_one(
        &mut self,
        name: &str,
        target: &str,
        f: impl FnOnce(&mut ToOneBuilder),
    ) -> &mut Self {
        let mut builder = ToOneBuilder::default();
        f(&mut builder);
        self.push(name, AttributeDeclKind::ToOne(target.to_string(), builder))
    }

    pub fn one_to_many(
        &mut self,
        name: &str,
        target: &str,
        f: impl FnOnce(&mut PluralBuilder),
    ) -> &mut Self {
        let mut builder = PluralBuilder::new();
        f(&mut builder);
        self.push(
            name,
            AttributeDeclKind::OneToMany(target.to_string(), builder),
        )
    }

    pub fn element_collection(
        &mut self,
        name: &str,
        ty: Type,
        f: impl FnOnce(&mut PluralBuilder),
    ) -> &mut Self {
        let mut builder = PluralBuilder::new();
        f(&mut builder);
        self.push(name, AttributeDeclKind::ElementCollection(ty, builder))
    }

    fn push(&mut self, name: &str, kind: AttributeDeclKind) -> &mut Self {
        self.attributes.push(AttributeDecl {
            name: name.to_string(),
            kind,
        });
        self
    }
}

impl BasicBuilder {
    pub fn column(&mut self, name: &str) -> &mut Self {
        self.column = Some(name.to_string());
        self
    }

    pub fn converter(&mut self, name: &str) -> &mut Self {
        self.converter = Some(name.to_string());
        self
    }

    pub fn nullable(&mut self, nullable: bool) -> &mut Self {
        self.nullable = Some(nullable);
        self
    }

    /// Stores the attribute in one of the entity's secondary tables.
    pub fn table(&mut self, name: &str) -> &mut Self {
        self.table = Some(name.to_string());
        self
    }
}

impl EmbeddedBuilder {
    /// Column names become `{prefix}_{field}`. Defaults to the attribute name.
    pub fn column_prefix(&mut self, prefix: &str) -> &mut Self {
        self.column_prefix = Some(prefix.to_string());
        self
    }

    pub fn table(&mut self, name: &str) -> &mut Self {
        self.table = Some(name.to_string());
        self
    }
}

impl ToOneBuilder {
    /// Defaults to `{attribute}_id`.
    pub fn join_column(&mut self, name: &str) -> &mut Self {
        self.join_column = Some(name.to_string());
        self
    }

    pub fn fetch(&mut self, fetch: FetchStyle) -> &mut Self {
        self.fetch = fetch;
        self
    }

    pub fn lazy(&mut self) -> &mut Self {
        self.timing = FetchTiming::Delayed;
        self
    }

    pub fn optional(&mut self, optional: bool) -> &mut Self {
        self.optional = Some(optional);
        self
    }
}

impl PluralBuilder {
    fn new() -> Self {
        Self {
            classification: CollectionClassification::Bag,
            table: None,
            key_column: None,
            index_column: None,
            collection_id_column: None,
            element_column: None,
            converter: None,
            fetch: FetchStyle::Select,
            timing: FetchTiming::Delayed,
        }
    }

    /// Key column referencing the owner. Defaults to `{owner}_id`.
    pub fn key_column(&mut self, name: &str) -> &mut Self {
        self.key_column = Some(name.to_string());
        self
    }

    /// Makes the collection a list ordered by `column`.
    pub fn list_index(&mut self, column: &str) -> &mut Self {
        self.classification = CollectionClassification::List;
        self.index_column = Some(column.to_string());
        self
    }

    pub fn set(&mut self) -> &mut Self {
        self.classification = CollectionClassification::Set;
        self
    }

    /// Gives each collection row a generated surrogate identifier.
    pub fn collection_id(&mut self, column: &str) -> &mut Self {
        self.collection_id_column = Some(column.to_string());
        self
    }

    /// Collection table of an element collection. Defaults to
    /// `{Entity}_{attribute}`.
    pub fn table(&mut self, name: &str) -> &mut Self {
        self.table = Some(name.to_string());
        self
    }

    /// Element column of an element collection. Defaults to the attribute name.
    pub fn column(&mut self, name: &str) -> &mut Self {
        self.element_column = Some(name.to_string());
        self
    }

    pub fn converter(&mut self, name: &str) -> &mut Self {
        self.converter = Some(name.to_string());
        self
    }

    pub fn fetch(&mut self, fetch: FetchStyle) -> &mut Self {
        self.fetch = fetch;
        self
    }

    pub fn eager(&mut self) -> &mut Self {
        self.timing = FetchTiming::Immediate;
        self
    }
}

impl EmbeddableBuilder {
    pub(super) fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            fields: vec![],
        }
    }

    pub fn field(&mut self, name: &str, ty: Type) -> &mut Self {
        self.fields.push((name.to_string(), ty, None));
        self
    }

    pub fn field_with_converter(&mut self, name: &str, ty: Type, converter: &str) -> &mut Self {
        self.fields
            .push((name.to_string(), ty, Some(converter.to_string())));
        self
    }
}
