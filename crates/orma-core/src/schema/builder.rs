mod entity;
pub use entity::{
    BasicBuilder, EmbeddableBuilder, EmbeddedBuilder, EntityBuilder, PluralBuilder, ToOneBuilder,
};

use entity::{AttributeDeclKind, IdentifierDecl};

use super::*;
use crate::{stmt::Type, Error, Result};

use indexmap::IndexMap;

#[derive(Debug, Default)]
pub struct Builder {
    /// If set, prefix all table names with this string
    table_name_prefix: Option<String>,

    entities: Vec<EntityBuilder>,

    embeddables: Vec<EmbeddableBuilder>,
}

/// Used to track state during the build process
struct BuildMetamodel<'a> {
    builder: &'a Builder,

    type_configuration: &'a TypeConfiguration,

    /// Maps prefixed table names to identifiers
    table_lookup: IndexMap<String, TableId>,

    /// Tables as they are built
    tables: Vec<Table>,

    entity_lookup: IndexMap<String, EntityId>,

    embeddable_lookup: IndexMap<String, EmbeddableId>,

    embeddables: Vec<EmbeddableType>,
}

/// Tables and key columns of an entity, created before any attribute so that
/// associations can reference every entity's identifier.
struct EntityStub {
    table: TableId,
    id_column: ColumnId,
    secondary_tables: Vec<SecondaryTable>,
}

impl Builder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table_name_prefix(&mut self, prefix: &str) -> &mut Self {
        self.table_name_prefix = Some(prefix.to_string());
        self
    }

    pub fn entity(&mut self, name: &str, f: impl FnOnce(&mut EntityBuilder)) -> &mut Self {
        let mut entity = EntityBuilder::new(name);
        f(&mut entity);
        self.entities.push(entity);
        self
    }

    pub fn embeddable(&mut self, name: &str, f: impl FnOnce(&mut EmbeddableBuilder)) -> &mut Self {
        let mut embeddable = EmbeddableBuilder::new(name);
        f(&mut embeddable);
        self.embeddables.push(embeddable);
        self
    }

    pub fn build(&self, type_configuration: &TypeConfiguration) -> Result<Metamodel> {
        let mut builder = BuildMetamodel {
            builder: self,
            type_configuration,
            table_lookup: IndexMap::new(),
            tables: vec![],
            entity_lookup: IndexMap::new(),
            embeddable_lookup: IndexMap::new(),
            embeddables: vec![],
        };

        builder.build_embeddables()?;

        for (index, entity) in self.entities.iter().enumerate() {
            if builder
                .entity_lookup
                .insert(entity.name.clone(), EntityId(index))
                .is_some()
            {
                return Err(Error::mapping(format!(
                    "entity `{}` declared more than once",
                    entity.name
                )));
            }
        }

        // Reserve every entity's tables and identifier column first
        let stubs = self
            .entities
            .iter()
            .map(|entity| builder.build_entity_stub(entity))
            .collect::<Result<Vec<_>>>()?;

        let mut entities = vec![];

        for (index, entity) in self.entities.iter().enumerate() {
            let built = builder
                .build_entity(EntityId(index), entity, &stubs)
                .map_err(|err| err.context(crate::err!("entity `{}`", entity.name)))?;
            entities.push(built);
        }

        let metamodel = Metamodel::new(
            entities,
            builder.embeddables,
            builder.tables,
            builder.entity_lookup,
        );

        metamodel.verify()?;

        Ok(metamodel)
    }
}

impl BuildMetamodel<'_> {
    fn build_embeddables(&mut self) -> Result<()> {
        for (index, decl) in self.builder.embeddables.iter().enumerate() {
            let id = EmbeddableId(index);

            let mut fields = vec![];
            for (name, ty, converter) in &decl.fields {
                // Fail early on unknown converters
                self.type_configuration
                    .relational_type(ty, converter.as_deref())?;

                fields.push(EmbeddableField {
                    name: name.clone(),
                    ty: ty.clone(),
                    converter: converter.clone(),
                });
            }

            self.embeddable_lookup.insert(decl.name.clone(), id);
            self.embeddables.push(EmbeddableType {
                id,
                name: decl.name.clone(),
                fields,
            });
        }

        Ok(())
    }

    fn build_entity_stub(&mut self, decl: &EntityBuilder) -> Result<EntityStub> {
        let Some(identifier) = &decl.identifier else {
            return Err(Error::mapping(format!(
                "entity `{}` declares no identifier",
                decl.name
            )));
        };

        let table = self.table_for(decl.table.as_deref().unwrap_or(&decl.name));
        let id_column = self.add_column(table, &identifier.column, identifier.ty.clone(), false)?;
        self.set_primary_key(id_column, identifier.generation == Generation::Identity);

        let mut secondary_tables = vec![];

        for secondary in &decl.secondary_tables {
            let secondary_table = self.table_for(&secondary.name);
            let key_column = self.add_column(
                secondary_table,
                secondary
                    .key_column
                    .as_deref()
                    .unwrap_or(&identifier.column),
                identifier.ty.clone(),
                false,
            )?;
            self.set_primary_key(key_column, false);

            secondary_tables.push(SecondaryTable {
                table: secondary_table,
                key: ForeignKey {
                    columns: vec![key_column],
                    target_columns: vec![id_column],
                },
                optional: secondary.optional,
            });
        }

        Ok(EntityStub {
            table,
            id_column,
            secondary_tables,
        })
    }

    fn build_entity(
        &mut self,
        id: EntityId,
        decl: &EntityBuilder,
        stubs: &[EntityStub],
    ) -> Result<EntityType> {
        let stub = &stubs[id.0];
        let role = NavigableRole::new(&decl.name);
        let identifier_decl = Self::identifier_decl(decl)?;

        let identifier = Identifier {
            name: identifier_decl.name.clone(),
            role: role.append("{id}"),
            column: stub.id_column,
            ty: identifier_decl.ty.clone(),
            generation: identifier_decl.generation,
        };

        let discriminator = match &decl.discriminator {
            Some((column, value)) => Some(Discriminator {
                role: role.append("{discriminator}"),
                column: self.add_column(stub.table, column, value.infer_ty(), false)?,
                value: value.clone(),
            }),
            None => None,
        };

        let tenant_id = match &decl.tenant_column {
            Some(column) => Some(TenantId {
                role: role.append("{tenant}"),
                column: self.add_column(stub.table, column, Type::String, false)?,
            }),
            None => None,
        };

        let version = match &decl.version {
            Some((name, column)) => Some(Version {
                name: name.clone(),
                role: role.append("{version}"),
                column: self.add_column(stub.table, column, Type::I64, false)?,
            }),
            None => None,
        };

        let row_id = decl.row_id.as_ref().map(|column| RowId {
            role: role.append("{row-id}"),
            column_name: column.clone(),
        });

        let mut attributes = vec![];

        for (index, attr) in decl.attributes.iter().enumerate() {
            if attr.name == identifier.name || decl.attributes[..index].iter().any(|a| a.name == attr.name) {
                return Err(Error::mapping(format!(
                    "attribute `{}` declared more than once",
                    attr.name
                )));
            }

            let (ty, nullable) = self.build_attribute_ty(decl, stub, stubs, &attr.name, &attr.kind)?;

            attributes.push(Attribute {
                id: AttributeId { entity: id, index },
                name: attr.name.clone(),
                role: role.append(&attr.name),
                ty,
                nullable,
            });
        }

        Ok(EntityType {
            id,
            name: decl.name.clone(),
            role,
            table: stub.table,
            secondary_tables: stub
                .secondary_tables
                .iter()
                .map(|secondary| SecondaryTable {
                    table: secondary.table,
                    key: secondary.key.clone(),
                    optional: secondary.optional,
                })
                .collect(),
            identifier,
            discriminator,
            tenant_id,
            version,
            row_id,
            attributes,
        })
    }

    fn build_attribute_ty(
        &mut self,
        decl: &EntityBuilder,
        stub: &EntityStub,
        stubs: &[EntityStub],
        name: &str,
        kind: &AttributeDeclKind,
    ) -> Result<(AttributeTy, bool)> {
        Ok(match kind {
            AttributeDeclKind::Basic(ty, basic) => {
                let table = self.attribute_table(stub, basic.table.as_deref())?;
                let column_ty = self
                    .type_configuration
                    .relational_type(ty, basic.converter.as_deref())?;
                let nullable = basic.nullable.unwrap_or(true);
                let column = self.add_column(
                    table,
                    basic.column.as_deref().unwrap_or(name),
                    column_ty,
                    nullable,
                )?;

                (
                    AttributeTy::Basic(BasicAttribute {
                        column,
                        ty: ty.clone(),
                        converter: basic.converter.clone(),
                    }),
                    nullable,
                )
            }
            AttributeDeclKind::Embedded(embeddable, embedded) => {
                let Some(&embeddable_id) = self.embeddable_lookup.get(embeddable) else {
                    return Err(Error::mapping(format!(
                        "attribute `{name}` references unknown embeddable `{embeddable}`"
                    )));
                };

                let table = self.attribute_table(stub, embedded.table.as_deref())?;
                let prefix = embedded.column_prefix.as_deref().unwrap_or(name);

                let mut columns = vec![];
                for i in 0..self.embeddables[embeddable_id.0].fields.len() {
                    let field = &self.embeddables[embeddable_id.0].fields[i];
                    let column_name = format!("{prefix}_{}", field.name);
                    let column_ty = self
                        .type_configuration
                        .relational_type(&field.ty, field.converter.as_deref())?;
                    columns.push(self.add_column(table, &column_name, column_ty, true)?);
                }

                (
                    AttributeTy::Embedded(EmbeddedAttribute {
                        embeddable: embeddable_id,
                        columns,
                    }),
                    true,
                )
            }
            AttributeDeclKind::ToOne(target, to_one) => {
                let target_id = self.resolve_entity(name, target)?;
                let builder = self.builder;
                let target_identifier = Self::identifier_decl(&builder.entities[target_id.0])?;
                let nullable = to_one.optional.unwrap_or(true);
                let column_name = match &to_one.join_column {
                    Some(column) => column.clone(),
                    None => format!("{name}_id"),
                };
                let column =
                    self.add_column(stub.table, &column_name, target_identifier.ty.clone(), nullable)?;

                (
                    AttributeTy::ToOne(ToOne {
                        target: target_id,
                        foreign_key: ForeignKey {
                            columns: vec![column],
                            target_columns: vec![stubs[target_id.0].id_column],
                        },
                        fetch: to_one.fetch,
                        timing: to_one.timing,
                    }),
                    nullable,
                )
            }
            AttributeDeclKind::OneToMany(target, plural) => {
                let target_id = self.resolve_entity(name, target)?;

                if plural.collection_id_column.is_some() {
                    return Err(Error::mapping(format!(
                        "one-to-many `{name}` cannot declare a collection id"
                    )));
                }

                let owner_ty = Self::identifier_decl(decl)?.ty.clone();
                let target_table = stubs[target_id.0].table;
                let key_column_name = key_column_name(decl, plural);
                let key_column = self.add_column(target_table, &key_column_name, owner_ty, true)?;
                let index = match &plural.index_column {
                    Some(column) => Some(self.add_column(target_table, column, Type::I32, true)?),
                    None => None,
                };

                (
                    AttributeTy::Plural(PluralAttribute {
                        classification: plural.classification,
                        table: target_table,
                        key: ForeignKey {
                            columns: vec![key_column],
                            target_columns: vec![stub.id_column],
                        },
                        collection_id: None,
                        index,
                        element: CollectionElement::Entity { target: target_id },
                        fetch: plural.fetch,
                        timing: plural.timing,
                    }),
                    false,
                )
            }
            AttributeDeclKind::ElementCollection(ty, plural) => {
                let owner_ty = Self::identifier_decl(decl)?.ty.clone();
                let table_name = match &plural.table {
                    Some(table) => table.clone(),
                    None => format!("{}_{name}", decl.name),
                };
                let table = self.table_for(&table_name);

                let key_column_name = key_column_name(decl, plural);
                let key_column = self.add_column(table, &key_column_name, owner_ty, false)?;

                let collection_id = match &plural.collection_id_column {
                    Some(column) => {
                        let column = self.add_column(table, column, Type::I64, false)?;
                        self.set_primary_key(column, true);
                        Some(column)
                    }
                    None => None,
                };

                let index = match &plural.index_column {
                    Some(column) => Some(self.add_column(table, column, Type::I32, false)?),
                    None => None,
                };

                let column_ty = self
                    .type_configuration
                    .relational_type(ty, plural.converter.as_deref())?;
                let element_column = self.add_column(
                    table,
                    plural.element_column.as_deref().unwrap_or(name),
                    column_ty,
                    true,
                )?;

                if collection_id.is_none() {
                    self.set_primary_key(key_column, false);
                    match index {
                        Some(index) => self.set_primary_key(index, false),
                        None => self.set_primary_key(element_column, false),
                    }
                }

                (
                    AttributeTy::Plural(PluralAttribute {
                        classification: plural.classification,
                        table,
                        key: ForeignKey {
                            columns: vec![key_column],
                            target_columns: vec![stub.id_column],
                        },
                        collection_id,
                        index,
                        element: CollectionElement::Basic {
                            column: element_column,
                            ty: ty.clone(),
                            converter: plural.converter.clone(),
                        },
                        fetch: plural.fetch,
                        timing: plural.timing,
                    }),
                    false,
                )
            }
        })
    }

    fn identifier_decl(decl: &EntityBuilder) -> Result<&IdentifierDecl> {
        decl.identifier.as_ref().ok_or_else(|| {
            Error::mapping(format!("entity `{}` declares no identifier", decl.name))
        })
    }

    fn resolve_entity(&self, attribute: &str, target: &str) -> Result<EntityId> {
        self.entity_lookup.get(target).copied().ok_or_else(|| {
            Error::mapping(format!(
                "attribute `{attribute}` references unknown entity `{target}`"
            ))
        })
    }

    /// Table an attribute's columns live in: the primary table, or a declared
    /// secondary table.
    fn attribute_table(&self, stub: &EntityStub, name: Option<&str>) -> Result<TableId> {
        let Some(name) = name else {
            return Ok(stub.table);
        };

        let prefixed = self.prefixed(name);

        stub.secondary_tables
            .iter()
            .map(|secondary| secondary.table)
            .find(|table| self.tables[table.0].name == prefixed)
            .ok_or_else(|| Error::mapping(format!("`{name}` is not a secondary table")))
    }

    fn prefixed(&self, name: &str) -> String {
        match &self.builder.table_name_prefix {
            Some(prefix) => format!("{prefix}{name}"),
            None => name.to_string(),
        }
    }

    /// Returns the table with the given (unprefixed) name, creating it on first
    /// use. Entities sharing a table share one `Table`.
    fn table_for(&mut self, name: &str) -> TableId {
        let name = self.prefixed(name);

        if let Some(&id) = self.table_lookup.get(&name) {
            return id;
        }

        let id = TableId(self.tables.len());
        self.tables.push(Table::new(id, name.clone()));
        self.table_lookup.insert(name, id);
        id
    }

    /// Adds a column, reusing an existing column of the same name and type.
    fn add_column(&mut self, table: TableId, name: &str, ty: Type, nullable: bool) -> Result<ColumnId> {
        let table = &mut self.tables[table.0];

        if let Some(existing) = table.column_by_name(name) {
            if existing.ty != ty {
                return Err(Error::mapping(format!(
                    "column `{}.{name}` mapped with conflicting types {} and {}",
                    table.name,
                    existing.ty.name(),
                    ty.name()
                )));
            }
            return Ok(existing.id);
        }

        let id = ColumnId {
            table: table.id,
            index: table.columns.len(),
        };

        table.columns.push(Column {
            id,
            name: name.to_string(),
            ty,
            nullable,
            primary_key: false,
            auto_increment: false,
        });

        Ok(id)
    }

    fn set_primary_key(&mut self, column: ColumnId, auto_increment: bool) {
        let table = &mut self.tables[column.table.0];

        if table.primary_key.contains(&column) {
            return;
        }

        let column_def = &mut table.columns[column.index];
        column_def.primary_key = true;
        column_def.nullable = false;
        column_def.auto_increment = auto_increment;
        table.primary_key.push(column);
    }
}

fn key_column_name(owner: &EntityBuilder, plural: &PluralBuilder) -> String {
    match &plural.key_column {
        Some(column) => column.clone(),
        None => format!("{}_id", owner.name.to_lowercase()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn issue_tracker() -> Builder {
        let mut builder = Builder::new();
        builder
            .entity("User", |e| {
                e.table("users").id("id", Type::I64).basic("name", Type::String);
            })
            .entity("Issue", |e| {
                e.id("id", Type::I64)
                    .generated_identity()
                    .version("version")
                    .basic_with("title", Type::String, |b| {
                        b.nullable(false);
                    })
                    .basic_with("open", Type::Bool, |b| {
                        b.converter("yes_no");
                    })
                    .many_to_one("reporter", "User", |_| {})
                    .element_collection("labels", Type::String, |p| {
                        p.set();
                    })
                    .one_to_many("comments", "Comment", |p| {
                        p.list_index("position");
                    });
            })
            .entity("Comment", |e| {
                e.id("id", Type::I64)
                    .basic("body", Type::String)
                    .many_to_one("issue", "Issue", |_| {});
            });
        builder
    }

    #[test]
    fn builds_tables_and_columns() {
        let metamodel = issue_tracker().build(&TypeConfiguration::new()).unwrap();

        let names: Vec<_> = metamodel.tables.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["users", "Issue", "Comment", "Issue_labels"]);

        let issue = metamodel.table_by_name("Issue").unwrap();
        let id = issue.column_by_name("id").unwrap();
        assert!(id.primary_key);
        assert!(id.auto_increment);

        // Converted columns store the relational type
        assert_eq!(issue.column_by_name("open").unwrap().ty, Type::String);
        assert!(!issue.column_by_name("title").unwrap().nullable);
        assert_eq!(issue.column_by_name("reporter_id").unwrap().ty, Type::I64);
    }

    #[test]
    fn inverse_key_column_is_shared() {
        let metamodel = issue_tracker().build(&TypeConfiguration::new()).unwrap();

        // `Issue.comments` maps `issue_id` first; `Comment.issue` reuses it
        let comment = metamodel.table_by_name("Comment").unwrap();
        let names: Vec<_> = comment.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["id", "issue_id", "position", "body"]);
    }

    #[test]
    fn element_collection_key() {
        let metamodel = issue_tracker().build(&TypeConfiguration::new()).unwrap();

        let labels = metamodel.table_by_name("Issue_labels").unwrap();
        let pk: Vec<_> = labels.primary_key_columns().map(|c| c.name.as_str()).collect();
        assert_eq!(pk, ["issue_id", "labels"]);
    }

    #[test]
    fn table_name_prefix() {
        let mut builder = issue_tracker();
        builder.table_name_prefix("t_");

        let metamodel = builder.build(&TypeConfiguration::new()).unwrap();
        assert!(metamodel.table_by_name("t_users").is_some());
        assert!(metamodel.table_by_name("users").is_none());
    }

    #[test]
    fn unknown_target_entity() {
        let mut builder = Builder::new();
        builder.entity("Issue", |e| {
            e.id("id", Type::I64).many_to_one("project", "Project", |_| {});
        });

        let err = builder.build(&TypeConfiguration::new()).unwrap_err();
        assert!(err.to_string().contains("unknown entity `Project`"), "{err}");
    }

    #[test]
    fn missing_identifier() {
        let mut builder = Builder::new();
        builder.entity("Issue", |e| {
            e.basic("title", Type::String);
        });

        let err = builder.build(&TypeConfiguration::new()).unwrap_err();
        assert!(err.to_string().contains("declares no identifier"), "{err}");
    }

    #[test]
    fn duplicate_attribute() {
        let mut builder = Builder::new();
        builder.entity("Issue", |e| {
            e.id("id", Type::I64)
                .basic("title", Type::String)
                .basic("title", Type::String);
        });

        let err = builder.build(&TypeConfiguration::new()).unwrap_err();
        assert!(err.to_string().contains("declared more than once"), "{err}");
    }

    #[test]
    fn converter_domain_type_mismatch() {
        let mut builder = Builder::new();
        builder.entity("Issue", |e| {
            e.id("id", Type::I64).basic_with("title", Type::String, |b| {
                b.converter("yes_no");
            });
        });

        assert!(builder.build(&TypeConfiguration::new()).is_err());
    }
}
