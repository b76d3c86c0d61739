//! Builds the mutation groups of entity writes.
//!
//! An insert writes the primary table, then secondary tables, then
//! collection rows. A delete removes collection rows, then secondary tables,
//! then the primary row. Updates only write the columns whose attribute
//! changed since the last synchronization.

use crate::session::{AttributeValue, Element, EntityKey, EntityState, PersistentCollection};

use orma_core::{
    driver::Capability,
    schema::{
        Attribute, AttributeTy, CollectionElement, ColumnId, EntityType, Generation, Metamodel,
        PluralAttribute, SecondaryTable, TableId, TypeConfiguration,
    },
    sql::{
        ColumnReference, ColumnValueBinding, Expectation, JdbcParameter, MutationGroup,
        MutationKind, TableDelete, TableInsert, TableMutation, TableUpdate,
    },
    stmt::{Type, Value},
    Error, Result,
};

use indexmap::IndexMap;

pub(crate) struct MutationBuilder<'a> {
    metamodel: &'a Metamodel,
    types: &'a TypeConfiguration,
    capability: &'static Capability,
    tenant: Option<&'a str>,
}

impl<'a> MutationBuilder<'a> {
    pub(crate) fn new(
        metamodel: &'a Metamodel,
        types: &'a TypeConfiguration,
        capability: &'static Capability,
        tenant: Option<&'a str>,
    ) -> Self {
        Self {
            metamodel,
            types,
            capability,
            tenant,
        }
    }

    /// Attribute values of a new entity, in attribute order. Attributes the
    /// caller left out start null or empty.
    pub(crate) fn initial_values(
        &self,
        entity: &EntityType,
        mut supplied: IndexMap<String, AttributeValue>,
    ) -> Result<Vec<AttributeValue>> {
        let mut values = Vec::with_capacity(entity.attributes.len());

        for attribute in &entity.attributes {
            let value = match supplied.shift_remove(&attribute.name) {
                Some(value) => value,
                None => match &attribute.ty {
                    AttributeTy::Basic(_) | AttributeTy::Embedded(_) => {
                        AttributeValue::Value(Value::Null)
                    }
                    AttributeTy::ToOne(_) => AttributeValue::Reference(None),
                    AttributeTy::Plural(_) => {
                        AttributeValue::Collection(PersistentCollection::initialized(vec![]))
                    }
                },
            };

            values.push(self.check_value(attribute, value)?);
        }

        if let Some(name) = supplied.keys().next() {
            return Err(Error::invalid_statement(format!(
                "entity `{}` has no attribute `{name}`",
                entity.name
            )));
        }

        Ok(values)
    }

    /// Validates a value assigned to an attribute, casting it to the
    /// attribute's domain type.
    pub(crate) fn check_value(
        &self,
        attribute: &Attribute,
        value: AttributeValue,
    ) -> Result<AttributeValue> {
        let value = match (&attribute.ty, value) {
            (AttributeTy::Basic(basic), AttributeValue::Value(value)) => {
                AttributeValue::Value(basic.ty.cast(value)?)
            }
            (AttributeTy::Embedded(embedded), AttributeValue::Value(value)) => {
                let embeddable = self.metamodel.embeddable(embedded.embeddable);

                match value {
                    Value::Null => AttributeValue::Value(Value::Null),
                    Value::Record(record) if record.len() == embeddable.fields.len() => {
                        let fields = record
                            .into_vec()
                            .into_iter()
                            .zip(&embeddable.fields)
                            .map(|(value, field)| field.ty.cast(value))
                            .collect::<Result<Vec<_>>>()?;
                        AttributeValue::Value(Value::record_from_vec(fields))
                    }
                    value => {
                        return Err(Error::invalid_statement(format!(
                            "`{}` expects a record of {} fields; got {value:?}",
                            attribute.role,
                            embeddable.fields.len()
                        )))
                    }
                }
            }
            (AttributeTy::ToOne(to_one), AttributeValue::Reference(target)) => {
                if let Some(target) = &target {
                    if target.entity != to_one.target {
                        return Err(Error::invalid_statement(format!(
                            "`{}` references `{}`; got {}",
                            attribute.role,
                            self.metamodel.entity(to_one.target).name,
                            target.describe(self.metamodel)
                        )));
                    }
                }
                AttributeValue::Reference(target)
            }
            (AttributeTy::Plural(plural), AttributeValue::Collection(collection)) => {
                let elements = collection
                    .elements
                    .into_iter()
                    .map(|element| self.check_element(attribute, plural, element))
                    .collect::<Result<Vec<_>>>()?;

                AttributeValue::Collection(PersistentCollection {
                    initialized: collection.initialized,
                    elements,
                })
            }
            (_, value) => {
                return Err(Error::invalid_statement(format!(
                    "`{}` cannot hold {value:?}",
                    attribute.role
                )))
            }
        };

        let is_null = matches!(
            &value,
            AttributeValue::Value(Value::Null) | AttributeValue::Reference(None)
        );

        if is_null && !attribute.nullable {
            return Err(Error::invalid_statement(format!(
                "`{}` is not nullable",
                attribute.role
            )));
        }

        Ok(value)
    }

    fn check_element(
        &self,
        attribute: &Attribute,
        plural: &PluralAttribute,
        element: Element,
    ) -> Result<Element> {
        match (&plural.element, element) {
            (CollectionElement::Basic { ty, .. }, Element::Value(value)) if !value.is_null() => {
                Ok(Element::Value(ty.cast(value)?))
            }
            (CollectionElement::Entity { target }, Element::Entity(key))
                if key.entity == *target =>
            {
                Ok(Element::Entity(key))
            }
            (_, element) => Err(Error::invalid_statement(format!(
                "collection `{}` cannot hold {element:?}",
                attribute.role
            ))),
        }
    }

    /// The writes persisting a new entity. Without `id` the identifier is
    /// generated by the database and read back from the primary insert.
    pub(crate) fn insert(
        &self,
        entity: &EntityType,
        id: Option<&Value>,
        values: &[AttributeValue],
        version: Option<i64>,
    ) -> Result<MutationGroup> {
        let metamodel = self.metamodel;
        let mut group = MutationGroup::new(MutationKind::Insert, entity.id);
        let mut columns = self.columns_by_table(entity, values)?;

        let id_column = metamodel.column(entity.identifier.column);
        let mut primary = vec![];
        let mut returning = None;

        match (entity.identifier.generation, id) {
            (Generation::Assigned, Some(id)) => {
                primary.push(self.bind(entity.identifier.column, id.clone(), None)?);
            }
            (Generation::Identity, None) => {
                if !self.capability.returning {
                    return Err(Error::not_yet_implemented(format!(
                        "database-generated identifiers of `{}` without `RETURNING` support",
                        entity.name
                    )));
                }

                returning = Some(ColumnReference {
                    qualifier: None,
                    column: id_column.name.clone(),
                    ty: id_column.ty.clone(),
                });
            }
            (Generation::Assigned, None) => {
                return Err(Error::invalid_statement(format!(
                    "entity `{}` requires an assigned identifier",
                    entity.name
                )))
            }
            (Generation::Identity, Some(_)) => {
                return Err(Error::invalid_statement(format!(
                    "the identifier of `{}` is generated by the database",
                    entity.name
                )))
            }
        }

        if let Some(discriminator) = &entity.discriminator {
            primary.push(self.bind(discriminator.column, discriminator.value.clone(), None)?);
        }

        if let Some(tenant_id) = &entity.tenant_id {
            primary.push(self.bind(tenant_id.column, Value::from(self.tenant(entity)?), None)?);
        }

        if let (Some(column), Some(version)) = (&entity.version, version) {
            primary.push(self.bind(column.column, Value::I64(version), None)?);
        }

        primary.extend(columns.shift_remove(&entity.table).unwrap_or_default());

        group.add_table_mutation(TableMutation::Insert(TableInsert {
            table_name: metamodel.table(entity.table).name.clone(),
            values: primary,
            returning,
            expectation: Expectation::RowCount(1),
        }));

        for secondary in &entity.secondary_tables {
            let bindings = columns.shift_remove(&secondary.table).unwrap_or_default();

            if secondary.optional && bindings.iter().all(is_null_binding) {
                continue;
            }

            group.add_table_mutation(self.secondary_insert(entity, secondary, id, bindings)?);
        }

        for attribute in entity.plural_attributes() {
            let plural = attribute.expect_plural();

            if let AttributeValue::Collection(collection) = &values[attribute.id.index] {
                self.insert_elements(&mut group, entity, attribute, plural, id, &collection.elements)?;
            }
        }

        Ok(group)
    }

    /// The writes synchronizing a managed entity with its changed state.
    pub(crate) fn update(
        &self,
        entity: &EntityType,
        key: &EntityKey,
        state: &EntityState,
    ) -> Result<MutationGroup> {
        let metamodel = self.metamodel;
        let mut group = MutationGroup::new(MutationKind::Update, entity.id);

        let mut dirty: IndexMap<TableId, Vec<ColumnValueBinding>> = IndexMap::new();
        let mut before: IndexMap<TableId, Vec<ColumnValueBinding>> = IndexMap::new();

        for attribute in entity.singular_attributes() {
            let index = attribute.id.index;

            if state.values[index] == state.snapshot[index] {
                continue;
            }

            for (table, binding) in self.attribute_bindings(attribute, &state.values[index])? {
                dirty.entry(table).or_default().push(binding);
            }

            for (table, binding) in self.attribute_bindings(attribute, &state.snapshot[index])? {
                before.entry(table).or_default().push(binding);
            }
        }

        let mut primary = dirty.shift_remove(&entity.table).unwrap_or_default();

        if let (Some(column), Some(version)) = (&entity.version, state.version) {
            primary.push(self.bind(column.column, Value::I64(version + 1), None)?);
        }

        if !primary.is_empty() {
            let mut restrictions = vec![self.bind(entity.identifier.column, key.id.clone(), None)?];

            if let (Some(column), Some(version)) = (&entity.version, state.version) {
                restrictions.push(self.bind(column.column, Value::I64(version), None)?);
            }

            if let (Some(row_id), Some(value)) = (&entity.row_id, &state.row_id) {
                restrictions.push(ColumnValueBinding::new(
                    &row_id.column_name,
                    JdbcParameter::value(value.clone(), Type::I64),
                ));
            }

            group.add_table_mutation(TableMutation::Update(TableUpdate {
                table_name: metamodel.table(entity.table).name.clone(),
                values: primary,
                restrictions,
                expectation: Expectation::RowCount(1),
            }));
        }

        for secondary in &entity.secondary_tables {
            let Some(values) = dirty.shift_remove(&secondary.table) else {
                continue;
            };
            let table_name = &metamodel.table(secondary.table).name;
            let id = Some(&key.id);

            let was_null = before
                .get(&secondary.table)
                .map_or(true, |bindings| bindings.iter().all(is_null_binding));
            let is_null = values.iter().all(is_null_binding);

            // Rows of optional tables exist only while one of their columns
            // holds a value
            let mutation = match (secondary.optional, was_null, is_null) {
                (true, true, false) => self.secondary_insert(entity, secondary, id, values)?,
                (true, false, true) => TableMutation::Delete(TableDelete {
                    table_name: table_name.clone(),
                    restrictions: self.secondary_key(entity, secondary, id)?,
                    expectation: Expectation::RowCount(1),
                }),
                (true, true, true) => continue,
                _ => TableMutation::Update(TableUpdate {
                    table_name: table_name.clone(),
                    values,
                    restrictions: self.secondary_key(entity, secondary, id)?,
                    expectation: Expectation::RowCount(1),
                }),
            };

            group.add_table_mutation(mutation);
        }

        for attribute in entity.plural_attributes() {
            let index = attribute.id.index;

            if state.values[index] == state.snapshot[index] {
                continue;
            }

            let (Some(current), Some(previous)) = (
                state.values[index].as_collection(),
                state.snapshot[index].as_collection(),
            ) else {
                continue;
            };

            self.update_elements(&mut group, entity, attribute, &key.id, current, previous)?;
        }

        Ok(group)
    }

    /// The writes removing a managed entity.
    pub(crate) fn delete(
        &self,
        entity: &EntityType,
        key: &EntityKey,
        state: &EntityState,
    ) -> Result<MutationGroup> {
        let metamodel = self.metamodel;
        let mut group = MutationGroup::new(MutationKind::Delete, entity.id);

        for attribute in entity.plural_attributes() {
            let plural = attribute.expect_plural();
            let owner_key = self.collection_key(entity, plural, Some(&key.id))?;

            group.add_collection_mutation(
                attribute.id,
                self.detach_elements(plural, owner_key, Expectation::None)?,
            );
        }

        let mut restrictions = vec![self.bind(entity.identifier.column, key.id.clone(), None)?];

        if let (Some(column), Some(version)) = (&entity.version, state.version) {
            restrictions.push(self.bind(column.column, Value::I64(version), None)?);
        }

        group.add_table_mutation(TableMutation::Delete(TableDelete {
            table_name: metamodel.table(entity.table).name.clone(),
            restrictions,
            expectation: Expectation::RowCount(1),
        }));

        for secondary in &entity.secondary_tables {
            group.add_table_mutation(TableMutation::Delete(TableDelete {
                table_name: metamodel.table(secondary.table).name.clone(),
                restrictions: self.secondary_key(entity, secondary, Some(&key.id))?,
                expectation: if secondary.optional {
                    Expectation::None
                } else {
                    Expectation::RowCount(1)
                },
            }));
        }

        Ok(group)
    }

    fn secondary_insert(
        &self,
        entity: &EntityType,
        secondary: &SecondaryTable,
        id: Option<&Value>,
        values: Vec<ColumnValueBinding>,
    ) -> Result<TableMutation> {
        let mut bindings = self.secondary_key(entity, secondary, id)?;
        bindings.extend(values);

        Ok(TableMutation::Insert(TableInsert {
            table_name: self.metamodel.table(secondary.table).name.clone(),
            values: bindings,
            returning: None,
            expectation: Expectation::RowCount(1),
        }))
    }

    /// Key columns of a secondary table row, bound to the owner's identifier.
    fn secondary_key(
        &self,
        entity: &EntityType,
        secondary: &SecondaryTable,
        id: Option<&Value>,
    ) -> Result<Vec<ColumnValueBinding>> {
        secondary
            .key
            .pairs()
            .map(|(column, _)| self.identifier_binding(entity, column, id))
            .collect()
    }

    /// Binds the owner's identifier to a key column: the known identifier,
    /// or the one the primary insert generates.
    fn identifier_binding(
        &self,
        entity: &EntityType,
        column: ColumnId,
        id: Option<&Value>,
    ) -> Result<ColumnValueBinding> {
        match id {
            Some(id) => self.bind(column, id.clone(), None),
            None => {
                let column = self.metamodel.column(column);
                let ty = self.metamodel.column(entity.identifier.column).ty.clone();
                Ok(ColumnValueBinding::new(
                    &column.name,
                    JdbcParameter::generated_identifier(ty),
                ))
            }
        }
    }

    fn collection_key(
        &self,
        entity: &EntityType,
        plural: &PluralAttribute,
        id: Option<&Value>,
    ) -> Result<Vec<ColumnValueBinding>> {
        plural
            .key
            .pairs()
            .map(|(column, _)| self.identifier_binding(entity, column, id))
            .collect()
    }

    fn insert_elements(
        &self,
        group: &mut MutationGroup,
        entity: &EntityType,
        attribute: &Attribute,
        plural: &PluralAttribute,
        id: Option<&Value>,
        elements: &[Element],
    ) -> Result<()> {
        for (position, element) in elements.iter().enumerate() {
            let owner_key = self.collection_key(entity, plural, id)?;
            group.add_collection_mutation(
                attribute.id,
                self.attach_element(plural, owner_key, position, element)?,
            );
        }

        Ok(())
    }

    /// Writes one element into the collection: a collection-table row for
    /// element collections, the key of the target row for one-to-many.
    fn attach_element(
        &self,
        plural: &PluralAttribute,
        mut owner_key: Vec<ColumnValueBinding>,
        position: usize,
        element: &Element,
    ) -> Result<TableMutation> {
        let table_name = self.metamodel.table(plural.table).name.clone();

        if let Some(index) = plural.index {
            owner_key.push(self.bind(index, Value::I64(position as i64), None)?);
        }

        Ok(match (&plural.element, element) {
            (
                CollectionElement::Basic {
                    column, converter, ..
                },
                Element::Value(value),
            ) => {
                owner_key.push(self.bind(*column, value.clone(), converter.as_deref())?);

                TableMutation::Insert(TableInsert {
                    table_name,
                    values: owner_key,
                    returning: None,
                    expectation: Expectation::RowCount(1),
                })
            }
            (CollectionElement::Entity { target }, Element::Entity(key)) => {
                let target = self.metamodel.entity(*target);

                TableMutation::Update(TableUpdate {
                    table_name,
                    values: owner_key,
                    restrictions: vec![self.bind(target.identifier.column, key.id.clone(), None)?],
                    expectation: Expectation::RowCount(1),
                })
            }
            (_, element) => {
                return Err(Error::invalid_statement(format!(
                    "collection element {element:?} does not match its mapping"
                )))
            }
        })
    }

    /// Removes every element of the owner's collection: deletes the rows of
    /// an element collection, clears the key of one-to-many targets.
    fn detach_elements(
        &self,
        plural: &PluralAttribute,
        owner_key: Vec<ColumnValueBinding>,
        expectation: Expectation,
    ) -> Result<TableMutation> {
        let table_name = self.metamodel.table(plural.table).name.clone();

        Ok(match &plural.element {
            CollectionElement::Basic { .. } => TableMutation::Delete(TableDelete {
                table_name,
                restrictions: owner_key,
                expectation,
            }),
            CollectionElement::Entity { .. } => TableMutation::Update(TableUpdate {
                table_name,
                values: self.detached_key(plural)?,
                restrictions: owner_key,
                expectation,
            }),
        })
    }

    /// Null bindings for the key and index columns of a one-to-many target.
    fn detached_key(&self, plural: &PluralAttribute) -> Result<Vec<ColumnValueBinding>> {
        plural
            .key
            .pairs()
            .map(|(column, _)| column)
            .chain(plural.index)
            .map(|column| self.bind(column, Value::Null, None))
            .collect()
    }

    fn update_elements(
        &self,
        group: &mut MutationGroup,
        entity: &EntityType,
        attribute: &Attribute,
        id: &Value,
        current: &PersistentCollection,
        previous: &PersistentCollection,
    ) -> Result<()> {
        let plural = attribute.expect_plural();
        let owner_key = || self.collection_key(entity, plural, Some(id));

        match &plural.element {
            // Element collections are rewritten
            CollectionElement::Basic { .. } => {
                group.add_collection_mutation(
                    attribute.id,
                    self.detach_elements(plural, owner_key()?, Expectation::None)?,
                );
                self.insert_elements(group, entity, attribute, plural, Some(id), &current.elements)?;
            }
            CollectionElement::Entity { target } => {
                let target = self.metamodel.entity(*target);

                if previous.initialized {
                    for removed in previous
                        .elements
                        .iter()
                        .filter(|element| !current.elements.contains(element))
                    {
                        let Element::Entity(key) = removed else {
                            continue;
                        };

                        group.add_collection_mutation(
                            attribute.id,
                            TableMutation::Update(TableUpdate {
                                table_name: self.metamodel.table(plural.table).name.clone(),
                                values: self.detached_key(plural)?,
                                restrictions: vec![self.bind(
                                    target.identifier.column,
                                    key.id.clone(),
                                    None,
                                )?],
                                expectation: Expectation::RowCount(1),
                            }),
                        );
                    }
                } else {
                    group.add_collection_mutation(
                        attribute.id,
                        self.detach_elements(plural, owner_key()?, Expectation::None)?,
                    );
                }

                // Lists rewrite every position; bags and sets only attach
                // what is new
                for (position, element) in current.elements.iter().enumerate() {
                    let attached = previous.initialized && previous.elements.contains(element);

                    if attached && plural.index.is_none() {
                        continue;
                    }

                    group.add_collection_mutation(
                        attribute.id,
                        self.attach_element(plural, owner_key()?, position, element)?,
                    );
                }
            }
        }

        Ok(())
    }

    /// Column bindings of the entity's singular attributes, by table.
    fn columns_by_table(
        &self,
        entity: &EntityType,
        values: &[AttributeValue],
    ) -> Result<IndexMap<TableId, Vec<ColumnValueBinding>>> {
        let mut columns: IndexMap<TableId, Vec<ColumnValueBinding>> = IndexMap::new();

        for attribute in entity.singular_attributes() {
            for (table, binding) in self.attribute_bindings(attribute, &values[attribute.id.index])? {
                columns.entry(table).or_default().push(binding);
            }
        }

        Ok(columns)
    }

    fn attribute_bindings(
        &self,
        attribute: &Attribute,
        value: &AttributeValue,
    ) -> Result<Vec<(TableId, ColumnValueBinding)>> {
        let mut bindings = vec![];

        match (&attribute.ty, value) {
            (AttributeTy::Basic(basic), AttributeValue::Value(value)) => {
                bindings.push((
                    basic.column.table,
                    self.bind(basic.column, value.clone(), basic.converter.as_deref())?,
                ));
            }
            (AttributeTy::Embedded(embedded), AttributeValue::Value(value)) => {
                let embeddable = self.metamodel.embeddable(embedded.embeddable);
                let record = value.as_record();

                for (index, (column, field)) in
                    embedded.columns.iter().zip(&embeddable.fields).enumerate()
                {
                    let value = record
                        .and_then(|record| record.get(index))
                        .cloned()
                        .unwrap_or(Value::Null);

                    bindings.push((
                        column.table,
                        self.bind(*column, value, field.converter.as_deref())?,
                    ));
                }
            }
            (AttributeTy::ToOne(to_one), AttributeValue::Reference(target)) => {
                if to_one.foreign_key.width() != 1 {
                    return Err(Error::not_yet_implemented(format!(
                        "writing `{}`, whose foreign key spans several columns",
                        attribute.role
                    )));
                }

                let id = target.as_ref().map_or(Value::Null, |key| key.id.clone());

                for column in &to_one.foreign_key.columns {
                    bindings.push((column.table, self.bind(*column, id.clone(), None)?));
                }
            }
            (AttributeTy::Plural(_), _) => {}
            (_, value) => {
                return Err(Error::invalid_statement(format!(
                    "`{}` cannot hold {value:?}",
                    attribute.role
                )))
            }
        }

        Ok(bindings)
    }

    /// Binds a domain value to a column, in relational form.
    fn bind(
        &self,
        column: ColumnId,
        value: Value,
        converter: Option<&str>,
    ) -> Result<ColumnValueBinding> {
        let column = self.metamodel.column(column);
        let value = column.ty.cast(self.types.to_relational(converter, value)?)?;

        Ok(ColumnValueBinding::new(
            &column.name,
            JdbcParameter::value(value, column.ty.clone()),
        ))
    }

    fn tenant(&self, entity: &EntityType) -> Result<&'a str> {
        self.tenant.ok_or_else(|| {
            Error::invalid_statement(format!(
                "entity `{}` is multi-tenant; the session has no tenant identifier",
                entity.name
            ))
        })
    }
}

fn is_null_binding(binding: &ColumnValueBinding) -> bool {
    binding.value.static_value().map_or(true, Value::is_null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use orma_core::schema::Builder;
    use pretty_assertions::assert_eq;

    fn projects() -> Metamodel {
        let mut builder = Builder::new();
        builder.entity("Project", |e| {
            e.id("id", Type::I64)
                .generated_identity()
                .secondary_table("project_details", Some("project_id"))
                .optional()
                .basic("name", Type::String)
                .basic_with("description", Type::String, |b| {
                    b.table("project_details");
                });
        });
        builder.build(&TypeConfiguration::new()).unwrap()
    }

    fn insert(description: Value) -> MutationGroup {
        let metamodel = projects();
        let types = TypeConfiguration::new();
        let mutations = MutationBuilder::new(&metamodel, &types, &Capability::SQLITE, None);
        let entity = metamodel.entity_by_name("Project").unwrap();

        let supplied = IndexMap::from([
            ("name".to_string(), AttributeValue::Value(Value::from("orma"))),
            ("description".to_string(), AttributeValue::Value(description)),
        ]);
        let values = mutations.initial_values(entity, supplied).unwrap();
        mutations.insert(entity, None, &values, None).unwrap()
    }

    #[test]
    fn insert_spans_secondary_table() {
        let group = insert(Value::from("Object/relational mapping"));

        assert_eq!(group.kind, MutationKind::Insert);
        assert_eq!(group.number_of_table_mutations(), 2);
        assert!(group.get_table_mutation("Project").is_some());
        assert!(group.get_table_mutation("project_details").is_some());
        assert!(group.get_table_mutation("projects").is_none());
        assert!(group.get_table_mutation("users").is_none());

        let mut order = vec![];
        group.for_each_table_mutation(|index, mutation| {
            order.push((index, mutation.table_name().to_string()));
        });
        assert_eq!(
            order,
            [(0, "Project".to_string()), (1, "project_details".to_string())]
        );

        // The generated identifier is read back from the primary insert
        let Some(TableMutation::Insert(primary)) = group.get_table_mutation("Project") else {
            panic!("expected primary insert");
        };
        assert!(primary.returning.is_some());
    }

    #[test]
    fn optional_secondary_row_is_skipped_when_null() {
        let group = insert(Value::Null);

        assert_eq!(group.number_of_table_mutations(), 1);
        assert!(group.get_table_mutation("project_details").is_none());
        assert_eq!(group.get_single_table_mutation().table_name(), "Project");
    }
}
