//! Turns result rows into managed entities and result values.
//!
//! Entities are registered with the persistence context as their rows are
//! read. State already held by the context wins over what a row carries, so
//! an entity is hydrated at most once per session. Collection elements are
//! accumulated across rows and stored when the result set is finished.

use super::domain_result::{
    BasicResult, CollectionResult, DomainResult, ElementResult, EntityResult, Fetch,
};
use crate::{
    query::ResultValue,
    session::{
        AttributeValue, Element, EntityKey, EntityState, PersistenceContext, PersistentCollection,
    },
    session_factory::Shared,
    Instantiator,
};

use orma_core::{
    schema::{AttributeId, CollectionClassification, Metamodel, TypeConfiguration},
    sqm::InstantiationTarget,
    stmt::{Value, ValueRecord},
    Error, Result,
};

use indexmap::{IndexMap, IndexSet};

pub(crate) struct RowProcessingState<'a> {
    metamodel: &'a Metamodel,
    types: &'a TypeConfiguration,
    instantiators: &'a IndexMap<String, Instantiator>,
    context: &'a mut PersistenceContext,

    /// Elements per owner and attribute index. `None` when the owner's
    /// collection was already initialized and the rows are ignored.
    collections: IndexMap<(EntityKey, usize), Option<CollectionAccumulator>>,

    pending: Pending,
}

/// Loads the processed rows call for: immediate references still proxied
/// and eager collections not fetched by join.
#[derive(Debug, Default)]
pub(crate) struct Pending {
    pub(crate) references: IndexSet<EntityKey>,
    pub(crate) collections: IndexSet<(EntityKey, AttributeId)>,
}

#[derive(Debug)]
struct CollectionAccumulator {
    classification: CollectionClassification,
    entries: Vec<(Option<i64>, Element)>,
}

impl<'a> RowProcessingState<'a> {
    pub(crate) fn new(shared: &'a Shared, context: &'a mut PersistenceContext) -> Self {
        Self {
            metamodel: &shared.metamodel,
            types: &shared.type_configuration,
            instantiators: &shared.instantiators,
            context,
            collections: IndexMap::new(),
            pending: Pending::default(),
        }
    }

    /// Values of one row, one per domain result.
    pub(crate) fn row(
        &mut self,
        results: &[DomainResult],
        row: &ValueRecord,
    ) -> Result<Vec<ResultValue>> {
        results.iter().map(|result| self.result(result, row)).collect()
    }

    fn result(&mut self, result: &DomainResult, row: &ValueRecord) -> Result<ResultValue> {
        Ok(match result {
            DomainResult::Basic(basic) => ResultValue::Scalar(basic.extract(row, self.types)?),
            DomainResult::Embeddable(fields) => {
                ResultValue::Scalar(self.embedded_value(fields, row)?)
            }
            DomainResult::Entity(entity) => ResultValue::Entity(self.entity(entity, row)?),
            DomainResult::Reference { target, key } => {
                let id = key.extract(row, self.types)?;

                if id.is_null() {
                    ResultValue::Entity(None)
                } else {
                    let key = EntityKey::new(*target, id);
                    self.reference(&key, true);
                    ResultValue::Entity(Some(key))
                }
            }
            DomainResult::Instantiation(instantiation) => {
                let arguments = instantiation
                    .arguments
                    .iter()
                    .map(|argument| self.result(argument, row))
                    .collect::<Result<Vec<_>>>()?;

                match &instantiation.target {
                    InstantiationTarget::List => ResultValue::List(arguments),
                    InstantiationTarget::Map => ResultValue::Map(
                        instantiation
                            .aliases
                            .iter()
                            .zip(arguments)
                            .enumerate()
                            .map(|(position, (alias, value))| {
                                let key = match alias {
                                    Some(alias) => alias.clone(),
                                    None => position.to_string(),
                                };
                                (key, value)
                            })
                            .collect(),
                    ),
                    InstantiationTarget::Class(name) => {
                        let instantiator = self.instantiators.get(name).ok_or_else(|| {
                            Error::invalid_statement(format!("no instantiator named `{name}`"))
                        })?;

                        let values = arguments
                            .into_iter()
                            .map(ResultValue::into_scalar)
                            .collect::<Result<Vec<_>>>()?;

                        ResultValue::Instance(
                            instantiator.instantiate(&instantiation.argument_map, values)?,
                        )
                    }
                }
            }
        })
    }

    /// Resolves the entity a row carries, hydrating it when the context
    /// holds no state for it yet. A null identifier means no entity, as for
    /// the unmatched side of an outer join.
    pub(crate) fn entity(
        &mut self,
        result: &EntityResult,
        row: &ValueRecord,
    ) -> Result<Option<EntityKey>> {
        let entity = self.metamodel.entity(result.entity);
        let id = result.identifier.extract(row, self.types)?;

        if id.is_null() {
            return Ok(None);
        }

        let key = EntityKey::new(result.entity, entity.identifier.ty.cast(id)?);

        let mut values = if self.context.is_initialized(&key) {
            None
        } else {
            Some(vec![AttributeValue::Value(Value::Null); entity.attributes.len()])
        };

        for fetch in &result.fetches {
            match fetch {
                Fetch::Basic { attribute, result } => {
                    if let Some(values) = &mut values {
                        values[attribute.index] =
                            AttributeValue::Value(result.extract(row, self.types)?);
                    }
                }
                Fetch::Embedded { attribute, fields } => {
                    if let Some(values) = &mut values {
                        values[attribute.index] =
                            AttributeValue::Value(self.embedded_value(fields, row)?);
                    }
                }
                Fetch::Reference {
                    attribute,
                    target,
                    key: foreign_key,
                    immediate,
                } => {
                    if let Some(values) = &mut values {
                        let id = foreign_key.extract(row, self.types)?;

                        let reference = if id.is_null() {
                            None
                        } else {
                            let target_ty = &self.metamodel.entity(*target).identifier.ty;
                            let target = EntityKey::new(*target, target_ty.cast(id)?);
                            self.reference(&target, *immediate);
                            Some(target)
                        };

                        values[attribute.index] = AttributeValue::Reference(reference);
                    }
                }
                Fetch::JoinedEntity { attribute, result } => {
                    let target = self.entity(result, row)?;

                    if let Some(values) = &mut values {
                        values[attribute.index] = AttributeValue::Reference(target);
                    }
                }
                Fetch::JoinedCollection { attribute, result } => {
                    if let Some(values) = &mut values {
                        values[attribute.index] =
                            AttributeValue::Collection(PersistentCollection::uninitialized());
                    }

                    self.collection_row(&key, result, row)?;
                }
                Fetch::Deferred { attribute, eager } => {
                    if let Some(values) = &mut values {
                        values[attribute.index] =
                            AttributeValue::Collection(PersistentCollection::uninitialized());

                        if *eager {
                            self.pending.collections.insert((key.clone(), *attribute));
                        }
                    }
                }
            }
        }

        if let Some(values) = values {
            let version = match &result.version {
                Some(version) => version.extract(row, self.types)?.as_i64(),
                None => None,
            };

            let row_id = result
                .row_id
                .as_ref()
                .map(|row_id| row_id.raw(row).clone())
                .filter(|row_id| !row_id.is_null());

            tracing::trace!(key = ?key, "hydrated entity");
            self.context
                .initialize(key.clone(), EntityState::new(values, version, row_id));
        }

        Ok(Some(key))
    }

    /// Prepares the accumulation of a collection loaded by its own select,
    /// so an owner without elements still gets an empty collection.
    pub(crate) fn begin_collection(&mut self, owner: &EntityKey, result: &CollectionResult) {
        self.accumulator(owner, result);
    }

    /// Adds the element a row carries to the owner's collection.
    pub(crate) fn collection_row(
        &mut self,
        owner: &EntityKey,
        result: &CollectionResult,
        row: &ValueRecord,
    ) -> Result<()> {
        let index = match &result.index {
            Some(index) => index.extract(row, self.types)?.as_i64(),
            None => None,
        };

        let element = match &result.element {
            ElementResult::Basic(basic) => {
                let value = basic.extract(row, self.types)?;
                (!value.is_null()).then_some(Element::Value(value))
            }
            ElementResult::Entity(entity) => self.entity(entity, row)?.map(Element::Entity),
        };

        if let (Some(accumulator), Some(element)) = (self.accumulator(owner, result), element) {
            accumulator.add(index, element);
        }

        Ok(())
    }

    /// Stores accumulated collections and returns the loads still needed.
    pub(crate) fn finish(self) -> Pending {
        for ((owner, index), accumulator) in self.collections {
            let Some(accumulator) = accumulator else {
                continue;
            };

            if let Some(state) = self.context.state_mut(&owner) {
                let collection = PersistentCollection::initialized(accumulator.finish());
                state.snapshot[index] = AttributeValue::Collection(collection.clone());
                state.values[index] = AttributeValue::Collection(collection);
            }
        }

        let mut pending = self.pending;
        let context = &*self.context;

        pending
            .references
            .retain(|key| !context.is_initialized(key));
        pending
            .collections
            .retain(|(owner, attribute)| !is_collection_initialized(context, owner, *attribute));

        pending
    }

    fn accumulator(
        &mut self,
        owner: &EntityKey,
        result: &CollectionResult,
    ) -> Option<&mut CollectionAccumulator> {
        let context = &*self.context;

        self.collections
            .entry((owner.clone(), result.attribute.index))
            .or_insert_with(|| {
                (!is_collection_initialized(context, owner, result.attribute))
                    .then(|| CollectionAccumulator::new(result.classification))
            })
            .as_mut()
    }

    fn reference(&mut self, key: &EntityKey, immediate: bool) {
        if !self.context.contains(key) {
            self.context.register_proxy(key.clone());
        }

        if immediate && !self.context.is_initialized(key) {
            self.pending.references.insert(key.clone());
        }
    }

    /// An embedded value as a record, or null when all its fields are.
    fn embedded_value(&self, fields: &[BasicResult], row: &ValueRecord) -> Result<Value> {
        let values = fields
            .iter()
            .map(|field| field.extract(row, self.types))
            .collect::<Result<Vec<_>>>()?;

        Ok(if values.iter().all(Value::is_null) {
            Value::Null
        } else {
            Value::record_from_vec(values)
        })
    }
}

fn is_collection_initialized(
    context: &PersistenceContext,
    owner: &EntityKey,
    attribute: AttributeId,
) -> bool {
    context
        .state(owner)
        .and_then(|state| state.values[attribute.index].as_collection())
        .is_some_and(PersistentCollection::is_initialized)
}

impl Pending {
    pub(crate) fn is_empty(&self) -> bool {
        self.references.is_empty() && self.collections.is_empty()
    }

    pub(crate) fn merge(&mut self, other: Pending) {
        self.references.extend(other.references);
        self.collections.extend(other.collections);
    }
}

impl CollectionAccumulator {
    fn new(classification: CollectionClassification) -> Self {
        Self {
            classification,
            entries: vec![],
        }
    }

    /// Adds an element unless the row repeats one already seen. Rows repeat
    /// when a join multiplies them; a bag keeps repeated values since they
    /// can be genuine duplicates.
    fn add(&mut self, index: Option<i64>, element: Element) {
        let seen = match self.classification {
            CollectionClassification::List => self.entries.iter().any(|(i, _)| *i == index),
            CollectionClassification::Set => self.entries.iter().any(|(_, e)| *e == element),
            CollectionClassification::Bag => {
                matches!(element, Element::Entity(_))
                    && self.entries.iter().any(|(_, e)| *e == element)
            }
        };

        if !seen {
            self.entries.push((index, element));
        }
    }

    fn finish(mut self) -> Vec<Element> {
        if self.classification == CollectionClassification::List {
            self.entries.sort_by_key(|(index, _)| *index);
        }

        self.entries.into_iter().map(|(_, element)| element).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orma_core::schema::EntityId;
    use pretty_assertions::assert_eq;

    fn key(id: i64) -> Element {
        Element::Entity(EntityKey::new(EntityId(1), id))
    }

    #[test]
    fn list_orders_by_index_and_skips_repeated_rows() {
        let mut list = CollectionAccumulator::new(CollectionClassification::List);
        list.add(Some(1), Element::Value(Value::from("b")));
        list.add(Some(0), Element::Value(Value::from("a")));
        list.add(Some(1), Element::Value(Value::from("b")));

        assert_eq!(
            list.finish(),
            vec![Element::Value(Value::from("a")), Element::Value(Value::from("b"))]
        );
    }

    #[test]
    fn bag_keeps_duplicate_values_but_not_entities() {
        let mut bag = CollectionAccumulator::new(CollectionClassification::Bag);
        bag.add(None, Element::Value(Value::from("x")));
        bag.add(None, Element::Value(Value::from("x")));
        bag.add(None, key(1));
        bag.add(None, key(1));

        assert_eq!(bag.finish().len(), 3);
    }

    #[test]
    fn set_is_distinct() {
        let mut set = CollectionAccumulator::new(CollectionClassification::Set);
        set.add(None, Element::Value(Value::from("x")));
        set.add(None, Element::Value(Value::from("x")));

        assert_eq!(set.finish(), vec![Element::Value(Value::from("x"))]);
    }
}
