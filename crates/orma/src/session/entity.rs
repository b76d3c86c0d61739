use orma_core::{
    schema::{AttributeTy, EntityId, EntityType, Metamodel},
    stmt::Value,
    Error, Result,
};

use indexmap::IndexMap;
use std::fmt;

/// Identity of a managed entity: its type and identifier value.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct EntityKey {
    pub entity: EntityId,
    pub id: Value,
}

/// State of one attribute of a managed entity.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    /// Basic attribute value, or an embedded attribute as a record. An
    /// embedded value whose fields are all null is `Null`.
    Value(Value),

    /// To-one association
    Reference(Option<EntityKey>),

    /// Collection attribute
    Collection(PersistentCollection),
}

/// A collection attribute, loaded or not.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PersistentCollection {
    pub(crate) initialized: bool,
    pub(crate) elements: Vec<Element>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Element {
    Value(Value),
    Entity(EntityKey),
}

/// An entity to persist, built attribute by attribute.
///
/// ```ignore
/// session
///     .persist(Entity::new("Issue").id(1).set("title", "Crash on start"))
///     .await?;
/// ```
#[derive(Debug, Clone)]
pub struct Entity {
    pub(crate) name: String,
    pub(crate) id: Option<Value>,
    pub(crate) values: IndexMap<String, AttributeValue>,
}

/// Read access to the state of a managed, initialized entity.
pub struct EntityView<'a> {
    entity: &'a EntityType,
    key: &'a EntityKey,
    values: &'a [AttributeValue],
    version: Option<i64>,
}

impl EntityKey {
    pub fn new(entity: EntityId, id: impl Into<Value>) -> Self {
        Self {
            entity,
            id: id.into(),
        }
    }

    pub(crate) fn describe(&self, metamodel: &Metamodel) -> String {
        format!("{}#{:?}", metamodel.entity(self.entity).name, self.id)
    }
}

impl fmt::Debug for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityKey({}, {:?})", self.entity.0, self.id)
    }
}

impl AttributeValue {
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Value(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<Option<&EntityKey>> {
        match self {
            Self::Reference(key) => Some(key.as_ref()),
            _ => None,
        }
    }

    pub fn as_collection(&self) -> Option<&PersistentCollection> {
        match self {
            Self::Collection(collection) => Some(collection),
            _ => None,
        }
    }
}

impl PersistentCollection {
    pub(crate) fn uninitialized() -> Self {
        Self::default()
    }

    pub(crate) fn initialized(elements: Vec<Element>) -> Self {
        Self {
            initialized: true,
            elements,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }
}

impl Element {
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Value(value) => Some(value),
            Self::Entity(_) => None,
        }
    }

    pub fn as_entity(&self) -> Option<&EntityKey> {
        match self {
            Self::Entity(key) => Some(key),
            Self::Value(_) => None,
        }
    }
}

impl From<Value> for Element {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<EntityKey> for Element {
    fn from(value: EntityKey) -> Self {
        Self::Entity(value)
    }
}

impl Entity {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            id: None,
            values: IndexMap::new(),
        }
    }

    /// Sets the identifier. Required unless the database generates it.
    pub fn id(mut self, id: impl Into<Value>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Sets a basic or embedded attribute.
    pub fn set(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.values
            .insert(name.to_string(), AttributeValue::Value(value.into()));
        self
    }

    pub fn reference(mut self, name: &str, target: &EntityKey) -> Self {
        self.values.insert(
            name.to_string(),
            AttributeValue::Reference(Some(target.clone())),
        );
        self
    }

    pub fn elements(mut self, name: &str, elements: Vec<Element>) -> Self {
        self.values.insert(
            name.to_string(),
            AttributeValue::Collection(PersistentCollection::initialized(elements)),
        );
        self
    }
}

impl<'a> EntityView<'a> {
    pub(crate) fn new(
        entity: &'a EntityType,
        key: &'a EntityKey,
        values: &'a [AttributeValue],
        version: Option<i64>,
    ) -> Self {
        Self {
            entity,
            key,
            values,
            version,
        }
    }

    pub fn key(&self) -> &'a EntityKey {
        self.key
    }

    pub fn id(&self) -> &'a Value {
        &self.key.id
    }

    pub fn name(&self) -> &'a str {
        &self.entity.name
    }

    pub fn version(&self) -> Option<i64> {
        self.version
    }

    /// Value of a basic or embedded attribute.
    pub fn get(&self, name: &str) -> Result<&'a Value> {
        match self.attribute(name)? {
            AttributeValue::Value(value) => Ok(value),
            _ => Err(Error::invalid_statement(format!(
                "`{}.{name}` is not a basic or embedded attribute",
                self.entity.name
            ))),
        }
    }

    /// Target of a to-one association.
    pub fn reference(&self, name: &str) -> Result<Option<&'a EntityKey>> {
        match self.attribute(name)? {
            AttributeValue::Reference(key) => Ok(key.as_ref()),
            _ => Err(Error::invalid_statement(format!(
                "`{}.{name}` is not a to-one association",
                self.entity.name
            ))),
        }
    }

    /// Elements of an initialized collection.
    pub fn collection(&self, name: &str) -> Result<&'a [Element]> {
        let collection = self.plural(name)?;

        if !collection.initialized {
            return Err(Error::invalid_statement(format!(
                "collection `{}.{name}` is not initialized",
                self.entity.name
            )));
        }

        Ok(&collection.elements)
    }

    pub fn is_collection_initialized(&self, name: &str) -> Result<bool> {
        Ok(self.plural(name)?.initialized)
    }

    fn plural(&self, name: &str) -> Result<&'a PersistentCollection> {
        match self.attribute(name)? {
            AttributeValue::Collection(collection) => Ok(collection),
            _ => Err(Error::invalid_statement(format!(
                "`{}.{name}` is not a collection",
                self.entity.name
            ))),
        }
    }

    fn attribute(&self, name: &str) -> Result<&'a AttributeValue> {
        let attribute = self.entity.attribute(name).ok_or_else(|| {
            Error::invalid_statement(format!(
                "entity `{}` has no attribute `{name}`",
                self.entity.name
            ))
        })?;

        Ok(&self.values[attribute.id.index])
    }
}

impl fmt::Debug for EntityView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct(&self.entity.name);
        s.field("id", &self.key.id);

        for (attribute, value) in self.entity.attributes.iter().zip(self.values) {
            if let AttributeTy::Plural(_) = attribute.ty {
                match value.as_collection() {
                    Some(collection) if collection.initialized => {
                        s.field(&attribute.name, &collection.elements)
                    }
                    _ => s.field(&attribute.name, &"<uninitialized>"),
                };
            } else {
                s.field(&attribute.name, value);
            }
        }

        s.finish()
    }
}
