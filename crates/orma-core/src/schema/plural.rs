use super::{ColumnId, EntityId, FetchStyle, FetchTiming, ForeignKey, TableId};
use crate::stmt::Type;

/// A collection-valued attribute.
///
/// One-to-many collections live on the target entity's table; element
/// collections own a dedicated collection table.
#[derive(Debug)]
pub struct PluralAttribute {
    pub classification: CollectionClassification,

    /// Table holding the collection rows
    pub table: TableId,

    /// Key columns on the collection table referencing the owner's identifier
    pub key: ForeignKey,

    /// Surrogate row identifier of the collection table (id bags)
    pub collection_id: Option<ColumnId>,

    /// Position column of indexed (list) collections
    pub index: Option<ColumnId>,

    pub element: CollectionElement,

    pub fetch: FetchStyle,

    pub timing: FetchTiming,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionClassification {
    /// Unordered, duplicates allowed
    Bag,

    /// Ordered by an index column
    List,

    /// Unordered, no duplicates
    Set,
}

#[derive(Debug)]
pub enum CollectionElement {
    Basic {
        column: ColumnId,
        ty: Type,
        converter: Option<String>,
    },
    Entity {
        target: EntityId,
    },
}

impl PluralAttribute {
    pub fn is_element_collection(&self) -> bool {
        matches!(self.element, CollectionElement::Basic { .. })
    }

    pub fn is_indexed(&self) -> bool {
        self.classification == CollectionClassification::List
    }
}

impl CollectionElement {
    pub fn as_entity(&self) -> Option<EntityId> {
        match self {
            Self::Entity { target } => Some(*target),
            Self::Basic { .. } => None,
        }
    }
}
