use super::{ColumnId, EmbeddableId, EntityId, ForeignKey, NavigableRole, PluralAttribute};
use crate::stmt::Type;

use std::fmt;

#[derive(Debug)]
pub struct Attribute {
    /// Uniquely identifies the attribute within the metamodel
    pub id: AttributeId,

    /// Attribute name, unique within its entity
    pub name: String,

    pub role: NavigableRole,

    pub ty: AttributeTy,

    /// True if the attribute may hold no value
    pub nullable: bool,
}

#[derive(PartialEq, Eq, Clone, Copy, Hash, PartialOrd, Ord)]
pub struct AttributeId {
    pub entity: EntityId,
    pub index: usize,
}

#[derive(Debug)]
pub enum AttributeTy {
    /// A single column holding a scalar value
    Basic(BasicAttribute),

    /// An embeddable flattened into one column per field
    Embedded(EmbeddedAttribute),

    /// A many-to-one or one-to-one association owning its join column(s)
    ToOne(ToOne),

    /// A collection of entities or basic values
    Plural(PluralAttribute),
}

#[derive(Debug)]
pub struct BasicAttribute {
    pub column: ColumnId,

    /// Domain type of the attribute
    pub ty: Type,

    /// Name of the attribute converter registered with the type configuration
    pub converter: Option<String>,
}

#[derive(Debug)]
pub struct EmbeddedAttribute {
    pub embeddable: EmbeddableId,

    /// One column per embeddable field, in field order
    pub columns: Vec<ColumnId>,
}

#[derive(Debug)]
pub struct ToOne {
    pub target: EntityId,

    /// Join columns on the owner's table referencing the target's identifier
    pub foreign_key: ForeignKey,

    pub fetch: FetchStyle,

    pub timing: FetchTiming,
}

/// How an association's state is retrieved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchStyle {
    /// Join the association's table into the owner's select
    #[default]
    Join,

    /// Issue a separate select for the association
    Select,
}

/// When an association's state is retrieved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchTiming {
    /// Loaded together with the owner
    #[default]
    Immediate,

    /// Loaded on first access
    Delayed,
}

impl Attribute {
    pub fn is_plural(&self) -> bool {
        matches!(self.ty, AttributeTy::Plural(_))
    }

    pub fn is_to_one(&self) -> bool {
        matches!(self.ty, AttributeTy::ToOne(_))
    }

    pub fn as_basic(&self) -> Option<&BasicAttribute> {
        match &self.ty {
            AttributeTy::Basic(basic) => Some(basic),
            _ => None,
        }
    }

    pub fn as_embedded(&self) -> Option<&EmbeddedAttribute> {
        match &self.ty {
            AttributeTy::Embedded(embedded) => Some(embedded),
            _ => None,
        }
    }

    pub fn as_to_one(&self) -> Option<&ToOne> {
        match &self.ty {
            AttributeTy::ToOne(to_one) => Some(to_one),
            _ => None,
        }
    }

    pub fn as_plural(&self) -> Option<&PluralAttribute> {
        match &self.ty {
            AttributeTy::Plural(plural) => Some(plural),
            _ => None,
        }
    }

    #[track_caller]
    pub fn expect_plural(&self) -> &PluralAttribute {
        match &self.ty {
            AttributeTy::Plural(plural) => plural,
            _ => panic!("expected plural attribute; actual={}", self.role),
        }
    }

    /// Columns read from the owner's tables for this attribute.
    pub fn columns(&self) -> &[ColumnId] {
        match &self.ty {
            AttributeTy::Basic(basic) => std::slice::from_ref(&basic.column),
            AttributeTy::Embedded(embedded) => &embedded.columns,
            AttributeTy::ToOne(to_one) => &to_one.foreign_key.columns,
            AttributeTy::Plural(_) => &[],
        }
    }

    /// True if the attribute is loaded lazily through a proxy.
    pub fn is_delayed(&self) -> bool {
        match &self.ty {
            AttributeTy::ToOne(to_one) => {
                to_one.fetch == FetchStyle::Select && to_one.timing == FetchTiming::Delayed
            }
            AttributeTy::Plural(plural) => plural.timing == FetchTiming::Delayed,
            _ => false,
        }
    }
}

impl fmt::Debug for AttributeId {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "AttributeId({}/{})", self.entity.0, self.index)
    }
}
