use super::{SqmCopyContext, SqmExpr};
use crate::{
    schema::{AttributeId, EntityId, NavigablePath},
    stmt::Type,
};

use std::{fmt, sync::Arc};

/// A reference to a from-element or one of its attributes: `i.title`.
#[derive(Debug, PartialEq)]
pub struct SqmPath {
    /// From-element the path dereferences
    pub lhs: Arc<NavigablePath>,

    pub source: SqmPathSource,

    pub ty: Type,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqmPathSource {
    /// The from-element itself; compares by identifier
    Entity(EntityId),

    Identifier(EntityId),

    Version(EntityId),

    /// A basic, embedded, or to-one attribute of the from-element. To-one
    /// attributes resolve to their join column(s) without a join.
    Attribute(AttributeId),

    /// One field of an embedded attribute
    EmbeddedField(AttributeId, usize),

    /// Element of a joined collection of basic values
    CollectionElement(AttributeId),

    /// Position of a joined list
    CollectionIndex(AttributeId),
}

impl SqmPath {
    pub fn new(lhs: Arc<NavigablePath>, source: SqmPathSource, ty: Type) -> Self {
        Self { lhs, source, ty }
    }

    pub fn is_entity_valued(&self) -> bool {
        matches!(self.source, SqmPathSource::Entity(_))
    }

    /// The referenced from-element was copied with the from clause; paths
    /// never produce their own from-element copy.
    pub fn copy(&self, context: &mut SqmCopyContext) -> Self {
        Self {
            lhs: context.expect_copy(&self.lhs),
            source: self.source,
            ty: self.ty.clone(),
        }
    }
}

impl From<SqmPath> for SqmExpr {
    fn from(value: SqmPath) -> Self {
        Self::Path(value)
    }
}

impl fmt::Display for SqmPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.source {
            SqmPathSource::Entity(_) => write!(f, "{}", self.lhs),
            SqmPathSource::Identifier(_) => write!(f, "{}.{{id}}", self.lhs),
            SqmPathSource::Version(_) => write!(f, "{}.{{version}}", self.lhs),
            SqmPathSource::Attribute(attr) => write!(f, "{}.#{}", self.lhs, attr.index),
            SqmPathSource::EmbeddedField(attr, field) => {
                write!(f, "{}.#{}.#{field}", self.lhs, attr.index)
            }
            SqmPathSource::CollectionElement(_) => write!(f, "{}.{{element}}", self.lhs),
            SqmPathSource::CollectionIndex(_) => write!(f, "{}.{{index}}", self.lhs),
        }
    }
}
