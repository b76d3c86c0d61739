use crate::stmt::Type;

use std::fmt;

/// A value type without identity whose fields are flattened into the owner's
/// table.
#[derive(Debug)]
pub struct EmbeddableType {
    pub id: EmbeddableId,
    pub name: String,
    pub fields: Vec<EmbeddableField>,
}

#[derive(Debug)]
pub struct EmbeddableField {
    pub name: String,
    pub ty: Type,
    pub converter: Option<String>,
}

#[derive(PartialEq, Eq, Clone, Copy, Hash)]
pub struct EmbeddableId(pub usize);

impl EmbeddableType {
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|field| field.name == name)
    }

    /// Record type of the embeddable's domain value.
    pub fn ty(&self) -> Type {
        Type::Record(self.fields.iter().map(|field| field.ty.clone()).collect())
    }
}

impl fmt::Debug for EmbeddableId {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "EmbeddableId({})", self.0)
    }
}
