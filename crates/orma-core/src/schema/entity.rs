use super::{Attribute, AttributeTy, ColumnId, ForeignKey, NavigableRole, TableId};
use crate::stmt::{Type, Value};

use std::fmt;

/// A mapped entity: a type with identity persisted to one or more tables.
#[derive(Debug)]
pub struct EntityType {
    /// Uniquely identifies the entity
    pub id: EntityId,

    /// Name used in queries and roles
    pub name: String,

    /// Navigable role of the entity (its name)
    pub role: NavigableRole,

    /// Primary table; holds the identifier and all columns without an explicit table
    pub table: TableId,

    /// Secondary tables joined to the primary table by primary key
    pub secondary_tables: Vec<SecondaryTable>,

    pub identifier: Identifier,

    pub discriminator: Option<Discriminator>,

    pub tenant_id: Option<TenantId>,

    pub version: Option<Version>,

    pub row_id: Option<RowId>,

    /// Singular and plural attributes in declaration order
    pub attributes: Vec<Attribute>,
}

#[derive(PartialEq, Eq, Clone, Copy, Hash, PartialOrd, Ord)]
pub struct EntityId(pub usize);

#[derive(Debug)]
pub struct SecondaryTable {
    pub table: TableId,

    /// Key columns on the secondary table referencing the primary table's key
    pub key: ForeignKey,

    /// When true, the row is only inserted if one of its columns is non-null
    pub optional: bool,
}

#[derive(Debug)]
pub struct Identifier {
    pub name: String,
    pub role: NavigableRole,
    pub column: ColumnId,
    pub ty: Type,
    pub generation: Generation,
}

/// How identifier values are produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Generation {
    /// The application assigns the identifier before persisting
    #[default]
    Assigned,

    /// The database generates the identifier on insert
    Identity,
}

/// Restricts an entity to rows carrying a fixed column value.
#[derive(Debug)]
pub struct Discriminator {
    pub role: NavigableRole,
    pub column: ColumnId,
    pub value: Value,
}

/// Column holding the session's tenant identifier.
#[derive(Debug)]
pub struct TenantId {
    pub role: NavigableRole,
    pub column: ColumnId,
}

/// Optimistic lock version. Always an integer.
#[derive(Debug)]
pub struct Version {
    pub name: String,
    pub role: NavigableRole,
    pub column: ColumnId,
}

/// Database-provided physical row locator (e.g. SQLite `rowid`).
///
/// The column is not part of the table's declared columns; it is selected with
/// the entity and used to restrict updates of the primary table.
#[derive(Debug)]
pub struct RowId {
    pub role: NavigableRole,
    pub column_name: String,
}

impl EntityType {
    /// Every table the entity writes to, primary first.
    pub fn tables(&self) -> impl Iterator<Item = TableId> + '_ {
        std::iter::once(self.table).chain(self.secondary_tables.iter().map(|st| st.table))
    }

    pub fn secondary_table(&self, table: TableId) -> Option<&SecondaryTable> {
        self.secondary_tables.iter().find(|st| st.table == table)
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|attr| attr.name == name)
    }

    pub fn singular_attributes(&self) -> impl Iterator<Item = &Attribute> + '_ {
        self.attributes.iter().filter(|attr| !attr.is_plural())
    }

    pub fn plural_attributes(&self) -> impl Iterator<Item = &Attribute> + '_ {
        self.attributes.iter().filter(|attr| attr.is_plural())
    }

    /// Attributes whose value is read from the entity's own tables.
    pub fn column_attributes(&self) -> impl Iterator<Item = &Attribute> + '_ {
        self.attributes.iter().filter(|attr| {
            matches!(
                attr.ty,
                AttributeTy::Basic(_) | AttributeTy::Embedded(_) | AttributeTy::ToOne(_)
            )
        })
    }

    pub fn is_versioned(&self) -> bool {
        self.version.is_some()
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "EntityId({})", self.0)
    }
}
