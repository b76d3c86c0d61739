use super::{
    Attribute, CollectionElement, Discriminator, EntityType, ForeignKey, Identifier,
    PluralAttribute, RowId, TenantId, Version,
};

use std::{fmt, sync::Arc};

/// Any addressable part of the metamodel.
///
/// The set of kinds is closed so visitors and translators match exhaustively.
#[derive(Debug, Clone, Copy)]
pub enum Navigable<'a> {
    Entity(&'a EntityType),
    Identifier(&'a EntityType, &'a Identifier),
    Discriminator(&'a EntityType, &'a Discriminator),
    TenantId(&'a EntityType, &'a TenantId),
    Version(&'a EntityType, &'a Version),
    RowId(&'a EntityType, &'a RowId),

    /// A basic, embedded, or to-one attribute
    Singular(&'a Attribute),

    /// A collection attribute; its parts follow as separate navigables
    Plural(&'a Attribute, &'a PluralAttribute),
    ForeignKey(&'a Attribute, &'a ForeignKey),
    CollectionIdentifier(&'a Attribute, &'a PluralAttribute),
    CollectionIndex(&'a Attribute, &'a PluralAttribute),
    CollectionElement(&'a Attribute, &'a CollectionElement),
}

/// Stable, metamodel-unique name of a navigable, e.g. `Issue.comments.{element}`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NavigableRole(String);

/// Query-time path to a from-element or attribute reference, e.g.
/// `Issue(i).reporter(r)`.
///
/// Two joins of the same attribute with different aliases have different
/// paths. Equality and hashing use the full path.
#[derive(Clone)]
pub struct NavigablePath {
    parent: Option<Arc<NavigablePath>>,
    local_name: String,
    alias: Option<String>,
    full: String,
}

impl Navigable<'_> {
    pub fn role(&self) -> NavigableRole {
        match self {
            Self::Entity(entity) => entity.role.clone(),
            Self::Identifier(_, identifier) => identifier.role.clone(),
            Self::Discriminator(_, discriminator) => discriminator.role.clone(),
            Self::TenantId(_, tenant_id) => tenant_id.role.clone(),
            Self::Version(_, version) => version.role.clone(),
            Self::RowId(_, row_id) => row_id.role.clone(),
            Self::Singular(attribute) | Self::Plural(attribute, _) => attribute.role.clone(),
            Self::ForeignKey(attribute, _) => attribute.role.append("{key}"),
            Self::CollectionIdentifier(attribute, _) => attribute.role.append("{collection-id}"),
            Self::CollectionIndex(attribute, _) => attribute.role.append("{index}"),
            Self::CollectionElement(attribute, _) => attribute.role.append("{element}"),
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Entity(_) => "entity",
            Self::Identifier(..) => "identifier",
            Self::Discriminator(..) => "discriminator",
            Self::TenantId(..) => "tenant-id",
            Self::Version(..) => "version",
            Self::RowId(..) => "row-id",
            Self::Singular(_) => "singular-attribute",
            Self::Plural(..) => "plural-attribute",
            Self::ForeignKey(..) => "foreign-key",
            Self::CollectionIdentifier(..) => "collection-identifier",
            Self::CollectionIndex(..) => "collection-index",
            Self::CollectionElement(..) => "collection-element",
        }
    }
}

impl NavigableRole {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn append(&self, name: &str) -> Self {
        Self(format!("{}.{name}", self.0))
    }

    pub fn full_path(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NavigableRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for NavigableRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NavigableRole({})", self.0)
    }
}

impl PartialEq<str> for NavigableRole {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for NavigableRole {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl NavigablePath {
    /// Path of a query root, `Entity(alias)`.
    pub fn root(entity: &str, alias: Option<&str>) -> Self {
        Self::build(None, entity, alias)
    }

    pub fn append(self: &Arc<Self>, local_name: &str, alias: Option<&str>) -> Self {
        Self::build(Some(self.clone()), local_name, alias)
    }

    fn build(parent: Option<Arc<NavigablePath>>, local_name: &str, alias: Option<&str>) -> Self {
        let mut full = match &parent {
            Some(parent) => format!("{}.{local_name}", parent.full),
            None => local_name.to_string(),
        };

        if let Some(alias) = alias {
            full.push('(');
            full.push_str(alias);
            full.push(')');
        }

        Self {
            parent,
            local_name: local_name.to_string(),
            alias: alias.map(str::to_string),
            full,
        }
    }

    pub fn parent(&self) -> Option<&Arc<NavigablePath>> {
        self.parent.as_ref()
    }

    pub fn local_name(&self) -> &str {
        &self.local_name
    }

    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    pub fn full_path(&self) -> &str {
        &self.full
    }

    pub fn is_parent_or_equal(&self, other: &NavigablePath) -> bool {
        let mut current = Some(other);
        while let Some(path) = current {
            if path == self {
                return true;
            }
            current = path.parent.as_deref();
        }
        false
    }
}

impl PartialEq for NavigablePath {
    fn eq(&self, other: &Self) -> bool {
        self.full == other.full
    }
}

impl Eq for NavigablePath {}

impl std::hash::Hash for NavigablePath {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.full.hash(state);
    }
}

impl fmt::Display for NavigablePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full)
    }
}

impl fmt::Debug for NavigablePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NavigablePath({})", self.full)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_rendering() {
        let root = Arc::new(NavigablePath::root("Issue", Some("i")));
        let reporter = Arc::new(root.append("reporter", Some("r")));
        let name = reporter.append("name", None);

        assert_eq!(root.full_path(), "Issue(i)");
        assert_eq!(reporter.full_path(), "Issue(i).reporter(r)");
        assert_eq!(name.full_path(), "Issue(i).reporter(r).name");
        assert_eq!(name.parent().unwrap().as_ref(), reporter.as_ref());
        assert!(root.is_parent_or_equal(&name));
        assert!(!reporter.is_parent_or_equal(&root));
    }

    #[test]
    fn same_attribute_different_alias() {
        let root = Arc::new(NavigablePath::root("Issue", Some("i")));
        assert_ne!(
            root.append("reporter", Some("a")),
            root.append("reporter", Some("b"))
        );
    }
}
