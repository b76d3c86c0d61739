use super::{SqmCopyContext, SqmPredicate};
use crate::{
    schema::{AttributeId, EntityId, NavigablePath},
    stmt::JoinType,
    Error, Result,
};

use std::sync::Arc;

/// The from clause: one or more roots, each with a tree of joins.
#[derive(Debug, Default, PartialEq)]
pub struct SqmFromClause {
    pub roots: Vec<SqmRoot>,
}

/// A query root: `from Issue i`.
#[derive(Debug, PartialEq)]
pub struct SqmRoot {
    pub entity: EntityId,
    pub alias: Option<String>,

    /// Shared with every path that references this root
    pub path: Arc<NavigablePath>,

    pub joins: Vec<SqmJoin>,
}

/// An attribute join: `join i.reporter r`.
#[derive(Debug, PartialEq)]
pub struct SqmJoin {
    /// Joined association or collection attribute of the parent from-element
    pub attribute: AttributeId,

    /// Entity reached through the join; `None` for collections of basic values
    pub target: Option<EntityId>,

    pub alias: Option<String>,

    pub path: Arc<NavigablePath>,

    pub join_type: JoinType,

    /// The joined state is assembled into the parent entity's result
    pub fetch: bool,

    /// Created by dereferencing a path rather than declared in the query
    pub implicit: bool,

    /// Additional join restriction (`with` / `on`)
    pub on: Option<SqmPredicate>,

    pub joins: Vec<SqmJoin>,
}

/// Borrowed view of a root or join.
#[derive(Debug, Clone, Copy)]
pub enum SqmFrom<'a> {
    Root(&'a SqmRoot),
    Join(&'a SqmJoin),
}

impl SqmFromClause {
    pub fn add_root(&mut self, root: SqmRoot) -> Result<()> {
        if let Some(alias) = &root.alias {
            self.check_alias(alias)?;
        }
        self.roots.push(root);
        Ok(())
    }

    /// Fails if `alias` is already used by a from-element of this clause.
    pub fn check_alias(&self, alias: &str) -> Result<()> {
        let mut used = false;
        self.for_each(|from| used |= from.alias() == Some(alias));

        if used {
            return Err(Error::invalid_statement(format!(
                "alias `{alias}` used for multiple from-clause elements"
            )));
        }
        Ok(())
    }

    /// Finds the from-element registered under `path`.
    pub fn find(&self, path: &NavigablePath) -> Option<SqmFrom<'_>> {
        self.roots.iter().find_map(|root| root.find(path))
    }

    pub fn find_by_alias(&self, alias: &str) -> Option<SqmFrom<'_>> {
        let mut found = None;
        self.for_each(|from| {
            if found.is_none() && from.alias() == Some(alias) {
                found = Some(from);
            }
        });
        found
    }

    /// Finds the join whose path is `path` and returns it mutably.
    pub fn find_join_mut(&mut self, path: &NavigablePath) -> Option<&mut SqmJoin> {
        self.roots
            .iter_mut()
            .find_map(|root| find_join_mut(&mut root.joins, path))
    }

    /// Mutable join list of the from-element at `path`.
    pub fn joins_mut(&mut self, path: &NavigablePath) -> Option<&mut Vec<SqmJoin>> {
        if let Some(index) = self.roots.iter().position(|root| *root.path == *path) {
            return Some(&mut self.roots[index].joins);
        }
        self.find_join_mut(path).map(|join| &mut join.joins)
    }

    /// Visits every root and join, depth first in declaration order.
    pub fn for_each<'a>(&'a self, mut f: impl FnMut(SqmFrom<'a>)) {
        fn walk<'a>(joins: &'a [SqmJoin], f: &mut impl FnMut(SqmFrom<'a>)) {
            for join in joins {
                f(SqmFrom::Join(join));
                walk(&join.joins, f);
            }
        }

        for root in &self.roots {
            f(SqmFrom::Root(root));
            walk(&root.joins, &mut f);
        }
    }

    pub fn copy(&self, context: &mut SqmCopyContext) -> Self {
        Self {
            roots: self.roots.iter().map(|root| root.copy(context)).collect(),
        }
    }
}

impl SqmRoot {
    pub fn new(entity: EntityId, entity_name: &str, alias: Option<&str>) -> Self {
        Self {
            entity,
            alias: alias.map(str::to_string),
            path: Arc::new(NavigablePath::root(entity_name, alias)),
            joins: vec![],
        }
    }

    fn find(&self, path: &NavigablePath) -> Option<SqmFrom<'_>> {
        if *self.path == *path {
            return Some(SqmFrom::Root(self));
        }
        find_join(&self.joins, path).map(SqmFrom::Join)
    }

    pub fn copy(&self, context: &mut SqmCopyContext) -> Self {
        Self {
            entity: self.entity,
            alias: self.alias.clone(),
            path: context.copy(&self.path, |_| (*self.path).clone()),
            joins: self.joins.iter().map(|join| join.copy(context)).collect(),
        }
    }
}

impl SqmJoin {
    pub fn copy(&self, context: &mut SqmCopyContext) -> Self {
        // Register this join's path before its restriction references it
        let path = context.copy(&self.path, |_| (*self.path).clone());

        Self {
            attribute: self.attribute,
            target: self.target,
            alias: self.alias.clone(),
            path,
            join_type: self.join_type,
            fetch: self.fetch,
            implicit: self.implicit,
            on: self.on.as_ref().map(|on| on.copy(context)),
            joins: self.joins.iter().map(|join| join.copy(context)).collect(),
        }
    }
}

impl<'a> SqmFrom<'a> {
    pub fn path(&self) -> &'a Arc<NavigablePath> {
        match self {
            Self::Root(root) => &root.path,
            Self::Join(join) => &join.path,
        }
    }

    pub fn alias(&self) -> Option<&'a str> {
        match self {
            Self::Root(root) => root.alias.as_deref(),
            Self::Join(join) => join.alias.as_deref(),
        }
    }

    /// Entity reached at this from-element, if any.
    pub fn entity(&self) -> Option<EntityId> {
        match self {
            Self::Root(root) => Some(root.entity),
            Self::Join(join) => join.target,
        }
    }

    pub fn joins(&self) -> &'a [SqmJoin] {
        match self {
            Self::Root(root) => &root.joins,
            Self::Join(join) => &join.joins,
        }
    }
}

fn find_join<'a>(joins: &'a [SqmJoin], path: &NavigablePath) -> Option<&'a SqmJoin> {
    for join in joins {
        if *join.path == *path {
            return Some(join);
        }
        if let Some(found) = find_join(&join.joins, path) {
            return Some(found);
        }
    }
    None
}

fn find_join_mut<'a>(joins: &'a mut [SqmJoin], path: &NavigablePath) -> Option<&'a mut SqmJoin> {
    for join in joins {
        if *join.path == *path {
            return Some(join);
        }
        if let Some(found) = find_join_mut(&mut join.joins, path) {
            return Some(found);
        }
    }
    None
}
