use super::Predicate;
use crate::{schema::NavigablePath, stmt::JoinType};

use std::sync::Arc;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FromClause {
    pub roots: Vec<TableGroup>,
}

/// The tables of one from-element: the primary table plus the secondary
/// tables of its entity, with the table groups joined below it.
#[derive(Debug, Clone, PartialEq)]
pub struct TableGroup {
    /// Path of the from-element this group was created for
    pub path: Arc<NavigablePath>,

    pub primary: TableReference,

    /// Secondary tables, joined by primary key
    pub table_joins: Vec<TableReferenceJoin>,

    /// Table groups of joined associations and collections
    pub group_joins: Vec<TableGroupJoin>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableReference {
    pub table_name: String,

    /// Alias, unique within the statement
    pub identification_variable: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableReferenceJoin {
    pub join_type: JoinType,
    pub reference: TableReference,
    pub predicate: Predicate,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableGroupJoin {
    pub join_type: JoinType,
    pub group: TableGroup,
    pub predicate: Predicate,
}

impl FromClause {
    pub fn add_root(&mut self, group: TableGroup) {
        self.roots.push(group);
    }

    /// Visits every table group, depth first in join order.
    pub fn for_each_table_group<'a>(&'a self, mut f: impl FnMut(&'a TableGroup)) {
        fn walk<'a>(group: &'a TableGroup, f: &mut impl FnMut(&'a TableGroup)) {
            f(group);
            for join in &group.group_joins {
                walk(&join.group, f);
            }
        }

        for root in &self.roots {
            walk(root, &mut f);
        }
    }

    /// Visits every table reference in rendering order.
    pub fn for_each_table_reference<'a>(&'a self, mut f: impl FnMut(&'a TableReference)) {
        self.for_each_table_group(|group| {
            f(&group.primary);
            for join in &group.table_joins {
                f(&join.reference);
            }
        });
    }

    pub fn find_table_group(&self, path: &NavigablePath) -> Option<&TableGroup> {
        let mut found = None;
        self.for_each_table_group(|group| {
            if found.is_none() && *group.path == *path {
                found = Some(group);
            }
        });
        found
    }

    pub fn find_table_group_mut(&mut self, path: &NavigablePath) -> Option<&mut TableGroup> {
        fn walk<'a>(group: &'a mut TableGroup, path: &NavigablePath) -> Option<&'a mut TableGroup> {
            if *group.path == *path {
                return Some(group);
            }
            group
                .group_joins
                .iter_mut()
                .find_map(|join| walk(&mut join.group, path))
        }

        self.roots.iter_mut().find_map(|root| walk(root, path))
    }
}

impl TableGroup {
    pub fn new(path: Arc<NavigablePath>, primary: TableReference) -> Self {
        Self {
            path,
            primary,
            table_joins: vec![],
            group_joins: vec![],
        }
    }

    /// The reference for `table_name`: the primary table or a joined
    /// secondary table.
    pub fn table_reference(&self, table_name: &str) -> Option<&TableReference> {
        if self.primary.table_name == table_name {
            return Some(&self.primary);
        }

        self.table_joins
            .iter()
            .map(|join| &join.reference)
            .find(|reference| reference.table_name == table_name)
    }

    pub fn add_table_join(&mut self, join: TableReferenceJoin) {
        self.table_joins.push(join);
    }

    pub fn add_group_join(&mut self, join: TableGroupJoin) {
        self.group_joins.push(join);
    }
}

impl TableReference {
    pub fn new(table_name: impl Into<String>, identification_variable: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            identification_variable: identification_variable.into(),
        }
    }
}
