use super::{
    ParameterCollector, SqmCopyContext, SqmExpr, SqmParameter, SqmPath, SqmPredicate,
    SqmQuerySpec, SqmRestriction, SqmRoot,
};
use crate::Result;

use std::sync::Arc;

#[derive(Debug, PartialEq)]
pub enum SqmStatement {
    Select(SqmSelectStatement),
    Update(SqmUpdateStatement),
    Delete(SqmDeleteStatement),
}

#[derive(Debug, Default, PartialEq)]
pub struct SqmSelectStatement {
    pub query_spec: SqmQuerySpec,
}

/// `update Issue i set i.title = :title where ...`
#[derive(Debug, PartialEq)]
pub struct SqmUpdateStatement {
    pub target: SqmRoot,
    pub assignments: Vec<SqmAssignment>,
    where_clause: SqmRestriction,
}

#[derive(Debug, PartialEq)]
pub struct SqmAssignment {
    pub path: SqmPath,
    pub value: SqmExpr,
}

/// `delete from Issue i where ...`
#[derive(Debug, PartialEq)]
pub struct SqmDeleteStatement {
    pub target: SqmRoot,
    where_clause: SqmRestriction,
}

impl SqmStatement {
    /// Deep copy with a fresh copy context. Parameters of the copy are
    /// distinct from the original's but shared among the copy's occurrences.
    pub fn copy(&self) -> Self {
        let mut context = SqmCopyContext::new();
        self.copy_in(&mut context)
    }

    pub fn copy_in(&self, context: &mut SqmCopyContext) -> Self {
        match self {
            Self::Select(stmt) => Self::Select(SqmSelectStatement {
                query_spec: stmt.query_spec.copy(context),
            }),
            Self::Update(stmt) => Self::Update(stmt.copy(context)),
            Self::Delete(stmt) => Self::Delete(stmt.copy(context)),
        }
    }

    /// Distinct parameters in first-occurrence order.
    pub fn parameters(&self) -> Vec<Arc<SqmParameter>> {
        ParameterCollector::collect(self)
    }

    pub fn as_select(&self) -> Option<&SqmSelectStatement> {
        match self {
            Self::Select(stmt) => Some(stmt),
            _ => None,
        }
    }

    pub fn is_select(&self) -> bool {
        matches!(self, Self::Select(_))
    }
}

impl SqmSelectStatement {
    pub fn new(query_spec: SqmQuerySpec) -> Self {
        Self { query_spec }
    }
}

impl SqmUpdateStatement {
    pub fn new(target: SqmRoot) -> Self {
        Self {
            target,
            assignments: vec![],
            where_clause: SqmRestriction::default(),
        }
    }

    pub fn add_assignment(&mut self, path: SqmPath, value: SqmExpr) {
        self.assignments.push(SqmAssignment { path, value });
    }

    pub fn where_clause(&self) -> Option<&SqmPredicate> {
        self.where_clause.predicate()
    }

    pub fn set_where_clause_restrictions(&mut self, predicate: SqmPredicate) -> Result<()> {
        self.where_clause.set("where", predicate)
    }

    pub fn add_restriction(&mut self, predicate: SqmPredicate) {
        self.where_clause.add(predicate);
    }

    fn copy(&self, context: &mut SqmCopyContext) -> Self {
        let target = self.target.copy(context);

        Self {
            target,
            assignments: self
                .assignments
                .iter()
                .map(|assignment| SqmAssignment {
                    path: assignment.path.copy(context),
                    value: assignment.value.copy(context),
                })
                .collect(),
            where_clause: self.where_clause.copy(context),
        }
    }
}

impl SqmDeleteStatement {
    pub fn new(target: SqmRoot) -> Self {
        Self {
            target,
            where_clause: SqmRestriction::default(),
        }
    }

    pub fn where_clause(&self) -> Option<&SqmPredicate> {
        self.where_clause.predicate()
    }

    pub fn set_where_clause_restrictions(&mut self, predicate: SqmPredicate) -> Result<()> {
        self.where_clause.set("where", predicate)
    }

    pub fn add_restriction(&mut self, predicate: SqmPredicate) {
        self.where_clause.add(predicate);
    }

    fn copy(&self, context: &mut SqmCopyContext) -> Self {
        let target = self.target.copy(context);

        Self {
            target,
            where_clause: self.where_clause.copy(context),
        }
    }
}

impl From<SqmSelectStatement> for SqmStatement {
    fn from(value: SqmSelectStatement) -> Self {
        Self::Select(value)
    }
}

impl From<SqmUpdateStatement> for SqmStatement {
    fn from(value: SqmUpdateStatement) -> Self {
        Self::Update(value)
    }
}

impl From<SqmDeleteStatement> for SqmStatement {
    fn from(value: SqmDeleteStatement) -> Self {
        Self::Delete(value)
    }
}
