use super::{SqmCopyContext, SqmExpr, SqmPredicate};
use crate::{
    schema::NavigablePath,
    stmt::{Direction, NullPrecedence, Type},
    Error, Result,
};

use std::sync::Arc;

/// A singleton restriction (`where` or `having`).
///
/// The first direct `set` wins; a second `set` fails. Later predicates are
/// added with [`add_restriction`](Self::add_restriction), which conjoins.
#[derive(Debug, Default, PartialEq)]
pub struct SqmRestriction {
    predicate: Option<SqmPredicate>,
}

#[derive(Debug, Default, PartialEq)]
pub struct SqmSelectClause {
    pub distinct: bool,
    pub selections: Vec<SqmSelection>,
}

#[derive(Debug, PartialEq)]
pub struct SqmSelection {
    pub node: SqmSelectableNode,
    pub alias: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum SqmSelectableNode {
    Expr(SqmExpr),

    /// A from-element selected as an entity: `select i`
    Entity(Arc<NavigablePath>),

    /// `new Name(...)`, `new list(...)`, `new map(...)`
    DynamicInstantiation(SqmDynamicInstantiation),
}

#[derive(Debug, PartialEq)]
pub struct SqmDynamicInstantiation {
    pub target: InstantiationTarget,
    pub arguments: Vec<SqmSelection>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstantiationTarget {
    /// A type registered with the session factory's instantiators
    Class(String),
    List,
    Map,
}

#[derive(Debug, PartialEq)]
pub struct SqmSortSpecification {
    pub expr: SqmExpr,
    pub direction: Direction,
    pub nulls: Option<NullPrecedence>,
}

impl SqmRestriction {
    pub fn predicate(&self) -> Option<&SqmPredicate> {
        self.predicate.as_ref()
    }

    pub fn is_set(&self) -> bool {
        self.predicate.is_some()
    }

    /// Sets the restriction. Fails if it was already set.
    pub fn set(&mut self, clause: &str, predicate: SqmPredicate) -> Result<()> {
        if self.predicate.is_some() {
            return Err(Error::invalid_statement(format!(
                "{clause} clause restriction already set; use add_restriction to conjoin"
            )));
        }
        self.predicate = Some(predicate);
        Ok(())
    }

    /// Conjoins `predicate` with the existing restriction, if any.
    pub fn add(&mut self, predicate: SqmPredicate) {
        self.predicate = Some(match self.predicate.take() {
            Some(existing) => SqmPredicate::and(existing, predicate),
            None => predicate,
        });
    }

    pub fn copy(&self, context: &mut SqmCopyContext) -> Self {
        Self {
            predicate: self.predicate.as_ref().map(|p| p.copy(context)),
        }
    }
}

impl SqmSelectClause {
    /// Appends a selection, rejecting an alias already used in this clause.
    pub fn add_selection(&mut self, selection: SqmSelection) -> Result<()> {
        if let Some(alias) = &selection.alias {
            if self.selection_by_alias(alias).is_some() {
                return Err(duplicate_alias(alias));
            }
        }
        self.selections.push(selection);
        Ok(())
    }

    pub fn selection_by_alias(&self, alias: &str) -> Option<&SqmSelection> {
        self.selections
            .iter()
            .find(|selection| selection.alias.as_deref() == Some(alias))
    }

    pub fn copy(&self, context: &mut SqmCopyContext) -> Self {
        Self {
            distinct: self.distinct,
            selections: self
                .selections
                .iter()
                .map(|selection| selection.copy(context))
                .collect(),
        }
    }
}

impl SqmSelection {
    pub fn new(node: SqmSelectableNode, alias: Option<String>) -> Self {
        Self { node, alias }
    }

    pub fn copy(&self, context: &mut SqmCopyContext) -> Self {
        Self {
            node: self.node.copy(context),
            alias: self.alias.clone(),
        }
    }
}

impl SqmSelectableNode {
    pub fn ty(&self) -> Type {
        match self {
            Self::Expr(expr) => expr.ty(),
            Self::Entity(_) | Self::DynamicInstantiation(_) => Type::Unknown,
        }
    }

    pub fn copy(&self, context: &mut SqmCopyContext) -> Self {
        match self {
            Self::Expr(expr) => Self::Expr(expr.copy(context)),
            Self::Entity(path) => Self::Entity(context.expect_copy(path)),
            Self::DynamicInstantiation(instantiation) => {
                Self::DynamicInstantiation(SqmDynamicInstantiation {
                    target: instantiation.target.clone(),
                    arguments: instantiation
                        .arguments
                        .iter()
                        .map(|argument| argument.copy(context))
                        .collect(),
                })
            }
        }
    }
}

impl SqmDynamicInstantiation {
    pub fn new(target: InstantiationTarget) -> Self {
        Self {
            target,
            arguments: vec![],
        }
    }

    /// Appends a constructor argument. Aliases name map keys and bean-style
    /// property assignments, so they must be unique. Unaliased map entries
    /// are keyed by position.
    pub fn add_argument(&mut self, argument: SqmSelection) -> Result<()> {
        if let Some(alias) = &argument.alias {
            if self
                .arguments
                .iter()
                .any(|existing| existing.alias.as_deref() == Some(alias))
            {
                return Err(duplicate_alias(alias));
            }
        }

        self.arguments.push(argument);
        Ok(())
    }
}

impl SqmSortSpecification {
    pub fn new(expr: SqmExpr, direction: Direction) -> Self {
        Self {
            expr,
            direction,
            nulls: None,
        }
    }

    pub fn copy(&self, context: &mut SqmCopyContext) -> Self {
        Self {
            expr: self.expr.copy(context),
            direction: self.direction,
            nulls: self.nulls,
        }
    }
}

fn duplicate_alias(alias: &str) -> Error {
    Error::invalid_statement(format!(
        "alias `{alias}` used more than once in the same compound selection"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stmt::Value;

    fn argument(value: i64, alias: Option<&str>) -> SqmSelection {
        SqmSelection::new(
            SqmSelectableNode::Expr(SqmExpr::Literal(Value::I64(value))),
            alias.map(str::to_string),
        )
    }

    #[test]
    fn map_arguments_may_be_unaliased() {
        let mut instantiation = SqmDynamicInstantiation::new(InstantiationTarget::Map);
        instantiation.add_argument(argument(1, Some("title"))).unwrap();
        instantiation.add_argument(argument(2, None)).unwrap();

        let aliases: Vec<_> = instantiation
            .arguments
            .iter()
            .map(|argument| argument.alias.as_deref())
            .collect();
        assert_eq!(aliases, [Some("title"), None]);
    }

    #[test]
    fn duplicate_argument_alias() {
        let mut instantiation = SqmDynamicInstantiation::new(InstantiationTarget::List);
        instantiation.add_argument(argument(1, Some("a"))).unwrap();

        let err = instantiation.add_argument(argument(2, Some("a"))).unwrap_err();
        assert!(err.is_invalid_statement());
    }

    #[test]
    fn duplicate_selection_alias() {
        let mut clause = SqmSelectClause::default();
        clause.add_selection(argument(1, Some("a"))).unwrap();
        clause.add_selection(argument(2, None)).unwrap();

        assert!(clause.add_selection(argument(3, Some("a"))).is_err());
        assert_eq!(clause.selections.len(), 2);
    }
}
