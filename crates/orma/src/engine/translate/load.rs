use super::{FetchPolicy, Translator};
use crate::engine::domain_result::{CollectionResult, DomainResult, SelectPlan};

use orma_core::{
    schema::{AttributeId, CollectionElement, EntityId, NavigablePath},
    sql::{
        Expression, InList, JdbcParameter, Predicate, QuerySpec, SelectStatement,
        SortSpecification,
    },
    stmt::{Direction, LockMode, Value},
    Error, Result,
};

use std::sync::Arc;

/// Select initializing one collection of one owner.
#[derive(Debug)]
pub(crate) struct CollectionPlan {
    pub(crate) statement: SelectStatement,
    pub(crate) result: CollectionResult,
}

impl Translator<'_> {
    /// Select of entities by identifier: `id = ?` for one, `id in (...)` for
    /// several. Associations are fetched as the mapping declares.
    pub(crate) fn load_by_id(
        &mut self,
        entity: EntityId,
        ids: &[Value],
        lock_mode: LockMode,
    ) -> Result<SelectPlan> {
        self.push_scope();
        let plan = self.load_by_id_in_scope(entity, ids, lock_mode);
        self.pop_scope();
        plan
    }

    fn load_by_id_in_scope(
        &mut self,
        entity: EntityId,
        ids: &[Value],
        lock_mode: LockMode,
    ) -> Result<SelectPlan> {
        let metamodel = self.metamodel;
        let entity = metamodel.entity(entity);

        if ids.is_empty() {
            return Err(Error::invalid_statement(format!(
                "loading `{}` requires at least one identifier",
                entity.name
            )));
        }

        let path = Arc::new(NavigablePath::root(&entity.name, None));
        let mut spec = QuerySpec::new(true);

        let group = self.entity_table_group(path.clone(), entity)?;
        spec.from_clause.add_root(group);

        let policy = FetchPolicy::Mapping {
            path: vec![entity.id],
            collections: true,
        };
        let result = self.entity_result(&mut spec, &path, entity, &policy)?;

        let id_column = self.column(&path, entity.identifier.column)?;
        let id_ty = metamodel.column(entity.identifier.column).ty.clone();

        let mut params: Vec<Expression> = ids
            .iter()
            .map(|id| JdbcParameter::value(id.clone(), id_ty.clone()).into())
            .collect();

        let restriction = if params.len() == 1 {
            Predicate::eq(id_column, params.remove(0))
        } else {
            Predicate::InList(InList {
                expr: id_column.into(),
                list: params,
                negated: false,
            })
        };

        spec.set_where_clause_restrictions(restriction)?;
        for predicate in self.entity_restrictions(&path, entity)? {
            spec.add_restriction(predicate);
        }

        spec.lock_mode = lock_mode;

        Ok(SelectPlan {
            statement: SelectStatement::new(spec),
            results: vec![DomainResult::Entity(result)],
            collection_fetch: self.collection_fetch,
            in_memory_paging: None,
        })
    }

    /// Select of the elements of one collection, restricted by the owner's
    /// identifier. Indexed collections come back in index order.
    pub(crate) fn load_collection(
        &mut self,
        attribute: AttributeId,
        owner_id: &Value,
    ) -> Result<CollectionPlan> {
        self.push_scope();
        let plan = self.load_collection_in_scope(attribute, owner_id);
        self.pop_scope();
        plan
    }

    fn load_collection_in_scope(
        &mut self,
        attribute: AttributeId,
        owner_id: &Value,
    ) -> Result<CollectionPlan> {
        let metamodel = self.metamodel;
        let attribute = metamodel.attribute(attribute);
        let plural = attribute.as_plural().ok_or_else(|| {
            Error::invalid_statement(format!("`{}` is not a collection", attribute.role))
        })?;
        let owner = metamodel.entity(attribute.id.entity);

        if plural.key.width() != 1 {
            return Err(Error::not_yet_implemented(format!(
                "collection `{}` keyed by several columns",
                attribute.role
            )));
        }

        let path = Arc::new(NavigablePath::root(&attribute.role.to_string(), None));
        let mut spec = QuerySpec::new(true);

        let (group, restrictions, policy) = match &plural.element {
            CollectionElement::Entity { target } => {
                let target = metamodel.entity(*target);
                let group = self.entity_table_group(path.clone(), target)?;
                let restrictions = self.entity_restrictions(&path, target)?;
                let policy = FetchPolicy::Mapping {
                    path: vec![owner.id, target.id],
                    collections: false,
                };
                (group, restrictions, policy)
            }
            CollectionElement::Basic { .. } => {
                let group = self.collection_table_group(path.clone(), attribute, plural)?;
                let policy = FetchPolicy::Mapping {
                    path: vec![owner.id],
                    collections: false,
                };
                (group, vec![], policy)
            }
        };
        spec.from_clause.add_root(group);

        let result = self.collection_result(&mut spec, &path, attribute, plural, &policy)?;

        let owner_ty = metamodel.column(owner.identifier.column).ty.clone();
        for (key_column, _) in plural.key.pairs() {
            spec.add_restriction(Predicate::eq(
                self.column(&path, key_column)?,
                JdbcParameter::value(owner_id.clone(), owner_ty.clone()),
            ));
        }

        for predicate in restrictions {
            spec.add_restriction(predicate);
        }

        if let Some(index) = plural.index {
            spec.add_sort_specification(SortSpecification {
                expression: self.column_expr(&path, index)?,
                direction: Direction::Asc,
                nulls: None,
            });
        }

        Ok(CollectionPlan {
            statement: SelectStatement::new(spec),
            result,
        })
    }
}
