use super::{FetchPolicy, Translator};
use crate::{
    engine::domain_result::{BasicResult, DomainResult, InstantiationResult, Paging, SelectPlan},
    query::Binding,
};

use orma_core::{
    err,
    schema::{AttributeTy, CollectionClassification, CollectionElement, NavigablePath},
    sql::{Expression, JdbcParameter, Predicate, QuerySpec, SelectStatement, SortSpecification},
    sqm::{
        InstantiationTarget, SqmExpr, SqmJoin, SqmPath, SqmPathSource, SqmQuerySpec,
        SqmSelectStatement, SqmSelectableNode, SqmSelection,
    },
    stmt::{LockMode, Type, Value},
    Error, Result,
};

use std::{sync::Arc, time::Duration};

/// Execution options of a select, set through the query API.
#[derive(Debug, Clone, Default)]
pub(crate) struct QueryOptions {
    pub(crate) max_results: Option<usize>,
    pub(crate) first_result: Option<usize>,
    pub(crate) lock_mode: LockMode,
    pub(crate) timeout: Option<Duration>,
}

impl Translator<'_> {
    pub(crate) fn translate_select(
        &mut self,
        stmt: &SqmSelectStatement,
        options: &QueryOptions,
    ) -> Result<SelectPlan> {
        self.push_scope();
        let plan = self.root_select(&stmt.query_spec, options);
        self.pop_scope();
        plan
    }

    fn root_select(&mut self, sqm: &SqmQuerySpec, options: &QueryOptions) -> Result<SelectPlan> {
        let mut spec = QuerySpec::new(true);
        self.query_spec_body(sqm, &mut spec)?;

        let mut results = vec![];
        for selection in sqm.selections() {
            results.push(self.domain_result(&mut spec, selection)?);
        }

        let limit = match options.max_results {
            Some(limit) => Some(limit),
            None => sqm.limit().map(|expr| self.paging_value(expr)).transpose()?,
        };

        let offset = match options.first_result {
            Some(offset) => Some(offset),
            None => sqm.offset().map(|expr| self.paging_value(expr)).transpose()?,
        }
        .filter(|offset| *offset > 0);

        let mut in_memory_paging = None;

        if self.collection_fetch && (limit.is_some() || offset.is_some()) {
            tracing::warn!(
                ?limit,
                ?offset,
                "limit/offset specified with collection fetch; applying in memory"
            );

            in_memory_paging = Some(Paging {
                offset: offset.unwrap_or(0),
                limit,
            });
        } else {
            if let Some(limit) = limit {
                spec.set_limit(paging_parameter(limit))?;
            }

            if let Some(offset) = offset {
                spec.set_offset(paging_parameter(offset))?;
            }
        }

        spec.lock_mode = options.lock_mode;

        Ok(SelectPlan {
            statement: SelectStatement::new(spec),
            results,
            collection_fetch: self.collection_fetch,
            in_memory_paging,
        })
    }

    /// Translates a subquery in a scope of its own. Paths of enclosing
    /// queries stay resolvable.
    pub(crate) fn subquery(&mut self, sqm: &SqmQuerySpec) -> Result<QuerySpec> {
        self.push_scope();
        let spec = self.subquery_in_scope(sqm);
        self.pop_scope();
        spec
    }

    fn subquery_in_scope(&mut self, sqm: &SqmQuerySpec) -> Result<QuerySpec> {
        if sqm.limit().is_some() || sqm.offset().is_some() {
            return Err(Error::not_yet_implemented("limit and offset in subqueries"));
        }

        let mut spec = QuerySpec::new(false);
        self.query_spec_body(sqm, &mut spec)?;

        for selection in sqm.selections() {
            let expr = match &selection.node {
                SqmSelectableNode::Expr(expr) => self.expr(expr, None)?,
                SqmSelectableNode::Entity(path) => self.from_element_expr(path)?,
                SqmSelectableNode::DynamicInstantiation(_) => {
                    return Err(Error::invalid_statement(
                        "dynamic instantiation is only allowed in the top-level select clause",
                    ))
                }
            };

            spec.select_clause.add_selection(expr);
        }

        Ok(spec)
    }

    /// Everything of a query spec but its select list and paging.
    fn query_spec_body(&mut self, sqm: &SqmQuerySpec, spec: &mut QuerySpec) -> Result<()> {
        let metamodel = self.metamodel;

        for root in &sqm.from_clause.roots {
            let group = self.entity_table_group(root.path.clone(), metamodel.entity(root.entity))?;
            spec.from_clause.add_root(group);
            self.joins(spec, &root.path, &root.joins)?;
        }

        if let Some(predicate) = sqm.where_clause() {
            let predicate = self.predicate(predicate)?;
            spec.set_where_clause_restrictions(predicate)?;
        }

        for root in &sqm.from_clause.roots {
            for restriction in self.entity_restrictions(&root.path, metamodel.entity(root.entity))? {
                spec.add_restriction(restriction);
            }
        }

        for expr in &sqm.group_by {
            let expr = self.expr(expr, None)?;
            spec.add_group_by(expr);
        }

        if let Some(predicate) = sqm.having_clause() {
            let predicate = self.predicate(predicate)?;
            spec.set_having_clause_restrictions(predicate)?;
        }

        for sort in &sqm.order_by {
            let expression = self.expr(&sort.expr, None)?;
            spec.add_sort_specification(SortSpecification {
                expression,
                direction: sort.direction,
                nulls: sort.nulls,
            });
        }

        spec.select_clause.distinct = sqm.select_clause.distinct;

        Ok(())
    }

    fn joins(
        &mut self,
        spec: &mut QuerySpec,
        parent: &Arc<NavigablePath>,
        joins: &[SqmJoin],
    ) -> Result<()> {
        let metamodel = self.metamodel;

        for join in joins {
            let attribute = metamodel.attribute(join.attribute);

            if join.fetch {
                if let AttributeTy::Plural(plural) = &attribute.ty {
                    if plural.classification == CollectionClassification::Bag {
                        self.bag_fetches += 1;

                        if self.bag_fetches > 1 {
                            return Err(Error::invalid_statement(
                                "cannot simultaneously fetch multiple bags",
                            ));
                        }
                    }

                    self.collection_fetch = true;
                }
            }

            let mut group_join =
                self.join_group(parent, attribute, join.path.clone(), join.join_type)?;

            if join.fetch {
                self.group_mut(parent)?
                    .fetched
                    .insert(attribute.id, join.path.clone());
            }

            if let Some(on) = &join.on {
                let on = self.predicate(on)?;
                group_join.predicate = Predicate::and(group_join.predicate, on);
            }

            spec.from_clause
                .find_table_group_mut(parent)
                .ok_or_else(|| err!("no table group for `{parent}`"))?
                .add_group_join(group_join);

            self.joins(spec, &join.path, &join.joins)?;
        }

        Ok(())
    }

    fn domain_result(
        &mut self,
        spec: &mut QuerySpec,
        selection: &SqmSelection,
    ) -> Result<DomainResult> {
        let metamodel = self.metamodel;

        match &selection.node {
            SqmSelectableNode::Expr(expr) => self.expr_result(spec, expr),
            SqmSelectableNode::Entity(path) => match self.group(path)?.entity {
                Some(entity) => {
                    let entity = metamodel.entity(entity);
                    let result = self.entity_result(spec, path, entity, &FetchPolicy::Query)?;
                    Ok(DomainResult::Entity(result))
                }
                // A joined collection of basic values selects its elements
                None => {
                    let attribute = self
                        .group(path)?
                        .plural
                        .ok_or_else(|| err!("from-element `{path}` has no entity"))?;
                    let element = SqmPath::new(
                        path.clone(),
                        SqmPathSource::CollectionElement(attribute),
                        Type::Unknown,
                    );

                    let expr = self.path_expr(&element)?;
                    let hint = self.path_hint(&element);
                    let position = spec.select_clause.add_selection(expr);

                    let ty = match &metamodel.attribute(attribute).expect_plural().element {
                        CollectionElement::Basic { ty, .. } => ty.clone(),
                        CollectionElement::Entity { .. } => Type::Unknown,
                    };

                    Ok(DomainResult::Basic(BasicResult::new(
                        position,
                        ty,
                        hint.and_then(|hint| hint.converter).as_deref(),
                    )))
                }
            },
            SqmSelectableNode::DynamicInstantiation(instantiation) => {
                let mut aliases = vec![];
                let mut arguments = vec![];

                for argument in &instantiation.arguments {
                    aliases.push(argument.alias.clone());
                    arguments.push(self.domain_result(spec, argument)?);
                }

                let argument_map = match &instantiation.target {
                    InstantiationTarget::Class(name) => {
                        let instantiator = self.instantiators.get(name).ok_or_else(|| {
                            Error::invalid_statement(format!("no instantiator registered for `{name}`"))
                        })?;

                        if arguments.iter().any(|argument| {
                            matches!(
                                argument,
                                DomainResult::Entity(_) | DomainResult::Instantiation(_)
                            )
                        }) {
                            return Err(Error::not_yet_implemented(
                                "entity or nested instantiation arguments of a constructor",
                            ));
                        }

                        let aliases = aliases.iter().map(Option::as_deref).collect::<Vec<_>>();
                        instantiator.argument_map(&aliases)?
                    }
                    InstantiationTarget::List | InstantiationTarget::Map => vec![],
                };

                Ok(DomainResult::Instantiation(InstantiationResult {
                    target: instantiation.target.clone(),
                    aliases,
                    arguments,
                    argument_map,
                }))
            }
        }
    }

    fn expr_result(&mut self, spec: &mut QuerySpec, expr: &SqmExpr) -> Result<DomainResult> {
        let metamodel = self.metamodel;

        if let SqmExpr::Path(path) = expr {
            if let SqmPathSource::Attribute(attribute) = path.source {
                let attribute = metamodel.attribute(attribute);

                match &attribute.ty {
                    AttributeTy::Embedded(embedded) => {
                        let embeddable = metamodel.embeddable(embedded.embeddable);
                        let mut fields = vec![];

                        for (field, column) in embeddable.fields.iter().zip(&embedded.columns) {
                            fields.push(self.select_column(
                                spec,
                                &path.lhs,
                                *column,
                                field.ty.clone(),
                                field.converter.as_deref(),
                            )?);
                        }

                        return Ok(DomainResult::Embeddable(fields));
                    }
                    AttributeTy::ToOne(to_one) => {
                        let &[column] = to_one.foreign_key.columns.as_slice() else {
                            return Err(Error::not_yet_implemented(format!(
                                "multi-column foreign key `{}`",
                                attribute.role
                            )));
                        };

                        let target = metamodel.entity(to_one.target);
                        let key = self.select_column(
                            spec,
                            &path.lhs,
                            column,
                            target.identifier.ty.clone(),
                            None,
                        )?;

                        return Ok(DomainResult::Reference {
                            target: target.id,
                            key,
                        });
                    }
                    _ => {}
                }
            }
        }

        let converter = self.hint(expr).and_then(|hint| hint.converter);
        let expression = self.expr(expr, None)?;
        let position = spec.select_clause.add_selection(expression);

        Ok(DomainResult::Basic(BasicResult::new(
            position,
            expr.ty(),
            converter.as_deref(),
        )))
    }

    /// The identifier column of an entity from-element, as selected by
    /// `select c` in a subquery.
    fn from_element_expr(&self, path: &NavigablePath) -> Result<Expression> {
        let metamodel = self.metamodel;
        let info = self.group(path)?;

        match info.entity {
            Some(entity) => self.column_expr(path, metamodel.entity(entity).identifier.column),
            None => Err(Error::invalid_statement(format!(
                "`{path}` cannot be selected in a subquery"
            ))),
        }
    }

    /// A limit or offset as a count, from a literal or a bound parameter.
    fn paging_value(&self, expr: &SqmExpr) -> Result<usize> {
        let value = match expr {
            SqmExpr::Literal(value) => value.clone(),
            SqmExpr::Parameter(parameter) => match self.binding(parameter) {
                Some(Binding::Single(value)) => value.clone(),
                _ => {
                    return Err(Error::invalid_statement(format!(
                        "no value bound for parameter {}",
                        parameter.label
                    )))
                }
            },
            _ => {
                return Err(Error::invalid_statement(
                    "limit and offset must be literals or parameters",
                ))
            }
        };

        value
            .as_i64()
            .and_then(|value| usize::try_from(value).ok())
            .ok_or_else(|| {
                Error::invalid_statement(format!(
                    "limit and offset must be non-negative integers; got {value:?}"
                ))
            })
    }
}

fn paging_parameter(value: usize) -> Expression {
    JdbcParameter::value(Value::I64(value as i64), Type::I64).into()
}
