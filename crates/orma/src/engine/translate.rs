//! Translation of object queries into SQL AST select statements, with the
//! domain results that read their rows.

mod dml;
mod expr;
mod load;
mod predicate;
mod select;

pub(crate) use select::QueryOptions;

use super::{
    alias::{table_alias, AliasGenerator},
    domain_result::{BasicResult, CollectionResult, ElementResult, EntityResult, Fetch},
};
use crate::{query::QueryParameterBindings, session_factory::Shared, Instantiator};

use orma_core::{
    driver::Capability,
    err,
    schema::{
        visit_entity, Attribute, AttributeId, AttributeTy, CollectNavigables,
        CollectionClassification, CollectionElement, ColumnId, EntityId, EntityType, FetchStyle,
        FetchTiming, Metamodel, Navigable, NavigablePath, PluralAttribute, TableId,
        TypeConfiguration,
    },
    sql::{
        ColumnReference, Expression, JdbcParameter, Predicate, QuerySpec, TableGroup,
        TableGroupJoin, TableReference, TableReferenceJoin,
    },
    stmt::{JoinType, Type},
    Error, Result,
};

use indexmap::IndexMap;
use std::sync::Arc;

pub(crate) struct Translator<'a> {
    metamodel: &'a Metamodel,
    types: &'a TypeConfiguration,
    capability: &'static Capability,
    instantiators: &'a IndexMap<String, Instantiator>,

    /// Tenant of the session; required by multi-tenant entities
    tenant: Option<&'a str>,

    /// Values bound to the query's parameters, consulted for list expansion
    /// and paging
    bindings: Option<&'a QueryParameterBindings>,

    aliases: AliasGenerator,

    /// One scope per select level, innermost last
    scopes: Vec<Scope>,

    /// Bags fetched by join so far
    bag_fetches: usize,

    /// Set once any collection is fetched by join
    collection_fetch: bool,
}

#[derive(Debug, Default)]
struct Scope {
    groups: IndexMap<NavigablePath, GroupInfo>,

    /// Columns of this scope's from-elements are qualified with their table
    /// alias. Single-table mutations render their own columns unqualified.
    qualify: bool,
}

/// What the translator knows about one table group.
#[derive(Debug, Default)]
struct GroupInfo {
    /// Entity the group's tables hold; `None` for collection tables
    entity: Option<EntityId>,

    /// Collection attribute the group was joined through
    plural: Option<AttributeId>,

    /// Alias of each table of the group
    tables: IndexMap<TableId, String>,

    /// Attributes fetched by join, with the path of the joined group
    fetched: IndexMap<AttributeId, Arc<NavigablePath>>,
}

/// Decides which associations an entity result fetches by join.
#[derive(Debug, Clone)]
pub(crate) enum FetchPolicy {
    /// Exactly the fetch joins declared by the query
    Query,

    /// The mapping's join fetches, stopping at entities already on the
    /// path. Collections are only joined for the root entity.
    Mapping {
        path: Vec<EntityId>,
        collections: bool,
    },
}

impl<'a> Translator<'a> {
    pub(crate) fn new(shared: &'a Shared, tenant: Option<&'a str>) -> Self {
        Self {
            metamodel: &shared.metamodel,
            types: &shared.type_configuration,
            capability: shared.driver.capability(),
            instantiators: &shared.instantiators,
            tenant,
            bindings: None,
            aliases: AliasGenerator::default(),
            scopes: vec![],
            bag_fetches: 0,
            collection_fetch: false,
        }
    }

    pub(crate) fn with_bindings(mut self, bindings: &'a QueryParameterBindings) -> Self {
        self.bindings = Some(bindings);
        self
    }

    pub(crate) fn push_scope(&mut self) {
        self.scopes.push(Scope {
            groups: IndexMap::new(),
            qualify: true,
        });
    }

    pub(crate) fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    /// Finds the group registered for `path`, innermost scope first, with
    /// the depth of its scope.
    fn lookup(&self, path: &NavigablePath) -> Result<(usize, &GroupInfo)> {
        self.scopes
            .iter()
            .enumerate()
            .rev()
            .find_map(|(depth, scope)| scope.groups.get(path).map(|info| (depth, info)))
            .ok_or_else(|| err!("no table group for `{path}`"))
    }

    fn group(&self, path: &NavigablePath) -> Result<&GroupInfo> {
        self.lookup(path).map(|(_, info)| info)
    }

    fn group_mut(&mut self, path: &NavigablePath) -> Result<&mut GroupInfo> {
        self.scopes
            .iter_mut()
            .rev()
            .find_map(|scope| scope.groups.get_mut(path))
            .ok_or_else(|| err!("no table group for `{path}`"))
    }

    fn register(&mut self, path: &NavigablePath, info: GroupInfo) -> Result<()> {
        let scope = self
            .scopes
            .last_mut()
            .ok_or_else(|| err!("no open translation scope"))?;
        scope.groups.insert(path.clone(), info);
        Ok(())
    }

    /// Reference to `column` of the table group created for `path`.
    pub(crate) fn column(&self, path: &NavigablePath, column: ColumnId) -> Result<ColumnReference> {
        let (depth, info) = self.lookup(path)?;
        let table = self.metamodel.table(column.table);

        let alias = info.tables.get(&column.table).ok_or_else(|| {
            err!(
                "table `{}` is not part of the from-element `{path}`",
                table.name
            )
        })?;

        // A correlated reference to an unqualified scope still needs a qualifier
        let qualify = self.scopes[depth].qualify || depth + 1 != self.scopes.len();
        let column = table.column(column);

        Ok(ColumnReference {
            qualifier: qualify.then(|| alias.clone()),
            column: column.name.clone(),
            ty: column.ty.clone(),
        })
    }

    fn column_expr(&self, path: &NavigablePath, column: ColumnId) -> Result<Expression> {
        self.column(path, column).map(Expression::Column)
    }

    /// `lhs.a = rhs.b AND ...` over pairs of columns.
    fn key_predicate(
        &self,
        lhs: &NavigablePath,
        rhs: &NavigablePath,
        pairs: impl Iterator<Item = (ColumnId, ColumnId)>,
    ) -> Result<Vec<Predicate>> {
        pairs
            .map(|(lhs_column, rhs_column)| {
                Ok(Predicate::eq(
                    self.column(lhs, lhs_column)?,
                    self.column(rhs, rhs_column)?,
                ))
            })
            .collect()
    }

    /// Creates the table group of an entity from-element: its primary table
    /// plus its secondary tables joined by primary key.
    pub(crate) fn entity_table_group(
        &mut self,
        path: Arc<NavigablePath>,
        entity: &EntityType,
    ) -> Result<TableGroup> {
        let metamodel = self.metamodel;
        let stem = self.aliases.stem(&entity.name);

        let mut tables = IndexMap::new();
        for (position, table) in entity.tables().enumerate() {
            tables.insert(table, table_alias(&stem, position));
        }

        let primary = TableReference::new(&metamodel.table(entity.table).name, &tables[0]);
        let mut group = TableGroup::new(path.clone(), primary);

        self.register(
            &path,
            GroupInfo {
                entity: Some(entity.id),
                tables,
                ..GroupInfo::default()
            },
        )?;

        for secondary in &entity.secondary_tables {
            let alias = self.group(&path)?.tables[&secondary.table].clone();
            let predicate = Predicate::and_all(self.key_predicate(
                &path,
                &path,
                secondary.key.pairs(),
            )?)
            .ok_or_else(|| err!("secondary table without key columns"))?;

            group.add_table_join(TableReferenceJoin {
                join_type: if secondary.optional {
                    JoinType::Left
                } else {
                    JoinType::Inner
                },
                reference: TableReference::new(&metamodel.table(secondary.table).name, alias),
                predicate,
            });
        }

        Ok(group)
    }

    /// Creates the table group of a collection table holding basic elements.
    fn collection_table_group(
        &mut self,
        path: Arc<NavigablePath>,
        attribute: &Attribute,
        plural: &PluralAttribute,
    ) -> Result<TableGroup> {
        let stem = self.aliases.stem(&attribute.name);
        let alias = table_alias(&stem, 0);

        let mut tables = IndexMap::new();
        tables.insert(plural.table, alias.clone());

        self.register(
            &path,
            GroupInfo {
                entity: None,
                plural: Some(attribute.id),
                tables,
                ..GroupInfo::default()
            },
        )?;

        let table = TableReference::new(&self.metamodel.table(plural.table).name, alias);
        Ok(TableGroup::new(path, table))
    }

    /// Joins the group of an association or collection to its parent group.
    pub(crate) fn join_group(
        &mut self,
        parent: &NavigablePath,
        attribute: &Attribute,
        path: Arc<NavigablePath>,
        join_type: JoinType,
    ) -> Result<TableGroupJoin> {
        let metamodel = self.metamodel;

        let (group, mut predicates) = match &attribute.ty {
            AttributeTy::ToOne(to_one) => {
                let target = metamodel.entity(to_one.target);
                let group = self.entity_table_group(path.clone(), target)?;
                let predicates = self.key_predicate(
                    &path,
                    parent,
                    to_one
                        .foreign_key
                        .pairs()
                        .map(|(column, target)| (target, column)),
                )?;
                (group, predicates)
            }
            AttributeTy::Plural(plural) => {
                let group = match &plural.element {
                    CollectionElement::Entity { target } => {
                        let group = self.entity_table_group(path.clone(), metamodel.entity(*target))?;
                        self.group_mut(&path)?.plural = Some(attribute.id);
                        group
                    }
                    CollectionElement::Basic { .. } => {
                        self.collection_table_group(path.clone(), attribute, plural)?
                    }
                };
                let predicates = self.key_predicate(&path, parent, plural.key.pairs())?;
                (group, predicates)
            }
            AttributeTy::Basic(_) | AttributeTy::Embedded(_) => {
                return Err(Error::invalid_statement(format!(
                    "`{}` is not an association and cannot be joined",
                    attribute.role
                )))
            }
        };

        if let Some(entity) = self.group(&path)?.entity {
            predicates.extend(self.entity_restrictions(&path, metamodel.entity(entity))?);
        }

        let predicate =
            Predicate::and_all(predicates).ok_or_else(|| err!("join without key columns"))?;

        Ok(TableGroupJoin {
            join_type,
            group,
            predicate,
        })
    }

    /// Restrictions every reference to the entity carries: its discriminator
    /// value and the session's tenant.
    pub(crate) fn entity_restrictions(
        &self,
        path: &NavigablePath,
        entity: &EntityType,
    ) -> Result<Vec<Predicate>> {
        let mut predicates = vec![];

        if let Some(discriminator) = &entity.discriminator {
            predicates.push(Predicate::eq(
                self.column(path, discriminator.column)?,
                Expression::Literal(discriminator.value.clone()),
            ));
        }

        if let Some(tenant_id) = &entity.tenant_id {
            let tenant = self.tenant.ok_or_else(|| {
                Error::invalid_statement(format!(
                    "entity `{}` is multi-tenant; the session has no tenant identifier",
                    entity.name
                ))
            })?;

            predicates.push(Predicate::eq(
                self.column(path, tenant_id.column)?,
                JdbcParameter::value(tenant, Type::String),
            ));
        }

        Ok(predicates)
    }

    fn select_column(
        &self,
        spec: &mut QuerySpec,
        path: &NavigablePath,
        column: ColumnId,
        ty: Type,
        converter: Option<&str>,
    ) -> Result<BasicResult> {
        let column = self.column_expr(path, column)?;
        let position = spec.select_clause.add_selection(column);
        Ok(BasicResult::new(position, ty, converter))
    }

    /// Selects the state of `entity` from the group at `path`, joining
    /// associations as the policy decides.
    pub(crate) fn entity_result(
        &mut self,
        spec: &mut QuerySpec,
        path: &Arc<NavigablePath>,
        entity: &'a EntityType,
        policy: &FetchPolicy,
    ) -> Result<EntityResult> {
        let mut navigables = CollectNavigables::default();
        visit_entity(entity, &mut navigables);

        let mut identifier = None;
        let mut version = None;
        let mut row_id = None;
        let mut fetches = vec![];

        for navigable in navigables.navigables {
            match navigable {
                Navigable::Identifier(_, id) => {
                    identifier =
                        Some(self.select_column(spec, path, id.column, id.ty.clone(), None)?);
                }
                Navigable::Version(_, v) => {
                    version = Some(self.select_column(spec, path, v.column, Type::I64, None)?);
                }
                Navigable::RowId(_, rid) if self.capability.row_id.is_some() => {
                    let alias = &self.group(path)?.tables[&entity.table];
                    let expr = Expression::column(Some(alias.as_str()), &rid.column_name, Type::I64);
                    let position = spec.select_clause.add_selection(expr);
                    row_id = Some(BasicResult::new(position, Type::I64, None));
                }
                Navigable::Singular(attribute) => {
                    fetches.push(self.singular_fetch(spec, path, attribute, policy)?);
                }
                Navigable::Plural(attribute, plural) => {
                    fetches.push(self.plural_fetch(spec, path, attribute, plural, policy)?);
                }
                Navigable::Entity(_)
                | Navigable::Discriminator(..)
                | Navigable::TenantId(..)
                | Navigable::RowId(..)
                | Navigable::ForeignKey(..)
                | Navigable::CollectionIdentifier(..)
                | Navigable::CollectionIndex(..)
                | Navigable::CollectionElement(..) => {}
            }
        }

        Ok(EntityResult {
            entity: entity.id,
            identifier: identifier.ok_or_else(|| err!("entity `{}` has no identifier", entity.name))?,
            version,
            row_id,
            fetches,
        })
    }

    fn singular_fetch(
        &mut self,
        spec: &mut QuerySpec,
        path: &Arc<NavigablePath>,
        attribute: &'a Attribute,
        policy: &FetchPolicy,
    ) -> Result<Fetch> {
        let metamodel = self.metamodel;

        match &attribute.ty {
            AttributeTy::Basic(basic) => Ok(Fetch::Basic {
                attribute: attribute.id,
                result: self.select_column(
                    spec,
                    path,
                    basic.column,
                    basic.ty.clone(),
                    basic.converter.as_deref(),
                )?,
            }),
            AttributeTy::Embedded(embedded) => {
                let embeddable = metamodel.embeddable(embedded.embeddable);
                let fields = embeddable
                    .fields
                    .iter()
                    .zip(&embedded.columns)
                    .map(|(field, column)| {
                        self.select_column(
                            spec,
                            path,
                            *column,
                            field.ty.clone(),
                            field.converter.as_deref(),
                        )
                    })
                    .collect::<Result<_>>()?;

                Ok(Fetch::Embedded {
                    attribute: attribute.id,
                    fields,
                })
            }
            AttributeTy::ToOne(to_one) => {
                let target = metamodel.entity(to_one.target);

                match policy {
                    FetchPolicy::Query => {
                        let fetched = self.group(path)?.fetched.get(&attribute.id).cloned();

                        if let Some(join_path) = fetched {
                            let result = self.entity_result(spec, &join_path, target, policy)?;
                            return Ok(Fetch::JoinedEntity {
                                attribute: attribute.id,
                                result: Box::new(result),
                            });
                        }
                    }
                    FetchPolicy::Mapping { path: stack, .. } => {
                        if to_one.fetch == FetchStyle::Join
                            && to_one.timing == FetchTiming::Immediate
                            && !stack.contains(&target.id)
                        {
                            let join_path = Arc::new(path.append(&attribute.name, None));
                            let join_type = if attribute.nullable {
                                JoinType::Left
                            } else {
                                JoinType::Inner
                            };

                            let join = self.join_group(path, attribute, join_path.clone(), join_type)?;
                            spec.from_clause
                                .find_table_group_mut(path)
                                .ok_or_else(|| err!("no table group for `{path}`"))?
                                .add_group_join(join);

                            let mut stack = stack.clone();
                            stack.push(target.id);
                            let policy = FetchPolicy::Mapping {
                                path: stack,
                                collections: false,
                            };

                            let result = self.entity_result(spec, &join_path, target, &policy)?;
                            return Ok(Fetch::JoinedEntity {
                                attribute: attribute.id,
                                result: Box::new(result),
                            });
                        }
                    }
                }

                let &[column] = to_one.foreign_key.columns.as_slice() else {
                    return Err(Error::not_yet_implemented(format!(
                        "multi-column foreign key `{}`",
                        attribute.role
                    )));
                };

                Ok(Fetch::Reference {
                    attribute: attribute.id,
                    target: target.id,
                    key: self.select_column(spec, path, column, target.identifier.ty.clone(), None)?,
                    immediate: !attribute.is_delayed(),
                })
            }
            AttributeTy::Plural(_) => Err(err!("`{}` is not a singular attribute", attribute.role)),
        }
    }

    fn plural_fetch(
        &mut self,
        spec: &mut QuerySpec,
        path: &Arc<NavigablePath>,
        attribute: &'a Attribute,
        plural: &'a PluralAttribute,
        policy: &FetchPolicy,
    ) -> Result<Fetch> {
        let deferred = Fetch::Deferred {
            attribute: attribute.id,
            eager: plural.timing == FetchTiming::Immediate,
        };

        match policy {
            FetchPolicy::Query => {
                let fetched = self.group(path)?.fetched.get(&attribute.id).cloned();
                let Some(join_path) = fetched else {
                    return Ok(deferred);
                };

                let result = self.collection_result(spec, &join_path, attribute, plural, policy)?;
                Ok(Fetch::JoinedCollection {
                    attribute: attribute.id,
                    result,
                })
            }
            FetchPolicy::Mapping {
                path: stack,
                collections,
            } => {
                // One joined collection at most, so rows never multiply twice
                if !*collections
                    || self.collection_fetch
                    || plural.fetch != FetchStyle::Join
                    || plural.timing != FetchTiming::Immediate
                {
                    return Ok(deferred);
                }

                let join_path = Arc::new(path.append(&attribute.name, None));
                let join = self.join_group(path, attribute, join_path.clone(), JoinType::Left)?;
                spec.from_clause
                    .find_table_group_mut(path)
                    .ok_or_else(|| err!("no table group for `{path}`"))?
                    .add_group_join(join);

                self.collection_fetch = true;
                if plural.classification == CollectionClassification::Bag {
                    self.bag_fetches += 1;
                }

                let mut stack = stack.clone();
                if let Some(target) = plural.element.as_entity() {
                    stack.push(target);
                }
                let policy = FetchPolicy::Mapping {
                    path: stack,
                    collections: false,
                };

                let result = self.collection_result(spec, &join_path, attribute, plural, &policy)?;
                Ok(Fetch::JoinedCollection {
                    attribute: attribute.id,
                    result,
                })
            }
        }
    }

    /// Selects the index and element of a collection from the group at `path`.
    pub(crate) fn collection_result(
        &mut self,
        spec: &mut QuerySpec,
        path: &Arc<NavigablePath>,
        attribute: &'a Attribute,
        plural: &'a PluralAttribute,
        policy: &FetchPolicy,
    ) -> Result<CollectionResult> {
        let metamodel = self.metamodel;

        let index = match plural.index {
            Some(column) => {
                let ty = metamodel.column(column).ty.clone();
                Some(self.select_column(spec, path, column, ty, None)?)
            }
            None => None,
        };

        let element = match &plural.element {
            CollectionElement::Basic {
                column,
                ty,
                converter,
            } => ElementResult::Basic(self.select_column(
                spec,
                path,
                *column,
                ty.clone(),
                converter.as_deref(),
            )?),
            CollectionElement::Entity { target } => {
                let target = metamodel.entity(*target);
                ElementResult::Entity(Box::new(self.entity_result(spec, path, target, policy)?))
            }
        };

        Ok(CollectionResult {
            attribute: attribute.id,
            classification: plural.classification,
            index,
            element,
        })
    }
}
