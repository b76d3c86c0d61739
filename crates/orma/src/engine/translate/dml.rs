use super::{GroupInfo, Scope, Translator};

use orma_core::{
    schema::EntityType,
    sql::{Assignment, DeleteStatement, Predicate, TableReference, UpdateStatement},
    sqm::{SqmDeleteStatement, SqmPredicate, SqmRoot, SqmUpdateStatement},
    Error, Result,
};

use indexmap::IndexMap;

impl<'a> Translator<'a> {
    pub(crate) fn translate_update(&mut self, stmt: &SqmUpdateStatement) -> Result<UpdateStatement> {
        let (entity, target) = self.dml_target(&stmt.target, "update")?;
        let update = self.update_in_scope(stmt, entity, target);
        self.pop_scope();
        update
    }

    pub(crate) fn translate_delete(&mut self, stmt: &SqmDeleteStatement) -> Result<DeleteStatement> {
        let (entity, target) = self.dml_target(&stmt.target, "delete")?;
        let restriction = self.dml_restriction(&stmt.target, entity, stmt.where_clause());
        self.pop_scope();

        Ok(DeleteStatement {
            target,
            restriction: restriction?,
        })
    }

    /// Opens the unqualified scope of a single-table mutation.
    fn dml_target(
        &mut self,
        root: &SqmRoot,
        kind: &str,
    ) -> Result<(&'a EntityType, TableReference)> {
        let metamodel = self.metamodel;
        let entity = metamodel.entity(root.entity);

        if !root.joins.is_empty() {
            return Err(Error::not_yet_implemented(format!("joins in {kind} statements")));
        }

        if !entity.secondary_tables.is_empty() {
            return Err(Error::not_yet_implemented(format!(
                "{kind} statements against `{}`, which spans several tables",
                entity.name
            )));
        }

        let table = &metamodel.table(entity.table).name;

        let mut tables = IndexMap::new();
        tables.insert(entity.table, table.clone());

        let mut groups = IndexMap::new();
        groups.insert(
            (*root.path).clone(),
            GroupInfo {
                entity: Some(entity.id),
                tables,
                ..GroupInfo::default()
            },
        );

        self.scopes.push(Scope {
            groups,
            qualify: false,
        });

        Ok((entity, TableReference::new(table, table)))
    }

    fn update_in_scope(
        &mut self,
        stmt: &SqmUpdateStatement,
        entity: &EntityType,
        target: TableReference,
    ) -> Result<UpdateStatement> {
        let mut assignments = vec![];

        for assignment in &stmt.assignments {
            let &[column] = self.path_columns(&assignment.path)?.as_slice() else {
                return Err(Error::not_yet_implemented(
                    "assigning attributes mapped to several columns",
                ));
            };

            let hint = self.path_hint(&assignment.path);
            let value = self.expr(&assignment.value, hint.as_ref())?;

            assignments.push(Assignment {
                column: self.column(&assignment.path.lhs, column)?,
                value,
            });
        }

        Ok(UpdateStatement {
            target,
            assignments,
            restriction: self.dml_restriction(&stmt.target, entity, stmt.where_clause())?,
        })
    }

    fn dml_restriction(
        &mut self,
        root: &SqmRoot,
        entity: &EntityType,
        where_clause: Option<&SqmPredicate>,
    ) -> Result<Option<Predicate>> {
        let mut predicates = vec![];

        if let Some(predicate) = where_clause {
            predicates.push(self.predicate(predicate)?);
        }

        predicates.extend(self.entity_restrictions(&root.path, entity)?);

        Ok(Predicate::and_all(predicates))
    }
}
