use super::TableMutation;
use crate::schema::{AttributeId, EntityId};

use indexmap::IndexMap;

/// The per-table writes of one entity-level insert, update, or delete.
///
/// Holds at most one mutation per physical table, in dependency order: the
/// primary table first, then secondary tables. Collection-table writes are
/// kept apart and run after the table mutations of an insert or update and
/// before those of a delete.
#[derive(Debug, Clone)]
pub struct MutationGroup {
    pub kind: MutationKind,
    pub entity: EntityId,
    table_mutations: IndexMap<String, TableMutation>,
    collection_mutations: Vec<CollectionMutation>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    Insert,
    Update,
    Delete,
}

/// A write against a collection table on behalf of one plural attribute.
#[derive(Debug, Clone)]
pub struct CollectionMutation {
    pub attribute: AttributeId,
    pub mutation: TableMutation,
}

impl MutationGroup {
    pub fn new(kind: MutationKind, entity: EntityId) -> Self {
        Self {
            kind,
            entity,
            table_mutations: IndexMap::new(),
            collection_mutations: vec![],
        }
    }

    /// Appends the mutation of a table not yet in the group.
    #[track_caller]
    pub fn add_table_mutation(&mut self, mutation: TableMutation) {
        let table_name = mutation.table_name().to_string();
        assert!(
            !self.table_mutations.contains_key(&table_name),
            "mutation group already holds a mutation for table `{table_name}`"
        );
        self.table_mutations.insert(table_name, mutation);
    }

    pub fn add_collection_mutation(&mut self, attribute: AttributeId, mutation: TableMutation) {
        self.collection_mutations.push(CollectionMutation {
            attribute,
            mutation,
        });
    }

    pub fn get_table_mutation(&self, table_name: &str) -> Option<&TableMutation> {
        self.table_mutations.get(table_name)
    }

    /// The only table mutation of a single-table group.
    ///
    /// # Panics
    ///
    /// Panics if the group does not hold exactly one table mutation.
    #[track_caller]
    pub fn get_single_table_mutation(&self) -> &TableMutation {
        assert_eq!(
            self.table_mutations.len(),
            1,
            "get_single_table_mutation called on a group of {} table mutations",
            self.table_mutations.len()
        );
        &self.table_mutations[0]
    }

    /// Visits table mutations in construction order.
    pub fn for_each_table_mutation(&self, mut f: impl FnMut(usize, &TableMutation)) {
        for (index, mutation) in self.table_mutations.values().enumerate() {
            f(index, mutation);
        }
    }

    pub fn number_of_table_mutations(&self) -> usize {
        self.table_mutations.len()
    }

    pub fn collection_mutations(&self) -> &[CollectionMutation] {
        &self.collection_mutations
    }

    /// All mutations in the order they must be executed.
    pub fn execution_order(&self) -> Vec<&TableMutation> {
        let tables = self.table_mutations.values();
        let collections = self.collection_mutations.iter().map(|c| &c.mutation);

        match self.kind {
            MutationKind::Insert | MutationKind::Update => tables.chain(collections).collect(),
            MutationKind::Delete => collections.chain(tables.rev()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::{Expectation, TableDelete};

    fn delete(table: &str) -> TableMutation {
        TableMutation::Delete(TableDelete {
            table_name: table.to_string(),
            restrictions: vec![],
            expectation: Expectation::RowCount(1),
        })
    }

    #[test]
    fn delete_runs_collections_then_tables_in_reverse() {
        let mut group = MutationGroup::new(MutationKind::Delete, EntityId(0));
        group.add_table_mutation(delete("issues"));
        group.add_table_mutation(delete("issue_details"));
        group.add_collection_mutation(
            AttributeId {
                entity: EntityId(0),
                index: 3,
            },
            delete("issue_tags"),
        );

        let order: Vec<_> = group
            .execution_order()
            .into_iter()
            .map(TableMutation::table_name)
            .collect();
        assert_eq!(order, ["issue_tags", "issue_details", "issues"]);
        assert_eq!(group.number_of_table_mutations(), 2);
    }

    #[test]
    #[should_panic(expected = "group of 2 table mutations")]
    fn single_table_access_on_multi_table_group() {
        let mut group = MutationGroup::new(MutationKind::Delete, EntityId(0));
        group.add_table_mutation(delete("issues"));
        group.add_table_mutation(delete("issue_details"));
        group.get_single_table_mutation();
    }

    #[test]
    #[should_panic(expected = "already holds a mutation")]
    fn one_mutation_per_table() {
        let mut group = MutationGroup::new(MutationKind::Delete, EntityId(0));
        group.add_table_mutation(delete("issues"));
        group.add_table_mutation(delete("issues"));
    }
}
