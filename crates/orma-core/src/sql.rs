//! SQL AST: the relational, dialect-neutral form of queries and mutations.
//!
//! Names are embedded in the tree (table names, aliases, column names), so
//! rendering needs no metamodel. A tree is built fresh per compiled query and
//! owned by the compiled descriptor that contains it.

mod expression;
pub use expression::{Arithmetic, ColumnReference, Expression, Function};

mod from;
pub use from::{FromClause, TableGroup, TableGroupJoin, TableReference, TableReferenceJoin};

mod mutation;
pub use mutation::{
    ColumnValueBinding, Expectation, TableDelete, TableInsert, TableMutation, TableUpdate,
};

mod mutation_group;
pub use mutation_group::{CollectionMutation, MutationGroup, MutationKind};

mod parameter;
pub use parameter::{JdbcParameter, JdbcParameterBindings, ParameterBinder};

mod predicate;
pub use predicate::{
    Between, Comparison, Exists, InList, InSubquery, Junction, Like, NullCheck, Predicate,
};

mod query_spec;
pub use query_spec::{QuerySpec, SelectClause, SortSpecification, SqlSelection};

mod statement;
pub use statement::{Assignment, DeleteStatement, SelectStatement, Statement, UpdateStatement};
