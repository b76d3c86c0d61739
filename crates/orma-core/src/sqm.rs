//! Semantic query model: the object-level query tree.
//!
//! Trees are produced by [`parse_hql`] or assembled programmatically, then
//! translated to the SQL AST. A tree is never shared between executions;
//! each execution works on a [`copy`](SqmStatement::copy).

mod clause;
pub use clause::{
    InstantiationTarget, SqmDynamicInstantiation, SqmRestriction, SqmSelectClause,
    SqmSelectableNode, SqmSelection, SqmSortSpecification,
};

mod copy;
pub use copy::SqmCopyContext;

mod expr;
pub use expr::{SqmArithmetic, SqmExpr, SqmFunction, SqmFunctionName};

mod from;
pub use from::{SqmFrom, SqmFromClause, SqmJoin, SqmRoot};

mod parameter;
pub use parameter::{ParameterLabel, SqmParameter};

mod parse;
pub use parse::{parse_hql, ParseOptions};

mod path;
pub use path::{SqmPath, SqmPathSource};

mod predicate;
pub use predicate::{
    JunctionKind, SqmBetween, SqmComparison, SqmExists, SqmInList, SqmInSubquery, SqmIsNull,
    SqmJunction, SqmLike, SqmPredicate,
};

mod query_spec;
pub use query_spec::SqmQuerySpec;

mod statement;
pub use statement::{
    SqmAssignment, SqmDeleteStatement, SqmSelectStatement, SqmStatement, SqmUpdateStatement,
};

pub mod visit;
pub use visit::{ParameterCollector, Visit};
