//! Common imports for test files
//!
//! `use tests::prelude::*;`

pub use crate::{issue_tracker, seed, DbTest, ExecLog, Seed, Summary};

pub use orma::{
    stmt::{LockMode, Type, Value},
    Element, Entity, EntityKey, LoadOptions, ResultValue, Session, SessionFactory,
};
