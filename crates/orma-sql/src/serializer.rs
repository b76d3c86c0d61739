#[macro_use]
mod fmt;
use fmt::ToSql;

mod delim;
use delim::{Comma, Delimited};

mod flavor;
use flavor::Flavor;

mod ident;
use ident::Ident;

mod params;
pub use params::{Params, Placeholder};

// Fragment serializers
mod create_table;
mod expr;
mod from;
mod mutation;
mod predicate;
mod statement;
mod value;

use crate::{JdbcMutation, JdbcSelect};

use indexmap::IndexSet;
use orma_core::{
    driver::operation::Transaction,
    schema::Table,
    sql::{self, Expectation, TableMutation},
};

/// Renders SQL AST trees to SQL strings for one database flavor.
#[derive(Debug)]
pub struct Serializer {
    /// The database flavor handles the differences between SQL dialects and
    /// supported features.
    flavor: Flavor,
}

struct Formatter<'a, T> {
    /// Handle to the serializer
    serializer: &'a Serializer,

    /// Where to write the serialized SQL
    dst: &'a mut String,

    /// Where to store parameters
    params: &'a mut T,

    /// Names of the tables the statement reads or writes
    tables: &'a mut IndexSet<String>,
}

impl Serializer {
    /// Renders a select. Placeholders are numbered in rendering order, which
    /// is also the order of [`JdbcSelect::binders`].
    pub fn serialize_select(&self, stmt: &sql::SelectStatement) -> JdbcSelect {
        let mut binders = vec![];
        let mut tables = IndexSet::new();
        let sql = self.serialize(&stmt.query_spec, &mut binders, &mut tables);

        let values_mapping = stmt
            .query_spec
            .select_clause
            .selections
            .iter()
            .map(|selection| selection.expression.ty())
            .collect();

        JdbcSelect {
            sql,
            binders,
            values_mapping,
            affected_table_names: tables,
        }
    }

    pub fn serialize_update(&self, stmt: &sql::UpdateStatement) -> JdbcMutation {
        let mut binders = vec![];
        let mut tables = IndexSet::new();
        let sql = self.serialize(stmt, &mut binders, &mut tables);

        JdbcMutation {
            sql,
            binders,
            table_name: stmt.target.table_name.clone(),
            expectation: Expectation::None,
            returning: None,
        }
    }

    pub fn serialize_delete(&self, stmt: &sql::DeleteStatement) -> JdbcMutation {
        let mut binders = vec![];
        let mut tables = IndexSet::new();
        let sql = self.serialize(stmt, &mut binders, &mut tables);

        JdbcMutation {
            sql,
            binders,
            table_name: stmt.target.table_name.clone(),
            expectation: Expectation::None,
            returning: None,
        }
    }

    /// Renders one table mutation of a mutation group.
    pub fn serialize_table_mutation(&self, mutation: &TableMutation) -> JdbcMutation {
        let mut binders = vec![];
        let mut tables = IndexSet::new();
        let sql = self.serialize(mutation, &mut binders, &mut tables);

        let returning = mutation
            .as_insert()
            .and_then(|insert| insert.returning.as_ref())
            .map(|column| column.ty.clone());

        JdbcMutation {
            sql,
            binders,
            table_name: mutation.table_name().to_string(),
            expectation: mutation.expectation(),
            returning,
        }
    }

    /// Renders `CREATE TABLE IF NOT EXISTS` for one mapped table.
    pub fn serialize_create_table(&self, table: &Table) -> String {
        let mut binders: Vec<sql::JdbcParameter> = vec![];
        let mut tables = IndexSet::new();
        self.serialize(table, &mut binders, &mut tables)
    }

    /// Serialize a transaction control operation to a SQL string.
    ///
    /// MySQL uses `START TRANSACTION` while the other databases use `BEGIN`.
    pub fn serialize_transaction(&self, op: Transaction) -> String {
        match op {
            Transaction::Start if self.is_mysql() => "START TRANSACTION".to_string(),
            Transaction::Start => "BEGIN".to_string(),
            Transaction::Commit => "COMMIT".to_string(),
            Transaction::Rollback => "ROLLBACK".to_string(),
        }
    }

    fn serialize(
        &self,
        stmt: impl ToSql,
        params: &mut impl Params,
        tables: &mut IndexSet<String>,
    ) -> String {
        let mut ret = String::new();

        let mut fmt = Formatter {
            serializer: self,
            dst: &mut ret,
            params,
            tables,
        };

        stmt.to_sql(&mut fmt);

        ret.push(';');
        ret
    }
}
