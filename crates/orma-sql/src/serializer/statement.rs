use super::{Comma, Ident, Params, ToSql};

use orma_core::{
    sql::{Assignment, DeleteStatement, QuerySpec, SortSpecification, UpdateStatement},
    stmt::{LockMode, NullPrecedence},
};

impl ToSql for &QuerySpec {
    fn to_sql<P: Params>(self, f: &mut super::Formatter<'_, P>) {
        let distinct = if self.select_clause.distinct {
            "DISTINCT "
        } else {
            ""
        };
        let selections = Comma(
            self.select_clause
                .selections
                .iter()
                .map(|selection| &selection.expression),
        );
        let from = &self.from_clause;

        fmt!(f, "SELECT " distinct selections " FROM " from);

        if let Some(predicate) = self.where_clause() {
            fmt!(f, " WHERE " predicate);
        }

        if !self.group_by.is_empty() {
            fmt!(f, " GROUP BY " Comma(&self.group_by));
        }

        if let Some(predicate) = self.having_clause() {
            fmt!(f, " HAVING " predicate);
        }

        if !self.order_by.is_empty() {
            fmt!(f, " ORDER BY " Comma(&self.order_by));
        }

        if !self.is_root {
            return;
        }

        match (self.limit(), self.offset()) {
            (Some(limit), Some(offset)) => fmt!(f, " LIMIT " limit " OFFSET " offset),
            (Some(limit), None) => fmt!(f, " LIMIT " limit),
            (None, Some(offset)) => {
                // SQLite and MySQL only accept OFFSET after a LIMIT
                if f.serializer.is_sqlite() {
                    fmt!(f, " LIMIT -1");
                } else if f.serializer.is_mysql() {
                    fmt!(f, " LIMIT 18446744073709551615");
                }
                fmt!(f, " OFFSET " offset);
            }
            (None, None) => {}
        }

        self.lock_mode.to_sql(f);
    }
}

impl ToSql for &SortSpecification {
    fn to_sql<P: Params>(self, f: &mut super::Formatter<'_, P>) {
        let expr = &self.expression;
        let direction = if self.direction.is_desc() { " DESC" } else { "" };

        if f.serializer.is_mysql() {
            // MySQL has no NULLS FIRST / LAST; sort on the null check first
            match self.nulls {
                Some(NullPrecedence::First) => fmt!(f, expr " IS NULL DESC, "),
                Some(NullPrecedence::Last) => fmt!(f, expr " IS NULL, "),
                None => {}
            }
            fmt!(f, expr direction);
            return;
        }

        fmt!(f, expr direction);

        match self.nulls {
            Some(NullPrecedence::First) => fmt!(f, " NULLS FIRST"),
            Some(NullPrecedence::Last) => fmt!(f, " NULLS LAST"),
            None => {}
        }
    }
}

impl ToSql for LockMode {
    fn to_sql<P: Params>(self, f: &mut super::Formatter<'_, P>) {
        // SQLite locks the whole database on write; there is no row lock
        if f.serializer.is_sqlite() {
            return;
        }

        match self {
            LockMode::None => {}
            LockMode::PessimisticWrite => fmt!(f, " FOR UPDATE"),
            LockMode::PessimisticRead if f.serializer.is_mysql() => {
                fmt!(f, " LOCK IN SHARE MODE")
            }
            LockMode::PessimisticRead => fmt!(f, " FOR SHARE"),
        }
    }
}

impl ToSql for &UpdateStatement {
    fn to_sql<P: Params>(self, f: &mut super::Formatter<'_, P>) {
        f.tables.insert(self.target.table_name.clone());

        let table = Ident(&self.target.table_name);
        fmt!(f, "UPDATE " table " SET " Comma(&self.assignments));

        if let Some(predicate) = &self.restriction {
            fmt!(f, " WHERE " predicate);
        }
    }
}

impl ToSql for &Assignment {
    fn to_sql<P: Params>(self, f: &mut super::Formatter<'_, P>) {
        let value = &self.value;
        fmt!(f, Ident(&self.column.column) " = " value);
    }
}

impl ToSql for &DeleteStatement {
    fn to_sql<P: Params>(self, f: &mut super::Formatter<'_, P>) {
        f.tables.insert(self.target.table_name.clone());

        let table = Ident(&self.target.table_name);
        fmt!(f, "DELETE FROM " table);

        if let Some(predicate) = &self.restriction {
            fmt!(f, " WHERE " predicate);
        }
    }
}
