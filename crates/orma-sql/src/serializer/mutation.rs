use super::{Comma, Delimited, Ident, Params, ToSql};

use orma_core::sql::{ColumnValueBinding, TableDelete, TableInsert, TableMutation, TableUpdate};

impl ToSql for &TableMutation {
    fn to_sql<P: Params>(self, f: &mut super::Formatter<'_, P>) {
        f.tables.insert(self.table_name().to_string());

        match self {
            TableMutation::Insert(insert) => insert.to_sql(f),
            TableMutation::Update(update) => update.to_sql(f),
            TableMutation::Delete(delete) => delete.to_sql(f),
        }
    }
}

impl ToSql for &TableInsert {
    fn to_sql<P: Params>(self, f: &mut super::Formatter<'_, P>) {
        let table = Ident(&self.table_name);

        if self.values.is_empty() {
            if f.serializer.is_mysql() {
                fmt!(f, "INSERT INTO " table " () VALUES ()");
            } else {
                fmt!(f, "INSERT INTO " table " DEFAULT VALUES");
            }
        } else {
            let columns = Comma(self.values.iter().map(|binding| Ident(&binding.column)));
            let values = Comma(self.values.iter().map(|binding| &binding.value));
            fmt!(f, "INSERT INTO " table " (" columns ") VALUES (" values ")");
        }

        // MySQL reports the generated key through the connection instead
        if let Some(column) = &self.returning {
            if !f.serializer.is_mysql() {
                fmt!(f, " RETURNING " Ident(&column.column));
            }
        }
    }
}

impl ToSql for &TableUpdate {
    fn to_sql<P: Params>(self, f: &mut super::Formatter<'_, P>) {
        let table = Ident(&self.table_name);
        let values = Comma(self.values.iter().map(Assign));
        fmt!(f, "UPDATE " table " SET " values);

        if !self.restrictions.is_empty() {
            fmt!(f, " WHERE " Delimited(self.restrictions.iter().map(Restrict), " AND "));
        }
    }
}

impl ToSql for &TableDelete {
    fn to_sql<P: Params>(self, f: &mut super::Formatter<'_, P>) {
        let table = Ident(&self.table_name);
        fmt!(f, "DELETE FROM " table);

        if !self.restrictions.is_empty() {
            fmt!(f, " WHERE " Delimited(self.restrictions.iter().map(Restrict), " AND "));
        }
    }
}

/// `column = ?` in a SET list
struct Assign<'a>(&'a ColumnValueBinding);

/// `column = ?` in a WHERE clause; a null key value becomes `IS NULL`.
struct Restrict<'a>(&'a ColumnValueBinding);

impl ToSql for Assign<'_> {
    fn to_sql<P: Params>(self, f: &mut super::Formatter<'_, P>) {
        let value = &self.0.value;
        fmt!(f, Ident(&self.0.column) " = " value);
    }
}

impl ToSql for Restrict<'_> {
    fn to_sql<P: Params>(self, f: &mut super::Formatter<'_, P>) {
        let column = Ident(&self.0.column);

        if self.0.value.static_value().is_some_and(|value| value.is_null()) {
            fmt!(f, column " IS NULL");
        } else {
            let value = &self.0.value;
            fmt!(f, column " = " value);
        }
    }
}
