use super::{Comma, Flavor, Formatter, Ident, Params, ToSql};

use orma_core::{
    schema::{Column, Table},
    stmt::Type,
};

impl ToSql for &Table {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        let name = Ident(&self.name);
        let inline_key = inline_primary_key(self);
        let columns = Comma(self.columns.iter().map(|column| ColumnDef {
            column,
            inline_key: inline_key == Some(column.id.index),
        }));

        fmt!(f, "CREATE TABLE IF NOT EXISTS " name " (" columns);

        if inline_key.is_none() && !self.primary_key.is_empty() {
            let key = Comma(self.primary_key_columns().map(|column| Ident(&column.name)));
            fmt!(f, ", PRIMARY KEY (" key ")");
        }

        fmt!(f, ")");
    }
}

/// An auto-increment key has to be declared on the column itself.
fn inline_primary_key(table: &Table) -> Option<usize> {
    match &table.primary_key[..] {
        [column] if table.column(*column).auto_increment => Some(column.index),
        _ => None,
    }
}

struct ColumnDef<'a> {
    column: &'a Column,
    inline_key: bool,
}

impl ToSql for ColumnDef<'_> {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        let name = Ident(&self.column.name);

        if self.inline_key {
            let definition = match f.serializer.flavor {
                Flavor::Sqlite => "INTEGER PRIMARY KEY AUTOINCREMENT",
                Flavor::Postgresql => "BIGINT GENERATED BY DEFAULT AS IDENTITY PRIMARY KEY",
                Flavor::Mysql => "BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY",
            };
            fmt!(f, name " " definition);
            return;
        }

        let ty = ColumnType(&self.column.ty);
        fmt!(f, name " " ty);

        if !self.column.nullable || self.column.primary_key {
            fmt!(f, " NOT NULL");
        }
    }
}

struct ColumnType<'a>(&'a Type);

impl ToSql for ColumnType<'_> {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        let flavor = f.serializer.flavor;

        fmt!(
            f,
            match (self.0, flavor) {
                (Type::Bool, _) => "BOOLEAN",
                (Type::I32, _) => "INTEGER",
                (Type::I64, Flavor::Sqlite) => "INTEGER",
                (Type::I64, _) => "BIGINT",
                (Type::F64, Flavor::Sqlite) => "REAL",
                (Type::F64, Flavor::Postgresql) => "DOUBLE PRECISION",
                (Type::F64, Flavor::Mysql) => "DOUBLE",
                (Type::Bytes, Flavor::Postgresql) => "BYTEA",
                (Type::Bytes, _) => "BLOB",
                (Type::Uuid, Flavor::Postgresql) => "UUID",
                (Type::Uuid, Flavor::Mysql) => "CHAR(36)",
                // MySQL cannot index unbounded text
                (_, Flavor::Mysql) => "VARCHAR(255)",
                _ => "TEXT",
            }
        );
    }
}
