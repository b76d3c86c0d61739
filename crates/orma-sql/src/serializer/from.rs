use super::{Ident, Params, ToSql};

use orma_core::{
    sql::{FromClause, TableGroup, TableGroupJoin, TableReference, TableReferenceJoin},
    stmt::JoinType,
};

impl ToSql for &FromClause {
    fn to_sql<P: Params>(self, f: &mut super::Formatter<'_, P>) {
        let mut s = "";
        for root in &self.roots {
            fmt!(f, s root);
            s = ", ";
        }
    }
}

/// The primary table, then its secondary tables, then the groups joined
/// below it, each nested group rendered the same way.
impl ToSql for &TableGroup {
    fn to_sql<P: Params>(self, f: &mut super::Formatter<'_, P>) {
        fmt!(f, &self.primary);

        for join in &self.table_joins {
            fmt!(f, " " join);
        }

        for join in &self.group_joins {
            fmt!(f, " " join);
        }
    }
}

impl ToSql for &TableReference {
    fn to_sql<P: Params>(self, f: &mut super::Formatter<'_, P>) {
        f.tables.insert(self.table_name.clone());
        fmt!(f, Ident(&self.table_name) " " Ident(&self.identification_variable));
    }
}

impl ToSql for &TableReferenceJoin {
    fn to_sql<P: Params>(self, f: &mut super::Formatter<'_, P>) {
        let reference = &self.reference;
        let predicate = &self.predicate;

        fmt!(f, self.join_type " JOIN " reference " ON " predicate);
    }
}

impl ToSql for &TableGroupJoin {
    fn to_sql<P: Params>(self, f: &mut super::Formatter<'_, P>) {
        let group = &self.group;
        let primary = &group.primary;
        let predicate = &self.predicate;

        fmt!(f, self.join_type " JOIN " primary " ON " predicate);

        for join in &group.table_joins {
            fmt!(f, " " join);
        }

        for join in &group.group_joins {
            fmt!(f, " " join);
        }
    }
}

impl ToSql for JoinType {
    fn to_sql<P: Params>(self, f: &mut super::Formatter<'_, P>) {
        match self {
            JoinType::Inner => fmt!(f, "INNER"),
            JoinType::Left => fmt!(f, "LEFT"),
        }
    }
}
