use super::{Comma, Ident, Params, ToSql};

use orma_core::sql::{ColumnReference, Expression, Function, JdbcParameter};

impl ToSql for &Expression {
    fn to_sql<P: Params>(self, f: &mut super::Formatter<'_, P>) {
        use Expression::*;

        match self {
            Column(column) => column.to_sql(f),
            Parameter(param) => param.to_sql(f),
            Literal(value) => value.to_sql(f),
            Function(func) => func.to_sql(f),
            Arithmetic(arithmetic) => {
                let lhs = &*arithmetic.lhs;
                let rhs = &*arithmetic.rhs;
                fmt!(f, "(" lhs " " arithmetic.op.as_str() " " rhs ")");
            }
            Negated(expr) => {
                let expr = &**expr;
                fmt!(f, "-" expr);
            }
            Tuple(exprs) => {
                fmt!(f, "(" Comma(exprs) ")");
            }
            Subquery(query) => {
                let query = &**query;
                fmt!(f, "(" query ")");
            }
            Star => {
                fmt!(f, "*");
            }
        }
    }
}

impl ToSql for &ColumnReference {
    fn to_sql<P: Params>(self, f: &mut super::Formatter<'_, P>) {
        if let Some(qualifier) = &self.qualifier {
            fmt!(f, Ident(qualifier) ".");
        }

        fmt!(f, Ident(&self.column));
    }
}

impl ToSql for &JdbcParameter {
    fn to_sql<P: Params>(self, f: &mut super::Formatter<'_, P>) {
        let placeholder = f.params.push(self);
        fmt!(f, placeholder);
    }
}

impl ToSql for &Function {
    fn to_sql<P: Params>(self, f: &mut super::Formatter<'_, P>) {
        match self.name {
            // `||` is standard; MySQL treats it as a logical or
            "concat" if !f.serializer.is_mysql() => {
                fmt!(f, "(" super::Delimited(&self.args, " || ") ")");
                return;
            }
            "length" if f.serializer.is_mysql() => {
                fmt!(f, "char_length(" Comma(&self.args) ")");
                return;
            }
            _ => {}
        }

        let distinct = if self.distinct { "DISTINCT " } else { "" };

        fmt!(f, self.name "(" distinct Comma(&self.args) ")");
    }
}
