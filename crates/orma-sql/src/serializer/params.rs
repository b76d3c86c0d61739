use super::{Flavor, Formatter, ToSql};

use orma_core::sql::JdbcParameter;

/// Collects the parameters of a statement in placeholder order.
pub trait Params {
    fn push(&mut self, param: &JdbcParameter) -> Placeholder;
}

/// 1-based position of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placeholder(pub usize);

impl Params for Vec<JdbcParameter> {
    fn push(&mut self, param: &JdbcParameter) -> Placeholder {
        self.push(param.clone());
        Placeholder(self.len())
    }
}

impl ToSql for Placeholder {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        use std::fmt::Write;

        // Writing to a `String` cannot fail
        let _ = match f.serializer.flavor {
            Flavor::Mysql => write!(f.dst, "?"),
            Flavor::Postgresql => write!(f.dst, "${}", self.0),
            Flavor::Sqlite => write!(f.dst, "?{}", self.0),
        };
    }
}
