use super::{Flavor, Formatter, Params, ToSql};

/// A table, column, or alias name. Quoted only when it is not a plain
/// lowercase identifier or collides with a keyword.
pub(super) struct Ident<S>(pub(super) S);

const KEYWORDS: &[&str] = &[
    "all", "and", "as", "between", "by", "case", "check", "column", "create", "default",
    "delete", "desc", "distinct", "drop", "else", "exists", "from", "group", "having", "in",
    "index", "insert", "into", "is", "join", "key", "like", "limit", "not", "null", "offset",
    "on", "or", "order", "primary", "references", "select", "set", "table", "then", "to",
    "union", "unique", "update", "user", "using", "values", "when", "where",
];

impl<S: AsRef<str>> ToSql for Ident<S> {
    fn to_sql<T: Params>(self, f: &mut Formatter<'_, T>) {
        let name = self.0.as_ref();

        if !needs_quotes(name) {
            f.dst.push_str(name);
            return;
        }

        let quote = match f.serializer.flavor {
            Flavor::Mysql => '`',
            Flavor::Postgresql | Flavor::Sqlite => '"',
        };

        f.dst.push(quote);
        for ch in name.chars() {
            if ch == quote {
                f.dst.push(quote);
            }
            f.dst.push(ch);
        }
        f.dst.push(quote);
    }
}

fn needs_quotes(name: &str) -> bool {
    let plain = name.starts_with(|ch: char| ch.is_ascii_lowercase() || ch == '_')
        && name
            .chars()
            .all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '_');

    !plain || KEYWORDS.contains(&name)
}

#[cfg(test)]
mod tests {
    use super::needs_quotes;

    #[test]
    fn plain_names_are_bare() {
        assert!(!needs_quotes("issues"));
        assert!(!needs_quotes("i1_0"));
        assert!(!needs_quotes("reporter_id"));
    }

    #[test]
    fn keywords_and_mixed_case_are_quoted() {
        assert!(needs_quotes("order"));
        assert!(needs_quotes("user"));
        assert!(needs_quotes("Issue"));
        assert!(needs_quotes("first name"));
    }
}
