use std::collections::HashMap;

/// Generates statement-unique table aliases.
///
/// A from-element gets a stem made of the first letter of its name and a
/// per-letter counter (`i1`, `i2`, `c1`); each of its tables then appends
/// its position in the group (`i1_0`, `i1_1`).
#[derive(Debug, Default)]
pub(crate) struct AliasGenerator {
    counters: HashMap<char, usize>,
}

impl AliasGenerator {
    pub(crate) fn stem(&mut self, name: &str) -> String {
        let letter = name
            .chars()
            .find(char::is_ascii_alphabetic)
            .map(|c| c.to_ascii_lowercase())
            .unwrap_or('t');

        let counter = self.counters.entry(letter).or_default();
        *counter += 1;

        format!("{letter}{counter}")
    }
}

pub(crate) fn table_alias(stem: &str, position: usize) -> String {
    format!("{stem}_{position}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stems_count_per_letter() {
        let mut aliases = AliasGenerator::default();

        assert_eq!(aliases.stem("Issue"), "i1");
        assert_eq!(aliases.stem("Comment"), "c1");
        assert_eq!(aliases.stem("issues"), "i2");
        assert_eq!(table_alias("i2", 1), "i2_1");
    }
}
