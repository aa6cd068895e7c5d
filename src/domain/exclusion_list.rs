//! Canonical text form of exclusion lists: items joined with `"; "`.
//! Parsing splits on `';'` only, so names containing commas survive a
//! round trip through the term CSV.

pub const SEPARATOR: &str = "; ";

pub fn join(items: &[String]) -> String {
    items.join(SEPARATOR)
}

/// Splits a serialized list, trimming items and dropping empty ones.
pub fn split(text: &str) -> Vec<String> {
    text.split(';')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_trims_and_skips_blanks() {
        assert_eq!(split(" Norte ;Capital;; "), vec!["Norte", "Capital"]);
        assert!(split("").is_empty());
    }

    #[test]
    fn test_commas_are_not_separators() {
        assert_eq!(split("Norte, Capital"), vec!["Norte, Capital"]);
    }

    #[test]
    fn test_join_then_split_keeps_items() {
        let items = vec!["Região Norte".to_string(), "Capital".to_string()];
        assert_eq!(join(&items), "Região Norte; Capital");
        assert_eq!(split(&join(&items)), items);
    }
}
