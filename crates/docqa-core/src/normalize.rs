//! Text normalization applied to everything the lexical index sees.
//!
//! The same function runs over chunk text at build time and over raw query
//! text at search time; lexical matching is case-insensitive only because
//! both sides go through it. Vector inputs are never normalized.

/// Lower-cases `text` using full Unicode case mapping.
pub fn normalize_lexical(text: &str) -> String {
    text.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_unicode() {
        assert_eq!(normalize_lexical("Network ÉTÉ"), "network été");
    }

    #[test]
    fn idempotent() {
        let once = normalize_lexical("MiXeD Case");
        assert_eq!(normalize_lexical(&once), once);
    }
}
