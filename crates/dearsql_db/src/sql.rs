//! Helpers for splicing names into dynamically built SQL.

use sqlparser::ast::Ident;

/// Quote a table or column name as a SQL identifier.
///
/// Embedded double quotes are doubled, so the result is always a single
/// identifier token no matter what the name contains.
#[must_use]
pub fn quote_identifier(name: &str) -> String {
    Ident::with_quote('"', name).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_name() {
        assert_eq!(quote_identifier("users"), "\"users\"");
    }

    #[test]
    fn test_embedded_quotes_are_doubled() {
        assert_eq!(
            quote_identifier("weird\"; DROP TABLE users; --"),
            "\"weird\"\"; DROP TABLE users; --\""
        );
    }

    #[test]
    fn test_spaces_and_case_preserved() {
        assert_eq!(quote_identifier("Order Items"), "\"Order Items\"");
    }
}
