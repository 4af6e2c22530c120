//! Identifier quoting and alias inference.

use regex::Regex;
use std::sync::LazyLock;

/// Quotes an identifier: `Name` becomes `"Name"`.
pub fn quote(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quotes a table-qualified column: `"Table"."Column"`.
pub fn quote_column(table: &str, column: &str) -> String {
    format!("{}.{}", quote(table), quote(column))
}

/// Strips identifier quotes.
pub fn unquote(name: &str) -> String {
    name.replace(['"', '`'], "")
}

/// The alias a select expression is known by when none is given: the
/// trailing quoted identifier if there is one, otherwise the expression.
pub fn infer_alias(expr: &str) -> String {
    static TRAILING: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#""([^"]+)"$"#).unwrap());

    match TRAILING.captures(expr.trim()) {
        Some(captures) => captures[1].to_string(),
        None => expr.trim().to_string(),
    }
}

/// Returns `true` for `Column`, `"Column"` and `"Table"."Column"`.
pub fn is_column_reference(expr: &str) -> bool {
    static COLUMN: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r#"^("[^"]+"|\w+)(\.("[^"]+"|\w+))?$"#).unwrap()
    });

    COLUMN.is_match(expr.trim())
}
