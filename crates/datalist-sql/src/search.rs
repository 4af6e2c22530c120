//! Translates parsed filter clauses into SQL predicates.

use crate::{Flavor, Where};
use datalist_core::{FilterClause, Matcher, Value};

/// Builds the predicate for `clause` against an already-resolved column
/// expression such as `"Player"."Name"` or a correlated sub-select.
///
/// Returns `None` when the clause matches every row, which only happens for a
/// negated empty set.
pub fn filter_to_where(clause: &FilterClause, column: &str, flavor: Flavor) -> Option<Where> {
    let key = &clause.key;
    let values = clause.values();

    if values.is_empty() {
        return None;
    }

    if key.matcher == Matcher::ExactMatch {
        return Some(exact_match(clause, column, flavor));
    }

    let operands: Vec<&Value> = values.into_iter().filter(|value| !value.is_null()).collect();
    if operands.is_empty() {
        // NULL never satisfies a comparison or pattern.
        return Some(Where::from("1 = 0"));
    }

    let compared = collate(column, key.case_sensitive, flavor);
    let mut predicates = vec![];
    let mut params = vec![];

    for operand in operands {
        if key.matcher.is_pattern() {
            let (sql, param) = pattern(
                key.matcher,
                column,
                operand,
                key.negated,
                key.case_sensitive,
                flavor,
            );
            predicates.push(sql);
            params.push(param);
        } else {
            let operator = key.matcher.comparison_operator(key.negated);
            predicates.push(format!("{compared} {operator} ?"));
            params.push(operand.clone());
        }
    }

    // Negated clauses must fail every operand, positive ones match any.
    let connective = if key.negated { " AND " } else { " OR " };
    Some(Where {
        sql: predicates.join(connective),
        params,
    })
}

fn exact_match(clause: &FilterClause, column: &str, flavor: Flavor) -> Where {
    let key = &clause.key;
    let values = clause.values();
    let has_null = values.iter().any(|value| value.is_null());
    let concrete: Vec<Value> = values
        .into_iter()
        .filter(|value| !value.is_null())
        .cloned()
        .collect();

    let compared = collate(column, key.case_sensitive, flavor);
    let mut parts = vec![];

    match (concrete.len(), key.negated) {
        (0, _) => {}
        (1, false) => parts.push(format!("{compared} = ?")),
        (1, true) => parts.push(format!("{compared} != ?")),
        (n, negated) => {
            let placeholders = vec!["?"; n].join(", ");
            let not = if negated { "NOT " } else { "" };
            parts.push(format!("{compared} {not}IN ({placeholders})"));
        }
    }

    let sql = match (key.negated, has_null, parts.pop()) {
        (false, false, Some(part)) => part,
        (false, true, Some(part)) => format!("{part} OR {column} IS NULL"),
        (false, _, None) => format!("{column} IS NULL"),
        // `<>` never matches NULL, so the complement adds NULL rows back.
        (true, false, Some(part)) => format!("{part} OR {column} IS NULL"),
        (true, true, Some(part)) => format!("{part} AND {column} IS NOT NULL"),
        (true, _, None) => format!("{column} IS NOT NULL"),
    };

    Where {
        sql,
        params: concrete,
    }
}

fn pattern(
    matcher: Matcher,
    column: &str,
    operand: &Value,
    negated: bool,
    case_sensitive: Option<bool>,
    flavor: Flavor,
) -> (String, Value) {
    let text = operand.to_text().unwrap_or_default();
    let not = if negated { "NOT " } else { "" };

    if case_sensitive == Some(true) && flavor == Flavor::Sqlite {
        let escaped = escape_glob(&text);
        let pattern = wrap(matcher, &escaped, "*");
        return (format!("{column} {not}GLOB ?"), Value::String(pattern));
    }

    let escaped = escape_like(&text);
    let pattern = wrap(matcher, &escaped, "%");
    let operator = match (flavor, case_sensitive) {
        (Flavor::Postgresql, Some(true)) => "LIKE",
        (Flavor::Postgresql, _) => "ILIKE",
        (Flavor::Mysql, Some(true)) => "LIKE BINARY",
        _ => "LIKE",
    };
    (
        format!("{column} {not}{operator} ? ESCAPE '\\'"),
        Value::String(pattern),
    )
}

/// Adds a COLLATE clause when the filter forces case sensitivity.
///
/// Pattern matches handle case through their operator instead.
fn collate(column: &str, case_sensitive: Option<bool>, flavor: Flavor) -> String {
    match case_sensitive {
        Some(case_sensitive) => format!("{column} COLLATE {}", flavor.collation(case_sensitive)),
        None => column.to_string(),
    }
}

fn wrap(matcher: Matcher, text: &str, wildcard: &str) -> String {
    match matcher {
        Matcher::StartsWith => format!("{text}{wildcard}"),
        Matcher::EndsWith => format!("{wildcard}{text}"),
        _ => format!("{wildcard}{text}{wildcard}"),
    }
}

fn escape_like(text: &str) -> String {
    let mut ret = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            ret.push('\\');
        }
        ret.push(c);
    }
    ret
}

fn escape_glob(text: &str) -> String {
    let mut ret = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '*' | '?' | '[' => {
                ret.push('[');
                ret.push(c);
                ret.push(']');
            }
            c => ret.push(c),
        }
    }
    ret
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn build(key: &str, value: impl Into<Value>) -> Option<Where> {
        let clause = FilterClause::parse(key, value.into()).unwrap();
        filter_to_where(&clause, "\"Email\"", Flavor::Sqlite)
    }

    #[test]
    fn single_value() {
        let w = build("Email", "a@b.c").unwrap();
        assert_eq!(w.sql, "\"Email\" = ?");
        assert_eq!(w.params, [Value::from("a@b.c")]);
    }

    #[test]
    fn null_and_empty_string() {
        assert_eq!(build("Email", Value::Null).unwrap().sql, "\"Email\" IS NULL");
        assert_eq!(build("Email:not", Value::Null).unwrap().sql, "\"Email\" IS NOT NULL");
        assert_eq!(
            build("Email:not", "").unwrap().sql,
            "\"Email\" != ? OR \"Email\" IS NULL"
        );
        assert_eq!(
            build("Email", vec![Value::Null, Value::from(""), Value::from("x")]).unwrap().sql,
            "\"Email\" IN (?, ?) OR \"Email\" IS NULL"
        );
        assert_eq!(
            build("Email:not", vec![Value::Null, Value::from("")]).unwrap().sql,
            "\"Email\" != ? AND \"Email\" IS NOT NULL"
        );
    }

    #[test]
    fn negated_empty_set_matches_everything() {
        assert_eq!(build("Email:not", Value::List(vec![])), None);
    }

    #[test]
    fn case_modifiers_collate() {
        assert_eq!(
            build("Email:ExactMatch:case", "x").unwrap().sql,
            "\"Email\" COLLATE BINARY = ?"
        );
        assert_eq!(
            build("Email:nocase", "x").unwrap().sql,
            "\"Email\" COLLATE NOCASE = ?"
        );
    }

    #[test]
    fn patterns_escape_wildcards() {
        let w = build("Email:StartsWith", "100%_").unwrap();
        assert_eq!(w.sql, "\"Email\" LIKE ? ESCAPE '\\'");
        assert_eq!(w.params, [Value::from("100\\%\\_%")]);

        let w = build("Email:PartialMatch:case:not", "a*b").unwrap();
        assert_eq!(w.sql, "\"Email\" NOT GLOB ?");
        assert_eq!(w.params, [Value::from("*a[*]b*")]);
    }

    #[test]
    fn comparisons_over_sets() {
        let w = build("Email:GreaterThan", vec![1, 5]).unwrap();
        assert_eq!(w.sql, "\"Email\" > ? OR \"Email\" > ?");

        let w = build("Email:GreaterThan:not", vec![1, 5]).unwrap();
        assert_eq!(w.sql, "\"Email\" <= ? AND \"Email\" <= ?");
    }
}
