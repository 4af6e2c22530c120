use super::{FilterClause, Matcher};
use crate::{collation, Error, Record, Result, Value};
use std::cmp::Ordering;

pub(super) fn eval_clause(clause: &FilterClause, record: &Record) -> Result<bool> {
    let key = &clause.key;

    if !key.is_plain() {
        return Err(Error::invalid_argument(format!(
            "Can't filter by column \"{}\" on a materialized list",
            key.source
        )));
    }

    // A missing column reads as NULL, the way an unselected field would.
    let null = Value::Null;
    let row = record.get(&key.field).unwrap_or(&null);
    let values = clause.values();
    let case_sensitive = key.case_sensitive.unwrap_or(false);

    if key.matcher == Matcher::ExactMatch {
        let matched = values
            .iter()
            .any(|value| collation::equals(row, value, case_sensitive));
        return Ok(matched != key.negated);
    }

    // NULL never satisfies a comparison or a pattern, negated or not.
    if row.is_null() {
        return Ok(false);
    }

    let test = |value: &Value| -> bool {
        if key.matcher.is_pattern() {
            return pattern_matches(key.matcher, row, value, case_sensitive) != key.negated;
        }

        let Some(ordering) = collation::compare_operand(row, value, case_sensitive) else {
            return false;
        };

        match key.matcher.comparison_operator(key.negated) {
            ">" => ordering == Ordering::Greater,
            ">=" => ordering != Ordering::Less,
            "<" => ordering == Ordering::Less,
            "<=" => ordering != Ordering::Greater,
            _ => false,
        }
    };

    let mut values = values.into_iter().filter(|value| !value.is_null()).peekable();
    if values.peek().is_none() {
        return Ok(false);
    }

    // Negated matchers must fail every operand, positive ones match any.
    Ok(if key.negated {
        values.all(test)
    } else {
        values.any(test)
    })
}

fn pattern_matches(matcher: Matcher, row: &Value, operand: &Value, case_sensitive: bool) -> bool {
    let (Some(haystack), Some(needle)) = (row.to_text(), operand.to_text()) else {
        return false;
    };

    let (haystack, needle) = if case_sensitive {
        (haystack, needle)
    } else {
        (haystack.to_ascii_lowercase(), needle.to_ascii_lowercase())
    };

    match matcher {
        Matcher::PartialMatch => haystack.contains(&needle),
        Matcher::StartsWith => haystack.starts_with(&needle),
        Matcher::EndsWith => haystack.ends_with(&needle),
        _ => false,
    }
}
