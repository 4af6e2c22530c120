use crate::{Error, Result};
use std::fmt;

/// A parsed `Field[.Relation...][:Matcher][:modifier...]` filter key.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterKey {
    /// The key as written by the caller
    pub source: String,

    /// Relation names traversed before reaching the field
    pub path: Vec<String>,

    /// Column name, empty for aggregate keys such as `Comments.Count()`
    pub field: String,

    pub aggregate: Option<Aggregate>,

    pub matcher: Matcher,

    /// Set by `:not`
    pub negated: bool,

    /// `Some(true)` for `:case`, `Some(false)` for `:nocase`, `None` uses the
    /// column collation
    pub case_sensitive: Option<bool>,
}

/// Comparison strategy selected by the first modifier of a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Matcher {
    #[default]
    ExactMatch,
    PartialMatch,
    StartsWith,
    EndsWith,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
}

/// `Relation.Function(Column)` in a filter key.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregate {
    pub function: AggregateFn,

    /// `None` for `Count()`
    pub column: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFn {
    Count,
    Max,
    Min,
    Avg,
    Sum,
}

impl FilterKey {
    pub fn parse(source: &str) -> Result<FilterKey> {
        let mut parts = source.split(':');
        let target = parts.next().unwrap_or_default().trim();

        if target.is_empty() {
            return Err(Error::invalid_argument(format!(
                "Filter key \"{source}\" does not name a field"
            )));
        }

        let mut key = FilterKey {
            source: source.to_string(),
            path: vec![],
            field: String::new(),
            aggregate: None,
            matcher: Matcher::default(),
            negated: false,
            case_sensitive: None,
        };

        key.parse_target(target)?;

        for (i, modifier) in parts.enumerate() {
            let modifier = modifier.trim();

            match modifier.to_ascii_lowercase().as_str() {
                "not" => key.negated = true,
                "case" => key.case_sensitive = Some(true),
                "nocase" => key.case_sensitive = Some(false),
                _ => match Matcher::from_name(modifier) {
                    Some(matcher) if i == 0 => key.matcher = matcher,
                    _ => {
                        return Err(Error::not_found(format!(
                            "Filter modifier \"{modifier}\" does not exist"
                        )))
                    }
                },
            }
        }

        Ok(key)
    }

    fn parse_target(&mut self, target: &str) -> Result<()> {
        let Some(open) = target.find('(') else {
            let mut segments: Vec<_> = target.split('.').map(str::to_string).collect();
            self.field = segments.pop().unwrap_or_default();
            self.path = segments;
            return Ok(());
        };

        let malformed = || {
            Error::invalid_argument(format!("Malformed aggregate filter \"{}\"", self.source))
        };

        let close = target.rfind(')').ok_or_else(malformed)?;
        if close != target.len() - 1 || close < open {
            return Err(malformed());
        }

        let argument = target[open + 1..close].trim();
        if argument.contains(['(', ')']) {
            return Err(malformed());
        }

        let mut segments: Vec<_> = target[..open].split('.').map(str::to_string).collect();
        let function = segments.pop().unwrap_or_default();
        let function = AggregateFn::from_name(&function).ok_or_else(malformed)?;

        if segments.iter().any(String::is_empty) {
            return Err(malformed());
        }

        self.path = segments;
        self.aggregate = Some(Aggregate {
            function,
            column: (!argument.is_empty()).then(|| argument.trim_matches('"').to_string()),
        });
        Ok(())
    }

    /// Returns `true` for keys naming a column on the list's own class.
    pub fn is_plain(&self) -> bool {
        self.path.is_empty() && self.aggregate.is_none()
    }

    /// The relation path and field joined back with dots.
    pub fn dotted(&self) -> String {
        let mut ret = self.path.join(".");
        if !self.field.is_empty() {
            if !ret.is_empty() {
                ret.push('.');
            }
            ret.push_str(&self.field);
        }
        ret
    }
}

impl Matcher {
    pub fn from_name(name: &str) -> Option<Matcher> {
        Some(match name {
            "ExactMatch" => Matcher::ExactMatch,
            "PartialMatch" => Matcher::PartialMatch,
            "StartsWith" => Matcher::StartsWith,
            "EndsWith" => Matcher::EndsWith,
            "GreaterThan" => Matcher::GreaterThan,
            "GreaterThanOrEqual" => Matcher::GreaterThanOrEqual,
            "LessThan" => Matcher::LessThan,
            "LessThanOrEqual" => Matcher::LessThanOrEqual,
            _ => return None,
        })
    }

    pub fn is_pattern(self) -> bool {
        matches!(
            self,
            Matcher::PartialMatch | Matcher::StartsWith | Matcher::EndsWith
        )
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            Matcher::GreaterThan
                | Matcher::GreaterThanOrEqual
                | Matcher::LessThan
                | Matcher::LessThanOrEqual
        )
    }

    /// SQL operator, flipped when `negated`.
    pub fn comparison_operator(self, negated: bool) -> &'static str {
        match (self, negated) {
            (Matcher::GreaterThan, false) | (Matcher::LessThanOrEqual, true) => ">",
            (Matcher::GreaterThanOrEqual, false) | (Matcher::LessThan, true) => ">=",
            (Matcher::LessThan, false) | (Matcher::GreaterThanOrEqual, true) => "<",
            (Matcher::LessThanOrEqual, false) | (Matcher::GreaterThan, true) => "<=",
            (_, false) => "=",
            (_, true) => "!=",
        }
    }
}

impl fmt::Display for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl AggregateFn {
    pub fn from_name(name: &str) -> Option<AggregateFn> {
        Some(match name.to_ascii_lowercase().as_str() {
            "count" => AggregateFn::Count,
            "max" => AggregateFn::Max,
            "min" => AggregateFn::Min,
            "avg" => AggregateFn::Avg,
            "sum" => AggregateFn::Sum,
            _ => return None,
        })
    }

    pub fn sql_name(self) -> &'static str {
        match self {
            AggregateFn::Count => "COUNT",
            AggregateFn::Max => "MAX",
            AggregateFn::Min => "MIN",
            AggregateFn::Avg => "AVG",
            AggregateFn::Sum => "SUM",
        }
    }
}
