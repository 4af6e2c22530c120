mod eval;

mod key;
pub use key::{Aggregate, AggregateFn, FilterKey, Matcher};

use crate::{Error, Record, Result, Value};

/// A filter specification: filter keys mapped to the values they match.
///
/// Keys follow the `Field[.Relation...][:Matcher][:modifier...]` grammar.
/// Values are scalars, lists (matching any member) or null.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    entries: Vec<(String, Value)>,
}

/// How the clauses of one filter call combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combine {
    /// `filter`: every clause must match
    All,

    /// `filter_any`: at least one clause must match
    Any,
}

/// A parsed filter tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Clause(FilterClause),
}

/// One `key => value` pair, parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterClause {
    pub key: FilterKey,
    pub value: Value,
}

impl Filter {
    pub fn new() -> Filter {
        Filter::default()
    }

    pub fn and(mut self, key: impl Into<String>, value: impl Into<Value>) -> Filter {
        self.entries.push((key.into(), value.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[(String, Value)] {
        &self.entries
    }

    /// Parses every entry, combining them per `combine`.
    pub fn to_predicate(&self, combine: Combine) -> Result<Predicate> {
        let clauses = self
            .entries
            .iter()
            .map(|(key, value)| FilterClause::parse(key, value.clone()).map(Predicate::Clause))
            .collect::<Result<Vec<_>>>()?;

        Ok(match combine {
            Combine::All => Predicate::And(clauses),
            Combine::Any => Predicate::Or(clauses),
        })
    }

    /// The predicate `exclude`/`exclude_any` apply.
    ///
    /// `exclude` removes rows matching every clause, so it keeps rows where
    /// any clause fails. `exclude_any` removes rows matching any clause, so
    /// every clause must fail.
    pub fn to_exclusion(&self, combine: Combine) -> Result<Predicate> {
        Ok(self.to_predicate(combine)?.negate())
    }
}

impl<K: Into<String>, V: Into<Value>> From<(K, V)> for Filter {
    fn from((key, value): (K, V)) -> Filter {
        Filter::new().and(key, value)
    }
}

impl<K: Into<String>, V: Into<Value>, const N: usize> From<[(K, V); N]> for Filter {
    fn from(src: [(K, V); N]) -> Filter {
        src.into_iter()
            .fold(Filter::new(), |filter, (key, value)| filter.and(key, value))
    }
}

impl<K: Into<String>, V: Into<Value>> From<Vec<(K, V)>> for Filter {
    fn from(src: Vec<(K, V)>) -> Filter {
        src.into_iter()
            .fold(Filter::new(), |filter, (key, value)| filter.and(key, value))
    }
}

impl From<Record> for Filter {
    fn from(src: Record) -> Filter {
        Filter {
            entries: src.into_iter().collect(),
        }
    }
}

impl Predicate {
    /// Pushes negation down to the clauses.
    pub fn negate(self) -> Predicate {
        match self {
            Predicate::And(items) => Predicate::Or(items.into_iter().map(Predicate::negate).collect()),
            Predicate::Or(items) => Predicate::And(items.into_iter().map(Predicate::negate).collect()),
            Predicate::Clause(clause) => Predicate::Clause(clause.negate()),
        }
    }

    /// Visits every clause in the tree.
    pub fn clauses(&self) -> Vec<&FilterClause> {
        match self {
            Predicate::And(items) | Predicate::Or(items) => {
                items.iter().flat_map(Predicate::clauses).collect()
            }
            Predicate::Clause(clause) => vec![clause],
        }
    }

    /// Evaluates the predicate against one materialized row.
    ///
    /// Only plain columns can be evaluated; relation paths and aggregates
    /// need joins and are rejected.
    pub fn eval(&self, record: &Record) -> Result<bool> {
        match self {
            Predicate::And(items) => {
                for item in items {
                    if !item.eval(record)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Predicate::Or(items) => {
                for item in items {
                    if item.eval(record)? {
                        return Ok(true);
                    }
                }
                Ok(items.is_empty())
            }
            Predicate::Clause(clause) => clause.eval(record),
        }
    }

    /// Fails unless every clause references a plain column.
    pub fn verify_in_memory(&self) -> Result<()> {
        for clause in self.clauses() {
            if !clause.key.is_plain() {
                return Err(Error::invalid_argument(format!(
                    "Can't filter by column \"{}\" on a materialized list",
                    clause.key.source
                )));
            }
        }
        Ok(())
    }
}

impl FilterClause {
    /// Parses a key and validates its value.
    pub fn parse(key: &str, value: Value) -> Result<FilterClause> {
        let key = FilterKey::parse(key)?;

        if let Value::List(items) = &value {
            if items.is_empty() && !key.negated {
                return Err(Error::invalid_argument(format!(
                    "Cannot filter \"{}\" against an empty set",
                    key.source
                )));
            }
        }

        Ok(FilterClause { key, value })
    }

    pub fn negate(mut self) -> FilterClause {
        self.key.negated = !self.key.negated;
        self
    }

    /// The operand values, a scalar being a one-item set.
    pub fn values(&self) -> Vec<&Value> {
        match &self.value {
            Value::List(items) => items.iter().collect(),
            value => vec![value],
        }
    }

    pub fn eval(&self, record: &Record) -> Result<bool> {
        eval::eval_clause(self, record)
    }
}
