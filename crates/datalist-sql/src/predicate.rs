use crate::fmt::Fragment;
use crate::{Formatter, Params, ToSql};
use datalist_core::Value;

/// A raw predicate with its bound parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Where {
    pub sql: String,
    pub params: Vec<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connective {
    And,
    Or,
}

/// A node in a WHERE or HAVING tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Clause(Where),
    Group(PredicateGroup),
}

/// Conditions combined with one connective.
#[derive(Debug, Clone, PartialEq)]
pub struct PredicateGroup {
    pub connective: Connective,
    pub conditions: Vec<Condition>,
}

impl Where {
    pub fn new(sql: impl Into<String>, params: impl IntoIterator<Item = impl Into<Value>>) -> Where {
        Where {
            sql: sql.into(),
            params: params.into_iter().map(Into::into).collect(),
        }
    }

    /// `column = ?`, or the predicate itself when it already has placeholders.
    fn keyed(sql: String, value: Value) -> Where {
        let params = match value {
            Value::List(items) => items,
            value => vec![value],
        };

        let sql = if sql.contains('?') {
            sql
        } else {
            format!("{sql} = ?")
        };

        Where { sql, params }
    }
}

impl From<&str> for Where {
    fn from(sql: &str) -> Where {
        Where {
            sql: sql.to_string(),
            params: vec![],
        }
    }
}

impl From<String> for Where {
    fn from(sql: String) -> Where {
        Where { sql, params: vec![] }
    }
}

/// `("\"ID\"", 5)` renders `"ID" = ?`; `("\"ID\" IN (?, ?)", vec![1, 2])`
/// binds both values.
impl<V: Into<Value>> From<(&str, V)> for Where {
    fn from((sql, value): (&str, V)) -> Where {
        Where::keyed(sql.to_string(), value.into())
    }
}

impl<V: Into<Value>> From<(String, V)> for Where {
    fn from((sql, value): (String, V)) -> Where {
        Where::keyed(sql, value.into())
    }
}

impl PredicateGroup {
    pub fn new(connective: Connective) -> PredicateGroup {
        PredicateGroup {
            connective,
            conditions: vec![],
        }
    }

    /// Returns `true` when rendering would produce nothing.
    pub fn is_empty(&self) -> bool {
        self.conditions.iter().all(|condition| match condition {
            Condition::Clause(_) => false,
            Condition::Group(group) => group.is_empty(),
        })
    }

    pub fn push(&mut self, predicate: impl Into<Where>) {
        self.conditions.push(Condition::Clause(predicate.into()));
    }

    pub fn push_condition(&mut self, condition: Condition) {
        self.conditions.push(condition);
    }

    /// Adds `(a) OR (b)` as a single condition.
    pub fn push_any(&mut self, predicates: impl IntoIterator<Item = impl Into<Where>>) {
        let mut group = PredicateGroup::new(Connective::Or);
        for predicate in predicates {
            group.push(predicate);
        }
        self.conditions.push(Condition::Group(group));
    }

    pub fn clear(&mut self) {
        self.conditions.clear();
    }

    /// Top-level clauses, ignoring nested groups.
    pub fn clauses(&self) -> impl Iterator<Item = &Where> {
        self.conditions.iter().filter_map(|condition| match condition {
            Condition::Clause(clause) => Some(clause),
            Condition::Group(_) => None,
        })
    }
}

impl ToSql for &PredicateGroup {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        let separator = match self.connective {
            Connective::And => " AND ",
            Connective::Or => " OR ",
        };

        let mut s = "";
        for condition in &self.conditions {
            match condition {
                Condition::Clause(clause) => {
                    fmt!(f, s "(" Fragment(&clause.sql, &clause.params) ")");
                }
                Condition::Group(group) if group.is_empty() => continue,
                Condition::Group(group) => {
                    fmt!(f, s "(" group ")");
                }
            }
            s = separator;
        }
    }
}
