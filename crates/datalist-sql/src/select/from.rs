use super::SqlSelect;
use crate::ident;
use datalist_core::Value;
use regex::Regex;
use std::sync::LazyLock;

/// Default position of a join among the other joins.
pub const DEFAULT_JOIN_ORDER: i32 = 20;

/// One entry of the FROM map, keyed by alias.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum FromItem {
    /// A table reference or join clause, rendered verbatim
    Raw(String),

    Join(Join),

    /// `(SELECT ...) AS "alias"`
    Subquery(Box<SqlSelect>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub kind: JoinKind,

    /// Table name, or a parenthesized sub-select
    pub table: String,

    /// ON clause, may contain `?` placeholders
    pub on: String,

    /// Position among joins; equal orders keep insertion order
    pub order: i32,

    pub params: Vec<Value>,
}

/// An argument to `set_from`/`add_from`.
#[derive(Debug, Clone, PartialEq)]
pub struct FromEntry {
    pub alias: String,
    pub clause: String,
}

impl Join {
    pub fn new(kind: JoinKind, table: &str, on: impl Into<String>) -> Join {
        Join {
            kind,
            table: table.to_string(),
            on: on.into(),
            order: DEFAULT_JOIN_ORDER,
            params: vec![],
        }
    }

    /// Position among the other joins; lower orders render first.
    pub fn order(mut self, order: i32) -> Join {
        self.order = order;
        self
    }

    pub fn params(mut self, params: impl IntoIterator<Item = impl Into<Value>>) -> Join {
        self.params = params.into_iter().map(Into::into).collect();
        self
    }

    pub(crate) fn table_sql(&self) -> String {
        if self.table.to_ascii_uppercase().contains("SELECT") {
            self.table.clone()
        } else {
            ident::quote(&self.table)
        }
    }
}

impl JoinKind {
    pub fn as_sql(self) -> &'static str {
        match self {
            JoinKind::Inner => "INNER",
            JoinKind::Left => "LEFT",
            JoinKind::Right => "RIGHT",
        }
    }
}

impl FromItem {
    /// Returns `true` for items rendered after the comma-separated tables.
    pub(crate) fn is_join(&self) -> bool {
        static JOIN: LazyLock<Regex> =
            LazyLock::new(|| Regex::new(r"(?i)^.*? JOIN ").unwrap());

        match self {
            FromItem::Raw(clause) => JOIN.is_match(clause),
            FromItem::Join(_) => true,
            FromItem::Subquery(_) => false,
        }
    }

    pub(crate) fn join_order(&self) -> i32 {
        match self {
            FromItem::Join(join) => join.order,
            _ => DEFAULT_JOIN_ORDER,
        }
    }
}

/// `"MyTable"`: the alias is the name with quotes stripped.
impl From<&str> for FromEntry {
    fn from(clause: &str) -> FromEntry {
        FromEntry {
            alias: ident::unquote(clause.trim()),
            clause: clause.to_string(),
        }
    }
}

impl From<String> for FromEntry {
    fn from(clause: String) -> FromEntry {
        FromEntry::from(clause.as_str())
    }
}

/// `("alias", "clause")`
impl From<(&str, &str)> for FromEntry {
    fn from((alias, clause): (&str, &str)) -> FromEntry {
        FromEntry {
            alias: alias.to_string(),
            clause: clause.to_string(),
        }
    }
}

impl From<(String, String)> for FromEntry {
    fn from((alias, clause): (String, String)) -> FromEntry {
        FromEntry { alias, clause }
    }
}
