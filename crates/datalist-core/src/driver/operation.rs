use crate::Value;

/// A statement handed to a [`Connection`](super::Connection).
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// A statement returning rows
    QuerySql(Sql),

    /// A statement returning an affected-row count
    ExecSql(Sql),
}

/// Rendered SQL text with its bound parameters, in placeholder order.
#[derive(Debug, Clone, PartialEq)]
pub struct Sql {
    pub text: String,
    pub params: Vec<Value>,
}

impl Operation {
    pub fn sql(&self) -> &Sql {
        match self {
            Operation::QuerySql(sql) | Operation::ExecSql(sql) => sql,
        }
    }

    pub fn is_query(&self) -> bool {
        matches!(self, Operation::QuerySql(_))
    }
}
