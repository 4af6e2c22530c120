use crate::fmt::Param;
use crate::{ident, Connective, Flavor, Formatter, Params, PredicateGroup, Statement, ToSql, Where};
use datalist_core::{Record, Value};

/// `UPDATE "Table" SET "A" = ? WHERE (...)`
#[derive(Debug, Clone, PartialEq)]
pub struct SqlUpdate {
    table: String,
    assignments: Record,
    where_: PredicateGroup,
}

impl SqlUpdate {
    pub fn new(table: impl Into<String>) -> SqlUpdate {
        SqlUpdate {
            table: table.into(),
            assignments: Record::new(),
            where_: PredicateGroup::new(Connective::And),
        }
    }

    pub fn assign(&mut self, column: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.assignments.insert(column.into(), value.into());
        self
    }

    pub fn add_where(&mut self, predicate: impl Into<Where>) -> &mut Self {
        self.where_.push(predicate);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }
}

impl Statement for SqlUpdate {
    fn serialize(&self, flavor: Flavor, params: &mut impl Params) -> String {
        let mut ret = String::new();
        let mut f = Formatter {
            dst: &mut ret,
            params,
            flavor,
        };

        let table = ident::quote(&self.table);
        fmt!(&mut f, "UPDATE " table.as_str() " SET ");

        let mut s = "";
        for (column, value) in &self.assignments {
            let column = ident::quote(column);
            fmt!(&mut f, s column.as_str() " = " Param(value));
            s = ", ";
        }

        if !self.where_.is_empty() {
            let where_ = &self.where_;
            fmt!(&mut f, " WHERE " where_);
        }
        ret
    }
}
