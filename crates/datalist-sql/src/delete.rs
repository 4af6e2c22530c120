use crate::{ident, Connective, Flavor, Formatter, Params, PredicateGroup, Statement, ToSql, Where};

/// `DELETE FROM "Table" WHERE (...)`
#[derive(Debug, Clone, PartialEq)]
pub struct SqlDelete {
    table: String,
    where_: PredicateGroup,
}

impl SqlDelete {
    pub fn new(table: impl Into<String>) -> SqlDelete {
        SqlDelete {
            table: table.into(),
            where_: PredicateGroup::new(Connective::And),
        }
    }

    pub fn add_where(&mut self, predicate: impl Into<Where>) -> &mut Self {
        self.where_.push(predicate);
        self
    }
}

impl Statement for SqlDelete {
    fn serialize(&self, flavor: Flavor, params: &mut impl Params) -> String {
        let mut ret = String::new();
        let mut f = Formatter {
            dst: &mut ret,
            params,
            flavor,
        };

        let table = ident::quote(&self.table);
        fmt!(&mut f, "DELETE FROM " table.as_str());

        if !self.where_.is_empty() {
            let where_ = &self.where_;
            fmt!(&mut f, " WHERE " where_);
        }
        ret
    }
}
