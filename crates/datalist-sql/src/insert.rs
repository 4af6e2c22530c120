use crate::fmt::{Comma, Param};
use crate::{ident, Flavor, Formatter, Params, Statement, ToSql};
use datalist_core::{Record, Value};

/// `INSERT INTO "Table" ("A", "B") VALUES (?, ?)`
#[derive(Debug, Clone, PartialEq)]
pub struct SqlInsert {
    table: String,
    row: Record,
}

impl SqlInsert {
    pub fn new(table: impl Into<String>) -> SqlInsert {
        SqlInsert {
            table: table.into(),
            row: Record::new(),
        }
    }

    pub fn assign(&mut self, column: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.row.insert(column.into(), value.into());
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn is_empty(&self) -> bool {
        self.row.is_empty()
    }
}

impl Statement for SqlInsert {
    fn serialize(&self, flavor: Flavor, params: &mut impl Params) -> String {
        let mut ret = String::new();
        let mut f = Formatter {
            dst: &mut ret,
            params,
            flavor,
        };

        let table = ident::quote(&self.table);

        if self.row.is_empty() {
            fmt!(&mut f, "INSERT INTO " table.as_str() " DEFAULT VALUES");
            return ret;
        }

        let columns: Vec<String> = self.row.keys().map(|column| ident::quote(column)).collect();
        fmt!(
            &mut f,
            "INSERT INTO " table.as_str()
            " (" Comma(columns.iter()) ")"
            " VALUES (" Comma(self.row.values().map(Param)) ")"
        );
        ret
    }
}
