use crate::fmt::Comma;
use crate::{ident, Flavor, Formatter, Params, Statement, ToSql};
use datalist_core::schema::{FieldType, Relation};
use datalist_core::Schema;

/// `CREATE TABLE IF NOT EXISTS "Table" (...)`
#[derive(Debug, Clone, PartialEq)]
pub struct SqlCreateTable {
    table: String,
    columns: Vec<ColumnDef>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    pub name: String,
    pub ty: FieldType,

    /// Only set on a root table's `ID`; subclass tables reuse the base ID
    pub auto_increment: bool,
}

impl SqlCreateTable {
    pub fn new(table: impl Into<String>) -> SqlCreateTable {
        SqlCreateTable {
            table: table.into(),
            columns: vec![],
        }
    }

    pub fn column(&mut self, name: impl Into<String>, ty: FieldType) -> &mut Self {
        let auto_increment = false;
        self.columns.push(ColumnDef {
            name: name.into(),
            ty,
            auto_increment,
        });
        self
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// One statement per model table, followed by the many_many join tables.
    pub fn for_schema(schema: &Schema) -> Vec<SqlCreateTable> {
        let mut ret = vec![];

        for model in schema.models() {
            let mut stmt = SqlCreateTable::new(&model.table);

            if !model.is_base() {
                stmt.column("ID", FieldType::PrimaryKey);
            }

            for (name, ty) in &model.fields {
                stmt.column(name, *ty);
            }

            if let Some(id) = stmt.columns.iter_mut().find(|column| column.name == "ID") {
                id.auto_increment = model.is_base();
            }

            ret.push(stmt);
        }

        for model in schema.models() {
            for relation in model.relations.values() {
                let Relation::ManyMany(many_many) = relation else {
                    continue;
                };

                let mut stmt = SqlCreateTable::new(&many_many.join_table);
                stmt.column("ID", FieldType::PrimaryKey)
                    .column(&many_many.parent_key, FieldType::ForeignKey)
                    .column(&many_many.child_key, FieldType::ForeignKey);
                for (name, ty) in &many_many.extra_fields {
                    stmt.column(name, *ty);
                }
                stmt.columns[0].auto_increment = true;
                ret.push(stmt);
            }
        }

        ret
    }
}

impl ColumnDef {
    fn to_sql_string(&self, flavor: Flavor) -> String {
        let name = ident::quote(&self.name);

        if self.ty == FieldType::PrimaryKey {
            let definition = match (flavor, self.auto_increment) {
                (Flavor::Sqlite, _) => "INTEGER PRIMARY KEY",
                (Flavor::Mysql, true) => "INT NOT NULL AUTO_INCREMENT PRIMARY KEY",
                (Flavor::Mysql, false) => "INT NOT NULL PRIMARY KEY",
                (Flavor::Postgresql, true) => "SERIAL PRIMARY KEY",
                (Flavor::Postgresql, false) => "INTEGER PRIMARY KEY",
            };
            return format!("{name} {definition}");
        }

        let ty = match (flavor, self.ty) {
            (Flavor::Sqlite, ty) if ty.is_text() => "TEXT COLLATE NOCASE",
            (Flavor::Sqlite, FieldType::Decimal) => "REAL",
            (Flavor::Sqlite, _) => "INTEGER",

            (_, FieldType::Boolean) => "BOOLEAN",
            (_, FieldType::Int | FieldType::ForeignKey | FieldType::PrimaryKey) => "INTEGER",
            (_, FieldType::Decimal) => "DECIMAL(9, 2)",
            (_, FieldType::Date) => "DATE",
            (Flavor::Mysql, FieldType::Datetime) => "DATETIME",
            (_, FieldType::Datetime) => "TIMESTAMP",
            (Flavor::Mysql, FieldType::Text) => "TEXT",
            (Flavor::Mysql, _) => "VARCHAR(255)",
            (Flavor::Postgresql, _) => "TEXT",
        };

        format!("{name} {ty}")
    }
}

impl Statement for SqlCreateTable {
    fn serialize(&self, flavor: Flavor, params: &mut impl Params) -> String {
        let mut ret = String::new();
        let mut f = Formatter {
            dst: &mut ret,
            params,
            flavor,
        };

        let table = ident::quote(&self.table);
        let columns: Vec<String> = self
            .columns
            .iter()
            .map(|column| column.to_sql_string(flavor))
            .collect();

        fmt!(
            &mut f,
            "CREATE TABLE IF NOT EXISTS " table.as_str() " (" Comma(columns.iter()) ")"
        );
        ret
    }
}
