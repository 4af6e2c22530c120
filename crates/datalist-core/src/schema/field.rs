use std::fmt;

/// Storage type of a database column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    /// The auto-incrementing `ID` column
    PrimaryKey,

    /// The `ClassName` discriminator on root tables
    ClassName,

    /// `<Relation>ID` column owned by a has_one
    ForeignKey,

    /// `<Relation>Class` column owned by a polymorphic has_one
    ForeignClass,

    Boolean,
    Int,
    Decimal,
    Varchar,
    Text,
    Enum,
    Date,
    Datetime,
}

impl FieldType {
    /// Returns `true` when values of this type are stored as text.
    pub fn is_text(self) -> bool {
        matches!(
            self,
            FieldType::ClassName
                | FieldType::ForeignClass
                | FieldType::Varchar
                | FieldType::Text
                | FieldType::Enum
                | FieldType::Date
                | FieldType::Datetime
        )
    }

    /// Returns `true` for the columns maintained by relations.
    pub fn is_relation_key(self) -> bool {
        matches!(self, FieldType::ForeignKey | FieldType::ForeignClass)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldType::PrimaryKey => "PrimaryKey",
            FieldType::ClassName => "DBClassName",
            FieldType::ForeignKey => "ForeignKey",
            FieldType::ForeignClass => "DBClassName",
            FieldType::Boolean => "Boolean",
            FieldType::Int => "Int",
            FieldType::Decimal => "Decimal",
            FieldType::Varchar => "Varchar",
            FieldType::Text => "Text",
            FieldType::Enum => "Enum",
            FieldType::Date => "Date",
            FieldType::Datetime => "Datetime",
        };
        f.write_str(name)
    }
}
