/// SQL dialect differences that affect rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Flavor {
    #[default]
    Sqlite,
    Mysql,
    Postgresql,
}

impl Flavor {
    /// The LIMIT clause for an unlimited statement with an offset.
    pub fn unlimited_with_offset(self, offset: u64) -> String {
        match self {
            Flavor::Sqlite => format!("LIMIT -1 OFFSET {offset}"),
            Flavor::Mysql => format!("LIMIT {} OFFSET {offset}", u64::MAX),
            Flavor::Postgresql => format!("OFFSET {offset}"),
        }
    }

    /// Collation forcing case-sensitive or case-insensitive text comparison.
    pub fn collation(self, case_sensitive: bool) -> &'static str {
        match (self, case_sensitive) {
            (Flavor::Sqlite, true) => "BINARY",
            (Flavor::Sqlite, false) => "NOCASE",
            (Flavor::Mysql, true) => "utf8mb4_bin",
            (Flavor::Mysql, false) => "utf8mb4_general_ci",
            (Flavor::Postgresql, true) => "\"C\"",
            (Flavor::Postgresql, false) => "\"und-x-icu\"",
        }
    }
}
