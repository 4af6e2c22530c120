#[macro_use]
mod fmt;
use fmt::{Formatter, ToSql};

mod create_table;
pub use create_table::{ColumnDef, SqlCreateTable};

mod delete;
pub use delete::SqlDelete;

pub use datalist_core::driver::Flavor;

pub mod ident;

mod insert;
pub use insert::SqlInsert;

mod params;
pub use params::{Params, Placeholder, Positional};

mod predicate;
pub use predicate::{Condition, Connective, PredicateGroup, Where};

pub mod search;

pub mod select;
pub use select::{Clause, FromEntry, Join, JoinKind, SelectColumn, SqlSelect, SubGroup, UnionType};

mod update;
pub use update::SqlUpdate;

/// Renders a statement to SQL text, collecting bound parameters.
pub trait Statement {
    fn serialize(&self, flavor: Flavor, params: &mut impl Params) -> String;
}
