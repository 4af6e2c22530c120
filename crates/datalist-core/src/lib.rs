#[macro_use]
mod macros;

pub mod collation;
pub mod driver;

mod error;
pub use error::{Error, IntoError};

pub mod filter;
pub use filter::{Combine, Filter, FilterClause, FilterKey, Matcher, Predicate};

mod limit;
pub use limit::{Limit, LimitLength};

mod record;
pub use record::{record_id, Record};

pub mod schema;
pub use schema::Schema;

pub mod sort;
pub use sort::{Direction, IntoSort, SortSpec, SortTerm};

mod value;
pub use value::Value;

/// A Result type alias that uses datalist's [`Error`] type.
pub type Result<T> = core::result::Result<T, Error>;
