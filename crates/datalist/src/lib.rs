pub mod db;
pub use db::Db;

mod list;
pub use list::{AnyList, DataList, EagerData, EagerLoadedList, JoinMeta, List, ListShape};

mod object;
pub use object::DataObject;

pub mod query;
pub use query::DataQuery;

pub use datalist_core::{
    bail, driver, err, record, schema, Direction, Error, Filter, LimitLength, Record, Result,
    Schema, SortSpec, Value,
};

pub use datalist_sql::Where;
