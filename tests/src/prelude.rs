//! Common imports for test files
//!
//! `use tests::prelude::*;`

pub use crate::fixtures::{
    insert, items_db, items_schema, league_schema, seed_league, three_items, DbTest,
};
pub use crate::{assert_err, assert_none, assert_ok, assert_some, ExecLog};

pub use datalist::{
    AnyList, DataList, DataObject, Db, EagerData, EagerLoadedList, List, ListShape, Record,
    Value,
};
pub use datalist_core::record;
