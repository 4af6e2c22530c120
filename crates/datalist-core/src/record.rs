use crate::Value;
use indexmap::IndexMap;

/// One result row: column name to value, in select order.
pub type Record = IndexMap<String, Value>;

/// Returns the row's `ID` when it holds a usable identifier.
pub fn record_id(record: &Record) -> Option<i64> {
    record.get("ID").and_then(Value::to_id)
}
