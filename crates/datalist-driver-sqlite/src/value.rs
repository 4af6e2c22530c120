use datalist_core::Value as CoreValue;
use rusqlite::{
    types::{ToSql, ToSqlOutput, Value as SqlValue, ValueRef},
    Row,
};

#[derive(Debug)]
pub struct Value(CoreValue);

impl From<CoreValue> for Value {
    fn from(value: CoreValue) -> Self {
        Self(value)
    }
}

impl Value {
    pub fn into_inner(self) -> CoreValue {
        self.0
    }

    /// Reads column `index` of a row. SQLite carries no declared type on the
    /// value, so integers stay integers and booleans read back as 0 or 1.
    pub fn from_sql(row: &Row, index: usize) -> rusqlite::Result<Self> {
        let core_value = match row.get_ref(index)? {
            ValueRef::Null => CoreValue::Null,
            ValueRef::Integer(value) => CoreValue::Int(value),
            ValueRef::Real(value) => CoreValue::Float(value),
            ValueRef::Text(value) | ValueRef::Blob(value) => {
                CoreValue::String(String::from_utf8_lossy(value).into_owned())
            }
        };

        Ok(Value(core_value))
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match &self.0 {
            CoreValue::Null => Ok(ToSqlOutput::Owned(SqlValue::Null)),
            CoreValue::Bool(v) => Ok(ToSqlOutput::Owned(SqlValue::Integer(*v as i64))),
            CoreValue::Int(v) => Ok(ToSqlOutput::Owned(SqlValue::Integer(*v))),
            CoreValue::Float(v) => Ok(ToSqlOutput::Owned(SqlValue::Real(*v))),
            CoreValue::String(v) => Ok(ToSqlOutput::Borrowed(ValueRef::Text(v.as_bytes()))),
            CoreValue::List(_) => Err(rusqlite::Error::ToSqlConversionFailure(
                format!("a list cannot be bound as a single parameter; value={:?}", self.0).into(),
            )),
        }
    }
}
