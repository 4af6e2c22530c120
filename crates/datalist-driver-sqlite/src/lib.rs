mod value;
pub(crate) use value::Value;

use datalist_core::{
    driver::{Driver, Flavor, Operation, Response},
    Error, Record, Result, Schema,
};
use datalist_sql::{SqlCreateTable, Statement};
use rusqlite::Connection as RusqliteConnection;
use std::{
    borrow::Cow,
    path::{Path, PathBuf},
};
use tracing::trace;
use url::Url;

#[derive(Debug)]
pub enum Sqlite {
    File(PathBuf),
    InMemory,
}

impl Sqlite {
    /// Create a new SQLite driver with an arbitrary connection URL
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let url_str = url.into();
        let url = Url::parse(&url_str).map_err(Error::driver)?;

        if url.scheme() != "sqlite" {
            return Err(Error::invalid_argument(format!(
                "connection URL does not have a `sqlite` scheme; url={url_str}"
            )));
        }

        if url.path() == ":memory:" {
            Ok(Self::InMemory)
        } else {
            Ok(Self::File(PathBuf::from(url.path())))
        }
    }

    /// Create an in-memory SQLite database
    pub fn in_memory() -> Self {
        Self::InMemory
    }

    /// Open a SQLite database at the specified file path
    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        Self::File(path.as_ref().to_path_buf())
    }
}

impl Driver for Sqlite {
    fn url(&self) -> Cow<'_, str> {
        match self {
            Sqlite::InMemory => Cow::Borrowed("sqlite::memory:"),
            Sqlite::File(path) => Cow::Owned(format!("sqlite:{}", path.display())),
        }
    }

    fn flavor(&self) -> Flavor {
        Flavor::Sqlite
    }

    fn connect(&self) -> Result<Box<dyn datalist_core::driver::Connection>> {
        let connection = match self {
            Sqlite::File(path) => Connection::open(path)?,
            Sqlite::InMemory => Connection::in_memory()?,
        };
        Ok(Box::new(connection))
    }
}

#[derive(Debug)]
pub struct Connection {
    connection: RusqliteConnection,
}

impl Connection {
    /// Each in-memory connection is a fresh, empty database.
    pub fn in_memory() -> Result<Self> {
        let connection = RusqliteConnection::open_in_memory().map_err(Error::driver)?;
        Ok(Self { connection })
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let connection = RusqliteConnection::open(path).map_err(Error::driver)?;
        Ok(Self { connection })
    }

    fn query(&mut self, sql: &str, params: Vec<Value>) -> Result<Vec<Record>> {
        let mut stmt = self.connection.prepare_cached(sql).map_err(Error::driver)?;

        let columns: Vec<String> = stmt
            .column_names()
            .into_iter()
            .map(str::to_string)
            .collect();

        let mut rows = stmt
            .query(rusqlite::params_from_iter(params.iter()))
            .map_err(Error::driver)?;

        let mut ret = vec![];

        loop {
            match rows.next() {
                Ok(Some(row)) => {
                    let mut record = Record::with_capacity(columns.len());
                    for (index, column) in columns.iter().enumerate() {
                        let value = Value::from_sql(row, index).map_err(Error::driver)?;
                        // Later columns of the same name win, as with `SELECT *` over joins.
                        record.insert(column.clone(), value.into_inner());
                    }
                    ret.push(record);
                }
                Ok(None) => break,
                Err(err) => return Err(Error::driver(err)),
            }
        }

        Ok(ret)
    }

    fn execute(&mut self, sql: &str, params: Vec<Value>) -> Result<Response> {
        let mut stmt = self.connection.prepare_cached(sql).map_err(Error::driver)?;

        let count = stmt
            .execute(rusqlite::params_from_iter(params.iter()))
            .map_err(Error::driver)?;

        let last_insert_id = Some(self.connection.last_insert_rowid()).filter(|id| *id > 0);
        Ok(Response::count(count as u64, last_insert_id))
    }
}

impl datalist_core::driver::Connection for Connection {
    fn flavor(&self) -> Flavor {
        Flavor::Sqlite
    }

    fn exec(&mut self, operation: Operation) -> Result<Response> {
        match operation {
            Operation::QuerySql(sql) => {
                let params = sql.params.into_iter().map(Value::from).collect();
                Ok(Response::values(self.query(&sql.text, params)?))
            }
            Operation::ExecSql(sql) => {
                let params = sql.params.into_iter().map(Value::from).collect();
                self.execute(&sql.text, params)
            }
        }
    }

    fn push_schema(&mut self, schema: &Schema) -> Result<()> {
        for table in SqlCreateTable::for_schema(schema) {
            let mut params: Vec<datalist_core::Value> = vec![];
            let stmt = table.serialize(Flavor::Sqlite, &mut params);
            debug_assert!(params.is_empty());

            trace!(table = table.table(), "datalist.sqlite create_table");
            self.connection.execute(&stmt, []).map_err(Error::driver)?;
        }

        Ok(())
    }
}
