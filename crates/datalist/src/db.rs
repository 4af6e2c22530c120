mod builder;
pub use builder::Builder;

mod cache;
use cache::Cache;

mod connect;
pub use connect::Connect;

mod write;

use crate::{list::List, DataList, DataObject, Result};
use datalist_core::{
    driver::{Connection, Flavor, Operation, Response, Sql},
    err, Filter, Record, Schema,
};
use datalist_sql::Statement;
use std::{
    fmt,
    sync::{Arc, Mutex},
};
use tracing::debug;

/// Shared state between all `Db` clones.
struct Shared {
    schema: Arc<Schema>,
    config: Config,
    flavor: Flavor,
    connection: Mutex<Box<dyn Connection>>,
    cache: Cache,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Config {
    /// Deepest relation path `eager_load` accepts
    pub(crate) max_eager_load_depth: usize,
}

/// A database handle.
///
/// Owns the schema, the configuration and one connection. Cloning is cheap
/// and every clone shares the same connection; statements run one at a time.
#[derive(Clone)]
pub struct Db {
    shared: Arc<Shared>,
}

impl Db {
    pub fn builder() -> Builder {
        Builder::default()
    }

    pub fn schema(&self) -> &Schema {
        &self.shared.schema
    }

    pub(crate) fn schema_arc(&self) -> Arc<Schema> {
        self.shared.schema.clone()
    }

    /// The SQL dialect of the underlying connection.
    pub fn flavor(&self) -> Flavor {
        self.shared.flavor
    }

    pub fn max_eager_load_depth(&self) -> usize {
        self.shared.config.max_eager_load_depth
    }

    /// Every record of `class`, subclasses included.
    pub fn list(&self, class: &str) -> Result<DataList> {
        DataList::new(self.clone(), class)
    }

    /// Creates the tables the schema describes.
    pub fn push_schema(&self) -> Result<()> {
        let schema = self.shared.schema.clone();
        self.connection()?.push_schema(&schema)
    }

    /// Runs a SELECT, returning its rows.
    pub fn query(&self, statement: &impl Statement) -> Result<Vec<Record>> {
        let sql = self.render(statement);
        let response = self.run(Operation::QuerySql(sql))?;
        Ok(response.into_records())
    }

    /// Runs an INSERT, UPDATE or DELETE.
    pub fn execute(&self, statement: &impl Statement) -> Result<Response> {
        let sql = self.render(statement);
        self.run(Operation::ExecSql(sql))
    }

    fn render(&self, statement: &impl Statement) -> Sql {
        let mut params = vec![];
        let text = statement.serialize(self.flavor(), &mut params);
        Sql { text, params }
    }

    fn run(&self, operation: Operation) -> Result<Response> {
        let sql = operation.sql();
        debug!(sql = %sql.text, params = sql.params.len(), "datalist.exec");

        self.connection()?.exec(operation)
    }

    fn connection(&self) -> Result<std::sync::MutexGuard<'_, Box<dyn Connection>>> {
        self.shared
            .connection
            .lock()
            .map_err(|_| err!("database connection lock poisoned"))
    }

    /// The first record of `class` matching `filter`.
    ///
    /// With `cache` set, results (including misses) are remembered per class
    /// and filter until [`Db::flush_cache`]. A cached record does not see
    /// writes made after it was loaded.
    pub fn get_one(
        &self,
        class: &str,
        filter: impl Into<Filter>,
        cache: bool,
    ) -> Result<Option<DataObject>> {
        let filter = filter.into();
        let key = Cache::key(class, &filter);

        if cache {
            if let Some(hit) = self.shared.cache.get(&key)? {
                debug!(class, key = %key, "datalist.get_one cache hit");
                return hit
                    .map(|record| DataObject::revive(class, record, Some(self)))
                    .transpose();
            }
        }

        let object = self.list(class)?.filter(filter)?.first()?;

        if cache {
            let record = object.as_ref().map(|object| object.record().clone());
            self.shared.cache.insert(key, record)?;
        }

        Ok(object)
    }

    /// Looks up one record by primary key.
    pub fn get_by_id(&self, class: &str, id: i64) -> Result<Option<DataObject>> {
        self.list(class)?.by_id(id)
    }

    /// Forgets every record remembered by [`Db::get_one`].
    pub fn flush_cache(&self) -> Result<()> {
        self.shared.cache.clear()
    }
}

impl fmt::Debug for Db {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Db")
            .field("flavor", &self.shared.flavor)
            .field("config", &self.shared.config)
            .finish_non_exhaustive()
    }
}
