use super::{Cache, Config, Connect, Db, Shared};
use datalist_core::{driver::Driver, Error, Result, Schema};
use std::sync::{Arc, Mutex};

#[derive(Debug)]
pub struct Builder {
    schema: Option<Arc<Schema>>,
    config: Config,
}

impl Default for Builder {
    fn default() -> Builder {
        Builder {
            schema: None,
            config: Config {
                max_eager_load_depth: 3,
            },
        }
    }
}

impl Builder {
    /// The models lists are built over.
    pub fn schema(&mut self, schema: Schema) -> &mut Self {
        self.schema = Some(Arc::new(schema));
        self
    }

    /// Deepest relation path accepted by `eager_load`. Defaults to 3.
    pub fn max_eager_load_depth(&mut self, depth: usize) -> &mut Self {
        self.config.max_eager_load_depth = depth;
        self
    }

    /// Connects to the database at `url`, e.g. `sqlite::memory:`.
    pub fn connect(&mut self, url: &str) -> Result<Db> {
        self.build(Connect::new(url)?)
    }

    pub fn build(&mut self, driver: impl Driver) -> Result<Db> {
        let Some(schema) = self.schema.clone() else {
            return Err(Error::invalid_schema(
                "a schema must be set before connecting",
            ));
        };

        let connection = driver.connect()?;
        let flavor = connection.flavor();

        Ok(Db {
            shared: Arc::new(Shared {
                schema,
                config: self.config,
                flavor,
                connection: Mutex::new(connection),
                cache: Cache::default(),
            }),
        })
    }
}
