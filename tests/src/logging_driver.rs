use datalist_core::{
    driver::{Connection, Driver, Flavor, Operation, Response},
    Result, Schema,
};
use std::{
    borrow::Cow,
    sync::{Arc, Mutex},
};

#[derive(Debug)]
pub struct LoggingDriver {
    inner: Box<dyn Driver>,

    /// Log of all operations executed through this driver
    ops_log: Arc<Mutex<Vec<DriverOp>>>,
}

impl LoggingDriver {
    pub fn new(driver: Box<dyn Driver>) -> Self {
        Self {
            inner: driver,
            ops_log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Get a handle to access the operations log
    pub fn ops_log_handle(&self) -> Arc<Mutex<Vec<DriverOp>>> {
        self.ops_log.clone()
    }
}

impl Driver for LoggingDriver {
    fn url(&self) -> Cow<'_, str> {
        self.inner.url()
    }

    fn flavor(&self) -> Flavor {
        self.inner.flavor()
    }

    fn connect(&self) -> Result<Box<dyn Connection>> {
        Ok(Box::new(LoggingConnection {
            inner: self.inner.connect()?,
            ops_log: self.ops_log_handle(),
        }))
    }
}

#[derive(Debug)]
pub struct DriverOp {
    pub operation: Operation,
    pub response: Response,
}

/// A connection wrapper that records every statement it runs.
#[derive(Debug)]
pub struct LoggingConnection {
    inner: Box<dyn Connection>,
    ops_log: Arc<Mutex<Vec<DriverOp>>>,
}

impl Connection for LoggingConnection {
    fn flavor(&self) -> Flavor {
        self.inner.flavor()
    }

    fn exec(&mut self, operation: Operation) -> Result<Response> {
        let operation_clone = operation.clone();
        let response = self.inner.exec(operation)?;

        self.ops_log
            .lock()
            .expect("Failed to acquire ops log lock")
            .push(DriverOp {
                operation: operation_clone,
                response: response.clone(),
            });

        Ok(response)
    }

    fn push_schema(&mut self, schema: &Schema) -> Result<()> {
        self.inner.push_schema(schema)
    }
}
