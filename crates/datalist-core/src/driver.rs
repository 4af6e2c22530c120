mod flavor;
pub use flavor::Flavor;

mod operation;
pub use operation::{Operation, Sql};

mod response;
pub use response::{Response, Rows};

use crate::{Result, Schema};
use std::{borrow::Cow, fmt::Debug};

/// Opens connections to one database.
pub trait Driver: Debug + Send + Sync + 'static {
    /// The URL the driver was created from.
    fn url(&self) -> Cow<'_, str>;

    /// The SQL dialect statements must be rendered in.
    fn flavor(&self) -> Flavor;

    fn connect(&self) -> Result<Box<dyn Connection>>;
}

/// A single open connection. Statements run one at a time.
pub trait Connection: Debug + Send + 'static {
    fn flavor(&self) -> Flavor;

    /// Executes a rendered statement.
    fn exec(&mut self, operation: Operation) -> Result<Response>;

    /// Creates the tables the schema describes.
    fn push_schema(&mut self, schema: &Schema) -> Result<()>;
}
