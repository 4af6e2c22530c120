use crate::{Flavor, Formatter, ToSql};
use datalist_core::Value;

pub trait Params {
    fn push(&mut self, param: &Value) -> Placeholder;
}

/// One-based position of a bound parameter. Zero renders a bare `?` in
/// every flavor.
pub struct Placeholder(pub usize);

/// Collects parameters for SQL that is embedded in another statement.
///
/// Placeholders always render as `?` so the outer statement can renumber
/// them when it binds the collected values.
#[derive(Debug, Default)]
pub struct Positional(pub Vec<Value>);

impl Params for Vec<Value> {
    fn push(&mut self, value: &Value) -> Placeholder {
        self.push(value.clone());
        Placeholder(self.len())
    }
}

impl Params for Positional {
    fn push(&mut self, value: &Value) -> Placeholder {
        self.0.push(value.clone());
        Placeholder(0)
    }
}

impl ToSql for Placeholder {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        match f.flavor {
            Flavor::Sqlite | Flavor::Mysql => f.dst.push('?'),
            Flavor::Postgresql if self.0 == 0 => f.dst.push('?'),
            Flavor::Postgresql => {
                f.dst.push('$');
                f.dst.push_str(&self.0.to_string());
            }
        }
    }
}
