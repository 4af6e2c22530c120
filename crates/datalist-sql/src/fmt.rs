use crate::{Flavor, Params};
use datalist_core::Value;

macro_rules! fmt {
    ($f:expr, $( $fragments:expr )*) => {{
        $(
            $fragments.to_sql($f);
        )*
    }};
}

pub(crate) struct Formatter<'a, P> {
    /// Where to write the serialized SQL
    pub(crate) dst: &'a mut String,

    /// Where to store parameters
    pub(crate) params: &'a mut P,

    pub(crate) flavor: Flavor,
}

pub(crate) trait ToSql {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>);
}

impl ToSql for &str {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        f.dst.push_str(self);
    }
}

impl ToSql for &String {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        f.dst.push_str(self);
    }
}

/// Comma delimited
pub(crate) struct Comma<L>(pub(crate) L);

impl<L> ToSql for Comma<L>
where
    L: IntoIterator,
    L::Item: ToSql,
{
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        let mut s = "";
        for i in self.0 {
            fmt!(f, s i);
            s = ", ";
        }
    }
}

/// A raw SQL fragment whose `?` placeholders bind `params` in order.
pub(crate) struct Fragment<'a>(pub(crate) &'a str, pub(crate) &'a [Value]);

impl ToSql for Fragment<'_> {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        let Fragment(sql, params) = self;
        let mut params = params.iter();
        let mut quote = None;

        for c in sql.chars() {
            match (c, quote) {
                ('\'' | '"' | '`', None) => quote = Some(c),
                (c, Some(q)) if c == q => quote = None,
                ('?', None) => {
                    if let Some(value) = params.next() {
                        let placeholder = f.params.push(value);
                        placeholder.to_sql(f);
                        continue;
                    }
                }
                _ => {}
            }
            f.dst.push(c);
        }

        // Surplus parameters are still bound so the driver reports the
        // mismatch instead of silently dropping values.
        for value in params {
            f.params.push(value);
        }
    }
}

/// A single bound value.
pub(crate) struct Param<'a>(pub(crate) &'a Value);

impl ToSql for Param<'_> {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        let placeholder = f.params.push(self.0);
        placeholder.to_sql(f);
    }
}
