use crate::{Error, Result};

/// The `length` argument of `limit(length, offset)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LimitLength {
    /// No LIMIT clause
    #[default]
    Unlimited,

    Rows(i64),

    /// `limit(false)`: return no rows
    Disabled,
}

/// A validated limit and offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Limit {
    /// `None` for unlimited
    pub length: Option<u64>,
    pub offset: u64,
}

impl Limit {
    /// Validates both arguments, failing on negative values.
    pub fn new(length: impl Into<LimitLength>, offset: i64) -> Result<Limit> {
        let length = match length.into() {
            LimitLength::Unlimited => None,
            LimitLength::Disabled => Some(0),
            LimitLength::Rows(rows) if rows < 0 => {
                return Err(Error::invalid_argument(format!(
                    "Limit length must be non-negative, got {rows}"
                )))
            }
            LimitLength::Rows(rows) => Some(rows as u64),
        };

        if offset < 0 {
            return Err(Error::invalid_argument(format!(
                "Limit offset must be non-negative, got {offset}"
            )));
        }

        Ok(Limit {
            length,
            offset: offset as u64,
        })
    }

    /// Parses the `"N"` and `"N OFFSET M"` string forms.
    pub fn parse(src: &str) -> Result<Limit> {
        let invalid = || Error::invalid_argument(format!("Invalid limit \"{src}\""));
        let upper = src.trim().to_ascii_uppercase();

        let (length, offset) = match upper.split_once("OFFSET") {
            Some((length, offset)) => (length.trim(), offset.trim()),
            None => (upper.as_str(), "0"),
        };

        let length = length.parse::<i64>().map_err(|_| invalid())?;
        let offset = offset.parse::<i64>().map_err(|_| invalid())?;
        Limit::new(LimitLength::Rows(length), offset)
    }

    pub fn is_unlimited(&self) -> bool {
        self.length.is_none() && self.offset == 0
    }

    /// Slices an in-memory row set.
    pub fn apply<T>(&self, rows: Vec<T>) -> Vec<T> {
        let iter = rows.into_iter().skip(self.offset as usize);
        match self.length {
            Some(length) => iter.take(length as usize).collect(),
            None => iter.collect(),
        }
    }
}

impl From<Option<i64>> for LimitLength {
    fn from(src: Option<i64>) -> LimitLength {
        match src {
            Some(rows) => LimitLength::Rows(rows),
            None => LimitLength::Unlimited,
        }
    }
}

impl From<i64> for LimitLength {
    fn from(src: i64) -> LimitLength {
        LimitLength::Rows(src)
    }
}

/// `false` disables the list, `true` leaves it unlimited.
impl From<bool> for LimitLength {
    fn from(src: bool) -> LimitLength {
        if src {
            LimitLength::Unlimited
        } else {
            LimitLength::Disabled
        }
    }
}
