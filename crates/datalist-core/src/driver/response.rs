use crate::Record;

#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub rows: Rows,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Rows {
    /// Number of rows affected by an insert, update or delete
    Count {
        affected: u64,

        /// Row ID assigned by the last insert, if any
        last_insert_id: Option<i64>,
    },

    Values(Vec<Record>),
}

impl Response {
    pub fn count(affected: u64, last_insert_id: Option<i64>) -> Response {
        Response {
            rows: Rows::Count {
                affected,
                last_insert_id,
            },
        }
    }

    pub fn values(records: Vec<Record>) -> Response {
        Response {
            rows: Rows::Values(records),
        }
    }

    /// The returned rows; a count response yields none.
    pub fn into_records(self) -> Vec<Record> {
        match self.rows {
            Rows::Values(records) => records,
            Rows::Count { .. } => vec![],
        }
    }

    pub fn last_insert_id(&self) -> Option<i64> {
        match self.rows {
            Rows::Count { last_insert_id, .. } => last_insert_id,
            Rows::Values(_) => None,
        }
    }
}
