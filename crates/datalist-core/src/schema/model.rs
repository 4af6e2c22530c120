use super::{FieldType, Relation};
use indexmap::IndexMap;
use std::fmt;

#[derive(Debug, Clone)]
pub struct Model {
    /// Uniquely identifies the model within the schema
    pub id: ModelId,

    /// Class name, also stored in the `ClassName` column
    pub name: String,

    /// Table holding the fields this class declares
    pub table: String,

    /// Parent class when the model extends another table-backed model
    pub parent: Option<ModelId>,

    /// Columns on this model's own table
    pub fields: IndexMap<String, FieldType>,

    /// Relations declared on this class
    pub relations: IndexMap<String, Relation>,

    /// Sort applied when a list of this class is not explicitly sorted
    pub default_sort: Option<String>,
}

#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct ModelId(pub usize);

impl Model {
    pub fn is_base(&self) -> bool {
        self.parent.is_none()
    }

    /// Returns `true` if the model's own table stores `field`.
    pub fn has_own_field(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }
}

impl From<&Self> for ModelId {
    fn from(src: &Self) -> Self {
        *src
    }
}

impl From<&Model> for ModelId {
    fn from(value: &Model) -> Self {
        value.id
    }
}

impl fmt::Debug for ModelId {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "ModelId({})", self.0)
    }
}
