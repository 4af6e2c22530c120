use super::{FieldType, ModelId};
use indexmap::IndexMap;

#[derive(Debug, Clone)]
pub enum Relation {
    HasOne(HasOne),
    BelongsTo(BelongsTo),
    HasMany(HasMany),
    ManyMany(ManyMany),
    ManyManyThrough(ManyManyThrough),
    BelongsManyMany(BelongsManyMany),
}

/// Owns a `<Name>ID` column pointing at one record of `target`.
#[derive(Debug, Clone)]
pub struct HasOne {
    /// `None` when the relation is polymorphic
    pub target: Option<ModelId>,

    /// When set, a `<Name>Class` column stores the target's class
    pub polymorphic: bool,
}

/// The reverse side of a has_one declared on `target`.
#[derive(Debug, Clone)]
pub struct BelongsTo {
    pub target: ModelId,

    /// Name of the has_one on `target` pointing back at this model
    pub via: String,
}

#[derive(Debug, Clone)]
pub struct HasMany {
    pub target: ModelId,

    /// Name of the has_one on `target` pointing back at this model
    pub via: String,

    /// The has_one on `target` is polymorphic, so joins also match its
    /// `<via>Class` column
    pub polymorphic: bool,
}

#[derive(Debug, Clone)]
pub struct ManyMany {
    pub target: ModelId,
    pub join_table: String,
    pub parent_key: String,
    pub child_key: String,

    /// Extra columns stored on the join table
    pub extra_fields: IndexMap<String, FieldType>,
}

/// A many_many relation stored on a join model with two has_ones.
#[derive(Debug, Clone)]
pub struct ManyManyThrough {
    pub through: ModelId,

    /// has_one on the join model pointing at the owner
    pub from: String,

    /// has_one on the join model pointing at the target
    pub to: String,

    pub target: ModelId,
}

/// The reverse side of a many_many declared on `target`.
#[derive(Debug, Clone)]
pub struct BelongsManyMany {
    pub target: ModelId,
    pub via: String,
}

/// A normalized view over the three join-table relation kinds.
#[derive(Debug, Clone)]
pub struct ManyManyComponent {
    pub relation: String,
    pub parent: ModelId,
    pub target: ModelId,
    pub join_table: String,

    /// Join table column holding the owner's ID
    pub parent_key: String,

    /// Join table column holding the target's ID
    pub child_key: String,

    pub extra_fields: IndexMap<String, FieldType>,

    /// Join model for `many_many through`
    pub through: Option<ModelId>,
}

impl Relation {
    pub fn target(&self) -> Option<ModelId> {
        match self {
            Relation::HasOne(rel) => rel.target,
            Relation::BelongsTo(rel) => Some(rel.target),
            Relation::HasMany(rel) => Some(rel.target),
            Relation::ManyMany(rel) => Some(rel.target),
            Relation::ManyManyThrough(rel) => Some(rel.target),
            Relation::BelongsManyMany(rel) => Some(rel.target),
        }
    }

    /// Returns `true` when traversing the relation can yield several rows.
    pub fn is_to_many(&self) -> bool {
        !matches!(self, Relation::HasOne(_) | Relation::BelongsTo(_))
    }

    pub fn is_many_many(&self) -> bool {
        matches!(
            self,
            Relation::ManyMany(_) | Relation::ManyManyThrough(_) | Relation::BelongsManyMany(_)
        )
    }

    pub fn is_polymorphic(&self) -> bool {
        match self {
            Relation::HasOne(rel) => rel.polymorphic,
            Relation::HasMany(rel) => rel.polymorphic,
            _ => false,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Relation::HasOne(_) => "has_one",
            Relation::BelongsTo(_) => "belongs_to",
            Relation::HasMany(_) => "has_many",
            Relation::ManyMany(_) => "many_many",
            Relation::ManyManyThrough(_) => "many_many through",
            Relation::BelongsManyMany(_) => "belongs_many_many",
        }
    }
}
