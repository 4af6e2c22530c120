mod builder;
pub use builder::{Builder, ModelBuilder};

mod field;
pub use field::FieldType;

mod model;
pub use model::{Model, ModelId};

mod relation;
pub use relation::{
    BelongsManyMany, BelongsTo, HasMany, HasOne, ManyMany, ManyManyComponent, ManyManyThrough,
    Relation,
};

use crate::{Error, Result};
use indexmap::IndexMap;

/// Fields every root table carries, in column order.
pub const BASE_FIELDS: [(&str, FieldType); 4] = [
    ("ID", FieldType::PrimaryKey),
    ("ClassName", FieldType::ClassName),
    ("LastEdited", FieldType::Datetime),
    ("Created", FieldType::Datetime),
];

/// Describes every model, its table, its fields and its relations.
///
/// The schema is immutable once built and is shared by reference between the
/// query builder, the relation resolver and materialized lists.
#[derive(Debug, Default)]
pub struct Schema {
    models: Vec<Model>,
    by_name: IndexMap<String, ModelId>,
}

impl Schema {
    pub fn builder() -> Builder {
        Builder::default()
    }

    pub fn models(&self) -> impl Iterator<Item = &Model> {
        self.models.iter()
    }

    /// Get a model by ID
    pub fn model(&self, id: impl Into<ModelId>) -> &Model {
        &self.models[id.into().0]
    }

    pub fn model_by_name(&self, name: &str) -> Option<&Model> {
        self.by_name.get(name).map(|id| &self.models[id.0])
    }

    /// Looks up a model by class name, failing with a lookup error.
    pub fn expect_model(&self, name: &str) -> Result<&Model> {
        self.model_by_name(name)
            .ok_or_else(|| Error::not_found(format!("class \"{name}\" is not a registered model")))
    }

    /// The model's ancestry, base class first and the model itself last.
    pub fn ancestry(&self, id: impl Into<ModelId>) -> Vec<ModelId> {
        let mut ret = vec![];
        let mut current = Some(id.into());

        while let Some(id) = current {
            ret.push(id);
            current = self.model(id).parent;
        }

        ret.reverse();
        ret
    }

    pub fn base_model(&self, id: impl Into<ModelId>) -> &Model {
        let mut model = self.model(id);
        while let Some(parent) = model.parent {
            model = self.model(parent);
        }
        model
    }

    /// Every model inheriting from `id`, depth first, excluding `id` itself.
    pub fn descendants(&self, id: impl Into<ModelId>) -> Vec<ModelId> {
        let id = id.into();
        let mut ret = vec![];

        for model in &self.models {
            if model.parent == Some(id) {
                ret.push(model.id);
                ret.extend(self.descendants(model.id));
            }
        }

        ret
    }

    /// Class names a `ClassName` column may hold for records of `id`.
    pub fn class_names_for(&self, id: impl Into<ModelId>) -> Vec<String> {
        let id = id.into();
        std::iter::once(id)
            .chain(self.descendants(id))
            .map(|id| self.model(id).name.clone())
            .collect()
    }

    pub fn is_subclass_of(&self, id: impl Into<ModelId>, ancestor: impl Into<ModelId>) -> bool {
        self.ancestry(id).contains(&ancestor.into())
    }

    /// Finds the model whose table stores `field` for records of `id`.
    ///
    /// Ancestors are searched first (nearest to the base table), then
    /// subclasses, so a field only declared on a subclass still resolves to
    /// that subclass' table.
    pub fn table_for_field(&self, id: impl Into<ModelId>, field: &str) -> Option<&Model> {
        let id = id.into();

        if field == "ID" {
            return Some(self.base_model(id));
        }

        self.ancestry(id)
            .into_iter()
            .chain(self.descendants(id))
            .map(|id| self.model(id))
            .find(|model| model.fields.contains_key(field))
    }

    /// Returns the storage type of a field visible on `id` (own or inherited).
    pub fn field_type(&self, id: impl Into<ModelId>, field: &str) -> Option<FieldType> {
        self.ancestry(id)
            .into_iter()
            .find_map(|id| self.model(id).fields.get(field).copied())
    }

    /// Returns `true` if `field` is a column on the model or one of its ancestors.
    pub fn has_db_field(&self, id: impl Into<ModelId>, field: &str) -> bool {
        self.field_type(id, field).is_some()
    }

    /// All columns visible on `id`, base table first, paired with the model
    /// whose table declares them.
    pub fn fields(&self, id: impl Into<ModelId>) -> Vec<(&Model, &str, FieldType)> {
        let mut ret = vec![];
        for id in self.ancestry(id) {
            let model = self.model(id);
            for (name, ty) in &model.fields {
                ret.push((model, name.as_str(), *ty));
            }
        }
        ret
    }

    /// Looks up a relation declared on the model or inherited from an ancestor.
    pub fn relation(&self, id: impl Into<ModelId>, name: &str) -> Option<(&Model, &Relation)> {
        self.ancestry(id)
            .into_iter()
            .rev()
            .map(|id| self.model(id))
            .find_map(|model| model.relations.get(name).map(|relation| (model, relation)))
    }

    /// All relations visible on `id`, own relations last.
    pub fn relations(&self, id: impl Into<ModelId>) -> Vec<(&str, &Relation)> {
        self.ancestry(id)
            .into_iter()
            .flat_map(|id| {
                self.model(id)
                    .relations
                    .iter()
                    .map(|(name, relation)| (name.as_str(), relation))
            })
            .collect()
    }

    /// Looks up a relation, failing with an argument error naming the model.
    pub fn expect_relation(&self, id: impl Into<ModelId>, name: &str) -> Result<&Relation> {
        let id = id.into();
        self.relation(id, name).map(|(_, relation)| relation).ok_or_else(|| {
            Error::invalid_argument(format!(
                "{} has no relation named \"{}\"",
                self.model(id).name,
                name
            ))
        })
    }

    /// The class a relation points at, `None` for polymorphic has_one.
    pub fn relation_target(&self, id: impl Into<ModelId>, name: &str) -> Option<ModelId> {
        self.relation(id, name)
            .and_then(|(_, relation)| relation.target())
    }

    /// Normalizes `many_many`, `many_many through` and `belongs_many_many`
    /// relations into the join-table description used to build joins.
    pub fn many_many_component(
        &self,
        id: impl Into<ModelId>,
        name: &str,
    ) -> Option<ManyManyComponent> {
        let (owner, relation) = self.relation(id, name)?;

        match relation {
            Relation::ManyMany(many_many) => Some(ManyManyComponent {
                relation: name.to_string(),
                parent: owner.id,
                target: many_many.target,
                join_table: many_many.join_table.clone(),
                parent_key: many_many.parent_key.clone(),
                child_key: many_many.child_key.clone(),
                extra_fields: many_many.extra_fields.clone(),
                through: None,
            }),
            Relation::ManyManyThrough(through) => {
                let join_model = self.model(through.through);
                let extra_fields = self
                    .fields(through.through)
                    .into_iter()
                    .filter(|(_, field, ty)| {
                        !matches!(
                            ty,
                            FieldType::PrimaryKey
                                | FieldType::ClassName
                                | FieldType::ForeignKey
                                | FieldType::ForeignClass
                        ) && *field != "Created"
                            && *field != "LastEdited"
                    })
                    .map(|(_, field, ty)| (field.to_string(), ty))
                    .collect();

                Some(ManyManyComponent {
                    relation: name.to_string(),
                    parent: owner.id,
                    target: through.target,
                    join_table: self.base_model(join_model.id).table.clone(),
                    parent_key: format!("{}ID", through.from),
                    child_key: format!("{}ID", through.to),
                    extra_fields,
                    through: Some(through.through),
                })
            }
            Relation::BelongsManyMany(belongs) => {
                let reverse = self.many_many_component(belongs.target, &belongs.via)?;

                Some(ManyManyComponent {
                    relation: name.to_string(),
                    parent: owner.id,
                    target: belongs.target,
                    join_table: reverse.join_table,
                    parent_key: reverse.child_key,
                    child_key: reverse.parent_key,
                    extra_fields: reverse.extra_fields,
                    through: reverse.through,
                })
            }
            _ => None,
        }
    }
}
