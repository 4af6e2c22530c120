use super::{
    BelongsManyMany, BelongsTo, FieldType, HasMany, HasOne, ManyMany, ManyManyThrough, Model,
    ModelId, Relation, Schema, BASE_FIELDS,
};
use crate::{Error, Result};
use indexmap::IndexMap;

/// Collects model declarations and links them into a [`Schema`].
#[derive(Debug, Default)]
pub struct Builder {
    models: Vec<ModelBuilder>,
}

/// Declares one model: its fields, its parent class and its relations.
///
/// Relation targets are class names, optionally suffixed with the name of the
/// relation on the target that points back (`"Player.Team"`). They are
/// resolved when the schema is built.
#[derive(Debug, Clone)]
pub struct ModelBuilder {
    name: String,
    table: Option<String>,
    extends: Option<String>,
    fields: Vec<(String, FieldType)>,
    relations: Vec<(String, RelationDecl)>,
    default_sort: Option<String>,
}

#[derive(Debug, Clone)]
enum RelationDecl {
    HasOne(String),
    PolymorphicHasOne,
    BelongsTo(String),
    HasMany(String),
    ManyMany(String, Vec<(String, FieldType)>),
    ManyManyThrough {
        through: String,
        from: String,
        to: String,
    },
    BelongsManyMany(String),
}

impl Builder {
    pub fn model(mut self, model: ModelBuilder) -> Self {
        self.models.push(model);
        self
    }

    pub fn build(self) -> Result<Schema> {
        let mut by_name = IndexMap::new();

        for (index, decl) in self.models.iter().enumerate() {
            if by_name.insert(decl.name.clone(), ModelId(index)).is_some() {
                return Err(Error::invalid_schema(format!(
                    "class \"{}\" is declared twice",
                    decl.name
                )));
            }
        }

        let lookup = |name: &str, context: &str| -> Result<ModelId> {
            by_name.get(name).copied().ok_or_else(|| {
                Error::invalid_schema(format!(
                    "{context} refers to unknown class \"{name}\""
                ))
            })
        };

        // First pass: models with their own columns, no relations yet.
        let mut models = vec![];
        for (index, decl) in self.models.iter().enumerate() {
            let parent = match &decl.extends {
                Some(parent) => Some(lookup(parent, &decl.name)?),
                None => None,
            };

            let mut fields = IndexMap::new();
            if parent.is_none() {
                for (name, ty) in BASE_FIELDS {
                    fields.insert(name.to_string(), ty);
                }
            }

            for (name, ty) in &decl.fields {
                insert_field(&mut fields, &decl.name, name, *ty)?;
            }

            for (name, relation) in &decl.relations {
                match relation {
                    RelationDecl::HasOne(_) => {
                        insert_field(&mut fields, &decl.name, &format!("{name}ID"), FieldType::ForeignKey)?;
                    }
                    RelationDecl::PolymorphicHasOne => {
                        insert_field(&mut fields, &decl.name, &format!("{name}ID"), FieldType::ForeignKey)?;
                        insert_field(&mut fields, &decl.name, &format!("{name}Class"), FieldType::ForeignClass)?;
                    }
                    _ => {}
                }
            }

            models.push(Model {
                id: ModelId(index),
                name: decl.name.clone(),
                table: decl.table.clone().unwrap_or_else(|| decl.name.clone()),
                parent,
                fields,
                relations: IndexMap::new(),
                default_sort: decl.default_sort.clone(),
            });
        }

        let mut schema = Schema { models, by_name: by_name.clone() };
        schema.verify_hierarchy()?;

        // Second pass: has_one relations, which every other kind links against.
        for (index, decl) in self.models.iter().enumerate() {
            for (name, relation) in &decl.relations {
                let relation = match relation {
                    RelationDecl::HasOne(target) => Relation::HasOne(HasOne {
                        target: Some(lookup(target, &format!("{}.{name}", decl.name))?),
                        polymorphic: false,
                    }),
                    RelationDecl::PolymorphicHasOne => Relation::HasOne(HasOne {
                        target: None,
                        polymorphic: true,
                    }),
                    _ => continue,
                };
                schema.insert_relation(ModelId(index), name, relation)?;
            }
        }

        // Third pass: relations resolved through has_ones.
        for (index, decl) in self.models.iter().enumerate() {
            let id = ModelId(index);
            for (name, relation) in &decl.relations {
                let context = format!("{}.{name}", decl.name);
                let relation = match relation {
                    RelationDecl::HasOne(_) | RelationDecl::PolymorphicHasOne => continue,
                    RelationDecl::BelongsTo(spec) => {
                        let (target, via) = split_spec(spec);
                        let target = lookup(target, &context)?;
                        let via = schema.find_has_one_back(target, id, via, &context)?;
                        Relation::BelongsTo(BelongsTo { target, via })
                    }
                    RelationDecl::HasMany(spec) => {
                        let (target, via) = split_spec(spec);
                        let target = lookup(target, &context)?;
                        let via = schema.find_has_one_back(target, id, via, &context)?;
                        let polymorphic = matches!(
                            schema.relation(target, &via),
                            Some((_, Relation::HasOne(HasOne { polymorphic: true, .. })))
                        );
                        Relation::HasMany(HasMany {
                            target,
                            via,
                            polymorphic,
                        })
                    }
                    RelationDecl::ManyMany(target, extra) => {
                        let target = lookup(target, &context)?;
                        let owner = schema.model(id);
                        let child_name = &schema.model(target).name;
                        let child_key = if target == id {
                            "ChildID".to_string()
                        } else {
                            format!("{child_name}ID")
                        };
                        Relation::ManyMany(ManyMany {
                            target,
                            join_table: format!("{}_{name}", owner.table),
                            parent_key: format!("{}ID", owner.name),
                            child_key,
                            extra_fields: extra.iter().cloned().collect(),
                        })
                    }
                    RelationDecl::ManyManyThrough { through, from, to } => {
                        let through = lookup(through, &context)?;
                        let target = match schema.relation(through, to) {
                            Some((_, Relation::HasOne(HasOne { target: Some(target), .. }))) => {
                                *target
                            }
                            _ => {
                                return Err(Error::invalid_schema(format!(
                                    "{context}: \"{to}\" is not a has_one on {}",
                                    schema.model(through).name
                                )))
                            }
                        };
                        if !matches!(schema.relation(through, from), Some((_, Relation::HasOne(_)))) {
                            return Err(Error::invalid_schema(format!(
                                "{context}: \"{from}\" is not a has_one on {}",
                                schema.model(through).name
                            )));
                        }
                        Relation::ManyManyThrough(ManyManyThrough {
                            through,
                            from: from.clone(),
                            to: to.clone(),
                            target,
                        })
                    }
                    RelationDecl::BelongsManyMany(_) => continue,
                };
                schema.insert_relation(id, name, relation)?;
            }
        }

        // Last pass: belongs_many_many needs the many_many it mirrors.
        for (index, decl) in self.models.iter().enumerate() {
            let id = ModelId(index);
            for (name, relation) in &decl.relations {
                let RelationDecl::BelongsManyMany(spec) = relation else {
                    continue;
                };
                let context = format!("{}.{name}", decl.name);
                let (target, via) = split_spec(spec);
                let target = lookup(target, &context)?;
                let via = schema.find_many_many_back(target, id, via, &context)?;
                schema.insert_relation(
                    id,
                    name,
                    Relation::BelongsManyMany(BelongsManyMany { target, via }),
                )?;
            }
        }

        Ok(schema)
    }
}

impl ModelBuilder {
    pub fn new(name: impl Into<String>) -> ModelBuilder {
        ModelBuilder {
            name: name.into(),
            table: None,
            extends: None,
            fields: vec![],
            relations: vec![],
            default_sort: None,
        }
    }

    /// Overrides the table name, which defaults to the class name.
    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// Makes the model a subclass with its own table joined on `ID`.
    pub fn extends(mut self, parent: impl Into<String>) -> Self {
        self.extends = Some(parent.into());
        self
    }

    pub fn field(mut self, name: impl Into<String>, ty: FieldType) -> Self {
        self.fields.push((name.into(), ty));
        self
    }

    pub fn default_sort(mut self, sort: impl Into<String>) -> Self {
        self.default_sort = Some(sort.into());
        self
    }

    pub fn has_one(mut self, name: impl Into<String>, target: impl Into<String>) -> Self {
        self.relations
            .push((name.into(), RelationDecl::HasOne(target.into())));
        self
    }

    /// A has_one storing both `<name>ID` and `<name>Class`.
    pub fn has_one_polymorphic(mut self, name: impl Into<String>) -> Self {
        self.relations
            .push((name.into(), RelationDecl::PolymorphicHasOne));
        self
    }

    /// `target` is `"Class"` or `"Class.HasOne"`.
    pub fn belongs_to(mut self, name: impl Into<String>, target: impl Into<String>) -> Self {
        self.relations
            .push((name.into(), RelationDecl::BelongsTo(target.into())));
        self
    }

    /// `target` is `"Class"` or `"Class.HasOne"`.
    pub fn has_many(mut self, name: impl Into<String>, target: impl Into<String>) -> Self {
        self.relations
            .push((name.into(), RelationDecl::HasMany(target.into())));
        self
    }

    pub fn many_many(mut self, name: impl Into<String>, target: impl Into<String>) -> Self {
        self.relations
            .push((name.into(), RelationDecl::ManyMany(target.into(), vec![])));
        self
    }

    /// A many_many whose join table stores extra columns.
    pub fn many_many_extra<N: Into<String>>(
        mut self,
        name: impl Into<String>,
        target: impl Into<String>,
        extra_fields: impl IntoIterator<Item = (N, FieldType)>,
    ) -> Self {
        let extra = extra_fields
            .into_iter()
            .map(|(name, ty)| (name.into(), ty))
            .collect();
        self.relations
            .push((name.into(), RelationDecl::ManyMany(target.into(), extra)));
        self
    }

    /// A many_many stored on the `through` model, linked by its `from` and
    /// `to` has_ones.
    pub fn many_many_through(
        mut self,
        name: impl Into<String>,
        through: impl Into<String>,
        from: impl Into<String>,
        to: impl Into<String>,
    ) -> Self {
        self.relations.push((
            name.into(),
            RelationDecl::ManyManyThrough {
                through: through.into(),
                from: from.into(),
                to: to.into(),
            },
        ));
        self
    }

    /// `target` is `"Class"` or `"Class.ManyMany"`.
    pub fn belongs_many_many(mut self, name: impl Into<String>, target: impl Into<String>) -> Self {
        self.relations
            .push((name.into(), RelationDecl::BelongsManyMany(target.into())));
        self
    }
}

impl Schema {
    fn verify_hierarchy(&self) -> Result<()> {
        for model in &self.models {
            let mut seen = vec![model.id];
            let mut current = model.parent;
            while let Some(parent) = current {
                if seen.contains(&parent) {
                    return Err(Error::invalid_schema(format!(
                        "class \"{}\" has a cyclic inheritance chain",
                        model.name
                    )));
                }
                seen.push(parent);
                current = self.models[parent.0].parent;
            }
        }
        Ok(())
    }

    fn insert_relation(&mut self, id: ModelId, name: &str, relation: Relation) -> Result<()> {
        let model = &mut self.models[id.0];

        if model.relations.contains_key(name) {
            return Err(Error::invalid_schema(format!(
                "relation \"{name}\" is declared twice on {}",
                model.name
            )));
        }

        if model.fields.contains_key(name) {
            return Err(Error::invalid_schema(format!(
                "relation \"{name}\" on {} collides with a field of the same name",
                model.name
            )));
        }

        model.relations.insert(name.to_string(), relation);
        Ok(())
    }

    /// Finds the has_one on `target` that points at `owner` (or an ancestor).
    fn find_has_one_back(
        &self,
        target: ModelId,
        owner: ModelId,
        via: Option<&str>,
        context: &str,
    ) -> Result<String> {
        if let Some(via) = via {
            return match self.relation(target, via) {
                Some((_, Relation::HasOne(_))) => Ok(via.to_string()),
                _ => Err(Error::invalid_schema(format!(
                    "{context}: \"{via}\" is not a has_one on {}",
                    self.model(target).name
                ))),
            };
        }

        let candidates: Vec<_> = self
            .relations(target)
            .into_iter()
            .filter(|(_, relation)| match relation {
                Relation::HasOne(HasOne {
                    target: Some(points_at),
                    ..
                }) => self.is_subclass_of(owner, *points_at),
                _ => false,
            })
            .map(|(name, _)| name.to_string())
            .collect();

        match &candidates[..] {
            [only] => Ok(only.clone()),
            [] => Err(Error::invalid_schema(format!(
                "{context}: {} has no has_one pointing back at {}",
                self.model(target).name,
                self.model(owner).name
            ))),
            _ => Err(Error::invalid_schema(format!(
                "{context}: {} has several has_ones pointing back at {}; name one explicitly",
                self.model(target).name,
                self.model(owner).name
            ))),
        }
    }

    /// Finds the many_many on `target` whose target is `owner` (or an ancestor).
    fn find_many_many_back(
        &self,
        target: ModelId,
        owner: ModelId,
        via: Option<&str>,
        context: &str,
    ) -> Result<String> {
        let points_back = |relation: &Relation| match relation {
            Relation::ManyMany(rel) => self.is_subclass_of(owner, rel.target),
            Relation::ManyManyThrough(rel) => self.is_subclass_of(owner, rel.target),
            _ => false,
        };

        if let Some(via) = via {
            return match self.relation(target, via) {
                Some((_, relation)) if points_back(relation) => Ok(via.to_string()),
                _ => Err(Error::invalid_schema(format!(
                    "{context}: \"{via}\" is not a many_many on {} pointing at {}",
                    self.model(target).name,
                    self.model(owner).name
                ))),
            };
        }

        let candidates: Vec<_> = self
            .relations(target)
            .into_iter()
            .filter(|(_, relation)| points_back(relation))
            .map(|(name, _)| name.to_string())
            .collect();

        match &candidates[..] {
            [only] => Ok(only.clone()),
            _ => Err(Error::invalid_schema(format!(
                "{context}: cannot find a single many_many on {} pointing at {}",
                self.model(target).name,
                self.model(owner).name
            ))),
        }
    }
}

fn insert_field(
    fields: &mut IndexMap<String, FieldType>,
    model: &str,
    name: &str,
    ty: FieldType,
) -> Result<()> {
    if fields.insert(name.to_string(), ty).is_some() {
        return Err(Error::invalid_schema(format!(
            "field \"{name}\" is declared twice on {model}"
        )));
    }
    Ok(())
}

fn split_spec(spec: &str) -> (&str, Option<&str>) {
    match spec.split_once('.') {
        Some((class, relation)) => (class, Some(relation)),
        None => (spec, None),
    }
}
