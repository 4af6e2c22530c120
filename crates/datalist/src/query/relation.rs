//! Relation path resolution.
//!
//! Every relation traversed from the root gets its own join aliases,
//! `<lowercased_path_with_underscores>_<Table>`, so two relations pointing at
//! the same table never share a join.

use super::{literal, placeholders, DataQuery};
use datalist_core::{
    filter::Aggregate,
    schema::{ModelId, Relation},
    Error, Result, Schema,
};
use datalist_sql::{ident, Join, JoinKind, SqlSelect};

/// Where a relation path ends up.
#[derive(Debug, Clone)]
pub(crate) struct Resolved {
    /// Alias prefix of the tables joined for the path's target, empty for
    /// the root
    pub(crate) prefix: String,

    pub(crate) model: ModelId,

    /// Set when any relation on the path can yield several rows
    pub(crate) to_many: bool,

    /// Alias and extra columns of the join table when the last relation is
    /// a many_many
    pub(crate) join_table: Option<(String, Vec<String>)>,
}

impl DataQuery {
    /// Joins every relation in `path`, returning the final target.
    pub(crate) fn join_relation_path(&mut self, path: &[String]) -> Result<Resolved> {
        let schema = self.schema.clone();
        let mut current = Resolved {
            prefix: String::new(),
            model: self.model,
            to_many: false,
            join_table: None,
        };

        for name in path {
            current = self.join_relation(&schema, &current, name)?;
        }

        Ok(current)
    }

    fn join_relation(&mut self, schema: &Schema, owner: &Resolved, name: &str) -> Result<Resolved> {
        let owner_model = schema.model(owner.model);
        let relation = schema.expect_relation(owner.model, name)?;
        let prefix = format!("{}{}_", owner.prefix, name.to_ascii_lowercase());
        let owner_id = self.column(&owner.prefix, owner.model, "ID").unwrap_or_default();

        let mut join_table = None;

        let target = match relation {
            Relation::HasOne(has_one) => {
                let Some(target) = has_one.target else {
                    return Err(Error::invalid_argument(format!(
                        "Cannot traverse polymorphic has_one \"{name}\" on {}",
                        owner_model.name
                    )));
                };

                let foreign_key = self
                    .column(&owner.prefix, owner.model, &format!("{name}ID"))
                    .ok_or_else(|| missing_key(&owner_model.name, name))?;

                let base = schema.base_model(target);
                let alias = format!("{prefix}{}", base.table);
                if !self.select.contains_alias(&alias) {
                    self.select.add_left_join(
                        &base.table,
                        format!("{} = {foreign_key}", ident::quote_column(&alias, "ID")),
                        Some(&alias),
                    );
                }
                target
            }
            Relation::BelongsTo(belongs_to) => {
                self.join_reverse(schema, &owner_id, &prefix, belongs_to.target, &belongs_to.via, None)?;
                belongs_to.target
            }
            Relation::HasMany(has_many) => {
                let classes = has_many
                    .polymorphic
                    .then(|| schema.class_names_for(owner.model));
                self.join_reverse(schema, &owner_id, &prefix, has_many.target, &has_many.via, classes)?;
                has_many.target
            }
            Relation::ManyMany(_) | Relation::ManyManyThrough(_) | Relation::BelongsManyMany(_) => {
                let component = schema
                    .many_many_component(owner.model, name)
                    .ok_or_else(|| missing_key(&owner_model.name, name))?;

                let join_alias = format!("{prefix}{}", component.join_table);
                if !self.select.contains_alias(&join_alias) {
                    self.select.add_left_join(
                        &component.join_table,
                        format!(
                            "{} = {owner_id}",
                            ident::quote_column(&join_alias, &component.parent_key)
                        ),
                        Some(&join_alias),
                    );
                }

                let base = schema.base_model(component.target);
                let alias = format!("{prefix}{}", base.table);
                if !self.select.contains_alias(&alias) {
                    self.select.add_left_join(
                        &base.table,
                        format!(
                            "{} = {}",
                            ident::quote_column(&alias, "ID"),
                            ident::quote_column(&join_alias, &component.child_key)
                        ),
                        Some(&alias),
                    );
                }

                join_table = Some((join_alias, component.extra_fields.keys().cloned().collect()));
                component.target
            }
        };

        Ok(Resolved {
            prefix,
            model: target,
            to_many: owner.to_many || relation.is_to_many(),
            join_table,
        })
    }

    /// Joins the target of a relation whose foreign key, `<via>ID`, lives on
    /// the target. The table declaring the key is joined first.
    fn join_reverse(
        &mut self,
        schema: &Schema,
        owner_id: &str,
        prefix: &str,
        target: ModelId,
        via: &str,
        classes: Option<Vec<String>>,
    ) -> Result<()> {
        let foreign_key = format!("{via}ID");
        let holder = schema
            .table_for_field(target, &foreign_key)
            .ok_or_else(|| missing_key(&schema.model(target).name, via))?;
        let base = schema.base_model(target);

        let holder_alias = format!("{prefix}{}", holder.table);
        let base_alias = format!("{prefix}{}", base.table);

        if !self.select.contains_alias(&holder_alias) {
            let mut on = format!("{} = {owner_id}", ident::quote_column(&holder_alias, &foreign_key));
            let classes = classes.unwrap_or_default();
            if !classes.is_empty() {
                on.push_str(&format!(
                    " AND {} IN ({})",
                    ident::quote_column(&holder_alias, &format!("{via}Class")),
                    placeholders(classes.len())
                ));
            }

            self.select.add_join(
                Join::new(JoinKind::Left, &holder.table, on).params(classes),
                Some(&holder_alias),
            );
        }

        if holder_alias != base_alias && !self.select.contains_alias(&base_alias) {
            self.select.add_left_join(
                &base.table,
                format!(
                    "{} = {}",
                    ident::quote_column(&base_alias, "ID"),
                    ident::quote_column(&holder_alias, "ID")
                ),
                Some(&base_alias),
            );
        }

        Ok(())
    }

    /// Builds `SELECT FUNC(..) FROM <target> WHERE <correlated to owner>`.
    ///
    /// The sub-select binds no parameters, so it can be repeated inside one
    /// predicate.
    pub(super) fn aggregate_subquery(
        &mut self,
        owner: &Resolved,
        name: &str,
        aggregate: &Aggregate,
        source: &str,
    ) -> Result<String> {
        let schema = self.schema.clone();
        let owner_model = schema.model(owner.model);
        let relation = schema.expect_relation(owner.model, name)?;

        let Some(target) = relation.target() else {
            return Err(Error::invalid_argument(format!(
                "Cannot aggregate over polymorphic has_one \"{name}\" on {}",
                owner_model.name
            )));
        };

        let prefix = format!("{}{}_agg_", owner.prefix, name.to_ascii_lowercase());
        let base = schema.base_model(target);
        let base_alias = format!("{prefix}{}", base.table);

        let mut sub = SqlSelect::new();
        sub.set_from((
            base_alias.as_str(),
            format!("{} AS {}", ident::quote(&base.table), ident::quote(&base_alias)).as_str(),
        ));

        // Joins another table of the target's hierarchy on ID.
        let join = |sub: &mut SqlSelect, table: &str| -> String {
            let alias = format!("{prefix}{table}");
            if alias != base_alias && !sub.contains_alias(&alias) {
                sub.add_inner_join(
                    table,
                    format!(
                        "{} = {}",
                        ident::quote_column(&alias, "ID"),
                        ident::quote_column(&base_alias, "ID")
                    ),
                    Some(&alias),
                );
            }
            alias
        };

        let expr = match &aggregate.column {
            None => format!("{}(*)", aggregate.function.sql_name()),
            Some(column) => {
                let holder = schema.table_for_field(target, column).ok_or_else(|| {
                    Error::invalid_argument(format!(
                        "Invalid column \"{column}\" in aggregate \"{source}\" for {}",
                        schema.model(target).name
                    ))
                })?;
                let alias = join(&mut sub, &holder.table);
                format!(
                    "{}({})",
                    aggregate.function.sql_name(),
                    ident::quote_column(&alias, column)
                )
            }
        };
        sub.select_field(expr, Some("Aggregate"));

        if !schema.model(target).is_base() {
            let classes: Vec<String> = schema
                .class_names_for(target)
                .iter()
                .map(|class| literal(class))
                .collect();
            sub.add_where(format!(
                "{} IN ({})",
                ident::quote_column(&base_alias, "ClassName"),
                classes.join(", ")
            ));
        }

        let owner_id = self.column(&owner.prefix, owner.model, "ID").unwrap_or_default();

        let reverse = match relation {
            Relation::BelongsTo(rel) => Some((&rel.via, false)),
            Relation::HasMany(rel) => Some((&rel.via, rel.polymorphic)),
            _ => None,
        };

        if let Relation::HasOne(_) = relation {
            let foreign_key = self
                .column(&owner.prefix, owner.model, &format!("{name}ID"))
                .ok_or_else(|| missing_key(&owner_model.name, name))?;
            sub.add_where(format!(
                "{} = {foreign_key}",
                ident::quote_column(&base_alias, "ID")
            ));
        } else if let Some((via, polymorphic)) = reverse {
            let foreign_key = format!("{via}ID");
            let holder = schema
                .table_for_field(target, &foreign_key)
                .ok_or_else(|| missing_key(&schema.model(target).name, via))?;
            let alias = join(&mut sub, &holder.table);

            sub.add_where(format!(
                "{} = {owner_id}",
                ident::quote_column(&alias, &foreign_key)
            ));

            if polymorphic {
                let classes: Vec<String> = schema
                    .class_names_for(owner.model)
                    .iter()
                    .map(|class| literal(class))
                    .collect();
                sub.add_where(format!(
                    "{} IN ({})",
                    ident::quote_column(&alias, &format!("{via}Class")),
                    classes.join(", ")
                ));
            }
        } else {
            let component = schema
                .many_many_component(owner.model, name)
                .ok_or_else(|| missing_key(&owner_model.name, name))?;
            let join_alias = format!("{prefix}{}", component.join_table);

            sub.add_inner_join(
                &component.join_table,
                format!(
                    "{} = {}",
                    ident::quote_column(&join_alias, &component.child_key),
                    ident::quote_column(&base_alias, "ID")
                ),
                Some(&join_alias),
            );
            sub.add_where(format!(
                "{} = {owner_id}",
                ident::quote_column(&join_alias, &component.parent_key)
            ));
        }

        let rendered = sub.fragment(self.flavor);
        Ok(rendered.sql)
    }
}

fn missing_key(model: &str, relation: &str) -> Error {
    Error::invalid_schema(format!(
        "relation \"{relation}\" on {model} has no foreign key column"
    ))
}
