//! Batched loading of relation paths.
//!
//! Each distinct relation segment across the requested paths costs one
//! statement, however many parent records there are. Nested segments run
//! against the rows fetched for their parent segment.

use super::data_list::{DataList, PARENT_ID};
use crate::{DataObject, Db, EagerData, EagerLoadedList, JoinMeta, List, ListShape};
use datalist_core::{
    schema::{ModelId, Relation},
    record_id, Error, Filter, Record, Result, Schema,
};
use indexmap::IndexMap;
use std::collections::HashMap;
use tracing::trace;

/// Requested paths merged into a tree of relation names.
#[derive(Debug, Default)]
pub(crate) struct PathTree {
    children: IndexMap<String, PathTree>,
}

impl PathTree {
    pub(crate) fn new(paths: &[String]) -> PathTree {
        let mut root = PathTree::default();
        for path in paths {
            let mut node = &mut root;
            for segment in path.split('.') {
                node = node.children.entry(segment.to_string()).or_default();
            }
        }
        root
    }
}

/// Checks that every segment of `path` names a relation that can be
/// loaded, and that the path is not deeper than `max_depth`.
pub(crate) fn validate(schema: &Schema, model: ModelId, path: &str, max_depth: usize) -> Result<()> {
    let segments: Vec<&str> = path.split('.').map(str::trim).collect();

    if segments.iter().any(|segment| segment.is_empty()) {
        return Err(Error::invalid_argument(format!(
            "Invalid eager load path \"{path}\""
        )));
    }

    if segments.len() > max_depth {
        return Err(Error::invalid_argument(format!(
            "Eager loading only supports up to {max_depth} levels of nesting, passed {} levels ({path})",
            segments.len()
        )));
    }

    let mut current = model;
    for segment in segments {
        let relation = schema.expect_relation(current, segment)?;
        let Some(target) = relation.target() else {
            return Err(Error::invalid_argument(format!(
                "Cannot eager load polymorphic has_one \"{segment}\" in \"{path}\""
            )));
        };
        current = target;
    }

    Ok(())
}

/// Loads every relation in `tree` for `parents`, attaching the results.
pub(crate) fn load(db: &Db, model: ModelId, parents: &mut [DataObject], tree: &PathTree) -> Result<()> {
    for (name, subtree) in &tree.children {
        load_relation(db, model, parents, name, subtree)?;
    }
    Ok(())
}

fn load_relation(
    db: &Db,
    model: ModelId,
    parents: &mut [DataObject],
    name: &str,
    subtree: &PathTree,
) -> Result<()> {
    let schema = db.schema_arc();
    let relation = schema.expect_relation(model, name)?;
    let parent_ids = unique(parents.iter().filter_map(DataObject::id));

    match relation {
        Relation::HasOne(has_one) => {
            let Some(target) = has_one.target else {
                return Err(Error::invalid_argument(format!(
                    "Cannot eager load polymorphic has_one \"{name}\""
                )));
            };

            let key = format!("{name}ID");
            let ids = unique(
                parents
                    .iter()
                    .filter_map(|parent| parent.get(&key).to_id())
                    .filter(|id| *id > 0),
            );

            let mut children = fetch(db, target, &ids, |list| list.by_ids(&ids))?;
            load(db, target, &mut children, subtree)?;
            trace!(relation = name, parents = parent_ids.len(), rows = children.len(), "datalist.eager_load has_one");

            let by_id: HashMap<i64, DataObject> = children
                .into_iter()
                .filter_map(|child| Some((child.id()?, child)))
                .collect();

            for parent in parents.iter_mut() {
                let child = parent
                    .get(&key)
                    .to_id()
                    .and_then(|id| by_id.get(&id).cloned());
                parent.attach_eager(name, EagerData::One(child));
            }
        }
        Relation::BelongsTo(belongs_to) => {
            let key = format!("{}ID", belongs_to.via);
            let filter = Filter::new().and(&key, parent_ids.clone());

            let mut children = fetch(db, belongs_to.target, &parent_ids, |list| list.filter(filter))?;
            load(db, belongs_to.target, &mut children, subtree)?;
            trace!(relation = name, parents = parent_ids.len(), rows = children.len(), "datalist.eager_load belongs_to");

            for parent in parents.iter_mut() {
                let child = parent.id().and_then(|id| {
                    children
                        .iter()
                        .find(|child| child.get(&key).to_id() == Some(id))
                        .cloned()
                });
                parent.attach_eager(name, EagerData::One(child));
            }
        }
        Relation::HasMany(has_many) => {
            let key = format!("{}ID", has_many.via);
            let mut filter = Filter::new().and(&key, parent_ids.clone());
            if has_many.polymorphic {
                filter = filter.and(format!("{}Class", has_many.via), schema.class_names_for(model));
            }

            let mut children = fetch(db, has_many.target, &parent_ids, |list| list.filter(filter))?;
            load(db, has_many.target, &mut children, subtree)?;
            trace!(relation = name, parents = parent_ids.len(), rows = children.len(), "datalist.eager_load has_many");

            let class = &schema.model(has_many.target).name;
            for parent in parents.iter_mut() {
                let Some(parent_id) = parent.id() else { continue };

                let mut list = EagerLoadedList::new(class, ListShape::HasMany, Some(parent_id), None)?
                    .with_db(db.clone());
                for child in children.iter().filter(|child| child.get(&key).to_id() == Some(parent_id)) {
                    list.add_object(child)?;
                }
                parent.attach_eager(name, EagerData::Many(list));
            }
        }
        Relation::ManyMany(_) | Relation::ManyManyThrough(_) | Relation::BelongsManyMany(_) => {
            let component = schema
                .many_many_component(model, name)
                .ok_or_else(|| Error::invalid_schema(format!("{name} is not a many_many relation")))?;

            let links = if parent_ids.is_empty() {
                vec![]
            } else {
                DataList::many_many_for(db, &component, &parent_ids)?.records()?
            };

            // One object per distinct child, for nested loading.
            let class = &schema.model(component.target).name;
            let mut links_by_parent: Vec<(i64, Record)> = vec![];
            let mut children: Vec<DataObject> = vec![];
            for mut record in links {
                let Some(parent_id) = record.shift_remove(PARENT_ID).and_then(|id| id.to_id()) else {
                    continue;
                };
                let child = DataObject::revive(class, record.clone(), Some(db))?;
                if !children.iter().any(|existing| existing.id() == child.id()) {
                    children.push(child);
                }
                links_by_parent.push((parent_id, record));
            }

            load(db, component.target, &mut children, subtree)?;
            trace!(relation = name, parents = parent_ids.len(), rows = links_by_parent.len(), "datalist.eager_load many_many");

            let children: HashMap<i64, DataObject> = children
                .into_iter()
                .filter_map(|child| Some((child.id()?, child)))
                .collect();

            let shape = if component.through.is_some() {
                ListShape::ManyManyThrough
            } else {
                ListShape::ManyMany
            };
            let join = JoinMeta {
                relation: name.to_string(),
                join_table: component.join_table.clone(),
                parent_key: component.parent_key.clone(),
                child_key: component.child_key.clone(),
                extra_fields: component.extra_fields.keys().cloned().collect(),
            };

            for parent in parents.iter_mut() {
                let Some(parent_id) = parent.id() else { continue };

                let mut list = EagerLoadedList::new(class, shape, Some(parent_id), Some(join.clone()))?
                    .with_db(db.clone());
                for (_, record) in links_by_parent.iter().filter(|(id, _)| *id == parent_id) {
                    list.add_row(record.clone())?;

                    let Some(child_id) = record_id(record) else { continue };
                    if let Some(child) = children.get(&child_id) {
                        for (relation, data) in child.eager() {
                            list.add_eager_loaded_data(relation, child_id, data.clone());
                        }
                    }
                }
                parent.attach_eager(name, EagerData::Many(list));
            }
        }
    }

    Ok(())
}

/// Runs `query` over a list of `target` unless there is nothing to match.
fn fetch(
    db: &Db,
    target: ModelId,
    keys: &[i64],
    query: impl FnOnce(DataList) -> Result<DataList>,
) -> Result<Vec<DataObject>> {
    if keys.is_empty() {
        return Ok(vec![]);
    }

    let list = db.list(&db.schema().model(target).name)?;
    query(list)?.to_vec()
}

fn unique(ids: impl Iterator<Item = i64>) -> Vec<i64> {
    let mut ret: Vec<i64> = vec![];
    for id in ids {
        if !ret.contains(&id) {
            ret.push(id);
        }
    }
    ret
}
