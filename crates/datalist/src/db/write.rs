//! Inserts, updates and deletes across a model's table hierarchy, plus
//! many_many link maintenance.

use super::Db;
use crate::DataObject;
use datalist_core::{err, Error, Record, Result};
use datalist_sql::{ident, SqlDelete, SqlInsert, SqlSelect, SqlUpdate};
use tracing::debug;

impl Db {
    /// Saves `object`, returning its ID.
    ///
    /// An object whose `ID` matches an existing row is updated table by
    /// table. Otherwise a row is inserted into the base table, then one
    /// into each subclass table under the same ID.
    pub fn write(&self, object: &mut DataObject) -> Result<i64> {
        let schema = self.schema_arc();
        let model = schema.expect_model(object.class())?;
        let ancestry = schema.ancestry(model.id);

        if object.get("ClassName").is_null() {
            let class = model.name.clone();
            object.set("ClassName", class);
        }

        let id = match object.id() {
            Some(id) if self.row_exists(&schema.base_model(model.id).table, id)? => {
                for model in ancestry.iter().map(|id| schema.model(*id)) {
                    let mut update = SqlUpdate::new(&model.table);
                    for field in model.fields.keys().filter(|field| *field != "ID") {
                        if let Some(value) = object.record().get(field) {
                            update.assign(field, value);
                        }
                    }

                    if !update.is_empty() {
                        update.add_where((ident::quote("ID"), id));
                        self.execute(&update)?;
                    }
                }
                id
            }
            explicit => {
                let mut ancestry = ancestry.iter().map(|id| schema.model(*id));
                let Some(base) = ancestry.next() else {
                    return Err(Error::invalid_schema(format!(
                        "{} has no base table",
                        model.name
                    )));
                };

                let mut insert = SqlInsert::new(&base.table);
                for field in base.fields.keys() {
                    match object.record().get(field) {
                        Some(value) if !(field == "ID" && value.is_null()) => {
                            insert.assign(field, value);
                        }
                        _ => {}
                    }
                }

                let response = self.execute(&insert)?;
                let id = explicit
                    .or(response.last_insert_id())
                    .ok_or_else(|| err_no_id(&model.name))?;

                for model in ancestry {
                    let mut insert = SqlInsert::new(&model.table);
                    insert.assign("ID", id);
                    for field in model.fields.keys() {
                        if let Some(value) = object.record().get(field) {
                            insert.assign(field, value);
                        }
                    }
                    self.execute(&insert)?;
                }

                debug!(class = %model.name, id, "datalist.write inserted");
                id
            }
        };

        object.set("ID", id);
        if object.db().is_err() {
            object.attach(self.clone());
        }
        Ok(id)
    }

    /// Deletes `object`'s rows from every table in its hierarchy.
    pub fn delete(&self, object: &DataObject) -> Result<()> {
        let schema = self.schema_arc();
        let model = schema.expect_model(object.class())?;
        let id = object.id().ok_or_else(|| {
            Error::invalid_argument(format!("Cannot delete a {} without an ID", model.name))
        })?;

        for model in schema.ancestry(model.id).into_iter().rev() {
            let mut delete = SqlDelete::new(&schema.model(model).table);
            delete.add_where((ident::quote("ID"), id));
            self.execute(&delete)?;
        }
        Ok(())
    }

    /// Links `child_id` to `owner` through the many_many relation `relation`,
    /// storing `extra` in the join table.
    pub fn add_many_many(
        &self,
        owner: &DataObject,
        relation: &str,
        child_id: i64,
        extra: Record,
    ) -> Result<()> {
        let schema = self.schema_arc();
        let model = schema.expect_model(owner.class())?;
        let component = schema.many_many_component(model.id, relation).ok_or_else(|| {
            Error::invalid_argument(format!(
                "{} has no many_many relation named \"{relation}\"",
                model.name
            ))
        })?;
        let owner_id = owner.id().ok_or_else(|| {
            Error::invalid_argument(format!(
                "Cannot link \"{relation}\" on a {} without an ID",
                model.name
            ))
        })?;

        let mut insert = SqlInsert::new(&component.join_table);
        insert
            .assign(&component.parent_key, owner_id)
            .assign(&component.child_key, child_id);

        if let Some(through) = component.through {
            insert.assign("ClassName", &schema.model(through).name);
        }

        for (field, value) in extra {
            if !component.extra_fields.contains_key(&field) {
                return Err(Error::invalid_argument(format!(
                    "\"{field}\" is not an extra field of {}.{relation}",
                    model.name
                )));
            }
            insert.assign(field, value);
        }

        self.execute(&insert)?;
        Ok(())
    }

    /// Removes every link between `owner` and `child_id` in `relation`.
    pub fn remove_many_many(&self, owner: &DataObject, relation: &str, child_id: i64) -> Result<()> {
        let schema = self.schema_arc();
        let model = schema.expect_model(owner.class())?;
        let component = schema.many_many_component(model.id, relation).ok_or_else(|| {
            Error::invalid_argument(format!(
                "{} has no many_many relation named \"{relation}\"",
                model.name
            ))
        })?;
        let Some(owner_id) = owner.id() else {
            return Ok(());
        };

        let mut delete = SqlDelete::new(&component.join_table);
        delete
            .add_where((ident::quote(&component.parent_key), owner_id))
            .add_where((ident::quote(&component.child_key), child_id));
        self.execute(&delete)?;
        Ok(())
    }

    fn row_exists(&self, table: &str, id: i64) -> Result<bool> {
        let column = ident::quote_column(table, "ID");
        let mut select = SqlSelect::from_table(table);
        select
            .select_field(column.clone(), None)
            .add_where((column, id));
        Ok(!self.query(&select)?.is_empty())
    }
}

fn err_no_id(class: &str) -> Error {
    err!("insert into {class} returned no row ID")
}
