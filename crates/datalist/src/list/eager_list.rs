use crate::{DataObject, Db, List};
use datalist_core::{
    record_id, Combine, Error, Filter, FilterKey, IntoSort, Limit, LimitLength, Predicate,
    Record, Result, SortSpec, Value,
};
use indexmap::IndexMap;
use std::collections::HashMap;

/// The kind of relation a materialized list holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListShape {
    /// Rows not tied to an owner
    Plain,
    HasMany,
    ManyMany,
    ManyManyThrough,
}

impl ListShape {
    fn has_extra_fields(self) -> bool {
        matches!(self, ListShape::ManyMany | ListShape::ManyManyThrough)
    }
}

/// Join table of a many_many list.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinMeta {
    /// The relation the rows were loaded for
    pub relation: String,
    pub join_table: String,
    pub parent_key: String,
    pub child_key: String,

    /// Join table columns copied onto each row
    pub extra_fields: Vec<String>,
}

/// Related data attached to a parent record by eager loading.
#[derive(Debug, Clone)]
pub enum EagerData {
    /// has_one and belongs_to
    One(Option<DataObject>),

    /// has_many and many_many
    Many(EagerLoadedList),
}

/// A list over a fixed set of rows.
///
/// Filters, sorts and limits follow the same rules as [`DataList`](crate::DataList)
/// but run in memory, so only plain fields can be used. Related data must be
/// attached up front with [`EagerLoadedList::add_eager_loaded_data`].
#[derive(Debug, Clone)]
pub struct EagerLoadedList {
    class: String,
    shape: ListShape,
    foreign_id: Option<i64>,
    join: Option<JoinMeta>,

    /// Rows passing every filter so far, in insertion order
    rows: Vec<Record>,

    /// Join table values per row ID
    extra: HashMap<i64, Record>,

    /// Attached relations per row ID
    eager: HashMap<i64, IndexMap<String, EagerData>>,

    sort: Option<SortSpec>,
    limit: Limit,
    db: Option<Db>,
}

impl EagerLoadedList {
    /// Creates an empty list.
    ///
    /// Every shape but [`ListShape::Plain`] needs the owner's ID, and the
    /// many_many shapes need their join table.
    pub fn new(
        class: impl Into<String>,
        shape: ListShape,
        foreign_id: Option<i64>,
        join: Option<JoinMeta>,
    ) -> Result<EagerLoadedList> {
        let class = class.into();

        if shape != ListShape::Plain && foreign_id.is_none() {
            return Err(Error::invalid_argument(format!(
                "A {shape:?} list of {class} needs a foreign ID"
            )));
        }

        if shape.has_extra_fields() && join.is_none() {
            return Err(Error::invalid_argument(format!(
                "A {shape:?} list of {class} needs its join table"
            )));
        }

        Ok(EagerLoadedList {
            class,
            shape,
            foreign_id,
            join,
            rows: vec![],
            extra: HashMap::new(),
            eager: HashMap::new(),
            sort: None,
            limit: Limit::default(),
            db: None,
        })
    }

    /// A list not tied to any relation.
    pub fn plain(class: impl Into<String>) -> EagerLoadedList {
        EagerLoadedList {
            class: class.into(),
            shape: ListShape::Plain,
            foreign_id: None,
            join: None,
            rows: vec![],
            extra: HashMap::new(),
            eager: HashMap::new(),
            sort: None,
            limit: Limit::default(),
            db: None,
        }
    }

    /// Revives items through `db`, validating their classes and letting
    /// them load relations that were not attached.
    pub fn with_db(mut self, db: Db) -> EagerLoadedList {
        self.db = Some(db);
        self
    }

    pub fn shape(&self) -> ListShape {
        self.shape
    }

    pub fn foreign_id(&self) -> Option<i64> {
        self.foreign_id
    }

    pub fn join(&self) -> Option<&JoinMeta> {
        self.join.as_ref()
    }

    /// Appends a row. The row must carry a positive `ID`.
    pub fn add_row(&mut self, row: Record) -> Result<&mut Self> {
        let id = row
            .get("ID")
            .and_then(Value::to_id)
            .filter(|id| *id > 0)
            .ok_or_else(|| {
                Error::invalid_argument(format!(
                    "A row added to a list of {} must have a valid ID",
                    self.class
                ))
            })?;

        if let Some(join) = &self.join {
            let extra: Record = join
                .extra_fields
                .iter()
                .map(|field| (field.clone(), row.get(field).cloned().unwrap_or_default()))
                .collect();
            self.extra.insert(id, extra);
        }

        self.rows.push(row);
        Ok(self)
    }

    pub fn add_rows(&mut self, rows: impl IntoIterator<Item = Record>) -> Result<&mut Self> {
        for row in rows {
            self.add_row(row)?;
        }
        Ok(self)
    }

    /// Appends an object's record along with the relations attached to it.
    pub(crate) fn add_object(&mut self, object: &DataObject) -> Result<&mut Self> {
        self.add_row(object.record().clone())?;
        if let Some(id) = object.id() {
            for (relation, data) in object.eager() {
                self.add_eager_loaded_data(relation, id, data.clone());
            }
        }
        Ok(self)
    }

    /// Attaches related data to the row with ID `parent_id`.
    pub fn add_eager_loaded_data(
        &mut self,
        relation: &str,
        parent_id: i64,
        data: EagerData,
    ) -> &mut Self {
        self.eager
            .entry(parent_id)
            .or_default()
            .insert(relation.to_string(), data);
        self
    }

    pub fn get_eager_loaded(&self, relation: &str, parent_id: i64) -> Option<&EagerData> {
        self.eager.get(&parent_id)?.get(relation)
    }

    /// The related data of every row, merged.
    ///
    /// To-many relations yield one list holding every attached row once;
    /// has_one relations yield the first attached record.
    pub fn relation(&self, name: &str) -> Result<EagerData> {
        let mut merged: Option<EagerLoadedList> = None;
        let mut one = None;
        let mut attached = false;

        for row in self.materialized()? {
            let Some(data) = record_id(&row).and_then(|id| self.get_eager_loaded(name, id)) else {
                continue;
            };
            attached = true;

            match data {
                EagerData::One(object) => {
                    if one.is_none() {
                        one = object.clone();
                    }
                }
                EagerData::Many(list) => {
                    let target = merged.get_or_insert_with(|| {
                        let mut ret = EagerLoadedList::plain(&list.class);
                        ret.db = list.db.clone();
                        ret
                    });
                    for row in &list.rows {
                        let Some(id) = record_id(row) else { continue };
                        if target.rows.iter().any(|existing| record_id(existing) == Some(id)) {
                            continue;
                        }
                        target.rows.push(row.clone());
                        if let Some(eager) = list.eager.get(&id) {
                            target.eager.insert(id, eager.clone());
                        }
                    }
                }
            }
        }

        if let Some(list) = merged {
            return Ok(EagerData::Many(list));
        }
        if one.is_some() {
            return Ok(EagerData::One(one));
        }

        // Nothing to merge: the schema decides between an empty list and no
        // record.
        let Some(db) = &self.db else {
            if attached {
                return Ok(EagerData::One(None));
            }
            return Err(Error::invalid_argument(format!(
                "No \"{name}\" data is attached to this {} list and it has no schema to \
                 resolve the relation",
                self.class
            )));
        };

        let schema = db.schema();
        let model = schema.expect_model(&self.class)?;
        if !schema.expect_relation(model.id, name)?.is_to_many() {
            return Ok(EagerData::One(None));
        }

        let class = schema
            .relation_target(model.id, name)
            .map(|target| schema.model(target).name.clone())
            .unwrap_or_else(|| self.class.clone());
        Ok(EagerData::Many(self.empty_like(class)))
    }

    fn empty_like(&self, class: String) -> EagerLoadedList {
        let mut ret = EagerLoadedList::plain(class);
        ret.db = self.db.clone();
        ret
    }

    /// Join table values stored for `item_id`. Fields the row did not carry
    /// read as null.
    pub fn get_extra_data(&self, relation: &str, item_id: impl Into<Value>) -> Result<Record> {
        let Some(join) = self.join.as_ref().filter(|_| self.shape.has_extra_fields()) else {
            return Err(Error::bad_method_call(format!(
                "get_extra_data() is not supported on a {:?} list",
                self.shape
            )));
        };

        if join.relation != relation {
            return Err(Error::invalid_argument(format!(
                "This list holds \"{}\", not \"{relation}\"",
                join.relation
            )));
        }

        let item_id = item_id.into();
        let Some(id) = item_id.to_id() else {
            return Err(Error::invalid_argument(format!(
                "Item ID \"{item_id}\" must be numeric"
            )));
        };

        let stored = self.extra.get(&id);
        Ok(join
            .extra_fields
            .iter()
            .map(|field| {
                let value = stored
                    .and_then(|extra| extra.get(field))
                    .cloned()
                    .unwrap_or_default();
                (field.clone(), value)
            })
            .collect())
    }

    /// Revives a row as an object, attaching any related data stored for it.
    pub fn create_data_object(&self, row: Record) -> Result<DataObject> {
        let mut object = DataObject::revive(&self.class, row, self.db.as_ref())?;
        if let Some(eager) = object.id().and_then(|id| self.eager.get(&id)) {
            for (relation, data) in eager {
                object.attach_eager(relation.clone(), data.clone());
            }
        }
        Ok(object)
    }

    pub fn set_by_id_list(&mut self, _ids: &[i64]) -> Result<()> {
        Err(fixed("set_by_id_list"))
    }

    pub fn for_foreign_id(&self, _id: i64) -> Result<EagerLoadedList> {
        Err(fixed("for_foreign_id"))
    }

    pub fn offset_set(&mut self, _index: usize, _row: Record) -> Result<()> {
        Err(fixed("offset_set"))
    }

    pub fn offset_unset(&mut self, _index: usize) -> Result<()> {
        Err(fixed("offset_unset"))
    }

    /// Rows after sorting and limiting.
    fn materialized(&self) -> Result<Vec<Record>> {
        let mut rows = self.rows.clone();
        if let Some(sort) = &self.sort {
            sort.sort_records(&mut rows)?;
        }
        Ok(self.limit.apply(rows))
    }

    fn retain(&self, predicate: &Predicate) -> Result<EagerLoadedList> {
        predicate.verify_in_memory()?;

        let mut ret = self.clone();
        let mut rows = Vec::with_capacity(ret.rows.len());
        for row in ret.rows.drain(..) {
            if predicate.eval(&row)? {
                rows.push(row);
            }
        }
        ret.rows = rows;
        Ok(ret)
    }

    /// Whether `field` is a column the rows carry.
    fn has_field(&self, field: &str) -> bool {
        if let Some(join) = &self.join {
            if join.extra_fields.iter().any(|extra| extra == field) {
                return true;
            }
        }

        if let Some(db) = &self.db {
            if let Ok(model) = db.schema().expect_model(&self.class) {
                return db.schema().has_db_field(model.id, field);
            }
        }

        self.rows.is_empty() || self.rows.iter().any(|row| row.contains_key(field))
    }
}

fn fixed(operation: &str) -> Error {
    Error::bad_method_call(format!(
        "{operation}() is not supported on an eager-loaded list; its rows are fixed"
    ))
}

impl List for EagerLoadedList {
    fn data_class(&self) -> &str {
        &self.class
    }

    fn filter(&self, filter: impl Into<Filter>) -> Result<EagerLoadedList> {
        self.retain(&filter.into().to_predicate(Combine::All)?)
    }

    fn filter_any(&self, filter: impl Into<Filter>) -> Result<EagerLoadedList> {
        self.retain(&filter.into().to_predicate(Combine::Any)?)
    }

    fn exclude(&self, filter: impl Into<Filter>) -> Result<EagerLoadedList> {
        self.retain(&filter.into().to_exclusion(Combine::All)?)
    }

    fn exclude_any(&self, filter: impl Into<Filter>) -> Result<EagerLoadedList> {
        self.retain(&filter.into().to_exclusion(Combine::Any)?)
    }

    fn sort(&self, sort: impl IntoSort) -> Result<EagerLoadedList> {
        let sort = sort.into_sort()?;
        if let Some(sort) = &sort {
            sort.sort_records(&mut vec![])?;
        }

        let mut ret = self.clone();
        ret.sort = sort;
        Ok(ret)
    }

    fn limit(&self, length: impl Into<LimitLength>, offset: i64) -> Result<EagerLoadedList> {
        let mut ret = self.clone();
        ret.limit = Limit::new(length, offset)?;
        Ok(ret)
    }

    fn reverse(&self) -> EagerLoadedList {
        let mut ret = self.clone();
        match &ret.sort {
            Some(sort) => ret.sort = Some(sort.reverse()),
            None => ret.rows.reverse(),
        }
        ret
    }

    fn by_ids(&self, ids: &[i64]) -> Result<EagerLoadedList> {
        let mut ret = self.clone();
        ret.rows
            .retain(|row| record_id(row).is_some_and(|id| ids.contains(&id)));
        Ok(ret)
    }

    fn to_vec(&self) -> Result<Vec<DataObject>> {
        self.materialized()?
            .into_iter()
            .map(|row| self.create_data_object(row))
            .collect()
    }

    fn records(&self) -> Result<Vec<Record>> {
        self.materialized()
    }

    fn count(&self) -> Result<usize> {
        Ok(self.materialized()?.len())
    }

    fn first(&self) -> Result<Option<DataObject>> {
        self.materialized()?
            .into_iter()
            .next()
            .map(|row| self.create_data_object(row))
            .transpose()
    }

    fn last(&self) -> Result<Option<DataObject>> {
        self.materialized()?
            .pop()
            .map(|row| self.create_data_object(row))
            .transpose()
    }

    fn column(&self, field: &str) -> Result<Vec<Value>> {
        Ok(self
            .materialized()?
            .into_iter()
            .map(|mut row| row.swap_remove(field).unwrap_or_default())
            .collect())
    }

    fn can_sort_by(&self, field: &str) -> bool {
        let field = field.trim().trim_matches('"');
        !field.is_empty() && !field.contains('.') && self.has_field(field)
    }

    fn can_filter_by(&self, field: &str) -> bool {
        match FilterKey::parse(field) {
            Ok(key) => key.is_plain() && self.has_field(&key.field),
            Err(_) => false,
        }
    }
}
