use crate::{query::RECORD_CLASS_NAME, AnyList, Db, EagerData, List};
use datalist_core::{record_id, schema::Relation, Error, Record, Result, Value};
use indexmap::IndexMap;

/// A materialized record of a known class.
///
/// Related data attached by eager loading is served from memory; anything
/// else is loaded through the handle the object was read with.
#[derive(Debug, Clone)]
pub struct DataObject {
    class: String,
    record: Record,
    eager: IndexMap<String, EagerData>,
    db: Option<Db>,
}

impl DataObject {
    /// A new, unsaved object.
    pub fn new(class: impl Into<String>) -> DataObject {
        DataObject {
            class: class.into(),
            record: Record::new(),
            eager: IndexMap::new(),
            db: None,
        }
    }

    pub fn with_record(class: impl Into<String>, record: Record) -> DataObject {
        DataObject {
            record,
            ..DataObject::new(class)
        }
    }

    /// Builds the object for a result row.
    ///
    /// The concrete class is `RecordClassName` if present, then `ClassName`,
    /// then `list_class`. With a handle the class must be a registered model.
    pub(crate) fn revive(list_class: &str, record: Record, db: Option<&Db>) -> Result<DataObject> {
        if record_id(&record).is_none() {
            return Err(Error::invalid_argument(format!(
                "Cannot create a {list_class} from a row without an ID"
            )));
        }

        let class = [RECORD_CLASS_NAME, "ClassName"]
            .iter()
            .find_map(|field| {
                record
                    .get(*field)
                    .and_then(Value::as_str)
                    .filter(|class| !class.is_empty())
            })
            .unwrap_or(list_class)
            .to_string();

        if let Some(db) = db {
            db.schema().expect_model(&class)?;
        }

        Ok(DataObject {
            class,
            record,
            eager: IndexMap::new(),
            db: db.cloned(),
        })
    }

    pub fn class(&self) -> &str {
        &self.class
    }

    pub fn id(&self) -> Option<i64> {
        record_id(&self.record)
    }

    /// The value of `field`, null when the record has no such field.
    pub fn get(&self, field: &str) -> &Value {
        static NULL: Value = Value::Null;
        self.record.get(field).unwrap_or(&NULL)
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.record.insert(field.into(), value.into());
        self
    }

    pub fn record(&self) -> &Record {
        &self.record
    }

    pub fn into_record(self) -> Record {
        self.record
    }

    /// Data attached for `relation` by eager loading.
    pub fn eager_loaded(&self, relation: &str) -> Option<&EagerData> {
        self.eager.get(relation)
    }

    pub(crate) fn eager(&self) -> &IndexMap<String, EagerData> {
        &self.eager
    }

    pub(crate) fn attach_eager(&mut self, relation: impl Into<String>, data: EagerData) {
        self.eager.insert(relation.into(), data);
    }

    pub(crate) fn attach(&mut self, db: Db) {
        self.db = Some(db);
    }

    /// The handle the object was loaded through.
    pub fn db(&self) -> Result<&Db> {
        self.db.as_ref().ok_or_else(|| {
            Error::bad_method_call(format!(
                "{} #{} is not attached to a database",
                self.class,
                self.id().unwrap_or_default()
            ))
        })
    }

    /// Follows a has_one or belongs_to relation.
    pub fn get_has_one(&self, name: &str) -> Result<Option<DataObject>> {
        if let Some(data) = self.eager.get(name) {
            return match data {
                EagerData::One(object) => Ok(object.clone()),
                EagerData::Many(_) => Err(to_many(&self.class, name)),
            };
        }

        let db = self.db()?;
        let schema = db.schema();
        let model = schema.expect_model(&self.class)?;

        match schema.expect_relation(model.id, name)? {
            Relation::HasOne(has_one) => {
                let Some(id) = self.get(&format!("{name}ID")).to_id().filter(|id| *id > 0) else {
                    return Ok(None);
                };

                let class = match has_one.target {
                    Some(target) => schema.model(target).name.clone(),
                    None => match self.get(&format!("{name}Class")).as_str() {
                        Some(class) if !class.is_empty() => class.to_string(),
                        _ => return Ok(None),
                    },
                };

                db.list(&class)?.by_id(id)
            }
            Relation::BelongsTo(belongs_to) => {
                let Some(id) = self.id() else {
                    return Ok(None);
                };

                let class = schema.model(belongs_to.target).name.clone();
                db.list(&class)?
                    .filter((format!("{}ID", belongs_to.via), id))?
                    .first()
            }
            _ => Err(to_many(&self.class, name)),
        }
    }

    /// Follows a has_many or many_many relation.
    pub fn get_many(&self, name: &str) -> Result<AnyList> {
        if let Some(data) = self.eager.get(name) {
            return match data {
                EagerData::Many(list) => Ok(AnyList::Eager(list.clone())),
                EagerData::One(_) => Err(Error::invalid_argument(format!(
                    "\"{name}\" on {} is not a to-many relation",
                    self.class
                ))),
            };
        }

        let db = self.db()?;
        let id = self.id().unwrap_or_default();
        let list = db.list(&self.class)?.by_ids(&[id])?.relation(name)?;
        Ok(AnyList::Lazy(list))
    }
}

fn to_many(class: &str, name: &str) -> Error {
    Error::invalid_argument(format!(
        "\"{name}\" on {class} is a to-many relation; use get_many"
    ))
}
