use super::eager_load::{self, PathTree};
use crate::query::{placeholders, scalar, DataQuery};
use crate::{DataObject, Db, List};
use datalist_core::{
    schema::{ManyManyComponent, Relation},
    Combine, Error, Filter, IntoSort, LimitLength, Record, Result, Value,
};
use datalist_sql::{ident, Statement, Where};

/// Column carrying the owner's ID when a many_many batch is loaded for
/// several owners at once.
pub(crate) const PARENT_ID: &str = "_ParentID";

/// A lazy, database-backed list of records.
///
/// Every terminal operation runs one statement (plus one per eager-loaded
/// relation). Derivations clone the underlying query.
#[derive(Debug, Clone)]
pub struct DataList {
    db: Db,
    query: DataQuery,

    /// Relation paths loaded along with the records
    eager: Vec<String>,
}

impl DataList {
    pub(crate) fn new(db: Db, class: &str) -> Result<DataList> {
        let query = DataQuery::new(db.schema_arc(), db.flavor(), class)?;
        Ok(DataList {
            db,
            query,
            eager: vec![],
        })
    }

    pub fn db(&self) -> &Db {
        &self.db
    }

    pub fn query(&self) -> &DataQuery {
        &self.query
    }

    fn alter(&self, f: impl FnOnce(&mut DataQuery) -> Result<()>) -> Result<DataList> {
        let mut ret = self.clone();
        f(&mut ret.query)?;
        Ok(ret)
    }

    fn alter_infallible(&self, f: impl FnOnce(&mut DataQuery)) -> DataList {
        let mut ret = self.clone();
        f(&mut ret.query);
        ret
    }

    /// `sort_by("Name", "DESC")`
    pub fn sort_by(&self, field: &str, direction: &str) -> Result<DataList> {
        self.sort((field, direction))
    }

    /// Orders by raw SQL expressions.
    pub fn order_by(&self, sort: impl IntoSort) -> Result<DataList> {
        self.alter(|query| query.order_by(sort))
    }

    pub fn distinct(&self, distinct: bool) -> DataList {
        self.alter_infallible(|query| query.distinct(distinct))
    }

    pub fn inner_join(&self, table: &str, on: &str, alias: Option<&str>) -> DataList {
        self.alter_infallible(|query| query.inner_join(table, on, alias))
    }

    pub fn left_join(&self, table: &str, on: &str, alias: Option<&str>) -> DataList {
        self.alter_infallible(|query| query.left_join(table, on, alias))
    }

    /// Removes every record `other` contains. Both lists must be of the
    /// same class.
    pub fn subtract(&self, other: &DataList) -> Result<DataList> {
        self.alter(|query| query.subtract(&other.query))
    }

    /// Adds a raw SQL predicate.
    pub fn where_(&self, predicate: impl Into<Where>) -> DataList {
        self.alter_infallible(|query| query.where_(predicate))
    }

    /// Adds raw SQL predicates, any of which may match.
    pub fn where_any(&self, predicates: impl IntoIterator<Item = impl Into<Where>>) -> DataList {
        self.alter_infallible(|query| query.where_any(predicates))
    }

    pub fn max(&self, field: &str) -> Result<Value> {
        self.aggregate("MAX", field)
    }

    pub fn min(&self, field: &str) -> Result<Value> {
        self.aggregate("MIN", field)
    }

    pub fn avg(&self, field: &str) -> Result<Value> {
        self.aggregate("AVG", field)
    }

    pub fn sum(&self, field: &str) -> Result<Value> {
        self.aggregate("SUM", field)
    }

    fn aggregate(&self, function: &str, field: &str) -> Result<Value> {
        let statement = self.query.aggregate_statement(function, field)?;
        Ok(scalar(self.db.query(&statement)?))
    }

    /// The records related to this list's records through `name`.
    pub fn relation(&self, name: &str) -> Result<DataList> {
        let schema = self.db.schema_arc();
        let model = self.query.model();

        match schema.expect_relation(model, name)? {
            Relation::HasOne(has_one) => {
                let Some(target) = has_one.target else {
                    return Err(Error::invalid_argument(format!(
                        "Cannot list polymorphic has_one \"{name}\" on {}",
                        self.query.class()
                    )));
                };

                let ids = self.query.id_subquery(&format!("{name}ID"))?;
                let list = DataList::new(self.db.clone(), &schema.model(target).name)?;
                let column = list.query.id_column();
                Ok(list.where_(Where {
                    sql: format!("{column} IN ({})", ids.sql),
                    params: ids.params,
                }))
            }
            Relation::BelongsTo(belongs_to) => {
                self.reverse_relation(belongs_to.target, &belongs_to.via, false)
            }
            Relation::HasMany(has_many) => {
                self.reverse_relation(has_many.target, &has_many.via, has_many.polymorphic)
            }
            _ => {
                let component = schema
                    .many_many_component(model, name)
                    .ok_or_else(|| Error::invalid_schema(format!("{name} is not a many_many relation")))?;
                let ids = self.query.id_subquery("ID")?;
                DataList::many_many(&self.db, &component, ids, false)
            }
        }
    }

    /// Records of `target` whose `<via>ID` points at one of this list's
    /// records.
    fn reverse_relation(&self, target: datalist_core::schema::ModelId, via: &str, polymorphic: bool) -> Result<DataList> {
        let schema = self.db.schema_arc();
        let ids = self.query.id_subquery("ID")?;
        let mut list = DataList::new(self.db.clone(), &schema.model(target).name)?;

        let key = format!("{via}ID");
        let column = list
            .query
            .column("", target, &key)
            .ok_or_else(|| Error::invalid_schema(format!("{} has no {key} column", list.query.class())))?;
        list.query.where_(Where {
            sql: format!("{column} IN ({})", ids.sql),
            params: ids.params,
        });

        if polymorphic {
            let classes = schema.class_names_for(self.query.model());
            list = list.filter((format!("{via}Class"), classes))?;
        }

        Ok(list)
    }

    /// Records of the relation's target linked, through its join table, to
    /// any owner in `owners`, a sub-select or placeholder list.
    ///
    /// Extra fields are selected under their own names. With `parent_column`
    /// set, the owner's ID is selected as `_ParentID`.
    pub(crate) fn many_many(
        db: &Db,
        component: &ManyManyComponent,
        owners: Where,
        parent_column: bool,
    ) -> Result<DataList> {
        let schema = db.schema_arc();
        let mut list = DataList::new(db.clone(), &schema.model(component.target).name)?;

        let join_table = &component.join_table;
        let on = format!(
            "{} = {}",
            ident::quote_column(join_table, &component.child_key),
            list.query.id_column()
        );
        let parent_key = ident::quote_column(join_table, &component.parent_key);

        let query = &mut list.query;
        query.inner_join(join_table, &on, None);
        query.where_(Where {
            sql: format!("{parent_key} IN ({})", owners.sql),
            params: owners.params,
        });

        for field in component.extra_fields.keys() {
            query.select_extra(field, ident::quote_column(join_table, field));
        }
        if parent_column {
            query.select_extra(PARENT_ID, parent_key);
        }

        Ok(list)
    }

    /// Owners' links for an eager-load batch.
    pub(crate) fn many_many_for(db: &Db, component: &ManyManyComponent, owners: &[i64]) -> Result<DataList> {
        let owners = Where::new(placeholders(owners.len()), owners.iter().copied());
        DataList::many_many(db, component, owners, true)
    }

    /// Loads `paths` along with the records, one statement per relation.
    ///
    /// Paths are validated immediately: every segment must name a relation
    /// and no path may be deeper than the configured maximum.
    pub fn eager_load<I, S>(&self, paths: I) -> Result<DataList>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut ret = self.clone();
        for path in paths {
            let path = path.into();
            eager_load::validate(
                self.db.schema(),
                self.query.model(),
                &path,
                self.db.max_eager_load_depth(),
            )?;
            if !ret.eager.contains(&path) {
                ret.eager.push(path);
            }
        }
        Ok(ret)
    }

    /// The SELECT `to_vec` would run, with its parameters.
    pub fn sql(&self) -> (String, Vec<Value>) {
        let mut params = vec![];
        let sql = self
            .query
            .finalised()
            .serialize(self.db.flavor(), &mut params);
        (sql, params)
    }

    fn materialize(&self, records: Vec<Record>) -> Result<Vec<DataObject>> {
        let class = self.query.class();
        let mut objects = records
            .into_iter()
            .map(|record| DataObject::revive(class, record, Some(&self.db)))
            .collect::<Result<Vec<_>>>()?;

        if !self.eager.is_empty() && !objects.is_empty() {
            let tree = PathTree::new(&self.eager);
            eager_load::load(&self.db, self.query.model(), &mut objects, &tree)?;
        }

        Ok(objects)
    }

    fn first_of(&self, records: Vec<Record>) -> Result<Option<DataObject>> {
        Ok(self.materialize(records)?.into_iter().next())
    }
}

impl List for DataList {
    fn data_class(&self) -> &str {
        self.query.class()
    }

    fn filter(&self, filter: impl Into<Filter>) -> Result<DataList> {
        let predicate = filter.into().to_predicate(Combine::All)?;
        self.alter(|query| query.filter(&predicate))
    }

    fn filter_any(&self, filter: impl Into<Filter>) -> Result<DataList> {
        let predicate = filter.into().to_predicate(Combine::Any)?;
        self.alter(|query| query.filter(&predicate))
    }

    fn exclude(&self, filter: impl Into<Filter>) -> Result<DataList> {
        let predicate = filter.into().to_predicate(Combine::All)?;
        self.alter(|query| query.exclude(&predicate))
    }

    fn exclude_any(&self, filter: impl Into<Filter>) -> Result<DataList> {
        let predicate = filter.into().to_predicate(Combine::Any)?;
        self.alter(|query| query.exclude(&predicate))
    }

    fn sort(&self, sort: impl IntoSort) -> Result<DataList> {
        self.alter(|query| query.sort(sort))
    }

    fn limit(&self, length: impl Into<LimitLength>, offset: i64) -> Result<DataList> {
        self.alter(|query| query.limit(length, offset))
    }

    fn reverse(&self) -> DataList {
        self.alter_infallible(DataQuery::reverse_sort)
    }

    fn by_ids(&self, ids: &[i64]) -> Result<DataList> {
        Ok(self.alter_infallible(|query| query.by_ids(ids)))
    }

    fn to_vec(&self) -> Result<Vec<DataObject>> {
        let records = self.records()?;
        self.materialize(records)
    }

    fn records(&self) -> Result<Vec<Record>> {
        self.db.query(&self.query.finalised())
    }

    fn count(&self) -> Result<usize> {
        let value = scalar(self.db.query(&self.query.count_statement())?);
        Ok(value.as_i64().unwrap_or_default().max(0) as usize)
    }

    fn exists(&self) -> Result<bool> {
        if self.query.current_limit().length == Some(0) {
            return Ok(false);
        }
        let statement = self.query.finalised().first_row();
        Ok(!self.db.query(&statement)?.is_empty())
    }

    fn first(&self) -> Result<Option<DataObject>> {
        if self.query.current_limit().length == Some(0) {
            return Ok(None);
        }
        let records = self.db.query(&self.query.finalised().first_row())?;
        self.first_of(records)
    }

    fn last(&self) -> Result<Option<DataObject>> {
        if self.query.current_limit().length == Some(0) {
            return Ok(None);
        }

        let mut query = self.query.clone();
        if !query.has_sort() {
            query.sort_by_id();
        }
        let records = self.db.query(&query.finalised().last_row()?)?;
        self.first_of(records)
    }

    fn column(&self, field: &str) -> Result<Vec<Value>> {
        let statement = self.query.column_statement(field)?;
        Ok(self
            .db
            .query(&statement)?
            .into_iter()
            .map(|mut record| record.swap_remove(field).unwrap_or_default())
            .collect())
    }

    fn can_sort_by(&self, field: &str) -> bool {
        self.query.can_sort_by(field)
    }

    fn can_filter_by(&self, field: &str) -> bool {
        self.query.can_filter_by(field)
    }
}
