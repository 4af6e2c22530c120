//! Schema-aware SELECT construction.
//!
//! A [`DataQuery`] pairs a model with a [`SqlSelect`] and knows how to turn
//! field names, relation paths and filter predicates into qualified columns
//! and joins. Lists hold one and clone it for every derived list.

mod relation;
pub(crate) use relation::Resolved;

use datalist_core::{
    driver::Flavor,
    filter::Aggregate,
    schema::ModelId,
    Direction, Error, FilterClause, FilterKey, IntoSort, Limit, LimitLength, Predicate, Result, Schema,
    SortSpec, Value,
};
use datalist_sql::{
    ident, search, Condition, Connective, PredicateGroup, SqlSelect, Where,
};
use std::sync::Arc;

/// Alias under which the concrete class of every row is selected.
pub const RECORD_CLASS_NAME: &str = "RecordClassName";

#[derive(Debug, Clone)]
pub struct DataQuery {
    schema: Arc<Schema>,
    flavor: Flavor,
    model: ModelId,

    /// FROM, joins, predicates, ordering and limit. Selected columns are
    /// only the generated sort columns until the query is finalised.
    select: SqlSelect,

    /// Additional `(alias, expression)` columns, such as many_many extra
    /// fields.
    extra: Vec<(String, String)>,
}

impl DataQuery {
    /// A query over every record of `class`, subclasses included.
    pub fn new(schema: Arc<Schema>, flavor: Flavor, class: &str) -> Result<DataQuery> {
        let model = schema.expect_model(class)?;
        let model_id = model.id;
        let base = schema.base_model(model_id);

        let mut select = SqlSelect::from_table(&base.table);
        select.set_distinct(true);

        for id in schema.ancestry(model_id).into_iter().skip(1) {
            let table = &schema.model(id).table;
            select.add_left_join(
                table,
                format!(
                    "{} = {}",
                    ident::quote_column(table, "ID"),
                    ident::quote_column(&base.table, "ID")
                ),
                None,
            );
        }

        if !model.is_base() {
            let classes = schema.class_names_for(model_id);
            select.add_where(Where::new(
                format!(
                    "{} IN ({})",
                    ident::quote_column(&base.table, "ClassName"),
                    placeholders(classes.len())
                ),
                classes,
            ));
        }

        let default_sort = schema
            .ancestry(model_id)
            .into_iter()
            .rev()
            .find_map(|id| schema.model(id).default_sort.clone());

        let mut query = DataQuery {
            schema,
            flavor,
            model: model_id,
            select,
            extra: vec![],
        };

        if let Some(sort) = default_sort {
            query.sort(sort.as_str())?;
        }

        Ok(query)
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn model(&self) -> ModelId {
        self.model
    }

    pub fn class(&self) -> &str {
        &self.schema.model(self.model).name
    }

    pub fn flavor(&self) -> Flavor {
        self.flavor
    }

    /// The table holding `ID`, `ClassName` and the other root fields.
    pub fn base_table(&self) -> &str {
        &self.schema.base_model(self.model).table
    }

    /// `"BaseTable"."ID"`
    pub fn id_column(&self) -> String {
        ident::quote_column(self.base_table(), "ID")
    }

    /// The statement as built so far, without the finalised column list.
    pub fn statement(&self) -> &SqlSelect {
        &self.select
    }

    pub(crate) fn statement_mut(&mut self) -> &mut SqlSelect {
        &mut self.select
    }

    // ----- Filtering -----

    /// ANDs a parsed filter into the WHERE clause.
    ///
    /// A top-level conjunction adds one WHERE condition per clause.
    pub fn filter(&mut self, predicate: &Predicate) -> Result<()> {
        if let Predicate::And(items) = predicate {
            for item in items {
                self.filter(item)?;
            }
            return Ok(());
        }

        match self.condition(predicate)? {
            Some(Condition::Clause(clause)) => {
                self.select.add_where(clause);
            }
            Some(Condition::Group(group)) => {
                self.select.add_where_group(group);
            }
            None => {}
        }
        Ok(())
    }

    /// Removes the records `predicate` matches.
    ///
    /// Over plain columns and has_one paths the negated predicate is applied
    /// in place. Once a has_many or many_many path is involved, a record is
    /// removed when any of its related rows matches, so the matching IDs are
    /// selected separately and subtracted.
    pub fn exclude(&mut self, predicate: &Predicate) -> Result<()> {
        if !self.crosses_to_many(predicate)? {
            return self.filter(&predicate.clone().negate());
        }

        let mut matching = self.clone();
        matching.select.clear_order_by();
        matching.select.set_limit(None::<i64>, 0)?;
        matching.filter(predicate)?;

        let ids = matching.id_subquery("ID")?;
        self.select.add_where(Where {
            sql: format!("{} NOT IN ({})", self.id_column(), ids.sql),
            params: ids.params,
        });
        Ok(())
    }

    /// Returns `true` if any clause reaches through a relation that can
    /// yield several rows per record.
    fn crosses_to_many(&self, predicate: &Predicate) -> Result<bool> {
        for clause in predicate.clauses() {
            if clause.key.aggregate.is_some() || clause.key.path.is_empty() {
                continue;
            }

            let mut scratch = self.clone();
            if scratch.join_relation_path(&clause.key.path)?.to_many {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Builds the condition for a predicate tree. `None` matches every row.
    fn condition(&mut self, predicate: &Predicate) -> Result<Option<Condition>> {
        let (connective, items) = match predicate {
            Predicate::Clause(clause) => return Ok(self.clause(clause)?.map(Condition::Clause)),
            Predicate::And(items) => (Connective::And, items),
            Predicate::Or(items) => (Connective::Or, items),
        };

        let mut group = PredicateGroup::new(connective);
        for item in items {
            match self.condition(item)? {
                Some(condition) => group.push_condition(condition),
                // One branch of an OR matching everything makes the whole OR
                // match everything.
                None if connective == Connective::Or => return Ok(None),
                None => {}
            }
        }

        Ok((!group.is_empty()).then_some(Condition::Group(group)))
    }

    fn clause(&mut self, clause: &FilterClause) -> Result<Option<Where>> {
        let key = &clause.key;

        if let Some(aggregate) = &key.aggregate {
            let column = self.aggregate_column(key, aggregate)?;
            return Ok(search::filter_to_where(clause, &column, self.flavor));
        }

        let resolved = self.join_relation_path(&key.path)?;
        if resolved.to_many {
            self.select.set_distinct(true);
        }

        let column = self.resolve_column(&resolved, &key.field)?;
        Ok(search::filter_to_where(clause, &column, self.flavor))
    }

    /// Adds a raw predicate.
    pub fn where_(&mut self, predicate: impl Into<Where>) {
        self.select.add_where(predicate);
    }

    /// Adds raw predicates as one OR condition.
    pub fn where_any(&mut self, predicates: impl IntoIterator<Item = impl Into<Where>>) {
        self.select.where_any(predicates);
    }

    /// Restricts the query to the given primary keys.
    ///
    /// Always compares the base table's `ID`, whatever subclass tables are
    /// joined.
    pub fn by_ids(&mut self, ids: &[i64]) {
        if ids.is_empty() {
            self.select.add_where("1 = 0");
            return;
        }

        let column = self.id_column();
        self.select.add_where(Where::new(
            format!("{column} IN ({})", placeholders(ids.len())),
            ids.iter().copied(),
        ));
    }

    /// Removes the rows `other` would return.
    pub fn subtract(&mut self, other: &DataQuery) -> Result<()> {
        if other.model != self.model {
            return Err(Error::invalid_argument(format!(
                "subtract() expects a list of {}, got a list of {}",
                self.class(),
                other.class()
            )));
        }

        let ids = other.id_subquery("ID")?;
        self.select.add_where(Where {
            sql: format!("{} NOT IN ({})", self.id_column(), ids.sql),
            params: ids.params,
        });
        Ok(())
    }

    // ----- Sorting -----

    /// Replaces the ordering. `None` clears it.
    pub fn sort(&mut self, sort: impl IntoSort) -> Result<()> {
        match sort.into_sort()? {
            Some(spec) => {
                let resolved = self.resolve_sort(spec)?;
                self.select.set_order_by(resolved)?;
            }
            None => {
                self.select.clear_order_by();
            }
        }
        Ok(())
    }

    /// Replaces the ordering with raw SQL expressions, bypassing field
    /// resolution.
    pub fn order_by(&mut self, sort: impl IntoSort) -> Result<()> {
        self.select.set_order_by(sort)?;
        Ok(())
    }

    /// Flips the ordering. An unsorted query is first ordered by `ID`.
    pub fn reverse_sort(&mut self) {
        if !self.has_sort() {
            self.sort_by_id();
        }
        self.select.reverse_order_by();
    }

    /// Orders by the base table's `ID`, ascending.
    pub fn sort_by_id(&mut self) {
        let mut spec = SortSpec::default();
        spec.push(self.id_column(), Direction::Asc);
        self.select.push_order_by(spec);
    }

    pub fn has_sort(&self) -> bool {
        !self.select.order_by().is_empty()
    }

    fn resolve_sort(&mut self, spec: SortSpec) -> Result<SortSpec> {
        let mut ret = SortSpec::default();
        for term in spec.terms {
            let expr = if term.is_path() {
                self.sort_column(&term.unquoted())?
            } else {
                term.expr.clone()
            };
            ret.push(expr, term.direction);
        }
        Ok(ret)
    }

    /// Resolves a field name, `Table.Field` reference or has_one path to the
    /// column to order by.
    fn sort_column(&mut self, path: &str) -> Result<String> {
        let mut segments: Vec<String> = path.split('.').map(str::to_string).collect();
        let field = segments.pop().unwrap_or_default();

        if segments.is_empty() {
            if let Some(column) = self.column("", self.model, &field) {
                return Ok(column);
            }
            if self.selects_alias(&field) {
                return Ok(ident::quote(&field));
            }
            return Err(Error::invalid_argument(format!(
                "Invalid sort column \"{field}\" for {}",
                self.class()
            )));
        }

        if segments.len() == 1
            && self.schema.relation(self.model, &segments[0]).is_none()
            && self.select.contains_alias(&segments[0])
        {
            return Ok(ident::quote_column(&segments[0], &field));
        }

        let resolved = self.join_relation_path(&segments)?;
        if resolved.to_many {
            return Err(Error::invalid_argument(format!(
                "Cannot sort by \"{path}\": the relation path is non-linear; \
                 only has_one and belongs_to relations can be sorted through"
            )));
        }

        self.resolve_column(&resolved, &field)
    }

    /// Returns `true` if `alias` names an extra column or a column already in
    /// the select list.
    fn selects_alias(&self, alias: &str) -> bool {
        self.extra.iter().any(|(existing, _)| existing == alias)
            || self.select.select().contains_key(alias)
    }

    // ----- Limit / distinct / joins -----

    pub fn limit(&mut self, length: impl Into<LimitLength>, offset: i64) -> Result<()> {
        self.select.set_limit(length, offset)?;
        Ok(())
    }

    pub fn current_limit(&self) -> Limit {
        self.select.limit()
    }

    pub fn distinct(&mut self, distinct: bool) {
        self.select.set_distinct(distinct);
    }

    pub fn inner_join(&mut self, table: &str, on: &str, alias: Option<&str>) {
        self.select.add_inner_join(table, on, alias);
    }

    pub fn left_join(&mut self, table: &str, on: &str, alias: Option<&str>) {
        self.select.add_left_join(table, on, alias);
    }

    /// Selects an extra column alongside the model's fields.
    pub fn select_extra(&mut self, alias: impl Into<String>, expr: impl Into<String>) {
        let alias = alias.into();
        self.extra.retain(|(existing, _)| *existing != alias);
        self.extra.push((alias, expr.into()));
    }

    // ----- Introspection -----

    /// Returns `true` if `field` names a column or a has_one path this
    /// query could order by. Runs no SQL.
    pub fn can_sort_by(&self, field: &str) -> bool {
        let mut scratch = self.clone();
        scratch.sort_column(field).is_ok()
    }

    /// Returns `true` if `field` names a column, foreign key or relation path
    /// this query could filter on. Runs no SQL.
    pub fn can_filter_by(&self, field: &str) -> bool {
        let Ok(key) = FilterKey::parse(field) else {
            return false;
        };

        let mut scratch = self.clone();
        match &key.aggregate {
            Some(aggregate) => scratch.aggregate_column(&key, aggregate).is_ok(),
            None => scratch
                .join_relation_path(&key.path)
                .and_then(|resolved| scratch.resolve_column(&resolved, &key.field))
                .is_ok(),
        }
    }

    // ----- Finalised statements -----

    /// The statement that loads full records: every field of the model, its
    /// ancestors and its subclasses, plus `RecordClassName`.
    pub fn finalised(&self) -> SqlSelect {
        let mut query = self.clone();
        query.select_all_fields();
        query.select
    }

    fn select_all_fields(&mut self) {
        let schema = self.schema.clone();
        let base = schema.base_model(self.model);
        let models = schema
            .ancestry(self.model)
            .into_iter()
            .chain(schema.descendants(self.model));

        // Keep generated sort columns after the fields.
        let generated: Vec<(String, String)> = self
            .select
            .select()
            .iter()
            .map(|(alias, expr)| (alias.clone(), expr.clone()))
            .collect();

        let mut columns: Vec<(String, String)> = vec![];
        for id in models {
            let model = schema.model(id);
            for field in model.fields.keys() {
                if columns.iter().any(|(alias, _)| alias == field) {
                    continue;
                }
                let alias = self.join_table("", self.model, &model.table);
                columns.push((field.clone(), ident::quote_column(&alias, field)));
            }
        }

        columns.push((
            RECORD_CLASS_NAME.to_string(),
            ident::quote_column(&base.table, "ClassName"),
        ));

        self.select
            .set_select(columns)
            .add_select(self.extra.clone())
            .add_select(generated);
    }

    /// Selects a single resolved column, keeping the ordering.
    pub fn column_statement(&self, field: &str) -> Result<SqlSelect> {
        let mut query = self.clone();
        let column = query.field_column(field)?;

        let generated: Vec<(String, String)> = query
            .select
            .select()
            .iter()
            .map(|(alias, expr)| (alias.clone(), expr.clone()))
            .collect();

        query
            .select
            .set_select([(field.to_string(), column)])
            .add_select(generated);
        Ok(query.select)
    }

    /// Counts distinct records.
    pub fn count_statement(&self) -> SqlSelect {
        let column = format!("DISTINCT {}", self.id_column());
        self.finalised().count(Some(&column))
    }

    /// Selects `FUNC(column)` over the matching records, e.g. `MAX` of a
    /// field.
    pub fn aggregate_statement(&self, function: &str, field: &str) -> Result<SqlSelect> {
        let mut query = self.clone();
        let column = query.field_column(field)?;
        query.select.aggregate(&format!("{function}({column})"), None)
    }

    /// Renders a sub-select returning `field` for every matching record,
    /// for use in `... IN (...)`.
    pub(crate) fn id_subquery(&self, field: &str) -> Result<Where> {
        let mut statement = self.column_statement(field)?;

        if statement.limit() == Limit::default() {
            statement.clear_order_by();
            return Ok(statement.fragment(self.flavor));
        }

        // Ordered and limited: keep the sort columns inside and project the
        // single column outside.
        let mut outer = SqlSelect::new();
        outer
            .select_field(ident::quote_column("ids", field), None)
            .add_from_subquery("ids", statement);
        Ok(outer.fragment(self.flavor))
    }

    /// Resolves a root field, failing for unknown columns.
    fn field_column(&mut self, field: &str) -> Result<String> {
        if let Some(column) = self.column("", self.model, field) {
            return Ok(column);
        }

        match self.extra.iter().find(|(alias, _)| alias == field) {
            Some((_, expr)) => Ok(expr.clone()),
            None => Err(Error::invalid_argument(format!(
                "Invalid column \"{field}\" for {}",
                self.class()
            ))),
        }
    }

    /// Resolves `field` on records of `model` reached through `prefix`,
    /// joining the subclass table that stores it when needed.
    pub(crate) fn column(&mut self, prefix: &str, model: ModelId, field: &str) -> Option<String> {
        let schema = self.schema.clone();
        let holder = schema.table_for_field(model, field)?;
        let alias = self.join_table(prefix, model, &holder.table);
        Some(ident::quote_column(&alias, field))
    }

    /// Ensures `table`, one of the tables in `model`'s hierarchy, is joined
    /// under `prefix` and returns its alias.
    fn join_table(&mut self, prefix: &str, model: ModelId, table: &str) -> String {
        let base_table = self.schema.base_model(model).table.clone();
        let alias = format!("{prefix}{table}");
        let base_alias = format!("{prefix}{base_table}");

        if alias != base_alias && !self.select.contains_alias(&alias) {
            self.select.add_left_join(
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
    }

    /// The column a relation path ends on, including many_many extra fields.
    pub(crate) fn resolve_column(&mut self, resolved: &Resolved, field: &str) -> Result<String> {
        if let Some((alias, extra)) = &resolved.join_table {
            if extra.iter().any(|name| name == field) {
                return Ok(ident::quote_column(alias, field));
            }
        }

        if resolved.prefix.is_empty() {
            if let Some((_, expr)) = self.extra.iter().find(|(alias, _)| alias == field) {
                return Ok(expr.clone());
            }
        }

        self.column(&resolved.prefix, resolved.model, field)
            .ok_or_else(|| {
                Error::invalid_argument(format!(
                    "Invalid column \"{field}\" for {}",
                    self.schema.model(resolved.model).name
                ))
            })
    }

    /// A correlated sub-select computing `Relation.Function(Column)` for the
    /// row the path's owner resolves to.
    fn aggregate_column(&mut self, key: &FilterKey, aggregate: &Aggregate) -> Result<String> {
        let Some((relation, path)) = key.path.split_last() else {
            return Err(Error::invalid_argument(format!(
                "Aggregate filter \"{}\" must name a relation",
                key.source
            )));
        };

        let owner = self.join_relation_path(path)?;
        if owner.to_many {
            return Err(Error::invalid_argument(format!(
                "Cannot aggregate \"{}\": the relation path is non-linear",
                key.source
            )));
        }

        let sub = self.aggregate_subquery(&owner, relation, aggregate, &key.source)?;
        Ok(format!("({sub})"))
    }
}

/// `?, ?, ?`
pub(crate) fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

/// A quoted SQL string literal.
pub(crate) fn literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Reads the first column of a one-row aggregate result.
pub(crate) fn scalar(records: Vec<datalist_core::Record>) -> Value {
    records
        .into_iter()
        .next()
        .and_then(|record| record.into_iter().next().map(|(_, value)| value))
        .unwrap_or_default()
}
