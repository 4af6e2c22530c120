mod from;
pub use from::{FromEntry, Join, JoinKind, DEFAULT_JOIN_ORDER};
use from::FromItem;

mod group;
pub use group::{Clause, SubGroup};

mod render;

use crate::{ident, Condition, Connective, Flavor, Params, Positional, PredicateGroup, Statement, Where};
use datalist_core::{Direction, Error, IntoSort, Limit, LimitLength, Result, Value};
use indexmap::IndexMap;
use regex::Regex;
use std::sync::LazyLock;

/// Prefix of the select columns generated for raw ORDER BY expressions.
pub const SORT_COLUMN_PREFIX: &str = "_SortColumn";

/// Alias of the subquery a limited statement's last row is selected from.
const WINDOW_ALIAS: &str = "_Window";

/// A SELECT statement under construction.
///
/// Columns and FROM entries are keyed by alias and keep insertion order.
/// Predicates are stored as trees; empty groups render as nothing.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlSelect {
    /// alias => expression
    select: IndexMap<String, String>,

    /// alias => table, join or sub-select
    from: IndexMap<String, FromItem>,

    where_: PredicateGroup,
    having: PredicateGroup,
    group_by: Vec<String>,
    order_by: Vec<(String, Direction)>,
    limit: Limit,
    distinct: bool,
    unions: Vec<(SqlSelect, Option<UnionType>)>,
    with: IndexMap<String, Cte>,
}

/// A selected column, optionally aliased.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectColumn {
    pub alias: Option<String>,
    pub expr: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnionType {
    All,
    Distinct,
}

/// A named common table expression.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Cte {
    pub(crate) query: SqlSelect,
    pub(crate) columns: Vec<String>,
    pub(crate) recursive: bool,
}

impl Default for SqlSelect {
    fn default() -> SqlSelect {
        SqlSelect::new()
    }
}

impl SqlSelect {
    pub fn new() -> SqlSelect {
        SqlSelect {
            select: IndexMap::new(),
            from: IndexMap::new(),
            where_: PredicateGroup::new(Connective::And),
            having: PredicateGroup::new(Connective::And),
            group_by: vec![],
            order_by: vec![],
            limit: Limit::default(),
            distinct: false,
            unions: vec![],
            with: IndexMap::new(),
        }
    }

    /// `SELECT * FROM "table"`
    pub fn from_table(table: &str) -> SqlSelect {
        let mut select = SqlSelect::new();
        select.set_from(ident::quote(table));
        select
    }

    // ----- SELECT -----

    /// Replaces the selected columns.
    pub fn set_select(
        &mut self,
        columns: impl IntoIterator<Item = impl Into<SelectColumn>>,
    ) -> &mut Self {
        self.select.clear();
        self.add_select(columns)
    }

    /// Appends columns; an alias that is already selected is replaced in place.
    pub fn add_select(
        &mut self,
        columns: impl IntoIterator<Item = impl Into<SelectColumn>>,
    ) -> &mut Self {
        for column in columns {
            let column = column.into();
            self.select_field(column.expr, column.alias.as_deref());
        }
        self
    }

    /// Selects one expression, inferring its alias when none is given.
    pub fn select_field(&mut self, expr: impl Into<String>, alias: Option<&str>) -> &mut Self {
        let expr = expr.into();
        let alias = match alias {
            Some(alias) => alias.to_string(),
            None => ident::infer_alias(&expr),
        };
        self.select.insert(alias, expr);
        self
    }

    pub fn select(&self) -> &IndexMap<String, String> {
        &self.select
    }

    pub fn remove_select(&mut self, alias: &str) -> Option<String> {
        self.select.shift_remove(alias)
    }

    // ----- FROM -----

    /// Replaces every FROM entry, joins included.
    pub fn set_from(&mut self, entry: impl Into<FromEntry>) -> &mut Self {
        self.from.clear();
        self.add_from(entry)
    }

    /// Adds a table or raw join clause. An alias already present is
    /// overridden in place; other entries are left untouched.
    pub fn add_from(&mut self, entry: impl Into<FromEntry>) -> &mut Self {
        let entry = entry.into();
        self.from.insert(entry.alias, FromItem::Raw(entry.clause));
        self
    }

    /// Uses a sub-select as a FROM entry.
    pub fn add_from_subquery(&mut self, alias: impl Into<String>, query: SqlSelect) -> &mut Self {
        self.from
            .insert(alias.into(), FromItem::Subquery(Box::new(query)));
        self
    }

    pub fn add_inner_join(&mut self, table: &str, on: impl Into<String>, alias: Option<&str>) -> &mut Self {
        self.add_join(Join::new(JoinKind::Inner, table, on), alias)
    }

    pub fn add_left_join(&mut self, table: &str, on: impl Into<String>, alias: Option<&str>) -> &mut Self {
        self.add_join(Join::new(JoinKind::Left, table, on), alias)
    }

    pub fn add_right_join(&mut self, table: &str, on: impl Into<String>, alias: Option<&str>) -> &mut Self {
        self.add_join(Join::new(JoinKind::Right, table, on), alias)
    }

    /// Adds a configured join under `alias`, defaulting to its table name.
    pub fn add_join(&mut self, join: Join, alias: Option<&str>) -> &mut Self {
        let alias = alias.unwrap_or(&join.table).to_string();
        self.from.insert(alias, FromItem::Join(join));
        self
    }

    pub fn contains_alias(&self, alias: &str) -> bool {
        self.from.contains_key(alias)
    }

    pub fn from_aliases(&self) -> impl Iterator<Item = &str> {
        self.from.keys().map(String::as_str)
    }

    /// Returns the join registered under `alias`.
    pub fn join(&self, alias: &str) -> Option<&Join> {
        match self.from.get(alias) {
            Some(FromItem::Join(join)) => Some(join),
            _ => None,
        }
    }

    pub fn remove_from(&mut self, alias: &str) -> bool {
        self.from.shift_remove(alias).is_some()
    }

    // ----- WHERE / HAVING -----

    pub fn set_where(&mut self, predicate: impl Into<Where>) -> &mut Self {
        self.where_.clear();
        self.add_where(predicate)
    }

    pub fn add_where(&mut self, predicate: impl Into<Where>) -> &mut Self {
        self.where_.push(predicate);
        self
    }

    /// Adds the predicates as one `(a) OR (b)` condition.
    pub fn where_any(&mut self, predicates: impl IntoIterator<Item = impl Into<Where>>) -> &mut Self {
        self.where_.push_any(predicates);
        self
    }

    pub fn set_where_any(
        &mut self,
        predicates: impl IntoIterator<Item = impl Into<Where>>,
    ) -> &mut Self {
        self.where_.clear();
        self.where_any(predicates)
    }

    pub fn where_group(&self) -> &PredicateGroup {
        &self.where_
    }

    /// Adds a prebuilt predicate tree as one WHERE condition.
    pub fn add_where_group(&mut self, group: PredicateGroup) -> &mut Self {
        if !group.is_empty() {
            self.where_.push_condition(Condition::Group(group));
        }
        self
    }

    pub fn set_having(&mut self, predicate: impl Into<Where>) -> &mut Self {
        self.having.clear();
        self.add_having(predicate)
    }

    pub fn add_having(&mut self, predicate: impl Into<Where>) -> &mut Self {
        self.having.push(predicate);
        self
    }

    pub fn having_group(&self) -> &PredicateGroup {
        &self.having
    }

    /// Opens an OR group inside the WHERE or HAVING tree.
    pub fn disjunctive_group(&mut self, clause: Clause) -> SubGroup<'_> {
        self.group(clause, Connective::Or)
    }

    /// Opens an AND group inside the WHERE or HAVING tree.
    pub fn conjunctive_group(&mut self, clause: Clause) -> SubGroup<'_> {
        self.group(clause, Connective::And)
    }

    fn group(&mut self, clause: Clause, connective: Connective) -> SubGroup<'_> {
        let tree = match clause {
            Clause::Where => &mut self.where_,
            Clause::Having => &mut self.having,
        };
        SubGroup::new(tree, connective, clause)
    }

    /// Returns `true` if a top-level WHERE clause compares a primary key.
    pub fn filters_on_id(&self) -> bool {
        static ID: LazyLock<Regex> =
            LazyLock::new(|| Regex::new(r#"^(.*\.)?("|`)?ID("|`)?\s?(=|IN)"#).unwrap());
        self.where_.clauses().any(|clause| ID.is_match(&clause.sql))
    }

    /// Returns `true` if a top-level WHERE clause compares a `...ID` column.
    pub fn filters_on_fk(&self) -> bool {
        static FK: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(r#"^(.*\.)?("|`)?[a-zA-Z]+ID("|`)?\s?(=|IN)"#).unwrap()
        });
        self.where_.clauses().any(|clause| FK.is_match(&clause.sql))
    }

    // ----- ORDER BY / GROUP BY -----

    /// Replaces the ordering. `None` clears it.
    pub fn set_order_by(&mut self, sort: impl IntoSort) -> Result<&mut Self> {
        let sort = sort.into_sort()?;
        self.clear_order_by();
        if let Some(sort) = sort {
            self.push_order_by(sort);
        }
        Ok(self)
    }

    /// Appends to the ordering.
    ///
    /// Raw expressions are selected as `_SortColumnN` and ordered by that
    /// alias; column references and selected aliases are ordered directly.
    pub fn add_order_by(&mut self, sort: impl IntoSort) -> Result<&mut Self> {
        if let Some(sort) = sort.into_sort()? {
            self.push_order_by(sort);
        }
        Ok(self)
    }

    /// Appends an already parsed ordering.
    pub fn push_order_by(&mut self, sort: datalist_core::SortSpec) {
        for term in sort.terms {
            let expr = term.expr.trim().to_string();
            let target = self.order_target(expr);

            match self.order_by.iter_mut().find(|(existing, _)| *existing == target) {
                Some(existing) => existing.1 = term.direction,
                None => self.order_by.push((target, term.direction)),
            }
        }
    }

    fn order_target(&mut self, expr: String) -> String {
        if ident::is_column_reference(&expr) || expr.parse::<i64>().is_ok() {
            return expr;
        }

        if let Some((alias, _)) = self.select.iter().find(|(_, selected)| **selected == expr) {
            return ident::quote(alias);
        }

        let alias = (0..)
            .map(|i| format!("{SORT_COLUMN_PREFIX}{i}"))
            .find(|alias| !self.select.contains_key(alias))
            .unwrap_or_default();
        self.select.insert(alias.clone(), expr);
        ident::quote(&alias)
    }

    /// Drops the ordering and the columns generated for it.
    pub fn clear_order_by(&mut self) -> &mut Self {
        self.order_by.clear();
        self.select
            .retain(|alias, _| !alias.starts_with(SORT_COLUMN_PREFIX));
        self
    }

    pub fn order_by(&self) -> &[(String, Direction)] {
        &self.order_by
    }

    /// Flips every direction.
    pub fn reverse_order_by(&mut self) -> &mut Self {
        for (_, direction) in &mut self.order_by {
            *direction = direction.reverse();
        }
        self
    }

    pub fn set_group_by(&mut self, columns: impl IntoIterator<Item = impl Into<String>>) -> &mut Self {
        self.group_by.clear();
        self.add_group_by(columns)
    }

    pub fn add_group_by(&mut self, columns: impl IntoIterator<Item = impl Into<String>>) -> &mut Self {
        self.group_by.extend(columns.into_iter().map(Into::into));
        self
    }

    pub fn group_by(&self) -> &[String] {
        &self.group_by
    }

    // ----- LIMIT / DISTINCT -----

    /// Sets limit and offset, rejecting negative values immediately.
    pub fn set_limit(&mut self, length: impl Into<LimitLength>, offset: i64) -> Result<&mut Self> {
        self.limit = Limit::new(length, offset)?;
        Ok(self)
    }

    /// Accepts the `"N OFFSET M"` string form.
    pub fn set_limit_str(&mut self, limit: &str) -> Result<&mut Self> {
        self.limit = Limit::parse(limit)?;
        Ok(self)
    }

    pub fn limit(&self) -> Limit {
        self.limit
    }

    pub fn set_distinct(&mut self, distinct: bool) -> &mut Self {
        self.distinct = distinct;
        self
    }

    pub fn is_distinct(&self) -> bool {
        self.distinct
    }

    // ----- UNION / WITH -----

    /// Appends `UNION [ALL|DISTINCT] <query>`. `None` uses the database
    /// default, which removes duplicates.
    pub fn add_union(&mut self, query: SqlSelect, ty: Option<&str>) -> Result<&mut Self> {
        let ty = ty.map(UnionType::parse).transpose()?;
        self.unions.push((query, ty));
        Ok(self)
    }

    /// Registers a common table expression.
    ///
    /// A recursive CTE must be a UNION whose second operand selects from the
    /// CTE's own name.
    pub fn add_with<S: Into<String>>(
        &mut self,
        name: &str,
        query: SqlSelect,
        columns: impl IntoIterator<Item = S>,
        recursive: bool,
    ) -> Result<&mut Self> {
        if self.with.contains_key(name) {
            return Err(Error::bad_method_call(format!(
                "WITH clause already exists for \"{name}\""
            )));
        }

        if recursive && !query.references_in_union(name) {
            return Err(Error::invalid_argument(format!(
                "Recursive WITH \"{name}\" must be a UNION whose second query selects from \"{name}\""
            )));
        }

        self.with.insert(
            name.to_string(),
            Cte {
                query,
                columns: columns.into_iter().map(Into::into).collect(),
                recursive,
            },
        );
        Ok(self)
    }

    fn references_in_union(&self, name: &str) -> bool {
        let quoted = ident::quote(name);
        self.unions.iter().any(|(query, _)| {
            query.from.iter().any(|(alias, item)| {
                alias == name
                    || matches!(item, FromItem::Raw(clause) if clause.contains(&quoted))
                    || matches!(item, FromItem::Join(join) if join.table == name)
            })
        })
    }

    // ----- Derived statements -----

    /// A statement selecting the number of rows this one returns.
    pub fn count(&self, column: Option<&str>) -> SqlSelect {
        let needs_wrap = !self.having.is_empty()
            || !self.unions.is_empty()
            || self.limit != Limit::default()
            || (column.is_none() && (self.distinct || !self.group_by.is_empty()));

        if needs_wrap {
            return SqlSelect::wrap_count(self.clone());
        }

        let column = match column {
            Some(column) if !self.group_by.is_empty() => format!("DISTINCT {column}"),
            Some(column) => column.to_string(),
            None => "*".to_string(),
        };

        let mut clone = self.clone();
        clone.clear_order_by();
        clone.select.clear();
        clone.select_field(format!("count({column})"), None);
        clone.group_by.clear();
        clone.distinct = false;
        clone
    }

    /// A statement counting every matching row, ignoring LIMIT and OFFSET.
    pub fn unlimited_row_count(&self, column: Option<&str>) -> SqlSelect {
        let mut clone = self.clone();
        clone.limit = Limit::default();
        clone.clear_order_by();

        if !self.having.is_empty() || (column.is_none() && !self.group_by.is_empty()) {
            return SqlSelect::wrap_count(clone);
        }

        clone.select.clear();
        clone.select_field(format!("count({})", column.unwrap_or("*")), None);
        clone.group_by.clear();
        clone.distinct = false;
        clone
    }

    fn wrap_count(inner: SqlSelect) -> SqlSelect {
        let mut outer = SqlSelect::new();
        outer.select_field("count(*)", None);
        outer.add_from_subquery("all_distinct", inner);
        outer
    }

    /// Selects a single aggregate expression.
    ///
    /// Without a LIMIT the ordering is dropped, since it cannot affect the
    /// result. With a LIMIT the ordering and its generated sort columns are
    /// kept.
    pub fn aggregate(&self, expr: &str, alias: Option<&str>) -> Result<SqlSelect> {
        verify_call_syntax(expr)?;

        let mut clone = self.clone();
        let mut select = IndexMap::new();
        select.insert(
            alias.map_or_else(|| ident::infer_alias(expr), str::to_string),
            expr.to_string(),
        );

        if clone.limit == Limit::default() {
            clone.clear_order_by();
        } else {
            select.extend(
                clone
                    .select
                    .drain(..)
                    .filter(|(alias, _)| alias.starts_with(SORT_COLUMN_PREFIX)),
            );
        }

        clone.select = select;
        Ok(clone)
    }

    /// The first row of the current window.
    pub fn first_row(&self) -> SqlSelect {
        let mut clone = self.clone();
        clone.limit = Limit {
            length: Some(1),
            offset: self.limit.offset,
        };
        clone
    }

    /// The last row, found by reversing the ordering.
    ///
    /// A limited statement is selected from as the subquery `_Window`,
    /// ordered the other way round, so the last row of the window is
    /// returned. Fails when the statement has no ordering to reverse.
    pub fn last_row(&self) -> Result<SqlSelect> {
        if self.order_by.is_empty() {
            return Err(Error::bad_method_call(
                "last_row() requires an ORDER BY to reverse",
            ));
        }

        if self.limit == Limit::default() {
            let mut clone = self.clone();
            clone.reverse_order_by();
            clone.limit = Limit {
                length: Some(1),
                offset: 0,
            };
            return Ok(clone);
        }

        let mut window = self.clone();
        let order_by: Vec<(String, Direction)> = self
            .order_by
            .iter()
            .map(|(target, direction)| {
                let alias = window.window_column(target);
                (ident::quote_column(WINDOW_ALIAS, &alias), direction.reverse())
            })
            .collect();

        let mut outer = SqlSelect::new();
        for alias in self.select.keys() {
            outer.select_field(ident::quote_column(WINDOW_ALIAS, alias), Some(alias));
        }
        outer.add_from_subquery(WINDOW_ALIAS, window);
        outer.order_by = order_by;
        outer.limit = Limit {
            length: Some(1),
            offset: 0,
        };
        Ok(outer)
    }

    /// The alias under which the ordering target `target` is selected,
    /// selecting it when it is not yet.
    fn window_column(&mut self, target: &str) -> String {
        if let Ok(position) = target.parse::<usize>() {
            if let Some(alias) = position.checked_sub(1).and_then(|i| self.select.get_index(i)) {
                return alias.0.clone();
            }
        }

        let found = self
            .select
            .iter()
            .find(|(alias, expr)| ident::quote(alias) == target || expr.as_str() == target);
        if let Some((alias, _)) = found {
            return alias.clone();
        }

        let alias = (0..)
            .map(|i| format!("{SORT_COLUMN_PREFIX}{i}"))
            .find(|alias| !self.select.contains_key(alias))
            .unwrap_or_default();
        self.select.insert(alias.clone(), target.to_string());
        alias
    }

    /// Returns `true` when there is nothing to select from.
    pub fn is_empty(&self) -> bool {
        self.from.is_empty()
    }

    /// Renders the statement for embedding in another one, as in
    /// `"ID" IN (...)`. The returned SQL uses `?` placeholders.
    pub fn fragment(&self, flavor: Flavor) -> Where {
        let mut params = Positional::default();
        let sql = self.serialize(flavor, &mut params);
        Where {
            sql,
            params: params.0,
        }
    }

    /// Renders the statement with the default flavor.
    pub fn sql(&self, params: &mut Vec<Value>) -> String {
        self.serialize(Flavor::default(), params)
    }
}

impl Statement for SqlSelect {
    fn serialize(&self, flavor: Flavor, params: &mut impl Params) -> String {
        render::render(self, flavor, params)
    }
}

impl UnionType {
    pub fn parse(src: &str) -> Result<UnionType> {
        match src.trim().to_ascii_uppercase().as_str() {
            "ALL" => Ok(UnionType::All),
            "DISTINCT" => Ok(UnionType::Distinct),
            _ => Err(Error::bad_method_call(format!(
                "Union type \"{src}\" must be one of ALL or DISTINCT"
            ))),
        }
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            UnionType::All => "ALL",
            UnionType::Distinct => "DISTINCT",
        }
    }
}

/// Checks the parentheses of a `FUNC(args)` expression.
fn verify_call_syntax(expr: &str) -> Result<()> {
    let mut depth = 0i32;
    for c in expr.chars() {
        match c {
            '(' => depth += 1,
            ')' => depth -= 1,
            _ => {}
        }
        if depth < 0 {
            break;
        }
    }

    if depth != 0 {
        return Err(Error::invalid_argument(format!(
            "Malformed aggregate expression \"{expr}\""
        )));
    }
    Ok(())
}

impl From<&str> for SelectColumn {
    fn from(expr: &str) -> SelectColumn {
        SelectColumn {
            alias: None,
            expr: expr.to_string(),
        }
    }
}

impl From<String> for SelectColumn {
    fn from(expr: String) -> SelectColumn {
        SelectColumn { alias: None, expr }
    }
}

/// `("Alias", "expression")`
impl From<(&str, &str)> for SelectColumn {
    fn from((alias, expr): (&str, &str)) -> SelectColumn {
        SelectColumn {
            alias: Some(alias.to_string()),
            expr: expr.to_string(),
        }
    }
}

impl From<(String, String)> for SelectColumn {
    fn from((alias, expr): (String, String)) -> SelectColumn {
        SelectColumn {
            alias: Some(alias),
            expr,
        }
    }
}
