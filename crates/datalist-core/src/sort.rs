use crate::{collation, Error, Record, Result, Value};
use std::cmp::Ordering;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

/// An ordered list of sort terms.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SortSpec {
    pub terms: Vec<SortTerm>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SortTerm {
    /// Field name, relation path or raw expression
    pub expr: String,
    pub direction: Direction,
}

/// Arguments accepted by `sort`.
///
/// `None` clears any existing order.
pub trait IntoSort {
    fn into_sort(self) -> Result<Option<SortSpec>>;
}

impl Direction {
    /// Parses `ASC`, `DESC`, `ASCENDING` or `DESCENDING`, ignoring case.
    pub fn parse(src: &str) -> Result<Direction> {
        match src.trim().to_ascii_uppercase().as_str() {
            "ASC" | "ASCENDING" => Ok(Direction::Asc),
            "DESC" | "DESCENDING" => Ok(Direction::Desc),
            _ => Err(Error::invalid_argument(format!(
                "Invalid sort direction \"{src}\"; expected ASC or DESC"
            ))),
        }
    }

    pub fn reverse(self) -> Direction {
        match self {
            Direction::Asc => Direction::Desc,
            Direction::Desc => Direction::Asc,
        }
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

impl SortSpec {
    /// Parses `"Name"`, `"Name DESC"` or `"Name ASC, ID DESC"`.
    pub fn parse(src: &str) -> Result<SortSpec> {
        let terms = split_top_level(src)
            .into_iter()
            .filter(|term| !term.trim().is_empty())
            .map(SortTerm::parse)
            .collect::<Result<_>>()?;
        Ok(SortSpec { terms })
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn push(&mut self, expr: impl Into<String>, direction: Direction) {
        self.terms.push(SortTerm {
            expr: expr.into(),
            direction,
        });
    }

    pub fn reverse(&self) -> SortSpec {
        SortSpec {
            terms: self
                .terms
                .iter()
                .map(|term| SortTerm {
                    expr: term.expr.clone(),
                    direction: term.direction.reverse(),
                })
                .collect(),
        }
    }

    /// Sorts rows in memory.
    ///
    /// Keys are extracted up front into an index + key-tuple array, so the
    /// comparison never touches the rows themselves. The sort is stable, and
    /// rows equal on every term keep their relative order.
    pub fn sort_records(&self, rows: &mut Vec<Record>) -> Result<()> {
        let fields = self
            .terms
            .iter()
            .map(|term| term.plain_field())
            .collect::<Result<Vec<_>>>()?;

        let mut keyed: Vec<(usize, Vec<Value>)> = rows
            .iter()
            .enumerate()
            .map(|(index, row)| {
                let key = fields
                    .iter()
                    .map(|field| row.get(*field).cloned().unwrap_or_default())
                    .collect();
                (index, key)
            })
            .collect();

        keyed.sort_by(|(_, a), (_, b)| {
            for ((a, b), term) in a.iter().zip(b).zip(&self.terms) {
                let ordering = match term.direction {
                    Direction::Asc => collation::compare(a, b),
                    Direction::Desc => collation::compare(b, a),
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            Ordering::Equal
        });

        let mut taken: Vec<Option<Record>> = rows.drain(..).map(Some).collect();
        rows.extend(keyed.into_iter().filter_map(|(index, _)| taken[index].take()));
        Ok(())
    }
}

impl fmt::Display for SortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, term) in self.terms.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{} {}", term.expr, term.direction)?;
        }
        Ok(())
    }
}

impl SortTerm {
    fn parse(src: &str) -> Result<SortTerm> {
        let src = src.trim();

        if let Some((expr, last)) = src.rsplit_once(char::is_whitespace) {
            let word = last.to_ascii_uppercase();
            if matches!(word.as_str(), "ASC" | "DESC" | "ASCENDING" | "DESCENDING") {
                return Ok(SortTerm {
                    expr: expr.trim().to_string(),
                    direction: Direction::parse(last)?,
                });
            }
        }

        Ok(SortTerm {
            expr: src.to_string(),
            direction: Direction::Asc,
        })
    }

    /// The expression with identifier quotes removed, e.g. `"Team"."Title"`
    /// becomes `Team.Title`.
    pub fn unquoted(&self) -> String {
        self.expr.replace('"', "")
    }

    /// Returns `true` when the expression is a field name or dotted relation
    /// path rather than raw SQL.
    pub fn is_path(&self) -> bool {
        let unquoted = self.unquoted();
        !unquoted.is_empty()
            && unquoted
                .split('.')
                .all(|segment| {
                    !segment.is_empty()
                        && segment
                            .chars()
                            .all(|c| c.is_ascii_alphanumeric() || c == '_')
                })
    }

    fn plain_field(&self) -> Result<&str> {
        let field = self.expr.trim_matches('"');
        if !self.is_path() || field.contains('.') {
            return Err(Error::invalid_argument(format!(
                "Cannot sort a materialized list by \"{}\"; only plain fields are supported",
                self.expr
            )));
        }
        Ok(field)
    }
}

/// Splits on commas outside parentheses and quotes.
fn split_top_level(src: &str) -> Vec<&str> {
    let mut ret = vec![];
    let mut depth = 0usize;
    let mut quote = None;
    let mut start = 0;

    for (i, c) in src.char_indices() {
        match (c, quote) {
            ('\'' | '"', None) => quote = Some(c),
            (c, Some(q)) if c == q => quote = None,
            ('(', None) => depth += 1,
            (')', None) => depth = depth.saturating_sub(1),
            (',', None) if depth == 0 => {
                ret.push(&src[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }

    ret.push(&src[start..]);
    ret
}

impl IntoSort for SortSpec {
    fn into_sort(self) -> Result<Option<SortSpec>> {
        Ok((!self.is_empty()).then_some(self))
    }
}

impl IntoSort for &str {
    fn into_sort(self) -> Result<Option<SortSpec>> {
        SortSpec::parse(self)?.into_sort()
    }
}

impl IntoSort for String {
    fn into_sort(self) -> Result<Option<SortSpec>> {
        self.as_str().into_sort()
    }
}

impl<T: IntoSort> IntoSort for Option<T> {
    fn into_sort(self) -> Result<Option<SortSpec>> {
        match self {
            Some(sort) => sort.into_sort(),
            None => Ok(None),
        }
    }
}

/// `("Name", "DESC")`
impl IntoSort for (&str, &str) {
    fn into_sort(self) -> Result<Option<SortSpec>> {
        [self].into_sort()
    }
}

/// `[("Name", "ASC"), ("ID", "DESC")]`
impl<const N: usize> IntoSort for [(&str, &str); N] {
    fn into_sort(self) -> Result<Option<SortSpec>> {
        self.to_vec().into_sort()
    }
}

impl IntoSort for Vec<(&str, &str)> {
    fn into_sort(self) -> Result<Option<SortSpec>> {
        let mut spec = SortSpec::default();
        for (expr, direction) in self {
            spec.push(expr.trim(), Direction::parse(direction)?);
        }
        spec.into_sort()
    }
}
