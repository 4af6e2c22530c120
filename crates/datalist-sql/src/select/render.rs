use super::{FromItem, SqlSelect, SORT_COLUMN_PREFIX};
use crate::fmt::{Comma, Fragment};
use crate::{ident, Flavor, Formatter, Params, ToSql};

pub(super) fn render(stmt: &SqlSelect, flavor: Flavor, params: &mut impl Params) -> String {
    let mut ret = String::new();

    let mut f = Formatter {
        dst: &mut ret,
        params,
        flavor,
    };

    stmt.to_sql(&mut f);
    ret
}

impl ToSql for &SqlSelect {
    fn to_sql<P: Params>(self, f: &mut Formatter<'_, P>) {
        if !self.with.is_empty() {
            let recursive = if self.with.values().any(|cte| cte.recursive) {
                " RECURSIVE"
            } else {
                ""
            };
            fmt!(f, "WITH" recursive " ");

            let mut s = "";
            for (name, cte) in &self.with {
                fmt!(f, s ident::quote(name).as_str());
                if !cte.columns.is_empty() {
                    let columns = cte.columns.iter().map(|column| ident::quote(column));
                    fmt!(f, " (" Comma(columns.collect::<Vec<_>>().iter()) ")");
                }
                let query = &cte.query;
                fmt!(f, " AS (" query ")");
                s = ", ";
            }
            fmt!(f, " ");
        }

        fmt!(f, "SELECT ");
        if self.distinct {
            fmt!(f, "DISTINCT ");
        }

        let mut columns: Vec<String> = self
            .select
            .iter()
            .map(|(alias, expr)| {
                let quoted = ident::quote(alias);
                if alias == expr || expr.ends_with(&quoted) {
                    expr.clone()
                } else {
                    format!("{expr} AS {quoted}")
                }
            })
            .collect();

        // Generated sort columns alone don't replace the implicit `*`.
        if self.select.keys().all(|alias| alias.starts_with(SORT_COLUMN_PREFIX)) {
            columns.insert(0, "*".to_string());
        }
        fmt!(f, Comma(columns.iter()));

        self.from_to_sql(f);

        if !self.where_.is_empty() {
            let where_ = &self.where_;
            fmt!(f, " WHERE " where_);
        }

        if !self.group_by.is_empty() {
            fmt!(f, " GROUP BY " Comma(self.group_by.iter()));
        }

        if !self.having.is_empty() {
            let having = &self.having;
            fmt!(f, " HAVING " having);
        }

        for (query, ty) in &self.unions {
            fmt!(f, " UNION");
            if let Some(ty) = ty {
                fmt!(f, " " ty.as_sql());
            }
            fmt!(f, " " query);
        }

        if !self.order_by.is_empty() {
            let terms: Vec<String> = self
                .order_by
                .iter()
                .map(|(expr, direction)| format!("{expr} {direction}"))
                .collect();
            fmt!(f, " ORDER BY " Comma(terms.iter()));
        }

        match (self.limit.length, self.limit.offset) {
            (None, 0) => {}
            (None, offset) => {
                let clause = f.flavor.unlimited_with_offset(offset);
                fmt!(f, " " clause.as_str());
            }
            (Some(length), 0) => {
                fmt!(f, " LIMIT " length.to_string().as_str());
            }
            (Some(length), offset) => {
                let clause = format!(" LIMIT {length} OFFSET {offset}");
                fmt!(f, clause.as_str());
            }
        }
    }
}

impl SqlSelect {
    /// Plain tables first, comma separated, then joins by their order.
    fn from_to_sql<P: Params>(&self, f: &mut Formatter<'_, P>) {
        if self.from.is_empty() {
            return;
        }

        let tables: Vec<_> = self.from.iter().filter(|(_, item)| !item.is_join()).collect();
        let mut joins: Vec<_> = self.from.iter().filter(|(_, item)| item.is_join()).collect();
        joins.sort_by_key(|(_, item)| item.join_order());

        fmt!(f, " FROM ");

        let mut s = "";
        for (alias, item) in tables {
            fmt!(f, s);
            match item {
                FromItem::Raw(clause) => fmt!(f, clause),
                FromItem::Subquery(query) => {
                    let query: &SqlSelect = query;
                    fmt!(f, "(" query ") AS " ident::quote(alias).as_str());
                }
                FromItem::Join(_) => {}
            }
            s = ", ";
        }

        if !s.is_empty() {
            s = " ";
        }

        for (alias, item) in joins {
            fmt!(f, s);
            match item {
                FromItem::Raw(clause) => fmt!(f, clause),
                FromItem::Join(join) => {
                    fmt!(f, join.kind.as_sql() " JOIN " join.table_sql().as_str());
                    if *alias != join.table {
                        fmt!(f, " AS " ident::quote(alias).as_str());
                    }
                    fmt!(f, " ON " Fragment(&join.on, &join.params));
                }
                FromItem::Subquery(_) => {}
            }
            s = " ";
        }
    }
}
