use std::marker::PhantomData;

use crate::entity::Entity;
use crate::types::RowValues;

use super::statement::{SqlStatement, quote_ident};
use super::where_builder::{Op, WhereBuilder};

/// Filtering, ordering, and paging shared by both selector kinds.
#[derive(Debug, Clone, Default, PartialEq)]
struct SelectParts {
    filter: WhereBuilder,
    order_by: Vec<(String, bool)>,
    limit: Option<u64>,
    offset: Option<u64>,
}

impl SelectParts {
    fn append_tail(&self, stmt: &mut SqlStatement, group_by: &[String], having: &WhereBuilder) {
        if !self.filter.is_empty() {
            stmt.sql.push_str(" WHERE ");
            stmt.sql.push_str(&self.filter.sql());
            stmt.add_args(self.filter.args().iter().cloned());
        }
        if !group_by.is_empty() {
            let cols: Vec<String> = group_by.iter().map(|c| quote_ident(c)).collect();
            stmt.sql.push_str(" GROUP BY ");
            stmt.sql.push_str(&cols.join(", "));
            if !having.is_empty() {
                stmt.sql.push_str(" HAVING ");
                stmt.sql.push_str(&having.sql());
                stmt.add_args(having.args().iter().cloned());
            }
        }
        if !self.order_by.is_empty() {
            let orders: Vec<String> = self
                .order_by
                .iter()
                .map(|(col, desc)| {
                    format!("{} {}", quote_ident(col), if *desc { "DESC" } else { "ASC" })
                })
                .collect();
            stmt.sql.push_str(" ORDER BY ");
            stmt.sql.push_str(&orders.join(", "));
        }
        // SQLite only accepts OFFSET after a LIMIT; -1 means "no limit".
        match (self.limit, self.offset) {
            (Some(limit), Some(offset)) => {
                stmt.sql.push_str(&format!(" LIMIT {limit} OFFSET {offset}"));
            }
            (Some(limit), None) => stmt.sql.push_str(&format!(" LIMIT {limit}")),
            (None, Some(offset)) => stmt.sql.push_str(&format!(" LIMIT -1 OFFSET {offset}")),
            (None, None) => {}
        }
    }
}

/// Query over the table of entity `T`.
///
/// ```rust
/// # use sql_entity_store::prelude::*;
/// # #[derive(Default)] struct Item { id: Option<i64> }
/// # impl Entity for Item {
/// #     fn describe() -> EntityDescriptor<Self> {
/// #         EntityDescriptor::new("item", Id::auto_increment("id", |e: &Item| e.id.into(), |e: &mut Item, v| { e.id = v.into_opt_i64()?; Ok(()) }))
/// #     }
/// # }
/// let selector = Selector::<Item>::new()
///     .and("name", Op::Like, "a%")
///     .order_by_desc("id")
///     .limit(10);
/// let stmt = selector.to_statement("item");
/// assert_eq!(
///     stmt.sql,
///     "SELECT * FROM \"item\" WHERE \"name\" LIKE ? ORDER BY \"id\" DESC LIMIT 10"
/// );
/// ```
pub struct Selector<T> {
    parts: SelectParts,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> Selector<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            parts: SelectParts::default(),
            _entity: PhantomData,
        }
    }

    /// Replace the whole condition.
    #[must_use]
    pub fn filter(mut self, filter: WhereBuilder) -> Self {
        self.parts.filter = filter;
        self
    }

    #[must_use]
    pub fn and(mut self, column: &str, op: Op, value: impl Into<RowValues>) -> Self {
        self.parts.filter = self.parts.filter.and(column, op, value);
        self
    }

    #[must_use]
    pub fn or(mut self, column: &str, op: Op, value: impl Into<RowValues>) -> Self {
        self.parts.filter = self.parts.filter.or(column, op, value);
        self
    }

    #[must_use]
    pub fn order_by(mut self, column: &str) -> Self {
        self.parts.order_by.push((column.to_string(), false));
        self
    }

    #[must_use]
    pub fn order_by_desc(mut self, column: &str) -> Self {
        self.parts.order_by.push((column.to_string(), true));
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: u64) -> Self {
        self.parts.limit = Some(limit);
        self
    }

    #[must_use]
    pub fn offset(mut self, offset: u64) -> Self {
        self.parts.offset = Some(offset);
        self
    }

    #[must_use]
    pub fn filter_ref(&self) -> &WhereBuilder {
        &self.parts.filter
    }

    /// `SELECT *` against `table`.
    #[must_use]
    pub fn to_statement(&self, table: &str) -> SqlStatement {
        let mut stmt = SqlStatement::without_args(format!("SELECT * FROM {}", quote_ident(table)));
        self.parts.append_tail(&mut stmt, &[], &WhereBuilder::new());
        stmt
    }

    /// Same query, capped at one row.
    #[must_use]
    pub fn to_first_statement(&self, table: &str) -> SqlStatement {
        let mut first = self.clone();
        first.parts.limit = Some(1);
        first.to_statement(table)
    }

    /// `SELECT COUNT(*)` honoring only the condition.
    #[must_use]
    pub fn to_count_statement(&self, table: &str) -> SqlStatement {
        let mut stmt = SqlStatement::without_args(format!(
            "SELECT COUNT(*) AS count FROM {}",
            quote_ident(table)
        ));
        let filter_only = SelectParts {
            filter: self.parts.filter.clone(),
            ..SelectParts::default()
        };
        filter_only.append_tail(&mut stmt, &[], &WhereBuilder::new());
        stmt
    }
}

impl<T: Entity> Default for Selector<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Selector<T> {
    fn clone(&self) -> Self {
        Self {
            parts: self.parts.clone(),
            _entity: PhantomData,
        }
    }
}

impl<T> std::fmt::Debug for Selector<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Selector").field("parts", &self.parts).finish()
    }
}

/// Query producing generic rows: chosen columns or expressions, grouping, and
/// `HAVING` over any table.
#[derive(Debug, Clone, PartialEq)]
pub struct DbModelSelector {
    table: String,
    columns: Vec<String>,
    group_by: Vec<String>,
    having: WhereBuilder,
    parts: SelectParts,
}

impl DbModelSelector {
    #[must_use]
    pub fn from_table(table: &str) -> Self {
        Self {
            table: table.to_string(),
            columns: Vec::new(),
            group_by: Vec::new(),
            having: WhereBuilder::new(),
            parts: SelectParts::default(),
        }
    }

    /// Select list entries; written verbatim so expressions like `COUNT(*) AS n` work.
    #[must_use]
    pub fn select(mut self, columns: &[&str]) -> Self {
        self.columns
            .extend(columns.iter().map(|c| (*c).to_string()));
        self
    }

    #[must_use]
    pub fn filter(mut self, filter: WhereBuilder) -> Self {
        self.parts.filter = filter;
        self
    }

    #[must_use]
    pub fn and(mut self, column: &str, op: Op, value: impl Into<RowValues>) -> Self {
        self.parts.filter = self.parts.filter.and(column, op, value);
        self
    }

    #[must_use]
    pub fn group_by(mut self, column: &str) -> Self {
        self.group_by.push(column.to_string());
        self
    }

    /// Ignored unless a `GROUP BY` column is set.
    #[must_use]
    pub fn having(mut self, having: WhereBuilder) -> Self {
        self.having = having;
        self
    }

    #[must_use]
    pub fn order_by(mut self, column: &str) -> Self {
        self.parts.order_by.push((column.to_string(), false));
        self
    }

    #[must_use]
    pub fn order_by_desc(mut self, column: &str) -> Self {
        self.parts.order_by.push((column.to_string(), true));
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: u64) -> Self {
        self.parts.limit = Some(limit);
        self
    }

    #[must_use]
    pub fn offset(mut self, offset: u64) -> Self {
        self.parts.offset = Some(offset);
        self
    }

    #[must_use]
    pub fn to_statement(&self) -> SqlStatement {
        let select_list = if self.columns.is_empty() {
            "*".to_string()
        } else {
            self.columns.join(", ")
        };
        let mut stmt = SqlStatement::without_args(format!(
            "SELECT {select_list} FROM {}",
            quote_ident(&self.table)
        ));
        self.parts
            .append_tail(&mut stmt, &self.group_by, &self.having);
        stmt
    }

    #[must_use]
    pub fn to_first_statement(&self) -> SqlStatement {
        let mut first = self.clone();
        first.parts.limit = Some(1);
        first.to_statement()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_without_limit_uses_unbounded_limit() {
        let stmt = DbModelSelector::from_table("item").offset(5).to_statement();
        assert_eq!(stmt.sql, "SELECT * FROM \"item\" LIMIT -1 OFFSET 5");
    }

    #[test]
    fn group_by_with_having_binds_after_where() {
        let stmt = DbModelSelector::from_table("item")
            .select(&["name", "COUNT(*) AS n"])
            .and("id", Op::Gt, 0)
            .group_by("name")
            .having(WhereBuilder::new().expr("COUNT(*) > ?", vec![RowValues::Int(1)]))
            .order_by("name")
            .to_first_statement();
        assert_eq!(
            stmt.sql,
            "SELECT name, COUNT(*) AS n FROM \"item\" WHERE \"id\" > ? GROUP BY \"name\" HAVING COUNT(*) > ? ORDER BY \"name\" ASC LIMIT 1"
        );
        assert_eq!(stmt.args, vec![RowValues::Int(0), RowValues::Int(1)]);
    }
}
