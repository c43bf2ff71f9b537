use crate::types::RowValues;

use super::statement::quote_ident;

/// Comparison used by a single `WHERE` term.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Like,
    NotLike,
}

impl Op {
    fn as_sql(self) -> &'static str {
        match self {
            Op::Eq => "=",
            Op::Ne => "<>",
            Op::Lt => "<",
            Op::Le => "<=",
            Op::Gt => ">",
            Op::Ge => ">=",
            Op::Like => "LIKE",
            Op::NotLike => "NOT LIKE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Joiner {
    And,
    Or,
}

impl Joiner {
    fn as_sql(self) -> &'static str {
        match self {
            Joiner::And => "AND",
            Joiner::Or => "OR",
        }
    }
}

/// A `WHERE` condition built term by term; values are always bound.
///
/// ```rust
/// use sql_entity_store::prelude::*;
///
/// let wb = WhereBuilder::b("name", Op::Eq, "a").or("rank", Op::Gt, 3);
/// assert_eq!(wb.sql(), "\"name\" = ? OR \"rank\" > ?");
/// assert_eq!(wb.args().len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WhereBuilder {
    terms: Vec<(Joiner, String)>,
    args: Vec<RowValues>,
}

impl WhereBuilder {
    /// An empty condition (matches every row).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a condition with one term.
    #[must_use]
    pub fn b(column: &str, op: Op, value: impl Into<RowValues>) -> Self {
        Self::new().and(column, op, value)
    }

    #[must_use]
    pub fn and(self, column: &str, op: Op, value: impl Into<RowValues>) -> Self {
        self.push_compare(Joiner::And, column, op, value.into())
    }

    #[must_use]
    pub fn or(self, column: &str, op: Op, value: impl Into<RowValues>) -> Self {
        self.push_compare(Joiner::Or, column, op, value.into())
    }

    /// `column IN (...)`; an empty list matches nothing.
    #[must_use]
    pub fn and_in(self, column: &str, values: Vec<RowValues>) -> Self {
        self.push_in(Joiner::And, column, values, false)
    }

    /// `column NOT IN (...)`; an empty list matches everything.
    #[must_use]
    pub fn and_not_in(self, column: &str, values: Vec<RowValues>) -> Self {
        self.push_in(Joiner::And, column, values, true)
    }

    #[must_use]
    pub fn or_in(self, column: &str, values: Vec<RowValues>) -> Self {
        self.push_in(Joiner::Or, column, values, false)
    }

    #[must_use]
    pub fn and_between(
        mut self,
        column: &str,
        low: impl Into<RowValues>,
        high: impl Into<RowValues>,
    ) -> Self {
        self.terms.push((
            Joiner::And,
            format!("{} BETWEEN ? AND ?", quote_ident(column)),
        ));
        self.args.push(low.into());
        self.args.push(high.into());
        self
    }

    /// Nest another condition in parentheses, joined with `AND`.
    #[must_use]
    pub fn and_group(self, group: WhereBuilder) -> Self {
        self.push_group(Joiner::And, group)
    }

    /// Nest another condition in parentheses, joined with `OR`.
    #[must_use]
    pub fn or_group(self, group: WhereBuilder) -> Self {
        self.push_group(Joiner::Or, group)
    }

    /// Append a raw SQL fragment with its own bound arguments, joined with `AND`.
    #[must_use]
    pub fn expr(mut self, sql: &str, args: Vec<RowValues>) -> Self {
        self.terms.push((Joiner::And, sql.to_string()));
        self.args.extend(args);
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Number of terms at the top level.
    #[must_use]
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// Condition text without the `WHERE` keyword.
    #[must_use]
    pub fn sql(&self) -> String {
        let mut out = String::new();
        for (idx, (joiner, term)) in self.terms.iter().enumerate() {
            if idx > 0 {
                out.push(' ');
                out.push_str(joiner.as_sql());
                out.push(' ');
            }
            out.push_str(term);
        }
        out
    }

    #[must_use]
    pub fn args(&self) -> &[RowValues] {
        &self.args
    }

    fn push_compare(mut self, joiner: Joiner, column: &str, op: Op, value: RowValues) -> Self {
        let column = quote_ident(column);
        match (op, value) {
            (Op::Eq, RowValues::Null) => self.terms.push((joiner, format!("{column} IS NULL"))),
            (Op::Ne, RowValues::Null) => {
                self.terms.push((joiner, format!("{column} IS NOT NULL")));
            }
            (op, value) => {
                self.terms
                    .push((joiner, format!("{column} {} ?", op.as_sql())));
                self.args.push(value);
            }
        }
        self
    }

    fn push_in(mut self, joiner: Joiner, column: &str, values: Vec<RowValues>, negate: bool) -> Self {
        if values.is_empty() {
            let constant = if negate { "1 = 1" } else { "1 = 0" };
            self.terms.push((joiner, constant.to_string()));
            return self;
        }
        let placeholders = vec!["?"; values.len()].join(", ");
        let keyword = if negate { "NOT IN" } else { "IN" };
        self.terms.push((
            joiner,
            format!("{} {keyword} ({placeholders})", quote_ident(column)),
        ));
        self.args.extend(values);
        self
    }

    fn push_group(mut self, joiner: Joiner, group: WhereBuilder) -> Self {
        if group.is_empty() {
            return self;
        }
        self.terms.push((joiner, format!("({})", group.sql())));
        self.args.extend(group.args);
        self
    }
}
