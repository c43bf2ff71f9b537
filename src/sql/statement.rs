use crate::types::RowValues;

/// SQL text and the arguments bound to its `?` placeholders, in order.
///
/// Built per operation, executed once, then dropped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SqlStatement {
    /// The SQL text
    pub sql: String,
    /// Values for the placeholders, in order
    pub args: Vec<RowValues>,
}

impl SqlStatement {
    pub fn new(sql: impl Into<String>, args: Vec<RowValues>) -> Self {
        Self {
            sql: sql.into(),
            args,
        }
    }

    pub fn without_args(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            args: Vec::new(),
        }
    }

    pub fn add_arg(&mut self, arg: impl Into<RowValues>) {
        self.args.push(arg.into());
    }

    pub fn add_args(&mut self, args: impl IntoIterator<Item = RowValues>) {
        self.args.extend(args);
    }

    #[must_use]
    pub fn has_args(&self) -> bool {
        !self.args.is_empty()
    }
}

/// A column name paired with the value an entity holds for it.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyValue {
    pub key: String,
    pub value: RowValues,
}

impl KeyValue {
    pub fn new(key: impl Into<String>, value: impl Into<RowValues>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Quote an identifier for `SQLite`, doubling embedded quotes.
#[must_use]
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Render a value as a SQL literal, for `DEFAULT` clauses only.
#[must_use]
pub(crate) fn sql_literal(value: &RowValues) -> String {
    fn quoted(s: &str) -> String {
        format!("'{}'", s.replace('\'', "''"))
    }
    match value {
        RowValues::Int(i) => i.to_string(),
        // SQL has no literal for NaN or infinity.
        RowValues::Float(f) if !f.is_finite() => "NULL".to_string(),
        RowValues::Float(f) => f.to_string(),
        RowValues::Bool(b) => i64::from(*b).to_string(),
        RowValues::Null => "NULL".to_string(),
        RowValues::Text(s) => quoted(s),
        RowValues::Timestamp(dt) => quoted(&dt.format("%F %T%.f").to_string()),
        RowValues::JSON(json) => quoted(&json.to_string()),
        RowValues::Blob(bytes) => {
            let hex: String = bytes.iter().map(|b| format!("{b:02X}")).collect();
            format!("X'{hex}'")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_and_literals_are_escaped() {
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
        assert_eq!(sql_literal(&RowValues::Text("it's".into())), "'it''s'");
        assert_eq!(sql_literal(&RowValues::Blob(vec![0xAB, 0x01])), "X'AB01'");
    }

    #[test]
    fn non_finite_floats_render_as_null() {
        assert_eq!(sql_literal(&RowValues::Float(1.5)), "1.5");
        assert_eq!(sql_literal(&RowValues::Float(f64::NAN)), "NULL");
        assert_eq!(sql_literal(&RowValues::Float(f64::INFINITY)), "NULL");
        assert_eq!(sql_literal(&RowValues::Float(f64::NEG_INFINITY)), "NULL");
    }
}
