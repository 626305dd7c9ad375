//! Backend-neutral description of a single filtered, ordered, limited SELECT.
//!
//! Only the read shapes the client issues are representable: equality,
//! membership and greater-or-equal filters, one ordering, an optional limit.

use chrono::NaiveDate;
use std::fmt;

/// Schema-qualified table the client reads from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    pub schema: String,
    pub table: String,
}

impl TableRef {
    pub fn new(schema: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
        }
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.table)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Text(String),
    Date(NaiveDate),
    Number(f64),
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterValue::Text(s) => f.write_str(s),
            FilterValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            FilterValue::Number(n) => write!(f, "{n}"),
        }
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        FilterValue::Text(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        FilterValue::Text(value)
    }
}

impl From<NaiveDate> for FilterValue {
    fn from(value: NaiveDate) -> Self {
        FilterValue::Date(value)
    }
}

impl From<f64> for FilterValue {
    fn from(value: f64) -> Self {
        FilterValue::Number(value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Eq { column: String, value: FilterValue },
    In { column: String, values: Vec<FilterValue> },
    Gte { column: String, value: FilterValue },
}

impl Filter {
    pub fn column(&self) -> &str {
        match self {
            Filter::Eq { column, .. } | Filter::In { column, .. } | Filter::Gte { column, .. } => {
                column
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub direction: Direction,
}

/// Projection: every column, or a named subset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Columns {
    All,
    Only(Vec<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub columns: Columns,
    pub filters: Vec<Filter>,
    pub order: Option<Order>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn select_all() -> Self {
        Self {
            columns: Columns::All,
            filters: Vec::new(),
            order: None,
            limit: None,
        }
    }

    pub fn select(columns: &[&str]) -> Self {
        Self {
            columns: Columns::Only(columns.iter().map(|c| c.to_string()).collect()),
            ..Self::select_all()
        }
    }

    pub fn eq(mut self, column: &str, value: impl Into<FilterValue>) -> Self {
        self.filters.push(Filter::Eq {
            column: column.to_string(),
            value: value.into(),
        });
        self
    }

    pub fn is_in<V: Into<FilterValue>>(
        mut self,
        column: &str,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        self.filters.push(Filter::In {
            column: column.to_string(),
            values: values.into_iter().map(Into::into).collect(),
        });
        self
    }

    pub fn gte(mut self, column: &str, value: impl Into<FilterValue>) -> Self {
        self.filters.push(Filter::Gte {
            column: column.to_string(),
            value: value.into(),
        });
        self
    }

    pub fn order_by(mut self, column: &str, direction: Direction) -> Self {
        self.order = Some(Order {
            column: column.to_string(),
            direction,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Double-quotes an SQL identifier, doubling embedded quotes.
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_accumulates_filters_in_order() {
        let d = NaiveDate::from_ymd_opt(2025, 1, 13).unwrap();
        let q = Query::select_all()
            .eq("date", d)
            .gte("bullish_score", 7.0)
            .order_by("bullish_score", Direction::Desc)
            .limit(20);

        assert_eq!(q.columns, Columns::All);
        assert_eq!(q.filters.len(), 2);
        assert_eq!(q.filters[0].column(), "date");
        assert_eq!(q.filters[1].column(), "bullish_score");
        assert_eq!(q.order.as_ref().unwrap().direction, Direction::Desc);
        assert_eq!(q.limit, Some(20));
    }

    #[test]
    fn is_in_collects_values() {
        let q = Query::select_all().is_in("symbol", ["AAPL", "MSFT"]);
        match &q.filters[0] {
            Filter::In { values, .. } => assert_eq!(
                values,
                &vec![FilterValue::from("AAPL"), FilterValue::from("MSFT")]
            ),
            other => panic!("expected In, got {other:?}"),
        }
    }

    #[test]
    fn filter_values_render_for_transport() {
        let d = NaiveDate::from_ymd_opt(2025, 1, 3).unwrap();
        assert_eq!(FilterValue::from(d).to_string(), "2025-01-03");
        assert_eq!(FilterValue::from(7.0).to_string(), "7");
        assert_eq!(FilterValue::from(7.5).to_string(), "7.5");
    }

    #[test]
    fn quote_ident_escapes_quotes() {
        assert_eq!(quote_ident("bullish_score"), "\"bullish_score\"");
        assert_eq!(quote_ident("odd\"name"), "\"odd\"\"name\"");
    }

    #[test]
    fn table_ref_displays_qualified() {
        assert_eq!(
            TableRef::new("investing_one", "daily_indicators").to_string(),
            "investing_one.daily_indicators"
        );
    }
}
