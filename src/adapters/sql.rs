//! SELECT rendering shared by the SQL adapters.

use crate::domain::query::{quote_ident, Columns, Direction, Filter, FilterValue, Query};

/// Renders `query` against `from` (an already-quoted table expression).
///
/// `placeholder` receives the 1-based parameter index and its value and
/// returns the backend's placeholder syntax. Returns the SQL text and the
/// parameters in placeholder order.
pub fn render_select<'q>(
    from: &str,
    query: &'q Query,
    placeholder: impl Fn(usize, &FilterValue) -> String,
) -> (String, Vec<&'q FilterValue>) {
    let mut params: Vec<&FilterValue> = Vec::new();
    let mut bind = |value: &'q FilterValue| {
        params.push(value);
        placeholder(params.len(), value)
    };

    let columns = match &query.columns {
        Columns::All => "*".to_string(),
        Columns::Only(columns) => columns
            .iter()
            .map(|c| quote_ident(c))
            .collect::<Vec<_>>()
            .join(", "),
    };
    let mut sql = format!("SELECT {columns} FROM {from}");

    let conditions: Vec<String> = query
        .filters
        .iter()
        .map(|filter| match filter {
            Filter::Eq { column, value } => format!("{} = {}", quote_ident(column), bind(value)),
            Filter::Gte { column, value } => format!("{} >= {}", quote_ident(column), bind(value)),
            Filter::In { values, .. } if values.is_empty() => "1 = 0".to_string(),
            Filter::In { column, values } => {
                let items: Vec<String> = values.iter().map(&mut bind).collect();
                format!("{} IN ({})", quote_ident(column), items.join(", "))
            }
        })
        .collect();

    if !conditions.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&conditions.join(" AND "));
    }

    if let Some(order) = &query.order {
        let direction = match order.direction {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        };
        sql.push_str(&format!(" ORDER BY {} {direction}", quote_ident(&order.column)));
    }

    if let Some(limit) = query.limit {
        sql.push_str(&format!(" LIMIT {limit}"));
    }

    (sql, params)
}
