//! PostgreSQL data adapter: reads the indicators table over a direct connection.

use crate::adapters::sql::render_select;
use crate::domain::error::StoreError;
use crate::domain::query::{quote_ident, FilterValue, Query, TableRef};
use crate::domain::raw_row::{RawRow, RawValue};
use crate::ports::store_port::{ConnectionTarget, StorePort};
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use log::debug;
use postgres::types::{ToSql, Type};
use postgres::{Client, Config, NoTls, Row};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::cell::RefCell;

pub struct PostgresAdapter {
    client: RefCell<Client>,
}

impl PostgresAdapter {
    /// Connects to a `postgres://` URL; the key is the password unless the URL
    /// already carries one.
    pub fn connect(target: &ConnectionTarget) -> Result<Self, StoreError> {
        let mut config: Config = target
            .url
            .parse()
            .map_err(|e: postgres::Error| StoreError::backend("postgres", e))?;
        if config.get_password().is_none() {
            config.password(target.key.as_str());
        }
        if let Some(timeout) = target.timeout {
            config.connect_timeout(timeout);
        }

        let client = config
            .connect(NoTls)
            .map_err(|e| StoreError::backend("postgres", e))?;

        Ok(Self {
            client: RefCell::new(client),
        })
    }
}

/// Placeholder with an explicit cast so text, date and numeric columns all
/// compare against a typed parameter.
fn placeholder(index: usize, value: &FilterValue) -> String {
    let cast = match value {
        FilterValue::Text(_) => "text",
        FilterValue::Date(_) => "date",
        FilterValue::Number(_) => "float8",
    };
    format!("${index}::{cast}")
}

fn to_sql(value: &FilterValue) -> &(dyn ToSql + Sync) {
    match value {
        FilterValue::Text(s) => s,
        FilterValue::Date(d) => d,
        FilterValue::Number(n) => n,
    }
}

pub fn render(table: &TableRef, query: &Query) -> (String, Vec<&FilterValue>) {
    let from = format!("{}.{}", quote_ident(&table.schema), quote_ident(&table.table));
    render_select(&from, query, placeholder)
}

/// How a Postgres column type is read into a [`RawValue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Bool,
    Int2,
    Int4,
    Int8,
    Float4,
    Float8,
    Numeric,
    Text,
    Date,
    Timestamp,
    TimestampTz,
    Json,
}

fn kind_of(ty: &Type) -> Option<ColumnKind> {
    let kind = if *ty == Type::BOOL {
        ColumnKind::Bool
    } else if *ty == Type::INT2 {
        ColumnKind::Int2
    } else if *ty == Type::INT4 {
        ColumnKind::Int4
    } else if *ty == Type::INT8 {
        ColumnKind::Int8
    } else if *ty == Type::FLOAT4 {
        ColumnKind::Float4
    } else if *ty == Type::FLOAT8 {
        ColumnKind::Float8
    } else if *ty == Type::NUMERIC {
        ColumnKind::Numeric
    } else if [Type::TEXT, Type::VARCHAR, Type::BPCHAR, Type::NAME].contains(ty) {
        ColumnKind::Text
    } else if *ty == Type::DATE {
        ColumnKind::Date
    } else if *ty == Type::TIMESTAMP {
        ColumnKind::Timestamp
    } else if *ty == Type::TIMESTAMPTZ {
        ColumnKind::TimestampTz
    } else if *ty == Type::JSON || *ty == Type::JSONB {
        ColumnKind::Json
    } else {
        return None;
    };
    Some(kind)
}

/// Whole NUMERIC values that fit become integers, everything else a float.
fn decimal_value(d: Decimal) -> RawValue {
    if d.scale() == 0 {
        if let Some(i) = d.to_i64() {
            return RawValue::Integer(i);
        }
    }
    d.to_f64().map_or(RawValue::Null, RawValue::Float)
}

fn column_value(row: &Row, index: usize) -> Result<RawValue, StoreError> {
    fn get<'a, T: postgres::types::FromSql<'a>>(
        row: &'a Row,
        index: usize,
    ) -> Result<Option<T>, StoreError> {
        row.try_get::<_, Option<T>>(index)
            .map_err(|e| StoreError::backend("postgres", e))
    }

    let column = &row.columns()[index];
    let Some(kind) = kind_of(column.type_()) else {
        debug!(
            "column {} has unmapped type {}, reading as null",
            column.name(),
            column.type_().name()
        );
        return Ok(RawValue::Null);
    };

    let value = match kind {
        ColumnKind::Bool => get::<bool>(row, index)?.map(RawValue::Bool),
        ColumnKind::Int2 => get::<i16>(row, index)?.map(|v| RawValue::Integer(v.into())),
        ColumnKind::Int4 => get::<i32>(row, index)?.map(|v| RawValue::Integer(v.into())),
        ColumnKind::Int8 => get::<i64>(row, index)?.map(RawValue::Integer),
        ColumnKind::Float4 => get::<f32>(row, index)?.map(|v| RawValue::Float(v.into())),
        ColumnKind::Float8 => get::<f64>(row, index)?.map(RawValue::Float),
        ColumnKind::Numeric => get::<Decimal>(row, index)?.map(decimal_value),
        ColumnKind::Text => get::<String>(row, index)?.map(RawValue::Text),
        ColumnKind::Date => get::<NaiveDate>(row, index)?.map(RawValue::Date),
        ColumnKind::Timestamp => get::<NaiveDateTime>(row, index)?
            .map(|t| RawValue::Text(t.format("%Y-%m-%dT%H:%M:%S%.f").to_string())),
        ColumnKind::TimestampTz => get::<DateTime<Utc>>(row, index)?
            .map(|t| RawValue::Text(t.to_rfc3339_opts(SecondsFormat::AutoSi, true))),
        ColumnKind::Json => get::<serde_json::Value>(row, index)?.map(RawValue::from_json),
    };

    Ok(value.unwrap_or(RawValue::Null))
}

impl StorePort for PostgresAdapter {
    fn fetch(&self, table: &TableRef, query: &Query) -> Result<Vec<RawRow>, StoreError> {
        let (sql, values) = render(table, query);
        let params: Vec<&(dyn ToSql + Sync)> = values.into_iter().map(to_sql).collect();

        let rows = self
            .client
            .borrow_mut()
            .query(sql.as_str(), &params)
            .map_err(|e| StoreError::backend("postgres", e))?;

        rows.iter()
            .map(|row| {
                (0..row.len())
                    .map(|i| Ok((row.columns()[i].name().to_string(), column_value(row, i)?)))
                    .collect::<Result<RawRow, StoreError>>()
            })
            .collect()
    }
}
