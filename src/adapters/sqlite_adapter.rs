//! SQLite data adapter: reads a local mirror of the indicators table.
//!
//! The database is opened read-only. Schema names do not apply and are ignored.

use crate::adapters::sql::render_select;
use crate::domain::error::StoreError;
use crate::domain::query::{quote_ident, FilterValue, Query, TableRef};
use crate::domain::raw_row::{RawRow, RawValue};
use crate::ports::store_port::{ConnectionTarget, StorePort};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::types::{ToSqlOutput, Value, ValueRef};
use rusqlite::config::DbConfig;
use rusqlite::OpenFlags;
use std::path::Path;
use std::time::Duration;

pub struct SqliteAdapter {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteAdapter {
    pub fn open<P: AsRef<Path>>(
        path: P,
        pool_size: u32,
        busy_timeout: Option<Duration>,
    ) -> Result<Self, StoreError> {
        let flags = OpenFlags::SQLITE_OPEN_READ_ONLY
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let manager = SqliteConnectionManager::file(path)
            .with_flags(flags)
            .with_init(move |conn| {
                // unknown double-quoted columns must fail instead of reading as strings
                conn.set_db_config(DbConfig::SQLITE_DBCONFIG_DQS_DML, false)?;
                if let Some(timeout) = busy_timeout {
                    conn.busy_timeout(timeout)?;
                }
                Ok(())
            });

        let pool = Pool::builder()
            .max_size(pool_size.max(1))
            .build(manager)
            .map_err(|e: r2d2::Error| StoreError::backend("sqlite", e))?;

        Ok(Self { pool })
    }

    /// `sqlite://<path>` or `file:<path>`; the key is not used.
    pub fn connect(target: &ConnectionTarget) -> Result<Self, StoreError> {
        let path = sqlite_path(&target.url).ok_or_else(|| StoreError::UnsupportedUrl {
            url: target.url.clone(),
        })?;
        // r2d2 would otherwise retry a missing file until its connection timeout
        if !path.contains('?') && !Path::new(path).exists() {
            return Err(StoreError::backend(
                "sqlite",
                format!("database file not found: {path}"),
            ));
        }
        Self::open(path, 1, target.timeout)
    }
}

pub fn sqlite_path(url: &str) -> Option<&str> {
    url.strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("file:"))
        .filter(|p| !p.is_empty())
}

fn to_sql(value: &FilterValue) -> ToSqlOutput<'_> {
    match value {
        FilterValue::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
        FilterValue::Date(d) => ToSqlOutput::Owned(Value::Text(d.format("%Y-%m-%d").to_string())),
        FilterValue::Number(n) => ToSqlOutput::Owned(Value::Real(*n)),
    }
}

fn raw_value(value: ValueRef<'_>) -> RawValue {
    match value {
        ValueRef::Null => RawValue::Null,
        ValueRef::Integer(i) => RawValue::Integer(i),
        ValueRef::Real(f) => RawValue::Float(f),
        ValueRef::Text(t) => RawValue::Text(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => RawValue::Text(String::from_utf8_lossy(b).into_owned()),
    }
}

impl StorePort for SqliteAdapter {
    fn fetch(&self, table: &TableRef, query: &Query) -> Result<Vec<RawRow>, StoreError> {
        let conn = self
            .pool
            .get()
            .map_err(|e: r2d2::Error| StoreError::backend("sqlite", e))?;

        let (sql, params) = render_select(&quote_ident(&table.table), query, |i, _| format!("?{i}"));
        let bound: Vec<ToSqlOutput<'_>> = params.into_iter().map(to_sql).collect();

        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e: rusqlite::Error| StoreError::backend("sqlite", e))?;
        let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

        let rows = stmt
            .query_map(rusqlite::params_from_iter(bound.iter()), |row| {
                let mut raw = RawRow::new();
                for (i, name) in names.iter().enumerate() {
                    raw.insert(name.clone(), raw_value(row.get_ref(i)?));
                }
                Ok(raw)
            })
            .map_err(|e: rusqlite::Error| StoreError::backend("sqlite", e))?;

        let mut result = Vec::new();
        for row in rows {
            result.push(row.map_err(|e: rusqlite::Error| StoreError::backend("sqlite", e))?);
        }

        Ok(result)
    }
}
