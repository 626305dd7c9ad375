#![allow(dead_code)]

use investing_cache::client::IndicatorClient;
use investing_cache::domain::error::StoreError;
use investing_cache::domain::query::{Columns, Direction, Filter, FilterValue, Query, TableRef};
use investing_cache::domain::raw_row::{RawRow, RawValue};
use investing_cache::domain::record::IndicatorRecord;
use investing_cache::ports::store_port::{ConnectionFactory, ConnectionTarget, StorePort};
use investing_cache::settings::ClientSettings;
use std::cmp::Ordering;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex};

pub use chrono::NaiveDate;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// A row with `symbol`, ISO `date` and the given extra columns.
pub fn row(symbol: &str, date: &str, extra: &[(&str, RawValue)]) -> RawRow {
    let mut row = RawRow::new();
    row.insert("symbol".into(), RawValue::Text(symbol.into()));
    row.insert("date".into(), RawValue::Text(date.into()));
    for (column, value) in extra {
        row.insert(column.to_string(), value.clone());
    }
    row
}

/// In-memory table that evaluates queries the way the real stores do and
/// records every query it receives.
#[derive(Clone, Default)]
pub struct MockStore {
    rows: Arc<Vec<RawRow>>,
    queries: Arc<Mutex<Vec<Query>>>,
    connects: Arc<AtomicUsize>,
}

impl MockStore {
    pub fn new(rows: Vec<RawRow>) -> Self {
        Self {
            rows: Arc::new(rows),
            ..Self::default()
        }
    }

    pub fn queries(&self) -> Vec<Query> {
        self.queries.lock().unwrap().clone()
    }

    pub fn query_count(&self) -> usize {
        self.queries.lock().unwrap().len()
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(AtomicOrdering::SeqCst)
    }

    pub fn factory(&self) -> impl ConnectionFactory + 'static {
        let store = self.clone();
        move |_: &ConnectionTarget| -> Result<Box<dyn StorePort>, StoreError> {
            store.connects.fetch_add(1, AtomicOrdering::SeqCst);
            Ok(Box::new(store.clone()))
        }
    }

    pub fn client(&self) -> IndicatorClient {
        IndicatorClient::with_factory(configured_settings(), self.factory())
    }
}

pub fn configured_settings() -> ClientSettings {
    ClientSettings::resolve(Some("https://test.supabase.co"), Some("anon-key"), |_| None)
}

fn unknown_column(table: &TableRef, column: &str) -> StoreError {
    StoreError::Status {
        status: 400,
        message: format!("column {}.{column} does not exist", table.table),
    }
}

fn compare(value: &RawValue, filter: &FilterValue) -> Option<Ordering> {
    match (value, filter) {
        (RawValue::Text(a), FilterValue::Text(b)) => Some(a.as_str().cmp(b.as_str())),
        (RawValue::Text(a), FilterValue::Date(b)) => {
            NaiveDate::parse_from_str(a, "%Y-%m-%d").ok().map(|a| a.cmp(b))
        }
        (RawValue::Date(a), FilterValue::Date(b)) => Some(a.cmp(b)),
        (RawValue::Float(a), FilterValue::Number(b)) => a.partial_cmp(b),
        (RawValue::Integer(a), FilterValue::Number(b)) => (*a as f64).partial_cmp(b),
        _ => None,
    }
}

fn matches(row: &RawRow, filter: &Filter) -> bool {
    let Some(value) = row.get(filter.column()) else {
        return false;
    };
    match filter {
        Filter::Eq { value: wanted, .. } => compare(value, wanted) == Some(Ordering::Equal),
        Filter::In { values, .. } => values
            .iter()
            .any(|wanted| compare(value, wanted) == Some(Ordering::Equal)),
        Filter::Gte { value: bound, .. } => {
            matches!(compare(value, bound), Some(Ordering::Greater | Ordering::Equal))
        }
    }
}

fn sort_key(a: Option<&RawValue>, b: Option<&RawValue>) -> Ordering {
    match (a, b) {
        (Some(RawValue::Text(a)), Some(RawValue::Text(b))) => a.cmp(b),
        (Some(RawValue::Float(a)), Some(RawValue::Float(b))) => a.total_cmp(b),
        (Some(RawValue::Integer(a)), Some(RawValue::Integer(b))) => a.cmp(b),
        (Some(RawValue::Date(a)), Some(RawValue::Date(b))) => a.cmp(b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

impl StorePort for MockStore {
    fn fetch(&self, table: &TableRef, query: &Query) -> Result<Vec<RawRow>, StoreError> {
        self.queries.lock().unwrap().push(query.clone());

        let known = |column: &str| IndicatorRecord::COLUMNS.contains(&column);
        if let Some(filter) = query.filters.iter().find(|f| !known(f.column())) {
            return Err(unknown_column(table, filter.column()));
        }
        if let Some(order) = query.order.as_ref().filter(|o| !known(&o.column)) {
            return Err(unknown_column(table, &order.column));
        }

        let mut rows: Vec<RawRow> = self
            .rows
            .iter()
            .filter(|row| query.filters.iter().all(|f| matches(row, f)))
            .cloned()
            .collect();

        if let Some(order) = &query.order {
            rows.sort_by(|a, b| {
                let ord = sort_key(a.get(&order.column), b.get(&order.column));
                match order.direction {
                    Direction::Asc => ord,
                    Direction::Desc => ord.reverse(),
                }
            });
        }
        if let Some(limit) = query.limit {
            rows.truncate(limit);
        }
        if let Columns::Only(columns) = &query.columns {
            for row in &mut rows {
                row.retain(|name, _| columns.contains(name));
            }
        }
        Ok(rows)
    }
}
