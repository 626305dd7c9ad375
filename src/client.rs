//! Read-only query client over the daily indicators table.
//!
//! Every operation issues at most one blocking round trip, plus one more the
//! first time the latest date is needed on an instance.
//!
//! # Concurrency
//!
//! The connection handle lives in a [`OnceCell`] and the latest date in a
//! [`Cell`], so `IndicatorClient` is `Send` but not `Sync`: an instance can move
//! to another thread but cannot be shared between threads. Use one instance per
//! thread. Timeouts belong to the transport, see [`ClientSettings::timeout`].

use crate::domain::error::{CacheError, StoreError};
use crate::domain::query::{Direction, Query};
use crate::domain::raw_row::RawRow;
use crate::domain::record::{decode_date, IndicatorRecord, ScoreField};
use crate::ports::store_port::{ConnectionFactory, StorePort};
use crate::settings::ClientSettings;
use chrono::NaiveDate;
use log::{debug, info, warn};
use std::cell::{Cell, OnceCell};
use std::collections::BTreeMap;
use std::fmt;

pub const DEFAULT_HISTORY_DAYS: usize = 30;

/// Parameters of [`IndicatorClient::get_top_scores`].
///
/// `score_field` is forwarded to the store as-is; an unknown column fails
/// there as a connection error.
#[derive(Debug, Clone, PartialEq)]
pub struct TopScores {
    pub score_field: String,
    pub min_score: f64,
    pub limit: usize,
    pub date: Option<NaiveDate>,
}

impl Default for TopScores {
    fn default() -> Self {
        Self {
            score_field: ScoreField::Bullish.column().to_string(),
            min_score: 7.0,
            limit: 20,
            date: None,
        }
    }
}

impl TopScores {
    pub fn of(field: ScoreField) -> Self {
        Self {
            score_field: field.column().to_string(),
            ..Self::default()
        }
    }

    pub fn min_score(mut self, min_score: f64) -> Self {
        self.min_score = min_score;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn on(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }
}

pub struct IndicatorClient {
    settings: ClientSettings,
    factory: Box<dyn ConnectionFactory>,
    connection: OnceCell<Box<dyn StorePort>>,
    latest_date: Cell<Option<NaiveDate>>,
}

impl IndicatorClient {
    /// Client backed by [`DefaultConnectionFactory`](crate::adapters::DefaultConnectionFactory),
    /// which picks a transport from the URL scheme.
    pub fn new(settings: ClientSettings) -> Self {
        Self::with_factory(settings, crate::adapters::DefaultConnectionFactory)
    }

    pub fn from_env() -> Self {
        Self::new(ClientSettings::from_env())
    }

    pub fn with_factory(settings: ClientSettings, factory: impl ConnectionFactory + 'static) -> Self {
        if !settings.is_configured() {
            warn!(
                "Supabase credentials not configured. Set {} and {} environment variables.",
                crate::settings::URL_ENV,
                crate::settings::KEY_ENV
            );
        }
        Self {
            settings,
            factory: Box::new(factory),
            connection: OnceCell::new(),
            latest_date: Cell::new(None),
        }
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    pub fn is_configured(&self) -> bool {
        self.settings.is_configured()
    }

    /// Returns the connection, opening it on first use.
    pub fn connection(&self) -> Result<&dyn StorePort, CacheError> {
        if let Some(conn) = self.connection.get() {
            return Ok(conn.as_ref());
        }

        let target = self.settings.target()?;
        debug!("opening connection to {}", target.url);
        let conn = self
            .factory
            .connect(&target)
            .map_err(|e| CacheError::connection("connect", format!(" to {}", target.url), e))?;
        Ok(self.connection.get_or_init(|| conn).as_ref())
    }

    fn fetch(
        &self,
        operation: &'static str,
        context: &str,
        query: &Query,
    ) -> Result<Vec<RawRow>, CacheError> {
        let conn = self.connection()?;
        debug!("{operation}{context}: {query:?}");
        conn.fetch(&self.settings.table_ref(), query)
            .map_err(|e| CacheError::connection(operation, context, e))
    }

    fn fetch_records(
        &self,
        operation: &'static str,
        context: &str,
        query: &Query,
    ) -> Result<Vec<IndicatorRecord>, CacheError> {
        self.fetch(operation, context, query)?
            .iter()
            .map(|row| {
                IndicatorRecord::from_row(row)
                    .map_err(|e| CacheError::connection(operation, context, e.into()))
            })
            .collect()
    }

    fn resolve_date(&self, date: Option<NaiveDate>) -> Result<NaiveDate, CacheError> {
        match date {
            Some(d) => Ok(d),
            None => self.resolve_latest_date(),
        }
    }

    fn resolve_latest_date(&self) -> Result<NaiveDate, CacheError> {
        if let Some(date) = self.latest_date.get() {
            return Ok(date);
        }

        let query = Query::select(&["date"])
            .order_by("date", Direction::Desc)
            .limit(1);
        let rows = self.fetch("get_latest_date", "", &query)?;
        let row = rows.first().ok_or_else(|| CacheError::NoData {
            table: self.settings.table_ref().to_string(),
        })?;

        let date = decode_date(row.get("date"))
            .map_err(|e| CacheError::connection("get_latest_date", "", e.into()))?
            .ok_or_else(|| {
                CacheError::connection(
                    "get_latest_date",
                    "",
                    StoreError::Payload {
                        reason: "latest row has no date".into(),
                    },
                )
            })?;

        info!("latest indicator date in {} is {date}", self.settings.table_ref());
        self.latest_date.set(Some(date));
        Ok(date)
    }

    /// Most recent date with data. Cached for the lifetime of this instance.
    pub fn get_latest_date(&self) -> Result<NaiveDate, CacheError> {
        self.resolve_latest_date()
    }

    /// Indicator row for one ticker. `symbol` is case-insensitive; `date`
    /// defaults to the latest date.
    pub fn get(&self, symbol: &str, date: Option<NaiveDate>) -> Result<IndicatorRecord, CacheError> {
        let symbol = symbol.to_uppercase();
        let date = self.resolve_date(date)?;
        let context = format!(" for {symbol} on {date}");

        let query = Query::select_all()
            .eq("symbol", symbol.as_str())
            .eq("date", date);
        let mut records = self.fetch_records("get", &context, &query)?;

        if records.is_empty() {
            return Err(CacheError::TickerNotFound { symbol, date });
        }
        Ok(records.swap_remove(0))
    }

    /// Rows for several tickers on one date. Tickers without a row are absent
    /// from the result; an empty input issues no query.
    pub fn get_batch<S: AsRef<str>>(
        &self,
        symbols: &[S],
        date: Option<NaiveDate>,
    ) -> Result<BTreeMap<String, IndicatorRecord>, CacheError> {
        if symbols.is_empty() {
            return Ok(BTreeMap::new());
        }

        let symbols: Vec<String> = symbols.iter().map(|s| s.as_ref().to_uppercase()).collect();
        let date = self.resolve_date(date)?;
        let context = format!(" for {} symbols on {date}", symbols.len());

        let query = Query::select_all()
            .is_in("symbol", symbols)
            .eq("date", date);
        let records = self.fetch_records("get_batch", &context, &query)?;

        Ok(records
            .into_iter()
            .map(|record| (record.symbol().to_string(), record))
            .collect())
    }

    /// Tickers with a row on `date` (default latest), ascending.
    pub fn list_tickers(&self, date: Option<NaiveDate>) -> Result<Vec<String>, CacheError> {
        let date = self.resolve_date(date)?;
        let context = format!(" on {date}");

        let query = Query::select(&["symbol"])
            .eq("date", date)
            .order_by("symbol", Direction::Asc);
        let records = self.fetch_records("list_tickers", &context, &query)?;

        Ok(records
            .into_iter()
            .map(|record| record.symbol().to_string())
            .collect())
    }

    /// Up to `days` rows for one ticker across all dates, most recent first.
    pub fn get_history(&self, symbol: &str, days: usize) -> Result<Vec<IndicatorRecord>, CacheError> {
        let symbol = symbol.to_uppercase();
        let context = format!(" for {symbol}");

        let query = Query::select_all()
            .eq("symbol", symbol.as_str())
            .order_by("date", Direction::Desc)
            .limit(days);
        self.fetch_records("get_history", &context, &query)
    }

    /// Highest-scoring rows on one date, descending by `request.score_field`.
    pub fn get_top_scores(&self, request: &TopScores) -> Result<Vec<IndicatorRecord>, CacheError> {
        let date = self.resolve_date(request.date)?;
        let context = format!(
            " for {} >= {} on {date}",
            request.score_field, request.min_score
        );

        let query = Query::select_all()
            .eq("date", date)
            .gte(&request.score_field, request.min_score)
            .order_by(&request.score_field, Direction::Desc)
            .limit(request.limit);
        self.fetch_records("get_top_scores", &context, &query)
    }
}

impl fmt::Display for IndicatorClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.is_configured() {
            "configured"
        } else {
            "not configured"
        };
        write!(f, "IndicatorClient({status})")
    }
}

impl fmt::Debug for IndicatorClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndicatorClient")
            .field("settings", &self.settings)
            .field("connected", &self.connection.get().is_some())
            .field("latest_date", &self.latest_date.get())
            .finish()
    }
}
