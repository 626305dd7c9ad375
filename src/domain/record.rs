//! Typed indicator record and its mapping to and from raw rows.
//!
//! Decoding only fails on a malformed `date`. A value whose variant cannot
//! represent its column leaves that field unset and is logged.

use crate::domain::error::DecodeError;
use crate::domain::raw_row::{RawRow, RawValue};
use chrono::NaiveDate;
use log::warn;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Per-component contributions to a 0-10 score, kept as stored.
///
/// Components are usually numbers but the column is free-form JSON, so
/// nulls, strings or even a non-object document survive decoding unchanged.
/// [`ScoreBreakdown::contribution`] and [`ScoreBreakdown::contributions`]
/// give the numeric view.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreBreakdown(RawValue);

impl ScoreBreakdown {
    /// Component map, or `None` when the stored document is not an object.
    pub fn components(&self) -> Option<&BTreeMap<String, RawValue>> {
        match &self.0 {
            RawValue::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Numeric contribution of one component.
    pub fn contribution(&self, name: &str) -> Option<f64> {
        self.components()?.get(name).and_then(numeric)
    }

    /// Every component with a numeric contribution.
    pub fn contributions(&self) -> BTreeMap<String, f64> {
        self.components()
            .into_iter()
            .flatten()
            .filter_map(|(name, value)| numeric(value).map(|n| (name.clone(), n)))
            .collect()
    }

    pub fn raw(&self) -> &RawValue {
        &self.0
    }
}

impl From<BTreeMap<String, f64>> for ScoreBreakdown {
    fn from(components: BTreeMap<String, f64>) -> Self {
        ScoreBreakdown(RawValue::Object(
            components
                .into_iter()
                .map(|(name, contribution)| (name, RawValue::Float(contribution)))
                .collect(),
        ))
    }
}

fn numeric(value: &RawValue) -> Option<f64> {
    match value {
        RawValue::Float(f) => Some(*f),
        RawValue::Integer(i) => Some(*i as f64),
        _ => None,
    }
}

/// A column type the record mapper knows how to decode and encode.
pub trait Column: Sized {
    type View<'a>
    where
        Self: 'a;

    /// `None` when `value` cannot represent this column.
    fn decode(value: &RawValue) -> Option<Self>;
    fn encode(&self) -> RawValue;
    fn view(&self) -> Self::View<'_>;
}

impl Column for f64 {
    type View<'a> = f64;

    fn decode(value: &RawValue) -> Option<Self> {
        match value {
            RawValue::Text(s) => s.trim().parse().ok(),
            other => numeric(other),
        }
    }

    fn encode(&self) -> RawValue {
        RawValue::Float(*self)
    }

    fn view(&self) -> f64 {
        *self
    }
}

// 2^63 as f64; i64::MAX itself is not representable
const I64_BOUND: f64 = 9_223_372_036_854_775_808.0;

impl Column for i64 {
    type View<'a> = i64;

    fn decode(value: &RawValue) -> Option<Self> {
        match value {
            RawValue::Integer(i) => Some(*i),
            // JSON writers may emit 1.2e6 for a whole number
            RawValue::Float(f) if f.fract() == 0.0 && (-I64_BOUND..I64_BOUND).contains(f) => {
                Some(*f as i64)
            }
            RawValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    fn encode(&self) -> RawValue {
        RawValue::Integer(*self)
    }

    fn view(&self) -> i64 {
        *self
    }
}

impl Column for String {
    type View<'a> = &'a str;

    fn decode(value: &RawValue) -> Option<Self> {
        match value {
            RawValue::Text(s) => Some(s.clone()),
            RawValue::Bool(b) => Some(b.to_string()),
            RawValue::Integer(i) => Some(i.to_string()),
            RawValue::Float(f) => Some(f.to_string()),
            _ => None,
        }
    }

    fn encode(&self) -> RawValue {
        RawValue::Text(self.clone())
    }

    fn view(&self) -> &str {
        self
    }
}

impl Column for ScoreBreakdown {
    type View<'a> = &'a ScoreBreakdown;

    fn decode(value: &RawValue) -> Option<Self> {
        let stored = match value {
            // JSON stored as text by backends without a native JSON type
            RawValue::Text(text) => match serde_json::from_str(text) {
                Ok(json @ serde_json::Value::Object(_)) => RawValue::from_json(json),
                _ => value.clone(),
            },
            other => other.clone(),
        };
        Some(ScoreBreakdown(stored))
    }

    fn encode(&self) -> RawValue {
        self.0.clone()
    }

    fn view(&self) -> &ScoreBreakdown {
        self
    }
}

fn decode_column<T: Column>(row: &RawRow, column: &str) -> Option<T> {
    let value = row.get(column).filter(|v| !v.is_null())?;
    let decoded = T::decode(value);
    if decoded.is_none() {
        warn!(
            "column {column}: {} value {} does not fit, leaving it unset",
            value.type_name(),
            value.to_json()
        );
    }
    decoded
}

/// Strict `YYYY-MM-DD`: four-digit year, zero-padded month and day.
fn parse_iso_date(text: &str) -> Option<NaiveDate> {
    let bytes = text.as_bytes();
    let shaped = bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        });
    if !shaped {
        return None;
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d").ok()
}

/// Accepts ISO-8601 text or an already-typed date.
pub fn decode_date(value: Option<&RawValue>) -> Result<Option<NaiveDate>, DecodeError> {
    match value {
        None | Some(RawValue::Null) => Ok(None),
        Some(RawValue::Date(d)) => Ok(Some(*d)),
        Some(RawValue::Text(s)) => parse_iso_date(s)
            .map(Some)
            .ok_or_else(|| DecodeError::InvalidDate { value: s.clone() }),
        Some(other) => Err(DecodeError::InvalidDate {
            value: other.to_json().to_string(),
        }),
    }
}

macro_rules! indicator_record {
    ($( $(#[$doc:meta])* $field:ident : $ty:ty ),* $(,)?) => {
        /// One row of precomputed analytics for one (symbol, date) pair.
        ///
        /// Every field besides `symbol` and `date` is independently optional.
        /// Records are immutable; use [`IndicatorRecord::to_builder`] to derive a new one.
        #[derive(Debug, Clone, PartialEq, Default)]
        pub struct IndicatorRecord {
            symbol: String,
            date: Option<NaiveDate>,
            $( $field: Option<$ty>, )*
        }

        impl IndicatorRecord {
            /// Every column of the backing table, in canonical order.
            pub const COLUMNS: &'static [&'static str] =
                &["symbol", "date", $( stringify!($field), )*];

            pub fn symbol(&self) -> &str {
                &self.symbol
            }

            pub fn date(&self) -> Option<NaiveDate> {
                self.date
            }

            $(
                $(#[$doc])*
                pub fn $field(&self) -> Option<<$ty as Column>::View<'_>> {
                    self.$field.as_ref().map(Column::view)
                }
            )*

            /// Decodes a raw row. Unrecognized columns are ignored; a missing
            /// `symbol` becomes the empty string. Fails only on a malformed date.
            pub fn from_row(row: &RawRow) -> Result<Self, DecodeError> {
                Ok(Self {
                    symbol: decode_column(row, "symbol").unwrap_or_default(),
                    date: decode_date(row.get("date"))?,
                    $( $field: decode_column(row, stringify!($field)), )*
                })
            }

            /// Sparse encoding: `symbol` and `date` always, everything else only when set.
            pub fn to_row(&self) -> RawRow {
                let mut row = RawRow::new();
                row.insert("symbol".to_string(), RawValue::Text(self.symbol.clone()));
                row.insert(
                    "date".to_string(),
                    self.date
                        .map_or(RawValue::Null, |d| RawValue::Text(d.format("%Y-%m-%d").to_string())),
                );
                $(
                    if let Some(value) = &self.$field {
                        row.insert(stringify!($field).to_string(), value.encode());
                    }
                )*
                row
            }

            pub fn builder(symbol: impl Into<String>, date: NaiveDate) -> IndicatorRecordBuilder {
                IndicatorRecordBuilder {
                    record: IndicatorRecord {
                        symbol: symbol.into(),
                        date: Some(date),
                        ..IndicatorRecord::default()
                    },
                }
            }

            pub fn to_builder(&self) -> IndicatorRecordBuilder {
                IndicatorRecordBuilder {
                    record: self.clone(),
                }
            }
        }

        #[derive(Debug, Clone)]
        pub struct IndicatorRecordBuilder {
            record: IndicatorRecord,
        }

        impl IndicatorRecordBuilder {
            $(
                pub fn $field(mut self, value: impl Into<$ty>) -> Self {
                    self.record.$field = Some(value.into());
                    self
                }
            )*

            pub fn build(self) -> IndicatorRecord {
                self.record
            }
        }
    };
}

indicator_record! {
    close: f64,

    /// Relative strength index, 0-100.
    rsi: f64,
    stoch_k: f64,
    stoch_d: f64,
    williams_r: f64,
    /// Rate of change, percent.
    roc: f64,

    macd: f64,
    macd_signal: f64,
    macd_hist: f64,
    adx: f64,

    sma_20: f64,
    sma_50: f64,
    sma_200: f64,

    bb_upper: f64,
    bb_lower: f64,
    /// Position of the close inside the Bollinger band, 0 = lower, 1 = upper.
    bb_position: f64,
    atr: f64,

    volume: i64,
    /// Volume relative to its recent average.
    volume_ratio: f64,
    obv: i64,

    bullish_score: f64,
    reversal_score: f64,
    oversold_score: f64,

    bullish_components: ScoreBreakdown,
    reversal_components: ScoreBreakdown,
    oversold_components: ScoreBreakdown,

    /// Raw label, one of HIGH/MEDIUM/LOW/NONE. See [`IndicatorRecord::conviction`].
    reversal_conviction: String,
    reversal_raw_score: f64,
    reversal_volume_multiplier: f64,
    reversal_adx_multiplier: f64,

    /// Raw label, one of none/bullish/bearish. See [`IndicatorRecord::divergence`].
    divergence_type: String,
    divergence_strength: f64,

    price_52w_high: f64,
    pct_from_52w_high: f64,
}

impl IndicatorRecord {
    pub fn conviction(&self) -> Option<Conviction> {
        self.reversal_conviction().and_then(|s| s.parse().ok())
    }

    pub fn divergence(&self) -> Option<Divergence> {
        self.divergence_type().and_then(|s| s.parse().ok())
    }

    pub fn score(&self, field: ScoreField) -> Option<f64> {
        match field {
            ScoreField::Bullish => self.bullish_score(),
            ScoreField::Reversal => self.reversal_score(),
            ScoreField::Oversold => self.oversold_score(),
        }
    }

    pub fn breakdown(&self, field: ScoreField) -> Option<&ScoreBreakdown> {
        match field {
            ScoreField::Bullish => self.bullish_components(),
            ScoreField::Reversal => self.reversal_components(),
            ScoreField::Oversold => self.oversold_components(),
        }
    }
}

/// The three score columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScoreField {
    Bullish,
    Reversal,
    Oversold,
}

impl ScoreField {
    pub fn column(self) -> &'static str {
        match self {
            ScoreField::Bullish => "bullish_score",
            ScoreField::Reversal => "reversal_score",
            ScoreField::Oversold => "oversold_score",
        }
    }
}

impl fmt::Display for ScoreField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown label: {0}")]
pub struct UnknownLabel(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Conviction {
    None,
    Low,
    Medium,
    High,
}

impl Conviction {
    pub fn as_str(self) -> &'static str {
        match self {
            Conviction::None => "NONE",
            Conviction::Low => "LOW",
            Conviction::Medium => "MEDIUM",
            Conviction::High => "HIGH",
        }
    }
}

impl FromStr for Conviction {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "HIGH" => Ok(Conviction::High),
            "MEDIUM" => Ok(Conviction::Medium),
            "LOW" => Ok(Conviction::Low),
            "NONE" => Ok(Conviction::None),
            _ => Err(UnknownLabel(s.to_string())),
        }
    }
}

impl fmt::Display for Conviction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Divergence {
    None,
    Bullish,
    Bearish,
}

impl Divergence {
    pub fn as_str(self) -> &'static str {
        match self {
            Divergence::None => "none",
            Divergence::Bullish => "bullish",
            Divergence::Bearish => "bearish",
        }
    }
}

impl FromStr for Divergence {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "none" => Ok(Divergence::None),
            "bullish" => Ok(Divergence::Bullish),
            "bearish" => Ok(Divergence::Bearish),
            _ => Err(UnknownLabel(s.to_string())),
        }
    }
}

impl fmt::Display for Divergence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
