//! PostgREST data adapter: reads a Supabase table over HTTPS.

use crate::domain::error::StoreError;
use crate::domain::query::{Columns, Direction, Filter, FilterValue, Query, TableRef};
use crate::domain::raw_row::{row_from_json, RawRow};
use crate::ports::store_port::{ConnectionTarget, StorePort};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use serde::Deserialize;
use serde_json::Value;

/// Error body PostgREST returns with non-2xx responses.
#[derive(Debug, Deserialize)]
struct PostgrestError {
    message: String,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    details: Option<String>,
    #[serde(default)]
    hint: Option<String>,
}

impl PostgrestError {
    fn describe(&self) -> String {
        let mut text = self.message.clone();
        if let Some(code) = &self.code {
            text = format!("{text} ({code})");
        }
        if let Some(details) = &self.details {
            text = format!("{text}; {details}");
        }
        if let Some(hint) = &self.hint {
            text = format!("{text}; hint: {hint}");
        }
        text
    }
}

pub struct RestAdapter {
    client: Client,
    base_url: String,
}

impl RestAdapter {
    pub fn connect(target: &ConnectionTarget) -> Result<Self, StoreError> {
        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(&target.key)
            .map_err(|e| StoreError::backend("http", e))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", target.key))
            .map_err(|e| StoreError::backend("http", e))?;
        headers.insert("apikey", key);
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let mut builder = Client::builder().default_headers(headers);
        if let Some(timeout) = target.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| StoreError::backend("http", e))?;

        Ok(Self {
            client,
            base_url: target.url.trim_end_matches('/').to_string(),
        })
    }

    fn table_url(&self, table: &TableRef) -> String {
        format!("{}/rest/v1/{}", self.base_url, table.table)
    }
}

/// Quotes a value for use inside a PostgREST `in.(...)` list when it contains
/// reserved characters.
fn list_item(value: &FilterValue) -> String {
    let text = value.to_string();
    if text.contains([',', '(', ')', '"', '\\', ' ']) {
        format!("\"{}\"", text.replace('\\', "\\\\").replace('"', "\\\""))
    } else {
        text
    }
}

/// Renders a query as PostgREST URL parameters.
pub fn request_params(query: &Query) -> Vec<(String, String)> {
    let mut params = Vec::new();

    let select = match &query.columns {
        Columns::All => "*".to_string(),
        Columns::Only(columns) => columns.join(","),
    };
    params.push(("select".to_string(), select));

    for filter in &query.filters {
        let rendered = match filter {
            Filter::Eq { value, .. } => format!("eq.{value}"),
            Filter::Gte { value, .. } => format!("gte.{value}"),
            Filter::In { values, .. } => {
                let items: Vec<String> = values.iter().map(list_item).collect();
                format!("in.({})", items.join(","))
            }
        };
        params.push((filter.column().to_string(), rendered));
    }

    if let Some(order) = &query.order {
        let direction = match order.direction {
            Direction::Asc => "asc",
            Direction::Desc => "desc",
        };
        params.push(("order".to_string(), format!("{}.{direction}", order.column)));
    }

    if let Some(limit) = query.limit {
        params.push(("limit".to_string(), limit.to_string()));
    }

    params
}

/// Decodes a PostgREST response body (a JSON array of objects).
pub fn parse_rows(body: &str) -> Result<Vec<RawRow>, StoreError> {
    let value: Value = serde_json::from_str(body).map_err(|e| StoreError::Payload {
        reason: e.to_string(),
    })?;

    let Value::Array(items) = value else {
        return Err(StoreError::Payload {
            reason: "expected a JSON array of rows".into(),
        });
    };

    items
        .into_iter()
        .map(|item| match item {
            Value::Object(map) => Ok(row_from_json(map)),
            other => Err(StoreError::Payload {
                reason: format!("expected a row object, got {other}"),
            }),
        })
        .collect()
}

fn status_error(status: u16, body: &str) -> StoreError {
    let message = match serde_json::from_str::<PostgrestError>(body) {
        Ok(err) => err.describe(),
        Err(_) if body.trim().is_empty() => "empty response".to_string(),
        Err(_) => body.trim().to_string(),
    };
    StoreError::Status { status, message }
}

impl StorePort for RestAdapter {
    fn fetch(&self, table: &TableRef, query: &Query) -> Result<Vec<RawRow>, StoreError> {
        let response = self
            .client
            .get(self.table_url(table))
            .header("Accept-Profile", table.schema.as_str())
            .query(&request_params(query))
            .send()
            .map_err(|e| StoreError::backend("http", e))?;

        let status = response.status();
        let body = response.text().map_err(|e| StoreError::backend("http", e))?;

        if !status.is_success() {
            return Err(status_error(status.as_u16(), &body));
        }
        parse_rows(&body)
    }
}
