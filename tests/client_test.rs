//! Client operations against an in-memory store.
//!
//! Tests cover:
//! - Symbol normalisation and single lookups
//! - Batch lookups, including the empty-input shortcut
//! - Latest-date resolution and its per-instance cache
//! - Top scores, history and ticker listing
//! - Error taxonomy (not found, connection, configuration)
//! - Decoding of odd stored values without failing the call

mod common;

use common::*;
use investing_cache::client::{IndicatorClient, TopScores};
use investing_cache::domain::error::{CacheError, DecodeError, ErrorKind, StoreError};
use investing_cache::domain::query::{Direction, Filter, FilterValue};
use investing_cache::domain::raw_row::{RawRow, RawValue};
use investing_cache::domain::record::{Conviction, ScoreField};
use investing_cache::settings::ClientSettings;
use std::error::Error;

fn scored(symbol: &str, day: &str, score: f64) -> RawRow {
    row(symbol, day, &[("bullish_score", RawValue::Float(score))])
}

fn market() -> MockStore {
    MockStore::new(vec![
        row(
            "AAPL",
            "2025-01-10",
            &[("close", RawValue::Float(148.0)), ("rsi", RawValue::Float(52.0))],
        ),
        row(
            "AAPL",
            "2025-01-13",
            &[
                ("close", RawValue::Float(150.25)),
                ("rsi", RawValue::Float(58.3)),
                ("volume", RawValue::Integer(1_200_000)),
                ("reversal_conviction", RawValue::Text("HIGH".into())),
            ],
        ),
        row("AAPL", "2025-01-12", &[("close", RawValue::Integer(149))]),
        row("MSFT", "2025-01-13", &[("close", RawValue::Float(420.5))]),
        row("NVDA", "2025-01-13", &[("close", RawValue::Float(140.1))]),
    ])
}

mod lookups {
    use super::*;

    #[test]
    fn get_is_case_insensitive() {
        let store = market();
        let client = store.client();

        let record = client.get("aapl", Some(date(2025, 1, 13))).unwrap();
        assert_eq!(record.symbol(), "AAPL");
        assert_eq!(record.date(), Some(date(2025, 1, 13)));
        assert_eq!(record.close(), Some(150.25));
        assert_eq!(record.volume(), Some(1_200_000));
        assert_eq!(record.conviction(), Some(Conviction::High));

        let query = &store.queries()[0];
        assert!(query.filters.contains(&Filter::Eq {
            column: "symbol".into(),
            value: FilterValue::Text("AAPL".into()),
        }));
    }

    #[test]
    fn get_without_date_uses_latest() {
        let store = market();
        let client = store.client();

        let record = client.get("AAPL", None).unwrap();
        assert_eq!(record.date(), Some(date(2025, 1, 13)));
        assert_eq!(store.query_count(), 2);
    }

    #[test]
    fn integer_close_decodes_as_float() {
        let client = market().client();
        let record = client.get("AAPL", Some(date(2025, 1, 12))).unwrap();
        assert_eq!(record.close(), Some(149.0));
        assert_eq!(record.rsi(), None);
    }

    #[test]
    fn missing_ticker_is_not_found() {
        let client = market().client();
        let err = client.get("ZZZZ", Some(date(2025, 1, 13))).unwrap_err();

        match &err {
            CacheError::TickerNotFound { symbol, date: d } => {
                assert_eq!(symbol, "ZZZZ");
                assert_eq!(*d, date(2025, 1, 13));
            }
            other => panic!("expected TickerNotFound, got {other}"),
        }
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}

mod batch {
    use super::*;

    #[test]
    fn empty_input_issues_no_query() {
        let store = market();
        let client = store.client();

        let result = client.get_batch::<&str>(&[], None).unwrap();
        assert!(result.is_empty());
        assert_eq!(store.query_count(), 0);
        assert_eq!(store.connect_count(), 0);
    }

    #[test]
    fn misses_are_absent() {
        let client = market().client();
        let result = client
            .get_batch(&["aapl", "msft", "zzzz"], Some(date(2025, 1, 13)))
            .unwrap();

        assert_eq!(result.keys().collect::<Vec<_>>(), vec!["AAPL", "MSFT"]);
        assert_eq!(result["MSFT"].close(), Some(420.5));
    }

    #[test]
    fn batch_uses_one_membership_filter() {
        let store = market();
        let client = store.client();
        client
            .get_batch(&["aapl".to_string(), "nvda".to_string()], Some(date(2025, 1, 13)))
            .unwrap();

        let queries = store.queries();
        assert_eq!(queries.len(), 1);
        assert!(queries[0].filters.contains(&Filter::In {
            column: "symbol".into(),
            values: vec!["AAPL".into(), "NVDA".into()],
        }));
    }
}

mod latest_date {
    use super::*;

    #[test]
    fn resolves_most_recent_date() {
        let store = MockStore::new(vec![
            row("AAPL", "2025-01-10", &[]),
            row("AAPL", "2025-01-13", &[]),
            row("AAPL", "2025-01-12", &[]),
        ]);
        let client = store.client();

        assert_eq!(client.get_latest_date().unwrap(), date(2025, 1, 13));

        let query = &store.queries()[0];
        assert_eq!(query.limit, Some(1));
        assert_eq!(query.order.as_ref().unwrap().direction, Direction::Desc);
    }

    #[test]
    fn cached_per_instance() {
        let store = market();
        let client = store.client();

        client.get_latest_date().unwrap();
        client.get_latest_date().unwrap();
        client.list_tickers(None).unwrap();
        assert_eq!(store.query_count(), 2);
        assert_eq!(store.connect_count(), 1);

        let other = store.client();
        other.get_latest_date().unwrap();
        assert_eq!(store.query_count(), 3);
    }

    #[test]
    fn empty_table_is_not_found() {
        let client = MockStore::new(Vec::new()).client();
        let err = client.get_latest_date().unwrap_err();
        assert!(matches!(err, CacheError::NoData { .. }));
        assert!(err.is_not_found());
    }
}

mod listing {
    use super::*;

    #[test]
    fn tickers_are_sorted() {
        let client = market().client();
        assert_eq!(
            client.list_tickers(Some(date(2025, 1, 13))).unwrap(),
            vec!["AAPL", "MSFT", "NVDA"]
        );
    }

    #[test]
    fn no_rows_means_empty_list() {
        let client = market().client();
        assert!(client.list_tickers(Some(date(2024, 6, 1))).unwrap().is_empty());
    }

    #[test]
    fn history_is_newest_first_and_windowed() {
        let store = market();
        let client = store.client();

        let history = client.get_history("aapl", 2).unwrap();
        let dates: Vec<_> = history.iter().map(|r| r.date().unwrap()).collect();
        assert_eq!(dates, vec![date(2025, 1, 13), date(2025, 1, 12)]);
        assert_eq!(store.query_count(), 1);
    }

    #[test]
    fn history_of_unknown_ticker_is_empty() {
        let client = market().client();
        assert!(client.get_history("ZZZZ", 30).unwrap().is_empty());
    }
}

mod top_scores {
    use super::*;

    fn scores() -> MockStore {
        MockStore::new(vec![
            scored("AAA", "2025-01-13", 9.0),
            scored("BBB", "2025-01-13", 8.0),
            scored("CCC", "2025-01-13", 7.5),
            scored("DDD", "2025-01-13", 6.0),
            scored("EEE", "2025-01-13", 3.0),
            scored("OLD", "2025-01-10", 9.9),
        ])
    }

    #[test]
    fn filters_orders_and_limits() {
        let client = scores().client();
        let request = TopScores::default().min_score(7.0).limit(2);

        let top = client.get_top_scores(&request).unwrap();
        let symbols: Vec<_> = top.iter().map(|r| r.symbol()).collect();
        assert_eq!(symbols, vec!["AAA", "BBB"]);
        assert_eq!(top[0].bullish_score(), Some(9.0));
    }

    #[test]
    fn threshold_is_inclusive() {
        let client = scores().client();
        let request = TopScores::default().min_score(7.5);
        assert_eq!(client.get_top_scores(&request).unwrap().len(), 3);
    }

    #[test]
    fn explicit_date_skips_latest_lookup() {
        let store = scores();
        let client = store.client();
        let request = TopScores::of(ScoreField::Bullish).on(date(2025, 1, 10));

        let top = client.get_top_scores(&request).unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].symbol(), "OLD");
        assert_eq!(store.query_count(), 1);
    }

    #[test]
    fn unknown_field_is_a_connection_error() {
        let client = scores().client();
        let request = TopScores {
            score_field: "bogus_score".into(),
            date: Some(date(2025, 1, 13)),
            ..TopScores::default()
        };

        let err = client.get_top_scores(&request).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Connection);
        let source = err.source().unwrap();
        assert!(source.to_string().contains("bogus_score"));
    }
}

mod configuration {
    use super::*;

    #[test]
    fn unconfigured_client_never_calls_factory() {
        let store = market();
        let client = IndicatorClient::with_factory(
            ClientSettings::resolve(None, None, |_| None),
            store.factory(),
        );

        let err = client.get("AAPL", None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert_eq!(store.connect_count(), 0);
    }

    #[test]
    fn connection_is_opened_once() {
        let store = market();
        let client = store.client();

        client.get("AAPL", Some(date(2025, 1, 13))).unwrap();
        client.get("MSFT", Some(date(2025, 1, 13))).unwrap();
        client.list_tickers(Some(date(2025, 1, 13))).unwrap();
        assert_eq!(store.connect_count(), 1);
    }

    #[test]
    fn malformed_date_is_a_connection_error() {
        let store = MockStore::new(vec![
            row("AAPL", "2025-01-13", &[]),
            row("AAPL", "2025-1-10", &[]),
        ]);
        let client = store.client();

        let err = client.get_history("AAPL", 30).unwrap_err();
        match err {
            CacheError::Connection {
                operation, source, ..
            } => {
                assert_eq!(operation, "get_history");
                assert!(matches!(
                    source,
                    StoreError::Decode(DecodeError::InvalidDate { ref value }) if value == "2025-1-10"
                ));
            }
            other => panic!("expected Connection, got {other}"),
        }
    }
}

mod decoding {
    use super::*;
    use investing_cache::domain::raw_row::row_from_json;

    fn odd_market() -> MockStore {
        let aapl = row_from_json(
            serde_json::json!({
                "symbol": "AAPL",
                "date": "2025-01-13",
                "close": 150.25,
                "volume": u64::MAX,
                "rsi": "n/a",
                "bullish_score": 8.0,
                "bullish_components": {"macd": 2.5, "rsi": null},
            })
            .as_object()
            .unwrap()
            .clone(),
        );
        MockStore::new(vec![
            aapl,
            row(
                "MSFT",
                "2025-01-13",
                &[
                    ("volume", RawValue::Float(1.2e6)),
                    ("reversal_components", RawValue::Text("[1, 2]".into())),
                ],
            ),
            row("NVDA", "2025-01-13", &[("close", RawValue::Float(140.1))]),
        ])
    }

    #[test]
    fn unrepresentable_volume_leaves_rest_of_record_intact() {
        let client = odd_market().client();
        let record = client.get("AAPL", Some(date(2025, 1, 13))).unwrap();

        assert_eq!(record.volume(), None);
        assert_eq!(record.rsi(), None);
        assert_eq!(record.close(), Some(150.25));
        assert_eq!(record.bullish_score(), Some(8.0));
    }

    #[test]
    fn null_breakdown_component_is_kept() {
        let client = odd_market().client();
        let record = client.get("AAPL", Some(date(2025, 1, 13))).unwrap();

        let breakdown = record.breakdown(ScoreField::Bullish).unwrap();
        assert_eq!(breakdown.components().unwrap()["rsi"], RawValue::Null);
        assert_eq!(breakdown.contribution("rsi"), None);
        assert_eq!(breakdown.contribution("macd"), Some(2.5));
    }

    #[test]
    fn whole_float_volume_and_non_object_breakdown() {
        let client = odd_market().client();
        let record = client.get("MSFT", Some(date(2025, 1, 13))).unwrap();

        assert_eq!(record.volume(), Some(1_200_000));
        let breakdown = record.breakdown(ScoreField::Reversal).unwrap();
        assert_eq!(breakdown.raw(), &RawValue::Text("[1, 2]".into()));
        assert!(breakdown.components().is_none());
    }

    #[test]
    fn one_odd_row_does_not_fail_the_batch() {
        let client = odd_market().client();
        let batch = client
            .get_batch(&["aapl", "msft", "nvda"], Some(date(2025, 1, 13)))
            .unwrap();
        assert_eq!(batch.len(), 3);

        let top = client.get_top_scores(&TopScores::default().min_score(7.0)).unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].symbol(), "AAPL");
    }
}

#[test]
fn client_moves_across_threads() {
    let client = market().client();
    let handle = std::thread::spawn(move || client.list_tickers(Some(date(2025, 1, 13))));
    assert_eq!(handle.join().unwrap().unwrap().len(), 3);
}
