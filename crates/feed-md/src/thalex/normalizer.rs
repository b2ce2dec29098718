//! THALEX trade normalization.
//!
//! Converts the three wire trade shapes into canonical [`Trade`]s:
//!
//! | Channel          | Shape                                                          |
//! |------------------|----------------------------------------------------------------|
//! | `trades.*`       | `{timestamp, price, amount, direction}`                        |
//! | `book.*`         | `[price, amount, direction, timestamp, implied_taker]`         |
//! | `recent_trades.*`| `[price, size, side, timestamp, instrument_name, implied_taker]` |
//!
//! Numbers may be strings or JSON numbers. Wire timestamps are seconds (or
//! milliseconds) and always come out as milliseconds. A malformed trade is
//! dropped with a warning; it never fails the rest of its batch.

use feed_core::{FeedError, Side, Trade, TradeSource, time_util};
use serde_json::Value;
use tracing::warn;

use crate::json_util::{parse_str_bool, parse_str_f64};

/// Minimum tuple length on the book channel.
pub const BOOK_TRADE_ARITY: usize = 5;

/// Minimum tuple length on the recent-trades channel.
pub const RECENT_TRADE_ARITY: usize = 6;

/// Normalize an object-shaped trade from the `trades.*` channel.
///
/// A missing or zero/empty timestamp is replaced by the local wall clock.
pub fn format_trade(exchange: &str, pair: &str, raw: &Value) -> Option<Trade> {
    parse_object_trade(exchange, pair, raw).map_err(|e| warn!("[{exchange}] dropping trade on {pair}: {e}")).ok()
}

/// Normalize a 5-tuple from the `book.*` channel.
pub fn format_book_trade(exchange: &str, pair: &str, raw: &Value) -> Option<Trade> {
    parse_book_tuple(exchange, pair, raw).map_err(|e| warn!("[{exchange}] dropping book trade on {pair}: {e}")).ok()
}

/// Normalize a 6-tuple from the `recent_trades.*` channel.
pub fn format_recent_trade(exchange: &str, pair: &str, raw: &Value) -> Option<Trade> {
    parse_recent_tuple(exchange, pair, raw)
        .map_err(|e| warn!("[{exchange}] dropping recent trade on {pair}: {e}"))
        .ok()
}

fn parse_object_trade(exchange: &str, pair: &str, raw: &Value) -> Result<Trade, FeedError> {
    if !raw.is_object() {
        return Err(FeedError::Validation(format!("expected trade object, got {raw}")));
    }
    let timestamp = match raw.get("timestamp") {
        Some(ts) if !is_unset(ts) => timestamp_ms(Some(ts))?,
        _ => time_util::now_ms(),
    };

    Ok(Trade {
        exchange: exchange.to_string(),
        pair: pair.to_string(),
        timestamp,
        price: quantity(raw.get("price"), "price")?,
        size: quantity(raw.get("amount"), "amount")?,
        side: Side::from_wire(raw.get("direction").and_then(Value::as_str)),
        instrument_name: None,
        implied_taker: None,
        source: Some(TradeSource::Trades),
    })
}

fn parse_book_tuple(exchange: &str, pair: &str, raw: &Value) -> Result<Trade, FeedError> {
    let t = tuple(raw, BOOK_TRADE_ARITY)?;

    Ok(Trade {
        exchange: exchange.to_string(),
        pair: pair.to_string(),
        timestamp: timestamp_ms(t.get(3))?,
        price: quantity(t.first(), "price")?,
        size: quantity(t.get(1), "amount")?,
        side: Side::from_wire(t.get(2).and_then(Value::as_str)),
        instrument_name: Some(pair.to_string()),
        implied_taker: parse_str_bool(t.get(4)),
        source: Some(TradeSource::Book),
    })
}

fn parse_recent_tuple(exchange: &str, pair: &str, raw: &Value) -> Result<Trade, FeedError> {
    let t = tuple(raw, RECENT_TRADE_ARITY)?;
    let instrument = t.get(4).and_then(Value::as_str).unwrap_or(pair);

    Ok(Trade {
        exchange: exchange.to_string(),
        pair: pair.to_string(),
        timestamp: timestamp_ms(t.get(3))?,
        price: quantity(t.first(), "price")?,
        size: quantity(t.get(1), "size")?,
        side: Side::from_wire(t.get(2).and_then(Value::as_str)),
        instrument_name: Some(instrument.to_string()),
        implied_taker: parse_str_bool(t.get(5)),
        source: Some(TradeSource::RecentTrades),
    })
}

// ---------------------------------------------------------------------------
// Field helpers
// ---------------------------------------------------------------------------

/// Borrow `raw` as an array of at least `arity` elements.
fn tuple(raw: &Value, arity: usize) -> Result<&[Value], FeedError> {
    let arr = raw
        .as_array()
        .ok_or_else(|| FeedError::Validation(format!("expected {arity}-tuple, got {raw}")))?;
    if arr.len() < arity {
        return Err(FeedError::Validation(format!("expected {arity}-tuple, got {} fields", arr.len())));
    }
    Ok(arr.as_slice())
}

/// Null, `0`, `""` or `false`: an object trade timestamp that was never filled in.
fn is_unset(v: &Value) -> bool {
    match v {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Finite, non-negative price or size.
fn quantity(v: Option<&Value>, field: &str) -> Result<f64, FeedError> {
    match parse_str_f64(v) {
        Some(x) if x.is_finite() && x >= 0.0 => Ok(x),
        _ => Err(FeedError::Validation(format!("invalid {field}: {}", display(v)))),
    }
}

fn timestamp_ms(v: Option<&Value>) -> Result<u64, FeedError> {
    parse_str_f64(v)
        .and_then(time_util::to_epoch_ms)
        .ok_or_else(|| FeedError::Validation(format!("invalid timestamp: {}", display(v))))
}

fn display(v: Option<&Value>) -> String {
    v.map_or_else(|| "<missing>".to_string(), Value::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const EX: &str = "THALEX";

    #[test]
    fn recent_trade_example() {
        let raw = json!(["50000.5", "0.01", "buy", "1690000000", "BTC-PERPETUAL", true]);
        let trade = format_recent_trade(EX, "BTC-PERPETUAL", &raw).unwrap();
        assert_eq!(
            trade,
            Trade {
                exchange: "THALEX".into(),
                pair: "BTC-PERPETUAL".into(),
                timestamp: 1_690_000_000_000,
                price: 50000.5,
                size: 0.01,
                side: Side::Buy,
                instrument_name: Some("BTC-PERPETUAL".into()),
                implied_taker: Some(true),
                source: Some(TradeSource::RecentTrades),
            }
        );
    }

    #[test]
    fn book_trade_from_strings() {
        let raw = json!(["50001", "0.02", "sell", "1690000001", "false"]);
        let trade = format_book_trade(EX, "BTC-PERPETUAL", &raw).unwrap();
        assert_eq!(trade.price, 50001.0);
        assert_eq!(trade.size, 0.02);
        assert_eq!(trade.side, Side::Sell);
        assert_eq!(trade.timestamp, 1_690_000_001_000);
        assert_eq!(trade.instrument_name.as_deref(), Some("BTC-PERPETUAL"));
        assert_eq!(trade.implied_taker, Some(false));
        assert_eq!(trade.source, Some(TradeSource::Book));
    }

    #[test]
    fn seconds_scaled_on_every_shape() {
        let ts = 1_700_000_123.0;
        let obj = json!({"timestamp": ts, "price": 1, "amount": 1, "direction": "buy"});
        let book = json!([1, 1, "buy", ts, false]);
        let recent = json!([1, 1, "buy", ts, "X", false]);
        assert_eq!(format_trade(EX, "X", &obj).unwrap().timestamp, 1_700_000_123_000);
        assert_eq!(format_book_trade(EX, "X", &book).unwrap().timestamp, 1_700_000_123_000);
        assert_eq!(format_recent_trade(EX, "X", &recent).unwrap().timestamp, 1_700_000_123_000);
    }

    #[test]
    fn millisecond_timestamps_kept() {
        let obj = json!({"timestamp": 1_700_000_123_456u64, "price": 1, "amount": 1, "direction": "buy"});
        assert_eq!(format_trade(EX, "X", &obj).unwrap().timestamp, 1_700_000_123_456);
    }

    #[test]
    fn side_mapping_on_every_shape() {
        for (marker, expected) in [
            (json!("buy"), Side::Buy),
            (json!("sell"), Side::Sell),
            (json!("Buy"), Side::Sell),
            (json!("unknown"), Side::Sell),
            (json!(1), Side::Sell),
            (json!(null), Side::Sell),
        ] {
            let obj = json!({"timestamp": 1, "price": 1, "amount": 1, "direction": marker.clone()});
            let book = json!([1, 1, marker.clone(), 1, false]);
            let recent = json!([1, 1, marker.clone(), 1, "X", false]);
            assert_eq!(format_trade(EX, "X", &obj).unwrap().side, expected, "{marker}");
            assert_eq!(format_book_trade(EX, "X", &book).unwrap().side, expected, "{marker}");
            assert_eq!(format_recent_trade(EX, "X", &recent).unwrap().side, expected, "{marker}");
        }
    }

    #[test]
    fn short_tuples_rejected() {
        assert!(format_book_trade(EX, "X", &json!(["1", "1", "buy", "1"])).is_none());
        assert!(format_recent_trade(EX, "X", &json!(["1", "1", "buy", "1", "X"])).is_none());
        assert!(format_recent_trade(EX, "X", &json!([])).is_none());
        assert!(format_book_trade(EX, "X", &json!({"price": 1})).is_none());
    }

    #[test]
    fn invalid_numbers_rejected() {
        assert!(format_book_trade(EX, "X", &json!(["abc", "1", "buy", "1", false])).is_none());
        assert!(format_book_trade(EX, "X", &json!(["-1", "1", "buy", "1", false])).is_none());
        assert!(format_recent_trade(EX, "X", &json!(["1", "1", "buy", "-5", "X", false])).is_none());
        assert!(format_trade(EX, "X", &json!({"price": "1", "amount": null})).is_none());
    }

    #[test]
    fn object_trade_without_timestamp_uses_clock() {
        let before = time_util::now_ms();
        let trade = format_trade(EX, "BTC-PERPETUAL", &json!({"price": "100", "amount": "2", "direction": "buy"})).unwrap();
        assert!(trade.timestamp >= before);
        assert_eq!(trade.source, Some(TradeSource::Trades));
        assert_eq!(trade.instrument_name, None);
    }

    #[test]
    fn object_trade_zero_or_empty_timestamp_uses_clock() {
        let before = time_util::now_ms();
        for ts in [json!(0), json!(0.0), json!(""), json!(false)] {
            let raw = json!({"timestamp": ts.clone(), "price": "100", "amount": "2", "direction": "buy"});
            assert!(format_trade(EX, "X", &raw).unwrap().timestamp >= before, "{ts}");
        }
    }

    #[test]
    fn out_of_range_timestamp_rejected() {
        let obj = json!({"timestamp": 1e30, "price": 1, "amount": 1, "direction": "buy"});
        assert!(format_trade(EX, "X", &obj).is_none());
        assert!(format_recent_trade(EX, "X", &json!([1, 1, "buy", 1e30, "X", true])).is_none());
    }

    #[test]
    fn recent_trade_instrument_falls_back_to_pair() {
        let trade = format_recent_trade(EX, "ETH-PERPETUAL", &json!([1, 1, "buy", 1, null, true])).unwrap();
        assert_eq!(trade.instrument_name.as_deref(), Some("ETH-PERPETUAL"));
    }

    #[test]
    fn implied_taker_unparseable_is_none() {
        let trade = format_book_trade(EX, "X", &json!([1, 1, "buy", 1, "maybe"])).unwrap();
        assert_eq!(trade.implied_taker, None);
    }
}
