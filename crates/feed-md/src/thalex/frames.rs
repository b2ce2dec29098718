//! THALEX JSON frame handling.
//!
//! Builds outbound control frames and classifies inbound frames. Inbound
//! classification is purely content-driven and checked in this order:
//!
//! 1. `id` + `result == "ok"` → subscription ack
//! 2. `error` → exchange error
//! 3. `channel_name` + `notification` → market data, routed by channel prefix
//!    (`book.`, `recent_trades.`, `trades.`)
//! 4. `method == "subscription"` → legacy `trades.*` push
//! 5. anything else → ignored
//!
//! Every channel revision is accepted regardless of which one the adapter
//! subscribes to.

use feed_core::FeedError;
use serde_json::{Value, json};

use super::normalizer::{format_book_trade, format_recent_trade, format_trade};
use crate::json_util::{parse_str_bool, str_field};
use crate::protocol::Frame;

/// `{"method":"public/subscribe","params":{"channels":[channel]},"id":id}`
pub fn build_subscribe(channel: &str, request_id: u64) -> String {
    control_frame("public/subscribe", channel, request_id)
}

/// `{"method":"public/unsubscribe","params":{"channels":[channel]},"id":id}`
pub fn build_unsubscribe(channel: &str, request_id: u64) -> String {
    control_frame("public/unsubscribe", channel, request_id)
}

/// `{"method":"public/heartbeat"}`
pub fn build_heartbeat() -> String {
    json!({"method": "public/heartbeat"}).to_string()
}

fn control_frame(method: &str, channel: &str, request_id: u64) -> String {
    json!({
        "method": method,
        "params": {"channels": [channel]},
        "id": request_id
    })
    .to_string()
}

/// Classify one parsed inbound frame, normalizing any trades it carries.
pub fn classify(exchange: &str, v: &Value) -> Result<Frame, FeedError> {
    if v.get("id").is_some() && str_field(v, "result") == Some("ok") {
        return Ok(Frame::Ack { id: v.get("id").and_then(Value::as_u64) });
    }

    if let Some(err) = v.get("error").filter(|e| !e.is_null()) {
        return Ok(Frame::Error {
            code: err.get("code").and_then(Value::as_i64),
            message: str_field(err, "message").map_or_else(|| err.to_string(), str::to_string),
        });
    }

    if let (Some(channel), Some(notification)) = (str_field(v, "channel_name"), v.get("notification")) {
        return classify_notification(exchange, v, channel, notification);
    }

    if str_field(v, "method") == Some("subscription") {
        return classify_push(exchange, v);
    }

    Ok(Frame::Ignored)
}

fn classify_notification(
    exchange: &str,
    v: &Value,
    channel: &str,
    notification: &Value,
) -> Result<Frame, FeedError> {
    if channel.starts_with("book.") {
        if parse_str_bool(v.get("snapshot")) == Some(true) {
            return Ok(Frame::Snapshot { channel: channel.to_string() });
        }
        let pair = segment(channel, 1)?;
        if !notification.is_object() {
            return Err(FeedError::Parse(format!("{channel}: notification is not an object")));
        }
        // Book updates without trades are normal.
        let trades = match notification.get("trades") {
            None | Some(Value::Null) => Vec::new(),
            Some(list) => map_trades(list, channel, |t| format_book_trade(exchange, pair, t))?,
        };
        return Ok(Frame::Trades { channel: channel.to_string(), trades });
    }

    if channel.starts_with("recent_trades.") {
        let pair = inner_segments(channel)?;
        let trades = map_trades(notification, channel, |t| format_recent_trade(exchange, &pair, t))?;
        return Ok(Frame::Trades { channel: channel.to_string(), trades });
    }

    if channel.starts_with("trades.") {
        let pair = segment(channel, 1)?;
        let trades = map_trades(notification, channel, |t| format_trade(exchange, pair, t))?;
        return Ok(Frame::Trades { channel: channel.to_string(), trades });
    }

    Ok(Frame::Ignored)
}

/// Legacy `{"method":"subscription","params":{"channel":..,"data":[..]}}` push.
fn classify_push(exchange: &str, v: &Value) -> Result<Frame, FeedError> {
    let params = v
        .get("params")
        .filter(|p| p.is_object())
        .ok_or_else(|| FeedError::Parse("subscription push without params".into()))?;
    let channel = str_field(params, "channel")
        .ok_or_else(|| FeedError::Parse("subscription push without channel".into()))?;

    match params.get("data") {
        Some(data) if data.is_array() && channel.starts_with("trades.") => {
            let pair = segment(channel, 1)?;
            let trades = map_trades(data, channel, |t| format_trade(exchange, pair, t))?;
            Ok(Frame::Trades { channel: channel.to_string(), trades })
        }
        _ => Ok(Frame::Ignored),
    }
}

/// Run `format` over a trade array, dropping rejected entries.
fn map_trades<F>(list: &Value, channel: &str, format: F) -> Result<Vec<feed_core::Trade>, FeedError>
where
    F: Fn(&Value) -> Option<feed_core::Trade>,
{
    let arr = list
        .as_array()
        .ok_or_else(|| FeedError::Parse(format!("{channel}: trade list is not an array")))?;
    Ok(arr.iter().filter_map(format).collect())
}

/// Dot-delimited segment `idx` of a channel name.
fn segment(channel: &str, idx: usize) -> Result<&str, FeedError> {
    channel
        .split('.')
        .nth(idx)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| FeedError::Parse(format!("no pair in channel {channel}")))
}

/// Everything between the first and the last segment, e.g.
/// `recent_trades.BTC-PERPETUAL.single` → `BTC-PERPETUAL`.
fn inner_segments(channel: &str) -> Result<String, FeedError> {
    let parts: Vec<&str> = channel.split('.').collect();
    if parts.len() < 3 {
        return Err(FeedError::Parse(format!("no pair in channel {channel}")));
    }
    let pair = parts[1..parts.len() - 1].join(".");
    if pair.is_empty() {
        return Err(FeedError::Parse(format!("no pair in channel {channel}")));
    }
    Ok(pair)
}

#[cfg(test)]
mod tests {
    use super::*;
    use feed_core::{Side, TradeSource};

    const EX: &str = "THALEX";

    fn trades_of(frame: Frame) -> Vec<feed_core::Trade> {
        match frame {
            Frame::Trades { trades, .. } => trades,
            other => panic!("expected Trades, got {other:?}"),
        }
    }

    #[test]
    fn control_frames() {
        let sub: Value = serde_json::from_str(&build_subscribe("trades.BTC-PERPETUAL", 42)).unwrap();
        assert_eq!(sub, json!({"method": "public/subscribe", "params": {"channels": ["trades.BTC-PERPETUAL"]}, "id": 42}));
        let unsub: Value = serde_json::from_str(&build_unsubscribe("trades.BTC-PERPETUAL", 43)).unwrap();
        assert_eq!(unsub["method"], "public/unsubscribe");
        assert_eq!(unsub["params"]["channels"][0], "trades.BTC-PERPETUAL");
        assert_eq!(build_heartbeat(), r#"{"method":"public/heartbeat"}"#);
    }

    #[test]
    fn ack() {
        let frame = classify(EX, &json!({"id": 7, "result": "ok"})).unwrap();
        assert_eq!(frame, Frame::Ack { id: Some(7) });
    }

    #[test]
    fn error_frame() {
        let frame = classify(EX, &json!({"error": {"code": 1, "message": "bad request"}})).unwrap();
        assert_eq!(frame, Frame::Error { code: Some(1), message: "bad request".into() });
        let frame = classify(EX, &json!({"id": 3, "error": "nope"})).unwrap();
        assert_eq!(frame, Frame::Error { code: None, message: "\"nope\"".into() });
    }

    #[test]
    fn null_error_field_is_not_an_error() {
        let v = json!({
            "channel_name": "recent_trades.BTC-PERPETUAL.single",
            "notification": [["50000.5", "0.01", "buy", "1690000000", "BTC-PERPETUAL", true]],
            "error": null
        });
        assert_eq!(trades_of(classify(EX, &v).unwrap()).len(), 1);
        assert_eq!(classify(EX, &json!({"id": 4, "result": "pong", "error": null})).unwrap(), Frame::Ignored);
    }

    #[test]
    fn ack_takes_priority_over_data() {
        let v = json!({"id": 1, "result": "ok", "channel_name": "recent_trades.X.single", "notification": [[1, 1, "buy", 1, "X", true]]});
        assert!(matches!(classify(EX, &v).unwrap(), Frame::Ack { .. }));
    }

    #[test]
    fn book_notification() {
        let v = json!({
            "channel_name": "book.BTC-PERPETUAL.none.all.raw",
            "notification": {"trades": [["50001", "0.02", "sell", "1690000001", "false"]]}
        });
        let trades = trades_of(classify(EX, &v).unwrap());
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].source, Some(TradeSource::Book));
        assert_eq!(trades[0].instrument_name.as_deref(), Some("BTC-PERPETUAL"));
        assert_eq!(trades[0].pair, "BTC-PERPETUAL");
    }

    #[test]
    fn book_snapshot_discarded() {
        let v = json!({
            "channel_name": "book.BTC-PERPETUAL.none.all.raw",
            "snapshot": true,
            "notification": {"trades": [["50001", "0.02", "sell", "1690000001", "false"]]}
        });
        assert_eq!(
            classify(EX, &v).unwrap(),
            Frame::Snapshot { channel: "book.BTC-PERPETUAL.none.all.raw".into() }
        );
    }

    #[test]
    fn book_snapshot_flag_as_string() {
        let mut v = json!({
            "channel_name": "book.BTC-PERPETUAL.none.all.raw",
            "snapshot": "true",
            "notification": {"trades": [["1", "1", "buy", "1", true]]}
        });
        assert!(matches!(classify(EX, &v).unwrap(), Frame::Snapshot { .. }));
        v["snapshot"] = json!("false");
        assert_eq!(trades_of(classify(EX, &v).unwrap()).len(), 1);
    }

    #[test]
    fn book_snapshot_false_is_live() {
        let v = json!({
            "channel_name": "book.BTC-PERPETUAL.none.all.raw",
            "snapshot": false,
            "notification": {"trades": [["1", "1", "buy", "1", true]]}
        });
        assert_eq!(trades_of(classify(EX, &v).unwrap()).len(), 1);
    }

    #[test]
    fn book_update_without_trades() {
        let v = json!({"channel_name": "book.BTC-PERPETUAL.none.all.raw", "notification": {"bids": [], "asks": []}});
        assert!(trades_of(classify(EX, &v).unwrap()).is_empty());
    }

    #[test]
    fn book_trades_not_array_is_parse_error() {
        let v = json!({"channel_name": "book.BTC-PERPETUAL.none.all.raw", "notification": {"trades": "x"}});
        assert!(matches!(classify(EX, &v), Err(FeedError::Parse(_))));
    }

    #[test]
    fn recent_trades_notification_drops_bad_entries() {
        let v = json!({
            "channel_name": "recent_trades.BTC-PERPETUAL.single",
            "notification": [
                ["50000.5", "0.01", "buy", "1690000000", "BTC-PERPETUAL", true],
                ["50000.5", "0.01"],
                ["50000.0", "0.03", "sell", "1690000002", "BTC-PERPETUAL", false]
            ]
        });
        let trades = trades_of(classify(EX, &v).unwrap());
        assert_eq!(trades.len(), 2);
        assert_eq!(trades[0].side, Side::Buy);
        assert_eq!(trades[1].side, Side::Sell);
        assert_eq!(trades[1].timestamp, 1_690_000_002_000);
    }

    #[test]
    fn recent_trades_pair_keeps_inner_dots() {
        let v = json!({
            "channel_name": "recent_trades.BTC.USD.PERP.single",
            "notification": [[1, 1, "buy", 1, null, true]]
        });
        let trades = trades_of(classify(EX, &v).unwrap());
        assert_eq!(trades[0].pair, "BTC.USD.PERP");
    }

    #[test]
    fn recent_trades_without_pair_is_parse_error() {
        let v = json!({"channel_name": "recent_trades.single", "notification": []});
        assert!(classify(EX, &v).is_err());
    }

    #[test]
    fn trades_notification_objects() {
        let v = json!({
            "channel_name": "trades.BTC-PERPETUAL",
            "notification": [{"timestamp": 1690000000.5, "price": 30000, "amount": 0.1, "direction": "buy"}]
        });
        let trades = trades_of(classify(EX, &v).unwrap());
        assert_eq!(trades[0].timestamp, 1_690_000_000_500);
        assert_eq!(trades[0].source, Some(TradeSource::Trades));
    }

    #[test]
    fn legacy_push() {
        let v = json!({
            "method": "subscription",
            "params": {
                "channel": "trades.ETH-PERPETUAL",
                "data": [
                    {"timestamp": 1690000000, "price": "1850.5", "amount": "2", "direction": "sell"},
                    {"timestamp": 1690000001, "price": "1851", "amount": "1", "direction": "buy"}
                ]
            }
        });
        let trades = trades_of(classify(EX, &v).unwrap());
        assert_eq!(trades.len(), 2);
        assert_eq!(trades[0].pair, "ETH-PERPETUAL");
        assert_eq!(trades[0].side, Side::Sell);
        assert_eq!(trades[1].price, 1851.0);
    }

    #[test]
    fn legacy_push_other_channel_ignored() {
        let v = json!({"method": "subscription", "params": {"channel": "ticker.X", "data": {}}});
        assert_eq!(classify(EX, &v).unwrap(), Frame::Ignored);
    }

    #[test]
    fn legacy_push_without_params_is_parse_error() {
        assert!(classify(EX, &json!({"method": "subscription"})).is_err());
    }

    #[test]
    fn unknown_frames_ignored() {
        assert_eq!(classify(EX, &json!({"result": "pong"})).unwrap(), Frame::Ignored);
        assert_eq!(
            classify(EX, &json!({"channel_name": "ticker.BTC-PERPETUAL.1000ms", "notification": {}})).unwrap(),
            Frame::Ignored
        );
        assert_eq!(classify(EX, &json!({"id": 9, "result": ["trades.X"]})).unwrap(), Frame::Ignored);
    }
}
