//! Product catalog resolution.
//!
//! Turns the exchange's raw instrument listing into the list of symbols the
//! UI can select. The result is never empty: when the listing is missing,
//! malformed, or filters down to nothing, the configured fallback list is
//! returned instead. Transport failures are reported by [`fetch_listing`];
//! the adapter driver maps them onto the same fallback.
//!
//! Expected listing shape:
//!
//! ```json
//! {"result": [{"instrument_name": "BTC-PERPETUAL", "is_active": true, "kind": "future", "type": "perpetual"}]}
//! ```

use feed_core::FeedError;
use feed_core::config::{ConnectionConfig, DEFAULT_FALLBACK_PRODUCT};
use serde_json::Value;
use tracing::debug;

use crate::json_util::str_field;

/// Filters an instrument listing down to tradable symbols.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogResolver {
    fallback: Vec<String>,
    allow_list: Vec<String>,
}

impl CatalogResolver {
    /// Create a resolver. An empty `fallback` is replaced by the default
    /// single-product list; an empty `allow_list` disables name filtering.
    pub fn new(fallback: Vec<String>, allow_list: Vec<String>) -> Self {
        let fallback = if fallback.is_empty() { vec![DEFAULT_FALLBACK_PRODUCT.to_string()] } else { fallback };
        Self { fallback, allow_list }
    }

    pub fn from_connection(conn: &ConnectionConfig) -> Self {
        Self::new(conn.fallback_products(), conn.product_allow_list())
    }

    pub fn fallback(&self) -> &[String] {
        &self.fallback
    }

    /// Resolve a listing response into an ordered, non-empty symbol list.
    pub fn resolve(&self, response: Option<&Value>) -> Vec<String> {
        let Some(instruments) = response.and_then(|r| r.get("result")).and_then(Value::as_array) else {
            debug!("catalog response missing result, using fallback");
            return self.fallback.clone();
        };

        let products: Vec<String> = instruments
            .iter()
            .filter(|inst| is_tradable(inst))
            .filter_map(|inst| str_field(inst, "instrument_name"))
            .filter(|name| self.allowed(name))
            .map(str::to_string)
            .collect();

        if products.is_empty() {
            debug!("catalog filtered to nothing ({} instruments), using fallback", instruments.len());
            return self.fallback.clone();
        }
        products
    }

    fn allowed(&self, name: &str) -> bool {
        self.allow_list.is_empty() || self.allow_list.iter().any(|id| name.contains(id.as_str()))
    }
}

/// Active futures or perpetuals.
fn is_tradable(inst: &Value) -> bool {
    let active = inst.get("is_active").and_then(Value::as_bool) == Some(true);
    let kind_future = str_field(inst, "kind") == Some("future");
    let perpetual = str_field(inst, "type") == Some("perpetual");
    active && (kind_future || perpetual)
}

/// GET the instrument listing as JSON.
pub async fn fetch_listing(http: &reqwest::Client, url: &str) -> Result<Value, FeedError> {
    let resp = http
        .get(url)
        .send()
        .await
        .map_err(|e| FeedError::Catalog(format!("request failed: {e}")))?
        .error_for_status()
        .map_err(|e| FeedError::Catalog(format!("HTTP error: {e}")))?;

    resp.json::<Value>()
        .await
        .map_err(|e| FeedError::Catalog(format!("invalid body: {e}")))
}
