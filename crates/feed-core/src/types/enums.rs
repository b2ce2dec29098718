//! Enumerations used throughout the trade feed.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Trade side
// ---------------------------------------------------------------------------

/// Aggressor side of a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Map a wire side/direction marker.
    ///
    /// Only the literal `"buy"` counts as a buy; every other value, including
    /// a missing or non-string marker, is a sell.
    #[inline]
    pub fn from_wire(marker: Option<&str>) -> Self {
        match marker {
            Some("buy") => Self::Buy,
            _ => Self::Sell,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buy => write!(f, "buy"),
            Self::Sell => write!(f, "sell"),
        }
    }
}

// ---------------------------------------------------------------------------
// Channels
// ---------------------------------------------------------------------------

/// Subscription channel family an adapter subscribes to.
///
/// The same exchange exposes trades through three different channels, each
/// with its own envelope and trade shape:
///
/// | Kind           | Channel name                  | Trade shape |
/// |----------------|-------------------------------|-------------|
/// | `Trades`       | `trades.{pair}`               | object      |
/// | `Book`         | `book.{pair}.none.all.raw`    | 5-tuple     |
/// | `RecentTrades` | `recent_trades.{pair}.single` | 6-tuple     |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    Trades,
    Book,
    #[default]
    RecentTrades,
}

impl ChannelKind {
    /// Channel name for `pair` on this channel family.
    pub fn channel_name(self, pair: &str) -> String {
        match self {
            Self::Trades => format!("trades.{pair}"),
            Self::Book => format!("book.{pair}.none.all.raw"),
            Self::RecentTrades => format!("recent_trades.{pair}.single"),
        }
    }
}

impl std::fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Trades => write!(f, "trades"),
            Self::Book => write!(f, "book"),
            Self::RecentTrades => write!(f, "recent_trades"),
        }
    }
}

/// Wire channel a trade was produced from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeSource {
    Trades,
    Book,
    RecentTrades,
}
