//! Unified market data types used across the engine and exchange clients

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Candle sampling interval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interval {
    /// Daily candles
    Day,
    /// 60-minute candles
    Hour,
    /// 5-minute candles
    Minute5,
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Interval::Day => write!(f, "day"),
            Interval::Hour => write!(f, "hour"),
            Interval::Minute5 => write!(f, "minute5"),
        }
    }
}

/// Order side (buy or sell)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// A single OHLCV candle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    /// Candle open time
    pub timestamp: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    /// Traded base-asset volume over the candle
    pub volume: Decimal,
}

/// An ordered (oldest first) sequence of candles for one market and interval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    /// Market identifier, e.g. "KRW-ETH"
    pub market: String,
    pub interval: Interval,
    /// Bars in chronological order
    pub bars: Vec<PriceBar>,
}

impl PriceSeries {
    pub fn new(market: impl Into<String>, interval: Interval, bars: Vec<PriceBar>) -> Self {
        Self {
            market: market.into(),
            interval,
            bars,
        }
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Close prices in chronological order
    pub fn closes(&self) -> Vec<Decimal> {
        self.bars.iter().map(|b| b.close).collect()
    }

    /// The most recent (last closed) bar
    pub fn last_bar(&self) -> Option<&PriceBar> {
        self.bars.last()
    }

    /// Close of the most recent bar
    pub fn last_close(&self) -> Option<Decimal> {
        self.last_bar().map(|b| b.close)
    }
}

/// A candidate asset produced by the universe selector
///
/// Ranked by turnover (volume x close of the last daily bar).
/// Produced fresh each cycle, never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub market: String,
    pub turnover: Decimal,
}

impl Candidate {
    pub fn new(market: impl Into<String>, turnover: Decimal) -> Self {
        Self {
            market: market.into(),
            turnover,
        }
    }
}

/// A reported order fill from the execution client
#[derive(Debug, Clone, PartialEq)]
pub struct Fill {
    pub market: String,
    pub side: Side,
    /// Average execution price
    pub price: Decimal,
    /// Executed base-asset quantity
    pub quantity: Decimal,
}

/// A pre-existing holding recovered from the exchange at startup
#[derive(Debug, Clone, PartialEq)]
pub struct Holding {
    pub market: String,
    pub quantity: Decimal,
    pub avg_buy_price: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn bar(close: Decimal) -> PriceBar {
        PriceBar {
            timestamp: Utc::now(),
            open: close,
            high: close,
            low: close,
            close,
            volume: dec!(1),
        }
    }

    #[test]
    fn test_series_closes_in_order() {
        let series = PriceSeries::new(
            "KRW-ETH",
            Interval::Minute5,
            vec![bar(dec!(100)), bar(dec!(101)), bar(dec!(102))],
        );

        assert_eq!(series.closes(), vec![dec!(100), dec!(101), dec!(102)]);
        assert_eq!(series.last_close(), Some(dec!(102)));
        assert_eq!(series.len(), 3);
    }

    #[test]
    fn test_empty_series() {
        let series = PriceSeries::new("KRW-ETH", Interval::Day, vec![]);

        assert!(series.is_empty());
        assert!(series.last_bar().is_none());
        assert!(series.last_close().is_none());
    }
}
