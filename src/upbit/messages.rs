//! Upbit-specific API message types
//!
//! Upbit mixes numeric and string-encoded numbers across endpoints; these
//! DTOs keep the quirks at the edge so the rest of the crate only sees
//! [`Decimal`]s.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One market from `GET /v1/market/all`
#[derive(Debug, Clone, Deserialize)]
pub struct MarketInfo {
    /// Market code, e.g. "KRW-BTC"
    pub market: String,
    pub korean_name: String,
    pub english_name: String,
}

/// One candle from the `/v1/candles/*` endpoints (newest first)
#[derive(Debug, Clone, Deserialize)]
pub struct CandleResponse {
    pub market: String,
    /// Candle open time in UTC, e.g. "2024-03-01T12:35:00"
    pub candle_date_time_utc: String,
    pub opening_price: Decimal,
    pub high_price: Decimal,
    pub low_price: Decimal,
    pub trade_price: Decimal,
    /// Accumulated base-asset volume over the candle
    pub candle_acc_trade_volume: Decimal,
}

impl CandleResponse {
    /// Parse the candle open time
    pub fn open_time(&self) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(&self.candle_date_time_utc, "%Y-%m-%dT%H:%M:%S").ok()
    }
}

/// One entry from `GET /v1/ticker`
#[derive(Debug, Clone, Deserialize)]
pub struct TickerResponse {
    pub market: String,
    pub trade_price: Decimal,
}

/// One balance from `GET /v1/accounts` (all numbers string-encoded)
#[derive(Debug, Clone, Deserialize)]
pub struct AccountResponse {
    /// Asset symbol without the quote prefix, e.g. "ETH" or "KRW"
    pub currency: String,
    pub balance: String,
    pub locked: String,
    pub avg_buy_price: String,
    /// Quote currency the average buy price is denominated in
    pub unit_currency: String,
}

impl AccountResponse {
    pub fn balance_decimal(&self) -> Option<Decimal> {
        self.balance.parse().ok()
    }

    pub fn avg_buy_price_decimal(&self) -> Option<Decimal> {
        self.avg_buy_price.parse().ok()
    }
}

/// Request body for `POST /v1/orders`
#[derive(Debug, Clone, Serialize)]
pub struct OrderRequest {
    pub market: String,
    /// "bid" to buy, "ask" to sell
    pub side: String,
    /// Base-asset volume; required for market sells
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<String>,
    /// Quote notional; required for market buys
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    /// "price" = market buy by notional, "market" = market sell by volume
    pub ord_type: String,
}

impl OrderRequest {
    /// Market buy spending `notional` of the quote currency
    pub fn market_buy(market: &str, notional: Decimal) -> Self {
        Self {
            market: market.to_string(),
            side: "bid".to_string(),
            volume: None,
            price: Some(notional.to_string()),
            ord_type: "price".to_string(),
        }
    }

    /// Market sell of `volume` of the base asset
    pub fn market_sell(market: &str, volume: Decimal) -> Self {
        Self {
            market: market.to_string(),
            side: "ask".to_string(),
            volume: Some(volume.to_string()),
            price: None,
            ord_type: "market".to_string(),
        }
    }

    /// The urlencoded form used for the JWT query hash
    pub fn query_string(&self) -> String {
        let mut parts = vec![
            format!("market={}", self.market),
            format!("side={}", self.side),
        ];
        if let Some(volume) = &self.volume {
            parts.push(format!("volume={volume}"));
        }
        if let Some(price) = &self.price {
            parts.push(format!("price={price}"));
        }
        parts.push(format!("ord_type={}", self.ord_type));
        parts.join("&")
    }
}

/// Response from `POST /v1/orders`
#[derive(Debug, Clone, Deserialize)]
pub struct OrderResponse {
    pub uuid: String,
    pub side: String,
    pub ord_type: String,
    pub market: String,
    pub state: String,
}

/// Error envelope returned by Upbit on non-2xx responses
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    pub name: serde_json::Value,
    pub message: String,
}
