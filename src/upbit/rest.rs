//! REST client for the Upbit exchange API
//!
//! Implements both collaborator seams: [`MarketData`] for candles, quotes,
//! and market listings, and [`Execution`] for balances and market orders.

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use reqwest::Client;
use rust_decimal::Decimal;
use std::time::Duration;
use tracing::{debug, instrument};

use super::auth::bearer_token;
use super::messages::*;
use crate::common::errors::{BotError, Result};
use crate::common::traits::{Execution, MarketData};
use crate::common::types::{Fill, Holding, Interval, PriceBar, PriceSeries, Side};
use crate::config::types::ApiCredentials;

/// REST client for the Upbit API
#[derive(Debug, Clone)]
pub struct UpbitRestClient {
    /// HTTP client
    client: Client,
    /// Base URL for the API
    base_url: String,
    /// Optional API credentials for authenticated endpoints
    credentials: Option<ApiCredentials>,
}

impl UpbitRestClient {
    /// Create a new REST client (unauthenticated)
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_timeout(base_url, Duration::from_secs(30))
    }

    /// Create a new REST client with custom timeout
    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BotError::Internal(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials: None,
        })
    }

    /// Set API credentials for authenticated requests
    pub fn with_credentials(mut self, credentials: ApiCredentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    fn credentials(&self) -> Result<&ApiCredentials> {
        self.credentials
            .as_ref()
            .ok_or_else(|| BotError::Authentication("API credentials not configured".to_string()))
    }

    /// Map a non-success response into an `Exchange` error
    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorResponse>(&body)
            .map(|e| e.error.message)
            .unwrap_or(body);
        Err(BotError::Exchange { status, message })
    }

    // ========================================================================
    // Public Endpoints (No Authentication Required)
    // ========================================================================

    /// List all markets known to the exchange
    #[instrument(skip(self))]
    pub async fn get_markets(&self) -> Result<Vec<MarketInfo>> {
        let url = format!("{}/v1/market/all?isDetails=false", self.base_url);
        let response = Self::check(self.client.get(&url).send().await?).await?;
        Ok(response.json().await?)
    }

    /// Fetch up to `count` candles, newest first (the exchange's order)
    #[instrument(skip(self))]
    pub async fn get_candles(
        &self,
        market: &str,
        interval: Interval,
        count: u32,
    ) -> Result<Vec<CandleResponse>> {
        let path = match interval {
            Interval::Day => "candles/days",
            Interval::Hour => "candles/minutes/60",
            Interval::Minute5 => "candles/minutes/5",
        };
        let url = format!(
            "{}/v1/{}?market={}&count={}",
            self.base_url, path, market, count
        );
        debug!("Fetching candles from: {}", url);

        let response = Self::check(self.client.get(&url).send().await?).await?;
        Ok(response.json().await?)
    }

    /// Current trade price for a market
    #[instrument(skip(self))]
    pub async fn get_ticker(&self, market: &str) -> Result<Option<Decimal>> {
        let url = format!("{}/v1/ticker?markets={}", self.base_url, market);
        let response = Self::check(self.client.get(&url).send().await?).await?;
        let tickers: Vec<TickerResponse> = response.json().await?;
        Ok(tickers.first().map(|t| t.trade_price))
    }

    // ========================================================================
    // Private Endpoints (JWT Authentication Required)
    // ========================================================================

    /// All account balances
    #[instrument(skip(self))]
    pub async fn get_accounts(&self) -> Result<Vec<AccountResponse>> {
        let token = bearer_token(self.credentials()?, None)?;
        let url = format!("{}/v1/accounts", self.base_url);
        let response = Self::check(
            self.client
                .get(&url)
                .header("Authorization", token)
                .send()
                .await?,
        )
        .await?;
        Ok(response.json().await?)
    }

    /// Place an order
    #[instrument(skip(self, request), fields(market = %request.market, side = %request.side))]
    pub async fn place_order(&self, request: &OrderRequest) -> Result<OrderResponse> {
        let token = bearer_token(self.credentials()?, Some(&request.query_string()))?;
        let url = format!("{}/v1/orders", self.base_url);
        let response = Self::check(
            self.client
                .post(&url)
                .header("Authorization", token)
                .json(request)
                .send()
                .await?,
        )
        .await?;
        Ok(response.json().await?)
    }

    /// Convert exchange candles (newest first) into a chronological series
    fn to_series(
        &self,
        market: &str,
        interval: Interval,
        candles: Vec<CandleResponse>,
    ) -> Result<PriceSeries> {
        let mut bars = Vec::with_capacity(candles.len());
        for candle in candles.iter().rev() {
            let open_time = candle.open_time().ok_or_else(|| {
                BotError::InvalidResponse(format!(
                    "unparseable candle time: {}",
                    candle.candle_date_time_utc
                ))
            })?;
            bars.push(PriceBar {
                timestamp: Utc.from_utc_datetime(&open_time),
                open: candle.opening_price,
                high: candle.high_price,
                low: candle.low_price,
                close: candle.trade_price,
                volume: candle.candle_acc_trade_volume,
            });
        }
        Ok(PriceSeries::new(market, interval, bars))
    }
}

#[async_trait]
impl MarketData for UpbitRestClient {
    async fn list_markets(&self, quote_currency: &str) -> Result<Vec<String>> {
        let prefix = format!("{quote_currency}-");
        Ok(self
            .get_markets()
            .await?
            .into_iter()
            .map(|m| m.market)
            .filter(|m| m.starts_with(&prefix))
            .collect())
    }

    async fn get_series(
        &self,
        market: &str,
        interval: Interval,
        count: u32,
    ) -> Result<Option<PriceSeries>> {
        match self.get_candles(market, interval, count).await {
            Ok(candles) if candles.is_empty() => Ok(None),
            Ok(candles) => Ok(Some(self.to_series(market, interval, candles)?)),
            Err(BotError::Exchange { status: 404, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn get_quote(&self, market: &str) -> Result<Option<Decimal>> {
        match self.get_ticker(market).await {
            Ok(price) => Ok(price),
            Err(BotError::Exchange { status: 404, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl Execution for UpbitRestClient {
    /// Place a market buy and report the fill at the current trade price.
    ///
    /// Market orders do not echo an average fill price synchronously, so
    /// the current ticker stands in for it, matching the notional the
    /// order spent.
    async fn market_buy(&self, market: &str, notional: Decimal) -> Result<Fill> {
        let request = OrderRequest::market_buy(market, notional);
        self.place_order(&request).await?;

        let price = self
            .get_ticker(market)
            .await?
            .ok_or_else(|| BotError::Order(format!("no quote for {market} after buy")))?;
        if price.is_zero() {
            return Err(BotError::Order(format!("zero quote for {market} after buy")));
        }
        Ok(Fill {
            market: market.to_string(),
            side: Side::Buy,
            price,
            quantity: notional / price,
        })
    }

    async fn market_sell(&self, market: &str, quantity: Decimal) -> Result<Fill> {
        let request = OrderRequest::market_sell(market, quantity);
        self.place_order(&request).await?;

        let price = self
            .get_ticker(market)
            .await?
            .ok_or_else(|| BotError::Order(format!("no quote for {market} after sell")))?;
        Ok(Fill {
            market: market.to_string(),
            side: Side::Sell,
            price,
            quantity,
        })
    }

    async fn held_quantity(&self, market: &str) -> Result<Decimal> {
        let currency = market
            .split_once('-')
            .map(|(_, base)| base)
            .unwrap_or(market);
        let accounts = self.get_accounts().await?;
        Ok(accounts
            .iter()
            .find(|a| a.currency == currency)
            .and_then(|a| a.balance_decimal())
            .unwrap_or(Decimal::ZERO))
    }

    async fn available_cash(&self) -> Result<Decimal> {
        let accounts = self.get_accounts().await?;
        // The cash account is the one denominated in itself
        Ok(accounts
            .iter()
            .find(|a| a.currency == a.unit_currency)
            .and_then(|a| a.balance_decimal())
            .unwrap_or(Decimal::ZERO))
    }

    async fn list_holdings(&self) -> Result<Vec<Holding>> {
        let accounts = self.get_accounts().await?;
        let mut holdings = Vec::new();
        for account in accounts {
            if account.currency == account.unit_currency {
                continue;
            }
            let Some(quantity) = account.balance_decimal() else {
                continue;
            };
            if quantity <= Decimal::ZERO {
                continue;
            }
            holdings.push(Holding {
                market: format!("{}-{}", account.unit_currency, account.currency),
                quantity,
                avg_buy_price: account.avg_buy_price_decimal().unwrap_or(Decimal::ZERO),
            });
        }
        Ok(holdings)
    }
}
