//! Trait definitions for the engine's external collaborators
//!
//! The core never talks to an exchange, a notification channel, or the wall
//! clock directly. Everything goes through these seams so the engine can be
//! driven deterministically in tests with injected state.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::time::Duration;

#[cfg(test)]
use mockall::automock;

use super::errors::Result;
use super::types::{Fill, Holding, Interval, PriceSeries};

/// Trait for market data providers
///
/// `Ok(None)` means the data is currently unavailable (the affected asset is
/// skipped for the cycle); `Err` is a collaborator failure that aborts the
/// whole cycle at the scheduler boundary.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait MarketData: Send + Sync {
    /// List tradeable market identifiers for a quote currency (e.g. "KRW")
    async fn list_markets(&self, quote_currency: &str) -> Result<Vec<String>>;

    /// Fetch up to `count` most recent candles, oldest first
    async fn get_series(
        &self,
        market: &str,
        interval: Interval,
        count: u32,
    ) -> Result<Option<PriceSeries>>;

    /// Current trade price for a market
    async fn get_quote(&self, market: &str) -> Result<Option<Decimal>>;
}

/// Trait for order execution clients
///
/// Fills are assumed to be reported synchronously; partial-fill
/// reconciliation is not modeled.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Execution: Send + Sync {
    /// Place a market buy spending `notional` of the quote currency
    async fn market_buy(&self, market: &str, notional: Decimal) -> Result<Fill>;

    /// Place a market sell of `quantity` of the base asset
    async fn market_sell(&self, market: &str, quantity: Decimal) -> Result<Fill>;

    /// Currently held base-asset quantity for a market
    async fn held_quantity(&self, market: &str) -> Result<Decimal>;

    /// Available quote-currency cash balance
    async fn available_cash(&self) -> Result<Decimal>;

    /// All non-quote holdings, used to recover positions at startup
    async fn list_holdings(&self) -> Result<Vec<Holding>>;
}

/// Trait for outbound notifications
///
/// Strictly best-effort: implementations log and swallow delivery failures,
/// they never propagate them into the trading loop.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver a human-readable report message
    async fn report(&self, message: &str);
}

#[async_trait]
impl Notifier for Box<dyn Notifier> {
    async fn report(&self, message: &str) {
        (**self).report(message).await;
    }
}

/// Trait abstracting the wall clock
///
/// The tick scheduler only reads time and sleeps through this trait, so
/// tests can simulate many cycles without wall-clock delay.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    async fn sleep(&self, duration: Duration);
}

/// System clock backed by `tokio::time`
#[derive(Debug, Clone, Default)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
