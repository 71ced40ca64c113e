//! Common test utilities and fixtures
//!
//! Scripted fakes for the collaborator traits plus canned price series.
//! The fakes hand out shared state handles so a test can reshape the
//! market between cycles while the scheduler owns the collaborator.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use upbit_autotrader::common::errors::{BotError, Result};
use upbit_autotrader::common::traits::{Clock, Execution, MarketData, Notifier};
use upbit_autotrader::common::types::{Fill, Holding, Interval, PriceBar, PriceSeries, Side};

// ============================================================================
// Series fixtures
// ============================================================================

pub fn bar(close: Decimal, volume: Decimal) -> PriceBar {
    PriceBar {
        timestamp: Utc::now(),
        open: close,
        high: close * dec!(1.01),
        low: close * dec!(0.99),
        close,
        volume,
    }
}

pub fn series_from_closes(market: &str, interval: Interval, closes: &[Decimal]) -> PriceSeries {
    let bars = closes.iter().map(|c| bar(*c, dec!(100))).collect();
    PriceSeries::new(market, interval, bars)
}

/// A 50-bar 5-minute series satisfying every entry condition: the fast SMA
/// sits above the slow one after a capitulation candle keeps the RSI low.
/// Last close: 678.
pub fn enterable_five_min(market: &str) -> PriceSeries {
    let mut closes: Vec<Decimal> = (0..35).map(|i| dec!(1400) - Decimal::from(i * 10)).collect();
    closes.push(dec!(1000));
    for i in 0..14 {
        closes.push(dec!(600) + Decimal::from(i * 6));
    }
    series_from_closes(market, Interval::Minute5, &closes)
}

/// Daily series passing the trend filter (close above its EMA)
pub fn rising_daily(market: &str) -> PriceSeries {
    let closes: Vec<Decimal> = (0..25).map(|i| dec!(100) + Decimal::from(i)).collect();
    series_from_closes(market, Interval::Day, &closes)
}

/// Hourly series with a fresh fast-over-slow EMA cross on the last bar
pub fn fresh_cross_hourly(market: &str) -> PriceSeries {
    let mut closes = vec![dec!(100); 21];
    closes.push(dec!(130));
    series_from_closes(market, Interval::Hour, &closes)
}

// ============================================================================
// Scripted market data
// ============================================================================

#[derive(Default)]
pub struct MarketState {
    pub markets: Vec<String>,
    pub five_min: HashMap<String, PriceSeries>,
    pub daily: HashMap<String, PriceSeries>,
    pub hourly: HashMap<String, PriceSeries>,
    pub quotes: HashMap<String, Decimal>,
}

#[derive(Clone, Default)]
pub struct FakeMarket {
    pub state: Arc<Mutex<MarketState>>,
}

impl FakeMarket {
    /// A single-market world where every entry condition holds
    pub fn enterable(market: &str) -> Self {
        let fake = Self::default();
        {
            let mut state = fake.state.lock().unwrap();
            state.markets = vec![market.to_string()];
            state.five_min.insert(market.to_string(), enterable_five_min(market));
            state.daily.insert(market.to_string(), rising_daily(market));
            state.hourly.insert(market.to_string(), fresh_cross_hourly(market));
            state.quotes.insert(market.to_string(), dec!(678));
        }
        fake
    }

    pub fn set_quote(&self, market: &str, price: Decimal) {
        self.state
            .lock()
            .unwrap()
            .quotes
            .insert(market.to_string(), price);
    }

    pub fn quote(&self, market: &str) -> Decimal {
        *self.state.lock().unwrap().quotes.get(market).unwrap()
    }

    pub fn remove_five_min(&self, market: &str) {
        self.state.lock().unwrap().five_min.remove(market);
    }
}

#[async_trait]
impl MarketData for FakeMarket {
    async fn list_markets(&self, _quote_currency: &str) -> Result<Vec<String>> {
        Ok(self.state.lock().unwrap().markets.clone())
    }

    async fn get_series(
        &self,
        market: &str,
        interval: Interval,
        _count: u32,
    ) -> Result<Option<PriceSeries>> {
        let state = self.state.lock().unwrap();
        let map = match interval {
            Interval::Minute5 => &state.five_min,
            Interval::Day => &state.daily,
            Interval::Hour => &state.hourly,
        };
        Ok(map.get(market).cloned())
    }

    async fn get_quote(&self, market: &str) -> Result<Option<Decimal>> {
        Ok(self.state.lock().unwrap().quotes.get(market).copied())
    }
}

// ============================================================================
// Scripted execution
// ============================================================================

#[derive(Default)]
pub struct ExecState {
    pub cash: Decimal,
    pub holdings: HashMap<String, Decimal>,
    pub fills: Vec<Fill>,
    /// When set, the next order errors instead of filling
    pub fail_next_order: bool,
    /// Holdings reported to the startup recovery
    pub bootstrap_holdings: Vec<Holding>,
}

/// Paper execution that fills at the fake market's current quote
#[derive(Clone)]
pub struct FakeExecution {
    pub state: Arc<Mutex<ExecState>>,
    market: FakeMarket,
}

impl FakeExecution {
    pub fn new(market: FakeMarket, cash: Decimal) -> Self {
        let state = ExecState {
            cash,
            ..Default::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
            market,
        }
    }

    pub fn buys(&self) -> Vec<Fill> {
        self.state
            .lock()
            .unwrap()
            .fills
            .iter()
            .filter(|f| f.side == Side::Buy)
            .cloned()
            .collect()
    }

    pub fn sells(&self) -> Vec<Fill> {
        self.state
            .lock()
            .unwrap()
            .fills
            .iter()
            .filter(|f| f.side == Side::Sell)
            .cloned()
            .collect()
    }

    pub fn fail_next_order(&self) {
        self.state.lock().unwrap().fail_next_order = true;
    }
}

#[async_trait]
impl Execution for FakeExecution {
    async fn market_buy(&self, market: &str, notional: Decimal) -> Result<Fill> {
        let price = self.market.quote(market);
        let mut state = self.state.lock().unwrap();
        if state.fail_next_order {
            state.fail_next_order = false;
            return Err(BotError::Order("scripted order failure".to_string()));
        }
        let quantity = notional / price;
        state.cash -= notional;
        *state.holdings.entry(market.to_string()).or_default() += quantity;
        let fill = Fill {
            market: market.to_string(),
            side: Side::Buy,
            price,
            quantity,
        };
        state.fills.push(fill.clone());
        Ok(fill)
    }

    async fn market_sell(&self, market: &str, quantity: Decimal) -> Result<Fill> {
        let price = self.market.quote(market);
        let mut state = self.state.lock().unwrap();
        if state.fail_next_order {
            state.fail_next_order = false;
            return Err(BotError::Order("scripted order failure".to_string()));
        }
        state.cash += quantity * price;
        *state.holdings.entry(market.to_string()).or_default() -= quantity;
        let fill = Fill {
            market: market.to_string(),
            side: Side::Sell,
            price,
            quantity,
        };
        state.fills.push(fill.clone());
        Ok(fill)
    }

    async fn held_quantity(&self, market: &str) -> Result<Decimal> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .holdings
            .get(market)
            .copied()
            .unwrap_or(Decimal::ZERO))
    }

    async fn available_cash(&self) -> Result<Decimal> {
        Ok(self.state.lock().unwrap().cash)
    }

    async fn list_holdings(&self) -> Result<Vec<Holding>> {
        Ok(self.state.lock().unwrap().bootstrap_holdings.clone())
    }
}

// ============================================================================
// Recording notifier and manual clock
// ============================================================================

#[derive(Clone, Default)]
pub struct RecordingNotifier {
    pub messages: Arc<Mutex<Vec<String>>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.messages().iter().any(|m| m.contains(needle))
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn report(&self, message: &str) {
        self.messages.lock().unwrap().push(message.to_string());
    }
}

/// Clock whose time only moves when the test says so; sleeps advance the
/// simulated time instantly.
#[derive(Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(now)),
        }
    }

    pub fn midday() -> Self {
        Self::at(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap())
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap() = now;
    }

    pub fn advance(&self, duration: chrono::Duration) {
        let mut now = self.now.lock().unwrap();
        *now += duration;
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }

    async fn sleep(&self, duration: Duration) {
        self.advance(chrono::Duration::from_std(duration).unwrap_or(chrono::Duration::zero()));
    }
}
