//! upbit-autotrader
//!
//! An unattended momentum trading bot for Upbit KRW markets: top-turnover
//! universe selection, multi-timeframe trend filtering, indicator-driven
//! entries, a one-shot scale-in / partial-take position lifecycle, and a
//! daily risk governor, reported over Telegram.

pub mod common;
pub mod config;
pub mod engine;
pub mod telegram;
pub mod upbit;

// Re-export commonly used types
pub use common::errors::{BotError, Result};
pub use common::traits::{Clock, Execution, MarketData, Notifier, SystemClock};
pub use common::types::{Candidate, Fill, Holding, Interval, PriceBar, PriceSeries, Side};
pub use config::types::AppConfig;
pub use engine::{
    OrderIntent, Position, PositionBook, RiskGovernor, Signal, SignalEvaluator, SignalKind,
    Snapshot, TickScheduler, TrendClassifier, UniverseSelector,
};
pub use telegram::{NullNotifier, TelegramNotifier};
pub use upbit::rest::UpbitRestClient;
