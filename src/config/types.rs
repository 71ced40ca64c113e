//! Configuration types
//!
//! Every strategy and risk constant lives here rather than in the engine:
//! different deployments run with different thresholds, so the engine treats
//! all of them as injected configuration.

use chrono::{DateTime, Timelike, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Upbit exchange configuration
    #[serde(default)]
    pub upbit: UpbitConfig,
    /// Telegram notification configuration (optional)
    #[serde(default)]
    pub telegram: Option<TelegramConfig>,
    /// Strategy and sizing parameters
    #[serde(default)]
    pub trading: TradingConfig,
    /// Portfolio risk limits
    #[serde(default)]
    pub risk: RiskConfig,
    /// General application settings
    #[serde(default)]
    pub settings: AppSettings,
}

/// Upbit exchange configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpbitConfig {
    /// Access key for authenticated requests
    #[serde(default)]
    pub access_key: Option<String>,
    /// Secret key for signing requests
    #[serde(default)]
    pub secret_key: Option<String>,
    /// Base URL for the REST API
    #[serde(default = "default_upbit_rest_url")]
    pub rest_url: String,
}

impl Default for UpbitConfig {
    fn default() -> Self {
        Self {
            access_key: None,
            secret_key: None,
            rest_url: default_upbit_rest_url(),
        }
    }
}

fn default_upbit_rest_url() -> String {
    "https://api.upbit.com".to_string()
}

/// Telegram bot configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Bot token from @BotFather
    pub bot_token: String,
    /// Chat ID to deliver reports to
    pub chat_id: String,
    /// Base URL for the Bot API
    #[serde(default = "default_telegram_api_url")]
    pub api_url: String,
}

fn default_telegram_api_url() -> String {
    "https://api.telegram.org".to_string()
}

/// Strategy, sizing, and universe parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradingConfig {
    /// Quote currency whose markets are traded
    #[serde(default = "default_quote_currency")]
    pub quote_currency: String,
    /// Number of top-turnover candidates watched per cycle
    #[serde(default = "default_universe_size")]
    pub universe_size: usize,
    /// Markets never traded nor counted as candidates
    #[serde(default = "default_blacklist")]
    pub blacklist: Vec<String>,

    /// Fraction of available cash committed per entry
    #[serde(default = "default_base_invest_ratio")]
    pub base_invest_ratio: Decimal,
    /// Haircut applied to every computed notional
    #[serde(default = "default_reinvest_ratio")]
    pub reinvest_ratio: Decimal,
    /// Minimum order notional accepted by the exchange (KRW)
    #[serde(default = "default_min_order_notional")]
    pub min_order_notional: Decimal,
    /// Minimum sellable base-asset quantity (dust threshold)
    #[serde(default = "default_min_sell_quantity")]
    pub min_sell_quantity: Decimal,

    /// Fast / slow SMA windows on the 5-minute series
    #[serde(default = "default_sma_fast")]
    pub sma_fast: usize,
    #[serde(default = "default_sma_slow")]
    pub sma_slow: usize,
    /// RSI lookback and entry ceiling
    #[serde(default = "default_rsi_period")]
    pub rsi_period: usize,
    #[serde(default = "default_rsi_entry_max")]
    pub rsi_entry_max: Decimal,
    /// ATR lookback on the 5-minute series
    #[serde(default = "default_atr_period")]
    pub atr_period: usize,
    /// Number of 5-minute bars fetched per evaluation
    #[serde(default = "default_five_min_bars")]
    pub five_min_bars: u32,

    /// Volume filter: current 5m volume must be at least this multiple of
    /// its moving average
    #[serde(default = "default_volume_ma_window")]
    pub volume_ma_window: usize,
    #[serde(default = "default_volume_ratio_min")]
    pub volume_ratio_min: Decimal,
    /// Maximum tolerated deviation of the live quote from the last closed
    /// 5-minute bar (stale-quote guard)
    #[serde(default = "default_slippage_tolerance")]
    pub slippage_tolerance: Decimal,

    /// Unrealized PnL at or below which the one-shot scale-in fires
    #[serde(default = "default_add_trigger_pnl")]
    pub add_trigger_pnl: Decimal,
    /// ATR multiples for the partial take, full take, and hard stop
    #[serde(default = "default_partial_take_atr")]
    pub partial_take_atr: Decimal,
    #[serde(default = "default_full_take_atr")]
    pub full_take_atr: Decimal,
    #[serde(default = "default_stop_atr")]
    pub stop_atr: Decimal,
    /// Trailing drawdown from the high-water price that forces a full exit
    #[serde(default = "default_trailing_stop")]
    pub trailing_stop: Decimal,

    /// Daily trend filter EMA span and minimum bar count
    #[serde(default = "default_daily_trend_ema")]
    pub daily_trend_ema: usize,
    #[serde(default = "default_daily_bars")]
    pub daily_bars: u32,
    /// Hourly momentum cross EMA spans and minimum bar count
    #[serde(default = "default_hourly_fast_ema")]
    pub hourly_fast_ema: usize,
    #[serde(default = "default_hourly_slow_ema")]
    pub hourly_slow_ema: usize,
    #[serde(default = "default_hourly_bars")]
    pub hourly_bars: u32,

    /// End-of-session flattening window
    #[serde(default)]
    pub session_end: SessionWindow,
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            quote_currency: default_quote_currency(),
            universe_size: default_universe_size(),
            blacklist: default_blacklist(),
            base_invest_ratio: default_base_invest_ratio(),
            reinvest_ratio: default_reinvest_ratio(),
            min_order_notional: default_min_order_notional(),
            min_sell_quantity: default_min_sell_quantity(),
            sma_fast: default_sma_fast(),
            sma_slow: default_sma_slow(),
            rsi_period: default_rsi_period(),
            rsi_entry_max: default_rsi_entry_max(),
            atr_period: default_atr_period(),
            five_min_bars: default_five_min_bars(),
            volume_ma_window: default_volume_ma_window(),
            volume_ratio_min: default_volume_ratio_min(),
            slippage_tolerance: default_slippage_tolerance(),
            add_trigger_pnl: default_add_trigger_pnl(),
            partial_take_atr: default_partial_take_atr(),
            full_take_atr: default_full_take_atr(),
            stop_atr: default_stop_atr(),
            trailing_stop: default_trailing_stop(),
            daily_trend_ema: default_daily_trend_ema(),
            daily_bars: default_daily_bars(),
            hourly_fast_ema: default_hourly_fast_ema(),
            hourly_slow_ema: default_hourly_slow_ema(),
            hourly_bars: default_hourly_bars(),
            session_end: SessionWindow::default(),
        }
    }
}

fn default_quote_currency() -> String {
    "KRW".to_string()
}

fn default_universe_size() -> usize {
    5
}

fn default_blacklist() -> Vec<String> {
    vec!["KRW-BTC".to_string(), "KRW-DOGE".to_string(), "KRW-APENFT".to_string()]
}

fn default_base_invest_ratio() -> Decimal {
    dec!(0.3)
}

fn default_reinvest_ratio() -> Decimal {
    dec!(0.98)
}

fn default_min_order_notional() -> Decimal {
    dec!(5000)
}

fn default_min_sell_quantity() -> Decimal {
    dec!(0.00008)
}

fn default_sma_fast() -> usize {
    5
}

fn default_sma_slow() -> usize {
    15
}

fn default_rsi_period() -> usize {
    14
}

fn default_rsi_entry_max() -> Decimal {
    dec!(40)
}

fn default_atr_period() -> usize {
    14
}

fn default_five_min_bars() -> u32 {
    50
}

fn default_volume_ma_window() -> usize {
    20
}

fn default_volume_ratio_min() -> Decimal {
    dec!(0.8)
}

fn default_slippage_tolerance() -> Decimal {
    dec!(0.005)
}

fn default_add_trigger_pnl() -> Decimal {
    dec!(-0.02)
}

fn default_partial_take_atr() -> Decimal {
    dec!(1.0)
}

fn default_full_take_atr() -> Decimal {
    dec!(2.0)
}

fn default_stop_atr() -> Decimal {
    dec!(1.2)
}

fn default_trailing_stop() -> Decimal {
    dec!(-0.015)
}

fn default_daily_trend_ema() -> usize {
    20
}

fn default_daily_bars() -> u32 {
    21
}

fn default_hourly_fast_ema() -> usize {
    8
}

fn default_hourly_slow_ema() -> usize {
    21
}

fn default_hourly_bars() -> u32 {
    22
}

/// A fixed daily time window, UTC, during which all positions are flattened
/// and no new evaluations run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionWindow {
    /// Whether the window is active at all
    #[serde(default)]
    pub enabled: bool,
    /// Window start, hour and minute (UTC)
    #[serde(default = "default_session_hour")]
    pub start_hour: u32,
    #[serde(default = "default_session_minute")]
    pub start_minute: u32,
    /// Window length in minutes; may wrap past midnight
    #[serde(default = "default_session_duration")]
    pub duration_minutes: u32,
}

impl Default for SessionWindow {
    fn default() -> Self {
        Self {
            enabled: false,
            start_hour: default_session_hour(),
            start_minute: default_session_minute(),
            duration_minutes: default_session_duration(),
        }
    }
}

fn default_session_hour() -> u32 {
    23
}

fn default_session_minute() -> u32 {
    50
}

fn default_session_duration() -> u32 {
    10
}

impl SessionWindow {
    /// Whether `now` falls inside the window
    pub fn contains(&self, now: DateTime<Utc>) -> bool {
        if !self.enabled {
            return false;
        }
        let start = self.start_hour * 60 + self.start_minute;
        let end = start + self.duration_minutes;
        let minute_of_day = now.hour() * 60 + now.minute();
        if end <= 24 * 60 {
            minute_of_day >= start && minute_of_day < end
        } else {
            // Wraps past midnight
            minute_of_day >= start || minute_of_day < end - 24 * 60
        }
    }
}

/// Portfolio risk limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskConfig {
    /// Cumulative realized-loss fraction that halts new entries for the
    /// rest of the risk period
    #[serde(default = "default_max_daily_loss")]
    pub max_daily_loss: Decimal,
    /// Marked-to-market equity drawdown since period start that halts new
    /// entries
    #[serde(default = "default_max_drawdown")]
    pub max_drawdown: Decimal,
    /// Maximum number of simultaneously held positions
    #[serde(default = "default_max_concurrent_positions")]
    pub max_concurrent_positions: usize,
    /// Hour of day (UTC) at which the risk period rolls over
    #[serde(default)]
    pub daily_reset_hour: u32,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            max_daily_loss: default_max_daily_loss(),
            max_drawdown: default_max_drawdown(),
            max_concurrent_positions: default_max_concurrent_positions(),
            daily_reset_hour: 0,
        }
    }
}

fn default_max_daily_loss() -> Decimal {
    dec!(0.05)
}

fn default_max_drawdown() -> Decimal {
    dec!(0.05)
}

fn default_max_concurrent_positions() -> usize {
    3
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Sleep between successful cycles, seconds
    #[serde(default = "default_tick_interval")]
    pub tick_interval_seconds: u64,
    /// Extended cool-down after a failed cycle, seconds
    #[serde(default = "default_error_cooldown")]
    pub error_cooldown_seconds: u64,
    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            tick_interval_seconds: default_tick_interval(),
            error_cooldown_seconds: default_error_cooldown(),
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_tick_interval() -> u64 {
    10
}

fn default_error_cooldown() -> u64 {
    60
}

fn default_request_timeout() -> u64 {
    30
}

/// API credentials for authenticated requests
#[derive(Debug, Clone)]
pub struct ApiCredentials {
    pub access_key: String,
    pub secret_key: String,
}

impl ApiCredentials {
    pub fn new(access_key: String, secret_key: String) -> Self {
        Self {
            access_key,
            secret_key,
        }
    }
}
