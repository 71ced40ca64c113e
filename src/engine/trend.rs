//! Multi-timeframe trend classification
//!
//! An asset is in an uptrend when the daily close sits on or above its
//! trend EMA and the hourly fast EMA has crossed above the slow EMA on the
//! most recent bar. A sustained fast-over-slow state is not enough: the
//! cross has to be fresh, which keeps late entries out of an already
//! extended move.

use crate::common::types::PriceSeries;
use crate::config::types::TradingConfig;
use crate::engine::indicators::ema;

/// Classifies directional bias from daily and hourly candles.
#[derive(Debug, Clone)]
pub struct TrendClassifier {
    daily_trend_ema: usize,
    daily_min_bars: usize,
    hourly_fast_ema: usize,
    hourly_slow_ema: usize,
    hourly_min_bars: usize,
}

impl TrendClassifier {
    pub fn from_config(cfg: &TradingConfig) -> Self {
        Self {
            daily_trend_ema: cfg.daily_trend_ema,
            daily_min_bars: cfg.daily_bars as usize,
            hourly_fast_ema: cfg.hourly_fast_ema,
            hourly_slow_ema: cfg.hourly_slow_ema,
            hourly_min_bars: cfg.hourly_bars as usize,
        }
    }

    /// Returns true only when both timeframes agree.
    ///
    /// Missing or under-length series fail closed: no data, no uptrend.
    pub fn is_uptrend(&self, daily: Option<&PriceSeries>, hourly: Option<&PriceSeries>) -> bool {
        let (Some(daily), Some(hourly)) = (daily, hourly) else {
            return false;
        };
        self.daily_filter(daily) && self.hourly_cross(hourly)
    }

    /// Last daily close at or above the daily trend EMA.
    fn daily_filter(&self, daily: &PriceSeries) -> bool {
        if daily.len() < self.daily_min_bars {
            return false;
        }
        let closes = daily.closes();
        let (Some(last_close), Some(trend_ema)) =
            (daily.last_close(), ema(&closes, self.daily_trend_ema))
        else {
            return false;
        };
        last_close >= trend_ema
    }

    /// Fresh fast-over-slow EMA cross on the most recent hourly bar.
    fn hourly_cross(&self, hourly: &PriceSeries) -> bool {
        if hourly.len() < self.hourly_min_bars {
            return false;
        }
        let closes = hourly.closes();
        let prev = &closes[..closes.len() - 1];

        let (Some(fast_now), Some(slow_now), Some(fast_prev), Some(slow_prev)) = (
            ema(&closes, self.hourly_fast_ema),
            ema(&closes, self.hourly_slow_ema),
            ema(prev, self.hourly_fast_ema),
            ema(prev, self.hourly_slow_ema),
        ) else {
            return false;
        };

        fast_now > slow_now && fast_prev <= slow_prev
    }
}
