//! Technical indicators
//!
//! Pure functions over trailing windows of closes/bars. Each returns
//! `None` until enough data exists to compute it, so callers fail closed
//! instead of trading on a half-warmed indicator.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::common::types::PriceBar;

/// Simple moving average of the trailing `window` values.
pub fn sma(values: &[Decimal], window: usize) -> Option<Decimal> {
    if window == 0 || values.len() < window {
        return None;
    }
    let sum: Decimal = values[values.len() - window..].iter().copied().sum();
    Some(sum / Decimal::from(window))
}

/// Exponential moving average with span `span`.
///
/// Standard recursive smoothing, alpha = 2 / (span + 1), seeded with the
/// first value of the slice.
pub fn ema(values: &[Decimal], span: usize) -> Option<Decimal> {
    if span == 0 || values.len() < span {
        return None;
    }
    let alpha = dec!(2) / Decimal::from(span + 1);
    let mut current = values[0];
    for value in &values[1..] {
        current = alpha * *value + (Decimal::ONE - alpha) * current;
    }
    Some(current)
}

/// Relative Strength Index over the trailing `period` price changes.
///
/// Simple averages of gains vs losses. A zero average loss is RSI = 100,
/// not a division fault.
pub fn rsi(values: &[Decimal], period: usize) -> Option<Decimal> {
    if period == 0 || values.len() < period + 1 {
        return None;
    }
    let window = &values[values.len() - period - 1..];

    let mut gain_sum = Decimal::ZERO;
    let mut loss_sum = Decimal::ZERO;
    for pair in window.windows(2) {
        let delta = pair[1] - pair[0];
        if delta > Decimal::ZERO {
            gain_sum += delta;
        } else {
            loss_sum -= delta;
        }
    }

    let avg_gain = gain_sum / Decimal::from(period);
    let avg_loss = loss_sum / Decimal::from(period);

    if avg_loss.is_zero() {
        return Some(dec!(100));
    }

    let rs = avg_gain / avg_loss;
    Some(dec!(100) - dec!(100) / (Decimal::ONE + rs))
}

/// Average True Range over the trailing `period` bars.
///
/// True range: max(high - low, |high - prev close|, |low - prev close|),
/// averaged with a simple moving average. Needs `period + 1` bars so every
/// true range in the window has a previous close.
pub fn atr(bars: &[PriceBar], period: usize) -> Option<Decimal> {
    if period == 0 || bars.len() < period + 1 {
        return None;
    }
    let window = &bars[bars.len() - period - 1..];

    let mut tr_sum = Decimal::ZERO;
    for pair in window.windows(2) {
        let prev_close = pair[0].close;
        let bar = &pair[1];
        let tr = (bar.high - bar.low)
            .max((bar.high - prev_close).abs())
            .max((bar.low - prev_close).abs());
        tr_sum += tr;
    }

    Some(tr_sum / Decimal::from(period))
}
