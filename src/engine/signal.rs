//! Signal evaluation
//!
//! Combines indicators, the trend classification, and the current position
//! state into exactly one discrete signal per asset per cycle. Priority:
//! TimeStop > FullExit > PartialExit > Add > Enter > Hold.

use rust_decimal::Decimal;

use crate::common::types::PriceSeries;
use crate::config::types::TradingConfig;
use crate::engine::indicators::{atr, rsi, sma};
use crate::engine::position::Position;

/// The discrete action a signal requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    Hold,
    Enter,
    Add,
    PartialExit,
    FullExit,
    TimeStop,
}

impl std::fmt::Display for SignalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SignalKind::Hold => write!(f, "hold"),
            SignalKind::Enter => write!(f, "enter"),
            SignalKind::Add => write!(f, "add"),
            SignalKind::PartialExit => write!(f, "partial-exit"),
            SignalKind::FullExit => write!(f, "full-exit"),
            SignalKind::TimeStop => write!(f, "time-stop"),
        }
    }
}

/// Market snapshot captured at evaluation time
///
/// Carried on every signal so sizing and notifications use the exact
/// values the decision was made on, not re-fetched ones.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Snapshot {
    /// Quote price at evaluation
    pub price: Decimal,
    /// RSI over the configured period, when computable
    pub rsi: Option<Decimal>,
    /// ATR over the configured period, when computable
    pub atr: Option<Decimal>,
    /// Unrealized PnL fraction for held positions
    pub pnl: Option<Decimal>,
}

/// One evaluated trading signal for one asset
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    pub kind: SignalKind,
    pub market: String,
    pub snapshot: Snapshot,
}

impl Signal {
    pub fn new(kind: SignalKind, market: impl Into<String>, snapshot: Snapshot) -> Self {
        Self {
            kind,
            market: market.into(),
            snapshot,
        }
    }

    /// A forced end-of-session exit, used by the scheduler when it skips
    /// normal evaluation inside the flattening window
    pub fn time_stop(market: impl Into<String>, price: Decimal) -> Self {
        Self::new(
            SignalKind::TimeStop,
            market,
            Snapshot {
                price,
                ..Default::default()
            },
        )
    }
}

/// Evaluates one asset per cycle into a [`Signal`]
#[derive(Debug, Clone)]
pub struct SignalEvaluator {
    cfg: TradingConfig,
}

impl SignalEvaluator {
    pub fn new(cfg: TradingConfig) -> Self {
        Self { cfg }
    }

    /// Evaluate one asset.
    ///
    /// `five_min` is the 5-minute series ending at the last closed bar,
    /// `price` the live quote, `uptrend` the trend classifier's verdict,
    /// and `in_session_end` whether the cycle falls inside the
    /// end-of-session flattening window.
    pub fn evaluate(
        &self,
        market: &str,
        position: &Position,
        price: Decimal,
        five_min: &PriceSeries,
        uptrend: bool,
        in_session_end: bool,
    ) -> Signal {
        let closes = five_min.closes();
        let snapshot = Snapshot {
            price,
            rsi: rsi(&closes, self.cfg.rsi_period),
            atr: atr(&five_min.bars, self.cfg.atr_period),
            pnl: position.unrealized_pnl(price),
        };

        if in_session_end {
            let kind = if position.holding {
                SignalKind::TimeStop
            } else {
                SignalKind::Hold
            };
            return Signal::new(kind, market, snapshot);
        }

        let kind = if position.holding {
            self.evaluate_held(position, price, &snapshot)
        } else {
            self.evaluate_flat(price, five_min, &closes, uptrend, &snapshot)
        };

        Signal::new(kind, market, snapshot)
    }

    fn evaluate_held(&self, position: &Position, price: Decimal, snapshot: &Snapshot) -> SignalKind {
        let entry = position.entry_price;
        let atr_at_entry = position.atr_at_entry;
        // Recovered positions have no entry volatility snapshot; their
        // ATR-derived targets stay dormant until the next fresh entry.
        let atr_armed = atr_at_entry > Decimal::ZERO;

        let take_profit = atr_armed && price >= entry + self.cfg.full_take_atr * atr_at_entry;
        let hard_stop = atr_armed && price <= entry - self.cfg.stop_atr * atr_at_entry;
        let trailing = position
            .trailing_drawdown(price)
            .is_some_and(|dd| dd <= self.cfg.trailing_stop);
        if take_profit || hard_stop || trailing {
            return SignalKind::FullExit;
        }

        if atr_armed
            && !position.partial_taken
            && price >= entry + self.cfg.partial_take_atr * atr_at_entry
        {
            return SignalKind::PartialExit;
        }

        if !position.added
            && snapshot.pnl.is_some_and(|pnl| pnl <= self.cfg.add_trigger_pnl)
        {
            return SignalKind::Add;
        }

        SignalKind::Hold
    }

    fn evaluate_flat(
        &self,
        price: Decimal,
        five_min: &PriceSeries,
        closes: &[Decimal],
        uptrend: bool,
        snapshot: &Snapshot,
    ) -> SignalKind {
        if !uptrend {
            return SignalKind::Hold;
        }

        let (Some(fast), Some(slow)) = (
            sma(closes, self.cfg.sma_fast),
            sma(closes, self.cfg.sma_slow),
        ) else {
            return SignalKind::Hold;
        };
        if fast <= slow {
            return SignalKind::Hold;
        }

        let Some(rsi_value) = snapshot.rsi else {
            return SignalKind::Hold;
        };
        if rsi_value >= self.cfg.rsi_entry_max {
            return SignalKind::Hold;
        }

        // Entries need a volatility snapshot for sizing and exit targets.
        if snapshot.atr.is_none() {
            return SignalKind::Hold;
        }

        if !self.liquidity_ok(five_min) {
            return SignalKind::Hold;
        }

        if !self.quote_fresh(price, five_min) {
            return SignalKind::Hold;
        }

        SignalKind::Enter
    }

    /// Current 5-minute volume at or above its moving average times the
    /// configured ratio. Filters illiquid or stale candles.
    fn liquidity_ok(&self, five_min: &PriceSeries) -> bool {
        let volumes: Vec<Decimal> = five_min.bars.iter().map(|b| b.volume).collect();
        let (Some(last), Some(avg)) = (
            volumes.last().copied(),
            sma(&volumes, self.cfg.volume_ma_window),
        ) else {
            return false;
        };
        last >= self.cfg.volume_ratio_min * avg
    }

    /// Live quote must not deviate from the last closed bar by more than
    /// the slippage tolerance. Guards against executing on a stale quote.
    fn quote_fresh(&self, price: Decimal, five_min: &PriceSeries) -> bool {
        let Some(last_close) = five_min.last_close() else {
            return false;
        };
        if last_close.is_zero() {
            return false;
        }
        let deviation = ((price - last_close) / last_close).abs();
        deviation <= self.cfg.slippage_tolerance
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::types::{Interval, PriceBar};
    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn evaluator() -> SignalEvaluator {
        SignalEvaluator::new(TradingConfig::default())
    }

    fn bar(close: Decimal, volume: Decimal) -> PriceBar {
        PriceBar {
            timestamp: Utc::now(),
            open: close,
            high: close * dec!(1.01),
            low: close * dec!(0.99),
            close,
            volume,
        }
    }

    /// 50 bars: a slow drift down, one capitulation candle, then a steady
    /// recovery. The fast SMA sits above the slow one while the RSI window
    /// is still dominated by the capitulation loss.
    fn enterable_series() -> PriceSeries {
        let mut bars = Vec::new();
        for i in 0..35 {
            let close = dec!(1400) - Decimal::from(i * 10);
            bars.push(bar(close, dec!(100)));
        }
        bars.push(bar(dec!(1000), dec!(100)));
        for i in 0..14 {
            let close = dec!(600) + Decimal::from(i * 6);
            bars.push(bar(close, dec!(100)));
        }
        PriceSeries::new("KRW-ETH", Interval::Minute5, bars)
    }

    fn held_position(entry: Decimal, atr_at_entry: Decimal) -> Position {
        let mut position = Position::flat();
        position.holding = true;
        position.entry_price = entry;
        position.high_water_price = entry;
        position.atr_at_entry = atr_at_entry;
        position
    }

    #[test]
    fn test_enter_on_cross_with_low_rsi() {
        let series = enterable_series();
        let price = series.last_close().unwrap();
        let signal = evaluator().evaluate("KRW-ETH", &Position::flat(), price, &series, true, false);

        assert_eq!(signal.kind, SignalKind::Enter);
        assert!(signal.snapshot.rsi.unwrap() < dec!(40));
        assert!(signal.snapshot.atr.is_some());
    }

    #[test]
    fn test_no_enter_without_uptrend() {
        let series = enterable_series();
        let price = series.last_close().unwrap();
        let signal =
            evaluator().evaluate("KRW-ETH", &Position::flat(), price, &series, false, false);

        assert_eq!(signal.kind, SignalKind::Hold);
    }

    #[test]
    fn test_no_enter_on_stale_quote() {
        let series = enterable_series();
        let price = series.last_close().unwrap() * dec!(1.02);
        let signal = evaluator().evaluate("KRW-ETH", &Position::flat(), price, &series, true, false);

        assert_eq!(signal.kind, SignalKind::Hold);
    }

    #[test]
    fn test_no_enter_on_thin_volume() {
        let mut series = enterable_series();
        series.bars.last_mut().unwrap().volume = dec!(10);
        let price = series.last_close().unwrap();
        let signal = evaluator().evaluate("KRW-ETH", &Position::flat(), price, &series, true, false);

        assert_eq!(signal.kind, SignalKind::Hold);
    }

    #[test]
    fn test_full_exit_at_take_profit() {
        let series = enterable_series();
        let position = held_position(dec!(100), dec!(2));
        // price >= entry + 2 * ATR
        let signal = evaluator().evaluate("KRW-ETH", &position, dec!(104), &series, true, false);

        assert_eq!(signal.kind, SignalKind::FullExit);
    }

    #[test]
    fn test_full_exit_at_hard_stop() {
        let series = enterable_series();
        let position = held_position(dec!(100), dec!(2));
        // price <= entry - 1.2 * ATR
        let signal = evaluator().evaluate("KRW-ETH", &position, dec!(97.5), &series, true, false);

        assert_eq!(signal.kind, SignalKind::FullExit);
    }

    #[test]
    fn test_full_exit_on_trailing_drawdown() {
        let series = enterable_series();
        let mut position = held_position(dec!(100), dec!(20));
        position.high_water_price = dec!(110);
        // Drawdown from high water: (108 - 110) / 110 < -1.5%
        let signal = evaluator().evaluate("KRW-ETH", &position, dec!(108), &series, true, false);

        assert_eq!(signal.kind, SignalKind::FullExit);
    }

    #[test]
    fn test_partial_exit_once_at_one_atr() {
        let series = enterable_series();
        let position = held_position(dec!(100), dec!(2));
        let signal = evaluator().evaluate("KRW-ETH", &position, dec!(102), &series, true, false);
        assert_eq!(signal.kind, SignalKind::PartialExit);

        let mut taken = held_position(dec!(100), dec!(2));
        taken.partial_taken = true;
        let signal = evaluator().evaluate("KRW-ETH", &taken, dec!(102), &series, true, false);
        assert_eq!(signal.kind, SignalKind::Hold);
    }

    #[test]
    fn test_add_once_below_trigger() {
        // A trailing stop tighter than the add trigger would always win on
        // priority, so widen it here to expose the scale-in path.
        let mut cfg = TradingConfig::default();
        cfg.trailing_stop = dec!(-0.05);
        let evaluator = SignalEvaluator::new(cfg);

        let series = enterable_series();
        let position = held_position(dec!(100), dec!(2));
        let signal = evaluator.evaluate("KRW-ETH", &position, dec!(98), &series, true, false);
        assert_eq!(signal.kind, SignalKind::Add);

        let mut added = held_position(dec!(100), dec!(2));
        added.added = true;
        let signal = evaluator.evaluate("KRW-ETH", &added, dec!(98), &series, true, false);
        assert_eq!(signal.kind, SignalKind::Hold);
    }

    #[test]
    fn test_time_stop_overrides_everything() {
        let series = enterable_series();

        // A held asset inside the window is flattened even though the
        // price sits at the partial-take level.
        let position = held_position(dec!(100), dec!(2));
        let signal = evaluator().evaluate("KRW-ETH", &position, dec!(102), &series, true, true);
        assert_eq!(signal.kind, SignalKind::TimeStop);

        // A flat asset inside the window never enters, even when every
        // entry condition is satisfied.
        let price = series.last_close().unwrap();
        let signal = evaluator().evaluate("KRW-ETH", &Position::flat(), price, &series, true, true);
        assert_eq!(signal.kind, SignalKind::Hold);
    }

    #[test]
    fn test_recovered_position_ignores_atr_targets() {
        let series = enterable_series();
        // atr_at_entry = 0: a bootstrapped position without a volatility
        // snapshot. Price above entry must not trigger ATR-based exits.
        let position = held_position(dec!(100), Decimal::ZERO);
        let signal = evaluator().evaluate("KRW-ETH", &position, dec!(101), &series, true, false);
        assert_eq!(signal.kind, SignalKind::Hold);
    }
}
