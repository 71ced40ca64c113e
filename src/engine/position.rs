//! Position ledger
//!
//! Owns the per-asset position records, turns signals into order intents
//! (including entry sizing), and applies reported fills. The `added` and
//! `partial_taken` flags make the one-shot scale-in and partial take
//! idempotent per entry episode; no timing is involved.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;

use crate::common::types::{Fill, Holding};
use crate::config::types::TradingConfig;
use crate::engine::signal::{Signal, SignalKind};

/// Per-asset position state
///
/// Invariant: a flat position (holding == false) has zero prices and both
/// one-shot flags cleared. [`Position::flat`] is the only way the ledger
/// constructs one.
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub holding: bool,
    /// Average price of the fills building the current holding
    pub entry_price: Decimal,
    /// Highest price observed since entry, for the trailing stop
    pub high_water_price: Decimal,
    /// Whether the one-shot scale-in has been used this episode
    pub added: bool,
    /// Whether the one-shot partial take has fired this episode
    pub partial_taken: bool,
    /// ATR snapshot at entry; exit distances are derived from this so they
    /// do not drift as price moves. Zero for recovered positions.
    pub atr_at_entry: Decimal,
}

impl Position {
    /// A flat position satisfying the ledger invariant
    pub fn flat() -> Self {
        Self {
            holding: false,
            entry_price: Decimal::ZERO,
            high_water_price: Decimal::ZERO,
            added: false,
            partial_taken: false,
            atr_at_entry: Decimal::ZERO,
        }
    }

    /// A position recovered from a pre-existing exchange holding.
    ///
    /// No entry volatility snapshot exists, so `atr_at_entry` stays zero
    /// and ATR-derived exits remain dormant until the next fresh entry.
    pub fn recovered(avg_buy_price: Decimal) -> Self {
        Self {
            holding: true,
            entry_price: avg_buy_price,
            high_water_price: avg_buy_price,
            added: false,
            partial_taken: false,
            atr_at_entry: Decimal::ZERO,
        }
    }

    pub fn is_flat(&self) -> bool {
        !self.holding
    }

    /// Unrealized PnL fraction relative to the entry price
    pub fn unrealized_pnl(&self, price: Decimal) -> Option<Decimal> {
        if !self.holding || self.entry_price.is_zero() {
            return None;
        }
        Some((price - self.entry_price) / self.entry_price)
    }

    /// Drawdown fraction from the high-water price
    pub fn trailing_drawdown(&self, price: Decimal) -> Option<Decimal> {
        if !self.holding || self.high_water_price.is_zero() {
            return None;
        }
        Some((price - self.high_water_price) / self.high_water_price)
    }
}

/// An order the execution client should place
#[derive(Debug, Clone, PartialEq)]
pub enum OrderIntent {
    /// Market buy spending `notional` of the quote currency
    Buy { market: String, notional: Decimal },
    /// Market sell of `quantity` of the base asset
    Sell { market: String, quantity: Decimal },
}

/// The ledger: one [`Position`] per asset ever touched
#[derive(Debug, Clone)]
pub struct PositionBook {
    positions: HashMap<String, Position>,
    cfg: TradingConfig,
}

impl PositionBook {
    pub fn new(cfg: TradingConfig) -> Self {
        Self {
            positions: HashMap::new(),
            cfg,
        }
    }

    /// Seed the ledger from holdings recovered at startup
    pub fn bootstrap(&mut self, holdings: &[Holding]) {
        for holding in holdings {
            self.positions
                .insert(holding.market.clone(), Position::recovered(holding.avg_buy_price));
        }
    }

    /// Insert a flat record the first time an asset is seen
    pub fn ensure(&mut self, market: &str) {
        self.positions
            .entry(market.to_string())
            .or_insert_with(Position::flat);
    }

    pub fn get(&self, market: &str) -> Option<&Position> {
        self.positions.get(market)
    }

    /// Position for `market`, flat if never seen
    pub fn position(&self, market: &str) -> Position {
        self.positions.get(market).cloned().unwrap_or_else(Position::flat)
    }

    /// Number of currently held positions
    pub fn open_count(&self) -> usize {
        self.positions.values().filter(|p| p.holding).count()
    }

    /// Markets with a currently held position
    pub fn held_markets(&self) -> Vec<String> {
        let mut markets: Vec<String> = self
            .positions
            .iter()
            .filter(|(_, p)| p.holding)
            .map(|(m, _)| m.clone())
            .collect();
        markets.sort();
        markets
    }

    /// Raise the high-water mark; called every cycle an asset is held,
    /// independent of what the evaluator decided.
    pub fn mark_price(&mut self, market: &str, price: Decimal) {
        if let Some(position) = self.positions.get_mut(market) {
            if position.holding && price > position.high_water_price {
                position.high_water_price = price;
            }
        }
    }

    /// Turn a signal into an order intent, or `None` for holds and guard
    /// violations (below-minimum notionals, dust sells, flag misuse).
    ///
    /// `cash` is the available quote balance, `held_quantity` the current
    /// exchange balance of the base asset.
    pub fn intent_for(
        &self,
        signal: &Signal,
        cash: Decimal,
        held_quantity: Decimal,
    ) -> Option<OrderIntent> {
        let market = signal.market.clone();
        match signal.kind {
            SignalKind::Hold => None,
            SignalKind::Enter => {
                let atr = signal.snapshot.atr?;
                let notional = self.entry_notional(cash, atr, signal.snapshot.price);
                self.buy_intent(market, notional)
            }
            SignalKind::Add => {
                let notional = self.add_notional(cash);
                self.buy_intent(market, notional)
            }
            SignalKind::PartialExit => {
                self.sell_intent(market, held_quantity / dec!(2))
            }
            SignalKind::FullExit | SignalKind::TimeStop => {
                self.sell_intent(market, held_quantity)
            }
        }
    }

    /// Entry sizing: cash x invest ratio x volatility damping x reinvest
    /// haircut. Wider relative volatility means a smaller position, with a
    /// floor of 10%.
    fn entry_notional(&self, cash: Decimal, atr: Decimal, price: Decimal) -> Decimal {
        let damping = if price.is_zero() {
            dec!(0.1)
        } else {
            (Decimal::ONE - atr / price).max(dec!(0.1))
        };
        cash * self.cfg.base_invest_ratio * damping * self.cfg.reinvest_ratio
    }

    /// Scale-in sizing: the entry formula without volatility damping
    fn add_notional(&self, cash: Decimal) -> Decimal {
        cash * self.cfg.base_invest_ratio * self.cfg.reinvest_ratio
    }

    fn buy_intent(&self, market: String, notional: Decimal) -> Option<OrderIntent> {
        if notional < self.cfg.min_order_notional {
            return None;
        }
        Some(OrderIntent::Buy { market, notional })
    }

    fn sell_intent(&self, market: String, quantity: Decimal) -> Option<OrderIntent> {
        if quantity < self.cfg.min_sell_quantity {
            return None;
        }
        Some(OrderIntent::Sell { market, quantity })
    }

    /// Apply a reported fill for the given signal kind.
    ///
    /// `atr` is the volatility snapshot captured by the signal that
    /// produced the order; only entries store it.
    pub fn apply_fill(&mut self, kind: SignalKind, fill: &Fill, atr: Option<Decimal>) {
        let position = self
            .positions
            .entry(fill.market.clone())
            .or_insert_with(Position::flat);

        match kind {
            SignalKind::Hold => {}
            SignalKind::Enter => {
                position.holding = true;
                position.entry_price = fill.price;
                position.high_water_price = fill.price;
                position.added = false;
                position.partial_taken = false;
                position.atr_at_entry = atr.unwrap_or(Decimal::ZERO);
            }
            SignalKind::Add => {
                // One-time equal-tranche scale-in: the new basis is the
                // simple mean of the old entry and the fill.
                position.entry_price = (position.entry_price + fill.price) / dec!(2);
                position.added = true;
            }
            SignalKind::PartialExit => {
                position.partial_taken = true;
            }
            SignalKind::FullExit | SignalKind::TimeStop => {
                *position = Position::flat();
            }
        }
    }
}
