//! Portfolio risk governor
//!
//! Tracks realized losses and equity drawdown over a daily risk period and
//! gates new entries. Realized gains never offset realized losses: the
//! counter is a worst-case drawdown guard, not a net-PnL guard.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::config::types::RiskConfig;

/// Process-wide risk state, one instance per bot
#[derive(Debug, Clone)]
pub struct RiskGovernor {
    cfg: RiskConfig,
    /// Marked-to-market equity at the start of the current period
    period_start_equity: Decimal,
    /// Sum of negative realized-PnL fractions since period start
    cumulative_loss_fraction: Decimal,
    /// Set when the loss cap is breached; cleared at the period boundary
    trading_halted: bool,
    /// Anchor-shifted calendar date identifying the current period
    period_anchor_date: NaiveDate,
}

impl RiskGovernor {
    pub fn new(cfg: RiskConfig, now: DateTime<Utc>, starting_equity: Decimal) -> Self {
        let period_anchor_date = Self::period_date(&cfg, now);
        Self {
            cfg,
            period_start_equity: starting_equity,
            cumulative_loss_fraction: Decimal::ZERO,
            trading_halted: false,
            period_anchor_date,
        }
    }

    /// The calendar date owning `now`, shifted by the configured reset hour
    fn period_date(cfg: &RiskConfig, now: DateTime<Utc>) -> NaiveDate {
        (now - Duration::hours(cfg.daily_reset_hour as i64)).date_naive()
    }

    /// Roll the risk period if `now` crossed the daily boundary.
    ///
    /// On a roll the period baseline is re-anchored at current equity, the
    /// loss counter clears, and a halt (if any) lifts.
    pub fn roll_period(&mut self, now: DateTime<Utc>, current_equity: Decimal) {
        let today = Self::period_date(&self.cfg, now);
        if today == self.period_anchor_date {
            return;
        }
        info!(
            %today,
            %current_equity,
            was_halted = self.trading_halted,
            "risk period reset"
        );
        self.period_anchor_date = today;
        self.period_start_equity = current_equity;
        self.cumulative_loss_fraction = Decimal::ZERO;
        self.trading_halted = false;
    }

    /// Record a realized exit. Only losses accumulate.
    pub fn record_exit(&mut self, realized_pnl_fraction: Decimal) {
        if realized_pnl_fraction >= Decimal::ZERO {
            return;
        }
        self.cumulative_loss_fraction -= realized_pnl_fraction;
        if self.cumulative_loss_fraction >= self.cfg.max_daily_loss && !self.trading_halted {
            self.trading_halted = true;
            warn!(
                loss_fraction = %self.cumulative_loss_fraction,
                cap = %self.cfg.max_daily_loss,
                "daily loss cap reached, new entries halted"
            );
        }
    }

    /// Whether a new entry may be opened right now.
    ///
    /// Exits are never gated; this only protects against adding exposure.
    pub fn authorize_entry(&self, open_positions: usize, current_equity: Decimal) -> bool {
        if self.trading_halted {
            return false;
        }
        if self.cumulative_loss_fraction >= self.cfg.max_daily_loss {
            return false;
        }
        if open_positions >= self.cfg.max_concurrent_positions {
            return false;
        }
        if self.period_start_equity > Decimal::ZERO {
            let drawdown =
                (current_equity - self.period_start_equity) / self.period_start_equity;
            if drawdown <= -self.cfg.max_drawdown {
                return false;
            }
        }
        true
    }

    pub fn is_halted(&self) -> bool {
        self.trading_halted
    }

    pub fn cumulative_loss_fraction(&self) -> Decimal {
        self.cumulative_loss_fraction
    }

    pub fn period_start_equity(&self) -> Decimal {
        self.period_start_equity
    }
}
