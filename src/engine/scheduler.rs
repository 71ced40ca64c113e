//! Tick scheduler
//!
//! The single control loop. Once per cycle it rolls the risk period,
//! refreshes the candidate universe, evaluates every watched asset
//! sequentially, and dispatches the resulting order intents. Candidates
//! are processed one at a time, so the ledger's guard flags need no
//! locking.
//!
//! A failed cycle is reported and followed by an extended cool-down; the
//! loop never terminates the process over a single cycle's error.

use rust_decimal::Decimal;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::common::errors::Result;
use crate::common::traits::{Clock, Execution, MarketData, Notifier};
use crate::common::types::{Fill, Interval};
use crate::config::types::AppConfig;
use crate::engine::position::{OrderIntent, PositionBook};
use crate::engine::risk::RiskGovernor;
use crate::engine::signal::{Signal, SignalEvaluator, SignalKind};
use crate::engine::trend::TrendClassifier;
use crate::engine::universe::UniverseSelector;

/// The control loop driving the whole bot
pub struct TickScheduler<M, E, N, C> {
    market_data: M,
    execution: E,
    notifier: N,
    clock: C,
    cfg: AppConfig,
    universe: UniverseSelector,
    trend: TrendClassifier,
    evaluator: SignalEvaluator,
    book: PositionBook,
    governor: RiskGovernor,
}

impl<M, E, N, C> TickScheduler<M, E, N, C>
where
    M: MarketData,
    E: Execution,
    N: Notifier,
    C: Clock,
{
    /// Build the scheduler: recover pre-existing holdings into the ledger
    /// and anchor the risk period at current equity.
    pub async fn new(
        cfg: AppConfig,
        market_data: M,
        execution: E,
        notifier: N,
        clock: C,
    ) -> Result<Self> {
        let universe = UniverseSelector::from_config(&cfg.trading);
        let trend = TrendClassifier::from_config(&cfg.trading);
        let evaluator = SignalEvaluator::new(cfg.trading.clone());
        let mut book = PositionBook::new(cfg.trading.clone());

        let holdings = execution.list_holdings().await?;
        if !holdings.is_empty() {
            info!(count = holdings.len(), "recovered pre-existing holdings");
        }
        book.bootstrap(&holdings);

        let cash = execution.available_cash().await?;
        let equity = Self::mark_to_market(&market_data, &execution, &book, cash).await?;
        let governor = RiskGovernor::new(cfg.risk.clone(), clock.now(), equity);

        notifier
            .report(&format!(
                "Bot initialized. Cash: {}, equity: {}, recovered positions: {}",
                cash,
                equity,
                book.open_count(),
            ))
            .await;

        Ok(Self {
            market_data,
            execution,
            notifier,
            clock,
            cfg,
            universe,
            trend,
            evaluator,
            book,
            governor,
        })
    }

    /// Run forever. Sleeps the tick interval after a clean cycle and the
    /// extended cool-down after a failed one.
    pub async fn run(&mut self) {
        let tick = Duration::from_secs(self.cfg.settings.tick_interval_seconds);
        let cooldown = Duration::from_secs(self.cfg.settings.error_cooldown_seconds);

        loop {
            match self.run_cycle().await {
                Ok(()) => self.clock.sleep(tick).await,
                Err(e) => {
                    error!(error = %e, "cycle failed, cooling down");
                    self.notifier
                        .report(&format!("Cycle failed: {e}. Backing off."))
                        .await;
                    self.clock.sleep(cooldown).await;
                }
            }
        }
    }

    /// One full evaluation cycle.
    ///
    /// Any error unwinds the whole cycle with no partial ledger mutation
    /// beyond fills already applied for completed orders.
    pub async fn run_cycle(&mut self) -> Result<()> {
        let now = self.clock.now();
        let cash = self.execution.available_cash().await?;
        let equity =
            Self::mark_to_market(&self.market_data, &self.execution, &self.book, cash).await?;
        self.governor.roll_period(now, equity);

        if self.cfg.trading.session_end.contains(now) {
            debug!("inside end-of-session window, flattening");
            return self.flatten_all().await;
        }

        let candidates = self.universe.refresh(&self.market_data).await?;
        debug!(?candidates, "watching");

        // Held markets keep being managed even after dropping out of the
        // turnover ranking.
        let mut markets: Vec<String> = candidates.into_iter().map(|c| c.market).collect();
        for held in self.book.held_markets() {
            if !markets.contains(&held) {
                markets.push(held);
            }
        }

        for market in markets {
            self.process_market(&market, cash, equity).await?;
        }

        Ok(())
    }

    /// Evaluate and act on a single market.
    async fn process_market(&mut self, market: &str, cash: Decimal, equity: Decimal) -> Result<()> {
        let Some(five_min) = self
            .market_data
            .get_series(market, Interval::Minute5, self.cfg.trading.five_min_bars)
            .await?
        else {
            debug!(%market, "5-minute series unavailable, skipping");
            return Ok(());
        };
        let Some(price) = self.market_data.get_quote(market).await? else {
            debug!(%market, "quote unavailable, skipping");
            return Ok(());
        };

        self.book.ensure(market);
        self.book.mark_price(market, price);
        let position = self.book.position(market);

        // The trend fetch is only needed on the entry path.
        let uptrend = if position.is_flat() {
            let daily = self
                .market_data
                .get_series(market, Interval::Day, self.cfg.trading.daily_bars)
                .await?;
            let hourly = self
                .market_data
                .get_series(market, Interval::Hour, self.cfg.trading.hourly_bars)
                .await?;
            self.trend.is_uptrend(daily.as_ref(), hourly.as_ref())
        } else {
            false
        };

        let signal = self
            .evaluator
            .evaluate(market, &position, price, &five_min, uptrend, false);
        self.dispatch(signal, cash, equity).await
    }

    /// Execute a signal's order intent and apply the fill to the ledger.
    async fn dispatch(&mut self, signal: Signal, cash: Decimal, equity: Decimal) -> Result<()> {
        match signal.kind {
            SignalKind::Hold => Ok(()),
            SignalKind::Enter => {
                if !self.governor.authorize_entry(self.book.open_count(), equity) {
                    debug!(market = %signal.market, "entry blocked by risk governor");
                    return Ok(());
                }
                let Some(intent) = self.book.intent_for(&signal, cash, Decimal::ZERO) else {
                    debug!(market = %signal.market, "entry below minimum notional, dropped");
                    return Ok(());
                };
                let fill = self.execute(&intent).await?;
                self.book
                    .apply_fill(SignalKind::Enter, &fill, signal.snapshot.atr);
                info!(market = %signal.market, price = %fill.price, "entered");
                self.notify(&format!(
                    "Entered {} at {} (RSI {})",
                    signal.market,
                    fill.price,
                    signal
                        .snapshot
                        .rsi
                        .map(|r| r.round_dp(2).to_string())
                        .unwrap_or_else(|| "n/a".to_string()),
                ))
                .await;
                Ok(())
            }
            SignalKind::Add => {
                let Some(intent) = self.book.intent_for(&signal, cash, Decimal::ZERO) else {
                    debug!(market = %signal.market, "scale-in below minimum notional, dropped");
                    return Ok(());
                };
                let fill = self.execute(&intent).await?;
                self.book.apply_fill(SignalKind::Add, &fill, None);
                info!(market = %signal.market, price = %fill.price, "scaled in");
                self.notify(&format!("Scaled into {} at {}", signal.market, fill.price))
                    .await;
                Ok(())
            }
            SignalKind::PartialExit => {
                let held = self.execution.held_quantity(&signal.market).await?;
                let Some(intent) = self.book.intent_for(&signal, cash, held) else {
                    debug!(market = %signal.market, "partial exit below dust threshold, dropped");
                    return Ok(());
                };
                let fill = self.execute(&intent).await?;
                self.book.apply_fill(SignalKind::PartialExit, &fill, None);
                info!(market = %signal.market, price = %fill.price, "took partial profit");
                self.notify(&format!(
                    "Took half profit on {} at {}",
                    signal.market, fill.price
                ))
                .await;
                Ok(())
            }
            SignalKind::FullExit | SignalKind::TimeStop => {
                self.close_position(&signal, cash).await
            }
        }
    }

    /// Close out a held position entirely and record the realized result.
    async fn close_position(&mut self, signal: &Signal, cash: Decimal) -> Result<()> {
        let held = self.execution.held_quantity(&signal.market).await?;
        let Some(intent) = self.book.intent_for(signal, cash, held) else {
            debug!(market = %signal.market, "exit below dust threshold, dropped");
            return Ok(());
        };

        let entry_price = self.book.position(&signal.market).entry_price;
        let fill = self.execute(&intent).await?;

        let pnl_fraction = if entry_price.is_zero() {
            Decimal::ZERO
        } else {
            (fill.price - entry_price) / entry_price
        };
        self.governor.record_exit(pnl_fraction);
        self.book.apply_fill(signal.kind, &fill, None);

        let label = match signal.kind {
            SignalKind::TimeStop => "Session-end exit",
            _ => "Exited",
        };
        info!(
            market = %signal.market,
            price = %fill.price,
            pnl = %pnl_fraction,
            kind = %signal.kind,
            "closed position"
        );
        self.notify(&format!(
            "{} {} at {} (entry {}, PnL {}%)",
            label,
            signal.market,
            fill.price,
            entry_price,
            (pnl_fraction * Decimal::ONE_HUNDRED).round_dp(2),
        ))
        .await;
        Ok(())
    }

    /// Force a time stop on every held position.
    async fn flatten_all(&mut self) -> Result<()> {
        for market in self.book.held_markets() {
            let Some(price) = self.market_data.get_quote(&market).await? else {
                warn!(%market, "quote unavailable inside session-end window");
                continue;
            };
            let signal = Signal::time_stop(market, price);
            self.close_position(&signal, Decimal::ZERO).await?;
        }
        Ok(())
    }

    async fn execute(&self, intent: &OrderIntent) -> Result<Fill> {
        match intent {
            OrderIntent::Buy { market, notional } => {
                self.execution.market_buy(market, *notional).await
            }
            OrderIntent::Sell { market, quantity } => {
                self.execution.market_sell(market, *quantity).await
            }
        }
    }

    /// Cash plus the marked value of every held position.
    ///
    /// A held asset whose quote is momentarily unavailable contributes
    /// nothing this cycle, which only errs on the conservative side for
    /// the drawdown checks.
    async fn mark_to_market(
        market_data: &M,
        execution: &E,
        book: &PositionBook,
        cash: Decimal,
    ) -> Result<Decimal> {
        let mut equity = cash;
        for market in book.held_markets() {
            let quantity = execution.held_quantity(&market).await?;
            if let Some(quote) = market_data.get_quote(&market).await? {
                equity += quantity * quote;
            }
        }
        Ok(equity)
    }

    /// Best-effort notification; delivery failures are the notifier's
    /// problem and never this loop's.
    async fn notify(&self, message: &str) {
        self.notifier.report(message).await;
    }

    /// Read access for tests and the startup report
    pub fn book(&self) -> &PositionBook {
        &self.book
    }

    pub fn governor(&self) -> &RiskGovernor {
        &self.governor
    }
}
