//! Universe selection
//!
//! Ranks the quote currency's markets by last-day turnover (volume x close)
//! and keeps the top N, minus the blacklist. The universe is rebuilt from
//! scratch every cycle; a market that falls out of the ranking simply stops
//! producing entry signals.

use std::collections::HashSet;

use tracing::debug;

use crate::common::errors::Result;
use crate::common::traits::MarketData;
use crate::common::types::{Candidate, Interval};
use crate::config::types::TradingConfig;

/// Selects the top-turnover candidates each cycle
#[derive(Debug, Clone)]
pub struct UniverseSelector {
    quote_currency: String,
    size: usize,
    blacklist: HashSet<String>,
}

impl UniverseSelector {
    pub fn from_config(cfg: &TradingConfig) -> Self {
        Self {
            quote_currency: cfg.quote_currency.clone(),
            size: cfg.universe_size,
            blacklist: cfg.blacklist.iter().cloned().collect(),
        }
    }

    /// Build this cycle's candidate list.
    ///
    /// A market whose daily candle cannot be fetched is skipped rather than
    /// failing the whole refresh; only the market listing itself is fatal.
    pub async fn refresh<M: MarketData + ?Sized>(&self, market_data: &M) -> Result<Vec<Candidate>> {
        let markets = market_data.list_markets(&self.quote_currency).await?;

        let mut candidates = Vec::new();
        for market in markets {
            if self.blacklist.contains(&market) {
                continue;
            }
            let series = match market_data.get_series(&market, Interval::Day, 1).await {
                Ok(Some(series)) => series,
                Ok(None) => continue,
                Err(e) => {
                    debug!(%market, error = %e, "skipping market, daily candle fetch failed");
                    continue;
                }
            };
            let Some(bar) = series.last_bar() else {
                continue;
            };
            candidates.push(Candidate::new(market, bar.volume * bar.close));
        }

        candidates.sort_by(|a, b| b.turnover.cmp(&a.turnover));
        candidates.truncate(self.size);
        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::errors::BotError;
    use crate::common::traits::MockMarketData;
    use crate::common::types::{PriceBar, PriceSeries};
    use chrono::Utc;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn selector() -> UniverseSelector {
        UniverseSelector::from_config(&TradingConfig::default())
    }

    fn daily_series(market: &str, close: Decimal, volume: Decimal) -> PriceSeries {
        PriceSeries::new(
            market,
            Interval::Day,
            vec![PriceBar {
                timestamp: Utc::now(),
                open: close,
                high: close,
                low: close,
                close,
                volume,
            }],
        )
    }

    #[tokio::test]
    async fn test_ranks_by_turnover_and_excludes_blacklist() {
        let mut market_data = MockMarketData::new();
        market_data.expect_list_markets().returning(|_| {
            Ok(vec![
                "KRW-BTC".to_string(), // blacklisted
                "KRW-ETH".to_string(),
                "KRW-XRP".to_string(),
                "KRW-SOL".to_string(),
            ])
        });
        market_data
            .expect_get_series()
            .returning(|market, _, _| match market {
                "KRW-ETH" => Ok(Some(daily_series("KRW-ETH", dec!(100), dec!(50)))),
                "KRW-XRP" => Ok(Some(daily_series("KRW-XRP", dec!(10), dec!(2000)))),
                "KRW-SOL" => Ok(Some(daily_series("KRW-SOL", dec!(200), dec!(10)))),
                _ => panic!("blacklisted market was fetched: {market}"),
            });

        let candidates = selector().refresh(&market_data).await.unwrap();

        let markets: Vec<&str> = candidates.iter().map(|c| c.market.as_str()).collect();
        // XRP 20000 > ETH 5000 > SOL 2000
        assert_eq!(markets, vec!["KRW-XRP", "KRW-ETH", "KRW-SOL"]);
    }

    #[tokio::test]
    async fn test_truncates_to_universe_size() {
        let mut cfg = TradingConfig::default();
        cfg.universe_size = 1;
        let selector = UniverseSelector::from_config(&cfg);

        let mut market_data = MockMarketData::new();
        market_data
            .expect_list_markets()
            .returning(|_| Ok(vec!["KRW-ETH".to_string(), "KRW-XRP".to_string()]));
        market_data
            .expect_get_series()
            .returning(|market, _, _| match market {
                "KRW-ETH" => Ok(Some(daily_series("KRW-ETH", dec!(100), dec!(50)))),
                _ => Ok(Some(daily_series("KRW-XRP", dec!(10), dec!(2000)))),
            });

        let candidates = selector.refresh(&market_data).await.unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].market, "KRW-XRP");
    }

    #[tokio::test]
    async fn test_fetch_failure_skips_market_only() {
        let mut market_data = MockMarketData::new();
        market_data
            .expect_list_markets()
            .returning(|_| Ok(vec!["KRW-ETH".to_string(), "KRW-XRP".to_string()]));
        market_data
            .expect_get_series()
            .returning(|market, _, _| match market {
                "KRW-ETH" => Err(BotError::InvalidResponse("boom".to_string())),
                _ => Ok(Some(daily_series("KRW-XRP", dec!(10), dec!(2000)))),
            });

        let candidates = selector().refresh(&market_data).await.unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].market, "KRW-XRP");
    }
}
