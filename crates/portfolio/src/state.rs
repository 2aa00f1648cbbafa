use time::OffsetDateTime;
use tracing::debug;

use crate::config::PortfolioConfig;
use crate::market::is_tradable_price;
use crate::records::{EquityPoint, TradeReason, TradeRecord, TradeSide};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionState {
    Flat,
    Long,
}

/// Cash, a single long position and the audit logs for one run.
///
/// `mark`, `check_risk`, `buy` and `sell` are the only mutators, and each
/// of them appends to the equity curve or the trade log.
#[derive(Debug, Clone)]
pub struct Portfolio {
    config: PortfolioConfig,
    cash: f64,
    holdings: f64,
    entry_price: f64,
    total_value: f64,
    equity_curve: Vec<EquityPoint>,
    trade_log: Vec<TradeRecord>,
}

impl Portfolio {
    pub fn new(config: PortfolioConfig) -> Self {
        let initial_capital = config.initial_capital();
        Self {
            config,
            cash: initial_capital,
            holdings: 0.0,
            entry_price: 0.0,
            total_value: initial_capital,
            equity_curve: Vec::new(),
            trade_log: Vec::new(),
        }
    }

    pub fn config(&self) -> &PortfolioConfig {
        &self.config
    }

    pub fn initial_capital(&self) -> f64 {
        self.config.initial_capital()
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn holdings(&self) -> f64 {
        self.holdings
    }

    pub fn entry_price(&self) -> f64 {
        self.entry_price
    }

    /// Value as of the most recent `mark`.
    pub fn total_value(&self) -> f64 {
        self.total_value
    }

    pub fn position_state(&self) -> PositionState {
        if self.holdings > 0.0 {
            PositionState::Long
        } else {
            PositionState::Flat
        }
    }

    pub fn is_long(&self) -> bool {
        self.position_state() == PositionState::Long
    }

    pub fn equity_curve(&self) -> &[EquityPoint] {
        &self.equity_curve
    }

    pub fn trade_log(&self) -> &[TradeRecord] {
        &self.trade_log
    }

    pub fn mark(&mut self, price: f64, timestamp: OffsetDateTime) {
        self.total_value = self.cash + self.holdings * price;
        self.equity_curve.push(EquityPoint {
            timestamp,
            total_value: self.total_value,
        });
    }

    /// Sells the whole position when a stop-loss or take-profit limit is
    /// breached. Returns `true` only when a forced sell happened.
    pub fn check_risk(&mut self, price: f64, timestamp: OffsetDateTime) -> bool {
        let limits = self.config.risk();
        if !self.is_long() || !limits.is_enabled() || !is_tradable_price(price) {
            return false;
        }

        match limits.evaluate(self.entry_price, price) {
            Some(reason) => {
                self.sell(price, timestamp, reason);
                true
            }
            None => false,
        }
    }

    pub fn buy(&mut self, price: f64, timestamp: OffsetDateTime) {
        if self.is_long() || !is_tradable_price(price) {
            return;
        }

        let invest_amount = self.cash * self.config.position_size();
        let shares = invest_amount / price;
        if !shares.is_finite() || shares <= 0.0 {
            return;
        }
        let cost = shares * price;

        self.cash -= cost;
        self.holdings = shares;
        self.entry_price = price;

        debug!(%timestamp, price, shares, cost, "opened position");
        self.trade_log.push(TradeRecord {
            side: TradeSide::Buy,
            timestamp,
            price,
            shares,
            value: cost,
            reason: TradeReason::Signal,
        });
    }

    pub fn sell(&mut self, price: f64, timestamp: OffsetDateTime, reason: TradeReason) {
        if !self.is_long() || !is_tradable_price(price) {
            return;
        }

        let shares = self.holdings;
        let revenue = shares * price;
        self.cash += revenue;

        debug!(%timestamp, price, shares, revenue, reason = reason.as_str(), "closed position");
        self.trade_log.push(TradeRecord {
            side: TradeSide::Sell,
            timestamp,
            price,
            shares,
            value: revenue,
            reason,
        });

        self.holdings = 0.0;
        self.entry_price = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;
    use time::OffsetDateTime;

    use super::{Portfolio, PositionState};
    use crate::config::PortfolioConfig;
    use crate::records::{TradeReason, TradeSide};

    const DAY_1: OffsetDateTime = datetime!(2024-01-01 0:00 UTC);
    const DAY_2: OffsetDateTime = datetime!(2024-01-02 0:00 UTC);
    const DAY_3: OffsetDateTime = datetime!(2024-01-03 0:00 UTC);

    fn portfolio(stop_loss: Option<f64>, take_profit: Option<f64>) -> Portfolio {
        Portfolio::new(PortfolioConfig::new(10_000.0, 1.0, stop_loss, take_profit).unwrap())
    }

    fn assert_co_valid(portfolio: &Portfolio) {
        assert_eq!(portfolio.holdings() > 0.0, portfolio.entry_price() > 0.0);
    }

    #[test]
    fn starts_flat_with_initial_capital() {
        let portfolio = portfolio(None, None);

        assert_eq!(portfolio.position_state(), PositionState::Flat);
        assert_eq!(portfolio.cash(), 10_000.0);
        assert_eq!(portfolio.total_value(), 10_000.0);
        assert!(portfolio.equity_curve().is_empty());
        assert!(portfolio.trade_log().is_empty());
        assert_co_valid(&portfolio);
    }

    #[test]
    fn mark_values_holdings_at_step_price() {
        let mut portfolio = portfolio(None, None);
        portfolio.buy(100.0, DAY_1);

        portfolio.mark(110.0, DAY_2);

        assert_eq!(portfolio.total_value(), 11_000.0);
        assert_eq!(portfolio.equity_curve().len(), 1);
        assert_eq!(portfolio.equity_curve()[0].timestamp, DAY_2);
        assert_eq!(portfolio.equity_curve()[0].total_value, 11_000.0);
    }

    #[test]
    fn buy_invests_position_fraction_of_cash() {
        let config = PortfolioConfig::new(10_000.0, 0.5, None, None).unwrap();
        let mut portfolio = Portfolio::new(config);

        portfolio.buy(50.0, DAY_1);

        assert_eq!(portfolio.holdings(), 100.0);
        assert_eq!(portfolio.cash(), 5_000.0);
        assert_eq!(portfolio.entry_price(), 50.0);
        let trade = portfolio.trade_log()[0];
        assert_eq!(trade.side, TradeSide::Buy);
        assert_eq!(trade.value, 5_000.0);
        assert_eq!(trade.reason, TradeReason::Signal);
        assert_co_valid(&portfolio);
    }

    #[test]
    fn second_buy_while_long_is_a_no_op() {
        let mut portfolio = portfolio(None, None);

        portfolio.buy(100.0, DAY_1);
        portfolio.buy(80.0, DAY_2);

        assert_eq!(portfolio.trade_log().len(), 1);
        assert_eq!(portfolio.holdings(), 100.0);
        assert_eq!(portfolio.entry_price(), 100.0);
    }

    #[test]
    fn buy_ignores_non_positive_price() {
        let mut portfolio = portfolio(None, None);

        portfolio.buy(0.0, DAY_1);
        portfolio.buy(-5.0, DAY_1);
        portfolio.buy(f64::NAN, DAY_1);

        assert_eq!(portfolio.position_state(), PositionState::Flat);
        assert!(portfolio.trade_log().is_empty());
        assert_eq!(portfolio.cash(), 10_000.0);
    }

    #[test]
    fn sell_while_flat_is_a_no_op() {
        let mut portfolio = portfolio(None, None);

        portfolio.sell(100.0, DAY_1, TradeReason::Signal);

        assert!(portfolio.trade_log().is_empty());
        assert_eq!(portfolio.cash(), 10_000.0);
    }

    #[test]
    fn sell_liquidates_entire_position_and_resets_entry() {
        let mut portfolio = portfolio(None, None);
        portfolio.buy(100.0, DAY_1);

        portfolio.sell(120.0, DAY_2, TradeReason::Signal);

        assert_eq!(portfolio.position_state(), PositionState::Flat);
        assert_eq!(portfolio.cash(), 12_000.0);
        assert_eq!(portfolio.entry_price(), 0.0);
        let trade = portfolio.trade_log()[1];
        assert_eq!(trade.side, TradeSide::Sell);
        assert_eq!(trade.shares, 100.0);
        assert_eq!(trade.value, 12_000.0);
        assert_co_valid(&portfolio);
    }

    #[test]
    fn sell_ignores_non_positive_price_and_stays_long() {
        let mut portfolio = portfolio(None, None);
        portfolio.buy(100.0, DAY_1);

        portfolio.sell(0.0, DAY_2, TradeReason::Signal);

        assert!(portfolio.is_long());
        assert_eq!(portfolio.trade_log().len(), 1);
        assert_co_valid(&portfolio);
    }

    #[test]
    fn check_risk_is_false_when_flat() {
        let mut portfolio = portfolio(Some(0.05), Some(0.05));

        assert!(!portfolio.check_risk(1.0, DAY_1));
        assert!(portfolio.trade_log().is_empty());
    }

    #[test]
    fn check_risk_is_false_without_configured_limits() {
        let mut portfolio = portfolio(None, None);
        portfolio.buy(100.0, DAY_1);

        assert!(!portfolio.check_risk(1.0, DAY_2));
        assert!(portfolio.is_long());
    }

    #[test]
    fn check_risk_ignores_untradable_price() {
        let mut portfolio = portfolio(Some(0.05), None);
        portfolio.buy(100.0, DAY_1);

        assert!(!portfolio.check_risk(0.0, DAY_2));
        assert!(portfolio.is_long());
    }

    #[test]
    fn stop_loss_takes_priority_over_take_profit() {
        let mut portfolio = portfolio(Some(0.05), Some(0.05));
        portfolio.buy(100.0, DAY_1);

        let forced = portfolio.check_risk(94.0, DAY_2);

        assert!(forced);
        let exit = portfolio.trade_log()[1];
        assert_eq!(exit.reason, TradeReason::StopLoss);
        assert_eq!(exit.price, 94.0);
        assert_eq!(portfolio.position_state(), PositionState::Flat);
    }

    #[test]
    fn take_profit_forces_sell_above_threshold() {
        let mut portfolio = portfolio(None, Some(0.1));
        portfolio.buy(100.0, DAY_1);

        assert!(!portfolio.check_risk(105.0, DAY_2));
        assert!(portfolio.check_risk(111.0, DAY_3));

        assert_eq!(portfolio.trade_log()[1].reason, TradeReason::TakeProfit);
        assert_eq!(portfolio.cash(), 11_100.0);
    }
}
