use std::fmt;

use portfolio::{EquityPoint, Portfolio, TradeRecord, TradeSide};
use serde::Serialize;

pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;
const DAYS_PER_YEAR: f64 = 365.25;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PerformanceReport {
    pub initial_capital: f64,
    pub final_value: f64,
    pub total_return: f64,
    pub annualized_return: f64,
    pub sharpe_ratio: f64,
    pub max_drawdown: f64,
    pub completed_trades: usize,
    pub win_rate: f64,
}

impl PerformanceReport {
    pub fn from_portfolio(portfolio: &Portfolio) -> Option<Self> {
        Self::from_run(
            portfolio.initial_capital(),
            portfolio.equity_curve(),
            portfolio.trade_log(),
        )
    }

    /// `None` when there is no equity history to report on.
    pub fn from_run(
        initial_capital: f64,
        equity_curve: &[EquityPoint],
        trade_log: &[TradeRecord],
    ) -> Option<Self> {
        let first = equity_curve.first()?;
        let last = equity_curve.last()?;
        let final_value = last.total_value;
        let values: Vec<f64> = equity_curve.iter().map(|point| point.total_value).collect();

        let days = (last.timestamp - first.timestamp).whole_days();
        let annualized_return = if days > 0 {
            let years = days as f64 / DAYS_PER_YEAR;
            (final_value / initial_capital).powf(1.0 / years) - 1.0
        } else {
            0.0
        };

        let profits = paired_trade_profits(trade_log);
        let wins = profits.iter().filter(|profit| **profit > 0.0).count();
        let win_rate = if profits.is_empty() {
            0.0
        } else {
            wins as f64 / profits.len() as f64
        };

        Some(Self {
            initial_capital,
            final_value,
            total_return: (final_value - initial_capital) / initial_capital,
            annualized_return,
            sharpe_ratio: sharpe_ratio(&period_returns(&values)),
            max_drawdown: max_drawdown(&values),
            completed_trades: profits.len(),
            win_rate,
        })
    }
}

pub fn period_returns(values: &[f64]) -> Vec<f64> {
    values
        .windows(2)
        .map(|pair| pair[1] / pair[0] - 1.0)
        .collect()
}

/// Annualized mean/stdev of period returns; zero when the sample stdev is
/// zero or undefined.
pub fn sharpe_ratio(returns: &[f64]) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }

    let count = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / count;
    let variance = returns
        .iter()
        .map(|value| (value - mean).powi(2))
        .sum::<f64>()
        / (count - 1.0);
    let std_dev = variance.sqrt();

    if std_dev > 0.0 {
        mean / std_dev * TRADING_DAYS_PER_YEAR.sqrt()
    } else {
        0.0
    }
}

/// Most negative `(value - running_peak) / running_peak`; zero or below.
pub fn max_drawdown(values: &[f64]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut worst = 0.0_f64;
    for value in values {
        peak = peak.max(*value);
        if peak > 0.0 {
            worst = worst.min((value - peak) / peak);
        }
    }

    worst
}

/// Pairs the i-th buy with the i-th sell. Valid because positions never
/// overlap.
pub fn paired_trade_profits(trade_log: &[TradeRecord]) -> Vec<f64> {
    let buys = trade_log.iter().filter(|trade| trade.side == TradeSide::Buy);
    let sells = trade_log.iter().filter(|trade| trade.side == TradeSide::Sell);

    buys.zip(sells).map(|(buy, sell)| sell.value - buy.value).collect()
}

impl fmt::Display for PerformanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(30);
        writeln!(f, "{rule}")?;
        writeln!(f, "      Performance Report      ")?;
        writeln!(f, "{rule}")?;
        writeln!(f, "Initial Capital:   {}", format_currency(self.initial_capital))?;
        writeln!(f, "Final Value:       {}", format_currency(self.final_value))?;
        writeln!(f, "Total Return:      {}", format_percent(self.total_return))?;
        writeln!(f, "Annualized Return: {}", format_percent(self.annualized_return))?;
        writeln!(f, "Sharpe Ratio:      {:.2}", self.sharpe_ratio)?;
        writeln!(f, "Max Drawdown:      {}", format_percent(self.max_drawdown))?;
        writeln!(f, "Total Trades:      {}", self.completed_trades)?;
        writeln!(f, "Win Rate:          {}", format_percent(self.win_rate))?;
        write!(f, "{rule}")
    }
}

fn format_percent(fraction: f64) -> String {
    format!("{:.2}%", fraction * 100.0)
}

fn format_currency(amount: f64) -> String {
    let fixed = format!("{:.2}", amount.abs());
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (index, digit) in whole.chars().enumerate() {
        if index > 0 && (whole.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if amount < 0.0 { "-" } else { "" };
    format!("{sign}${grouped}.{cents}")
}
