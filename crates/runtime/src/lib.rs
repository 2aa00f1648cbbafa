pub mod data;
pub mod engine;
pub mod logging;
pub mod metrics;
pub mod replay;

pub use engine::{run_backtest, run_backtest_with_log, BacktestError, BacktestRun, SimEngine};
pub use metrics::PerformanceReport;

#[cfg(test)]
mod tests {
    use portfolio::{PortfolioConfig, PricePoint};
    use strategy::{Signal, SignalPoint};
    use time::macros::datetime;

    use crate::logging::{InMemoryRunLogWriter, RunLogEventKind};
    use crate::metrics::PerformanceReport;

    #[test]
    fn engine_emits_journal_in_expected_order() {
        let day_1 = datetime!(2024-01-01 0:00 UTC);
        let day_2 = datetime!(2024-01-02 0:00 UTC);
        let prices = [PricePoint::new(day_1, 100.0), PricePoint::new(day_2, 105.0)];
        let signals = [SignalPoint::new(day_1, Signal::Buy)];
        let mut log = InMemoryRunLogWriter::new();

        crate::run_backtest_with_log(&prices, &signals, PortfolioConfig::default(), &mut log)
            .unwrap();
        let kinds: Vec<RunLogEventKind> = log.events().iter().map(|event| event.kind).collect();

        assert_eq!(
            kinds,
            vec![
                RunLogEventKind::StepMarked,
                RunLogEventKind::SignalApplied(Signal::Buy),
                RunLogEventKind::StepMarked,
                RunLogEventKind::EndOfBacktestLiquidated,
            ]
        );
    }

    #[test]
    fn report_is_built_from_finished_run() {
        let day_1 = datetime!(2024-01-01 0:00 UTC);
        let day_2 = datetime!(2024-01-02 0:00 UTC);
        let prices = [PricePoint::new(day_1, 100.0), PricePoint::new(day_2, 105.0)];
        let signals = [SignalPoint::new(day_1, Signal::Buy)];

        let run = crate::run_backtest(&prices, &signals, PortfolioConfig::default()).unwrap();
        let report = PerformanceReport::from_portfolio(&run.portfolio).unwrap();

        assert_eq!(report.final_value, 10_500.0);
        assert_eq!(report.completed_trades, 1);
        assert_eq!(report.win_rate, 1.0);
    }
}
