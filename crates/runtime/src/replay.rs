use std::io::{self, Write};

use portfolio::{EquityPoint, Portfolio, TradeRecord};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::logging::{RunLogEvent, RunLogEventKind, RunLogWriter};

pub const REPLAY_CSV_HEADER: &str = "t,total_value,side,price,shares,value,reason\n";

/// Writes a run as one CSV: an equity row per step, each followed by the
/// trades executed at that timestamp.
pub struct ReplayCsvWriter<W: Write> {
    writer: W,
}

impl<W: Write> ReplayCsvWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn write_header(&mut self) -> io::Result<()> {
        self.writer.write_all(REPLAY_CSV_HEADER.as_bytes())
    }

    pub fn write_run_and_log(
        &mut self,
        portfolio: &Portfolio,
        run_log_writer: &mut dyn RunLogWriter,
    ) -> io::Result<()> {
        self.write_header()?;
        self.append_run_rows(portfolio.equity_curve(), portfolio.trade_log())?;
        self.writer.flush()?;
        run_log_writer.write(RunLogEvent::new(
            portfolio.equity_curve().len() as u64,
            RunLogEventKind::ReplayArtifactWritten,
        ));
        Ok(())
    }

    pub fn append_run_rows(
        &mut self,
        equity_curve: &[EquityPoint],
        trade_log: &[TradeRecord],
    ) -> io::Result<()> {
        let mut trades = trade_log.iter().peekable();
        for point in equity_curve {
            writeln!(
                self.writer,
                "{},{},,,,,",
                format_timestamp(point.timestamp)?,
                point.total_value
            )?;
            while let Some(trade) = trades.next_if(|trade| trade.timestamp <= point.timestamp) {
                self.append_trade_row(trade)?;
            }
        }
        for trade in trades {
            self.append_trade_row(trade)?;
        }
        Ok(())
    }

    fn append_trade_row(&mut self, trade: &TradeRecord) -> io::Result<()> {
        writeln!(
            self.writer,
            "{},,{},{},{},{},{}",
            format_timestamp(trade.timestamp)?,
            trade.side.as_str(),
            trade.price,
            trade.shares,
            trade.value,
            trade.reason.as_str()
        )
    }
}

fn format_timestamp(timestamp: OffsetDateTime) -> io::Result<String> {
    timestamp.format(&Rfc3339).map_err(io::Error::other)
}
