//! Local CSV price history: parsing, cleaning and date filtering.

use std::io;
use std::path::Path;

use portfolio::{is_tradable_price, PricePoint};
use serde::Deserialize;
use thiserror::Error;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime};
use tracing::debug;

#[derive(Debug, Error)]
pub enum DataError {
    #[error("failed to read price csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("row {row}: '{value}' is neither an RFC 3339 timestamp nor a YYYY-MM-DD date")]
    InvalidTimestamp { row: usize, value: String },
    #[error("no usable price rows after cleaning")]
    NoData,
}

/// Inclusive calendar-date window; open on either side when `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateRange {
    pub start: Option<Date>,
    pub end: Option<Date>,
}

impl DateRange {
    pub fn contains(&self, timestamp: OffsetDateTime) -> bool {
        let date = timestamp.date();
        self.start.map_or(true, |start| date >= start) && self.end.map_or(true, |end| date <= end)
    }
}

/// Accepts `timestamp,close` as well as daily exports headed `Date,...,Close`;
/// other columns are ignored.
#[derive(Debug, Deserialize)]
struct RawPriceRow {
    #[serde(alias = "Date", alias = "date")]
    timestamp: String,
    #[serde(alias = "Close")]
    close: Option<f64>,
}

pub fn load_prices<P: AsRef<Path>>(path: P, range: DateRange) -> Result<Vec<PricePoint>, DataError> {
    let reader = csv::Reader::from_path(path)?;
    collect_prices(reader, range)
}

pub fn read_prices<R: io::Read>(reader: R, range: DateRange) -> Result<Vec<PricePoint>, DataError> {
    collect_prices(csv::Reader::from_reader(reader), range)
}

fn collect_prices<R: io::Read>(
    mut reader: csv::Reader<R>,
    range: DateRange,
) -> Result<Vec<PricePoint>, DataError> {
    let mut rows = Vec::new();
    for (index, record) in reader.deserialize::<RawPriceRow>().enumerate() {
        let record = record?;
        let timestamp = parse_timestamp(record.timestamp.trim()).ok_or_else(|| {
            DataError::InvalidTimestamp {
                row: index + 1,
                value: record.timestamp.clone(),
            }
        })?;
        rows.push((timestamp, record.close));
    }

    let prices: Vec<PricePoint> = clean_prices(rows)
        .into_iter()
        .filter(|point| range.contains(point.timestamp))
        .collect();

    if prices.is_empty() {
        return Err(DataError::NoData);
    }
    Ok(prices)
}

/// Sorts by timestamp, keeps the last row per timestamp, forward-fills
/// missing closes and drops rows that stay missing or are not positive.
pub fn clean_prices(mut rows: Vec<(OffsetDateTime, Option<f64>)>) -> Vec<PricePoint> {
    rows.sort_by_key(|(timestamp, _)| *timestamp);

    let mut deduped: Vec<(OffsetDateTime, Option<f64>)> = Vec::with_capacity(rows.len());
    for row in rows {
        match deduped.last_mut() {
            Some(last) if last.0 == row.0 => *last = row,
            _ => deduped.push(row),
        }
    }

    let raw_rows = deduped.len();
    let mut last_close = None;
    let prices: Vec<PricePoint> = deduped
        .into_iter()
        .filter_map(|(timestamp, close)| {
            let close = close.filter(|value| value.is_finite()).or(last_close);
            last_close = close;
            close.map(|close| PricePoint::new(timestamp, close))
        })
        .filter(|point| is_tradable_price(point.close))
        .collect();

    debug!(raw_rows, kept_rows = prices.len(), "cleaned price rows");
    prices
}

fn parse_timestamp(value: &str) -> Option<OffsetDateTime> {
    if let Ok(timestamp) = OffsetDateTime::parse(value, &Rfc3339) {
        return Some(timestamp);
    }

    parse_date(value).map(|date| date.midnight().assume_utc())
}

pub fn parse_date(value: &str) -> Option<Date> {
    Date::parse(value, format_description!("[year]-[month]-[day]")).ok()
}

#[cfg(test)]
mod tests {
    use time::macros::{date, datetime};

    use super::{clean_prices, parse_date, read_prices, DataError, DateRange};

    #[test]
    fn parses_dates_and_rfc3339_timestamps() {
        let csv = "timestamp,close\n2024-01-02,100.5\n2024-01-03T16:00:00Z,101.0\n";

        let prices = read_prices(csv.as_bytes(), DateRange::default()).unwrap();

        assert_eq!(prices.len(), 2);
        assert_eq!(prices[0].timestamp, datetime!(2024-01-02 0:00 UTC));
        assert_eq!(prices[1].timestamp, datetime!(2024-01-03 16:00 UTC));
        assert_eq!(prices[1].close, 101.0);
    }

    #[test]
    fn reads_daily_export_headers() {
        let csv = "Date,Open,High,Low,Close,Volume\n\
                   2024-01-02,99.0,101.0,98.5,100.5,1200\n\
                   2024-01-03,100.5,102.0,100.0,101.0,900\n";

        let prices = read_prices(csv.as_bytes(), DateRange::default()).unwrap();

        assert_eq!(prices.len(), 2);
        assert_eq!(prices[0].timestamp, datetime!(2024-01-02 0:00 UTC));
        assert_eq!(prices[1].close, 101.0);
    }

    #[test]
    fn forward_fills_gaps_and_drops_leading_missing_rows() {
        let csv = "timestamp,close\n2024-01-01,\n2024-01-02,10\n2024-01-03,\n2024-01-04,12\n";

        let prices = read_prices(csv.as_bytes(), DateRange::default()).unwrap();
        let closes: Vec<f64> = prices.iter().map(|point| point.close).collect();

        assert_eq!(closes, vec![10.0, 10.0, 12.0]);
        assert_eq!(prices[0].timestamp, datetime!(2024-01-02 0:00 UTC));
    }

    #[test]
    fn sorts_rows_and_keeps_last_duplicate() {
        let rows = vec![
            (datetime!(2024-01-03 0:00 UTC), Some(3.0)),
            (datetime!(2024-01-01 0:00 UTC), Some(1.0)),
            (datetime!(2024-01-03 0:00 UTC), Some(4.0)),
        ];

        let prices = clean_prices(rows);

        assert_eq!(prices.len(), 2);
        assert_eq!(prices[0].close, 1.0);
        assert_eq!(prices[1].close, 4.0);
    }

    #[test]
    fn drops_non_positive_closes() {
        let rows = vec![
            (datetime!(2024-01-01 0:00 UTC), Some(0.0)),
            (datetime!(2024-01-02 0:00 UTC), Some(-1.0)),
            (datetime!(2024-01-03 0:00 UTC), Some(5.0)),
        ];

        let prices = clean_prices(rows);

        assert_eq!(prices.len(), 1);
        assert_eq!(prices[0].close, 5.0);
    }

    #[test]
    fn filters_inclusive_date_range() {
        let csv = "timestamp,close\n2024-01-01,1\n2024-01-02,2\n2024-01-03,3\n2024-01-04,4\n";
        let range = DateRange {
            start: Some(date!(2024-01-02)),
            end: Some(date!(2024-01-03)),
        };

        let prices = read_prices(csv.as_bytes(), range).unwrap();
        let closes: Vec<f64> = prices.iter().map(|point| point.close).collect();

        assert_eq!(closes, vec![2.0, 3.0]);
    }

    #[test]
    fn reports_invalid_timestamps_with_row_number() {
        let csv = "timestamp,close\n2024-01-01,1\nyesterday,2\n";

        let err = read_prices(csv.as_bytes(), DateRange::default()).unwrap_err();

        assert!(matches!(
            err,
            DataError::InvalidTimestamp { row: 2, ref value } if value == "yesterday"
        ));
    }

    #[test]
    fn empty_result_is_an_error() {
        let csv = "timestamp,close\n2024-01-01,\n";

        let err = read_prices(csv.as_bytes(), DateRange::default()).unwrap_err();

        assert!(matches!(err, DataError::NoData));
    }

    #[test]
    fn parses_plain_dates() {
        assert_eq!(parse_date("2015-01-01"), Some(date!(2015-01-01)));
        assert_eq!(parse_date("01/01/2015"), None);
    }
}
