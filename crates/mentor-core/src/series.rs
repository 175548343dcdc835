//! Dated spending series
//!
//! Loads `date,amount` CSV files into a chronologically ordered series that
//! the forecasters consume as plain values. Dates use `YYYY-MM-DD`; rows may
//! appear in any order.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// One observation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DatedAmount {
    pub date: NaiveDate,
    pub amount: f64,
}

/// Observations sorted by date
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TimeSeries {
    points: Vec<DatedAmount>,
}

#[derive(Debug, Deserialize)]
struct Row {
    date: String,
    amount: String,
}

impl TimeSeries {
    /// Build from unordered observations; the sort is stable for equal dates
    pub fn new(mut points: Vec<DatedAmount>) -> Result<Self> {
        if let Some(bad) = points.iter().find(|p| !p.amount.is_finite()) {
            return Err(Error::InvalidInput(format!(
                "non-finite amount on {}",
                bad.date
            )));
        }
        points.sort_by_key(|p| p.date);
        Ok(Self { points })
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut points = Vec::new();
        for (i, result) in rdr.deserialize::<Row>().enumerate() {
            let row = result?;
            let line = i + 2;
            let date = NaiveDate::parse_from_str(&row.date, DATE_FORMAT).map_err(|e| {
                Error::InvalidInput(format!("line {}: bad date '{}': {}", line, row.date, e))
            })?;
            let amount = row
                .amount
                .replace(['$', ','], "")
                .parse::<f64>()
                .map_err(|_| {
                    Error::InvalidInput(format!("line {}: bad amount '{}'", line, row.amount))
                })?;
            points.push(DatedAmount { date, amount });
        }

        Self::new(points)
    }

    pub fn points(&self) -> &[DatedAmount] {
        &self.points
    }

    /// Amounts in date order
    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.amount).collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Sum amounts per calendar month, one point per month dated the 1st
    ///
    /// Months without observations are absent rather than zero.
    pub fn monthly_totals(&self) -> TimeSeries {
        let mut months: BTreeMap<(i32, u32), f64> = BTreeMap::new();
        for p in &self.points {
            *months.entry((p.date.year(), p.date.month())).or_default() += p.amount;
        }

        let points = months
            .into_iter()
            .filter_map(|((year, month), amount)| {
                NaiveDate::from_ymd_opt(year, month, 1).map(|date| DatedAmount { date, amount })
            })
            .collect();
        TimeSeries { points }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DATE_FORMAT).unwrap()
    }

    #[test]
    fn test_rows_sorted_by_date() {
        let csv = "date,amount\n2024-03-01,30\n2024-01-01,10\n2024-02-01,\"$1,020.50\"\n";
        let series = TimeSeries::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(series.values(), vec![10.0, 1020.5, 30.0]);
        assert_eq!(series.points()[0].date, date("2024-01-01"));
    }

    #[test]
    fn test_bad_rows_report_line() {
        let csv = "date,amount\n2024-01-01,10\n01/02/2024,20\n";
        let err = TimeSeries::from_reader(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(msg) if msg.contains("line 3")));

        let csv = "date,amount\n2024-01-01,ten\n";
        assert!(matches!(
            TimeSeries::from_reader(csv.as_bytes()),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_monthly_totals() {
        let csv = "date,amount\n2024-01-05,10\n2024-01-20,15\n2024-03-02,7\n";
        let monthly = TimeSeries::from_reader(csv.as_bytes())
            .unwrap()
            .monthly_totals();
        assert_eq!(monthly.values(), vec![25.0, 7.0]);
        assert_eq!(monthly.points()[1].date, date("2024-03-01"));
    }

    #[test]
    fn test_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spend.csv");
        std::fs::write(&path, "date,amount\n2024-01-01,1\n2024-01-02,2\n").unwrap();
        assert_eq!(TimeSeries::from_path(&path).unwrap().len(), 2);

        assert!(matches!(
            TimeSeries::from_path(&dir.path().join("missing.csv")),
            Err(Error::Io(_))
        ));
    }
}
