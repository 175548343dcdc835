//! Population loading for profiler fitting
//!
//! A population is a CSV file with a header row naming the features and one
//! row per person. Columns are matched to the configured features by header
//! name (case-insensitive), so column order and extra columns don't matter.

use std::io::Read;
use std::path::Path;

use tracing::debug;

use super::SpendingVector;
use crate::error::{Error, Result};

/// Reference population shipped with the crate
const REFERENCE_POPULATION: &str = include_str!("../../../../config/spending_population.csv");

/// Load the embedded reference population for the given features
pub fn reference_population(features: &[String]) -> Result<Vec<SpendingVector>> {
    load_population(REFERENCE_POPULATION.as_bytes(), features)
}

/// Load a population from a CSV file
pub fn load_population_file(path: &Path, features: &[String]) -> Result<Vec<SpendingVector>> {
    let file = std::fs::File::open(path).map_err(|e| {
        Error::Config(format!("Failed to open population {}: {}", path.display(), e))
    })?;
    let population = load_population(file, features)?;
    debug!(path = %path.display(), rows = population.len(), "Loaded spending population");
    Ok(population)
}

/// Load a population from any CSV reader
pub fn load_population<R: Read>(reader: R, features: &[String]) -> Result<Vec<SpendingVector>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let columns = features
        .iter()
        .map(|feature| {
            headers
                .iter()
                .position(|h| h.eq_ignore_ascii_case(feature))
                .ok_or_else(|| {
                    Error::Config(format!("Population has no column for feature '{}'", feature))
                })
        })
        .collect::<Result<Vec<_>>>()?;

    let mut population = Vec::new();
    for (row, record) in rdr.records().enumerate() {
        let record = record?;
        let values = columns
            .iter()
            .zip(features)
            .map(|(&col, feature)| {
                let raw = record.get(col).unwrap_or("");
                raw.parse::<f64>().map_err(|_| {
                    Error::InvalidInput(format!(
                        "Population row {}: '{}' is not a number for {}",
                        row + 1,
                        raw,
                        feature
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        population.push(SpendingVector::new(values)?);
    }

    Ok(population)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn features() -> Vec<String> {
        vec!["food".into(), "transport".into(), "entertainment".into()]
    }

    #[test]
    fn test_reference_population_loads() {
        let population = reference_population(&features()).unwrap();
        assert!(population.len() >= 30);
        assert!(population.iter().all(|v| v.len() == 3));
    }

    #[test]
    fn test_columns_matched_by_header() {
        let csv = "Entertainment, Food ,extra,transport\n30,200,x,50\n";
        let population = load_population(csv.as_bytes(), &features()).unwrap();
        assert_eq!(population[0].values(), &[200.0, 50.0, 30.0]);
    }

    #[test]
    fn test_missing_column_is_config_error() {
        let csv = "food,transport\n1,2\n";
        let err = load_population(csv.as_bytes(), &features()).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_bad_value_is_invalid_input() {
        let csv = "food,transport,entertainment\n1,abc,3\n";
        let err = load_population(csv.as_bytes(), &features()).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(msg) if msg.contains("row 1")));

        let csv = "food,transport,entertainment\n1,-2,3\n";
        let err = load_population(csv.as_bytes(), &features()).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "food,transport,entertainment").unwrap();
        writeln!(file, "100,20,10").unwrap();
        writeln!(file, "900,300,400").unwrap();

        let population = load_population_file(file.path(), &features()).unwrap();
        assert_eq!(population.len(), 2);

        let err = load_population_file(Path::new("/nonexistent/pop.csv"), &features()).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
