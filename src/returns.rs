use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum ReturnsError {
    #[error("a returns table needs at least one asset")]
    NoAssets,
    #[error("a returns table needs at least one observation per asset")]
    NoObservations,
    #[error("asset {asset} has {got} observations, expected {expected}")]
    MisalignedSeries {
        asset: String,
        expected: usize,
        got: usize,
    },
}

/// Historical periodic returns, one time-aligned series per asset.
///
/// Built once by the data-loading collaborator and shared read-only (behind an
/// `Arc`) by every candidate in a population. Only shape is validated here;
/// the numeric content is the loader's responsibility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnsTable {
    series: BTreeMap<String, Vec<f64>>,
    periods: usize,
}

impl ReturnsTable {
    pub fn new(series: BTreeMap<String, Vec<f64>>) -> Result<Self, ReturnsError> {
        let periods = series
            .values()
            .next()
            .ok_or(ReturnsError::NoAssets)?
            .len();
        if periods == 0 {
            return Err(ReturnsError::NoObservations);
        }
        for (asset, observations) in &series {
            if observations.len() != periods {
                return Err(ReturnsError::MisalignedSeries {
                    asset: asset.clone(),
                    expected: periods,
                    got: observations.len(),
                });
            }
        }
        Ok(ReturnsTable { series, periods })
    }

    /// Number of observations every series holds.
    pub fn periods(&self) -> usize {
        self.periods
    }

    pub fn assets(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(String::as_str)
    }

    pub fn series(&self, asset: &str) -> Option<&[f64]> {
        self.series.get(asset).map(Vec::as_slice)
    }
}
