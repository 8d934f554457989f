use crate::chromosome::Chromosome;
use crate::consts::{DEFAULT_CVAR_ALPHA, DEFAULT_RISK_FREE_RATE, PERTURBATION};
use crate::returns::ReturnsTable;
use itertools::Itertools;
use rand::distributions::Uniform;
use rand::prelude::*;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum PortfolioError {
    #[error("portfolio weights sum to zero and cannot be normalized")]
    DegenerateWeights,
    #[error("crossover requires both portfolios to hold the same asset set")]
    AssetMismatch,
    #[error("asset {0} is not present in the returns table")]
    UnknownAsset(String),
}

/// Expected return and tail risk that back a fitness score.
///
/// Returned alongside the score so callers never read a stale cached value:
/// a report belongs to the exact weights it was computed from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitnessReport {
    /// CVaR-adjusted excess-return ratio, higher is better.
    pub score: f64,
    /// Weighted sum of each asset's mean periodic return.
    pub expected_return: f64,
    /// Empirical conditional value at risk of the weighted return series.
    pub cvar: f64,
}

/// One candidate asset allocation.
///
/// Raw weights are kept unnormalized; [`Portfolio::weights`] normalizes on
/// demand. The returns table is shared read-only across the whole population.
#[derive(Debug, Clone)]
pub struct Portfolio {
    weights: BTreeMap<String, f64>,
    returns: Arc<ReturnsTable>,
    risk_free_rate: f64,
}

impl Portfolio {
    pub fn new(weights: BTreeMap<String, f64>, returns: Arc<ReturnsTable>) -> Self {
        Portfolio {
            weights,
            returns,
            risk_free_rate: DEFAULT_RISK_FREE_RATE,
        }
    }

    pub fn with_risk_free_rate(mut self, risk_free_rate: f64) -> Self {
        self.risk_free_rate = risk_free_rate;
        self
    }

    pub fn raw_weights(&self) -> &BTreeMap<String, f64> {
        &self.weights
    }

    pub fn risk_free_rate(&self) -> f64 {
        self.risk_free_rate
    }

    pub fn returns(&self) -> &Arc<ReturnsTable> {
        &self.returns
    }

    /// Normalized weights: every raw weight divided by the raw sum.
    ///
    /// Negative raw weights (short positions) keep their sign and relative
    /// proportion; the normalized values always sum to 1. A raw sum of exactly
    /// zero has no meaningful normalization and is a hard error.
    pub fn weights(&self) -> Result<BTreeMap<String, f64>, PortfolioError> {
        let total: f64 = self.weights.values().sum();
        if total == 0.0 {
            return Err(PortfolioError::DegenerateWeights);
        }
        Ok(self
            .weights
            .iter()
            .map(|(asset, &weight)| (asset.clone(), weight / total))
            .collect())
    }

    /// Score the allocation against the historical dataset.
    ///
    /// Expected return is the normalized-weight sum of per-asset mean returns.
    /// CVaR at confidence `alpha` is the mean of the worst `(1 - alpha)`
    /// fraction (at least one observation) of the weighted per-period return
    /// series. The score is the excess return over the risk-free rate per unit
    /// of tail-loss magnitude; when CVaR is exactly zero the magnitude of the
    /// expected return stands in as divisor, and a portfolio whose expected
    /// return is also zero scores 0.
    pub fn evaluate(&self, alpha: f64) -> Result<FitnessReport, PortfolioError> {
        let weights = self.weights()?;

        let mut expected_return = 0.0;
        let mut period_returns = vec![0.0; self.returns.periods()];
        for (asset, weight) in &weights {
            let series = self
                .returns
                .series(asset)
                .ok_or_else(|| PortfolioError::UnknownAsset(asset.clone()))?;
            expected_return += weight * series.mean();
            for (period, observed) in series.iter().enumerate() {
                period_returns[period] += weight * observed;
            }
        }

        period_returns.sort_by(f64::total_cmp);
        let tail_len = (((1.0 - alpha) * period_returns.len() as f64).ceil() as usize).max(1);
        let cvar = period_returns[..tail_len].mean();

        let downside = if cvar == 0.0 {
            expected_return.abs()
        } else {
            cvar.abs()
        };
        let score = if downside == 0.0 {
            0.0
        } else {
            (expected_return - self.risk_free_rate) / downside
        };

        Ok(FitnessReport {
            score,
            expected_return,
            cvar,
        })
    }
}

impl Chromosome for Portfolio {
    fn fitness(&self) -> anyhow::Result<f64> {
        Ok(self.evaluate(DEFAULT_CVAR_ALPHA)?.score)
    }

    /// Midpoint splice over the sorted asset list: child A takes the first
    /// half of weights from `self` and the rest from `partner`, child B takes
    /// the complement. Children share the returns table and inherit `self`'s
    /// risk-free rate.
    fn crossover(&self, partner: &Self, _rng: &mut dyn RngCore) -> anyhow::Result<(Self, Self)> {
        if !self.weights.keys().eq(partner.weights.keys()) {
            return Err(PortfolioError::AssetMismatch.into());
        }

        let mid = self.weights.len() / 2;
        let mut first_weights = BTreeMap::new();
        let mut second_weights = BTreeMap::new();
        for (position, asset) in self.weights.keys().enumerate() {
            let (for_first, for_second) = if position < mid {
                (self.weights[asset], partner.weights[asset])
            } else {
                (partner.weights[asset], self.weights[asset])
            };
            first_weights.insert(asset.clone(), for_first);
            second_weights.insert(asset.clone(), for_second);
        }

        let first = Portfolio {
            weights: first_weights,
            returns: Arc::clone(&self.returns),
            risk_free_rate: self.risk_free_rate,
        };
        let second = Portfolio {
            weights: second_weights,
            returns: Arc::clone(&self.returns),
            risk_free_rate: self.risk_free_rate,
        };
        Ok((first, second))
    }

    /// Perturb each weight independently with probability `mutation_rate` by a
    /// uniform draw from `[-PERTURBATION, PERTURBATION]`, flooring at zero.
    fn mutate(&mut self, mutation_rate: f64, rng: &mut dyn RngCore) {
        let jitter = Uniform::new_inclusive(-PERTURBATION, PERTURBATION);
        for weight in self.weights.values_mut() {
            if rng.gen::<f64>() < mutation_rate {
                *weight = (*weight + rng.sample(jitter)).max(0.0);
            }
        }
    }

    /// Fresh candidate over the template's assets with each raw weight drawn
    /// uniformly from [0, 1). No normalization happens here; the `weights`
    /// accessor normalizes lazily.
    fn random_instance(template: &Self, rng: &mut dyn RngCore) -> Self {
        let uniform = Uniform::new(0.0, 1.0);
        let weights = template
            .weights
            .keys()
            .map(|asset| (asset.clone(), rng.sample(uniform)))
            .collect();
        Portfolio {
            weights,
            returns: Arc::clone(&template.returns),
            risk_free_rate: template.risk_free_rate,
        }
    }
}

impl fmt::Display for Portfolio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = match self.weights() {
            Ok(weights) => weights
                .iter()
                .map(|(asset, weight)| format!("{asset}: {weight:.4}"))
                .join(", "),
            Err(_) => "degenerate".to_string(),
        };
        write!(
            f,
            "Portfolio(risk_free_rate: {}, weights: {{{rendered}}})",
            self.risk_free_rate
        )
    }
}
