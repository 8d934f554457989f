/// Tolerance used when comparing floats that should be equal after arithmetic.
pub const FLOAT_COMPARISON_EPSILON: f64 = 1e-7;

/// Half-width of the uniform interval a mutated weight is perturbed by.
pub const PERTURBATION: f64 = 0.1;

/// Baseline return used to compute excess return in the fitness ratio.
pub const DEFAULT_RISK_FREE_RATE: f64 = 0.2;

/// Confidence level for the empirical CVaR tail.
pub const DEFAULT_CVAR_ALPHA: f64 = 0.95;

/// Number of entrants drawn per tournament round.
pub const DEFAULT_TOURNAMENT_SIZE: usize = 3;
