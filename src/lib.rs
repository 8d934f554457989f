//! Generic generational genetic-algorithm engine plus one concrete candidate
//! encoding: portfolio allocation weights scored by a CVaR-adjusted
//! excess-return ratio over a shared historical-returns dataset.
//!
//! The engine ([`GeneticAlgorithm`]) only speaks the [`Chromosome`] contract;
//! [`Portfolio`] is the allocation candidate. Dataset loading and chart
//! rendering live outside this crate and talk to it through [`ReturnsTable`]
//! and the per-generation [`GenerationRecord`] history.

pub mod chromosome;
pub mod consts;
pub mod evolution;
pub mod portfolio;
pub mod returns;

pub use chromosome::{random_population, Chromosome, FitnessKey};
pub use evolution::{
    EvolutionConfig, EvolutionError, GenerationRecord, GeneticAlgorithm, SelectionStrategy,
};
pub use portfolio::{FitnessReport, Portfolio, PortfolioError};
pub use returns::{ReturnsError, ReturnsTable};
