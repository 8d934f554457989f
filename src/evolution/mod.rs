use crate::chromosome::{Chromosome, FitnessKey};
use crate::consts::DEFAULT_TOURNAMENT_SIZE;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum EvolutionError {
    #[error("invalid engine configuration: {0}")]
    InvalidConfiguration(String),
    /// An error raised by a chromosome operation. Aborts the run; history
    /// recorded up to that point stays readable.
    #[error(transparent)]
    Chromosome(#[from] anyhow::Error),
}

/// How parents are picked each reproduction round. Tagged so further
/// strategies can slot in without touching the generational loop.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum SelectionStrategy {
    /// Draw `size` entrants with replacement, keep the two fittest. A size of
    /// one duplicates the sole entrant as both parents.
    Tournament { size: usize },
}

impl Default for SelectionStrategy {
    fn default() -> Self {
        SelectionStrategy::Tournament {
            size: DEFAULT_TOURNAMENT_SIZE,
        }
    }
}

fn default_elitism() -> bool {
    true
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct EvolutionConfig {
    /// Fitness at which the run stops early.
    pub threshold: f64,
    pub max_generations: usize,
    /// Probability, per candidate per generation, that it mutates. Also the
    /// per-gene rate handed to [`Chromosome::mutate`].
    pub mutation_rate: f64,
    /// Probability that a selected parent pair is replaced by its offspring.
    pub crossover_rate: f64,
    #[serde(default)]
    pub selection: SelectionStrategy,
    #[serde(default = "default_elitism")]
    pub elitism: bool,
    /// Seed for the engine's random source. `None` seeds from entropy;
    /// setting it makes a run fully reproducible.
    #[serde(default)]
    pub seed: Option<u64>,
}

/// One row of the per-generation history, consumed by external reporting
/// after `run` completes.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct GenerationRecord {
    pub generation: usize,
    /// Fitness of the best candidate seen so far (running best, so the
    /// sequence is non-decreasing).
    pub best_fitness: f64,
    /// Mean fitness of the population entering this generation.
    pub mean_fitness: f64,
}

/// Single-population, synchronous, generational evolutionary engine.
///
/// Generic over any [`Chromosome`]; it knows nothing about what the genes
/// encode. Each generation: record history, stop if the threshold is met,
/// reproduce via the selection strategy and the crossover roll, splice elites
/// back in, then give every candidate an independent chance to mutate.
pub struct GeneticAlgorithm<C: Chromosome> {
    population: Vec<C>,
    config: EvolutionConfig,
    fitness_key: FitnessKey<C>,
    rng: StdRng,
    history: Vec<GenerationRecord>,
}

impl<C: Chromosome + std::fmt::Debug> std::fmt::Debug for GeneticAlgorithm<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeneticAlgorithm")
            .field("population", &self.population)
            .field("config", &self.config)
            .field("history", &self.history)
            .finish_non_exhaustive()
    }
}

impl<C: Chromosome> GeneticAlgorithm<C> {
    pub fn new(population: Vec<C>, config: EvolutionConfig) -> Result<Self, EvolutionError> {
        if population.is_empty() {
            return Err(EvolutionError::InvalidConfiguration(
                "population cannot be empty".into(),
            ));
        }
        if !(0.0..=1.0).contains(&config.mutation_rate) {
            return Err(EvolutionError::InvalidConfiguration(format!(
                "mutation rate must lie in [0, 1], got {}",
                config.mutation_rate
            )));
        }
        if !(0.0..=1.0).contains(&config.crossover_rate) {
            return Err(EvolutionError::InvalidConfiguration(format!(
                "crossover rate must lie in [0, 1], got {}",
                config.crossover_rate
            )));
        }
        let SelectionStrategy::Tournament { size } = config.selection;
        if size == 0 {
            return Err(EvolutionError::InvalidConfiguration(
                "tournament size must be at least 1".into(),
            ));
        }

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(GeneticAlgorithm {
            population,
            config,
            fitness_key: Box::new(|chromosome: &C| chromosome.fitness()),
            rng,
            history: Vec::new(),
        })
    }

    /// Replace the default fitness accessor (which delegates to
    /// [`Chromosome::fitness`]) with an injected one.
    pub fn with_fitness_key(mut self, fitness_key: FitnessKey<C>) -> Self {
        self.fitness_key = fitness_key;
        self
    }

    pub fn population(&self) -> &[C] {
        &self.population
    }

    /// Per-generation records accumulated by [`GeneticAlgorithm::run`].
    pub fn history(&self) -> &[GenerationRecord] {
        &self.history
    }

    /// Drive the generational loop and return the best candidate found,
    /// judged by the fitness accessor with ties broken by first appearance.
    pub fn run(&mut self) -> Result<C, EvolutionError> {
        let mut scores = self.score_population(&self.population)?;
        let (best_index, mut best_score) = argmax(&scores);
        let mut best = self.population[best_index].clone();

        for generation in 0..self.config.max_generations {
            let mean_fitness = (&scores).mean();
            self.history.push(GenerationRecord {
                generation,
                best_fitness: best_score,
                mean_fitness,
            });
            info!(
                generation,
                best_fitness = best_score,
                mean_fitness,
                "generation summary"
            );

            if best_score >= self.config.threshold {
                debug!(best_fitness = best_score, "threshold reached, stopping");
                break;
            }

            let offspring = self.reproduce(&scores)?;
            self.population = if self.config.elitism {
                self.apply_elitism(offspring, &scores)?
            } else {
                offspring
            };
            self.mutate_population();

            scores = self.score_population(&self.population)?;
            let (index, score) = argmax(&scores);
            if score > best_score {
                best = self.population[index].clone();
                best_score = score;
            }
        }

        Ok(best)
    }

    fn score_population(&self, population: &[C]) -> Result<Vec<f64>, EvolutionError> {
        let scores = population
            .par_iter()
            .map(|chromosome| (self.fitness_key)(chromosome))
            .collect::<anyhow::Result<Vec<f64>>>()?;
        Ok(scores)
    }

    /// Assemble the next population: tournament parents, a crossover roll per
    /// pair, and copies of the parents when the roll fails. Each round adds
    /// exactly two, so any overshoot past the target size is a single
    /// candidate, which is dropped.
    fn reproduce(&mut self, scores: &[f64]) -> Result<Vec<C>, EvolutionError> {
        let target = self.population.len();
        let mut next = Vec::with_capacity(target + 1);
        while next.len() < target {
            let (first, second) = self.pick_parents(scores);
            if self.rng.gen::<f64>() < self.config.crossover_rate {
                let (child_a, child_b) =
                    self.population[first].crossover(&self.population[second], &mut self.rng)?;
                next.push(child_a);
                next.push(child_b);
            } else {
                next.push(self.population[first].clone());
                next.push(self.population[second].clone());
            }
        }
        if next.len() > target {
            next.pop();
        }
        Ok(next)
    }

    fn pick_parents(&mut self, scores: &[f64]) -> (usize, usize) {
        match self.config.selection {
            SelectionStrategy::Tournament { size } => {
                let population_size = self.population.len();
                let mut entrants: Vec<usize> = (0..size)
                    .map(|_| self.rng.gen_range(0..population_size))
                    .collect();
                entrants.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));
                if entrants.len() >= 2 {
                    (entrants[0], entrants[1])
                } else {
                    (entrants[0], entrants[0])
                }
            }
        }
    }

    /// Carry the top `max(1, N / 10)` of the parent generation into the
    /// offspring, displacing its weakest members. Population size is
    /// preserved.
    fn apply_elitism(
        &self,
        offspring: Vec<C>,
        parent_scores: &[f64],
    ) -> Result<Vec<C>, EvolutionError> {
        let target = self.population.len();
        let elite_count = (target / 10).max(1);

        let mut parent_order: Vec<usize> = (0..target).collect();
        parent_order.sort_by(|&a, &b| parent_scores[b].total_cmp(&parent_scores[a]));

        let offspring_scores = self.score_population(&offspring)?;
        let mut ranked_offspring: Vec<(C, f64)> =
            offspring.into_iter().zip(offspring_scores).collect();
        ranked_offspring.sort_by(|a, b| b.1.total_cmp(&a.1));

        debug!(elite_count, "splicing elites into offspring");
        let mut next: Vec<C> = parent_order
            .iter()
            .take(elite_count)
            .map(|&index| self.population[index].clone())
            .collect();
        next.extend(
            ranked_offspring
                .into_iter()
                .take(target - elite_count)
                .map(|(chromosome, _)| chromosome),
        );
        Ok(next)
    }

    /// One Bernoulli trial per candidate per generation; winners mutate
    /// themselves at the configured rate.
    fn mutate_population(&mut self) {
        let rate = self.config.mutation_rate;
        for chromosome in self.population.iter_mut() {
            if self.rng.gen::<f64>() < rate {
                chromosome.mutate(rate, &mut self.rng);
            }
        }
    }
}

fn argmax(scores: &[f64]) -> (usize, f64) {
    let mut best_index = 0;
    let mut best_score = scores[0];
    for (index, &score) in scores.iter().enumerate().skip(1) {
        if score > best_score {
            best_index = index;
            best_score = score;
        }
    }
    (best_index, best_score)
}
