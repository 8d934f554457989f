use anyhow::Result;
use rand::RngCore;

/// Capability set a candidate solution must expose to be evolvable.
///
/// The engine consumes nothing beyond this trait: it never learns what the
/// genes mean. Implementations keep their decision-variable *set* fixed across
/// `crossover` and `mutate`; only the numeric values move.
pub trait Chromosome: Clone + Send + Sync {
    /// Scalar quality score, higher is better. Pure with respect to the
    /// chromosome's own state: repeated calls on unchanged genes return
    /// bit-identical values.
    fn fitness(&self) -> Result<f64>;

    /// Produce two brand-new offspring from `self` and `partner`. Parents are
    /// never modified and children never alias parent gene storage.
    fn crossover(&self, partner: &Self, rng: &mut dyn RngCore) -> Result<(Self, Self)>;

    /// Perturb the receiver's genes in place. Each gene mutates independently
    /// with probability `mutation_rate`.
    fn mutate(&mut self, mutation_rate: f64, rng: &mut dyn RngCore);

    /// Constructor-style factory: a fresh candidate with the template's gene
    /// keys and shared collaborators but freshly drawn values.
    fn random_instance(template: &Self, rng: &mut dyn RngCore) -> Self;
}

/// Pluggable fitness accessor for the engine. The default delegates to
/// [`Chromosome::fitness`]; injecting another lets callers rank candidates by
/// an external criterion without touching the encoding.
pub type FitnessKey<C> = Box<dyn Fn(&C) -> Result<f64> + Send + Sync>;

/// Seed an initial population of `size` random candidates from a template.
pub fn random_population<C: Chromosome>(
    template: &C,
    size: usize,
    rng: &mut dyn RngCore,
) -> Vec<C> {
    (0..size).map(|_| C::random_instance(template, rng)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::portfolio::Portfolio;
    use crate::returns::ReturnsTable;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::BTreeMap;
    use std::sync::Arc;

    #[test]
    fn random_population_produces_requested_size_with_template_keys() {
        let mut series = BTreeMap::new();
        series.insert("AAA".to_string(), vec![0.01, -0.02, 0.03]);
        series.insert("BBB".to_string(), vec![0.00, 0.01, -0.01]);
        let table = Arc::new(ReturnsTable::new(series).unwrap());

        let mut template_weights = BTreeMap::new();
        template_weights.insert("AAA".to_string(), 0.5);
        template_weights.insert("BBB".to_string(), 0.5);
        let template = Portfolio::new(template_weights, table);

        let mut rng = StdRng::seed_from_u64(7);
        let population = random_population(&template, 8, &mut rng);

        assert_eq!(population.len(), 8, "should seed exactly `size` candidates");
        for candidate in &population {
            assert!(
                candidate.raw_weights().keys().eq(template.raw_weights().keys()),
                "every candidate should carry the template's asset keys"
            );
        }
    }
}
