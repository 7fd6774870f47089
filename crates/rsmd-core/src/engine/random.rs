use rand::distributions::{Distribution, WeightedError, WeightedIndex};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, RngCore, SeedableRng};
use thiserror::Error;
use tracing::{info, trace};

#[derive(Debug, Error)]
pub enum ChoiceError {
    #[error("No alternatives to choose from")]
    NoAlternatives,
    #[error("Inverse thermal energy must be positive, got {0}")]
    InvalidBeta(f64),
    #[error("Energies do not form a valid distribution: {0}")]
    InvalidWeights(#[from] WeightedError),
}

/// The single source of randomness of a simulation.
///
/// It is passed explicitly into the candidate search (shuffling) and the acceptance policies
/// (candidate choice and acceptance draws), so runs are reproducible from their seed and
/// tests can substitute fixed draws.
pub struct RandomContext {
    rng: Box<dyn RngCore + Send>,
    seed: Option<u64>,
}

impl std::fmt::Debug for RandomContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RandomContext")
            .field("seed", &self.seed)
            .finish_non_exhaustive()
    }
}

impl RandomContext {
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Box::new(StdRng::seed_from_u64(seed)),
            seed: Some(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: Box::new(StdRng::from_entropy()),
            seed: None,
        }
    }

    /// Creates the context for a configured seed, where `0` requests an entropy seed.
    pub fn from_seed_option(seed: u64) -> Self {
        if seed == 0 {
            info!("Using a random seed drawn from the operating system.");
            Self::from_entropy()
        } else {
            info!(seed, "Setting random seed.");
            Self::seeded(seed)
        }
    }

    /// Wraps an arbitrary generator, e.g. a mock with fixed draws.
    pub fn from_rng(rng: impl RngCore + Send + 'static) -> Self {
        Self {
            rng: Box::new(rng),
            seed: None,
        }
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// Draws a uniform real from `[0, 1)`.
    pub fn uniform(&mut self) -> f64 {
        self.rng.gen_range(0.0..1.0)
    }

    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        items.shuffle(&mut self.rng);
    }

    /// Picks an index with probability proportional to `exp(-beta · energy)`.
    ///
    /// Weights are taken relative to the lowest energy, so the most likely alternative has
    /// weight one and high energies cannot underflow the whole distribution.
    ///
    /// # Errors
    ///
    /// Returns an error for an empty list, a non-positive `beta`, or energies that are not
    /// finite numbers.
    pub fn boltzmann_choice(&mut self, energies: &[f64], beta: f64) -> Result<usize, ChoiceError> {
        if energies.is_empty() {
            return Err(ChoiceError::NoAlternatives);
        }
        if !(beta > 0.0) {
            return Err(ChoiceError::InvalidBeta(beta));
        }

        let lowest = energies.iter().copied().fold(f64::INFINITY, f64::min);
        let weights = energies.iter().map(|&e| (-(e - lowest) * beta).exp());
        let index = WeightedIndex::new(weights)?.sample(&mut self.rng);
        trace!(index, energy = energies[index], "Chose alternative.");
        Ok(index)
    }
}
