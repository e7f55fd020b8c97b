use crate::error::IndexError;

/// Tuning parameters for the skip list.
///
/// The level cap is the `MAX_HEIGHT` const parameter of
/// [`LinkedListSkipList`](crate::LinkedListSkipList); everything that can vary at
/// runtime lives here.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IndexConfig {
    /// Chance that a node is promoted one more level.
    pub probability: f64,
    /// Seed for the level generator. `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl IndexConfig {
    pub const DEFAULT_PROBABILITY: f64 = 0.5;

    pub fn with_probability(mut self, probability: f64) -> Self {
        self.probability = probability;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Checks that `probability` lies strictly between 0 and 1.
    pub fn validate(&self) -> Result<(), IndexError> {
        if self.probability > 0.0 && self.probability < 1.0 {
            Ok(())
        } else {
            Err(IndexError::InvalidConfig(format!(
                "probability must be in (0, 1), got {}",
                self.probability
            )))
        }
    }

    pub(crate) fn rng(&self) -> fastrand::Rng {
        match self.seed {
            Some(seed) => fastrand::Rng::with_seed(seed),
            None => fastrand::Rng::new(),
        }
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            probability: Self::DEFAULT_PROBABILITY,
            seed: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_fair_coin() {
        let config = IndexConfig::default();
        assert_eq!(config.probability, 0.5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_degenerate_probability() {
        for p in [0.0, 1.0, -0.25, 3.0, f64::NAN] {
            let config = IndexConfig::default().with_probability(p);
            assert!(matches!(config.validate(), Err(IndexError::InvalidConfig(_))), "p = {p}");
        }
    }

    #[test]
    fn seeded_rng_is_reproducible() {
        let config = IndexConfig::default().with_seed(7);
        let (mut a, mut b) = (config.rng(), config.rng());
        for _ in 0..16 {
            assert_eq!(a.u64(..), b.u64(..));
        }
    }
}
