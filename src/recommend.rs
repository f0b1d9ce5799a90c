//! "Recommended products" selection.
//!
//! Candidates are sampled with reservoir sampling (Algorithm R) from a seedable RNG:
//! reproducible under a fixed seed, effectively random when seeded from entropy.

use crate::config::CatalogConfig;
use crate::model::ProductView;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Arc, Mutex, PoisonError};

pub struct Recommender {
    rng: Mutex<StdRng>,
}

impl Recommender {
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Seeded when `recommendation_seed` is configured, from entropy otherwise.
    pub fn from_config(config: &CatalogConfig) -> Self {
        config
            .recommendation_seed
            .map_or_else(Self::from_entropy, Self::seeded)
    }

    /// Uniformly samples up to `k` items in a single pass.
    pub fn sample<T>(&self, candidates: impl IntoIterator<Item = T>, k: usize) -> Vec<T> {
        if k == 0 {
            return Vec::new();
        }
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        let mut reservoir = Vec::with_capacity(k);
        for (seen, item) in candidates.into_iter().enumerate() {
            if seen < k {
                reservoir.push(item);
            } else {
                let slot = rng.gen_range(0..=seen);
                if slot < k {
                    reservoir[slot] = item;
                }
            }
        }
        reservoir
    }

    /// Up to `k` products sharing `product`'s category, never `product` itself.
    pub fn recommend(
        &self,
        product: &ProductView,
        candidates: &[Arc<ProductView>],
        k: usize,
    ) -> Vec<Arc<ProductView>> {
        let related = candidates
            .iter()
            .filter(|c| c.id != product.id && c.category == product.category)
            .cloned();
        self.sample(related, k)
    }
}
