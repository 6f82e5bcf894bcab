//! Random source helpers shared by every generator.
//!
//! Generators never own a random number generator; callers pass one in,
//! usually a `StdRng::seed_from_u64(..)` when output must be reproducible.

use rand::distributions::WeightedIndex;
use rand::prelude::Distribution;
use rand::seq::SliceRandom;
use rand::Rng;

/// Uniform and weighted sampling on top of any [`rand::Rng`].
pub trait RandomSource {
    /// A float in `[0, 1)`.
    fn random(&mut self) -> f64;

    /// An integer in `[0, n)`, or 0 when `n` is 0.
    fn rand_int(&mut self, n: usize) -> usize;

    /// A uniformly chosen element, `None` for an empty slice.
    fn random_item<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T>;

    /// A shuffled copy of `items`.
    fn random_ordering<T: Clone>(&mut self, items: &[T]) -> Vec<T>;

    /// Index chosen proportionally to `weights`. `None` when there is
    /// nothing to choose from or no weight is positive.
    fn weighted_index(&mut self, weights: &[f64]) -> Option<usize>;
}

impl<R: Rng + ?Sized> RandomSource for R {
    fn random(&mut self) -> f64 {
        self.gen::<f64>()
    }

    fn rand_int(&mut self, n: usize) -> usize {
        if n == 0 {
            0
        } else {
            self.gen_range(0..n)
        }
    }

    fn random_item<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        items.choose(self)
    }

    fn random_ordering<T: Clone>(&mut self, items: &[T]) -> Vec<T> {
        let mut shuffled = items.to_vec();
        shuffled.shuffle(self);
        shuffled
    }

    fn weighted_index(&mut self, weights: &[f64]) -> Option<usize> {
        if weights.is_empty() {
            return None;
        }
        let dist = WeightedIndex::new(weights).ok()?;
        Some(dist.sample(self))
    }
}
