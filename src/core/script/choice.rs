//! Selection state for a choice site.

use rand::Rng;

use crate::core::random::RandomSource;
use crate::core::script::ast::{Alternative, Transform};
use crate::core::script::transform::{NO_REPEAT, RANDOM_SEQUENCE, SEQUENCE};

/// How a choice site picks among its alternatives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChoicePolicy {
    /// Proportional to weight, independently each time.
    #[default]
    WeightedRandom,
    /// `.seq`: in order, wrapping around.
    Sequence,
    /// `.rseq`: shuffled order, reshuffled when exhausted.
    RandomSequence,
    /// `.norep`: random, never the previous pick twice in a row.
    NoRepeat,
}

impl ChoicePolicy {
    /// Policy named in a transform chain; the last one wins.
    pub fn from_transform(transform: &Transform) -> Self {
        transform
            .segments
            .iter()
            .filter_map(|s| match s.name.as_str() {
                SEQUENCE => Some(ChoicePolicy::Sequence),
                RANDOM_SEQUENCE => Some(ChoicePolicy::RandomSequence),
                NO_REPEAT => Some(ChoicePolicy::NoRepeat),
                _ => None,
            })
            .last()
            .unwrap_or_default()
    }

    /// Whether sites with this policy keep state between visits.
    pub fn is_stateful(&self) -> bool {
        *self != ChoicePolicy::WeightedRandom
    }
}

/// Per-site state. Options hold alternative indices, each repeated by its
/// whole-number weight so ordered policies honor weights too.
#[derive(Debug, Clone)]
pub struct ChoiceState {
    pub id: usize,
    pub policy: ChoicePolicy,
    options: Vec<usize>,
    weights: Vec<f64>,
    index: usize,
    last: Option<usize>,
}

impl ChoiceState {
    pub fn new<R: Rng + ?Sized>(id: usize, alternatives: &[Alternative], policy: ChoicePolicy, rng: &mut R) -> Self {
        let weights: Vec<f64> = alternatives.iter().map(Alternative::weight).collect();
        let mut options = Vec::new();
        for (i, weight) in weights.iter().enumerate() {
            let copies = (weight.round() as usize).max(1);
            options.extend(std::iter::repeat(i).take(copies));
        }
        if policy == ChoicePolicy::RandomSequence {
            options = rng.random_ordering(&options);
        }

        Self {
            id,
            policy,
            options,
            weights,
            index: 0,
            last: None,
        }
    }

    /// Whether this state was built for a site of this shape.
    pub fn fits(&self, alternatives: usize, policy: ChoicePolicy) -> bool {
        self.weights.len() == alternatives && self.policy == policy
    }

    /// Index of the chosen alternative; `None` when there are none.
    pub fn select<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<usize> {
        match self.weights.len() {
            0 => return None,
            1 => return Some(0),
            _ => {}
        }
        let pick = match self.policy {
            ChoicePolicy::WeightedRandom => rng
                .weighted_index(&self.weights)
                .unwrap_or_else(|| rng.rand_int(self.weights.len())),
            ChoicePolicy::Sequence => self.next_in_sequence(),
            ChoicePolicy::RandomSequence => {
                while self.index >= self.options.len() {
                    self.options = rng.random_ordering(&self.options);
                    if Some(self.options[0]) != self.last {
                        self.index = 0;
                    }
                }
                self.next_in_sequence()
            }
            ChoicePolicy::NoRepeat => {
                let candidates: Vec<usize> = self.options.iter().copied().filter(|&o| Some(o) != self.last).collect();
                match rng.random_item(&candidates) {
                    Some(&pick) => pick,
                    None => self.options[0],
                }
            }
        };
        self.last = Some(pick);
        Some(pick)
    }

    fn next_in_sequence(&mut self) -> usize {
        let pick = self.options[self.index % self.options.len()];
        self.index += 1;
        pick
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::script::ast::{Expr, Segment};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn alternatives(weights: &[Option<f64>]) -> Vec<Alternative> {
        weights
            .iter()
            .enumerate()
            .map(|(i, &weight)| Alternative {
                expr: Expr::text(i.to_string()),
                weight,
            })
            .collect()
    }

    #[test]
    fn policy_from_transform() {
        let transform = Transform {
            segments: vec![
                Segment {
                    name: "uc".to_string(),
                    call: true,
                },
                Segment {
                    name: "norep".to_string(),
                    call: false,
                },
            ],
        };
        assert_eq!(ChoicePolicy::from_transform(&transform), ChoicePolicy::NoRepeat);
        assert_eq!(ChoicePolicy::from_transform(&Transform::default()), ChoicePolicy::WeightedRandom);
    }

    #[test]
    fn sequence_cycles() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut state = ChoiceState::new(1, &alternatives(&[None, None, None]), ChoicePolicy::Sequence, &mut rng);
        let picks: Vec<usize> = (0..7).filter_map(|_| state.select(&mut rng)).collect();
        assert_eq!(picks, vec![0, 1, 2, 0, 1, 2, 0]);
    }

    #[test]
    fn weighted_sequence_repeats_heavy_options() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut state = ChoiceState::new(1, &alternatives(&[Some(2.0), None]), ChoicePolicy::Sequence, &mut rng);
        let picks: Vec<usize> = (0..3).filter_map(|_| state.select(&mut rng)).collect();
        assert_eq!(picks, vec![0, 0, 1]);
    }

    #[test]
    fn no_repeat_never_repeats() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut state = ChoiceState::new(1, &alternatives(&[None, None]), ChoicePolicy::NoRepeat, &mut rng);
        let mut last = state.select(&mut rng);
        for _ in 0..50 {
            let next = state.select(&mut rng);
            assert_ne!(next, last);
            last = next;
        }
    }

    #[test]
    fn random_sequence_covers_every_option() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut state = ChoiceState::new(1, &alternatives(&[None, None, None, None]), ChoicePolicy::RandomSequence, &mut rng);
        for _ in 0..5 {
            let mut round: Vec<usize> = (0..4).filter_map(|_| state.select(&mut rng)).collect();
            round.sort();
            assert_eq!(round, vec![0, 1, 2, 3]);
        }
    }

    #[test]
    fn single_and_empty_sites() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut one = ChoiceState::new(1, &alternatives(&[None]), ChoicePolicy::NoRepeat, &mut rng);
        assert_eq!(one.select(&mut rng), Some(0));
        assert_eq!(one.select(&mut rng), Some(0));
        let mut none = ChoiceState::new(2, &[], ChoicePolicy::Sequence, &mut rng);
        assert_eq!(none.select(&mut rng), None);
    }
}
