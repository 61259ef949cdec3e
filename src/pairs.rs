use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::{RankErr, Result};

/// An ordered preference: the item at `winner` should outscore the item
/// at `loser`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreferencePair {
    pub winner: usize,
    pub loser: usize,
}

/// The full set of preference pairs bound to one training session.
///
/// Self-pairs are permitted; they are degenerate (their gradient
/// contributions cancel exactly).
#[derive(Debug, Clone, Default)]
pub struct PairSet {
    pairs: Vec<PreferencePair>,
}

impl PairSet {
    pub fn new(pairs: Vec<PreferencePair>) -> Self {
        Self { pairs }
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn as_slice(&self) -> &[PreferencePair] {
        &self.pairs
    }

    /// Every referenced index must fall inside a dataset of `len` items.
    pub fn validate(&self, len: usize) -> Result<()> {
        for (pair, p) in self.pairs.iter().enumerate() {
            for index in [p.winner, p.loser] {
                if index >= len {
                    return Err(RankErr::PairOutOfRange { pair, index, len });
                }
            }
        }

        Ok(())
    }

    /// Reorders the pairs in place; the online trainer calls this once
    /// per epoch.
    pub fn shuffle<R: Rng>(&mut self, rng: &mut R) {
        self.pairs.shuffle(rng);
    }
}

impl FromIterator<(usize, usize)> for PairSet {
    fn from_iter<I: IntoIterator<Item = (usize, usize)>>(iter: I) -> Self {
        Self {
            pairs: iter
                .into_iter()
                .map(|(winner, loser)| PreferencePair { winner, loser })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn validate_accepts_in_range_indices() {
        let pairs = PairSet::from_iter([(0, 1), (2, 0), (1, 1)]);
        assert!(pairs.validate(3).is_ok());
    }

    #[test]
    fn validate_rejects_out_of_range_index() {
        let pairs = PairSet::from_iter([(0, 1), (1, 5)]);
        let err = pairs.validate(3).unwrap_err();

        match err {
            RankErr::PairOutOfRange { pair, index, len } => {
                assert_eq!(pair, 1);
                assert_eq!(index, 5);
                assert_eq!(len, 3);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn shuffle_keeps_the_same_pairs() {
        let mut pairs = PairSet::from_iter((0..100).map(|i| (i, i + 100)));
        let before: Vec<_> = pairs.as_slice().to_vec();

        let mut rng = StdRng::seed_from_u64(42);
        pairs.shuffle(&mut rng);

        assert_eq!(pairs.len(), before.len());
        let mut after: Vec<_> = pairs.as_slice().to_vec();
        after.sort_by_key(|p| p.winner);
        assert_eq!(after, before);
    }
}
