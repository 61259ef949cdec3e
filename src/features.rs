use std::collections::BTreeMap;

use ndarray::Array2;

use crate::error::{RankErr, Result};

/// One item's sparse feature description.
///
/// Keys are indices into a shared universe of `num_feats` features;
/// absent keys read as zero. The sparse form is kept for storage, the
/// hot scoring path only ever sees the densified matrix.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureDict {
    values: BTreeMap<usize, f32>,
}

impl FeatureDict {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: usize, value: f32) {
        self.values.insert(key, value);
    }

    /// Returns the value stored under `key`, or 0.0 if absent.
    pub fn get(&self, key: usize) -> f32 {
        self.values.get(&key).copied().unwrap_or(0.)
    }

    /// Iterates the explicitly set entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, f32)> + '_ {
        self.values.iter().map(|(&k, &v)| (k, v))
    }

    /// The largest explicitly set key, if any.
    pub fn max_key(&self) -> Option<usize> {
        self.values.keys().next_back().copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl FromIterator<(usize, f32)> for FeatureDict {
    fn from_iter<I: IntoIterator<Item = (usize, f32)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// Densifies sparse feature dictionaries into the `(N, num_feats)`
/// matrix consumed by the scoring path.
#[derive(Debug, Clone, Copy)]
pub struct FeatureEncoder {
    num_feats: usize,
}

impl FeatureEncoder {
    /// Creates an encoder for a feature universe of `num_feats` indices.
    pub fn new(num_feats: usize) -> Self {
        Self { num_feats }
    }

    pub fn num_feats(&self) -> usize {
        self.num_feats
    }

    /// Row `i`, column `k` of the output is `dicts[i].get(k)`.
    ///
    /// A key outside the declared universe is a configuration error,
    /// never a silent truncation.
    pub fn encode(&self, dicts: &[FeatureDict]) -> Result<Array2<f32>> {
        let mut x = Array2::zeros((dicts.len(), self.num_feats));

        for (item, dict) in dicts.iter().enumerate() {
            for (key, value) in dict.iter() {
                if key >= self.num_feats {
                    return Err(RankErr::FeatureOutOfRange {
                        item,
                        key,
                        num_feats: self.num_feats,
                    });
                }
                x[[item, key]] = value;
            }
        }

        Ok(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_shape_and_values() {
        let dicts = vec![
            FeatureDict::from_iter([(0, 1.5), (2, -3.)]),
            FeatureDict::from_iter([(1, 0.25)]),
            FeatureDict::new(),
        ];

        let x = FeatureEncoder::new(4).encode(&dicts).unwrap();

        assert_eq!(x.dim(), (3, 4));
        assert_eq!(x[[0, 0]], 1.5);
        assert_eq!(x[[0, 2]], -3.);
        assert_eq!(x[[1, 1]], 0.25);

        // Every unset entry reads as exactly zero.
        assert_eq!(x[[0, 1]], 0.);
        assert_eq!(x[[0, 3]], 0.);
        assert_eq!(x.row(2).sum(), 0.);
    }

    #[test]
    fn encode_rejects_out_of_universe_key() {
        let dicts = vec![FeatureDict::from_iter([(0, 1.), (7, 2.)])];
        let err = FeatureEncoder::new(4).encode(&dicts).unwrap_err();

        match err {
            RankErr::FeatureOutOfRange {
                item,
                key,
                num_feats,
            } => {
                assert_eq!(item, 0);
                assert_eq!(key, 7);
                assert_eq!(num_feats, 4);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn absent_keys_read_as_zero() {
        let dict = FeatureDict::from_iter([(3, 9.)]);
        assert_eq!(dict.get(3), 9.);
        assert_eq!(dict.get(0), 0.);
        assert_eq!(dict.max_key(), Some(3));
    }
}
