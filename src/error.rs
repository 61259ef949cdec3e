use std::{
    error::Error,
    fmt::{self, Display},
};

/// The result type used across the crate.
pub type Result<T> = std::result::Result<T, RankErr>;

/// Failures surfaced by the ranking core.
///
/// Every variant is fatal: nothing in this crate retries, the caller
/// decides whether to adjust the configuration and start over.
#[derive(Debug)]
pub enum RankErr {
    /// A feature dictionary carries a key outside the declared universe.
    FeatureOutOfRange {
        item: usize,
        key: usize,
        num_feats: usize,
    },
    /// A preference pair references an item outside the dataset.
    PairOutOfRange {
        pair: usize,
        index: usize,
        len: usize,
    },
    /// The trainer tag is not one of the recognized variants.
    UnknownTrainer { got: String },
    /// A configuration field holds a value the trainers cannot work with.
    InvalidConfig {
        field: &'static str,
        reason: &'static str,
    },
    /// The parameter vector was used before `setup_params` allocated it.
    ParamsNotSetUp,
    /// The classifier was used before `setup_models` configured it.
    ModelNotSetUp,
    /// Two buffers that must agree in length do not.
    LengthMismatch {
        what: &'static str,
        got: usize,
        expected: usize,
    },
    /// The training cost overflowed or became NaN.
    NonFiniteCost { epoch: usize },
}

impl Display for RankErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RankErr::FeatureOutOfRange {
                item,
                key,
                num_feats,
            } => write!(
                f,
                "feature dict {item} holds key {key}, outside the declared universe of {num_feats} features"
            ),
            RankErr::PairOutOfRange { pair, index, len } => write!(
                f,
                "pair {pair} references item {index}, outside the dataset of {len} items"
            ),
            RankErr::UnknownTrainer { got } => {
                write!(f, "unknown trainer tag {got:?}, expected \"gdesc\" or \"gdescadapt\"")
            }
            RankErr::InvalidConfig { field, reason } => {
                write!(f, "invalid configuration: {field} {reason}")
            }
            RankErr::ParamsNotSetUp => {
                write!(f, "the parameter vector is not allocated, call setup_params first")
            }
            RankErr::ModelNotSetUp => {
                write!(f, "the classifier is not configured, call setup_models first")
            }
            RankErr::LengthMismatch {
                what,
                got,
                expected,
            } => write!(
                f,
                "{what} length mismatch: got {got}, expected {expected}"
            ),
            RankErr::NonFiniteCost { epoch } => {
                write!(f, "training cost became non-finite at epoch {epoch}")
            }
        }
    }
}

impl Error for RankErr {}
