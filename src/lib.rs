pub mod arch;
pub mod classifier;
pub mod error;
pub mod features;
pub mod optimization;
pub mod pairs;
pub mod stats;
pub mod training;

pub use arch::model::{ArchModel, TrainerKind};
pub use classifier::PairwiseClassifier;
pub use error::{RankErr, Result};
pub use features::{FeatureDict, FeatureEncoder};
pub use pairs::{PairSet, PreferencePair};
