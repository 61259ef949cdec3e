use std::str::FromStr;

use ndarray::Array1;
use ndarray_rand::rand_distr::Normal;
use ndarray_rand::RandomExt;
use rand::Rng;

use super::layout::ParameterLayout;
use crate::error::{RankErr, Result};

/// Closed set of optimizer variants, parsed once from its string tag
/// and dispatched once at trainer construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainerKind {
    /// Tag `"gdesc"`: plain gradient descent.
    GradientDescent,
    /// Tag `"gdescadapt"`: per-parameter adaptive gradient descent.
    AdaptiveGradientDescent,
}

impl TrainerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GradientDescent => "gdesc",
            Self::AdaptiveGradientDescent => "gdescadapt",
        }
    }
}

impl FromStr for TrainerKind {
    type Err = RankErr;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "gdesc" => Ok(Self::GradientDescent),
            "gdescadapt" => Ok(Self::AdaptiveGradientDescent),
            other => Err(RankErr::UnknownTrainer {
                got: other.to_string(),
            }),
        }
    }
}

/// Hyperparameters and the parameter vector for one training session.
///
/// Fields are set freely before `setup_params`; from then on the struct
/// is immutable configuration plus the owned parameter buffer that the
/// trainer mutates in place.
#[derive(Debug, Clone)]
pub struct ArchModel {
    /// Input dimensionality: the size of the feature-index universe.
    pub num_feats: usize,
    /// 0 selects the linear model, anything larger is the width of the
    /// single hidden layer.
    pub num_hidden: usize,
    /// Variance of the zero-mean normal draw used to initialize
    /// parameters.
    pub param_var: f32,
    /// L2 regularization strength.
    pub l2_decay: f32,
    pub learning_rate: f32,
    /// Update-rate coefficient for the adaptive second-moment average.
    pub q_learning_rate: f32,
    /// Memory of the adaptive second-moment average, in (0, 1).
    pub exponent_avg_m: f32,
    /// Pairs per gradient evaluation in the online path.
    pub gradient_chunk_size: usize,
    /// Pairs per outer online iteration.
    pub online_chunk_size: usize,
    /// Inner line-search steps per epoch in the batch path.
    pub cg_iterations: usize,
    /// Full-gradient batch training instead of chunked online updates.
    pub batch: bool,
    pub num_epochs: usize,
    pub trainer: TrainerKind,
    params: Option<Vec<f32>>,
}

impl ArchModel {
    /// Configuration preloaded with the defaults of the reference
    /// ranking experiment; adjust fields before `setup_params`.
    pub fn new(num_feats: usize) -> Self {
        Self {
            num_feats,
            num_hidden: 0,
            param_var: 0.01,
            l2_decay: 0.001,
            learning_rate: 0.1,
            q_learning_rate: 0.05,
            exponent_avg_m: 0.95,
            gradient_chunk_size: 500,
            online_chunk_size: 4000,
            cg_iterations: 2,
            batch: false,
            num_epochs: 50,
            trainer: TrainerKind::AdaptiveGradientDescent,
            params: None,
        }
    }

    pub fn layout(&self) -> ParameterLayout {
        ParameterLayout::new(self.num_feats, self.num_hidden)
    }

    /// Parameter count implied by `num_feats` and `num_hidden`.
    pub fn num_params(&self) -> usize {
        self.layout().len()
    }

    /// Rejects field values the trainers cannot work with. Run by
    /// `setup_params` and by the classifier's `setup_models`.
    pub fn validate(&self) -> Result<()> {
        ensure(self.num_feats > 0, "num_feats", "must be positive")?;
        ensure(
            self.param_var.is_finite() && self.param_var >= 0.,
            "param_var",
            "must be finite and non-negative",
        )?;
        ensure(
            self.l2_decay.is_finite() && self.l2_decay >= 0.,
            "l2_decay",
            "must be finite and non-negative",
        )?;
        ensure(
            self.learning_rate.is_finite() && self.learning_rate > 0.,
            "learning_rate",
            "must be finite and positive",
        )?;

        if self.batch {
            ensure(self.cg_iterations > 0, "cg_iterations", "must be positive")?;
            ensure(
                self.trainer == TrainerKind::GradientDescent,
                "trainer",
                "the batch path is defined for \"gdesc\" only",
            )?;
        } else {
            ensure(
                self.gradient_chunk_size > 0,
                "gradient_chunk_size",
                "must be positive",
            )?;
            ensure(
                self.online_chunk_size > 0,
                "online_chunk_size",
                "must be positive",
            )?;
        }

        if self.trainer == TrainerKind::AdaptiveGradientDescent {
            ensure(
                self.exponent_avg_m > 0. && self.exponent_avg_m < 1.,
                "exponent_avg_m",
                "must lie strictly between 0 and 1",
            )?;
            ensure(
                self.q_learning_rate.is_finite() && self.q_learning_rate > 0.,
                "q_learning_rate",
                "must be finite and positive",
            )?;
        }

        Ok(())
    }

    /// Allocates the parameter vector and fills it from a zero-mean
    /// normal with variance `param_var`. Calling it again re-randomizes
    /// from scratch.
    pub fn setup_params<R: Rng>(&mut self, rng: &mut R) -> Result<()> {
        self.validate()?;

        let dist = Normal::new(0., self.param_var.sqrt()).map_err(|_| RankErr::InvalidConfig {
            field: "param_var",
            reason: "does not define a normal distribution",
        })?;

        self.params = Some(Array1::random_using(self.num_params(), dist, rng).to_vec());
        Ok(())
    }

    pub fn has_params(&self) -> bool {
        self.params.is_some()
    }

    /// Read view of the parameter vector.
    pub fn params(&self) -> Result<&[f32]> {
        self.params.as_deref().ok_or(RankErr::ParamsNotSetUp)
    }

    /// Mutable view of the parameter vector; the trainer is its only
    /// caller for the duration of a session.
    pub fn params_mut(&mut self) -> Result<&mut [f32]> {
        self.params.as_deref_mut().ok_or(RankErr::ParamsNotSetUp)
    }
}

fn ensure(cond: bool, field: &'static str, reason: &'static str) -> Result<()> {
    if cond {
        Ok(())
    } else {
        Err(RankErr::InvalidConfig { field, reason })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn trainer_tags_round_trip() {
        for kind in [
            TrainerKind::GradientDescent,
            TrainerKind::AdaptiveGradientDescent,
        ] {
            assert_eq!(kind.as_str().parse::<TrainerKind>().unwrap(), kind);
        }
    }

    #[test]
    fn unknown_trainer_tag_is_rejected() {
        let err = "cg".parse::<TrainerKind>().unwrap_err();
        assert!(matches!(err, RankErr::UnknownTrainer { got } if got == "cg"));
    }

    #[test]
    fn param_count_for_linear_model() {
        let arch = ArchModel::new(4);
        assert_eq!(arch.num_params(), 5);
    }

    #[test]
    fn param_count_for_hidden_model() {
        let mut arch = ArchModel::new(4);
        arch.num_hidden = 100;
        assert_eq!(arch.num_params(), 4 * 100 + 100 + 100 + 1);
    }

    #[test]
    fn setup_allocates_the_declared_count() {
        let mut arch = ArchModel::new(6);
        arch.num_hidden = 3;

        assert!(matches!(arch.params(), Err(RankErr::ParamsNotSetUp)));

        let mut rng = StdRng::seed_from_u64(42);
        arch.setup_params(&mut rng).unwrap();

        assert_eq!(arch.params().unwrap().len(), arch.num_params());
    }

    #[test]
    fn setup_again_re_randomizes() {
        let mut arch = ArchModel::new(8);
        let mut rng = StdRng::seed_from_u64(42);

        arch.setup_params(&mut rng).unwrap();
        let first = arch.params().unwrap().to_vec();

        arch.setup_params(&mut rng).unwrap();
        let second = arch.params().unwrap().to_vec();

        assert_eq!(first.len(), second.len());
        assert_ne!(first, second);
    }

    #[test]
    fn validate_rejects_bad_fields() {
        let cases: &[(&str, fn(&mut ArchModel))] = &[
            ("num_feats", |a| a.num_feats = 0),
            ("param_var", |a| a.param_var = f32::NAN),
            ("l2_decay", |a| a.l2_decay = -1.),
            ("learning_rate", |a| a.learning_rate = 0.),
            ("exponent_avg_m", |a| a.exponent_avg_m = 1.),
            ("gradient_chunk_size", |a| a.gradient_chunk_size = 0),
            ("online_chunk_size", |a| a.online_chunk_size = 0),
        ];

        for (field, poison) in cases {
            let mut arch = ArchModel::new(4);
            poison(&mut arch);
            let err = arch.validate().unwrap_err();
            assert!(
                matches!(err, RankErr::InvalidConfig { field: f, .. } if f == *field),
                "expected {field} to be rejected"
            );
        }
    }

    #[test]
    fn batch_requires_gdesc() {
        let mut arch = ArchModel::new(4);
        arch.batch = true;
        arch.trainer = TrainerKind::AdaptiveGradientDescent;
        assert!(arch.validate().is_err());

        arch.trainer = TrainerKind::GradientDescent;
        assert!(arch.validate().is_ok());

        arch.cg_iterations = 0;
        assert!(arch.validate().is_err());
    }
}
