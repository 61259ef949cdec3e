use log::debug;
use ndarray::{Array1, Array2};
use rand::Rng;

use crate::{
    arch::{
        loss::PairwiseLogistic,
        model::{ArchModel, TrainerKind},
        scorer::Scorer,
    },
    error::{RankErr, Result},
    features::{FeatureDict, FeatureEncoder},
    optimization::{AdaptiveGradientDescent, GradientDescent},
    pairs::PairSet,
    training::{BatchTrainer, OnlineTrainer},
};

/// Binds one configuration, one dataset and one pair set for the
/// duration of a training session.
///
/// The facade owns the only mutable copies of the dense feature matrix
/// and, through `ArchModel`, the parameter vector. `apply` is read-only
/// and may run before or after `train`, never concurrently with it.
pub struct PairwiseClassifier<R: Rng> {
    arch: ArchModel,
    dicts: Vec<FeatureDict>,
    pairs: PairSet,
    rng: R,
    session: Option<Session>,
}

/// Derived structures built by `setup_models`.
struct Session {
    encoder: FeatureEncoder,
    scorer: Scorer,
    loss: PairwiseLogistic,
    features: Array2<f32>,
}

enum TrainerImpl {
    Batch(BatchTrainer),
    Online(OnlineTrainer<GradientDescent>),
    OnlineAdaptive(OnlineTrainer<AdaptiveGradientDescent>),
}

/// Builds the configured trainer variant; the tag is inspected here
/// once, never again per step.
fn build_trainer(arch: &ArchModel) -> TrainerImpl {
    let num_params = arch.num_params();

    if arch.batch {
        return TrainerImpl::Batch(BatchTrainer::new(arch.cg_iterations, num_params));
    }

    match arch.trainer {
        TrainerKind::GradientDescent => TrainerImpl::Online(OnlineTrainer::new(
            GradientDescent::new(arch.learning_rate),
            arch.gradient_chunk_size,
            arch.online_chunk_size,
            num_params,
        )),
        TrainerKind::AdaptiveGradientDescent => TrainerImpl::OnlineAdaptive(OnlineTrainer::new(
            AdaptiveGradientDescent::new(
                num_params,
                arch.learning_rate,
                arch.q_learning_rate,
                arch.exponent_avg_m,
            ),
            arch.gradient_chunk_size,
            arch.online_chunk_size,
            num_params,
        )),
    }
}

impl<R: Rng> PairwiseClassifier<R> {
    pub fn new(arch: ArchModel, dicts: Vec<FeatureDict>, pairs: PairSet, rng: R) -> Self {
        Self {
            arch,
            dicts,
            pairs,
            rng,
            session: None,
        }
    }

    pub fn arch(&self) -> &ArchModel {
        &self.arch
    }

    /// Read view of the current parameter vector.
    pub fn params(&self) -> Result<&[f32]> {
        self.arch.params()
    }

    /// Validates the configuration against the bound data and builds
    /// the derived scoring structures. Must run before `apply` or
    /// `train`; running it again rebuilds everything from the current
    /// configuration.
    pub fn setup_models(&mut self) -> Result<()> {
        self.arch.validate()?;

        // The declared universe must cover every observed feature key.
        for (item, dict) in self.dicts.iter().enumerate() {
            if let Some(key) = dict.max_key() {
                if key >= self.arch.num_feats {
                    return Err(RankErr::FeatureOutOfRange {
                        item,
                        key,
                        num_feats: self.arch.num_feats,
                    });
                }
            }
        }
        self.pairs.validate(self.dicts.len())?;

        if !self.arch.has_params() {
            self.arch.setup_params(&mut self.rng)?;
        }

        let encoder = FeatureEncoder::new(self.arch.num_feats);
        let features = encoder.encode(&self.dicts)?;
        let scorer = Scorer::new(self.arch.layout());
        let loss = PairwiseLogistic::new(self.arch.l2_decay);

        self.session = Some(Session {
            encoder,
            scorer,
            loss,
            features,
        });

        Ok(())
    }

    fn session(&self) -> Result<&Session> {
        self.session.as_ref().ok_or(RankErr::ModelNotSetUp)
    }

    /// Scores any feature-dict list with the current parameters: one
    /// value per input row, in input order, whether or not the items
    /// appeared in any training pair. Pure inference.
    pub fn apply(&self, dicts: &[FeatureDict]) -> Result<Array1<f32>> {
        let session = self.session()?;
        let x = session.encoder.encode(dicts)?;
        session.scorer.score(self.arch.params()?, x.view())
    }

    /// Runs the configured trainer for exactly `num_epochs` epochs,
    /// mutating the parameter vector in place. There is no early
    /// stopping; quality is observed by the caller through `apply`.
    pub fn train(&mut self) -> Result<()> {
        let Self {
            arch,
            pairs,
            rng,
            session,
            ..
        } = self;
        let session = session.as_ref().ok_or(RankErr::ModelNotSetUp)?;

        let mut trainer = build_trainer(arch);
        let epochs = arch.num_epochs;
        let params = arch.params_mut()?;

        for epoch in 0..epochs {
            let cost = match &mut trainer {
                TrainerImpl::Batch(t) => t.run_epoch(
                    &session.scorer,
                    &session.loss,
                    session.features.view(),
                    pairs,
                    params,
                    epoch,
                )?,
                TrainerImpl::Online(t) => t.run_epoch(
                    &session.scorer,
                    &session.loss,
                    session.features.view(),
                    pairs,
                    params,
                    epoch,
                    rng,
                )?,
                TrainerImpl::OnlineAdaptive(t) => t.run_epoch(
                    &session.scorer,
                    &session.loss,
                    session.features.view(),
                    pairs,
                    params,
                    epoch,
                    rng,
                )?,
            };

            debug!("epoch {epoch}: cost {cost:.4}");
        }

        Ok(())
    }
}
