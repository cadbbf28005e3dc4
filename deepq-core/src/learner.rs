//! Temporal-difference learning of the local approximator.
mod config;
use crate::{
    error::DeepqError,
    explorer::argmax,
    record::{Record, RecordValue},
    Approximator, TransitionBatch,
};
use anyhow::Result;
pub use config::{CriticLoss, LearnerConfig, TargetSync};
use log::trace;

/// Performs DQN updates of a local approximator against a target approximator.
pub struct Learner {
    discount_factor: f64,
    double_dqn: bool,
    critic_loss: CriticLoss,
    target_sync: TargetSync,
    n_updates: usize,
    n_syncs: usize,
}

impl Learner {
    /// Constructs a learner.
    pub fn build(config: &LearnerConfig, discount_factor: f64) -> Self {
        Self {
            discount_factor,
            double_dqn: config.double_dqn,
            critic_loss: config.critic_loss,
            target_sync: config.target_sync.clone(),
            n_updates: 0,
            n_syncs: 0,
        }
    }

    /// The number of learning steps done so far.
    pub fn n_updates(&self) -> usize {
        self.n_updates
    }

    /// The number of target synchronizations done so far.
    pub fn n_syncs(&self) -> usize {
        self.n_syncs
    }

    /// Performs one learning step on `qnet` with the given batch.
    ///
    /// Targets are `r + gamma * max_a qnet_tgt(o_t+1)[a]` for non-terminal
    /// transitions and `r` for terminal ones. They are constants of the loss,
    /// so only `qnet` is updated. The target approximator is synchronized
    /// afterwards when the configured cadence is due.
    pub fn update<Q: Approximator>(
        &mut self,
        qnet: &mut Q,
        qnet_tgt: &mut Q,
        batch: TransitionBatch<Q::Obs>,
    ) -> Result<Record> {
        let (obs, act, next_obs, reward, is_terminated) = batch.unpack();
        let n_actions = qnet.n_actions();
        if let Some(&a) = act.iter().find(|&&a| a >= n_actions) {
            return Err(DeepqError::InvalidAction { act: a, n_actions }.into());
        }

        let next_q = self.bootstrap_values(qnet, qnet_tgt, &next_obs)?;
        let tgt = td_targets(&reward, &next_q, &is_terminated, self.discount_factor)?;
        let pred = qnet.forward_with_grad(&obs)?;
        let loss = qnet.td_loss(&pred, &act, &tgt, self.critic_loss)?;
        let loss = qnet.update_parameters(&loss)?;

        self.n_updates += 1;
        if self.target_sync.is_due(self.n_updates) {
            self.sync(qnet, qnet_tgt)?;
        }

        Ok(Record::from_slice(&[("loss", RecordValue::Scalar(loss))]))
    }

    fn sync<Q: Approximator>(&mut self, qnet: &Q, qnet_tgt: &mut Q) -> Result<()> {
        match self.target_sync {
            TargetSync::Hard { .. } => qnet_tgt.load_parameters_from(qnet)?,
            TargetSync::Soft { tau, .. } => qnet_tgt.soft_update_from(qnet, tau)?,
            TargetSync::Never => return Ok(()),
        }
        self.n_syncs += 1;
        trace!("Synchronized target approximator at update {}", self.n_updates);
        Ok(())
    }

    /// Returns the bootstrapped value of each next observation.
    fn bootstrap_values<Q: Approximator>(
        &self,
        qnet: &Q,
        qnet_tgt: &Q,
        next_obs: &[Q::Obs],
    ) -> Result<Vec<f32>> {
        let q_tgt = qnet_tgt.predict(next_obs)?;
        check_rows(&q_tgt, next_obs.len(), qnet_tgt.n_actions())?;

        if self.double_dqn {
            let q = qnet.predict(next_obs)?;
            check_rows(&q, next_obs.len(), qnet.n_actions())?;
            q.iter()
                .zip(q_tgt.iter())
                .map(|(q, q_tgt)| Ok(q_tgt[argmax(q)?]))
                .collect()
        } else {
            Ok(q_tgt
                .iter()
                .map(|row| row.iter().copied().fold(f32::NEG_INFINITY, f32::max))
                .collect())
        }
    }
}

/// Computes bootstrapped targets `r + gamma * next_q * (1 - is_terminated)`.
///
/// The target of a terminal transition is exactly its reward, whatever
/// `next_q` holds.
pub fn td_targets(
    reward: &[f32],
    next_q: &[f32],
    is_terminated: &[bool],
    discount_factor: f64,
) -> Result<Vec<f32>> {
    check_len("next values", reward.len(), next_q.len())?;
    check_len("termination flags", reward.len(), is_terminated.len())?;

    let gamma = discount_factor as f32;
    Ok(reward
        .iter()
        .zip(next_q.iter())
        .zip(is_terminated.iter())
        .map(|((&r, &q), &done)| if done { r } else { r + gamma * q })
        .collect())
}

fn check_len(what: &str, expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(DeepqError::ShapeMismatch {
            what: what.to_string(),
            expected,
            actual,
        }
        .into());
    }
    Ok(())
}

fn check_rows(values: &[Vec<f32>], n_rows: usize, n_cols: usize) -> Result<()> {
    check_len("batch of action values", n_rows, values.len())?;
    for row in values {
        check_len("action values", n_cols, row.len())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dummy::LinearQ;

    fn batch(
        obs: Vec<Vec<f32>>,
        act: Vec<usize>,
        reward: Vec<f32>,
        done: Vec<bool>,
    ) -> TransitionBatch<Vec<f32>> {
        TransitionBatch {
            next_obs: obs.clone(),
            obs,
            act,
            reward,
            is_terminated: done,
        }
    }

    #[test]
    fn test_terminal_target_equals_reward() -> Result<()> {
        for gamma in [0.0, 0.5, 0.99, 1.0] {
            let tgt = td_targets(&[1.5, -2.0], &[1e6, f32::NAN], &[true, true], gamma)?;
            assert_eq!(tgt, vec![1.5, -2.0]);
        }
        Ok(())
    }

    #[test]
    fn test_non_terminal_target_bootstraps() -> Result<()> {
        let tgt = td_targets(&[1.0, 1.0], &[2.0, 2.0], &[false, true], 0.5)?;
        assert_eq!(tgt, vec![2.0, 1.0]);
        Ok(())
    }

    #[test]
    fn test_targets_reject_mismatched_lengths() {
        let err = td_targets(&[1.0, 1.0], &[2.0], &[false, false], 0.9).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<DeepqError>(),
            Some(DeepqError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_bootstrap_uses_max_of_target() -> Result<()> {
        let learner = Learner::build(&LearnerConfig::default(), 0.9);
        let qnet = LinearQ::constant(1, vec![5.0, 0.0, 0.0]);
        let qnet_tgt = LinearQ::constant(1, vec![0.1, 0.9, 0.3]);
        let v = learner.bootstrap_values(&qnet, &qnet_tgt, &[vec![0.0]])?;
        assert_eq!(v, vec![0.9]);
        Ok(())
    }

    #[test]
    fn test_double_dqn_selects_with_local() -> Result<()> {
        let config = LearnerConfig::default().double_dqn(true);
        let learner = Learner::build(&config, 0.9);
        let qnet = LinearQ::constant(1, vec![5.0, 0.0, 0.0]);
        let qnet_tgt = LinearQ::constant(1, vec![0.1, 0.9, 0.3]);
        let v = learner.bootstrap_values(&qnet, &qnet_tgt, &[vec![0.0]])?;
        assert_eq!(v, vec![0.1]);
        Ok(())
    }

    #[test]
    fn test_update_moves_taken_action_towards_target() -> Result<()> {
        let config = LearnerConfig::default().target_sync(TargetSync::Never);
        let mut learner = Learner::build(&config, 0.99);
        let mut qnet = LinearQ::constant(1, vec![0.0, 0.0]).learning_rate(0.1);
        let mut qnet_tgt = qnet.clone();

        for _ in 0..200 {
            let b = batch(vec![vec![0.0]], vec![1], vec![3.0], vec![true]);
            learner.update(&mut qnet, &mut qnet_tgt, b)?;
        }

        let q = qnet.predict(&[vec![0.0]])?;
        assert!((q[0][1] - 3.0).abs() < 1e-3, "{:?}", q);
        // The action that was never taken is left untouched.
        assert_eq!(q[0][0], 0.0);
        assert_eq!(learner.n_updates(), 200);
        Ok(())
    }

    #[test]
    fn test_update_rejects_out_of_range_action() {
        let mut learner = Learner::build(&LearnerConfig::default(), 0.99);
        let mut qnet = LinearQ::constant(1, vec![0.0, 0.0]);
        let mut qnet_tgt = qnet.clone();
        let b = batch(vec![vec![0.0]], vec![2], vec![0.0], vec![false]);
        let err = learner.update(&mut qnet, &mut qnet_tgt, b).unwrap_err();
        assert_eq!(
            err.downcast_ref::<DeepqError>(),
            Some(&DeepqError::InvalidAction { act: 2, n_actions: 2 })
        );
    }

    #[test]
    fn test_hard_sync_cadence() -> Result<()> {
        let config = LearnerConfig::default().target_sync(TargetSync::Hard { interval: 3 });
        let mut learner = Learner::build(&config, 0.99);
        let mut qnet = LinearQ::constant(1, vec![0.0, 0.0]).learning_rate(0.1);
        let mut qnet_tgt = qnet.clone();

        for i in 1..=7 {
            let b = batch(vec![vec![1.0]], vec![0], vec![1.0], vec![true]);
            learner.update(&mut qnet, &mut qnet_tgt, b)?;
            let synced = qnet.params() == qnet_tgt.params();
            assert_eq!(synced, i % 3 == 0, "update {}", i);
        }
        assert_eq!(learner.n_syncs(), 2);
        Ok(())
    }

    #[test]
    fn test_never_sync_keeps_target() -> Result<()> {
        let config = LearnerConfig::default().target_sync(TargetSync::Never);
        let mut learner = Learner::build(&config, 0.99);
        let mut qnet = LinearQ::constant(1, vec![0.0, 0.0]).learning_rate(0.1);
        let mut qnet_tgt = qnet.clone();
        let init = qnet_tgt.params();

        for _ in 0..10 {
            let b = batch(vec![vec![1.0]], vec![0], vec![1.0], vec![true]);
            learner.update(&mut qnet, &mut qnet_tgt, b)?;
        }
        assert_eq!(qnet_tgt.params(), init);
        assert_ne!(qnet.params(), init);
        assert_eq!(learner.n_syncs(), 0);
        Ok(())
    }

    #[test]
    fn test_soft_sync_blends() -> Result<()> {
        let config = LearnerConfig::default().target_sync(TargetSync::Soft {
            interval: 1,
            tau: 0.5,
        });
        let mut learner = Learner::build(&config, 0.99);
        let mut qnet = LinearQ::constant(1, vec![0.0, 0.0]).learning_rate(0.5);
        let mut qnet_tgt = qnet.clone();

        // d(mse)/d(bias) = 2 * (0 - 1) = -2, so the bias of action 0 becomes 1.
        let b = batch(vec![vec![0.0]], vec![0], vec![1.0], vec![true]);
        learner.update(&mut qnet, &mut qnet_tgt, b)?;

        assert_eq!(qnet.predict(&[vec![0.0]])?, vec![vec![1.0, 0.0]]);
        assert_eq!(qnet_tgt.predict(&[vec![0.0]])?, vec![vec![0.5, 0.0]]);
        Ok(())
    }

    #[test]
    fn test_validate_target_sync() {
        assert!(LearnerConfig::default().validate().is_ok());
        let zero = LearnerConfig::default().target_sync(TargetSync::Hard { interval: 0 });
        assert!(zero.validate().is_err());
        let tau = LearnerConfig::default().target_sync(TargetSync::Soft {
            interval: 1,
            tau: 0.0,
        });
        assert!(tau.validate().is_err());
        assert!(LearnerConfig::default()
            .target_sync(TargetSync::Never)
            .validate()
            .is_ok());
    }
}
