//! DQN agent.
use super::config::DqnConfig;
use crate::{
    error::DeepqError,
    explorer::EpsilonGreedy,
    learner::Learner,
    record::{Record, RecordValue},
    replay_buffer::{SimpleReplayBuffer, Transition},
    Agent, Approximator, Env, ExperienceBufferBase, Mode, Preprocessor, ReplayBufferBase,
};
use anyhow::Result;
use log::info;
use std::{fs, marker::PhantomData, path::Path};

/// File name of the checkpoint of the local approximator.
pub const CHECKPOINT_NAME: &str = "checkpoint.safetensors";

/// DQN agent.
///
/// It composes a replay buffer, an epsilon-greedy explorer and a learner
/// updating the local approximator `qnet` against the target approximator
/// `qnet_tgt`. Learning starts once the replay buffer holds more than
/// `batch_size` transitions; from then on every observed transition triggers
/// `n_updates_per_opt` learning steps.
pub struct Dqn<E, Q, P>
where
    E: Env,
    Q: Approximator,
    P: Preprocessor<E::Obs, Output = Q::Obs>,
{
    qnet: Q,
    qnet_tgt: Q,
    preprocessor: P,
    buffer: SimpleReplayBuffer<Q::Obs>,
    explorer: EpsilonGreedy,
    learner: Learner,
    batch_size: usize,
    n_updates_per_opt: usize,
    phantom: PhantomData<E>,
}

impl<E, Q, P> Dqn<E, Q, P>
where
    E: Env,
    Q: Approximator,
    P: Preprocessor<E::Obs, Output = Q::Obs>,
{
    /// Constructs DQN agent.
    ///
    /// `qnet_tgt` is overwritten with the parameters of `qnet` and put in
    /// [`Mode::Inference`].
    pub fn build(config: DqnConfig, qnet: Q, mut qnet_tgt: Q, preprocessor: P) -> Result<Self> {
        config.validate()?;
        if qnet.n_actions() != qnet_tgt.n_actions() {
            return Err(DeepqError::ShapeMismatch {
                what: "actions of the target approximator".to_string(),
                expected: qnet.n_actions(),
                actual: qnet_tgt.n_actions(),
            }
            .into());
        }
        qnet_tgt.load_parameters_from(&qnet)?;
        qnet_tgt.set_mode(Mode::Inference);

        Ok(Self {
            qnet,
            qnet_tgt,
            preprocessor,
            buffer: SimpleReplayBuffer::build(&config.replay_buffer),
            explorer: EpsilonGreedy::new(config.explorer_seed),
            learner: Learner::build(&config.learner, config.discount_factor),
            batch_size: config.batch_size,
            n_updates_per_opt: config.n_updates_per_opt,
            phantom: PhantomData,
        })
    }

    /// The local approximator.
    pub fn qnet(&self) -> &Q {
        &self.qnet
    }

    /// The target approximator.
    pub fn qnet_tgt(&self) -> &Q {
        &self.qnet_tgt
    }

    /// The replay buffer.
    pub fn buffer(&self) -> &SimpleReplayBuffer<Q::Obs> {
        &self.buffer
    }

    /// The learner.
    pub fn learner(&self) -> &Learner {
        &self.learner
    }

    fn opt(&mut self) -> Result<Record> {
        let mut loss = 0f32;

        for _ in 0..self.n_updates_per_opt {
            let batch = self.buffer.batch(self.batch_size)?;
            let record = self.learner.update(&mut self.qnet, &mut self.qnet_tgt, batch)?;
            loss += record.get_scalar("loss")?;
        }
        loss /= self.n_updates_per_opt.max(1) as f32;

        Ok(Record::from_slice(&[("loss", RecordValue::Scalar(loss))]))
    }
}

impl<E, Q, P> Agent<E> for Dqn<E, Q, P>
where
    E: Env,
    Q: Approximator,
    P: Preprocessor<E::Obs, Output = Q::Obs>,
{
    fn select_action(&mut self, obs: &E::Obs, epsilon: f64) -> Result<usize> {
        let obs = self.preprocessor.preprocess(obs)?;
        self.explorer.action(&mut self.qnet, &obs, epsilon)
    }

    fn observe_transition(
        &mut self,
        obs: &E::Obs,
        act: usize,
        reward: f32,
        next_obs: &E::Obs,
        is_terminated: bool,
    ) -> Result<Option<Record>> {
        let n_actions = self.qnet.n_actions();
        if act >= n_actions {
            return Err(DeepqError::InvalidAction { act, n_actions }.into());
        }

        let obs = self.preprocessor.preprocess(obs)?;
        let next_obs = self.preprocessor.preprocess(next_obs)?;
        self.buffer
            .push(Transition::new(obs, act, reward, next_obs, is_terminated))?;

        if self.buffer.len() > self.batch_size {
            Ok(Some(self.opt()?))
        } else {
            Ok(None)
        }
    }

    fn save_params(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path)?;
        let path = path.join(CHECKPOINT_NAME);
        self.qnet.save(&path)?;
        info!("Saved the local approximator in {:?}", &path);
        Ok(())
    }

    fn load_params(&mut self, path: &Path) -> Result<()> {
        let path = path.join(CHECKPOINT_NAME);
        self.qnet.load(&path)?;
        self.qnet_tgt.load_parameters_from(&self.qnet)?;
        info!("Loaded the local approximator from {:?}", &path);
        Ok(())
    }
}
