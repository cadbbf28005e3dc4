//! Train [`Agent`].
mod config;
mod score_window;
use crate::{
    record::{Record, RecordValue, Recorder},
    Agent, Env,
};
use anyhow::Result;
use chrono::Local;
pub use config::TrainerConfig;
use log::{debug, info};
use std::{path::Path, time::SystemTime};
pub use score_window::ScoreWindow;

/// Summary of a training run.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainOutcome {
    /// The number of episodes run.
    pub episodes: usize,

    /// The episode at which the mean score of the window first reached the
    /// threshold, if it did.
    pub solved_at: Option<usize>,

    /// `solved_at` minus the capacity of the score window, saturating at zero.
    pub episodes_to_solve: Option<usize>,

    /// Mean score of the window after the last episode.
    pub average_score: f32,

    /// Exploration rate after the last decay.
    pub epsilon: f64,
}

struct EpisodeStats {
    score: f32,
    steps: usize,
    loss: Option<f32>,
}

#[cfg_attr(doc, aquamarine::aquamarine)]
/// Manages the episode-driven training loop.
///
/// # Training loop
///
/// 0. Given an agent implementing [`Agent`] and a recorder implementing [`Recorder`].
/// 1. Build [`Env`] and set `epsilon = eps_start`.
/// 2. For each episode `e = 1, ..., max_episodes`:
///     1. Reset [`Env`] and set `score = 0`.
///     2. For at most `max_steps_per_episode` steps, select an action with the
///        current epsilon, step the environment, hand the transition to
///        [`Agent::observe_transition`] and add the reward to `score`. The
///        episode ends early when the step is terminated or truncated.
///     3. Push `score` to the [`ScoreWindow`] and decay epsilon:
///        `epsilon = max(eps_min, decay * epsilon)`.
///     4. Write a record with the episode, the score, the mean score of the window,
///        epsilon, the number of steps and the mean loss of the episode.
///     5. If the mean score of the window reaches `solved_threshold`, save the
///        parameters of the agent in `model_dir` and stop.
///
/// # Interaction of objects
///
/// ```mermaid
/// graph LR
///     A[Agent]-->|action|B[Env]
///     B -->|"Step&lt;E: Env&gt;"|A
///     A -->|Transition|C[SimpleReplayBuffer]
///     C -->|TransitionBatch|D[Learner]
///     D -->|update|A
/// ```
///
/// The agent is free to learn inside [`Agent::observe_transition`]; the trainer
/// only drives episodes and tracks scores.
pub struct Trainer<E: Env> {
    /// Configuration of the environment for training.
    env_config: E::Config,

    config: TrainerConfig,
}

impl<E: Env> Trainer<E> {
    /// Constructs a trainer.
    pub fn build(config: TrainerConfig, env_config: E::Config) -> Result<Self> {
        config.validate()?;
        Ok(Self { env_config, config })
    }

    /// The configuration of the trainer.
    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    fn save_model<A: Agent<E>>(agent: &A, model_dir: &str) -> Result<()> {
        agent.save_params(Path::new(model_dir))?;
        info!("Saved the model in {:?}.", model_dir);
        Ok(())
    }

    /// Runs a single episode.
    fn run_episode<A: Agent<E>>(
        &self,
        env: &mut E,
        agent: &mut A,
        epsilon: f64,
    ) -> Result<EpisodeStats> {
        let mut obs = env.reset()?;
        let mut score = 0f32;
        let mut steps = 0;
        let mut loss_sum = 0f32;
        let mut n_opts = 0;

        while steps < self.config.max_steps_per_episode {
            let act = agent.select_action(&obs, epsilon)?;
            let step = env.step(act)?;
            steps += 1;

            if let Some(record) =
                agent.observe_transition(&obs, act, step.reward, &step.obs, step.is_terminated)?
            {
                if let Ok(loss) = record.get_scalar("loss") {
                    loss_sum += loss;
                    n_opts += 1;
                }
            }
            score += step.reward;

            let is_done = step.is_done();
            obs = step.obs;
            if is_done {
                break;
            }
        }

        Ok(EpisodeStats {
            score,
            steps,
            loss: (n_opts > 0).then(|| loss_sum / n_opts as f32),
        })
    }

    /// Trains the agent until the task is solved or `max_episodes` episodes
    /// have been run.
    pub fn train<A: Agent<E>>(
        &mut self,
        agent: &mut A,
        recorder: &mut dyn Recorder,
    ) -> Result<TrainOutcome> {
        let mut env = E::build(&self.env_config, self.config.env_seed)?;
        let mut window = ScoreWindow::new(self.config.score_window);
        let mut epsilon = self.config.epsilon.eps_start;
        let mut average_score = 0f32;
        let timer = SystemTime::now();

        for episode in 1..=self.config.max_episodes {
            let stats = self.run_episode(&mut env, agent, epsilon)?;
            window.push(stats.score);
            average_score = window.mean().unwrap_or(stats.score);

            let mut record = Record::from_slice(&[
                ("episode", RecordValue::Scalar(episode as f32)),
                ("score", RecordValue::Scalar(stats.score)),
                ("average_score", RecordValue::Scalar(average_score)),
                ("epsilon", RecordValue::Scalar(epsilon as f32)),
                ("steps", RecordValue::Scalar(stats.steps as f32)),
            ]);
            if let Some(loss) = stats.loss {
                record.insert("loss", RecordValue::Scalar(loss));
            }
            epsilon = self.config.epsilon.next(epsilon);

            debug!(
                "Episode {}\tScore: {:.2}\tAverage Score: {:.2}",
                episode, stats.score, average_score
            );
            if episode % self.config.report_interval == 0 {
                info!(
                    "Episode {}\tAverage Score: {:.2}\tEpsilon: {:.3}\tElapsed: {:.1}s",
                    episode,
                    average_score,
                    epsilon,
                    timer.elapsed()?.as_secs_f32()
                );
                record.insert("datetime", RecordValue::DateTime(Local::now()));
                recorder.write(record);
                recorder.flush(episode as i64);
            } else {
                recorder.write(record);
            }

            if let Some(threshold) = self.config.solved_threshold {
                if average_score >= threshold {
                    let episodes_to_solve = episode.saturating_sub(window.capacity());
                    info!(
                        "Environment solved in {} episodes!\tAverage Score: {:.2}",
                        episodes_to_solve, average_score
                    );
                    if let Some(model_dir) = &self.config.model_dir {
                        Self::save_model(agent, model_dir)?;
                    }
                    recorder.flush(episode as i64);
                    return Ok(TrainOutcome {
                        episodes: episode,
                        solved_at: Some(episode),
                        episodes_to_solve: Some(episodes_to_solve),
                        average_score,
                        epsilon,
                    });
                }
            }
        }

        recorder.flush(self.config.max_episodes as i64);
        Ok(TrainOutcome {
            episodes: self.config.max_episodes,
            solved_at: None,
            episodes_to_solve: None,
            average_score,
            epsilon,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dummy::{CountingEnv, CountingEnvConfig},
        record::BufferedRecorder,
    };
    use std::path::Path;

    /// Takes action 0 and never learns; counts the transitions it sees.
    #[derive(Default)]
    struct ScriptedAgent {
        epsilons: Vec<f64>,
        n_transitions: usize,
        n_terminated: usize,
    }

    impl Agent<CountingEnv> for ScriptedAgent {
        fn select_action(&mut self, _obs: &Vec<f32>, epsilon: f64) -> Result<usize> {
            self.epsilons.push(epsilon);
            Ok(0)
        }

        fn observe_transition(
            &mut self,
            _obs: &Vec<f32>,
            _act: usize,
            _reward: f32,
            _next_obs: &Vec<f32>,
            is_terminated: bool,
        ) -> Result<Option<Record>> {
            self.n_transitions += 1;
            self.n_terminated += is_terminated as usize;
            Ok(Some(Record::from_scalar("loss", 0.5)))
        }

        fn save_params(&self, _path: &Path) -> Result<()> {
            Ok(())
        }

        fn load_params(&mut self, _path: &Path) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_max_steps_truncates_episodes() -> Result<()> {
        let config = TrainerConfig::default()
            .max_episodes(4)
            .max_steps_per_episode(3)
            .solved_threshold(None);
        let mut trainer = Trainer::<CountingEnv>::build(config, CountingEnvConfig::default())?;
        let mut agent = ScriptedAgent::default();
        let mut recorder = BufferedRecorder::new();

        let outcome = trainer.train(&mut agent, &mut recorder)?;

        assert_eq!(outcome.episodes, 4);
        assert_eq!(outcome.solved_at, None);
        assert_eq!(outcome.average_score, 3.0);
        assert_eq!(agent.n_transitions, 12);
        // Truncated episodes never reach the terminal step.
        assert_eq!(agent.n_terminated, 0);
        assert_eq!(recorder.len(), 4);
        Ok(())
    }

    #[test]
    fn test_epsilon_decays_per_episode() -> Result<()> {
        let eps = crate::explorer::EpsilonDecay::default()
            .eps_start(1.0)
            .eps_min(0.2)
            .decay(0.5);
        let config = TrainerConfig::default()
            .max_episodes(4)
            .solved_threshold(None)
            .epsilon(eps);
        let env_config = CountingEnvConfig {
            episode_len: 2,
            ..Default::default()
        };
        let mut trainer = Trainer::<CountingEnv>::build(config, env_config)?;
        let mut agent = ScriptedAgent::default();

        let outcome = trainer.train(&mut agent, &mut BufferedRecorder::new())?;

        assert_eq!(
            agent.epsilons,
            vec![1.0, 1.0, 0.5, 0.5, 0.25, 0.25, 0.2, 0.2]
        );
        assert_eq!(outcome.epsilon, 0.2);
        Ok(())
    }

    #[test]
    fn test_records_hold_episode_metrics() -> Result<()> {
        let config = TrainerConfig::default()
            .max_episodes(2)
            .report_interval(2)
            .solved_threshold(None);
        let mut trainer = Trainer::<CountingEnv>::build(config, CountingEnvConfig::default())?;
        let mut recorder = BufferedRecorder::new();
        trainer.train(&mut ScriptedAgent::default(), &mut recorder)?;

        let records: Vec<_> = recorder.iter().collect();
        assert_eq!(records[0].get_scalar("episode")?, 1.0);
        assert_eq!(records[0].get_scalar("score")?, 5.0);
        assert_eq!(records[0].get_scalar("steps")?, 5.0);
        assert_eq!(records[0].get_scalar("loss")?, 0.5);
        assert!(records[0].get("datetime").is_none());
        assert!(matches!(
            records[1].get("datetime"),
            Some(RecordValue::DateTime(_))
        ));
        Ok(())
    }
}
