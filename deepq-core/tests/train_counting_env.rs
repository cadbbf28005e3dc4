use anyhow::Result;
use deepq_core::{
    dummy::{CountingEnv, CountingEnvConfig, IdentityPreprocessor, LinearQ},
    record::BufferedRecorder,
    replay_buffer::ReplayBufferConfig,
    Dqn, DqnConfig, ExperienceBufferBase, Trainer, TrainerConfig, CHECKPOINT_NAME,
};
use tempdir::TempDir;
use test_log::test;

type CountingDqn = Dqn<CountingEnv, LinearQ, IdentityPreprocessor>;

fn agent() -> Result<CountingDqn> {
    let config = DqnConfig::default()
        .batch_size(8)
        .replay_buffer(ReplayBufferConfig::default().capacity(100));
    Dqn::build(config, LinearQ::new(2, 3), LinearQ::new(2, 3), IdentityPreprocessor)
}

#[test]
fn window_mean_equals_episode_length() -> Result<()> {
    let config = TrainerConfig::default()
        .max_episodes(120)
        .solved_threshold(None);
    let mut trainer = Trainer::<CountingEnv>::build(config, CountingEnvConfig::default())?;
    let mut agent = agent()?;
    let mut recorder = BufferedRecorder::new();

    let outcome = trainer.train(&mut agent, &mut recorder)?;

    assert_eq!(outcome.episodes, 120);
    assert_eq!(outcome.solved_at, None);
    assert_eq!(outcome.average_score, 5.0);
    assert_eq!(recorder.len(), 120);
    assert_eq!(agent.buffer().len(), 100);
    // 600 transitions, learning from the 9th on.
    assert_eq!(agent.learner().n_updates(), 592);
    Ok(())
}

fn solve(threshold: f32) -> Result<(deepq_core::TrainOutcome, TempDir)> {
    let dir = TempDir::new("solved")?;
    let model_dir = dir.path().join("model");
    let config = TrainerConfig::default()
        .max_episodes(500)
        .solved_threshold(Some(threshold))
        .score_window(100)
        .model_dir(model_dir.to_string_lossy());
    let env_config = CountingEnvConfig {
        zero_reward_episodes: 50,
        ..Default::default()
    };
    let mut trainer = Trainer::<CountingEnv>::build(config, env_config)?;
    let outcome = trainer.train(&mut agent()?, &mut BufferedRecorder::new())?;
    Ok((outcome, dir))
}

#[test]
fn stops_once_window_is_free_of_zero_scores() -> Result<()> {
    let (outcome, dir) = solve(5.0)?;

    assert_eq!(outcome.solved_at, Some(150));
    assert_eq!(outcome.episodes_to_solve, Some(50));
    assert_eq!(outcome.episodes, 150);
    assert_eq!(outcome.average_score, 5.0);
    assert!(dir.path().join("model").join(CHECKPOINT_NAME).exists());
    Ok(())
}

#[test]
fn stops_at_first_episode_reaching_threshold() -> Result<()> {
    let (outcome, _dir) = solve(4.0)?;

    assert_eq!(outcome.solved_at, Some(130));
    assert_eq!(outcome.episodes_to_solve, Some(30));
    assert_eq!(outcome.average_score, 4.0);
    Ok(())
}

#[test]
fn unreachable_threshold_runs_all_episodes() -> Result<()> {
    let config = TrainerConfig::default()
        .max_episodes(30)
        .solved_threshold(Some(6.0));
    let mut trainer = Trainer::<CountingEnv>::build(config, CountingEnvConfig::default())?;
    let outcome = trainer.train(&mut agent()?, &mut BufferedRecorder::new())?;

    assert_eq!(outcome.episodes, 30);
    assert_eq!(outcome.solved_at, None);
    assert_eq!(outcome.episodes_to_solve, None);
    Ok(())
}
