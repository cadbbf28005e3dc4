//! Trains a convolutional DQN agent on [`PelletGrid`] from pixel observations,
//! or plays greedily with a trained one.
mod pellet_grid;
use anyhow::Result;
use clap::Parser;
use deepq_candle::{CnnConfig, Device, FramePreprocessor, QNetwork, QNetworkConfig};
use deepq_core::{
    record::NullRecorder, replay_buffer::ReplayBufferConfig, Agent, Dqn as Dqn_, DqnConfig,
    Env as _, Trainer, TrainerConfig, CHECKPOINT_NAME,
};
use log::info;
use pellet_grid::{PelletGrid, PelletGridConfig};
use std::path::{Path, PathBuf};

type Dqn = Dqn_<PelletGrid, QNetwork, FramePreprocessor>;

/// Side of the square frames fed to the network.
const FRAME_SIZE: usize = 128;

/// Subdirectory of `model_dir` holding the parameters of an unsolved run.
const LAST_DIR: &str = "last";

mod config {
    use super::*;
    use serde::{de::DeserializeOwned, Serialize};

    /// Loads `(model_dir)/(name)`, or writes `default` there if the file does not exist.
    pub fn load_or_save<T: DeserializeOwned + Serialize>(
        model_dir: &str,
        name: &str,
        default: impl FnOnce() -> T,
        load: impl FnOnce(&Path) -> Result<T>,
    ) -> Result<T> {
        let path = Path::new(model_dir).join(name);
        if path.exists() {
            info!("Load {:?}", &path);
            load(&path)
        } else {
            let config = default();
            std::fs::create_dir_all(model_dir)?;
            std::fs::write(&path, serde_yaml::to_string(&config)?)?;
            info!("Saved default configuration in {:?}", &path);
            Ok(config)
        }
    }

    pub fn env_config(model_dir: &str) -> Result<PelletGridConfig> {
        load_or_save(model_dir, "env.yaml", PelletGridConfig::default, |p| {
            PelletGridConfig::load(p)
        })
    }

    /// Frames are stored preprocessed, so the default buffer is kept small.
    pub fn agent_config(model_dir: &str) -> Result<DqnConfig> {
        let default = || {
            DqnConfig::default().replay_buffer(ReplayBufferConfig::default().capacity(2000))
        };
        load_or_save(model_dir, "agent.yaml", default, |p| DqnConfig::load(p))
    }

    pub fn model_config(model_dir: &str, n_actions: usize) -> Result<QNetworkConfig> {
        let default = || {
            QNetworkConfig::new(n_actions)
                .cnn(CnnConfig::new(n_actions).frame_size(FRAME_SIZE, FRAME_SIZE))
        };
        load_or_save(model_dir, "model.yaml", default, |p| QNetworkConfig::load(p))
    }

    /// The task is regarded as solved when most pellets are eaten on average.
    pub fn trainer_config(model_dir: &str, env_config: &PelletGridConfig) -> Result<TrainerConfig> {
        let default = || {
            TrainerConfig::default()
                .solved_threshold(Some(0.8 * env_config.max_score()))
                .model_dir(model_dir)
        };
        load_or_save(model_dir, "trainer.yaml", default, |p| TrainerConfig::load(p))
    }

    pub fn show_config(
        env_config: &PelletGridConfig,
        agent_config: &DqnConfig,
        model_config: &QNetworkConfig,
        trainer_config: &TrainerConfig,
    ) -> Result<()> {
        println!("{}", serde_yaml::to_string(env_config)?);
        println!("{}", serde_yaml::to_string(agent_config)?);
        println!("{}", serde_yaml::to_string(model_config)?);
        println!("{}", serde_yaml::to_string(trainer_config)?);
        Ok(())
    }
}

mod utils {
    use super::*;
    use deepq_core::Env as _;

    pub fn device(args: &Args) -> Result<candle_core::Device> {
        let device = match args.cuda {
            Some(n) => Device::Cuda(n),
            None => Device::Cpu,
        };
        Ok(candle_core::Device::try_from(device)?)
    }

    /// The directory to play from: `model_dir` if a solved run saved its
    /// checkpoint there, `model_dir/last` otherwise.
    pub fn checkpoint_dir(model_dir: &Path) -> PathBuf {
        if model_dir.join(CHECKPOINT_NAME).exists() {
            model_dir.to_path_buf()
        } else {
            model_dir.join(LAST_DIR)
        }
    }

    pub fn create_agent(args: &Args, env_config: &PelletGridConfig) -> Result<Dqn> {
        let model_dir = args.model_dir.as_str();
        let device = device(args)?;
        let n_actions = PelletGrid::build(env_config, 0)?.n_actions();
        let agent_config = config::agent_config(model_dir)?;
        let model_config = config::model_config(model_dir, n_actions)?;

        let qnet = QNetwork::build(model_config.clone(), device.clone())?;
        let qnet_tgt = QNetwork::build(model_config, device.clone())?;
        let preprocessor = FramePreprocessor::new(FRAME_SIZE as u32, FRAME_SIZE as u32, device);
        Dqn::build(agent_config, qnet, qnet_tgt, preprocessor)
    }
}

#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Directory of configuration files and model parameters
    #[arg(long, default_value_t = String::from("./model/pellet_grid"))]
    model_dir: String,

    /// Play with the trained model in `model_dir` instead of training
    #[arg(long, default_value_t = false)]
    play: bool,

    /// The number of episodes to play
    #[arg(long, default_value_t = 5)]
    play_episodes: usize,

    /// Overrides the maximum number of training episodes
    #[arg(long)]
    max_episodes: Option<usize>,

    /// Ordinal of the CUDA device to use, CPU if not given
    #[arg(long)]
    cuda: Option<usize>,

    /// Show configuration loaded from files and exit
    #[arg(long, default_value_t = false)]
    show_config: bool,
}

fn train(args: &Args) -> Result<()> {
    let model_dir = args.model_dir.as_str();
    let env_config = config::env_config(model_dir)?;
    let mut trainer_config = config::trainer_config(model_dir, &env_config)?;
    if let Some(n) = args.max_episodes {
        trainer_config = trainer_config.max_episodes(n);
    }

    if args.show_config {
        let n_actions = PelletGrid::build(&env_config, 0)?.n_actions();
        return config::show_config(
            &env_config,
            &config::agent_config(model_dir)?,
            &config::model_config(model_dir, n_actions)?,
            &trainer_config,
        );
    }

    let mut agent = utils::create_agent(args, &env_config)?;
    let mut trainer = Trainer::<PelletGrid>::build(trainer_config, env_config)?;
    let outcome = trainer.train(&mut agent, &mut NullRecorder::new())?;

    match outcome.episodes_to_solve {
        Some(n) => info!("Solved in {} episodes", n),
        None => {
            info!(
                "Not solved in {} episodes, average score {:.2}",
                outcome.episodes, outcome.average_score
            );
            agent.save_params(&Path::new(model_dir).join(LAST_DIR))?;
        }
    }

    Ok(())
}

fn play(args: &Args) -> Result<()> {
    let env_config = config::env_config(&args.model_dir)?;
    let mut agent = utils::create_agent(args, &env_config)?;
    agent.load_params(&utils::checkpoint_dir(Path::new(&args.model_dir)))?;
    let mut env = PelletGrid::build(&env_config, 1)?;

    for episode in 1..=args.play_episodes {
        let mut obs = env.reset()?;
        let mut score = 0.0;
        loop {
            let act = agent.select_action(&obs, 0.0)?;
            let step = env.step(act)?;
            score += step.reward;
            if step.is_done() {
                break;
            }
            obs = step.obs;
        }
        info!("Episode {}\tScore: {:.2}", episode, score);
    }

    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    if args.play {
        play(&args)?;
    } else {
        train(&args)?;
    }

    Ok(())
}
