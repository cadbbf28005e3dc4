//! A small maze-free pellet-eating game rendered as RGB frames.
use anyhow::Result;
use deepq_candle::RgbFrame;
use deepq_core::{error::DeepqError, Env, Step};
use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

const BLACK: [u8; 3] = [0, 0, 0];
const WHITE: [u8; 3] = [255, 255, 255];
const YELLOW: [u8; 3] = [255, 255, 0];
const RED: [u8; 3] = [255, 0, 0];

/// Stay, up, right, down, left.
const N_ACTIONS: usize = 5;

/// Configuration of [`PelletGrid`].
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PelletGridConfig {
    /// The number of rows of the grid.
    pub rows: usize,

    /// The number of columns of the grid.
    pub cols: usize,

    /// Pellets placed at the start of an episode.
    pub n_pellets: usize,

    /// Size of a cell in pixels.
    pub cell_size: u32,

    /// Reward of eating a pellet.
    pub pellet_reward: f32,

    /// If `true`, a ghost wanders randomly and ends the episode when it meets
    /// the player.
    pub ghost: bool,

    /// Episodes are truncated after this number of steps.
    pub max_steps: usize,
}

impl Default for PelletGridConfig {
    fn default() -> Self {
        Self {
            rows: 8,
            cols: 8,
            n_pellets: 12,
            cell_size: 16,
            pellet_reward: 10.0,
            ghost: true,
            max_steps: 200,
        }
    }
}

impl PelletGridConfig {
    /// The score of an episode in which every pellet is eaten.
    pub fn max_score(&self) -> f32 {
        self.n_pellets as f32 * self.pellet_reward
    }

    /// Constructs [`PelletGridConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`PelletGridConfig`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.rows < 2 || self.cols < 2 || self.cell_size == 0 {
            return Err(DeepqError::InvalidConfig(format!(
                "grid of {}x{} cells of {} pixels",
                self.rows, self.cols, self.cell_size
            ))
            .into());
        }
        if self.n_pellets > self.rows * self.cols - 2 {
            return Err(DeepqError::InvalidConfig(format!(
                "{} pellets do not fit in a {}x{} grid",
                self.n_pellets, self.rows, self.cols
            ))
            .into());
        }
        Ok(())
    }
}

/// The player starts at the top-left cell, the ghost at the bottom-right one.
/// An episode terminates when every pellet is eaten or the ghost catches the
/// player.
pub struct PelletGrid {
    config: PelletGridConfig,
    rng: StdRng,
    player: (usize, usize),
    ghost: (usize, usize),
    pellets: Vec<bool>,
    n_left: usize,
    t: usize,
}

impl PelletGrid {
    fn cell(&self, (r, c): (usize, usize)) -> usize {
        r * self.config.cols + c
    }

    fn moved(&self, (r, c): (usize, usize), act: usize) -> (usize, usize) {
        match act {
            1 => (r.saturating_sub(1), c),
            2 => (r, (c + 1).min(self.config.cols - 1)),
            3 => ((r + 1).min(self.config.rows - 1), c),
            4 => (r, c.saturating_sub(1)),
            _ => (r, c),
        }
    }

    /// The number of pellets not eaten yet.
    pub fn n_left(&self) -> usize {
        self.n_left
    }

    fn render(&self) -> RgbFrame {
        let size = self.config.cell_size as usize;
        let width = self.config.cols * size;
        let height = self.config.rows * size;
        let mut data = vec![0u8; 3 * width * height];

        for r in 0..self.config.rows {
            for c in 0..self.config.cols {
                let (color, margin) = if (r, c) == self.player {
                    (YELLOW, 0)
                } else if self.config.ghost && (r, c) == self.ghost {
                    (RED, 0)
                } else if self.pellets[self.cell((r, c))] {
                    (WHITE, size * 3 / 8)
                } else {
                    (BLACK, 0)
                };
                for y in r * size + margin..(r + 1) * size - margin {
                    for x in c * size + margin..(c + 1) * size - margin {
                        let i = 3 * (y * width + x);
                        data[i..i + 3].copy_from_slice(&color);
                    }
                }
            }
        }

        RgbFrame {
            width: width as u32,
            height: height as u32,
            data,
        }
    }
}

impl Env for PelletGrid {
    type Config = PelletGridConfig;
    type Obs = RgbFrame;

    fn build(config: &Self::Config, seed: i64) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config: config.clone(),
            rng: StdRng::seed_from_u64(seed as u64),
            player: (0, 0),
            ghost: (config.rows - 1, config.cols - 1),
            pellets: vec![false; config.rows * config.cols],
            n_left: 0,
            t: 0,
        })
    }

    fn n_actions(&self) -> usize {
        N_ACTIONS
    }

    fn reset(&mut self) -> Result<RgbFrame> {
        self.player = (0, 0);
        self.ghost = (self.config.rows - 1, self.config.cols - 1);
        self.t = 0;

        let n_cells = self.config.rows * self.config.cols;
        let free = (1..n_cells - 1).collect::<Vec<_>>();
        self.pellets = vec![false; n_cells];
        for &i in free.choose_multiple(&mut self.rng, self.config.n_pellets) {
            self.pellets[i] = true;
        }
        self.n_left = self.config.n_pellets;

        Ok(self.render())
    }

    fn step(&mut self, act: usize) -> Result<Step<Self>> {
        if act >= N_ACTIONS {
            return Err(DeepqError::InvalidAction {
                act,
                n_actions: N_ACTIONS,
            }
            .into());
        }
        self.t += 1;

        let mut reward = 0.0;
        self.player = self.moved(self.player, act);
        let i = self.cell(self.player);
        if self.pellets[i] {
            self.pellets[i] = false;
            self.n_left -= 1;
            reward += self.config.pellet_reward;
        }

        let mut caught = false;
        if self.config.ghost {
            caught = self.ghost == self.player;
            let ghost_act = self.rng.gen_range(0..N_ACTIONS);
            self.ghost = self.moved(self.ghost, ghost_act);
            caught |= self.ghost == self.player;
        }

        let is_terminated = self.n_left == 0 || caught;
        let is_truncated = !is_terminated && self.t >= self.config.max_steps;
        Ok(Step::new(self.render(), act, reward, is_terminated, is_truncated))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempdir::TempDir;

    fn pixel(frame: &RgbFrame, x: usize, y: usize) -> [u8; 3] {
        let i = 3 * (y * frame.width as usize + x);
        [frame.data[i], frame.data[i + 1], frame.data[i + 2]]
    }

    fn quiet(n_pellets: usize) -> PelletGridConfig {
        PelletGridConfig {
            rows: 3,
            cols: 3,
            n_pellets,
            cell_size: 8,
            ghost: false,
            max_steps: 10,
            ..Default::default()
        }
    }

    #[test]
    fn test_frame_layout() -> Result<()> {
        let mut env = PelletGrid::build(&PelletGridConfig::default(), 0)?;
        let frame = env.reset()?;

        assert_eq!((frame.width, frame.height), (128, 128));
        assert_eq!(frame.data.len(), 3 * 128 * 128);
        assert_eq!(pixel(&frame, 0, 0), YELLOW);
        assert_eq!(pixel(&frame, 127, 127), RED);
        let n_white = frame.data.chunks(3).filter(|p| **p == WHITE).count();
        // Each pellet is a 4x4 square.
        assert_eq!(n_white, 12 * 16);
        Ok(())
    }

    #[test]
    fn test_layout_is_reproducible() -> Result<()> {
        let config = PelletGridConfig::default();
        let a = PelletGrid::build(&config, 1)?.reset()?;
        let b = PelletGrid::build(&config, 1)?.reset()?;
        assert_eq!(a, b);
        Ok(())
    }

    #[test]
    fn test_eating_every_pellet_terminates() -> Result<()> {
        // Every cell but the two corners holds a pellet.
        let mut env = PelletGrid::build(&quiet(7), 0)?;
        env.reset()?;

        let mut score = 0.0;
        // Snake through the grid: right, right, down, left, left, down, right.
        for (k, act) in [2, 2, 3, 4, 4, 3, 2].into_iter().enumerate() {
            let step = env.step(act)?;
            score += step.reward;
            assert_eq!(step.is_terminated, k == 6);
        }
        assert_eq!(score, 70.0);
        assert_eq!(env.n_left(), 0);
        Ok(())
    }

    #[test]
    fn test_walls_and_truncation() -> Result<()> {
        let mut env = PelletGrid::build(&quiet(1), 0)?;
        env.reset()?;

        for t in 1..=10 {
            // Moving up from the top row leaves the player in place.
            let step = env.step(1)?;
            assert_eq!(pixel(&step.obs, 0, 0), YELLOW);
            assert!(!step.is_terminated);
            assert_eq!(step.is_truncated, t == 10);
        }
        Ok(())
    }

    #[test]
    fn test_invalid_action() -> Result<()> {
        let mut env = PelletGrid::build(&quiet(1), 0)?;
        env.reset()?;
        assert!(env.step(N_ACTIONS).is_err());
        Ok(())
    }

    #[test]
    fn test_invalid_config() {
        assert!(PelletGrid::build(&quiet(8), 0).is_err());
        let config = PelletGridConfig {
            rows: 1,
            ..Default::default()
        };
        assert!(PelletGrid::build(&config, 0).is_err());
    }

    #[test]
    fn test_serde_config() -> Result<()> {
        let dir = TempDir::new("pellet_grid")?;
        let path = dir.path().join("env.yaml");
        quiet(3).save(&path)?;
        assert_eq!(PelletGridConfig::load(&path)?, quiet(3));
        Ok(())
    }
}
