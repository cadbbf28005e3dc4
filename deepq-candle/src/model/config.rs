use crate::{opt::OptimizerConfig, CnnConfig};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration of [`QNetwork`](super::QNetwork).
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct QNetworkConfig {
    /// Network architecture.
    pub cnn: CnnConfig,

    /// Optimizer.
    #[serde(default)]
    pub opt_config: OptimizerConfig,
}

impl QNetworkConfig {
    /// Configuration for RGB frames of 128x128 pixels trained with Adam.
    pub fn new(n_actions: usize) -> Self {
        Self {
            cnn: CnnConfig::new(n_actions),
            opt_config: OptimizerConfig::default(),
        }
    }

    /// Sets the network architecture.
    pub fn cnn(mut self, v: CnnConfig) -> Self {
        self.cnn = v;
        self
    }

    /// Sets optimizer configuration.
    pub fn opt_config(mut self, v: OptimizerConfig) -> Self {
        self.opt_config = v;
        self
    }

    /// Constructs [`QNetworkConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`QNetworkConfig`] as a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempdir::TempDir;

    #[test]
    fn test_serde_q_network_config() -> Result<()> {
        let config = QNetworkConfig::new(9)
            .cnn(CnnConfig::new(9).frame_size(64, 96))
            .opt_config(OptimizerConfig::Adam { lr: 1e-4 });

        let dir = TempDir::new("q_network_config")?;
        let path = dir.path().join("model.yaml");
        config.save(&path)?;
        assert_eq!(QNetworkConfig::load(&path)?, config);
        Ok(())
    }
}
