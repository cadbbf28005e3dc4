//! Optimizers.
use anyhow::Result;
use candle_core::{Tensor, Var};
use candle_nn::{AdamW, Optimizer as _, ParamsAdamW};
use candle_optimisers::adam::{Adam, ParamsAdam};
use serde::{Deserialize, Serialize};

/// Configuration of optimizer for training the action-value network.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub enum OptimizerConfig {
    /// AdamW optimizer.
    AdamW {
        /// Learning rate.
        lr: f64,
        #[serde(default = "default_beta1")]
        /// Coefficient of the running average of gradients.
        beta1: f64,
        #[serde(default = "default_beta2")]
        /// Coefficient of the running average of squared gradients.
        beta2: f64,
        #[serde(default = "default_eps")]
        /// Term added to the denominator.
        eps: f64,
        #[serde(default = "default_weight_decay")]
        /// Weight decay.
        weight_decay: f64,
    },

    /// Adam optimizer.
    Adam {
        /// Learning rate.
        lr: f64,
    },
}

fn default_beta1() -> f64 {
    ParamsAdamW::default().beta1
}

fn default_beta2() -> f64 {
    ParamsAdamW::default().beta2
}

fn default_eps() -> f64 {
    ParamsAdamW::default().eps
}

fn default_weight_decay() -> f64 {
    ParamsAdamW::default().weight_decay
}

impl OptimizerConfig {
    /// Constructs an optimizer updating `vars`.
    pub fn build(&self, vars: Vec<Var>) -> Result<Optimizer> {
        match &self {
            OptimizerConfig::AdamW {
                lr,
                beta1,
                beta2,
                eps,
                weight_decay,
            } => {
                let params = ParamsAdamW {
                    lr: *lr,
                    beta1: *beta1,
                    beta2: *beta2,
                    eps: *eps,
                    weight_decay: *weight_decay,
                };
                let opt = AdamW::new(vars, params)?;
                Ok(Optimizer::AdamW(opt))
            }
            OptimizerConfig::Adam { lr } => {
                let params = ParamsAdam {
                    lr: *lr,
                    ..ParamsAdam::default()
                };
                let opt = Adam::new(vars, params)?;
                Ok(Optimizer::Adam(opt))
            }
        }
    }

    /// Override learning rate.
    pub fn learning_rate(self, lr: f64) -> Self {
        match self {
            Self::AdamW {
                beta1,
                beta2,
                eps,
                weight_decay,
                ..
            } => Self::AdamW {
                lr,
                beta1,
                beta2,
                eps,
                weight_decay,
            },
            Self::Adam { .. } => Self::Adam { lr },
        }
    }
}

impl Default for OptimizerConfig {
    /// Adam with learning rate `5e-4`.
    fn default() -> Self {
        Self::Adam { lr: 5e-4 }
    }
}

/// Optimizers.
pub enum Optimizer {
    /// AdamW optimizer.
    AdamW(AdamW),

    /// Adam optimizer.
    Adam(Adam),
}

impl Optimizer {
    /// Computes gradients of `loss` and applies an update step.
    pub fn backward_step(&mut self, loss: &Tensor) -> Result<()> {
        match self {
            Self::AdamW(opt) => Ok(opt.backward_step(loss)?),
            Self::Adam(opt) => Ok(opt.backward_step(loss)?),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_learning_rate_override() {
        assert_eq!(
            OptimizerConfig::default().learning_rate(1e-3),
            OptimizerConfig::Adam { lr: 1e-3 }
        );
        let adamw = OptimizerConfig::AdamW {
            lr: 0.1,
            beta1: 0.8,
            beta2: 0.9,
            eps: 1e-6,
            weight_decay: 0.0,
        };
        match adamw.learning_rate(0.2) {
            OptimizerConfig::AdamW { lr, beta1, .. } => {
                assert_eq!(lr, 0.2);
                assert_eq!(beta1, 0.8);
            }
            _ => panic!("optimizer kind changed"),
        }
    }

    #[test]
    fn test_serde_defaults() -> Result<()> {
        let config: OptimizerConfig = serde_yaml::from_str("AdamW:\n  lr: 0.01\n")?;
        assert_eq!(
            config,
            OptimizerConfig::AdamW {
                lr: 0.01,
                beta1: default_beta1(),
                beta2: default_beta2(),
                eps: default_eps(),
                weight_decay: default_weight_decay(),
            }
        );
        Ok(())
    }
}
