//! Utilities.
use anyhow::{anyhow, Result};
use candle_core::{DType, Tensor, Var};
use candle_nn::VarMap;
use log::trace;
use std::{collections::HashMap, sync::MutexGuard};

/// Suffixes of variables updated by batch normalization rather than by the optimizer.
const RUNNING_STATS: [&str; 2] = ["running_mean", "running_var"];

fn lock(varmap: &VarMap) -> Result<MutexGuard<'_, HashMap<String, Var>>> {
    varmap
        .data()
        .lock()
        .map_err(|_| anyhow!("Variable map is poisoned"))
}

/// Apply soft update on variables.
///
/// Variables are identified by their names.
///
/// dest = tau * src + (1.0 - tau) * dest
pub fn track(dest: &VarMap, src: &VarMap, tau: f64) -> Result<()> {
    let dest = lock(dest)?;
    let src = lock(src)?;

    for (k_dest, v_dest) in dest.iter() {
        let v_src = src
            .get(k_dest)
            .ok_or_else(|| anyhow!("Variable {} is missing in the source", k_dest))?;
        let t_dest = ((tau * v_src.as_tensor())? + (1.0 - tau) * v_dest.as_tensor())?;
        v_dest.set(&t_dest)?;
    }
    trace!("Tracked {} variables with tau = {}", dest.len(), tau);

    Ok(())
}

/// Overwrites variables of `dest` with those of `src` having the same names.
pub fn copy(dest: &VarMap, src: &VarMap) -> Result<()> {
    let dest = lock(dest)?;
    let src = lock(src)?;

    for (k_dest, v_dest) in dest.iter() {
        let v_src = src
            .get(k_dest)
            .ok_or_else(|| anyhow!("Variable {} is missing in the source", k_dest))?;
        v_dest.set(v_src.as_tensor())?;
    }
    trace!("Copied {} variables", dest.len());

    Ok(())
}

/// Returns the variables trained by gradient descent, leaving out running
/// statistics of batch normalization.
pub fn trainable_vars(varmap: &VarMap) -> Result<Vec<Var>> {
    Ok(lock(varmap)?
        .iter()
        .filter(|(k, _)| !RUNNING_STATS.iter().any(|s| k.ends_with(s)))
        .map(|(_, v)| v.clone())
        .collect())
}

/// See <https://pytorch.org/docs/stable/generated/torch.nn.SmoothL1Loss.html>.
pub fn smooth_l1_loss(x: &Tensor, y: &Tensor) -> Result<Tensor, candle_core::Error> {
    let d = (x - y)?.abs()?;
    let m1 = d.lt(1.0)?.to_dtype(DType::F32)?;
    let m2 = (1.0 - &m1)?;
    (((0.5 * m1)? * d.sqr()?)? + (m2 * (d - 0.5)?)?)?.mean_all()
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::Device;
    use candle_nn::Init;

    fn varmap(values: &[f32]) -> Result<VarMap> {
        let vm = VarMap::new();
        let init = Init::Randn {
            mean: 0.0,
            stdev: 1.0,
        };
        vm.get((values.len(),), "var1", init, DType::F32, &Device::Cpu)?;
        vm.get((1,), "bn.running_mean", Init::Const(0.0), DType::F32, &Device::Cpu)?;
        let t = Tensor::from_slice(values, (values.len(),), &Device::Cpu)?;
        lock(&vm)?.get("var1").unwrap().set(&t)?;
        Ok(vm)
    }

    fn var1(vm: &VarMap) -> Result<Vec<f32>> {
        Ok(lock(vm)?.get("var1").unwrap().as_tensor().to_vec1::<f32>()?)
    }

    #[test]
    fn test_track() -> Result<()> {
        let vm_src = varmap(&[1.0, 2.0, 3.0])?;
        let vm_dest = varmap(&[4.0, 5.0, 6.0])?;
        track(&vm_dest, &vm_src, 0.5)?;
        assert_eq!(var1(&vm_dest)?, vec![2.5, 3.5, 4.5]);
        Ok(())
    }

    #[test]
    fn test_copy() -> Result<()> {
        let vm_src = varmap(&[1.0, 2.0, 3.0])?;
        let vm_dest = varmap(&[4.0, 5.0, 6.0])?;
        copy(&vm_dest, &vm_src)?;
        assert_eq!(var1(&vm_dest)?, vec![1.0, 2.0, 3.0]);
        // The source is left as is.
        assert_eq!(var1(&vm_src)?, vec![1.0, 2.0, 3.0]);
        Ok(())
    }

    #[test]
    fn test_trainable_vars_skip_running_stats() -> Result<()> {
        let vm = varmap(&[1.0])?;
        assert_eq!(vm.all_vars().len(), 2);
        assert_eq!(trainable_vars(&vm)?.len(), 1);
        Ok(())
    }

    #[test]
    fn test_smooth_l1_loss() -> Result<()> {
        let x = Tensor::from_slice(&[0.0f32, 3.0], (2,), &Device::Cpu)?;
        let y = Tensor::from_slice(&[0.5f32, 0.0], (2,), &Device::Cpu)?;
        // (0.5 * 0.5^2 + (3 - 0.5)) / 2
        let loss = smooth_l1_loss(&x, &y)?.to_scalar::<f32>()?;
        assert!((loss - 1.3125).abs() < 1e-6);
        Ok(())
    }
}
