//! FIFO replay buffer.
use super::{ReplayBufferConfig, Transition};
use crate::{error::DeepqError, ExperienceBufferBase, ReplayBufferBase, TransitionBatch};
use anyhow::Result;
use rand::{rngs::StdRng, seq::index, SeedableRng};
use std::collections::{vec_deque, VecDeque};

/// A replay buffer of bounded capacity.
///
/// Transitions are kept in insertion order. Once the buffer is full, pushing a
/// transition evicts the oldest one. Batches are drawn uniformly at random
/// without replacement.
pub struct SimpleReplayBuffer<O> {
    capacity: usize,
    buf: VecDeque<Transition<O>>,
    rng: StdRng,
}

impl<O: Clone> SimpleReplayBuffer<O> {
    /// Returns the capacity of the buffer.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Iterates over the stored transitions from the oldest to the newest.
    pub fn iter(&self) -> vec_deque::Iter<'_, Transition<O>> {
        self.buf.iter()
    }

    /// Returns indices of `size` distinct transitions drawn uniformly at random.
    fn sample_ixs(&mut self, size: usize) -> Result<Vec<usize>> {
        if size == 0 {
            return Err(DeepqError::InvalidBatchSize.into());
        }
        if size > self.buf.len() {
            return Err(DeepqError::InsufficientTransitions {
                requested: size,
                available: self.buf.len(),
            }
            .into());
        }
        Ok(index::sample(&mut self.rng, self.buf.len(), size).into_vec())
    }
}

impl<O: Clone> ExperienceBufferBase for SimpleReplayBuffer<O> {
    type Item = Transition<O>;

    fn push(&mut self, tr: Self::Item) -> Result<()> {
        if self.capacity == 0 {
            return Ok(());
        }
        if self.buf.len() == self.capacity {
            self.buf.pop_front();
        }
        self.buf.push_back(tr);
        Ok(())
    }

    fn len(&self) -> usize {
        self.buf.len()
    }
}

impl<O: Clone> ReplayBufferBase for SimpleReplayBuffer<O> {
    type Config = ReplayBufferConfig;
    type Batch = TransitionBatch<O>;

    fn build(config: &Self::Config) -> Self {
        Self {
            capacity: config.capacity,
            buf: VecDeque::with_capacity(config.capacity),
            rng: StdRng::seed_from_u64(config.seed),
        }
    }

    fn batch(&mut self, size: usize) -> Result<Self::Batch> {
        let ixs = self.sample_ixs(size)?;
        let mut batch = TransitionBatch::with_capacity(size);

        for ix in ixs {
            let tr = &self.buf[ix];
            batch.obs.push(tr.obs.clone());
            batch.act.push(tr.act);
            batch.next_obs.push(tr.next_obs.clone());
            batch.reward.push(tr.reward);
            batch.is_terminated.push(tr.is_terminated);
        }

        Ok(batch)
    }
}
