//! Sliding window of episode scores.
use std::collections::VecDeque;

/// Scores of the most recent episodes.
///
/// Once `capacity` scores are held, pushing a score drops the oldest one.
#[derive(Debug, Clone)]
pub struct ScoreWindow {
    capacity: usize,
    scores: VecDeque<f32>,
}

impl ScoreWindow {
    /// Constructs an empty window.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            scores: VecDeque::with_capacity(capacity),
        }
    }

    /// Appends the score of an episode.
    pub fn push(&mut self, score: f32) {
        if self.capacity == 0 {
            return;
        }
        if self.scores.len() == self.capacity {
            self.scores.pop_front();
        }
        self.scores.push_back(score);
    }

    /// Mean of the held scores, `None` if the window is empty.
    ///
    /// The mean is taken over the scores held so far, so it is defined
    /// before the window fills up.
    pub fn mean(&self) -> Option<f32> {
        if self.scores.is_empty() {
            None
        } else {
            Some(self.scores.iter().sum::<f32>() / self.scores.len() as f32)
        }
    }

    /// The number of held scores.
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    /// Returns `true` if no score is held.
    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Returns `true` if the window holds `capacity` scores.
    pub fn is_full(&self) -> bool {
        self.scores.len() == self.capacity
    }

    /// Capacity of the window.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
