use std::collections::VecDeque;

/// Bounded history of samples with a running sum.
///
/// Values are milliseconds when used for frame timing, but the series itself
/// is unit-agnostic.
#[derive(Clone, Debug)]
pub struct TimeSeries {
  samples: VecDeque<f32>,
  capacity: usize,
  sum: f32,
}

impl TimeSeries {
  pub fn new(capacity: usize) -> Self {
    let capacity = capacity.max(1);
    Self {
      samples: VecDeque::with_capacity(capacity),
      capacity,
      sum: 0.0,
    }
  }

  /// Appends a sample, dropping the oldest one when full.
  pub fn push(&mut self, value: f32) {
    if self.samples.len() == self.capacity {
      if let Some(old) = self.samples.pop_front() {
        self.sum -= old;
      }
    }
    self.samples.push_back(value);
    self.sum += value;
  }

  pub fn samples(&self) -> &VecDeque<f32> {
    &self.samples
  }

  pub fn len(&self) -> usize {
    self.samples.len()
  }

  pub fn is_empty(&self) -> bool {
    self.samples.is_empty()
  }

  pub fn capacity(&self) -> usize {
    self.capacity
  }

  pub fn current(&self) -> Option<f32> {
    self.samples.back().copied()
  }

  pub fn avg(&self) -> f32 {
    if self.samples.is_empty() {
      0.0
    } else {
      self.sum / self.samples.len() as f32
    }
  }

  pub fn min(&self) -> f32 {
    self.samples.iter().copied().fold(f32::INFINITY, f32::min)
  }

  /// Largest recorded sample, 0 when empty.
  pub fn longest(&self) -> f32 {
    self.samples.iter().copied().fold(0.0, f32::max)
  }

  /// Events per second implied by the average sample, in milliseconds.
  pub fn rate(&self) -> f32 {
    let avg = self.avg();
    if avg > 0.0 { 1000.0 / avg } else { 0.0 }
  }

  /// Total of the recorded samples.
  pub fn recorded_period(&self) -> f32 {
    self.sum
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn oldest_sample_is_dropped_when_full() {
    let mut series = TimeSeries::new(3);
    for v in [1.0, 2.0, 3.0, 10.0] {
      series.push(v);
    }
    assert_eq!(series.len(), 3);
    assert_eq!(series.current(), Some(10.0));
    assert!((series.avg() - 5.0).abs() < 1e-5);
    assert_eq!(series.min(), 2.0);
    assert_eq!(series.longest(), 10.0);
  }

  #[test]
  fn rate_inverts_the_average_frame_time() {
    let mut series = TimeSeries::new(8);
    series.push(20.0);
    series.push(20.0);
    assert!((series.rate() - 50.0).abs() < 1e-3);
    assert_eq!(TimeSeries::new(4).rate(), 0.0);
  }
}
