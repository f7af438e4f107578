//! Rolling load-balance statistics.

/// Fixed-window rolling average over the last `N` samples.
///
/// The window starts filled with zeros, so the average ramps up over the
/// first `N` pushes instead of jumping to the first sample.
#[derive(Clone, Debug)]
pub struct RollingAverage<const N: usize> {
  samples: [f32; N],
  sum: f32,
  next: usize,
}

/// Per-worker share of chunks processed, over the last 64 update runs.
pub type LoadTracker = RollingAverage<64>;

impl<const N: usize> RollingAverage<N> {
  pub const fn new() -> Self {
    Self {
      samples: [0.0; N],
      sum: 0.0,
      next: 0,
    }
  }

  pub fn push(&mut self, value: f32) {
    self.sum += value - self.samples[self.next];
    self.samples[self.next] = value;
    self.next = (self.next + 1) % N;
  }

  /// Mean over the whole window.
  pub fn average(&self) -> f32 {
    self.sum / N as f32
  }

  pub fn sum(&self) -> f32 {
    self.sum
  }

  /// Most recent sample.
  pub fn last(&self) -> f32 {
    self.samples[(self.next + N - 1) % N]
  }

  /// Samples in storage order (not chronological).
  pub fn iter(&self) -> impl Iterator<Item = f32> + '_ {
    self.samples.iter().copied()
  }
}

impl<const N: usize> Default for RollingAverage<N> {
  fn default() -> Self {
    Self::new()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn average_counts_the_zero_prefill() {
    let mut avg = RollingAverage::<4>::new();
    avg.push(1.0);
    assert_eq!(avg.last(), 1.0);
    assert!((avg.average() - 0.25).abs() < 1e-6);
  }

  #[test]
  fn old_samples_fall_out_of_the_window() {
    let mut avg = RollingAverage::<2>::new();
    avg.push(10.0);
    avg.push(20.0);
    avg.push(30.0);
    assert!((avg.sum() - 50.0).abs() < 1e-4);
    assert_eq!(avg.last(), 30.0);
  }
}
