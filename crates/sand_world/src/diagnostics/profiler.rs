use web_time::{Duration, Instant};

use super::time_series::TimeSeries;

/// Frames kept per series.
pub const SAMPLE_CAPACITY: usize = 64;

/// Wall-clock cost of the last simulation and render passes.
#[derive(Clone, Debug)]
pub struct PerfStats {
  /// Milliseconds per `update()`.
  pub update_time: TimeSeries,
  /// Milliseconds per `render()` that repainted something.
  pub render_time: TimeSeries,
  /// Particles processed per `update()`.
  pub updated_particles: TimeSeries,
}

impl Default for PerfStats {
  fn default() -> Self {
    Self {
      update_time: TimeSeries::new(SAMPLE_CAPACITY),
      render_time: TimeSeries::new(SAMPLE_CAPACITY),
      updated_particles: TimeSeries::new(SAMPLE_CAPACITY),
    }
  }
}

/// Measures the time until [`Stopwatch::stop`] is called.
pub struct Stopwatch(Instant);

impl Stopwatch {
  pub fn start() -> Self {
    Self(Instant::now())
  }

  pub fn elapsed(&self) -> Duration {
    self.0.elapsed()
  }

  /// Records the elapsed time, in milliseconds, into `series`.
  pub fn stop(self, series: &mut TimeSeries) {
    series.push(self.elapsed().as_secs_f32() * 1000.0);
  }
}
