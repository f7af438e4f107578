//! Timing instrumentation.

mod profiler;
mod time_series;

pub use profiler::{PerfStats, SAMPLE_CAPACITY, Stopwatch};
pub use time_series::TimeSeries;
