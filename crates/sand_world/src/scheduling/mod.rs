//! Parallel chunk processing.
//!
//! - [`Scheduler`]: worker pool draining the four parity groups in turn
//! - [`Canvas`]: lock-free cell access for the chunks being processed
//! - [`LoadTracker`]: per-worker share of processed chunks

mod canvas;
mod load;
mod queue;
mod scheduler;

pub use canvas::{Canvas, ChunkLease};
pub use load::{LoadTracker, RollingAverage};
pub use queue::ChunkQueue;
pub use scheduler::{ChunkProcessor, Mode, Scheduler};
