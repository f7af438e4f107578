//! Sand World - chunked falling-sand cellular automaton.
//!
//! A large grid of particles (sand, water, wood, fire) updated by local rules
//! at a fixed tick. The grid is split into chunks for dirty tracking and
//! scheduling, and into blocks for streaming: only a bounded window of blocks
//! is resident at a time. Dirty chunks are processed in parallel by a worker
//! pool, four non-adjacent parity groups at a time.

pub mod config;
pub mod coords;
pub mod diagnostics;
pub mod particle;
pub mod primitives;
pub mod render;
pub mod scheduling;
pub mod simulation;
pub mod world;

pub use config::{ConfigError, FireConfig, FirePalette, SchedulerConfig, SimConfig, SimulationConfig};
pub use coords::{BLOCK_SIZE, BlockPos, CHUNK_SIZE, ChunkPos, Layout, NUM_BLOCKS, ParityGroup};
pub use diagnostics::{PerfStats, TimeSeries};
pub use particle::{Material, MaterialKind, Particle};
pub use primitives::{Block, Chunk, DirtyRects, Rect};
pub use render::{ColorTable, PixelSink, RenderBuffer, Rgba, rgb};
pub use scheduling::{ChunkProcessor, LoadTracker, Mode, Scheduler};
pub use simulation::{ScanOrder, Simulation};
pub use world::{LoadOutcome, SlotIndex, World};
