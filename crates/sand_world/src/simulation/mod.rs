//! Falling-sand simulation.
//!
//! [`Simulation`] ties the world, the scheduler and the rules together. Each
//! [`Simulation::update`] hands the previous tick's dirty marks to the chunks
//! that own them, then processes every dirty chunk in four parity-group
//! passes. [`Simulation::render`] repaints only stale cells.

pub mod hash;
mod processor;
pub mod rules;

use std::sync::Mutex;
use std::time::Duration;

use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub use processor::ScanOrder;
use processor::{RenderJob, TickJob};
pub use rules::{FireParams, Rules};

use crate::config::{ConfigError, SimConfig};
use crate::coords::{BlockPos, ChunkPos, Layout};
use crate::diagnostics::{PerfStats, Stopwatch};
use crate::particle::{MaterialKind, Particle};
use crate::primitives::Rect;
use crate::render::{ColorTable, EMPTY_COLOR, PixelSink};
use crate::scheduling::{Canvas, LoadTracker, Mode, Scheduler};
use crate::world::{LoadOutcome, World};
use hash::hash21uu64;

/// Salt separating the spawn generator from the worker generators.
const SPAWN_STREAM: u64 = 0x5350_4157_4e00_0000;

/// A running simulation.
pub struct Simulation {
  config: SimConfig,
  world: World,
  scheduler: Scheduler,
  /// One generator per scheduler worker, the caller last.
  rngs: Vec<Mutex<StdRng>>,
  spawn_rng: StdRng,
  rules: Rules,
  colors: ColorTable,
  tick: u64,
  updated_particles: u64,
  perf: PerfStats,
  /// Set when blocks were loaded or dropped since the last render. The next
  /// render repaints and flushes the whole window.
  stale_window: bool,
}

impl Simulation {
  /// Creates a simulation with an empty window and its worker pool.
  pub fn new(config: SimConfig) -> Result<Self, ConfigError> {
    config.validate()?;
    let world = World::new(config.layout)?;
    let workers = config.scheduler.workers();
    let seed = config.simulation.seed;

    let rngs = (0..=workers as u64)
      .map(|worker| Mutex::new(StdRng::seed_from_u64(hash21uu64(seed, worker))))
      .collect();
    let rules = Rules::new(&config);
    let fire = rules.fire;

    info!(
      "Simulation: {}x{} cells, {}-cell chunks, {} worker(s), water spread {}",
      config.layout.window_cells(),
      config.layout.window_cells(),
      config.layout.chunk_size,
      workers,
      rules.water_spread
    );

    Ok(Self {
      config,
      world,
      scheduler: Scheduler::new(workers),
      rngs,
      spawn_rng: StdRng::seed_from_u64(hash21uu64(seed, SPAWN_STREAM)),
      rules,
      colors: ColorTable::new(config.fire.palette, fire.mean_ms.saturating_add(fire.dev_ms)),
      tick: 0,
      updated_particles: 0,
      perf: PerfStats::default(),
      stale_window: true,
    })
  }

  pub fn config(&self) -> &SimConfig {
    &self.config
  }

  pub fn layout(&self) -> &Layout {
    self.world.layout()
  }

  pub fn world(&self) -> &World {
    &self.world
  }

  pub fn rules(&self) -> &Rules {
    &self.rules
  }

  /// Makes a block resident. See [`World::load_block`].
  pub fn load_block(&mut self, pos: BlockPos) -> LoadOutcome {
    let outcome = self.world.load_block(pos);
    if !outcome.already_loaded {
      self.stale_window = true;
    }
    outcome
  }

  /// Drops a block. Returns whether it was loaded.
  pub fn unload_block(&mut self, pos: BlockPos) -> bool {
    let unloaded = self.world.unload_block(pos);
    self.stale_window |= unloaded;
    unloaded
  }

  /// Loads every block overlapping `cells`. Returns the number of blocks
  /// that were not resident before.
  ///
  /// A rectangle wider than the window keeps evicting its own blocks; only
  /// the last ones loaded stay resident.
  pub fn ensure_loaded(&mut self, cells: Rect) -> usize {
    if cells.is_empty() {
      return 0;
    }
    let layout = *self.world.layout();
    let first = layout.block_of(cells.left, cells.top);
    let last = layout.block_of(cells.right, cells.bottom);
    let mut loaded = 0;
    for by in first.y..=last.y {
      for bx in first.x..=last.x {
        if !self.load_block(BlockPos::new(bx, by)).already_loaded {
          loaded += 1;
        }
      }
    }
    loaded
  }

  /// Advances the simulation by one fixed tick.
  pub fn update(&mut self) {
    let watch = Stopwatch::start();

    self.world.fit_dirty_rects(false);
    self.scheduler.clear();
    let mut dirty = 0;
    for (pos, chunk) in self.world.chunks() {
      if chunk.is_dirty() {
        self.scheduler.push_chunk(pos);
        dirty += 1;
      }
    }

    let order = ScanOrder::for_tick(self.config.simulation.seed, self.tick);
    let processed = {
      let canvas = Canvas::new(&mut self.world);
      let job = TickJob::new(&canvas, &self.rules, &self.rngs, order);
      self.scheduler.run(Mode::Prepare, &job);
      self.scheduler.run(Mode::Update, &job);
      job.processed()
    };

    self.updated_particles = processed;
    self.tick += 1;
    self.perf.updated_particles.push(processed as f32);
    watch.stop(&mut self.perf.update_time);
    debug!(
      "Tick {}: {} dirty chunk(s), {} particle(s) updated",
      self.tick, dirty, processed
    );
  }

  /// Repaints stale cells into `sink` and flushes them.
  ///
  /// Only chunks with a non-empty redraw rectangle are painted, and only the
  /// union of those rectangles is flushed. After the resident blocks changed
  /// the whole window is repainted, unloaded blocks in black, and flushed.
  /// Returns the number of chunks painted.
  pub fn render<S: PixelSink>(&mut self, sink: &mut S) -> usize {
    let watch = Stopwatch::start();
    let full = std::mem::take(&mut self.stale_window);
    if full {
      self.redraw_all();
    }

    self.world.fit_redraw_rects();
    self.scheduler.clear();
    let mut region = Rect::EMPTY;
    let mut chunks = 0;
    for (pos, chunk) in self.world.chunks() {
      let stale = chunk.rects.redraw;
      if !stale.is_empty() {
        self.scheduler.push_chunk(pos);
        region.include_rect(&stale);
        chunks += 1;
      }
    }
    if chunks == 0 && !full {
      return 0;
    }

    let window = self.world.loaded_bounds();
    let origin = (window.left, window.top);
    {
      let canvas = Canvas::new(&mut self.world);
      let job = RenderJob::new(&canvas, &self.colors, &*sink, origin);
      self.scheduler.run(Mode::Render, &job);
    }

    if full {
      self.blank_unloaded(&*sink);
      sink.flush();
    } else {
      sink.flush_region(region.translated(-origin.0, -origin.1));
    }
    watch.stop(&mut self.perf.render_time);
    chunks
  }

  /// Paints every unloaded block of the window black.
  fn blank_unloaded<S: PixelSink + ?Sized>(&self, sink: &S) {
    let window = self.world.window_rect();
    let bounds = self.world.loaded_bounds();
    let layout = self.world.layout();
    for by in window.top..=window.bottom {
      for bx in window.left..=window.right {
        let pos = BlockPos::new(bx, by);
        if self.world.is_block_loaded(pos) {
          continue;
        }
        let cells = layout.block_bounds(pos);
        for y in cells.top..=cells.bottom {
          for x in cells.left..=cells.right {
            sink.set_pixel((x - bounds.left) as u32, (y - bounds.top) as u32, EMPTY_COLOR);
          }
        }
      }
    }
  }

  /// Marks every loaded cell stale, so the next render repaints it.
  pub fn redraw_all(&mut self) {
    let layout = *self.world.layout();
    self.world.for_each_chunk_mut(|pos, chunk| {
      chunk.rects.redraw = layout.chunk_bounds(pos);
    });
  }

  /// Fills the loaded cells within `radius` of `(cx, cy)` with fresh
  /// particles of `kind`. Returns the number of cells written.
  pub fn spawn_cloud(&mut self, cx: i32, cy: i32, radius: i32, kind: MaterialKind) -> usize {
    let r = radius.max(0);
    let area = Rect::new(cx - r, cy - r, cx + r, cy + r);
    let bounds = self.world.loaded_bounds();
    if !area.intersects(&bounds) {
      return 0;
    }
    let area = area.intersection(&bounds);
    let r2 = i64::from(r) * i64::from(r);

    let mut written = 0;
    for y in area.top..=area.bottom {
      for x in area.left..=area.right {
        let (dx, dy) = (i64::from(x - cx), i64::from(y - cy));
        if dx * dx + dy * dy > r2 || !self.world.is_particle_loaded(x, y) {
          continue;
        }
        let lifetime = match kind {
          MaterialKind::Fire => self.rules.fire.lifetime(self.spawn_rng.r#gen()),
          _ => 0,
        };
        *self.world.particle_mut(x, y) = Particle::new(kind, lifetime);
        self.world.mark(x, y, true);
        written += 1;
      }
    }
    written
  }

  /// Overwrites one cell and marks it dirty.
  ///
  /// # Panics
  /// Panics if the cell is not loaded.
  pub fn set_particle(&mut self, x: i32, y: i32, particle: Particle) {
    *self.world.particle_mut(x, y) = particle;
    self.world.mark(x, y, true);
  }

  /// # Panics
  /// Panics if the cell is not loaded.
  pub fn particle(&self, x: i32, y: i32) -> &Particle {
    self.world.particle(x, y)
  }

  pub fn try_particle(&self, x: i32, y: i32) -> Option<&Particle> {
    self.world.try_particle(x, y)
  }

  /// Whether the chunk has cells to process in the current tick. Unloaded
  /// chunks are never dirty.
  pub fn is_chunk_dirty(&self, pos: ChunkPos) -> bool {
    self.world.chunk(pos).is_some_and(|c| c.is_dirty())
  }

  /// Cells of the chunk processed in the current tick.
  pub fn chunk_dirty_rect(&self, pos: ChunkPos) -> Option<Rect> {
    self.world.chunk(pos).map(|c| c.rects.cur)
  }

  /// Share of chunks each worker processed in the last update, the calling
  /// thread last.
  pub fn load_balance_stats(&self) -> Vec<f32> {
    self.scheduler.load_balance().iter().map(LoadTracker::last).collect()
  }

  /// Rolling per-worker load history.
  pub fn load_balance(&self) -> &[LoadTracker] {
    self.scheduler.load_balance()
  }

  pub fn num_workers(&self) -> usize {
    self.scheduler.num_workers()
  }

  /// Particles processed by the last [`Simulation::update`].
  pub fn num_updated_particles(&self) -> u64 {
    self.updated_particles
  }

  /// Loaded cells per material, indexed by [`MaterialKind::index`].
  pub fn material_counts(&self) -> [u64; MaterialKind::ALL.len()] {
    let mut counts = [0; MaterialKind::ALL.len()];
    for (_, chunk) in self.world.chunks() {
      for p in chunk.cells() {
        counts[p.kind().index()] += 1;
      }
    }
    counts
  }

  /// Completed ticks.
  pub fn tick(&self) -> u64 {
    self.tick
  }

  /// Ticks per simulated second.
  pub fn tick_hz(&self) -> u32 {
    self.rules.tick_hz
  }

  /// Fixed tick duration.
  pub fn tick_duration(&self) -> Duration {
    Duration::from_secs(1) / self.rules.tick_hz.max(1)
  }

  pub fn perf(&self) -> &PerfStats {
    &self.perf
  }
}
