//! Chunk jobs run by the scheduler.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use rand::rngs::StdRng;

use super::hash::hash21uu64;
use super::rules::{Rules, update_particle};
use crate::coords::ChunkPos;
use crate::primitives::Rect;
use crate::render::{ColorTable, PixelSink};
use crate::scheduling::{Canvas, ChunkLease, ChunkProcessor, Mode};

/// Direction in which a chunk's dirty cells are visited.
///
/// Alternating it from tick to tick keeps piles from drifting to one side.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ScanOrder {
  pub bottom_up: bool,
  pub left_to_right: bool,
}

impl ScanOrder {
  /// One of the 4 orders, picked from the seed and tick.
  pub fn for_tick(seed: u64, tick: u64) -> Self {
    let h = hash21uu64(seed, tick);
    Self {
      bottom_up: h & 2 == 0,
      left_to_right: h & 1 == 0,
    }
  }

  /// Calls `f` for every cell of `rect` in this order.
  pub fn visit(self, rect: Rect, mut f: impl FnMut(i32, i32)) {
    if rect.is_empty() {
      return;
    }
    let rows: Box<dyn Iterator<Item = i32>> = if self.bottom_up {
      Box::new((rect.top..=rect.bottom).rev())
    } else {
      Box::new(rect.top..=rect.bottom)
    };
    for y in rows {
      if self.left_to_right {
        for x in rect.left..=rect.right {
          f(x, y);
        }
      } else {
        for x in (rect.left..=rect.right).rev() {
          f(x, y);
        }
      }
    }
  }
}

/// Prepare and update passes of one tick.
pub struct TickJob<'a> {
  canvas: &'a Canvas<'a>,
  rules: &'a Rules,
  rngs: &'a [Mutex<StdRng>],
  order: ScanOrder,
  processed: AtomicU64,
}

impl<'a> TickJob<'a> {
  pub fn new(
    canvas: &'a Canvas<'a>,
    rules: &'a Rules,
    rngs: &'a [Mutex<StdRng>],
    order: ScanOrder,
  ) -> Self {
    Self {
      canvas,
      rules,
      rngs,
      order,
      processed: AtomicU64::new(0),
    }
  }

  /// Particles updated so far.
  pub fn processed(&self) -> u64 {
    self.processed.load(Ordering::Relaxed)
  }

  fn update(&self, lease: &ChunkLease<'_>, worker: usize) {
    let mut rng = self.rngs[worker]
      .lock()
      .unwrap_or_else(PoisonError::into_inner);
    let mut count = 0;
    self.order.visit(lease.cur_rect(), |x, y| {
      if update_particle(lease, self.rules, &mut rng, x, y) {
        count += 1;
      }
    });
    self.processed.fetch_add(count, Ordering::Relaxed);
  }
}

impl ChunkProcessor for TickJob<'_> {
  fn process(&self, mode: Mode, chunk: ChunkPos, worker: usize) {
    let Some(lease) = self.canvas.lease(chunk) else {
      return;
    };
    match mode {
      Mode::Prepare => lease.clear_updated(),
      Mode::Update => self.update(&lease, worker),
      Mode::Render => {}
    }
  }
}

/// Repaints the stale region of each chunk into a sink.
pub struct RenderJob<'a, S: PixelSink + ?Sized> {
  canvas: &'a Canvas<'a>,
  colors: &'a ColorTable,
  sink: &'a S,
  /// Top-left cell of the window, mapped to pixel (0, 0).
  origin: (i32, i32),
}

impl<'a, S: PixelSink + ?Sized> RenderJob<'a, S> {
  pub fn new(canvas: &'a Canvas<'a>, colors: &'a ColorTable, sink: &'a S, origin: (i32, i32)) -> Self {
    Self {
      canvas,
      colors,
      sink,
      origin,
    }
  }
}

impl<S: PixelSink + ?Sized> ChunkProcessor for RenderJob<'_, S> {
  fn process(&self, mode: Mode, chunk: ChunkPos, _worker: usize) {
    debug_assert_eq!(mode, Mode::Render);
    let Some(lease) = self.canvas.lease(chunk) else {
      return;
    };
    let stale = lease.take_redraw().clipped(&lease.bounds());
    if stale.is_empty() {
      return;
    }
    let (ox, oy) = self.origin;
    for y in stale.top..=stale.bottom {
      for x in stale.left..=stale.right {
        if let Some(p) = lease.get(x, y) {
          self
            .sink
            .set_pixel((x - ox) as u32, (y - oy) as u32, self.colors.color(&p));
        }
      }
    }
  }
}
