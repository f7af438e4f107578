//! Chunk: a square tile of particles with dirty-region tracking.

use super::Rect;
use crate::particle::Particle;

/// Dirty rectangles of a chunk, all in absolute cell coordinates.
///
/// `next` and `redraw` may extend past the chunk while a tick runs: rules
/// mark cells they touch in neighbouring chunks through the chunk they are
/// processing, and [`World::fit_dirty_rects`](crate::world::World::fit_dirty_rects)
/// hands the overflow to the neighbours afterwards.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DirtyRects {
  /// Region processed this tick. Always within the chunk.
  pub cur: Rect,
  /// Region marked during this tick, consumed by the next one.
  pub next: Rect,
  /// Region whose pixels are stale.
  pub redraw: Rect,
}

impl DirtyRects {
  /// Marks a cell as changed for both the next tick and the next redraw.
  #[inline]
  pub fn mark(&mut self, x: i32, y: i32, with_neighbours: bool) {
    self.next.include(x, y, with_neighbours);
    self.redraw.include(x, y, with_neighbours);
  }

  pub fn reset(&mut self) {
    self.cur.reset();
    self.next.reset();
    self.redraw.reset();
  }
}

/// A `size x size` tile of particles.
#[derive(Clone, Debug)]
pub struct Chunk {
  size: u32,
  cells: Box<[Particle]>,
  pub rects: DirtyRects,
}

impl Chunk {
  /// Creates an empty, clean chunk.
  pub fn new(size: u32) -> Self {
    let len = (size * size) as usize;
    Self {
      size,
      cells: vec![Particle::EMPTY; len].into_boxed_slice(),
      rects: DirtyRects::default(),
    }
  }

  #[inline]
  pub fn size(&self) -> u32 {
    self.size
  }

  #[inline]
  fn index(&self, x: u32, y: u32) -> usize {
    debug_assert!(x < self.size && y < self.size, "local ({x}, {y}) out of chunk");
    (y * self.size + x) as usize
  }

  /// Particle at local coordinates.
  #[inline]
  pub fn get(&self, x: u32, y: u32) -> &Particle {
    &self.cells[self.index(x, y)]
  }

  #[inline]
  pub fn get_mut(&mut self, x: u32, y: u32) -> &mut Particle {
    let i = self.index(x, y);
    &mut self.cells[i]
  }

  /// Row-major cell storage.
  pub fn cells(&self) -> &[Particle] {
    &self.cells
  }

  pub(crate) fn cells_mut(&mut self) -> &mut [Particle] {
    &mut self.cells
  }

  /// A chunk is dirty when it has cells to process this tick.
  #[inline]
  pub fn is_dirty(&self) -> bool {
    !self.rects.cur.is_empty()
  }

  /// Empties every cell and every rectangle.
  pub fn reset(&mut self) {
    self.cells.fill(Particle::EMPTY);
    self.rects.reset();
  }
}
