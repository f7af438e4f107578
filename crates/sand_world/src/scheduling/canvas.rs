//! Canvas: shared access to the world's chunks during a scheduler run.
//!
//! Workers of one parity group process chunks concurrently, and a rule
//! running in one chunk reads and writes cells in the 8 chunks around it.
//! The [`Canvas`] hands out a [`ChunkLease`] per chunk being processed; the
//! lease reaches into the neighbourhood through raw pointers.

use std::marker::PhantomData;
use std::ptr;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::coords::{ChunkPos, Layout};
use crate::particle::Particle;
use crate::primitives::{DirtyRects, Rect};
use crate::world::World;

#[derive(Clone, Copy)]
struct ChunkPtr {
  cells: *mut Particle,
  rects: *mut DirtyRects,
}

/// The loaded chunks of a world, addressable from several threads.
///
/// # Safety
/// Cells are accessed without locking. This is sound only when chunks leased
/// at the same time are at least 2 apart along some axis (one parity group)
/// and rules never reach further than [`Layout::max_reach`] from their chunk,
/// so two leases never touch the same cell. Dirty rectangles are only ever
/// written through the lease of the chunk that owns them.
pub struct Canvas<'w> {
  layout: Layout,
  /// First chunk of the window.
  origin: ChunkPos,
  /// Window edge in chunks.
  span: i32,
  chunks: Vec<Option<ChunkPtr>>,
  claimed: Vec<AtomicBool>,
  _world: PhantomData<&'w mut World>,
}

// SAFETY: see the type-level docs; parity-group scheduling keeps concurrent
// leases on disjoint cells.
unsafe impl Send for Canvas<'_> {}
unsafe impl Sync for Canvas<'_> {}

impl<'w> Canvas<'w> {
  /// Borrows every loaded chunk of `world` for the canvas lifetime.
  pub fn new(world: &'w mut World) -> Self {
    let layout = *world.layout();
    let origin = layout.block_origin_chunk(world.window_origin());
    let span = layout.window_chunks();
    let len = (span * span) as usize;

    let mut chunks = vec![None; len];
    world.for_each_chunk_mut(|pos, chunk| {
      let i = ((pos.y - origin.y) * span + (pos.x - origin.x)) as usize;
      chunks[i] = Some(ChunkPtr {
        cells: chunk.cells_mut().as_mut_ptr(),
        rects: &mut chunk.rects,
      });
    });

    Self {
      layout,
      origin,
      span,
      chunks,
      claimed: (0..len).map(|_| AtomicBool::new(false)).collect(),
      _world: PhantomData,
    }
  }

  pub fn layout(&self) -> &Layout {
    &self.layout
  }

  fn index(&self, pos: ChunkPos) -> Option<usize> {
    let x = pos.x - self.origin.x;
    let y = pos.y - self.origin.y;
    if x < 0 || y < 0 || x >= self.span || y >= self.span {
      return None;
    }
    Some((y * self.span + x) as usize)
  }

  fn chunk(&self, pos: ChunkPos) -> Option<ChunkPtr> {
    self.chunks[self.index(pos)?]
  }

  pub fn is_loaded(&self, pos: ChunkPos) -> bool {
    self.chunk(pos).is_some()
  }

  /// Claims a loaded chunk for processing, `None` when it is not loaded.
  ///
  /// # Panics
  /// Panics if the chunk is already leased.
  pub fn lease(&self, pos: ChunkPos) -> Option<ChunkLease<'_>> {
    let index = self.index(pos)?;
    let chunk = self.chunks[index]?;
    if self.claimed[index].swap(true, Ordering::Acquire) {
      panic!("chunk ({}, {}) leased twice", pos.x, pos.y);
    }
    debug_assert!(
      pos
        .neighbourhood()
        .filter(|n| *n != pos)
        .filter_map(|n| self.index(n))
        .all(|i| !self.claimed[i].load(Ordering::Relaxed)),
      "chunk ({}, {}) leased next to a leased neighbour",
      pos.x,
      pos.y
    );
    Some(ChunkLease {
      canvas: self,
      pos,
      index,
      chunk,
    })
  }

  /// Pointer to the cell at `(x, y)`, `None` when it is not loaded.
  #[inline]
  fn cell(&self, x: i32, y: i32) -> Option<*mut Particle> {
    let chunk = self.chunk(self.layout.chunk_of(x, y))?;
    let (lx, ly) = self.layout.local_in_chunk(x, y);
    let offset = (ly * self.layout.chunk_size + lx) as usize;
    // SAFETY: `offset` is inside the chunk's cell storage.
    Some(unsafe { chunk.cells.add(offset) })
  }
}

/// Exclusive access to one chunk plus read/write access to the cells of its
/// 8 neighbours, for one scheduler job.
pub struct ChunkLease<'a> {
  canvas: &'a Canvas<'a>,
  pos: ChunkPos,
  index: usize,
  chunk: ChunkPtr,
}

impl ChunkLease<'_> {
  pub fn pos(&self) -> ChunkPos {
    self.pos
  }

  /// The chunk in cell coordinates.
  pub fn bounds(&self) -> Rect {
    self.canvas.layout.chunk_bounds(self.pos)
  }

  #[inline]
  fn cell(&self, x: i32, y: i32) -> Option<*mut Particle> {
    debug_assert!(
      self
        .canvas
        .layout
        .chunk_of(x, y)
        .chebyshev(self.pos)
        <= 1,
      "cell ({x}, {y}) is out of reach of chunk {:?}",
      self.pos
    );
    self.canvas.cell(x, y)
  }

  /// Particle at `(x, y)`, `None` when the cell is not loaded.
  #[inline]
  pub fn get(&self, x: i32, y: i32) -> Option<Particle> {
    // SAFETY: no other lease touches this cell while we hold ours.
    self.cell(x, y).map(|p| unsafe { ptr::read(p) })
  }

  /// Overwrites a loaded cell. Writes to unloaded cells are dropped.
  #[inline]
  pub fn set(&self, x: i32, y: i32, particle: Particle) {
    if let Some(p) = self.cell(x, y) {
      // SAFETY: as in `get`.
      unsafe { ptr::write(p, particle) };
    }
  }

  /// Exchanges two loaded cells. Returns false, changing nothing, if either
  /// is not loaded.
  #[inline]
  pub fn swap(&self, (ax, ay): (i32, i32), (bx, by): (i32, i32)) -> bool {
    match (self.cell(ax, ay), self.cell(bx, by)) {
      (Some(a), Some(b)) => {
        // SAFETY: as in `get`; `ptr::swap` allows `a == b`.
        unsafe { ptr::swap(a, b) };
        true
      }
      _ => false,
    }
  }

  #[allow(clippy::mut_from_ref)]
  fn rects(&self) -> &mut DirtyRects {
    // SAFETY: only the lease of this chunk touches its rectangles.
    unsafe { &mut *self.chunk.rects }
  }

  /// Marks a cell dirty for the next tick and for redraw. The mark is
  /// recorded on this chunk even when the cell lies in a neighbour.
  #[inline]
  pub fn mark(&self, x: i32, y: i32, with_neighbours: bool) {
    self.rects().mark(x, y, with_neighbours);
  }

  /// Region to process this tick.
  pub fn cur_rect(&self) -> Rect {
    self.rects().cur
  }

  /// Takes the stale pixel region, leaving it empty.
  pub fn take_redraw(&self) -> Rect {
    std::mem::take(&mut self.rects().redraw)
  }

  /// Clears the `updated` flag of every particle inside `cur`.
  pub fn clear_updated(&self) {
    let cur = self.cur_rect();
    if cur.is_empty() {
      return;
    }
    let size = self.canvas.layout.chunk_size;
    let bounds = self.bounds();
    for y in cur.top..=cur.bottom {
      let row = ((y - bounds.top) as u32 * size) as usize;
      for x in cur.left..=cur.right {
        // SAFETY: `cur` lies within this chunk.
        unsafe { (*self.chunk.cells.add(row + (x - bounds.left) as usize)).updated = false };
      }
    }
  }
}

impl Drop for ChunkLease<'_> {
  fn drop(&mut self) {
    self.canvas.claimed[self.index].store(false, Ordering::Release);
  }
}
