//! The resident world: a sliding window of blocks over an unbounded grid.
//!
//! [`World`] owns every particle. Blocks are addressed through a slot map
//! that translates window-relative block coordinates into arena slots, so the
//! window can move without copying block contents. Streaming (loading,
//! evicting, moving the window) lives in [`streaming`].

mod pool;
mod streaming;

use rayon::prelude::*;

pub use pool::{BlockPool, SlotIndex};
pub use streaming::LoadOutcome;

use crate::config::ConfigError;
use crate::coords::{BlockPos, ChunkPos, Layout};
use crate::particle::Particle;
use crate::primitives::{Block, Chunk, DirtyRects, Rect};

/// Bounded window of resident blocks.
#[derive(Clone, Debug)]
pub struct World {
  layout: Layout,
  /// Window origin in block coordinates.
  left: i32,
  top: i32,
  /// Row-major `window_blocks x window_blocks`; `None` means unoccupied.
  slot_map: Vec<Option<SlotIndex>>,
  pool: BlockPool,
}

impl World {
  /// Creates an empty world with its window at the block origin.
  pub fn new(layout: Layout) -> Result<Self, ConfigError> {
    layout.validate()?;
    let w = layout.window_blocks as usize;
    Ok(Self {
      layout,
      left: 0,
      top: 0,
      slot_map: vec![None; w * w],
      pool: BlockPool::new(&layout),
    })
  }

  pub fn layout(&self) -> &Layout {
    &self.layout
  }

  /// Window origin in block coordinates.
  pub fn window_origin(&self) -> BlockPos {
    BlockPos::new(self.left, self.top)
  }

  /// The window in block coordinates.
  pub fn window_rect(&self) -> Rect {
    let w = self.layout.window_blocks();
    Rect::new(self.left, self.top, self.left + w - 1, self.top + w - 1)
  }

  /// The window in cell coordinates.
  pub fn loaded_bounds(&self) -> Rect {
    let size = self.layout.block_size();
    let w = self.window_rect();
    Rect::new(
      w.left * size,
      w.top * size,
      (w.right + 1) * size - 1,
      (w.bottom + 1) * size - 1,
    )
  }

  /// Index into the slot map, if the block lies inside the window.
  fn map_index(&self, pos: BlockPos) -> Option<usize> {
    if !self.contains_block(pos) {
      return None;
    }
    let w = self.layout.window_blocks();
    Some(((pos.y - self.top) * w + (pos.x - self.left)) as usize)
  }

  /// Whether the block coordinate lies inside the window, loaded or not.
  pub fn contains_block(&self, pos: BlockPos) -> bool {
    self.window_rect().contains(pos.x, pos.y)
  }

  /// Arena slot holding the block, `None` when it is not loaded.
  pub fn get_block_slot(&self, pos: BlockPos) -> Option<SlotIndex> {
    self.map_index(pos).and_then(|i| self.slot_map[i])
  }

  pub fn is_block_loaded(&self, pos: BlockPos) -> bool {
    self.get_block_slot(pos).is_some()
  }

  pub fn is_chunk_loaded(&self, pos: ChunkPos) -> bool {
    self.is_block_loaded(self.layout.block_of_chunk(pos))
  }

  pub fn is_particle_loaded(&self, x: i32, y: i32) -> bool {
    self.is_block_loaded(self.layout.block_of(x, y))
  }

  pub fn block(&self, pos: BlockPos) -> Option<&Block> {
    self.get_block_slot(pos).map(|slot| self.pool.get(slot))
  }

  pub fn block_mut(&mut self, pos: BlockPos) -> Option<&mut Block> {
    let slot = self.get_block_slot(pos)?;
    Some(self.pool.get_mut(slot))
  }

  /// Chunk position relative to its block.
  fn chunk_in_block(&self, pos: ChunkPos) -> (BlockPos, u32, u32) {
    let block = self.layout.block_of_chunk(pos);
    let n = self.layout.block_chunks();
    (
      block,
      pos.x.rem_euclid(n) as u32,
      pos.y.rem_euclid(n) as u32,
    )
  }

  pub fn chunk(&self, pos: ChunkPos) -> Option<&Chunk> {
    let (block, cx, cy) = self.chunk_in_block(pos);
    self.block(block).map(|b| b.chunk(cx, cy))
  }

  pub fn chunk_mut(&mut self, pos: ChunkPos) -> Option<&mut Chunk> {
    let (block, cx, cy) = self.chunk_in_block(pos);
    self.block_mut(block).map(|b| b.chunk_mut(cx, cy))
  }

  /// Particle at `(x, y)`, `None` outside the loaded blocks.
  pub fn try_particle(&self, x: i32, y: i32) -> Option<&Particle> {
    let chunk = self.chunk(self.layout.chunk_of(x, y))?;
    let (lx, ly) = self.layout.local_in_chunk(x, y);
    Some(chunk.get(lx, ly))
  }

  /// Particle at `(x, y)`.
  ///
  /// # Panics
  /// Panics if the cell is not loaded. Reading outside the window is a
  /// programming error, never an implicit empty cell.
  pub fn particle(&self, x: i32, y: i32) -> &Particle {
    match self.try_particle(x, y) {
      Some(p) => p,
      None => panic!("particle ({x}, {y}) is not loaded"),
    }
  }

  /// Mutable particle at `(x, y)`.
  ///
  /// # Panics
  /// Panics if the cell is not loaded.
  pub fn particle_mut(&mut self, x: i32, y: i32) -> &mut Particle {
    let (lx, ly) = self.layout.local_in_chunk(x, y);
    match self.chunk_mut(self.layout.chunk_of(x, y)) {
      Some(chunk) => chunk.get_mut(lx, ly),
      None => panic!("particle ({x}, {y}) is not loaded"),
    }
  }

  /// Marks a cell dirty for the next tick and for redraw, in the chunk that
  /// owns it. Unloaded cells are ignored.
  pub fn mark(&mut self, x: i32, y: i32, with_neighbours: bool) {
    if let Some(chunk) = self.chunk_mut(self.layout.chunk_of(x, y)) {
      chunk.rects.mark(x, y, with_neighbours);
    }
  }

  /// Loaded blocks with their slots, row by row, left to right.
  fn occupied(&self) -> impl Iterator<Item = (BlockPos, SlotIndex)> + '_ {
    let w = self.layout.window_blocks();
    self.slot_map.iter().enumerate().filter_map(move |(i, slot)| {
      let i = i as i32;
      slot.map(|slot| (BlockPos::new(self.left + i % w, self.top + i / w), slot))
    })
  }

  /// Calls `f` for every loaded block, row by row, each row left to right.
  pub fn enumerate_blocks(&self, mut f: impl FnMut(BlockPos, &Block)) {
    for (pos, slot) in self.occupied() {
      f(pos, self.pool.get(slot));
    }
  }

  /// Positions of the loaded blocks in enumeration order.
  pub fn loaded_blocks(&self) -> Vec<BlockPos> {
    self.occupied().map(|(pos, _)| pos).collect()
  }

  /// Snapshot of the slot map, row-major over the window.
  pub fn slot_map(&self) -> &[Option<SlotIndex>] {
    &self.slot_map
  }

  /// Every loaded chunk with its position, block by block in enumeration
  /// order, row-major inside a block.
  pub fn chunks(&self) -> impl Iterator<Item = (ChunkPos, &Chunk)> + '_ {
    let n = self.layout.block_chunks();
    self.occupied().flat_map(move |(pos, slot)| {
      let origin = self.layout.block_origin_chunk(pos);
      self
        .pool
        .get(slot)
        .chunks()
        .iter()
        .enumerate()
        .map(move |(i, chunk)| {
          let i = i as i32;
          (ChunkPos::new(origin.x + i % n, origin.y + i / n), chunk)
        })
    })
  }

  /// Calls `f` for every loaded chunk, in no particular order.
  pub fn for_each_chunk_mut(&mut self, mut f: impl FnMut(ChunkPos, &mut Chunk)) {
    let n = self.layout.block_chunks();
    let layout = self.layout;
    for block in self.pool.iter_mut() {
      let Some(pos) = block.pos() else { continue };
      let origin = layout.block_origin_chunk(pos);
      for (i, chunk) in block.chunks_mut().iter_mut().enumerate() {
        let i = i as i32;
        f(ChunkPos::new(origin.x + i % n, origin.y + i / n), chunk);
      }
    }
  }

  /// Hands dirty regions over to the chunks they cover and starts a new tick.
  ///
  /// For every loaded chunk, the part of its own and its 8 neighbours' `next`
  /// rectangles lying inside the chunk becomes the new `cur` (unioned with
  /// the old one when `keep_old` is set). `next` is emptied and `redraw`
  /// grows to cover `cur`. Unloaded neighbours contribute nothing.
  ///
  /// Runs in parallel across blocks: a read-only gather over the whole world,
  /// then a write pass where each block only touches its own chunks.
  pub fn fit_dirty_rects(&mut self, keep_old: bool) {
    let fitted = self.gather(|rects| rects.next);
    self.apply(fitted, |rects, fitted| {
      if keep_old {
        rects.cur.include_rect(&fitted);
      } else {
        rects.cur = fitted;
      }
      rects.next.reset();
      if !rects.cur.is_empty() {
        let cur = rects.cur;
        rects.redraw.include_rect(&cur);
      }
    });
  }

  /// Clips every `redraw` rectangle to its chunk, handing the overflow to the
  /// neighbours it covers.
  pub fn fit_redraw_rects(&mut self) {
    let fitted = self.gather(|rects| rects.redraw);
    self.apply(fitted, |rects, fitted| rects.redraw = fitted);
  }

  /// Per slot, per chunk: the union of `select` over the 3x3 neighbourhood,
  /// clipped to the chunk.
  fn gather<F>(&self, select: F) -> Vec<Option<Vec<Rect>>>
  where
    F: Fn(&DirtyRects) -> Rect + Sync,
  {
    let n = self.layout.block_chunks();
    (0..self.pool.len())
      .into_par_iter()
      .map(|slot| {
        let pos = self.pool.get(SlotIndex(slot)).pos()?;
        let origin = self.layout.block_origin_chunk(pos);
        let fitted = (0..n * n)
          .map(|i| self.gather_chunk(ChunkPos::new(origin.x + i % n, origin.y + i / n), &select))
          .collect();
        Some(fitted)
      })
      .collect()
  }

  fn gather_chunk<F>(&self, pos: ChunkPos, select: &F) -> Rect
  where
    F: Fn(&DirtyRects) -> Rect,
  {
    let bounds = self.layout.chunk_bounds(pos);
    let mut out = Rect::EMPTY;
    for neighbour in pos.neighbourhood() {
      let Some(chunk) = self.chunk(neighbour) else {
        continue;
      };
      out.include_rect(&select(&chunk.rects).clipped(&bounds));
    }
    out
  }

  fn apply<F>(&mut self, fitted: Vec<Option<Vec<Rect>>>, f: F)
  where
    F: Fn(&mut DirtyRects, Rect) + Sync + Send,
  {
    self
      .pool
      .par_iter_mut()
      .zip(fitted.into_par_iter())
      .for_each(|(block, fitted)| {
        let Some(fitted) = fitted else { return };
        for (chunk, rect) in block.chunks_mut().iter_mut().zip(fitted) {
          f(&mut chunk.rects, rect);
        }
      });
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn small_world() -> World {
    // 4x4-cell chunks, 2x2 chunks per block, 2x2 blocks: 16x16 cells.
    let mut world = World::new(Layout::new(4, 2, 2)).unwrap();
    for y in 0..2 {
      for x in 0..2 {
        world.load_block(BlockPos::new(x, y));
      }
    }
    world
  }

  #[test]
  fn particle_lookup_crosses_blocks() {
    let mut world = small_world();
    *world.particle_mut(9, 13) = Particle::sand();
    assert_eq!(*world.particle(9, 13), Particle::sand());
    assert!(world.try_particle(16, 0).is_none());
    assert!(world.try_particle(-1, 0).is_none());
  }

  #[test]
  #[should_panic(expected = "is not loaded")]
  fn reading_unloaded_particle_panics() {
    let world = small_world();
    let _ = world.particle(100, 100);
  }

  #[test]
  fn loaded_predicates_agree() {
    let mut world = World::new(Layout::new(4, 2, 2)).unwrap();
    world.load_block(BlockPos::new(1, 0));
    assert!(world.is_block_loaded(BlockPos::new(1, 0)));
    assert!(!world.is_block_loaded(BlockPos::new(0, 0)));
    assert!(world.is_chunk_loaded(ChunkPos::new(2, 1)));
    assert!(!world.is_chunk_loaded(ChunkPos::new(1, 1)));
    assert!(world.is_particle_loaded(8, 0));
    assert!(!world.is_particle_loaded(7, 0));
  }

  #[test]
  fn enumerate_blocks_is_row_major() {
    let world = small_world();
    let mut seen = Vec::new();
    world.enumerate_blocks(|pos, block| {
      assert_eq!(block.pos(), Some(pos));
      seen.push(pos);
    });
    assert_eq!(
      seen,
      vec![
        BlockPos::new(0, 0),
        BlockPos::new(1, 0),
        BlockPos::new(0, 1),
        BlockPos::new(1, 1),
      ]
    );
  }

  #[test]
  fn chunks_cover_the_window_once() {
    let world = small_world();
    let mut positions: Vec<_> = world.chunks().map(|(pos, _)| pos).collect();
    positions.sort();
    positions.dedup();
    assert_eq!(positions.len(), 16);
    assert!(positions.iter().all(|p| (0..4).contains(&p.x) && (0..4).contains(&p.y)));
  }

  #[test]
  fn fit_moves_next_into_cur_and_redraw() {
    let mut world = small_world();
    world.mark(5, 5, false);

    world.fit_dirty_rects(false);

    let chunk = world.chunk(ChunkPos::new(1, 1)).unwrap();
    assert_eq!(chunk.rects.cur, Rect::new(5, 5, 5, 5));
    assert!(chunk.rects.next.is_empty());
    assert!(chunk.rects.redraw.contains(5, 5));
  }

  #[test]
  fn fit_propagates_overflow_to_neighbours() {
    let mut world = small_world();
    // Corner cell of chunk (0, 0) marked with neighbours spills into (1, 0),
    // (0, 1) and (1, 1).
    world.mark(3, 3, true);

    world.fit_dirty_rects(false);

    let cur = |x, y| world.chunk(ChunkPos::new(x, y)).unwrap().rects.cur;
    assert_eq!(cur(0, 0), Rect::new(2, 2, 3, 3));
    assert_eq!(cur(1, 0), Rect::new(4, 2, 4, 3));
    assert_eq!(cur(0, 1), Rect::new(2, 4, 3, 4));
    assert_eq!(cur(1, 1), Rect::new(4, 4, 4, 4));
    assert!(cur(2, 0).is_empty());
  }

  #[test]
  fn fit_crosses_block_borders() {
    let mut world = small_world();
    // x = 7 is the last column of block (0, 0); its neighbourhood reaches
    // into block (1, 0).
    world.mark(7, 1, true);
    world.fit_dirty_rects(false);
    assert!(world.chunk(ChunkPos::new(2, 0)).unwrap().is_dirty());
  }

  #[test]
  fn overflow_into_unloaded_blocks_is_dropped() {
    let mut world = World::new(Layout::new(4, 2, 2)).unwrap();
    world.load_block(BlockPos::new(0, 0));
    world.mark(7, 7, true);
    world.fit_dirty_rects(false);

    let cur = world.chunk(ChunkPos::new(1, 1)).unwrap().rects.cur;
    assert_eq!(cur, Rect::new(6, 6, 7, 7));
  }

  #[test]
  fn second_fit_without_marks_cleans_up() {
    let mut world = small_world();
    world.mark(1, 1, false);
    world.fit_dirty_rects(false);
    world.fit_dirty_rects(false);
    assert!(world.chunks().all(|(_, c)| !c.is_dirty()));
  }

  #[test]
  fn keep_old_accumulates_cur() {
    let mut world = small_world();
    world.mark(0, 0, false);
    world.fit_dirty_rects(false);
    world.mark(2, 2, false);
    world.fit_dirty_rects(true);

    let chunk = world.chunk(ChunkPos::new(0, 0)).unwrap();
    assert_eq!(chunk.rects.cur, Rect::new(0, 0, 2, 2));
  }

  #[test]
  fn fit_redraw_clips_and_hands_over() {
    let mut world = small_world();
    world
      .chunk_mut(ChunkPos::new(0, 0))
      .unwrap()
      .rects
      .redraw
      .include(3, 0, true);

    world.fit_redraw_rects();

    let redraw = |x, y| world.chunk(ChunkPos::new(x, y)).unwrap().rects.redraw;
    assert_eq!(redraw(0, 0), Rect::new(2, 0, 3, 1));
    assert_eq!(redraw(1, 0), Rect::new(4, 0, 4, 1));
  }
}
