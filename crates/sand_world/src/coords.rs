//! Coordinate types and spatial layout.
//!
//! Three nested grids share one absolute cell coordinate space:
//! - cells, addressed by `(x, y)` as `i32`, y grows downwards
//! - [`ChunkPos`]: chunks of `chunk_size x chunk_size` cells
//! - [`BlockPos`]: blocks of `block_chunks x block_chunks` chunks
//!
//! All conversions use floor division so negative coordinates map to the
//! chunk or block on their left/top.

use serde::Deserialize;

use crate::config::ConfigError;
use crate::primitives::Rect;

/// Default chunk edge in cells.
pub const CHUNK_SIZE: u32 = 64;

/// Default block edge in cells.
pub const BLOCK_SIZE: u32 = 512;

/// Default streaming window edge in blocks.
pub const NUM_BLOCKS: u32 = 2;

/// Position in the chunk grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkPos {
  pub x: i32,
  pub y: i32,
}

impl ChunkPos {
  pub const fn new(x: i32, y: i32) -> Self {
    Self { x, y }
  }

  /// Chebyshev distance in chunks.
  pub const fn chebyshev(self, other: ChunkPos) -> i32 {
    let dx = (self.x - other.x).abs();
    let dy = (self.y - other.y).abs();
    if dx > dy { dx } else { dy }
  }

  /// The 3x3 neighbourhood including `self`, row by row.
  pub fn neighbourhood(self) -> impl Iterator<Item = ChunkPos> {
    (-1..=1).flat_map(move |dy| (-1..=1).map(move |dx| ChunkPos::new(self.x + dx, self.y + dy)))
  }
}

/// Position in the block grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockPos {
  pub x: i32,
  pub y: i32,
}

impl BlockPos {
  pub const fn new(x: i32, y: i32) -> Self {
    Self { x, y }
  }

  /// Manhattan distance in blocks.
  pub const fn manhattan(self, other: BlockPos) -> i32 {
    (self.x - other.x).abs() + (self.y - other.y).abs()
  }
}

/// One of the four interference-free chunk groups.
///
/// Chunks are grouped by the parity of their coordinates. Two distinct chunks
/// of the same group differ by at least 2 along some axis, so they never
/// share an edge or a corner and can be processed concurrently.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ParityGroup {
  /// (even, even)
  A,
  /// (odd, even)
  B,
  /// (even, odd)
  C,
  /// (odd, odd)
  D,
}

impl ParityGroup {
  /// Groups in processing order.
  pub const ALL: [ParityGroup; 4] = [ParityGroup::A, ParityGroup::B, ParityGroup::C, ParityGroup::D];

  /// Returns the group for a chunk.
  pub fn of(pos: ChunkPos) -> ParityGroup {
    match (pos.x.rem_euclid(2), pos.y.rem_euclid(2)) {
      (0, 0) => ParityGroup::A,
      (1, 0) => ParityGroup::B,
      (0, 1) => ParityGroup::C,
      (1, 1) => ParityGroup::D,
      _ => unreachable!(),
    }
  }

  /// Index (0-3), equal to `2 * (y mod 2) + (x mod 2)`.
  pub const fn index(self) -> usize {
    match self {
      ParityGroup::A => 0,
      ParityGroup::B => 1,
      ParityGroup::C => 2,
      ParityGroup::D => 3,
    }
  }
}

/// Sizes of the chunk, block and window grids.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Layout {
  /// Chunk edge in cells.
  pub chunk_size: u32,
  /// Block edge in chunks.
  pub block_chunks: u32,
  /// Window edge in blocks.
  pub window_blocks: u32,
  /// Physical block slots; defaults to the full window.
  pub resident_blocks: Option<u32>,
}

impl Default for Layout {
  fn default() -> Self {
    Self {
      chunk_size: CHUNK_SIZE,
      block_chunks: BLOCK_SIZE / CHUNK_SIZE,
      window_blocks: NUM_BLOCKS,
      resident_blocks: None,
    }
  }
}

impl Layout {
  /// Creates a layout whose slot count equals the window area.
  pub const fn new(chunk_size: u32, block_chunks: u32, window_blocks: u32) -> Self {
    Self {
      chunk_size,
      block_chunks,
      window_blocks,
      resident_blocks: None,
    }
  }

  /// Overrides the number of physical block slots.
  pub const fn with_resident_blocks(mut self, slots: u32) -> Self {
    self.resident_blocks = Some(slots);
    self
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.chunk_size == 0 || self.block_chunks == 0 || self.window_blocks == 0 {
      return Err(ConfigError::Invalid(format!(
        "layout sizes must be positive, got {self:?}"
      )));
    }
    // With 1-cell chunks two chunks of one parity group would both reach the
    // cell between them.
    if self.chunk_size < 2 {
      return Err(ConfigError::Invalid(format!(
        "chunk_size must be at least 2, got {}",
        self.chunk_size
      )));
    }
    let window_cells = u64::from(self.chunk_size)
      * u64::from(self.block_chunks)
      * u64::from(self.window_blocks);
    if window_cells > (i32::MAX / 4) as u64 {
      return Err(ConfigError::Invalid(format!(
        "window of {window_cells} cells per side is too large"
      )));
    }
    let Some(area) = self.window_blocks.checked_mul(self.window_blocks) else {
      return Err(ConfigError::Invalid(format!(
        "window_blocks {} gives too many block slots",
        self.window_blocks
      )));
    };
    if let Some(slots) = self.resident_blocks {
      if slots == 0 || slots > area {
        return Err(ConfigError::Invalid(format!(
          "resident_blocks must be within 1..={area}, got {slots}"
        )));
      }
    }
    Ok(())
  }

  #[inline]
  pub const fn chunk_size(&self) -> i32 {
    self.chunk_size as i32
  }

  #[inline]
  pub const fn block_chunks(&self) -> i32 {
    self.block_chunks as i32
  }

  #[inline]
  pub const fn block_size(&self) -> i32 {
    (self.chunk_size * self.block_chunks) as i32
  }

  #[inline]
  pub const fn window_blocks(&self) -> i32 {
    self.window_blocks as i32
  }

  /// Window edge in chunks.
  #[inline]
  pub const fn window_chunks(&self) -> i32 {
    (self.window_blocks * self.block_chunks) as i32
  }

  /// Window edge in cells.
  #[inline]
  pub const fn window_cells(&self) -> i32 {
    (self.window_blocks * self.block_chunks * self.chunk_size) as i32
  }

  /// Number of physical block slots.
  pub fn slots(&self) -> usize {
    self
      .resident_blocks
      .map_or(self.window_blocks as usize * self.window_blocks as usize, |slots| slots as usize)
  }

  /// Furthest distance in cells a rule may move a particle, or read past it,
  /// from the chunk being processed. Keeps the cells touched by two chunks of
  /// one parity group disjoint.
  pub fn max_reach(&self) -> i32 {
    (self.chunk_size() / 2 - 1).max(1)
  }

  /// Chunk containing cell `(x, y)`.
  #[inline]
  pub fn chunk_of(&self, x: i32, y: i32) -> ChunkPos {
    let s = self.chunk_size();
    ChunkPos::new(x.div_euclid(s), y.div_euclid(s))
  }

  /// Offset of cell `(x, y)` inside its chunk.
  #[inline]
  pub fn local_in_chunk(&self, x: i32, y: i32) -> (u32, u32) {
    let s = self.chunk_size();
    (x.rem_euclid(s) as u32, y.rem_euclid(s) as u32)
  }

  /// Block containing a chunk.
  #[inline]
  pub fn block_of_chunk(&self, chunk: ChunkPos) -> BlockPos {
    let n = self.block_chunks();
    BlockPos::new(chunk.x.div_euclid(n), chunk.y.div_euclid(n))
  }

  /// Block containing cell `(x, y)`.
  #[inline]
  pub fn block_of(&self, x: i32, y: i32) -> BlockPos {
    self.block_of_chunk(self.chunk_of(x, y))
  }

  /// First chunk of a block.
  #[inline]
  pub const fn block_origin_chunk(&self, block: BlockPos) -> ChunkPos {
    let n = self.block_chunks();
    ChunkPos::new(block.x * n, block.y * n)
  }

  #[inline]
  pub const fn chunk_bounds(&self, chunk: ChunkPos) -> Rect {
    Rect::chunk_bounds(chunk.x, chunk.y, self.chunk_size())
  }

  #[inline]
  pub const fn block_bounds(&self, block: BlockPos) -> Rect {
    Rect::chunk_bounds(block.x, block.y, self.block_size())
  }
}
