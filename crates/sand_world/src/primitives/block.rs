//! Block: the unit of streaming residency.

use super::Chunk;
use crate::coords::BlockPos;

/// A square of `n x n` chunks.
///
/// Blocks live in the world's arena and are recycled: the arena keeps the
/// memory, and [`Block::assign`] wipes it for a new position.
#[derive(Clone, Debug)]
pub struct Block {
  n: u32,
  chunks: Vec<Chunk>,
  pos: Option<BlockPos>,
}

impl Block {
  /// Allocates an unassigned block of `n x n` chunks of `chunk_size` cells.
  pub fn new(n: u32, chunk_size: u32) -> Self {
    Self {
      n,
      chunks: (0..n * n).map(|_| Chunk::new(chunk_size)).collect(),
      pos: None,
    }
  }

  /// Block edge in chunks.
  pub fn n(&self) -> u32 {
    self.n
  }

  /// Position held by this block, `None` while the slot is free.
  pub fn pos(&self) -> Option<BlockPos> {
    self.pos
  }

  pub fn is_free(&self) -> bool {
    self.pos.is_none()
  }

  /// Chunk at local chunk coordinates.
  #[inline]
  pub fn chunk(&self, cx: u32, cy: u32) -> &Chunk {
    &self.chunks[(cy * self.n + cx) as usize]
  }

  #[inline]
  pub fn chunk_mut(&mut self, cx: u32, cy: u32) -> &mut Chunk {
    &mut self.chunks[(cy * self.n + cx) as usize]
  }

  /// Chunks in row-major order.
  pub fn chunks(&self) -> &[Chunk] {
    &self.chunks
  }

  pub fn chunks_mut(&mut self) -> &mut [Chunk] {
    &mut self.chunks
  }

  /// Takes the block into use for `pos`, starting empty and clean.
  pub fn assign(&mut self, pos: BlockPos) {
    for chunk in &mut self.chunks {
      chunk.reset();
    }
    self.pos = Some(pos);
  }

  /// Returns the block to the free state. Contents are discarded lazily on
  /// the next [`Block::assign`].
  pub fn release(&mut self) {
    self.pos = None;
  }
}
