//! Block arena for bounded-memory streaming.
//!
//! Pre-allocates every block slot up front, so loading and evicting blocks as
//! the window moves never allocates.

use rayon::prelude::*;

use crate::coords::{BlockPos, Layout};
use crate::primitives::Block;

/// Index into the block arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotIndex(pub usize);

/// Fixed set of pre-allocated blocks.
///
/// With a handful of slots a linear scan for a free one is fast enough.
#[derive(Clone, Debug)]
pub struct BlockPool {
  blocks: Vec<Block>,
}

impl BlockPool {
  /// Allocates `layout.slots()` blocks.
  pub fn new(layout: &Layout) -> Self {
    let blocks = (0..layout.slots())
      .map(|_| Block::new(layout.block_chunks, layout.chunk_size))
      .collect();
    Self { blocks }
  }

  pub fn len(&self) -> usize {
    self.blocks.len()
  }

  pub fn is_empty(&self) -> bool {
    self.blocks.is_empty()
  }

  /// First slot not holding a block, in slot order.
  pub fn find_free(&self) -> Option<SlotIndex> {
    self.blocks.iter().position(Block::is_free).map(SlotIndex)
  }

  /// Takes a slot into use for `pos`, wiping its contents.
  ///
  /// # Panics
  /// Panics if the slot is already in use.
  pub fn assign(&mut self, slot: SlotIndex, pos: BlockPos) {
    let block = &mut self.blocks[slot.0];
    assert!(
      block.is_free(),
      "slot {} already holds {:?}",
      slot.0,
      block.pos()
    );
    block.assign(pos);
  }

  /// Releases a slot.
  ///
  /// # Panics
  /// Panics on double release.
  pub fn release(&mut self, slot: SlotIndex) {
    let block = &mut self.blocks[slot.0];
    assert!(!block.is_free(), "double release of block slot {}", slot.0);
    block.release();
  }

  #[inline]
  pub fn get(&self, slot: SlotIndex) -> &Block {
    &self.blocks[slot.0]
  }

  #[inline]
  pub fn get_mut(&mut self, slot: SlotIndex) -> &mut Block {
    &mut self.blocks[slot.0]
  }

  pub fn iter(&self) -> impl Iterator<Item = &Block> {
    self.blocks.iter()
  }

  pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Block> {
    self.blocks.iter_mut()
  }

  /// Parallel iteration over every slot, free or not, in slot order.
  pub fn par_iter_mut(&mut self) -> rayon::slice::IterMut<'_, Block> {
    self.blocks.par_iter_mut()
  }
}
