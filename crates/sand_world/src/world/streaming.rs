//! Block streaming: loading, eviction and window relocation.
//!
//! A block coordinate is either unloaded (its slot-map entry is `None`, or it
//! lies outside the window) or loaded (its entry names an arena slot).
//! Evicted blocks are discarded; nothing is written back.

use log::{debug, info};

use super::{SlotIndex, World};
use crate::coords::BlockPos;
use crate::primitives::Rect;

/// What a [`World::load_block`] call did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LoadOutcome {
  /// Slot now holding the requested block.
  pub slot: Option<SlotIndex>,
  /// Blocks discarded to make room, in eviction order.
  pub evicted: Vec<BlockPos>,
  /// Whether the window origin changed.
  pub window_moved: bool,
  /// The block was already resident; nothing changed.
  pub already_loaded: bool,
}

impl World {
  /// Makes `pos` resident, starting empty with clean dirty rectangles.
  ///
  /// Moves the window and evicts blocks as needed; never fails.
  pub fn load_block(&mut self, pos: BlockPos) -> LoadOutcome {
    if let Some(slot) = self.get_block_slot(pos) {
      return LoadOutcome {
        slot: Some(slot),
        already_loaded: true,
        ..Default::default()
      };
    }

    let mut outcome = self.include_block(pos);
    let slot = match outcome.slot {
      Some(slot) => slot,
      None => unreachable!("include_block always yields a slot"),
    };
    self.pool.assign(slot, pos);
    if let Some(i) = self.map_index(pos) {
      self.slot_map[i] = Some(slot);
    }
    outcome.slot = Some(slot);

    debug!(
      "Loaded block ({}, {}) into slot {}",
      pos.x, pos.y, slot.0
    );
    outcome
  }

  /// Discards a resident block. Returns whether it was loaded.
  pub fn unload_block(&mut self, pos: BlockPos) -> bool {
    let Some(i) = self.map_index(pos) else {
      return false;
    };
    let Some(slot) = self.slot_map[i].take() else {
      return false;
    };
    self.pool.release(slot);
    debug!("Unloaded block ({}, {}) from slot {}", pos.x, pos.y, slot.0);
    true
  }

  /// First arena slot not referenced by the slot map.
  pub fn find_unoccupied(&self) -> Option<SlotIndex> {
    self.pool.find_free()
  }

  /// The loaded block with the largest Manhattan distance to `pos`.
  ///
  /// Ties go to the first block in row-major scan order.
  pub fn furthest_occupied(&self, pos: BlockPos) -> Option<BlockPos> {
    let mut best: Option<(BlockPos, i32)> = None;
    for (candidate, _) in self.occupied() {
      let d = candidate.manhattan(pos);
      if best.is_none_or(|(_, best_d)| d > best_d) {
        best = Some((candidate, d));
      }
    }
    best.map(|(candidate, _)| candidate)
  }

  /// Moves the window origin, keeping blocks that stay inside it in their
  /// slots and evicting the rest.
  ///
  /// Returns the evicted blocks.
  pub fn recalc_slotmap(&mut self, new_left: i32, new_top: i32) -> Vec<BlockPos> {
    let w = self.layout.window_blocks();
    let old: Vec<(BlockPos, SlotIndex)> = self.occupied().collect();

    self.left = new_left;
    self.top = new_top;
    self.slot_map.fill(None);

    let mut evicted = Vec::new();
    for (pos, slot) in old {
      if self.contains_block(pos) {
        let i = ((pos.y - new_top) * w + (pos.x - new_left)) as usize;
        self.slot_map[i] = Some(slot);
      } else {
        self.pool.release(slot);
        evicted.push(pos);
      }
    }
    evicted
  }

  /// Corner-anchored windows containing `pos`, in preference order for ties:
  /// `pos` at the bottom-right, bottom-left, top-right, top-left corner.
  fn candidate_windows(&self, pos: BlockPos) -> [(i32, i32); 4] {
    let far = self.layout.window_blocks() - 1;
    [
      (pos.x - far, pos.y - far),
      (pos.x, pos.y - far),
      (pos.x - far, pos.y),
      (pos.x, pos.y),
    ]
  }

  /// Reserves a slot for `pos`, relocating the window and evicting blocks as
  /// needed. The block itself is not assigned yet.
  pub fn include_block(&mut self, pos: BlockPos) -> LoadOutcome {
    let mut outcome = LoadOutcome::default();

    if !self.contains_block(pos) {
      let current = self.window_rect();
      let span = self.layout.window_blocks() - 1;
      let mut best = (self.left, self.top);
      let mut best_area = -1;
      for (left, top) in self.candidate_windows(pos) {
        let area = current.shared_area(&Rect::new(left, top, left + span, top + span));
        if area > best_area {
          best = (left, top);
          best_area = area;
        }
      }

      let (left, top) = best;
      outcome.evicted = self.recalc_slotmap(left, top);
      outcome.window_moved = true;
      info!(
        "Moved window to ({left}, {top}) for block ({}, {}), evicted {} block(s)",
        pos.x,
        pos.y,
        outcome.evicted.len()
      );
    }

    let slot = match self.find_unoccupied() {
      Some(slot) => slot,
      None => {
        let victim = match self.furthest_occupied(pos) {
          Some(victim) => victim,
          None => unreachable!("no free slot while no block is loaded"),
        };
        let slot = self.get_block_slot(victim);
        self.unload_block(victim);
        info!(
          "Evicted block ({}, {}) to make room for ({}, {})",
          victim.x, victim.y, pos.x, pos.y
        );
        outcome.evicted.push(victim);
        match slot {
          Some(slot) => slot,
          None => unreachable!("furthest_occupied returned an unloaded block"),
        }
      }
    };
    outcome.slot = Some(slot);
    outcome
  }
}
