//! Work queue for one parity group.

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::coords::ChunkPos;

struct Inner {
  chunks: Vec<ChunkPos>,
  cursor: usize,
}

/// A FIFO of chunks with a rewindable read cursor.
///
/// Popping does not remove entries, so the same list can be replayed by
/// several runs (prepare, then update) after a [`ChunkQueue::reset`].
pub struct ChunkQueue {
  inner: Mutex<Inner>,
}

impl ChunkQueue {
  pub fn new() -> Self {
    Self {
      inner: Mutex::new(Inner {
        chunks: Vec::new(),
        cursor: 0,
      }),
    }
  }

  fn lock(&self) -> MutexGuard<'_, Inner> {
    self.inner.lock().unwrap_or_else(PoisonError::into_inner)
  }

  pub fn push(&self, chunk: ChunkPos) {
    self.lock().chunks.push(chunk);
  }

  /// Next unread chunk, advancing the cursor.
  pub fn pop(&self) -> Option<ChunkPos> {
    let mut inner = self.lock();
    let chunk = inner.chunks.get(inner.cursor).copied()?;
    inner.cursor += 1;
    Some(chunk)
  }

  /// Rewinds the cursor to the first chunk.
  pub fn reset(&self) {
    self.lock().cursor = 0;
  }

  /// Drops every chunk.
  pub fn clear(&self) {
    let mut inner = self.lock();
    inner.chunks.clear();
    inner.cursor = 0;
  }

  pub fn len(&self) -> usize {
    self.lock().chunks.len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Copy of the queued chunks, in push order.
  pub fn snapshot(&self) -> Vec<ChunkPos> {
    self.lock().chunks.clone()
  }
}

impl Default for ChunkQueue {
  fn default() -> Self {
    Self::new()
  }
}
