//! Grid building blocks: rectangles, chunks and blocks.

mod block;
mod chunk;
mod rect;

pub use block::Block;
pub use chunk::{Chunk, DirtyRects};
pub use rect::Rect;
