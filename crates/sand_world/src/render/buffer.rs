use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use super::{EMPTY_COLOR, PixelSink, Rgba};
use crate::primitives::Rect;

#[inline]
fn pack(c: Rgba) -> u32 {
  u32::from_be_bytes([c.red, c.green, c.blue, c.alpha])
}

#[inline]
fn unpack(v: u32) -> Rgba {
  let [r, g, b, a] = v.to_be_bytes();
  Rgba::new(r, g, b, a)
}

/// In-memory [`PixelSink`].
///
/// Workers write into an atomic back buffer; `flush` and `flush_region` copy
/// into the front image that readers see.
pub struct RenderBuffer {
  width: u32,
  height: u32,
  back: Box<[AtomicU32]>,
  front: Vec<Rgba>,
  writes: AtomicU64,
}

impl RenderBuffer {
  /// Black image of `width x height` pixels.
  pub fn new(width: u32, height: u32) -> Self {
    let len = (width * height) as usize;
    Self {
      width,
      height,
      back: (0..len).map(|_| AtomicU32::new(pack(EMPTY_COLOR))).collect(),
      front: vec![EMPTY_COLOR; len],
      writes: AtomicU64::new(0),
    }
  }

  pub fn width(&self) -> u32 {
    self.width
  }

  pub fn height(&self) -> u32 {
    self.height
  }

  /// Fills both buffers with `color`.
  pub fn clear(&mut self, color: Rgba) {
    let packed = pack(color);
    for px in self.back.iter_mut() {
      *px.get_mut() = packed;
    }
    self.front.fill(color);
  }

  /// Flushed pixel at `(x, y)`.
  ///
  /// # Panics
  /// Panics outside the image.
  pub fn pixel(&self, x: u32, y: u32) -> Rgba {
    assert!(x < self.width && y < self.height, "pixel ({x}, {y}) out of bounds");
    self.front[(y * self.width + x) as usize]
  }

  /// Flushed image, row-major.
  pub fn pixels(&self) -> &[Rgba] {
    &self.front
  }

  /// Pixel writes since the last [`RenderBuffer::take_writes`].
  pub fn writes(&self) -> u64 {
    self.writes.load(Ordering::Relaxed)
  }

  pub fn take_writes(&self) -> u64 {
    self.writes.swap(0, Ordering::Relaxed)
  }

  fn copy_rows(&mut self, left: u32, top: u32, right: u32, bottom: u32) {
    for y in top..=bottom {
      let row = (y * self.width) as usize;
      for x in left..=right {
        let i = row + x as usize;
        self.front[i] = unpack(*self.back[i].get_mut());
      }
    }
  }
}

impl PixelSink for RenderBuffer {
  fn set_pixel(&self, x: u32, y: u32, color: Rgba) {
    if x >= self.width || y >= self.height {
      debug_assert!(false, "pixel ({x}, {y}) out of bounds");
      return;
    }
    self.back[(y * self.width + x) as usize].store(pack(color), Ordering::Relaxed);
    self.writes.fetch_add(1, Ordering::Relaxed);
  }

  fn flush(&mut self) {
    if self.width > 0 && self.height > 0 {
      self.copy_rows(0, 0, self.width - 1, self.height - 1);
    }
  }

  fn flush_region(&mut self, region: Rect) {
    let image = Rect::new(0, 0, self.width as i32 - 1, self.height as i32 - 1);
    if region.is_empty() || !region.intersects(&image) {
      return;
    }
    let r = region.intersection(&image);
    self.copy_rows(r.left as u32, r.top as u32, r.right as u32, r.bottom as u32);
  }
}
