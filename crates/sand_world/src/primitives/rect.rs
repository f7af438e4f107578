//! Inclusive integer rectangles, the currency of dirty-region tracking.

/// An inclusive box `[left, right] x [top, bottom]` in cell coordinates.
///
/// The empty rectangle is represented by inverted bounds, so that growing it
/// with [`Rect::include`] or [`Rect::include_rect`] needs no special case.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Rect {
  pub left: i32,
  pub top: i32,
  pub right: i32,
  pub bottom: i32,
}

impl Rect {
  /// The canonical empty rectangle.
  pub const EMPTY: Self = Self {
    left: i32::MAX,
    top: i32::MAX,
    right: i32::MIN,
    bottom: i32::MIN,
  };

  #[inline]
  pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
    Self {
      left,
      top,
      right,
      bottom,
    }
  }

  /// Returns an empty rectangle.
  #[inline]
  pub const fn empty() -> Self {
    Self::EMPTY
  }

  /// Bounds of the chunk at chunk coordinates `(cx, cy)`.
  #[inline]
  pub const fn chunk_bounds(cx: i32, cy: i32, size: i32) -> Self {
    Self::new(cx * size, cy * size, (cx + 1) * size - 1, (cy + 1) * size - 1)
  }

  /// Sets the bounds to the empty sentinel.
  #[inline]
  pub fn reset(&mut self) {
    *self = Self::EMPTY;
  }

  #[inline]
  pub const fn is_empty(&self) -> bool {
    self.left > self.right || self.top > self.bottom
  }

  /// Grows the rectangle to cover `(x, y)`, or its 3x3 neighbourhood when
  /// `with_neighbours` is set.
  #[inline]
  pub fn include(&mut self, x: i32, y: i32, with_neighbours: bool) {
    let r = i32::from(with_neighbours);
    self.include_rect(&Self::new(x - r, y - r, x + r, y + r));
  }

  /// Grows the rectangle to the union with `other`.
  #[inline]
  pub fn include_rect(&mut self, other: &Rect) {
    self.left = self.left.min(other.left);
    self.top = self.top.min(other.top);
    self.right = self.right.max(other.right);
    self.bottom = self.bottom.max(other.bottom);
  }

  #[inline]
  pub const fn contains(&self, x: i32, y: i32) -> bool {
    x >= self.left && x <= self.right && y >= self.top && y <= self.bottom
  }

  #[inline]
  pub const fn intersects(&self, other: &Rect) -> bool {
    other.right >= self.left
      && other.bottom >= self.top
      && other.left <= self.right
      && other.top <= self.bottom
  }

  /// Overlapping region of two rectangles.
  ///
  /// # Panics
  /// Panics if the rectangles do not intersect. Check [`Rect::intersects`]
  /// first.
  pub fn intersection(&self, other: &Rect) -> Rect {
    assert!(
      self.intersects(other),
      "intersection of disjoint rectangles {self:?} and {other:?}"
    );
    Rect::new(
      self.left.max(other.left),
      self.top.max(other.top),
      self.right.min(other.right),
      self.bottom.min(other.bottom),
    )
  }

  /// Clips to `bounds`, returning an empty rectangle when they are disjoint.
  #[inline]
  pub fn clipped(&self, bounds: &Rect) -> Rect {
    if self.intersects(bounds) {
      self.intersection(bounds)
    } else {
      Rect::EMPTY
    }
  }

  /// Width in cells. Meaningless on an empty rectangle.
  #[inline]
  pub const fn width(&self) -> i32 {
    self.right - self.left + 1
  }

  /// Height in cells. Meaningless on an empty rectangle.
  #[inline]
  pub const fn height(&self) -> i32 {
    self.bottom - self.top + 1
  }

  #[inline]
  pub const fn area(&self) -> i64 {
    self.width() as i64 * self.height() as i64
  }

  /// Area of the overlap with `other`, zero when disjoint.
  pub fn shared_area(&self, other: &Rect) -> i64 {
    if !self.intersects(other) {
      return 0;
    }
    self.intersection(other).area()
  }

  /// Shifts the rectangle by `(dx, dy)`.
  #[inline]
  pub const fn translated(&self, dx: i32, dy: i32) -> Rect {
    Rect::new(
      self.left + dx,
      self.top + dy,
      self.right + dx,
      self.bottom + dy,
    )
  }
}

impl Default for Rect {
  fn default() -> Self {
    Self::EMPTY
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn reset_rect_is_empty() {
    let mut r = Rect::new(0, 0, 3, 3);
    assert!(!r.is_empty());
    r.reset();
    assert!(r.is_empty());
    assert_eq!(r, Rect::EMPTY);
  }

  #[test]
  fn include_grows_from_empty() {
    let mut r = Rect::empty();
    r.include(5, 7, false);
    assert_eq!(r, Rect::new(5, 7, 5, 7));

    r.include(2, 9, false);
    assert_eq!(r, Rect::new(2, 7, 5, 9));
  }

  #[test]
  fn include_with_neighbours_covers_3x3() {
    let mut r = Rect::empty();
    r.include(0, 0, true);
    assert_eq!(r, Rect::new(-1, -1, 1, 1));
    assert_eq!(r.area(), 9);
  }

  #[test]
  fn empty_rect_never_intersects() {
    let r = Rect::new(0, 0, 10, 10);
    assert!(!r.intersects(&Rect::EMPTY));
    assert!(!Rect::EMPTY.intersects(&r));
    assert_eq!(r.shared_area(&Rect::EMPTY), 0);
  }

  #[test]
  fn intersection_of_overlapping_rects() {
    let a = Rect::new(0, 0, 10, 10);
    let b = Rect::new(5, -3, 20, 4);
    assert!(a.intersects(&b));
    assert_eq!(a.intersection(&b), Rect::new(5, 0, 10, 4));
    assert_eq!(a.shared_area(&b), 6 * 5);
  }

  #[test]
  #[should_panic(expected = "intersection of disjoint rectangles")]
  fn intersection_of_disjoint_rects_panics() {
    let a = Rect::new(0, 0, 1, 1);
    let b = Rect::new(3, 3, 4, 4);
    let _ = a.intersection(&b);
  }

  #[test]
  fn touching_edges_intersect() {
    // Inclusive bounds: sharing a column counts as overlap.
    let a = Rect::new(0, 0, 4, 4);
    let b = Rect::new(4, 0, 8, 4);
    assert!(a.intersects(&b));
    assert_eq!(a.intersection(&b).width(), 1);
  }

  #[test]
  fn chunk_bounds_are_inclusive() {
    let r = Rect::chunk_bounds(1, 2, 64);
    assert_eq!(r, Rect::new(64, 128, 127, 191));
    assert_eq!(r.width(), 64);
    assert_eq!(r.height(), 64);
  }

  #[test]
  fn clipped_to_disjoint_bounds_is_empty() {
    let r = Rect::new(0, 0, 3, 3);
    assert!(r.clipped(&Rect::new(10, 10, 12, 12)).is_empty());
    assert_eq!(r.clipped(&Rect::new(2, 2, 12, 12)), Rect::new(2, 2, 3, 3));
  }
}
