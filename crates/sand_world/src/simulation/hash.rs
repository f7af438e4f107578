//! Deterministic hashes for per-tick choices.
//!
//! Naming follows `hash{inputs}{outputs}{input_type}{output_type}{bits}`:
//! `hash21uu64` takes 2 `u64` and returns 1 `u64`.

/// Multiply-xorshift finaliser.
#[inline]
pub fn mix64(mut h: u64) -> u64 {
  h = h.wrapping_mul(0x517c_c1b7_2722_0a95);
  h ^= h >> 32;
  h = h.wrapping_mul(0x517c_c1b7_2722_0a95);
  h ^= h >> 32;
  h
}

#[inline]
pub fn hash21uu64(a: u64, b: u64) -> u64 {
  mix64(a ^ b.rotate_left(32))
}
