//! Pixel output.
//!
//! The simulation never computes colors inside its rules. Rendering maps
//! each stale cell through [`ColorTable`] and hands the result to a
//! [`PixelSink`], which the host application turns into something
//! displayable.

mod buffer;

pub use buffer::RenderBuffer;
use palette::{LinSrgb, Mix, Srgb};

use crate::config::FirePalette;
use crate::particle::{Material, Particle};
use crate::primitives::Rect;

/// RGBA pixel with 8 bits per channel, using sRGB color space.
pub type Rgba = palette::Srgba<u8>;

/// Creates an opaque RGB color (alpha = 255).
#[inline]
pub const fn rgb(r: u8, g: u8, b: u8) -> Rgba {
  Rgba::new(r, g, b, 255)
}

/// Destination of rendered pixels.
///
/// `set_pixel` takes `&self` because several workers paint disjoint chunks
/// at once. Coordinates are relative to the top-left of the loaded window.
pub trait PixelSink: Sync {
  fn set_pixel(&self, x: u32, y: u32, color: Rgba);

  /// Publishes the whole image.
  fn flush(&mut self);

  /// Publishes only `region`, in window-relative pixels.
  fn flush_region(&mut self, region: Rect);
}

pub const EMPTY_COLOR: Rgba = rgb(0, 0, 0);
pub const SAND_COLOR: Rgba = rgb(255, 255, 0);
pub const WATER_COLOR: Rgba = rgb(0, 0, 255);
pub const WOOD_COLOR: Rgba = rgb(80, 0, 0);

/// Milliseconds of lifetime per flicker step.
pub const FLICKER_MS: u16 = 100;

pub const FIRE_FLICKER: [Rgba; 5] = [
  rgb(255, 255, 0),
  rgb(255, 200, 0),
  rgb(255, 150, 0),
  rgb(255, 100, 0),
  rgb(255, 50, 0),
];

const FIRE_YOUNG: Rgba = rgb(255, 140, 0);
const FIRE_OLD: Rgba = rgb(255, 255, 0);

/// Material to color lookup.
#[derive(Clone, Copy, Debug)]
pub struct ColorTable {
  fire: FirePalette,
  /// Longest possible fire lifetime, for the gradient.
  fire_max_ms: f32,
}

impl ColorTable {
  pub fn new(fire: FirePalette, fire_max_ms: u16) -> Self {
    Self {
      fire,
      fire_max_ms: f32::from(fire_max_ms.max(1)),
    }
  }

  pub fn color(&self, particle: &Particle) -> Rgba {
    match particle.material {
      Material::Empty => EMPTY_COLOR,
      Material::Sand { .. } => SAND_COLOR,
      Material::Water { .. } => WATER_COLOR,
      Material::Wood => WOOD_COLOR,
      Material::Fire { lifetime, .. } => self.fire_color(lifetime),
    }
  }

  fn fire_color(&self, lifetime: u16) -> Rgba {
    match self.fire {
      FirePalette::Flicker => {
        FIRE_FLICKER[(lifetime / FLICKER_MS) as usize % FIRE_FLICKER.len()]
      }
      FirePalette::Gradient => {
        // Burned fraction: 0 when fresh (orange), 1 when about to die (yellow).
        let t = 1.0 - (f32::from(lifetime) / self.fire_max_ms).clamp(0.0, 1.0);
        let young = linear(FIRE_YOUNG);
        let old = linear(FIRE_OLD);
        let mixed: Srgb<u8> = Srgb::from_linear(young.mix(old, t));
        Rgba::new(mixed.red, mixed.green, mixed.blue, 255)
      }
    }
  }
}

fn linear(color: Rgba) -> LinSrgb<f32> {
  Srgb::new(color.red, color.green, color.blue)
    .into_format::<f32>()
    .into_linear()
}
