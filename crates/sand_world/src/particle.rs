//! Particle cells and their materials.
//!
//! A [`Particle`] is a plain value: a [`Material`] carrying the per-material
//! payload plus the `updated` flag used to stop a particle from being
//! processed twice in one tick. Particles never move by reference; the
//! simulation swaps grid cells.

use serde::{Deserialize, Serialize};

/// Material of a cell together with its material-specific state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Material {
  #[default]
  Empty,
  /// Accumulates `fall_speed` under gravity; every 16 units is one extra
  /// cell of fall per tick.
  Sand { fall_speed: u16 },
  /// `flow_dir` is -1 or +1, the preferred horizontal spreading direction.
  Water { flow_dir: i8 },
  Wood,
  /// Milliseconds of burning left, rounded up. `spent` is the part of the
  /// last millisecond already burned, in units of `1 / tick_hz` ms.
  Fire { lifetime: u16, spent: u16 },
}

/// Payload-free material tag.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaterialKind {
  #[default]
  Empty,
  Sand,
  Water,
  Wood,
  Fire,
}

impl MaterialKind {
  /// Every kind, in tag order.
  pub const ALL: [MaterialKind; 5] = [
    MaterialKind::Empty,
    MaterialKind::Sand,
    MaterialKind::Water,
    MaterialKind::Wood,
    MaterialKind::Fire,
  ];

  /// Position in [`MaterialKind::ALL`].
  pub const fn index(self) -> usize {
    match self {
      MaterialKind::Empty => 0,
      MaterialKind::Sand => 1,
      MaterialKind::Water => 2,
      MaterialKind::Wood => 3,
      MaterialKind::Fire => 4,
    }
  }

  pub const fn name(self) -> &'static str {
    match self {
      MaterialKind::Empty => "empty",
      MaterialKind::Sand => "sand",
      MaterialKind::Water => "water",
      MaterialKind::Wood => "wood",
      MaterialKind::Fire => "fire",
    }
  }
}

impl std::fmt::Display for MaterialKind {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.name())
  }
}

impl Material {
  /// Default water flow direction.
  pub const WATER_FLOW_DIR: i8 = -1;

  /// Freshly initialised material of the given kind.
  ///
  /// Fire needs a lifetime, which callers draw from the fire parameters.
  pub const fn new(kind: MaterialKind, fire_lifetime: u16) -> Self {
    match kind {
      MaterialKind::Empty => Material::Empty,
      MaterialKind::Sand => Material::Sand { fall_speed: 0 },
      MaterialKind::Water => Material::Water {
        flow_dir: Self::WATER_FLOW_DIR,
      },
      MaterialKind::Wood => Material::Wood,
      MaterialKind::Fire => Material::Fire {
        lifetime: fire_lifetime,
        spent: 0,
      },
    }
  }

  pub const fn kind(&self) -> MaterialKind {
    match self {
      Material::Empty => MaterialKind::Empty,
      Material::Sand { .. } => MaterialKind::Sand,
      Material::Water { .. } => MaterialKind::Water,
      Material::Wood => MaterialKind::Wood,
      Material::Fire { .. } => MaterialKind::Fire,
    }
  }
}

/// One grid cell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Particle {
  pub material: Material,
  /// Set once the particle was processed this tick, cleared by the prepare
  /// phase of the next tick.
  pub updated: bool,
}

impl Particle {
  pub const EMPTY: Self = Self::from_material(Material::Empty);

  #[inline]
  pub const fn from_material(material: Material) -> Self {
    Self {
      material,
      updated: false,
    }
  }

  /// Fresh particle of `kind`; `fire_lifetime` is only read for fire.
  #[inline]
  pub const fn new(kind: MaterialKind, fire_lifetime: u16) -> Self {
    Self::from_material(Material::new(kind, fire_lifetime))
  }

  pub const fn sand() -> Self {
    Self::new(MaterialKind::Sand, 0)
  }

  pub const fn water() -> Self {
    Self::new(MaterialKind::Water, 0)
  }

  pub const fn wood() -> Self {
    Self::new(MaterialKind::Wood, 0)
  }

  pub const fn fire(lifetime: u16) -> Self {
    Self::new(MaterialKind::Fire, lifetime)
  }

  #[inline]
  pub const fn kind(&self) -> MaterialKind {
    self.material.kind()
  }

  #[inline]
  pub const fn is_empty(&self) -> bool {
    matches!(self.material, Material::Empty)
  }
}
