//! Starting scenes for the driver.

use clap::ValueEnum;
use sand_world::{MaterialKind, Particle, Rect, Simulation};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum Scene {
  /// Sand clouds over a wooden floor
  Sand,
  /// Water poured into a basin
  Water,
  /// A burning grove of wooden posts
  Fire,
  /// All of the above at once
  #[default]
  Mixed,
}

/// Fills the loaded window with `scene`. Returns the number of cells written.
pub fn populate(sim: &mut Simulation, scene: Scene) -> usize {
  let b = sim.world().loaded_bounds();
  let (w, h) = (b.width(), b.height());
  let mut written = floor(sim, b);

  match scene {
    Scene::Sand => {
      for i in 1..8 {
        written += sim.spawn_cloud(b.left + w * i / 8, b.top + h / 6, w / 24, MaterialKind::Sand);
      }
    }
    Scene::Water => {
      written += basin(sim, Rect::new(b.left + w / 4, b.top + h / 2, b.right - w / 4, b.bottom - 1));
      written += sim.spawn_cloud(b.left + w / 2, b.top + h / 4, w / 10, MaterialKind::Water);
    }
    Scene::Fire => {
      written += grove(sim, b);
      written += sim.spawn_cloud(b.left + w / 8, b.bottom - h / 8, 2, MaterialKind::Fire);
    }
    Scene::Mixed => {
      written += grove(sim, Rect::new(b.left, b.top, b.left + w / 2, b.bottom));
      written += sim.spawn_cloud(b.left + w / 8, b.bottom - h / 8, 2, MaterialKind::Fire);
      written += basin(sim, Rect::new(b.left + w / 2 + 4, b.top + h / 2, b.right - 4, b.bottom - 1));
      written += sim.spawn_cloud(b.left + 3 * w / 4, b.top + h / 4, w / 12, MaterialKind::Water);
      written += sim.spawn_cloud(b.left + 5 * w / 8, b.top + h / 8, w / 16, MaterialKind::Sand);
    }
  }
  written
}

/// A wooden row along the bottom of `area`.
fn floor(sim: &mut Simulation, area: Rect) -> usize {
  for x in area.left..=area.right {
    sim.set_particle(x, area.bottom, Particle::wood());
  }
  area.width() as usize
}

/// Two wooden walls rising from the floor at the sides of `area`.
fn basin(sim: &mut Simulation, area: Rect) -> usize {
  for y in area.top..=area.bottom {
    sim.set_particle(area.left, y, Particle::wood());
    sim.set_particle(area.right, y, Particle::wood());
  }
  2 * area.height() as usize
}

/// Evenly spaced wooden posts standing on the floor of `area`.
fn grove(sim: &mut Simulation, area: Rect) -> usize {
  let spacing = 6;
  let height = area.height() / 3;
  let mut written = 0;
  for x in (area.left + spacing / 2..area.right).step_by(spacing as usize) {
    for y in area.bottom - height..area.bottom {
      sim.set_particle(x, y, Particle::wood());
      sim.set_particle(x + 1, y, Particle::wood());
      written += 2;
    }
  }
  written
}
