//! Per-material update rules.
//!
//! Rules see the world only through a [`ChunkLease`]. Cells outside the
//! loaded window read as `None` and count as blocked. Every rule stays within
//! [`Layout::max_reach`](crate::coords::Layout::max_reach) cells of the
//! particle it updates.

use rand::Rng;
use rand::rngs::StdRng;

use crate::config::SimConfig;
use crate::particle::{Material, MaterialKind, Particle};
use crate::scheduling::ChunkLease;

/// Upper bound of the sand fall speed accumulator.
pub const MAX_FALL_SPEED: u16 = 256;

/// Fall speed units per extra cell fallen in one tick.
pub const FALL_SPEED_PER_CELL: u16 = 16;

/// Fall speed lost when landing on something other than sand.
pub const LANDING_DECAY: u16 = 2;

/// The 8 neighbour offsets, row by row.
pub const NEIGHBOURS: [(i32, i32); 8] = [
  (-1, -1),
  (0, -1),
  (1, -1),
  (-1, 0),
  (1, 0),
  (-1, 1),
  (0, 1),
  (1, 1),
];

/// Fire lifetime distribution and spreading.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FireParams {
  pub mean_ms: u16,
  pub dev_ms: u16,
  pub spread_falloff: f32,
}

impl FireParams {
  /// `mean + (2u - 1) * dev` for `u` in `0..1`, at least 1 ms.
  pub fn lifetime(&self, u: f32) -> u16 {
    let ms = f32::from(self.mean_ms) + (2.0 * u - 1.0) * f32::from(self.dev_ms);
    ms.round().clamp(1.0, f32::from(u16::MAX)) as u16
  }

  /// Probability that a fire with `lifetime` ms left tries to spread.
  pub fn spread_chance(&self, lifetime: u16) -> f32 {
    (-self.spread_falloff * f32::from(lifetime) / f32::from(self.mean_ms)).exp()
  }
}

/// Rule parameters resolved from the configuration.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rules {
  pub max_reach: i32,
  /// Water iteration budget, already clamped to `max_reach`.
  pub water_spread: i32,
  /// Ticks per simulated second, at most 1000.
  pub tick_hz: u32,
  pub fire: FireParams,
}

impl Rules {
  pub fn new(config: &SimConfig) -> Self {
    let max_reach = config.layout.max_reach();
    Self {
      max_reach,
      water_spread: (config.water_spread() as i32).clamp(1, max_reach),
      tick_hz: config.simulation.tick_hz,
      fire: FireParams {
        mean_ms: config.fire.lifetime_mean_ms,
        dev_ms: config.fire.lifetime_dev_ms,
        spread_falloff: config.fire.spread_falloff,
      },
    }
  }

  /// Burns one tick off a fire with `lifetime` ms left, `spent` of which
  /// is already partly burned. Returns the new `(lifetime, spent)`, or
  /// `None` once the fire is out.
  ///
  /// Time is counted in `1 / tick_hz` ms so each tick takes exactly
  /// `1000 / tick_hz` ms and no rounding error builds up.
  pub fn burn(&self, lifetime: u16, spent: u16) -> Option<(u16, u16)> {
    let hz = self.tick_hz.max(1);
    let left = (u32::from(lifetime) * hz)
      .saturating_sub(u32::from(spent))
      .saturating_sub(1000);
    if left == 0 {
      return None;
    }
    let ms = left.div_ceil(hz);
    // ms <= lifetime and ms * hz - left < hz <= 1000.
    Some((ms as u16, (ms * hz - left) as u16))
  }
}

/// Updates the particle at `(x, y)` unless it is inert or was already
/// updated this tick. Returns whether a rule ran.
pub fn update_particle(
  lease: &ChunkLease<'_>,
  rules: &Rules,
  rng: &mut StdRng,
  x: i32,
  y: i32,
) -> bool {
  let Some(particle) = lease.get(x, y) else {
    return false;
  };
  if particle.updated {
    return false;
  }
  match particle.material {
    Material::Empty | Material::Wood => return false,
    Material::Sand { fall_speed } => update_sand(lease, rules, x, y, fall_speed),
    Material::Water { flow_dir } => update_water(lease, rules, x, y, flow_dir),
    Material::Fire { lifetime, spent } => update_fire(lease, rules, rng, x, y, lifetime, spent),
  }
  true
}

/// Sand falls into empty cells and displaces water.
fn sand_can_enter(lease: &ChunkLease<'_>, x: i32, y: i32) -> bool {
  matches!(
    lease.get(x, y).map(|p| p.material),
    Some(Material::Empty | Material::Water { .. })
  )
}

fn update_sand(lease: &ChunkLease<'_>, rules: &Rules, x: i32, y: i32, fall_speed: u16) {
  let mut speed = fall_speed.saturating_add(1).min(MAX_FALL_SPEED);
  let steps = i32::from(speed / FALL_SPEED_PER_CELL).min(rules.max_reach - 1);

  let (mut nx, mut ny) = (x, y);
  for _ in 0..steps {
    if !sand_can_enter(lease, nx, ny + 1) {
      speed = match lease.get(nx, ny + 1).map(|p| p.material) {
        Some(Material::Sand { fall_speed: below }) => speed.min(below),
        _ => speed.saturating_sub(LANDING_DECAY),
      };
      break;
    }
    ny += 1;
  }

  if sand_can_enter(lease, nx, ny + 1) {
    ny += 1;
  } else if sand_can_enter(lease, nx - 1, ny + 1) {
    nx -= 1;
    ny += 1;
  } else if sand_can_enter(lease, nx + 1, ny + 1) {
    nx += 1;
    ny += 1;
  }

  lease.set(x, y, Particle {
    material: Material::Sand { fall_speed: speed },
    updated: true,
  });
  if (nx, ny) != (x, y) {
    move_particle(lease, (x, y), (nx, ny));
  }
}

fn update_water(lease: &ChunkLease<'_>, rules: &Rules, x: i32, y: i32, flow_dir: i8) {
  let empty = |x, y| lease.get(x, y).is_some_and(|p| p.is_empty());
  let mut dir = flow_dir;
  let (mut nx, mut ny) = (x, y);

  let mut i = 0;
  while i < rules.water_spread {
    i += 1;
    if empty(nx, ny + 1) {
      // Falling costs twice the budget of spreading.
      ny += 1;
      i += 1;
      continue;
    }
    let down_left = empty(nx - 1, ny + 1);
    let down_right = empty(nx + 1, ny + 1);
    let left = empty(nx - 1, ny);
    let right = empty(nx + 1, ny);

    if down_left && dir < 0 {
      nx -= 1;
      ny += 1;
    } else if down_right && dir > 0 {
      nx += 1;
      ny += 1;
    } else if left && dir < 0 {
      nx -= 1;
    } else if right && dir > 0 {
      nx += 1;
    } else if down_left || down_right || left || right {
      dir = -dir;
    } else {
      break;
    }
  }

  lease.set(x, y, Particle {
    material: Material::Water { flow_dir: dir },
    updated: true,
  });
  if (nx, ny) != (x, y) {
    move_particle(lease, (x, y), (nx, ny));
  }
}

fn update_fire(
  lease: &ChunkLease<'_>,
  rules: &Rules,
  rng: &mut StdRng,
  x: i32,
  y: i32,
  lifetime: u16,
  spent: u16,
) {
  let fire = &rules.fire;
  if fire.spread_chance(lifetime) >= rng.r#gen::<f32>() {
    let (dx, dy) = NEIGHBOURS[rng.gen_range(0..NEIGHBOURS.len())];
    let (tx, ty) = (x + dx, y + dy);
    if lease.get(tx, ty).is_some_and(|p| p.kind() == MaterialKind::Wood) {
      lease.set(tx, ty, Particle::fire(fire.lifetime(rng.r#gen())));
      lease.mark(tx, ty, true);
    }
  }

  match rules.burn(lifetime, spent) {
    None => {
      lease.set(x, y, Particle::EMPTY);
      lease.mark(x, y, true);
    }
    Some((lifetime, spent)) => {
      lease.set(x, y, Particle {
        material: Material::Fire { lifetime, spent },
        updated: true,
      });
      lease.mark(x, y, false);
    }
  }
}

fn move_particle(lease: &ChunkLease<'_>, from: (i32, i32), to: (i32, i32)) {
  lease.swap(from, to);
  lease.mark(from.0, from.1, true);
  lease.mark(to.0, to.1, true);
}
