//! End-to-end material scenarios: settling, sinking, levelling and burning.
//!
//! Run: cargo test -p sand_world --test scenarios_e2e

use sand_world::{
  BlockPos, Layout, Material, MaterialKind, Particle, SchedulerConfig, SimConfig, Simulation,
};

fn simulation(layout: Layout, workers: usize) -> Simulation {
  let mut sim = Simulation::new(SimConfig {
    layout,
    scheduler: SchedulerConfig {
      workers: Some(workers),
    },
    ..Default::default()
  })
  .unwrap();
  let bounds = sim.world().loaded_bounds();
  sim.ensure_loaded(bounds);
  sim
}

fn count(sim: &Simulation, kind: MaterialKind) -> u64 {
  sim.material_counts()[kind.index()]
}

fn find(sim: &Simulation, kind: MaterialKind) -> Option<(i32, i32)> {
  let b = sim.world().loaded_bounds();
  (b.top..=b.bottom)
    .flat_map(|y| (b.left..=b.right).map(move |x| (x, y)))
    .find(|&(x, y)| sim.particle(x, y).kind() == kind)
}

#[test]
fn sand_grain_settles_on_the_floor() {
  // 10x10 window of 5-cell chunks.
  let mut sim = simulation(Layout::new(5, 2, 1), 1);
  sim.set_particle(4, 0, Particle::sand());

  let mut last_y = 0;
  for _ in 0..30 {
    sim.update();
    let (x, y) = find(&sim, MaterialKind::Sand).unwrap();
    assert_eq!(x, 4);
    assert!(y >= last_y, "sand rose from {last_y} to {y}");
    last_y = y;
  }
  assert_eq!(last_y, 9);
  assert_eq!(count(&sim, MaterialKind::Sand), 1);
}

#[test]
fn sand_seeded_at_full_fall_speed_still_falls() {
  let mut sim = simulation(Layout::new(8, 2, 1), 1);
  sim.set_particle(3, 3, Particle::from_material(Material::Sand { fall_speed: u16::MAX }));

  for _ in 0..10 {
    sim.update();
  }
  assert_eq!(find(&sim, MaterialKind::Sand), Some((3, 15)));
  assert_eq!(count(&sim, MaterialKind::Sand), 1);
}

#[test]
fn sand_piles_into_a_heap() {
  let mut sim = simulation(Layout::new(8, 4, 1), 2);
  for y in 0..6 {
    sim.set_particle(16, y, Particle::sand());
  }

  for _ in 0..200 {
    sim.update();
  }

  // The lowest grain falls straight down; the rest slide off it.
  assert_eq!(sim.particle(16, 31).kind(), MaterialKind::Sand);
  assert_eq!(count(&sim, MaterialKind::Sand), 6);
  // A heap of six grains is at most three high.
  for y in 0..28 {
    assert!(sim.particle(16, y).is_empty(), "sand left at (16, {y})");
  }
}

#[test]
fn sand_sinks_below_water() {
  let mut sim = simulation(Layout::new(8, 4, 1), 2);
  // One-cell well: walls at x = 4 and x = 6, floor at y = 20.
  for y in 0..=20 {
    sim.set_particle(4, y, Particle::wood());
    sim.set_particle(6, y, Particle::wood());
  }
  sim.set_particle(5, 20, Particle::wood());
  for y in 15..20 {
    sim.set_particle(5, y, Particle::water());
  }
  sim.set_particle(5, 2, Particle::sand());

  for _ in 0..100 {
    sim.update();
  }

  assert_eq!(sim.particle(5, 19).kind(), MaterialKind::Sand);
  for y in 14..19 {
    assert_eq!(sim.particle(5, y).kind(), MaterialKind::Water, "y = {y}");
  }
  assert!(sim.particle(5, 13).is_empty());
}

#[test]
fn water_levels_out_in_a_basin() {
  let mut sim = simulation(Layout::new(8, 4, 1), 3);
  // Basin with inner width 10 (x = 1..=10) and floor at y = 20.
  for y in 0..=20 {
    sim.set_particle(0, y, Particle::wood());
    sim.set_particle(11, y, Particle::wood());
  }
  for x in 1..=10 {
    sim.set_particle(x, 20, Particle::wood());
    sim.set_particle(x, 4, Particle::water());
    sim.set_particle(x, 6, Particle::water());
  }

  for _ in 0..600 {
    sim.update();
  }

  for x in 1..=10 {
    for y in [18, 19] {
      assert_eq!(sim.particle(x, y).kind(), MaterialKind::Water, "({x}, {y})");
    }
    assert!(sim.particle(x, 17).is_empty());
  }
  assert_eq!(count(&sim, MaterialKind::Water), 20);
  // A level pool has nothing left to do.
  assert_eq!(sim.num_updated_particles(), 0);
}

#[test]
fn fire_burns_out_after_its_lifetime() {
  let mut sim = simulation(Layout::new(8, 2, 1), 1);
  assert_eq!(sim.tick_hz(), 60);
  sim.set_particle(5, 5, Particle::fire(1000));

  // One second at 60 Hz is 60 ticks, not 1000 / 17.
  for tick in 1..60 {
    sim.update();
    assert_eq!(sim.particle(5, 5).kind(), MaterialKind::Fire, "tick {tick}");
  }
  sim.update();
  assert!(sim.particle(5, 5).is_empty());
  assert_eq!(sim.tick(), 60);

  for _ in 0..20 {
    sim.update();
    assert!(sim.particle(5, 5).is_empty());
  }
}

#[test]
fn fire_spreads_along_wood() {
  let mut sim = simulation(Layout::new(8, 4, 1), 2);
  for x in 4..14 {
    sim.set_particle(x, 10, Particle::wood());
  }
  sim.set_particle(3, 10, Particle::fire(3000));

  for _ in 0..4000 {
    sim.update();
    if count(&sim, MaterialKind::Wood) + count(&sim, MaterialKind::Fire) == 0 {
      break;
    }
  }

  assert_eq!(count(&sim, MaterialKind::Wood), 0);
  assert_eq!(count(&sim, MaterialKind::Fire), 0);
}

#[test]
fn particles_at_a_block_seam_cross_it() {
  // Two blocks stacked vertically; a falling grain crosses from block (0, 0)
  // into block (0, 1).
  let mut sim = Simulation::new(SimConfig {
    layout: Layout::new(4, 2, 2),
    scheduler: SchedulerConfig { workers: Some(2) },
    ..Default::default()
  })
  .unwrap();
  sim.load_block(BlockPos::new(0, 0));
  sim.load_block(BlockPos::new(0, 1));
  sim.set_particle(3, 0, Particle::sand());

  for _ in 0..40 {
    sim.update();
  }

  assert_eq!(sim.particle(3, 15).kind(), MaterialKind::Sand);
  assert_eq!(count(&sim, MaterialKind::Sand), 1);
}
