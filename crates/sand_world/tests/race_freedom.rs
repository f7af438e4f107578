//! Scheduler race-freedom: chunks processed at the same time never touch.
//!
//! Run: cargo test -p sand_world --test race_freedom

use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sand_world::scheduling::Canvas;
use sand_world::{
  BlockPos, ChunkPos, Layout, MaterialKind, Mode, ParityGroup, SchedulerConfig, Scheduler,
  SimConfig, Simulation, World,
};

const WORKERS: usize = 4;

fn loaded_world(layout: Layout) -> World {
  let mut world = World::new(layout).unwrap();
  let w = layout.window_blocks();
  for by in 0..w {
    for bx in 0..w {
      world.load_block(BlockPos::new(bx, by));
    }
  }
  world
}

#[test]
fn queued_groups_are_pairwise_separated() {
  let scheduler = Scheduler::new(0);
  for y in -6..6 {
    for x in -6..6 {
      scheduler.push_chunk(ChunkPos::new(x, y));
    }
  }

  for group in ParityGroup::ALL {
    let chunks = scheduler.group(group);
    assert_eq!(chunks.len(), 36);
    for (i, a) in chunks.iter().enumerate() {
      assert_eq!(ParityGroup::of(*a), group);
      for b in &chunks[i + 1..] {
        assert!(a.chebyshev(*b) >= 2, "{a:?} and {b:?} touch");
      }
    }
  }
}

#[test]
fn concurrently_leased_chunks_are_never_neighbours() {
  let mut world = loaded_world(Layout::new(4, 4, 2));
  let positions: Vec<ChunkPos> = world.chunks().map(|(pos, _)| pos).collect();
  let mut scheduler = Scheduler::new(WORKERS);
  for pos in &positions {
    scheduler.push_chunk(*pos);
  }

  let canvas = Canvas::new(&mut world);
  let active = Mutex::new(HashSet::new());
  let visits = AtomicUsize::new(0);
  let processor = |_mode: Mode, pos: ChunkPos, _worker: usize| {
    let lease = canvas.lease(pos).expect("queued chunk is loaded");
    {
      let mut active = active.lock().unwrap();
      for other in pos.neighbourhood() {
        assert!(!active.contains(&other), "{pos:?} runs next to {other:?}");
      }
      active.insert(pos);
    }
    std::thread::sleep(Duration::from_micros(200));
    // Touch the whole reachable neighbourhood through the lease.
    let b = lease.bounds();
    let reach = canvas.layout().max_reach();
    for (x, y) in [
      (b.left - reach, b.top - reach),
      (b.right + reach, b.bottom + reach),
    ] {
      if let Some(p) = lease.get(x, y) {
        lease.set(x, y, p);
      }
    }
    active.lock().unwrap().remove(&pos);
    visits.fetch_add(1, Ordering::Relaxed);
  };

  for _ in 0..3 {
    scheduler.run(Mode::Update, &processor);
  }
  assert_eq!(visits.load(Ordering::Relaxed), positions.len() * 3);
}

#[test]
fn dense_simulation_runs_cleanly_on_many_workers() {
  // Debug builds check every cell access against the leased neighbourhood,
  // so any cross-group overlap panics here.
  let mut sim = Simulation::new(SimConfig {
    layout: Layout::new(8, 4, 2),
    scheduler: SchedulerConfig {
      workers: Some(WORKERS),
    },
    ..Default::default()
  })
  .unwrap();
  let bounds = sim.world().loaded_bounds();
  sim.ensure_loaded(bounds);

  let mut rng = StdRng::seed_from_u64(99);
  let kinds = [
    MaterialKind::Sand,
    MaterialKind::Water,
    MaterialKind::Wood,
    MaterialKind::Fire,
  ];
  for _ in 0..150 {
    let x = rng.gen_range(bounds.left..=bounds.right);
    let y = rng.gen_range(bounds.top..=bounds.bottom);
    sim.spawn_cloud(x, y, rng.gen_range(1..5), kinds[rng.gen_range(0..kinds.len())]);
  }

  for _ in 0..150 {
    sim.update();
  }

  let stats = sim.load_balance_stats();
  assert_eq!(stats.len(), WORKERS + 1);
  let total: f32 = stats.iter().sum();
  assert!(total == 0.0 || (total - 1.0).abs() < 1e-4, "{stats:?}");
}
