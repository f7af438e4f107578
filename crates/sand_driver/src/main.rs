//! Headless driver: runs a scene at a fixed tick and logs what the
//! simulation is doing.
//!
//! ```text
//! sand-driver --scene mixed --ticks 1200 --workers 3 --report-every 60
//! RUST_LOG=debug sand-driver --config sand.toml --realtime
//! ```

mod scene;

use std::error::Error;
use std::path::PathBuf;

use clap::Parser;
use log::{info, warn};
use sand_world::{MaterialKind, RenderBuffer, SimConfig, Simulation};
use web_time::Instant;

use scene::Scene;

#[derive(Parser, Debug)]
#[command(name = "sand-driver", version, about = "Run a falling-sand scene headless")]
struct Args {
  /// TOML configuration file; built-in defaults when omitted
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Number of ticks to run
  #[arg(short, long, default_value_t = 600)]
  ticks: u64,

  /// Worker threads besides the driver thread (overrides the config)
  #[arg(short, long)]
  workers: Option<usize>,

  /// Seed for every random choice (overrides the config)
  #[arg(long)]
  seed: Option<u64>,

  /// Starting scene
  #[arg(long, value_enum, default_value_t = Scene::Mixed)]
  scene: Scene,

  /// Log a status line every N ticks; 0 disables
  #[arg(long, default_value_t = 60)]
  report_every: u64,

  /// Sleep between ticks to hold the configured tick rate
  #[arg(long)]
  realtime: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
  env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

  run(Args::parse())
}

fn run(args: Args) -> Result<(), Box<dyn Error>> {
  let mut config = match &args.config {
    Some(path) => {
      info!("Loading configuration from {}", path.display());
      SimConfig::load(path)?
    }
    None => SimConfig::default(),
  };
  if let Some(workers) = args.workers {
    config.scheduler.workers = Some(workers);
  }
  if let Some(seed) = args.seed {
    config.simulation.seed = seed;
  }

  let mut sim = Simulation::new(config)?;
  let window = sim.world().loaded_bounds();
  sim.ensure_loaded(window);
  let written = scene::populate(&mut sim, args.scene);
  info!("Scene {:?}: {} cell(s) written", args.scene, written);

  let cells = sim.layout().window_cells() as u32;
  let mut frame = RenderBuffer::new(cells, cells);
  let tick = sim.tick_duration();
  let started = Instant::now();
  let mut deadline = started;

  for _ in 0..args.ticks {
    sim.update();
    sim.render(&mut frame);

    if args.report_every > 0 && sim.tick() % args.report_every == 0 {
      report(&sim, &frame);
    }

    if args.realtime {
      deadline += tick;
      let now = Instant::now();
      if deadline > now {
        std::thread::sleep(deadline - now);
      } else if now - deadline > tick * 10 {
        warn!("Falling behind by {:?}, resetting tick clock", now - deadline);
        deadline = now;
      }
    }
  }

  let perf = sim.perf();
  info!(
    "Ran {} tick(s) in {:.2?}: update avg {:.3} ms (worst {:.3}), render avg {:.3} ms, {:.0} particle(s) per tick",
    sim.tick(),
    started.elapsed(),
    perf.update_time.avg(),
    perf.update_time.longest(),
    perf.render_time.avg(),
    perf.updated_particles.avg()
  );
  Ok(())
}

fn report(sim: &Simulation, frame: &RenderBuffer) {
  let counts = sim.material_counts();
  let materials = MaterialKind::ALL
    .iter()
    .filter(|kind| **kind != MaterialKind::Empty)
    .map(|kind| format!("{} {}", kind.name(), counts[kind.index()]))
    .collect::<Vec<_>>()
    .join(", ");
  let balance = sim
    .load_balance()
    .iter()
    .map(|tracker| format!("{:.0}%", tracker.average() * 100.0))
    .collect::<Vec<_>>()
    .join(" ");

  info!(
    "Tick {}: {} updated; {}; load [{}]; {} pixel write(s)",
    sim.tick(),
    sim.num_updated_particles(),
    materials,
    balance,
    frame.take_writes()
  );
}
