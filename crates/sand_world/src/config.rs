//! Simulation configuration, loaded from TOML.
//!
//! Every field has a default, so an empty document is a valid configuration.
//!
//! ```toml
//! [layout]
//! chunk_size = 64
//! block_chunks = 8
//! window_blocks = 2
//!
//! [scheduler]
//! workers = 3
//!
//! [simulation]
//! seed = 3735928559
//! tick_hz = 60
//!
//! [fire]
//! lifetime_mean_ms = 3000
//! lifetime_dev_ms = 1000
//! spread_falloff = 1.0
//! palette = "flicker"
//! ```

use std::path::Path;
use std::time::Duration;

use log::warn;
use serde::Deserialize;

use crate::coords::Layout;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
  #[error("failed to read config file: {0}")]
  Io(#[from] std::io::Error),
  #[error("failed to parse config: {0}")]
  Parse(#[from] toml::de::Error),
  #[error("invalid config: {0}")]
  Invalid(String),
}

/// Worker pool sizing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SchedulerConfig {
  /// Worker threads besides the caller. `None` uses every core but one.
  pub workers: Option<usize>,
}

impl SchedulerConfig {
  /// Resolved worker thread count.
  pub fn workers(&self) -> usize {
    let cores = std::thread::available_parallelism().map_or(1, |n| n.get());
    match self.workers {
      Some(n) => {
        if n + 1 > cores {
          warn!("{n} worker threads requested on {cores} core(s)");
        }
        n
      }
      None => cores.saturating_sub(1),
    }
  }
}

/// Tick rate, seeding and water tuning.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
  /// Seeds the per-worker generators and the per-tick scan order.
  pub seed: u64,
  /// Fixed update rate, 1 to 1000 ticks per second.
  pub tick_hz: u32,
  /// Horizontal spread budget of water per tick. Derived from the window
  /// when omitted.
  pub water_spread: Option<u32>,
}

impl Default for SimulationConfig {
  fn default() -> Self {
    Self {
      seed: 0xDEAD_BEEF,
      tick_hz: 60,
      water_spread: None,
    }
  }
}

impl SimulationConfig {
  /// Wall-clock length of one tick, to the nanosecond.
  pub fn tick_duration(&self) -> Duration {
    Duration::from_secs(1) / self.tick_hz.max(1)
  }
}

/// How burning cells are colored.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FirePalette {
  /// Five-step palette cycling every 100 ms of lifetime.
  #[default]
  Flicker,
  /// Orange fading to yellow as the fire burns out.
  Gradient,
}

/// Fire lifetime and spreading.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FireConfig {
  pub lifetime_mean_ms: u16,
  /// New fires live `mean ± dev` milliseconds, uniformly.
  pub lifetime_dev_ms: u16,
  /// Larger values make young fires less likely to spread.
  pub spread_falloff: f32,
  pub palette: FirePalette,
}

impl Default for FireConfig {
  fn default() -> Self {
    Self {
      lifetime_mean_ms: 3000,
      lifetime_dev_ms: 1000,
      spread_falloff: 1.0,
      palette: FirePalette::Flicker,
    }
  }
}

/// Root configuration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimConfig {
  pub layout: Layout,
  pub scheduler: SchedulerConfig,
  pub simulation: SimulationConfig,
  pub fire: FireConfig,
}

impl SimConfig {
  /// Reads and validates a TOML file.
  pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
    let text = std::fs::read_to_string(path)?;
    Self::from_toml_str(&text)
  }

  /// Parses and validates a TOML document.
  pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
    let config: SimConfig = toml::from_str(text)?;
    config.validate()?;
    Ok(config)
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    self.layout.validate()?;
    if !(1..=1000).contains(&self.simulation.tick_hz) {
      return Err(ConfigError::Invalid(format!(
        "tick_hz must be between 1 and 1000, got {}",
        self.simulation.tick_hz
      )));
    }
    if self.simulation.water_spread == Some(0) {
      return Err(ConfigError::Invalid("water_spread must be positive".into()));
    }
    let fire = &self.fire;
    if fire.lifetime_mean_ms == 0 {
      return Err(ConfigError::Invalid("fire lifetime_mean_ms must be positive".into()));
    }
    if fire.lifetime_dev_ms >= fire.lifetime_mean_ms {
      return Err(ConfigError::Invalid(format!(
        "fire lifetime_dev_ms ({}) must be below lifetime_mean_ms ({})",
        fire.lifetime_dev_ms, fire.lifetime_mean_ms
      )));
    }
    if !fire.spread_falloff.is_finite() || fire.spread_falloff < 0.0 {
      return Err(ConfigError::Invalid(format!(
        "fire spread_falloff must be finite and non-negative, got {}",
        fire.spread_falloff
      )));
    }
    Ok(())
  }

  /// Water spread budget, before clamping to the layout's reach.
  pub fn water_spread(&self) -> u32 {
    self
      .simulation
      .water_spread
      .unwrap_or_else(|| (self.layout.window_cells() / 64).max(1) as u32)
  }
}

#[cfg(test)]
mod tests {
  use std::io::Write;

  use super::*;

  #[test]
  fn empty_document_uses_defaults() {
    let config = SimConfig::from_toml_str("").unwrap();
    assert_eq!(config, SimConfig::default());
    assert_eq!(config.simulation.seed, 0xDEAD_BEEF);
    assert_eq!(config.simulation.tick_duration(), Duration::from_nanos(16_666_666));
    assert_eq!(config.water_spread(), 16);
  }

  #[test]
  fn partial_sections_keep_other_defaults() {
    let config = SimConfig::from_toml_str(
      r#"
        [layout]
        chunk_size = 16

        [fire]
        palette = "gradient"
      "#,
    )
    .unwrap();
    assert_eq!(config.layout.chunk_size, 16);
    assert_eq!(config.layout.block_chunks, 8);
    assert_eq!(config.fire.palette, FirePalette::Gradient);
    assert_eq!(config.fire.lifetime_mean_ms, 3000);
  }

  #[test]
  fn unknown_keys_are_rejected() {
    let err = SimConfig::from_toml_str("[layout]\nchunk_sise = 16\n").unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)), "{err}");
  }

  #[test]
  fn invalid_values_are_reported() {
    let err = SimConfig::from_toml_str("[simulation]\ntick_hz = 0\n").unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));

    let err = SimConfig::from_toml_str("[simulation]\ntick_hz = 1001\n").unwrap_err();
    assert!(err.to_string().contains("tick_hz"));

    let err = SimConfig::from_toml_str("[fire]\nlifetime_mean_ms = 100\nlifetime_dev_ms = 100\n")
      .unwrap_err();
    assert!(err.to_string().contains("lifetime_dev_ms"));

    let err = SimConfig::from_toml_str("[layout]\nwindow_blocks = 2\nresident_blocks = 9\n")
      .unwrap_err();
    assert!(err.to_string().contains("resident_blocks"));
  }

  #[test]
  fn load_reads_from_disk() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[scheduler]\nworkers = 2\n[simulation]\nwater_spread = 4").unwrap();

    let config = SimConfig::load(file.path()).unwrap();

    assert_eq!(config.scheduler.workers(), 2);
    assert_eq!(config.water_spread(), 4);
  }

  #[test]
  fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = SimConfig::load(dir.path().join("missing.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io(_)));
  }

  #[test]
  fn tick_duration_is_not_rounded_to_milliseconds() {
    let sim = |tick_hz| SimulationConfig {
      tick_hz,
      ..Default::default()
    };
    assert_eq!(sim(60).tick_duration(), Duration::from_nanos(16_666_666));
    assert_eq!(sim(30).tick_duration(), Duration::from_nanos(33_333_333));
    assert_eq!(sim(1000).tick_duration(), Duration::from_millis(1));
  }
}
