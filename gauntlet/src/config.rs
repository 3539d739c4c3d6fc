//! Run configuration (TOML).

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

/// Tunable budgets and thresholds for a run.
///
/// This file is intended to be edited by humans: every timeout and attempt
/// bound that decides when a run gives up lives here, so failures can be
/// tuned post-hoc without code changes. Missing fields default to the values
/// below.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RunConfig {
    /// Cadence of every sleep/poll cycle in milliseconds.
    pub poll_interval_ms: u64,

    /// Detection window for a guardian before the last-resort sweep.
    pub detection_timeout_secs: u64,

    /// Grace period after each interaction command before the attempt is
    /// judged failed.
    pub interaction_grace_ms: u64,

    /// Interaction attempts per gating object.
    pub max_gate_attempts: u32,

    /// Counted engagement attempts per guardian.
    pub max_engage_attempts: u32,

    /// Consecutive unresolved cycles tolerated while a tracked guardian is
    /// missing from the snapshot.
    pub miss_tolerance: u32,

    /// How stale (in active time) the last positive sighting may be for
    /// death to be inferred from absence.
    pub absence_window_secs: u64,

    /// Health fraction below which a recovery item is used.
    pub recovery_health_fraction: f64,

    /// Radius of the clear command centered on a tracked guardian.
    pub engage_radius: u32,

    /// Radius cleared around the actor after reaching a gating object.
    pub vicinity_radius: u32,

    /// Radius of the last-resort sweep when detection times out.
    pub sweep_radius: u32,

    /// Path-clear distance while traveling between objectives.
    pub path_clear_radius: u32,

    /// Path-clear distance while approaching a gating object.
    pub approach_clear_radius: u32,

    /// Loot sweep radius after the terminal encounter.
    pub loot_radius: u32,

    /// Restrict travel clearing to elites and guardians.
    pub focus_elites: bool,

    /// Suspend item pickup while the terminal encounter is live.
    pub disable_pickup_during_terminal: bool,

    /// Maximum events retained by the run journal.
    pub journal_capacity: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 50,
            detection_timeout_secs: 8,
            interaction_grace_ms: 300,
            max_gate_attempts: 3,
            max_engage_attempts: 4,
            miss_tolerance: 2,
            absence_window_secs: 30,
            recovery_health_fraction: 0.5,
            engage_radius: 30,
            vicinity_radius: 15,
            sweep_radius: 25,
            path_clear_radius: 20,
            approach_clear_radius: 25,
            loot_radius: 30,
            focus_elites: false,
            disable_pickup_during_terminal: false,
            journal_capacity: 256,
        }
    }
}

impl RunConfig {
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == 0 {
            return Err(anyhow!("poll_interval_ms must be > 0"));
        }
        if self.detection_timeout_secs == 0 {
            return Err(anyhow!("detection_timeout_secs must be > 0"));
        }
        if self.max_gate_attempts == 0 {
            return Err(anyhow!("max_gate_attempts must be > 0"));
        }
        if self.max_engage_attempts == 0 {
            return Err(anyhow!("max_engage_attempts must be > 0"));
        }
        if self.miss_tolerance == 0 {
            // A single missing cycle is always snapshot jitter.
            return Err(anyhow!("miss_tolerance must be >= 1"));
        }
        if !(self.recovery_health_fraction > 0.0 && self.recovery_health_fraction <= 1.0) {
            return Err(anyhow!("recovery_health_fraction must be in (0, 1]"));
        }
        if self.engage_radius == 0 || self.vicinity_radius == 0 || self.sweep_radius == 0 {
            return Err(anyhow!("clear radii must be > 0"));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn detection_timeout(&self) -> Duration {
        Duration::from_secs(self.detection_timeout_secs)
    }

    pub fn interaction_grace(&self) -> Duration {
        Duration::from_millis(self.interaction_grace_ms)
    }

    pub fn absence_window(&self) -> Duration {
        Duration::from_secs(self.absence_window_secs)
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `RunConfig::default()`.
pub fn load_config(path: &Path) -> Result<RunConfig> {
    if !path.exists() {
        let cfg = RunConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: RunConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &RunConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}
