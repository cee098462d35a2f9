//! Host configuration.
//!
//! Simulation, frame timing and demo-scene settings in one TOML file.
//! Configuration can be loaded from and saved to a file.

use salvo_common::{SalvoError, SalvoResult};
use salvo_kernel::context::SimulationConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Configuration file name.
const CONFIG_FILE: &str = "salvo.toml";

/// Frame timing settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Simulated render frames per second
    pub frame_rate: u32,
    /// Largest frame delta fed to the accumulator (seconds)
    pub max_frame_dt: f32,
    /// Fixed updates allowed per frame before the accumulator is dropped
    pub max_steps_per_frame: u32,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            frame_rate: 144,
            max_frame_dt: 0.25,
            max_steps_per_frame: 10,
        }
    }
}

/// Headless demo scene settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    /// Simulated duration (seconds)
    pub duration: f32,
    /// Seconds between trigger pulls
    pub fire_interval: f32,
    /// Pellets per trigger pull
    pub pellets: u32,
    /// Pellet spread half-angle (degrees)
    pub spread_degrees: f32,
    /// Damage per pellet
    pub damage: f32,
    /// Number of training targets
    pub targets: u32,
    /// Health of each training target
    pub target_health: f32,
    /// Half extent of the arena room
    pub arena_half_extent: f32,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            duration: 10.0,
            fire_interval: 0.25,
            pellets: 8,
            spread_degrees: 6.0,
            damage: 12.0,
            targets: 6,
            target_health: 150.0,
            arena_half_extent: 40.0,
        }
    }
}

/// Host configuration parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SalvoConfig {
    /// Kernel settings
    pub simulation: SimulationConfig,
    /// Frame timing
    pub timing: TimingConfig,
    /// Demo scene
    pub demo: DemoConfig,
}

impl Default for SalvoConfig {
    fn default() -> Self {
        Self {
            simulation: SimulationConfig {
                rng_seed: Some(1337),
                ..SimulationConfig::default()
            },
            timing: TimingConfig::default(),
            demo: DemoConfig::default(),
        }
    }
}

impl SalvoConfig {
    /// Load configuration from the default file location.
    /// Returns default config if file doesn't exist.
    pub fn load() -> Self {
        Self::load_from(Self::config_path())
    }

    /// Load configuration from a specific path.
    /// Returns default config if file doesn't exist or is invalid.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            info!("Config file not found, using defaults");
            return Self::default();
        }

        match fs::File::open(path) {
            Ok(mut file) => {
                let mut contents = String::new();
                if let Err(e) = file.read_to_string(&mut contents) {
                    warn!("Failed to read config file: {e}");
                    return Self::default();
                }

                match toml::from_str(&contents) {
                    Ok(config) => {
                        info!("Loaded config from {}", path.display());
                        config
                    },
                    Err(e) => {
                        warn!("Failed to parse config file: {e}");
                        Self::default()
                    },
                }
            },
            Err(e) => {
                warn!("Failed to open config file: {e}");
                Self::default()
            },
        }
    }

    /// Save configuration to the default file location.
    pub fn save(&self) -> SalvoResult<()> {
        self.save_to(Self::config_path())
    }

    /// Save configuration to a specific path.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> SalvoResult<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents =
            toml::to_string_pretty(self).map_err(|e| SalvoError::Config(e.to_string()))?;

        let mut file = fs::File::create(path)?;
        file.write_all(contents.as_bytes())?;

        info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn config_path() -> PathBuf {
        if let Some(config_dir) = dirs_config_path() {
            config_dir.join("salvo").join(CONFIG_FILE)
        } else {
            PathBuf::from(CONFIG_FILE)
        }
    }

    /// Validate and clamp configuration values to sensible ranges.
    pub fn validate(&mut self) {
        self.simulation.validate();

        self.timing.frame_rate = self.timing.frame_rate.clamp(1, 1000);
        self.timing.max_frame_dt = self.timing.max_frame_dt.clamp(0.001, 1.0);
        self.timing.max_steps_per_frame = self.timing.max_steps_per_frame.clamp(1, 100);

        let demo = &mut self.demo;
        demo.duration = demo.duration.clamp(0.0, 3600.0);
        demo.fire_interval = demo.fire_interval.max(self.simulation.fixed_dt);
        demo.pellets = demo.pellets.clamp(1, 64);
        demo.spread_degrees = demo.spread_degrees.clamp(0.0, 45.0);
        demo.damage = demo.damage.max(0.0);
        demo.targets = demo.targets.min(32);
        demo.target_health = demo.target_health.max(1.0);
        demo.arena_half_extent = demo.arena_half_extent.clamp(5.0, 500.0);
    }
}

/// Get platform-specific config directory.
fn dirs_config_path() -> Option<PathBuf> {
    #[cfg(target_os = "macos")]
    {
        std::env::var("HOME")
            .ok()
            .map(|home| PathBuf::from(home).join("Library/Application Support"))
    }

    #[cfg(target_os = "windows")]
    {
        std::env::var("APPDATA").ok().map(PathBuf::from)
    }

    #[cfg(target_os = "linux")]
    {
        std::env::var("XDG_CONFIG_HOME")
            .ok()
            .map(PathBuf::from)
            .or_else(|| {
                std::env::var("HOME")
                    .ok()
                    .map(|h| PathBuf::from(h).join(".config"))
            })
    }

    #[cfg(not(any(target_os = "macos", target_os = "windows", target_os = "linux")))]
    {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use salvo_kernel::pool::ExhaustionPolicy;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = SalvoConfig::default();
        assert_eq!(config.simulation.pool.hard_capacity, 200);
        assert_eq!(config.simulation.profile.ballistics.muzzle_speed, 150.0);
        assert!(config.simulation.rng_seed.is_some());
        assert_eq!(config.timing.frame_rate, 144);
    }

    #[test]
    fn test_config_validation() {
        let mut config = SalvoConfig::default();
        config.timing.frame_rate = 0;
        config.demo.pellets = 500;
        config.demo.fire_interval = 0.0;
        config.simulation.profile.ricochet.chance = 3.0;

        config.validate();

        assert_eq!(config.timing.frame_rate, 1);
        assert_eq!(config.demo.pellets, 64);
        assert!(config.demo.fire_interval >= config.simulation.fixed_dt);
        assert_eq!(config.simulation.profile.ricochet.chance, 1.0);
    }

    #[test]
    fn test_config_save_load() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("nested").join("salvo.toml");

        let mut config = SalvoConfig::default();
        config.simulation.pool.hard_capacity = 32;
        config.simulation.pool.exhaustion_policy = ExhaustionPolicy::RecycleOldest;
        config.simulation.profile.ricochet.max_ricochets = 2;
        config.demo.pellets = 3;

        config.save_to(&config_path).expect("Failed to save config");

        let loaded = SalvoConfig::load_from(&config_path);
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_config_save_reports_io_error() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let blocker = temp_dir.path().join("blocker");
        fs::write(&blocker, "not a directory").expect("write");

        let err = SalvoConfig::default()
            .save_to(blocker.join("salvo.toml"))
            .expect_err("parent is a file");
        assert!(matches!(err, SalvoError::Io(_)));
    }

    #[test]
    fn test_config_load_missing_file() {
        let config = SalvoConfig::load_from("/nonexistent/path/salvo.toml");
        assert_eq!(config, SalvoConfig::default());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("salvo.toml");
        fs::write(
            &config_path,
            "[simulation.profile.ricochet]\nmax_ricochets = 4\n\n[demo]\npellets = 2\n",
        )
        .expect("write");

        let loaded = SalvoConfig::load_from(&config_path);
        assert_eq!(loaded.simulation.profile.ricochet.max_ricochets, 4);
        assert_eq!(loaded.simulation.profile.ricochet.velocity_loss, 0.5);
        assert_eq!(loaded.demo.pellets, 2);
        assert_eq!(loaded.demo.damage, DemoConfig::default().damage);
    }

    #[test]
    fn test_invalid_file_falls_back_to_defaults() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_path = temp_dir.path().join("salvo.toml");
        fs::write(&config_path, "this is = = not toml").expect("write");

        assert_eq!(SalvoConfig::load_from(&config_path), SalvoConfig::default());
    }

    #[test]
    fn test_config_toml_serialization() {
        let config = SalvoConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("Failed to serialize");

        assert!(toml_str.contains("hard_capacity"));
        assert!(toml_str.contains("max_ricochets"));
        assert!(toml_str.contains("fire_interval"));
    }
}
