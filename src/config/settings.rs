/*
* Twin Dashboard Configuration
* ----------------------------
*
* Hierarchical configuration, lowest to highest priority:
* 1. Hardcoded defaults (set_default below)
* 2. {CONFIG_PATH}/default.toml
* 3. {CONFIG_PATH}/local.toml
* 4. Environment variables prefixed with TWIN, nested keys separated by "__"
*    (TWIN__SERVER__PORT=8080, TWIN__TWIN__ANOMALY_Z_THRESHOLD=2.5)
*
* Sections:
* - server: bind address for the HTTP API
* - twin:   windows and thresholds used when building a machine's twin state
* - store:  optional JSON seed file for the in-memory cutting-data store
* - energy: defaults for the energy calculator and forecast bounds
*/

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub twin: TwinSettings,
    #[serde(default)]
    pub store: StoreSettings,
    pub energy: EnergySettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TwinSettings {
    /// A machine whose latest sample is younger than this is reported active.
    pub active_window_minutes: i64,
    pub metrics_window_hours: i64,
    pub maintenance_lookback_days: i64,
    pub maintenance_min_samples: usize,
    pub maintenance_recent_window: usize,
    pub anomaly_z_threshold: f64,
    pub anomaly_min_samples: usize,
    pub anomaly_max_reported: usize,
}

impl Default for TwinSettings {
    fn default() -> Self {
        Self {
            active_window_minutes: 5,
            metrics_window_hours: 24,
            maintenance_lookback_days: 7,
            maintenance_min_samples: 10,
            maintenance_recent_window: 10,
            anomaly_z_threshold: 2.0,
            anomaly_min_samples: 20,
            anomaly_max_reported: 10,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreSettings {
    #[serde(default)]
    pub seed_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnergySettings {
    pub default_rate_per_kwh: f64,
    pub forecast_max_days: u32,
}

impl Default for EnergySettings {
    fn default() -> Self {
        Self {
            default_rate_per_kwh: 0.12,
            forecast_max_days: 365,
        }
    }
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let config_path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config".to_string());
        Self::from_dir(Path::new(&config_path))
    }

    pub fn new_from_file(path: &Path) -> Result<Self, ConfigError> {
        info!("Loading configuration from file: {}", path.display());

        Self::builder()?
            .add_source(File::from(path.to_path_buf()))
            .add_source(Environment::with_prefix("TWIN").separator("__"))
            .build()?
            .try_deserialize()
    }

    fn from_dir(dir: &Path) -> Result<Self, ConfigError> {
        info!("Loading configuration from path: {}", dir.display());

        Self::builder()?
            .add_source(File::with_name(&dir.join("default").to_string_lossy()).required(false))
            .add_source(File::with_name(&dir.join("local").to_string_lossy()).required(false))
            .add_source(Environment::with_prefix("TWIN").separator("__"))
            .build()?
            .try_deserialize()
    }

    fn builder() -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        let twin = TwinSettings::default();
        let energy = EnergySettings::default();

        Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 5000)?
            .set_default("twin.active_window_minutes", twin.active_window_minutes)?
            .set_default("twin.metrics_window_hours", twin.metrics_window_hours)?
            .set_default("twin.maintenance_lookback_days", twin.maintenance_lookback_days)?
            .set_default("twin.maintenance_min_samples", twin.maintenance_min_samples as u64)?
            .set_default("twin.maintenance_recent_window", twin.maintenance_recent_window as u64)?
            .set_default("twin.anomaly_z_threshold", twin.anomaly_z_threshold)?
            .set_default("twin.anomaly_min_samples", twin.anomaly_min_samples as u64)?
            .set_default("twin.anomaly_max_reported", twin.anomaly_max_reported as u64)?
            .set_default("energy.default_rate_per_kwh", energy.default_rate_per_kwh)?
            .set_default("energy.forecast_max_days", energy.forecast_max_days)
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

pub fn generate_default_config() -> Settings {
    Settings {
        server: ServerSettings {
            host: "127.0.0.1".to_string(),
            port: 5000,
        },
        twin: TwinSettings::default(),
        store: StoreSettings::default(),
        energy: EnergySettings::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_files() {
        let dir = std::env::temp_dir().join(format!("twin-config-{}", uuid::Uuid::new_v4()));
        let settings = Settings::from_dir(&dir).unwrap();

        assert_eq!(settings.server.port, 5000);
        assert_eq!(settings.twin.anomaly_min_samples, 20);
        assert_eq!(settings.twin.anomaly_z_threshold, 2.0);
        assert_eq!(settings.twin.maintenance_lookback_days, 7);
        assert!(settings.store.seed_path.is_none());
    }

    #[test]
    fn test_file_overrides_defaults() {
        let dir = std::env::temp_dir().join(format!("twin-config-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("default.toml"),
            "[server]\nport = 8088\n\n[twin]\nanomaly_z_threshold = 3.0\n",
        )
        .unwrap();

        let settings = Settings::from_dir(&dir).unwrap();
        assert_eq!(settings.server.port, 8088);
        assert_eq!(settings.twin.anomaly_z_threshold, 3.0);
        assert_eq!(settings.twin.metrics_window_hours, 24);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_generated_config_round_trips_through_toml() {
        let generated = generate_default_config();
        let text = toml::to_string_pretty(&generated).unwrap();
        assert!(text.contains("[twin]"));
        assert!(text.contains("anomaly_max_reported = 10"));
        assert_eq!(generated.server_address(), "127.0.0.1:5000");
    }
}
