use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;
use std::path::PathBuf;
use tracing::{error, info};

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Demo driver settings. Every field has a default so the file is optional.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Grayscale image holding the map; bright pixels are free space.
    pub map_path: PathBuf,
    /// Number of unconstrained samples to draw.
    pub state_samples: usize,
    /// Number of free-space samples to draw.
    pub valid_samples: usize,
    /// Cell probed with `is_occupied` at the end of the run.
    pub probe_x: f64,
    pub probe_y: f64,
    /// Fixed sampler seed; drawn from the OS when absent.
    pub seed: Option<u64>,
    /// Where to write the map with both sample sets overlaid.
    pub render_path: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            map_path: PathBuf::from("/tmp/test.png"),
            state_samples: 10_000,
            valid_samples: 100_000,
            probe_x: 200.0,
            probe_y: 200.0,
            seed: None,
            render_path: None,
        }
    }
}

/// Reads settings from `path` (TOML, optional) and `OCCUMAP_*` variables.
pub fn load_settings(path: &str) -> Result<Settings, ConfigError> {
    info!("Attempting to load configuration from {}", path);

    let settings = Config::builder()
        .add_source(File::new(path, FileFormat::Toml).required(false))
        .add_source(Environment::with_prefix("OCCUMAP").try_parsing(true))
        .build()
        .and_then(|config| config.try_deserialize::<Settings>());

    match settings {
        Ok(settings) => {
            info!("Successfully loaded configuration: {:?}", settings);
            Ok(settings)
        }
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            Err(e)
        }
    }
}
