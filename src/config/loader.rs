// src/config/loader.rs
//! Layered settings loader
//!
//! Layers, lowest precedence first: built-in defaults, each existing settings
//! file in path order, then `ECG_<SECTION>_<KEY>` environment variables
//! (`ECG_ACQUISITION_SAMPLE_COUNT=2048`, `ECG_REGISTERS_GAIN=160`).

use crate::config::constants::{env as env_consts, paths, validation};
use crate::config::EcgSettings;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Top-level tables an environment override may target
const SECTIONS: [&str; 3] = ["registers", "acquisition", "bus"];

/// Settings loading errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("configuration file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("configuration file {} is {size} bytes, limit is {limit}", .path.display())]
    TooLarge { path: PathBuf, size: u64, limit: u64 },

    #[error("cannot parse {origin}: {source}")]
    Parse {
        origin: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("cannot serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid settings: {}", .0.join("; "))]
    Validation(Vec<String>),
}

/// Settings loader over an ordered list of TOML files
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    config_paths: Vec<PathBuf>,
    env_overrides: Option<Vec<(String, String)>>,
}

impl ConfigLoader {
    /// Loader over the standard search paths and the process environment
    pub fn new() -> Self {
        Self {
            config_paths: Self::discover_config_paths(),
            env_overrides: None,
        }
    }

    /// Loader with custom paths
    pub fn with_paths(paths: Vec<PathBuf>) -> Self {
        Self {
            config_paths: paths,
            env_overrides: None,
        }
    }

    /// Append a file with the highest file precedence; it must exist
    pub fn with_required_file(mut self, path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path));
        }
        self.config_paths.push(path);
        Ok(self)
    }

    /// Use these variables instead of the process environment
    pub fn with_env_vars<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env_overrides = Some(vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect());
        self
    }

    pub fn config_paths(&self) -> &[PathBuf] {
        &self.config_paths
    }

    /// Merge every layer and validate the result
    pub fn load(&self) -> Result<EcgSettings, ConfigError> {
        let mut merged = toml::Value::try_from(EcgSettings::default())?;

        for config_path in &self.config_paths {
            if !config_path.exists() {
                debug!(path = %config_path.display(), "settings file absent, skipped");
                continue;
            }
            let layer = Self::load_config_file(config_path)?;
            merge_toml_values(&mut merged, layer);
            info!(path = %config_path.display(), "settings file merged");
        }

        self.apply_environment_overrides(&mut merged);

        let settings = merged.try_into::<EcgSettings>().map_err(|source| ConfigError::Parse {
            origin: "merged settings".to_string(),
            source,
        })?;
        settings.validate()?;
        Ok(settings)
    }

    /// Parse and validate a single file on top of the defaults
    pub fn validate_config_file<P: AsRef<Path>>(&self, path: P) -> Result<EcgSettings, ConfigError> {
        let mut merged = toml::Value::try_from(EcgSettings::default())?;
        merge_toml_values(&mut merged, Self::load_config_file(path.as_ref())?);

        let settings = merged.try_into::<EcgSettings>().map_err(|source| ConfigError::Parse {
            origin: path.as_ref().display().to_string(),
            source,
        })?;
        settings.validate()?;
        Ok(settings)
    }

    /// Write settings as TOML
    pub fn export_settings<P: AsRef<Path>>(settings: &EcgSettings, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(settings)?;
        std::fs::write(path, content).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    fn load_config_file(path: &Path) -> Result<toml::Value, ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };

        let size = std::fs::metadata(path).map_err(io_err)?.len();
        if size > validation::MAX_CONFIG_FILE_SIZE_BYTES {
            return Err(ConfigError::TooLarge {
                path: path.to_path_buf(),
                size,
                limit: validation::MAX_CONFIG_FILE_SIZE_BYTES,
            });
        }

        let content = std::fs::read_to_string(path).map_err(io_err)?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            origin: path.display().to_string(),
            source,
        })
    }

    fn apply_environment_overrides(&self, config: &mut toml::Value) {
        let vars: Vec<(String, String)> = match &self.env_overrides {
            Some(vars) => vars.clone(),
            None => std::env::vars().collect(),
        };

        for (key, value) in vars {
            if let Some((section, field)) = env_key_path(&key) {
                debug!(variable = %key, "environment override");
                set_nested_value(config, section, &field, parse_env_value(&value));
            }
        }
    }

    fn discover_config_paths() -> Vec<PathBuf> {
        let mut config_paths = vec![PathBuf::from(paths::SYSTEM_CONFIG_PATH)];

        if let Some(home_dir) = std::env::var_os("HOME").map(PathBuf::from) {
            config_paths.push(home_dir.join(paths::USER_CONFIG_DIR).join("config.toml"));
        }

        config_paths.push(PathBuf::from(paths::LOCAL_CONFIG_FILE));

        if let Some(explicit) = std::env::var_os(env_consts::CONFIG_FILE_VAR) {
            config_paths.push(PathBuf::from(explicit));
        }

        config_paths
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// `ECG_ACQUISITION_SAMPLE_COUNT` -> `("acquisition", "sample_count")`
fn env_key_path(key: &str) -> Option<(&'static str, String)> {
    let rest = key.strip_prefix(env_consts::PREFIX)?.to_lowercase();
    SECTIONS.iter().find_map(|section| {
        rest.strip_prefix(section)
            .and_then(|tail| tail.strip_prefix('_'))
            .filter(|field| !field.is_empty())
            .map(|field| (*section, field.to_string()))
    })
}

fn parse_env_value(value: &str) -> toml::Value {
    if let Ok(int_val) = value.parse::<i64>() {
        toml::Value::Integer(int_val)
    } else if let Ok(bool_val) = value.parse::<bool>() {
        toml::Value::Boolean(bool_val)
    } else {
        toml::Value::String(value.to_string())
    }
}

fn merge_toml_values(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, value) in overlay_table {
                if let Some(base_value) = base_table.get_mut(&key) {
                    merge_toml_values(base_value, value);
                } else {
                    base_table.insert(key, value);
                }
            }
        }
        (base_value, overlay_value) => {
            *base_value = overlay_value;
        }
    }
}

fn set_nested_value(config: &mut toml::Value, section: &str, field: &str, value: toml::Value) {
    if let toml::Value::Table(root) = config {
        let table = root
            .entry(section.to_string())
            .or_insert_with(|| toml::Value::Table(toml::value::Table::new()));
        if let toml::Value::Table(table) = table {
            table.insert(field.to_string(), value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DecodeMode;
    use std::io::Write;
    use tempfile::{tempdir, NamedTempFile};

    fn isolated(paths: Vec<PathBuf>) -> ConfigLoader {
        ConfigLoader::with_paths(paths).with_env_vars(Vec::<(String, String)>::new())
    }

    #[test]
    fn test_config_loader_creation() {
        let loader = ConfigLoader::new();
        assert!(!loader.config_paths().is_empty());
    }

    #[test]
    fn test_load_defaults_when_no_files() {
        let dir = tempdir().unwrap();
        let settings = isolated(vec![dir.path().join("missing.toml")]).load().unwrap();
        assert_eq!(settings, EcgSettings::default());
    }

    #[test]
    fn test_later_files_take_precedence() {
        let mut base = NamedTempFile::new().unwrap();
        writeln!(base, "[registers]\ngain = 40\nsample_rate = 256\n").unwrap();
        let mut local = NamedTempFile::new().unwrap();
        writeln!(local, "[registers]\ngain = 160\n\n[acquisition]\ndecode_mode = \"strict\"").unwrap();

        let settings = isolated(vec![base.path().to_path_buf(), local.path().to_path_buf()])
            .load()
            .unwrap();
        assert_eq!(settings.registers.gain, Some(160));
        assert_eq!(settings.registers.sample_rate, Some(256));
        assert_eq!(settings.acquisition.decode_mode, DecodeMode::Strict);
    }

    #[test]
    fn test_environment_override() {
        let settings = ConfigLoader::with_paths(Vec::new())
            .with_env_vars([
                ("ECG_ACQUISITION_SAMPLE_COUNT", "2048"),
                ("ECG_REGISTERS_GAIN", "80"),
                ("ECG_BUS_DEVICE", "/dev/spidev1.1"),
                ("ECG_BUS_BIT_ORDER", "lsb_first"),
                ("ECG_CONFIG", "/ignored.toml"),
                ("PATH", "/usr/bin"),
            ])
            .load()
            .unwrap();

        assert_eq!(settings.acquisition.sample_count, 2048);
        assert_eq!(settings.registers.gain, Some(80));
        assert_eq!(settings.bus.device, "/dev/spidev1.1");
        assert_eq!(settings.bus.bit_order, crate::hal::BitOrder::LsbFirst);
    }

    #[test]
    fn test_env_key_path() {
        assert_eq!(
            env_key_path("ECG_BUS_MAX_SPEED_HZ"),
            Some(("bus", "max_speed_hz".to_string()))
        );
        assert_eq!(env_key_path("ECG_BUS_"), None);
        assert_eq!(env_key_path("ECG_CONFIG"), None);
        assert_eq!(env_key_path("EMG_BUS_MODE"), None);
    }

    #[test]
    fn test_invalid_file_is_parse_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[acquisition\nsample_count = ").unwrap();

        assert!(matches!(
            isolated(vec![file.path().to_path_buf()]).load(),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_out_of_range_is_validation_error() {
        let loader = isolated(Vec::new());
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[acquisition]\nsample_count = 0").unwrap();

        assert!(matches!(
            loader.validate_config_file(file.path()),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_required_file_must_exist() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            isolated(Vec::new()).with_required_file(dir.path().join("nope.toml")),
            Err(ConfigError::FileNotFound(_))
        ));
    }

    #[test]
    fn test_settings_export_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("exported.toml");
        let mut settings = EcgSettings::default();
        settings.registers.calibration_frequency = Some(250);

        ConfigLoader::export_settings(&settings, &path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("[acquisition]"));

        let loaded = isolated(vec![path]).load().unwrap();
        assert_eq!(loaded, settings);
    }
}
