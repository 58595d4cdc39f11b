//! Sampler configuration.
//!
//! Configuration is stored in TOML format at:
//! - Linux: `~/.config/xampler/config.toml`
//! - macOS: `~/Library/Application Support/xampler/config.toml`
//! - Windows: `%APPDATA%\xampler\config.toml`

use crate::error::{Error, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Gain scale applied to every triggered voice so overlapping voices do not clip.
pub const DEFAULT_HEADROOM: f64 = 0.2;
/// Factor turning a 0..1 velocity fraction into the lookup domain.
pub const DEFAULT_VELOCITY_SCALE: f64 = 127.0;

/// How a scaled velocity becomes the integer lookup component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VelocityLookup {
    /// Use the scaled value as-is; a fractional value addresses no cell.
    #[default]
    Exact,
    /// Round half up to the nearest integer.
    Nearest,
    /// Truncate toward negative infinity.
    Floor,
}

impl VelocityLookup {
    /// Convert a scaled velocity into a lookup integer.
    pub fn to_lookup(self, scaled: f64) -> Option<i32> {
        if !scaled.is_finite() {
            return None;
        }
        let value = match self {
            Self::Exact if scaled.fract() != 0.0 => return None,
            Self::Exact => scaled,
            Self::Nearest => (scaled + 0.5).floor(),
            Self::Floor => scaled.floor(),
        };
        if value < i32::MIN as f64 || value > i32::MAX as f64 {
            return None;
        }
        Some(value as i32)
    }
}

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerConfig {
    /// Scale applied to every triggered gain.
    pub headroom: f64,
    /// Factor applied to the velocity fraction before lookup.
    pub velocity_scale: f64,
    /// Integer conversion of the scaled velocity.
    pub velocity_lookup: VelocityLookup,
    /// Directory that `/`-rooted asset paths resolve under.
    pub asset_root: Option<PathBuf>,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            headroom: DEFAULT_HEADROOM,
            velocity_scale: DEFAULT_VELOCITY_SCALE,
            velocity_lookup: VelocityLookup::Exact,
            asset_root: None,
        }
    }
}

impl SamplerConfig {
    /// Lookup velocity for a 0..1 velocity fraction.
    pub fn lookup_velocity(&self, fraction: f64) -> Option<i32> {
        self.velocity_lookup.to_lookup(fraction * self.velocity_scale)
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration from the default config file location
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            Self::from_file(&path)
        } else {
            Err(Error::Config(format!("Config file not found at {:?}", path)))
        }
    }

    /// Load configuration or return default if not found
    pub fn load_or_default() -> Self {
        match Self::load() {
            Ok(config) => config,
            Err(e) => {
                log::debug!("Using default configuration: {}", e);
                Self::default()
            }
        }
    }

    /// Save configuration to a file
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Get the default configuration file path
    pub fn config_path() -> Result<PathBuf> {
        if let Some(proj_dirs) = ProjectDirs::from("", "", "xampler") {
            Ok(proj_dirs.config_dir().join("config.toml"))
        } else {
            Err(Error::Config("Could not determine config directory".to_string()))
        }
    }

    /// Create a default config file with comments
    pub fn create_default_config_file() -> Result<PathBuf> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = r#"# xampler configuration file

# Gain scale applied to every triggered voice
headroom = 0.2

# Factor turning a 0..1 velocity into the 0..127 lookup domain
velocity_scale = 127.0

# How the scaled velocity becomes a lookup integer:
# "exact" (fractional values match nothing), "nearest", or "floor"
velocity_lookup = "exact"

# Directory that sample paths are resolved under (optional)
# asset_root = "/usr/share/samples"
"#;

        fs::write(&path, content)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SamplerConfig::default();
        assert_eq!(config.headroom, 0.2);
        assert_eq!(config.velocity_scale, 127.0);
        assert_eq!(config.velocity_lookup, VelocityLookup::Exact);
        assert!(config.asset_root.is_none());
    }

    #[test]
    fn test_exact_lookup() {
        let config = SamplerConfig::default();
        assert_eq!(config.lookup_velocity(1.0), Some(127));
        assert_eq!(config.lookup_velocity(0.0), Some(0));
        assert_eq!(config.lookup_velocity(0.5), None);
        assert_eq!(config.lookup_velocity(f64::NAN), None);
    }

    #[test]
    fn test_rounding_lookups() {
        assert_eq!(VelocityLookup::Nearest.to_lookup(63.5), Some(64));
        assert_eq!(VelocityLookup::Nearest.to_lookup(63.4), Some(63));
        assert_eq!(VelocityLookup::Floor.to_lookup(63.9), Some(63));
        assert_eq!(VelocityLookup::Floor.to_lookup(1e12), None);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: SamplerConfig = toml::from_str("velocity_lookup = \"nearest\"").unwrap();
        assert_eq!(config.velocity_lookup, VelocityLookup::Nearest);
        assert_eq!(config.headroom, DEFAULT_HEADROOM);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = SamplerConfig {
            headroom: 0.5,
            asset_root: Some(PathBuf::from("/srv/samples")),
            ..Default::default()
        };
        config.save_to(&path).unwrap();
        assert_eq!(SamplerConfig::from_file(&path).unwrap(), config);
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "headroom = \"loud\"").unwrap();
        assert!(matches!(
            SamplerConfig::from_file(&path),
            Err(Error::TomlParse(_))
        ));
    }
}
