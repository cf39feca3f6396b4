//! Runtime configuration: title, initial map view and default export settings.
//!
//! Sources from lowest to highest priority: built-in defaults, an optional JSON
//! file, then environment variables.

use std::path::Path;

use log::debug;
use serde::Deserialize;

use crate::constants;
use crate::types::{CrsMode, ExportFormat, ExportSpec, SettingsParseError};

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file could not be read
    #[error("cannot read config file {path}: {source}")]
    Io {
        /// File that failed
        path: String,
        /// Underlying error
        source: std::io::Error,
    },
    /// The config file is not valid JSON for [`StudioConfig`]
    #[error("invalid config file {path}: {source}")]
    Parse {
        /// File that failed
        path: String,
        /// Underlying error
        source: serde_json::Error,
    },
    /// A CRS or format value was not recognized
    #[error(transparent)]
    Setting(#[from] SettingsParseError),
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct StudioConfig {
    /// Window / page title
    pub title: String,
    /// Initial map center latitude
    pub start_lat: f64,
    /// Initial map center longitude
    pub start_lon: f64,
    /// Initial map zoom level
    pub start_zoom: u8,
    /// Export CRS selected at start (`WGS84`, `AUTO_UTM`, `EPSG:<n>`)
    pub default_crs: String,
    /// Export format selected at start (`WKT`, `EWKT`, `KML`)
    pub default_format: String,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            title: constants::DEFAULT_TITLE.to_string(),
            start_lat: constants::DEFAULT_START_LAT,
            start_lon: constants::DEFAULT_START_LON,
            start_zoom: constants::DEFAULT_START_ZOOM,
            default_crs: CrsMode::default().to_string(),
            default_format: ExportFormat::default().to_string(),
        }
    }
}

impl StudioConfig {
    /// Parses a JSON config file; missing fields keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Loads the optional file, applies the environment and validates the export settings.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let base = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        let config = base.with_overrides(|key| std::env::var(key).ok());
        config.export_spec()?;
        debug!("Loaded config: {config:?}");
        Ok(config)
    }

    /// Applies overrides from `lookup`. Unparseable numbers are ignored.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(title) = lookup("APP_TITLE") {
            self.title = title;
        }
        self.start_lat = lookup("START_LAT")
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(self.start_lat);
        self.start_lon = lookup("START_LON")
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(self.start_lon);
        self.start_zoom = lookup("START_ZOOM")
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(self.start_zoom);
        if let Some(crs) = lookup("AOI_EXPORT_CRS") {
            self.default_crs = crs;
        }
        if let Some(format) = lookup("AOI_EXPORT_FORMAT") {
            self.default_format = format;
        }
        self
    }

    /// Parsed default export settings.
    pub fn export_spec(&self) -> Result<ExportSpec, SettingsParseError> {
        Ok(ExportSpec::new(
            self.default_crs.parse()?,
            self.default_format.parse()?,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EpsgCode;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = StudioConfig::default();
        assert_eq!(config.start_zoom, 12);
        assert_eq!(config.start_lat, 49.8728);
        assert_eq!(config.export_spec().unwrap(), ExportSpec::default());
    }

    #[test]
    fn test_env_overrides() {
        let config = StudioConfig::default().with_overrides(env(&[
            ("APP_TITLE", "Field planner"),
            ("START_LAT", "52.52"),
            ("START_ZOOM", "9"),
            ("AOI_EXPORT_CRS", "AUTO_UTM"),
            ("AOI_EXPORT_FORMAT", "ewkt"),
        ]));
        assert_eq!(config.title, "Field planner");
        assert_eq!(config.start_lat, 52.52);
        assert_eq!(config.start_lon, 8.6512);
        assert_eq!(config.start_zoom, 9);
        assert_eq!(
            config.export_spec().unwrap(),
            ExportSpec::new(CrsMode::AutoUtm, ExportFormat::Ewkt)
        );
    }

    #[test]
    fn test_bad_numbers_keep_defaults() {
        let config = StudioConfig::default().with_overrides(env(&[
            ("START_LAT", "north"),
            ("START_ZOOM", "300"),
        ]));
        assert_eq!(config.start_lat, 49.8728);
        assert_eq!(config.start_zoom, 12);
    }

    #[test]
    fn test_bad_export_settings_are_errors() {
        let config = StudioConfig::default().with_overrides(env(&[("AOI_EXPORT_FORMAT", "SHP")]));
        assert!(config.export_spec().is_err());
        let config = StudioConfig::default().with_overrides(env(&[("AOI_EXPORT_CRS", "EPSG:x")]));
        assert!(config.export_spec().is_err());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: StudioConfig =
            serde_json::from_str(r#"{"title": "Vineyards", "default_crs": "EPSG:3857"}"#).unwrap();
        assert_eq!(config.title, "Vineyards");
        assert_eq!(config.start_zoom, 12);
        assert_eq!(
            config.export_spec().unwrap().crs,
            CrsMode::Fixed(EpsgCode::WEB_MERCATOR)
        );
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = StudioConfig::from_file(Path::new("/nonexistent/aoi-studio.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
