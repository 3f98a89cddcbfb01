use anyhow::{bail, Result};
use serde::Deserialize;
use std::path::Path;

/// Measurement configuration shipped alongside the application.
///
/// Read from a JSON file with camelCase keys (`measurementId`, `apiSecret`).
/// If the file is missing, unreadable, or carries an empty measurement id,
/// analytics stays disabled for the rest of the process lifetime.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsConfig {
    /// Collection property identifier, carried in the query string
    pub measurement_id: String,

    /// Shared secret for the collection endpoint
    pub api_secret: String,

    /// Optional full base-URL override for the collection endpoint
    /// (self-hosted collectors, test harnesses). Absent means the
    /// built-in endpoints apply.
    #[serde(default)]
    pub endpoint: Option<String>,
}

impl AnalyticsConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path.to_path_buf()))
            .build()?;

        let cfg: Self = settings.try_deserialize()?;

        if cfg.measurement_id.is_empty() {
            bail!("measurementId is empty");
        }

        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn loads_camel_case_keys() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("firebase_config.json");
        fs::write(
            &path,
            r#"{ "measurementId": "G-TEST123", "apiSecret": "s3cret" }"#,
        )
        .unwrap();

        let cfg = AnalyticsConfig::load(&path).unwrap();
        assert_eq!(cfg.measurement_id, "G-TEST123");
        assert_eq!(cfg.api_secret, "s3cret");
        assert!(cfg.endpoint.is_none());
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        assert!(AnalyticsConfig::load(&dir.path().join("nope.json")).is_err());
    }

    #[test]
    fn empty_measurement_id_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("firebase_config.json");
        fs::write(&path, r#"{ "measurementId": "", "apiSecret": "x" }"#).unwrap();

        assert!(AnalyticsConfig::load(&path).is_err());
    }
}
