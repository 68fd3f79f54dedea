//! Settings for the online monitor loop, read from a TOML file.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{OdsError, OdsResult};

const DEFAULT_URL: &str = "https://www.seti.org/sites/default/files/HCRO/ods.json";
const DEFAULT_LOGFILE: &str = "online_ods_mon.txt";

/// Online monitor settings: where to fetch the posted ODS, where the local
/// log lives, and the log's column separator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    #[serde(default = "default_url")]
    pub url: String,
    #[serde(default = "default_logfile")]
    pub logfile: PathBuf,
    #[serde(default = "default_sep")]
    pub sep: char,
}

fn default_url() -> String {
    DEFAULT_URL.to_string()
}

fn default_logfile() -> PathBuf {
    PathBuf::from(DEFAULT_LOGFILE)
}

fn default_sep() -> char {
    ','
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            logfile: default_logfile(),
            sep: default_sep(),
        }
    }
}

impl MonitorConfig {
    /// Load settings from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> OdsResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| OdsError::io(path, e))?;
        toml::from_str(&text)
            .map_err(|e| OdsError::format(format!("bad monitor config {}: {e}", path.display())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = MonitorConfig::default();
        assert_eq!(cfg.sep, ',');
        assert_eq!(cfg.logfile, PathBuf::from("online_ods_mon.txt"));
    }

    #[test]
    fn test_from_file_partial_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("monitor.toml");
        fs::write(&path, "url = \"http://localhost/ods.json\"\n").unwrap();
        let cfg = MonitorConfig::from_file(&path).unwrap();
        assert_eq!(cfg.url, "http://localhost/ods.json");
        assert_eq!(cfg.sep, ',');
    }

    #[test]
    fn test_from_file_bad_toml_is_format_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("monitor.toml");
        fs::write(&path, "url = [broken\n").unwrap();
        assert!(matches!(
            MonitorConfig::from_file(&path),
            Err(OdsError::Format(_))
        ));
    }
}
