//! Import configuration.
//!
//! Settings can be loaded from a YAML file (`rusts-import.yml` by default)
//! and overridden from the command line. String-valued settings are parsed
//! into their typed forms by [`ImportConfig::validate`].

use crate::error::{ImportError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Number of data lines sent per write request.
pub const DEFAULT_BATCH_SIZE: usize = 5000;

/// Default config file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "rusts-import.yml";

/// Complete importer configuration - can be loaded from YAML
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    /// Server connection settings
    pub connection: ConnectionSettings,
    /// Source file and write settings
    pub import: ImportSettings,
    /// Logging settings
    pub logging: LoggingSettings,
}

/// Server connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionSettings {
    /// Server URL
    pub url: String,
    /// Username for basic auth (empty = no auth)
    pub username: String,
    /// Password for basic auth
    pub password: String,
    /// Protocol/API version advertised to the server
    pub version: String,
    /// Request timeout in seconds (0 = no timeout)
    pub timeout_secs: u64,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            url: "http://localhost:8086".to_string(),
            username: String::new(),
            password: String::new(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            timeout_secs: 0,
        }
    }
}

/// Source file and write settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportSettings {
    /// Path of the dump file
    pub path: Option<PathBuf>,
    /// Whether the dump file is gzip-compressed
    pub compressed: bool,
    /// Write precision: "ns", "u", "ms", "s", "m", "h" (empty = server default)
    pub precision: String,
    /// Write consistency: "any", "one", "quorum", "all" (empty = server default)
    pub consistency: String,
    /// Data lines per write request
    pub batch_size: usize,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            path: None,
            compressed: false,
            precision: "ns".to_string(),
            consistency: "any".to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level used when RUST_LOG is not set
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl ImportConfig {
    /// Load configuration from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        serde_yaml::from_str(&content).map_err(|e| {
            ImportError::Config(format!("{}: {}", path.as_ref().display(), e))
        })
    }

    /// Write default config to a file (for generating example config)
    pub fn write_default(path: impl AsRef<Path>) -> Result<()> {
        let yaml = serde_yaml::to_string(&Self::default())
            .map_err(|e| ImportError::Config(e.to_string()))?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Parsed write precision
    pub fn precision(&self) -> Result<Option<Precision>> {
        parse_optional(&self.import.precision)
    }

    /// Parsed write consistency
    pub fn consistency(&self) -> Result<Option<WriteConsistency>> {
        parse_optional(&self.import.consistency)
    }

    /// Request timeout, `None` when unlimited
    pub fn timeout(&self) -> Option<Duration> {
        match self.connection.timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    /// Check settings that would otherwise fail halfway through an import.
    pub fn validate(&self) -> Result<()> {
        if self.import.batch_size == 0 {
            return Err(ImportError::Config("batch_size must be greater than 0".into()));
        }
        reqwest::Url::parse(&self.connection.url).map_err(|e| {
            ImportError::Config(format!("invalid server url '{}': {}", self.connection.url, e))
        })?;
        self.precision()?;
        self.consistency()?;
        Ok(())
    }
}

fn parse_optional<T: FromStr<Err = ImportError>>(value: &str) -> Result<Option<T>> {
    let value = value.trim();
    if value.is_empty() {
        Ok(None)
    } else {
        value.parse().map(Some)
    }
}

/// Timestamp precision of the data lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precision {
    Nanoseconds,
    Microseconds,
    Milliseconds,
    Seconds,
    Minutes,
    Hours,
}

impl Precision {
    /// Value of the `precision` write parameter
    pub fn as_str(&self) -> &'static str {
        match self {
            Precision::Nanoseconds => "ns",
            Precision::Microseconds => "u",
            Precision::Milliseconds => "ms",
            Precision::Seconds => "s",
            Precision::Minutes => "m",
            Precision::Hours => "h",
        }
    }
}

impl FromStr for Precision {
    type Err = ImportError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "n" | "ns" => Ok(Precision::Nanoseconds),
            "u" | "us" => Ok(Precision::Microseconds),
            "ms" => Ok(Precision::Milliseconds),
            "s" => Ok(Precision::Seconds),
            "m" => Ok(Precision::Minutes),
            "h" => Ok(Precision::Hours),
            other => Err(ImportError::Config(format!("unknown precision '{}'", other))),
        }
    }
}

impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Write consistency level requested from a clustered server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteConsistency {
    Any,
    One,
    Quorum,
    All,
}

impl WriteConsistency {
    /// Value of the `consistency` write parameter
    pub fn as_str(&self) -> &'static str {
        match self {
            WriteConsistency::Any => "any",
            WriteConsistency::One => "one",
            WriteConsistency::Quorum => "quorum",
            WriteConsistency::All => "all",
        }
    }
}

impl FromStr for WriteConsistency {
    type Err = ImportError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "any" => Ok(WriteConsistency::Any),
            "one" => Ok(WriteConsistency::One),
            "quorum" => Ok(WriteConsistency::Quorum),
            "all" => Ok(WriteConsistency::All),
            other => Err(ImportError::Config(format!("unknown write consistency '{}'", other))),
        }
    }
}

impl fmt::Display for WriteConsistency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ImportConfig::default();
        assert_eq!(config.connection.url, "http://localhost:8086");
        assert_eq!(config.import.batch_size, DEFAULT_BATCH_SIZE);
        assert!(config.import.path.is_none());
        assert!(!config.import.compressed);
        assert!(config.timeout().is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_precision() {
        assert_eq!("n".parse::<Precision>().unwrap(), Precision::Nanoseconds);
        assert_eq!("NS".parse::<Precision>().unwrap(), Precision::Nanoseconds);
        assert_eq!("us".parse::<Precision>().unwrap(), Precision::Microseconds);
        assert_eq!("h".parse::<Precision>().unwrap(), Precision::Hours);
        assert!("days".parse::<Precision>().is_err());
        assert_eq!(Precision::Microseconds.as_str(), "u");
    }

    #[test]
    fn test_parse_consistency() {
        assert_eq!("quorum".parse::<WriteConsistency>().unwrap(), WriteConsistency::Quorum);
        assert_eq!("ALL".parse::<WriteConsistency>().unwrap(), WriteConsistency::All);
        assert!("most".parse::<WriteConsistency>().is_err());
    }

    #[test]
    fn test_empty_values_use_server_default() {
        let mut config = ImportConfig::default();
        config.import.precision = String::new();
        config.import.consistency = "  ".to_string();
        assert_eq!(config.precision().unwrap(), None);
        assert_eq!(config.consistency().unwrap(), None);
    }

    #[test]
    fn test_validate_rejects_bad_settings() {
        let mut config = ImportConfig::default();
        config.import.batch_size = 0;
        assert!(matches!(config.validate(), Err(ImportError::Config(_))));

        let mut config = ImportConfig::default();
        config.connection.url = "not a url".to_string();
        assert!(config.validate().is_err());

        let mut config = ImportConfig::default();
        config.import.precision = "fortnight".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_yaml_partial_config() {
        let yaml = r#"
connection:
  url: "http://db.example.com:8086"
  username: admin
import:
  path: /tmp/export.txt.gz
  compressed: true
  batch_size: 100
"#;
        let config: ImportConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.connection.url, "http://db.example.com:8086");
        assert_eq!(config.connection.username, "admin");
        assert_eq!(config.connection.password, "");
        assert_eq!(config.import.path, Some(PathBuf::from("/tmp/export.txt.gz")));
        assert!(config.import.compressed);
        assert_eq!(config.import.batch_size, 100);
        // Unspecified fields keep their defaults
        assert_eq!(config.import.precision, "ns");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_write_default_roundtrips() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("rusts-import.yml");
        ImportConfig::write_default(&path).unwrap();

        let loaded = ImportConfig::from_file(&path).unwrap();
        assert_eq!(loaded.connection.url, ImportConfig::default().connection.url);
        assert_eq!(loaded.import.batch_size, DEFAULT_BATCH_SIZE);
    }
}
