//! # Engine Configuration
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     HANDSET_DB_PATH=/var/lib/handset/handset.db                        │
//! │     HANDSET_CREDIT_CURRENCY=NLe                                        │
//! │     HANDSET_LOG=info,handset=trace                                     │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/handset-pos/handset.toml (Linux)                         │
//! │     ~/Library/Application Support/com.handset.pos/handset.toml (macOS) │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [database]
//! path = "/var/lib/handset/handset.db"
//! max_connections = 5
//! run_migrations = true
//!
//! [ledger]
//! currency = "NLe"
//!
//! [logging]
//! filter = "info,handset=debug,sqlx=warn"
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use handset_db::DbConfig;

use crate::error::{EngineError, EngineResult};

const CONFIG_FILE: &str = "handset.toml";
const DB_FILE: &str = "handset.db";

// =============================================================================
// Sections
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file. Defaults to the platform data directory.
    #[serde(default)]
    pub path: Option<PathBuf>,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_true")]
    pub run_migrations: bool,
}

fn default_max_connections() -> u32 {
    5
}

fn default_true() -> bool {
    true
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: None,
            max_connections: default_max_connections(),
            run_migrations: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerSettings {
    /// Currency label written into credit notes ("Credit: NLe 150.00").
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_currency() -> String {
    handset_core::DEFAULT_CREDIT_CURRENCY.to_string()
}

impl Default for LedgerSettings {
    fn default() -> Self {
        LedgerSettings {
            currency: default_currency(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default = "default_filter")]
    pub filter: String,
}

fn default_filter() -> String {
    crate::telemetry::DEFAULT_FILTER.to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        LoggingSettings {
            filter: default_filter(),
        }
    }
}

// =============================================================================
// Engine Configuration
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub ledger: LedgerSettings,

    #[serde(default)]
    pub logging: LoggingSettings,
}

impl EngineConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (`handset.toml`)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> EngineResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading engine config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load engine config: {}. Using defaults.", e);
            Self::default()
        })
    }

    pub fn validate(&self) -> EngineResult<()> {
        if self.database.max_connections == 0 {
            return Err(EngineError::Config(
                "database.max_connections must be greater than 0".into(),
            ));
        }
        if self.ledger.currency.trim().is_empty() {
            return Err(EngineError::Config("ledger.currency must not be empty".into()));
        }
        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies `HANDSET_*` overrides read through `lookup`.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup("HANDSET_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = Some(PathBuf::from(path));
        }

        if let Some(currency) = lookup("HANDSET_CREDIT_CURRENCY") {
            self.ledger.currency = currency;
        }

        if let Some(filter) = lookup("HANDSET_LOG") {
            self.logging.filter = filter;
        }
    }

    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "handset", "pos")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// The configured database file, else `handset.db` in the platform data
    /// directory, else the working directory.
    pub fn database_path(&self) -> PathBuf {
        self.database.path.clone().unwrap_or_else(|| {
            directories::ProjectDirs::from("com", "handset", "pos")
                .map(|dirs| dirs.data_dir().join(DB_FILE))
                .unwrap_or_else(|| PathBuf::from(DB_FILE))
        })
    }

    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(self.database_path())
            .max_connections(self.database.max_connections)
            .run_migrations(self.database.run_migrations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.ledger.currency, "NLe");
        assert_eq!(config.database.max_connections, 5);
        assert!(config.database.run_migrations);
        assert_eq!(config.logging.filter, "info,handset=debug,sqlx=warn");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[database]\npath = \"/tmp/shop.db\"\n\n[ledger]\ncurrency = \"SLE\""
        )
        .unwrap();

        let config = EngineConfig::load(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(config.ledger.currency, "SLE");
        assert_eq!(config.database_path(), PathBuf::from("/tmp/shop.db"));
        assert_eq!(config.database.max_connections, 5);
    }

    #[test]
    fn test_invalid_file_is_config_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[database]\nmax_connections = \"many\"").unwrap();

        let err = EngineConfig::load(Some(file.path().to_path_buf())).unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
        assert_eq!(
            EngineConfig::load_or_default(Some(file.path().to_path_buf())).ledger.currency,
            "NLe"
        );
    }

    #[test]
    fn test_overrides_win_over_file_values() {
        let vars: HashMap<&str, &str> = [
            ("HANDSET_DB_PATH", "/data/pos.db"),
            ("HANDSET_CREDIT_CURRENCY", "USD"),
            ("HANDSET_LOG", "warn"),
        ]
        .into_iter()
        .collect();

        let mut config = EngineConfig::default();
        config.ledger.currency = "SLE".into();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.database.path, Some(PathBuf::from("/data/pos.db")));
        assert_eq!(config.ledger.currency, "USD");
        assert_eq!(config.logging.filter, "warn");
    }

    #[test]
    fn test_validate_rejects_empty_currency() {
        let mut config = EngineConfig::default();
        config.ledger.currency = "  ".into();
        assert!(config.validate().is_err());
    }
}
