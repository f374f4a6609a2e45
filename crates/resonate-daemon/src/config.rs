//! Configuration file management.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use resonate_types::{DEFAULT_PLATFORM_PUBKEY, DEFAULT_RELAY_URL};

/// Complete daemon configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Storage settings.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Relay settings.
    #[serde(default)]
    pub relay: RelayConfig,
    /// Platform fee recipient settings.
    #[serde(default)]
    pub platform: PlatformConfig,
    /// Custody provider settings.
    #[serde(default)]
    pub custody: CustodyConfig,
    /// Advanced settings.
    #[serde(default)]
    pub advanced: AdvancedConfig,
}

/// Storage configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Data directory. Empty = platform default.
    #[serde(default)]
    pub data_dir: String,
}

/// Relay configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Relays every broadcast includes, on top of per-split relays.
    #[serde(default = "default_relays")]
    pub urls: Vec<String>,
}

/// Platform fee recipient configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformConfig {
    /// Hex pubkey the 2.1% platform zap pays to.
    #[serde(default = "default_platform_pubkey")]
    pub pubkey: String,
    /// Relay hint for the platform zap tag.
    #[serde(default = "default_relay_url")]
    pub relay: String,
}

/// Custody provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustodyConfig {
    /// Base URL of the custody provider.
    #[serde(default = "default_custody_url")]
    pub provider_url: String,
    /// Platform admin API key. Overridable via RESONATE_CUSTODY_ADMIN_KEY.
    #[serde(default)]
    pub admin_key: String,
}

/// Advanced configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvancedConfig {
    /// Log level: "debug" | "info" | "warn" | "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Log file path. Empty = stderr.
    #[serde(default)]
    pub log_file: String,
}

// Default value functions

fn default_relays() -> Vec<String> {
    vec![DEFAULT_RELAY_URL.to_string()]
}

fn default_relay_url() -> String {
    DEFAULT_RELAY_URL.to_string()
}

fn default_platform_pubkey() -> String {
    DEFAULT_PLATFORM_PUBKEY.to_string()
}

fn default_custody_url() -> String {
    "https://pay.resonate.fm".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            urls: default_relays(),
        }
    }
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            pubkey: default_platform_pubkey(),
            relay: default_relay_url(),
        }
    }
}

impl Default for CustodyConfig {
    fn default() -> Self {
        Self {
            provider_url: default_custody_url(),
            admin_key: String::new(),
        }
    }
}

impl Default for AdvancedConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_file: String::new(),
        }
    }
}

impl DaemonConfig {
    /// Load configuration from the default config file location.
    ///
    /// Falls back to defaults if file does not exist. The custody admin key
    /// can always be overridden from the environment so it never has to
    /// live in the config file.
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();
        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str::<DaemonConfig>(&content)?
        } else {
            Self::default()
        };
        if let Ok(key) = std::env::var("RESONATE_CUSTODY_ADMIN_KEY") {
            config.custody.admin_key = key;
        }
        Ok(config)
    }

    /// Get the data directory path.
    pub fn data_dir(&self) -> PathBuf {
        if self.storage.data_dir.is_empty() {
            Self::default_data_dir()
        } else {
            PathBuf::from(&self.storage.data_dir)
        }
    }

    /// The platform fee recipient stamped into every record.
    pub fn platform_recipient(&self) -> resonate_types::PlatformRecipient {
        resonate_types::PlatformRecipient {
            pubkey: self.platform.pubkey.clone(),
            relay: self.platform.relay.clone(),
        }
    }

    /// Get the config file path.
    fn config_path() -> PathBuf {
        if let Ok(dir) = std::env::var("RESONATE_DATA_DIR") {
            return PathBuf::from(dir).join("config.toml");
        }
        Self::default_data_dir().join("config.toml")
    }

    /// Platform-specific default data directory.
    fn default_data_dir() -> PathBuf {
        if let Ok(dir) = std::env::var("RESONATE_DATA_DIR") {
            return PathBuf::from(dir);
        }
        #[cfg(target_os = "macos")]
        {
            dirs_fallback("Library/Application Support/Resonate")
        }
        #[cfg(target_os = "linux")]
        {
            dirs_fallback(".resonate")
        }
        #[cfg(target_os = "windows")]
        {
            dirs_fallback("Resonate")
        }
        #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
        {
            dirs_fallback(".resonate")
        }
    }
}

/// Fallback home directory resolution.
fn dirs_fallback(subpath: &str) -> PathBuf {
    std::env::var("HOME")
        .map(|h| PathBuf::from(h).join(subpath))
        .unwrap_or_else(|_| PathBuf::from("/tmp/resonate"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DaemonConfig::default();
        assert_eq!(config.relay.urls, vec![DEFAULT_RELAY_URL.to_string()]);
        assert_eq!(config.platform.pubkey, DEFAULT_PLATFORM_PUBKEY);
        assert_eq!(config.advanced.log_level, "info");
        assert!(config.custody.admin_key.is_empty());
    }

    #[test]
    fn test_config_serialization() {
        let config = DaemonConfig::default();
        let toml_str = toml::to_string(&config).expect("serialize");
        let _parsed: DaemonConfig = toml::from_str(&toml_str).expect("parse");
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let parsed: DaemonConfig =
            toml::from_str("[platform]\npubkey = \"ab\"\n").expect("parse");
        assert_eq!(parsed.platform.pubkey, "ab");
        assert_eq!(parsed.platform.relay, DEFAULT_RELAY_URL);
        assert_eq!(parsed.relay.urls, vec![DEFAULT_RELAY_URL.to_string()]);
    }
}
