//! Configuration at ~/.config/calendar-mcp/config.toml
//!
//! Layered as: built-in defaults, the config file, `CALENDAR_MCP_*`
//! environment variables (nested keys use `__`, e.g.
//! `CALENDAR_MCP_STORE__KIND=memory`), then command-line flags applied by
//! `main`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono_tz::Tz;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_PROVIDER: &str = "eventkit";
const DEFAULT_TIMEOUT: &str = "30s";

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_notes_preview_chars() -> usize {
    calendar_mcp_core::event::NOTES_PREVIEW_CHARS
}

fn default_provider() -> String {
    DEFAULT_PROVIDER.to_string()
}

fn default_timeout() -> String {
    DEFAULT_TIMEOUT.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Used when `RUST_LOG` is not set
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// IANA zone for timestamps given without an offset; detected from the
    /// system when absent
    #[serde(default)]
    pub timezone: Option<String>,

    #[serde(default = "default_notes_preview_chars")]
    pub notes_preview_chars: usize,

    #[serde(default)]
    pub store: StoreSettings,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    #[default]
    Provider,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSettings {
    #[serde(default)]
    pub kind: StoreKind,

    /// Runs `calendar-mcp-provider-<provider>` from PATH
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Explicit provider command line; overrides `provider`
    #[serde(default)]
    pub command: Option<String>,

    #[serde(default = "default_timeout")]
    pub timeout: String,

    /// JSON file to seed the memory store from
    #[serde(default)]
    pub seed_file: Option<String>,
}

impl Default for StoreSettings {
    fn default() -> Self {
        StoreSettings {
            kind: StoreKind::default(),
            provider: default_provider(),
            command: None,
            timeout: default_timeout(),
            seed_file: None,
        }
    }
}

impl StoreSettings {
    pub fn timeout(&self) -> Result<Duration> {
        humantime::parse_duration(&self.timeout)
            .with_context(|| format!("Invalid store.timeout '{}'", self.timeout))
    }

    pub fn seed_path(&self) -> Option<PathBuf> {
        self.seed_file
            .as_deref()
            .map(|p| PathBuf::from(shellexpand::tilde(p).into_owned()))
    }
}

impl Settings {
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?
            .join("calendar-mcp");
        Ok(config_dir.join("config.toml"))
    }

    /// Load settings. An explicit `path` must exist; the default location is
    /// created with commented-out defaults on first run.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, required) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => {
                let p = Self::config_path()?;
                if !p.exists() {
                    Self::create_default_config(&p)?;
                }
                (p, false)
            }
        };

        Config::builder()
            .add_source(File::from(path.clone()).required(required))
            .add_source(
                Environment::with_prefix("CALENDAR_MCP")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("Could not read config from {}", path.display()))?
            .try_deserialize()
            .with_context(|| format!("Invalid config in {}", path.display()))
    }

    /// Create a config file with every option commented out.
    pub fn create_default_config(path: &Path) -> Result<()> {
        let contents = format!(
            "\
# calendar-mcp configuration

# Log level when RUST_LOG is not set:
# log_level = \"{DEFAULT_LOG_LEVEL}\"

# Timezone for times given without an offset (detected when unset):
# timezone = \"Europe/Berlin\"

# Characters of event notes shown in listings:
# notes_preview_chars = {}

[store]
# \"provider\" talks to calendar-mcp-provider-<provider>; \"memory\" keeps
# events in memory for testing:
# kind = \"provider\"
# provider = \"{DEFAULT_PROVIDER}\"

# Explicit provider command instead of a PATH lookup:
# command = \"/usr/local/bin/my-calendar-provider --flag\"

# How long a provider call may take:
# timeout = \"{DEFAULT_TIMEOUT}\"

# Seed data for the memory store:
# seed_file = \"~/calendar-seed.json\"
",
            default_notes_preview_chars()
        );

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Could not create config directory")?;
        }
        std::fs::write(path, contents).context("Could not write config file")?;

        Ok(())
    }

    /// The configured zone, else the system zone, else UTC.
    pub fn timezone(&self) -> Result<Tz> {
        match &self.timezone {
            Some(name) => name
                .parse::<Tz>()
                .map_err(|e| anyhow::anyhow!("Invalid timezone '{name}': {e}")),
            None => Ok(iana_time_zone::get_timezone()
                .ok()
                .and_then(|name| name.parse::<Tz>().ok())
                .unwrap_or(Tz::UTC)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn load_str(contents: &str) -> Settings {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        Settings::load(Some(file.path())).unwrap()
    }

    #[test]
    fn empty_file_gives_defaults() {
        let settings = load_str("");
        assert_eq!(settings.log_level, "info");
        assert_eq!(settings.notes_preview_chars, 100);
        assert_eq!(settings.store.kind, StoreKind::Provider);
        assert_eq!(settings.store.provider, "eventkit");
        assert_eq!(settings.store.timeout().unwrap(), Duration::from_secs(30));
    }

    #[test]
    fn reads_store_section() {
        let settings = load_str(
            r#"
timezone = "America/New_York"
notes_preview_chars = 40

[store]
kind = "memory"
timeout = "2m"
seed_file = "/tmp/seed.json"
"#,
        );
        assert_eq!(settings.store.kind, StoreKind::Memory);
        assert_eq!(settings.store.timeout().unwrap(), Duration::from_secs(120));
        assert_eq!(settings.store.seed_path(), Some(PathBuf::from("/tmp/seed.json")));
        assert_eq!(settings.notes_preview_chars, 40);
        assert_eq!(settings.timezone().unwrap(), chrono_tz::America::New_York);
    }

    #[test]
    fn tilde_in_seed_file_is_expanded() {
        let store = StoreSettings {
            seed_file: Some("~/seed.json".into()),
            ..Default::default()
        };
        let path = store.seed_path().unwrap();
        assert!(!path.to_string_lossy().starts_with('~'));
    }

    #[test]
    fn bad_timezone_is_an_error() {
        let settings = load_str(r#"timezone = "Mars/Olympus""#);
        assert!(settings.timezone().is_err());
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        assert!(Settings::load(Some(Path::new("/nonexistent/calendar-mcp.toml"))).is_err());
    }

    #[test]
    fn default_config_file_is_valid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        Settings::create_default_config(&path).unwrap();

        let settings = Settings::load(Some(&path)).unwrap();
        assert_eq!(settings.store.kind, StoreKind::Provider);
    }
}
