use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use ferry_transfer::TransferConfig;
use ferry_transfer::data::{CHECKPOINT_KEY, DEFAULT_CHUNK_SIZE, DEFAULT_MANAGED_FILES_URL, DEFAULT_TIME_BUDGET};
use serde::{Deserialize, Serialize};

pub const CONFIG_FILE: &str = "ferry.toml";
pub const ENV_PREFIX: &str = "FERRY_";

/// Settings after layering defaults, `ferry.toml`, `FERRY_*` and flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub chunk_size: u64,
    pub time_budget_secs: u64,
    pub token: Option<String>,
    pub state_dir: PathBuf,
    pub checkpoint_key: String,
    pub managed_files_url: String,
    /// `tracing` filter directive, used when `RUST_LOG` is unset.
    pub log: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            time_budget_secs: DEFAULT_TIME_BUDGET.as_secs(),
            token: None,
            state_dir: PathBuf::from(".ferry"),
            checkpoint_key: CHECKPOINT_KEY.to_string(),
            managed_files_url: DEFAULT_MANAGED_FILES_URL.to_string(),
            log: "info".to_string(),
        }
    }
}

/// Values given on the command line. Unset fields leave lower layers alone.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Overrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunk_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_budget_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkpoint_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log: Option<String>,
}

impl Settings {
    pub fn figment(file: &Path, overrides: &Overrides) -> Figment {
        Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(file))
            .merge(Env::prefixed(ENV_PREFIX))
            .merge(Serialized::defaults(overrides))
    }

    pub fn load(file: Option<&Path>, overrides: &Overrides) -> Result<Self, figment::Error> {
        let file = file.unwrap_or(Path::new(CONFIG_FILE));
        Self::figment(file, overrides).extract()
    }

    pub fn transfer_config(&self) -> TransferConfig {
        TransferConfig::default()
            .chunk_size(self.chunk_size)
            .time_budget(Duration::from_secs(self.time_budget_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, contents: &str) -> PathBuf {
        let path = dir.join(CONFIG_FILE);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::figment(&dir.path().join(CONFIG_FILE), &Overrides::default())
            .extract::<Settings>()
            .unwrap();
        assert_eq!(settings.chunk_size, 16_777_216);
        assert_eq!(settings.time_budget_secs, 300);
        assert_eq!(settings.managed_files_url, DEFAULT_MANAGED_FILES_URL);
    }

    #[test]
    fn file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            r#"
chunk_size = 524288
time_budget_secs = 60
token = "from-file"
"#,
        );
        let settings: Settings = Settings::figment(&path, &Overrides::default()).extract().unwrap();
        assert_eq!(settings.chunk_size, 524_288);
        assert_eq!(settings.time_budget_secs, 60);
        assert_eq!(settings.token.as_deref(), Some("from-file"));
        assert_eq!(settings.log, "info");
    }

    #[test]
    fn flags_override_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "chunk_size = 524288\nlog = \"warn\"\n");
        let overrides = Overrides {
            chunk_size: Some(262_144),
            state_dir: Some(PathBuf::from("/var/lib/ferry")),
            ..Overrides::default()
        };
        let settings: Settings = Settings::figment(&path, &overrides).extract().unwrap();
        assert_eq!(settings.chunk_size, 262_144);
        assert_eq!(settings.state_dir, PathBuf::from("/var/lib/ferry"));
        assert_eq!(settings.log, "warn");
    }

    #[test]
    fn transfer_config_uses_seconds() {
        let settings = Settings {
            time_budget_secs: 90,
            ..Settings::default()
        };
        assert_eq!(settings.transfer_config().time_budget, Duration::from_secs(90));
    }
}
