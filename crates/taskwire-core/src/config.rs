use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::document::DocFormat;

pub const DEFAULT_OWNER: &str = "cli";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_POLL_SECS: u64 = 30;

const URL_VARS: [&str; 2] = ["TODO_CLI_SUPABASE_URL", "SUPABASE_URL"];
const KEY_VARS: [&str; 2] = [
    "TODO_CLI_SUPABASE_SERVICE_ROLE_KEY",
    "SUPABASE_SERVICE_ROLE_KEY",
];
const OWNER_VARS: [&str; 2] = ["TODO_CLI_TELEGRAM_CHAT_ID", "TELEGRAM_CHAT_ID"];
const DOCUMENT_VARS: [&str; 1] = ["TODO_CLI_FILE"];
const FORMAT_VARS: [&str; 1] = ["TODO_CLI_FORMAT"];
const POLL_VARS: [&str; 1] = ["TODO_CLI_POLL_SECS"];
const BOT_TOKEN_VARS: [&str; 2] = ["TODO_CLI_TELEGRAM_BOT_TOKEN", "TELEGRAM_BOT_TOKEN"];
const PORT_VARS: [&str; 1] = ["PORT"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing {0} (set it in the environment, a .env file or ~/.taskwire/config.toml)")]
    Missing(&'static str),
    #[error("Invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
    #[error("Config IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Optional settings file at `$TASKWIRE_HOME/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileConfig {
    pub supabase_url: Option<String>,
    pub service_role_key: Option<String>,
    pub owner: Option<String>,
    pub document: Option<String>,
    pub format: Option<String>,
    pub poll_secs: Option<u64>,
    pub bot_token: Option<String>,
    pub port: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    pub url: String,
    pub key: String,
}

/// Read-only settings resolved once at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    pub backend: BackendConfig,
    pub owner: String,
    pub document: Option<PathBuf>,
    pub format: DocFormat,
    pub poll_interval: Duration,
    pub bot_token: Option<String>,
    pub port: u16,
}

impl Settings {
    /// Load `.env` files, then resolve from the environment with the global
    /// config file as fallback.
    pub fn load() -> Result<Self, ConfigError> {
        load_dotenv();
        let file = load_global_config()?.unwrap_or_default();
        Self::resolve(env_var, &file, resolve_user_home_dir().as_deref())
    }

    pub fn resolve(
        lookup: impl Fn(&str) -> Option<String>,
        file: &FileConfig,
        home: Option<&Path>,
    ) -> Result<Self, ConfigError> {
        let first = |names: &[&str]| names.iter().find_map(|name| non_empty(lookup(name)));

        let url = first(&URL_VARS)
            .or_else(|| non_empty(file.supabase_url.clone()))
            .ok_or(ConfigError::Missing("SUPABASE_URL"))?;
        let key = first(&KEY_VARS)
            .or_else(|| non_empty(file.service_role_key.clone()))
            .ok_or(ConfigError::Missing("SUPABASE_SERVICE_ROLE_KEY"))?;
        let owner = first(&OWNER_VARS)
            .or_else(|| non_empty(file.owner.clone()))
            .unwrap_or_else(|| DEFAULT_OWNER.to_string());
        let document = first(&DOCUMENT_VARS)
            .or_else(|| non_empty(file.document.clone()))
            .map(|raw| expand_tilde(&raw, home));
        let format = match first(&FORMAT_VARS).or_else(|| non_empty(file.format.clone())) {
            Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                name: "TODO_CLI_FORMAT",
                value: raw,
            })?,
            None => DocFormat::default(),
        };
        let poll_secs = match first(&POLL_VARS) {
            Some(raw) => parse_positive(&raw).ok_or(ConfigError::Invalid {
                name: "TODO_CLI_POLL_SECS",
                value: raw,
            })?,
            None => file.poll_secs.unwrap_or(DEFAULT_POLL_SECS),
        };
        let bot_token = first(&BOT_TOKEN_VARS).or_else(|| non_empty(file.bot_token.clone()));
        let port = match first(&PORT_VARS) {
            Some(raw) => raw.trim().parse::<u16>().map_err(|_| ConfigError::Invalid {
                name: "PORT",
                value: raw,
            })?,
            None => file.port.unwrap_or(DEFAULT_PORT),
        };

        Ok(Settings {
            backend: BackendConfig { url, key },
            owner,
            document,
            format,
            poll_interval: Duration::from_secs(poll_secs.max(1)),
            bot_token,
            port,
        })
    }

    pub fn require_document(&self) -> Result<&Path, ConfigError> {
        self.document
            .as_deref()
            .ok_or(ConfigError::Missing("TODO_CLI_FILE"))
    }

    pub fn require_bot_token(&self) -> Result<&str, ConfigError> {
        self.bot_token
            .as_deref()
            .ok_or(ConfigError::Missing("TELEGRAM_BOT_TOKEN"))
    }
}

pub fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_positive(raw: &str) -> Option<u64> {
    raw.trim().parse::<u64>().ok().filter(|value| *value > 0)
}

pub fn expand_tilde(raw: &str, home: Option<&Path>) -> PathBuf {
    match (raw.strip_prefix('~'), home) {
        (Some(rest), Some(home)) => home.join(rest.trim_start_matches(['/', '\\'])),
        _ => PathBuf::from(raw),
    }
}

pub fn resolve_user_home_dir() -> Option<PathBuf> {
    if let Ok(home) = std::env::var("HOME") {
        let trimmed = home.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }
    if let Ok(profile) = std::env::var("USERPROFILE") {
        let trimmed = profile.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }
    None
}

pub fn resolve_taskwire_home_dir() -> Option<PathBuf> {
    if let Ok(value) = std::env::var("TASKWIRE_HOME") {
        let trimmed = value.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }
    resolve_user_home_dir().map(|home| home.join(".taskwire"))
}

pub fn global_config_path() -> Option<PathBuf> {
    resolve_taskwire_home_dir().map(|home| home.join("config.toml"))
}

pub fn load_global_config() -> Result<Option<FileConfig>, ConfigError> {
    let Some(path) = global_config_path() else {
        return Ok(None);
    };
    if !path.is_file() {
        return Ok(None);
    }
    let text = fs::read_to_string(&path)?;
    Ok(Some(toml::from_str::<FileConfig>(&text)?))
}

/// `.env` beside the executable, in the working directory, then
/// `~/.todo-cli.env`. Variables already set are never overridden.
pub fn load_dotenv() {
    if let Some(dir) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        if dotenv::from_path(dir.join(".env")).is_ok() {
            debug!(dir = %dir.display(), "loaded .env beside executable");
        }
    }
    if let Ok(path) = dotenv::dotenv() {
        debug!(path = %path.display(), "loaded .env");
    }
    if let Some(home) = resolve_user_home_dir() {
        let _ = dotenv::from_path(home.join(".todo-cli.env"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::ffi::OsString;
    use tempfile::TempDir;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    struct EnvGuard {
        taskwire_home: Option<OsString>,
    }

    impl EnvGuard {
        fn capture() -> Self {
            Self {
                taskwire_home: std::env::var_os("TASKWIRE_HOME"),
            }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            if let Some(value) = self.taskwire_home.as_ref() {
                std::env::set_var("TASKWIRE_HOME", value);
            } else {
                std::env::remove_var("TASKWIRE_HOME");
            }
        }
    }

    #[test]
    fn resolves_defaults_for_optional_values() {
        let settings = Settings::resolve(
            lookup(&[
                ("SUPABASE_URL", "https://db.example"),
                ("SUPABASE_SERVICE_ROLE_KEY", "k"),
            ]),
            &FileConfig::default(),
            None,
        )
        .expect("resolve");
        assert_eq!(settings.owner, DEFAULT_OWNER);
        assert_eq!(settings.port, DEFAULT_PORT);
        assert_eq!(settings.format, DocFormat::Inline);
        assert_eq!(settings.poll_interval, Duration::from_secs(DEFAULT_POLL_SECS));
        assert!(settings.document.is_none());
        assert!(matches!(
            settings.require_bot_token(),
            Err(ConfigError::Missing("TELEGRAM_BOT_TOKEN"))
        ));
    }

    #[test]
    fn missing_backend_url_is_reported_by_name() {
        let err = Settings::resolve(
            lookup(&[("SUPABASE_SERVICE_ROLE_KEY", "k")]),
            &FileConfig::default(),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Missing("SUPABASE_URL")));
    }

    #[test]
    fn prefixed_variables_win_over_plain_ones_and_file() {
        let file = FileConfig {
            owner: Some("from-file".to_string()),
            ..FileConfig::default()
        };
        let settings = Settings::resolve(
            lookup(&[
                ("SUPABASE_URL", "https://plain"),
                ("TODO_CLI_SUPABASE_URL", "https://prefixed"),
                ("SUPABASE_SERVICE_ROLE_KEY", "k"),
            ]),
            &file,
            None,
        )
        .expect("resolve");
        assert_eq!(settings.backend.url, "https://prefixed");
        assert_eq!(settings.owner, "from-file");
    }

    #[test]
    fn document_path_expands_home() {
        let home = Path::new("/home/someone");
        let settings = Settings::resolve(
            lookup(&[
                ("SUPABASE_URL", "u"),
                ("SUPABASE_SERVICE_ROLE_KEY", "k"),
                ("TODO_CLI_FILE", "~/notes/todo.md"),
                ("TODO_CLI_FORMAT", "comment"),
            ]),
            &FileConfig::default(),
            Some(home),
        )
        .expect("resolve");
        assert_eq!(
            settings.require_document().expect("document"),
            home.join("notes/todo.md")
        );
        assert_eq!(settings.format, DocFormat::Comment);
    }

    #[test]
    fn invalid_port_and_format_are_rejected() {
        let base = [("SUPABASE_URL", "u"), ("SUPABASE_SERVICE_ROLE_KEY", "k")];
        let mut with_port = base.to_vec();
        with_port.push(("PORT", "eighty"));
        assert!(matches!(
            Settings::resolve(lookup(&with_port), &FileConfig::default(), None),
            Err(ConfigError::Invalid { name: "PORT", .. })
        ));

        let mut with_format = base.to_vec();
        with_format.push(("TODO_CLI_FORMAT", "yaml"));
        assert!(matches!(
            Settings::resolve(lookup(&with_format), &FileConfig::default(), None),
            Err(ConfigError::Invalid { name: "TODO_CLI_FORMAT", .. })
        ));
    }

    #[test]
    fn global_config_file_is_read_from_taskwire_home() {
        let _guard = crate::test_env::lock();
        let _env = EnvGuard::capture();
        let home = TempDir::new().expect("tempdir");
        std::env::set_var("TASKWIRE_HOME", home.path());

        assert!(load_global_config().expect("load").is_none());

        fs::write(
            home.path().join("config.toml"),
            "supabase_url = \"https://file.example\"\nport = 9090\n",
        )
        .expect("write");
        let file = load_global_config().expect("load").expect("present");
        assert_eq!(file.supabase_url.as_deref(), Some("https://file.example"));

        let settings = Settings::resolve(
            lookup(&[("SUPABASE_SERVICE_ROLE_KEY", "k")]),
            &file,
            None,
        )
        .expect("resolve");
        assert_eq!(settings.backend.url, "https://file.example");
        assert_eq!(settings.port, 9090);
    }
}
