//! Harness configuration
//!
//! Values are layered with the following precedence (highest first):
//! command-line overrides, process environment, an optional YAML file, and
//! built-in defaults.
//!
//! ```yaml
//! bin: ./instantly
//! report_path: /tmp/instantly_smoke_report.json
//! timeout_secs: 90
//! credential_env: INSTANTLY_API_KEY
//! filter: leads
//!
//! env:
//!   forced:
//!     INSTANTLY_BASE_URL: https://staging.example.com
//!   defaults:
//!     INSTANTLY_TIMEOUT: 30s
//! ```

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Environment variable overriding the target binary
pub const BIN_ENV: &str = "BIN";

/// Environment variable overriding the report destination
pub const REPORT_ENV: &str = "SMOKE_REPORT";

pub const DEFAULT_BIN: &str = "instantly";
pub const DEFAULT_REPORT_PATH: &str = "/tmp/instantly_smoke_report.json";
pub const DEFAULT_CREDENTIAL_ENV: &str = "INSTANTLY_API_KEY";
pub const DEFAULT_TIMEOUT_SECS: u64 = 90;

/// Always set on the child, overriding the caller's environment
pub const FORCED_ENV: [(&str, &str); 1] = [("INSTANTLY_OUTPUT", "json")];

/// Set on the child only when the caller has not set them
pub const DEFAULT_ENV: [(&str, &str); 2] = [
    ("INSTANTLY_MAX_429_RETRIES", "0"),
    ("INSTANTLY_MAX_5XX_RETRIES", "0"),
];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error in {file}: {error}")]
    Yaml {
        file: String,
        error: serde_yaml::Error,
    },

    #[error("Target binary not found: {0}")]
    BinaryNotFound(String),

    #[error("Timeout must be at least one second")]
    InvalidTimeout,
}

/// Extra variables for the child process, applied on top of the built-ins
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnvConfig {
    /// Always set, overriding the caller's environment
    #[serde(default)]
    pub forced: BTreeMap<String, String>,

    /// Set only when the caller has not set them
    #[serde(default)]
    pub defaults: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// Target executable: a path, or a name looked up on `PATH`
    #[serde(default = "default_bin")]
    pub bin: String,

    #[serde(default = "default_report_path")]
    pub report_path: PathBuf,

    /// Per-invocation timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Name of the variable holding the required credential
    #[serde(default = "default_credential_env")]
    pub credential_env: String,

    #[serde(default)]
    pub env: EnvConfig,

    /// Only run stages whose name starts with this prefix
    #[serde(default)]
    pub filter: Option<String>,
}

fn default_bin() -> String {
    DEFAULT_BIN.to_string()
}

fn default_report_path() -> PathBuf {
    PathBuf::from(DEFAULT_REPORT_PATH)
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_credential_env() -> String {
    DEFAULT_CREDENTIAL_ENV.to_string()
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            bin: default_bin(),
            report_path: default_report_path(),
            timeout_secs: default_timeout_secs(),
            credential_env: default_credential_env(),
            env: EnvConfig::default(),
            filter: None,
        }
    }
}

/// Values supplied on the command line
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub bin: Option<String>,
    pub report_path: Option<PathBuf>,
    pub timeout_secs: Option<u64>,
    pub filter: Option<String>,
}

impl HarnessConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        serde_yaml::from_str(&content).map_err(|e| ConfigError::Yaml {
            file: path.display().to_string(),
            error: e,
        })
    }

    /// Build the effective configuration from every layer
    pub fn resolve(
        file: Option<&Path>,
        env: &BTreeMap<String, String>,
        overrides: Overrides,
    ) -> Result<Self, ConfigError> {
        let mut config = match file {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        config.apply_env(env);
        config.apply_overrides(overrides);

        if config.timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout);
        }
        Ok(config)
    }

    pub fn apply_env(&mut self, env: &BTreeMap<String, String>) {
        if let Some(bin) = non_empty(env.get(BIN_ENV)) {
            self.bin = bin;
        }
        if let Some(path) = non_empty(env.get(REPORT_ENV)) {
            self.report_path = PathBuf::from(path);
        }
    }

    pub fn apply_overrides(&mut self, overrides: Overrides) {
        if let Some(bin) = overrides.bin {
            self.bin = bin;
        }
        if let Some(path) = overrides.report_path {
            self.report_path = path;
        }
        if let Some(secs) = overrides.timeout_secs {
            self.timeout_secs = secs;
        }
        if overrides.filter.is_some() {
            self.filter = overrides.filter;
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Locate the target executable.
    ///
    /// A value containing a path separator is taken as a path; a bare name is
    /// looked up on `PATH`.
    pub fn resolve_binary(&self) -> Result<PathBuf, ConfigError> {
        let candidate = Path::new(&self.bin);
        if candidate.components().count() > 1 {
            if candidate.is_file() {
                return Ok(candidate.to_path_buf());
            }
            return Err(ConfigError::BinaryNotFound(self.bin.clone()));
        }
        which::which(&self.bin).map_err(|_| ConfigError::BinaryNotFound(self.bin.clone()))
    }

    /// Whether the credential variable holds a non-blank value
    pub fn has_credential(&self, env: &BTreeMap<String, String>) -> bool {
        env.get(&self.credential_env)
            .is_some_and(|value| !value.trim().is_empty())
    }

    /// Environment for the child process.
    ///
    /// Starts from the caller's environment, fills in defaults that are
    /// unset, then applies forced values.
    pub fn child_env(&self, env: &BTreeMap<String, String>) -> BTreeMap<String, String> {
        let mut child = env.clone();
        self.overlay_env(&mut child);
        child
    }

    /// [`child_env`](Self::child_env) over raw process variables, so entries
    /// that are not valid UTF-8 reach the child unchanged
    pub fn child_env_os<I>(&self, vars: I) -> BTreeMap<OsString, OsString>
    where
        I: IntoIterator<Item = (OsString, OsString)>,
    {
        let mut child = vars.into_iter().collect();
        self.overlay_env(&mut child);
        child
    }

    fn overlay_env<K, V>(&self, child: &mut BTreeMap<K, V>)
    where
        K: Ord + From<String>,
        V: From<String>,
    {
        let defaults = DEFAULT_ENV
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .chain(self.env.defaults.clone());
        for (key, value) in defaults {
            child.entry(K::from(key)).or_insert_with(|| V::from(value));
        }

        let forced = FORCED_ENV
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .chain(self.env.forced.clone());
        for (key, value) in forced {
            child.insert(K::from(key), V::from(value));
        }
    }
}

fn non_empty(value: Option<&String>) -> Option<String> {
    value
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
