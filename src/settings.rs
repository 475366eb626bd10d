//! Layered settings.
//!
//! Defaults, then an optional TOML file, then `STATUSBOARD_*` environment
//! variables (`STATUSBOARD_API__BASE`, `STATUSBOARD_PROXY__LISTEN`, ...).
//! Command line flags are applied on top by the binary.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

use crate::app::{AppOptions, DEFAULT_NO_RESPONSE_CODE};
use crate::data::duration::parse_interval;
use crate::layout::DEFAULT_FIT_TARGET;

/// Static shell assets the proxy keeps cached.
pub const DEFAULT_ASSETS: &[&str] = &[
    "/index.html",
    "/js/main.js",
    "/js/board.js",
    "/js/ui/dialog.js",
    "/js/utils/domutils.js",
    "/css/main.css",
];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub api: ApiSettings,
    pub proxy: ProxySettings,
    pub ui: UiSettings,
}

/// Where the board gets its data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    /// Backend API base URL.
    pub base: String,
    /// Read `config.json` and `readAll.json` from this directory instead.
    pub dir: Option<PathBuf>,
    /// Request timeout, e.g. `"30s"`.
    pub timeout: String,
    /// Extra headers sent with every request (e.g. an authorization header).
    pub headers: BTreeMap<String, String>,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base: "http://localhost:8765/api/".to_string(),
            dir: None,
            timeout: "30s".to_string(),
            headers: BTreeMap::new(),
        }
    }
}

impl ApiSettings {
    pub fn timeout(&self) -> anyhow::Result<Duration> {
        parse_interval(&self.timeout)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxySettings {
    pub listen: String,
    /// Origin requests are forwarded to.
    pub upstream: String,
    /// Cache version; caches with any other name are dropped at startup.
    pub version: String,
    /// Paths under this prefix always go to the network.
    pub api_prefix: String,
    /// Shell assets cached at install.
    pub assets: Vec<String>,
    /// Keep the cache in this file across restarts.
    pub cache_file: Option<PathBuf>,
    pub timeout: String,
}

impl Default for ProxySettings {
    fn default() -> Self {
        Self {
            listen: "127.0.0.1:8080".to_string(),
            upstream: "http://localhost:8765".to_string(),
            version: "v0.2.0".to_string(),
            api_prefix: "/api".to_string(),
            assets: DEFAULT_ASSETS.iter().map(|s| s.to_string()).collect(),
            cache_file: None,
            timeout: "30s".to_string(),
        }
    }
}

impl ProxySettings {
    pub fn timeout(&self) -> anyhow::Result<Duration> {
        parse_interval(&self.timeout)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiSettings {
    /// Fixed refresh cadence; by default half the backend's interval.
    pub refresh: Option<String>,
    pub no_response_code: i64,
    pub fit_target: f64,
    /// Log file for the TUI. Without one, nothing is logged.
    pub log_file: Option<PathBuf>,
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            refresh: None,
            no_response_code: DEFAULT_NO_RESPONSE_CODE,
            fit_target: DEFAULT_FIT_TARGET,
            log_file: None,
        }
    }
}

impl UiSettings {
    pub fn refresh_override(&self) -> anyhow::Result<Option<Duration>> {
        self.refresh.as_deref().map(parse_interval).transpose()
    }

    pub fn app_options(&self) -> AppOptions {
        AppOptions {
            no_response_code: self.no_response_code,
            fit_target: self.fit_target,
        }
    }
}

impl Settings {
    /// Load settings from an optional file plus the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }
        builder
            .add_source(
                Environment::with_prefix("STATUSBOARD")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.api.base, "http://localhost:8765/api/");
        assert_eq!(settings.api.timeout().unwrap(), Duration::from_secs(30));
        assert_eq!(settings.proxy.version, "v0.2.0");
        assert_eq!(settings.proxy.assets.len(), 6);
        assert_eq!(settings.ui.no_response_code, 999);
        assert_eq!(settings.ui.refresh_override().unwrap(), None);
    }

    #[test]
    fn test_load_from_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[api]
base = "https://status.example.com/api/"
timeout = "5s"

[api.headers]
X-Auth-Token = "secret"

[proxy]
version = "v1"

[ui]
refresh = "15s"
"#
        )
        .unwrap();

        let settings = Settings::load(Some(file.path())).unwrap();
        assert_eq!(settings.api.base, "https://status.example.com/api/");
        assert_eq!(settings.api.timeout().unwrap(), Duration::from_secs(5));
        // Keys may come back lowercased; header names are case-insensitive.
        let token = settings
            .api
            .headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case("x-auth-token"))
            .map(|(_, value)| value.as_str());
        assert_eq!(token, Some("secret"));
        assert_eq!(settings.proxy.version, "v1");
        // Untouched sections keep their defaults.
        assert_eq!(settings.proxy.api_prefix, "/api");
        assert_eq!(settings.ui.refresh_override().unwrap(), Some(Duration::from_secs(15)));
        assert_eq!(settings.ui.no_response_code, 999);
    }

    #[test]
    fn test_bad_interval_is_an_error() {
        let ui = UiSettings {
            refresh: Some("often".to_string()),
            ..UiSettings::default()
        };
        assert!(ui.refresh_override().is_err());
    }
}
