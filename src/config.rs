//! Runtime settings
//!
//! [`Settings`] is built once at startup from the command line, the
//! environment and the arcanist configuration file (`~/.arcrc`), then passed
//! explicitly to whatever needs it.
//!
//! The arcrc file is JSON shared with `arc`:
//!
//! ```json
//! {
//!   "hosts": { "https://phab.example.com/api/": { "token": "api-..." } },
//!   "config": { "default": "https://phab.example.com/" }
//! }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};

use directories::BaseDirs;
use serde::Deserialize;
use thiserror::Error;

use crate::cli::Cli;

/// Errors that can occur while assembling the settings
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The arcrc file exists but cannot be read
    #[error("Failed to read {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },

    /// The arcrc file is not valid JSON
    #[error("Failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// No Phabricator URL was given anywhere
    #[error("No Phabricator URL configured: pass --uri, set PHABRICATOR_URI or add a default to ~/.arcrc")]
    MissingHost,

    /// No API token is known for the configured host
    #[error("No API token for {0}: pass --token, set PHABRICATOR_TOKEN or run `arc install-certificate`")]
    MissingToken(String),

    /// Connection details were needed but the arcrc file could not be used
    #[error("{0}")]
    Arcrc(String),
}

/// Contents of an arcrc file
#[derive(Debug, Default, Deserialize)]
pub struct Arcrc {
    #[serde(default)]
    pub hosts: BTreeMap<String, ArcrcHost>,
    #[serde(default)]
    pub config: ArcrcConfig,
}

#[derive(Debug, Default, Deserialize)]
pub struct ArcrcHost {
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ArcrcConfig {
    #[serde(default)]
    pub default: Option<String>,
}

impl Arcrc {
    /// Loads an arcrc file; a missing file is an empty configuration
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// The host used when none is given explicitly
    fn default_host(&self) -> Option<&str> {
        if let Some(default) = self.config.default.as_deref() {
            return Some(default);
        }
        if self.hosts.len() == 1 {
            self.hosts.keys().next().map(String::as_str)
        } else {
            None
        }
    }

    /// Token stored for the given API URL
    fn token_for(&self, api_url: &str) -> Option<&str> {
        self.hosts
            .iter()
            .find(|(host, _)| normalize_api_url(host) == api_url)
            .and_then(|(_, host)| host.token.as_deref())
    }
}

/// Connection details for the Conduit API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiSettings {
    /// Base URL ending with `/api/`
    pub url: String,
    pub token: String,
}

/// Where cached queries go
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheLocation {
    /// The platform cache directory
    Default,
    Dir(PathBuf),
    /// Keep results for this process only
    MemoryOnly,
}

/// Settings for one invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub verbose: bool,
    pub color: bool,
    pub cache: CacheLocation,
    api: Result<ApiSettings, ApiProblem>,
}

/// Why no API settings could be assembled; reported only when needed
#[derive(Debug, Clone, PartialEq, Eq)]
enum ApiProblem {
    MissingHost,
    MissingToken(String),
    Arcrc(String),
}

impl Settings {
    /// Builds the settings from parsed arguments and the arcrc file
    ///
    /// An unusable arcrc only matters to commands that reach the API: it is
    /// reported by [`Settings::api`] when the command line does not already
    /// provide the connection details.
    pub fn from_cli(cli: &Cli) -> Self {
        let color = !cli.no_color && io::stdout().is_terminal();
        let loaded = match cli.arcrc.clone().or_else(default_arcrc_path) {
            Some(path) => Arcrc::load(&path),
            None => Ok(Arcrc::default()),
        };

        match loaded {
            Ok(arcrc) => Self::resolve(cli, &arcrc, color),
            Err(err) => {
                tracing::warn!(error = %err, "ignoring arcrc");
                let mut settings = Self::resolve(cli, &Arcrc::default(), color);
                if settings.api.is_err() {
                    settings.api = Err(ApiProblem::Arcrc(err.to_string()));
                }
                settings
            }
        }
    }

    fn resolve(cli: &Cli, arcrc: &Arcrc, color: bool) -> Self {
        let cache = if cli.no_cache {
            CacheLocation::MemoryOnly
        } else if let Some(dir) = &cli.cache_dir {
            CacheLocation::Dir(dir.clone())
        } else {
            CacheLocation::Default
        };

        let api = match cli.uri.as_deref().or_else(|| arcrc.default_host()) {
            None => Err(ApiProblem::MissingHost),
            Some(host) => {
                let url = normalize_api_url(host);
                match cli.token.clone().or_else(|| arcrc.token_for(&url).map(str::to_string)) {
                    Some(token) => Ok(ApiSettings { url, token }),
                    None => Err(ApiProblem::MissingToken(url)),
                }
            }
        };

        Self {
            verbose: cli.verbose,
            color,
            cache,
            api,
        }
    }

    /// Connection details, or why they are missing
    pub fn api(&self) -> Result<&ApiSettings, ConfigError> {
        match &self.api {
            Ok(api) => Ok(api),
            Err(ApiProblem::MissingHost) => Err(ConfigError::MissingHost),
            Err(ApiProblem::MissingToken(url)) => Err(ConfigError::MissingToken(url.clone())),
            Err(ApiProblem::Arcrc(problem)) => Err(ConfigError::Arcrc(problem.clone())),
        }
    }
}

fn default_arcrc_path() -> Option<PathBuf> {
    BaseDirs::new().map(|dirs| dirs.home_dir().join(".arcrc"))
}

/// Turns `https://phab.example.com`, `.../` or `.../api` into `.../api/`
pub fn normalize_api_url(host: &str) -> String {
    let base = host.trim().trim_end_matches('/');
    let base = base.strip_suffix("/api").unwrap_or(base);
    format!("{base}/api/")
}
