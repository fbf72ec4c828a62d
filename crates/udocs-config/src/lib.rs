//! Configuration management for udocs.
//!
//! Parses `udocs.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! Values are layered in this order, later layers winning:
//! 1. built-in defaults
//! 2. `udocs.toml`
//! 3. `UDOCS_*` environment variables (empty values are ignored)
//! 4. [`CliSettings`]
//!
//! ## Environment Variable Expansion
//!
//! Some string values support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `server.entry_point`
//! - `storage.mongo_url`
//! - `quip.access_token`

mod expand;

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "udocs.toml";

/// Prefix of environment variables overriding file values.
const ENV_PREFIX: &str = "UDOCS_";

/// Deploy directory used when none is configured.
const DEFAULT_DEPLOY_DIR: &str = "~/.udocs/var/deploy";

/// Placeholder printed instead of secrets.
const REDACTED: &str = "********";

/// CLI settings that override configuration file and environment values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override server bind address.
    pub bind_addr: Option<String>,
    /// Override server port.
    pub port: Option<u16>,
    /// Override the route `/` redirects to.
    pub root_route: Option<String>,
}

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Site presentation and routing.
    pub site: SiteConfig,
    /// Storage configuration (paths are raw strings from TOML).
    storage: StorageConfigRaw,
    /// Quip configuration (optional section).
    pub quip: Option<QuipConfig>,

    /// Resolved storage configuration (set after loading).
    #[serde(skip)]
    pub storage_resolved: StorageConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// Server configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Public URL of the server without port, e.g. `http://docs.example.com`.
    pub entry_point: String,
    /// Address the server binds to.
    pub bind_addr: String,
    /// Server port.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            entry_point: "http://localhost".to_owned(),
            bind_addr: "0.0.0.0".to_owned(),
            port: 9554,
        }
    }
}

impl ServerConfig {
    /// Public base URL, `{entry_point}:{port}`.
    #[must_use]
    pub fn public_url(&self) -> String {
        format!("{}:{}", self.entry_point.trim_end_matches('/'), self.port)
    }
}

/// Site presentation and routing.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Route `/` redirects to. Empty serves the home page.
    pub root_route: String,
    /// Organization name shown in the page header.
    pub organization: String,
    /// Contact address shown in the page footer.
    pub email: String,
    /// Placeholder of the search box.
    pub search_placeholder: String,
    /// Primary theme color.
    pub primary_color: String,
    /// Routes reserved for published guides.
    pub routes: Vec<String>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            root_route: String::new(),
            organization: String::new(),
            email: String::new(),
            search_placeholder: "Search".to_owned(),
            primary_color: "#5ca616".to_owned(),
            routes: Vec::new(),
        }
    }
}

/// Raw storage configuration as parsed from TOML (paths as strings).
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct StorageConfigRaw {
    deploy_dir: Option<String>,
    search_dir: Option<String>,
    mongo_url: Option<String>,
}

/// Resolved storage configuration with absolute paths.
#[derive(Debug, Default)]
pub struct StorageConfig {
    /// Root of the filesystem backend.
    pub deploy_dir: PathBuf,
    /// Directory of the full-text search index.
    pub search_dir: PathBuf,
    /// `MongoDB` connection URL. Selects the Mongo backend when set.
    pub mongo_url: Option<String>,
}

/// Storage backend selected by the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    /// Records as files under `deploy_dir`.
    Filesystem {
        deploy_dir: PathBuf,
        search_dir: PathBuf,
    },
    /// Records in a `MongoDB` database, search index on local disk.
    Mongo { url: String, search_dir: PathBuf },
}

impl StorageConfig {
    /// Backend to open, chosen by whether a Mongo URL is configured.
    #[must_use]
    pub fn backend(&self) -> StorageBackend {
        match &self.mongo_url {
            Some(url) => StorageBackend::Mongo {
                url: url.clone(),
                search_dir: self.search_dir.clone(),
            },
            None => StorageBackend::Filesystem {
                deploy_dir: self.deploy_dir.clone(),
                search_dir: self.search_dir.clone(),
            },
        }
    }
}

/// Quip configuration.
#[derive(Debug, Deserialize)]
pub struct QuipConfig {
    /// Personal access token for the Quip API.
    pub access_token: String,
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`quip.access_token`").
        field: String,
        /// Error message (e.g., "${`QUIP_TOKEN`} not set").
        message: String,
    },
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

/// Require a URL field to use http:// or https:// scheme.
fn require_http_url(url: &str, field: &str) -> Result<(), ConfigError> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ConfigError::Validation(format!(
            "{field} must start with http:// or https://"
        )));
    }
    Ok(())
}

/// Split a comma separated route list, dropping empty entries.
fn split_routes(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|route| !route.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Read a variable from the process environment.
fn process_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `udocs.toml` in current directory and parents.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing fails,
    /// an override is malformed or the result does not validate.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let discovered = match config_path {
            Some(path) => Some(path.to_path_buf()),
            None => std::env::current_dir()
                .ok()
                .and_then(|cwd| Self::discover_config(&cwd)),
        };
        Self::load_with(discovered.as_deref(), cli_settings, &process_env)
    }

    /// Load configuration resolving environment variables through `lookup`.
    fn load_with(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
        lookup: &dyn Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path, lookup)?
        } else {
            Self::default_with_cwd()
        };

        config.apply_env(lookup)?;

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
        }

        config.validate()?;
        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(bind_addr) = &settings.bind_addr {
            self.server.bind_addr.clone_from(bind_addr);
        }
        if let Some(port) = settings.port {
            self.server.port = port;
        }
        if let Some(root_route) = &settings.root_route {
            self.site.root_route.clone_from(root_route);
        }
    }

    /// Apply `UDOCS_*` overrides. Unset and empty variables are ignored.
    fn apply_env(&mut self, lookup: &dyn Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}")).filter(|v| !v.is_empty());

        if let Some(v) = var("ENTRY_POINT") {
            self.server.entry_point = v;
        }
        if let Some(v) = var("BIND_ADDR") {
            self.server.bind_addr = v;
        }
        if let Some(v) = var("PORT") {
            self.server.port = v.parse().map_err(|_| {
                ConfigError::Validation(format!("{ENV_PREFIX}PORT is not a valid port: {v:?}"))
            })?;
        }
        if let Some(v) = var("ROOT_ROUTE") {
            self.site.root_route = v;
        }
        if let Some(v) = var("ORGANIZATION") {
            self.site.organization = v;
        }
        if let Some(v) = var("EMAIL") {
            self.site.email = v;
        }
        if let Some(v) = var("SEARCH_PLACEHOLDER") {
            self.site.search_placeholder = v;
        }
        if let Some(v) = var("PRIMARY_COLOR") {
            self.site.primary_color = v;
        }
        if let Some(v) = var("ROUTES") {
            self.site.routes = split_routes(&v);
        }
        if let Some(v) = var("MONGO_URL") {
            self.storage_resolved.mongo_url = Some(v);
        }
        if let Some(v) = var("QUIP_ACCESS_TOKEN") {
            self.quip = Some(QuipConfig { access_token: v });
        }
        Ok(())
    }

    /// Quip access token, if configured.
    #[must_use]
    pub fn quip_access_token(&self) -> Option<&str> {
        self.quip
            .as_ref()
            .map(|quip| quip.access_token.as_str())
            .filter(|token| !token.is_empty())
    }

    /// Effective settings as `UDOCS_*=value` lines, secrets redacted.
    #[must_use]
    pub fn env_lines(&self) -> Vec<String> {
        let token = if self.quip_access_token().is_some() {
            REDACTED
        } else {
            ""
        };
        let port = self.server.port.to_string();
        let routes = self.site.routes.join(",");
        let mongo_url = self.storage_resolved.mongo_url.as_deref().unwrap_or_default();

        [
            ("ENTRY_POINT", self.server.entry_point.as_str()),
            ("BIND_ADDR", self.server.bind_addr.as_str()),
            ("PORT", port.as_str()),
            ("ROOT_ROUTE", self.site.root_route.as_str()),
            ("ROUTES", routes.as_str()),
            ("MONGO_URL", mongo_url),
            ("ORGANIZATION", self.site.organization.as_str()),
            ("EMAIL", self.site.email.as_str()),
            ("SEARCH_PLACEHOLDER", self.site.search_placeholder.as_str()),
            ("QUIP_ACCESS_TOKEN", token),
            ("PRIMARY_COLOR", self.site.primary_color.as_str()),
        ]
        .into_iter()
        .map(|(name, value)| format!("{ENV_PREFIX}{name}={value}"))
        .collect()
    }

    /// Search for config file in `start` and its parents.
    fn discover_config(start: &Path) -> Option<PathBuf> {
        let mut current = start.to_path_buf();
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Create default config with paths relative to current working directory.
    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    /// Create default config with paths relative to given base directory.
    fn default_with_base(base: &Path) -> Self {
        let mut config = Self {
            server: ServerConfig::default(),
            site: SiteConfig::default(),
            storage: StorageConfigRaw::default(),
            quip: None,
            storage_resolved: StorageConfig::default(),
            config_path: None,
        };
        config.resolve_paths(base);
        config
    }

    /// Load configuration from a specific file.
    fn load_from_file(
        path: &Path,
        lookup: &dyn Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        config.expand_env_vars(lookup)?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir);
        config.config_path = Some(path.to_path_buf());

        tracing::debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// Called automatically at the end of [`Config::load`].
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.server.bind_addr, "server.bind_addr")?;
        if self.server.port == 0 {
            return Err(ConfigError::Validation("server.port cannot be 0".to_owned()));
        }
        require_http_url(&self.server.entry_point, "server.entry_point")?;
        if let Some(quip) = &self.quip {
            require_non_empty(&quip.access_token, "quip.access_token")?;
        }
        Ok(())
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self, lookup: &dyn Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        self.server.entry_point =
            expand::expand_env(&self.server.entry_point, "server.entry_point", lookup)?;

        if let Some(ref url) = self.storage.mongo_url {
            self.storage.mongo_url = Some(expand::expand_env(url, "storage.mongo_url", lookup)?);
        }

        if let Some(ref mut quip) = self.quip {
            quip.access_token = expand::expand_env(&quip.access_token, "quip.access_token", lookup)?;
        }

        Ok(())
    }

    /// Resolve storage paths. Relative paths are taken from `config_dir`.
    fn resolve_paths(&mut self, config_dir: &Path) {
        let resolve = |raw: &str| {
            let path = PathBuf::from(expand::expand_home(raw));
            if path.is_relative() {
                config_dir.join(path)
            } else {
                path
            }
        };

        let deploy_dir = resolve(self.storage.deploy_dir.as_deref().unwrap_or(DEFAULT_DEPLOY_DIR));
        let search_dir = self
            .storage
            .search_dir
            .as_deref()
            .map_or_else(|| deploy_dir.join("search"), resolve);

        self.storage_resolved = StorageConfig {
            deploy_dir,
            search_dir,
            mongo_url: self.storage.mongo_url.clone().filter(|url| !url.is_empty()),
        };
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn write_config(dir: &Path, content: &str) -> PathBuf {
        let path = dir.join(CONFIG_FILENAME);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_default_config() {
        let config = Config::default_with_base(Path::new("/test"));

        assert_eq!(config.server.entry_point, "http://localhost");
        assert_eq!(config.server.bind_addr, "0.0.0.0");
        assert_eq!(config.server.port, 9554);
        assert_eq!(config.site.search_placeholder, "Search");
        assert_eq!(config.site.primary_color, "#5ca616");
        assert!(config.site.routes.is_empty());
        assert!(config.storage_resolved.mongo_url.is_none());
        assert_eq!(
            config.storage_resolved.search_dir,
            config.storage_resolved.deploy_dir.join("search")
        );
        config.validate().unwrap();
    }

    #[test]
    fn test_parse_minimal_config() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.port, 9554);
        assert!(config.quip.is_none());
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r##"
[server]
entry_point = "https://docs.example.com"
bind_addr = "127.0.0.1"
port = 8080

[site]
root_route = "handbook"
organization = "Example"
email = "docs@example.com"
primary_color = "#000000"
routes = ["handbook", "api"]

[storage]
deploy_dir = "var/deploy"
mongo_url = "mongodb://localhost:27017/udocs"

[quip]
access_token = "token"
"##;
        let mut config: Config = toml::from_str(toml).unwrap();
        config.resolve_paths(Path::new("/project"));

        assert_eq!(config.server.entry_point, "https://docs.example.com");
        assert_eq!(config.server.bind_addr, "127.0.0.1");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.site.root_route, "handbook");
        assert_eq!(config.site.routes, vec!["handbook", "api"]);
        assert_eq!(config.site.search_placeholder, "Search");
        assert_eq!(config.storage_resolved.deploy_dir, PathBuf::from("/project/var/deploy"));
        assert_eq!(
            config.storage_resolved.search_dir,
            PathBuf::from("/project/var/deploy/search")
        );
        assert_eq!(config.quip_access_token(), Some("token"));
    }

    #[test]
    fn test_storage_backend_selection() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.storage_resolved.deploy_dir = PathBuf::from("/d");
        config.storage_resolved.search_dir = PathBuf::from("/s");

        assert_eq!(
            config.storage_resolved.backend(),
            StorageBackend::Filesystem {
                deploy_dir: PathBuf::from("/d"),
                search_dir: PathBuf::from("/s"),
            }
        );

        config.storage_resolved.mongo_url = Some("mongodb://db".to_owned());
        assert_eq!(
            config.storage_resolved.backend(),
            StorageBackend::Mongo {
                url: "mongodb://db".to_owned(),
                search_dir: PathBuf::from("/s"),
            }
        );
    }

    #[test]
    fn test_empty_mongo_url_selects_filesystem() {
        let mut config: Config = toml::from_str("[storage]\nmongo_url = \"\"\n").unwrap();
        config.resolve_paths(Path::new("/project"));

        assert!(matches!(
            config.storage_resolved.backend(),
            StorageBackend::Filesystem { .. }
        ));
    }

    #[test]
    fn test_env_overrides_file_values() {
        let temp = TempDir::new().unwrap();
        let path = write_config(temp.path(), "[server]\nport = 8080\nbind_addr = \"127.0.0.1\"\n");
        let env = |name: &str| match name {
            "UDOCS_PORT" => Some("9000".to_owned()),
            "UDOCS_BIND_ADDR" => Some(String::new()),
            "UDOCS_ROUTES" => Some("a, b,,c".to_owned()),
            "UDOCS_MONGO_URL" => Some("mongodb://db".to_owned()),
            "UDOCS_QUIP_ACCESS_TOKEN" => Some("t0k3n".to_owned()),
            _ => None,
        };

        let config = Config::load_with(Some(&path), None, &env).unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.bind_addr, "127.0.0.1");
        assert_eq!(config.site.routes, vec!["a", "b", "c"]);
        assert_eq!(config.storage_resolved.mongo_url.as_deref(), Some("mongodb://db"));
        assert_eq!(config.quip_access_token(), Some("t0k3n"));
        assert_eq!(config.config_path, Some(path));
    }

    #[test]
    fn test_cli_settings_override_env() {
        let env = |name: &str| (name == "UDOCS_PORT").then(|| "9000".to_owned());
        let cli = CliSettings {
            port: Some(7000),
            root_route: Some("guide".to_owned()),
            ..Default::default()
        };

        let config = Config::load_with(None, Some(&cli), &env).unwrap();

        assert_eq!(config.server.port, 7000);
        assert_eq!(config.site.root_route, "guide");
        assert_eq!(config.server.bind_addr, "0.0.0.0");
    }

    #[test]
    fn test_invalid_env_port() {
        let env = |name: &str| (name == "UDOCS_PORT").then(|| "http".to_owned());

        let err = Config::load_with(None, None, &env).unwrap_err();
        assert!(err.to_string().contains("UDOCS_PORT"));
    }

    #[test]
    fn test_load_missing_explicit_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("missing.toml");

        let err = Config::load_with(Some(&path), None, &no_env).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(p) if p == path));
    }

    #[test]
    fn test_load_invalid_toml() {
        let temp = TempDir::new().unwrap();
        let path = write_config(temp.path(), "[server\n");

        let err = Config::load_with(Some(&path), None, &no_env).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_expands_env_vars() {
        let temp = TempDir::new().unwrap();
        let path = write_config(
            temp.path(),
            "[server]\nentry_point = \"https://${DOCS_HOST}\"\n\n[quip]\naccess_token = \"${QUIP_TOKEN:-fallback}\"\n",
        );
        let env = |name: &str| (name == "DOCS_HOST").then(|| "docs.example.com".to_owned());

        let config = Config::load_with(Some(&path), None, &env).unwrap();

        assert_eq!(config.server.entry_point, "https://docs.example.com");
        assert_eq!(config.quip_access_token(), Some("fallback"));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.server.port = 0;
        assert!(config.validate().unwrap_err().to_string().contains("server.port"));

        let mut config = Config::default_with_base(Path::new("/test"));
        config.server.bind_addr = String::new();
        assert!(config.validate().unwrap_err().to_string().contains("server.bind_addr"));

        let mut config = Config::default_with_base(Path::new("/test"));
        config.server.entry_point = "docs.example.com".to_owned();
        assert!(config.validate().unwrap_err().to_string().contains("server.entry_point"));

        let mut config = Config::default_with_base(Path::new("/test"));
        config.quip = Some(QuipConfig {
            access_token: String::new(),
        });
        assert!(config.validate().unwrap_err().to_string().contains("quip.access_token"));
    }

    #[test]
    fn test_discover_config_in_parent() {
        let temp = TempDir::new().unwrap();
        let nested = temp.path().join("a/b");
        std::fs::create_dir_all(&nested).unwrap();
        let path = write_config(temp.path(), "");

        assert_eq!(Config::discover_config(&nested), Some(path));
    }

    #[test]
    fn test_public_url() {
        let server = ServerConfig {
            entry_point: "https://docs.example.com/".to_owned(),
            ..ServerConfig::default()
        };
        assert_eq!(server.public_url(), "https://docs.example.com:9554");
    }

    #[test]
    fn test_env_lines() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.site.routes = vec!["a".to_owned(), "b".to_owned()];
        config.quip = Some(QuipConfig {
            access_token: "secret".to_owned(),
        });

        let lines = config.env_lines();

        assert_eq!(lines.len(), 11);
        assert_eq!(lines[0], "UDOCS_ENTRY_POINT=http://localhost");
        assert_eq!(lines[2], "UDOCS_PORT=9554");
        assert!(lines.contains(&"UDOCS_ROUTES=a,b".to_owned()));
        assert!(lines.contains(&"UDOCS_MONGO_URL=".to_owned()));
        assert!(lines.contains(&format!("UDOCS_QUIP_ACCESS_TOKEN={REDACTED}")));
        assert!(!lines.iter().any(|line| line.contains("secret")));
    }
}
