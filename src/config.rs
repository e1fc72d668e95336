//! TOML configuration.
//!
//! One file drives every command: where the SQLite store lives, how to
//! reach the Numista API, and how the import loop behaves. Secrets may be
//! left out of the file and supplied through the environment instead.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable consulted when `numista.api_key` is not set.
pub const API_KEY_ENV: &str = "NUMISTA_API_KEY";
/// Environment variable consulted when `numista.client_secret` is not set.
pub const CLIENT_SECRET_ENV: &str = "NUMISTA_CLIENT_SECRET";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub numista: NumistaConfig,
    #[serde(default)]
    pub import: ImportConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct NumistaConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Authorization page; `{language}` is replaced with the resolved locale.
    #[serde(default = "default_authorize_url")]
    pub authorize_url: String,
    #[serde(default = "default_client_id")]
    pub client_id: String,
    #[serde(default = "default_scope")]
    pub scope: String,
    #[serde(default = "default_redirect_uri")]
    pub redirect_uri: String,
    #[serde(default = "default_fallback_locale")]
    pub locale: String,
    #[serde(default = "default_supported_locales")]
    pub supported_locales: Vec<String>,
    #[serde(default = "default_fallback_locale")]
    pub fallback_locale: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_image_timeout_secs")]
    pub image_timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Items per list page. `0` fetches the whole collection in one call.
    #[serde(default)]
    pub page_size: u32,
    #[serde(default)]
    pub auth: AuthConfig,
}

impl Default for NumistaConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            authorize_url: default_authorize_url(),
            client_id: default_client_id(),
            scope: default_scope(),
            redirect_uri: default_redirect_uri(),
            locale: default_fallback_locale(),
            supported_locales: default_supported_locales(),
            fallback_locale: default_fallback_locale(),
            api_key: None,
            client_secret: None,
            request_timeout_secs: default_request_timeout_secs(),
            image_timeout_secs: default_image_timeout_secs(),
            user_agent: default_user_agent(),
            page_size: 0,
            auth: AuthConfig::default(),
        }
    }
}

fn default_api_base() -> String {
    "https://api.numista.com/api/v2".to_string()
}
fn default_authorize_url() -> String {
    "https://{language}.numista.com/api/oauth_authorize.php".to_string()
}
fn default_client_id() -> String {
    "opennumismat".to_string()
}
fn default_scope() -> String {
    "view_collection".to_string()
}
fn default_redirect_uri() -> String {
    "local".to_string()
}
fn default_supported_locales() -> Vec<String> {
    vec!["en".to_string(), "fr".to_string()]
}
fn default_fallback_locale() -> String {
    "en".to_string()
}
fn default_request_timeout_secs() -> u64 {
    10
}
fn default_image_timeout_secs() -> u64 {
    30
}
fn default_user_agent() -> String {
    format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}

/// Settings for the interactive authorization page.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct AuthConfig {
    /// Accept TLS certificate errors while the authorization page loads.
    ///
    /// Never applies to the token or data endpoints.
    #[serde(default)]
    pub accept_invalid_certs: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ImportConfig {
    /// Maximum number of items whose detail and images are fetched at once.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_fetch_images")]
    pub fetch_images: bool,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            fetch_images: default_fetch_images(),
        }
    }
}

fn default_concurrency() -> usize {
    1
}
fn default_fetch_images() -> bool {
    true
}

impl NumistaConfig {
    /// Pick the API language for `locale`, falling back for unsupported ones.
    pub fn language(&self) -> &str {
        resolve_language(&self.locale, &self.supported_locales, &self.fallback_locale)
    }

    /// API key from the config file, else from [`API_KEY_ENV`].
    pub fn resolve_api_key(&self) -> Result<String> {
        if let Some(key) = self.api_key.as_deref().filter(|k| !k.is_empty()) {
            return Ok(key.to_string());
        }
        std::env::var(API_KEY_ENV).with_context(|| {
            format!(
                "numista.api_key is not set and {} environment variable is missing",
                API_KEY_ENV
            )
        })
    }

    /// OAuth client secret; defaults to the API key when not given separately.
    pub fn resolve_client_secret(&self) -> Result<String> {
        if let Some(secret) = self.client_secret.as_deref().filter(|s| !s.is_empty()) {
            return Ok(secret.to_string());
        }
        match std::env::var(CLIENT_SECRET_ENV) {
            Ok(secret) if !secret.is_empty() => Ok(secret),
            _ => self.resolve_api_key(),
        }
    }
}

/// Match `locale` against the supported list, case-insensitively.
///
/// Region suffixes are ignored, so `fr_CA` and `fr-BE` resolve to `fr`.
pub fn resolve_language<'a>(locale: &str, supported: &'a [String], fallback: &'a str) -> &'a str {
    let primary = locale
        .split(['_', '-'])
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();
    supported
        .iter()
        .find(|s| s.eq_ignore_ascii_case(&primary))
        .map(|s| s.as_str())
        .unwrap_or(fallback)
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

pub fn validate(config: &Config) -> Result<()> {
    let numista = &config.numista;

    if reqwest::Url::parse(&numista.api_base).is_err() {
        bail!("numista.api_base is not a valid URL: '{}'", numista.api_base);
    }
    if !numista.authorize_url.contains("{language}") {
        bail!("numista.authorize_url must contain a {{language}} placeholder");
    }
    if numista.client_id.is_empty() {
        bail!("numista.client_id must not be empty");
    }
    if numista.redirect_uri.is_empty() {
        bail!("numista.redirect_uri must not be empty");
    }
    if numista.request_timeout_secs == 0 || numista.image_timeout_secs == 0 {
        bail!("numista timeouts must be > 0");
    }
    if !numista
        .supported_locales
        .iter()
        .any(|l| l.eq_ignore_ascii_case(&numista.fallback_locale))
    {
        bail!(
            "numista.fallback_locale '{}' is not in supported_locales",
            numista.fallback_locale
        );
    }

    if config.import.concurrency == 0 {
        bail!("import.concurrency must be >= 1");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &str) -> Config {
        let content = format!("[db]\npath = \"/tmp/coins.sqlite\"\n{}", extra);
        toml::from_str(&content).unwrap()
    }

    #[test]
    fn defaults_match_reference_endpoints() {
        let cfg = parse("");
        assert_eq!(cfg.numista.api_base, "https://api.numista.com/api/v2");
        assert_eq!(cfg.numista.client_id, "opennumismat");
        assert_eq!(cfg.numista.scope, "view_collection");
        assert_eq!(cfg.numista.redirect_uri, "local");
        assert_eq!(cfg.numista.request_timeout_secs, 10);
        assert_eq!(cfg.numista.image_timeout_secs, 30);
        assert_eq!(cfg.numista.page_size, 0);
        assert!(!cfg.numista.auth.accept_invalid_certs);
        assert_eq!(cfg.import.concurrency, 1);
        assert!(cfg.import.fetch_images);
        assert!(validate(&cfg).is_ok());
    }

    #[test]
    fn unsupported_locale_falls_back() {
        let supported = default_supported_locales();
        assert_eq!(resolve_language("fr", &supported, "en"), "fr");
        assert_eq!(resolve_language("fr_CA", &supported, "en"), "fr");
        assert_eq!(resolve_language("FR", &supported, "en"), "fr");
        assert_eq!(resolve_language("de", &supported, "en"), "en");
        assert_eq!(resolve_language("", &supported, "en"), "en");
    }

    #[test]
    fn locale_is_read_from_numista_section() {
        let cfg = parse("[numista]\nlocale = \"ru\"\nsupported_locales = [\"en\", \"fr\", \"ru\"]\n");
        assert_eq!(cfg.numista.language(), "ru");
    }

    #[test]
    fn zero_concurrency_rejected() {
        let cfg = parse("[import]\nconcurrency = 0\n");
        assert!(validate(&cfg).is_err());
    }

    #[test]
    fn authorize_url_needs_language_placeholder() {
        let cfg = parse("[numista]\nauthorize_url = \"https://numista.com/api/oauth_authorize.php\"\n");
        assert!(validate(&cfg).is_err());
    }

    #[test]
    fn fallback_must_be_supported() {
        let cfg = parse("[numista]\nfallback_locale = \"de\"\n");
        assert!(validate(&cfg).is_err());
    }

    #[test]
    fn api_key_from_config_wins() {
        let cfg = parse("[numista]\napi_key = \"k\"\n");
        assert_eq!(cfg.numista.resolve_api_key().unwrap(), "k");
        assert_eq!(cfg.numista.resolve_client_secret().unwrap(), "k");
    }

    #[test]
    fn explicit_client_secret_is_used() {
        let cfg = parse("[numista]\napi_key = \"k\"\nclient_secret = \"s\"\n");
        assert_eq!(cfg.numista.resolve_client_secret().unwrap(), "s");
    }
}
