//! Client configuration: backend base URL policy, request deadline, token file.
//!
//! Values come from the environment (optionally seeded from `.env` by the
//! binaries via `dotenvy`) and are resolved once at startup.

use std::{env, fmt, path::PathBuf, str::FromStr, time::Duration};

use tracing::{info, warn};
use url::Url;

use crate::error::ApiError;

/// Relative root used when no backend URL is configured.
pub const DEFAULT_API_ROOT: &str = "/api";
/// Path suffix every absolute backend URL must end with.
pub const API_SUFFIX: &str = "/api";
pub const DEFAULT_ORIGIN: &str = "http://localhost:8000";
pub const DEFAULT_TOKEN_FILE: &str = ".backoffice_token";
pub const LOGIN_ROUTE: &str = "/admin/login";
/// Where the operator lands after signing in.
pub const HOME_ROUTE: &str = "/admin";
pub const DEFAULT_REDIRECT_DELAY: Duration = Duration::from_millis(300);

const DEV_TIMEOUT: Duration = Duration::from_secs(15);
// Cold-started backends can take close to a minute to wake up
const PROD_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn request_timeout(self) -> Duration {
        match self {
            Self::Development => DEV_TIMEOUT,
            Self::Production => PROD_TIMEOUT,
        }
    }
}

impl FromStr for Environment {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            other => Err(ApiError::config(format!("unknown environment '{}'", other))),
        }
    }
}

/// Where requests are sent, decided once from the configured backend URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BaseUrl {
    /// Same-origin path, joined to the hosting origin per request.
    Relative(String),
    Absolute(Url),
}

impl BaseUrl {
    /// Apply the base-URL policy.
    ///
    /// - empty or missing: [`DEFAULT_API_ROOT`]
    /// - relative: kept as-is
    /// - absolute: `http` upgraded to `https` when the origin is TLS, and the
    ///   [`API_SUFFIX`] appended when missing
    pub fn resolve(configured: Option<&str>, secure_origin: bool) -> Result<Self, ApiError> {
        let raw = configured.map(str::trim).unwrap_or_default();
        if raw.is_empty() {
            return Ok(Self::Relative(DEFAULT_API_ROOT.to_string()));
        }
        if !raw.contains("://") {
            return Ok(Self::Relative(raw.to_string()));
        }

        let mut url = Url::parse(raw)
            .map_err(|e| ApiError::config(format!("invalid backend URL '{}': {}", raw, e)))?;

        if secure_origin && url.scheme() == "http" {
            url.set_scheme("https")
                .map_err(|_| ApiError::config(format!("cannot upgrade '{}' to https", raw)))?;
        }

        let path = url.path().trim_end_matches('/').to_string();
        if !path.ends_with(API_SUFFIX) {
            url.set_path(&format!("{}{}", path, API_SUFFIX));
        }

        Ok(Self::Absolute(url))
    }

    /// Full URL for an API path such as `testimonials/` or `admin/clients/7/`.
    pub fn endpoint(&self, origin: &Url, path: &str) -> Result<Url, ApiError> {
        let path = path.trim_start_matches('/');
        let joined = match self {
            Self::Relative(root) => {
                let root = root.trim_end_matches('/');
                origin.join(&format!("{}/{}", root, path))
            }
            Self::Absolute(base) => {
                Url::parse(&format!("{}/{}", base.as_str().trim_end_matches('/'), path))
            }
        };
        joined.map_err(|e| ApiError::config(format!("invalid endpoint path '{}': {}", path, e)))
    }
}

impl fmt::Display for BaseUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Relative(root) => write!(f, "{}", root),
            Self::Absolute(url) => write!(f, "{}", url.as_str().trim_end_matches('/')),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Raw backend URL (`BACKOFFICE_BACKEND_URL`); resolved by [`BaseUrl::resolve`].
    pub backend_url: Option<String>,
    /// Origin the admin surface is served from; relative base URLs join onto it.
    pub origin: String,
    pub environment: Environment,
    pub timeout: Duration,
    pub token_file: PathBuf,
    pub login_route: String,
    pub redirect_delay: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            backend_url: None,
            origin: DEFAULT_ORIGIN.to_string(),
            environment: Environment::Production,
            timeout: Environment::Production.request_timeout(),
            token_file: PathBuf::from(DEFAULT_TOKEN_FILE),
            login_route: LOGIN_ROUTE.to_string(),
            redirect_delay: DEFAULT_REDIRECT_DELAY,
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, ApiError> {
        let environment = match var("BACKOFFICE_ENV") {
            Some(raw) => raw.parse()?,
            None => Environment::Production,
        };

        let timeout = match var("BACKOFFICE_TIMEOUT_SECS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|e| ApiError::config(format!("invalid BACKOFFICE_TIMEOUT_SECS: {}", e)))?,
            None => environment.request_timeout(),
        };

        let config = Self {
            backend_url: var("BACKOFFICE_BACKEND_URL"),
            origin: var("BACKOFFICE_ORIGIN").unwrap_or_else(|| DEFAULT_ORIGIN.to_string()),
            environment,
            timeout,
            token_file: var("BACKOFFICE_TOKEN_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_TOKEN_FILE)),
            ..Self::default()
        };

        if config.backend_url.is_none() {
            warn!("BACKOFFICE_BACKEND_URL not set, using relative root {}", DEFAULT_API_ROOT);
        }
        Ok(config)
    }

    pub fn origin_url(&self) -> Result<Url, ApiError> {
        Url::parse(&self.origin)
            .map_err(|e| ApiError::config(format!("invalid origin '{}': {}", self.origin, e)))
    }

    pub fn base_url(&self) -> Result<BaseUrl, ApiError> {
        let secure = self.origin_url()?.scheme() == "https";
        BaseUrl::resolve(self.backend_url.as_deref(), secure)
    }
}

fn var(key: &str) -> Option<String> {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => Some(value),
        _ => {
            info!("{key} not set, using default");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_backend_url_defaults_to_relative_root() {
        assert_eq!(
            BaseUrl::resolve(None, false).unwrap(),
            BaseUrl::Relative("/api".to_string())
        );
        assert_eq!(
            BaseUrl::resolve(Some("  "), true).unwrap(),
            BaseUrl::Relative("/api".to_string())
        );
    }

    #[test]
    fn test_relative_backend_url_is_used_as_is() {
        assert_eq!(
            BaseUrl::resolve(Some("/backend"), true).unwrap(),
            BaseUrl::Relative("/backend".to_string())
        );
    }

    #[test]
    fn test_absolute_url_gets_suffix_and_https_upgrade() {
        let base = BaseUrl::resolve(Some("http://example.com"), true).unwrap();
        assert_eq!(base.to_string(), "https://example.com/api");

        let base = BaseUrl::resolve(Some("http://example.com/api/"), false).unwrap();
        assert_eq!(base.to_string(), "http://example.com/api");

        let base = BaseUrl::resolve(Some("https://example.com/v2"), false).unwrap();
        assert_eq!(base.to_string(), "https://example.com/v2/api");
    }

    #[test]
    fn test_invalid_absolute_url_is_a_config_error() {
        let err = BaseUrl::resolve(Some("http://"), false).unwrap_err();
        assert!(matches!(err, ApiError::Config(_)));
    }

    #[test]
    fn test_endpoint_joins_relative_and_absolute() {
        let origin = Url::parse("http://localhost:3000/admin/testimonials").unwrap();

        let relative = BaseUrl::Relative("/api".to_string());
        assert_eq!(
            relative.endpoint(&origin, "testimonials/").unwrap().as_str(),
            "http://localhost:3000/api/testimonials/"
        );

        let absolute = BaseUrl::resolve(Some("https://api.example.com"), false).unwrap();
        assert_eq!(
            absolute.endpoint(&origin, "/admin/clients/7/").unwrap().as_str(),
            "https://api.example.com/api/admin/clients/7/"
        );
    }

    #[test]
    fn test_environment_timeouts() {
        assert_eq!(
            "dev".parse::<Environment>().unwrap().request_timeout(),
            Duration::from_secs(15)
        );
        assert_eq!(
            "production".parse::<Environment>().unwrap().request_timeout(),
            Duration::from_secs(60)
        );
        assert!("staging".parse::<Environment>().is_err());
    }
}
