use crate::application_port::TokenConfig;
use anyhow::{Result, anyhow, bail};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub auth: Auth,
    pub cookie: Cookie,
    pub http: Http,
    pub log: Log,
    pub media: Media,
    pub user: User,
}

#[derive(Deserialize)]
pub struct Auth {
    pub issuer: String,
    pub access_token_secret: String,
    pub access_token_ttl_secs: u64,
    pub refresh_token_secret: String,
    pub refresh_token_ttl_secs: u64,
    #[serde(default)]
    pub leeway_secs: u64,
}

// Secrets stay out of the startup log line.
impl std::fmt::Debug for Auth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Auth")
            .field("issuer", &self.issuer)
            .field("access_token_ttl_secs", &self.access_token_ttl_secs)
            .field("refresh_token_ttl_secs", &self.refresh_token_ttl_secs)
            .field("leeway_secs", &self.leeway_secs)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
pub struct Cookie {
    pub secure: bool,
    pub same_site: String, // "Strict", "Lax" or "None"
}

#[derive(Debug, Deserialize)]
pub struct Http {
    pub address: String,
    pub cert_path: Option<String>,
    pub key_path: Option<String>,
    pub cors_origin: String,
    pub upload_limit_bytes: u64,
}

#[derive(Debug, Deserialize)]
pub struct Log {
    pub filter: String,
}

#[derive(Debug, Deserialize)]
pub struct Media {
    pub backend: String, // "fake" or "local"
    pub root: String,
    pub public_base_url: String,
}

#[derive(Deserialize)]
pub struct User {
    pub backend: String, // "memory" or "mysql"
    pub dsn: Option<String>,
}

// The DSN carries the database password.
impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("backend", &self.backend)
            .field("dsn", &self.dsn.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl Auth {
    pub fn token_config(&self) -> Result<TokenConfig> {
        if self.access_token_secret.is_empty() || self.refresh_token_secret.is_empty() {
            bail!("auth.access_token_secret and auth.refresh_token_secret must be set");
        }
        if self.access_token_ttl_secs == 0 || self.refresh_token_ttl_secs == 0 {
            bail!("token lifetimes must be positive");
        }
        Ok(TokenConfig {
            issuer: self.issuer.clone(),
            access_secret: self.access_token_secret.clone().into_bytes(),
            access_ttl: Duration::from_secs(self.access_token_ttl_secs),
            refresh_secret: self.refresh_token_secret.clone().into_bytes(),
            refresh_ttl: Duration::from_secs(self.refresh_token_ttl_secs),
            leeway: Duration::from_secs(self.leeway_secs),
        })
    }
}

#[cfg(debug_assertions)]
const SETTINGS_PATH: &str = "settings/dev.toml";
#[cfg(not(debug_assertions))]
const SETTINGS_PATH: &str = "settings/release.toml";

/// Environment variables override the file, e.g.
/// `VIDTUBE__AUTH__ACCESS_TOKEN_SECRET=...`.
const ENV_PREFIX: &str = "VIDTUBE";

pub fn parse_settings(path: Option<&str>) -> Result<Settings> {
    let path = path.unwrap_or(SETTINGS_PATH);

    let settings: Settings = Config::builder()
        .add_source(File::with_name(path))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .map_err(|e| anyhow!(e))?
        .try_deserialize()
        .map_err(|e| anyhow!(e))?;

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auth() -> Auth {
        Auth {
            issuer: "vidtube".to_string(),
            access_token_secret: "a".to_string(),
            access_token_ttl_secs: 900,
            refresh_token_secret: "r".to_string(),
            refresh_token_ttl_secs: 864000,
            leeway_secs: 0,
        }
    }

    #[test]
    fn token_config_carries_ttls_and_secrets() {
        let cfg = auth().token_config().unwrap();
        assert_eq!(cfg.access_ttl, Duration::from_secs(900));
        assert_eq!(cfg.refresh_ttl, Duration::from_secs(864000));
        assert_eq!(cfg.access_secret, b"a");
        assert_eq!(cfg.refresh_secret, b"r");
    }

    #[test]
    fn empty_secret_is_refused() {
        let mut a = auth();
        a.refresh_token_secret.clear();
        assert!(a.token_config().is_err());
    }

    #[test]
    fn debug_output_omits_secrets() {
        let rendered = format!("{:?}", auth());
        assert!(!rendered.contains("access_token_secret"));
        assert!(!rendered.contains("refresh_token_secret"));
    }

    #[test]
    fn dev_settings_parse() {
        let settings = parse_settings(Some("settings/dev.toml")).unwrap();
        assert_eq!(settings.user.backend, "memory");
        assert!(settings.auth.token_config().is_ok());
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(parse_settings(Some("settings/does-not-exist.toml")).is_err());
    }
}
