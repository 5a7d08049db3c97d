/// Process configuration, read once at startup
use std::path::PathBuf;

use crate::security::SecretKey;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub mongodb_uri: String,
    pub database_name: String,
    /// Key for download link MACs
    pub signing_secret: SecretKey,
    /// Key for fulfillment callback MACs
    pub webhook_secret: SecretKey,
    pub link_ttl_secs: u64,
    /// Prefixed to issued links, e.g. "https://shop.example"
    pub public_base_url: Option<String>,
    pub asset_root: PathBuf,
    pub cors_origins: Vec<String>,
}

impl Config {
    /// Load from the process environment (call `dotenv` first)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let port = match get("SERVER_PORT") {
            Some(raw) => raw.trim().parse::<u16>().map_err(|e| ConfigError::Invalid {
                name: "SERVER_PORT",
                reason: e.to_string(),
            })?,
            None => 8080,
        };

        let link_ttl_secs = match get("DOWNLOAD_LINK_TTL_SECS") {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(0) => {
                    return Err(ConfigError::Invalid {
                        name: "DOWNLOAD_LINK_TTL_SECS",
                        reason: "must be positive".to_string(),
                    })
                }
                Ok(ttl) => ttl,
                Err(e) => {
                    return Err(ConfigError::Invalid {
                        name: "DOWNLOAD_LINK_TTL_SECS",
                        reason: e.to_string(),
                    })
                }
            },
            None => 900,
        };

        let public_base_url = match get("PUBLIC_BASE_URL") {
            Some(raw) => {
                let parsed = url::Url::parse(raw.trim()).map_err(|e| ConfigError::Invalid {
                    name: "PUBLIC_BASE_URL",
                    reason: e.to_string(),
                })?;
                if !matches!(parsed.scheme(), "http" | "https") {
                    return Err(ConfigError::Invalid {
                        name: "PUBLIC_BASE_URL",
                        reason: format!("unsupported scheme {}", parsed.scheme()),
                    });
                }
                Some(raw.trim().trim_end_matches('/').to_string())
            }
            None => None,
        };

        let cors_origins = get("CORS_ALLOWED_ORIGINS")
            .unwrap_or_else(|| "http://localhost:5173".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Self {
            host: get("SERVER_HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port,
            mongodb_uri: get("MONGODB_URI")
                .unwrap_or_else(|| "mongodb://localhost:27017".to_string()),
            database_name: get("DATABASE_NAME").unwrap_or_else(|| "storefront".to_string()),
            signing_secret: secret(&get, "DOWNLOAD_SIGNING_SECRET")?,
            webhook_secret: secret(&get, "FULFILLMENT_WEBHOOK_SECRET")?,
            link_ttl_secs,
            public_base_url,
            asset_root: PathBuf::from(
                get("ASSET_ROOT").unwrap_or_else(|| "/app/assets".to_string()),
            ),
            cors_origins,
        })
    }
}

fn secret<F>(get: &F, name: &'static str) -> Result<SecretKey, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let value = get(name).ok_or(ConfigError::Missing(name))?;
    SecretKey::new(value.into_bytes()).map_err(|_| ConfigError::Missing(name))
}
