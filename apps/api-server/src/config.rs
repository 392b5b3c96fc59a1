//! Server configuration.

use std::{env, fmt, str::FromStr};

/// Default upload body limit (10 MiB).
pub const DEFAULT_UPLOAD_MAX_BYTES: usize = 10 * 1024 * 1024;

/// What happens to a user's conversation membership when they leave an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LeavePolicy {
    /// Stay in the event conversation and keep reading its history.
    #[default]
    Keep,
    /// Drop out of the event conversation too.
    Remove,
}

impl LeavePolicy {
    /// Returns true if leaving an event also leaves its conversation.
    pub fn leaves_conversation(&self) -> bool {
        matches!(self, Self::Remove)
    }
}

impl FromStr for LeavePolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "keep" => Ok(Self::Keep),
            "remove" => Ok(Self::Remove),
            other => anyhow::bail!("invalid conversation leave policy '{other}' (keep|remove)"),
        }
    }
}

/// Cloudinary credentials for image uploads.
#[derive(Clone)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
}

impl fmt::Debug for CloudinaryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CloudinaryConfig")
            .field("cloud_name", &self.cloud_name)
            .field("api_key", &self.api_key)
            .finish_non_exhaustive()
    }
}

/// Server configuration loaded from environment variables.
#[derive(Clone)]
pub struct Config {
    /// Server host address.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// SQLite database URL. The in-memory store is used when unset.
    pub database_url: Option<String>,
    /// Maximum size of the database connection pool.
    pub db_max_connections: u32,
    /// JWT signing secret.
    pub jwt_secret: String,
    /// JWT expiration in hours.
    pub jwt_expiration_hours: u64,
    /// Conversation membership on event leave.
    pub leave_policy: LeavePolicy,
    /// Foursquare places API key.
    pub foursquare_api_key: Option<String>,
    /// Cloudinary credentials.
    pub cloudinary: Option<CloudinaryConfig>,
    /// Maximum accepted upload body size in bytes.
    pub upload_max_bytes: usize,
    /// Log level.
    pub log_level: String,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database_url", &self.database_url)
            .field("db_max_connections", &self.db_max_connections)
            .field("jwt_expiration_hours", &self.jwt_expiration_hours)
            .field("leave_policy", &self.leave_policy)
            .field("places_configured", &self.foursquare_api_key.is_some())
            .field("cloudinary", &self.cloudinary)
            .field("upload_max_bytes", &self.upload_max_bytes)
            .field("log_level", &self.log_level)
            .finish_non_exhaustive()
    }
}

impl Config {
    /// Creates a configuration with defaults and the given JWT secret.
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            database_url: None,
            db_max_connections: 5,
            jwt_secret: jwt_secret.into(),
            jwt_expiration_hours: auth::DEFAULT_JWT_EXPIRATION_HOURS,
            leave_policy: LeavePolicy::default(),
            foursquare_api_key: None,
            cloudinary: None,
            upload_max_bytes: DEFAULT_UPLOAD_MAX_BYTES,
            log_level: "info".to_string(),
        }
    }

    /// Loads configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let jwt_secret = var("SORTIE_JWT_SECRET")
            .or_else(|| var("JWT_SECRET"))
            .ok_or_else(|| anyhow::anyhow!("SORTIE_JWT_SECRET is required"))?;

        let mut config = Self::new(jwt_secret);

        if let Some(host) = var("SORTIE_SERVER_HOST") {
            config.host = host;
        }
        if let Some(port) = var("SORTIE_SERVER_PORT").or_else(|| var("PORT")) {
            config.port = port
                .parse()
                .map_err(|_| anyhow::anyhow!("invalid server port '{port}'"))?;
        }
        config.database_url = var("DATABASE_URL");
        config.db_max_connections = var("SORTIE_DB_MAX_CONNECTIONS")
            .and_then(|v| v.parse().ok())
            .unwrap_or(config.db_max_connections);
        config.jwt_expiration_hours = var("SORTIE_JWT_EXPIRATION_HOURS")
            .and_then(|v| v.parse().ok())
            .unwrap_or(config.jwt_expiration_hours);
        if let Some(policy) = var("SORTIE_CONVERSATION_LEAVE_POLICY") {
            config.leave_policy = policy.parse()?;
        }
        config.foursquare_api_key = var("FOURSQUARE_API_KEY");
        config.cloudinary = match (
            var("CLOUDINARY_CLOUD_NAME"),
            var("CLOUDINARY_API_KEY"),
            var("CLOUDINARY_API_SECRET"),
        ) {
            (Some(cloud_name), Some(api_key), Some(api_secret)) => Some(CloudinaryConfig {
                cloud_name,
                api_key,
                api_secret,
            }),
            _ => None,
        };
        config.upload_max_bytes = var("SORTIE_UPLOAD_MAX_BYTES")
            .and_then(|v| v.parse().ok())
            .unwrap_or(config.upload_max_bytes);
        if let Some(level) = var("SORTIE_LOG_LEVEL") {
            config.log_level = level;
        }

        Ok(config)
    }

    /// Returns the server address.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
