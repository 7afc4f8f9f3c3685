use anyhow::Result;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub voice: VoiceConfig,
    pub auth: AuthConfig,
    pub rate_limit: RateLimitConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub public_url: String,
    pub cors_origin: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub enabled: bool,
    pub url: String,
}

/// Upstream signaling service the voice proxy (C11) forwards to.
#[derive(Debug, Clone, Deserialize)]
pub struct VoiceConfig {
    pub signaling_url: String,
    pub request_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub token_ttl_days: u64,
    pub allow_registration: bool,
    /// Retained for a future signed service-to-service / voice-proxy header scheme;
    /// session tokens themselves stay opaque (§3 "Tokens are opaque").
    pub jwt_secret: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    pub messages_per_window: u32,
    pub window_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

impl AppConfig {
    /// Load configuration from `mango.toml`, with environment variable overrides
    /// (`MANGO__SERVER__PORT=9000`, double underscore separated).
    pub fn load() -> Result<Self> {
        let config_path =
            std::env::var("MANGO_CONFIG").unwrap_or_else(|_| "mango.toml".to_string());

        let builder = config::Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("server.public_url", "http://localhost:8080")?
            .set_default("server.cors_origin", "http://localhost:3000")?
            .set_default("database.max_connections", 10)?
            .set_default("redis.enabled", false)?
            .set_default("redis.url", "redis://127.0.0.1:6379")?
            .set_default("voice.request_timeout_ms", 5000)?
            .set_default("auth.token_ttl_days", 30)?
            .set_default("auth.allow_registration", true)?
            .set_default("rate_limit.messages_per_window", 30)?
            .set_default("rate_limit.window_ms", 10_000)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?;

        let builder = if Path::new(&config_path).exists() {
            builder.add_source(config::File::with_name(&config_path))
        } else {
            tracing::warn!("config file '{}' not found, using defaults", config_path);
            builder
        };

        let settings = builder
            .add_source(
                config::Environment::with_prefix("MANGO")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: AppConfig = settings.try_deserialize()?;
        Ok(config)
    }
}
