use std::env;

use poster_fusion_cli::FusionError;

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;
pub const DEFAULT_SESSION_TTL_MINUTES: i64 = 120;
pub const DEFAULT_MAX_SESSIONS: usize = 1000;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub client_url: String,
    pub bind_addr: String,
    pub max_upload_bytes: usize,
    pub session_ttl_minutes: i64,
    pub max_sessions: usize,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, FusionError> {
        let client_url = env::var("CLIENT_URL")
            .map_err(|_| FusionError::config("CLIENT_URL must be set"))?;
        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());
        let max_upload_bytes = parse_or("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?;
        let session_ttl_minutes = parse_or("SESSION_TTL_MINUTES", DEFAULT_SESSION_TTL_MINUTES)?;
        let max_sessions = parse_or("MAX_SESSIONS", DEFAULT_MAX_SESSIONS)?;

        Ok(ServerConfig {
            client_url,
            bind_addr,
            max_upload_bytes,
            session_ttl_minutes,
            max_sessions,
        })
    }
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> Result<T, FusionError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| FusionError::config(format!("invalid {key}: {raw}"))),
        Err(_) => Ok(default),
    }
}
