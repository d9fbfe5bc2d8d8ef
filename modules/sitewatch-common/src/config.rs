use anyhow::{Context, Result};

/// Application configuration loaded from environment variables (and `.env`).
/// The Google credentials here are only defaults; values saved through the
/// settings API take precedence.
#[derive(Debug, Clone)]
pub struct AppConfig {
    // Database
    pub database_url: String,
    pub database_max_connections: u32,

    // Search provider defaults
    pub google_api_key: Option<String>,
    pub google_cx: Option<String>,

    // Web server
    pub api_host: String,
    pub api_port: u16,
    pub allowed_origins: Vec<String>,

    // Background crawling
    pub scheduler_enabled: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            database_url: std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            database_max_connections: std::env::var("DATABASE_MAX_CONNECTIONS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
            google_api_key: optional_env("GOOGLE_API_KEY"),
            google_cx: optional_env("GOOGLE_CX"),
            api_host: std::env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            api_port: std::env::var("API_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .context("API_PORT must be a number")?,
            allowed_origins: parse_list(&std::env::var("ALLOWED_ORIGINS").unwrap_or_default()),
            scheduler_enabled: parse_flag(std::env::var("SCHEDULER_ENABLED").ok().as_deref(), true),
        };

        config.log_keys();
        Ok(config)
    }

    fn log_keys(&self) {
        fn preview_opt(val: &Option<String>) -> String {
            match val {
                Some(v) if !v.is_empty() => {
                    let n = v.chars().take(5).map(char::len_utf8).sum();
                    format!("{}...({} chars)", &v[..n], v.len())
                }
                _ => "<not set>".to_string(),
            }
        }

        tracing::info!("Config loaded:");
        tracing::info!("  GOOGLE_API_KEY: {}", preview_opt(&self.google_api_key));
        tracing::info!("  GOOGLE_CX: {}", preview_opt(&self.google_cx));
        tracing::info!("  API: {}:{}", self.api_host, self.api_port);
        tracing::info!("  SCHEDULER_ENABLED: {}", self.scheduler_enabled);
    }
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_flag(raw: Option<&str>, default: bool) -> bool {
    match raw.map(|v| v.trim().to_ascii_lowercase()) {
        Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => true,
        Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => false,
        _ => default,
    }
}
