use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;
use crate::error::{AppError, Result};

const DEFAULT_ORIGINS: &str = "http://localhost:3000,http://127.0.0.1:3000";

#[derive(Clone, Debug)]
pub struct Config {
    pub server_addr: SocketAddr,
    pub database_url: String,
    pub cors_origins: Vec<String>,
    pub rate_limit_max_requests: usize,
    pub rate_limit_window: Duration,
    pub fetch_timeout: Duration,
    pub summarize_timeout: Duration,
    pub summary_language: String,
}

impl Config {
    pub fn load() -> Result<Self> {
        // Load environment variables from .env file if it exists
        dotenv::dotenv().ok();

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("PORT").unwrap_or_else(|_| "8000".to_string());
        let port = port.parse::<u16>().map_err(|e| AppError::Config(format!("Invalid port: {}", e)))?;
        let ip = IpAddr::from_str(&host).map_err(|e| AppError::Config(format!("Invalid host address: {}", e)))?;

        let database_url = env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite:summaries.db".to_string());

        let cors_origins = parse_origins(
            &env::var("CORS_ORIGINS").unwrap_or_else(|_| DEFAULT_ORIGINS.to_string()),
        );

        let rate_limit_max_requests = parse_var("RATE_LIMIT_MAX_REQUESTS", 15usize)?;
        let rate_limit_window = Duration::from_secs(parse_var("RATE_LIMIT_WINDOW_SECS", 60u64)?);
        let fetch_timeout = Duration::from_secs(parse_var("FETCH_TIMEOUT_SECS", 10u64)?);
        let summarize_timeout = Duration::from_secs(parse_var("SUMMARIZE_TIMEOUT_SECS", 90u64)?);

        if rate_limit_max_requests == 0 || rate_limit_window.is_zero() {
            return Err(AppError::Config("Rate limit settings must be positive".to_string()));
        }
        if summarize_timeout.is_zero() {
            return Err(AppError::Config("SUMMARIZE_TIMEOUT_SECS must be positive".to_string()));
        }

        let summary_language = env::var("SUMMARY_LANGUAGE").unwrap_or_else(|_| "english".to_string());

        Ok(Config {
            server_addr: SocketAddr::new(ip, port),
            database_url,
            cors_origins,
            rate_limit_max_requests,
            rate_limit_window,
            fetch_timeout,
            summarize_timeout,
            summary_language,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server_addr: SocketAddr::from(([127, 0, 0, 1], 8000)),
            database_url: "sqlite:summaries.db".to_string(),
            cors_origins: parse_origins(DEFAULT_ORIGINS),
            rate_limit_max_requests: 15,
            rate_limit_window: Duration::from_secs(60),
            fetch_timeout: Duration::from_secs(10),
            summarize_timeout: Duration::from_secs(90),
            summary_language: "english".to_string(),
        }
    }
}

fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| AppError::Config(format!("Invalid {}: {}", name, e))),
        Err(_) => Ok(default),
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(String::from)
        .collect()
}
