use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use medgate_application::{DEFAULT_ACCESS_REQUEST_GRANT_MINUTES, DEFAULT_MAX_TEMP_CODE_MINUTES};
use medgate_core::AppError;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub migrate_only: bool,
    pub database_url: String,
    pub frontend_url: String,
    pub bootstrap_token: String,
    pub _session_secret: String,
    pub api_host: String,
    pub api_port: u16,
    pub cookie_secure: bool,
    pub redis_url: Option<String>,
    pub access_request_grant_minutes: u32,
    pub temp_code_max_duration_minutes: u32,
}

impl ApiConfig {
    pub fn load() -> Result<Self, AppError> {
        let migrate_only = env::args().nth(1).as_deref() == Some("migrate");

        let database_url = required_env("DATABASE_URL")?;
        let frontend_url =
            env::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:3000".to_owned());
        let bootstrap_token = required_env("AUTH_BOOTSTRAP_TOKEN")?;
        let session_secret = required_env("SESSION_SECRET")?;
        if session_secret.len() < 32 {
            return Err(AppError::Validation(
                "SESSION_SECRET must be at least 32 characters".to_owned(),
            ));
        }

        let api_host = env::var("API_HOST").unwrap_or_else(|_| "127.0.0.1".to_owned());
        let api_port = env::var("API_PORT")
            .ok()
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(3001);

        let cookie_secure = env::var("SESSION_COOKIE_SECURE")
            .unwrap_or_else(|_| "false".to_owned())
            .eq_ignore_ascii_case("true");

        let redis_url = env::var("REDIS_URL")
            .ok()
            .filter(|value| !value.trim().is_empty());

        let access_request_grant_minutes = positive_minutes_env(
            "ACCESS_REQUEST_GRANT_MINUTES",
            DEFAULT_ACCESS_REQUEST_GRANT_MINUTES,
        )?;
        let temp_code_max_duration_minutes = positive_minutes_env(
            "TEMP_CODE_MAX_DURATION_MINUTES",
            DEFAULT_MAX_TEMP_CODE_MINUTES,
        )?;

        Ok(Self {
            migrate_only,
            database_url,
            frontend_url,
            bootstrap_token,
            _session_secret: session_secret,
            api_host,
            api_port,
            cookie_secure,
            redis_url,
            access_request_grant_minutes,
            temp_code_max_duration_minutes,
        })
    }

    pub fn socket_address(&self) -> Result<SocketAddr, AppError> {
        let host = IpAddr::from_str(&self.api_host).map_err(|error| {
            AppError::Internal(format!("invalid API_HOST '{}': {error}", self.api_host))
        })?;
        Ok(SocketAddr::from((host, self.api_port)))
    }
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn required_env(name: &str) -> Result<String, AppError> {
    env::var(name).map_err(|_| AppError::Validation(format!("{name} is required")))
}

fn positive_minutes_env(name: &str, default: u32) -> Result<u32, AppError> {
    match env::var(name) {
        Ok(value) => parse_positive_minutes(name, value.as_str()),
        Err(_) => Ok(default),
    }
}

fn parse_positive_minutes(name: &str, value: &str) -> Result<u32, AppError> {
    match value.trim().parse::<u32>() {
        Ok(minutes) if minutes > 0 => Ok(minutes),
        Ok(_) => Err(AppError::Validation(format!(
            "{name} must be greater than zero"
        ))),
        Err(error) => Err(AppError::Validation(format!("invalid {name}: {error}"))),
    }
}
