use crate::errors::{AppError, AppResult};
use crate::timestamps::display_offset;
use chrono::FixedOffset;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_REFRESH_SECS: u64 = 60;
const MAX_DISPLAY_OFFSET_MINUTES: u32 = 24 * 60;

#[derive(Debug, Clone)]
pub struct AppSettings {
    pub endpoint: String,
    pub refresh_interval: Duration,
    pub export_dir: PathBuf,
    pub data_dir: PathBuf,
    pub http_timeout: Option<Duration>,
    pub display_offset_minutes: i32,
    pub log_level: String,
}

impl AppSettings {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            refresh_interval: Duration::from_secs(DEFAULT_REFRESH_SECS),
            export_dir: PathBuf::from("exports"),
            data_dir: PathBuf::from(".dashboard"),
            http_timeout: None,
            display_offset_minutes: 0,
            log_level: "info".to_string(),
        }
    }

    /// Loads settings from the environment, reading a `.env` file first if present.
    pub fn from_env() -> AppResult<Self> {
        let _ = dotenvy::dotenv();

        let endpoint = get_var("DASHBOARD_ENDPOINT")?;
        validate_endpoint(&endpoint)?;

        let refresh_secs: u64 = parse_var("DASHBOARD_REFRESH_SECS", DEFAULT_REFRESH_SECS)?;
        if refresh_secs == 0 {
            return Err(AppError::Config(
                "DASHBOARD_REFRESH_SECS must be greater than zero".to_string(),
            ));
        }

        let http_timeout = match env::var("DASHBOARD_HTTP_TIMEOUT_SECS").ok() {
            Some(raw) => Some(Duration::from_secs(raw.trim().parse().map_err(|e| {
                AppError::Config(format!("invalid DASHBOARD_HTTP_TIMEOUT_SECS: {e}"))
            })?)),
            None => None,
        };

        let display_offset_minutes: i32 = parse_var("DASHBOARD_DISPLAY_OFFSET_MINUTES", 0)?;
        if display_offset_minutes.unsigned_abs() >= MAX_DISPLAY_OFFSET_MINUTES {
            return Err(AppError::Config(format!(
                "DASHBOARD_DISPLAY_OFFSET_MINUTES must be within ±{}",
                MAX_DISPLAY_OFFSET_MINUTES - 1
            )));
        }

        Ok(Self {
            endpoint,
            refresh_interval: Duration::from_secs(refresh_secs),
            export_dir: PathBuf::from(get_var_or("DASHBOARD_EXPORT_DIR", "exports")),
            data_dir: PathBuf::from(get_var_or("DASHBOARD_DATA_DIR", ".dashboard")),
            http_timeout,
            display_offset_minutes,
            log_level: get_var_or("LOG_LEVEL", "info"),
        })
    }

    pub fn display_offset(&self) -> FixedOffset {
        display_offset(self.display_offset_minutes)
    }
}

fn validate_endpoint(endpoint: &str) -> AppResult<()> {
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        Ok(())
    } else {
        Err(AppError::Config(format!(
            "DASHBOARD_ENDPOINT must be an http(s) URL, got '{}'",
            endpoint
        )))
    }
}

fn get_var(key: &str) -> AppResult<String> {
    env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| AppError::Config(format!("{key} is required but not set")))
}

fn get_var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_owned())
}

fn parse_var<T>(key: &str, default: T) -> AppResult<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| AppError::Config(format!("invalid {key}: {e}"))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::AppSettings;
    use std::env;
    use std::sync::Mutex;
    use std::time::Duration;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const KEYS: [&str; 5] = [
        "DASHBOARD_ENDPOINT",
        "DASHBOARD_REFRESH_SECS",
        "DASHBOARD_HTTP_TIMEOUT_SECS",
        "DASHBOARD_DISPLAY_OFFSET_MINUTES",
        "DASHBOARD_EXPORT_DIR",
    ];

    fn clear_env() {
        for key in KEYS {
            env::remove_var(key);
        }
    }

    #[test]
    fn settings_from_env_apply_defaults() {
        let _guard = ENV_LOCK.lock().expect("env lock poisoned");
        clear_env();
        env::set_var("DASHBOARD_ENDPOINT", "https://hooks.example.com/dashboard");

        let settings = AppSettings::from_env().expect("should parse settings");
        assert_eq!(settings.endpoint, "https://hooks.example.com/dashboard");
        assert_eq!(settings.refresh_interval, Duration::from_secs(60));
        assert_eq!(settings.http_timeout, None);
        assert_eq!(settings.display_offset_minutes, 0);

        clear_env();
    }

    #[test]
    fn settings_from_env_require_endpoint() {
        let _guard = ENV_LOCK.lock().expect("env lock poisoned");
        clear_env();
        let err = AppSettings::from_env().expect_err("missing endpoint");
        assert!(err.to_string().contains("DASHBOARD_ENDPOINT"));
    }

    #[test]
    fn settings_from_env_reject_bad_values() {
        let _guard = ENV_LOCK.lock().expect("env lock poisoned");
        clear_env();
        env::set_var("DASHBOARD_ENDPOINT", "ftp://nope");
        assert!(AppSettings::from_env().is_err());

        env::set_var("DASHBOARD_ENDPOINT", "http://localhost:5678/webhook");
        env::set_var("DASHBOARD_REFRESH_SECS", "0");
        assert!(AppSettings::from_env().is_err());

        env::set_var("DASHBOARD_REFRESH_SECS", "15");
        env::set_var("DASHBOARD_HTTP_TIMEOUT_SECS", "soon");
        assert!(AppSettings::from_env().is_err());

        env::remove_var("DASHBOARD_HTTP_TIMEOUT_SECS");
        env::set_var("DASHBOARD_DISPLAY_OFFSET_MINUTES", "-300");
        let settings = AppSettings::from_env().expect("valid settings");
        assert_eq!(settings.refresh_interval, Duration::from_secs(15));
        assert_eq!(settings.display_offset().local_minus_utc(), -300 * 60);

        env::set_var("DASHBOARD_DISPLAY_OFFSET_MINUTES", "-2147483648");
        let err = AppSettings::from_env().expect_err("offset out of range");
        assert!(err.to_string().contains("DASHBOARD_DISPLAY_OFFSET_MINUTES"));

        env::set_var("DASHBOARD_DISPLAY_OFFSET_MINUTES", "1440");
        assert!(AppSettings::from_env().is_err());

        clear_env();
    }
}
