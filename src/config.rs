use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::env;
use config;

pub const DEFAULT_POSTS_PER_PAGE: u32 = 10;
pub const DEFAULT_HOME_CACHE_SECONDS: u64 = 20;

#[derive(Debug, Deserialize, Clone)]
pub struct WebConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub web: WebConfig,
    // Populated from the .env file
    pub database_path: String,
    pub media_path: String,
    pub allowed_origins: String,
    pub log_level: String,
    pub session_secret_key: String,
    pub use_secure_cookies: bool,
    pub posts_per_page: u32,
    pub home_cache_seconds: u64,
}

fn required_var(name: &str) -> Result<String, config::ConfigError> {
    env::var(name).map_err(|_| config::ConfigError::Message(format!(
        "FATAL: Environment variable '{}' is not set in your .env file.", name
    )))
}

/// Optional settings fall back to `default` only when unset or blank; a value
/// that is present but does not parse is a configuration error.
fn parse_setting<T: std::str::FromStr>(name: &str, raw: Option<String>, default: T) -> Result<T, config::ConfigError> {
    match raw.as_deref().map(str::trim).filter(|value| !value.is_empty()) {
        None => Ok(default),
        Some(value) => value.parse::<T>().map_err(|_| config::ConfigError::Message(format!(
            "FATAL: '{}' in your .env file has an invalid value ('{}').", name, value
        ))),
    }
}

fn optional_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T, config::ConfigError> {
    parse_setting(name, env::var(name).ok(), default)
}

impl Config {
    pub fn from_env(env_path: &Path) -> Result<Self, config::ConfigError> {
        dotenvy::from_path(env_path)
            .map_err(|e| config::ConfigError::Message(format!(
                "FATAL: Failed to load .env file from '{}'. Error: {}", env_path.display(), e
            )))?;

        let database_path = required_var("DATABASE_PATH")?;
        let media_path = required_var("MEDIA_PATH")?;
        let session_secret_key = required_var("SESSION_SECRET_KEY")?;

        // 128 hex characters, i.e. the 64 bytes actix-session needs for a signing key.
        if session_secret_key.len() != 128 || !session_secret_key.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(config::ConfigError::Message(
                "FATAL: 'SESSION_SECRET_KEY' must be 128 hexadecimal characters long (64 bytes). Run 'setup_cli key generate'.".to_string()
            ));
        }

        let allowed_origins = env::var("ALLOWED_ORIGINS").unwrap_or_else(|_| "".to_string());
        let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
        let use_secure_cookies = optional_var("USE_SECURE_COOKIES", false)?;

        let posts_per_page = optional_var("POSTS_PER_PAGE", DEFAULT_POSTS_PER_PAGE)?;
        if posts_per_page == 0 {
            return Err(config::ConfigError::Message(
                "FATAL: 'POSTS_PER_PAGE' must be a positive whole number.".to_string()
            ));
        }
        let home_cache_seconds = optional_var("HOME_CACHE_SECONDS", DEFAULT_HOME_CACHE_SECONDS)?;

        if Path::new(&database_path).is_relative() {
            return Err(config::ConfigError::Message(format!(
                "FATAL: The 'DATABASE_PATH' in your .env file is a relative path ('{}'). It MUST be an absolute path.",
                database_path
            )));
        }

        if Path::new(&media_path).is_relative() {
            return Err(config::ConfigError::Message(format!(
                "FATAL: The 'MEDIA_PATH' in your .env file is a relative path ('{}'). It MUST be an absolute path.",
                media_path
            )));
        }

        let builder = config::Config::builder()
            // Base settings (web host/port) come from the TOML file.
            .add_source(config::File::new("config/default.toml", config::FileFormat::Toml))
            .set_override("database_path", database_path)?
            .set_override("media_path", media_path)?
            .set_override("session_secret_key", session_secret_key)?
            .set_override("allowed_origins", allowed_origins)?
            .set_override("log_level", log_level)?
            .set_override("use_secure_cookies", use_secure_cookies)?
            .set_override("posts_per_page", posts_per_page)?
            .set_override("home_cache_seconds", home_cache_seconds)?
            .build()?;

        builder.try_deserialize()
    }

    /// Returns the full path to the blog database file inside its own folder.
    pub fn blog_db_path(&self) -> PathBuf {
        PathBuf::from(&self.database_path)
            .join("blog")
            .join("blog.db")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blog_db_lives_in_its_own_folder() {
        let config = Config {
            web: WebConfig { host: "127.0.0.1".to_string(), port: 8080 },
            database_path: "/srv/inkwell/data".to_string(),
            media_path: "/srv/inkwell/media".to_string(),
            allowed_origins: String::new(),
            log_level: "info".to_string(),
            session_secret_key: "0".repeat(128),
            use_secure_cookies: false,
            posts_per_page: DEFAULT_POSTS_PER_PAGE,
            home_cache_seconds: DEFAULT_HOME_CACHE_SECONDS,
        };
        assert_eq!(config.blog_db_path(), PathBuf::from("/srv/inkwell/data/blog/blog.db"));
    }

    #[test]
    fn optional_settings_reject_values_that_do_not_parse() {
        assert_eq!(parse_setting("POSTS_PER_PAGE", None, 10u32).unwrap(), 10);
        assert_eq!(parse_setting("POSTS_PER_PAGE", Some("  ".to_string()), 10u32).unwrap(), 10);
        assert_eq!(parse_setting("POSTS_PER_PAGE", Some(" 25 ".to_string()), 10u32).unwrap(), 25);
        assert!(parse_setting("POSTS_PER_PAGE", Some("abc".to_string()), 10u32).is_err());
        assert!(parse_setting("HOME_CACHE_SECONDS", Some("-1".to_string()), 20u64).is_err());
        assert!(parse_setting("USE_SECURE_COOKIES", Some("yes".to_string()), false).is_err());
        assert!(parse_setting("USE_SECURE_COOKIES", Some("true".to_string()), false).unwrap());
    }
}
