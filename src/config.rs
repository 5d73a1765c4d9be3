use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct WebConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub web: WebConfig,
    pub env_name: String,
    pub database_path: String,
    pub upload_dir: String,
    pub secret_key: String,
    pub cors_origins: String,
    pub log_level: String,
    pub redirect_www_to_naked: bool,
    pub www_host: String,
    pub naked_host: String,
    pub timezone_offset_hours: i32,
    pub seed_admin_email: String,
    pub seed_admin_password: String,
    pub seed_admin_name: String,
}

impl Config {
    /// Loads configuration from the environment, optionally seeded from a
    /// .env file. Already-set process variables win over the file.
    pub fn from_env(env_path: Option<&Path>) -> Result<Self, config::ConfigError> {
        match env_path {
            Some(path) => {
                dotenvy::from_path(path).map_err(|e| {
                    config::ConfigError::Message(format!(
                        "Failed to load .env file from '{}': {}",
                        path.display(),
                        e
                    ))
                })?;
            }
            None => {
                // Best effort: a missing ./.env is fine, everything can come
                // from the real environment.
                let _ = dotenvy::dotenv();
            }
        }

        let env_name = env::var("ENV")
            .unwrap_or_else(|_| "production".to_string())
            .trim()
            .to_lowercase();

        let database_path = env::var("DATABASE_PATH").map_err(|_| {
            config::ConfigError::Message(
                "Environment variable 'DATABASE_PATH' is not set.".to_string(),
            )
        })?;

        let upload_dir = env::var("UPLOAD_DIR").map_err(|_| {
            config::ConfigError::Message(
                "Environment variable 'UPLOAD_DIR' is not set.".to_string(),
            )
        })?;

        if Path::new(&database_path).is_relative() {
            return Err(config::ConfigError::Message(format!(
                "'DATABASE_PATH' is a relative path ('{}'). It must be absolute.",
                database_path
            )));
        }
        if Path::new(&upload_dir).is_relative() {
            return Err(config::ConfigError::Message(format!(
                "'UPLOAD_DIR' is a relative path ('{}'). It must be absolute.",
                upload_dir
            )));
        }

        // The signing key is mandatory outside local development.
        let secret_key = env::var("SECRET_KEY").unwrap_or_default().trim().to_string();
        if secret_key.is_empty() && matches!(env_name.as_str(), "production" | "staging") {
            return Err(config::ConfigError::Message(
                "'SECRET_KEY' must be set when ENV=production or ENV=staging.".to_string(),
            ));
        }
        let secret_key = if secret_key.is_empty() {
            "dev-secret-change-in-production".to_string()
        } else {
            secret_key
        };

        let cors_origins = env::var("CORS_ORIGINS").unwrap_or_else(|_| "".to_string());
        let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let redirect_www_to_naked = env::var("REDIRECT_WWW_TO_NAKED")
            .map(|v| matches!(v.trim().to_lowercase().as_str(), "true" | "1"))
            .unwrap_or(false);
        let www_host = env::var("WWW_HOST").unwrap_or_default();
        let naked_host = env::var("NAKED_HOST").unwrap_or_default();

        let timezone_offset_hours = env::var("TIMEZONE_OFFSET_HOURS")
            .ok()
            .and_then(|v| v.trim().parse::<i32>().ok())
            .unwrap_or(9);

        let seed_admin_email =
            env::var("SEED_ADMIN_EMAIL").unwrap_or_else(|_| "admin@example.com".to_string());
        let seed_admin_password =
            env::var("SEED_ADMIN_PASSWORD").unwrap_or_else(|_| "changeme".to_string());
        let seed_admin_name = env::var("SEED_ADMIN_NAME").unwrap_or_else(|_| "Admin".to_string());

        let builder = config::Config::builder()
            .set_default("web.host", "127.0.0.1")?
            .set_default("web.port", 8000_i64)?
            .add_source(
                config::File::new("config/default.toml", config::FileFormat::Toml).required(false),
            )
            .set_override_option("web.host", env::var("HOST").ok())?
            .set_override_option(
                "web.port",
                env::var("PORT").ok().and_then(|p| p.parse::<i64>().ok()),
            )?
            .set_override("env_name", env_name)?
            .set_override("database_path", database_path)?
            .set_override("upload_dir", upload_dir)?
            .set_override("secret_key", secret_key)?
            .set_override("cors_origins", cors_origins)?
            .set_override("log_level", log_level)?
            .set_override("redirect_www_to_naked", redirect_www_to_naked)?
            .set_override("www_host", www_host)?
            .set_override("naked_host", naked_host)?
            .set_override("timezone_offset_hours", timezone_offset_hours as i64)?
            .set_override("seed_admin_email", seed_admin_email)?
            .set_override("seed_admin_password", seed_admin_password)?
            .set_override("seed_admin_name", seed_admin_name)?
            .build()?;

        builder.try_deserialize()
    }

    /// Full path to the SQLite database file inside the database directory.
    pub fn db_file(&self) -> PathBuf {
        PathBuf::from(&self.database_path).join("blog.db")
    }

    pub fn upload_root(&self) -> PathBuf {
        PathBuf::from(&self.upload_dir)
    }
}
