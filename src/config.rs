use std::env;
use std::str::FromStr;

use crate::types::{AppError, AppResult};

#[derive(Debug, Clone)]
pub struct Config {
    pub grades: GradesConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone)]
pub struct GradesConfig {
    pub csv_path: String,
    pub threshold: f64,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub region: String,
    pub endpoint: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub max_retries: u32,
}

impl Config {
    pub fn from_env() -> AppResult<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup. `from_env` passes the
    /// process environment; tests pass a map.
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            grades: GradesConfig {
                csv_path: lookup("GRADES_CSV_PATH").unwrap_or_else(|| "students.csv".to_string()),
                threshold: parse_or(&lookup, "GRADES_THRESHOLD", 75.0)?,
            },
            storage: StorageConfig {
                region: lookup("AWS_REGION")
                    .or_else(|| lookup("S3_REGION"))
                    .unwrap_or_else(|| "us-east-1".to_string()),
                endpoint: lookup("S3_ENDPOINT").filter(|s| !s.trim().is_empty()),
                access_key_id: lookup("AWS_ACCESS_KEY_ID"),
                secret_access_key: lookup("AWS_SECRET_ACCESS_KEY"),
                max_retries: parse_or(&lookup, "S3_MAX_RETRIES", 0)?,
            },
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> AppResult<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| AppError::Config(format!("{} has invalid value '{}': {}", key, raw, e))),
        None => Ok(default),
    }
}
