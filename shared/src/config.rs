//! Configuration management for the reports backend

use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub store: StoreConfig,
    pub reports: ReportsConfig,
    pub auth: AuthConfig,
    pub app: AppConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// When unset the server runs against the in-memory row store.
    pub url: Option<String>,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub master_table: String,
    pub intake_table: Option<String>,
    pub schema_version: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportsConfig {
    pub timezone: String,
    pub purchase_statuses: Vec<String>,
    pub match_policy: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: String,
    pub log_level: String,
    pub port: u16,
}

pub const DEFAULT_PURCHASE_STATUSES: &[&str] = &["arrived & bought", "comeback & bought"];

/// Splits a comma separated env value, dropping blanks.
pub fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn optional_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let purchase_statuses = optional_var("PURCHASE_STATUSES")
            .map(|raw| parse_list(&raw))
            .filter(|list| !list.is_empty())
            .unwrap_or_else(|| {
                DEFAULT_PURCHASE_STATUSES
                    .iter()
                    .map(|s| s.to_string())
                    .collect()
            });

        Ok(Config {
            database: DatabaseConfig {
                url: optional_var("DATABASE_URL"),
                max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()?,
                min_connections: env::var("DATABASE_MIN_CONNECTIONS")
                    .unwrap_or_else(|_| "1".to_string())
                    .parse()?,
                acquire_timeout_seconds: env::var("DATABASE_ACQUIRE_TIMEOUT_SECONDS")
                    .unwrap_or_else(|_| "30".to_string())
                    .parse()?,
            },
            store: StoreConfig {
                master_table: env::var("MASTER_TABLE").unwrap_or_else(|_| "DB".to_string()),
                intake_table: optional_var("INTAKE_TABLE"),
                schema_version: env::var("DB_SCHEMA_VERSION")
                    .unwrap_or_else(|_| "44".to_string())
                    .parse()?,
            },
            reports: ReportsConfig {
                timezone: env::var("REPORT_TIMEZONE").unwrap_or_else(|_| "Asia/Manila".to_string()),
                purchase_statuses,
                match_policy: env::var("MATCH_POLICY").unwrap_or_else(|_| "all".to_string()),
            },
            auth: AuthConfig {
                jwt_secret: env::var("JWT_SECRET")
                    .unwrap_or_else(|_| "clinic_reports_dev_secret_change_me".to_string()),
            },
            app: AppConfig {
                environment: env::var("ENVIRONMENT")
                    .unwrap_or_else(|_| "development".to_string()),
                log_level: env::var("LOG_LEVEL")
                    .unwrap_or_else(|_| "info".to_string()),
                port: env::var("PORT")
                    .unwrap_or_else(|_| "8000".to_string())
                    .parse()?,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_list_trims_and_drops_blanks() {
        assert_eq!(
            parse_list(" arrived & bought, ,comeback & bought "),
            vec!["arrived & bought".to_string(), "comeback & bought".to_string()]
        );
        assert!(parse_list("").is_empty());
    }
}
