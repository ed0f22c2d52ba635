use serde::{Deserialize, Serialize};
use std::env;

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub loyalty: LoyaltyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// Loyalty program settings. Typed and validated at load time instead of
/// free-form key/value JSON, so a misconfigured rate fails startup
/// rather than the first accrual.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoyaltyConfig {
    /// Points accrued per order amount, in basis points.
    /// 100 bp = 1 point per 100 minor currency units.
    #[serde(default = "default_accrual_rate_bp")]
    pub accrual_rate_bp: i64,
    /// Lifetime of an earned grant, in days.
    #[serde(default = "default_expiry_days")]
    pub expiry_days: i64,
    /// Window used by the expiring-soon statistic, in days.
    #[serde(default = "default_expiring_soon_days")]
    pub expiring_soon_days: i64,
}

fn default_accrual_rate_bp() -> i64 {
    100
}

fn default_expiry_days() -> i64 {
    365
}

fn default_expiring_soon_days() -> i64 {
    30
}

impl Default for LoyaltyConfig {
    fn default() -> Self {
        Self {
            accrual_rate_bp: default_accrual_rate_bp(),
            expiry_days: default_expiry_days(),
            expiring_soon_days: default_expiring_soon_days(),
        }
    }
}

impl LoyaltyConfig {
    pub fn validate(&self) -> AppResult<()> {
        if self.accrual_rate_bp <= 0 {
            return Err(AppError::ConfigError(
                "loyalty.accrual_rate_bp must be positive".to_string(),
            ));
        }
        if self.expiry_days <= 0 {
            return Err(AppError::ConfigError(
                "loyalty.expiry_days must be positive".to_string(),
            ));
        }
        if self.expiring_soon_days <= 0 || self.expiring_soon_days > self.expiry_days {
            return Err(AppError::ConfigError(
                "loyalty.expiring_soon_days must be positive and within the expiry window"
                    .to_string(),
            ));
        }
        Ok(())
    }
}

impl Config {
    pub fn from_toml() -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        use std::io::ErrorKind;

        let config_result = std::fs::read_to_string(&config_path);

        let mut config: Config = match config_result {
            Ok(config_str) => {
                toml::from_str(&config_str)
                    .map_err(|e| format!("Failed to parse config file: {e}"))?
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                // No config file: build from environment variables and defaults
                fn get_env(name: &str) -> Option<String> {
                    env::var(name).ok()
                }
                fn get_env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
                    env::var(name)
                        .ok()
                        .and_then(|v| v.parse::<T>().ok())
                        .unwrap_or(default)
                }

                let database_url = get_env("DATABASE_URL").ok_or(
                    "Missing DATABASE_URL environment variable and no config.toml found",
                )?;

                Config {
                    server: ServerConfig {
                        host: get_env("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                        port: get_env_parse("SERVER_PORT", 8080u16),
                    },
                    database: DatabaseConfig {
                        url: database_url,
                        max_connections: get_env_parse("DB_MAX_CONNECTIONS", 10u32),
                    },
                    loyalty: LoyaltyConfig {
                        accrual_rate_bp: get_env_parse(
                            "LOYALTY_ACCRUAL_RATE_BP",
                            default_accrual_rate_bp(),
                        ),
                        expiry_days: get_env_parse("LOYALTY_EXPIRY_DAYS", default_expiry_days()),
                        expiring_soon_days: get_env_parse(
                            "LOYALTY_EXPIRING_SOON_DAYS",
                            default_expiring_soon_days(),
                        ),
                    },
                }
            }
            Err(e) => {
                return Err(format!("Failed to read config file {config_path}: {e}").into());
            }
        };

        // Environment variables override the file when both are present
        if let Ok(v) = env::var("SERVER_HOST") {
            config.server.host = v;
        }
        if let Ok(v) = env::var("SERVER_PORT")
            && let Ok(p) = v.parse()
        {
            config.server.port = p;
        }
        if let Ok(v) = env::var("DATABASE_URL") {
            config.database.url = v;
        }
        if let Ok(v) = env::var("DB_MAX_CONNECTIONS")
            && let Ok(mc) = v.parse()
        {
            config.database.max_connections = mc;
        }
        if let Ok(v) = env::var("LOYALTY_ACCRUAL_RATE_BP")
            && let Ok(n) = v.parse()
        {
            config.loyalty.accrual_rate_bp = n;
        }
        if let Ok(v) = env::var("LOYALTY_EXPIRY_DAYS")
            && let Ok(n) = v.parse()
        {
            config.loyalty.expiry_days = n;
        }
        if let Ok(v) = env::var("LOYALTY_EXPIRING_SOON_DAYS")
            && let Ok(n) = v.parse()
        {
            config.loyalty.expiring_soon_days = n;
        }

        config.loyalty.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loyalty_defaults_are_valid() {
        assert!(LoyaltyConfig::default().validate().is_ok());
    }

    #[test]
    fn test_loyalty_rejects_non_positive_rate() {
        let cfg = LoyaltyConfig {
            accrual_rate_bp: 0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_loyalty_rejects_soon_window_beyond_expiry() {
        let cfg = LoyaltyConfig {
            expiry_days: 30,
            expiring_soon_days: 60,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }
}
