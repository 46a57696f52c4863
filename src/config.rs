use std::str::FromStr;

use serde::Deserialize;

/// Longest accepted session lifetime, about ten years.
pub const MAX_SESSION_TTL_DAYS: i64 = 3650;

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    pub cookie_name: String,
    pub ttl_days: i64,
    pub cookie_secure: bool,
    pub prune_interval_secs: u64,
}

impl SessionConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            (1..=MAX_SESSION_TTL_DAYS).contains(&self.ttl_days),
            "SESSION_TTL_DAYS must be between 1 and {MAX_SESSION_TTL_DAYS}, got {}",
            self.ttl_days
        );
        Ok(())
    }
}

/// Argon2id cost parameters used for newly created hashes.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PasswordConfig {
    pub m_cost: u32, // memory, KiB
    pub t_cost: u32, // iterations
    pub p_cost: u32, // lanes
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            m_cost: argon2::Params::DEFAULT_M_COST,
            t_cost: argon2::Params::DEFAULT_T_COST,
            p_cost: argon2::Params::DEFAULT_P_COST,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub host: String,
    pub port: u16,
    pub session: SessionConfig,
    pub password: PasswordConfig,
    pub membership_secret: String,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let session = SessionConfig {
            cookie_name: std::env::var("SESSION_COOKIE_NAME").unwrap_or_else(|_| "sid".into()),
            ttl_days: env_or("SESSION_TTL_DAYS", 30),
            cookie_secure: env_or("SESSION_COOKIE_SECURE", false),
            prune_interval_secs: env_or("SESSION_PRUNE_INTERVAL_SECS", 15 * 60),
        };
        let defaults = PasswordConfig::default();
        let password = PasswordConfig {
            m_cost: env_or("ARGON2_M_COST", defaults.m_cost),
            t_cost: env_or("ARGON2_T_COST", defaults.t_cost),
            p_cost: env_or("ARGON2_P_COST", defaults.p_cost),
        };
        session.validate()?;

        Ok(Self {
            database_url,
            max_connections: env_or("DATABASE_MAX_CONNECTIONS", 10),
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env_or("APP_PORT", 8080),
            session,
            password,
            membership_secret: std::env::var("MEMBERSHIP_SECRET")
                .unwrap_or_else(|_| "cubular".into()),
        })
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}
