use std::env;

use crate::error::{AppError, AppResult};

/// Default location of the static Pokémon seed document.
pub const DEFAULT_POKEMON_SEED_URL: &str =
    "https://raw.githubusercontent.com/Rizwan-ah07/web-ont-json/refs/heads/main/pokemon.json";
/// Default location of the static Trainer seed document.
pub const DEFAULT_TRAINER_SEED_URL: &str =
    "https://raw.githubusercontent.com/Rizwan-ah07/web-ont-json/refs/heads/main/trainers.json";

/// Matches the salt rounds the stored hashes were created with.
pub const DEFAULT_BCRYPT_COST: u32 = 10;

/// AppConfig
///
/// Holds the application's entire configuration state. It is loaded once at startup,
/// never mutated afterwards, and pulled into handlers and extractors via `FromRef`.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Runtime environment marker. Controls log format, cookie security and DB requirements.
    pub env: Env,
    // Postgres connection string. `None` selects the in-memory store (local only).
    pub db_url: Option<String>,
    pub port: u16,
    // Remote JSON documents used to fill empty record sets on first boot.
    pub pokemon_seed_url: String,
    pub trainer_seed_url: String,
    // Credentials for the two accounts created when the user store is empty.
    pub seed_accounts: Option<SeedAccounts>,
    pub session_ttl_minutes: i64,
    pub bcrypt_cost: u32,
}

/// Env
///
/// Defines the runtime context: human-friendly defaults locally, strict
/// requirements and hardened cookies in production.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

/// SeedAccounts
///
/// The fixed ADMIN and USER credentials used by the first-boot account seed.
#[derive(Clone)]
pub struct SeedAccounts {
    pub admin_email: String,
    pub admin_password: String,
    pub user_email: String,
    pub user_password: String,
}

impl std::fmt::Debug for SeedAccounts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeedAccounts")
            .field("admin_email", &self.admin_email)
            .field("user_email", &self.user_email)
            .finish_non_exhaustive()
    }
}

impl Default for AppConfig {
    /// Provides a safe AppConfig for tests: in-memory store, no seed accounts,
    /// and the cheapest bcrypt cost so hashing does not dominate test time.
    fn default() -> Self {
        Self {
            env: Env::Local,
            db_url: None,
            port: 3000,
            pokemon_seed_url: DEFAULT_POKEMON_SEED_URL.to_string(),
            trainer_seed_url: DEFAULT_TRAINER_SEED_URL.to_string(),
            seed_accounts: None,
            session_ttl_minutes: 60,
            bcrypt_cost: 4,
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads all parameters from environment variables. Production demands an explicit
    /// `DATABASE_URL`; locally a missing one falls back to the in-memory store.
    ///
    /// # Errors
    /// Returns `AppError::Config` when a required variable is missing or a numeric
    /// variable does not parse. Callers treat this as fatal at startup.
    pub fn load() -> AppResult<Self> {
        let env = match env::var("APP_ENV").as_deref() {
            Ok("production") => Env::Production,
            _ => Env::Local,
        };

        let db_url = match env {
            Env::Production => Some(env::var("DATABASE_URL").map_err(|_| {
                AppError::Config("DATABASE_URL must be set in production".to_string())
            })?),
            Env::Local => env::var("DATABASE_URL").ok().filter(|url| !url.is_empty()),
        };

        Ok(Self {
            env,
            db_url,
            port: parse_var("PORT", 3000)?,
            pokemon_seed_url: env::var("POKEMON_SEED_URL")
                .unwrap_or_else(|_| DEFAULT_POKEMON_SEED_URL.to_string()),
            trainer_seed_url: env::var("TRAINER_SEED_URL")
                .unwrap_or_else(|_| DEFAULT_TRAINER_SEED_URL.to_string()),
            seed_accounts: SeedAccounts::from_env(),
            session_ttl_minutes: parse_var("SESSION_TTL_MINUTES", 24 * 60)?,
            bcrypt_cost: parse_var("BCRYPT_COST", DEFAULT_BCRYPT_COST)?,
        })
    }

    /// Session cookies only carry the `Secure` flag outside local development.
    pub fn cookie_secure(&self) -> bool {
        self.env == Env::Production
    }
}

impl SeedAccounts {
    /// Returns `None` unless all four credentials are present and non-empty.
    fn from_env() -> Option<Self> {
        let read = |key: &str| env::var(key).ok().filter(|value| !value.is_empty());
        Some(Self {
            admin_email: read("ADMIN_EMAIL")?,
            admin_password: read("ADMIN_PASSWORD")?,
            user_email: read("USER_EMAIL")?,
            user_password: read("USER_PASSWORD")?,
        })
    }
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
            .map_err(|e| AppError::Config(format!("{} is invalid: {}", key, e))),
        Err(_) => Ok(default),
    }
}
