// ============================
// backend-lib/src/config.rs
// ============================
//! Configuration management.
use std::net::SocketAddr;
use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::auth::PasswordRequirements;

/// Environment variable prefix; nested keys are split on `__`.
pub const ENV_PREFIX: &str = "GATEKEEPER_";

/// Default config file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        ConfigError::Load(Box::new(err))
    }
}

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Server bind address
    pub bind_addr: SocketAddr,
    /// Log level used when `RUST_LOG` is unset
    pub log_level: String,
    /// Log output format
    pub log_format: LogFormat,
    /// Realm advertised in the Basic challenge
    pub realm: String,
    /// Whether `POST /register` may be called without credentials
    pub open_registration: bool,
    /// Key the lockout on `x-real-ip` / `x-forwarded-for` instead of the
    /// socket peer. Only enable behind a proxy that overwrites them.
    pub trust_proxy_headers: bool,
    /// Password hashing parameters
    pub hashing: HashingSettings,
    /// Password requirements enforced at registration
    pub password_requirements: PasswordRequirements,
    /// Failed-login lockout
    pub rate_limit: RateLimitSettings,
    /// User store backend
    pub storage: StorageSettings,
    /// Accounts created at startup when the store is empty
    pub seed_users: Vec<SeedUser>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    Scrypt,
    Argon2id,
}

/// Password hashing parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HashingSettings {
    /// Algorithm used for new hashes
    pub algorithm: HashAlgorithm,
    pub scrypt: ScryptSettings,
    pub argon2: Argon2Settings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScryptSettings {
    /// log2 of the CPU/memory cost; the work factor
    pub log_n: u8,
    /// Block size
    pub r: u32,
    /// Parallelism
    pub p: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Argon2Settings {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitSettings {
    /// Failed attempts before a client is locked out
    pub max_failed_attempts: u32,
    /// Lockout duration in seconds; idle failure counts are forgotten after
    /// the same period
    pub lockout_secs: u64,
    /// How often expired entries are pruned, in seconds
    pub cleanup_interval_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    Sqlite,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub backend: StorageBackend,
    /// e.g. `sqlite://data/users.db?mode=rwc`
    pub database_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedUser {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub roles: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            realm: crate::error::DEFAULT_REALM.to_string(),
            open_registration: false,
            trust_proxy_headers: false,
            hashing: HashingSettings::default(),
            password_requirements: PasswordRequirements::default(),
            rate_limit: RateLimitSettings::default(),
            storage: StorageSettings::default(),
            seed_users: Vec::new(),
        }
    }
}

impl Default for HashingSettings {
    fn default() -> Self {
        Self {
            algorithm: HashAlgorithm::Scrypt,
            scrypt: ScryptSettings::default(),
            argon2: Argon2Settings::default(),
        }
    }
}

impl Default for ScryptSettings {
    fn default() -> Self {
        Self { log_n: 15, r: 8, p: 1 }
    }
}

impl Default for Argon2Settings {
    fn default() -> Self {
        Self {
            memory_kib: 19 * 1024,
            iterations: 2,
            parallelism: 1,
        }
    }
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            max_failed_attempts: 5,
            lockout_secs: 5 * 60,
            cleanup_interval_secs: 60,
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            database_url: None,
        }
    }
}

impl Settings {
    /// Load settings from `config.toml` and the environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(DEFAULT_CONFIG_FILE)
    }

    /// Load settings from a specific TOML file and the environment.
    /// A missing file is not an error; defaults and env still apply.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let settings: Settings = Self::figment(path.as_ref()).extract()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Provider chain: defaults, then the file, then `GATEKEEPER_*` variables
    pub fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Validate settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !LOG_LEVELS.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(ConfigError::Invalid(format!(
                "log_level must be one of {LOG_LEVELS:?}, got {:?}",
                self.log_level
            )));
        }

        if self.realm.trim().is_empty() {
            return Err(ConfigError::Invalid("realm must not be empty".to_string()));
        }

        let scrypt = &self.hashing.scrypt;
        if !(10..=20).contains(&scrypt.log_n) {
            return Err(ConfigError::Invalid(format!(
                "hashing.scrypt.log_n must be within 10..=20, got {}",
                scrypt.log_n
            )));
        }
        if scrypt.r == 0 || scrypt.p == 0 {
            return Err(ConfigError::Invalid(
                "hashing.scrypt.r and hashing.scrypt.p must be positive".to_string(),
            ));
        }

        let argon2 = &self.hashing.argon2;
        if argon2.iterations == 0 || argon2.parallelism == 0 {
            return Err(ConfigError::Invalid(
                "hashing.argon2.iterations and parallelism must be positive".to_string(),
            ));
        }
        let min_memory_kib = argon2.parallelism.saturating_mul(8);
        if argon2.memory_kib < min_memory_kib {
            return Err(ConfigError::Invalid(format!(
                "hashing.argon2.memory_kib must be at least {min_memory_kib} KiB"
            )));
        }

        if self.password_requirements.min_length == 0 {
            return Err(ConfigError::Invalid(
                "password_requirements.min_length must be at least 1".to_string(),
            ));
        }

        if self.rate_limit.max_failed_attempts == 0 {
            return Err(ConfigError::Invalid(
                "rate_limit.max_failed_attempts must be positive".to_string(),
            ));
        }
        if self.rate_limit.cleanup_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "rate_limit.cleanup_interval_secs must be positive".to_string(),
            ));
        }

        if self.storage.backend == StorageBackend::Sqlite
            && self.storage.database_url.as_deref().map_or(true, str::is_empty)
        {
            return Err(ConfigError::Invalid(
                "storage.database_url is required for the sqlite backend".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_default_settings_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.bind_addr.to_string(), "127.0.0.1:3000");
        assert_eq!(settings.hashing.algorithm, HashAlgorithm::Scrypt);
        assert!(!settings.open_registration);
        assert!(!settings.trust_proxy_headers);
    }

    #[test]
    fn test_settings_validation() {
        let settings = Settings::default();

        let mut invalid = settings.clone();
        invalid.log_level = "loud".to_string();
        assert!(invalid.validate().is_err());

        let mut invalid = settings.clone();
        invalid.hashing.scrypt.log_n = 4;
        assert!(invalid.validate().is_err());

        let mut invalid = settings.clone();
        invalid.hashing.scrypt.r = 0;
        assert!(invalid.validate().is_err());

        let mut invalid = settings.clone();
        invalid.hashing.argon2.memory_kib = 4;
        assert!(invalid.validate().is_err());

        let mut invalid = settings.clone();
        invalid.hashing.argon2.parallelism = u32::MAX;
        invalid.hashing.argon2.memory_kib = u32::MAX - 1;
        assert!(matches!(invalid.validate(), Err(ConfigError::Invalid(_))));

        let mut invalid = settings.clone();
        invalid.rate_limit.max_failed_attempts = 0;
        assert!(invalid.validate().is_err());

        let mut invalid = settings.clone();
        invalid.rate_limit.cleanup_interval_secs = 0;
        assert!(invalid.validate().is_err());

        let mut invalid = settings.clone();
        invalid.realm = "  ".to_string();
        assert!(invalid.validate().is_err());

        let mut invalid = settings;
        invalid.storage.backend = StorageBackend::Sqlite;
        assert!(invalid.validate().is_err());
        invalid.storage.database_url = Some("sqlite::memory:".to_string());
        assert!(invalid.validate().is_ok());
    }

    #[test]
    fn test_load_settings_from_file_and_env() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "gatekeeper.toml",
                r#"
                bind_addr = "0.0.0.0:8080"
                open_registration = true

                [hashing]
                algorithm = "argon2id"

                [[seed_users]]
                username = "kiran"
                password = "K@123"
                roles = ["ADMIN"]
                "#,
            )?;
            jail.set_env("GATEKEEPER_LOG_LEVEL", "debug");
            jail.set_env("GATEKEEPER_RATE_LIMIT__MAX_FAILED_ATTEMPTS", "3");
            jail.set_env("GATEKEEPER_TRUST_PROXY_HEADERS", "true");

            let settings = Settings::load_from("gatekeeper.toml").map_err(|e| e.to_string())?;
            assert_eq!(settings.bind_addr.to_string(), "0.0.0.0:8080");
            assert!(settings.open_registration);
            assert_eq!(settings.hashing.algorithm, HashAlgorithm::Argon2id);
            assert_eq!(settings.hashing.scrypt, ScryptSettings::default());
            assert_eq!(settings.log_level, "debug");
            assert_eq!(settings.rate_limit.max_failed_attempts, 3);
            assert!(settings.trust_proxy_headers);
            assert_eq!(settings.seed_users.len(), 1);
            assert_eq!(settings.seed_users[0].roles, vec!["ADMIN".to_string()]);
            Ok(())
        });
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        Jail::expect_with(|_jail| {
            let settings = Settings::load_from("absent.toml").map_err(|e| e.to_string())?;
            assert_eq!(settings.realm, "gatekeeper");
            Ok(())
        });
    }

    #[test]
    fn test_invalid_file_values_are_rejected() {
        Jail::expect_with(|jail| {
            jail.create_file("bad.toml", "log_level = \"verbose\"")?;
            assert!(matches!(
                Settings::load_from("bad.toml"),
                Err(ConfigError::Invalid(_))
            ));
            Ok(())
        });
    }
}
