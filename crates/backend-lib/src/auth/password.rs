// ============================
// backend-lib/src/auth/password.rs
// ============================
//! Password hashing and verification.
//!
//! Hashes are PHC strings, so the salt and cost parameters travel with the
//! digest. Verification reads them back from the stored string and accepts
//! both scrypt and Argon2id hashes whatever the configured algorithm is.
use argon2::{Algorithm, Argon2, Params as Argon2Params, Version};
use password_hash::{
    rand_core::OsRng, Error as HashError, PasswordHash, PasswordHasher, PasswordVerifier,
    SaltString,
};
use scrypt::{Params as ScryptParams, Scrypt};
use serde::{Deserialize, Serialize};

use crate::config::{HashAlgorithm, HashingSettings};
use crate::error::AppError;

const SCRYPT_ID: &str = "scrypt";
const ARGON2ID_ID: &str = "argon2id";

/// Minimum length used by [`PasswordRequirements::strong`]
pub const MIN_STRONG_PASSWORD_LENGTH: usize = 10;

/// Immutable hasher configuration; cheap to clone into blocking tasks.
#[derive(Debug, Clone)]
pub struct PasswordEncoder {
    algorithm: HashAlgorithm,
    scrypt: ScryptParams,
    argon2: Argon2Params,
}

impl PasswordEncoder {
    /// Build an encoder from validated settings
    pub fn from_settings(settings: &HashingSettings) -> Result<Self, AppError> {
        let scrypt = ScryptParams::new(
            settings.scrypt.log_n,
            settings.scrypt.r,
            settings.scrypt.p,
            ScryptParams::RECOMMENDED_LEN,
        )
        .map_err(|e| AppError::InvalidInput(format!("scrypt parameters: {e}")))?;

        let argon2 = Argon2Params::new(
            settings.argon2.memory_kib,
            settings.argon2.iterations,
            settings.argon2.parallelism,
            None,
        )
        .map_err(|e| AppError::InvalidInput(format!("argon2 parameters: {e}")))?;

        Ok(Self {
            algorithm: settings.algorithm,
            scrypt,
            argon2,
        })
    }

    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.argon2.clone())
    }

    /// Hash a password with a fresh random salt
    pub fn hash(&self, plain: &str) -> Result<String, AppError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = match self.algorithm {
            HashAlgorithm::Scrypt => {
                Scrypt.hash_password_customized(plain.as_bytes(), None, None, self.scrypt, &salt)
            },
            HashAlgorithm::Argon2id => self.argon2().hash_password(plain.as_bytes(), &salt),
        }
        .map_err(|e| AppError::Internal(format!("password hashing failed: {e}")))?;
        Ok(hash.to_string())
    }

    /// Verify a password against a stored hash.
    ///
    /// `Ok(false)` means the password is wrong. A hash that cannot be parsed
    /// or names an unknown algorithm is reported as [`AppError::CorruptHash`].
    pub fn verify(&self, plain: &str, stored: &str) -> Result<bool, AppError> {
        let parsed = parse(stored)?;

        let outcome = match parsed.algorithm.as_str() {
            SCRYPT_ID => Scrypt.verify_password(plain.as_bytes(), &parsed),
            // Argon2 takes variant, version and costs from the hash itself
            "argon2id" | "argon2i" | "argon2d" => {
                Argon2::default().verify_password(plain.as_bytes(), &parsed)
            },
            other => {
                return Err(AppError::CorruptHash(format!("unsupported algorithm {other}")));
            },
        };

        match outcome {
            Ok(()) => Ok(true),
            Err(HashError::Password) => Ok(false),
            Err(e) => Err(AppError::CorruptHash(e.to_string())),
        }
    }

    /// Whether a stored hash was made with another algorithm or other costs
    pub fn needs_rehash(&self, stored: &str) -> Result<bool, AppError> {
        let parsed = parse(stored)?;
        let corrupt = |e: HashError| AppError::CorruptHash(e.to_string());

        match (self.algorithm, parsed.algorithm.as_str()) {
            (HashAlgorithm::Scrypt, SCRYPT_ID) => {
                let params = ScryptParams::try_from(&parsed).map_err(corrupt)?;
                Ok(params.log_n() != self.scrypt.log_n()
                    || params.r() != self.scrypt.r()
                    || params.p() != self.scrypt.p())
            },
            (HashAlgorithm::Argon2id, ARGON2ID_ID) => {
                let params = Argon2Params::try_from(&parsed).map_err(corrupt)?;
                Ok(params.m_cost() != self.argon2.m_cost()
                    || params.t_cost() != self.argon2.t_cost()
                    || params.p_cost() != self.argon2.p_cost())
            },
            _ => Ok(true),
        }
    }
}

fn parse(stored: &str) -> Result<PasswordHash<'_>, AppError> {
    let parsed = PasswordHash::new(stored).map_err(|e| AppError::CorruptHash(e.to_string()))?;
    if parsed.salt.is_none() || parsed.hash.is_none() {
        return Err(AppError::CorruptHash("hash is missing salt or digest".to_string()));
    }
    Ok(parsed)
}

/// Password complexity requirements
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PasswordRequirements {
    pub min_length: usize,
    pub require_uppercase: bool,
    pub require_lowercase: bool,
    pub require_digit: bool,
    pub require_special: bool,
}

impl Default for PasswordRequirements {
    fn default() -> Self {
        Self {
            min_length: 1,
            require_uppercase: false,
            require_lowercase: false,
            require_digit: false,
            require_special: false,
        }
    }
}

impl PasswordRequirements {
    /// Every character class plus [`MIN_STRONG_PASSWORD_LENGTH`]
    pub fn strong() -> Self {
        Self {
            min_length: MIN_STRONG_PASSWORD_LENGTH,
            require_uppercase: true,
            require_lowercase: true,
            require_digit: true,
            require_special: true,
        }
    }

    /// Describe the first unmet requirement, if any
    pub fn check(&self, password: &str) -> Result<(), String> {
        if password.chars().count() < self.min_length {
            return Err(format!(
                "password must be at least {} characters",
                self.min_length
            ));
        }
        if self.require_uppercase && !password.chars().any(char::is_uppercase) {
            return Err("password must contain an uppercase letter".to_string());
        }
        if self.require_lowercase && !password.chars().any(char::is_lowercase) {
            return Err("password must contain a lowercase letter".to_string());
        }
        if self.require_digit && !password.chars().any(|c| c.is_ascii_digit()) {
            return Err("password must contain a digit".to_string());
        }
        if self.require_special && !password.chars().any(|c| !c.is_alphanumeric()) {
            return Err("password must contain a special character".to_string());
        }
        Ok(())
    }
}

/// Check if a password meets the complexity requirements
pub fn validate_password_strength(password: &str, requirements: &PasswordRequirements) -> bool {
    requirements.check(password).is_ok()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::{Argon2Settings, ScryptSettings};

    /// Cheap parameters so tests stay fast
    pub(crate) fn fast_settings(algorithm: HashAlgorithm) -> HashingSettings {
        HashingSettings {
            algorithm,
            scrypt: ScryptSettings { log_n: 10, r: 8, p: 1 },
            argon2: Argon2Settings {
                memory_kib: 1024,
                iterations: 1,
                parallelism: 1,
            },
        }
    }

    fn encoder(algorithm: HashAlgorithm) -> PasswordEncoder {
        PasswordEncoder::from_settings(&fast_settings(algorithm)).unwrap()
    }

    #[test]
    fn test_hash_verifies_only_the_original_password() {
        for algorithm in [HashAlgorithm::Scrypt, HashAlgorithm::Argon2id] {
            let enc = encoder(algorithm);
            let hash = enc.hash("K@123").unwrap();

            assert_ne!(hash, "K@123");
            assert!(enc.verify("K@123", &hash).unwrap());
            assert!(!enc.verify("K@124", &hash).unwrap());
            assert!(!enc.verify("", &hash).unwrap());
        }
    }

    #[test]
    fn test_hash_is_salted() {
        let enc = encoder(HashAlgorithm::Scrypt);
        let first = enc.hash("same-secret").unwrap();
        let second = enc.hash("same-secret").unwrap();

        assert_ne!(first, second);
        assert!(enc.verify("same-secret", &first).unwrap());
        assert!(enc.verify("same-secret", &second).unwrap());
    }

    #[test]
    fn test_hash_embeds_algorithm_and_cost() {
        let scrypt_hash = encoder(HashAlgorithm::Scrypt).hash("pw").unwrap();
        assert!(scrypt_hash.starts_with("$scrypt$ln=10,r=8,p=1$"));

        let argon_hash = encoder(HashAlgorithm::Argon2id).hash("pw").unwrap();
        assert!(argon_hash.starts_with("$argon2id$v=19$m=1024,t=1,p=1$"));
    }

    #[test]
    fn test_verify_accepts_hashes_from_the_other_algorithm() {
        let scrypt = encoder(HashAlgorithm::Scrypt);
        let argon = encoder(HashAlgorithm::Argon2id);

        assert!(scrypt.verify("pw", &argon.hash("pw").unwrap()).unwrap());
        assert!(argon.verify("pw", &scrypt.hash("pw").unwrap()).unwrap());
    }

    #[test]
    fn test_malformed_hash_is_corrupt_not_mismatch() {
        let enc = encoder(HashAlgorithm::Scrypt);

        for stored in ["K@123", "", "$scrypt$", "$md5$abc$def", "$scrypt$ln=10,r=8,p=1$c2FsdA"] {
            assert!(
                matches!(enc.verify("K@123", stored), Err(AppError::CorruptHash(_))),
                "expected corrupt hash for {stored:?}"
            );
        }
    }

    #[test]
    fn test_needs_rehash() {
        let current = encoder(HashAlgorithm::Scrypt);
        let hash = current.hash("pw").unwrap();
        assert!(!current.needs_rehash(&hash).unwrap());

        let mut stronger = fast_settings(HashAlgorithm::Scrypt);
        stronger.scrypt.log_n = 11;
        let stronger = PasswordEncoder::from_settings(&stronger).unwrap();
        assert!(stronger.needs_rehash(&hash).unwrap());

        let argon = encoder(HashAlgorithm::Argon2id);
        assert!(argon.needs_rehash(&hash).unwrap());
        assert!(!argon.needs_rehash(&argon.hash("pw").unwrap()).unwrap());
    }

    #[test]
    fn test_password_strength_validation() {
        let strong = PasswordRequirements::strong();

        assert!(validate_password_strength("SecureP@ssw0rd", &strong));
        assert!(!validate_password_strength("Short1!", &strong));
        assert!(!validate_password_strength("securep@ssw0rd", &strong));
        assert!(!validate_password_strength("SECUREP@SSW0RD", &strong));
        assert!(!validate_password_strength("SecureP@ssword", &strong));
        assert!(!validate_password_strength("SecurePassw0rd", &strong));

        let lenient = PasswordRequirements::default();
        assert!(validate_password_strength("K@123", &lenient));
        assert!(!validate_password_strength("", &lenient));
    }
}
