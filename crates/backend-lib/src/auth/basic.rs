// ============================
// backend-lib/src/auth/basic.rs
// ============================
//! `Authorization: Basic` header decoding.
use std::fmt;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use zeroize::Zeroizing;

/// Username and password lifted from a Basic header
pub struct Credentials {
    pub username: String,
    pub password: Zeroizing<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    /// Encode as a header value, the inverse of [`parse_basic_authorization`]
    pub fn to_header_value(&self) -> String {
        let raw = Zeroizing::new(format!("{}:{}", self.username, self.password.as_str()));
        format!("Basic {}", STANDARD.encode(raw.as_bytes()))
    }
}

/// Decode `Basic base64(username:password)`.
///
/// The scheme is case-insensitive. The password is everything after the
/// first `:`, so it may itself contain colons. Returns `None` for any other
/// scheme, bad base64, non-UTF-8 content or a missing separator.
pub fn parse_basic_authorization(value: &str) -> Option<Credentials> {
    let (scheme, encoded) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }

    let decoded = Zeroizing::new(STANDARD.decode(encoded.trim()).ok()?);
    let text = std::str::from_utf8(&decoded).ok()?;
    let (username, password) = text.split_once(':')?;

    Some(Credentials {
        username: username.to_string(),
        password: Zeroizing::new(password.to_string()),
    })
}
