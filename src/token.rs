//! Stateless account tokens for email confirmation and password reset.
//!
//! A token is `<issued-at, base36>-<mac hex>`, where the MAC is a keyed BLAKE3
//! hash over the user's id, the issue timestamp and `is_active`. Confirming an
//! account flips `is_active`, which invalidates its confirmation token. Reset
//! tokens additionally hash the stored password, so a used reset link dies
//! with the old password.

use crate::orm::users;
use chrono::Utc;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenPurpose {
    ConfirmEmail,
    PasswordReset,
}

impl TokenPurpose {
    /// BLAKE3 key derivation context. Changing it invalidates outstanding tokens.
    fn context(self) -> &'static str {
        match self {
            TokenPurpose::ConfirmEmail => "surveyor 2019-06-02 email confirmation token",
            TokenPurpose::PasswordReset => "surveyor 2019-06-02 password reset token",
        }
    }
}

#[derive(Clone)]
pub struct TokenGenerator {
    key: [u8; 32],
    purpose: TokenPurpose,
    max_age_secs: i64,
}

impl std::fmt::Debug for TokenGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenGenerator")
            .field("purpose", &self.purpose)
            .field("max_age_secs", &self.max_age_secs)
            .finish_non_exhaustive()
    }
}

impl TokenGenerator {
    pub fn new(secret: &[u8], purpose: TokenPurpose, max_age: chrono::Duration) -> Self {
        Self {
            key: blake3::derive_key(purpose.context(), secret),
            purpose,
            max_age_secs: max_age.num_seconds(),
        }
    }

    pub fn make_token(&self, user: &users::Model) -> String {
        self.make_token_at(user, Utc::now().timestamp())
    }

    pub fn make_token_at(&self, user: &users::Model, timestamp: i64) -> String {
        format!(
            "{}-{}",
            to_base36(timestamp.max(0) as u64),
            self.mac(user, timestamp).to_hex()
        )
    }

    pub fn check_token(&self, user: &users::Model, token: &str) -> bool {
        self.check_token_at(user, token, Utc::now().timestamp())
    }

    pub fn check_token_at(&self, user: &users::Model, token: &str, now: i64) -> bool {
        let (ts, mac) = match token.split_once('-') {
            Some(parts) => parts,
            None => return false,
        };

        let timestamp = match u64::from_str_radix(ts, 36) {
            Ok(ts) if ts <= i64::MAX as u64 => ts as i64,
            _ => return false,
        };

        let mac = match blake3::Hash::from_hex(mac) {
            Ok(mac) => mac,
            Err(_) => return false,
        };

        // blake3::Hash equality is constant-time.
        if mac != self.mac(user, timestamp) {
            return false;
        }

        timestamp <= now && now - timestamp <= self.max_age_secs
    }

    fn mac(&self, user: &users::Model, timestamp: i64) -> blake3::Hash {
        let mut hasher = blake3::Hasher::new_keyed(&self.key);
        hasher.update(format!("{}:{}:{}", user.id, timestamp, user.is_active).as_bytes());
        if self.purpose == TokenPurpose::PasswordReset {
            hasher.update(b":");
            hasher.update(user.password.as_bytes());
        }
        hasher.finalize()
    }
}

/// Both account token generators, shared as app data.
#[derive(Clone, Debug)]
pub struct AccountTokens {
    pub confirm: TokenGenerator,
    pub reset: TokenGenerator,
}

impl AccountTokens {
    pub fn new(secret: &[u8], max_age: chrono::Duration) -> Self {
        Self {
            confirm: TokenGenerator::new(secret, TokenPurpose::ConfirmEmail, max_age),
            reset: TokenGenerator::new(secret, TokenPurpose::PasswordReset, max_age),
        }
    }
}

fn to_base36(mut n: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

    if n == 0 {
        return "0".to_owned();
    }

    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}
