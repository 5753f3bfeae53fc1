//! Password hashing and bearer session tokens.
//!
//! A token is `<session id>.<secret>`. Only a SHA-256 digest of the secret is
//! stored; incoming secrets are digested and compared in constant time.

use anyhow::Context;
use rand::{distr::Alphanumeric, Rng};
use sha2::{Digest, Sha256};

const SECRET_LEN: usize = 32;

pub fn hash_password(password: &str, cost: u32) -> anyhow::Result<String> {
    bcrypt::hash(password, cost).context("failed to hash password")
}

/// Returns `false` for a wrong password and for a hash bcrypt cannot parse.
pub fn verify_password(password: &str, hash: &str) -> bool {
    bcrypt::verify(password, hash).unwrap_or_else(|err| {
        log::warn!("stored password hash is unusable: {err}");
        false
    })
}

pub struct IssuedToken {
    pub session_id: String,
    pub secret_digest: String,
    pub token: String,
}

pub fn digest_secret(secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    format!("{:x}", hasher.finalize())
}

pub fn issue_token() -> IssuedToken {
    let session_id = rusty_ulid::generate_ulid_string();
    let secret: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(SECRET_LEN)
        .map(char::from)
        .collect();

    IssuedToken {
        token: format!("{session_id}.{secret}"),
        secret_digest: digest_secret(&secret),
        session_id,
    }
}

/// Splits a token into session id and secret.
pub fn split_token(token: &str) -> Option<(&str, &str)> {
    let (session_id, secret) = token.split_once('.')?;
    if session_id.is_empty() || secret.is_empty() {
        return None;
    }
    Some((session_id, secret))
}

/// Validates a provided token against the expected token using constant-time comparison.
///
/// Returns `false` if either token is empty.
pub fn validate_token(provided: &str, expected: &str) -> bool {
    let provided = provided.as_bytes();
    let expected = expected.as_bytes();

    if provided.is_empty() || expected.is_empty() {
        return false;
    }

    let len_match = provided.len() == expected.len();

    let mut diff: u8 = 0;
    for (a, b) in provided.iter().zip(expected.iter()) {
        diff |= a ^ b;
    }

    len_match && diff == 0
}

/// Extracts the bearer token from an Authorization header value.
///
/// Expected format: "Bearer <token>"
pub fn extract_bearer_token(header: &str) -> Option<&str> {
    let header = header.trim();

    // RFC 6750 allows a case-insensitive scheme
    if header.len() < 7 {
        return None;
    }

    let (prefix, token) = header.split_at(7);
    if prefix.eq_ignore_ascii_case("Bearer ") {
        let token = token.trim();
        if token.is_empty() {
            None
        } else {
            Some(token)
        }
    } else {
        None
    }
}
