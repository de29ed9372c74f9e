//! Cryptographic utilities for one-time passcodes and session identifiers.

use rand::Rng;
use sha2::{Digest, Sha256};

/// Smallest six-digit passcode.
pub const OTP_MIN: u32 = 100_000;

/// Largest six-digit passcode.
pub const OTP_MAX: u32 = 999_999;

/// Prefix carried by every attendance session identifier.
pub const SESSION_ID_PREFIX: &str = "qs_";

/// Computes SHA-256 hash of the input and returns it as a hex string.
pub fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

/// Generates a six-digit numeric passcode drawn uniformly from 100000..=999999.
pub fn generate_otp() -> String {
    rand::thread_rng().gen_range(OTP_MIN..=OTP_MAX).to_string()
}

/// Generates an unguessable attendance session identifier (128 random bits).
pub fn generate_session_id() -> String {
    let bytes: [u8; 16] = rand::thread_rng().gen();
    format!("{}{}", SESSION_ID_PREFIX, hex::encode(bytes))
}

/// Compares two digests without short-circuiting on the first differing byte.
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_hex() {
        let hash = sha256_hex("test");
        assert_eq!(hash.len(), 64);
        assert_eq!(
            hash,
            "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08"
        );
    }

    #[test]
    fn test_sha256_hex_deterministic() {
        assert_eq!(sha256_hex("123456"), sha256_hex("123456"));
        assert_ne!(sha256_hex("123456"), sha256_hex("123457"));
    }

    #[test]
    fn test_generate_otp_is_six_digits_in_range() {
        for _ in 0..1000 {
            let otp = generate_otp();
            assert_eq!(otp.len(), 6);
            let value: u32 = otp.parse().unwrap();
            assert!((OTP_MIN..=OTP_MAX).contains(&value));
        }
    }

    #[test]
    fn test_generate_session_id_format() {
        let id = generate_session_id();
        assert!(id.starts_with(SESSION_ID_PREFIX));
        let hex_part = &id[SESSION_ID_PREFIX.len()..];
        assert_eq!(hex_part.len(), 32);
        assert!(hex::decode(hex_part).is_ok());
    }

    #[test]
    fn test_generate_session_id_uniqueness() {
        assert_ne!(generate_session_id(), generate_session_id());
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq("abc", "abc"));
        assert!(!constant_time_eq("abc", "abd"));
        assert!(!constant_time_eq("abc", "abcd"));
        assert!(constant_time_eq("", ""));
    }
}
