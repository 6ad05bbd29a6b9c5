//! Random string generation.

use rand::distr::{Alphanumeric, SampleString};
use rand::{Rng, rng};

const URL_SAFE: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";

/// `len` characters drawn from `[A-Za-z0-9]`.
pub fn alphanumeric(len: usize) -> String {
    Alphanumeric.sample_string(&mut rng(), len)
}

/// `len` characters drawn from the base64url alphabet, suitable for opaque
/// identifiers placed in URLs or headers.
pub fn token_urlsafe(len: usize) -> String {
    let mut rng = rng();
    (0..len)
        .map(|_| URL_SAFE[rng.random_range(0..URL_SAFE.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alphanumeric_has_requested_length_and_charset() {
        let s = alphanumeric(64);
        assert_eq!(s.len(), 64);
        assert!(s.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn urlsafe_charset() {
        let s = token_urlsafe(200);
        assert_eq!(s.len(), 200);
        assert!(s.bytes().all(|b| URL_SAFE.contains(&b)));
    }

    #[test]
    fn zero_length() {
        assert!(alphanumeric(0).is_empty());
        assert!(token_urlsafe(0).is_empty());
    }

    #[test]
    fn successive_values_differ() {
        assert_ne!(alphanumeric(32), alphanumeric(32));
    }
}
