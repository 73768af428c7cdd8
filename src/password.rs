// ABOUTME: Random alphanumeric secret generation for worker credentials.
// ABOUTME: Length is drawn uniformly from a configurable range.

use rand::Rng;

pub const DEFAULT_MIN_LEN: usize = 32;
pub const DEFAULT_MAX_LEN: usize = 64;

const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Generate a random alphanumeric password with length uniformly chosen
/// in `[min_len, max_len]`.
///
/// # Panics
///
/// Panics if `min_len > max_len` or `min_len == 0`; both are programming
/// errors in the caller's configuration handling.
pub fn generate_password(min_len: usize, max_len: usize) -> String {
    assert!(min_len > 0 && min_len <= max_len, "invalid password length range");

    let mut rng = rand::thread_rng();
    let len = rng.gen_range(min_len..=max_len);
    (0..len)
        .map(|_| {
            let idx = rng.gen_range(0..CHARSET.len());
            CHARSET[idx] as char
        })
        .collect()
}

/// Password with the default `[32, 64]` length range.
pub fn generate_default_password() -> String {
    generate_password(DEFAULT_MIN_LEN, DEFAULT_MAX_LEN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_within_range() {
        for _ in 0..50 {
            let password = generate_password(8, 12);
            assert!((8..=12).contains(&password.len()), "{}", password.len());
        }
    }

    #[test]
    fn exact_length_when_range_collapsed() {
        assert_eq!(generate_password(16, 16).len(), 16);
    }

    #[test]
    fn alphanumeric_only() {
        let password = generate_default_password();
        assert!(password.chars().all(|c| c.is_ascii_alphanumeric()));
        assert!((DEFAULT_MIN_LEN..=DEFAULT_MAX_LEN).contains(&password.len()));
    }
}
