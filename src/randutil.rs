//! Random name components.

use rand::Rng;

const ALNUM: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// A random lowercase-alphanumeric token, used for generated cluster
/// name suffixes and worker output-name prefixes. Lowercase only, since
/// the tokens end up in DNS-1123 names and S3 keys.
pub fn string(n: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..n)
        .map(|_| ALNUM[rng.gen_range(0..ALNUM.len())] as char)
        .collect()
}

const HEX: &[u8] = b"0123456789abcdef";

/// A random hex token, e.g. for proxy secret tokens.
pub fn hex_string(n: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..n)
        .map(|_| HEX[rng.gen_range(0..HEX.len())] as char)
        .collect()
}

/// True when every character is a hex digit.
pub fn is_hex(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn story_hex_tokens_decode() {
        let s = hex_string(32);
        assert_eq!(s.len(), 32);
        assert!(is_hex(&s));
        assert!(!is_hex("not-hex"));
    }

    #[test]
    fn story_tokens_are_lowercase_alnum() {
        for _ in 0..50 {
            let s = string(10);
            assert_eq!(s.len(), 10);
            assert!(s
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
        }
    }
}
