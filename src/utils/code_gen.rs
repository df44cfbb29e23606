//! Short code generation and validation
//!
//! Codes are fixed-length strings over `[A-Za-z0-9]`. Random generation is
//! the primary source; `derive_from_content` is a hash-based fallback.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use xxhash_rust::xxh64::xxh64;

/// 短码字符集
pub const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Default code length, 62^7 ≈ 3.5e12 codes
pub const DEFAULT_CODE_LENGTH: usize = 7;

#[derive(Debug, Clone, Copy)]
pub struct CodeGenerator {
    length: usize,
}

impl Default for CodeGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_CODE_LENGTH)
    }
}

impl CodeGenerator {
    pub fn new(length: usize) -> Self {
        Self {
            length: length.max(1),
        }
    }

    pub fn length(&self) -> usize {
        self.length
    }

    /// Uniformly random code of the configured length.
    pub fn generate(&self) -> String {
        std::iter::repeat_with(random_symbol)
            .take(self.length)
            .collect()
    }

    /// Length and alphabet check only. Runs before any tier is touched.
    pub fn validate(&self, code: &str) -> bool {
        code.len() == self.length && code.bytes().all(is_alphabet_byte)
    }

    /// Deterministic code derived from `seed` (target + timestamp).
    ///
    /// The seed is hashed, base64-encoded and truncated. Characters outside
    /// the alphabet (`+`, `/`) are replaced by a random symbol in place, so
    /// the result is only deterministic when no replacement was needed.
    pub fn derive_from_content(&self, seed: &str) -> String {
        let mut digest = Vec::with_capacity(self.length);
        let mut round = 0u64;
        // 6 bits per base64 char, 8 bytes per round
        while digest.len() * 8 < self.length * 6 {
            digest.extend_from_slice(&xxh64(seed.as_bytes(), round).to_be_bytes());
            round += 1;
        }

        STANDARD
            .encode(&digest)
            .bytes()
            .take(self.length)
            .map(|b| {
                if is_alphabet_byte(b) {
                    b as char
                } else {
                    random_symbol()
                }
            })
            .collect()
    }
}

#[inline]
fn is_alphabet_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric()
}

#[inline]
fn random_symbol() -> char {
    ALPHABET[rand::random_range(0..ALPHABET.len())] as char
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generate_length_and_alphabet() {
        let generator = CodeGenerator::default();
        for _ in 0..200 {
            let code = generator.generate();
            assert_eq!(code.len(), 7);
            assert!(generator.validate(&code), "invalid code {}", code);
        }
    }

    #[test]
    fn test_generate_is_spread_out() {
        let generator = CodeGenerator::default();
        let codes: HashSet<String> = (0..1000).map(|_| generator.generate()).collect();
        // 62^7 空间，1000 次几乎不可能碰撞
        assert!(codes.len() >= 999);
    }

    #[test]
    fn test_validate_rejects_bad_codes() {
        let generator = CodeGenerator::new(7);
        assert!(generator.validate("ABC1234"));
        assert!(generator.validate("mySite1"));
        assert!(!generator.validate("ABC123"));
        assert!(!generator.validate("ABC12345"));
        assert!(!generator.validate("ABC-234"));
        assert!(!generator.validate("ABC 234"));
        assert!(!generator.validate("ÄBC1234"));
        assert!(!generator.validate(""));
    }

    #[test]
    fn test_derive_from_content_valid_code() {
        let generator = CodeGenerator::default();
        for i in 0..200 {
            let code = generator.derive_from_content(&format!("https://example.com/{}", i));
            assert!(generator.validate(&code), "invalid derived code {}", code);
        }
    }

    #[test]
    fn test_derive_from_content_mostly_deterministic() {
        let generator = CodeGenerator::default();
        let seed = "https://example.com|1700000000";
        let a = generator.derive_from_content(seed);
        let b = generator.derive_from_content(seed);
        // 只有被替换的位置可能不同
        let expected = STANDARD.encode(xxh64(seed.as_bytes(), 0).to_be_bytes());
        for ((x, y), e) in a.chars().zip(b.chars()).zip(expected.chars()) {
            if e.is_ascii_alphanumeric() {
                assert_eq!(x, e);
                assert_eq!(y, e);
            }
        }
    }

    #[test]
    fn test_long_codes_use_multiple_rounds() {
        let generator = CodeGenerator::new(32);
        let code = generator.derive_from_content("seed");
        assert_eq!(code.len(), 32);
        assert!(generator.validate(&code));
    }
}
