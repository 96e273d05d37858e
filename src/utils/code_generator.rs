//! Short code generation.
//!
//! Codes are drawn uniformly from the 62-character alphanumeric alphabet using
//! the operating system CSPRNG. The generator makes no uniqueness promise:
//! uniqueness is enforced by the storage constraint and the caller retries on
//! conflict.

/// Alphabet used for generated codes.
pub const ALPHABET: &[u8; 62] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Code length used when none is configured.
pub const DEFAULT_CODE_LENGTH: usize = 6;

/// Longest code the storage column accepts.
pub const MAX_CODE_LENGTH: usize = 16;

/// Bytes at or above this value are rejected so that `byte % 62` stays uniform.
const ACCEPT_BELOW: u8 = (256 - 256 % ALPHABET.len()) as u8;

#[derive(Debug, thiserror::Error)]
pub enum CodeGenError {
    #[error("code length must be between 1 and {MAX_CODE_LENGTH}, got {0}")]
    InvalidLength(usize),

    #[error("system random source failed: {0}")]
    Entropy(String),
}

/// Generates a random short code of exactly `length` characters.
///
/// # Errors
///
/// Returns [`CodeGenError::InvalidLength`] for `0` or lengths above
/// [`MAX_CODE_LENGTH`], and [`CodeGenError::Entropy`] if the system random
/// source is unavailable.
///
/// # Examples
///
/// ```ignore
/// let code = generate_code(6)?;
/// assert_eq!(code.len(), 6);
/// assert!(code.chars().all(|c| c.is_ascii_alphanumeric()));
/// ```
pub fn generate_code(length: usize) -> Result<String, CodeGenError> {
    if length == 0 || length > MAX_CODE_LENGTH {
        return Err(CodeGenError::InvalidLength(length));
    }

    let mut code = String::with_capacity(length);
    // Rejection discards ~3% of bytes, so one refill is almost always enough.
    let mut buffer = [0u8; MAX_CODE_LENGTH * 2];

    while code.len() < length {
        getrandom::fill(&mut buffer).map_err(|e| CodeGenError::Entropy(e.to_string()))?;

        for &byte in buffer.iter().filter(|&&b| b < ACCEPT_BELOW) {
            if code.len() == length {
                break;
            }
            code.push(ALPHABET[(byte as usize) % ALPHABET.len()] as char);
        }
    }

    Ok(code)
}

/// Returns true if `code` could have been produced by [`generate_code`].
///
/// Used to reject malformed path segments before touching cache or storage.
pub fn is_valid_code(code: &str) -> bool {
    !code.is_empty() && code.len() <= MAX_CODE_LENGTH && code.bytes().all(|b| b.is_ascii_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashMap, HashSet};

    #[test]
    fn test_generate_code_has_requested_length() {
        for length in [1, 4, 6, 8, MAX_CODE_LENGTH] {
            let code = generate_code(length).unwrap();
            assert_eq!(code.len(), length);
        }
    }

    #[test]
    fn test_generate_code_uses_alphabet_only() {
        for _ in 0..200 {
            let code = generate_code(DEFAULT_CODE_LENGTH).unwrap();
            assert!(code.bytes().all(|b| ALPHABET.contains(&b)), "bad code {code}");
        }
    }

    #[test]
    fn test_generate_code_rejects_zero_length() {
        assert!(matches!(
            generate_code(0),
            Err(CodeGenError::InvalidLength(0))
        ));
    }

    #[test]
    fn test_generate_code_rejects_oversized_length() {
        assert!(generate_code(MAX_CODE_LENGTH + 1).is_err());
    }

    #[test]
    fn test_generate_code_produces_unique_codes() {
        let codes: HashSet<String> = (0..10_000)
            .map(|_| generate_code(DEFAULT_CODE_LENGTH).unwrap())
            .collect();

        // 62^6 possible codes; a handful of collisions would already be suspicious.
        assert!(codes.len() >= 9_995);
    }

    #[test]
    fn test_generate_code_covers_alphabet() {
        let mut seen: HashMap<char, usize> = HashMap::new();
        for _ in 0..2_000 {
            for c in generate_code(MAX_CODE_LENGTH).unwrap().chars() {
                *seen.entry(c).or_default() += 1;
            }
        }

        assert_eq!(seen.len(), ALPHABET.len());
    }

    #[test]
    fn test_accept_threshold_is_multiple_of_alphabet() {
        assert_eq!(ACCEPT_BELOW as usize % ALPHABET.len(), 0);
        assert_eq!(ACCEPT_BELOW, 248);
    }

    #[test]
    fn test_is_valid_code() {
        assert!(is_valid_code("aB3xYz"));
        assert!(!is_valid_code(""));
        assert!(!is_valid_code("abc-12"));
        assert!(!is_valid_code("abc/12"));
        assert!(!is_valid_code(&"a".repeat(MAX_CODE_LENGTH + 1)));
    }
}
