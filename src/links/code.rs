use rand::RngExt;

/// Base62 alphabet used for generated codes
const ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// Path segments owned by the application's own routes
pub const RESERVED_CODES: &[&str] = &["api", "assets", "dashboard", "health", "sign-in", "sign-up"];

pub fn generate_short_code(length: usize) -> String {
    let mut rng = rand::rng();
    (0..length)
        .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char)
        .collect()
}

pub fn is_reserved(code: &str) -> bool {
    RESERVED_CODES
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(code))
}

/// Checks a caller-chosen code. Returns the reason on failure.
pub fn validate_custom_code(code: &str, max_length: usize) -> Result<(), String> {
    if code.is_empty() || code.len() > max_length {
        return Err(format!("Short code must be 1-{max_length} characters"));
    }

    if !code
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(
            "Short code may only contain letters, digits, '-' and '_'".to_string(),
        );
    }

    if is_reserved(code) {
        return Err(format!("Short code '{code}' is reserved"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_codes_use_base62_and_requested_length() {
        for len in [1, 7, 12] {
            let code = generate_short_code(len);
            assert_eq!(code.len(), len);
            assert!(code.bytes().all(|b| ALPHABET.contains(&b)));
        }
    }

    #[test]
    fn custom_code_rules() {
        assert!(validate_custom_code("gh-trend", 32).is_ok());
        assert!(validate_custom_code("npm_react2", 32).is_ok());

        assert!(validate_custom_code("", 32).unwrap_err().contains("1-32"));
        assert!(validate_custom_code("toolong", 5).unwrap_err().contains("1-5"));
        assert!(validate_custom_code("has space", 32).is_err());
        assert!(validate_custom_code("slash/inside", 32).is_err());
        assert!(validate_custom_code("Dashboard", 32)
            .unwrap_err()
            .contains("reserved"));
    }
}
