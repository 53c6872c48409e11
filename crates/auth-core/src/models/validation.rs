//! Name normalization and format validation for groups and tokens.

use regex::Regex;
use std::sync::OnceLock;

static TOKEN_NAME_REGEX: OnceLock<Regex> = OnceLock::new();

/// Lowercase DNS-like token alias, 2-64 chars: alphanumeric first and last
/// char, alphanumeric-or-hyphen in between.
pub fn validate_token_name(name: &str) -> Result<String, String> {
    let normalized = name.to_lowercase();
    let regex = TOKEN_NAME_REGEX
        .get_or_init(|| Regex::new(r"^[a-z0-9][a-z0-9-]{0,62}[a-z0-9]$").unwrap());

    if regex.is_match(&normalized) {
        Ok(normalized)
    } else {
        Err(format!("invalid token name format: {}", name))
    }
}

/// Group names are normalized to lowercase and must be non-empty.
pub fn normalize_group_name(name: &str) -> Result<String, String> {
    let normalized = name.trim().to_lowercase();
    if normalized.is_empty() {
        Err("group name must not be empty".to_string())
    } else {
        Ok(normalized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_token_names() {
        assert_eq!(validate_token_name("prod-api").unwrap(), "prod-api");
        assert_eq!(validate_token_name("PROD-API").unwrap(), "prod-api");
        assert_eq!(validate_token_name("a1").unwrap(), "a1");
    }

    #[test]
    fn invalid_token_names() {
        assert!(validate_token_name("a").is_err()); // too short
        assert!(validate_token_name("-leading").is_err());
        assert!(validate_token_name("trailing-").is_err());
        assert!(validate_token_name("has spaces").is_err());
        assert!(validate_token_name("").is_err());
    }

    #[test]
    fn group_name_normalization() {
        assert_eq!(normalize_group_name("  Admin  ").unwrap(), "admin");
        assert!(normalize_group_name("   ").is_err());
    }
}
