use std::time::Duration;

use crate::error::Result;
use crate::validation::validate_fqdn_ascii;

#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub api_url: String, // "http://127.0.0.1:8081/api/v1"
    pub api_key: String,
    pub timeout: Option<Duration>,
    pub server_id: String, // usually "localhost"
}

impl ClientConfig {
    pub fn new(api_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            api_key: api_key.into(),
            timeout: None,
            server_id: "localhost".into(),
        }
    }

    /// API base URL without trailing slash, ready for path concatenation.
    pub fn api_base(&self) -> &str {
        self.api_url.trim_end_matches('/')
    }
}

/// Trim, validate and dot-terminate a user supplied DNS name.
pub fn normalize_fqdn(input: &str) -> Result<String> {
    let trimmed = input.trim().trim_end_matches('.');
    validate_fqdn_ascii(trimmed)?;
    Ok(format!("{}.", trimmed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_base_strips_trailing_slash() {
        let cfg = ClientConfig::new("http://127.0.0.1:8081/api/v1/", "key");
        assert_eq!(cfg.api_base(), "http://127.0.0.1:8081/api/v1");
        assert_eq!(cfg.server_id, "localhost");
    }

    #[test]
    fn normalize_fqdn_adds_single_dot() {
        assert_eq!(normalize_fqdn(" example.com ").unwrap(), "example.com.");
        assert_eq!(normalize_fqdn("example.com.").unwrap(), "example.com.");
        assert!(matches!(
            normalize_fqdn(""),
            Err(crate::Error::Validation(crate::validation::ValidationError::Empty))
        ));
        assert!(matches!(
            normalize_fqdn("-bad.example"),
            Err(crate::Error::Validation(_))
        ));
    }
}
