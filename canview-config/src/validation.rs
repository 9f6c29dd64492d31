//! Custom validation functions for configuration.
//!
//! Shared validation logic used across multiple configuration modules.

use once_cell::sync::Lazy;
use regex::Regex;
use validator::ValidationError;

static CLIP_NAME: Lazy<Result<Regex, regex::Error>> =
    Lazy::new(|| Regex::new("^[A-Za-z0-9_.-]+$"));

/// Validate a CORS method list against the HTTP methods the relay can serve.
pub fn validate_methods(methods: &[String]) -> Result<(), ValidationError> {
    const KNOWN: [&str; 7] = ["GET", "POST", "PUT", "PATCH", "DELETE", "HEAD", "OPTIONS"];
    if methods
        .iter()
        .all(|m| KNOWN.contains(&m.to_ascii_uppercase().as_str()))
    {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_http_method"))
    }
}

/// Validate CORS origins: `*` or absolute `http(s)://` origins.
pub fn validate_origins(origins: &[String]) -> Result<(), ValidationError> {
    let valid = origins.iter().all(|o| {
        o == "*" || o.starts_with("http://") || o.starts_with("https://")
    });
    if valid {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_origin"))
    }
}

/// Validate log level names understood by the tracing filter.
pub fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    let valid = ["trace", "debug", "info", "warn", "error"]
        .contains(&level.to_lowercase().as_str());
    if valid {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_log_level"))
    }
}

/// Validate clip names as they appear in exported model files.
pub fn validate_clip_name(name: &str) -> Result<(), ValidationError> {
    let re = CLIP_NAME
        .as_ref()
        .map_err(|_| ValidationError::new("invalid_regex"))?;
    if re.is_match(name) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_clip_name"))
    }
}

/// Validate websocket endpoints.
pub fn validate_ws_url(url: &str) -> Result<(), ValidationError> {
    if url.starts_with("ws://") || url.starts_with("wss://") {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_ws_url"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn methods_are_case_insensitive() {
        assert!(validate_methods(&["get".into(), "POST".into()]).is_ok());
        assert!(validate_methods(&["FETCH".into()]).is_err());
    }

    #[test]
    fn origins_require_scheme_or_wildcard() {
        assert!(validate_origins(&["*".into()]).is_ok());
        assert!(validate_origins(&["http://localhost:3000".into()]).is_ok());
        assert!(validate_origins(&["localhost:3000".into()]).is_err());
    }

    #[test]
    fn clip_names() {
        assert!(validate_clip_name("Doors_LAction").is_ok());
        assert!(validate_clip_name("hood action").is_err());
        assert!(validate_clip_name("").is_err());
    }

    #[test]
    fn ws_urls() {
        assert!(validate_ws_url("ws://localhost:5001/ws").is_ok());
        assert!(validate_ws_url("http://localhost:5001").is_err());
    }
}
