//! Unified error type for frost-signal.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Weather API error: {0}")]
    Weather(String),

    #[error("Price history error: {0}")]
    PriceHistory(String),

    #[error("Insufficient data: need at least {needed} prices, got {got}")]
    InsufficientData { needed: usize, got: usize },

    #[error("State store error: {0}")]
    Store(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Longest upstream error body kept in an error message, in characters.
pub const BODY_EXCERPT_CHARS: usize = 500;

/// Leading slice of an upstream error body for log and error messages.
/// Cuts on character boundaries so localized error pages cannot panic.
pub fn body_excerpt(body: &str) -> String {
    body.chars().take(BODY_EXCERPT_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_excerpt_cuts_on_char_boundary() {
        // 499 ASCII bytes, then a 3-byte character straddling byte 500.
        let body = format!("{}€ tail", "x".repeat(499));
        let excerpt = body_excerpt(&body);

        assert_eq!(excerpt.chars().count(), BODY_EXCERPT_CHARS);
        assert!(excerpt.ends_with('€'));
    }

    #[test]
    fn test_short_body_kept_whole() {
        assert_eq!(body_excerpt("Bad Gateway"), "Bad Gateway");
    }
}
