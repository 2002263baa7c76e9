use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Network error for {url}: {message}")]
    Network { url: String, message: String },

    #[error("Failed {url}: {status} {reason}")]
    Status {
        url: String,
        status: u16,
        reason: String,
    },

    #[error("Invalid response from {url}: {message}")]
    Decode { url: String, message: String },

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl FetchError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    pub fn from_status(url: &str, status: u16, body: &str) -> Self {
        let reason = match status {
            404 => "Not Found".to_string(),
            500..=599 if body.trim().is_empty() => "Server Error".to_string(),
            _ if body.trim().is_empty() => "Unexpected Status".to_string(),
            _ => Self::truncate_body(body.trim()),
        };
        FetchError::Status {
            url: url.to_string(),
            status,
            reason,
        }
    }

    pub fn network(url: &str, err: impl std::fmt::Display) -> Self {
        FetchError::Network {
            url: url.to_string(),
            message: err.to_string(),
        }
    }

    /// HTTP status carried by this error, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_truncates_long_body() {
        let body = "x".repeat(MAX_ERROR_BODY_LENGTH + 20);
        let err = FetchError::from_status("http://host/api/bundle", 502, &body);
        let msg = err.to_string();
        assert!(msg.contains("truncated"));
        assert!(msg.contains("502"));
        assert_eq!(err.status(), Some(502));
    }

    #[test]
    fn test_from_status_empty_body_uses_reason() {
        let err = FetchError::from_status("http://host/api/bundle", 404, "");
        assert_eq!(err.to_string(), "Failed http://host/api/bundle: 404 Not Found");
    }

    #[test]
    fn test_network_has_no_status() {
        let err = FetchError::network("http://host/a.png", "connection refused");
        assert_eq!(err.status(), None);
        assert!(err.to_string().contains("connection refused"));
    }
}
