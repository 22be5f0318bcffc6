//! Upstream API error types.

use thiserror::Error;

/// Errors returned by the GitHub client.
#[derive(Debug, Error)]
pub enum GithubError {
    /// The API answered with a non-2xx status.
    #[error("upstream returned HTTP {status} for {url}")]
    Upstream {
        /// HTTP status code.
        status: u16,
        /// Request URL (without query string).
        url: String,
    },

    /// The API answered 2xx but the body did not have the expected shape.
    #[error("unexpected response shape from {context}: {message}")]
    Schema {
        /// Which listing was being decoded.
        context: String,
        /// Decoder or validation message.
        message: String,
    },

    /// Network, TLS, or timeout failure before a response was received.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The client could not be built from the given settings.
    #[error("invalid client configuration: {0}")]
    Config(String),
}

impl GithubError {
    pub(crate) fn schema(context: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Schema {
            context: context.into(),
            message: message.into(),
        }
    }

    /// Short machine-readable label, used for metrics and sync reports.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Upstream { .. } => "upstream",
            Self::Schema { .. } => "schema",
            Self::Transport(_) => "transport",
            Self::Config(_) => "config",
        }
    }
}

/// Result type for GitHub client operations.
pub type Result<T> = std::result::Result<T, GithubError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_display() {
        let err = GithubError::Upstream {
            status: 502,
            url: "https://api.github.com/user/repos".into(),
        };
        assert_eq!(
            err.to_string(),
            "upstream returned HTTP 502 for https://api.github.com/user/repos"
        );
        assert_eq!(err.kind(), "upstream");
    }

    #[test]
    fn schema_display() {
        let err = GithubError::schema("branches of o/r", "missing field `name`");
        assert_eq!(
            err.to_string(),
            "unexpected response shape from branches of o/r: missing field `name`"
        );
        assert_eq!(err.kind(), "schema");
    }
}
