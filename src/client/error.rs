//! Error types for the Kibana client layer.

use thiserror::Error;

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while talking to Kibana.
#[derive(Error, Debug)]
pub enum Error {
    /// The HTTP call itself failed (DNS, connect, TLS, timeout).
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-success response from the backend.
    #[error("{method} API call to {url} failed. Code: {status}, Body: {body}, Message: {message}")]
    Api {
        method: String,
        url: String,
        status: u16,
        body: String,
        message: String,
    },

    /// The object does not exist (or the backend reported it as missing).
    #[error("{message}: not found at {url} (status {status})")]
    NotFound {
        url: String,
        status: u16,
        body: String,
        message: String,
    },

    /// Response body did not have the expected shape.
    #[error("{context}, error: {source}, response body: {body}")]
    Decode {
        context: String,
        body: String,
        #[source]
        source: serde_json::Error,
    },

    /// Login handshake failed.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// The identity provider rejected the one-time MFA code.
    #[error("The MFA code sent was rejected or expired")]
    MfaRejected,

    /// The request could not be built from the given input.
    #[error("{0}")]
    Precondition(String),

    /// Operation is not available on this wire format.
    #[error("{0} is not implemented for this Kibana version")]
    NotImplemented(&'static str),

    /// Operation is not available for this authentication handler.
    #[error("{0} is not supported by the {1} authentication handler")]
    Unsupported(&'static str, &'static str),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl Error {
    /// True when the error means the object is gone.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_auth_error(&self) -> bool {
        matches!(self, Self::Auth(_) | Self::MfaRejected)
    }

    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } | Self::NotFound { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub(crate) fn decode(context: impl Into<String>, body: &str, source: serde_json::Error) -> Self {
        Self::Decode {
            context: context.into(),
            body: body.to_string(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_not_found() {
        let err = Error::NotFound {
            url: "http://localhost:5601/api/saved_objects/search/x".to_string(),
            status: 404,
            body: String::new(),
            message: "Could not fetch search".to_string(),
        };
        assert!(err.is_not_found());
        assert_eq!(err.status(), Some(404));

        let err = Error::Api {
            method: "GET".to_string(),
            url: "http://localhost:5601".to_string(),
            status: 400,
            body: "bad".to_string(),
            message: "Could not fetch search".to_string(),
        };
        assert!(!err.is_not_found());
        assert!(err.to_string().contains("Code: 400"));
    }

    #[test]
    fn test_is_auth_error() {
        assert!(Error::MfaRejected.is_auth_error());
        assert!(Error::Auth("no csrf".to_string()).is_auth_error());
        assert!(!Error::NotImplemented("List").is_auth_error());
    }

    #[test]
    fn test_decode_keeps_body() {
        let source = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = Error::decode("could not parse search", "{", source);
        assert!(err.to_string().contains("response body: {"));
    }
}
