//! Storage client error type.

/// Error returned by an object-store request.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Curl reported an error (timeout, connection, etc.).
    #[error("{0}")]
    Curl(#[from] curl::Error),
    /// Non-success HTTP status; `body` holds the start of the response body.
    #[error("HTTP {status}{}", body_suffix(.body))]
    Http { status: u32, body: String },
    /// Reading the local file being sent failed.
    #[error("local file: {0}")]
    Io(#[from] std::io::Error),
    /// The storage URL or an object path could not be turned into a URL.
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
    /// Manifest serialization failed.
    #[error("manifest encoding: {0}")]
    Json(#[from] serde_json::Error),
    /// The store accepted an object but sent no ETag.
    #[error("no ETag in response for {object}")]
    MissingEtag { object: String },
}

fn body_suffix(body: &str) -> String {
    if body.is_empty() {
        String::new()
    } else {
        format!(": {}", body)
    }
}

impl StoreError {
    /// True for 401/403: the token is wrong or expired.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, StoreError::Http { status: 401 | 403, .. })
    }
}
