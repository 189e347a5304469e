//! Error types surfaced by the library.
//!
//! `QueryError` describes why one source call failed; the engine records it and
//! moves on. `WriteError` is returned by the report writer.

/// Per-source, per-call failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("Bad Request: Invalid request body")]
    BadRequest,
    #[error("Unauthorized: Missing or invalid API key")]
    Unauthorized,
    #[error("Payment Required: Insufficient credits")]
    PaymentRequired,
    #[error("Forbidden: Invalid request origin")]
    Forbidden,
    #[error("Internal Server Error")]
    ServerError,
    #[error("Unexpected status code: {0}")]
    Unexpected(u16),
    #[error("malformed response: {0}")]
    Decode(String),
}

impl QueryError {
    /// Map a non-success HTTP status to its error kind.
    pub fn from_status(code: u16) -> Self {
        match code {
            400 => QueryError::BadRequest,
            401 => QueryError::Unauthorized,
            402 => QueryError::PaymentRequired,
            403 => QueryError::Forbidden,
            500 => QueryError::ServerError,
            other => QueryError::Unexpected(other),
        }
    }

    /// Errors that will fail identically for every remaining source.
    pub fn is_account_level(&self) -> bool {
        matches!(self, QueryError::Unauthorized | QueryError::PaymentRequired)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    #[error("Permission denied: cannot write to {path}")]
    Permission { path: String },
    #[error("File system error writing {path}: {source}")]
    Filesystem {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Not enough memory to buffer {records} records")]
    ResourceExhausted { records: usize },
}

impl WriteError {
    /// Short remediation hint shown under the error.
    pub fn hint(&self) -> &'static str {
        match self {
            WriteError::Permission { .. } => {
                "Try running with different permissions or change directory"
            }
            WriteError::Filesystem { .. } => "Check disk space and file path validity",
            WriteError::ResourceExhausted { .. } => {
                "Try searching with smaller result sets or increase system memory"
            }
        }
    }

    pub(crate) fn from_io(path: &std::path::Path, err: std::io::Error) -> Self {
        let path = path.display().to_string();
        match err.kind() {
            std::io::ErrorKind::PermissionDenied => WriteError::Permission { path },
            std::io::ErrorKind::OutOfMemory => WriteError::ResourceExhausted { records: 0 },
            _ => WriteError::Filesystem { path, source: err },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_map_to_kinds() {
        assert_eq!(QueryError::from_status(400), QueryError::BadRequest);
        assert_eq!(QueryError::from_status(401), QueryError::Unauthorized);
        assert_eq!(QueryError::from_status(402), QueryError::PaymentRequired);
        assert_eq!(QueryError::from_status(403), QueryError::Forbidden);
        assert_eq!(QueryError::from_status(500), QueryError::ServerError);
        assert_eq!(QueryError::from_status(429), QueryError::Unexpected(429));
        assert_eq!(
            QueryError::from_status(503).to_string(),
            "Unexpected status code: 503"
        );
    }

    #[test]
    fn io_errors_classify_by_kind() {
        let p = std::path::Path::new("out.txt");
        let e = WriteError::from_io(p, std::io::Error::from(std::io::ErrorKind::PermissionDenied));
        assert!(matches!(e, WriteError::Permission { .. }));
        assert!(e.to_string().contains("out.txt"));
        let e = WriteError::from_io(p, std::io::Error::from(std::io::ErrorKind::NotFound));
        assert!(matches!(e, WriteError::Filesystem { .. }));
        assert_ne!(e.hint(), WriteError::Permission { path: String::new() }.hint());
    }
}
