use thiserror::Error;

#[derive(Error, Debug)]
pub enum PadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Snapshot error: {0}")]
    Snapshot(String),

    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),
}

/// Failures at the remote key/value boundary. Transport problems and
/// server-side rejections are separate variants because the caller treats
/// them differently: transport flips the reachability flag, rejections get
/// logged as misconfiguration.
#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("transport: {0}")]
    Transport(String),

    #[error("rejected with status {status}: {message}")]
    Rejected { status: i32, message: String },
}

impl RemoteError {
    /// Rate-limit responses are retried on the next scheduled cycle, same as
    /// a transport failure.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, RemoteError::Rejected { status: 429, .. })
    }
}

/// Convenience type alias for Results with PadError
pub type Result<T> = std::result::Result<T, PadError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let pad_err: PadError = io_err.into();
        assert!(matches!(pad_err, PadError::Io(_)));
        assert!(pad_err.to_string().contains("file not found"));
    }

    #[test]
    fn test_remote_error_display() {
        let err = RemoteError::Rejected { status: 401, message: "Invalid passcode.".into() };
        assert_eq!(err.to_string(), "rejected with status 401: Invalid passcode.");
        assert!(!err.is_rate_limited());

        let err = RemoteError::Rejected { status: 429, message: "Too many write requests.".into() };
        assert!(err.is_rate_limited());
    }
}
