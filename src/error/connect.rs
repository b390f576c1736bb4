use std::time::Duration;

/// Why an outbound connection attempt did not produce a stream.
#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    #[error("Connect timed out after {0:?}")]
    Timeout(Duration),

    #[error("No endpoint to connect to")]
    NoEndpoint,

    #[error("Io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConnectError {
    /// Timeouts are reported apart from transport errors.
    #[inline]
    pub const fn is_timeout(&self) -> bool { matches!(self, ConnectError::Timeout(_)) }
}
