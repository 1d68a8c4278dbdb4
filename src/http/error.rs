use thiserror::Error;

/// Failures raised while reading a request or writing its response.
#[derive(Debug, Error)]
pub enum HttpError {
    /// Request line or a header line does not follow the minimal grammar.
    #[error("malformed request: {0}")]
    MalformedRequest(String),

    /// Declared `Content-Length` exceeds the body cap.
    #[error("payload too large: {declared} bytes declared, limit is {limit}")]
    PayloadTooLarge { declared: usize, limit: usize },

    /// The peer closed the stream in the middle of a request.
    #[error("peer disconnected mid-request")]
    PeerDisconnected,

    /// A second response was written for one exchange.
    #[error("a response has already been written for this exchange")]
    DoubleResponse,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl HttpError {
    /// Whether the transport is gone, in which case no response is attempted.
    pub fn is_transport(&self) -> bool {
        matches!(self, HttpError::PeerDisconnected | HttpError::Io(_))
    }
}
