#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    #[error("Http parse error: {0}")]
    Httparse(#[from] httparse::Error),

    #[error("Illegal content-length header")]
    ContentLength,

    #[error("Illegal chunk size line")]
    ChunkSize,

    #[error("Missing CRLF after chunk data")]
    ChunkTerminator,

    #[error("Header block exceeds the limit of {0} bytes")]
    HeadTooLarge(usize),

    #[error("Body of {0} bytes exceeds the limit of {1} bytes")]
    BodyTooLarge(u64, usize),
}

impl From<httparse::InvalidChunkSize> for HttpError {
    fn from(_: httparse::InvalidChunkSize) -> Self { HttpError::ChunkSize }
}
