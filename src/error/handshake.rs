#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum HandshakeError {
    #[error("Missing sec-websocket-key header")]
    SecWebSocketKey,

    #[error("Missing or illegal sec-websocket-accept header")]
    SecWebSocketAccept,

    #[error("Illegal http status code {0}, expect 101")]
    HttpStatusCode(u16),
}
