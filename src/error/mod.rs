//! Errors

mod connect;
mod frame;
mod handshake;
mod http;

pub use connect::ConnectError;
pub use frame::FrameError;
pub use handshake::HandshakeError;
pub use http::HttpError;

/// Any failure raised while framing bytes of an established session.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Frame error: {0}")]
    Frame(#[from] FrameError),

    #[error("Handshake error: {0}")]
    Handshake(#[from] HandshakeError),

    #[error("Http error: {0}")]
    Http(#[from] HttpError),

    #[error("Connect error: {0}")]
    Connect(#[from] ConnectError),

    #[error("Io error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod test {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn wrap_source() {
        let e = Error::from(HttpError::from(httparse::Error::Token));
        assert!(e.to_string().starts_with("Http error"));
        assert!(e.source().is_some());

        let e = Error::from(FrameError::IllegalOpCode);
        assert_eq!(e.to_string(), "Frame error: Illegal opcode value");
    }
}
