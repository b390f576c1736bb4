//! Server handshake.
//!
//! From [RFC-6455 Section 4.2](https://datatracker.ietf.org/doc/html/rfc6455#section-4.2):
//!
//! If the server chooses to accept the incoming connection, it MUST
//! reply with a valid HTTP response.
//!
//! Example:
//!
//! ```text
//! HTTP/1.1 101 Switching Protocols
//! upgrade: websocket
//! connection: upgrade
//! sec-websocket-accept: s3pPLMBiTxaQ9kYGzzhZRbK+xOo=
//! ```
//!

use bytes::{Bytes, BytesMut};

use super::HttpHeader;
use super::derive_accept_key;
use super::{HTTP_STATUS_LINE, HTTP_LINE_BREAK};
use super::static_headers::*;

use crate::error::HandshakeError;

/// Http response presentation.
pub struct Response<'h, 'b> {
    pub sec_accept: &'b [u8],
    pub other_headers: &'h [HttpHeader<'b>],
}

impl<'h, 'b> Response<'h, 'b> {
    /// Create with the accept key, without extra headers.
    #[inline]
    pub const fn new(sec_accept: &'b [u8]) -> Self {
        Self {
            sec_accept,
            other_headers: &[],
        }
    }

    /// Encode the response.
    ///
    /// Necessary headers, including `upgrade`, `connection`, and
    /// `sec-websocket-accept` are written first,
    /// then other headers(if any) are written in order.
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(160);

        // HTTP/1.1 101 Switching Protocols
        buf.extend_from_slice(HTTP_STATUS_LINE);
        buf.extend_from_slice(HTTP_LINE_BREAK);

        let required = [
            HttpHeader::new(HEADER_UPGRADE_NAME.as_bytes(), HEADER_UPGRADE_VALUE.as_bytes()),
            HttpHeader::new(
                HEADER_CONNECTION_NAME.as_bytes(),
                HEADER_CONNECTION_VALUE.as_bytes(),
            ),
            HttpHeader::new(HEADER_SEC_WEBSOCKET_ACCEPT_NAME.as_bytes(), self.sec_accept),
        ];

        for hdr in required.iter().chain(self.other_headers.iter()) {
            hdr.write_to(&mut buf);
        }

        // finish with CRLF
        buf.extend_from_slice(HTTP_LINE_BREAK);

        buf.freeze()
    }
}

/// Build the whole `101` answer for a client's `sec-websocket-key`.
pub fn accept_response(sec_key: &str) -> Result<Bytes, HandshakeError> {
    let sec_key = sec_key.trim();
    if sec_key.is_empty() {
        return Err(HandshakeError::SecWebSocketKey);
    }

    let sec_accept = derive_accept_key(sec_key.as_bytes());
    Ok(Response::new(sec_accept.as_bytes()).encode())
}
