//! Websocket opening handshake.
//!
//! Only the encoding side lives here: requests and responses are parsed
//! by the session's [`HttpParser`](crate::http::HttpParser).

pub mod key;
pub mod request;
pub mod response;

pub use request::Request;
pub use response::{Response, accept_response};
pub use key::{new_sec_key, derive_accept_key};

use bytes::BytesMut;

/// 258EAFA5-E914-47DA-95CA-C5AB0DC85B11
pub const GUID: &[u8] = b"258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// GET
pub const HTTP_METHOD: &[u8] = b"GET";

/// HTTP/1.1
pub const HTTP_VERSION: &[u8] = b"HTTP/1.1";

/// CRLF
pub const HTTP_LINE_BREAK: &[u8] = b"\r\n";

/// A colon + one SP is prefered
pub const HTTP_HEADER_SP: &[u8] = b": ";

/// HTTP/1.1 101 Switching Protocols
pub const HTTP_STATUS_LINE: &[u8] = b"HTTP/1.1 101 Switching Protocols";

/// Http header, take two references
#[allow(clippy::len_without_is_empty)]
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct HttpHeader<'h> {
    pub name: &'h [u8],
    pub value: &'h [u8],
}

impl<'h> HttpHeader<'h> {
    /// Constructor, take provided name and value.
    #[inline]
    pub const fn new(name: &'h [u8], value: &'h [u8]) -> Self { Self { name, value } }

    /// Total number of bytes(name + value + sp + crlf).
    #[inline]
    pub const fn len(&self) -> usize {
        self.name.len() + self.value.len() + HTTP_HEADER_SP.len() + HTTP_LINE_BREAK.len()
    }

    /// Append `name: value\r\n`.
    #[inline]
    pub(crate) fn write_to(&self, buf: &mut BytesMut) {
        buf.reserve(self.len());
        buf.extend_from_slice(self.name);
        buf.extend_from_slice(HTTP_HEADER_SP);
        buf.extend_from_slice(self.value);
        buf.extend_from_slice(HTTP_LINE_BREAK);
    }
}

impl<'h> std::fmt::Display for HttpHeader<'h> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {}",
            String::from_utf8_lossy(self.name),
            String::from_utf8_lossy(self.value)
        )
    }
}

/// Static http headers
pub mod static_headers {
    pub const HEADER_HOST_NAME: &str = "host";

    pub const HEADER_UPGRADE_NAME: &str = "upgrade";

    pub const HEADER_CONNECTION_NAME: &str = "connection";

    pub const HEADER_SEC_WEBSOCKET_KEY_NAME: &str = "sec-websocket-key";

    pub const HEADER_SEC_WEBSOCKET_ACCEPT_NAME: &str = "sec-websocket-accept";

    pub const HEADER_SEC_WEBSOCKET_VERSION_NAME: &str = "sec-websocket-version";

    pub const HEADER_UPGRADE_VALUE: &str = "websocket";

    pub const HEADER_CONNECTION_VALUE: &str = "upgrade";

    pub const HEADER_SEC_WEBSOCKET_VERSION_VALUE: &str = "13";
}
