//! Client upgrade request.
//!
//! From [RFC-6455 Section 4.1](https://datatracker.ietf.org/doc/html/rfc6455#section-4.1):
//!
//! Once a connection to the server has been established (including a
//! connection via a proxy or over a TLS-encrypted tunnel), the client
//! MUST send an opening handshake to the server.  The handshake consists
//! of an HTTP Upgrade request, along with a list of required and
//! optional header fields.
//!
//! Example:
//!
//! ```text
//! GET /path HTTP/1.1
//! host: www.example.com
//! upgrade: websocket
//! connection: upgrade
//! sec-websocket-key: dGhlIHNhbXBsZSBub25jZQ==
//! sec-websocket-version: 13
//! ```
//!

use bytes::{Bytes, BytesMut};

use super::HttpHeader;
use super::{HTTP_METHOD, HTTP_VERSION, HTTP_LINE_BREAK};
use super::static_headers::*;

/// Http request presentation.
pub struct Request<'h, 'b> {
    pub path: &'b [u8],
    pub host: &'b [u8],
    pub sec_key: &'b [u8],
    pub other_headers: &'h [HttpHeader<'b>],
}

impl<'h, 'b> Request<'h, 'b> {
    /// Create with required fields, without extra headers.
    #[inline]
    pub const fn new(path: &'b [u8], host: &'b [u8], sec_key: &'b [u8]) -> Self {
        Self {
            path,
            host,
            sec_key,
            other_headers: &[],
        }
    }

    /// Encode the request.
    ///
    /// Necessary headers, including `host`, `upgrade`, `connection`,
    /// `sec-websocket-key` and `sec-websocket-version` are written first,
    /// then other headers(if any) are written in order.
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(256);

        // GET {path} HTTP/1.1
        buf.extend_from_slice(HTTP_METHOD);
        buf.extend_from_slice(b" ");
        buf.extend_from_slice(self.path);
        buf.extend_from_slice(b" ");
        buf.extend_from_slice(HTTP_VERSION);
        buf.extend_from_slice(HTTP_LINE_BREAK);

        let required = [
            HttpHeader::new(HEADER_HOST_NAME.as_bytes(), self.host),
            HttpHeader::new(HEADER_UPGRADE_NAME.as_bytes(), HEADER_UPGRADE_VALUE.as_bytes()),
            HttpHeader::new(
                HEADER_CONNECTION_NAME.as_bytes(),
                HEADER_CONNECTION_VALUE.as_bytes(),
            ),
            HttpHeader::new(HEADER_SEC_WEBSOCKET_KEY_NAME.as_bytes(), self.sec_key),
            HttpHeader::new(
                HEADER_SEC_WEBSOCKET_VERSION_NAME.as_bytes(),
                HEADER_SEC_WEBSOCKET_VERSION_VALUE.as_bytes(),
            ),
        ];

        for hdr in required.iter().chain(self.other_headers.iter()) {
            hdr.write_to(&mut buf);
        }

        // finish with CRLF
        buf.extend_from_slice(HTTP_LINE_BREAK);

        buf.freeze()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn client_handshake() {
        let request = Request::new(b"/ws", b"www.example.com", b"dGhlIHNhbXBsZSBub25jZQ==");

        assert_eq!(
            &request.encode()[..],
            &b"GET /ws HTTP/1.1\r\n\
            host: www.example.com\r\n\
            upgrade: websocket\r\n\
            connection: upgrade\r\n\
            sec-websocket-key: dGhlIHNhbXBsZSBub25jZQ==\r\n\
            sec-websocket-version: 13\r\n\r\n"[..]
        );
    }

    #[test]
    fn client_handshake_extra_headers() {
        let extra = [HttpHeader::new(b"sec-websocket-protocol", b"chat")];
        let request = Request {
            other_headers: &extra,
            ..Request::new(b"/", b"h", b"k")
        };

        let encoded = request.encode();
        assert!(encoded.ends_with(b"sec-websocket-protocol: chat\r\n\r\n"));

        let mut headers = [httparse::EMPTY_HEADER; 8];
        let mut parsed = httparse::Request::new(&mut headers);
        assert!(parsed.parse(&encoded).unwrap().is_complete());
        assert_eq!(parsed.path, Some("/"));
    }
}
