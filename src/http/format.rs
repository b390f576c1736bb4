//! Plain http message builders.

use bytes::{Bytes, BytesMut};

use crate::handshake::{HttpHeader, HTTP_LINE_BREAK, HTTP_VERSION};

/// An http/1.1 response. `content-length` is always added.
///
/// ```ignore
/// let response = HttpResponse::new(200)
///     .header("connection", "keep-alive")
///     .body("hello world")
///     .encode();
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    status: u16,
    headers: Vec<(String, String)>,
    body: Bytes,
}

impl HttpResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Bytes::new(),
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(128 + self.body.len());

        buf.extend_from_slice(HTTP_VERSION);
        buf.extend_from_slice(format!(" {} {}", self.status, reason_phrase(self.status)).as_bytes());
        buf.extend_from_slice(HTTP_LINE_BREAK);

        write_headers(&mut buf, &self.headers, Some(self.body.len()));
        buf.extend_from_slice(&self.body);

        buf.freeze()
    }
}

/// An http/1.1 request. `content-length` is added if there is a body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    method: String,
    path: String,
    headers: Vec<(String, String)>,
    body: Bytes,
}

impl HttpRequest {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            headers: Vec::new(),
            body: Bytes::new(),
        }
    }

    #[inline]
    pub fn get(path: impl Into<String>) -> Self { Self::new("GET", path) }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(128 + self.body.len());

        buf.extend_from_slice(self.method.as_bytes());
        buf.extend_from_slice(b" ");
        buf.extend_from_slice(self.path.as_bytes());
        buf.extend_from_slice(b" ");
        buf.extend_from_slice(HTTP_VERSION);
        buf.extend_from_slice(HTTP_LINE_BREAK);

        let body_len = if self.body.is_empty() { None } else { Some(self.body.len()) };
        write_headers(&mut buf, &self.headers, body_len);
        buf.extend_from_slice(&self.body);

        buf.freeze()
    }
}

fn write_headers(buf: &mut BytesMut, headers: &[(String, String)], body_len: Option<usize>) {
    for (name, value) in headers.iter() {
        HttpHeader::new(name.as_bytes(), value.as_bytes()).write_to(buf);
    }

    if let Some(len) = body_len {
        let len = len.to_string();
        HttpHeader::new(b"content-length", len.as_bytes()).write_to(buf);
    }

    buf.extend_from_slice(HTTP_LINE_BREAK);
}

/// Canonical reason phrase of common status codes.
pub fn reason_phrase(status: u16) -> &'static str {
    match status {
        100 => "Continue",
        101 => "Switching Protocols",
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        301 => "Moved Permanently",
        302 => "Found",
        304 => "Not Modified",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        413 => "Payload Too Large",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}
