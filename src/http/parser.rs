//! Incremental http/1.x message parser.

use crate::error::HttpError;

/// Feeds on the bytes a session receives and reports one message at a time.
///
/// `try_parse` returns how many leading bytes it consumed; unconsumed bytes
/// are offered again, together with newly received ones. An empty input
/// means the peer will not send anything more.
pub trait HttpParser: Send + 'static {
    fn try_parse(&mut self, buf: &[u8]) -> Result<usize, HttpError>;

    /// A whole message, body included, has been parsed.
    fn is_completed(&self) -> bool;

    /// The message asks for (request) or grants (response) a websocket
    /// upgrade.
    fn is_websocket(&self) -> bool;

    fn has_header(&self, name: &str) -> bool { self.header_value(name).is_some() }

    /// First value of header `name`, case insensitive.
    fn header_value(&self, name: &str) -> Option<&str>;

    fn is_keep_alive(&self) -> bool;

    /// Forget the current message, ready to parse a pipelined one.
    fn reset_for_next_message(&mut self);

    fn is_response(&self) -> bool;

    fn method(&self) -> Option<&str>;

    fn path(&self) -> Option<&str>;

    fn status(&self) -> Option<u16>;

    fn body(&self) -> &[u8];
}

/// Most headers a message may carry.
pub const MAX_HEADERS: usize = 64;

/// Default limit of the header block.
pub const DEFAULT_MAX_HEAD_LEN: usize = 64 * 1024;

/// Default limit of a message body.
pub const DEFAULT_MAX_BODY_LEN: usize = 8 * 1024 * 1024;

const RESPONSE_PREFIX: &[u8] = b"HTTP/";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Head,
    Body(Framing),
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Framing {
    Length(u64),
    Chunked(Chunk),
    UntilEof,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Chunk {
    Size,
    Data(u64),
    DataEnd,
    Trailer,
}

/// [`HttpParser`] for http/1.0 and http/1.1 built on `httparse`.
///
/// Requests and responses are told apart by the `HTTP/` prefix of a
/// status line. The header block is only consumed once it is complete;
/// body bytes are consumed as they arrive. Bodies are framed by
/// `content-length`, `transfer-encoding: chunked`, or, for responses
/// carrying neither, by the end of input.
#[derive(Debug, Clone)]
pub struct Http1Parser {
    state: State,
    max_head_len: usize,
    max_body_len: usize,

    response: bool,
    version: u8,
    method: Option<String>,
    path: Option<String>,
    status: Option<u16>,
    reason: Option<String>,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl Default for Http1Parser {
    fn default() -> Self { Self::new() }
}

impl Http1Parser {
    pub fn new() -> Self {
        Self {
            state: State::Head,
            max_head_len: DEFAULT_MAX_HEAD_LEN,
            max_body_len: DEFAULT_MAX_BODY_LEN,
            response: false,
            version: 1,
            method: None,
            path: None,
            status: None,
            reason: None,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    pub fn with_limits(max_head_len: usize, max_body_len: usize) -> Self {
        Self {
            max_head_len,
            max_body_len,
            ..Self::new()
        }
    }

    /// Minor version, `0` or `1`.
    #[inline]
    pub const fn version(&self) -> u8 { self.version }

    #[inline]
    pub fn reason(&self) -> Option<&str> { self.reason.as_deref() }

    pub fn headers(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Take one step, `None` if more input is needed.
    /// A step either consumes bytes or moves to another state.
    fn step(&mut self, buf: &[u8]) -> Result<Option<usize>, HttpError> {
        match self.state {
            State::Head => self.parse_head(buf),
            State::Body(Framing::Length(remaining)) => {
                let n = self.take_body(buf, remaining)?;
                let remaining = remaining - n as u64;
                self.state = if remaining == 0 {
                    State::Completed
                } else {
                    State::Body(Framing::Length(remaining))
                };
                Ok(if n == 0 { None } else { Some(n) })
            }
            State::Body(Framing::UntilEof) => {
                let n = self.take_body(buf, buf.len() as u64)?;
                Ok(if n == 0 { None } else { Some(n) })
            }
            State::Body(Framing::Chunked(chunk)) => self.parse_chunk(buf, chunk),
            State::Completed => Ok(None),
        }
    }

    fn parse_head(&mut self, buf: &[u8]) -> Result<Option<usize>, HttpError> {
        if buf.len() < RESPONSE_PREFIX.len() && RESPONSE_PREFIX.starts_with(buf) {
            return Ok(None);
        }

        let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS];

        let head_len = if buf.starts_with(RESPONSE_PREFIX) {
            let mut response = httparse::Response::new(&mut headers);
            match response.parse(buf)? {
                httparse::Status::Partial => None,
                httparse::Status::Complete(n) => {
                    self.response = true;
                    self.version = response.version.unwrap_or(1);
                    self.status = response.code;
                    self.reason = response.reason.map(str::to_owned);
                    self.store_headers(response.headers);
                    Some(n)
                }
            }
        } else {
            let mut request = httparse::Request::new(&mut headers);
            match request.parse(buf)? {
                httparse::Status::Partial => None,
                httparse::Status::Complete(n) => {
                    self.response = false;
                    self.version = request.version.unwrap_or(1);
                    self.method = request.method.map(str::to_owned);
                    self.path = request.path.map(str::to_owned);
                    self.store_headers(request.headers);
                    Some(n)
                }
            }
        };

        let head_len = match head_len {
            Some(n) => n,
            // an unterminated head may not fill the limit either
            None if buf.len() >= self.max_head_len => {
                return Err(HttpError::HeadTooLarge(self.max_head_len));
            }
            None => return Ok(None),
        };

        self.state = match self.body_framing()? {
            Some(Framing::Length(0)) | None => State::Completed,
            Some(framing) => State::Body(framing),
        };

        Ok(Some(head_len))
    }

    fn store_headers(&mut self, headers: &[httparse::Header<'_>]) {
        self.headers = headers
            .iter()
            .map(|h| {
                (
                    h.name.to_ascii_lowercase(),
                    String::from_utf8_lossy(h.value).trim().to_owned(),
                )
            })
            .collect();
    }

    /// How the body after the header block is delimited, `None` if there is
    /// no body at all.
    fn body_framing(&self) -> Result<Option<Framing>, HttpError> {
        if self.response {
            match self.status {
                Some(100..=199) | Some(204) | Some(304) => return Ok(None),
                _ => {}
            }
        }

        if self
            .header_value("transfer-encoding")
            .map_or(false, |v| has_token(v, "chunked"))
        {
            return Ok(Some(Framing::Chunked(Chunk::Size)));
        }

        if let Some(value) = self.header_value("content-length") {
            let len: u64 = value.parse().map_err(|_| HttpError::ContentLength)?;
            if len > self.max_body_len as u64 {
                return Err(HttpError::BodyTooLarge(len, self.max_body_len));
            }
            return Ok(Some(Framing::Length(len)));
        }

        if self.response {
            Ok(Some(Framing::UntilEof))
        } else {
            Ok(None)
        }
    }

    /// Append up to `limit` bytes of `buf` to the body.
    fn take_body(&mut self, buf: &[u8], limit: u64) -> Result<usize, HttpError> {
        let n = std::cmp::min(buf.len() as u64, limit) as usize;

        let total = self.body.len() + n;
        if total > self.max_body_len {
            return Err(HttpError::BodyTooLarge(total as u64, self.max_body_len));
        }

        self.body.extend_from_slice(&buf[..n]);
        Ok(n)
    }

    fn parse_chunk(&mut self, buf: &[u8], chunk: Chunk) -> Result<Option<usize>, HttpError> {
        match chunk {
            Chunk::Size => match httparse::parse_chunk_size(buf)? {
                httparse::Status::Partial => Ok(None),
                httparse::Status::Complete((n, 0)) => {
                    self.state = State::Body(Framing::Chunked(Chunk::Trailer));
                    Ok(Some(n))
                }
                httparse::Status::Complete((n, size)) => {
                    self.state = State::Body(Framing::Chunked(Chunk::Data(size)));
                    Ok(Some(n))
                }
            },
            Chunk::Data(remaining) => {
                let n = self.take_body(buf, remaining)?;
                let remaining = remaining - n as u64;
                if remaining == 0 {
                    self.state = State::Body(Framing::Chunked(Chunk::DataEnd));
                } else {
                    self.state = State::Body(Framing::Chunked(Chunk::Data(remaining)));
                }
                Ok(if n == 0 { None } else { Some(n) })
            }
            Chunk::DataEnd => {
                if buf.len() < 2 {
                    return Ok(None);
                }
                if &buf[..2] != b"\r\n" {
                    return Err(HttpError::ChunkTerminator);
                }
                self.state = State::Body(Framing::Chunked(Chunk::Size));
                Ok(Some(2))
            }
            // trailer fields are skipped
            Chunk::Trailer => match buf.windows(2).position(|w| w == b"\r\n") {
                Some(0) => {
                    self.state = State::Completed;
                    Ok(Some(2))
                }
                Some(pos) => Ok(Some(pos + 2)),
                None => Ok(None),
            },
        }
    }
}

impl HttpParser for Http1Parser {
    fn try_parse(&mut self, buf: &[u8]) -> Result<usize, HttpError> {
        if buf.is_empty() {
            // end of input delimits a body without length
            if self.state == State::Body(Framing::UntilEof) {
                self.state = State::Completed;
            }
            return Ok(0);
        }

        let mut consumed = 0;
        while self.state != State::Completed {
            match self.step(&buf[consumed..])? {
                Some(n) => consumed += n,
                None => break,
            }
        }

        Ok(consumed)
    }

    #[inline]
    fn is_completed(&self) -> bool { self.state == State::Completed }

    fn is_websocket(&self) -> bool {
        if self.response && self.status != Some(101) {
            return false;
        }

        self.header_value("upgrade")
            .map_or(false, |v| has_token(v, "websocket"))
    }

    fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    fn is_keep_alive(&self) -> bool {
        if self.state == State::Body(Framing::UntilEof) {
            return false;
        }

        match self.header_value("connection") {
            Some(v) if has_token(v, "close") => false,
            Some(v) if has_token(v, "keep-alive") => true,
            _ => self.version >= 1,
        }
    }

    fn reset_for_next_message(&mut self) {
        *self = Self::with_limits(self.max_head_len, self.max_body_len);
    }

    #[inline]
    fn is_response(&self) -> bool { self.response }

    #[inline]
    fn method(&self) -> Option<&str> { self.method.as_deref() }

    #[inline]
    fn path(&self) -> Option<&str> { self.path.as_deref() }

    #[inline]
    fn status(&self) -> Option<u16> { self.status }

    #[inline]
    fn body(&self) -> &[u8] { &self.body }
}

/// Whether comma separated `value` contains `token`, case insensitive.
fn has_token(value: &str, token: &str) -> bool {
    value.split(',').any(|v| v.trim().eq_ignore_ascii_case(token))
}

#[cfg(test)]
mod test {
    use super::*;

    const GET: &[u8] = b"GET /index.html HTTP/1.1\r\nHost: example.com\r\n\r\n";

    #[test]
    fn request_without_body() {
        let mut parser = Http1Parser::new();
        assert_eq!(parser.try_parse(GET).unwrap(), GET.len());
        assert!(parser.is_completed());
        assert!(!parser.is_response());
        assert_eq!(parser.method(), Some("GET"));
        assert_eq!(parser.path(), Some("/index.html"));
        assert_eq!(parser.header_value("HOST"), Some("example.com"));
        assert!(parser.is_keep_alive());
        assert!(!parser.is_websocket());
    }

    #[test]
    fn head_is_not_consumed_until_complete() {
        let mut parser = Http1Parser::new();
        assert_eq!(parser.try_parse(&GET[..10]).unwrap(), 0);
        assert_eq!(parser.try_parse(&GET[..3]).unwrap(), 0);
        assert!(!parser.is_completed());
        assert_eq!(parser.try_parse(GET).unwrap(), GET.len());
        assert!(parser.is_completed());
    }

    #[test]
    fn content_length_body_in_pieces() {
        let msg = b"POST /submit HTTP/1.1\r\ncontent-length: 11\r\n\r\nhello world";
        let head_len = msg.len() - 11;
        let mut parser = Http1Parser::new();

        assert_eq!(parser.try_parse(&msg[..head_len + 5]).unwrap(), head_len + 5);
        assert!(!parser.is_completed());
        assert_eq!(parser.try_parse(&msg[head_len + 5..]).unwrap(), 6);
        assert!(parser.is_completed());
        assert_eq!(parser.body(), b"hello world");
    }

    #[test]
    fn stops_at_message_boundary() {
        let mut pipelined = GET.to_vec();
        pipelined.extend_from_slice(b"GET /second HTTP/1.1\r\n\r\n");

        let mut parser = Http1Parser::new();
        assert_eq!(parser.try_parse(&pipelined).unwrap(), GET.len());
        assert_eq!(parser.path(), Some("/index.html"));

        parser.reset_for_next_message();
        assert!(!parser.is_completed());
        assert_eq!(parser.try_parse(&pipelined[GET.len()..]).unwrap(), pipelined.len() - GET.len());
        assert_eq!(parser.path(), Some("/second"));
    }

    #[test]
    fn chunked_body() {
        let msg = b"HTTP/1.1 200 OK\r\ntransfer-encoding: chunked\r\n\r\n\
            5\r\nhello\r\n6;ext=1\r\n world\r\n0\r\nx-trailer: 1\r\n\r\n";
        let mut parser = Http1Parser::new();

        // byte by byte, carrying unconsumed bytes over
        let mut pending = Vec::new();
        for b in msg.iter() {
            pending.push(*b);
            let n = parser.try_parse(&pending).unwrap();
            pending.drain(..n);
        }

        assert!(parser.is_completed());
        assert!(pending.is_empty());
        assert!(parser.is_response());
        assert_eq!(parser.status(), Some(200));
        assert_eq!(parser.body(), b"hello world");
    }

    #[test]
    fn body_until_eof() {
        let msg = b"HTTP/1.0 200 OK\r\n\r\npartial body";
        let mut parser = Http1Parser::new();

        assert_eq!(parser.try_parse(msg).unwrap(), msg.len());
        assert!(!parser.is_completed());
        assert!(!parser.is_keep_alive());

        assert_eq!(parser.try_parse(&[]).unwrap(), 0);
        assert!(parser.is_completed());
        assert_eq!(parser.body(), b"partial body");
    }

    #[test]
    fn websocket_upgrade() {
        let request = b"GET /ws HTTP/1.1\r\nHost: h\r\nUpgrade: WebSocket\r\n\
            Connection: Upgrade\r\nSec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n\r\n";
        let mut parser = Http1Parser::new();
        parser.try_parse(request).unwrap();
        assert!(parser.is_websocket());
        assert!(parser.has_header("sec-websocket-key"));

        let response = b"HTTP/1.1 101 Switching Protocols\r\nupgrade: websocket\r\n\r\n";
        let mut parser = Http1Parser::new();
        assert_eq!(parser.try_parse(response).unwrap(), response.len());
        assert!(parser.is_completed());
        assert!(parser.is_websocket());

        let refused = b"HTTP/1.1 400 Bad Request\r\nupgrade: websocket\r\ncontent-length: 0\r\n\r\n";
        let mut parser = Http1Parser::new();
        parser.try_parse(refused).unwrap();
        assert!(!parser.is_websocket());
    }

    #[test]
    fn keep_alive_rules() {
        let mut parser = Http1Parser::new();
        parser.try_parse(b"GET / HTTP/1.0\r\n\r\n").unwrap();
        assert!(!parser.is_keep_alive());

        let mut parser = Http1Parser::new();
        parser.try_parse(b"GET / HTTP/1.0\r\nConnection: Keep-Alive\r\n\r\n").unwrap();
        assert!(parser.is_keep_alive());

        let mut parser = Http1Parser::new();
        parser.try_parse(b"GET / HTTP/1.1\r\nConnection: close\r\n\r\n").unwrap();
        assert!(!parser.is_keep_alive());
    }

    #[test]
    fn malformed() {
        let mut parser = Http1Parser::new();
        assert!(matches!(
            parser.try_parse(b"GET / HTTP/1.1\r\nbad header\r\n\r\n"),
            Err(HttpError::Httparse(_))
        ));

        let mut parser = Http1Parser::new();
        assert!(matches!(
            parser.try_parse(b"POST / HTTP/1.1\r\ncontent-length: ten\r\n\r\n"),
            Err(HttpError::ContentLength)
        ));

        let mut parser = Http1Parser::with_limits(32, 4);
        assert!(matches!(
            parser.try_parse(b"POST / HTTP/1.1\r\ncontent-length: 5\r\n\r\n"),
            Err(HttpError::BodyTooLarge(5, 4))
        ));

        let mut parser = Http1Parser::with_limits(32, 4);
        assert!(matches!(
            parser.try_parse(&[b'a'; 64]),
            Err(HttpError::HeadTooLarge(32))
        ));

        let mut parser = Http1Parser::with_limits(32, 4);
        assert!(matches!(parser.try_parse(&[b'a'; 31]), Ok(0)));
        assert!(matches!(
            parser.try_parse(&[b'a'; 32]),
            Err(HttpError::HeadTooLarge(32))
        ));
    }
}
