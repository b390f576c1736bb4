use std::net::Shutdown;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;

use super::HttpParser;
use crate::error::{Error, FrameError, HandshakeError};
use crate::frame::{encode_frame, extract_frame, Fin, Frame, OpCode};
use crate::handshake::accept_response;
use crate::handshake::{derive_accept_key, new_sec_key, Request};
use crate::role::Role;
use crate::session::{SendCallback, Session};

/// Default limit of one websocket message, 16 MiB.
pub const DEFAULT_MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

/// Runs once, right after the session is set up.
pub type EnterHandler = Box<dyn FnOnce(&HttpSession) + Send>;

/// Runs for every complete http message that is not an upgrade.
pub type RequestHandler<P> = Box<dyn FnMut(&P, &HttpSession) + Send>;

/// Runs once the websocket handshake is done.
pub type WsConnectedHandler<P> = Box<dyn FnMut(&HttpSession, &P) + Send>;

/// Runs for every complete websocket message.
pub type WsMessageHandler = Box<dyn FnMut(&HttpSession, OpCode, &[u8]) + Send>;

pub type HttpClosedHandler = Box<dyn FnOnce(&HttpSession) + Send>;

/// A session speaking http, and websocket after an upgrade.
#[derive(Clone)]
pub struct HttpSession {
    session: Session,
    role: Role,
    // accept key the peer has to answer our upgrade request with
    expected_accept: Arc<Mutex<Option<String>>>,
}

impl HttpSession {
    fn new(session: Session, role: Role) -> Self {
        Self {
            session,
            role,
            expected_accept: Arc::new(Mutex::new(None)),
        }
    }

    #[inline]
    pub fn session(&self) -> &Session { &self.session }

    #[inline]
    pub const fn role(&self) -> Role { self.role }

    #[inline]
    pub fn send(&self, msg: impl Into<Bytes>) { self.session.send(msg) }

    #[inline]
    pub fn send_with(&self, msg: Bytes, callback: Option<SendCallback>) {
        self.session.send_with(msg, callback)
    }

    /// Send `payload` as one final websocket frame, masked on the client side.
    pub fn send_ws(&self, opcode: OpCode, payload: &[u8]) {
        self.session
            .send(encode_frame(Fin::Y, opcode, self.role.new_write_mask(), payload));
    }

    /// Ask the server to switch to websocket.
    pub fn upgrade(&self, host: &str, path: &str) {
        let (request, sec_accept) = websocket_upgrade_request(host, path);
        *self.expected_accept.lock() = Some(sec_accept);
        self.session.send(request);
    }

    #[inline]
    pub fn shutdown(&self, how: Shutdown) { self.session.shutdown(how) }

    #[inline]
    pub fn close(&self) { self.session.close() }
}

impl std::fmt::Debug for HttpSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpSession")
            .field("session", &self.session)
            .field("role", &self.role)
            .finish()
    }
}

/// Encode a websocket opening request with a fresh key.
/// Returns the request and the `sec-websocket-accept` the server must send.
pub fn websocket_upgrade_request(host: &str, path: &str) -> (Bytes, String) {
    let sec_key = new_sec_key();
    let sec_accept = derive_accept_key(sec_key.as_bytes());
    let request = Request::new(path.as_bytes(), host.as_bytes(), sec_key.as_bytes()).encode();
    (request, sec_accept)
}

/// Callbacks of an http session, every one is optional.
pub struct HttpHandlers<P> {
    enter: Option<EnterHandler>,
    request: Option<RequestHandler<P>>,
    ws_connected: Option<WsConnectedHandler<P>>,
    ws_message: Option<WsMessageHandler>,
    closed: Option<HttpClosedHandler>,
}

impl<P> Default for HttpHandlers<P> {
    fn default() -> Self {
        Self {
            enter: None,
            request: None,
            ws_connected: None,
            ws_message: None,
            closed: None,
        }
    }
}

impl<P> HttpHandlers<P> {
    pub fn new() -> Self { Self::default() }

    pub fn on_enter<F>(mut self, f: F) -> Self
    where
        F: FnOnce(&HttpSession) + Send + 'static,
    {
        self.enter = Some(Box::new(f));
        self
    }

    pub fn on_request<F>(mut self, f: F) -> Self
    where
        F: FnMut(&P, &HttpSession) + Send + 'static,
    {
        self.request = Some(Box::new(f));
        self
    }

    pub fn on_ws_connected<F>(mut self, f: F) -> Self
    where
        F: FnMut(&HttpSession, &P) + Send + 'static,
    {
        self.ws_connected = Some(Box::new(f));
        self
    }

    pub fn on_ws_message<F>(mut self, f: F) -> Self
    where
        F: FnMut(&HttpSession, OpCode, &[u8]) + Send + 'static,
    {
        self.ws_message = Some(Box::new(f));
        self
    }

    pub fn on_closed<F>(mut self, f: F) -> Self
    where
        F: FnOnce(&HttpSession) + Send + 'static,
    {
        self.closed = Some(Box::new(f));
        self
    }
}

/// Per session parse state.
struct HttpContext<P> {
    parser: P,
    request: Option<RequestHandler<P>>,
    ws_connected: Option<WsConnectedHandler<P>>,
    ws_message: Option<WsMessageHandler>,

    streaming: bool,
    discard: bool,
    max_frame_len: usize,
    // fragments of the websocket message in progress
    ws_cache: Vec<u8>,
    ws_opcode: Option<OpCode>,
}

impl<P: HttpParser> HttpContext<P> {
    /// Returns how many bytes of `data` were consumed.
    fn process(&mut self, session: &HttpSession, data: &[u8]) -> Result<usize, Error> {
        let mut consumed = 0;

        while consumed < data.len() {
            if self.discard {
                return Ok(data.len());
            }

            let rest = &data[consumed..];
            let n = if self.streaming {
                self.process_ws(session, rest)?
            } else {
                self.process_http(session, rest)?
            };

            if n == 0 {
                break;
            }
            consumed += n;
        }

        Ok(consumed)
    }

    fn process_http(&mut self, session: &HttpSession, data: &[u8]) -> Result<usize, Error> {
        let n = self.parser.try_parse(data)?;
        if self.parser.is_completed() {
            self.dispatch(session)?;
        }
        Ok(n)
    }

    fn dispatch(&mut self, session: &HttpSession) -> Result<(), Error> {
        if !self.parser.is_websocket() {
            // our upgrade request was turned down
            if self.parser.is_response() && session.expected_accept.lock().take().is_some() {
                let status = self.parser.status().unwrap_or_default();
                return Err(HandshakeError::HttpStatusCode(status).into());
            }

            if let Some(handler) = self.request.as_mut() {
                handler(&self.parser, session);
            }

            if self.parser.is_keep_alive() {
                self.parser.reset_for_next_message();
            } else {
                self.discard = true;
            }
            return Ok(());
        }

        if self.parser.is_response() {
            let expected = session.expected_accept.lock().take();
            if let Some(expected) = expected {
                if self.parser.header_value("sec-websocket-accept") != Some(expected.as_str()) {
                    return Err(HandshakeError::SecWebSocketAccept.into());
                }
            }
        } else {
            let sec_key = self
                .parser
                .header_value("sec-websocket-key")
                .ok_or(HandshakeError::SecWebSocketKey)?;
            session.send(accept_response(sec_key)?);
        }

        log::debug!("session {} switched to websocket", session.session().id());
        self.streaming = true;

        if let Some(handler) = self.ws_connected.as_mut() {
            handler(session, &self.parser);
        }
        Ok(())
    }

    fn process_ws(&mut self, session: &HttpSession, data: &[u8]) -> Result<usize, Error> {
        let mut consumed = 0;

        while let Some(frame) = extract_frame(&data[consumed..], self.max_frame_len)? {
            consumed += frame.frame_len;
            self.on_frame(session, frame)?;
        }

        Ok(consumed)
    }

    fn on_frame(&mut self, session: &HttpSession, frame: Frame) -> Result<(), FrameError> {
        let Frame {
            opcode,
            is_final,
            payload,
            ..
        } = frame;
        let continuation = opcode == OpCode::Continue;

        if !is_final || continuation {
            if self.ws_cache.len() + payload.len() > self.max_frame_len {
                let total = (self.ws_cache.len() + payload.len()) as u64;
                return Err(FrameError::TooLarge(total, self.max_frame_len));
            }
            self.ws_cache.extend_from_slice(&payload);
        }

        if !is_final && !continuation {
            self.ws_opcode = Some(opcode);
        }

        if !is_final {
            return Ok(());
        }

        let (opcode, message) = if continuation {
            let opcode = self.ws_opcode.take().ok_or(FrameError::UnexpectedContinuation)?;
            (opcode, std::mem::take(&mut self.ws_cache))
        } else {
            (opcode, payload)
        };

        if let Some(handler) = self.ws_message.as_mut() {
            handler(session, opcode, &message);
        }
        Ok(())
    }

    /// No more bytes are coming.
    fn finish(&mut self, session: &HttpSession) -> Result<(), Error> {
        if self.streaming || self.discard || self.parser.is_completed() {
            return Ok(());
        }

        self.parser.try_parse(&[])?;
        if self.parser.is_completed() {
            self.dispatch(session)?;
        }
        Ok(())
    }
}

/// Speak http on `session`.
///
/// Installs data, `EOF` and closed handlers, then runs the enter handler.
/// Malformed messages, failed handshakes and illegal frames close the
/// session. Websocket messages longer than `max_frame_len` are illegal.
pub fn setup_http_session<P: HttpParser>(
    session: Session,
    role: Role,
    parser: P,
    handlers: HttpHandlers<P>,
    max_frame_len: usize,
) -> HttpSession {
    let http_session = HttpSession::new(session.clone(), role);

    let HttpHandlers {
        enter,
        request,
        ws_connected,
        ws_message,
        closed,
    } = handlers;

    let context = Arc::new(Mutex::new(HttpContext {
        parser,
        request,
        ws_connected,
        ws_message,
        streaming: false,
        discard: false,
        max_frame_len,
        ws_cache: Vec::new(),
        ws_opcode: None,
    }));

    {
        let context = context.clone();
        let http_session = http_session.clone();
        session.set_eof_handler(move |_| {
            if let Err(e) = context.lock().finish(&http_session) {
                log::debug!("session {} at eof: {}", http_session.session().id(), e);
            }
            // queued responses are written first
            http_session.close();
        });
    }

    if let Some(closed) = closed {
        let http_session = http_session.clone();
        session.set_closed_handler(move |_| closed(&http_session));
    }

    {
        let http_session = http_session.clone();
        let max_recv = session.max_recv_buffer_size();
        session.set_data_handler(move |_, data: &[u8]| {
            match context.lock().process(&http_session, data) {
                // a full buffer nobody consumes from never reads again
                Ok(0) if data.len() >= max_recv => {
                    log::debug!(
                        "session {} message outgrows the receive buffer of {} bytes",
                        http_session.session().id(),
                        max_recv
                    );
                    http_session.close();
                    data.len()
                }
                Ok(n) => n,
                Err(e) => {
                    log::debug!("session {} protocol error: {}", http_session.session().id(), e);
                    http_session.close();
                    data.len()
                }
            }
        });
    }

    if let Some(enter) = enter {
        enter(&http_session);
    }

    http_session
}
