//! Http and websocket on top of a [`Session`](crate::session::Session).
//!
//! Received bytes go through an [`HttpParser`] until a message completes.
//! A completed message is either handed to the request handler, or, if it
//! is a websocket upgrade, answered (server side) or verified (client side),
//! after which the session carries websocket frames. Fragmented messages are
//! reassembled before they reach the message handler.
//!
//! ```ignore
//! let handlers = HttpHandlers::new()
//!     .on_request(|parser: &Http1Parser, session: &HttpSession| {
//!         session.send(HttpResponse::new(200).body("hello").encode());
//!     })
//!     .on_ws_message(|session: &HttpSession, opcode, payload: &[u8]| {
//!         session.send_ws(opcode, payload);
//!     });
//!
//! setup_http_session(session, Role::Server, Http1Parser::new(), handlers, DEFAULT_MAX_FRAME_LEN);
//! ```

mod format;
mod parser;
mod service;

pub use format::{reason_phrase, HttpRequest, HttpResponse};
pub use parser::{Http1Parser, HttpParser};
pub use parser::{DEFAULT_MAX_BODY_LEN, DEFAULT_MAX_HEAD_LEN, MAX_HEADERS};
pub use service::{setup_http_session, websocket_upgrade_request};
pub use service::{HttpHandlers, HttpSession, DEFAULT_MAX_FRAME_LEN};
pub use service::{EnterHandler, HttpClosedHandler, RequestHandler, WsConnectedHandler, WsMessageHandler};
