//! Async tcp sessions with http and websocket framing.
//!
//! ## Features
//! - One task per connection, sends from any thread.
//! - Receive buffer grows along an S-curve, shrinks on request.
//! - Queued messages are coalesced into vectored writes.
//! - Websocket messages are reassembled from fragments.
//!
//! ## High-level API
//!
//! - [`endpoint`]
//! - [`session`]
//! - [`http`]
//!
//! ```ignore
//! {
//!     let mut acceptor = Acceptor::bind(addr, ExecutorPool::new(4, 1)?)?;
//!     acceptor.start_accept(|tcp, _peer| {
//!         let session = Session::start(&Handle::current(), tcp, &SessionOptions::default());
//!         // echo
//!         session.set_data_handler(|session: &Session, data: &[u8]| {
//!             session.send(Bytes::copy_from_slice(data));
//!             data.len()
//!         });
//!     })?;
//! }
//! ```
//!
//! ## Low-level API
//!
//! - [`frame`]
//! - [`handshake`]
//! - [`executor`]
//!
//! Frame:
//!
//! ```ignore
//! {
//!     // encode a whole frame
//!     let bytes = encode_frame(Fin::Y, OpCode::Text, Role::Client.new_write_mask(), b"hello");
//!
//!     // take one frame off a byte stream
//!     let frame = extract_frame(&bytes, DEFAULT_MAX_FRAME_LEN)?.unwrap();
//! }
//! ```
//!
//! Handshake:
//!
//! ```ignore
//! {
//!     // make a client handshake request
//!     let (request, sec_accept) = websocket_upgrade_request("example.com", "/ws");
//!
//!     // answer it on the server side
//!     let response = accept_response(sec_key)?;
//! }
//! ```

pub mod role;
pub mod error;
pub mod frame;
pub mod handshake;
pub mod executor;
pub mod session;
pub mod endpoint;
pub mod http;

pub use error::Error;
pub use executor::{ExecutorPool, ExecutorProvider, FixedExecutor};
pub use session::{Session, SessionOptions, SessionRegistry, Transport};
pub use endpoint::{start_session, Acceptor, Connector, Hooks};
pub use http::{setup_http_session, HttpHandlers, HttpSession};
