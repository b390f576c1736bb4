//! Where sessions come from.
//!
//! - [`Acceptor`] listens for tcp connections and hands each accepted
//!   stream to an executor chosen by an [`ExecutorProvider`](crate::executor::ExecutorProvider).
//! - [`Connector`] dials a list of endpoints under one timeout and reports
//!   exactly one outcome.
//!
//! Both run [`Hooks`] on a fresh stream before user code sees it. Turning
//! the stream into a [`Session`] is left to the callback, usually through
//! [`start_session`].

mod acceptor;
mod connector;
mod hook;

pub use acceptor::Acceptor;
pub use connector::{Connector, DialFuture, Dialer, TcpDialer};
pub use hook::{keepalive, nodelay, Hook, Hooks};

use tokio::runtime::Handle;

use crate::session::{Session, SessionOptions, Transport};

/// Start a session over an established stream on `handle`.
#[inline]
pub fn start_session<T: Transport>(stream: T, options: &SessionOptions, handle: &Handle) -> Session {
    Session::start(handle, stream, options)
}
