//! Tcp session.
//!
//! A [`Session`] turns a [`Transport`] into a message oriented connection:
//!
//! - received bytes are buffered and handed to a data handler, which tells
//!   how many of them it accepted; the rest waits for more data.
//! - sent messages are queued, coalesced into one vectored write per batch,
//!   and acknowledged in order through optional callbacks.
//! - the session closes exactly once, on a transport error, on `EOF`
//!   (unless an `EOF` handler is installed) or on request.
//!
//! Every session is driven by a single task on its executor. `send` may be
//! called from any thread; the other operations are forwarded to that task,
//! so they never race with a read or a write in progress.
//!
//! ```ignore
//! let session = Session::start(&handle, tcp, &SessionOptions::default());
//! session.set_data_handler(|session: &Session, data: &[u8]| {
//!     session.send(Bytes::copy_from_slice(data));
//!     data.len()
//! });
//! ```

mod buffer;
mod driver;
mod queue;
mod registry;
mod transport;

pub use buffer::MIN_RECEIVE_PREPARE_SIZE;
pub use queue::DEFAULT_HIGH_WATER;
pub use registry::SessionRegistry;
pub use transport::Transport;

use std::net::{Shutdown, SocketAddr};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use buffer::RecvBuffer;
use driver::Driver;
use queue::SendQueue;

/// Receives `[consumed, commit)` of the receive buffer and returns how many
/// leading bytes it accepted. Returning more than it was given is a
/// protocol violation and closes the session.
pub type DataHandler = Box<dyn FnMut(&Session, &[u8]) -> usize + Send>;

/// Runs once, after the transport has been closed.
pub type ClosedHandler = Box<dyn FnOnce(&Session) + Send>;

/// Runs once when the peer half-closes, instead of closing the session.
pub type EofHandler = Box<dyn FnOnce(&Session) + Send>;

/// Runs each time unsent bytes rise above the high water mark.
pub type HighWaterHandler = Box<dyn FnMut(&Session) + Send>;

/// Runs once all bytes of one message are written.
pub type SendCallback = Box<dyn FnOnce() + Send>;

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Default receive buffer ceiling, 64 KiB.
pub const DEFAULT_MAX_RECV_BUFFER_SIZE: usize = 64 * 1024;

/// Per session settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    /// Ceiling of the receive buffer, never below [`MIN_RECEIVE_PREPARE_SIZE`].
    pub max_recv_buffer_size: usize,
    /// Unsent bytes above which the high water handler runs.
    pub high_water: usize,
    /// Disable Nagle's algorithm on transports that support it.
    pub nodelay: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            max_recv_buffer_size: DEFAULT_MAX_RECV_BUFFER_SIZE,
            high_water: DEFAULT_HIGH_WATER,
            nodelay: true,
        }
    }
}

/// Operations carried out by the driver task.
pub(crate) enum Command {
    SetDataHandler(DataHandler),
    SetClosedHandler(ClosedHandler),
    SetEofHandler(EofHandler),
    SetHighWaterHandler(HighWaterHandler),
    HighWater,
    Flush,
    Shrink,
    Shutdown(Shutdown),
    Close,
    Dispatch(Box<dyn FnOnce(&Session) + Send>),
    /// Every handle returned by [`Session::start`], and its clones, is gone.
    Released,
}

struct Inner {
    id: u64,
    peer_addr: Option<SocketAddr>,
    handle: Handle,
    max_recv_buffer_size: usize,
    closed: AtomicBool,
    queue: Mutex<SendQueue>,
    commands: mpsc::UnboundedSender<Command>,
}

/// Shared by the handle [`Session::start`] returns and all of its clones.
struct Owner {
    commands: mpsc::UnboundedSender<Command>,
}

impl Drop for Owner {
    fn drop(&mut self) { let _ = self.commands.send(Command::Released); }
}

/// Handle of an established connection, cheap to clone.
///
/// Once a data handler is installed, a session lives as long as its
/// connection does, even if user code drops every handle. Without one,
/// dropping the last handle returned by [`Session::start`] (clones
/// included) closes the session.
///
/// Handles passed to handlers belong to the driver and do not count;
/// clones of them do not keep a session alive either.
#[derive(Clone)]
pub struct Session {
    inner: Arc<Inner>,
    owner: Option<Arc<Owner>>,
}

impl Session {
    /// Wrap `io` and start driving it on the executor behind `handle`.
    ///
    /// Reading begins once a data handler is installed.
    pub fn start<T: Transport>(handle: &Handle, io: T, options: &SessionOptions) -> Session {
        if let Err(e) = io.set_nodelay(options.nodelay) {
            log::debug!("failed to set nodelay: {}", e);
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let recv = RecvBuffer::new(options.max_recv_buffer_size);

        let inner = Arc::new(Inner {
            id: NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed),
            peer_addr: io.peer_addr(),
            handle: handle.clone(),
            max_recv_buffer_size: recv.max_size(),
            closed: AtomicBool::new(false),
            queue: Mutex::new(SendQueue::new(options.high_water)),
            commands: tx.clone(),
        });

        let session = Session {
            inner: inner.clone(),
            owner: Some(Arc::new(Owner { commands: tx })),
        };

        log::debug!("session {} started, peer: {:?}", session.id(), session.peer_addr());

        let driver = Driver::new(
            Session { inner, owner: None },
            io,
            rx,
            recv,
        );
        handle.spawn(driver.run());

        session
    }

    /// Process wide unique id.
    #[inline]
    pub fn id(&self) -> u64 { self.inner.id }

    #[inline]
    pub fn peer_addr(&self) -> Option<SocketAddr> { self.inner.peer_addr }

    /// Executor driving this session.
    #[inline]
    pub fn handle(&self) -> &Handle { &self.inner.handle }

    /// Most unconsumed bytes a data handler is ever offered.
    #[inline]
    pub fn max_recv_buffer_size(&self) -> usize { self.inner.max_recv_buffer_size }

    #[inline]
    pub fn is_closed(&self) -> bool { self.inner.closed.load(Ordering::Acquire) }

    /// Queued bytes not yet written by the transport.
    #[inline]
    pub fn unsent_bytes(&self) -> usize { self.inner.queue.lock().unsent() }

    /// Queue a message. Does nothing once the session is closed.
    ///
    /// The same [`Bytes`] may be queued on many sessions without copying.
    #[inline]
    pub fn send(&self, msg: impl Into<Bytes>) { self.send_with(msg.into(), None) }

    /// Queue a message, `callback` runs once all of its bytes are written.
    ///
    /// Callbacks run in queue order. They never run if the session closes
    /// before the message is written.
    pub fn send_with(&self, msg: Bytes, callback: Option<SendCallback>) {
        if self.is_closed() {
            return;
        }

        let pushed = self.inner.queue.lock().push(msg, callback);

        // the handler runs on the driver, after this call returns,
        // so it may send without re-entering the queue
        if pushed.high_water {
            self.command(Command::HighWater);
        }

        if pushed.flush {
            self.command(Command::Flush);
        }
    }

    /// Replace the data handler. Bytes already buffered are offered to the
    /// new handler before the next read.
    pub fn set_data_handler<F>(&self, handler: F)
    where
        F: FnMut(&Session, &[u8]) -> usize + Send + 'static,
    {
        self.command(Command::SetDataHandler(Box::new(handler)));
    }

    pub fn set_closed_handler<F>(&self, handler: F)
    where
        F: FnOnce(&Session) + Send + 'static,
    {
        self.command(Command::SetClosedHandler(Box::new(handler)));
    }

    /// With an `EOF` handler the session stays open after the peer
    /// half-closes: reading stops, queued messages are still written.
    pub fn set_eof_handler<F>(&self, handler: F)
    where
        F: FnOnce(&Session) + Send + 'static,
    {
        self.command(Command::SetEofHandler(Box::new(handler)));
    }

    /// Set the high water mark now, the handler once the driver gets to it.
    pub fn set_high_water<F>(&self, handler: F, high_water: usize)
    where
        F: FnMut(&Session) + Send + 'static,
    {
        self.inner.queue.lock().set_high_water(high_water);
        self.command(Command::SetHighWaterHandler(Box::new(handler)));
    }

    /// Compact the receive buffer after the next delivery.
    pub fn request_buffer_shrink(&self) { self.command(Command::Shrink); }

    pub fn shutdown(&self, how: Shutdown) { self.command(Command::Shutdown(how)); }

    /// Close the transport; idempotent.
    ///
    /// After the peer half-closed with an `EOF` handler installed,
    /// queued messages are written before the transport is closed.
    pub fn close(&self) { self.command(Command::Close); }

    /// Run `f` on the driver, between two I/O events.
    pub fn dispatch<F>(&self, f: F)
    where
        F: FnOnce(&Session) + Send + 'static,
    {
        self.command(Command::Dispatch(Box::new(f)));
    }

    /// Run `f` on the driver after `delay`, unless the session closed.
    /// Abort the returned handle to cancel.
    pub fn run_after<F>(&self, delay: Duration, f: F) -> JoinHandle<()>
    where
        F: FnOnce(&Session) + Send + 'static,
    {
        let session = self.clone();
        self.inner.handle.spawn(async move {
            tokio::time::sleep(delay).await;
            session.dispatch(f);
        })
    }

    #[inline]
    fn command(&self, cmd: Command) {
        // the receiver is gone only after the session closed
        let _ = self.inner.commands.send(cmd);
    }

    pub(crate) fn mark_closed(&self) -> bool { !self.inner.closed.swap(true, Ordering::AcqRel) }

    pub(crate) fn with_queue<R>(&self, f: impl FnOnce(&mut SendQueue) -> R) -> R {
        f(&mut self.inner.queue.lock())
    }
}

impl PartialEq for Session {
    fn eq(&self, other: &Self) -> bool { Arc::ptr_eq(&self.inner, &other.inner) }
}

impl Eq for Session {}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.inner.id)
            .field("peer_addr", &self.inner.peer_addr)
            .field("closed", &self.is_closed())
            .finish()
    }
}
