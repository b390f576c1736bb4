use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;

use super::Hooks;
use crate::executor::{ExecutorProvider, FixedExecutor};

const LISTEN_BACKLOG: i32 = 1024;

/// Pause after an accept error that is not about a single connection,
/// e.g. running out of file descriptors.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(50);

/// Accepts tcp connections and hands each one to an executor.
///
/// Dropping the acceptor closes it.
pub struct Acceptor<P = FixedExecutor> {
    listener: Option<TcpListener>,
    local_addr: SocketAddr,
    provider: Arc<P>,
    hooks: Arc<Hooks<TcpStream>>,
    token: CancellationToken,
}

impl<P: ExecutorProvider> Acceptor<P> {
    /// Listen on `addr` with `SO_REUSEADDR` set.
    ///
    /// Must be called within a tokio runtime, which also runs the accept loop.
    pub fn bind(addr: SocketAddr, provider: P) -> io::Result<Self> {
        let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;
        socket.set_reuse_address(true)?;
        socket.set_nonblocking(true)?;
        socket.bind(&addr.into())?;
        socket.listen(LISTEN_BACKLOG)?;

        let listener = TcpListener::from_std(socket.into())?;
        let local_addr = listener.local_addr()?;
        log::debug!("acceptor listening on {}", local_addr);

        Ok(Self {
            listener: Some(listener),
            local_addr,
            provider: Arc::new(provider),
            hooks: Arc::new(Hooks::new()),
            token: CancellationToken::new(),
        })
    }

    /// Hooks run on every accepted stream, on its executor,
    /// before the callback.
    pub fn with_hooks(mut self, hooks: Hooks<TcpStream>) -> Self {
        self.hooks = Arc::new(hooks);
        self
    }

    #[inline]
    pub const fn local_addr(&self) -> SocketAddr { self.local_addr }

    /// Start the accept loop. `callback` runs on the executor the provider
    /// picked for that connection.
    ///
    /// Fails if the loop was already started or the acceptor is closed.
    pub fn start_accept<F>(&mut self, callback: F) -> io::Result<()>
    where
        F: Fn(TcpStream, SocketAddr) + Send + Sync + 'static,
    {
        if self.token.is_cancelled() {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "acceptor closed"));
        }

        let listener = self
            .listener
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::AlreadyExists, "accept loop already started"))?;

        tokio::spawn(accept_loop(
            listener,
            self.provider.clone(),
            self.hooks.clone(),
            self.token.clone(),
            Arc::new(callback),
        ));

        Ok(())
    }

    /// Stop accepting and release the listener; idempotent.
    pub fn close(&self) {
        if !self.token.is_cancelled() {
            log::debug!("acceptor on {} closed", self.local_addr);
            self.token.cancel();
        }
    }

    #[inline]
    pub fn is_closed(&self) -> bool { self.token.is_cancelled() }
}

impl<P> Drop for Acceptor<P> {
    fn drop(&mut self) { self.token.cancel(); }
}

/// Where the accept loop takes connections from.
trait Listener: Send + Sync + 'static {
    fn poll_accept(&self, cx: &mut Context<'_>) -> Poll<io::Result<(TcpStream, SocketAddr)>>;
}

impl Listener for TcpListener {
    #[inline]
    fn poll_accept(&self, cx: &mut Context<'_>) -> Poll<io::Result<(TcpStream, SocketAddr)>> {
        TcpListener::poll_accept(self, cx)
    }
}

async fn accept_loop<L, P, F>(
    listener: L,
    provider: Arc<P>,
    hooks: Arc<Hooks<TcpStream>>,
    token: CancellationToken,
    callback: Arc<F>,
) where
    L: Listener,
    P: ExecutorProvider,
    F: Fn(TcpStream, SocketAddr) + Send + Sync + 'static,
{
    loop {
        let accepted = tokio::select! {
            biased;
            _ = token.cancelled() => break,
            accepted = std::future::poll_fn(|cx| listener.poll_accept(cx)) => accepted,
        };

        match accepted {
            Ok((stream, peer)) => hand_off(stream, peer, &*provider, &hooks, &callback),
            Err(e) if is_connection_error(&e) => {
                log::debug!("accept: {}", e);
            }
            Err(e) => {
                log::warn!("accept: {}, retry in {:?}", e, ACCEPT_BACKOFF);
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(ACCEPT_BACKOFF) => {}
                }
            }
        }
    }

    log::debug!("accept loop exited");
}

/// Move `stream` to the picked executor and run hooks and callback there.
fn hand_off<P, F>(
    stream: TcpStream,
    peer: SocketAddr,
    provider: &P,
    hooks: &Arc<Hooks<TcpStream>>,
    callback: &Arc<F>,
) where
    P: ExecutorProvider,
    F: Fn(TcpStream, SocketAddr) + Send + Sync + 'static,
{
    // deregister from this reactor, the picked runtime registers it again
    let stream = match stream.into_std() {
        Ok(stream) => stream,
        Err(e) => {
            log::warn!("failed to detach stream from {}: {}", peer, e);
            return;
        }
    };

    let hooks = hooks.clone();
    let callback = callback.clone();

    provider.pick().spawn(async move {
        let stream = match TcpStream::from_std(stream) {
            Ok(stream) => stream,
            Err(e) => {
                log::warn!("failed to register stream from {}: {}", peer, e);
                return;
            }
        };

        if let Err(e) = hooks.run(&stream) {
            log::warn!("hook rejected stream from {}: {}", peer, e);
            return;
        }

        callback(stream, peer);
    });
}

/// Errors about one connection, the listener itself is fine.
fn is_connection_error(e: &io::Error) -> bool {
    use io::ErrorKind::*;
    matches!(
        e.kind(),
        ConnectionRefused | ConnectionAborted | ConnectionReset | Interrupted | WouldBlock
    )
}
