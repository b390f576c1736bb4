//! Duplex byte transports a session can drive.

use std::io;
use std::net::SocketAddr;

use tokio::io::{AsyncRead, AsyncWrite, DuplexStream};
use tokio::net::TcpStream;

/// A non-blocking, full-duplex byte stream.
///
/// Reads and writes come from [`AsyncRead`] and [`AsyncWrite`], the write
/// direction is shut down with `poll_shutdown`. Anything that can also stop
/// its read direction can carry a session, a TLS stream included.
pub trait Transport: AsyncRead + AsyncWrite + Send + Unpin + 'static {
    /// Stop receiving, the peer sees nothing.
    fn shutdown_read(&mut self) -> io::Result<()>;

    fn set_nodelay(&self, _nodelay: bool) -> io::Result<()> { Ok(()) }

    fn peer_addr(&self) -> Option<SocketAddr> { None }
}

impl Transport for TcpStream {
    fn shutdown_read(&mut self) -> io::Result<()> {
        socket2::SockRef::from(&*self).shutdown(std::net::Shutdown::Read)
    }

    #[inline]
    fn set_nodelay(&self, nodelay: bool) -> io::Result<()> { TcpStream::set_nodelay(self, nodelay) }

    #[inline]
    fn peer_addr(&self) -> Option<SocketAddr> { TcpStream::peer_addr(self).ok() }
}

cfg_if::cfg_if! {
    if #[cfg(unix)] {
        use tokio::net::UnixStream;

        impl Transport for UnixStream {
            fn shutdown_read(&mut self) -> io::Result<()> {
                socket2::SockRef::from(&*self).shutdown(std::net::Shutdown::Read)
            }
        }
    }
}

/// In-memory pipe, mostly for tests.
impl Transport for DuplexStream {
    #[inline]
    fn shutdown_read(&mut self) -> io::Result<()> { Ok(()) }
}
