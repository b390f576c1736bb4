//! Socket hooks, run on a fresh connection before user code sees it.

use std::io;
use std::time::Duration;

use tokio::net::TcpStream;

/// One hook. A failing hook drops the connection.
pub type Hook<IO> = Box<dyn Fn(&IO) -> io::Result<()> + Send + Sync>;

/// Ordered list of hooks.
pub struct Hooks<IO> {
    hooks: Vec<Hook<IO>>,
}

impl<IO> Hooks<IO> {
    #[inline]
    pub fn new() -> Self { Self { hooks: Vec::new() } }

    /// Append a hook.
    pub fn with<F>(mut self, hook: F) -> Self
    where
        F: Fn(&IO) -> io::Result<()> + Send + Sync + 'static,
    {
        self.hooks.push(Box::new(hook));
        self
    }

    #[inline]
    pub fn len(&self) -> usize { self.hooks.len() }

    #[inline]
    pub fn is_empty(&self) -> bool { self.hooks.is_empty() }

    /// Run every hook in insertion order, stop at the first error.
    pub fn run(&self, io: &IO) -> io::Result<()> {
        for hook in self.hooks.iter() {
            hook(io)?;
        }
        Ok(())
    }
}

impl<IO> Default for Hooks<IO> {
    fn default() -> Self { Self::new() }
}

impl<IO> std::fmt::Debug for Hooks<IO> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hooks").field("len", &self.hooks.len()).finish()
    }
}

/// Set `TCP_NODELAY`.
pub fn nodelay(nodelay: bool) -> impl Fn(&TcpStream) -> io::Result<()> + Send + Sync {
    move |stream| stream.set_nodelay(nodelay)
}

/// Enable tcp keepalive, probing after `idle`.
pub fn keepalive(idle: Duration) -> impl Fn(&TcpStream) -> io::Result<()> + Send + Sync {
    move |stream| {
        let keepalive = socket2::TcpKeepalive::new().with_time(idle);
        socket2::SockRef::from(stream).set_tcp_keepalive(&keepalive)
    }
}
