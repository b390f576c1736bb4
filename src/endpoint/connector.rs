use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::task::JoinHandle;

use super::Hooks;
use crate::error::ConnectError;
use crate::executor::{ExecutorProvider, FixedExecutor};

/// Future returned by [`Dialer::dial`].
pub type DialFuture<IO> = Pin<Box<dyn Future<Output = io::Result<IO>> + Send>>;

/// Creates a connection primitive and connects it to one endpoint.
pub trait Dialer: Send + Sync + 'static {
    type Io: Send + 'static;

    fn dial(&self, addr: SocketAddr) -> DialFuture<Self::Io>;
}

/// Plain tcp.
#[derive(Debug, Default, Clone, Copy)]
pub struct TcpDialer;

impl Dialer for TcpDialer {
    type Io = TcpStream;

    fn dial(&self, addr: SocketAddr) -> DialFuture<TcpStream> { Box::pin(TcpStream::connect(addr)) }
}

/// Outbound connections with one timeout over a list of endpoints.
pub struct Connector<P = FixedExecutor, D = TcpDialer> {
    provider: Arc<P>,
    dialer: Arc<D>,
}

impl<P: ExecutorProvider> Connector<P, TcpDialer> {
    pub fn new(provider: P) -> Self { Self::with_dialer(provider, TcpDialer) }
}

impl<P: ExecutorProvider, D: Dialer> Connector<P, D> {
    pub fn with_dialer(provider: P, dialer: D) -> Self {
        Self {
            provider: Arc::new(provider),
            dialer: Arc::new(dialer),
        }
    }

    /// Try `endpoints` in order until one connects, all within `timeout`.
    /// Hooks run on the connected stream before it is returned.
    pub async fn connect_stream(
        &self,
        endpoints: &[SocketAddr],
        timeout: Duration,
        hooks: &Hooks<D::Io>,
    ) -> Result<D::Io, ConnectError> {
        connect_with(&*self.dialer, endpoints, timeout, hooks).await
    }

    /// Connect on the picked executor, exactly one of `on_success` and
    /// `on_failure` runs there.
    ///
    /// Once the timeout fires the pending attempt is dropped, a late
    /// connection is never reported.
    pub fn connect<S, F>(
        &self,
        endpoints: Vec<SocketAddr>,
        timeout: Duration,
        on_success: S,
        on_failure: F,
        hooks: Hooks<D::Io>,
    ) -> JoinHandle<()>
    where
        S: FnOnce(D::Io) + Send + 'static,
        F: FnOnce(ConnectError) + Send + 'static,
    {
        let dialer = self.dialer.clone();

        self.provider.pick().spawn(async move {
            match connect_with(&*dialer, &endpoints, timeout, &hooks).await {
                Ok(io) => on_success(io),
                Err(e) => {
                    log::debug!("connect to {:?} failed: {}", endpoints, e);
                    on_failure(e)
                }
            }
        })
    }
}

async fn connect_with<D: Dialer>(
    dialer: &D,
    endpoints: &[SocketAddr],
    timeout: Duration,
    hooks: &Hooks<D::Io>,
) -> Result<D::Io, ConnectError> {
    if endpoints.is_empty() {
        return Err(ConnectError::NoEndpoint);
    }

    let io = match tokio::time::timeout(timeout, dial_in_order(dialer, endpoints)).await {
        Ok(res) => res?,
        Err(_) => return Err(ConnectError::Timeout(timeout)),
    };

    hooks.run(&io)?;
    Ok(io)
}

async fn dial_in_order<D: Dialer>(dialer: &D, endpoints: &[SocketAddr]) -> Result<D::Io, ConnectError> {
    let mut last_error = None;

    for addr in endpoints {
        match dialer.dial(*addr).await {
            Ok(io) => return Ok(io),
            Err(e) => {
                log::debug!("dial {}: {}", addr, e);
                last_error = Some(e);
            }
        }
    }

    Err(last_error.map_or(ConnectError::NoEndpoint, ConnectError::Io))
}
