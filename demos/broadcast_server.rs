//! Every line a client sends is relayed to all connected clients.
//!
//! ```sh
//! cargo run --example broadcast_server -- --listen 127.0.0.1:8080
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use clap::Parser;
use tokio::runtime::Handle;

use tidewire::endpoint::{start_session, Acceptor};
use tidewire::executor::ExecutorPool;
use tidewire::session::{Session, SessionOptions, SessionRegistry};

#[derive(Parser, Debug)]
#[command(name = "broadcast_server")]
struct Args {
    #[arg(long, default_value = "127.0.0.1:8080")]
    listen: SocketAddr,
    #[arg(long, default_value_t = 2)]
    executors: usize,
    /// Slow clients past this many queued bytes are dropped.
    #[arg(long, default_value_t = 1024 * 1024)]
    high_water: usize,
    /// Seconds between heartbeats, 0 disables them.
    #[arg(long, default_value_t = 10)]
    heartbeat: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();
    let high_water = args.high_water;

    let registry = Arc::new(SessionRegistry::new());
    let mut acceptor = Acceptor::bind(args.listen, ExecutorPool::new(args.executors, 1)?)?;

    let sessions = registry.clone();
    acceptor.start_accept(move |tcp, peer| {
        let session = start_session(tcp, &SessionOptions::default(), &Handle::current());
        log::info!("session {} from {}", session.id(), peer);
        sessions.insert(session.clone());

        let closing = sessions.clone();
        session.set_closed_handler(move |session: &Session| {
            closing.remove(session.id());
            log::info!("session {} left, {} online", session.id(), closing.len());
        });

        session.set_high_water(
            |session: &Session| {
                log::warn!("session {} too slow, {} bytes queued", session.id(), session.unsent_bytes());
                session.close();
            },
            high_water,
        );

        let relay = sessions.clone();
        session.set_data_handler(move |_, data: &[u8]| {
            // whole lines only
            let end = match data.iter().rposition(|b| *b == b'\n') {
                Some(pos) => pos + 1,
                None => return 0,
            };
            relay.broadcast(Bytes::copy_from_slice(&data[..end]));
            end
        });
    })?;

    log::info!("broadcast server on {}", acceptor.local_addr());

    if args.heartbeat > 0 {
        let registry = registry.clone();
        let period = Duration::from_secs(args.heartbeat);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                let n = registry.broadcast(Bytes::from_static(b"* heartbeat\n"));
                log::debug!("heartbeat to {} sessions", n);
            }
        });
    }

    tokio::signal::ctrl_c().await?;
    acceptor.close();
    Ok(())
}
