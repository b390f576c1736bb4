//! Echo every received byte back.
//!
//! ```sh
//! cargo run --example echo_server -- --listen 127.0.0.1:8080 --executors 4
//! ```

use std::net::SocketAddr;

use bytes::Bytes;
use clap::Parser;
use tokio::runtime::Handle;

use tidewire::endpoint::{nodelay, start_session, Acceptor, Hooks};
use tidewire::executor::ExecutorPool;
use tidewire::session::{Session, SessionOptions};

#[derive(Parser, Debug)]
#[command(name = "echo_server")]
struct Args {
    #[arg(long, default_value = "127.0.0.1:8080")]
    listen: SocketAddr,
    #[arg(long, default_value_t = 2)]
    executors: usize,
    #[arg(long, default_value_t = 1)]
    threads: usize,
    #[arg(long, default_value_t = 64 * 1024)]
    max_recv_buffer: usize,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let options = SessionOptions {
        max_recv_buffer_size: args.max_recv_buffer,
        ..Default::default()
    };

    let pool = ExecutorPool::new(args.executors, args.threads)?;
    let mut acceptor = Acceptor::bind(args.listen, pool)?.with_hooks(Hooks::new().with(nodelay(true)));

    acceptor.start_accept(move |tcp, peer| {
        let session = start_session(tcp, &options, &Handle::current());
        log::info!("session {} from {}", session.id(), peer);

        session.set_closed_handler(|session: &Session| log::info!("session {} closed", session.id()));
        session.set_data_handler(|session: &Session, data: &[u8]| {
            session.send(Bytes::copy_from_slice(data));
            data.len()
        });
    })?;

    log::info!("echo server on {}", acceptor.local_addr());
    tokio::signal::ctrl_c().await?;
    acceptor.close();
    Ok(())
}
