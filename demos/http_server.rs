//! Tiny http server, websocket connections on `/ws` get their messages back.
//!
//! ```sh
//! cargo run --example http_server -- --listen 127.0.0.1:8080
//! ```

use std::net::SocketAddr;

use clap::Parser;
use tokio::runtime::Handle;

use tidewire::endpoint::{start_session, Acceptor};
use tidewire::executor::ExecutorPool;
use tidewire::frame::OpCode;
use tidewire::http::{setup_http_session, DEFAULT_MAX_FRAME_LEN};
use tidewire::http::{Http1Parser, HttpHandlers, HttpParser, HttpResponse, HttpSession};
use tidewire::role::Role;
use tidewire::session::SessionOptions;

#[derive(Parser, Debug)]
#[command(name = "http_server")]
struct Args {
    #[arg(long, default_value = "127.0.0.1:8080")]
    listen: SocketAddr,
    #[arg(long, default_value_t = 2)]
    executors: usize,
    #[arg(long, default_value_t = DEFAULT_MAX_FRAME_LEN)]
    max_frame_len: usize,
}

fn handlers() -> HttpHandlers<Http1Parser> {
    HttpHandlers::new()
        .on_request(|parser: &Http1Parser, session: &HttpSession| {
            let path = parser.path().unwrap_or("/");
            log::info!("{} {}", parser.method().unwrap_or("-"), path);

            let response = match path {
                "/" => HttpResponse::new(200)
                    .header("content-type", "text/plain")
                    .body("hello from tidewire\n"),
                _ => HttpResponse::new(404),
            };
            session.send(response.encode());
        })
        .on_ws_connected(|session: &HttpSession, parser: &Http1Parser| {
            log::info!("session {} upgraded on {:?}", session.session().id(), parser.path());
        })
        .on_ws_message(|session: &HttpSession, opcode, payload: &[u8]| match opcode {
            OpCode::Ping => session.send_ws(OpCode::Pong, payload),
            OpCode::Close => session.close(),
            OpCode::Text | OpCode::Binary => session.send_ws(opcode, payload),
            _ => {}
        })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();
    let max_frame_len = args.max_frame_len;

    let mut acceptor = Acceptor::bind(args.listen, ExecutorPool::new(args.executors, 1)?)?;
    acceptor.start_accept(move |tcp, _| {
        let session = start_session(tcp, &SessionOptions::default(), &Handle::current());
        setup_http_session(session, Role::Server, Http1Parser::new(), handlers(), max_frame_len);
    })?;

    log::info!("http server on {}", acceptor.local_addr());
    tokio::signal::ctrl_c().await?;
    acceptor.close();
    Ok(())
}
