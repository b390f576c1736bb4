use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};

use tidewire::endpoint::{start_session, Acceptor, Connector, Hooks};
use tidewire::executor::FixedExecutor;
use tidewire::frame::{encode_frame, Fin, Mask, OpCode};
use tidewire::handshake::accept_response;
use tidewire::http::{setup_http_session, websocket_upgrade_request, DEFAULT_MAX_FRAME_LEN};
use tidewire::http::{Http1Parser, HttpHandlers, HttpParser, HttpResponse, HttpSession};
use tidewire::role::Role;
use tidewire::session::{Session, SessionOptions, DEFAULT_MAX_RECV_BUFFER_SIZE};

use log::debug;

fn init_log() { let _ = env_logger::builder().is_test(true).try_init(); }

fn start(io: tokio::io::DuplexStream) -> Session {
    Session::start(&Handle::current(), io, &SessionOptions::default())
}

/// Answers every request with its path, echoes websocket messages.
fn serve(session: Session) {
    let handlers = HttpHandlers::new()
        .on_request(|parser: &Http1Parser, session: &HttpSession| {
            let path = parser.path().unwrap_or_default().to_owned();
            debug!("server: request {}", path);
            session.send(HttpResponse::new(200).header("content-type", "text/plain").body(path).encode());
        })
        .on_ws_message(|session: &HttpSession, opcode, payload: &[u8]| {
            debug!("server: ws message {:?}, {} bytes", opcode, payload.len());
            session.send_ws(opcode, payload);
        });

    setup_http_session(session, Role::Server, Http1Parser::new(), handlers, DEFAULT_MAX_FRAME_LEN);
}

async fn spawn_server() -> (Acceptor, SocketAddr) {
    let mut acceptor = Acceptor::bind("127.0.0.1:0".parse().unwrap(), FixedExecutor::current()).unwrap();
    let addr = acceptor.local_addr();

    acceptor
        .start_accept(|tcp, _| {
            serve(start_session(tcp, &SessionOptions::default(), &Handle::current()));
        })
        .unwrap();

    (acceptor, addr)
}

/// Read until a whole request head and body is parsed.
async fn read_request<R: AsyncRead + Unpin>(io: &mut R) -> Http1Parser {
    let mut parser = Http1Parser::new();
    let mut buf = Vec::new();
    let mut chunk = [0u8; 256];

    while !parser.is_completed() {
        let n = io.read(&mut chunk).await.unwrap();
        assert_ne!(n, 0, "connection closed before a request");
        buf.extend_from_slice(&chunk[..n]);
        let consumed = parser.try_parse(&buf).unwrap();
        buf.drain(..consumed);
    }

    parser
}

/// Read until a whole response head and body is parsed.
async fn read_response(tcp: &mut TcpStream) -> Http1Parser {
    let mut parser = Http1Parser::new();
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];

    while !parser.is_completed() {
        let n = tcp.read(&mut chunk).await.unwrap();
        assert_ne!(n, 0, "connection closed before a response");
        buf.extend_from_slice(&chunk[..n]);
        let consumed = parser.try_parse(&buf).unwrap();
        buf.drain(..consumed);
    }
    assert!(buf.is_empty());

    parser
}

#[tokio::test]
async fn pipelined_requests() {
    init_log();

    let (_acceptor, addr) = spawn_server().await;
    let mut tcp = TcpStream::connect(addr).await.unwrap();

    tcp.write_all(
        b"GET /first HTTP/1.1\r\nHost: localhost\r\n\r\n\
          POST /second HTTP/1.1\r\nHost: localhost\r\nContent-Length: 3\r\n\r\nabc\
          GET /third HTTP/1.1\r\nHost: localhost\r\n\r\n",
    )
    .await
    .unwrap();

    let mut expected = Vec::new();
    for path in ["/first", "/second", "/third"] {
        expected.extend_from_slice(&HttpResponse::new(200).header("content-type", "text/plain").body(path).encode());
    }

    let mut received = vec![0u8; expected.len()];
    tcp.read_exact(&mut received).await.unwrap();
    assert_eq!(received, expected);
}

#[tokio::test]
async fn connection_close_ends_session() {
    init_log();

    let (_acceptor, addr) = spawn_server().await;
    let mut tcp = TcpStream::connect(addr).await.unwrap();

    // the second request is never answered
    tcp.write_all(
        b"GET /last HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n\
          GET /ignored HTTP/1.1\r\nHost: localhost\r\n\r\n",
    )
    .await
    .unwrap();

    let response = read_response(&mut tcp).await;
    assert_eq!(response.status(), Some(200));
    assert_eq!(response.body(), b"/last");

    tcp.shutdown().await.unwrap();
    let mut rest = Vec::new();
    tcp.read_to_end(&mut rest).await.unwrap();
    assert!(rest.is_empty());
}

#[tokio::test]
async fn raw_websocket_client() {
    init_log();

    let (_acceptor, addr) = spawn_server().await;
    let mut tcp = TcpStream::connect(addr).await.unwrap();

    let (request, sec_accept) = websocket_upgrade_request("localhost", "/ws");
    tcp.write_all(&request).await.unwrap();

    let response = read_response(&mut tcp).await;
    assert_eq!(response.status(), Some(101));
    assert!(response.is_websocket());
    assert_eq!(response.header_value("sec-websocket-accept"), Some(sec_accept.as_str()));

    // one message in three masked fragments
    for (fin, opcode, payload) in [
        (Fin::N, OpCode::Text, &b"ab"[..]),
        (Fin::N, OpCode::Continue, &b"cd"[..]),
        (Fin::Y, OpCode::Continue, &b"ef"[..]),
    ] {
        let frame = encode_frame(fin, opcode, Role::Client.new_write_mask(), payload);
        tcp.write_all(&frame).await.unwrap();
    }

    let expected = encode_frame(Fin::Y, OpCode::Text, Mask::None, b"abcdef");
    let mut received = vec![0u8; expected.len()];
    tcp.read_exact(&mut received).await.unwrap();
    assert_eq!(&received[..], &expected[..]);
}

#[tokio::test]
async fn websocket_client_session() {
    init_log();

    let (_acceptor, addr) = spawn_server().await;

    let connector = Connector::new(FixedExecutor::current());
    let tcp = connector
        .connect_stream(&[addr], Duration::from_secs(5), &Hooks::new())
        .await
        .unwrap();
    let session = start_session(tcp, &SessionOptions::default(), &Handle::current());

    let (tx, mut rx) = mpsc::unbounded_channel();
    let handlers = HttpHandlers::new()
        .on_enter(|session: &HttpSession| session.upgrade("localhost", "/ws"))
        .on_ws_connected(|session: &HttpSession, parser: &Http1Parser| {
            assert_eq!(parser.status(), Some(101));
            session.send_ws(OpCode::Binary, b"hello");
            session.send_ws(OpCode::Text, b"world");
        })
        .on_ws_message(move |_: &HttpSession, opcode, payload: &[u8]| {
            tx.send((opcode, payload.to_vec())).unwrap();
        });

    let client = setup_http_session(session, Role::Client, Http1Parser::new(), handlers, DEFAULT_MAX_FRAME_LEN);
    assert_eq!(client.role(), Role::Client);

    assert_eq!(rx.recv().await.unwrap(), (OpCode::Binary, b"hello".to_vec()));
    assert_eq!(rx.recv().await.unwrap(), (OpCode::Text, b"world".to_vec()));

    client.close();
}

#[tokio::test]
async fn response_delimited_by_eof() {
    init_log();

    let (local, mut peer) = tokio::io::duplex(1024);
    let (tx, rx) = oneshot::channel();
    let mut tx = Some(tx);

    let handlers = HttpHandlers::new().on_request(move |parser: &Http1Parser, _: &HttpSession| {
        if let Some(tx) = tx.take() {
            tx.send((parser.status(), parser.body().to_vec())).unwrap();
        }
    });
    setup_http_session(start(local), Role::Client, Http1Parser::new(), handlers, DEFAULT_MAX_FRAME_LEN);

    peer.write_all(b"HTTP/1.1 200 OK\r\nServer: test\r\n\r\nhello ").await.unwrap();
    peer.write_all(b"world").await.unwrap();
    peer.shutdown().await.unwrap();

    let (status, body) = rx.await.unwrap();
    assert_eq!(status, Some(200));
    assert_eq!(body, b"hello world");
}

#[tokio::test]
async fn upgrade_without_key_closes() {
    init_log();

    let (local, mut peer) = tokio::io::duplex(1024);
    let (closed_tx, closed_rx) = oneshot::channel();

    let handlers = HttpHandlers::<Http1Parser>::new().on_closed(move |_| closed_tx.send(()).unwrap());
    let session = setup_http_session(start(local), Role::Server, Http1Parser::new(), handlers, DEFAULT_MAX_FRAME_LEN);

    peer.write_all(b"GET /ws HTTP/1.1\r\nHost: localhost\r\nUpgrade: websocket\r\nConnection: Upgrade\r\n\r\n")
        .await
        .unwrap();

    closed_rx.await.unwrap();
    assert!(session.session().is_closed());

    let mut rest = Vec::new();
    peer.read_to_end(&mut rest).await.unwrap();
    assert!(rest.is_empty());
}

#[tokio::test]
async fn oversized_message_closes() {
    init_log();

    let (local, mut peer) = tokio::io::duplex(1024);
    let (closed_tx, closed_rx) = oneshot::channel();

    let handlers = HttpHandlers::<Http1Parser>::new()
        .on_ws_message(|_: &HttpSession, _, _: &[u8]| panic!("oversized message delivered"))
        .on_closed(move |_| closed_tx.send(()).unwrap());
    setup_http_session(start(local), Role::Server, Http1Parser::new(), handlers, 8);

    let (request, _) = websocket_upgrade_request("localhost", "/ws");
    peer.write_all(&request).await.unwrap();
    peer.write_all(&encode_frame(Fin::N, OpCode::Binary, Role::Client.new_write_mask(), b"12345"))
        .await
        .unwrap();
    peer.write_all(&encode_frame(Fin::Y, OpCode::Continue, Role::Client.new_write_mask(), b"67890"))
        .await
        .unwrap();

    closed_rx.await.unwrap();
}

#[tokio::test]
async fn refused_upgrade_closes() {
    init_log();

    let (local, mut peer) = tokio::io::duplex(1024);
    let (closed_tx, closed_rx) = oneshot::channel();

    let handlers = HttpHandlers::<Http1Parser>::new()
        .on_enter(|session: &HttpSession| session.upgrade("localhost", "/ws"))
        .on_request(|_: &Http1Parser, _: &HttpSession| panic!("refusal delivered as a response"))
        .on_closed(move |_| closed_tx.send(()).unwrap());
    setup_http_session(start(local), Role::Client, Http1Parser::new(), handlers, DEFAULT_MAX_FRAME_LEN);

    let request = read_request(&mut peer).await;
    assert!(request.is_websocket());

    peer.write_all(&HttpResponse::new(403).encode()).await.unwrap();
    closed_rx.await.unwrap();
}

#[tokio::test]
async fn unterminated_head_closes() {
    init_log();

    // the head limit and the receive buffer both stop an endless header block
    for max_recv_buffer_size in [DEFAULT_MAX_RECV_BUFFER_SIZE, 4096] {
        let (local, mut peer) = tokio::io::duplex(1024);
        let (closed_tx, closed_rx) = oneshot::channel();

        let options = SessionOptions {
            max_recv_buffer_size,
            ..Default::default()
        };
        let handlers = HttpHandlers::<Http1Parser>::new()
            .on_request(|_: &Http1Parser, _: &HttpSession| panic!("unterminated head delivered"))
            .on_closed(move |_| closed_tx.send(()).unwrap());
        setup_http_session(
            Session::start(&Handle::current(), local, &options),
            Role::Server,
            Http1Parser::new(),
            handlers,
            DEFAULT_MAX_FRAME_LEN,
        );

        // fails with a broken pipe once the session is gone
        tokio::spawn(async move {
            let _ = peer.write_all(b"GET / HTTP/1.1\r\nHost: localhost\r\nx: ").await;
            let _ = peer.write_all(&vec![b'a'; 100_000]).await;
        });

        tokio::time::timeout(Duration::from_secs(5), closed_rx)
            .await
            .expect("session left open")
            .unwrap();
    }
}

#[tokio::test]
async fn light_client_sends_unmasked_payload() {
    init_log();

    let (local, mut peer) = tokio::io::duplex(1024);
    let (tx, mut rx) = mpsc::unbounded_channel();

    let handlers = HttpHandlers::new()
        .on_enter(|session: &HttpSession| session.upgrade("localhost", "/ws"))
        .on_ws_connected(|session: &HttpSession, _: &Http1Parser| session.send_ws(OpCode::Text, b"light"))
        .on_ws_message(move |_: &HttpSession, opcode, payload: &[u8]| {
            tx.send((opcode, payload.to_vec())).unwrap();
        });
    let client = setup_http_session(start(local), Role::LightClient, Http1Parser::new(), handlers, DEFAULT_MAX_FRAME_LEN);
    assert!(!client.role().is_server());

    let request = read_request(&mut peer).await;
    assert!(request.is_websocket());
    let sec_key = request.header_value("sec-websocket-key").unwrap();
    peer.write_all(&accept_response(sec_key).unwrap()).await.unwrap();

    // mask bit set, all-zero key, payload as is
    let expected = encode_frame(Fin::Y, OpCode::Text, Mask::Skip, b"light");
    let mut received = vec![0u8; expected.len()];
    peer.read_exact(&mut received).await.unwrap();
    assert_eq!(&received[..], &expected[..]);
    assert_eq!(&received[..6], &[0x81, 0x85, 0, 0, 0, 0]);
    assert_eq!(&received[6..], b"light");

    peer.write_all(&encode_frame(Fin::Y, OpCode::Binary, Mask::None, b"reply"))
        .await
        .unwrap();
    assert_eq!(rx.recv().await.unwrap(), (OpCode::Binary, b"reply".to_vec()));
}
