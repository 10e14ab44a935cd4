use std::{io, net::SocketAddr, time::Duration};

use bytes::Bytes;
use tempfile::TempDir;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
    sync::watch,
    task::JoinHandle,
};

use webexchange::{
    param::{ConnectionDirective, Endpoint, SessionMode, NOT_FOUND_BODY},
    util::{header_value, MessageReader},
    ClientSession, Response, Server, ServerConfig,
};

const INDEX: &str = "<html><body><h1>Hello from webexchange</h1></body></html>";

/// 在临时目录上启动一个监听随机端口的服务器
struct TestServer {
    _root: TempDir,
    addr: SocketAddr,
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<io::Result<()>>,
}

impl TestServer {
    async fn start(mode: SessionMode) -> Self {
        let root = TempDir::new().unwrap();
        std::fs::write(root.path().join("index.html"), INDEX).unwrap();
        std::fs::write(root.path().join("utf8.html"), "héllo").unwrap();

        let config = ServerConfig::new()
            .with_port(0)
            .with_www_root(root.path().to_str().unwrap())
            .with_mode(mode);
        let server = Server::bind(config).await.unwrap();
        let addr = server.local_addr().unwrap();
        let (shutdown, rx) = watch::channel(false);
        let handle = tokio::spawn(server.run(rx));

        Self {
            _root: root,
            addr,
            shutdown,
            handle,
        }
    }

    fn endpoint(&self) -> Endpoint {
        Endpoint::new("127.0.0.1", self.addr.port()).unwrap()
    }

    async fn stop(self) {
        self.shutdown.send_replace(true);
        let result = tokio::time::timeout(Duration::from_secs(5), self.handle)
            .await
            .expect("server did not stop")
            .unwrap();
        assert!(result.is_ok());
    }
}

/// 从一个已连接的流上读取一个完整响应
async fn read_response(stream: &mut TcpStream, reader: &mut MessageReader) -> Response {
    let read = async {
        let head = reader.read_head(stream).await.unwrap().unwrap();
        let length = header_value(std::str::from_utf8(&head).unwrap(), "Content-Length")
            .and_then(|l| l.parse::<usize>().ok());
        let body = reader.read_body(stream, length, 1 << 20).await.unwrap();
        Bytes::from([&head[..], &body[..]].concat())
    };
    let raw = tokio::time::timeout(Duration::from_secs(5), read)
        .await
        .expect("timed out waiting for response");
    Response::try_from(&raw).unwrap()
}

async fn assert_closed_by_server(stream: &mut TcpStream) {
    let mut rest = Vec::new();
    let n = tokio::time::timeout(Duration::from_secs(5), stream.read_to_end(&mut rest))
        .await
        .expect("server kept the connection open")
        .unwrap();
    assert_eq!(n, 0);
}

#[cfg(test)]
mod integration_tests {
    use super::*;

    #[tokio::test]
    async fn test_client_fetches_default_document() {
        let server = TestServer::start(SessionMode::Persistent).await;

        let mut client = ClientSession::new(1024, 1 << 20);
        let raw = client.request(&server.endpoint(), "").await.unwrap();
        let response = Response::try_from(&raw).unwrap();

        assert_eq!(response.status_code(), 200);
        assert_eq!(response.information(), "OK");
        assert_eq!(&response.content()[..], INDEX.as_bytes());
        assert_eq!(response.connection(), ConnectionDirective::Close);

        server.stop().await;
    }

    #[tokio::test]
    async fn test_client_missing_file_is_404() {
        let server = TestServer::start(SessionMode::Persistent).await;

        let mut client = ClientSession::new(1024, 1 << 20);
        let raw = client
            .request(&server.endpoint(), "/missing.html")
            .await
            .unwrap();
        let response = Response::try_from(&raw).unwrap();

        assert_eq!(response.status_code(), 404);
        assert_eq!(&response.content()[..], NOT_FOUND_BODY.as_bytes());

        server.stop().await;
    }

    #[tokio::test]
    async fn test_multibyte_body_content_length() {
        let server = TestServer::start(SessionMode::SingleShot).await;

        let mut client = ClientSession::new(4, 1 << 20);
        let raw = client.request(&server.endpoint(), "utf8.html").await.unwrap();
        let text = String::from_utf8(raw.to_vec()).unwrap();

        assert!(text.contains("Content-Length: 6\r\n"));
        assert!(text.ends_with("\r\n\r\nhéllo"));

        server.stop().await;
    }

    /// 对端不发送任何字节：不返回响应，服务器继续接受下一个连接
    #[tokio::test]
    async fn test_empty_connection_gets_no_response() {
        let server = TestServer::start(SessionMode::Persistent).await;

        let mut stream = TcpStream::connect(server.addr).await.unwrap();
        stream.shutdown().await.unwrap();
        assert_closed_by_server(&mut stream).await;

        let mut client = ClientSession::new(1024, 1 << 20);
        let raw = client.request(&server.endpoint(), "").await.unwrap();
        assert_eq!(Response::try_from(&raw).unwrap().status_code(), 200);

        server.stop().await;
    }

    #[tokio::test]
    async fn test_persistent_connection_serves_multiple_requests() {
        let server = TestServer::start(SessionMode::Persistent).await;
        let mut stream = TcpStream::connect(server.addr).await.unwrap();
        let mut reader = MessageReader::new(1024, 1 << 20);

        stream
            .write_all(b"GET / HTTP/1.1\r\nHost: 127.0.0.1\r\nConnection: keep-alive\r\n\r\n")
            .await
            .unwrap();
        let first = read_response(&mut stream, &mut reader).await;
        assert_eq!(first.status_code(), 200);
        assert_eq!(first.connection(), ConnectionDirective::KeepAlive);

        stream
            .write_all(b"GET /missing.html HTTP/1.1\r\nConnection: keep-alive\r\n\r\n")
            .await
            .unwrap();
        let second = read_response(&mut stream, &mut reader).await;
        assert_eq!(second.status_code(), 404);
        assert_eq!(second.connection(), ConnectionDirective::KeepAlive);

        stream
            .write_all(b"GET /utf8.html HTTP/1.1\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let third = read_response(&mut stream, &mut reader).await;
        assert_eq!(third.status_code(), 200);
        assert_eq!(third.connection(), ConnectionDirective::Close);
        assert_closed_by_server(&mut stream).await;

        server.stop().await;
    }

    #[tokio::test]
    async fn test_single_shot_closes_after_one_response() {
        let server = TestServer::start(SessionMode::SingleShot).await;
        let mut stream = TcpStream::connect(server.addr).await.unwrap();
        let mut reader = MessageReader::new(1024, 1 << 20);

        stream
            .write_all(b"GET / HTTP/1.1\r\nConnection: keep-alive\r\n\r\n")
            .await
            .unwrap();
        let response = read_response(&mut stream, &mut reader).await;

        assert_eq!(response.status_code(), 200);
        assert_eq!(response.connection(), ConnectionDirective::Close);
        assert_closed_by_server(&mut stream).await;

        server.stop().await;
    }

    #[tokio::test]
    async fn test_connections_are_served_in_turn() {
        let server = TestServer::start(SessionMode::Persistent).await;

        for _ in 0..3 {
            let mut client = ClientSession::new(1024, 1 << 20);
            let raw = client.request(&server.endpoint(), "index.html").await.unwrap();
            assert_eq!(Response::try_from(&raw).unwrap().status_code(), 200);
        }

        server.stop().await;
    }

    #[tokio::test]
    async fn test_shutdown_closes_idle_keep_alive_connection() {
        let server = TestServer::start(SessionMode::Persistent).await;
        let mut stream = TcpStream::connect(server.addr).await.unwrap();
        let mut reader = MessageReader::new(1024, 1 << 20);

        stream
            .write_all(b"GET / HTTP/1.1\r\nConnection: keep-alive\r\n\r\n")
            .await
            .unwrap();
        let response = read_response(&mut stream, &mut reader).await;
        assert_eq!(response.connection(), ConnectionDirective::KeepAlive);

        // 连接处于空闲等待状态时停机
        server.shutdown.send(true).unwrap();
        assert_closed_by_server(&mut stream).await;

        server.stop().await;
    }

    #[tokio::test]
    async fn test_client_binary_prints_response() {
        let server = TestServer::start(SessionMode::Persistent).await;
        let port = server.addr.port().to_string();

        let output = tokio::process::Command::new(env!("CARGO_BIN_EXE_webexchange-client"))
            .args([
                "--ip",
                "127.0.0.1",
                "-p",
                &port,
                "-f",
                "index.html",
                "-c",
                "/nonexistent/client.toml",
                "--log-config",
                "/nonexistent/log4rs.yaml",
            ])
            .output()
            .await
            .unwrap();
        let stdout = String::from_utf8_lossy(&output.stdout);

        assert!(output.status.success());
        assert!(stdout.starts_with("HTTP response message received:\nHTTP/1.1 200 OK\r\n"));
        assert!(stdout.contains(INDEX));

        server.stop().await;
    }

    #[tokio::test]
    async fn test_client_binary_reports_connect_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port().to_string();
        drop(listener);

        let output = tokio::process::Command::new(env!("CARGO_BIN_EXE_webexchange-client"))
            .args([
                "-i",
                "127.0.0.1",
                "-p",
                &port,
                "-c",
                "/nonexistent/client.toml",
                "--log-config",
                "/nonexistent/log4rs.yaml",
            ])
            .output()
            .await
            .unwrap();
        let stdout = String::from_utf8_lossy(&output.stdout);

        assert_eq!(output.status.code(), Some(1));
        assert!(stdout.starts_with("An error has occured: "));
        assert!(stdout.contains("exiting program..."));
    }
}
