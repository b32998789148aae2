//! Tests for the HTTP server implementation.

#[cfg(test)]
mod server_tests {
    use std::io::{self, Cursor};
    use std::net::SocketAddr;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use std::time::Duration;
    use serde_json::json;
    use tempfile::TempDir;
    use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadBuf};
    use tokio::net::TcpStream;
    use tokio::time;

    use crate::pipeline::{Flow, Reply, RequestContext, Route};
    use crate::router::{Error as RouterError, RouteMethod};
    use crate::server::{Error, HttpResponse, HttpServer, ServerConfig, StatusCode};

    // Mock TcpStream for testing
    struct MockTcpStream {
        read_data: Cursor<Vec<u8>>,
        write_data: Vec<u8>,
        max_read: usize,
    }

    impl MockTcpStream {
        fn new(read_data: Vec<u8>) -> Self {
            Self {
                read_data: Cursor::new(read_data),
                write_data: Vec::new(),
                max_read: usize::MAX,
            }
        }

        /// Hand out at most `max_read` bytes per read call.
        fn chunked(read_data: Vec<u8>, max_read: usize) -> Self {
            Self {
                max_read,
                ..Self::new(read_data)
            }
        }

        fn written_data(&self) -> String {
            String::from_utf8_lossy(&self.write_data).to_string()
        }
    }

    impl AsyncRead for MockTcpStream {
        fn poll_read(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            let this = self.get_mut();
            let unfilled = buf.initialize_unfilled();
            let limit = unfilled.len().min(this.max_read);
            let n = std::io::Read::read(&mut this.read_data, &mut unfilled[..limit])?;
            buf.advance(n);
            Poll::Ready(Ok(()))
        }
    }

    impl AsyncWrite for MockTcpStream {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            let this = self.get_mut();
            this.write_data.extend_from_slice(buf);
            Poll::Ready(Ok(buf.len()))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    fn test_server() -> HttpServer {
        let mut server = HttpServer::new(ServerConfig::default());
        server
            .get("/test", |_req| async { Ok(Flow::reply("Test response")) })
            .unwrap()
            .post("/users/:id", |req| {
                let reply = json!({
                    "id": req.param("id").unwrap_or_default(),
                    "body": req.body.clone(),
                });
                async move { Ok(Flow::reply(reply)) }
            })
            .unwrap();
        server
    }

    async fn serve(server: HttpServer, request: &[u8]) -> (Result<(), Error>, String) {
        let config = server.config.clone();
        let dispatcher = server.into_dispatcher();
        let mut stream = MockTcpStream::new(request.to_vec());
        let result = HttpServer::handle_connection(&mut stream, &dispatcher, &config).await;
        (result, stream.written_data())
    }

    fn local_config() -> ServerConfig {
        ServerConfig::default().with_addr(SocketAddr::from(([127, 0, 0, 1], 0)))
    }

    async fn send_raw(addr: SocketAddr, request: &[u8]) -> String {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(request).await.unwrap();
        let mut response = Vec::new();
        stream.read_to_end(&mut response).await.unwrap();
        String::from_utf8_lossy(&response).to_string()
    }

    #[tokio::test]
    async fn test_server_creation() {
        let config = ServerConfig {
            addr: "127.0.0.1:8080".parse().unwrap(),
            max_connections: 100,
            read_buffer_size: 4096,
            ..ServerConfig::default()
        };

        let server = HttpServer::new(config.clone());
        assert_eq!(server.config.addr, config.addr);
        assert_eq!(server.config.max_connections, config.max_connections);
        assert_eq!(server.config.read_buffer_size, config.read_buffer_size);
        assert!(server.routes().is_empty());
    }

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.addr, "127.0.0.1:8080".parse().unwrap());
        assert_eq!(config.max_connections, 1024);
        assert_eq!(config.max_body_size, 1024 * 1024);
        assert!(!config.strict_matching);
        assert!(config.pages_dir.is_none());
        assert_eq!(config.shutdown_timeout, Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_add_routes() {
        let server = test_server();

        assert_eq!(
            server.routes().routes(),
            vec![(RouteMethod::Get, "/test"), (RouteMethod::Post, "/users/:id")]
        );
    }

    #[tokio::test]
    async fn test_duplicate_route_is_rejected() {
        let mut server = test_server();

        let result = server.get("/test", |_req| async { Ok(Flow::Next) });

        assert!(matches!(result, Err(RouterError::DuplicateRoute { .. })));
        assert_eq!(server.routes().len(), 2);
    }

    #[tokio::test]
    async fn test_handle_connection_with_valid_request() {
        let (result, response) = serve(test_server(), b"GET /test HTTP/1.1\r\nHost: localhost\r\n\r\n").await;

        assert!(result.is_ok());
        assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(response.contains("Content-Type: text/plain; charset=utf-8\r\n"));
        assert!(response.contains("Content-Length: 13\r\n"));
        assert!(response.contains("Connection: close\r\n"));
        assert!(response.ends_with("\r\n\r\nTest response"));
    }

    #[tokio::test]
    async fn test_handle_connection_with_not_found() {
        let (result, response) = serve(test_server(), b"GET /nonexistent HTTP/1.1\r\nHost: localhost\r\n\r\n").await;

        assert!(result.is_ok());
        assert!(response.starts_with("HTTP/1.1 404 Not Found\r\n"));
        assert!(response.ends_with("404 - Not Found"));
    }

    #[tokio::test]
    async fn test_handle_connection_with_unregistered_method() {
        let (result, response) = serve(test_server(), b"DELETE /test HTTP/1.1\r\nHost: localhost\r\n\r\n").await;

        assert!(result.is_ok());
        assert!(response.starts_with("HTTP/1.1 404 Not Found\r\n"));
    }

    #[tokio::test]
    async fn test_handle_connection_with_invalid_request() {
        let (result, response) = serve(test_server(), b"INVALID REQUEST").await;

        assert!(matches!(result, Err(Error::Parse(_))));
        assert!(response.starts_with("HTTP/1.1 400 Bad Request\r\n"));
        assert!(response.contains("Error parsing request:"));
    }

    #[tokio::test]
    async fn test_handle_connection_with_empty_stream() {
        let (result, response) = serve(test_server(), b"").await;

        assert!(result.is_ok());
        assert!(response.is_empty());
    }

    #[tokio::test]
    async fn test_handle_connection_reads_body_in_chunks() {
        let request = b"POST /users/42 HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/json\r\nContent-Length: 15\r\n\r\n{\"name\":\"luna\"}";
        let server = test_server();
        let config = ServerConfig {
            read_buffer_size: 8,
            ..server.config.clone()
        };
        let dispatcher = server.into_dispatcher();
        let mut stream = MockTcpStream::chunked(request.to_vec(), 5);

        let result = HttpServer::handle_connection(&mut stream, &dispatcher, &config).await;

        assert!(result.is_ok());
        let response = stream.written_data();
        assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(response.contains("Content-Type: application/json\r\n"));
        assert!(response.ends_with(r#"{"id":"42","body":{"name":"luna"}}"#));
    }

    #[tokio::test]
    async fn test_handle_connection_with_oversized_body() {
        let mut server = test_server();
        server.config.max_body_size = 4;

        let (result, response) = serve(
            server,
            b"POST /users/1 HTTP/1.1\r\nHost: localhost\r\nContent-Length: 10\r\n\r\n0123456789",
        )
        .await;

        assert!(matches!(result, Err(Error::PayloadTooLarge { size: 10, limit: 4 })));
        assert!(response.starts_with("HTTP/1.1 413 Payload Too Large\r\n"));
    }

    #[tokio::test]
    async fn test_handle_connection_with_invalid_content_length() {
        let (result, response) = serve(
            test_server(),
            b"POST /users/1 HTTP/1.1\r\nHost: localhost\r\nContent-Length: ten\r\n\r\n",
        )
        .await;

        assert!(matches!(result, Err(Error::Parse(_))));
        assert!(response.starts_with("HTTP/1.1 400 Bad Request\r\n"));
    }

    #[tokio::test]
    async fn test_route_for_all_methods() {
        let mut server = HttpServer::new(ServerConfig::default());
        server
            .all("/multi", |req| {
                let method = req.method.to_string();
                async move { Ok(Flow::reply(format!("{method} response"))) }
            })
            .unwrap();
        let dispatcher = server.into_dispatcher();
        let config = ServerConfig::default();

        for method in ["GET", "POST", "PATCH"] {
            let request = format!("{method} /multi HTTP/1.1\r\nHost: localhost\r\n\r\n");
            let mut stream = MockTcpStream::new(request.into_bytes());
            HttpServer::handle_connection(&mut stream, &dispatcher, &config).await.unwrap();
            assert!(stream.written_data().ends_with(&format!("{method} response")));
        }
    }

    #[tokio::test]
    async fn test_global_error_handler() {
        let mut server = HttpServer::new(ServerConfig::default());
        server
            .get("/fail", |_req| async { Err(anyhow::anyhow!("database offline")) })
            .unwrap();
        server.on_error(|_req: &mut RequestContext, error: &anyhow::Error| {
            let response = HttpResponse::new(StatusCode::ServiceUnavailable).with_body_string(error.to_string());
            async move { Ok(Reply::from(response)) }
        });

        let (result, response) = serve(server, b"GET /fail HTTP/1.1\r\nHost: localhost\r\n\r\n").await;

        assert!(result.is_ok());
        assert!(response.starts_with("HTTP/1.1 503 Service Unavailable\r\n"));
        assert!(response.ends_with("database offline"));
    }

    #[tokio::test]
    async fn test_strict_matching_distinguishes_trailing_slash() {
        let mut server = HttpServer::new(ServerConfig {
            strict_matching: true,
            ..ServerConfig::default()
        });
        server.get("/a", |_req| async { Ok(Flow::reply("a")) }).unwrap();

        let (_, response) = serve(server, b"GET /a/ HTTP/1.1\r\nHost: localhost\r\n\r\n").await;

        assert!(response.starts_with("HTTP/1.1 404 Not Found\r\n"));
    }

    #[tokio::test]
    async fn test_load_pages() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("index.html"), "<h1>home</h1>").unwrap();
        std::fs::write(dir.path().join("test.txt"), "shadowed").unwrap();
        std::fs::write(dir.path().join("about.json"), r#"{"about":"us"}"#).unwrap();

        let mut server = test_server();
        server.config.pages_dir = Some(dir.path().to_path_buf());

        // `/test` is already taken by a handler, so that page is skipped
        assert_eq!(server.load_pages().unwrap(), 2);

        let (_, response) = serve(server, b"GET / HTTP/1.1\r\nHost: localhost\r\n\r\n").await;
        assert!(response.contains("Content-Type: text/html; charset=utf-8\r\n"));
        assert!(response.ends_with("<h1>home</h1>"));
    }

    #[tokio::test]
    async fn test_load_pages_without_directory() {
        let dir = TempDir::new().unwrap();
        let mut server = HttpServer::new(ServerConfig::default().with_pages_dir(dir.path().join("missing")));

        assert_eq!(server.load_pages().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_start_serve_and_stop() {
        let mut server = HttpServer::new(local_config());
        server
            .route(
                RouteMethod::Get,
                "/:param",
                Route::new(|req: &mut RequestContext| {
                    let reply = json!({ "method": req.method.to_string(), "param": req.param("param") });
                    async move { Ok(Flow::reply(reply)) }
                }),
            )
            .unwrap();

        let handle = server.start().await.unwrap();
        let addr = handle.local_addr();
        assert_ne!(addr.port(), 0);

        let response = send_raw(addr, b"GET /abc HTTP/1.1\r\nHost: localhost\r\n\r\n").await;
        assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(response.ends_with(r#"{"method":"GET","param":"abc"}"#));

        handle.stop().await;
        assert!(TcpStream::connect(addr).await.is_err());
    }

    #[tokio::test]
    async fn test_stop_waits_for_in_flight_requests() {
        let mut server = HttpServer::new(local_config());
        server
            .get("/slow", |_req| async {
                time::sleep(Duration::from_millis(200)).await;
                Ok(Flow::reply("done"))
            })
            .unwrap();

        let handle = server.start().await.unwrap();
        let addr = handle.local_addr();

        let client = tokio::spawn(async move { send_raw(addr, b"GET /slow HTTP/1.1\r\nHost: localhost\r\n\r\n").await });
        time::sleep(Duration::from_millis(50)).await;

        handle.stop().await;

        let response = client.await.unwrap();
        assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(response.ends_with("done"));
    }

    #[tokio::test]
    async fn test_connection_limit_response() {
        let mut server = HttpServer::new(ServerConfig {
            max_connections: 1,
            ..local_config()
        });
        server
            .get("/slow", |_req| async {
                time::sleep(Duration::from_millis(300)).await;
                Ok(Flow::reply("done"))
            })
            .unwrap();

        let handle = server.start().await.unwrap();
        let addr = handle.local_addr();

        let first = tokio::spawn(async move { send_raw(addr, b"GET /slow HTTP/1.1\r\nHost: localhost\r\n\r\n").await });
        time::sleep(Duration::from_millis(100)).await;

        // The rejection is written as soon as the connection is accepted
        let mut stream = TcpStream::connect(addr).await.unwrap();
        let mut rejected = Vec::new();
        stream.read_to_end(&mut rejected).await.unwrap();
        let rejected = String::from_utf8_lossy(&rejected).to_string();
        assert!(rejected.starts_with("HTTP/1.1 503 Service Unavailable\r\n"));
        assert!(rejected.contains("Server is at capacity, please try again later"));

        assert!(first.await.unwrap().ends_with("done"));
        handle.stop().await;
    }

    #[test]
    fn test_response_helpers() {
        let response = HttpResponse::internal_error("boom");
        assert_eq!(response.status, StatusCode::InternalServerError);
        assert_eq!(response.body, b"500 - boom");
        assert_eq!(response.header("content-length"), Some("10"));

        let bytes = String::from_utf8(HttpResponse::new(StatusCode::NoContent).to_bytes()).unwrap();
        assert!(bytes.starts_with("HTTP/1.1 204 No Content\r\n"));
        assert!(bytes.contains("Content-Length: 0\r\n"));
        assert!(bytes.contains("Server: microroute-rs\r\n"));
    }

    #[test]
    fn test_response_with_json() {
        let response = HttpResponse::new(StatusCode::Created)
            .with_json(&json!({"ok": true}))
            .unwrap();
        assert_eq!(response.header("Content-Type"), Some("application/json"));
        assert_eq!(response.body, br#"{"ok":true}"#);
    }
}
