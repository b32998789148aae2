//! HTTP server implementation.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::{Semaphore, mpsc};
use tokio::task::{JoinHandle, JoinSet};
use tokio::signal;
use log::{debug, error, info, warn};

use crate::pages::{discover_pages, find_pages_dir};
use crate::parser::{find_header_end, parse_request};
use crate::pipeline::{Dispatcher, ErrorHandler, HandlerError, HandlerResult, Reply, RequestContext, Route, error_handler_fn};
use crate::router::{Error as RouterError, RouteMethod, RouteTable};
use crate::server::config::ServerConfig;
use crate::server::error::Error;
use crate::server::response::{HttpResponse, StatusCode};

/// An HTTP server.
///
/// Routes are registered up front; [`HttpServer::start`] consumes the server
/// and freezes its routes for the lifetime of the listener.
pub struct HttpServer {
    /// The server configuration.
    pub config: ServerConfig,
    routes: RouteTable<Route>,
    error_handler: Option<Box<dyn ErrorHandler>>,
}

/// A running server.
///
/// Dropping the handle without calling [`ServerHandle::stop`] also shuts
/// the server down, without waiting for it.
pub struct ServerHandle {
    local_addr: SocketAddr,
    shutdown_tx: mpsc::Sender<()>,
    accept_task: JoinHandle<()>,
}

impl ServerHandle {
    /// The address the listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting connections and wait for in-flight ones to finish.
    pub async fn stop(self) {
        info!("Stopping server on {addr}", addr = self.local_addr);
        let _ = self.shutdown_tx.send(()).await;
        if let Err(e) = self.accept_task.await {
            error!("Accept loop failed: {e}");
        }
        info!("Server stopped");
    }
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            routes: RouteTable::new(),
            error_handler: None,
        }
    }

    /// Register a route for `method` and `pattern`.
    pub fn route(&mut self, method: RouteMethod, pattern: &str, route: Route) -> Result<&mut Self, RouterError> {
        self.routes.register(method, pattern, route)?;
        Ok(self)
    }

    /// Register a `GET` handler.
    pub fn get<F, Fut>(&mut self, pattern: &str, handler: F) -> Result<&mut Self, RouterError>
    where
        F: Fn(&mut RequestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.route(RouteMethod::Get, pattern, Route::new(handler))
    }

    /// Register a `POST` handler.
    pub fn post<F, Fut>(&mut self, pattern: &str, handler: F) -> Result<&mut Self, RouterError>
    where
        F: Fn(&mut RequestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.route(RouteMethod::Post, pattern, Route::new(handler))
    }

    /// Register a `PUT` handler.
    pub fn put<F, Fut>(&mut self, pattern: &str, handler: F) -> Result<&mut Self, RouterError>
    where
        F: Fn(&mut RequestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.route(RouteMethod::Put, pattern, Route::new(handler))
    }

    /// Register a `DELETE` handler.
    pub fn delete<F, Fut>(&mut self, pattern: &str, handler: F) -> Result<&mut Self, RouterError>
    where
        F: Fn(&mut RequestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.route(RouteMethod::Delete, pattern, Route::new(handler))
    }

    /// Register a handler for every method. These routes are tried before
    /// any method-specific route.
    pub fn all<F, Fut>(&mut self, pattern: &str, handler: F) -> Result<&mut Self, RouterError>
    where
        F: Fn(&mut RequestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.route(RouteMethod::All, pattern, Route::new(handler))
    }

    /// Install the server-wide error handler.
    pub fn on_error<F, Fut>(&mut self, handler: F) -> &mut Self
    where
        F: Fn(&mut RequestContext, &HandlerError) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Reply, HandlerError>> + Send + 'static,
    {
        self.error_handler = Some(error_handler_fn(handler));
        self
    }

    pub fn routes(&self) -> &RouteTable<Route> {
        &self.routes
    }

    /// Register every page found in the pages directory.
    ///
    /// Pages that clash with an existing route are logged and skipped.
    /// Returns the number of pages registered.
    pub fn load_pages(&mut self) -> Result<usize, Error> {
        let Some(dir) = find_pages_dir(self.config.pages_dir.as_deref()) else {
            if let Some(configured) = &self.config.pages_dir {
                warn!("Pages directory {dir} does not exist", dir = configured.display());
            }
            return Ok(0);
        };

        info!("Loading pages from {dir}", dir = dir.display());
        let mut loaded = 0;
        for page in discover_pages(&dir)? {
            match self.routes.register(page.method, &page.pattern, page.route()) {
                Ok(()) => {
                    debug!("Registered page {pattern} from {path}", pattern = page.pattern, path = page.source.display());
                    loaded += 1;
                }
                Err(e) => error!("Failed to register page {path}: {e}", path = page.source.display()),
            }
        }

        Ok(loaded)
    }

    /// Freeze the registered routes into a dispatcher.
    pub fn into_dispatcher(self) -> Dispatcher {
        let dispatcher = Dispatcher::new(self.routes, self.config.strict_matching);
        match self.error_handler {
            Some(handler) => dispatcher.with_error_handler(handler),
            None => dispatcher,
        }
    }

    /// Display the server banner and registered endpoints.
    fn display_server_info(addr: SocketAddr, dispatcher: &Dispatcher) {
        let banner = include_str!("../banner.txt");
        info!("\n{banner}");

        info!("Registered endpoints:");
        for (method, pattern) in dispatcher.routes().routes() {
            info!("  {method} {pattern}");
        }
        info!("Server listening on http://{addr}");
    }

    /// Load pages, bind the listener, and start accepting connections.
    pub async fn start(mut self) -> Result<ServerHandle, Error> {
        self.load_pages()?;

        let listener = TcpListener::bind(&self.config.addr).await?;
        let local_addr = listener.local_addr()?;

        let config = Arc::new(self.config.clone());
        let dispatcher = Arc::new(self.into_dispatcher());
        Self::display_server_info(local_addr, &dispatcher);

        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);
        let accept_task = tokio::spawn(Self::accept_loop(listener, dispatcher, config, shutdown_rx));

        Ok(ServerHandle {
            local_addr,
            shutdown_tx,
            accept_task,
        })
    }

    /// Start the server and serve until Ctrl+C.
    pub async fn run(self) -> Result<(), Error> {
        let handle = self.start().await?;

        match signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, initiating graceful shutdown"),
            Err(e) => error!("Error setting up Ctrl+C handler: {e}"),
        }

        handle.stop().await;
        Ok(())
    }

    async fn accept_loop(
        listener: TcpListener,
        dispatcher: Arc<Dispatcher>,
        config: Arc<ServerConfig>,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        let semaphore = Arc::new(Semaphore::new(config.max_connections));
        let mut tasks = JoinSet::new();

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!("Shutting down server...");
                    break;
                }

                Some(res) = tasks.join_next(), if !tasks.is_empty() => {
                    if let Err(e) = res {
                        error!("Connection task failed: {e}");
                    }
                }

                accept_result = listener.accept() => {
                    match accept_result {
                        Ok((socket, addr)) => {
                            Self::handle_new_connection(
                                socket,
                                addr,
                                semaphore.clone(),
                                dispatcher.clone(),
                                config.clone(),
                                &mut tasks,
                            ).await;
                        }
                        Err(e) => {
                            if Self::handle_connection_error(e).await {
                                break;
                            }
                        }
                    }
                }
            }
        }

        drop(listener);
        Self::perform_shutdown(&mut tasks, &config).await;
    }

    /// Handle a new connection.
    async fn handle_new_connection(
        mut socket: tokio::net::TcpStream,
        addr: SocketAddr,
        semaphore: Arc<Semaphore>,
        dispatcher: Arc<Dispatcher>,
        config: Arc<ServerConfig>,
        tasks: &mut JoinSet<()>,
    ) {
        let permit = match semaphore.try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                warn!("Connection limit reached, rejecting connection from {addr}");
                let response = HttpResponse::plain(
                    StatusCode::ServiceUnavailable,
                    "Server is at capacity, please try again later",
                );
                let _ = socket.write_all(&response.to_bytes()).await;
                let _ = socket.shutdown().await;
                return;
            }
        };

        tasks.spawn(async move {
            // Released when the connection is done
            let _permit = permit;

            if let Err(e) = Self::handle_connection(&mut socket, &dispatcher, &config).await {
                error!("Error handling connection from {addr}: {e}");
            }
            let _ = socket.shutdown().await;
        });
    }

    /// Handle connection errors.
    async fn handle_connection_error(e: std::io::Error) -> bool {
        error!("Error accepting connection: {e}");

        if e.kind() == std::io::ErrorKind::BrokenPipe {
            error!("Critical error accepting connection, shutting down");
            return true;
        }

        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
        false
    }

    /// Wait for in-flight connections, bounded by the shutdown timeout.
    async fn perform_shutdown(tasks: &mut JoinSet<()>, config: &ServerConfig) {
        info!("Waiting for {len} active connections to complete...", len = tasks.len());
        let drained = tokio::time::timeout(config.shutdown_timeout, async {
            while let Some(res) = tasks.join_next().await {
                if let Err(e) = res {
                    error!("Task failed during shutdown: {e}");
                }
            }
        })
        .await;

        if drained.is_err() {
            warn!("Shutdown timed out, aborting {len} connections", len = tasks.len());
            tasks.abort_all();
        }

        info!("Server shutdown complete");
    }

    /// Read one request from `socket`.
    ///
    /// Returns `None` when the peer closed the connection without sending
    /// anything.
    async fn read_request(
        socket: &mut (impl AsyncRead + Unpin),
        config: &ServerConfig,
    ) -> Result<Option<Vec<u8>>, Error> {
        let mut buf = Vec::new();
        let mut chunk = vec![0; config.read_buffer_size.max(1)];
        let mut expected: Option<usize> = None;

        loop {
            if let Some(total) = expected {
                if buf.len() >= total {
                    break;
                }
            } else if let Some((_, body_start)) = find_header_end(&buf) {
                let head = parse_request(&buf[..body_start])?;
                let length = head.content_length()?.unwrap_or(0);
                if length > config.max_body_size {
                    return Err(Error::PayloadTooLarge {
                        size: length,
                        limit: config.max_body_size,
                    });
                }
                expected = Some(body_start + length);
                continue;
            } else if buf.len() > config.max_body_size {
                return Err(Error::PayloadTooLarge {
                    size: buf.len(),
                    limit: config.max_body_size,
                });
            }

            let n = socket.read(&mut chunk).await?;
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
        }

        Ok((!buf.is_empty()).then_some(buf))
    }

    /// Handle a single connection: read one request, dispatch it, and write
    /// the response.
    pub async fn handle_connection(
        socket: &mut (impl AsyncRead + AsyncWrite + Unpin),
        dispatcher: &Dispatcher,
        config: &ServerConfig,
    ) -> Result<(), Error> {
        let bytes = match Self::read_request(socket, config).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return Ok(()),
            Err(e @ Error::PayloadTooLarge { .. }) => {
                let response = HttpResponse::plain(StatusCode::PayloadTooLarge, &e.to_string());
                socket.write_all(&response.to_bytes()).await?;
                return Err(e);
            }
            Err(Error::Parse(e)) => {
                let response = HttpResponse::plain(StatusCode::BadRequest, &format!("Error parsing request: {e}"));
                socket.write_all(&response.to_bytes()).await?;
                return Err(Error::Parse(e));
            }
            Err(e) => return Err(e),
        };

        let request = match parse_request(&bytes) {
            Ok(req) => req,
            Err(e) => {
                let response = HttpResponse::plain(StatusCode::BadRequest, &format!("Error parsing request: {e}"));
                socket.write_all(&response.to_bytes()).await?;
                return Err(Error::Parse(e));
            }
        };

        let method = request.method;
        let path = request.path.clone();
        let response = dispatcher.dispatch(request).await;
        debug!("{method} {path} -> {status}", status = response.status as u16);

        socket.write_all(&response.to_bytes()).await?;
        socket.flush().await?;
        Ok(())
    }
}
