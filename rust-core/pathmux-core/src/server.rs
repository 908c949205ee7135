//! # HTTP Server
//!
//! Listen/serve bootstrap around a [`Router`], built on Hyper and Tokio.
//!
//! Serving refuses to start while any registered route carries a build
//! error. Connections are HTTP/1; Ctrl-C stops accepting and waits up to
//! `shutdown_timeout` for in-flight connections to finish.

use crate::error::{Error, Result};
use crate::request::Request;
use crate::response::Response;
use crate::router::Router;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::StatusCode;
use hyper_util::rt::TokioIo;
use std::collections::HashMap;
use std::convert::Infallible;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// HTTP Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the server to
    pub address: SocketAddr,
    /// Enable keep-alive connections
    pub keep_alive: bool,
    /// Shutdown timeout for graceful shutdown (default: 30 seconds)
    pub shutdown_timeout: Duration,
    /// Max request body size in bytes
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: ([127, 0, 0, 1], 8000).into(),
            keep_alive: true,
            shutdown_timeout: Duration::from_secs(30),
            max_body_size: 1024 * 1024,
        }
    }
}

/// HTTP server dispatching through a [`Router`]
#[derive(Debug)]
pub struct Server {
    config: ServerConfig,
    router: Router,
}

impl Server {
    /// Create a server for `router`
    ///
    /// Registration is over once the router is handed over, so its routes
    /// are sorted here.
    #[must_use]
    pub fn new(mut router: Router) -> Self {
        router.sort_routes();
        Self {
            config: ServerConfig::default(),
            router,
        }
    }

    /// Replace the server configuration
    #[must_use]
    pub fn with_config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Bind the server to an address
    #[must_use]
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.config.address = addr;
        self
    }

    /// Set max request body size
    pub fn set_max_body_size(&mut self, bytes: usize) {
        self.config.max_body_size = bytes;
    }

    /// Active configuration
    #[must_use]
    pub const fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Router requests are dispatched through
    #[must_use]
    pub const fn router(&self) -> &Router {
        &self.router
    }

    /// Start the server with graceful shutdown
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidRoutes` if any route failed to build and
    /// `Error::BindError` if the address cannot be bound. Accept failures
    /// are logged and retried.
    pub async fn serve(self) -> Result<()> {
        self.router.ensure_valid()?;

        let addr = self.config.address;
        let bind_error = |source| Error::BindError {
            address: addr.to_string(),
            source,
        };

        let socket = if addr.is_ipv4() {
            tokio::net::TcpSocket::new_v4()
        } else {
            tokio::net::TcpSocket::new_v6()
        }
        .map_err(bind_error)?;
        socket.set_reuseaddr(true).map_err(bind_error)?;
        socket.bind(addr).map_err(bind_error)?;
        let listener = socket.listen(1024).map_err(bind_error)?;

        info!(address = %addr, "Server listening on http://{}", addr);

        let router = Arc::new(self.router);
        let active = Arc::new(AtomicUsize::new(0));
        let max_body_size = self.config.max_body_size;
        let keep_alive = self.config.keep_alive;

        let shutdown = shutdown_signal();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                accept_result = listener.accept() => {
                    let (stream, remote_addr) = match accept_result {
                        Ok(conn) => conn,
                        Err(e) => {
                            let backoff = accept_backoff(&e);
                            warn!(error = %e, backoff = ?backoff, "Failed to accept connection");
                            tokio::time::sleep(backoff).await;
                            continue;
                        }
                    };
                    let io = TokioIo::new(stream);

                    let router = router.clone();
                    let active = active.clone();

                    tokio::task::spawn(async move {
                        active.fetch_add(1, Ordering::Relaxed);

                        let service = service_fn(move |req| {
                            let router = router.clone();
                            async move {
                                let method = req.method().clone();
                                let path = req.uri().path().to_string();
                                let version = format!("{:?}", req.version());

                                let response = handle_request(req, &router, max_body_size).await;

                                info!("    {} - \"{} {} {}\" {}",
                                    remote_addr,
                                    method,
                                    path,
                                    version,
                                    response.status()
                                );
                                Ok::<_, Infallible>(response)
                            }
                        });

                        if let Err(err) = http1::Builder::new()
                            .keep_alive(keep_alive)
                            .serve_connection(io, service)
                            .await
                        {
                            error!("Error serving connection: {:?}", err);
                        }
                        active.fetch_sub(1, Ordering::Relaxed);
                    });
                }
                () = &mut shutdown => {
                    info!("Shutdown signal received, stopping server...");
                    break;
                }
            }
        }

        let timeout = self.config.shutdown_timeout;
        let drain = async {
            while active.load(Ordering::Relaxed) > 0 {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
        };
        if tokio::time::timeout(timeout, drain).await.is_err() {
            info!(
                remaining = active.load(Ordering::Relaxed),
                "Shutdown timeout elapsed with connections still open"
            );
        }
        Ok(())
    }

    /// Execute a test request directly without network stack
    pub async fn test_request(
        &self,
        method: &str,
        target: &str,
        headers: HashMap<String, String>,
        body: Option<Bytes>,
    ) -> Response {
        if let Some(b) = body.as_ref() {
            if b.len() > self.config.max_body_size {
                return payload_too_large();
            }
        }
        let req = Request::new(method, target, headers, body);
        self.router.handle_request(req).await
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to install CTRL+C signal handler: {}", e);
        std::future::pending::<()>().await;
    }
}

/// Delay before the next accept after `err`
///
/// Errors tied to a single connection retry at once; resource errors such
/// as running out of file descriptors wait before retrying.
fn accept_backoff(err: &io::Error) -> Duration {
    match err.kind() {
        io::ErrorKind::ConnectionRefused
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::Interrupted => Duration::ZERO,
        _ => Duration::from_millis(100),
    }
}

fn payload_too_large() -> Response {
    Response::text("Payload Too Large").with_status(StatusCode::PAYLOAD_TOO_LARGE.as_u16())
}

async fn handle_request(
    req: hyper::Request<hyper::body::Incoming>,
    router: &Router,
    max_body_size: usize,
) -> hyper::Response<Full<Bytes>> {
    let request = match Request::from_hyper_with_limit(req, max_body_size).await {
        Ok(r) => r,
        Err(Error::PayloadTooLarge { .. }) => return payload_too_large().into_hyper(),
        Err(e) => {
            error!("Failed to parse request: {}", e);
            return Response::text("Bad Request")
                .with_status(StatusCode::BAD_REQUEST.as_u16())
                .into_hyper();
        }
    };

    router.handle_request(request).await.into_hyper()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server() -> Server {
        let mut router = Router::new();
        router.get("/echo", |_req| async { Response::text("echo") });
        router.post("/upload", |req: Request| async move {
            Response::text(req.body_str().unwrap_or_default().to_string())
        });
        router.get("/items/:number", |_req| async { Response::text("vars") });
        router.get("/items/#[0-9]{3}", |_req| async { Response::text("regex") });
        Server::new(router)
    }

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.address.port(), 8000);
        assert!(config.keep_alive);
        assert_eq!(config.shutdown_timeout, Duration::from_secs(30));
        assert_eq!(config.max_body_size, 1024 * 1024);
    }

    #[test]
    fn test_bind_overrides_address() {
        let addr: SocketAddr = ([0, 0, 0, 0], 9090).into();
        let server = server().bind(addr);
        assert_eq!(server.config().address, addr);
    }

    #[test]
    fn test_new_sorts_routes() {
        let server = server();
        let first = &server.router().routes("GET")[0];
        assert_eq!(first.raw_path(), "/items/#[0-9]{3}");

        let resp =
            tokio_test::block_on(server.test_request("GET", "/items/123", HashMap::new(), None));
        assert_eq!(resp.body.as_ref(), b"regex");
    }

    #[test]
    fn test_request_body_limit() {
        let mut server = server();
        server.set_max_body_size(4);

        let ok = tokio_test::block_on(server.test_request(
            "POST",
            "/upload",
            HashMap::new(),
            Some(Bytes::from("data")),
        ));
        assert_eq!(ok.status, 200);
        assert_eq!(ok.body.as_ref(), b"data");

        let too_large = tokio_test::block_on(server.test_request(
            "POST",
            "/upload",
            HashMap::new(),
            Some(Bytes::from("too much")),
        ));
        assert_eq!(too_large.status, 413);
    }

    #[test]
    fn test_accept_backoff() {
        let reset = io::Error::from(io::ErrorKind::ConnectionReset);
        assert_eq!(accept_backoff(&reset), Duration::ZERO);

        let emfile = io::Error::from_raw_os_error(24);
        assert_eq!(accept_backoff(&emfile), Duration::from_millis(100));

        let other = io::Error::new(io::ErrorKind::Other, "out of memory");
        assert!(accept_backoff(&other) > Duration::ZERO);
    }

    #[test]
    fn test_serve_refuses_invalid_routes() {
        let mut router = Router::new();
        router.handle_fn("GGET", "/api", |_req| async { Response::text("never") });
        let server = Server::new(router).bind(([127, 0, 0, 1], 0).into());

        let result = tokio_test::block_on(server.serve());
        assert!(matches!(result, Err(Error::InvalidRoutes { .. })));
    }
}
