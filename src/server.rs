//! HTTP server and graceful shutdown.
//!
//! The server is thin glue: it accepts connections, converts each hyper
//! request into a [`Request`], hands it to the shared [`FileServer`], and
//! converts the [`Response`](crate::Response) back.
//!
//! # Graceful shutdown
//!
//! On **SIGTERM** or **Ctrl-C** the server:
//! 1. Immediately stops `listener.accept()`, so no new connections are made.
//! 2. Closes idle keep-alive connections.
//! 3. Lets every in-flight request run to completion, then closes its connection.
//! 4. Returns from [`Server::serve`], which lets `main` exit cleanly.

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use hyper_util::server::graceful::GracefulShutdown;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

use crate::error::Error;
use crate::file_server::FileServer;
use crate::request::Request;
use crate::response::{Response, ResponseBody};

/// The HTTP server.
pub struct Server {
    addr: SocketAddr,
}

impl Server {
    /// Configures the server to bind to `addr` when [`serve`](Server::serve)
    /// is called.
    ///
    /// ```rust,no_run
    /// use std::net::SocketAddr;
    /// let server = stiff::Server::bind(SocketAddr::from(([0, 0, 0, 0], 1717)));
    /// ```
    pub fn bind(addr: SocketAddr) -> Self {
        Self { addr }
    }

    /// Starts accepting connections and answering them from `files`.
    ///
    /// Returns only after a full graceful shutdown (SIGTERM or Ctrl-C,
    /// followed by all in-flight requests completing).
    pub async fn serve(self, files: FileServer) -> Result<(), Error> {
        self.serve_with_shutdown(files, shutdown_signal()).await
    }

    /// Like [`serve`](Server::serve), but shuts down when `signal` resolves
    /// instead of on SIGTERM or Ctrl-C.
    pub async fn serve_with_shutdown(
        self,
        files: FileServer,
        signal: impl Future<Output = ()>,
    ) -> Result<(), Error> {
        let listener = TcpListener::bind(self.addr).await?;
        info!(addr = %self.addr, "stiff listening");
        serve_on(listener, files, signal).await
    }
}

async fn serve_on(
    listener: TcpListener,
    files: FileServer,
    signal: impl Future<Output = ()>,
) -> Result<(), Error> {
    // Every connection task reads the same immutable file map.
    let files = Arc::new(files);

    let builder = ConnBuilder::new(TokioExecutor::new());
    let graceful = GracefulShutdown::new();
    let mut tasks = tokio::task::JoinSet::new();

    tokio::pin!(signal);

    loop {
        tokio::select! {
            // Check shutdown first so a SIGTERM immediately stops
            // accepting new connections, even if more are queued.
            biased;

            () = &mut signal => {
                info!(
                    in_flight = tasks.len(),
                    "shutdown signal received, draining connections",
                );
                break;
            }

            res = listener.accept() => {
                let (stream, remote_addr) = match res {
                    Ok(v) => v,
                    Err(e) => {
                        error!("accept error: {e}");
                        continue;
                    }
                };

                // Called once per request on the connection.
                let conn_files = Arc::clone(&files);
                let svc = service_fn(move |req| {
                    let files = Arc::clone(&conn_files);
                    async move { dispatch(files, req, remote_addr).await }
                });

                // HTTP/1.1 and HTTP/2, whatever the client negotiates. Watched
                // connections are told to close once shutdown starts: idle
                // keep-alive connections close at once, busy ones after their
                // current request.
                let conn = builder.serve_connection(TokioIo::new(stream), svc).into_owned();
                let conn = graceful.watch(conn);

                tasks.spawn(async move {
                    if let Err(e) = conn.await {
                        error!(peer = %remote_addr, "connection error: {e}");
                    }
                });
            }

            // Reap finished connection tasks so the JoinSet does not grow
            // without bound on long-running servers.
            Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
        }
    }

    drop(listener);
    graceful.shutdown().await;
    while tasks.join_next().await.is_some() {}

    info!("stiff stopped");
    Ok(())
}

// ── Request dispatch ──────────────────────────────────────────────────────────

/// Answers one request. Every failure is already an HTTP status by the time
/// it gets here, so hyper never sees an error.
async fn dispatch(
    files: Arc<FileServer>,
    req: hyper::Request<hyper::body::Incoming>,
    remote_addr: SocketAddr,
) -> Result<http::Response<ResponseBody>, Infallible> {
    let started = Instant::now();
    let (parts, _body) = req.into_parts();

    let response = match Request::from_parts(&parts) {
        Some(request) => files.handle(&request).await,
        None => Response::method_not_allowed(),
    };

    debug!(
        peer = %remote_addr,
        method = %parts.method,
        path = parts.uri.path(),
        status = u16::from(response.status()),
        elapsed_us = started.elapsed().as_micros() as u64,
        "request",
    );

    Ok(response.into_inner())
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on the first shutdown signal the process receives.
///
/// On Unix this listens for both **SIGTERM** and **SIGINT** (Ctrl-C).
/// On Windows only Ctrl-C is available. A handler that cannot be installed
/// simply never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to install Ctrl-C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c   => {}
        () = sigterm  => {}
    }
}
