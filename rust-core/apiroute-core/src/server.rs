//! # HTTP Server
//!
//! Thin Hyper/Tokio front end for a [`Dispatcher`].
//! Each request is collected into an [`ApiRequest`], dispatched, and the
//! outcome written back; dispatch errors become JSON error responses.
//!
//! ## Key Features
//!
//! - Graceful shutdown on Ctrl-C with a bounded drain period
//! - Request body size limit
//! - `x-request-id` propagation (generated if absent)

use crate::config::ServerConfig;
use crate::dispatcher::{error_response, Dispatcher};
use crate::error::{Error, Result};
use crate::request::ApiRequest;
use crate::response::ApiResponse;
use crate::router::Method;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// HTTP server serving one dispatcher
pub struct Server {
    config: ServerConfig,
    dispatcher: Arc<Dispatcher>,
}

impl Server {
    /// Create a server for `dispatcher`
    #[must_use]
    pub const fn new(config: ServerConfig, dispatcher: Arc<Dispatcher>) -> Self {
        Self { config, dispatcher }
    }

    /// Bind the server to an address
    #[must_use]
    pub const fn bind(mut self, addr: SocketAddr) -> Self {
        self.config.address = addr;
        self
    }

    /// The dispatcher behind this server
    #[must_use]
    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Start the server with graceful shutdown
    ///
    /// # Errors
    ///
    /// Returns `Error::BindError` if the listener cannot be bound, `Error::Io`
    /// if accepting connections fails.
    pub async fn serve(&self) -> Result<()> {
        let addr = self.config.address;

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|source| Error::BindError {
                address: addr.to_string(),
                source,
            })?;

        info!("Server listening on http://{}", addr);

        let active = Arc::new(AtomicUsize::new(0));
        let max_body_size = self.config.max_body_size;
        let keep_alive = self.config.keep_alive;

        loop {
            tokio::select! {
                accept_result = listener.accept() => {
                    let (stream, remote_addr) = accept_result?;
                    let io = TokioIo::new(stream);
                    let dispatcher = Arc::clone(&self.dispatcher);
                    let active = Arc::clone(&active);

                    tokio::task::spawn(async move {
                        active.fetch_add(1, Ordering::Relaxed);

                        let service = service_fn(move |req| {
                            let dispatcher = Arc::clone(&dispatcher);
                            async move {
                                let method = req.method().clone();
                                let path = req.uri().path().to_string();
                                let response = handle_request(req, &dispatcher, max_body_size).await;
                                info!("    {} - \"{} {}\" {}", remote_addr, method, path, response.status());
                                Ok::<_, hyper::Error>(response)
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
                () = shutdown_signal() => {
                    info!("Shutdown signal received, stopping server...");
                    break;
                }
            }
        }

        let drain = async {
            while active.load(Ordering::Relaxed) > 0 {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
        };
        if tokio::time::timeout(self.config.shutdown_timeout(), drain).await.is_err() {
            info!(
                active = active.load(Ordering::Relaxed),
                "Shutdown timeout reached with connections still open"
            );
        }
        Ok(())
    }

    /// Execute a test request directly without network stack
    pub async fn test_request(
        &self,
        method: Method,
        path: &str,
        headers: HashMap<String, String>,
        body: Option<Bytes>,
    ) -> ApiResponse {
        if let Some(b) = body.as_ref() {
            if b.len() > self.config.max_body_size {
                return error_response(&Error::PayloadTooLarge {
                    limit: self.config.max_body_size,
                    actual: b.len(),
                });
            }
        }
        process_request(ApiRequest::new(method, path, headers, body), &self.dispatcher).await
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("Failed to install Ctrl-C handler: {}", err);
        std::future::pending::<()>().await;
    }
}

/// Core request processing logic (network agnostic)
async fn process_request(mut req: ApiRequest, dispatcher: &Dispatcher) -> ApiResponse {
    let request_id = match req.header("x-request-id") {
        Some(id) => id.to_string(),
        None => {
            let id = generate_request_id();
            req.set_header("x-request-id", &id);
            id
        }
    };

    let mut response = dispatcher.dispatch_to_response(req).await;
    response.set_header("x-request-id", &request_id);
    response
}

async fn handle_request(
    req: Request<hyper::body::Incoming>,
    dispatcher: &Dispatcher,
    max_body_size: usize,
) -> Response<Full<Bytes>> {
    match ApiRequest::from_hyper_with_limit(req, max_body_size).await {
        Ok(api_request) => process_request(api_request, dispatcher).await.into_hyper(),
        Err(e @ (Error::PayloadTooLarge { .. } | Error::MethodNotAllowed { .. })) => {
            info!(error = %e, "Request rejected before dispatch");
            error_response(&e).into_hyper()
        }
        Err(e) => {
            error!("Failed to parse request: {}", e);
            ApiResponse::error(400, "Bad Request").into_hyper()
        }
    }
}

static REQUEST_COUNTER: AtomicUsize = AtomicUsize::new(1);

fn generate_request_id() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    let counter = REQUEST_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{:x}-{:x}", now.as_nanos(), counter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::handler_fn;
    use crate::invoker::Invoker;
    use crate::router::Router;

    fn server() -> Server {
        let mut router = Router::new();
        router
            .put(
                "/r2o/{version:regex=v[0-9]+}/invoice",
                handler_fn(|call| async move {
                    let version = call.var("version").unwrap_or_default().to_string();
                    Ok(ApiResponse::json(format!(r#"{{"version":"{version}"}}"#)))
                }),
            )
            .unwrap();
        let dispatcher = Dispatcher::new(router, Invoker::default());
        Server::new(ServerConfig::default(), Arc::new(dispatcher))
    }

    #[tokio::test]
    async fn test_request_dispatches() {
        let res = server()
            .test_request(Method::Put, "/r2o/v3/invoice", HashMap::new(), None)
            .await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body, r#"{"version":"v3"}"#);
        assert!(res.headers.contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_request_keeps_request_id() {
        let mut headers = HashMap::new();
        headers.insert("x-request-id".to_string(), "abc".to_string());
        let res = server()
            .test_request(Method::Put, "/r2o/v3/invoice", headers, None)
            .await;
        assert_eq!(res.headers.get("x-request-id").map(String::as_str), Some("abc"));
    }

    #[tokio::test]
    async fn test_request_not_found() {
        let res = server()
            .test_request(Method::Put, "/r2o/latest/invoice", HashMap::new(), None)
            .await;
        assert_eq!(res.status, 404);
    }

    #[tokio::test]
    async fn test_request_payload_too_large() {
        let mut config = ServerConfig::default();
        config.max_body_size = 4;
        let s = Server::new(config, Arc::clone(server().dispatcher()));
        let res = s
            .test_request(Method::Put, "/r2o/v3/invoice", HashMap::new(), Some(Bytes::from("12345")))
            .await;
        assert_eq!(res.status, 413);
    }

    #[tokio::test]
    async fn test_unknown_method_answers_405() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let addr = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap();
        let server = Arc::new(server().bind(addr));
        let serving = {
            let server = Arc::clone(&server);
            tokio::spawn(async move { server.serve().await })
        };

        let mut stream = None;
        for _ in 0..100 {
            if let Ok(s) = tokio::net::TcpStream::connect(addr).await {
                stream = Some(s);
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        let mut stream = stream.unwrap();
        stream
            .write_all(b"TRACE /x HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut raw = Vec::new();
        stream.read_to_end(&mut raw).await.unwrap();
        serving.abort();

        let text = String::from_utf8_lossy(&raw);
        assert!(text.starts_with("HTTP/1.1 405"), "{text}");
        assert!(text.contains("Method Not Allowed"));
        assert!(!text.contains("GET"));
    }

    #[tokio::test]
    async fn test_handler_sees_only_client_headers_and_request_id() {
        let mut router = Router::new();
        router
            .get(
                "/headers",
                handler_fn(|call| async move {
                    let req = &call.request;
                    Ok(ApiResponse::text(format!(
                        "{} {} {}",
                        req.has_header("x-trace"),
                        req.has_header("x-request-id"),
                        req.has_header("x-client-ip")
                    )))
                }),
            )
            .unwrap();
        let s = Server::new(
            ServerConfig::default(),
            Arc::new(Dispatcher::new(router, Invoker::default())),
        );

        let mut headers = HashMap::new();
        headers.insert("X-Trace".to_string(), "1".to_string());
        let res = s.test_request(Method::Get, "/headers", headers, None).await;
        assert_eq!(res.body, "true true false");
    }

    #[test]
    fn test_request_ids_are_unique() {
        assert_ne!(generate_request_id(), generate_request_id());
    }
}
