//! # Invoker
//!
//! Runs the handler of a resolved [`InvokableDescriptor`] and reports on it:
//!
//! - before/after callbacks around every execution
//! - failures go to the exception callbacks (a logging one is always
//!   installed), then to the descriptor's exception mapper if any
//! - a panicking handler is caught and treated like a failing one
//! - failures caused by a client disconnect are not reported
//! - executions above the long-running limit fire the long-running callbacks;
//!   the handler is never cancelled
//!
//! Nothing is retried.

use crate::callbacks::{CallbackList, InvocationCallback, LoggingExceptionCallback};
use crate::config::InvokerConfig;
use crate::error::{Error, Result};
use crate::invokable::InvokableDescriptor;
use crate::request::ApiRequest;
use crate::response::ApiResponse;
use crate::stats::InvocationStats;
use futures_util::FutureExt;
use std::any::Any;
use std::io::ErrorKind;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Executes resolved API descriptors
#[derive(Clone)]
pub struct Invoker {
    config: InvokerConfig,
    callbacks: CallbackList,
    stats: Arc<InvocationStats>,
}

impl Default for Invoker {
    fn default() -> Self {
        Self::new(InvokerConfig::default())
    }
}

impl Invoker {
    /// Create an invoker with the logging exception callback installed
    #[must_use]
    pub fn new(config: InvokerConfig) -> Self {
        let mut callbacks = CallbackList::new();
        callbacks.add(LoggingExceptionCallback);
        Self {
            config,
            callbacks,
            stats: Arc::new(InvocationStats::new()),
        }
    }

    /// Append a callback
    pub fn add_callback<C: InvocationCallback + 'static>(&mut self, callback: C) {
        self.callbacks.add(callback);
    }

    /// Installed callbacks
    #[must_use]
    pub const fn callbacks(&self) -> &CallbackList {
        &self.callbacks
    }

    /// Active configuration
    #[must_use]
    pub const fn config(&self) -> &InvokerConfig {
        &self.config
    }

    /// Invocation statistics
    #[must_use]
    pub fn stats(&self) -> &InvocationStats {
        &self.stats
    }

    /// Run the handler of `invokable`
    ///
    /// Preconditions must have been checked by the caller.
    ///
    /// # Errors
    ///
    /// Returns `Error::HandlerFailed` if the handler failed and no exception
    /// mapper turned the failure into a response.
    pub async fn invoke(
        &self,
        invokable: &InvokableDescriptor,
        request: Arc<ApiRequest>,
    ) -> Result<ApiResponse> {
        let descriptor = invokable.descriptor();
        let route = descriptor.to_string();
        debug!(route = %route, path = %invokable.path(), "Invoking API");

        self.stats.record_start();
        self.callbacks.before_execution(invokable, &request);

        let start = Instant::now();
        let handler = (descriptor.handler())(invokable.to_call(Arc::clone(&request)));
        let outcome = AssertUnwindSafe(handler)
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| Err(panic_error(payload.as_ref())));
        let elapsed = start.elapsed();

        match outcome {
            Ok(response) => {
                self.callbacks.after_execution(invokable, &request, &response);
                self.stats.record_success(&route, elapsed);

                if let Some(limit) = self.config.long_running_limit() {
                    if elapsed > limit {
                        warn!(
                            route = %route,
                            path = %invokable.path(),
                            duration_ms = %elapsed.as_millis(),
                            limit_ms = %limit.as_millis(),
                            "Long running API execution"
                        );
                        self.callbacks.on_long_running(invokable, &request, elapsed);
                    }
                }
                Ok(response)
            }
            Err(err) => {
                self.stats.record_failure(&route);

                if is_client_disconnect(&err) {
                    debug!(path = %invokable.path(), "Client disconnected during API execution");
                } else {
                    self.callbacks.on_exception(invokable, &request, &err);
                }

                if let Some(response) = descriptor.exception_mapper().and_then(|m| m(&err)) {
                    return Ok(response);
                }

                Err(Error::HandlerFailed {
                    path: invokable.path().to_string(),
                    source: err,
                })
            }
        }
    }
}

impl std::fmt::Debug for Invoker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Invoker")
            .field("config", &self.config)
            .field("callbacks", &self.callbacks.names())
            .finish_non_exhaustive()
    }
}

/// Turn a handler panic payload into an ordinary handler failure
fn panic_error(payload: &(dyn Any + Send)) -> anyhow::Error {
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string());
    anyhow::anyhow!("handler panicked: {message}")
}

/// Whether an error was caused by the client going away
///
/// True if any cause is an I/O error of kind broken pipe, connection reset,
/// connection aborted or unexpected EOF.
#[must_use]
pub fn is_client_disconnect(err: &anyhow::Error) -> bool {
    err.chain()
        .filter_map(|cause| cause.downcast_ref::<std::io::Error>())
        .any(|io| {
            matches!(
                io.kind(),
                ErrorKind::BrokenPipe
                    | ErrorKind::ConnectionReset
                    | ErrorKind::ConnectionAborted
                    | ErrorKind::UnexpectedEof
            )
        })
}
