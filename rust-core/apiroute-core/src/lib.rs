//! # apiroute Core
//!
//! Path-pattern API routing and dispatch.
//! Handlers are registered per HTTP method under patterns such as
//! `/r2o/{version:regex=v[0-9]+}/invoice`; an incoming method and path are
//! resolved to exactly one handler, its preconditions checked, and the handler
//! invoked with the extracted path variables.
//!
//! ## Architecture
//!
//! Registration builds a [`Router`], which is then frozen into a
//! [`Dispatcher`]. Dispatch is lock-free: it reads an immutable router
//! snapshot, so any number of tasks may dispatch concurrently while route
//! changes swap in a new snapshot.
//!
//! ## Modules
//!
//! - `pattern` - Route pattern parsing (literal, variable, regex segments)
//! - `matcher` - Path cleaning and segment-by-segment matching
//! - `descriptor` - Registered API: method, pattern, handler, preconditions
//! - `invokable` - A descriptor bound to a concrete path and its variables
//! - `ambiguity` - Pluggable policy for paths matching several routes
//! - `router` - Per-method route table and resolution
//! - `invoker` - Handler execution with callbacks and timing
//! - `callbacks` - Invocation callback trait and list
//! - `stats` - Per-route invocation counters
//! - `dispatcher` - Resolve, check, invoke; route table hot swap
//! - `request` / `response` - Transport-neutral request and response
//! - `server` - HTTP front end built on Hyper
//! - `config` - TOML-loadable settings
//! - `logging` - Tracing subscriber setup
//! - `error` - Error types and handling

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod ambiguity;
pub mod callbacks;
pub mod config;
pub mod descriptor;
pub mod dispatcher;
pub mod error;
pub mod invokable;
pub mod invoker;
pub mod logging;
pub mod matcher;
pub mod pattern;
pub mod request;
pub mod response;
pub mod router;
pub mod server;
pub mod stats;

pub use ambiguity::{AmbiguityResolver, PreferMostSpecific, RejectAmbiguity};
pub use callbacks::{CallbackList, InvocationCallback, LoggingExceptionCallback};
pub use config::{Config, InvokerConfig, ServerConfig};
pub use descriptor::{handler_fn, ApiCall, ApiDescriptor, Handler, HandlerResult};
pub use dispatcher::Dispatcher;
pub use error::{Error, Result};
pub use invokable::InvokableDescriptor;
pub use invoker::Invoker;
pub use matcher::{match_path, CleanPath, PathVariables};
pub use pattern::{PathPattern, Segment};
pub use request::ApiRequest;
pub use response::ApiResponse;
pub use router::{Method, Router};
pub use server::Server;
pub use stats::{InvocationStats, RouteStats, StatsSnapshot};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
