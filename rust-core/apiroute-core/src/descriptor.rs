//! # API Descriptors
//!
//! A descriptor pairs an HTTP method and a [`PathPattern`] with the handler to
//! invoke, plus the preconditions a request has to meet before the handler
//! runs (required headers, required query parameters, accepted MIME types and
//! an optional execution filter).
//!
//! Descriptors are built during start-up and never mutated once registered.

use crate::error::Result;
use crate::matcher::PathVariables;
use crate::pattern::PathPattern;
use crate::request::ApiRequest;
use crate::response::ApiResponse;
use crate::router::Method;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Everything a handler gets for one invocation
#[derive(Debug, Clone)]
pub struct ApiCall {
    /// Path as requested by the client
    pub path: String,
    /// Variables bound from the path pattern
    pub variables: PathVariables,
    /// The live request
    pub request: Arc<ApiRequest>,
}

impl ApiCall {
    /// Shorthand for `self.variables.get(name)`
    #[must_use]
    pub fn var(&self, name: &str) -> Option<&str> {
        self.variables.get(name)
    }
}

/// Result produced by a handler
pub type HandlerResult = anyhow::Result<ApiResponse>;

/// Boxed handler future
pub type HandlerFuture = Pin<Box<dyn Future<Output = HandlerResult> + Send>>;

/// Handler function type (async)
pub type Handler = Arc<dyn Fn(ApiCall) -> HandlerFuture + Send + Sync>;

/// Request predicate evaluated before the handler runs
pub type ExecutionFilter = Arc<dyn Fn(&ApiRequest) -> bool + Send + Sync>;

/// Turns a handler failure into a response, or declines with `None`
pub type ExceptionMapper = Arc<dyn Fn(&anyhow::Error) -> Option<ApiResponse> + Send + Sync>;

/// Wrap an async closure as a [`Handler`]
pub fn handler_fn<F, Fut>(f: F) -> Handler
where
    F: Fn(ApiCall) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    Arc::new(move |call| Box::pin(f(call)))
}

/// A registered API route
#[derive(Clone)]
pub struct ApiDescriptor {
    method: Method,
    pattern: PathPattern,
    handler: Handler,
    required_headers: Vec<String>,
    required_params: Vec<String>,
    allowed_mime_types: Vec<String>,
    execution_filter: Option<ExecutionFilter>,
    exception_mapper: Option<ExceptionMapper>,
}

impl ApiDescriptor {
    /// Create a descriptor, compiling `pattern`
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidRoutePattern` if the pattern is malformed
    pub fn new(method: Method, pattern: &str, handler: Handler) -> Result<Self> {
        Ok(Self::with_pattern(method, PathPattern::parse(pattern)?, handler))
    }

    /// Create a descriptor from an already compiled pattern
    #[must_use]
    pub fn with_pattern(method: Method, pattern: PathPattern, handler: Handler) -> Self {
        Self {
            method,
            pattern,
            handler,
            required_headers: Vec::new(),
            required_params: Vec::new(),
            allowed_mime_types: Vec::new(),
            execution_filter: None,
            exception_mapper: None,
        }
    }

    /// Require an HTTP header; empty names are ignored
    #[must_use]
    pub fn add_required_header(mut self, name: &str) -> Self {
        push_unique(&mut self.required_headers, name);
        self
    }

    /// Require several HTTP headers
    #[must_use]
    pub fn add_required_headers<I, S>(self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        names
            .into_iter()
            .fold(self, |d, n| d.add_required_header(n.as_ref()))
    }

    /// Require a query parameter; empty names are ignored
    #[must_use]
    pub fn add_required_param(mut self, name: &str) -> Self {
        push_unique(&mut self.required_params, name);
        self
    }

    /// Require several query parameters
    #[must_use]
    pub fn add_required_params<I, S>(self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        names
            .into_iter()
            .fold(self, |d, n| d.add_required_param(n.as_ref()))
    }

    /// Accept a request Content-Type (without parameters, e.g. `application/json`)
    #[must_use]
    pub fn add_allowed_mime_type(mut self, mime_type: &str) -> Self {
        push_unique(&mut self.allowed_mime_types, mime_type);
        self
    }

    /// Install an execution filter
    #[must_use]
    pub fn with_execution_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&ApiRequest) -> bool + Send + Sync + 'static,
    {
        self.execution_filter = Some(Arc::new(filter));
        self
    }

    /// Install an exception mapper
    #[must_use]
    pub fn with_exception_mapper<F>(mut self, mapper: F) -> Self
    where
        F: Fn(&anyhow::Error) -> Option<ApiResponse> + Send + Sync + 'static,
    {
        self.exception_mapper = Some(Arc::new(mapper));
        self
    }

    /// HTTP method
    #[must_use]
    pub const fn method(&self) -> Method {
        self.method
    }

    /// Compiled path pattern
    #[must_use]
    pub const fn pattern(&self) -> &PathPattern {
        &self.pattern
    }

    /// The handler
    #[must_use]
    pub const fn handler(&self) -> &Handler {
        &self.handler
    }

    /// Required headers in insertion order
    #[must_use]
    pub fn required_headers(&self) -> &[String] {
        &self.required_headers
    }

    /// Required query parameters in insertion order
    #[must_use]
    pub fn required_params(&self) -> &[String] {
        &self.required_params
    }

    /// Accepted Content-Types; empty means any
    #[must_use]
    pub fn allowed_mime_types(&self) -> &[String] {
        &self.allowed_mime_types
    }

    /// The execution filter, if any
    #[must_use]
    pub const fn execution_filter(&self) -> Option<&ExecutionFilter> {
        self.execution_filter.as_ref()
    }

    /// The exception mapper, if any
    #[must_use]
    pub const fn exception_mapper(&self) -> Option<&ExceptionMapper> {
        self.exception_mapper.as_ref()
    }
}

impl fmt::Debug for ApiDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiDescriptor")
            .field("method", &self.method)
            .field("pattern", &self.pattern.to_string())
            .field("required_headers", &self.required_headers)
            .field("required_params", &self.required_params)
            .field("allowed_mime_types", &self.allowed_mime_types)
            .field("execution_filter", &self.execution_filter.is_some())
            .field("exception_mapper", &self.exception_mapper.is_some())
            .finish_non_exhaustive()
    }
}

impl fmt::Display for ApiDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.pattern)
    }
}

fn push_unique(list: &mut Vec<String>, value: &str) {
    if !value.is_empty() && !list.iter().any(|v| v == value) {
        list.push(value.to_string());
    }
}
