//! # Error Handling
//!
//! Centralized error types for apiroute core.
//! Uses `thiserror` for ergonomic error definitions.

use crate::router::Method;
use thiserror::Error;

/// Result type alias for apiroute operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for routing, dispatch and invocation
#[derive(Error, Debug)]
pub enum Error {
    /// Server failed to bind to the specified address
    #[error("Failed to bind server to {address}: {source}")]
    BindError {
        /// The address we tried to bind to
        address: String,
        /// The underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// No registered descriptor matched method and path
    #[error("No route found for {method} {path}")]
    RouteNotFound {
        /// The requested HTTP method
        method: Method,
        /// The path that wasn't matched
        path: String,
    },

    /// The HTTP method is not one the router knows
    #[error("Method {method} not allowed for {path}")]
    MethodNotAllowed {
        /// The method as sent by the client
        method: String,
        /// The requested path
        path: String,
    },

    /// More than one descriptor matched and the resolver declined to pick one
    #[error("Ambiguous route for {method} {path}: {}", candidates.join(", "))]
    AmbiguousRoute {
        /// The requested HTTP method
        method: Method,
        /// The requested path
        path: String,
        /// Declared patterns of all matching descriptors, in registration order
        candidates: Vec<String>,
    },

    /// Invalid route pattern provided at registration time
    #[error("Invalid route pattern: {pattern}: {reason}")]
    InvalidRoutePattern {
        /// The invalid pattern
        pattern: String,
        /// Reason for invalidity
        reason: String,
    },

    /// The route exists but the request misses a required header or parameter
    #[error("Precondition failed for {path}: {reason}")]
    PreconditionFailed {
        /// The requested path
        path: String,
        /// Which precondition was not met
        reason: String,
    },

    /// The request Content-Type is not accepted by the resolved descriptor
    #[error("Unsupported media type '{content_type}' for {path}")]
    UnsupportedMediaType {
        /// The requested path
        path: String,
        /// The offending Content-Type (empty if none was sent)
        content_type: String,
    },

    /// The invoked handler returned an error
    #[error("Handler for {path} failed: {source}")]
    HandlerFailed {
        /// The requested path
        path: String,
        /// The error produced by the handler
        #[source]
        source: anyhow::Error,
    },

    /// HTTP protocol error
    #[error("HTTP error: {0}")]
    Http(#[from] hyper::Error),

    /// Configuration could not be parsed
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Request payload too large
    #[error("Payload too large: limit={limit} bytes, received={actual} bytes")]
    PayloadTooLarge {
        /// Max allowed size
        limit: usize,
        /// Actual size
        actual: usize,
    },
}

impl Error {
    /// Whether this outcome means "no route" to the caller
    ///
    /// An ambiguous match under the default resolver is reported exactly like
    /// a missing route.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::RouteNotFound { .. } | Self::AmbiguousRoute { .. })
    }

    /// HTTP status code an outer server layer should answer with
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::RouteNotFound { .. } | Self::AmbiguousRoute { .. } => 404,
            Self::PreconditionFailed { .. } => 400,
            Self::UnsupportedMediaType { .. } => 415,
            Self::MethodNotAllowed { .. } => 405,
            Self::PayloadTooLarge { .. } => 413,
            _ => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_not_found_error() {
        let err = Error::RouteNotFound {
            method: Method::Get,
            path: "/unknown".to_string(),
        };
        assert!(err.to_string().contains("/unknown"));
        assert!(err.to_string().contains("GET"));
        assert!(err.is_not_found());
        assert_eq!(err.status_code(), 404);
    }

    #[test]
    fn test_ambiguous_route_lists_candidates() {
        let err = Error::AmbiguousRoute {
            method: Method::Put,
            path: "/r2o/v1/invoice".to_string(),
            candidates: vec![
                "/r2o/v1/invoice".to_string(),
                "/r2o/{version:regex=v[0-9]+}/invoice".to_string(),
            ],
        };
        let msg = err.to_string();
        assert!(msg.contains("{version:regex=v[0-9]+}"));
        assert!(err.is_not_found());
        assert_eq!(err.status_code(), 404);
    }

    #[test]
    fn test_status_codes() {
        let precondition = Error::PreconditionFailed {
            path: "/a".to_string(),
            reason: "missing header 'X-Key'".to_string(),
        };
        assert_eq!(precondition.status_code(), 400);
        assert!(!precondition.is_not_found());

        let media = Error::UnsupportedMediaType {
            path: "/a".to_string(),
            content_type: "text/plain".to_string(),
        };
        assert_eq!(media.status_code(), 415);

        let failed = Error::HandlerFailed {
            path: "/a".to_string(),
            source: anyhow::anyhow!("boom"),
        };
        assert_eq!(failed.status_code(), 500);
    }

    #[test]
    fn test_method_not_allowed() {
        let err = Error::MethodNotAllowed {
            method: "TRACE".to_string(),
            path: "/x".to_string(),
        };
        assert_eq!(err.status_code(), 405);
        assert!(!err.is_not_found());
        assert_eq!(err.to_string(), "Method TRACE not allowed for /x");
    }

    #[test]
    fn test_bind_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::AddrInUse, "address in use");
        let err = Error::BindError {
            address: "0.0.0.0:8000".to_string(),
            source: io_err,
        };
        assert!(err.to_string().contains("0.0.0.0:8000"));
    }
}
