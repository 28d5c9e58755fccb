//! # API Router
//!
//! Registry of [`ApiDescriptor`]s bucketed per HTTP method.
//!
//! ## Resolution
//!
//! 1. Select the bucket for the request method
//! 2. Clean the request path once
//! 3. Match every descriptor of the bucket, keeping registration order
//! 4. One match is the target; none is `RouteNotFound`; several go to the
//!    [`AmbiguityResolver`], and a declining resolver yields `AmbiguousRoute`
//!
//! No duplicate detection happens at registration: two identical routes are
//! legal and surface as an ambiguity at request time.
//!
//! A `Router` is built during start-up and shared read-only afterwards.

use crate::ambiguity::{AmbiguityResolver, RejectAmbiguity};
use crate::descriptor::{ApiDescriptor, Handler};
use crate::error::{Error, Result};
use crate::invokable::InvokableDescriptor;
use crate::matcher::{match_path, CleanPath};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// HTTP methods supported by the router
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// HTTP GET
    Get,
    /// HTTP POST
    Post,
    /// HTTP PUT
    Put,
    /// HTTP DELETE
    Delete,
    /// HTTP PATCH
    Patch,
    /// HTTP HEAD
    Head,
    /// HTTP OPTIONS
    Options,
}

impl Method {
    /// Number of methods, i.e. router buckets
    pub const COUNT: usize = 7;

    /// All methods in bucket order
    pub const ALL: [Self; Self::COUNT] = [
        Self::Get,
        Self::Post,
        Self::Put,
        Self::Delete,
        Self::Patch,
        Self::Head,
        Self::Options,
    ];

    const fn index(self) -> usize {
        self as usize
    }

    /// Upper-case method name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Patch => "PATCH",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&hyper::Method> for Method {
    type Error = ();

    fn try_from(method: &hyper::Method) -> std::result::Result<Self, ()> {
        match *method {
            hyper::Method::GET => Ok(Self::Get),
            hyper::Method::POST => Ok(Self::Post),
            hyper::Method::PUT => Ok(Self::Put),
            hyper::Method::DELETE => Ok(Self::Delete),
            hyper::Method::PATCH => Ok(Self::Patch),
            hyper::Method::HEAD => Ok(Self::Head),
            hyper::Method::OPTIONS => Ok(Self::Options),
            _ => Err(()),
        }
    }
}

/// Route registry and resolver
#[derive(Clone)]
pub struct Router {
    /// One ordered bucket per [`Method`], indexed by `Method::index`
    buckets: [Vec<Arc<ApiDescriptor>>; Method::COUNT],
    resolver: Arc<dyn AmbiguityResolver>,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    /// Create an empty router with the rejecting ambiguity policy
    #[must_use]
    pub fn new() -> Self {
        Self {
            buckets: Default::default(),
            resolver: Arc::new(RejectAmbiguity),
        }
    }

    /// Replace the ambiguity resolver
    #[must_use]
    pub fn with_resolver<R: AmbiguityResolver + 'static>(mut self, resolver: R) -> Self {
        self.set_resolver(resolver);
        self
    }

    /// Replace the ambiguity resolver in place
    pub fn set_resolver<R: AmbiguityResolver + 'static>(&mut self, resolver: R) {
        self.resolver = Arc::new(resolver);
    }

    /// Append a descriptor to the bucket of its method
    pub fn register(&mut self, descriptor: ApiDescriptor) {
        debug!(
            method = %descriptor.method(),
            pattern = %descriptor.pattern(),
            "Registered API descriptor"
        );
        self.buckets[descriptor.method().index()].push(Arc::new(descriptor));
    }

    /// Register a route with its preconditions
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidRoutePattern` if the pattern is malformed
    pub fn register_route(
        &mut self,
        method: Method,
        pattern: &str,
        handler: Handler,
        required_params: &[&str],
        required_headers: &[&str],
    ) -> Result<()> {
        let descriptor = ApiDescriptor::new(method, pattern, handler)?
            .add_required_params(required_params)
            .add_required_headers(required_headers);
        self.register(descriptor);
        Ok(())
    }

    /// Register a route without preconditions
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidRoutePattern` if the pattern is malformed
    pub fn add_route(&mut self, method: Method, pattern: &str, handler: Handler) -> Result<()> {
        self.register_route(method, pattern, handler, &[], &[])
    }

    /// Convenience method to add a GET route
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidRoutePattern` if the pattern is malformed
    pub fn get(&mut self, pattern: &str, handler: Handler) -> Result<()> {
        self.add_route(Method::Get, pattern, handler)
    }

    /// Convenience method to add a POST route
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidRoutePattern` if the pattern is malformed
    pub fn post(&mut self, pattern: &str, handler: Handler) -> Result<()> {
        self.add_route(Method::Post, pattern, handler)
    }

    /// Convenience method to add a PUT route
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidRoutePattern` if the pattern is malformed
    pub fn put(&mut self, pattern: &str, handler: Handler) -> Result<()> {
        self.add_route(Method::Put, pattern, handler)
    }

    /// Convenience method to add a DELETE route
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidRoutePattern` if the pattern is malformed
    pub fn delete(&mut self, pattern: &str, handler: Handler) -> Result<()> {
        self.add_route(Method::Delete, pattern, handler)
    }

    /// Descriptors registered for `method`, in registration order
    #[must_use]
    pub fn descriptors(&self, method: Method) -> &[Arc<ApiDescriptor>] {
        &self.buckets[method.index()]
    }

    /// Total number of registered descriptors
    #[must_use]
    pub fn len(&self) -> usize {
        self.buckets.iter().map(Vec::len).sum()
    }

    /// True if nothing is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buckets.iter().all(Vec::is_empty)
    }

    /// Every descriptor matching method and path, without resolving ambiguity
    #[must_use]
    pub fn candidates(&self, method: Method, raw_path: &str) -> Vec<InvokableDescriptor> {
        let bucket = self.descriptors(method);
        if bucket.is_empty() {
            return Vec::new();
        }

        let path = CleanPath::new(raw_path);
        bucket
            .iter()
            .filter_map(|d| {
                match_path(d.pattern(), &path)
                    .map(|vars| InvokableDescriptor::new(Arc::clone(d), raw_path, vars))
            })
            .collect()
    }

    /// Resolve method and path to exactly one invocation target
    ///
    /// # Errors
    ///
    /// `Error::RouteNotFound` if nothing matched, `Error::AmbiguousRoute` if
    /// several descriptors matched and the resolver declined.
    pub fn resolve(&self, method: Method, raw_path: &str) -> Result<InvokableDescriptor> {
        let mut matches = self.candidates(method, raw_path);

        match matches.len() {
            0 => Err(Error::RouteNotFound {
                method,
                path: raw_path.to_string(),
            }),
            1 => Ok(matches.remove(0)),
            _ => {
                let candidates: Vec<String> = matches
                    .iter()
                    .map(|m| m.descriptor().pattern().to_string())
                    .collect();
                self.resolver
                    .resolve(raw_path, matches)
                    .ok_or_else(|| Error::AmbiguousRoute {
                        method,
                        path: raw_path.to_string(),
                        candidates,
                    })
            }
        }
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let routes: Vec<String> = self
            .buckets
            .iter()
            .flatten()
            .map(ToString::to_string)
            .collect();
        f.debug_struct("Router")
            .field("routes", &routes)
            .field("resolver", &self.resolver.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ambiguity::PreferMostSpecific;
    use crate::descriptor::handler_fn;
    use crate::response::ApiResponse;

    fn noop() -> Handler {
        handler_fn(|_| async { Ok(ApiResponse::json("{}")) })
    }

    fn invoice_router() -> Router {
        let mut router = Router::new();
        router.put("/r2o/v1/invoice", noop()).unwrap();
        router.put("/r2o/{version:regex=v[0-9]+}/invoice", noop()).unwrap();
        router
    }

    #[test]
    fn test_method_index_matches_all() {
        for (i, m) in Method::ALL.iter().enumerate() {
            assert_eq!(m.index(), i);
        }
        assert_eq!(Method::Delete.to_string(), "DELETE");
    }

    #[test]
    fn test_method_from_hyper() {
        assert_eq!(Method::try_from(&hyper::Method::PUT), Ok(Method::Put));
        assert!(Method::try_from(&hyper::Method::TRACE).is_err());
    }

    #[test]
    fn test_basic_routing() {
        let mut router = Router::new();
        router.get("/", noop()).unwrap();
        router.get("/users", noop()).unwrap();
        router.post("/users", noop()).unwrap();
        assert_eq!(router.len(), 3);
        assert_eq!(router.descriptors(Method::Get).len(), 2);

        let m = router.resolve(Method::Get, "/").unwrap();
        assert!(m.descriptor().pattern().is_empty());

        let m = router.resolve(Method::Post, "/users").unwrap();
        assert_eq!(m.descriptor().method(), Method::Post);
    }

    #[test]
    fn test_route_not_found() {
        let router = Router::new();
        assert!(router.is_empty());
        let err = router.resolve(Method::Get, "/nonexistent").unwrap_err();
        assert!(matches!(err, Error::RouteNotFound { .. }));
    }

    #[test]
    fn test_method_checked_first() {
        let mut router = Router::new();
        router.get("/users", noop()).unwrap();
        assert!(router.resolve(Method::Post, "/users").is_err());
        assert!(router.resolve(Method::Get, "/users").is_ok());
    }

    #[test]
    fn test_ambiguous_literal_and_regex() {
        let router = invoice_router();
        let err = router.resolve(Method::Put, "/r2o/v1/invoice").unwrap_err();
        match err {
            Error::AmbiguousRoute { candidates, .. } => assert_eq!(candidates.len(), 2),
            other => panic!("unexpected {other:?}"),
        }

        let m = router.resolve(Method::Put, "/r2o/v24/invoice").unwrap();
        assert_eq!(m.variables().get("version"), Some("v24"));
    }

    #[test]
    fn test_candidates_keep_registration_order() {
        let router = invoice_router();
        let c = router.candidates(Method::Put, "/r2o/v1/invoice");
        assert_eq!(c.len(), 2);
        assert_eq!(c[0].descriptor().pattern().to_string(), "/r2o/v1/invoice");
        assert!(router.candidates(Method::Get, "/r2o/v1/invoice").is_empty());
    }

    #[test]
    fn test_duplicate_registration_is_ambiguous() {
        let mut router = Router::new();
        router.get("/same", noop()).unwrap();
        router.get("/same", noop()).unwrap();
        assert!(matches!(
            router.resolve(Method::Get, "/same"),
            Err(Error::AmbiguousRoute { .. })
        ));
    }

    #[test]
    fn test_custom_resolver() {
        let router = invoice_router().with_resolver(PreferMostSpecific);
        let m = router.resolve(Method::Put, "/r2o/v1/invoice").unwrap();
        assert!(m.variables().is_empty());
        assert!(format!("{router:?}").contains("PreferMostSpecific"));
    }

    #[test]
    fn test_register_route_with_preconditions() {
        let mut router = Router::new();
        router
            .register_route(Method::Post, "/doc/{id}", noop(), &["lang"], &["X-Key"])
            .unwrap();
        let d = &router.descriptors(Method::Post)[0];
        assert_eq!(d.required_params(), ["lang"]);
        assert_eq!(d.required_headers(), ["X-Key"]);
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        let mut router = Router::new();
        assert!(router.get("/{broken", noop()).is_err());
        for result in [
            router.post("/{}", noop()),
            router.put("/{a:int}", noop()),
            router.delete("/{a}/{a}", noop()),
        ] {
            assert!(matches!(result, Err(Error::InvalidRoutePattern { .. })));
        }
        assert!(router.is_empty());
    }

    #[test]
    fn test_resolution_is_repeatable() {
        let router = invoice_router();
        for _ in 0..3 {
            assert!(router.resolve(Method::Put, "/r2o/v1/invoice").is_err());
            assert!(router.resolve(Method::Put, "/r2o/v7/invoice").is_ok());
        }
    }
}
