//! # Dispatcher
//!
//! Entry point for API requests: resolve the route, check its preconditions,
//! invoke the handler.
//!
//! The route table is an immutable [`Router`] snapshot behind an
//! [`ArcSwap`]. Dispatch only loads the current snapshot, so it never takes a
//! lock. Route changes build a new `Router` and swap it in; dispatches already
//! in flight finish against the snapshot they loaded.

use crate::error::{Error, Result};
use crate::invokable::InvokableDescriptor;
use crate::invoker::Invoker;
use crate::request::ApiRequest;
use crate::response::ApiResponse;
use crate::router::{Method, Router};
use arc_swap::ArcSwap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// Resolves and invokes API requests against a shared route table
pub struct Dispatcher {
    routes: ArcSwap<Router>,
    epoch: AtomicU64,
    /// Serializes writers; readers never touch it
    update_lock: Mutex<()>,
    invoker: Invoker,
}

impl Dispatcher {
    /// Create a dispatcher over a fully registered router
    #[must_use]
    pub fn new(router: Router, invoker: Invoker) -> Self {
        Self {
            routes: ArcSwap::new(Arc::new(router)),
            epoch: AtomicU64::new(0),
            update_lock: Mutex::new(()),
            invoker,
        }
    }

    /// Current route table snapshot
    #[must_use]
    pub fn routes(&self) -> Arc<Router> {
        self.routes.load_full()
    }

    /// Number of route table replacements so far
    #[must_use]
    pub fn routes_epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    /// The invoker
    #[must_use]
    pub const fn invoker(&self) -> &Invoker {
        &self.invoker
    }

    /// Replace the whole route table
    pub fn replace_routes(&self, router: Router) {
        let _guard = self.update_lock.lock().unwrap_or_else(|e| e.into_inner());
        self.store(router);
    }

    /// Apply `change` to a copy of the current route table and swap it in
    ///
    /// If `change` fails, the current table stays in place.
    ///
    /// # Errors
    ///
    /// Returns whatever `change` returns, typically `Error::InvalidRoutePattern`
    pub fn update_routes<F>(&self, change: F) -> Result<()>
    where
        F: FnOnce(&mut Router) -> Result<()>,
    {
        let _guard = self.update_lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut next = Router::clone(&self.routes.load());
        change(&mut next)?;
        self.store(next);
        Ok(())
    }

    fn store(&self, router: Router) {
        let count = router.len();
        self.routes.store(Arc::new(router));
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        info!(routes = count, epoch, "API route table replaced");
    }

    /// Resolve method and path against the current snapshot
    ///
    /// # Errors
    ///
    /// `Error::RouteNotFound` or `Error::AmbiguousRoute`
    pub fn resolve(&self, method: Method, raw_path: &str) -> Result<InvokableDescriptor> {
        self.routes.load().resolve(method, raw_path)
    }

    /// Dispatch a request: resolve, check preconditions, invoke
    ///
    /// Method and path are taken from the request.
    ///
    /// # Errors
    ///
    /// - `Error::RouteNotFound` / `Error::AmbiguousRoute` if no single route matched
    /// - `Error::PreconditionFailed` / `Error::UnsupportedMediaType` if the
    ///   resolved route rejects the request
    /// - `Error::HandlerFailed` if the handler failed
    pub async fn dispatch(&self, request: ApiRequest) -> Result<ApiResponse> {
        let invokable = match self.resolve(request.method, &request.path) {
            Ok(invokable) => invokable,
            Err(err) => {
                debug!(method = %request.method, path = %request.path, "No API route resolved");
                return Err(err);
            }
        };

        invokable.can_execute(&request)?;
        self.invoker.invoke(&invokable, Arc::new(request)).await
    }

    /// Dispatch and turn every failure into an error response
    ///
    /// Not-found and ambiguous routes become 404, failed preconditions 400,
    /// rejected Content-Types 415, handler failures 500.
    pub async fn dispatch_to_response(&self, request: ApiRequest) -> ApiResponse {
        match self.dispatch(request).await {
            Ok(response) => response,
            Err(err) => error_response(&err),
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("routes", &*self.routes.load_full())
            .field("epoch", &self.routes_epoch())
            .field("invoker", &self.invoker)
            .finish_non_exhaustive()
    }
}

/// Map a dispatch error onto a JSON error response
#[must_use]
pub fn error_response(err: &Error) -> ApiResponse {
    let message = match err {
        Error::RouteNotFound { .. } | Error::AmbiguousRoute { .. } => "Not Found",
        Error::PreconditionFailed { .. } => "Bad Request",
        Error::UnsupportedMediaType { .. } => "Unsupported Media Type",
        Error::MethodNotAllowed { .. } => "Method Not Allowed",
        Error::PayloadTooLarge { .. } => "Payload Too Large",
        _ => "Internal Server Error",
    };
    ApiResponse::error(err.status_code(), message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InvokerConfig;
    use crate::descriptor::{handler_fn, ApiDescriptor, Handler};

    fn echo(tag: &'static str) -> Handler {
        handler_fn(move |call| async move {
            let vars: Vec<String> = call.variables.iter().map(|(k, v)| format!("{k}={v}")).collect();
            Ok(ApiResponse::text(format!("{tag}:{}", vars.join(","))))
        })
    }

    fn dispatcher(router: Router) -> Dispatcher {
        Dispatcher::new(router, Invoker::new(InvokerConfig::default()))
    }

    #[tokio::test]
    async fn test_dispatch_single_match() {
        let mut router = Router::new();
        router.delete("/service/{participantID}/get", echo("svc")).unwrap();
        let d = dispatcher(router);

        let res = d
            .dispatch(ApiRequest::simple(Method::Delete, "/service/12345/get"))
            .await
            .unwrap();
        assert_eq!(res.body, "svc:participantID=12345");

        let err = d
            .dispatch(ApiRequest::simple(Method::Get, "/service/12345/get"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_precondition_distinct_from_not_found() {
        let mut router = Router::new();
        router.register(
            ApiDescriptor::new(Method::Get, "/secure", echo("secure"))
                .unwrap()
                .add_required_header("X-Api-Key"),
        );
        let d = dispatcher(router);

        let err = d.dispatch(ApiRequest::simple(Method::Get, "/secure")).await.unwrap_err();
        assert!(matches!(err, Error::PreconditionFailed { .. }));
        assert_eq!(err.status_code(), 400);

        let ok = d
            .dispatch(ApiRequest::simple(Method::Get, "/secure").with_header("X-Api-Key", "k"))
            .await
            .unwrap();
        assert_eq!(ok.body, "secure:");
        assert_eq!(d.invoker().stats().total_invocations(), 1);
    }

    #[tokio::test]
    async fn test_update_routes_swaps_snapshot() {
        let d = dispatcher(Router::new());
        let before = d.routes();
        assert!(d.dispatch(ApiRequest::simple(Method::Get, "/new")).await.is_err());

        d.update_routes(|r| r.get("/new", echo("new"))).unwrap();
        assert_eq!(d.routes_epoch(), 1);
        assert!(before.is_empty());
        assert_eq!(d.routes().len(), 1);

        let res = d.dispatch(ApiRequest::simple(Method::Get, "/new")).await.unwrap();
        assert_eq!(res.body, "new:");
    }

    #[test]
    fn test_failed_update_keeps_table() {
        let mut router = Router::new();
        router.get("/a", echo("a")).unwrap();
        let d = dispatcher(router);

        let err = d
            .update_routes(|r| {
                r.get("/b", echo("b"))?;
                r.get("/{broken", echo("c"))
            })
            .unwrap_err();
        assert!(matches!(err, Error::InvalidRoutePattern { .. }));
        assert_eq!(d.routes().len(), 1);
        assert_eq!(d.routes_epoch(), 0);
    }

    #[test]
    fn test_replace_routes() {
        let d = dispatcher(Router::new());
        let mut next = Router::new();
        next.put("/x", echo("x")).unwrap();
        d.replace_routes(next);
        assert!(d.resolve(Method::Put, "/x").is_ok());
    }

    #[tokio::test]
    async fn test_dispatch_to_response_maps_errors() {
        let mut router = Router::new();
        router.get("/boom", handler_fn(|_| async { Err(anyhow::anyhow!("kaputt")) })).unwrap();
        router.get("/dup", echo("1")).unwrap();
        router.get("/dup", echo("2")).unwrap();
        let d = dispatcher(router);

        let res = d.dispatch_to_response(ApiRequest::simple(Method::Get, "/missing")).await;
        assert_eq!(res.status, 404);
        let res = d.dispatch_to_response(ApiRequest::simple(Method::Get, "/dup")).await;
        assert_eq!(res.status, 404);
        let res = d.dispatch_to_response(ApiRequest::simple(Method::Get, "/boom")).await;
        assert_eq!(res.status, 500);
        assert!(!res.body.contains("kaputt"));

        let res = error_response(&Error::MethodNotAllowed {
            method: "TRACE".to_string(),
            path: "/boom".to_string(),
        });
        assert_eq!(res.status, 405);
        assert!(res.body.contains("Method Not Allowed"));
    }
}
