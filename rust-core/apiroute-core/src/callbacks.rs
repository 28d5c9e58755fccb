//! # Invocation Callbacks
//!
//! Hooks around handler execution: before, after, on failure and on
//! long-running executions. Callbacks are observers; they cannot change the
//! outcome of an invocation.

use crate::invokable::InvokableDescriptor;
use crate::request::ApiRequest;
use crate::response::ApiResponse;
use std::sync::Arc;
use std::time::Duration;
use tracing::error;

/// Observer for API invocations
///
/// All methods default to no-ops, implement the ones you need.
pub trait InvocationCallback: Send + Sync {
    /// Called before the handler runs
    fn before_execution(&self, _invokable: &InvokableDescriptor, _req: &ApiRequest) {}

    /// Called after the handler returned a response
    fn after_execution(&self, _invokable: &InvokableDescriptor, _req: &ApiRequest, _res: &ApiResponse) {}

    /// Called when the handler failed
    fn on_exception(&self, _invokable: &InvokableDescriptor, _req: &ApiRequest, _err: &anyhow::Error) {}

    /// Called when the handler took longer than the configured limit
    fn on_long_running(&self, _invokable: &InvokableDescriptor, _req: &ApiRequest, _elapsed: Duration) {}

    /// Callback name for logging
    fn name(&self) -> &'static str {
        "Unknown"
    }
}

/// Ordered list of callbacks
#[derive(Default, Clone)]
pub struct CallbackList {
    callbacks: Vec<Arc<dyn InvocationCallback>>,
}

impl CallbackList {
    /// Create a new empty list
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a callback to the end of the list
    pub fn add<C: InvocationCallback + 'static>(&mut self, callback: C) {
        self.callbacks.push(Arc::new(callback));
    }

    pub(crate) fn before_execution(&self, invokable: &InvokableDescriptor, req: &ApiRequest) {
        for cb in &self.callbacks {
            cb.before_execution(invokable, req);
        }
    }

    pub(crate) fn after_execution(&self, invokable: &InvokableDescriptor, req: &ApiRequest, res: &ApiResponse) {
        for cb in &self.callbacks {
            cb.after_execution(invokable, req, res);
        }
    }

    pub(crate) fn on_exception(&self, invokable: &InvokableDescriptor, req: &ApiRequest, err: &anyhow::Error) {
        for cb in &self.callbacks {
            cb.on_exception(invokable, req, err);
        }
    }

    pub(crate) fn on_long_running(&self, invokable: &InvokableDescriptor, req: &ApiRequest, elapsed: Duration) {
        for cb in &self.callbacks {
            cb.on_long_running(invokable, req, elapsed);
        }
    }

    /// Names of all callbacks, in order
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.callbacks.iter().map(|cb| cb.name()).collect()
    }

    /// Get the number of callbacks
    #[must_use]
    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    /// Check if the list is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }
}

/// Logs handler failures at error level with the full descriptor context
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingExceptionCallback;

impl InvocationCallback for LoggingExceptionCallback {
    fn on_exception(&self, invokable: &InvokableDescriptor, req: &ApiRequest, err: &anyhow::Error) {
        error!(
            method = %req.method,
            path = %invokable.path(),
            descriptor = %invokable,
            error = %format!("{err:#}"),
            "Error invoking API"
        );
    }

    fn name(&self) -> &'static str {
        "LoggingExceptionCallback"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named;

    impl InvocationCallback for Named {
        fn name(&self) -> &'static str {
            "Named"
        }
    }

    #[test]
    fn test_callback_list_empty() {
        let list = CallbackList::new();
        assert!(list.is_empty());
        assert_eq!(list.len(), 0);
    }

    #[test]
    fn test_callback_list_add() {
        let mut list = CallbackList::new();
        list.add(LoggingExceptionCallback);
        list.add(Named);
        assert_eq!(list.len(), 2);
        assert_eq!(list.names(), ["LoggingExceptionCallback", "Named"]);
    }
}
