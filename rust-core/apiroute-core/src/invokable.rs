//! # Invokable Descriptors
//!
//! A resolved route: the matched [`ApiDescriptor`], the path the client asked
//! for and the variables bound while matching. Created per dispatch and
//! dropped once the handler has run.

use crate::descriptor::{ApiCall, ApiDescriptor};
use crate::error::{Error, Result};
use crate::matcher::PathVariables;
use crate::request::ApiRequest;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// A descriptor bound to one concrete request path
#[derive(Debug, Clone)]
pub struct InvokableDescriptor {
    descriptor: Arc<ApiDescriptor>,
    path: String,
    variables: PathVariables,
}

impl InvokableDescriptor {
    /// Bind a descriptor to a request path and its variables
    #[must_use]
    pub fn new(descriptor: Arc<ApiDescriptor>, path: impl Into<String>, variables: PathVariables) -> Self {
        Self {
            descriptor,
            path: path.into(),
            variables,
        }
    }

    /// The matched descriptor
    #[must_use]
    pub fn descriptor(&self) -> &ApiDescriptor {
        &self.descriptor
    }

    /// The path as requested
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Variables bound from the path
    #[must_use]
    pub const fn variables(&self) -> &PathVariables {
        &self.variables
    }

    /// Check the descriptor's preconditions against the live request
    ///
    /// The HTTP method was already checked when the descriptor was selected.
    /// Checks run in order: required headers, required parameters, execution
    /// filter, accepted MIME types.
    ///
    /// # Errors
    ///
    /// `Error::PreconditionFailed` for a missing header or parameter or a
    /// rejecting filter, `Error::UnsupportedMediaType` for a Content-Type
    /// outside the accepted set.
    pub fn can_execute(&self, request: &ApiRequest) -> Result<()> {
        let d = &self.descriptor;

        for header in d.required_headers() {
            if !request.has_header(header) {
                warn!(path = %self.path, header = %header, "Request is missing required HTTP header");
                return Err(self.precondition(format!("missing required header '{header}'")));
            }
        }

        for param in d.required_params() {
            if !request.has_param(param) {
                warn!(path = %self.path, param = %param, "Request is missing required HTTP parameter");
                return Err(self.precondition(format!("missing required parameter '{param}'")));
            }
        }

        if let Some(filter) = d.execution_filter() {
            if !filter(request) {
                warn!(path = %self.path, "Request rejected by execution filter");
                return Err(self.precondition("rejected by execution filter".to_string()));
            }
        }

        if !d.allowed_mime_types().is_empty() {
            let content_type = request.content_type().unwrap_or_default();
            let essence = content_type.split(';').next().unwrap_or_default().trim();
            let allowed = d.allowed_mime_types();
            if !allowed.iter().any(|m| m == essence || *m == essence.to_ascii_lowercase()) {
                warn!(
                    path = %self.path,
                    content_type = %content_type,
                    allowed = ?allowed,
                    "Request Content-Type is not accepted"
                );
                return Err(Error::UnsupportedMediaType {
                    path: self.path.clone(),
                    content_type: content_type.to_string(),
                });
            }
        }

        Ok(())
    }

    /// Build the handler argument for this invocation
    #[must_use]
    pub fn to_call(&self, request: Arc<ApiRequest>) -> ApiCall {
        ApiCall {
            path: self.path.clone(),
            variables: self.variables.clone(),
            request,
        }
    }

    fn precondition(&self, reason: String) -> Error {
        Error::PreconditionFailed {
            path: self.path.clone(),
            reason,
        }
    }
}

impl fmt::Display for InvokableDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (path '{}', variables {:?})", self.descriptor, self.path, self.variables)
    }
}
