//! # Ambiguity Resolution
//!
//! Invoked when more than one descriptor matches the same method and path.
//! A resolver either picks one candidate or declines, in which case the
//! dispatch fails like an unmatched route.
//!
//! The default, [`RejectAmbiguity`], always declines and logs every candidate.
//! Any `Fn(&str, Vec<InvokableDescriptor>) -> Option<InvokableDescriptor>`
//! closure is a resolver too.

use crate::invokable::InvokableDescriptor;
use crate::pattern::Segment;
use tracing::warn;

/// Policy for multi-match dispatches
pub trait AmbiguityResolver: Send + Sync {
    /// Pick one of `candidates` (registration order) or decline with `None`
    fn resolve(&self, path: &str, candidates: Vec<InvokableDescriptor>) -> Option<InvokableDescriptor>;

    /// Resolver name for logging
    fn name(&self) -> &'static str {
        "Custom"
    }
}

impl<F> AmbiguityResolver for F
where
    F: Fn(&str, Vec<InvokableDescriptor>) -> Option<InvokableDescriptor> + Send + Sync,
{
    fn resolve(&self, path: &str, candidates: Vec<InvokableDescriptor>) -> Option<InvokableDescriptor> {
        self(path, candidates)
    }
}

/// Default policy: log a warning and decline
#[derive(Debug, Clone, Copy, Default)]
pub struct RejectAmbiguity;

impl AmbiguityResolver for RejectAmbiguity {
    fn resolve(&self, path: &str, candidates: Vec<InvokableDescriptor>) -> Option<InvokableDescriptor> {
        warn!(
            path = %path,
            count = candidates.len(),
            candidates = %describe(&candidates),
            "Found multiple matching API descriptors; not invoking any of them"
        );
        None
    }

    fn name(&self) -> &'static str {
        "RejectAmbiguity"
    }
}

/// Prefers the candidate with the most literal segments, then the most
/// regex-constrained variables. Declines on a tie.
#[derive(Debug, Clone, Copy, Default)]
pub struct PreferMostSpecific;

impl PreferMostSpecific {
    fn rank(candidate: &InvokableDescriptor) -> (usize, usize) {
        let segments = candidate.descriptor().pattern().segments();
        let literals = segments.iter().filter(|s| s.is_literal()).count();
        let constrained = segments
            .iter()
            .filter(|s| matches!(s, Segment::VariableWithRegex { .. }))
            .count();
        (literals, constrained)
    }
}

impl AmbiguityResolver for PreferMostSpecific {
    fn resolve(&self, path: &str, candidates: Vec<InvokableDescriptor>) -> Option<InvokableDescriptor> {
        let best = candidates.iter().map(Self::rank).max()?;
        let mut top: Vec<InvokableDescriptor> = candidates
            .iter()
            .filter(|c| Self::rank(c) == best)
            .cloned()
            .collect();

        if top.len() == 1 {
            return top.pop();
        }

        warn!(
            path = %path,
            candidates = %describe(&top),
            "Multiple equally specific API descriptors match; not invoking any of them"
        );
        None
    }

    fn name(&self) -> &'static str {
        "PreferMostSpecific"
    }
}

fn describe(candidates: &[InvokableDescriptor]) -> String {
    candidates
        .iter()
        .map(|c| c.descriptor().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{handler_fn, ApiDescriptor};
    use crate::matcher::{match_path, CleanPath};
    use crate::response::ApiResponse;
    use crate::router::Method;
    use std::sync::Arc;

    fn candidate(pattern: &str, path: &str) -> InvokableDescriptor {
        let h = handler_fn(|_| async { Ok(ApiResponse::json("{}")) });
        let d = ApiDescriptor::new(Method::Put, pattern, h).unwrap();
        let vars = match_path(d.pattern(), &CleanPath::new(path)).unwrap();
        InvokableDescriptor::new(Arc::new(d), path, vars)
    }

    fn invoice_candidates() -> Vec<InvokableDescriptor> {
        vec![
            candidate("/r2o/v1/invoice", "/r2o/v1/invoice"),
            candidate("/r2o/{version:regex=v[0-9]+}/invoice", "/r2o/v1/invoice"),
        ]
    }

    #[test]
    fn test_reject_always_declines() {
        assert!(RejectAmbiguity.resolve("/r2o/v1/invoice", invoice_candidates()).is_none());
        assert_eq!(RejectAmbiguity.name(), "RejectAmbiguity");
    }

    #[test]
    fn test_prefer_most_specific_picks_literal() {
        let chosen = PreferMostSpecific
            .resolve("/r2o/v1/invoice", invoice_candidates())
            .unwrap();
        assert_eq!(chosen.descriptor().pattern().to_string(), "/r2o/v1/invoice");
    }

    #[test]
    fn test_prefer_most_specific_prefers_regex_over_plain_variable() {
        let chosen = PreferMostSpecific
            .resolve(
                "/r2o/v1/invoice",
                vec![
                    candidate("/r2o/{version}/invoice", "/r2o/v1/invoice"),
                    candidate("/r2o/{version:regex=v[0-9]+}/invoice", "/r2o/v1/invoice"),
                ],
            )
            .unwrap();
        assert_eq!(chosen.variables().get("version"), Some("v1"));
        assert_eq!(chosen.descriptor().pattern().variable_count(), 1);
        assert!(matches!(
            chosen.descriptor().pattern().segments()[1],
            Segment::VariableWithRegex { .. }
        ));
    }

    #[test]
    fn test_prefer_most_specific_declines_tie() {
        let tie = vec![
            candidate("/a/{b}", "/a/x"),
            candidate("/a/{c}", "/a/x"),
        ];
        assert!(PreferMostSpecific.resolve("/a/x", tie).is_none());
    }

    #[test]
    fn test_closure_resolver_takes_first() {
        let first = |_: &str, mut c: Vec<InvokableDescriptor>| {
            if c.is_empty() {
                None
            } else {
                Some(c.remove(0))
            }
        };
        let chosen = first.resolve("/r2o/v1/invoice", invoice_candidates()).unwrap();
        assert_eq!(chosen.descriptor().pattern().variable_count(), 0);
        assert_eq!(first.name(), "Custom");
    }
}
