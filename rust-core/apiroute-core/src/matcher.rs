//! # Path Matching
//!
//! Matches cleaned request paths against [`PathPattern`]s.
//!
//! A request path is cleaned once (split on `/`, empty parts dropped, each
//! part percent-decoded) and the resulting [`CleanPath`] is reused for every
//! candidate pattern of a dispatch.

use crate::pattern::{PathPattern, Segment};
use percent_encoding::percent_decode_str;
use std::collections::HashMap;

/// A request path split into decoded parts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanPath {
    parts: Vec<String>,
}

impl CleanPath {
    /// Split and decode a raw URL path
    ///
    /// Invalid UTF-8 after decoding is replaced lossily.
    #[must_use]
    pub fn new(raw_path: &str) -> Self {
        let parts = raw_path
            .split('/')
            .filter(|p| !p.is_empty())
            .map(|p| percent_decode_str(p).decode_utf8_lossy().into_owned())
            .collect();
        Self { parts }
    }

    /// Decoded parts in order
    #[must_use]
    pub fn parts(&self) -> &[String] {
        &self.parts
    }

    /// Number of parts
    #[must_use]
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    /// True for `/` and the empty path
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

/// Variables bound by a successful match, in pattern order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathVariables {
    entries: Vec<(String, String)>,
}

impl PathVariables {
    /// Create an empty binding set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn bind(&mut self, name: &str, value: &str) {
        self.entries.push((name.to_string(), value.to_string()));
    }

    /// Get a bound value by variable name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Iterate over `(name, value)` pairs in pattern order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Number of bound variables
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nothing was bound
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Copy into an unordered map
    #[must_use]
    pub fn to_map(&self) -> HashMap<String, String> {
        self.entries.iter().cloned().collect()
    }
}

impl<'a> IntoIterator for &'a PathVariables {
    type Item = (&'a str, &'a str);
    type IntoIter = Box<dyn Iterator<Item = (&'a str, &'a str)> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

/// Match a cleaned path against a pattern
///
/// Returns the bound variables, or `None` if the part count differs or any
/// segment fails. Stops at the first failing segment.
#[must_use]
pub fn match_path(pattern: &PathPattern, path: &CleanPath) -> Option<PathVariables> {
    if pattern.len() != path.len() {
        return None;
    }

    let mut variables = PathVariables::new();
    for (segment, part) in pattern.segments().iter().zip(path.parts()) {
        match segment {
            Segment::Literal(literal) => {
                if literal != part {
                    return None;
                }
            }
            Segment::Variable(name) => variables.bind(name, part),
            Segment::VariableWithRegex { name, regex, .. } => {
                if !regex.is_match(part) {
                    return None;
                }
                variables.bind(name, part);
            }
        }
    }
    Some(variables)
}
