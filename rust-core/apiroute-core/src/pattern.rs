//! # Path Patterns
//!
//! Compiles declared route strings into segment sequences.
//!
//! ## Grammar
//!
//! - Segments are separated by `/`; empty segments are dropped
//! - `name` - literal segment, compared exactly
//! - `{name}` - variable segment, binds any value
//! - `{name:regex=pattern}` - variable segment whose value must fully match `pattern`
//!
//! Regexes are compiled once, when the pattern is parsed.

use crate::error::{Error, Result};
use regex::Regex;
use std::fmt;

const VARIABLE_START: char = '{';
const VARIABLE_END: char = '}';
const CONSTRAINT_SEPARATOR: char = ':';
const REGEX_CONSTRAINT: &str = "regex=";

/// A single component of a [`PathPattern`]
#[derive(Debug, Clone)]
pub enum Segment {
    /// Exact, case-sensitive string
    Literal(String),
    /// Binds any segment value to `name`
    Variable(String),
    /// Binds the segment value to `name` if it fully matches `regex`
    VariableWithRegex {
        /// Variable name
        name: String,
        /// Regex as declared, without the implicit anchors
        constraint: String,
        /// Compiled, anchored regex
        regex: Regex,
    },
}

impl Segment {
    /// Parse one non-empty pattern segment
    fn parse(pattern: &str, part: &str) -> Result<Self> {
        if !part.starts_with(VARIABLE_START) {
            return Ok(Self::Literal(part.to_string()));
        }

        let invalid = |reason: String| Error::InvalidRoutePattern {
            pattern: pattern.to_string(),
            reason,
        };

        let inner = part
            .strip_prefix(VARIABLE_START)
            .and_then(|p| p.strip_suffix(VARIABLE_END))
            .ok_or_else(|| invalid(format!("unterminated variable segment '{part}'")))?;

        let (name, constraint) = match inner.split_once(CONSTRAINT_SEPARATOR) {
            Some((name, constraint)) => (name, Some(constraint)),
            None => (inner, None),
        };

        if name.is_empty() {
            return Err(invalid(format!("variable without a name in '{part}'")));
        }
        if name.contains([VARIABLE_START, VARIABLE_END]) {
            return Err(invalid(format!("malformed variable name '{name}'")));
        }

        let Some(constraint) = constraint else {
            return Ok(Self::Variable(name.to_string()));
        };

        let expr = constraint.strip_prefix(REGEX_CONSTRAINT).ok_or_else(|| {
            invalid(format!("unsupported constraint '{constraint}' on variable '{name}'"))
        })?;
        if expr.is_empty() {
            return Err(invalid(format!("empty regex on variable '{name}'")));
        }

        let regex = compile_anchored(expr)
            .map_err(|e| invalid(format!("bad regex for variable '{name}': {e}")))?;

        Ok(Self::VariableWithRegex {
            name: name.to_string(),
            constraint: expr.to_string(),
            regex,
        })
    }

    /// Variable name, or `None` for literal segments
    #[must_use]
    pub fn variable_name(&self) -> Option<&str> {
        match self {
            Self::Literal(_) => None,
            Self::Variable(name) | Self::VariableWithRegex { name, .. } => Some(name),
        }
    }

    /// Whether this segment is a literal
    #[must_use]
    pub const fn is_literal(&self) -> bool {
        matches!(self, Self::Literal(_))
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(s) => write!(f, "{s}"),
            Self::Variable(name) => write!(f, "{{{name}}}"),
            Self::VariableWithRegex {
                name, constraint, ..
            } => write!(f, "{{{name}:regex={constraint}}}"),
        }
    }
}

/// A compiled route pattern
///
/// Immutable after construction. The number of segments is fixed; a request
/// path only matches if it has exactly as many parts.
#[derive(Debug, Clone)]
pub struct PathPattern {
    declared: String,
    segments: Vec<Segment>,
}

impl PathPattern {
    /// Parse a declared route pattern
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidRoutePattern` for malformed braces, unknown
    /// constraints, duplicate variable names or regexes that fail to compile.
    pub fn parse(pattern: &str) -> Result<Self> {
        let mut segments: Vec<Segment> = Vec::new();

        for part in pattern.split('/').filter(|p| !p.is_empty()) {
            let segment = Segment::parse(pattern, part)?;
            if let Some(name) = segment.variable_name() {
                if segments.iter().any(|s| s.variable_name() == Some(name)) {
                    return Err(Error::InvalidRoutePattern {
                        pattern: pattern.to_string(),
                        reason: format!("duplicate variable '{name}'"),
                    });
                }
            }
            segments.push(segment);
        }

        Ok(Self {
            declared: pattern.to_string(),
            segments,
        })
    }

    /// The pattern string as it was registered
    #[must_use]
    pub fn declared(&self) -> &str {
        &self.declared
    }

    /// All segments in order
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Number of segments
    #[must_use]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// True for the root pattern `/`
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Number of variable segments (constrained or not)
    #[must_use]
    pub fn variable_count(&self) -> usize {
        self.segments.iter().filter(|s| !s.is_literal()).count()
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return write!(f, "/");
        }
        for segment in &self.segments {
            write!(f, "/{segment}")?;
        }
        Ok(())
    }
}

impl std::str::FromStr for PathPattern {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

fn compile_anchored(expr: &str) -> std::result::Result<Regex, regex::Error> {
    #[cfg(test)]
    tests::COMPILED.with(|c| c.set(c.get() + 1));
    Regex::new(&format!("^(?:{expr})$"))
}
