//! Path pattern compilation and matching.
//!
//! # Responsibilities
//! - Parse `literal{name}literal` templates into segments
//! - Reject ambiguous templates at registration time
//! - Align a request path against a compiled pattern and collect captures
//!
//! # Design Decisions
//! - Literal text is compared case-sensitively
//! - A capture is never empty and never contains `/`
//! - A capture ends at the first position where the following literal matches
//!   (`h{hash}.json` anchors on `.json`); later positions are tried only when
//!   the rest of the pattern fails to match
//! - Matching never fails loudly: a mismatch is `None`

use std::collections::HashSet;
use std::fmt;

use indexmap::IndexMap;

use crate::error::PatternError;

/// Captured placeholder values, in pattern order.
pub type PathParams = IndexMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Capture(String),
}

/// A compiled route template. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePattern {
    source: String,
    segments: Vec<Segment>,
}

impl RoutePattern {
    /// Compile a template such as `/test-custom/h{hash}.json`.
    pub fn compile(pattern: &str) -> Result<Self, PatternError> {
        let mut segments = Vec::new();
        let mut seen = HashSet::new();
        let mut literal = String::new();
        let mut chars = pattern.chars();

        while let Some(ch) = chars.next() {
            if ch != '{' {
                literal.push(ch);
                continue;
            }

            let mut name = String::new();
            let mut closed = false;
            for c in chars.by_ref() {
                if c == '}' {
                    closed = true;
                    break;
                }
                name.push(c);
            }

            if !closed {
                return Err(PatternError::UnterminatedCapture(pattern.to_string()));
            }
            if name.is_empty() {
                return Err(PatternError::EmptyCapture(pattern.to_string()));
            }

            if !literal.is_empty() {
                segments.push(Segment::Literal(std::mem::take(&mut literal)));
            } else if let Some(Segment::Capture(prev)) = segments.last() {
                return Err(PatternError::AdjacentCaptures {
                    first: prev.clone(),
                    second: name,
                });
            }

            if !seen.insert(name.clone()) {
                return Err(PatternError::DuplicateCapture {
                    pattern: pattern.to_string(),
                    name,
                });
            }
            segments.push(Segment::Capture(name));
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self {
            source: pattern.to_string(),
            segments,
        })
    }

    /// The template this pattern was compiled from.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Placeholder names in declaration order.
    pub fn capture_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Capture(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Returns true if the pattern has no placeholders.
    pub fn is_literal(&self) -> bool {
        self.capture_names().next().is_none()
    }

    /// Align `path` against the pattern. Returns the captures on success.
    pub fn matches(&self, path: &str) -> Option<PathParams> {
        let mut captures = Vec::new();
        if !match_from(&self.segments, path, &mut captures) {
            return None;
        }

        Some(
            captures
                .into_iter()
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .collect(),
        )
    }
}

impl fmt::Display for RoutePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn match_from<'a, 'b>(
    segments: &'a [Segment],
    path: &'b str,
    captures: &mut Vec<(&'a str, &'b str)>,
) -> bool {
    let Some((head, rest)) = segments.split_first() else {
        return path.is_empty();
    };

    match head {
        Segment::Literal(text) => path
            .strip_prefix(text.as_str())
            .is_some_and(|tail| match_from(rest, tail, captures)),
        Segment::Capture(name) => {
            // Captures stop at the segment separator.
            let limit = path.find('/').unwrap_or(path.len());

            let anchor = match rest.first() {
                None => {
                    if limit == 0 || limit != path.len() {
                        return false;
                    }
                    captures.push((name.as_str(), path));
                    return true;
                }
                Some(Segment::Literal(anchor)) => anchor,
                Some(Segment::Capture(_)) => return false,
            };

            for end in 1..=limit {
                if !path.is_char_boundary(end) || !path[end..].starts_with(anchor.as_str()) {
                    continue;
                }

                captures.push((name.as_str(), &path[..end]));
                if match_from(rest, &path[end..], captures) {
                    return true;
                }
                captures.pop();
            }

            false
        }
    }
}
