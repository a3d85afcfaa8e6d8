//! Path templates for route registration and matching.
//!
//! A pattern such as `/api/team/:teamName/_list` is split into ordered
//! segments. A segment starting with `:` is a placeholder that matches any
//! single path segment and binds it to a named parameter; every other
//! segment is a literal and matches case-sensitively.

use std::collections::HashMap;

/// Marker used in a template shape where a placeholder sits.
const SHAPE_WILDCARD: &str = "*";

/// A single segment of a route template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Matches exactly this text.
    Literal(String),
    /// Matches any one segment and binds it under this name.
    Placeholder(String),
}

impl Segment {
    pub fn is_placeholder(&self) -> bool {
        matches!(self, Segment::Placeholder(_))
    }
}

/// A parsed path pattern.
///
/// The shape string (placeholders normalized to `*`, literals verbatim) is
/// the comparison key for duplicate detection: `/team/:a` and `/team/:b`
/// share the shape `/team/*` and are considered the same route.
#[derive(Debug, Clone)]
pub struct RouteTemplate {
    segments: Vec<Segment>,
    shape: String,
}

impl RouteTemplate {
    /// Parse a pattern. Empty segments are discarded, so `/a//b/` and
    /// `/a/b` produce the same template.
    pub fn parse(pattern: &str) -> Self {
        let segments: Vec<Segment> = split_path(pattern)
            .into_iter()
            .map(|part| match part.strip_prefix(':') {
                Some(name) => Segment::Placeholder(name.to_string()),
                None => Segment::Literal(part.to_string()),
            })
            .collect();

        let shape = {
            let mut shape = String::new();
            for segment in &segments {
                shape.push('/');
                match segment {
                    Segment::Literal(text) => shape.push_str(text),
                    Segment::Placeholder(_) => shape.push_str(SHAPE_WILDCARD),
                }
            }
            shape
        };

        Self { segments, shape }
    }

    /// Number of segments; only paths with the same count can match.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// The comparable form used for duplicate detection.
    pub fn shape(&self) -> &str {
        &self.shape
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// How many segments are placeholders. Fewer placeholders means a more
    /// specific route; used by the resolution tie-break.
    pub fn placeholder_count(&self) -> usize {
        self.segments.iter().filter(|s| s.is_placeholder()).count()
    }

    /// Whether this template matches the already-split request path.
    /// The caller guarantees the segment counts are equal.
    pub fn matches(&self, path_segments: &[&str]) -> bool {
        debug_assert_eq!(self.segments.len(), path_segments.len());
        self.segments
            .iter()
            .zip(path_segments)
            .all(|(segment, part)| match segment {
                Segment::Placeholder(_) => true,
                Segment::Literal(text) => text == part,
            })
    }

    /// Bind placeholder names to the concrete values of a matched path.
    /// Values stay strings; any coercion is up to the request accessors.
    pub fn extract_params(&self, path_segments: &[&str]) -> HashMap<String, String> {
        let mut params = HashMap::new();
        for (segment, part) in self.segments.iter().zip(path_segments) {
            if let Segment::Placeholder(name) = segment {
                params.insert(name.clone(), (*part).to_string());
            }
        }
        params
    }
}

/// Split a path on `/`, dropping empty segments.
pub fn split_path(path: &str) -> Vec<&str> {
    path.split('/').filter(|part| !part.is_empty()).collect()
}
