//! Hand-rolled request router.
//!
//! Routes are grouped by (lower-cased verb, segment count) so resolution
//! only ever compares templates that can structurally match. Registration
//! happens once during single-threaded startup; after that the table is
//! read-only and can be shared freely across request tasks.
//!
//! When both a literal route and a placeholder route fit the same path
//! (`/team/_list` vs `/team/:teamName`), the route with the fewest
//! placeholder segments wins. A remaining tie falls back to registration
//! order, which keeps resolution deterministic.

mod template;

use std::collections::HashMap;

use thiserror::Error;

pub use template::{RouteTemplate, Segment, split_path};

/// Route registration and resolution failures.
///
/// `DuplicateRoute` and `InvalidHandler` are configuration errors and fatal
/// at startup. `NotFound` is a plain client error surfaced at request time.
#[derive(Debug, Error)]
pub enum RoutingError {
    #[error("duplicate route: {verb} {path}")]
    DuplicateRoute { verb: String, path: String },

    #[error("no action {action} for controller {controller}")]
    InvalidHandler { controller: String, action: String },

    #[error("URL not found: {verb} {path}")]
    NotFound { verb: String, path: String },
}

/// A registered route. Immutable once attached.
#[derive(Debug, Clone)]
pub struct Route<H> {
    template: RouteTemplate,
    controller: String,
    action: String,
    handler: H,
}

impl<H> Route<H> {
    pub fn template(&self) -> &RouteTemplate {
        &self.template
    }

    pub fn controller(&self) -> &str {
        &self.controller
    }

    pub fn action(&self) -> &str {
        &self.action
    }
}

/// A successful resolution: the handler to run, the controller/action pair
/// the permission check needs, and the extracted path parameters.
#[derive(Debug)]
pub struct ResolvedRoute<H> {
    pub handler: H,
    pub controller: String,
    pub action: String,
    pub params: HashMap<String, String>,
}

/// The route table. Generic over the handler type so the matching logic
/// stays independent of how handlers are invoked.
pub struct Router<H> {
    // verb -> segment count -> routes in registration order
    routes: HashMap<String, HashMap<usize, Vec<Route<H>>>>,
}

impl<H: Clone> Default for Router<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: Clone> Router<H> {
    pub fn new() -> Self {
        Self {
            routes: HashMap::new(),
        }
    }

    /// Register a route. Fails with `DuplicateRoute` when a structurally
    /// identical template already exists for this verb; placeholder names
    /// do not differentiate templates.
    pub fn attach(
        &mut self,
        verb: &str,
        path: &str,
        handler: H,
        controller: &str,
        action: &str,
    ) -> Result<(), RoutingError> {
        let template = RouteTemplate::parse(path);
        let bucket = self
            .routes
            .entry(verb.to_lowercase())
            .or_default()
            .entry(template.len())
            .or_default();

        if bucket
            .iter()
            .any(|route| route.template.shape() == template.shape())
        {
            return Err(RoutingError::DuplicateRoute {
                verb: verb.to_uppercase(),
                path: path.to_string(),
            });
        }

        bucket.push(Route {
            template,
            controller: controller.to_string(),
            action: action.to_string(),
            handler,
        });
        Ok(())
    }

    /// Resolve a concrete (verb, path) to the single best-matching route.
    ///
    /// Pure with respect to the table and its inputs: no identity, no
    /// permissions, no body content.
    pub fn resolve(&self, verb: &str, path: &str) -> Result<ResolvedRoute<H>, RoutingError> {
        let not_found = || RoutingError::NotFound {
            verb: verb.to_uppercase(),
            path: path.to_string(),
        };

        let by_len = self.routes.get(&verb.to_lowercase()).ok_or_else(not_found)?;
        let segments = split_path(path);
        let candidates = by_len.get(&segments.len()).ok_or_else(not_found)?;

        let route = candidates
            .iter()
            .filter(|route| route.template.matches(&segments))
            // min_by_key keeps the earliest minimum, so the first-registered
            // route wins an exact tie.
            .min_by_key(|route| route.template.placeholder_count())
            .ok_or_else(not_found)?;

        Ok(ResolvedRoute {
            handler: route.handler.clone(),
            controller: route.controller.clone(),
            action: route.action.clone(),
            params: route.template.extract_params(&segments),
        })
    }

    /// Total number of registered routes.
    pub fn len(&self) -> usize {
        self.routes
            .values()
            .flat_map(|by_len| by_len.values())
            .map(Vec::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
