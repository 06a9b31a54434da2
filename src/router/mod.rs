//! Request-time matching and dispatch.
//!
//! The router gathers candidates through two channels — a bulk partition for
//! anchored routes whose constraints are all default, and a linear scan for
//! everything else — filters them by verb (with the HEAD→GET fallback),
//! sorts by precedence, and extracts decoded path parameters per surviving
//! route. Registration happens single-threaded at boot; after that the
//! router is read-only and matching is freely re-entrant.

pub mod partition;

use std::collections::HashMap;
use std::fmt;

use once_cell::sync::OnceCell;

use crate::error::RouterError;
use crate::path;
use crate::request::{Response, RoutingRequest};
use crate::route::{Route, RouteDef};
use partition::{BulkMatcher, PrefixPartition};

/// One entry of the ordered match sequence [`Router::find_routes`] returns.
#[derive(Debug, Clone)]
pub struct RouteMatch<'r> {
    /// The route that matched.
    pub route: &'r Route,
    /// Percent-decoded parameters captured from the path. Unmatched optional
    /// groups are omitted.
    pub params: HashMap<String, String>,
    /// The path span the pattern consumed.
    pub matched: String,
    /// The remainder after the span; non-empty only for unanchored routes.
    pub post_match: String,
}

type BulkBuilder = fn(&[Route]) -> Box<dyn BulkMatcher>;

fn default_bulk_builder(routes: &[Route]) -> Box<dyn BulkMatcher> {
    Box::new(PrefixPartition::build(routes))
}

/// The route-matching engine.
///
/// Build it at boot with [`RouteDef`]s, then share it read-only across
/// request workers.
///
/// # Examples
///
/// ```
/// use pathway_router::{MockRequest, RouteDef, Router, Verb};
///
/// let router = Router::new()
///     .with_route(RouteDef::new("/page/:name").with_verb(Verb::Get))
///     .unwrap();
///
/// let mut req = MockRequest::new("GET", "/page/intro");
/// let matches = router.find_routes(&mut req);
/// assert_eq!(matches[0].params["name"], "intro");
/// ```
pub struct Router {
    routes: Vec<Route>,
    bulk: OnceCell<Box<dyn BulkMatcher>>,
    bulk_builder: BulkBuilder,
}

impl Router {
    pub fn new() -> Self {
        Router {
            routes: Vec::new(),
            bulk: OnceCell::new(),
            bulk_builder: default_bulk_builder,
        }
    }

    /// Swaps the bulk-matching strategy used for default-constraint routes.
    pub fn with_bulk_builder(mut self, builder: BulkBuilder) -> Self {
        self.bulk_builder = builder;
        self.bulk = OnceCell::new();
        self
    }

    /// Registers a route (chainable form).
    ///
    /// Compilation errors — pattern syntax, requirement regexes — surface
    /// here, at boot.
    pub fn with_route(mut self, def: RouteDef) -> Result<Self, RouterError> {
        self.add_route(def)?;
        Ok(self)
    }

    /// Registers a route (mutable form).
    pub fn add_route(&mut self, def: RouteDef) -> Result<(), RouterError> {
        let index = self.routes.len();
        let mut route = def.compile(index)?;
        RouteDef::attach_memo(&mut route, index);
        tracing::debug!(
            pattern = %route.pattern(),
            precedence = route.precedence(),
            "route registered"
        );
        self.routes.push(route);
        // Any previously built partition is stale now.
        self.bulk = OnceCell::new();
        Ok(())
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Builds the bulk partition now instead of inside the first request.
    ///
    /// Without this, the partition is built lazily behind a once-cell the
    /// first time a request is matched.
    pub fn eager_load(&self) {
        let _ = self.bulk_matcher();
        tracing::debug!(routes = self.routes.len(), "router eager-loaded");
    }

    fn bulk_matcher(&self) -> &dyn BulkMatcher {
        self.bulk
            .get_or_init(|| (self.bulk_builder)(&self.routes))
            .as_ref()
    }

    /// Routes that cannot use the bulk channel: unanchored, or carrying at
    /// least one non-default constraint (including every wildcard route).
    fn custom_routes(&self) -> impl Iterator<Item = &Route> {
        self.routes.iter().filter(|r| !partition::eligible(r))
    }

    /// Finds every route matching the request, in precedence order.
    ///
    /// No match is not an error: the result is simply empty. The request's
    /// verb reads back unchanged afterwards, even for HEAD requests that
    /// fell back to GET routes.
    pub fn find_routes<'r>(&'r self, req: &mut dyn RoutingRequest) -> Vec<RouteMatch<'r>> {
        let path = req.path_info().to_string();

        let mut candidates: Vec<&Route> = self
            .bulk_matcher()
            .memos(&path)
            .into_iter()
            .filter_map(|memo| self.routes.get(memo))
            .collect();
        candidates.extend(self.custom_routes().filter(|r| r.pattern().is_match(&path)));

        let mut survivors: Vec<&Route> = if req.is_head() {
            self.match_head_routes(candidates, req)
        } else {
            candidates.into_iter().filter(|r| r.matches(req)).collect()
        };

        // Stable sort: declaration order breaks precedence ties.
        survivors.sort_by_key(|r| r.precedence());

        survivors
            .into_iter()
            .filter_map(|route| {
                let m = route.pattern().match_path(&path)?;
                let params = m
                    .params
                    .into_iter()
                    .map(|(name, value)| (name, path::unescape_uri(&value)))
                    .collect();
                Some(RouteMatch {
                    route,
                    params,
                    matched: m.matched,
                    post_match: m.post_match,
                })
            })
            .collect()
    }

    /// HEAD requests prefer routes registered for HEAD specifically; when
    /// none exist the request temporarily becomes GET for verb filtering.
    /// The original verb is restored on every exit path, including panics in
    /// a request constraint.
    fn match_head_routes<'r>(
        &self,
        candidates: Vec<&'r Route>,
        req: &mut dyn RoutingRequest,
    ) -> Vec<&'r Route> {
        let head_routes: Vec<&Route> = candidates
            .iter()
            .copied()
            .filter(|r| r.requires_matching_verb() && r.matches(req))
            .collect();
        if !head_routes.is_empty() {
            return head_routes;
        }

        let mut guard = VerbRestore {
            req,
            original: "HEAD",
        };
        guard.req.set_request_method("GET");
        candidates
            .into_iter()
            .filter(|r| r.matches(guard.req))
            .collect()
    }

    /// Dispatches the request to matching routes in order.
    ///
    /// Each attempt saves the request's routing state; a handler answering
    /// with `X-Cascade: pass` has that state restored before the next
    /// candidate is tried. When every candidate passes — or none matched —
    /// the literal not-found triple is returned for the layer above to map.
    pub fn serve(&self, req: &mut dyn RoutingRequest) -> Response {
        for m in self.find_routes(req) {
            let saved_params = req.path_parameters().clone();
            let saved_path_info = req.path_info().to_string();
            let saved_script_name = req.script_name().to_string();

            if !m.route.pattern().anchored() {
                let mounted = format!("{saved_script_name}{}", m.matched);
                let mounted = mounted.strip_suffix('/').unwrap_or(&mounted);
                req.set_script_name(mounted);
                req.set_path_info(&path::ensure_leading_slash(&m.post_match));
            }

            let mut params = saved_params.clone();
            params.extend(m.route.defaults().clone());
            params.extend(m.params.clone());
            req.set_path_parameters(params);

            let response = m.route.app().serve(req);
            if response.is_pass() {
                req.set_script_name(&saved_script_name);
                req.set_path_info(&saved_path_info);
                req.set_path_parameters(saved_params);
                continue;
            }
            return response;
        }

        Response::not_found()
    }

    /// Yields `(route, parameters)` for each match, defaults merged under
    /// captured values — recognition without dispatch.
    pub fn recognize<F>(&self, req: &mut dyn RoutingRequest, mut f: F)
    where
        F: FnMut(&Route, HashMap<String, String>),
    {
        for m in self.find_routes(req) {
            if !m.route.pattern().anchored() {
                req.set_script_name(&m.matched);
                req.set_path_info(&path::ensure_leading_slash(&m.post_match));
            }

            let mut params = m.route.defaults().clone();
            params.extend(m.params.clone());
            f(m.route, params);
        }
    }
}

impl Default for Router {
    fn default() -> Self {
        Router::new()
    }
}

impl Clone for Router {
    fn clone(&self) -> Self {
        Router {
            routes: self.routes.clone(),
            // Rebuilt lazily by the clone.
            bulk: OnceCell::new(),
            bulk_builder: self.bulk_builder,
        }
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("routes", &self.routes)
            .field("bulk_built", &self.bulk.get().is_some())
            .finish()
    }
}

/// Restores the request verb when dropped, so the HEAD→GET substitution
/// cannot leak even if verb filtering unwinds.
struct VerbRestore<'a> {
    req: &'a mut dyn RoutingRequest,
    original: &'static str,
}

impl Drop for VerbRestore<'_> {
    fn drop(&mut self) {
        self.req.set_request_method(self.original);
    }
}
