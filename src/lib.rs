//! # Pathway Router
//!
//! A route-matching engine for HTTP dispatchers with support for:
//! - Static routes (`/about`)
//! - Named parameters (`/page/:name`) with per-parameter regex requirements
//! - Catch-all segments (`/files/*path`) with non-greedy format handling
//! - Optional segments (`/page/:name(.:format)`) and alternation (`/a|/b`)
//! - Priority-ordered matching with HEAD→GET fallback and cascade pass-through
//!
//! ## How matching works
//!
//! Pattern text is compiled once at registration: parsed into a node tree,
//! analyzed (parameter collection, wildcard defaults, adjacency rewrites),
//! then frozen into a single regex per route. At request time the router
//! gathers candidates through a prefix-partitioned bulk channel for
//! "all-default" routes and a linear scan for custom ones, filters by verb,
//! sorts by precedence, and extracts percent-decoded parameters.
//!
//! Registration is a boot-time, single-threaded write phase; the built
//! router is read-only and safe to share across request workers.
//!
//! ## Example
//!
//! ```
//! use pathway_router::{MockRequest, RouteDef, Router, Verb};
//!
//! let router = Router::new()
//!     .with_route(RouteDef::new("/page/:name/:value").with_verb(Verb::Get))
//!     .unwrap()
//!     .with_route(RouteDef::new("/files/*path(.:format)"))
//!     .unwrap();
//! router.eager_load();
//!
//! let mut req = MockRequest::new("GET", "/files/a/b.json");
//! let matches = router.find_routes(&mut req);
//! assert_eq!(matches[0].params["path"], "a/b");
//! assert_eq!(matches[0].params["format"], "json");
//! ```

// ============================================================================
// Module Declarations
// ============================================================================

mod error;
pub mod nodes;
pub mod path;
pub mod request;
pub mod route;
pub mod router;

// Re-export the public surface at the crate root.
pub use error::RouterError;
pub use nodes::{Node, NodeArena, NodeId};
pub use request::{Handler, MockRequest, OkHandler, Response, RoutingRequest};
pub use route::pattern::{Ast, PathMatch, Pattern};
pub use route::{RequestConstraint, Route, RouteDef, Verb};
pub use router::partition::{BulkMatcher, LinearScan, PrefixPartition};
pub use router::{RouteMatch, Router};
