//! Route entries: a compiled pattern bound to dispatch metadata.
//!
//! A [`Route`] is declared through the chainable [`RouteDef`] builder, then
//! compiled and frozen at registration time by the router. Everything that
//! can go wrong (pattern syntax, requirement regexes) surfaces during
//! registration; a built route is immutable for the serving lifetime.

pub mod parser;
pub mod pattern;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use regex::Regex;

use crate::error::RouterError;
use crate::request::{Handler, OkHandler, RoutingRequest};
use pattern::{Ast, Pattern};

/// HTTP verb constraint for a route.
///
/// `Any` accepts every request method. Note that `Get` does not implicitly
/// accept `HEAD`; HEAD requests reuse GET routes through the router's
/// fallback instead, so the request's own verb is never misreported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verb {
    Any,
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
    /// Any other method, matched case-insensitively.
    Custom(String),
}

impl Verb {
    /// Whether `method` satisfies this constraint.
    pub fn accepts(&self, method: &str) -> bool {
        match self {
            Verb::Any => true,
            Verb::Get => method == "GET",
            Verb::Post => method == "POST",
            Verb::Put => method == "PUT",
            Verb::Patch => method == "PATCH",
            Verb::Delete => method == "DELETE",
            Verb::Head => method == "HEAD",
            Verb::Options => method == "OPTIONS",
            Verb::Custom(m) => method.eq_ignore_ascii_case(m),
        }
    }
}

/// A request-level predicate registered on a route beyond its verb.
pub trait RequestConstraint: Send + Sync {
    fn accepts(&self, req: &dyn RoutingRequest) -> bool;
}

impl<F> RequestConstraint for F
where
    F: Fn(&dyn RoutingRequest) -> bool + Send + Sync,
{
    fn accepts(&self, req: &dyn RoutingRequest) -> bool {
        self(req)
    }
}

/// A registered route: compiled pattern plus dispatch metadata.
///
/// Created once at application boot and immutable thereafter.
#[derive(Clone)]
pub struct Route {
    pattern: Pattern,
    verb: Verb,
    defaults: HashMap<String, String>,
    precedence: usize,
    name: Option<String>,
    app: Arc<dyn Handler>,
    constraints: Vec<Arc<dyn RequestConstraint>>,
}

impl Route {
    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    pub fn verb(&self) -> &Verb {
        &self.verb
    }

    /// Values used to fill parameters not captured from the path.
    pub fn defaults(&self) -> &HashMap<String, String> {
        &self.defaults
    }

    /// Matching priority; lower sorts first.
    pub fn precedence(&self) -> usize {
        self.precedence
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The handler this route dispatches to.
    pub fn app(&self) -> &dyn Handler {
        self.app.as_ref()
    }

    /// Whether the route accepts this request: the verb constraint must be
    /// satisfied and every registered request constraint must accept.
    pub fn matches(&self, req: &dyn RoutingRequest) -> bool {
        self.verb.accepts(req.request_method()) && self.constraints.iter().all(|c| c.accepts(req))
    }

    /// Distinguishes verb-specific routes from wildcard-verb routes; the
    /// HEAD fallback only keeps the former on its first pass.
    pub fn requires_matching_verb(&self) -> bool {
        self.verb != Verb::Any
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("pattern", &self.pattern.to_string())
            .field("verb", &self.verb)
            .field("precedence", &self.precedence)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Declarative route description, compiled by the router at registration.
///
/// All builder methods are infallible; validation happens when the route is
/// added to a router, so a malformed requirement regex fails application
/// boot rather than a request.
///
/// # Examples
///
/// ```
/// use pathway_router::{RouteDef, Verb};
///
/// let def = RouteDef::new("/page/:name/:value")
///     .with_verb(Verb::Get)
///     .with_requirement("name", "(tender|love)")
///     .with_default("format", "html")
///     .with_name("page.show");
/// ```
#[derive(Clone)]
pub struct RouteDef {
    pattern: String,
    verb: Verb,
    requirements: Vec<(String, String)>,
    defaults: Vec<(String, String)>,
    name: Option<String>,
    precedence: Option<usize>,
    anchored: bool,
    formatted: bool,
    app: Option<Arc<dyn Handler>>,
    constraints: Vec<Arc<dyn RequestConstraint>>,
}

impl RouteDef {
    pub fn new(pattern: impl Into<String>) -> Self {
        RouteDef {
            pattern: pattern.into(),
            verb: Verb::Any,
            requirements: Vec::new(),
            defaults: Vec::new(),
            name: None,
            precedence: None,
            anchored: true,
            formatted: true,
            app: None,
            constraints: Vec::new(),
        }
    }

    /// Restricts the route to one HTTP verb.
    pub fn with_verb(mut self, verb: Verb) -> Self {
        self.verb = verb;
        self
    }

    /// Adds a regex requirement for a named parameter.
    ///
    /// The source is compiled at registration; an invalid regex aborts
    /// registration with [`RouterError::Requirement`].
    pub fn with_requirement(
        mut self,
        name: impl Into<String>,
        regex_source: impl Into<String>,
    ) -> Self {
        self.requirements.push((name.into(), regex_source.into()));
        self
    }

    /// Adds a default parameter value, used when the path does not capture
    /// the parameter.
    pub fn with_default(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.defaults.push((name.into(), value.into()));
        self
    }

    /// Names the route.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Overrides the declaration-order precedence.
    pub fn with_precedence(mut self, precedence: usize) -> Self {
        self.precedence = Some(precedence);
        self
    }

    /// Makes the pattern a prefix match instead of a full-path match, for
    /// mounting a handler under a path prefix.
    pub fn unanchored(mut self) -> Self {
        self.anchored = false;
        self
    }

    /// Disables the optional trailing format segment, so wildcards keep
    /// their greedy default instead of the non-greedy format-aware one.
    pub fn without_format(mut self) -> Self {
        self.formatted = false;
        self
    }

    /// Sets the handler dispatched to on a match. Routes without a handler
    /// respond 200 with an empty body, which is enough for matching-only use.
    pub fn with_app(mut self, app: impl Handler + 'static) -> Self {
        self.app = Some(Arc::new(app));
        self
    }

    /// Adds a request-level constraint checked alongside the verb.
    pub fn with_constraint(mut self, constraint: impl RequestConstraint + 'static) -> Self {
        self.constraints.push(Arc::new(constraint));
        self
    }

    /// Compiles this definition into a frozen [`Route`].
    ///
    /// `precedence` is the registration index, used unless the definition
    /// overrode it.
    pub(crate) fn compile(self, precedence: usize) -> Result<Route, RouterError> {
        let (arena, root) = parser::parse(&self.pattern)?;
        let mut ast = Ast::new(arena, root, self.formatted)?;

        let mut requirements = HashMap::new();
        for (name, source) in self.requirements {
            let regex = Regex::new(&source)
                .map_err(|e| RouterError::Requirement { name: name.clone(), source: e })?;
            requirements.insert(name, Arc::new(regex));
        }

        ast.add_requirements(&requirements);
        let pattern = Pattern::new(ast, requirements, self.anchored)?;

        Ok(Route {
            pattern,
            verb: self.verb,
            defaults: self.defaults.into_iter().collect(),
            precedence: self.precedence.unwrap_or(precedence),
            name: self.name,
            app: self.app.unwrap_or_else(|| Arc::new(OkHandler)),
            constraints: self.constraints,
        })
    }

    pub(crate) fn attach_memo(route: &mut Route, index: usize) {
        route.pattern.attach_route(index);
    }
}

impl fmt::Debug for RouteDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteDef")
            .field("pattern", &self.pattern)
            .field("verb", &self.verb)
            .field("anchored", &self.anchored)
            .finish_non_exhaustive()
    }
}
