//! Collaborator contracts: the request abstraction the matcher reads and
//! restores, the handler a matched route dispatches to, and an in-memory
//! request implementation for tests and embedding.

use std::collections::HashMap;

/// The request surface the router needs.
///
/// The router reads the path and method to match, and mutates
/// `script_name`/`path_info`/`path_parameters` when mounting unanchored
/// routes and when dispatching — always restoring them before trying the
/// next candidate after a cascade pass.
pub trait RoutingRequest {
    fn path_info(&self) -> &str;
    fn set_path_info(&mut self, path: &str);

    fn script_name(&self) -> &str;
    fn set_script_name(&mut self, name: &str);

    fn request_method(&self) -> &str;
    fn set_request_method(&mut self, method: &str);

    fn path_parameters(&self) -> &HashMap<String, String>;
    fn set_path_parameters(&mut self, params: HashMap<String, String>);

    fn is_head(&self) -> bool {
        self.request_method() == "HEAD"
    }
}

/// What a handler produces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl Response {
    pub fn new(status: u16) -> Self {
        Response {
            status,
            headers: HashMap::new(),
            body: String::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// The literal not-found triple the router returns when no route claims
    /// the request.
    pub fn not_found() -> Self {
        Response::new(404)
            .with_header("X-Cascade", "pass")
            .with_body("Not Found")
    }

    /// A handler's explicit "not actually mine" signal; the router restores
    /// the request and continues to the next sorted candidate.
    pub fn pass() -> Self {
        Response::new(404).with_header("X-Cascade", "pass")
    }

    /// Whether this response carries the cascade pass signal.
    pub fn is_pass(&self) -> bool {
        self.headers.get("X-Cascade").map(String::as_str) == Some("pass")
    }
}

/// A matched route's endpoint.
pub trait Handler: Send + Sync {
    fn serve(&self, req: &mut dyn RoutingRequest) -> Response;
}

impl<F> Handler for F
where
    F: Fn(&mut dyn RoutingRequest) -> Response + Send + Sync,
{
    fn serve(&self, req: &mut dyn RoutingRequest) -> Response {
        self(req)
    }
}

/// Default handler for routes declared without one: empty 200.
#[derive(Debug, Clone, Copy, Default)]
pub struct OkHandler;

impl Handler for OkHandler {
    fn serve(&self, _req: &mut dyn RoutingRequest) -> Response {
        Response::new(200)
    }
}

/// In-memory [`RoutingRequest`] for tests, demos, and adapters.
///
/// # Examples
///
/// ```
/// use pathway_router::{MockRequest, RoutingRequest};
///
/// let req = MockRequest::new("HEAD", "/pages/1");
/// assert!(req.is_head());
/// assert_eq!(req.path_info(), "/pages/1");
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockRequest {
    path_info: String,
    script_name: String,
    request_method: String,
    path_parameters: HashMap<String, String>,
}

impl MockRequest {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        MockRequest {
            path_info: path.into(),
            script_name: String::new(),
            request_method: method.into(),
            path_parameters: HashMap::new(),
        }
    }
}

impl RoutingRequest for MockRequest {
    fn path_info(&self) -> &str {
        &self.path_info
    }

    fn set_path_info(&mut self, path: &str) {
        self.path_info = path.to_string();
    }

    fn script_name(&self) -> &str {
        &self.script_name
    }

    fn set_script_name(&mut self, name: &str) {
        self.script_name = name.to_string();
    }

    fn request_method(&self) -> &str {
        &self.request_method
    }

    fn set_request_method(&mut self, method: &str) {
        self.request_method = method.to_string();
    }

    fn path_parameters(&self) -> &HashMap<String, String> {
        &self.path_parameters
    }

    fn set_path_parameters(&mut self, params: HashMap<String, String>) {
        self.path_parameters = params;
    }
}
