//! Integration tests for pathway-router.
//!
//! Tests are organized by feature area and cover:
//! - Pattern compilation (parameters, wildcards, optional format segments)
//! - Requirement injection and custom-constraint routes
//! - Precedence ordering and verb filtering
//! - HEAD→GET fallback
//! - Serve dispatch, cascade pass-through, and state restoration
//! - Unanchored mounting and recognition
//! - Bulk-matching strategies

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use pretty_assertions::assert_eq;

use pathway_router::{
    LinearScan, MockRequest, Response, RouteDef, Router, RoutingRequest, Verb,
};

fn router(defs: Vec<RouteDef>) -> Router {
    let mut router = Router::new();
    for def in defs {
        router.add_route(def).unwrap();
    }
    router
}

// ============================================================================
// Matching and parameter extraction
// ============================================================================

#[test]
fn test_static_route_matches() {
    let router = router(vec![RouteDef::new("/about")]);
    let mut req = MockRequest::new("GET", "/about");
    let matches = router.find_routes(&mut req);
    assert_eq!(matches.len(), 1);
    assert!(matches[0].params.is_empty());
    assert_eq!(matches[0].matched, "/about");
}

#[test]
fn test_named_parameters_are_extracted() {
    let router = router(vec![RouteDef::new("/users/:id")]);
    let mut req = MockRequest::new("GET", "/users/42");
    let matches = router.find_routes(&mut req);
    assert_eq!(matches[0].params["id"], "42");
}

#[test]
fn test_parameters_are_percent_decoded() {
    let router = router(vec![RouteDef::new("/page/:name")]);
    let mut req = MockRequest::new("GET", "/page/caf%C3%A9");
    let matches = router.find_routes(&mut req);
    assert_eq!(matches[0].params["name"], "café");
}

#[test]
fn test_optional_format_segment() {
    let router = router(vec![RouteDef::new("/pages/:id(.:format)")]);

    let mut req = MockRequest::new("GET", "/pages/7");
    let matches = router.find_routes(&mut req);
    assert_eq!(matches[0].params["id"], "7");
    // Unmatched optional captures are omitted, not inserted as "".
    assert!(!matches[0].params.contains_key("format"));

    let mut req = MockRequest::new("GET", "/pages/7.json");
    let matches = router.find_routes(&mut req);
    assert_eq!(matches[0].params["format"], "json");
}

#[test]
fn test_wildcard_is_non_greedy_with_format() {
    let router = router(vec![RouteDef::new("/files/*path(.:format)")]);
    let mut req = MockRequest::new("GET", "/files/a/b.json");
    let matches = router.find_routes(&mut req);
    assert_eq!(matches[0].params["path"], "a/b");
    assert_eq!(matches[0].params["format"], "json");
}

#[test]
fn test_alternation_matches_every_branch() {
    let router = router(vec![RouteDef::new("/a|/b").with_name("either")]);

    for path in ["/a", "/b"] {
        let mut req = MockRequest::new("GET", path);
        let matches = router.find_routes(&mut req);
        assert_eq!(matches.len(), 1, "no match for {path}");
        assert_eq!(matches[0].route.name(), Some("either"));
        assert_eq!(matches[0].matched, path);
    }

    let mut req = MockRequest::new("GET", "/c");
    assert!(router.find_routes(&mut req).is_empty());
}

#[test]
fn test_empty_pattern_matches_empty_path() {
    // A pattern with no segments has no terminal to carry a back-reference,
    // so it matches through the scan channel instead of the bulk lookup.
    let router = router(vec![RouteDef::new("")]);

    let mut req = MockRequest::new("GET", "");
    let matches = router.find_routes(&mut req);
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].matched, "");

    let mut req = MockRequest::new("GET", "/a");
    assert!(router.find_routes(&mut req).is_empty());
}

#[test]
fn test_alternation_with_shared_prefix() {
    let router = router(vec![RouteDef::new("/x/a|/y")]);

    for path in ["/x/a", "/y"] {
        let mut req = MockRequest::new("GET", path);
        assert_eq!(router.find_routes(&mut req).len(), 1, "no match for {path}");
    }
}

#[test]
fn test_wildcard_without_format_consumes_everything() {
    let router = router(vec![RouteDef::new("/files/*path").without_format()]);
    let mut req = MockRequest::new("GET", "/files/a/b.json");
    let matches = router.find_routes(&mut req);
    assert_eq!(matches[0].params["path"], "a/b.json");
}

// ============================================================================
// Requirements and custom routes
// ============================================================================

#[test]
fn test_requirements_filter_matches() {
    let router = router(vec![RouteDef::new("/page/:name/:value")
        .with_requirement("name", "(tender|love)")
        .with_requirement("value", ".")]);

    let mut req = MockRequest::new("GET", "/page/tender/x");
    let matches = router.find_routes(&mut req);
    assert_eq!(matches.len(), 1);
    // The nested group inside the `name` requirement must not shift `value`.
    assert_eq!(matches[0].params["name"], "tender");
    assert_eq!(matches[0].params["value"], "x");

    let mut req = MockRequest::new("GET", "/page/other/x");
    assert!(router.find_routes(&mut req).is_empty());
}

#[test]
fn test_symbol_adjacent_to_literal() {
    let router = router(vec![RouteDef::new("/:id-suffix")]);
    let mut req = MockRequest::new("GET", "/ab-cd-suffix");
    let matches = router.find_routes(&mut req);
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].params["id"], "ab-cd");

    // The rewritten constraint still rejects an empty parameter.
    let mut req = MockRequest::new("GET", "/-suffix");
    assert!(router.find_routes(&mut req).is_empty());
}

#[test]
fn test_invalid_requirement_is_a_registration_error() {
    let err = Router::new()
        .with_route(RouteDef::new("/page/:name").with_requirement("name", "(unclosed"))
        .unwrap_err();
    assert!(err.to_string().contains("name"));
}

// ============================================================================
// Precedence and verbs
// ============================================================================

#[test]
fn test_matches_are_ordered_by_precedence() {
    // Declared out of priority order on purpose.
    let router = router(vec![
        RouteDef::new("/x").with_name("second").with_precedence(2),
        RouteDef::new("/:letter").with_name("first").with_precedence(1),
    ]);

    let mut req = MockRequest::new("GET", "/x");
    let matches = router.find_routes(&mut req);
    assert_eq!(matches.len(), 2);
    assert_eq!(matches[0].route.name(), Some("first"));
    assert_eq!(matches[1].route.name(), Some("second"));
}

#[test]
fn test_declaration_order_breaks_ties() {
    let router = router(vec![
        RouteDef::new("/x").with_name("a").with_precedence(1),
        RouteDef::new("/:letter").with_name("b").with_precedence(1),
    ]);

    let mut req = MockRequest::new("GET", "/x");
    let matches = router.find_routes(&mut req);
    assert_eq!(matches[0].route.name(), Some("a"));
    assert_eq!(matches[1].route.name(), Some("b"));
}

#[test]
fn test_verb_filtering() {
    let router = router(vec![
        RouteDef::new("/submit").with_verb(Verb::Post).with_name("create"),
        RouteDef::new("/submit").with_verb(Verb::Get).with_name("form"),
    ]);

    let mut req = MockRequest::new("POST", "/submit");
    let matches = router.find_routes(&mut req);
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].route.name(), Some("create"));
}

// ============================================================================
// HEAD fallback
// ============================================================================

#[test]
fn test_head_falls_back_to_get_routes() {
    let router = router(vec![RouteDef::new("/y").with_verb(Verb::Get)]);

    let mut req = MockRequest::new("HEAD", "/y");
    let matches = router.find_routes(&mut req);
    assert_eq!(matches.len(), 1);
    // The substitution must not leak: the verb reads back as HEAD.
    assert_eq!(req.request_method(), "HEAD");
}

#[test]
fn test_head_prefers_head_specific_routes() {
    let router = router(vec![
        RouteDef::new("/y").with_verb(Verb::Get).with_name("get"),
        RouteDef::new("/y").with_verb(Verb::Head).with_name("head"),
    ]);

    let mut req = MockRequest::new("HEAD", "/y");
    let matches = router.find_routes(&mut req);
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].route.name(), Some("head"));
}

#[test]
fn test_head_ignores_non_get_routes() {
    let router = router(vec![RouteDef::new("/y").with_verb(Verb::Post)]);
    let mut req = MockRequest::new("HEAD", "/y");
    assert!(router.find_routes(&mut req).is_empty());
    assert_eq!(req.request_method(), "HEAD");
}

// ============================================================================
// Serve: dispatch, cascade, not-found
// ============================================================================

#[test]
fn test_serve_dispatches_to_handler_with_params() {
    let seen = Arc::new(Mutex::new(HashMap::new()));
    let seen_in_handler = Arc::clone(&seen);

    let router = router(vec![RouteDef::new("/users/:id")
        .with_default("format", "html")
        .with_app(move |req: &mut dyn RoutingRequest| {
            *seen_in_handler.lock().unwrap() = req.path_parameters().clone();
            Response::new(200).with_body("ok")
        })]);

    let mut req = MockRequest::new("GET", "/users/9");
    let response = router.serve(&mut req);
    assert_eq!(response.status, 200);
    assert_eq!(response.body, "ok");

    let params = seen.lock().unwrap();
    assert_eq!(params["id"], "9");
    // Defaults fill parameters the path did not capture.
    assert_eq!(params["format"], "html");
}

#[test]
fn test_serve_returns_not_found_triple() {
    let router = router(vec![RouteDef::new("/only")]);
    let mut req = MockRequest::new("GET", "/missing");

    let response = router.serve(&mut req);
    assert_eq!(response.status, 404);
    assert_eq!(response.headers["X-Cascade"], "pass");
    assert_eq!(response.body, "Not Found");
}

#[test]
fn test_no_match_is_an_empty_sequence() {
    let router = router(vec![RouteDef::new("/only")]);
    let mut req = MockRequest::new("GET", "/missing");
    assert!(router.find_routes(&mut req).is_empty());
}

#[test]
fn test_cascade_pass_continues_with_restored_state() {
    // Each handler records (script_name, path_info) as it saw them.
    let log: Arc<Mutex<Vec<(String, String, String)>>> = Arc::new(Mutex::new(Vec::new()));

    let log_a = Arc::clone(&log);
    let log_b = Arc::clone(&log);

    let router = router(vec![
        // Unanchored mount that declines the request.
        RouteDef::new("/app")
            .unanchored()
            .with_app(move |req: &mut dyn RoutingRequest| {
                log_a.lock().unwrap().push((
                    "a".to_string(),
                    req.script_name().to_string(),
                    req.path_info().to_string(),
                ));
                Response::pass()
            }),
        RouteDef::new("/app/x").with_app(move |req: &mut dyn RoutingRequest| {
            log_b.lock().unwrap().push((
                "b".to_string(),
                req.script_name().to_string(),
                req.path_info().to_string(),
            ));
            Response::new(200).with_body("b")
        }),
    ]);

    let mut req = MockRequest::new("GET", "/app/x");
    let response = router.serve(&mut req);
    assert_eq!(response.body, "b");

    let log = log.lock().unwrap();
    // The mount saw the adjusted request…
    assert_eq!(log[0], ("a".to_string(), "/app".to_string(), "/x".to_string()));
    // …and the pass restored it before the next candidate ran.
    assert_eq!(log[1], ("b".to_string(), String::new(), "/app/x".to_string()));
}

#[test]
fn test_all_candidates_passing_yields_not_found() {
    let router = router(vec![
        RouteDef::new("/p").with_app(|_: &mut dyn RoutingRequest| Response::pass()),
        RouteDef::new("/p").with_app(|_: &mut dyn RoutingRequest| Response::pass()),
    ]);
    let mut req = MockRequest::new("GET", "/p");
    let response = router.serve(&mut req);
    assert_eq!(response.status, 404);
    assert_eq!(response.body, "Not Found");
}

// ============================================================================
// Unanchored mounting and recognition
// ============================================================================

#[test]
fn test_unanchored_route_mounts_prefix() {
    let seen = Arc::new(Mutex::new((String::new(), String::new())));
    let seen_in_handler = Arc::clone(&seen);

    let router = router(vec![RouteDef::new("/admin").unanchored().with_app(
        move |req: &mut dyn RoutingRequest| {
            *seen_in_handler.lock().unwrap() =
                (req.script_name().to_string(), req.path_info().to_string());
            Response::new(200)
        },
    )]);

    let mut req = MockRequest::new("GET", "/admin/users/1");
    let response = router.serve(&mut req);
    assert_eq!(response.status, 200);

    let seen = seen.lock().unwrap();
    assert_eq!(seen.0, "/admin");
    assert_eq!(seen.1, "/users/1");
}

#[test]
fn test_recognize_yields_routes_with_defaults() {
    let router = router(vec![RouteDef::new("/pages/:id")
        .with_default("controller", "pages")
        .with_name("page")]);

    let mut req = MockRequest::new("GET", "/pages/3");
    let mut recognized = Vec::new();
    router.recognize(&mut req, |route, params| {
        recognized.push((route.name().map(str::to_string), params));
    });

    assert_eq!(recognized.len(), 1);
    let (name, params) = &recognized[0];
    assert_eq!(name.as_deref(), Some("page"));
    assert_eq!(params["id"], "3");
    assert_eq!(params["controller"], "pages");
}

// ============================================================================
// Bulk matching strategies
// ============================================================================

#[test]
fn test_eager_load_then_match() {
    let router = router(vec![
        RouteDef::new("/users/:id"),
        RouteDef::new("/users/new"),
    ]);
    router.eager_load();

    let mut req = MockRequest::new("GET", "/users/new");
    let matches = router.find_routes(&mut req);
    // Both match; registration order decides.
    assert_eq!(matches.len(), 2);
    assert_eq!(matches[0].matched, "/users/new");
}

#[test]
fn test_linear_scan_strategy_agrees() {
    let defs = || {
        vec![
            RouteDef::new("/users/:id"),
            RouteDef::new("/page/:name").with_requirement("name", "(tender|love)"),
            RouteDef::new("/files/*path(.:format)"),
            RouteDef::new("/a|/b"),
        ]
    };

    let partitioned = router(defs());
    let scanning = router(defs()).with_bulk_builder(|routes| Box::new(LinearScan::build(routes)));

    for path in ["/users/1", "/page/love", "/files/a/b.json", "/a", "/b", "/nope"] {
        let mut req_a = MockRequest::new("GET", path);
        let mut req_b = MockRequest::new("GET", path);
        let a: Vec<String> = partitioned
            .find_routes(&mut req_a)
            .iter()
            .map(|m| m.route.pattern().to_string())
            .collect();
        let b: Vec<String> = scanning
            .find_routes(&mut req_b)
            .iter()
            .map(|m| m.route.pattern().to_string())
            .collect();
        assert_eq!(a, b, "strategies disagree on {path}");
    }
}
