//! Semantic analysis and compilation of parsed patterns.
//!
//! [`Ast`] wraps one parsed node tree and derives everything the matcher
//! needs: parameter names in declaration order, wildcard defaults, terminal
//! nodes for route back-references, and the custom-route rewrite for symbols
//! adjacent to literals. [`Pattern`] then freezes an analyzed tree into a
//! single compiled regex plus the capture-offset table used to map regex
//! groups back to parameter positions.
//!
//! Construction and requirement injection are a one-time write phase during
//! route registration; once a [`Pattern`] is built it is read-only and safe
//! to share across request threads.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use regex::Regex;

use crate::error::RouterError;
use crate::nodes::{Node, NodeArena, NodeId, GLOB_EXP, WILDCARD_EXP};

/// An analyzed pattern tree.
///
/// Built once per route declaration; `add_requirements` may replace symbol
/// constraints until the tree is frozen into a [`Pattern`].
#[derive(Debug, Clone)]
pub struct Ast {
    arena: NodeArena,
    root: NodeId,
    names: Vec<String>,
    symbols: Vec<NodeId>,
    stars: Vec<NodeId>,
    terminals: Vec<NodeId>,
    wildcard_options: HashMap<String, Arc<Regex>>,
}

impl Ast {
    /// Analyzes a parsed tree in a single traversal.
    ///
    /// Collects symbols (declaration order), stars, and terminal nodes;
    /// registers the non-greedy wildcard default for every star when
    /// `formatted` is true; and runs the custom-route rewrite on every
    /// concatenation node.
    pub fn new(arena: NodeArena, root: NodeId, formatted: bool) -> Result<Self, RouterError> {
        let mut ast = Ast {
            arena,
            root,
            names: Vec::new(),
            symbols: Vec::new(),
            stars: Vec::new(),
            terminals: Vec::new(),
            wildcard_options: HashMap::new(),
        };

        let order: Vec<NodeId> = ast.arena.iter_from(root).collect();
        for id in order {
            match ast.arena.get(id) {
                Node::Symbol { name, .. } => {
                    ast.names.push(name.clone());
                    ast.symbols.push(id);
                }
                Node::Star { .. } => {
                    ast.stars.push(id);
                    if formatted {
                        if let Some(name) = ast.arena.name_of(id) {
                            ast.wildcard_options
                                .entry(name.to_string())
                                .or_insert_with(|| WILDCARD_EXP.clone());
                        }
                    }
                }
                Node::Cat { .. } => ast.rewrite_custom_route(id)?,
                _ => {}
            }

            if ast.arena.get(id).is_terminal() {
                ast.terminals.push(id);
            }
        }

        Ok(ast)
    }

    /// Replaces symbol constraints from a requirements map.
    ///
    /// Symbols whose name appears in the map take the supplied regex; others
    /// keep their current constraint. Star parameters resolve to the
    /// requirement, else the registered wildcard default, else a greedy
    /// catch-all. Applying the same map twice yields the same constraints.
    pub fn add_requirements(&mut self, requirements: &HashMap<String, Arc<Regex>>) {
        for &id in &self.symbols {
            let Some(name) = self.arena.name_of(id).map(str::to_string) else {
                continue;
            };
            if let Some(re) = requirements.get(&name) {
                self.arena.set_constraint(id, re.clone());
            }
        }

        for &star in &self.stars {
            let Some(inner) = self.arena.star_symbol(star) else {
                continue;
            };
            let Some(name) = self.arena.name_of(inner).map(str::to_string) else {
                continue;
            };
            let constraint = requirements
                .get(&name)
                .or_else(|| self.wildcard_options.get(&name))
                .cloned()
                .unwrap_or_else(|| GLOB_EXP.clone());
            self.arena.set_constraint(inner, constraint);
        }
    }

    /// Attaches `route_index` as the memo on every terminal node.
    pub fn add_route(&mut self, route_index: usize) {
        for &id in &self.terminals {
            self.arena.set_memo(id, route_index);
        }
    }

    /// The route back-reference carried by this tree's terminals, if any.
    pub fn memo(&self) -> Option<usize> {
        self.terminals
            .first()
            .and_then(|&id| self.arena.get(id).memo())
    }

    /// Cumulative capture-group offsets per parameter.
    ///
    /// Entry `i` is how many extra capture groups the requirements of
    /// parameters `0..i` introduce, so parameter `i` lives in regex group
    /// `1 + i + offsets[i]`. A requirement's own group count comes straight
    /// from its compiled form. Always starts at 0 and has one more entry
    /// than there are parameters.
    pub fn offsets(&self, requirements: &HashMap<String, Arc<Regex>>) -> Vec<usize> {
        let mut offsets = vec![0];
        for name in &self.names {
            let previous = *offsets.last().unwrap_or(&0);
            let nested = requirements
                .get(name)
                .map(|re| re.captures_len() - 1)
                .unwrap_or(0);
            offsets.push(previous + nested);
        }
        offsets
    }

    /// True iff every symbol still holds the shared default constraint.
    ///
    /// Recomputed from node state on each call, since constraints may be
    /// injected after construction.
    pub fn all_default_regexp(&self) -> bool {
        self.symbols
            .iter()
            .all(|&id| self.arena.get(id).has_default_constraint())
    }

    /// True iff the pattern contains at least one wildcard segment.
    pub fn has_glob(&self) -> bool {
        !self.stars.is_empty()
    }

    /// Parameter names in declaration (traversal) order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Non-greedy defaults registered for wildcard parameters.
    pub fn wildcard_options(&self) -> &HashMap<String, Arc<Regex>> {
        &self.wildcard_options
    }

    pub fn arena(&self) -> &NodeArena {
        &self.arena
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Rewrites the constraint of a symbol directly adjacent to a literal.
    ///
    /// A pattern like `/:id-suffix` is ambiguous for prefix-partitioned bulk
    /// matching, so the symbol's constraint becomes one-or-more repetitions
    /// of (existing constraint | `-`). That keeps the adjacency character
    /// matchable while marking the route as custom. Fires only for the four
    /// adjacency shapes; no-op otherwise.
    fn rewrite_custom_route(&mut self, cat: NodeId) -> Result<(), RouterError> {
        let (left, right) = match self.arena.get(cat) {
            Node::Cat { left, right } => (*left, *right),
            _ => return Ok(()),
        };

        let first_of = |arena: &NodeArena, id: NodeId| -> Option<NodeId> {
            match arena.get(id) {
                Node::Cat { left, .. } => Some(*left),
                _ => None,
            }
        };

        let symbol = if self.arena.get(left).is_literal() && self.arena.get(right).is_symbol() {
            Some(right)
        } else if self.arena.get(left).is_literal()
            && first_of(&self.arena, right)
                .map(|id| self.arena.get(id).is_symbol())
                .unwrap_or(false)
        {
            first_of(&self.arena, right)
        } else if self.arena.get(left).is_symbol() && self.arena.get(right).is_literal() {
            Some(left)
        } else if self.arena.get(left).is_symbol()
            && first_of(&self.arena, right)
                .map(|id| self.arena.get(id).is_literal())
                .unwrap_or(false)
        {
            Some(left)
        } else {
            None
        };

        if let Some(id) = symbol {
            let Node::Symbol { constraint, .. } = self.arena.get(id) else {
                debug_assert!(false, "adjacency rewrite targeted a non-symbol");
                return Ok(());
            };
            let source = format!("(?:(?:{})|-)+", constraint.as_str());
            let rewritten = Regex::new(&source).map_err(|e| RouterError::Compile {
                pattern: self.to_string(),
                source: e,
            })?;
            self.arena.set_constraint(id, Arc::new(rewritten));
        }
        Ok(())
    }
}

impl fmt::Display for Ast {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        self.arena.render(self.root, &mut out);
        f.write_str(&out)
    }
}

/// A frozen, compiled route pattern.
///
/// Owns the analyzed [`Ast`], the composed [`Regex`] (anchored with `\A…\z`,
/// or `\A…` for prefix-mount patterns), the injected requirements, and the
/// capture-offset table.
#[derive(Debug, Clone)]
pub struct Pattern {
    ast: Ast,
    anchored: bool,
    regex: Regex,
    offsets: Vec<usize>,
    requirements: HashMap<String, Arc<Regex>>,
}

/// Raw result of matching a pattern against a path.
///
/// Parameter values are the captured spans as-is; percent-decoding happens
/// in the router when building the final match list.
#[derive(Debug, Clone)]
pub struct PathMatch {
    /// The span of the path the pattern consumed.
    pub matched: String,
    /// The remainder after the consumed span (empty for anchored patterns).
    pub post_match: String,
    /// Captured parameter values keyed by name; unmatched optional groups
    /// are omitted, not inserted as empty strings.
    pub params: HashMap<String, String>,
}

impl Pattern {
    /// Freezes an analyzed tree into a compiled pattern.
    ///
    /// `requirements` must already have been applied to the tree via
    /// [`Ast::add_requirements`]; they are kept here for the offset table.
    pub fn new(
        ast: Ast,
        requirements: HashMap<String, Arc<Regex>>,
        anchored: bool,
    ) -> Result<Self, RouterError> {
        let mut source = String::new();
        regex_source(ast.arena(), ast.root(), &mut source);

        let composed = if anchored {
            format!(r"\A{source}\z")
        } else {
            format!(r"\A{source}")
        };
        let regex = Regex::new(&composed).map_err(|e| RouterError::Compile {
            pattern: ast.to_string(),
            source: e,
        })?;

        let offsets = ast.offsets(&requirements);
        Ok(Pattern {
            ast,
            anchored,
            regex,
            offsets,
            requirements,
        })
    }

    /// Whether a full (or, for unanchored patterns, prefix) match exists.
    pub fn is_match(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    /// Matches `path` and extracts captured parameters.
    ///
    /// Capture positions are translated through the offset table so a
    /// requirement's own nested groups never shift parameters.
    pub fn match_path(&self, path: &str) -> Option<PathMatch> {
        let captures = self.regex.captures(path)?;
        let full = captures.get(0)?;

        let mut params = HashMap::new();
        for (i, name) in self.ast.names().iter().enumerate() {
            let group = 1 + i + self.offsets[i];
            if let Some(m) = captures.get(group) {
                params.insert(name.clone(), m.as_str().to_string());
            }
        }

        Some(PathMatch {
            matched: full.as_str().to_string(),
            post_match: path[full.end()..].to_string(),
            params,
        })
    }

    pub fn anchored(&self) -> bool {
        self.anchored
    }

    pub fn ast(&self) -> &Ast {
        &self.ast
    }

    /// Parameter names in declaration order.
    pub fn names(&self) -> &[String] {
        self.ast.names()
    }

    pub fn requirements(&self) -> &HashMap<String, Arc<Regex>> {
        &self.requirements
    }

    /// The composed regex the pattern matches with.
    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    pub(crate) fn attach_route(&mut self, route_index: usize) {
        self.ast.add_route(route_index);
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.ast.fmt(f)
    }
}

/// Renders the subtree at `id` into regex source, one exhaustive match over
/// the node set.
fn regex_source(arena: &NodeArena, id: NodeId, out: &mut String) {
    match arena.get(id) {
        Node::Literal { text, .. } => out.push_str(&regex::escape(text)),
        Node::Slash { .. } => out.push('/'),
        Node::Dot { .. } => out.push_str(r"\."),
        Node::Symbol { constraint, .. } => {
            out.push('(');
            out.push_str(constraint.as_str());
            out.push(')');
        }
        // The star's capture group is emitted by its child symbol, whose
        // constraint was resolved during requirement injection.
        Node::Star { child } => regex_source(arena, *child, out),
        Node::Cat { left, right } => {
            regex_source(arena, *left, out);
            regex_source(arena, *right, out);
        }
        Node::Group { child } => {
            out.push_str("(?:");
            regex_source(arena, *child, out);
            out.push_str(")?");
        }
        Node::Or { children } => {
            out.push_str("(?:");
            for (i, child) in children.iter().enumerate() {
                if i > 0 {
                    out.push('|');
                }
                regex_source(arena, *child, out);
            }
            out.push(')');
        }
        Node::Dummy => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route::parser;

    fn ast_for(pattern: &str) -> Ast {
        let (arena, root) = parser::parse(pattern).unwrap();
        Ast::new(arena, root, true).unwrap()
    }

    fn requirements(entries: &[(&str, &str)]) -> HashMap<String, Arc<Regex>> {
        entries
            .iter()
            .map(|(name, src)| (name.to_string(), Arc::new(Regex::new(src).unwrap())))
            .collect()
    }

    #[test]
    fn test_requirements_set_symbol_constraints() {
        let mut ast = ast_for("/page/:name/:value");
        let reqs = requirements(&[("name", "(tender|love)"), ("value", ".")]);
        ast.add_requirements(&reqs);

        let symbols: Vec<_> = ast
            .arena()
            .iter_from(ast.root())
            .filter(|&id| ast.arena().get(id).is_symbol())
            .collect();
        assert_eq!(symbols.len(), 2);
        for id in symbols {
            let name = ast.arena().name_of(id).unwrap().to_string();
            let Node::Symbol { constraint, .. } = ast.arena().get(id) else {
                unreachable!();
            };
            assert!(Arc::ptr_eq(constraint, &reqs[&name]));
        }
    }

    #[test]
    fn test_unspecified_names_keep_default() {
        let mut ast = ast_for("/page/:name/:value");
        ast.add_requirements(&requirements(&[("name", "(tender|love)")]));
        assert!(!ast.all_default_regexp());

        let value = ast
            .arena()
            .iter_from(ast.root())
            .find(|&id| ast.arena().name_of(id) == Some("value") && ast.arena().get(id).is_symbol())
            .unwrap();
        assert!(ast.arena().get(value).has_default_constraint());
    }

    #[test]
    fn test_requirement_injection_is_idempotent() {
        let mut ast = ast_for("/page/:name");
        let reqs = requirements(&[("name", "(tender|love)")]);
        ast.add_requirements(&reqs);
        let first: Vec<String> = ast
            .symbols
            .iter()
            .map(|&id| match ast.arena().get(id) {
                Node::Symbol { constraint, .. } => constraint.as_str().to_string(),
                _ => unreachable!(),
            })
            .collect();
        ast.add_requirements(&reqs);
        let second: Vec<String> = ast
            .symbols
            .iter()
            .map(|&id| match ast.arena().get(id) {
                Node::Symbol { constraint, .. } => constraint.as_str().to_string(),
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_wildcard_gets_non_greedy_default_when_formatted() {
        let ast = ast_for("/files/*path");
        assert!(ast.has_glob());
        let option = ast.wildcard_options().get("path").unwrap();
        assert_eq!(option.as_str(), ".+?");
    }

    #[test]
    fn test_no_wildcard_default_without_format() {
        let (arena, root) = parser::parse("/files/*path").unwrap();
        let ast = Ast::new(arena, root, false).unwrap();
        assert!(ast.wildcard_options().is_empty());
    }

    #[test]
    fn test_custom_route_rewrite_unions_hyphen() {
        let ast = ast_for("/:id-suffix");
        let symbol = ast
            .arena()
            .iter_from(ast.root())
            .find(|&id| ast.arena().get(id).is_symbol())
            .unwrap();
        let Node::Symbol { constraint, .. } = ast.arena().get(symbol) else {
            unreachable!();
        };

        // Union includes the hyphen and requires at least one repetition.
        assert_eq!(constraint.as_str(), "(?:(?:[^./?]+)|-)+");
        assert!(!constraint.is_match(""));
        assert!(constraint.is_match("ab-cd"));
        assert_eq!(constraint.find("ab-cd").unwrap().as_str(), "ab-cd");

        // The rewrite replaces the sentinel, so the route partitions as custom.
        assert!(!ast.all_default_regexp());
    }

    #[test]
    fn test_rewrite_skips_non_adjacent_shapes() {
        // Slash-separated symbol and literal never touch.
        let ast = ast_for("/users/:id");
        assert!(ast.all_default_regexp());
    }

    #[test]
    fn test_offsets_count_nested_groups() {
        let ast = ast_for("/page/:name/:value");
        let reqs = requirements(&[("name", "(tender|love)")]);
        // `name` introduces one nested group; `value` has no requirement.
        assert_eq!(ast.offsets(&reqs), vec![0, 1, 1]);

        let none = ast.offsets(&HashMap::new());
        assert_eq!(none, vec![0, 0, 0]);
    }

    #[test]
    fn test_names_in_declaration_order() {
        let ast = ast_for("/page/:name(/:value)(.:format)");
        assert_eq!(ast.names(), &["name", "value", "format"]);
    }

    #[test]
    fn test_pattern_match_with_nested_requirement_groups() {
        let mut ast = ast_for("/page/:name/:value");
        let reqs = requirements(&[("name", "(tender|love)")]);
        ast.add_requirements(&reqs);
        let pattern = Pattern::new(ast, reqs, true).unwrap();

        let m = pattern.match_path("/page/tender/42").unwrap();
        assert_eq!(m.params["name"], "tender");
        assert_eq!(m.params["value"], "42");
        assert!(pattern.match_path("/page/other/42").is_none());
    }

    #[test]
    fn test_optional_group_omitted_not_empty() {
        let mut ast = ast_for("/page/:name(.:format)");
        ast.add_requirements(&HashMap::new());
        let pattern = Pattern::new(ast, HashMap::new(), true).unwrap();

        let m = pattern.match_path("/page/hello").unwrap();
        assert_eq!(m.params["name"], "hello");
        assert!(!m.params.contains_key("format"));

        let m = pattern.match_path("/page/hello.json").unwrap();
        assert_eq!(m.params["format"], "json");
    }

    #[test]
    fn test_wildcard_is_non_greedy_before_format() {
        let mut ast = ast_for("/files/*path(.:format)");
        ast.add_requirements(&HashMap::new());
        let pattern = Pattern::new(ast, HashMap::new(), true).unwrap();

        let m = pattern.match_path("/files/a/b.json").unwrap();
        assert_eq!(m.params["path"], "a/b");
        assert_eq!(m.params["format"], "json");
    }

    #[test]
    fn test_unanchored_pattern_exposes_post_match() {
        let mut ast = ast_for("/admin");
        ast.add_requirements(&HashMap::new());
        let pattern = Pattern::new(ast, HashMap::new(), false).unwrap();

        let m = pattern.match_path("/admin/users/1").unwrap();
        assert_eq!(m.matched, "/admin");
        assert_eq!(m.post_match, "/users/1");
    }

    #[test]
    fn test_glob_routes_are_custom_after_requirements() {
        let mut ast = ast_for("/files/*path");
        ast.add_requirements(&HashMap::new());
        assert!(!ast.all_default_regexp());
    }
}
