//! Arena-backed node model for compiled route patterns.
//!
//! A parsed pattern is a tree of [`Node`] values stored in a [`NodeArena`];
//! children are referenced by [`NodeId`] index rather than owned pointers, so
//! a route can hold a non-owning back-reference (`memo`) on its terminal
//! nodes without creating cycles.
//!
//! The node set is a closed sum type, and every consumer (the analyzer, the
//! regex builder, the string renderer) is one exhaustive `match` over it.

use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

/// Default constraint for a named parameter: one or more characters that are
/// not `.`, `/` or `?`.
///
/// This is a *sentinel*: "still default" is decided by `Arc::ptr_eq` against
/// this exact instance, never by comparing pattern text. A requirement that
/// happens to spell the same regex is still treated as custom.
pub static DEFAULT_EXP: Lazy<Arc<Regex>> = Lazy::new(|| {
    Arc::new(Regex::new(r"[^./?]+").expect("default parameter constraint is a valid regex"))
});

/// Non-greedy default for wildcard segments, registered when the route keeps
/// its optional trailing format segment. Lazy so `*path(.:format)` leaves
/// `.json` to the format group instead of swallowing it.
pub static WILDCARD_EXP: Lazy<Arc<Regex>> =
    Lazy::new(|| Arc::new(Regex::new(r".+?").expect("wildcard constraint is a valid regex")));

/// Greedy fallback for wildcard segments on format-less routes.
pub static GLOB_EXP: Lazy<Arc<Regex>> =
    Lazy::new(|| Arc::new(Regex::new(r".+").expect("glob constraint is a valid regex")));

/// Index of a node inside its owning [`NodeArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) usize);

/// One node of a compiled pattern tree.
///
/// `Literal`, `Slash`, `Dot` and `Symbol` are the terminal kinds; only they
/// can carry a `memo` (the index of the owning route). `Star`, `Cat`, `Group`
/// and `Or` delegate terminal status to their descendants. `Dummy` is an
/// internal placeholder literal used while building trees; it reports
/// `is_literal() == false` so the custom-route rewrite never fires on it.
#[derive(Debug, Clone)]
pub enum Node {
    /// Literal pattern text, e.g. `about` in `/about`.
    Literal {
        text: String,
        memo: Option<usize>,
    },
    /// A `/` separator.
    Slash {
        memo: Option<usize>,
    },
    /// A `.` separator, usually introducing the format segment.
    Dot {
        memo: Option<usize>,
    },
    /// A named parameter, e.g. `:id`. Carries its matching constraint.
    Symbol {
        /// Raw source text including the sigil, e.g. `:id` or `*path`.
        raw: String,
        /// Name with `:`/`*` sigils stripped.
        name: String,
        /// Current matching constraint. Defaults to [`DEFAULT_EXP`] (checked
        /// by identity, see [`Node::has_default_constraint`]).
        constraint: Arc<Regex>,
        memo: Option<usize>,
    },
    /// A catch-all segment `*name`; its child is always a `Symbol`.
    Star {
        child: NodeId,
    },
    /// Concatenation of two subtrees, right-nested by the parser.
    Cat {
        left: NodeId,
        right: NodeId,
    },
    /// An optional pattern segment, written in parentheses.
    Group {
        child: NodeId,
    },
    /// Alternation between children, written with `|`.
    Or {
        children: Vec<NodeId>,
    },
    /// Placeholder literal used during tree construction (empty patterns).
    Dummy,
}

impl Node {
    pub fn is_symbol(&self) -> bool {
        matches!(self, Node::Symbol { .. })
    }

    /// True for literal text nodes. `Dummy` is excluded even though it is a
    /// placeholder literal, so adjacency rewrites skip it.
    pub fn is_literal(&self) -> bool {
        matches!(self, Node::Literal { .. })
    }

    /// Terminal nodes are the kinds that can anchor a route back-reference.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Node::Literal { .. } | Node::Slash { .. } | Node::Dot { .. } | Node::Symbol { .. }
        )
    }

    pub fn is_star(&self) -> bool {
        matches!(self, Node::Star { .. })
    }

    pub fn is_cat(&self) -> bool {
        matches!(self, Node::Cat { .. })
    }

    pub fn is_group(&self) -> bool {
        matches!(self, Node::Group { .. })
    }

    /// The route back-reference, if this is a terminal node that has one.
    pub fn memo(&self) -> Option<usize> {
        match self {
            Node::Literal { memo, .. }
            | Node::Slash { memo }
            | Node::Dot { memo }
            | Node::Symbol { memo, .. } => *memo,
            _ => None,
        }
    }

    /// Whether this symbol still carries the shared default constraint.
    ///
    /// Identity check against the [`DEFAULT_EXP`] sentinel; a value-equal
    /// regex installed through a requirement does not count as default.
    pub fn has_default_constraint(&self) -> bool {
        match self {
            Node::Symbol { constraint, .. } => Arc::ptr_eq(constraint, &DEFAULT_EXP),
            _ => false,
        }
    }
}

/// Flat storage for one pattern tree.
///
/// The arena owns every node of a single parsed pattern; the root id is kept
/// by the surrounding [`Ast`](crate::route::pattern::Ast).
#[derive(Debug, Clone, Default)]
pub struct NodeArena {
    nodes: Vec<Node>,
}

impl NodeArena {
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    /// Adds a node and returns its id.
    pub fn push(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    pub fn get(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn get_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The parameter name at `id`, with sigils stripped.
    ///
    /// `Star` delegates to its child symbol; separator and composite nodes
    /// have no name.
    pub fn name_of(&self, id: NodeId) -> Option<&str> {
        match self.get(id) {
            Node::Symbol { name, .. } => Some(name),
            Node::Literal { text, .. } => Some(text.trim_matches(|c| c == '*' || c == ':')),
            Node::Star { child } => self.name_of(*child),
            _ => None,
        }
    }

    /// The symbol node wrapped by a star, if the tree is well formed.
    pub(crate) fn star_symbol(&self, star: NodeId) -> Option<NodeId> {
        match self.get(star) {
            Node::Star { child } if self.get(*child).is_symbol() => Some(*child),
            Node::Star { .. } => {
                debug_assert!(false, "star node must wrap a symbol");
                None
            }
            _ => None,
        }
    }

    /// Attaches a route back-reference to a terminal node.
    ///
    /// Calling this on a non-terminal is a tree-shape defect.
    pub(crate) fn set_memo(&mut self, id: NodeId, route_index: usize) {
        match self.get_mut(id) {
            Node::Literal { memo, .. }
            | Node::Slash { memo }
            | Node::Dot { memo }
            | Node::Symbol { memo, .. } => *memo = Some(route_index),
            other => {
                debug_assert!(false, "memo attached to non-terminal node {other:?}");
            }
        }
    }

    /// Replaces the constraint of a symbol node.
    pub(crate) fn set_constraint(&mut self, id: NodeId, regex: Arc<Regex>) {
        match self.get_mut(id) {
            Node::Symbol { constraint, .. } => *constraint = regex,
            other => {
                debug_assert!(false, "constraint set on non-symbol node {other:?}");
            }
        }
    }

    /// Depth-first preorder traversal starting at `root`.
    ///
    /// Yields a node before its children, left before right, and alternation
    /// children in declaration order. The iterator is a plain value over an
    /// explicit stack, so the walk is deterministic and restartable.
    pub fn iter_from(&self, root: NodeId) -> DepthFirst<'_> {
        DepthFirst {
            arena: self,
            stack: vec![root],
        }
    }

    /// Renders the subtree at `id` back to pattern source text.
    pub fn render(&self, id: NodeId, out: &mut String) {
        match self.get(id) {
            Node::Literal { text, .. } => out.push_str(text),
            Node::Slash { .. } => out.push('/'),
            Node::Dot { .. } => out.push('.'),
            Node::Symbol { raw, .. } => out.push_str(raw),
            Node::Star { child } => self.render(*child, out),
            Node::Cat { left, right } => {
                self.render(*left, out);
                self.render(*right, out);
            }
            Node::Group { child } => {
                out.push('(');
                self.render(*child, out);
                out.push(')');
            }
            Node::Or { children } => {
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        out.push('|');
                    }
                    self.render(*child, out);
                }
            }
            Node::Dummy => {}
        }
    }
}

/// Restartable preorder iterator over a pattern tree. See
/// [`NodeArena::iter_from`].
pub struct DepthFirst<'a> {
    arena: &'a NodeArena,
    stack: Vec<NodeId>,
}

impl Iterator for DepthFirst<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        match self.arena.get(id) {
            Node::Star { child } | Node::Group { child } => self.stack.push(*child),
            Node::Cat { left, right } => {
                // Pushed right-first so the left child pops first.
                self.stack.push(*right);
                self.stack.push(*left);
            }
            Node::Or { children } => {
                for child in children.iter().rev() {
                    self.stack.push(*child);
                }
            }
            _ => {}
        }
        Some(id)
    }
}

/// Display adapter rendering a subtree as pattern source.
pub struct NodeDisplay<'a> {
    pub(crate) arena: &'a NodeArena,
    pub(crate) root: NodeId,
}

impl fmt::Display for NodeDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        self.arena.render(self.root, &mut out);
        f.write_str(&out)
    }
}
