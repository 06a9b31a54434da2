//! Parser for route pattern text.
//!
//! Turns declarative patterns like `/page/:name(/:value)(.:format)` or
//! `/files/*path` into an arena-backed node tree. Concatenation is
//! right-nested (`a/b/c` parses as `Cat(a, Cat(b, c))`), which is the shape
//! the custom-route rewrite in [`crate::route::pattern`] expects.
//!
//! Grammar:
//!
//! ```text
//! expressions := cat ('|' cat)*          alternation, flattened into Or
//! cat         := expression [cat]        right-nested Cat
//! expression  := terminal | group | star
//! group       := '(' expressions ')'     optional segment
//! terminal    := '/' | '.' | literal | ':'name
//! star        := '*'name                 catch-all, wraps a Symbol
//! ```

use crate::error::RouterError;
use crate::nodes::{Node, NodeArena, NodeId, DEFAULT_EXP};

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Slash,
    Dot,
    LParen,
    RParen,
    Or,
    Symbol(String),
    Star(String),
    Literal(String),
}

/// Parses pattern text into a node tree.
///
/// Returns the arena plus the root id. An empty pattern parses to a single
/// [`Node::Dummy`] placeholder root.
pub fn parse(pattern: &str) -> Result<(NodeArena, NodeId), RouterError> {
    let tokens = scan(pattern)?;
    let mut parser = Parser {
        pattern,
        tokens,
        pos: 0,
        arena: NodeArena::new(),
    };

    if parser.tokens.is_empty() {
        let root = parser.arena.push(Node::Dummy);
        return Ok((parser.arena, root));
    }

    let root = parser.expressions()?;
    if parser.pos < parser.tokens.len() {
        return Err(parser.error("unexpected `)`"));
    }
    Ok((parser.arena, root))
}

fn scan(pattern: &str) -> Result<Vec<Token>, RouterError> {
    let mut tokens = Vec::new();
    let mut chars = pattern.char_indices().peekable();

    while let Some((start, c)) = chars.next() {
        match c {
            '/' => tokens.push(Token::Slash),
            '.' => tokens.push(Token::Dot),
            '(' => tokens.push(Token::LParen),
            ')' => tokens.push(Token::RParen),
            '|' => tokens.push(Token::Or),
            ':' | '*' => {
                let mut end = start + c.len_utf8();
                while let Some(&(i, w)) = chars.peek() {
                    if w.is_alphanumeric() || w == '_' {
                        end = i + w.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                let raw = &pattern[start..end];
                if raw.len() == c.len_utf8() {
                    return Err(RouterError::Parse {
                        pattern: pattern.to_string(),
                        message: format!("`{c}` must be followed by a parameter name"),
                    });
                }
                if c == ':' {
                    tokens.push(Token::Symbol(raw.to_string()));
                } else {
                    tokens.push(Token::Star(raw.to_string()));
                }
            }
            _ => {
                let mut end = start + c.len_utf8();
                while let Some(&(i, w)) = chars.peek() {
                    if matches!(w, '/' | '.' | '(' | ')' | '|' | ':' | '*') {
                        break;
                    }
                    end = i + w.len_utf8();
                    chars.next();
                }
                tokens.push(Token::Literal(pattern[start..end].to_string()));
            }
        }
    }
    Ok(tokens)
}

struct Parser<'a> {
    pattern: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    arena: NodeArena,
}

impl Parser<'_> {
    fn error(&self, message: impl Into<String>) -> RouterError {
        RouterError::Parse {
            pattern: self.pattern.to_string(),
            message: message.into(),
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn bump(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// True when the next token can begin an expression.
    fn at_expression(&self) -> bool {
        !matches!(self.peek(), None | Some(Token::RParen) | Some(Token::Or))
    }

    fn expressions(&mut self) -> Result<NodeId, RouterError> {
        let first = self.cat()?;
        if self.peek() != Some(&Token::Or) {
            return Ok(first);
        }

        let mut children = vec![first];
        while self.eat(&Token::Or) {
            if !self.at_expression() {
                return Err(self.error("alternation branch is empty"));
            }
            children.push(self.cat()?);
        }
        Ok(self.arena.push(Node::Or { children }))
    }

    fn cat(&mut self) -> Result<NodeId, RouterError> {
        let left = self.expression()?;
        if !self.at_expression() {
            return Ok(left);
        }
        let right = self.cat()?;
        Ok(self.arena.push(Node::Cat { left, right }))
    }

    fn expression(&mut self) -> Result<NodeId, RouterError> {
        match self.bump() {
            Some(Token::Slash) => Ok(self.arena.push(Node::Slash { memo: None })),
            Some(Token::Dot) => Ok(self.arena.push(Node::Dot { memo: None })),
            Some(Token::Literal(text)) => Ok(self.arena.push(Node::Literal { text, memo: None })),
            Some(Token::Symbol(raw)) => Ok(self.symbol(raw)),
            Some(Token::Star(raw)) => {
                let child = self.symbol(raw);
                Ok(self.arena.push(Node::Star { child }))
            }
            Some(Token::LParen) => {
                if self.peek() == Some(&Token::RParen) {
                    return Err(self.error("group is empty"));
                }
                let child = self.expressions()?;
                if !self.eat(&Token::RParen) {
                    return Err(self.error("unbalanced `(`"));
                }
                Ok(self.arena.push(Node::Group { child }))
            }
            Some(Token::RParen) => Err(self.error("unexpected `)`")),
            Some(Token::Or) => Err(self.error("alternation branch is empty")),
            None => Err(self.error("pattern ended unexpectedly")),
        }
    }

    fn symbol(&mut self, raw: String) -> NodeId {
        let name = raw.trim_matches(|c| c == '*' || c == ':').to_string();
        self.arena.push(Node::Symbol {
            raw,
            name,
            constraint: DEFAULT_EXP.clone(),
            memo: None,
        })
    }
}
