//! Tokens and nested scopes produced by the tokenizer.

use crate::tokenizer::op::OperatorDescriptor;
use std::ops::Range;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The different kinds of tokens that can be produced by the tokenizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TokenKind {
    /// An operator glyph, such as `+` or `^`.
    Operator,

    /// An identifier in a call position, such as `sin` in `sin(x)` or `sin x`.
    Function,

    /// A variable name or a numeric literal. The tokenizer does not distinguish the two; the
    /// evaluation driver does.
    Value,

    /// A name recognized by the injected unit table.
    Unit,
}

/// A token produced by the tokenizer.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Token {
    /// The kind of token.
    pub kind: TokenKind,

    /// The raw text of the token, as it appeared in the prepared source.
    pub value: String,

    /// The region of the prepared source that this token originated from.
    pub span: Range<usize>,

    /// The operator descriptor, for [`TokenKind::Operator`] tokens only.
    pub op: Option<OperatorDescriptor>,
}

impl Token {
    /// Creates a non-operator token.
    pub fn new(kind: TokenKind, value: impl Into<String>, span: Range<usize>) -> Self {
        Self { kind, value: value.into(), span, op: None }
    }

    /// Creates an operator token carrying its descriptor.
    pub fn operator(value: impl Into<String>, span: Range<usize>, op: OperatorDescriptor) -> Self {
        Self { kind: TokenKind::Operator, value: value.into(), span, op: Some(op) }
    }

    /// The 1-based source column this token starts at.
    pub fn column(&self) -> usize {
        self.span.start + 1
    }
}

/// What opened a scope.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ScopeKind {
    /// The outermost scope of the expression.
    Root,

    /// A scope opened by a bracket. If the bracket maps to a function (such as `[` mapping to a
    /// vector constructor), the function name is carried here.
    Bracket {
        /// The function this bracket family maps to, if any.
        maps_to: Option<String>,
    },

    /// An implicit argument scope opened by a space following a function name, closed by the
    /// next space or operator (`sin x + 1` reads as `sin(x) + 1`).
    Space,
}

/// An entry in a scope: either a single token or a nested scope.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ScopeItem {
    Token(Token),
    Scope(Scope),
}

/// An ordered sequence of tokens and nested scopes. The tokenizer produces a tree of scopes, not
/// a flat list; each bracket pair and each space-opened argument group becomes its own scope.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Scope {
    /// What opened this scope.
    pub kind: ScopeKind,

    /// The tokens and nested scopes, in source order.
    pub items: Vec<ScopeItem>,

    /// The position of the character that opened the scope (the bracket, or the start of the
    /// expression for the root scope).
    pub span: Range<usize>,
}

impl Scope {
    /// Creates an empty scope of the given kind.
    pub fn new(kind: ScopeKind, span: Range<usize>) -> Self {
        Self { kind, items: Vec::new(), span }
    }

    /// The 1-based source column this scope was opened at.
    pub fn column(&self) -> usize {
        self.span.start + 1
    }

    /// Pushes a token into the scope.
    pub fn push_token(&mut self, token: Token) {
        self.items.push(ScopeItem::Token(token));
    }

    /// Pushes a nested scope into the scope.
    pub fn push_scope(&mut self, scope: Scope) {
        self.items.push(ScopeItem::Scope(scope));
    }

    /// Returns the last item in the scope, if any.
    pub fn last(&self) -> Option<&ScopeItem> {
        self.items.last()
    }
}
