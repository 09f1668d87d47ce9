//! Operator and bracket descriptors, and the injectable tables the tokenizer matches against.
//!
//! The tokenizer owns no operator knowledge of its own: every glyph it recognizes comes from an
//! [`OperatorDictionary`] and a [`BracketTable`] supplied at construction. Runs of operator
//! characters are split by greedy longest-match against the dictionary ([`OperatorDictionary::
//! chunkify`]), so multi-character operators never need dedicated scanner states.

use crate::error::{kind, Error};
use crate::tokenizer::token::Token;
use std::collections::{HashMap, HashSet};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The associativity of a binary or unary operation.
///
/// For binary operations, [`Left`](Associativity::Left) means `a op b op c` is evaluated as
/// `(a op b) op c`, while [`Right`](Associativity::Right) means `a op (b op c)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Associativity {
    Left,
    Right,
}

/// The kernel operation an operator token dispatches to when the operator tree is evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum OpAction {
    Add,
    Subtract,
    Multiply,
    Divide,
    Pow,

    /// Argument separator; never reaches the kernel.
    Comma,

    /// Postfix factorial, dispatched through the function registry.
    Factorial,
}

/// Describes a single operator glyph: how tightly it binds, which way it associates, whether it
/// may appear in prefix or postfix position, and which kernel operation it dispatches to.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OperatorDescriptor {
    /// Binding strength; higher binds tighter.
    pub precedence: u8,

    /// The associativity of the operator in binary position.
    pub associativity: Associativity,

    /// Whether the operator may appear before its operand (`-x`, `+x`).
    pub prefix: bool,

    /// Whether the operator may appear after its operand (`x!`).
    pub postfix: bool,

    /// The kernel operation to dispatch to.
    pub action: OpAction,
}

/// An injected map from operator glyph (one or more characters) to its descriptor.
#[derive(Debug, Clone)]
pub struct OperatorDictionary {
    ops: HashMap<String, OperatorDescriptor>,

    /// Every character that appears in any registered glyph. Used by the scanner to decide where
    /// an operator run starts and ends.
    chars: HashSet<char>,

    /// Length of the longest registered glyph.
    max_len: usize,
}

impl OperatorDictionary {
    /// Creates an empty dictionary.
    pub fn new() -> Self {
        Self { ops: HashMap::new(), chars: HashSet::new(), max_len: 0 }
    }

    /// Registers an operator glyph.
    pub fn insert(&mut self, glyph: impl Into<String>, descriptor: OperatorDescriptor) {
        let glyph = glyph.into();
        self.chars.extend(glyph.chars());
        self.max_len = self.max_len.max(glyph.chars().count());
        self.ops.insert(glyph, descriptor);
    }

    /// Looks up the descriptor for a glyph.
    pub fn get(&self, glyph: &str) -> Option<&OperatorDescriptor> {
        self.ops.get(glyph)
    }

    /// Returns true if the character appears in any registered glyph.
    pub fn is_operator_char(&self, c: char) -> bool {
        self.chars.contains(&c)
    }

    /// Splits a run of operator characters into known operators by greedy longest-match,
    /// emitting one token per match. `offset` is the position of the run in the source, used for
    /// token spans.
    ///
    /// A run that cannot be fully consumed by known glyphs is an error citing the column of the
    /// first unmatched character: `a++b` with no `++` operator splits into `+`, `+`, but `a@b`
    /// with no `@` operator fails.
    pub fn chunkify(&self, run: &str, offset: usize) -> Result<Vec<Token>, Error> {
        let chars: Vec<char> = run.chars().collect();
        let mut tokens = Vec::new();
        let mut start = 0;

        while start < chars.len() {
            let longest = self.max_len.min(chars.len() - start);
            let matched = (1..=longest).rev().find_map(|len| {
                let glyph: String = chars[start..start + len].iter().collect();
                self.ops.get(&glyph).cloned().map(|descriptor| (glyph, len, descriptor))
            });

            match matched {
                Some((glyph, len, descriptor)) => {
                    let span = offset + start..offset + start + len;
                    tokens.push(Token::operator(glyph, span, descriptor));
                    start += len;
                },
                None => {
                    let span = offset + start..offset + start + 1;
                    return Err(Error::new(
                        vec![span],
                        kind::UnknownOperator { glyph: chars[start].to_string() },
                    ));
                },
            }
        }

        Ok(tokens)
    }
}

impl Default for OperatorDictionary {
    /// The standard infix dictionary: `+`, `-`, `*`, `/`, `^`, `!` and the argument separator.
    fn default() -> Self {
        let mut dict = Self::new();
        dict.insert(",", OperatorDescriptor {
            precedence: 1,
            associativity: Associativity::Left,
            prefix: false,
            postfix: false,
            action: OpAction::Comma,
        });
        dict.insert("+", OperatorDescriptor {
            precedence: 3,
            associativity: Associativity::Left,
            prefix: true,
            postfix: false,
            action: OpAction::Add,
        });
        dict.insert("-", OperatorDescriptor {
            precedence: 3,
            associativity: Associativity::Left,
            prefix: true,
            postfix: false,
            action: OpAction::Subtract,
        });
        dict.insert("*", OperatorDescriptor {
            precedence: 4,
            associativity: Associativity::Left,
            prefix: false,
            postfix: false,
            action: OpAction::Multiply,
        });
        dict.insert("/", OperatorDescriptor {
            precedence: 4,
            associativity: Associativity::Left,
            prefix: false,
            postfix: false,
            action: OpAction::Divide,
        });
        dict.insert("^", OperatorDescriptor {
            precedence: 6,
            associativity: Associativity::Right,
            prefix: false,
            postfix: false,
            action: OpAction::Pow,
        });
        dict.insert("!", OperatorDescriptor {
            precedence: 7,
            associativity: Associativity::Left,
            prefix: false,
            postfix: true,
            action: OpAction::Factorial,
        });
        dict
    }
}

/// The binding strength of a prefix operator (`-x`, `+x`). Sits between the factor operators and
/// exponentiation, so `-x^2` reads as `-(x^2)` while `-x*y` reads as `(-x)*y`.
pub const PREFIX_PRECEDENCE: u8 = 5;

/// Describes one bracket glyph. Openers and closers pair up by the `(opener.id == closer.id - 1)`
/// convention, so each bracket family occupies two consecutive ids.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Bracket {
    /// The id used for open/close pairing.
    pub id: u8,

    /// Whether this glyph opens a scope. Otherwise, it closes one.
    pub open: bool,

    /// The function this bracket family maps to, if any. A scope opened by a mapping bracket is
    /// evaluated as a call to that function with the scope contents as arguments.
    pub maps_to: Option<String>,
}

/// An injected map from bracket glyph to its descriptor.
#[derive(Debug, Clone)]
pub struct BracketTable {
    map: HashMap<char, Bracket>,
}

impl BracketTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self { map: HashMap::new() }
    }

    /// Registers a bracket pair, assigning consecutive ids to the opener and closer.
    pub fn insert_pair(&mut self, open: char, close: char, id: u8, maps_to: Option<&str>) {
        self.map.insert(open, Bracket {
            id,
            open: true,
            maps_to: maps_to.map(str::to_string),
        });
        self.map.insert(close, Bracket {
            id: id + 1,
            open: false,
            maps_to: None,
        });
    }

    /// Looks up the descriptor for a bracket character.
    pub fn get(&self, c: char) -> Option<&Bracket> {
        self.map.get(&c)
    }

    /// Returns true if the character is a registered bracket.
    pub fn is_bracket(&self, c: char) -> bool {
        self.map.contains_key(&c)
    }

    /// Returns true if the opener and closer ids pair up.
    pub fn matches(opener: &Bracket, closer: &Bracket) -> bool {
        opener.open && !closer.open && opener.id == closer.id - 1
    }
}

impl Default for BracketTable {
    /// Parentheses (transparent) and square brackets (mapping to the `vector` constructor).
    fn default() -> Self {
        let mut table = Self::new();
        table.insert_pair('(', ')', 1, None);
        table.insert_pair('[', ']', 3, Some("vector"));
        table
    }
}

/// Names the tokenizer should treat as units rather than variables, such as `deg`.
#[derive(Debug, Clone, Default)]
pub struct UnitTable {
    units: HashSet<String>,
}

impl UnitTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a unit name.
    pub fn insert(&mut self, name: impl Into<String>) {
        self.units.insert(name.into());
    }

    /// Returns true if the name is a registered unit.
    pub fn is_unit(&self, name: &str) -> bool {
        self.units.contains(name)
    }
}

/// Answers whether an identifier names a callable function. The tokenizer consults this to
/// disambiguate `x(y)` (implicit multiplication) from `f(y)` (function application) and to decide
/// whether a space opens an argument scope (`sin x`).
pub trait FunctionOracle {
    /// Returns true if the name is a known function.
    fn is_function(&self, name: &str) -> bool;
}

/// An oracle backed by a plain set of names. Useful for tests and for callers that do not carry
/// a full function registry.
#[derive(Debug, Clone, Default)]
pub struct FunctionSet {
    names: HashSet<String>,
}

impl FunctionSet {
    /// Creates an oracle from a list of function names.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { names: names.into_iter().map(Into::into).collect() }
    }

    /// Registers a function name.
    pub fn insert(&mut self, name: impl Into<String>) {
        self.names.insert(name.into());
    }
}

impl FunctionOracle for FunctionSet {
    fn is_function(&self, name: &str) -> bool {
        self.names.contains(name)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use super::*;

    #[test]
    fn chunkify_longest_match() {
        let mut dict = OperatorDictionary::default();
        dict.insert("++", OperatorDescriptor {
            precedence: 7,
            associativity: Associativity::Left,
            prefix: false,
            postfix: true,
            action: OpAction::Factorial,
        });

        let tokens = dict.chunkify("++", 4).unwrap();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].value, "++");
        assert_eq!(tokens[0].span, 4..6);
    }

    #[test]
    fn chunkify_splits_unknown_run() {
        let dict = OperatorDictionary::default();
        let tokens = dict.chunkify("++", 0).unwrap();
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].value, "+");
        assert_eq!(tokens[1].value, "+");
        assert_eq!(tokens[1].span, 1..2);
    }

    #[test]
    fn chunkify_rejects_unregistered_glyph() {
        let dict = OperatorDictionary::default();
        let err = dict.chunkify("@", 2).unwrap_err();
        assert_eq!(err.spans, vec![2..3]);
    }

    #[test]
    fn bracket_pairing() {
        let table = BracketTable::default();
        let open = table.get('(').unwrap();
        let close = table.get(')').unwrap();
        let square_close = table.get(']').unwrap();

        assert!(BracketTable::matches(open, close));
        assert!(!BracketTable::matches(open, square_close));
    }
}
