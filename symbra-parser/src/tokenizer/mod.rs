//! A hand-written scanner that turns a prepared expression string into a tree of scopes.
//!
//! The scanner makes one forward pass over the input, tracking the start of the pending
//! identifier, a stack of open scopes, and the space-opened argument scopes that let `sin x + 1`
//! read as `sin(x) + 1`. All operator and bracket knowledge is injected (see [`op`]); the scanner
//! itself only decides where tokens begin and end and which scope they belong to.

pub mod op;
pub mod prepare;
pub mod token;

use crate::error::{kind, Error};
use op::{BracketTable, Bracket, FunctionOracle, OpAction, OperatorDictionary, UnitTable};
use prepare::Preprocessors;
use token::{Scope, ScopeItem, ScopeKind, Token, TokenKind};

/// The tokenizer: preprocessing plus scanning, configured entirely through injection.
pub struct Tokenizer<'a> {
    ops: &'a OperatorDictionary,
    brackets: &'a BracketTable,
    units: &'a UnitTable,
    oracle: &'a dyn FunctionOracle,
    multichar_vars: bool,
    implied_mul: bool,
}

impl<'a> Tokenizer<'a> {
    /// Creates a tokenizer over the given tables.
    pub fn new(
        ops: &'a OperatorDictionary,
        brackets: &'a BracketTable,
        units: &'a UnitTable,
        oracle: &'a dyn FunctionOracle,
    ) -> Self {
        Self { ops, brackets, units, oracle, multichar_vars: true, implied_mul: true }
    }

    /// Sets whether unknown alphanumeric runs are kept as multi-character variables. When off,
    /// preparation splits them into single-letter products.
    pub fn multichar_vars(mut self, flag: bool) -> Self {
        self.multichar_vars = flag;
        self
    }

    /// Sets whether preparation inserts implicit multiplication.
    pub fn implied_mul(mut self, flag: bool) -> Self {
        self.implied_mul = flag;
        self
    }

    /// Prepares an expression for scanning: user hooks first, then whitespace normalization,
    /// scientific-notation expansion, and implicit-multiplication insertion iterated to a
    /// textual fixpoint. Repeated preparation of its own output is a no-op.
    pub fn prepare(&self, input: &str, hooks: &Preprocessors) -> String {
        let mut text = hooks.apply(input);
        text = prepare::collapse_whitespace(&text);
        text = prepare::strip_bracket_spaces(&text, self.brackets);
        text = prepare::expand_scientific(&text);

        if self.implied_mul {
            loop {
                let next = prepare::insert_implied_mul(
                    &text,
                    self.brackets,
                    self.oracle,
                    self.multichar_vars,
                );
                if next == text {
                    break;
                }
                text = next;
            }
        }

        text
    }

    /// Scans a prepared expression into a tree of scopes.
    pub fn tokenize(&self, input: &str) -> Result<Scope, Error> {
        Scanner::new(self, input).run()
    }
}

/// One scope under construction, along with the bracket that opened it (root and space scopes
/// have none).
struct Frame {
    scope: Scope,
    opener: Option<(Bracket, usize)>,
}

/// The scanner state for a single pass.
struct Scanner<'t, 'a> {
    tk: &'t Tokenizer<'a>,
    chars: Vec<char>,
    frames: Vec<Frame>,
}

impl<'t, 'a> Scanner<'t, 'a> {
    fn new(tk: &'t Tokenizer<'a>, input: &str) -> Self {
        let chars: Vec<char> = input.chars().collect();
        let root = Frame {
            scope: Scope::new(ScopeKind::Root, 0..chars.len()),
            opener: None,
        };
        Self { tk, chars, frames: vec![root] }
    }

    fn top(&mut self) -> &mut Scope {
        &mut self.frames.last_mut().expect("the root frame is never popped").scope
    }

    /// Classifies and pushes the pending text `[lpos, end)`, if any. Returns the kind pushed.
    fn flush(&mut self, lpos: usize, end: usize) -> Option<TokenKind> {
        if lpos >= end {
            return None;
        }

        let text: String = self.chars[lpos..end].iter().collect();
        let kind = if self.tk.oracle.is_function(&text) {
            TokenKind::Function
        } else if self.tk.units.is_unit(&text) {
            TokenKind::Unit
        } else {
            TokenKind::Value
        };

        self.top().push_token(Token::new(kind, text, lpos..end));
        Some(kind)
    }

    /// Emits an implied `*` at the given position, if the dictionary registers one and the
    /// current scope ends with something multipliable.
    fn implied_mul(&mut self, at: usize) {
        let multipliable = match self.top().last() {
            Some(ScopeItem::Token(t)) => matches!(t.kind, TokenKind::Value | TokenKind::Unit),
            Some(ScopeItem::Scope(_)) => true,
            None => false,
        };
        if !multipliable {
            return;
        }

        if let Some(descriptor) = self.tk.ops.get("*").cloned() {
            self.top().push_token(Token::operator("*", at..at, descriptor));
        }
    }

    /// Closes the innermost space scope, attaching it to its parent.
    fn close_space(&mut self) {
        debug_assert!(matches!(self.frames.last().map(|f| &f.scope.kind), Some(ScopeKind::Space)));
        let frame = self.frames.pop().expect("caller checked the top frame");
        self.top().push_scope(frame.scope);
    }

    fn close_all_spaces(&mut self) {
        while matches!(self.frames.last().map(|f| &f.scope.kind), Some(ScopeKind::Space)) {
            self.close_space();
        }
    }

    /// Closes space scopes that have accumulated an operand. A space scope whose last item is an
    /// operator (or that is still empty) stays open: the argument expression is not finished yet,
    /// as in `max x, y` or `sin -x`.
    fn close_finished_spaces(&mut self) {
        while let Some(frame) = self.frames.last() {
            if !matches!(frame.scope.kind, ScopeKind::Space) {
                break;
            }
            let finished = match frame.scope.items.last() {
                Some(ScopeItem::Token(t)) => t.kind != TokenKind::Operator,
                Some(ScopeItem::Scope(_)) => true,
                None => false,
            };
            if !finished {
                break;
            }
            self.close_space();
        }
    }

    fn run(mut self) -> Result<Scope, Error> {
        let len = self.chars.len();
        let mut i = 0;
        let mut lpos = 0;

        while i < len {
            let c = self.chars[i];

            if self.tk.brackets.is_bracket(c) {
                let bracket = self.tk.brackets.get(c).cloned().expect("checked by is_bracket");
                self.flush(lpos, i);

                if bracket.open {
                    // a pending function name makes this an argument list; anything else
                    // multiplies into the scope
                    if !matches!(
                        self.top().last(),
                        Some(ScopeItem::Token(t)) if t.kind == TokenKind::Function
                    ) {
                        self.implied_mul(i);
                    }

                    let kind = ScopeKind::Bracket { maps_to: bracket.maps_to.clone() };
                    self.frames.push(Frame {
                        scope: Scope::new(kind, i..i + 1),
                        opener: Some((bracket, i)),
                    });
                } else {
                    self.close_all_spaces();

                    let closes_bracket =
                        self.frames.last().map_or(false, |frame| frame.opener.is_some());
                    if !closes_bracket {
                        return Err(Error::new(
                            vec![i..i + 1],
                            kind::UnexpectedCloseBracket { column: i + 1 },
                        ));
                    }

                    let frame = self.frames.pop().expect("just checked");
                    let (opener, opened_at) = frame.opener.expect("just checked");
                    if !BracketTable::matches(&opener, &bracket) {
                        return Err(Error::new(
                            vec![i..i + 1, opened_at..opened_at + 1],
                            kind::MismatchedBracket { column: i + 1 },
                        ));
                    }

                    let mut scope = frame.scope;
                    scope.span = opened_at..i + 1;
                    self.top().push_scope(scope);
                }

                i += 1;
                lpos = i;
            } else if self.tk.ops.is_operator_char(c) {
                self.flush(lpos, i);

                let run_start = i;
                while i < len
                    && self.tk.ops.is_operator_char(self.chars[i])
                    && !self.tk.brackets.is_bracket(self.chars[i])
                {
                    i += 1;
                }
                let run: String = self.chars[run_start..i].iter().collect();

                for token in self.tk.ops.chunkify(&run, run_start)? {
                    // a comma continues a space-opened argument list; every other operator
                    // terminates it
                    let is_comma = token
                        .op
                        .as_ref()
                        .map_or(false, |op| op.action == OpAction::Comma);
                    if !is_comma {
                        self.close_finished_spaces();
                    }
                    self.top().push_token(token);
                }

                lpos = i;
            } else if c == ' ' {
                match self.flush(lpos, i) {
                    Some(TokenKind::Function) => {
                        // space after a function name opens an implicit argument scope
                        self.frames.push(Frame {
                            scope: Scope::new(ScopeKind::Space, i..i + 1),
                            opener: None,
                        });
                    },
                    _ => {
                        // a second space (or a space after a flushed operand) terminates any
                        // open argument scope, then reads as multiplication if an operand
                        // follows
                        self.close_finished_spaces();
                        let next_is_operand = self.chars.get(i + 1).map_or(false, |&n| {
                            !self.tk.ops.is_operator_char(n)
                                && !self.tk.brackets.get(n).map_or(false, |b| !b.open)
                        });
                        if next_is_operand {
                            self.implied_mul(i);
                        }
                    },
                }

                i += 1;
                lpos = i;
            } else {
                // identifier or literal character; keep accumulating
                i += 1;
            }
        }

        self.flush(lpos, len);
        self.close_all_spaces();

        if let Some(&(_, opened_at)) = self
            .frames
            .iter()
            .rev()
            .find_map(|f| f.opener.as_ref())
        {
            return Err(Error::new(
                vec![opened_at..opened_at + 1],
                kind::UnclosedBracket { column: opened_at + 1 },
            ));
        }

        let frame = self.frames.pop().expect("only the root frame remains");
        Ok(frame.scope)
    }
}

#[cfg(test)]
mod tests {
    use crate::tokenizer::op::FunctionSet;
    use pretty_assertions::assert_eq;
    use super::*;

    fn oracle() -> FunctionSet {
        FunctionSet::from_names(["sin", "cos", "sqrt", "max"])
    }

    /// Scans the input and returns the flattened `(kind, text)` pairs of the root scope,
    /// descending into nested scopes in order.
    fn scan(input: &str) -> Vec<(TokenKind, String)> {
        let ops = OperatorDictionary::default();
        let brackets = BracketTable::default();
        let units = UnitTable::new();
        let oracle = oracle();
        let tokenizer = Tokenizer::new(&ops, &brackets, &units, &oracle);
        let scope = tokenizer.tokenize(input).unwrap();

        fn flatten(scope: &Scope, out: &mut Vec<(TokenKind, String)>) {
            for item in &scope.items {
                match item {
                    ScopeItem::Token(t) => out.push((t.kind, t.value.clone())),
                    ScopeItem::Scope(s) => flatten(s, out),
                }
            }
        }

        let mut out = Vec::new();
        flatten(&scope, &mut out);
        out
    }

    fn pairs(expected: &[(TokenKind, &str)]) -> Vec<(TokenKind, String)> {
        expected.iter().map(|(k, v)| (*k, v.to_string())).collect()
    }

    #[test]
    fn basic_expr() {
        assert_eq!(
            scan("1+2"),
            pairs(&[
                (TokenKind::Value, "1"),
                (TokenKind::Operator, "+"),
                (TokenKind::Value, "2"),
            ]),
        );
    }

    #[test]
    fn function_application() {
        assert_eq!(
            scan("sin(x)+1"),
            pairs(&[
                (TokenKind::Function, "sin"),
                (TokenKind::Value, "x"),
                (TokenKind::Operator, "+"),
                (TokenKind::Value, "1"),
            ]),
        );
    }

    #[test]
    fn space_opens_argument_scope() {
        // `sin x + 1` produces the same token sequence as `sin(x)+1`
        assert_eq!(scan("sin x + 1"), scan("sin(x)+1"));
    }

    #[test]
    fn space_scope_continues_through_comma() {
        assert_eq!(scan("max x, y"), scan("max(x, y)"));
    }

    #[test]
    fn space_between_operands_multiplies() {
        assert_eq!(
            scan("x y"),
            pairs(&[
                (TokenKind::Value, "x"),
                (TokenKind::Operator, "*"),
                (TokenKind::Value, "y"),
            ]),
        );
    }

    #[test]
    fn operator_run_splits_greedily() {
        assert_eq!(
            scan("a+-b"),
            pairs(&[
                (TokenKind::Value, "a"),
                (TokenKind::Operator, "+"),
                (TokenKind::Operator, "-"),
                (TokenKind::Value, "b"),
            ]),
        );
    }

    #[test]
    fn nested_scopes_nest() {
        let ops = OperatorDictionary::default();
        let brackets = BracketTable::default();
        let units = UnitTable::new();
        let oracle = oracle();
        let tokenizer = Tokenizer::new(&ops, &brackets, &units, &oracle);

        let scope = tokenizer.tokenize("(x+(y))").unwrap();
        assert_eq!(scope.items.len(), 1);
        let ScopeItem::Scope(outer) = &scope.items[0] else {
            panic!("expected a nested scope");
        };
        assert_eq!(outer.span, 0..7);
        assert_eq!(outer.items.len(), 3);
    }

    #[test]
    fn unclosed_bracket_cites_column() {
        let ops = OperatorDictionary::default();
        let brackets = BracketTable::default();
        let units = UnitTable::new();
        let oracle = oracle();
        let tokenizer = Tokenizer::new(&ops, &brackets, &units, &oracle);

        let err = tokenizer.tokenize("sin(x").unwrap_err();
        assert_eq!(err.column(), 4);
    }

    #[test]
    fn stray_close_bracket_cites_column() {
        let ops = OperatorDictionary::default();
        let brackets = BracketTable::default();
        let units = UnitTable::new();
        let oracle = oracle();
        let tokenizer = Tokenizer::new(&ops, &brackets, &units, &oracle);

        let err = tokenizer.tokenize("(x))").unwrap_err();
        assert_eq!(err.column(), 4);
    }

    #[test]
    fn mismatched_bracket_family() {
        let ops = OperatorDictionary::default();
        let brackets = BracketTable::default();
        let units = UnitTable::new();
        let oracle = oracle();
        let tokenizer = Tokenizer::new(&ops, &brackets, &units, &oracle);

        assert!(tokenizer.tokenize("(x]").is_err());
    }

    #[test]
    fn preparation_reaches_fixpoint() {
        let ops = OperatorDictionary::default();
        let brackets = BracketTable::default();
        let units = UnitTable::new();
        let oracle = oracle();
        let tokenizer = Tokenizer::new(&ops, &brackets, &units, &oracle);
        let hooks = Preprocessors::new();

        let once = tokenizer.prepare("2x(x+1)sin x", &hooks);
        let twice = tokenizer.prepare(&once, &hooks);
        assert_eq!(once, twice);
    }
}
