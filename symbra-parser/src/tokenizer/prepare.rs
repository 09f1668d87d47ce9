//! Expression preprocessing: user hooks and the built-in rewrites that run before scanning.
//!
//! Preprocessing is purely textual. User hooks registered in a [`Preprocessors`] registry run
//! first, in order; the built-ins then collapse whitespace, strip whitespace around brackets,
//! expand scientific notation, and insert implicit multiplication until the string reaches a
//! fixpoint.

use crate::error::{kind, Error};
use crate::tokenizer::op::{BracketTable, FunctionOracle};
use crate::validate_name;
use std::sync::Arc;

/// A registered preprocessing hook: a pure rewrite from source text to source text.
pub type PreprocessorAction = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// An ordered registry of user preprocessing hooks, applied to the input string before any
/// built-in preparation.
#[derive(Clone, Default)]
pub struct Preprocessors {
    entries: Vec<(String, PreprocessorAction)>,
}

impl std::fmt::Debug for Preprocessors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|(name, _)| name))
            .finish()
    }
}

impl Preprocessors {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a hook at the end of the pipeline. The name must be a valid identifier and must
    /// not already be registered.
    pub fn add(
        &mut self,
        name: impl Into<String>,
        action: PreprocessorAction,
    ) -> Result<(), Error> {
        let name = name.into();
        validate_name(&name)?;
        if self.entries.iter().any(|(n, _)| n == &name) {
            return Err(Error::new(
                Vec::new(),
                kind::InvalidPreprocessor {
                    name,
                    reason: "a preprocessor with this name is already registered".into(),
                },
            ));
        }

        self.entries.push((name, action));
        Ok(())
    }

    /// Registers a hook at a specific position. With `shift` set, hooks at and after `order` move
    /// back to make room; otherwise the hook at `order` is replaced. Positions past the end
    /// append.
    pub fn add_at(
        &mut self,
        name: impl Into<String>,
        action: PreprocessorAction,
        order: usize,
        shift: bool,
    ) -> Result<(), Error> {
        let name = name.into();
        validate_name(&name)?;
        if self.entries.iter().any(|(n, _)| n == &name) {
            return Err(Error::new(
                Vec::new(),
                kind::InvalidPreprocessor {
                    name,
                    reason: "a preprocessor with this name is already registered".into(),
                },
            ));
        }

        if order >= self.entries.len() {
            self.entries.push((name, action));
        } else if shift {
            self.entries.insert(order, (name, action));
        } else {
            self.entries[order] = (name, action);
        }
        Ok(())
    }

    /// Removes a hook by name. Returns true if one was removed.
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(n, _)| n != name);
        before != self.entries.len()
    }

    /// The registered hook names, in application order.
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// Runs every hook over the input, in order.
    pub fn apply(&self, input: &str) -> String {
        self.entries
            .iter()
            .fold(input.to_string(), |text, (_, action)| action(&text))
    }
}

/// Collapses runs of whitespace to single spaces and trims the ends.
pub(crate) fn collapse_whitespace(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut pending_space = false;
    for c in input.trim().chars() {
        if c.is_whitespace() {
            pending_space = true;
        } else {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.push(c);
        }
    }
    out
}

/// Removes spaces that neighbor a bracket, so `f ( x )` scans like `f(x)`.
pub(crate) fn strip_bracket_spaces(input: &str, brackets: &BracketTable) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len());
    for (i, &c) in chars.iter().enumerate() {
        if c == ' ' {
            let prev_bracket = i.checked_sub(1).map_or(false, |p| brackets.is_bracket(chars[p]));
            let next_bracket = chars.get(i + 1).map_or(false, |&n| brackets.is_bracket(n));
            if prev_bracket || next_bracket {
                continue;
            }
        }
        out.push(c);
    }
    out
}

/// Expands scientific-notation literals in place: `1.2e-3` becomes `0.0012`. A literal is a digit
/// run (with optional decimal point) directly followed by `e` or `E`, an optional sign, and a
/// digit run; the mantissa must not be the tail of an identifier.
pub(crate) fn expand_scientific(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len());
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let digit_start = c.is_ascii_digit()
            || (c == '.' && chars.get(i + 1).map_or(false, char::is_ascii_digit));
        let starts_number = digit_start
            && !out
                .chars()
                .last()
                .map_or(false, |p| p.is_alphanumeric() || p == '_' || p == '.');

        if !starts_number {
            out.push(c);
            i += 1;
            continue;
        }

        // mantissa: digits, optionally a point and more digits
        let start = i;
        while i < chars.len() && chars[i].is_ascii_digit() {
            i += 1;
        }
        if i < chars.len() && chars[i] == '.' {
            i += 1;
            while i < chars.len() && chars[i].is_ascii_digit() {
                i += 1;
            }
        }
        let mantissa: String = chars[start..i].iter().collect();

        // exponent marker
        let mut j = i;
        if j < chars.len() && (chars[j] == 'e' || chars[j] == 'E') {
            j += 1;
            let mut negative = false;
            if j < chars.len() && (chars[j] == '+' || chars[j] == '-') {
                negative = chars[j] == '-';
                j += 1;
            }
            let exp_start = j;
            while j < chars.len() && chars[j].is_ascii_digit() {
                j += 1;
            }
            // the exponent must not itself flow into an identifier (`2e3x` is fine, `2ex` is not
            // scientific)
            if j > exp_start {
                let exp: i32 = chars[exp_start..j]
                    .iter()
                    .collect::<String>()
                    .parse()
                    .unwrap_or(0);
                let exp = if negative { -exp } else { exp };
                out.push_str(&shift_decimal(&mantissa, exp));
                i = j;
                continue;
            }
        }

        out.push_str(&mantissa);
    }

    out
}

/// Moves the decimal point of `mantissa` by `exp` places, producing a plain decimal literal.
fn shift_decimal(mantissa: &str, exp: i32) -> String {
    let (int_part, frac_part) = match mantissa.split_once('.') {
        Some((i, f)) => (i.to_string(), f.to_string()),
        None => (mantissa.to_string(), String::new()),
    };

    let digits: String = format!("{int_part}{frac_part}");
    // position of the point, counted from the left of `digits`
    let point = int_part.len() as i32 + exp;

    let mut out = String::new();
    if point <= 0 {
        out.push_str("0.");
        for _ in 0..-point {
            out.push('0');
        }
        out.push_str(digits.trim_end_matches('0'));
        if out.ends_with('.') {
            out.push('0');
        }
    } else if (point as usize) >= digits.len() {
        out.push_str(&digits);
        for _ in 0..(point as usize - digits.len()) {
            out.push('0');
        }
    } else {
        out.push_str(&digits[..point as usize]);
        let tail = digits[point as usize..].trim_end_matches('0');
        if !tail.is_empty() {
            out.push('.');
            out.push_str(tail);
        }
    }

    // strip a redundant leading "0" from things like "0.0012" only when nothing follows the
    // point; keep the conventional form otherwise
    if out.is_empty() {
        out.push('0');
    }
    out
}

/// The character classes the implicit-multiplication pass distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Piece {
    Number,
    Ident,
    Open,
    Close,
    Other,
}

/// Inserts `*` where multiplication is implied: `2x` → `2*x`, `)(` → `)*(`, `x(` → `x*(` unless
/// `x` names a function. With `multichar_vars` off, unknown letter runs split into single-letter
/// products (`abc` → `a*b*c`).
///
/// One call performs one full pass; [`prepare`] iterates to a textual fixpoint.
pub(crate) fn insert_implied_mul(
    input: &str,
    brackets: &BracketTable,
    oracle: &dyn FunctionOracle,
    multichar_vars: bool,
) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut pieces: Vec<(Piece, String)> = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c.is_ascii_digit() || c == '.' {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                i += 1;
            }
            pieces.push((Piece::Number, chars[start..i].iter().collect()));
        } else if c.is_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            pieces.push((Piece::Ident, chars[start..i].iter().collect()));
        } else if brackets.is_bracket(c) {
            let class = if brackets.get(c).map_or(false, |b| b.open) {
                Piece::Open
            } else {
                Piece::Close
            };
            pieces.push((class, c.to_string()));
            i += 1;
        } else {
            pieces.push((Piece::Other, c.to_string()));
            i += 1;
        }
    }

    // split unknown letter runs into single-letter products
    if !multichar_vars {
        let mut split = Vec::with_capacity(pieces.len());
        for (class, text) in pieces {
            let all_letters = text.chars().all(char::is_alphabetic);
            if class == Piece::Ident
                && text.chars().count() > 1
                && all_letters
                && !oracle.is_function(&text)
            {
                for (k, c) in text.chars().enumerate() {
                    if k > 0 {
                        split.push((Piece::Other, "*".to_string()));
                    }
                    split.push((Piece::Ident, c.to_string()));
                }
            } else {
                split.push((class, text));
            }
        }
        pieces = split;
    }

    let mut out = String::with_capacity(input.len());
    for k in 0..pieces.len() {
        let (class, text) = &pieces[k];
        out.push_str(text);

        let Some((next_class, _)) = pieces.get(k + 1) else {
            continue;
        };

        let implied = match (class, next_class) {
            (Piece::Number, Piece::Ident) => true,
            (Piece::Number, Piece::Open) => true,
            (Piece::Close, Piece::Open) => true,
            (Piece::Close, Piece::Ident) => true,
            (Piece::Close, Piece::Number) => true,
            (Piece::Ident, Piece::Open) => !oracle.is_function(text),
            _ => false,
        };
        if implied {
            out.push('*');
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use crate::tokenizer::op::FunctionSet;
    use pretty_assertions::assert_eq;
    use super::*;

    fn oracle() -> FunctionSet {
        FunctionSet::from_names(["sin", "cos", "sqrt"])
    }

    #[test]
    fn whitespace_collapse() {
        assert_eq!(collapse_whitespace("  2 +\t 3  "), "2 + 3");
    }

    #[test]
    fn bracket_spaces() {
        let brackets = BracketTable::default();
        assert_eq!(strip_bracket_spaces("f ( x )", &brackets), "f(x)");
    }

    #[test]
    fn scientific_expansion() {
        assert_eq!(expand_scientific("1.2e-3"), "0.0012");
        assert_eq!(expand_scientific("2e3"), "2000");
        assert_eq!(expand_scientific("1.5e2+x"), "150+x");
        assert_eq!(expand_scientific(".5e1"), "5");
        // `e` as a bare identifier is left alone
        assert_eq!(expand_scientific("2e"), "2e");
        assert_eq!(expand_scientific("x2e3"), "x2e3");
    }

    #[test]
    fn implied_multiplication() {
        let brackets = BracketTable::default();
        let oracle = oracle();
        assert_eq!(insert_implied_mul("2x", &brackets, &oracle, true), "2*x");
        assert_eq!(insert_implied_mul(")(", &brackets, &oracle, true), ")*(");
        assert_eq!(insert_implied_mul("x(y)", &brackets, &oracle, true), "x*(y)");
        assert_eq!(insert_implied_mul("sin(y)", &brackets, &oracle, true), "sin(y)");
        assert_eq!(insert_implied_mul("2sin(y)", &brackets, &oracle, true), "2*sin(y)");
    }

    #[test]
    fn single_letter_mode() {
        let brackets = BracketTable::default();
        let oracle = oracle();
        assert_eq!(insert_implied_mul("abc", &brackets, &oracle, false), "a*b*c");
        assert_eq!(insert_implied_mul("sin(ab)", &brackets, &oracle, false), "sin(a*b)");
    }

    #[test]
    fn registry_order_and_removal() {
        let mut hooks = Preprocessors::new();
        hooks
            .add("strip_bang", Arc::new(|s: &str| s.replace('!', "")))
            .unwrap();
        hooks
            .add("double_x", Arc::new(|s: &str| s.replace('x', "xx")))
            .unwrap();

        assert_eq!(hooks.names(), vec!["strip_bang", "double_x"]);
        assert_eq!(hooks.apply("x!"), "xx");

        assert!(hooks.remove("double_x"));
        assert_eq!(hooks.apply("x!"), "x");
    }

    #[test]
    fn registry_rejects_duplicates() {
        let mut hooks = Preprocessors::new();
        hooks.add("once", Arc::new(|s: &str| s.to_string())).unwrap();
        assert!(hooks.add("once", Arc::new(|s: &str| s.to_string())).is_err());
    }
}
