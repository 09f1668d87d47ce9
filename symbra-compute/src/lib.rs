//! Canonical terms, exact rational arithmetic and the normalizing kernel.
//!
//! This crate is the computational half of the workspace: it consumes the operator trees
//! produced by [`symbra_parser`] and evaluates them into canonical [`Term`]s through a pure,
//! single-threaded kernel.
//!
//! The quickest way in is the context:
//!
//! ```
//! use symbra_compute::Ctxt;
//!
//! let ctxt = Ctxt::default();
//! let term = ctxt.parse("2x + 3x").unwrap();
//! assert_eq!(term.text(), "5*x");
//!
//! let folded = ctxt.parse_numeric("sqrt(2)").unwrap();
//! assert!(folded.is_number());
//! ```
//!
//! The kernel itself ([`add`], [`subtract`], [`multiply`], [`divide`], [`pow`], [`sqrt`]) is a
//! set of free functions over owned [`Term`]s; the [`Ctxt`] methods are thin wrappers that
//! supply the settings where an operation needs them.

pub mod consts;
pub mod ctxt;
pub mod error;
pub mod eval;
pub mod frac;
pub mod funcs;
pub mod kernel;
pub mod primitive;
pub mod term;

pub use ctxt::{Ctxt, Settings};
pub use error::Error;
pub use eval::EvalMode;
pub use frac::Frac;
pub use funcs::{FuncDef, Functions};
pub use kernel::{add, distribute_multiplier, divide, expand, invert, multiply, negate, pow,
    sqrt, subtract};
pub use term::{Group, Power, Term, CONST_HASH};

// the parser is re-exported so downstream users can inject custom tables without depending on
// it directly
pub use symbra_parser as parser;

/// End-to-end checks over the whole pipeline: parse, normalize, compare.
#[cfg(test)]
mod properties {
    use crate::term::Power;
    use pretty_assertions::assert_eq;
    use super::*;

    fn parse(input: &str) -> Term {
        Ctxt::default().parse(input).unwrap()
    }

    /// Asserts the canonicalization invariants on every node of a term: no zero children, and
    /// unit multipliers on every product child.
    fn assert_canonical(term: &Term) {
        for child in term.children().values() {
            assert!(!child.multiplier().is_zero(), "zero child in {}", term.text());
            if term.group() == Group::Product {
                assert!(
                    child.multiplier().is_one(),
                    "non-unit product child in {}",
                    term.text(),
                );
            }
            assert_canonical(child);
        }
        for arg in term.args() {
            assert_canonical(arg);
        }
        if let Power::Term(p) = term.power() {
            assert_canonical(p);
        }
    }

    #[test]
    fn clone_fidelity() {
        for input in ["x", "2x+3y", "sin(x)^2", "(x+1)^2", "sqrt(8)"] {
            let term = parse(input);
            let copy = term.clone();
            assert!(term.equals(&copy), "clone of {input} differs");
            assert_eq!(term, copy);
        }
    }

    #[test]
    fn addition_collapses_like_terms() {
        assert_eq!(parse("x + x"), parse("2*x"));
        assert!(parse("3a - 3a").is_zero());
        assert_eq!(parse("2x + 3x").text(), "5*x");
    }

    #[test]
    fn multiplication_folds_exponents() {
        assert_eq!(parse("x^2 * x^3"), parse("x^5"));
    }

    #[test]
    fn power_distributes_over_coefficients() {
        assert_eq!(parse("(2x)^3"), parse("8*x^3"));
    }

    #[test]
    fn sums_and_products_are_order_independent() {
        assert_eq!(parse("a+b+c"), parse("c+a+b"));
        assert_eq!(parse("a*b*c"), parse("c*a*b"));
        assert_eq!(parse("a+b+c"), parse("b+c+a"));
    }

    #[test]
    fn round_trip_through_canonical_text() {
        let inputs = [
            "x",
            "2*x",
            "x^2+2*x+1",
            "a*b*c",
            "sin(x)+1",
            "2^(1/2)",
            "(x+1)^2",
            "x+x^2",
            "2^(x+1)",
            "1/2*x",
            "x^(-2)",
            "sqrt(2)*sqrt(3)",
            "3*(x+y)",
        ];
        for input in inputs {
            let term = parse(input);
            let round = parse(&term.text());
            assert_eq!(term, round, "{input} failed to round-trip via {}", term.text());
        }
    }

    #[test]
    fn substitution_consistency() {
        let ctxt = Ctxt::default();
        let subs = ctxt.substitutions(&[("x", "2")]).unwrap();
        assert_eq!(ctxt.parse_with("x+1", &subs).unwrap(), parse("3"));

        let subs = ctxt.substitutions(&[("x", "y+1")]).unwrap();
        assert_eq!(ctxt.parse_with("x^2", &subs).unwrap(), parse("(y+1)^2"));
    }

    #[test]
    fn variable_enumeration_is_alphabetical() {
        assert_eq!(parse("2*b*a + c*a").variables(), vec!["a", "b", "c"]);
    }

    #[test]
    fn bracket_parity_errors_cite_columns() {
        let ctxt = Ctxt::default();
        let err = ctxt.parse("sin(x").unwrap_err();
        assert_eq!(err.column(), 4);

        let err = ctxt.parse("(x))").unwrap_err();
        assert_eq!(err.column(), 4);
    }

    #[test]
    fn preparation_reaches_a_fixpoint() {
        let ctxt = Ctxt::default();
        for input in ["2x", "2x(x+1)", "sin x + 1", "1.2e-3 + x", ")x("] {
            let once = ctxt.prepare(input);
            assert_eq!(once, ctxt.prepare(&once), "prepare not idempotent for {input}");
        }
    }

    #[test]
    fn canonical_invariants_hold_after_arithmetic() {
        let inputs = [
            "x*y + x - x*y",
            "3x*2y",
            "(x+1)*(x+1)",
            "x^2*y/x",
            "2x + 3x - 5x + y",
            "sqrt(8)*sqrt(2)",
        ];
        for input in inputs {
            assert_canonical(&parse(input));
        }
    }

    #[test]
    fn expand_matches_the_distributed_form() {
        let ctxt = Ctxt::default();
        let squared = ctxt.parse("(x+1)^2").unwrap();
        assert_eq!(ctxt.expand(squared), parse("x^2+2*x+1"));
    }

    #[test]
    fn square_roots_normalize() {
        assert_eq!(parse("sqrt(4)"), parse("2"));
        assert_eq!(parse("sqrt(8)"), parse("2*sqrt(2)"));
    }

    #[test]
    fn nested_reciprocals_cancel() {
        assert_eq!(parse("1/(1/x)"), parse("x"));
    }

    #[test]
    fn zero_products_vanish() {
        assert_eq!(parse("0*x + y"), parse("y"));
    }

    #[test]
    fn space_application_matches_brackets() {
        assert_eq!(parse("sin x + 1"), parse("sin(x)+1"));
    }
}
