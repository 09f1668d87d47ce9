//! The evaluation driver: walks the operator tree post-order and dispatches each node to the
//! kernel, producing a canonical [`Term`].
//!
//! Substitutions are applied when the matched atom is read, before any dispatch. In
//! [`EvalMode::Numeric`], every node additionally attempts rational-to-decimal folding: surds,
//! named constants and function calls over constants collapse to exact decimals at the
//! configured precision.

use crate::ctxt::Ctxt;
use crate::error::{kind, Error};
use crate::frac::Frac;
use crate::funcs::float_to_frac;
use crate::kernel;
use crate::primitive::bits_for_digits;
use crate::term::{Group, Power, Term};
use crate::consts;
use rug::ops::Pow;
use std::collections::HashMap;
use symbra_parser::{Node, OpAction, Token, TokenKind};

/// Whether the driver keeps exact symbolic forms or folds constants to decimals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalMode {
    Symbolic,
    Numeric,
}

/// Evaluates an operator tree into a canonical term.
pub(crate) fn eval_node(
    ctxt: &Ctxt,
    node: &Node,
    substitutions: &HashMap<String, Term>,
    mode: EvalMode,
) -> Result<Term, Error> {
    let term = match node {
        Node::Value(token) => literal(ctxt, token, substitutions, mode)?,
        Node::Unary { op, operand } => {
            let operand = eval_node(ctxt, operand, substitutions, mode)?;
            let action = op.op.as_ref().map(|d| d.action);
            match action {
                Some(OpAction::Add) => operand,
                Some(OpAction::Subtract) => kernel::negate(operand),
                Some(OpAction::Factorial) => ctxt.functions.call(
                    &ctxt.settings,
                    "factorial",
                    vec![operand],
                    op.span.clone(),
                    mode,
                )?,
                _ => {
                    return Err(Error::new(
                        vec![op.span.clone()],
                        kind::InvalidOperation {
                            reason: format!("`{}` cannot be applied to one operand", op.value),
                        },
                    ));
                },
            }
        },
        Node::Binary { op, lhs, rhs } => {
            let lhs = eval_node(ctxt, lhs, substitutions, mode)?;
            let rhs = eval_node(ctxt, rhs, substitutions, mode)?;
            let action = op.op.as_ref().map(|d| d.action);
            match action {
                Some(OpAction::Add) => kernel::add(lhs, rhs),
                Some(OpAction::Subtract) => kernel::subtract(lhs, rhs),
                Some(OpAction::Multiply) => kernel::multiply(lhs, rhs),
                Some(OpAction::Divide) => {
                    kernel::divide(lhs, rhs).map_err(|e| e.with_spans(vec![op.span.clone()]))?
                },
                Some(OpAction::Pow) => kernel::pow(&ctxt.settings, lhs, rhs),
                _ => {
                    return Err(Error::new(
                        vec![op.span.clone()],
                        kind::InvalidOperation {
                            reason: format!("`{}` cannot be applied here", op.value),
                        },
                    ));
                },
            }
        },
        Node::Call { name, span, args } => {
            let args = args
                .iter()
                .map(|arg| eval_node(ctxt, arg, substitutions, mode))
                .collect::<Result<Vec<_>, _>>()?;
            ctxt.functions
                .call(&ctxt.settings, name, args, span.clone(), mode)?
        },
    };

    match mode {
        EvalMode::Symbolic => Ok(term),
        EvalMode::Numeric => approx_term(ctxt, &term),
    }
}

/// Resolves a leaf token: a number literal, a substituted atom, the imaginary unit, a named
/// constant, a unit of measure, or a plain variable.
fn literal(
    ctxt: &Ctxt,
    token: &Token,
    substitutions: &HashMap<String, Term>,
    mode: EvalMode,
) -> Result<Term, Error> {
    let text = token.value.as_str();

    if token.kind == TokenKind::Unit {
        return Ok(Term::unit(text));
    }

    if text.starts_with(|c: char| c.is_ascii_digit() || c == '.') {
        return match Frac::from_decimal(text) {
            Some(value) => Ok(Term::number(value)),
            None => Err(Error::new(
                vec![token.span.clone()],
                kind::InvalidLiteral { text: text.to_string() },
            )),
        };
    }

    if let Some(term) = substitutions.get(text) {
        return Ok(term.clone());
    }

    if text == ctxt.settings.imaginary_unit {
        return Ok(Term::imaginary_unit(text));
    }

    if consts::is_reserved(text) && mode == EvalMode::Numeric {
        let bits = bits_for_digits(ctxt.settings.precision);
        if let Some(value) = consts::value(text, bits) {
            if let Some(folded) = float_to_frac(&ctxt.settings, &value) {
                return Ok(Term::number(folded));
            }
        }
    }

    Ok(Term::atom(text))
}

/// Folds every constant part of a term to a decimal: surds and named constants become numbers,
/// function calls over constants go back through the registry's numeric path, and composites
/// recombine through the kernel. Terms containing variables keep their symbolic parts.
pub(crate) fn approx_term(ctxt: &Ctxt, term: &Term) -> Result<Term, Error> {
    let settings = &ctxt.settings;
    let bits = bits_for_digits(settings.precision);

    match term.group() {
        Group::Number => Ok(term.clone()),

        Group::Surd => {
            let Some(base) = Frac::from_fraction_text(term.value()) else {
                return Ok(term.clone());
            };
            let Some(exponent) = term.power().as_rational() else {
                return Ok(term.clone());
            };
            let value = base.to_float(bits).pow(exponent.to_float(bits));
            match float_to_frac(settings, &value) {
                Some(folded) => Ok(Term::number(folded * term.multiplier().clone())),
                None => Ok(term.clone()),
            }
        },

        Group::Atom => {
            if !consts::is_reserved(term.value()) {
                return Ok(term.clone());
            }
            let Some(constant) = consts::value(term.value(), bits) else {
                return Ok(term.clone());
            };
            let Some(exponent) = term.power().as_rational() else {
                return Ok(term.clone());
            };
            let value = constant.pow(exponent.to_float(bits));
            match float_to_frac(settings, &value) {
                Some(folded) => Ok(Term::number(folded * term.multiplier().clone())),
                None => Ok(term.clone()),
            }
        },

        Group::Function => {
            let args = term
                .args()
                .iter()
                .map(|arg| approx_term(ctxt, arg))
                .collect::<Result<Vec<_>, _>>()?;
            let name = term.fname().unwrap_or_default();
            let called = if ctxt.functions.contains(name) {
                ctxt.functions
                    .call(settings, name, args, 0..0, EvalMode::Numeric)?
            } else {
                Term::call(name, args)
            };
            Ok(reapply(ctxt, called, term))
        },

        Group::Exponential => {
            let mut base = term.clone();
            base.multiplier = Frac::one();
            let base = kernel::unit_power(base);
            let base = approx_term(ctxt, &base)?;

            let exponent = match term.power() {
                Power::Term(p) => approx_term(ctxt, p)?,
                Power::Rational(p) => Term::number(p.clone()),
            };

            let powed = kernel::pow(settings, base, exponent);
            Ok(kernel::multiply(Term::number(term.multiplier().clone()), powed))
        },

        Group::PowerChain | Group::Polynomial => {
            let mut sum = Term::zero();
            for child in term.children().values() {
                sum = kernel::add(sum, approx_term(ctxt, child)?);
            }
            Ok(reapply(ctxt, sum, term))
        },

        Group::Product => {
            let mut out = Term::number(term.multiplier().clone());
            for child in term.children().values() {
                out = kernel::multiply(out, approx_term(ctxt, child)?);
            }
            Ok(out)
        },
    }
}

/// Reapplies the original term's power and multiplier to a rebuilt core.
fn reapply(ctxt: &Ctxt, core: Term, original: &Term) -> Term {
    let powed = match original.power() {
        Power::Rational(p) if p.is_one() => core,
        Power::Rational(p) => kernel::pow(&ctxt.settings, core, Term::number(p.clone())),
        Power::Term(p) => kernel::pow(&ctxt.settings, core, (**p).clone()),
    };
    kernel::multiply(Term::number(original.multiplier().clone()), powed)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use super::*;

    #[test]
    fn literal_numbers_and_atoms() {
        let ctxt = Ctxt::default();
        assert_eq!(ctxt.parse("42").unwrap(), Term::int(42));
        assert_eq!(ctxt.parse("1.25").unwrap(), Term::number(Frac::new(5, 4)));
        assert_eq!(ctxt.parse("x").unwrap(), Term::atom("x"));
        assert!(ctxt.parse("i").unwrap().is_imaginary());
    }

    #[test]
    fn substitution_applies_before_dispatch() {
        let ctxt = Ctxt::default();
        let subs = ctxt.substitutions(&[("x", "2")]).unwrap();
        let out = ctxt.parse_with("x+1", &subs).unwrap();
        assert_eq!(out, Term::int(3));
    }

    #[test]
    fn substitution_with_expression_values() {
        let ctxt = Ctxt::default();
        let subs = ctxt.substitutions(&[("x", "y+1")]).unwrap();
        let out = ctxt.parse_with("x^2", &subs).unwrap();
        assert_eq!(out, ctxt.parse("(y+1)^2").unwrap());
    }

    #[test]
    fn unary_operators_dispatch() {
        let ctxt = Ctxt::default();
        assert_eq!(ctxt.parse("-3").unwrap(), Term::int(-3));
        assert_eq!(ctxt.parse("+3").unwrap(), Term::int(3));
        assert_eq!(ctxt.parse("3!").unwrap(), Term::int(6));
    }

    #[test]
    fn numeric_mode_folds_constants() {
        let ctxt = Ctxt::default();
        let out = ctxt.parse_numeric("pi").unwrap();
        assert!(out.is_number());
        assert!(out.multiplier().to_decimal(5).starts_with("3.14159"));
    }

    #[test]
    fn numeric_mode_folds_surds() {
        let ctxt = Ctxt::default();
        let out = ctxt.parse_numeric("2^(1/2)").unwrap();
        assert!(out.is_number());
        assert!(out.multiplier().to_decimal(8).starts_with("1.4142135"));
    }

    #[test]
    fn evaluate_folds_an_existing_term() {
        let ctxt = Ctxt::default();
        let symbolic = ctxt.parse("sqrt(2)*x").unwrap();
        let folded = ctxt.evaluate(&symbolic).unwrap();

        // the variable stays, the surd becomes a decimal coefficient
        assert!(folded.contains("x"));
        assert!(!folded.multiplier().is_one());
    }

    #[test]
    fn numeric_mode_keeps_variables_symbolic() {
        let ctxt = Ctxt::default();
        let out = ctxt.parse_numeric("x+1").unwrap();
        assert_eq!(out, ctxt.parse("x+1").unwrap());
    }
}
