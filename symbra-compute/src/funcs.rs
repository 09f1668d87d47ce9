//! The function registry: reduction rules, numeric approximation, and the `Function`-group
//! wrapper for everything without a rule.
//!
//! Each registered function carries an arity range, an optional exact reduction (`sqrt(4)` is
//! `2`, `parens(x)` is `x`), and an optional numeric approximation used when the driver runs
//! with [`EvalMode::Numeric`](crate::eval::EvalMode). A call that neither reduces nor
//! approximates returns a [`Group::Function`](crate::term::Group) wrapper holding the evaluated
//! arguments.

use crate::ctxt::Settings;
use crate::error::{kind, Error};
use crate::eval::EvalMode;
use crate::frac::Frac;
use crate::kernel;
use crate::primitive::bits_for_digits;
use crate::term::Term;
use levenshtein::levenshtein;
use rug::{Float, Integer};
use std::collections::HashMap;
use std::ops::Range;

/// An exact reduction rule. Returns `Ok(None)` when no reduction applies.
pub type ReduceFn = fn(&Settings, &[Term]) -> Result<Option<Term>, Error>;

/// A numeric approximation over the arguments' rational values. Returns `None` when the
/// function is not defined there.
pub type ApproxFn = fn(&Settings, &[Frac]) -> Option<Frac>;

/// A function available for use in expressions.
#[derive(Clone)]
pub struct FuncDef {
    /// The smallest accepted argument count.
    pub min_args: usize,

    /// The largest accepted argument count.
    pub max_args: usize,

    reduce: Option<ReduceFn>,
    approx: Option<ApproxFn>,
}

impl FuncDef {
    /// A function with no rules at all: calls stay symbolic.
    pub fn opaque(min_args: usize, max_args: usize) -> Self {
        Self { min_args, max_args, reduce: None, approx: None }
    }

    /// Attaches an exact reduction rule.
    pub fn with_reduce(mut self, reduce: ReduceFn) -> Self {
        self.reduce = Some(reduce);
        self
    }

    /// Attaches a numeric approximation.
    pub fn with_approx(mut self, approx: ApproxFn) -> Self {
        self.approx = Some(approx);
        self
    }
}

impl std::fmt::Debug for FuncDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FuncDef")
            .field("min_args", &self.min_args)
            .field("max_args", &self.max_args)
            .field("reduce", &self.reduce.is_some())
            .field("approx", &self.approx.is_some())
            .finish()
    }
}

/// The registry the driver dispatches calls through.
#[derive(Debug, Clone, Default)]
pub struct Functions {
    table: HashMap<String, FuncDef>,
}

impl Functions {
    /// Creates an empty registry.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The standard registry. The square-root and transparent-parentheses entries register
    /// under the names the settings reserve for them.
    pub fn standard(settings: &Settings) -> Self {
        let mut functions = Self::empty();

        macro_rules! register {
            ($($name:expr => $def:expr),* $(,)?) => {
                $(
                    functions.table.insert($name.to_string(), $def);
                )*
            };
        }

        register! {
            settings.sqrt_name => FuncDef::opaque(1, 1)
                .with_reduce(reduce_sqrt)
                .with_approx(approx_sqrt),
            settings.parens_name => FuncDef::opaque(1, 1).with_reduce(reduce_parens),
            "abs" => FuncDef::opaque(1, 1).with_reduce(reduce_abs).with_approx(approx_abs),
            "min" => FuncDef::opaque(1, usize::MAX).with_reduce(reduce_min),
            "max" => FuncDef::opaque(1, usize::MAX).with_reduce(reduce_max),
            "factorial" => FuncDef::opaque(1, 1).with_reduce(reduce_factorial),
            "vector" => FuncDef::opaque(1, usize::MAX),
            "sin" => FuncDef::opaque(1, 1).with_reduce(reduce_sin).with_approx(approx_sin),
            "cos" => FuncDef::opaque(1, 1).with_reduce(reduce_cos).with_approx(approx_cos),
            "tan" => FuncDef::opaque(1, 1).with_reduce(reduce_sin).with_approx(approx_tan),
            "asin" => FuncDef::opaque(1, 1).with_reduce(reduce_sin).with_approx(approx_asin),
            "acos" => FuncDef::opaque(1, 1)
                .with_reduce(reduce_cos_inverse)
                .with_approx(approx_acos),
            "atan" => FuncDef::opaque(1, 1).with_reduce(reduce_sin).with_approx(approx_atan),
            "exp" => FuncDef::opaque(1, 1).with_reduce(reduce_exp).with_approx(approx_exp),
            "log" => FuncDef::opaque(1, 1).with_reduce(reduce_log).with_approx(approx_log),
        }

        functions
    }

    /// Registers a function under the given name. The name must be a valid identifier.
    pub fn register(&mut self, name: &str, def: FuncDef) -> Result<(), Error> {
        symbra_parser::validate_name(name)?;
        self.table.insert(name.to_string(), def);
        Ok(())
    }

    /// Removes a function by name. Returns true if one was removed.
    pub fn remove(&mut self, name: &str) -> bool {
        self.table.remove(name).is_some()
    }

    /// Returns true if the name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.table.contains_key(name)
    }

    /// The descriptor registered under a name.
    pub fn get(&self, name: &str) -> Option<&FuncDef> {
        self.table.get(name)
    }

    /// Registered names within edit distance 1 of the given name.
    pub fn suggestions(&self, name: &str) -> Vec<String> {
        let mut out: Vec<String> = self
            .table
            .keys()
            .filter(|candidate| levenshtein(candidate, name) < 2)
            .cloned()
            .collect();
        out.sort();
        out
    }

    /// Dispatches a call: arity check, exact reduction, numeric approximation (in numeric
    /// mode), and finally the symbolic wrapper.
    pub fn call(
        &self,
        settings: &Settings,
        name: &str,
        args: Vec<Term>,
        span: Range<usize>,
        mode: EvalMode,
    ) -> Result<Term, Error> {
        let Some(def) = self.table.get(name) else {
            return Err(Error::new(
                vec![span],
                kind::UnknownFunction {
                    name: name.to_string(),
                    suggestions: self.suggestions(name),
                },
            ));
        };

        if args.len() < def.min_args || args.len() > def.max_args {
            return Err(Error::new(
                vec![span],
                kind::ArityMismatch {
                    name: name.to_string(),
                    min: def.min_args,
                    max: def.max_args,
                    given: args.len(),
                },
            ));
        }

        if mode == EvalMode::Numeric && args.iter().all(Term::is_number) {
            if let Some(approx) = def.approx {
                let values: Vec<Frac> = args.iter().map(|arg| arg.multiplier().clone()).collect();
                if let Some(result) = approx(settings, &values) {
                    return Ok(Term::number(result));
                }
            }
        }

        if let Some(reduce) = def.reduce {
            if let Some(reduced) = reduce(settings, &args)? {
                return Ok(reduced);
            }
        }

        Ok(Term::call(name, args))
    }
}

// --------------------------------------------------------------------------------------------
// exact reductions

fn reduce_sqrt(settings: &Settings, args: &[Term]) -> Result<Option<Term>, Error> {
    Ok(Some(kernel::sqrt(settings, args[0].clone())))
}

fn reduce_parens(_settings: &Settings, args: &[Term]) -> Result<Option<Term>, Error> {
    Ok(Some(args[0].clone()))
}

fn reduce_abs(_settings: &Settings, args: &[Term]) -> Result<Option<Term>, Error> {
    let arg = &args[0];
    if arg.is_number() {
        return Ok(Some(Term::number(arg.multiplier().clone().abs())));
    }
    Ok(None)
}

fn reduce_min(_settings: &Settings, args: &[Term]) -> Result<Option<Term>, Error> {
    fold_extremum(args, |candidate, best| candidate < best)
}

fn reduce_max(_settings: &Settings, args: &[Term]) -> Result<Option<Term>, Error> {
    fold_extremum(args, |candidate, best| candidate > best)
}

fn fold_extremum(
    args: &[Term],
    better: fn(&Frac, &Frac) -> bool,
) -> Result<Option<Term>, Error> {
    if !args.iter().all(Term::is_number) {
        return Ok(None);
    }
    let mut best = args[0].multiplier().clone();
    for arg in &args[1..] {
        if better(arg.multiplier(), &best) {
            best = arg.multiplier().clone();
        }
    }
    Ok(Some(Term::number(best)))
}

/// The largest factorial computed exactly.
const FACTORIAL_LIMIT: u32 = 10_000;

fn reduce_factorial(_settings: &Settings, args: &[Term]) -> Result<Option<Term>, Error> {
    let arg = &args[0];
    if !arg.is_integer() || arg.multiplier().is_negative() {
        return Ok(None);
    }
    let Some(n) = arg.multiplier().num().to_u32() else {
        return Ok(None);
    };
    if n > FACTORIAL_LIMIT {
        return Ok(None);
    }
    let value = Integer::from(Integer::factorial(n));
    Ok(Some(Term::number(Frac::from_integer(value))))
}

fn reduce_sin(_settings: &Settings, args: &[Term]) -> Result<Option<Term>, Error> {
    // sin(0) = tan(0) = asin(0) = atan(0) = 0
    if args[0].is_zero() {
        return Ok(Some(Term::zero()));
    }
    Ok(None)
}

fn reduce_cos(_settings: &Settings, args: &[Term]) -> Result<Option<Term>, Error> {
    // cos(0) = 1
    if args[0].is_zero() {
        return Ok(Some(Term::one()));
    }
    Ok(None)
}

fn reduce_cos_inverse(_settings: &Settings, args: &[Term]) -> Result<Option<Term>, Error> {
    // acos(1) = 0
    if args[0].is_one() {
        return Ok(Some(Term::zero()));
    }
    Ok(None)
}

fn reduce_exp(_settings: &Settings, args: &[Term]) -> Result<Option<Term>, Error> {
    // exp(0) = 1
    if args[0].is_zero() {
        return Ok(Some(Term::one()));
    }
    Ok(None)
}

fn reduce_log(_settings: &Settings, args: &[Term]) -> Result<Option<Term>, Error> {
    // log(1) = 0
    if args[0].is_one() {
        return Ok(Some(Term::zero()));
    }
    Ok(None)
}

// --------------------------------------------------------------------------------------------
// numeric approximations

/// Converts a float back into an exact decimal at the configured precision.
pub(crate) fn float_to_frac(settings: &Settings, value: &Float) -> Option<Frac> {
    if !value.is_finite() {
        return None;
    }
    let text = format!("{:.*}", settings.precision as usize, value);
    Frac::from_decimal(&text)
}

fn approx_sqrt(settings: &Settings, args: &[Frac]) -> Option<Frac> {
    if args[0].is_negative() {
        return None;
    }
    let bits = bits_for_digits(settings.precision);
    let value = args[0].to_float(bits).sqrt();
    float_to_frac(settings, &value)
}

fn approx_abs(_settings: &Settings, args: &[Frac]) -> Option<Frac> {
    Some(args[0].clone().abs())
}

macro_rules! float_approx {
    ($($name:ident => $method:ident),* $(,)?) => {
        $(
            fn $name(settings: &Settings, args: &[Frac]) -> Option<Frac> {
                let bits = bits_for_digits(settings.precision);
                let value = args[0].to_float(bits).$method();
                float_to_frac(settings, &value)
            }
        )*
    };
}

float_approx! {
    approx_sin => sin,
    approx_cos => cos,
    approx_tan => tan,
    approx_asin => asin,
    approx_acos => acos,
    approx_atan => atan,
    approx_exp => exp,
}

fn approx_log(settings: &Settings, args: &[Frac]) -> Option<Frac> {
    if args[0].sign() <= 0 {
        return None;
    }
    let bits = bits_for_digits(settings.precision);
    let value = args[0].to_float(bits).ln();
    float_to_frac(settings, &value)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use super::*;

    fn call(name: &str, args: Vec<Term>, mode: EvalMode) -> Result<Term, Error> {
        let settings = Settings::default();
        let functions = Functions::standard(&settings);
        functions.call(&settings, name, args, 0..0, mode)
    }

    #[test]
    fn sqrt_reduces_exactly() {
        let out = call("sqrt", vec![Term::int(4)], EvalMode::Symbolic).unwrap();
        assert_eq!(out, Term::int(2));
    }

    #[test]
    fn parens_are_transparent() {
        let out = call("parens", vec![Term::atom("x")], EvalMode::Symbolic).unwrap();
        assert_eq!(out, Term::atom("x"));
    }

    #[test]
    fn unreduced_calls_wrap() {
        let out = call("sin", vec![Term::atom("x")], EvalMode::Symbolic).unwrap();
        assert_eq!(out.fname(), Some("sin"));
        assert_eq!(out.text(), "sin(x)");
    }

    #[test]
    fn zero_arguments_reduce_in_trig() {
        assert_eq!(call("sin", vec![Term::zero()], EvalMode::Symbolic).unwrap(), Term::zero());
        assert_eq!(call("cos", vec![Term::zero()], EvalMode::Symbolic).unwrap(), Term::one());
        assert_eq!(call("exp", vec![Term::zero()], EvalMode::Symbolic).unwrap(), Term::one());
        assert_eq!(call("log", vec![Term::one()], EvalMode::Symbolic).unwrap(), Term::zero());
    }

    #[test]
    fn factorial_of_integers() {
        let out = call("factorial", vec![Term::int(5)], EvalMode::Symbolic).unwrap();
        assert_eq!(out, Term::int(120));

        // non-integers stay symbolic
        let out = call("factorial", vec![Term::atom("x")], EvalMode::Symbolic).unwrap();
        assert_eq!(out.fname(), Some("factorial"));
    }

    #[test]
    fn extrema_of_numbers() {
        let args = vec![Term::int(3), Term::int(-1), Term::int(2)];
        assert_eq!(call("min", args.clone(), EvalMode::Symbolic).unwrap(), Term::int(-1));
        assert_eq!(call("max", args, EvalMode::Symbolic).unwrap(), Term::int(3));
    }

    #[test]
    fn unknown_function_suggests_near_misses() {
        let err = call("sine", vec![Term::zero()], EvalMode::Symbolic).unwrap_err();
        let message = err.kind.help().unwrap_or_default();
        assert!(message.contains("sin"), "expected a suggestion in {message:?}");
    }

    #[test]
    fn arity_is_checked() {
        assert!(call("sqrt", vec![], EvalMode::Symbolic).is_err());
        assert!(call("sqrt", vec![Term::int(1), Term::int(2)], EvalMode::Symbolic).is_err());
    }

    #[test]
    fn numeric_mode_approximates() {
        let out = call("sqrt", vec![Term::int(2)], EvalMode::Numeric).unwrap();
        assert!(out.is_number());
        let text = out.multiplier().to_decimal(10);
        assert!(text.starts_with("1.41421356"), "got {text}");
    }
}
