//! The evaluation context: settings, operator and bracket tables, the function registry and the
//! preprocessor pipeline, bundled into one injectable record.
//!
//! Nothing in this crate reads process-global state. Every entry point hangs off a [`Ctxt`], and
//! [`Ctxt::default`] provides the convenience context with the standard tables.

use crate::error::Error;
use crate::eval::{self, EvalMode};
use crate::frac::Frac;
use crate::funcs::Functions;
use crate::kernel;
use crate::term::Term;
use std::collections::HashMap;
use symbra_parser::{
    build_tree, BracketTable, FunctionOracle, OperatorDictionary, Preprocessors, Tokenizer,
    UnitTable,
};

/// The recognized settings. All of them are plain data; the context owns a copy and nothing
/// mutates them behind the caller's back.
#[derive(Debug, Clone)]
pub struct Settings {
    /// The identity-hash sentinel for numeric terms. Exposed for inspection; the kernel relies
    /// on a single process-wide sentinel, so changing it is not supported.
    pub const_hash: String,

    /// The atom name the driver recognizes as the imaginary unit.
    pub imaginary_unit: String,

    /// The name the square-root unwrap optimization registers under.
    pub sqrt_name: String,

    /// The name the transparent-parentheses wrapper registers under.
    pub parens_name: String,

    /// The glyph used for exponentiation when rendering canonical text.
    pub power_operator: String,

    /// When false, unknown alphanumeric runs split into single-letter products (`abc` reads as
    /// `a*b*c`).
    pub use_multichar_vars: bool,

    /// When false, no implicit multiplication is inserted during preparation.
    pub implied_multiplication: bool,

    /// Decimal digits of precision for numeric folding and `to_decimal`.
    pub precision: u32,

    /// The largest integer exponent `pow` expands over sums by repeated multiplication. Zero
    /// disables automatic expansion (the explicit `expand` transform is unaffected).
    pub expansion_cap: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            const_hash: crate::term::CONST_HASH.to_string(),
            imaginary_unit: "i".to_string(),
            sqrt_name: "sqrt".to_string(),
            parens_name: "parens".to_string(),
            power_operator: "^".to_string(),
            use_multichar_vars: true,
            implied_multiplication: true,
            precision: 21,
            expansion_cap: 0,
        }
    }
}

/// A context to use when parsing and evaluating expressions: the settings plus every injected
/// table the tokenizer and driver consume.
#[derive(Debug, Clone)]
pub struct Ctxt {
    pub settings: Settings,

    /// Operator glyphs and their descriptors.
    pub operators: OperatorDictionary,

    /// Bracket families.
    pub brackets: BracketTable,

    /// Names recognized as units of measure.
    pub units: UnitTable,

    /// The function registry calls dispatch through.
    pub functions: Functions,

    /// User preprocessing hooks, applied before the built-in preparation.
    pub preprocessors: Preprocessors,
}

impl Default for Ctxt {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

impl Ctxt {
    /// Creates a context with the standard operator, bracket and function tables under the
    /// given settings.
    pub fn new(settings: Settings) -> Self {
        let functions = Functions::standard(&settings);
        Self {
            settings,
            operators: OperatorDictionary::default(),
            brackets: BracketTable::default(),
            units: UnitTable::new(),
            functions,
            preprocessors: Preprocessors::new(),
        }
    }

    fn tokenizer(&self) -> Tokenizer<'_> {
        Tokenizer::new(&self.operators, &self.brackets, &self.units, self)
            .multichar_vars(self.settings.use_multichar_vars)
            .implied_mul(self.settings.implied_multiplication)
    }

    /// Runs the preprocessor pipeline on an expression without scanning it. Preparing the
    /// output again returns it unchanged.
    pub fn prepare(&self, expression: &str) -> String {
        self.tokenizer().prepare(expression, &self.preprocessors)
    }

    /// Parses an expression into a canonical term.
    pub fn parse(&self, expression: &str) -> Result<Term, Error> {
        self.parse_with(expression, &HashMap::new())
    }

    /// Parses an expression, substituting the named atoms before dispatch.
    pub fn parse_with(
        &self,
        expression: &str,
        substitutions: &HashMap<String, Term>,
    ) -> Result<Term, Error> {
        self.run(expression, substitutions, EvalMode::Symbolic)
    }

    /// Parses an expression with numeric folding: surds, named constants and function calls
    /// over constants collapse to decimals at the configured precision.
    pub fn parse_numeric(&self, expression: &str) -> Result<Term, Error> {
        self.run(expression, &HashMap::new(), EvalMode::Numeric)
    }

    fn run(
        &self,
        expression: &str,
        substitutions: &HashMap<String, Term>,
        mode: EvalMode,
    ) -> Result<Term, Error> {
        let tokenizer = self.tokenizer();
        let prepared = tokenizer.prepare(expression, &self.preprocessors);
        let scope = tokenizer.tokenize(&prepared)?;
        let node = build_tree(scope)?;
        eval::eval_node(self, &node, substitutions, mode)
    }

    /// Builds a substitution map from `(name, expression)` pairs, validating each name and
    /// parsing each expression in this context.
    pub fn substitutions(
        &self,
        pairs: &[(&str, &str)],
    ) -> Result<HashMap<String, Term>, Error> {
        let mut out = HashMap::new();
        for (name, expression) in pairs {
            symbra_parser::validate_name(name)?;
            out.insert(name.to_string(), self.parse(expression)?);
        }
        Ok(out)
    }

    /// Re-runs the kernel over a term with numeric folding, the same semantics
    /// [`Ctxt::parse_numeric`] applies while parsing.
    pub fn evaluate(&self, term: &Term) -> Result<Term, Error> {
        eval::approx_term(self, term)
    }

    /// The canonical text of a term, honoring the configured power operator.
    pub fn text(&self, term: &Term) -> String {
        let text = term.text();
        if self.settings.power_operator == "^" {
            text
        } else {
            text.replace('^', &self.settings.power_operator)
        }
    }

    // ------------------------------------------------------------------------------------------
    // arithmetic entry points

    pub fn add(&self, a: Term, b: Term) -> Term {
        kernel::add(a, b)
    }

    pub fn subtract(&self, a: Term, b: Term) -> Term {
        kernel::subtract(a, b)
    }

    pub fn multiply(&self, a: Term, b: Term) -> Term {
        kernel::multiply(a, b)
    }

    pub fn divide(&self, a: Term, b: Term) -> Result<Term, Error> {
        kernel::divide(a, b)
    }

    pub fn pow(&self, base: Term, exp: Term) -> Term {
        kernel::pow(&self.settings, base, exp)
    }

    pub fn sqrt(&self, term: Term) -> Term {
        kernel::sqrt(&self.settings, term)
    }

    pub fn expand(&self, term: Term) -> Term {
        kernel::expand(term)
    }

    /// A decimal rendering of a numeric term at the given precision. Non-numeric terms render
    /// canonically.
    pub fn to_decimal(&self, term: &Term, precision: u32) -> String {
        if term.is_number() {
            term.multiplier().to_decimal(precision)
        } else {
            self.text(term)
        }
    }
}

impl FunctionOracle for Ctxt {
    fn is_function(&self, name: &str) -> bool {
        self.functions.contains(name)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use super::*;

    #[test]
    fn default_context_parses() {
        let ctxt = Ctxt::default();
        assert_eq!(ctxt.parse("1+1").unwrap(), Term::int(2));
    }

    #[test]
    fn preparation_is_idempotent() {
        let ctxt = Ctxt::default();
        let once = ctxt.prepare("2x + 3(y+1)sin x");
        let twice = ctxt.prepare(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn user_preprocessors_run_first() {
        let mut ctxt = Ctxt::default();
        ctxt.preprocessors
            .add("degrees", Arc::new(|s: &str| s.replace("°", "*pi/180")))
            .unwrap();
        let term = ctxt.parse("180°").unwrap();
        assert_eq!(term, ctxt.parse("pi").unwrap());
    }

    #[test]
    fn single_letter_variable_mode() {
        let mut settings = Settings::default();
        settings.use_multichar_vars = false;
        let ctxt = Ctxt::new(settings);

        let split = ctxt.parse("abc").unwrap();
        let explicit = ctxt.parse("a*b*c").unwrap();
        assert_eq!(split, explicit);
    }

    #[test]
    fn implied_multiplication_can_be_disabled() {
        let mut settings = Settings::default();
        settings.implied_multiplication = false;
        let ctxt = Ctxt::new(settings);

        // `2x` now scans as one malformed literal instead of `2*x`
        assert!(ctxt.parse("2x").is_err());
    }

    #[test]
    fn power_operator_renders_in_text() {
        let mut settings = Settings::default();
        settings.power_operator = "**".to_string();
        let ctxt = Ctxt::new(settings);

        let term = crate::kernel::pow(&ctxt.settings, Term::atom("x"), Term::int(2));
        assert_eq!(ctxt.text(&term), "x**2");
    }

    #[test]
    fn decimal_rendering() {
        let ctxt = Ctxt::default();
        let half = ctxt.parse("1/2").unwrap();
        assert_eq!(ctxt.to_decimal(&half, 10), "0.5");
    }
}
