//! The canonical symbolic term.
//!
//! A [`Term`] is a group-tagged value: the [`Group`] determines which fields are meaningful and
//! how the term hashes into a parent's child map. Every term carries an exact rational
//! multiplier out front and a power; for most groups the power is rational, and only
//! [`Group::Exponential`] stores another term there (see [`Power`]).
//!
//! Composite groups ([`Group::PowerChain`], [`Group::Polynomial`], [`Group::Product`]) store
//! their children in a [`BTreeMap`] keyed by a deterministic per-group hash, so two structurally
//! equal sums or products collide exactly when they are semantically equal and canonical text
//! emission is reproducible without sorting.
//!
//! Terms are value-typed: the kernel clones its inputs before mutation and returns owned
//! outputs. There are no back-pointers; a term's power may itself be a term, but ownership is
//! strictly tree-shaped.

use crate::consts;
use crate::error::{kind, Error};
use crate::frac::Frac;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::hash::{Hash, Hasher};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The identity hash carried by every pure-numeric term. All numbers collide on this key inside
/// a sum, which is what makes their coefficients add.
pub const CONST_HASH: &str = "#";

/// The structural shape of a term.
///
/// Declared in promotion order: operations that outgrow a group promote the term to a later
/// group, and simplification demotes it back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Group {
    /// A pure numeric constant; all information lives in the multiplier.
    Number,

    /// An integer raised to a non-integer rational power, such as `2^(1/2)`. The value holds the
    /// integer base.
    Surd,

    /// A symbolic atom: a variable or a named constant such as `pi`.
    Atom,

    /// A term whose power is another term, such as `2^x`.
    Exponential,

    /// A function application; the arguments are held in order, separately from children.
    Function,

    /// A sum of terms sharing one base, keyed by power: `x + x^2`.
    PowerChain,

    /// A general sum, keyed by content hash: `x + y^2 + sin(x)`.
    Polynomial,

    /// A product, keyed by base hash; the multiplier floats to the head and every child stays
    /// unit-multiplier.
    Product,
}

/// A term's exponent: rational for every group except [`Group::Exponential`], which stores a
/// full term.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Power {
    Rational(Frac),
    Term(Box<Term>),
}

impl Power {
    pub fn one() -> Self {
        Power::Rational(Frac::one())
    }

    pub fn is_one(&self) -> bool {
        matches!(self, Power::Rational(p) if p.is_one())
    }

    pub fn as_rational(&self) -> Option<&Frac> {
        match self {
            Power::Rational(p) => Some(p),
            Power::Term(_) => None,
        }
    }

    pub fn as_term(&self) -> Option<&Term> {
        match self {
            Power::Rational(_) => None,
            Power::Term(t) => Some(t),
        }
    }

    /// The text used when keying a power chain by exponent.
    pub(crate) fn key_text(&self) -> String {
        match self {
            Power::Rational(p) => p.to_string(),
            Power::Term(t) => t.text(),
        }
    }
}

impl Hash for Power {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Power::Rational(p) => {
                0u8.hash(state);
                p.hash(state);
            },
            Power::Term(t) => {
                1u8.hash(state);
                t.hash(state);
            },
        }
    }
}

/// The canonical symbolic term. See the [module documentation](self) for the shape invariants.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Term {
    pub(crate) group: Group,

    /// The rational coefficient out front.
    pub(crate) multiplier: Frac,

    /// The exponent. Kernel normalization keeps [`Power::Term`] non-numeric: a power term that
    /// collapses to a number demotes back to [`Power::Rational`].
    pub(crate) power: Power,

    /// The identity hash. For atoms and surds this is the name / base; for functions and
    /// composites it is derived from the arguments / children by [`Term::update_hash`].
    pub(crate) value: String,

    /// The group this term had before promotion to [`Group::Exponential`], restored when the
    /// power collapses back to a rational.
    pub(crate) previous_group: Option<Group>,

    /// The function name, for [`Group::Function`] only.
    pub(crate) fname: Option<String>,

    /// The ordered arguments, for [`Group::Function`] only.
    pub(crate) args: Vec<Term>,

    /// The children of a composite, keyed per group (see [`Term::key_for`]).
    pub(crate) children: BTreeMap<String, Term>,

    /// Set on the imaginary unit (and kept through promotion).
    pub(crate) imaginary: bool,

    /// Set on the distinguished infinity.
    pub(crate) infinite: bool,

    /// Set on unit-of-measure atoms.
    pub(crate) unit: bool,
}

impl Term {
    fn bare(group: Group, value: impl Into<String>) -> Self {
        Self {
            group,
            multiplier: Frac::one(),
            power: Power::one(),
            value: value.into(),
            previous_group: None,
            fname: None,
            args: Vec::new(),
            children: BTreeMap::new(),
            imaginary: false,
            infinite: false,
            unit: false,
        }
    }

    /// A pure numeric term.
    pub fn number(multiplier: Frac) -> Self {
        let mut term = Self::bare(Group::Number, CONST_HASH);
        term.infinite = multiplier.is_infinite();
        term.multiplier = multiplier;
        term
    }

    /// A numeric term from an integer.
    pub fn int(n: i64) -> Self {
        Self::number(Frac::from_integer(n))
    }

    pub fn zero() -> Self {
        Self::int(0)
    }

    pub fn one() -> Self {
        Self::int(1)
    }

    /// The distinguished infinity.
    pub fn infinity() -> Self {
        Self::number(Frac::infinity(1))
    }

    /// A symbolic atom.
    pub fn atom(name: impl Into<String>) -> Self {
        Self::bare(Group::Atom, name)
    }

    /// The imaginary unit under the given name.
    pub fn imaginary_unit(name: impl Into<String>) -> Self {
        let mut term = Self::atom(name);
        term.imaginary = true;
        term
    }

    /// A unit-of-measure atom.
    pub fn unit(name: impl Into<String>) -> Self {
        let mut term = Self::atom(name);
        term.unit = true;
        term
    }

    /// A function application. The identity hash is derived from the name and arguments.
    pub fn call(name: impl Into<String>, args: Vec<Term>) -> Self {
        let name = name.into();
        let mut term = Self::bare(Group::Function, "");
        term.fname = Some(name);
        term.args = args;
        term.update_hash();
        term
    }

    /// An empty general sum. Kernel-internal; the empty composite is not canonical.
    pub(crate) fn polynomial() -> Self {
        Self::bare(Group::Polynomial, "")
    }

    /// An empty same-base sum. The shared base is recoverable from any child (see
    /// [`Term::chain_base`]); the identity hash is derived from the children like any other
    /// composite.
    pub(crate) fn power_chain() -> Self {
        Self::bare(Group::PowerChain, "")
    }

    /// The base hash every child of a power chain shares.
    pub(crate) fn chain_base(&self) -> String {
        self.children
            .values()
            .next()
            .map(Term::base_text)
            .unwrap_or_default()
    }

    /// An empty product.
    pub(crate) fn product() -> Self {
        Self::bare(Group::Product, "")
    }

    pub fn group(&self) -> Group {
        self.group
    }

    pub fn multiplier(&self) -> &Frac {
        &self.multiplier
    }

    pub fn power(&self) -> &Power {
        &self.power
    }

    /// The identity hash.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// The function name, for function terms.
    pub fn fname(&self) -> Option<&str> {
        self.fname.as_deref()
    }

    /// The ordered arguments, for function terms.
    pub fn args(&self) -> &[Term] {
        &self.args
    }

    /// The child map, for composite terms.
    pub fn children(&self) -> &BTreeMap<String, Term> {
        &self.children
    }

    /// Returns true if this term is a composite (has a child map).
    pub fn is_composite(&self) -> bool {
        matches!(self.group, Group::PowerChain | Group::Polynomial | Group::Product)
    }

    // ------------------------------------------------------------------------------------------
    // hashing and canonical text

    /// The multiplier prefix of the canonical text: empty for 1, a bare minus for -1,
    /// `m*` otherwise.
    fn multiplier_prefix(&self) -> String {
        if self.multiplier.is_one() {
            String::new()
        } else if (self.multiplier.clone().abs()).is_one() && self.multiplier.is_negative() {
            "-".to_string()
        } else {
            format!("{}*", self.multiplier)
        }
    }

    /// The power suffix of the canonical text: empty for 1, `^n` for non-negative integers,
    /// `^(p)` otherwise.
    fn power_suffix(&self) -> String {
        match &self.power {
            Power::Rational(p) if p.is_one() => String::new(),
            Power::Rational(p) if p.is_integer() && !p.is_negative() => format!("^{p}"),
            Power::Rational(p) => format!("^({p})"),
            Power::Term(t) => format!("^({})", t.text()),
        }
    }

    /// Joins child texts with `+`, folding `+-` into `-`.
    fn joined_children(&self) -> String {
        let mut out = String::new();
        for (i, child) in self.children.values().enumerate() {
            let text = child.text();
            if i > 0 && !text.starts_with('-') {
                out.push('+');
            }
            out.push_str(&text);
        }
        out
    }

    /// A factor's text inside a product: sums get wrapped so `2*(x+1)*y` never flattens into
    /// `2*x+1*y`.
    fn factor_text(&self) -> String {
        match self.group {
            Group::PowerChain | Group::Polynomial if self.power.is_one() => {
                format!("({})", self.text())
            },
            _ => self.text(),
        }
    }

    /// The base body of an exponential: the promoted composite's children if any, the stored
    /// value otherwise.
    fn exponential_base(&self) -> String {
        if self.children.is_empty() {
            self.value.clone()
        } else {
            format!("({})", self.joined_children())
        }
    }

    /// The canonical text of this term, including multiplier and power. This is the form used
    /// for hashing and for round-tripping through the parser.
    pub fn text(&self) -> String {
        match self.group {
            Group::Number => self.multiplier.to_string(),
            Group::Atom | Group::Surd => {
                // a negative surd base needs brackets so `(-8)^(1/4)` does not read as a
                // negated power
                let body = if self.group == Group::Surd && self.value.starts_with('-') {
                    format!("({})", self.value)
                } else {
                    self.value.clone()
                };
                format!("{}{}{}", self.multiplier_prefix(), body, self.power_suffix())
            },
            Group::Function => {
                format!("{}{}{}", self.multiplier_prefix(), self.value, self.power_suffix())
            },
            Group::Exponential => {
                format!("{}{}{}", self.multiplier_prefix(), self.exponential_base(), self.power_suffix())
            },
            Group::PowerChain | Group::Polynomial => {
                let joined = self.joined_children();
                if self.multiplier.is_one() && self.power.is_one() {
                    joined
                } else {
                    format!("{}({}){}", self.multiplier_prefix(), joined, self.power_suffix())
                }
            },
            Group::Product => {
                let body = self
                    .children
                    .values()
                    .map(Term::factor_text)
                    .collect::<Vec<_>>()
                    .join("*");
                format!("{}{}", self.multiplier_prefix(), body)
            },
        }
    }

    /// The canonical text with power and multiplier excluded: the identity a product keys its
    /// children by, so `x^2` and `x^3` collide on the same base.
    pub fn base_text(&self) -> String {
        match self.group {
            Group::Number => CONST_HASH.to_string(),
            Group::Atom | Group::Surd | Group::Function => self.value.clone(),
            Group::Exponential => self.exponential_base(),
            Group::PowerChain | Group::Polynomial | Group::Product => {
                format!("({})", self.value)
            },
        }
    }

    /// The canonical text with multiplier excluded but power included: the identity a sum keys
    /// its children by, so `3x` and `5x` collide and coefficients add.
    pub fn content_text(&self) -> String {
        match self.group {
            Group::Number => CONST_HASH.to_string(),
            _ => format!("{}{}", self.base_text(), self.power_suffix()),
        }
    }

    /// The key this term inserts under in a parent of the given group.
    pub fn key_for(&self, parent: Group) -> String {
        match parent {
            Group::Product => self.base_text(),
            Group::PowerChain => self.power.key_text(),
            _ => self.content_text(),
        }
    }

    /// Recomputes the identity hash from the children / arguments. Every kernel mutation path
    /// that touches a composite ends with this.
    pub(crate) fn update_hash(&mut self) {
        match self.group {
            Group::Function => {
                let args = self
                    .args
                    .iter()
                    .map(Term::text)
                    .collect::<Vec<_>>()
                    .join(",");
                let name = self.fname.as_deref().unwrap_or_default();
                self.value = format!("{name}({args})");
            },
            Group::PowerChain | Group::Polynomial => {
                self.value = self.joined_children();
            },
            Group::Product => {
                self.value = self
                    .children
                    .values()
                    .map(Term::factor_text)
                    .collect::<Vec<_>>()
                    .join("*");
            },
            _ => {},
        }
    }

    // ------------------------------------------------------------------------------------------
    // observers

    /// Structural equality; an alias for `==`.
    pub fn equals(&self, other: &Term) -> bool {
        self == other
    }

    /// Returns true if this term is a pure number.
    pub fn is_number(&self) -> bool {
        self.group == Group::Number
    }

    /// Returns true if the term evaluates to zero: the multiplier annihilates everything else.
    pub fn is_zero(&self) -> bool {
        self.multiplier.is_zero()
    }

    /// Returns true if this term is exactly the number 1.
    pub fn is_one(&self) -> bool {
        self.group == Group::Number && self.multiplier.is_one()
    }

    /// Returns true if this term is the number 1 or -1.
    pub fn is_one_abs(&self) -> bool {
        self.group == Group::Number && self.multiplier.clone().abs().is_one()
    }

    /// Returns true if this term is an integer.
    pub fn is_integer(&self) -> bool {
        self.group == Group::Number && self.multiplier.is_integer()
    }

    pub fn is_infinite(&self) -> bool {
        self.infinite || self.multiplier.is_infinite()
    }

    /// Returns true if no variable occurs anywhere in the term. Named constants, the imaginary
    /// unit and plain numbers are constant; units of measure are not.
    pub fn is_constant(&self) -> bool {
        let mut vars = BTreeSet::new();
        self.collect_variables(&mut vars);
        vars.is_empty() && !self.has_unit()
    }

    /// Returns true if the imaginary unit occurs anywhere in the term.
    pub fn is_imaginary(&self) -> bool {
        if self.imaginary {
            return true;
        }
        if self.args.iter().any(Term::is_imaginary) {
            return true;
        }
        if self.children.values().any(Term::is_imaginary) {
            return true;
        }
        match &self.power {
            Power::Term(t) => t.is_imaginary(),
            Power::Rational(_) => false,
        }
    }

    fn has_unit(&self) -> bool {
        self.unit
            || self.args.iter().any(Term::has_unit)
            || self.children.values().any(Term::has_unit)
    }

    /// Returns true if the term is a polynomial: numbers, atoms with non-negative integer
    /// powers, and sums / products of those. Surds count as constant coefficients.
    pub fn is_poly(&self) -> bool {
        let power_ok = match &self.power {
            Power::Rational(p) => p.is_integer() && !p.is_negative(),
            Power::Term(_) => false,
        };
        match self.group {
            Group::Number | Group::Surd => true,
            Group::Atom => power_ok,
            Group::Function | Group::Exponential => false,
            Group::PowerChain | Group::Polynomial | Group::Product => {
                power_ok && self.children.values().all(Term::is_poly)
            },
        }
    }

    /// Returns true if the term is a polynomial of degree at most one in each variable.
    pub fn is_linear(&self) -> bool {
        match self.group {
            Group::Number | Group::Surd => true,
            Group::Atom => self.power.is_one(),
            Group::Function | Group::Exponential => false,
            Group::PowerChain | Group::Polynomial | Group::Product => {
                self.power.is_one() && self.children.values().all(Term::is_linear)
            },
        }
    }

    /// Returns true if the named atom occurs anywhere in the term.
    pub fn contains(&self, name: &str) -> bool {
        let here = match self.group {
            Group::Atom => self.value == name,
            // an exponential promoted from an atom keeps the atom's name in its value
            Group::Exponential => {
                self.previous_group == Some(Group::Atom) && self.value == name
            },
            _ => false,
        };
        here
            || self.args.iter().any(|arg| arg.contains(name))
            || self.children.values().any(|child| child.contains(name))
            || matches!(&self.power, Power::Term(t) if t.contains(name))
    }

    fn collect_variables(&self, out: &mut BTreeSet<String>) {
        let named_atom = match self.group {
            Group::Atom => true,
            Group::Exponential => self.previous_group == Some(Group::Atom),
            _ => false,
        };
        if named_atom && !self.imaginary && !self.unit && !consts::is_reserved(&self.value) {
            out.insert(self.value.clone());
        }

        for arg in &self.args {
            arg.collect_variables(out);
        }
        for child in self.children.values() {
            child.collect_variables(out);
        }
        if let Power::Term(t) = &self.power {
            t.collect_variables(out);
        }
    }

    /// All variable names occurring in the term, in alphabetical order. Named constants, units
    /// and the imaginary unit are excluded.
    pub fn variables(&self) -> Vec<String> {
        let mut out = BTreeSet::new();
        self.collect_variables(&mut out);
        out.into_iter().collect()
    }

    /// The numerator of the multiplier, as a term.
    pub fn num(&self) -> Term {
        Term::number(Frac::from_integer(self.multiplier.num()))
    }

    /// The denominator of the multiplier, as a term.
    pub fn denom(&self) -> Term {
        Term::number(Frac::from_integer(self.multiplier.den()))
    }

    /// The sign of the multiplier: -1, 0 or 1.
    pub fn sign(&self) -> i32 {
        self.multiplier.sign()
    }

    /// Numeric less-than. Errors unless both terms are plain numbers.
    pub fn lt(&self, other: &Term) -> Result<bool, Error> {
        if self.is_number() && other.is_number() {
            Ok(self.multiplier < other.multiplier)
        } else {
            Err(Error::bare(kind::NonNumericComparison))
        }
    }

    /// Numeric greater-than. Errors unless both terms are plain numbers.
    pub fn gt(&self, other: &Term) -> Result<bool, Error> {
        if self.is_number() && other.is_number() {
            Ok(self.multiplier > other.multiplier)
        } else {
            Err(Error::bare(kind::NonNumericComparison))
        }
    }
}

/// Structural equality: group, value, multiplier, power, arguments and children must all agree.
/// The promotion bookkeeping (`previous_group`) does not participate.
impl PartialEq for Term {
    fn eq(&self, other: &Self) -> bool {
        self.group == other.group
            && self.value == other.value
            && self.multiplier == other.multiplier
            && self.power == other.power
            && self.fname == other.fname
            && self.args == other.args
            && self.children == other.children
            && self.imaginary == other.imaginary
            && self.infinite == other.infinite
            && self.unit == other.unit
    }
}

impl Eq for Term {}

/// Hashes the identity fields only. The children and arguments are covered by `value`, which
/// [`Term::update_hash`] keeps current on every kernel mutation path.
impl Hash for Term {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.group.hash(state);
        self.value.hash(state);
        self.multiplier.hash(state);
        self.power.hash(state);
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use super::*;

    #[test]
    fn clone_fidelity() {
        let term = Term::call("sin", vec![Term::atom("x")]);
        let copy = term.clone();
        assert!(term.equals(&copy));
        assert_eq!(term, copy);
    }

    #[test]
    fn numbers_share_the_constant_hash() {
        assert_eq!(Term::int(3).value(), CONST_HASH);
        assert_eq!(Term::int(3).key_for(Group::Polynomial), CONST_HASH);
        assert_eq!(Term::int(5).key_for(Group::Polynomial), CONST_HASH);
    }

    #[test]
    fn canonical_text_forms() {
        assert_eq!(Term::int(5).text(), "5");
        assert_eq!(Term::number(Frac::new(5, 4)).text(), "5/4");
        assert_eq!(Term::atom("x").text(), "x");

        let mut two_x = Term::atom("x");
        two_x.multiplier = Frac::from_integer(2);
        assert_eq!(two_x.text(), "2*x");

        let mut neg_x = Term::atom("x");
        neg_x.multiplier = Frac::from_integer(-1);
        assert_eq!(neg_x.text(), "-x");

        let mut x_sq = Term::atom("x");
        x_sq.power = Power::Rational(Frac::from_integer(2));
        assert_eq!(x_sq.text(), "x^2");

        let mut x_neg = Term::atom("x");
        x_neg.power = Power::Rational(Frac::from_integer(-1));
        assert_eq!(x_neg.text(), "x^(-1)");

        assert_eq!(Term::call("sin", vec![Term::atom("x")]).text(), "sin(x)");
    }

    #[test]
    fn keys_differ_by_parent_group() {
        let mut x_sq = Term::atom("x");
        x_sq.power = Power::Rational(Frac::from_integer(2));
        x_sq.multiplier = Frac::from_integer(3);

        // products key by base, sums key by content, chains key by power
        assert_eq!(x_sq.key_for(Group::Product), "x");
        assert_eq!(x_sq.key_for(Group::Polynomial), "x^2");
        assert_eq!(x_sq.key_for(Group::PowerChain), "2");
    }

    #[test]
    fn equality_ignores_promotion_bookkeeping() {
        let mut a = Term::atom("x");
        a.previous_group = Some(Group::Number);
        let b = Term::atom("x");
        assert_eq!(a, b);
    }

    #[test]
    fn equality_is_structural() {
        let mut a = Term::atom("x");
        a.multiplier = Frac::from_integer(2);
        let b = Term::atom("x");
        assert_ne!(a, b);
        assert_ne!(Term::atom("x"), Term::atom("y"));
        assert_ne!(Term::int(0), Term::atom("x"));
    }

    #[test]
    fn variable_enumeration() {
        let term = Term::call(
            "f",
            vec![Term::atom("b"), Term::atom("a"), Term::atom("pi"), Term::imaginary_unit("i")],
        );
        assert_eq!(term.variables(), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn contains_descends_into_arguments() {
        let term = Term::call("sin", vec![Term::atom("x")]);
        assert!(term.contains("x"));
        assert!(!term.contains("y"));
    }

    #[test]
    fn predicate_variants_are_distinct() {
        let one = Term::one();
        let neg_one = Term::int(-1);
        assert!(one.is_one() && one.is_one_abs());
        assert!(!neg_one.is_one() && neg_one.is_one_abs());

        assert!(Term::atom("pi").is_constant());
        assert!(!Term::atom("pi").is_number());
        assert!(Term::int(4).is_number() && Term::int(4).is_constant());
        assert!(!Term::atom("x").is_constant());
        assert!(!Term::unit("km").is_constant());
    }

    #[test]
    fn ordering_is_numeric_only() {
        assert!(Term::int(2).lt(&Term::int(3)).unwrap());
        assert!(Term::int(3).gt(&Term::int(2)).unwrap());
        assert!(Term::atom("x").lt(&Term::int(3)).is_err());
    }
}
