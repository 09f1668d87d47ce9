//! The normalizing arithmetic kernel.
//!
//! Pure functions over owned [`Term`]s. Each operation promotes its operands into the smallest
//! composite group that can hold the result and demotes on the way out, so the following hold
//! after every call:
//!
//! - no child has multiplier zero;
//! - product children are stored unit-multiplier, with the sign and coefficient on the head;
//! - no composite holds a single child that could stand alone, and no composite is empty;
//! - rational powers are reduced, integer powers of surds fold into the multiplier, and a power
//!   term that collapses to a rational demotes the exponential back to its remembered group;
//! - every mutation path through a composite ends in [`Term::update_hash`].

use crate::ctxt::Settings;
use crate::error::{kind, Error};
use crate::frac::Frac;
use crate::primitive::int;
use crate::term::{Group, Power, Term};
use rug::ops::Pow;
use rug::Integer;

/// The name the kernel gives the imaginary unit it produces (even roots of negatives). The
/// parser-side name is configurable; the kernel's is fixed so that structural equality is stable
/// across contexts.
pub(crate) const IMAGINARY_NAME: &str = "i";

/// The hard ceiling on repeated-multiplication expansion, independent of the configured cap.
const EXPANSION_LIMIT: u32 = 128;

// --------------------------------------------------------------------------------------------
// negation and inversion

/// Flips the sign of a term.
pub fn negate(mut term: Term) -> Term {
    term.multiplier = -term.multiplier;
    term
}

/// Inverts a term: the multiplier is inverted and the power of every multiplicative factor is
/// negated. Errors on a zero term.
pub fn invert(term: Term) -> Result<Term, Error> {
    if term.is_zero() {
        return Err(Error::bare(kind::DivisionByZero));
    }
    if term.is_infinite() {
        return Ok(Term::zero());
    }

    let mut core = term;
    let multiplier = std::mem::replace(&mut core.multiplier, Frac::one());
    let inverted = match multiplier.invert() {
        Some(m) => m,
        None => return Err(Error::bare(kind::DivisionByZero)),
    };

    if core.group == Group::Number {
        return Ok(Term::number(inverted));
    }

    core.multiplier = inverted;
    Ok(scale_power(core, &Frac::from_integer(-1)))
}

// --------------------------------------------------------------------------------------------
// addition

/// Returns true if the terms differ at most in their multiplier.
fn like_terms(a: &Term, b: &Term) -> bool {
    a.group == b.group && a.value == b.value && a.power == b.power
}

/// Adds two terms, collapsing like terms and grouping the rest into sum composites.
pub fn add(a: Term, b: Term) -> Term {
    if a.is_infinite() {
        return Term::number(Frac::infinity(a.sign()));
    }
    if b.is_infinite() {
        return Term::number(Frac::infinity(b.sign()));
    }
    if a.is_zero() {
        return b;
    }
    if b.is_zero() {
        return a;
    }
    if a.group == Group::Number && b.group == Group::Number {
        return Term::number(a.multiplier + b.multiplier);
    }

    if like_terms(&a, &b) {
        let multiplier = a.multiplier.clone() + b.multiplier;
        if multiplier.is_zero() {
            return Term::zero();
        }
        let mut out = a;
        out.multiplier = multiplier;
        return out;
    }

    // flat insertion into an existing sum
    if a.group == Group::Polynomial && a.power.is_one() {
        return insert_into_sum(a, b);
    }
    if b.group == Group::Polynomial && b.power.is_one() {
        return insert_into_sum(b, a);
    }
    if a.group == Group::PowerChain && a.power.is_one() {
        return insert_into_chain(a, b);
    }
    if b.group == Group::PowerChain && b.power.is_one() {
        return insert_into_chain(b, a);
    }

    // same base, different power: group by exponent
    if a.group != Group::Number && b.group != Group::Number && a.base_text() == b.base_text() {
        let mut chain = Term::power_chain();
        chain.children.insert(a.key_for(Group::PowerChain), a);
        insert_power_summand(&mut chain, b);
        return finish_chain(chain);
    }

    let mut poly = Term::polynomial();
    poly.children.insert(a.key_for(Group::Polynomial), a);
    insert_into_sum(poly, b)
}

/// `add(a, negate(b))`.
pub fn subtract(a: Term, b: Term) -> Term {
    add(a, negate(b))
}

/// Inserts a term into a flat sum, distributing any held-up head multiplier first so that keyed
/// insertion stays correct.
fn insert_into_sum(mut poly: Term, term: Term) -> Term {
    if !poly.multiplier.is_one() {
        poly = distribute_multiplier(poly);
    }
    insert_summand(&mut poly, term);
    finish_sum(poly)
}

fn insert_summand(poly: &mut Term, term: Term) {
    if term.is_zero() {
        return;
    }

    match term.group {
        // another flat sum merges child-wise
        Group::Polynomial | Group::PowerChain if term.power.is_one() => {
            let term = distribute_multiplier(term);
            for (_, child) in term.children {
                insert_summand(poly, child);
            }
        },
        _ => {
            let key = term.key_for(Group::Polynomial);
            match poly.children.remove(&key) {
                Some(existing) => {
                    // same content hash means like terms: coefficients add
                    let combined = add(existing, term);
                    if !combined.is_zero() {
                        poly.children.insert(key, combined);
                    }
                },
                None => {
                    poly.children.insert(key, term);
                },
            }
        },
    }
}

fn finish_sum(mut poly: Term) -> Term {
    match poly.children.len() {
        0 => Term::zero(),
        1 => poly
            .children
            .into_values()
            .next()
            .expect("length checked"),
        _ => {
            // a sum whose surviving terms all share one base regroups by exponent, so that
            // cancellation cannot leave `x + x^2` shaped differently than a direct parse of it
            let shared_base = {
                let mut bases = poly.children.values().map(Term::base_text);
                let first = bases.next().expect("length checked");
                bases.all(|base| base == first).then_some(first)
            };
            match shared_base {
                Some(_) if poly.group == Group::Polynomial => {
                    let mut chain = Term::power_chain();
                    chain.multiplier = poly.multiplier;
                    for (_, child) in poly.children {
                        chain.children.insert(child.key_for(Group::PowerChain), child);
                    }
                    chain.update_hash();
                    chain
                },
                _ => {
                    poly.update_hash();
                    poly
                },
            }
        },
    }
}

/// Inserts a term into a same-base power chain, falling back to a general sum when the bases
/// differ.
fn insert_into_chain(mut chain: Term, term: Term) -> Term {
    let base = chain.chain_base();
    let merges = match term.group {
        Group::PowerChain => term.power.is_one() && term.chain_base() == base,
        Group::Number => false,
        _ => term.base_text() == base,
    };

    if !merges {
        // the chain dissolves into the general sum, so grouping does not depend on the order
        // the terms arrived in
        let mut poly = Term::polynomial();
        insert_summand(&mut poly, chain);
        insert_summand(&mut poly, term);
        return finish_sum(poly);
    }

    if !chain.multiplier.is_one() {
        chain = distribute_multiplier(chain);
    }

    if term.group == Group::PowerChain {
        let term = distribute_multiplier(term);
        for (_, child) in term.children {
            insert_power_summand(&mut chain, child);
        }
    } else {
        insert_power_summand(&mut chain, term);
    }
    finish_chain(chain)
}

fn insert_power_summand(chain: &mut Term, term: Term) {
    if term.is_zero() {
        return;
    }
    let key = term.key_for(Group::PowerChain);
    match chain.children.remove(&key) {
        Some(existing) => {
            let combined = add(existing, term);
            if !combined.is_zero() {
                chain.children.insert(key, combined);
            }
        },
        None => {
            chain.children.insert(key, term);
        },
    }
}

fn finish_chain(mut chain: Term) -> Term {
    match chain.children.len() {
        0 => Term::zero(),
        1 => chain.children.into_values().next().expect("length checked"),
        _ => {
            chain.update_hash();
            chain
        },
    }
}

/// Pushes a held-up head multiplier into the children of a sum. Products keep their head
/// multiplier (that is their canonical form), and powered composites hold theirs up by
/// definition.
pub fn distribute_multiplier(mut term: Term) -> Term {
    if !matches!(term.group, Group::Polynomial | Group::PowerChain)
        || !term.power.is_one()
        || term.multiplier.is_one()
    {
        return term;
    }

    let multiplier = std::mem::replace(&mut term.multiplier, Frac::one());
    for child in term.children.values_mut() {
        child.multiplier = child.multiplier.clone() * multiplier.clone();
    }
    term.update_hash();
    term
}

// --------------------------------------------------------------------------------------------
// multiplication

/// Multiplies two terms, folding powers on equal bases and grouping the rest into a product.
pub fn multiply(a: Term, b: Term) -> Term {
    if a.is_infinite() || b.is_infinite() {
        return Term::number(Frac::infinity(a.sign() * b.sign()));
    }
    if a.is_zero() || b.is_zero() {
        return Term::zero();
    }
    if a.group == Group::Number && b.group == Group::Number {
        return Term::number(a.multiplier * b.multiplier);
    }
    if a.group == Group::Number {
        let mut out = b;
        out.multiplier = out.multiplier * a.multiplier;
        return out;
    }
    if b.group == Group::Number {
        let mut out = a;
        out.multiplier = out.multiplier * b.multiplier;
        return out;
    }

    if a.base_text() == b.base_text() {
        return combine_same_base(a, b);
    }

    if a.group == Group::Product {
        return insert_into_product(a, b);
    }
    if b.group == Group::Product {
        return insert_into_product(b, a);
    }

    let mut product = Term::product();
    product.multiplier = a.multiplier.clone() * b.multiplier.clone();
    let mut a = a;
    let mut b = b;
    a.multiplier = Frac::one();
    b.multiplier = Frac::one();
    product.children.insert(a.key_for(Group::Product), a);
    product.children.insert(b.key_for(Group::Product), b);
    product.update_hash();
    product
}

/// `multiply(a, invert(b))`.
pub fn divide(a: Term, b: Term) -> Result<Term, Error> {
    Ok(multiply(a, invert(b)?))
}

/// Multiplies two terms that share a base hash by adding their powers.
fn combine_same_base(a: Term, b: Term) -> Term {
    let multiplier = a.multiplier.clone() * b.multiplier.clone();

    match (a.power.clone(), b.power.clone()) {
        (Power::Rational(p), Power::Rational(q)) => {
            let mut core = a;
            core.multiplier = multiplier;
            set_rational_power(core, p + q)
        },
        (pa, pb) => {
            let total = add(power_as_term(pa), power_as_term(pb));
            let mut core = a;
            core.multiplier = multiplier;
            set_term_power(core, total)
        },
    }
}

fn power_as_term(power: Power) -> Term {
    match power {
        Power::Rational(p) => Term::number(p),
        Power::Term(t) => *t,
    }
}

/// Inserts a factor into a product, keeping the head multiplier aggregated and every child
/// unit-multiplier.
fn insert_into_product(mut product: Term, term: Term) -> Term {
    insert_factor(&mut product, term);
    finish_product(product)
}

fn insert_factor(product: &mut Term, mut term: Term) {
    product.multiplier =
        product.multiplier.clone() * std::mem::replace(&mut term.multiplier, Frac::one());

    match term.group {
        Group::Number => {},
        // nested products flatten
        Group::Product => {
            for (_, child) in std::mem::take(&mut term.children) {
                insert_factor(product, child);
            }
        },
        _ => {
            let key = term.key_for(Group::Product);
            match product.children.remove(&key) {
                Some(existing) => {
                    // equal bases: powers add; any fold lands in the multiplier and floats up
                    let mut combined = combine_same_base(existing, term);
                    product.multiplier = product.multiplier.clone()
                        * std::mem::replace(&mut combined.multiplier, Frac::one());
                    match combined.group {
                        Group::Number => {},
                        Group::Product => {
                            for (_, child) in std::mem::take(&mut combined.children) {
                                insert_factor(product, child);
                            }
                        },
                        _ => {
                            let key = combined.key_for(Group::Product);
                            product.children.insert(key, combined);
                        },
                    }
                },
                None => {
                    product.children.insert(key, term);
                },
            }
        },
    }
}

fn finish_product(mut product: Term) -> Term {
    match product.children.len() {
        0 => Term::number(product.multiplier),
        1 => {
            let mut child = product
                .children
                .into_values()
                .next()
                .expect("length checked");
            child.multiplier = product.multiplier;
            child
        },
        _ => {
            product.update_hash();
            product
        },
    }
}

// --------------------------------------------------------------------------------------------
// exponentiation

/// Raises a term to a power.
///
/// `x^0` is 1 (including `0^0`), `x^1` is `x`, `0^n` is 0 for positive `n` and the distinguished
/// infinity for negative `n`. Integer exponents distribute over products; sums expand by
/// repeated multiplication when the exponent is a non-negative integer within
/// [`Settings::expansion_cap`]; fractional exponents on integer bases build surds with full
/// radical extraction; symbolic exponents promote the base to [`Group::Exponential`].
pub fn pow(settings: &Settings, base: Term, exp: Term) -> Term {
    if exp.is_number() {
        let e = exp.multiplier;
        if e.is_zero() {
            return Term::one();
        }
        if base.is_zero() {
            return if e.is_negative() { Term::infinity() } else { Term::zero() };
        }
        if e.is_one() {
            return base;
        }
        if base.group == Group::Number {
            return pow_rational(base.multiplier, e);
        }

        let mut core = base;
        let m = std::mem::replace(&mut core.multiplier, Frac::one());
        let m_pow = if m.is_one() { Term::one() } else { pow_rational(m, e.clone()) };

        // small integer powers of sums expand when the context allows it
        if matches!(core.group, Group::Polynomial | Group::PowerChain)
            && core.power.is_one()
            && e.is_integer()
            && !e.is_negative()
            && !e.is_one()
            && settings.expansion_cap > 0
            && e <= Frac::from_integer(i64::from(settings.expansion_cap.min(EXPANSION_LIMIT)))
        {
            let n = e.num().to_u32().unwrap_or(0);
            let mut acc = Term::one();
            for _ in 0..n {
                acc = mul_distribute(acc, core.clone());
            }
            return multiply(m_pow, acc);
        }

        let core_pow = scale_power(core, &e);
        return multiply(m_pow, core_pow);
    }

    // symbolic exponent
    if base.is_zero() {
        return Term::zero();
    }
    let mut core = base;
    let m = std::mem::replace(&mut core.multiplier, Frac::one());
    let m_pow = if m.is_one() {
        Term::one()
    } else {
        set_term_power(Term::number(m), exp.clone())
    };
    if core.group == Group::Number {
        // the remaining core is exactly 1
        return m_pow;
    }

    // exponent chaining: (b^p)^q = b^(p*q)
    let existing = std::mem::replace(&mut core.power, Power::one());
    let total = match existing {
        Power::Rational(p) if p.is_one() => exp,
        Power::Rational(p) => multiply(exp, Term::number(p)),
        Power::Term(p) => multiply(exp, *p),
    };
    multiply(m_pow, set_term_power(core, total))
}

/// `pow(x, 1/2)`, with perfect squares folding and partial radical extraction.
pub fn sqrt(settings: &Settings, term: Term) -> Term {
    pow(settings, term, Term::number(Frac::new(1, 2)))
}

/// Replaces a term's power with 1, demoting exponentials back to their remembered group. Used
/// by the numeric driver to take a base apart from its exponent.
pub(crate) fn unit_power(term: Term) -> Term {
    set_rational_power(term, Frac::one())
}

/// Multiplies a term's existing power by a rational factor.
fn scale_power(term: Term, factor: &Frac) -> Term {
    match term.power.clone() {
        Power::Rational(q) => set_rational_power(term, q * factor.clone()),
        Power::Term(p) => {
            let mut core = term;
            core.power = Power::one();
            let scaled = multiply(*p, Term::number(factor.clone()));
            set_term_power(core, scaled)
        },
    }
}

/// Replaces a term's power with a rational, normalizing the result: zero powers collapse, surds
/// re-extract, exponentials demote to their remembered group, and products distribute the
/// exponent onto their children.
fn set_rational_power(mut term: Term, p: Frac) -> Term {
    if p.is_zero() {
        return Term::number(term.multiplier);
    }

    match term.group {
        Group::Number => {
            let m = term.multiplier;
            if m.is_zero() {
                return Term::zero();
            }
            pow_rational(m, p)
        },
        Group::Surd => {
            let base = match Frac::from_fraction_text(&term.value) {
                Some(base) => base,
                None => {
                    term.power = Power::Rational(p);
                    return term;
                },
            };
            multiply(Term::number(term.multiplier), pow_rational(base, p))
        },
        Group::Atom => {
            if term.imaginary && p.is_integer() {
                let fold = imaginary_power(&p.num());
                return multiply(Term::number(term.multiplier), fold);
            }
            term.power = Power::Rational(p);
            term
        },
        Group::Function => {
            term.power = Power::Rational(p);
            term
        },
        Group::Exponential => {
            // the power collapsed back to a rational: restore the remembered group
            let previous = term.previous_group.take().unwrap_or(Group::Atom);
            term.group = previous;
            term.power = Power::one();
            match previous {
                Group::Number | Group::Surd => {
                    let base = match Frac::from_fraction_text(&term.value) {
                        Some(base) => base,
                        None => {
                            term.power = Power::Rational(p);
                            return term;
                        },
                    };
                    multiply(Term::number(term.multiplier), pow_rational(base, p))
                },
                _ => set_rational_power(term, p),
            }
        },
        Group::PowerChain | Group::Polynomial => {
            term.power = Power::Rational(p);
            term
        },
        Group::Product => {
            // the exponent distributes onto every factor
            let multiplier = std::mem::replace(&mut term.multiplier, Frac::one());
            let mut out = Term::number(multiplier);
            for (_, child) in std::mem::take(&mut term.children) {
                out = multiply(out, scale_power(child, &p));
            }
            out
        },
    }
}

/// Replaces a term's power with a symbolic exponent, promoting to
/// [`Group::Exponential`] and remembering the group for later demotion. A power term that is
/// actually numeric falls through to the rational path instead.
fn set_term_power(mut term: Term, p: Term) -> Term {
    if p.is_number() {
        return set_rational_power(term, p.multiplier);
    }

    match term.group {
        Group::Number => {
            let m = std::mem::replace(&mut term.multiplier, Frac::one());
            term.value = m.to_string();
            term.group = Group::Exponential;
            term.previous_group = Some(Group::Number);
            term.power = Power::Term(Box::new(p));
            term
        },
        Group::Exponential => {
            term.power = Power::Term(Box::new(p));
            term
        },
        group => {
            term.previous_group = Some(group);
            term.group = Group::Exponential;
            term.power = Power::Term(Box::new(p));
            term
        },
    }
}

// --------------------------------------------------------------------------------------------
// rational exponentiation

/// `i^n` for an integer `n`.
fn imaginary_power(n: &Integer) -> Term {
    let mut residue = Integer::from(n % Integer::from(4));
    if residue < 0 {
        residue += 4;
    }
    match residue.to_u32().unwrap_or(0) {
        0 => Term::one(),
        1 => Term::imaginary_unit(IMAGINARY_NAME),
        2 => Term::int(-1),
        _ => negate(Term::imaginary_unit(IMAGINARY_NAME)),
    }
}

/// A surd with no further extraction applied.
fn raw_surd(value: impl ToString, power: Frac, multiplier: Frac) -> Term {
    let mut term = Term::atom(value.to_string());
    term.group = Group::Surd;
    term.power = Power::Rational(power);
    term.multiplier = multiplier;
    term
}

/// Saturates a power whose exponent is too large to represent.
fn saturate_pow(m: &Frac, e: &Frac) -> Term {
    let magnitude = m.clone().abs();
    if magnitude.is_one() {
        return Term::one();
    }
    let grows = (magnitude > Frac::one()) != e.is_negative();
    if grows { Term::infinity() } else { Term::zero() }
}

/// Raises a non-zero rational to a rational power, returning a number when the result is
/// rational and a (partially extracted) surd otherwise. Even roots of negatives factor through
/// the imaginary unit when they are square roots.
fn pow_rational(m: Frac, e: Frac) -> Term {
    if m.is_infinite() {
        return if e.is_negative() { Term::zero() } else { Term::number(m) };
    }

    if e.is_integer() {
        return match e.num().to_i32() {
            Some(k) => match m.clone().pow_int(k) {
                Some(v) => Term::number(v),
                None => Term::infinity(),
            },
            None => saturate_pow(&m, &e),
        };
    }

    let Some(root) = e.den().to_u32() else {
        return raw_surd(&m, e, Frac::one());
    };
    let a = e.num();

    let negative = m.is_negative();
    let p = m.num().abs();
    let q = m.den();

    let num_part = int_root_pow(p, a.clone(), root);
    let den_part = int_root_pow(q, Integer::from(-a.clone()), root);
    let mut out = multiply(num_part, den_part);

    if negative {
        if root == 2 {
            out = multiply(out, imaginary_power(&a));
        } else if root % 2 == 1 {
            if a.is_odd() {
                out = negate(out);
            }
        } else {
            // an even root of a negative that is not a square root stays unevaluated
            return raw_surd(&m, e, Frac::one());
        }
    }

    out
}

/// `n^(a/b)` for a positive integer `n`: raises to `|a|`, extracts every factor that is a
/// perfect `b`-th power, and inverts if `a` is negative.
fn int_root_pow(n: Integer, a: Integer, b: u32) -> Term {
    if n == 1 || a == 0 {
        return Term::one();
    }

    let inverted = a < 0;
    let Some(a_abs) = Integer::from(a.abs_ref()).to_u32() else {
        return saturate_pow(
            &Frac::from_integer(n),
            &if inverted { Frac::from_integer(-1) } else { Frac::one() },
        );
    };

    let raised = Integer::from((&n).pow(a_abs));
    let (outside, inside) = extract_root(raised, b);

    if inverted {
        if inside == 1 {
            Term::number(Frac::new(1, outside))
        } else {
            raw_surd(inside, Frac::new(-1, i64::from(b)), Frac::new(1, outside))
        }
    } else if inside == 1 {
        Term::number(Frac::from_integer(outside))
    } else {
        raw_surd(inside, Frac::new(1, i64::from(b)), Frac::from_integer(outside))
    }
}

/// Splits `n` into the largest factor that is a perfect `b`-th power (returned as its root) and
/// the remainder, by trial-division prime factorization.
fn extract_root(mut n: Integer, b: u32) -> (Integer, Integer) {
    let mut outside = int(1);
    let mut inside = int(1);

    let mut p = int(2);
    while Integer::from(&p * &p) <= n {
        if n.is_divisible(&p) {
            let mut count = 0u32;
            while n.is_divisible(&p) {
                n /= &p;
                count += 1;
            }
            outside *= Integer::from((&p).pow(count / b));
            inside *= Integer::from((&p).pow(count % b));
        }
        p += 1;
    }
    if n > 1 {
        inside *= n;
    }

    (outside, inside)
}

// --------------------------------------------------------------------------------------------
// expansion

/// Expands products of sums and integer powers of sums by distribution: `(x+1)^2` becomes
/// `x^2+2*x+1`. Other shapes pass through with their children expanded.
pub fn expand(term: Term) -> Term {
    match term.group {
        Group::Polynomial | Group::PowerChain => {
            // the head multiplier sits outside the power: t = m * (sum)^p
            let power = term.power.clone();
            let mut flat = term;
            flat.power = Power::one();
            let multiplier = std::mem::replace(&mut flat.multiplier, Frac::one());

            let mut sum = Term::zero();
            for (_, child) in flat.children {
                sum = add(sum, expand(child));
            }

            let raised = match power {
                Power::Rational(p) if p.is_one() => sum,
                Power::Rational(p)
                    if p.is_integer()
                        && !p.is_negative()
                        && p <= Frac::from_integer(i64::from(EXPANSION_LIMIT)) =>
                {
                    let n = p.num().to_u32().unwrap_or(1);
                    let mut acc = Term::one();
                    for _ in 0..n {
                        acc = mul_distribute(acc, sum.clone());
                    }
                    acc
                },
                Power::Rational(p) => set_rational_power(sum, p),
                Power::Term(p) => set_term_power(sum, *p),
            };
            multiply(Term::number(multiplier), raised)
        },
        Group::Product => {
            let multiplier = term.multiplier.clone();
            let mut out = Term::number(multiplier);
            for (_, child) in term.children {
                out = mul_distribute(out, expand(child));
            }
            out
        },
        Group::Function => {
            let mut out = term;
            out.args = out.args.into_iter().map(expand).collect();
            out.update_hash();
            out
        },
        _ => term,
    }
}

/// Multiplication that distributes over flat sums: `(a+b)*c = a*c + b*c`.
fn mul_distribute(a: Term, b: Term) -> Term {
    let a_is_sum = matches!(a.group, Group::Polynomial | Group::PowerChain) && a.power.is_one();
    let b_is_sum = matches!(b.group, Group::Polynomial | Group::PowerChain) && b.power.is_one();

    if a_is_sum {
        let a = distribute_multiplier(a);
        let mut out = Term::zero();
        for (_, child) in a.children {
            out = add(out, mul_distribute(child, b.clone()));
        }
        out
    } else if b_is_sum {
        mul_distribute(b, a)
    } else {
        multiply(a, b)
    }
}

#[cfg(test)]
mod tests {
    use crate::term::CONST_HASH;
    use pretty_assertions::assert_eq;
    use super::*;

    fn settings() -> Settings {
        Settings::default()
    }

    fn x() -> Term {
        Term::atom("x")
    }

    fn y() -> Term {
        Term::atom("y")
    }

    fn x_pow(p: i64) -> Term {
        let mut t = x();
        t.power = Power::Rational(Frac::from_integer(p));
        t
    }

    #[test]
    fn like_terms_collapse() {
        assert_eq!(add(x(), x()).text(), "2*x");
        let five_x = add(multiply(Term::int(2), x()), multiply(Term::int(3), x()));
        assert_eq!(five_x.text(), "5*x");
    }

    #[test]
    fn opposite_terms_cancel_to_zero() {
        let three_a = multiply(Term::int(3), Term::atom("a"));
        let out = subtract(three_a.clone(), three_a);
        assert!(out.is_zero());
        assert!(out.is_number());
    }

    #[test]
    fn zero_is_absorbed() {
        let out = add(multiply(Term::zero(), x()), y());
        assert_eq!(out, y());
    }

    #[test]
    fn sums_are_canonically_commutative() {
        let abc = add(add(Term::atom("a"), Term::atom("b")), Term::atom("c"));
        let cab = add(add(Term::atom("c"), Term::atom("a")), Term::atom("b"));
        assert_eq!(abc, cab);
        assert_eq!(abc.text(), "a+b+c");
    }

    #[test]
    fn products_are_canonically_commutative() {
        let abc = multiply(multiply(Term::atom("a"), Term::atom("b")), Term::atom("c"));
        let cab = multiply(multiply(Term::atom("c"), Term::atom("a")), Term::atom("b"));
        assert_eq!(abc, cab);
        assert_eq!(abc.text(), "a*b*c");
    }

    #[test]
    fn same_base_powers_group_into_a_chain() {
        let chain = add(x(), x_pow(2));
        assert_eq!(chain.group(), Group::PowerChain);
        assert_eq!(chain.text(), "x+x^2");

        // and collapse back out when a term cancels
        let back = subtract(chain, x_pow(2));
        assert_eq!(back, x());
    }

    #[test]
    fn product_children_stay_unit_multiplier() {
        let three_x = multiply(Term::int(3), x());
        let two_y = multiply(Term::int(2), y());
        let product = multiply(three_x, two_y);

        assert_eq!(product.group(), Group::Product);
        assert_eq!(product.multiplier(), &Frac::from_integer(6));
        for child in product.children().values() {
            assert!(child.multiplier().is_one());
        }
    }

    #[test]
    fn no_zero_children_survive() {
        // x*y + x - x*y leaves only x
        let xy = multiply(x(), y());
        let sum = add(xy.clone(), x());
        let out = subtract(sum, xy);
        assert_eq!(out, x());
    }

    #[test]
    fn exponents_fold_on_equal_bases() {
        let out = multiply(x_pow(2), x_pow(3));
        assert_eq!(out.text(), "x^5");

        let cancelled = multiply(x_pow(2), x_pow(-2));
        assert!(cancelled.is_one());
    }

    #[test]
    fn division_by_self_is_one() {
        let out = divide(x(), x()).unwrap();
        assert!(out.is_one());
    }

    #[test]
    fn double_reciprocal_returns_the_term() {
        let out = invert(invert(x()).unwrap()).unwrap();
        assert_eq!(out, x());
    }

    #[test]
    fn division_by_zero_is_an_error() {
        assert!(invert(Term::zero()).is_err());
        assert!(divide(x(), Term::zero()).is_err());
    }

    #[test]
    fn pow_degenerate_cases() {
        let s = settings();
        assert!(pow(&s, x(), Term::zero()).is_one());
        assert!(pow(&s, Term::zero(), Term::zero()).is_one());
        assert_eq!(pow(&s, x(), Term::one()), x());
        assert!(pow(&s, Term::zero(), Term::int(3)).is_zero());
        assert!(pow(&s, Term::zero(), Term::int(-1)).is_infinite());
    }

    #[test]
    fn integer_power_distributes_over_a_coefficient() {
        // (2x)^3 = 8x^3
        let s = settings();
        let out = pow(&s, multiply(Term::int(2), x()), Term::int(3));
        assert_eq!(out.text(), "8*x^3");
    }

    #[test]
    fn integer_power_distributes_over_a_product() {
        let s = settings();
        let out = pow(&s, multiply(x(), y()), Term::int(2));
        assert_eq!(out.text(), "x^2*y^2");
    }

    #[test]
    fn perfect_square_roots_fold() {
        let s = settings();
        assert_eq!(sqrt(&s, Term::int(4)), Term::int(2));
        assert_eq!(sqrt(&s, Term::int(9)), Term::int(3));
    }

    #[test]
    fn partial_radical_extraction() {
        let s = settings();
        let root_eight = sqrt(&s, Term::int(8));
        let two_root_two = multiply(Term::int(2), sqrt(&s, Term::int(2)));
        assert_eq!(root_eight, two_root_two);
        assert_eq!(root_eight.text(), "2*2^(1/2)");
    }

    #[test]
    fn surd_products_refold() {
        let s = settings();
        let root_two = sqrt(&s, Term::int(2));
        assert_eq!(multiply(root_two.clone(), root_two), Term::int(2));
    }

    #[test]
    fn square_root_of_a_negative_is_imaginary() {
        let s = settings();
        let out = sqrt(&s, Term::int(-4));
        assert!(out.is_imaginary());
        assert_eq!(out.text(), "2*i");
    }

    #[test]
    fn odd_root_of_a_negative_is_negative() {
        let s = settings();
        let out = pow(&s, Term::int(-8), Term::number(Frac::new(1, 3)));
        assert_eq!(out, Term::int(-2));
    }

    #[test]
    fn imaginary_unit_squares_to_minus_one() {
        let i = Term::imaginary_unit(IMAGINARY_NAME);
        assert_eq!(multiply(i.clone(), i), Term::int(-1));
    }

    #[test]
    fn exponent_chaining_multiplies() {
        // (x^2)^3 = x^6
        let s = settings();
        let out = pow(&s, x_pow(2), Term::int(3));
        assert_eq!(out.text(), "x^6");
    }

    #[test]
    fn symbolic_exponent_promotes_and_demotes() {
        let s = settings();
        let powed = pow(&s, x(), y());
        assert_eq!(powed.group(), Group::Exponential);
        assert_eq!(powed.text(), "x^(y)");

        // (x^y)^(1/y) demotes back to the atom
        let back = pow(&s, powed, invert(y()).unwrap());
        assert_eq!(back, x());
    }

    #[test]
    fn numeric_base_with_symbolic_exponent() {
        let s = settings();
        let out = pow(&s, Term::int(2), x());
        assert_eq!(out.group(), Group::Exponential);
        assert_eq!(out.text(), "2^(x)");

        // 2^x * 2^y = 2^(x+y)
        let with_y = pow(&s, Term::int(2), y());
        let combined = multiply(out, with_y);
        assert_eq!(combined.text(), "2^(x+y)");
    }

    #[test]
    fn expansion_distributes_squares() {
        let s = settings();
        let base = add(x(), Term::one());
        let squared = pow(&s, base, Term::int(2));
        // unexpanded by default
        assert_eq!(squared.text(), "(1+x)^2");

        let expanded = expand(squared);
        let direct = add(add(x_pow(2), multiply(Term::int(2), x())), Term::one());
        assert_eq!(expanded, direct);
    }

    #[test]
    fn expansion_cap_expands_inside_pow() {
        let mut s = settings();
        s.expansion_cap = 4;
        let base = add(x(), Term::one());
        let squared = pow(&s, base, Term::int(2));
        let direct = add(add(x_pow(2), multiply(Term::int(2), x())), Term::one());
        assert_eq!(squared, direct);
    }

    #[test]
    fn lazy_multiplier_is_held_up() {
        // 2*(x+y) keeps its head multiplier until a flat insertion forces distribution
        let sum = add(x(), y());
        let doubled = multiply(Term::int(2), sum);
        assert_eq!(doubled.multiplier(), &Frac::from_integer(2));
        assert_eq!(doubled.text(), "2*(x+y)");

        let distributed = distribute_multiplier(doubled);
        assert!(distributed.multiplier().is_one());
        assert_eq!(distributed.text(), "2*x+2*y");
    }

    #[test]
    fn numbers_inside_sums_share_a_key() {
        let sum = add(add(x(), Term::int(2)), Term::int(3));
        assert_eq!(sum.children().len(), 2);
        assert!(sum.children().contains_key(CONST_HASH));
        assert_eq!(sum.text(), "5+x");
    }
}
