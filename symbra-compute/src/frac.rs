//! Exact rationals backed by [`rug::Rational`], plus a distinguished infinity.
//!
//! A [`Frac`] is always in lowest terms with the sign on the numerator and a positive
//! denominator; [`rug::Rational`] maintains both invariants through every operation. The
//! infinity is a flag over a `±1` payload, never reduced, and saturates under arithmetic.

use crate::primitive::{bits_for_digits, int};
use rug::ops::Pow;
use rug::{Float, Integer, Rational};
use std::cmp::Ordering;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// An exact rational multiplier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Frac {
    value: Rational,
    infinite: bool,
}

impl Frac {
    /// Creates a fraction from a numerator and denominator. A zero denominator produces the
    /// signed infinity.
    pub fn new(num: impl Into<Integer>, den: impl Into<Integer>) -> Self {
        let num = num.into();
        let den = den.into();
        if den == 0 {
            return Self::infinity(if num < 0 { -1 } else { 1 });
        }
        Self { value: Rational::from((num, den)), infinite: false }
    }

    /// Creates a fraction from an integer.
    pub fn from_integer(n: impl Into<Integer>) -> Self {
        Self { value: Rational::from(n.into()), infinite: false }
    }

    pub fn zero() -> Self {
        Self::from_integer(0)
    }

    pub fn one() -> Self {
        Self::from_integer(1)
    }

    /// The distinguished infinity, with the given sign.
    pub fn infinity(sign: i32) -> Self {
        Self {
            value: Rational::from(if sign < 0 { -1 } else { 1 }),
            infinite: true,
        }
    }

    /// Reads a decimal literal such as `5`, `1.25` or `.5`. Returns [`None`] if the text is not
    /// a plain decimal number.
    pub fn from_decimal(text: &str) -> Option<Self> {
        let (sign, digits) = match text.strip_prefix('-') {
            Some(rest) => (-1, rest),
            None => (1, text),
        };

        let (int_part, frac_part) = match digits.split_once('.') {
            Some((i, f)) => (i, f),
            None => (digits, ""),
        };

        if int_part.is_empty() && frac_part.is_empty() {
            return None;
        }
        if !int_part.chars().all(|c| c.is_ascii_digit())
            || !frac_part.chars().all(|c| c.is_ascii_digit())
        {
            return None;
        }

        let joined = format!("{int_part}{frac_part}");
        let num: Integer = joined.parse().ok()?;
        let den = int(10).pow(frac_part.len() as u32);
        let mut out = Self::new(num, Integer::from(den));
        if sign < 0 {
            out = -out;
        }
        Some(out)
    }

    /// Reads the canonical fraction text emitted by [`fmt::Display`]: `p` or `p/q`.
    pub(crate) fn from_fraction_text(text: &str) -> Option<Self> {
        match text.split_once('/') {
            Some((num, den)) => {
                let num: Integer = num.parse().ok()?;
                let den: Integer = den.parse().ok()?;
                (den != 0).then(|| Self::new(num, den))
            },
            None => {
                let num: Integer = text.parse().ok()?;
                Some(Self::from_integer(num))
            },
        }
    }

    /// The numerator, with the sign of the fraction.
    pub fn num(&self) -> Integer {
        self.value.numer().clone()
    }

    /// The denominator; always positive.
    pub fn den(&self) -> Integer {
        self.value.denom().clone()
    }

    pub fn is_infinite(&self) -> bool {
        self.infinite
    }

    pub fn is_zero(&self) -> bool {
        !self.infinite && self.value.cmp0() == Ordering::Equal
    }

    pub fn is_one(&self) -> bool {
        !self.infinite && self.value == 1
    }

    pub fn is_negative(&self) -> bool {
        self.sign() < 0
    }

    /// Returns true if the denominator is 1.
    pub fn is_integer(&self) -> bool {
        !self.infinite && self.value.is_integer()
    }

    /// The sign of the fraction: -1, 0 or 1.
    pub fn sign(&self) -> i32 {
        match self.value.cmp0() {
            Ordering::Less => -1,
            Ordering::Equal => 0,
            Ordering::Greater => 1,
        }
    }

    /// The absolute value.
    pub fn abs(mut self) -> Self {
        self.value = self.value.abs();
        self
    }

    /// The reciprocal. Returns [`None`] for zero; the reciprocal of infinity is zero.
    pub fn invert(self) -> Option<Self> {
        if self.infinite {
            return Some(Self::zero());
        }
        if self.is_zero() {
            return None;
        }
        Some(Self { value: self.value.recip(), infinite: false })
    }

    /// Divides by another fraction. Returns [`None`] when dividing by zero.
    pub fn div(self, rhs: Self) -> Option<Self> {
        Some(self * rhs.invert()?)
    }

    /// Raises to an integer power. Returns [`None`] for a negative power of zero.
    pub fn pow_int(self, exp: i32) -> Option<Self> {
        if self.infinite {
            return Some(if exp < 0 { Self::zero() } else { self });
        }
        if self.is_zero() && exp < 0 {
            return None;
        }
        if self.is_zero() && exp == 0 {
            return Some(Self::one());
        }
        Some(Self { value: self.value.pow(exp), infinite: false })
    }

    /// The numeric value as a [`Float`] with the given precision in bits.
    pub fn to_float(&self, bits: u32) -> Float {
        Float::with_val(bits, &self.value)
    }

    /// Emits the value as a decimal string with up to `digits` digits after the point, trailing
    /// zeros trimmed.
    pub fn to_decimal(&self, digits: u32) -> String {
        if self.infinite {
            return if self.is_negative() { "-Infinity".into() } else { "Infinity".into() };
        }
        if self.is_integer() {
            return self.num().to_string();
        }

        let float = self.to_float(bits_for_digits(digits));
        let text = format!("{:.*}", digits as usize, float);
        let trimmed = text.trim_end_matches('0').trim_end_matches('.');
        trimmed.to_string()
    }
}

impl fmt::Display for Frac {
    /// The canonical text form: `5`, `-5`, or `5/4`. Infinity renders as `Infinity`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.infinite {
            if self.is_negative() {
                write!(f, "-Infinity")
            } else {
                write!(f, "Infinity")
            }
        } else {
            write!(f, "{}", self.value)
        }
    }
}

impl From<i64> for Frac {
    fn from(n: i64) -> Self {
        Self::from_integer(n)
    }
}

impl From<(i64, i64)> for Frac {
    fn from((num, den): (i64, i64)) -> Self {
        Self::new(num, den)
    }
}

impl std::ops::Add for Frac {
    type Output = Frac;

    fn add(self, rhs: Frac) -> Frac {
        match (self.infinite, rhs.infinite) {
            (true, _) => self,
            (false, true) => rhs,
            (false, false) => Frac { value: self.value + rhs.value, infinite: false },
        }
    }
}

impl std::ops::Sub for Frac {
    type Output = Frac;

    fn sub(self, rhs: Frac) -> Frac {
        self + (-rhs)
    }
}

impl std::ops::Mul for Frac {
    type Output = Frac;

    fn mul(self, rhs: Frac) -> Frac {
        if self.infinite || rhs.infinite {
            return Frac::infinity(self.sign() * rhs.sign());
        }
        Frac { value: self.value * rhs.value, infinite: false }
    }
}

impl std::ops::Neg for Frac {
    type Output = Frac;

    fn neg(mut self) -> Frac {
        self.value = -self.value;
        self
    }
}

impl PartialOrd for Frac {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Frac {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.infinite, other.infinite) {
            (true, true) => self.sign().cmp(&other.sign()),
            (true, false) => {
                if self.is_negative() { Ordering::Less } else { Ordering::Greater }
            },
            (false, true) => {
                if other.is_negative() { Ordering::Greater } else { Ordering::Less }
            },
            (false, false) => self.value.cmp(&other.value),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use super::*;

    #[test]
    fn reduction_is_automatic() {
        assert_eq!(Frac::new(2, 4), Frac::new(1, 2));
        assert_eq!(Frac::new(1, -2), Frac::new(-1, 2));
        assert_eq!(Frac::new(-1, 2).sign(), -1);
        assert_eq!(Frac::new(-1, 2).den(), 2);
    }

    #[test]
    fn decimal_literals() {
        assert_eq!(Frac::from_decimal("1.25"), Some(Frac::new(5, 4)));
        assert_eq!(Frac::from_decimal(".5"), Some(Frac::new(1, 2)));
        assert_eq!(Frac::from_decimal("5"), Some(Frac::from_integer(5)));
        assert_eq!(Frac::from_decimal("-0.75"), Some(Frac::new(-3, 4)));
        assert_eq!(Frac::from_decimal("1.2.3"), None);
        assert_eq!(Frac::from_decimal("x"), None);
    }

    #[test]
    fn arithmetic() {
        let half = Frac::new(1, 2);
        let third = Frac::new(1, 3);
        assert_eq!(half.clone() + third.clone(), Frac::new(5, 6));
        assert_eq!(half.clone() - third.clone(), Frac::new(1, 6));
        assert_eq!(half.clone() * third.clone(), Frac::new(1, 6));
        assert_eq!(half.div(third).unwrap(), Frac::new(3, 2));
    }

    #[test]
    fn inversion() {
        assert_eq!(Frac::new(2, 3).invert(), Some(Frac::new(3, 2)));
        assert_eq!(Frac::zero().invert(), None);
        assert_eq!(Frac::infinity(1).invert(), Some(Frac::zero()));
    }

    #[test]
    fn integer_powers() {
        assert_eq!(Frac::new(2, 3).pow_int(2), Some(Frac::new(4, 9)));
        assert_eq!(Frac::new(2, 3).pow_int(-1), Some(Frac::new(3, 2)));
        assert_eq!(Frac::zero().pow_int(-1), None);
        assert_eq!(Frac::zero().pow_int(0), Some(Frac::one()));
    }

    #[test]
    fn infinity_saturates() {
        let inf = Frac::infinity(1);
        assert!((inf.clone() + Frac::one()).is_infinite());
        assert!((inf.clone() * Frac::from_integer(-2)).is_negative());
        assert!(Frac::infinity(1) > Frac::from_integer(1_000_000));
        assert!(Frac::infinity(-1) < Frac::from_integer(-1_000_000));
    }

    #[test]
    fn display_and_round_trip() {
        assert_eq!(Frac::new(5, 4).to_string(), "5/4");
        assert_eq!(Frac::from_integer(-3).to_string(), "-3");
        assert_eq!(Frac::from_fraction_text("5/4"), Some(Frac::new(5, 4)));
        assert_eq!(Frac::from_fraction_text("-3"), Some(Frac::from_integer(-3)));
    }

    #[test]
    fn decimal_emission() {
        assert_eq!(Frac::new(1, 4).to_decimal(10), "0.25");
        assert_eq!(Frac::from_integer(7).to_decimal(10), "7");
        assert_eq!(Frac::new(1, 3).to_decimal(5), "0.33333");
    }
}
