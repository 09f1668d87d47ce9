//! Named constants recognized by the evaluation driver, and their numeric values.

use crate::primitive::{float, NUMERIC_BITS};
use once_cell::sync::Lazy;
use rug::{float::Constant, Float};

/// The names the driver treats as symbolic constants rather than variables. The imaginary unit is
/// configured separately (see [`Settings::imaginary_unit`](crate::ctxt::Settings)).
pub const RESERVED: &[&str] = &["pi", "e", "phi", "tau"];

pub static PI: Lazy<Float> = Lazy::new(|| float(NUMERIC_BITS, Constant::Pi));

/// Euler's number.
pub static E: Lazy<Float> = Lazy::new(|| float(NUMERIC_BITS, 1).exp());

/// The golden ratio.
pub static PHI: Lazy<Float> = Lazy::new(|| (float(NUMERIC_BITS, 5).sqrt() + 1u32) / 2u32);

pub static TAU: Lazy<Float> = Lazy::new(|| float(NUMERIC_BITS, Constant::Pi) * 2u32);

/// Returns true if the name denotes a symbolic constant.
pub fn is_reserved(name: &str) -> bool {
    RESERVED.contains(&name)
}

/// The numeric value of a named constant at the requested precision, if the name is reserved.
pub fn value(name: &str, bits: u32) -> Option<Float> {
    match name {
        "pi" => Some(float(bits, Constant::Pi)),
        "e" => Some(float(bits, 1).exp()),
        "phi" => Some((float(bits, 5).sqrt() + 1u32) / 2u32),
        "tau" => Some(float(bits, Constant::Pi) * 2u32),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_names_have_values() {
        for name in RESERVED {
            assert!(value(name, 64).is_some(), "{name} has no numeric value");
        }
        assert!(value("x", 64).is_none());
    }

    #[test]
    fn tau_is_twice_pi() {
        let tau = value("tau", 64).unwrap();
        let pi = value("pi", 64).unwrap();
        assert_eq!(tau, pi * 2u32);
    }
}
