//! Tokenizing and operator-tree construction for symbolic expressions.
//!
//! This crate turns an expression string into a spanned operator tree in three injected-table
//! driven steps:
//!
//! 1. **Preparation** ([`tokenizer::prepare`]): user hooks, whitespace normalization,
//!    scientific-notation expansion, and implicit-multiplication insertion to a fixpoint.
//! 2. **Scanning** ([`tokenizer::Tokenizer::tokenize`]): one forward pass producing a tree of
//!    scopes, with function application and the space-opened argument rule resolved in place.
//! 3. **Tree construction** ([`tree::build_tree`]): per-scope shunting into a single [`tree::
//!    Node`].
//!
//! The crate knows nothing about evaluation; operator tokens carry an
//! [`tokenizer::op::OpAction`] that a downstream evaluator dispatches on.

pub mod error;
pub mod tokenizer;
pub mod tree;

pub use error::Error;
pub use tokenizer::op::{
    Associativity, Bracket, BracketTable, FunctionOracle, FunctionSet, OpAction,
    OperatorDescriptor, OperatorDictionary, UnitTable,
};
pub use tokenizer::prepare::{PreprocessorAction, Preprocessors};
pub use tokenizer::token::{Scope, ScopeItem, ScopeKind, Token, TokenKind};
pub use tokenizer::Tokenizer;
pub use tree::{build_sequence, build_tree, Node};

/// Checks that an identifier is usable as a variable, function or preprocessor name: a letter or
/// underscore followed by letters, digits or underscores.
pub fn validate_name(name: &str) -> Result<(), Error> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_alphabetic() || first == '_')
                && chars.all(|c| c.is_alphanumeric() || c == '_')
        },
        None => false,
    };

    if valid {
        Ok(())
    } else {
        Err(Error::new(
            vec![0..name.chars().count()],
            error::kind::InvalidName { name: name.to_string() },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_validation() {
        assert!(validate_name("x").is_ok());
        assert!(validate_name("x_2").is_ok());
        assert!(validate_name("_tmp").is_ok());
        assert!(validate_name("2x").is_err());
        assert!(validate_name("").is_err());
        assert!(validate_name("a-b").is_err());
    }
}
