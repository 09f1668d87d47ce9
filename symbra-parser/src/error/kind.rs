//! Error kinds raised by the tokenizer and the operator-tree builder.

use ariadne::Fmt;
use symbra_error::{ErrorKind, EXPR, OP};

/// A bracket was opened but never closed.
#[derive(Debug, Clone, PartialEq)]
pub struct UnclosedBracket {
    /// The 1-based column the bracket was opened at.
    pub column: usize,
}

impl ErrorKind for UnclosedBracket {
    fn message(&self) -> String {
        format!("unclosed bracket at column {}", self.column)
    }

    fn labels(&self) -> Vec<String> {
        vec!["this bracket is never closed".into()]
    }

    fn help(&self) -> Option<String> {
        Some(format!(
            "add the matching {} somewhere after this",
            "closing bracket".fg(OP),
        ))
    }
}

/// A closing bracket did not match the most recently opened bracket.
#[derive(Debug, Clone, PartialEq)]
pub struct MismatchedBracket {
    /// The 1-based column of the closing bracket.
    pub column: usize,
}

impl ErrorKind for MismatchedBracket {
    fn message(&self) -> String {
        format!("mismatched closing bracket at column {}", self.column)
    }

    fn labels(&self) -> Vec<String> {
        vec![
            "this closing bracket".into(),
            "does not match this opening bracket".into(),
        ]
    }
}

/// A closing bracket appeared with no bracket open.
#[derive(Debug, Clone, PartialEq)]
pub struct UnexpectedCloseBracket {
    /// The 1-based column of the closing bracket.
    pub column: usize,
}

impl ErrorKind for UnexpectedCloseBracket {
    fn message(&self) -> String {
        format!("unexpected closing bracket at column {}", self.column)
    }

    fn labels(&self) -> Vec<String> {
        vec!["nothing is open for this bracket to close".into()]
    }

    fn help(&self) -> Option<String> {
        Some("add an opening bracket somewhere before this, or remove it".into())
    }
}

/// A character in operator position is not part of any registered operator.
#[derive(Debug, Clone, PartialEq)]
pub struct UnknownOperator {
    /// The unmatched glyph.
    pub glyph: String,
}

impl ErrorKind for UnknownOperator {
    fn message(&self) -> String {
        format!("unknown operator `{}`", self.glyph)
    }

    fn labels(&self) -> Vec<String> {
        vec!["here".into()]
    }
}

/// An operator is missing one of its operands.
#[derive(Debug, Clone, PartialEq)]
pub struct MissingOperand {
    /// The operator glyph.
    pub glyph: String,
}

impl ErrorKind for MissingOperand {
    fn message(&self) -> String {
        format!("`{}` is missing an operand", self.glyph)
    }

    fn labels(&self) -> Vec<String> {
        vec!["this operator".into()]
    }
}

/// A function name appeared with no argument list following it.
#[derive(Debug, Clone, PartialEq)]
pub struct MissingFunctionArguments {
    /// The function name.
    pub name: String,
}

impl ErrorKind for MissingFunctionArguments {
    fn message(&self) -> String {
        format!("`{}` is called without arguments", self.name)
    }

    fn labels(&self) -> Vec<String> {
        vec!["this function".into()]
    }

    fn help(&self) -> Option<String> {
        Some(format!(
            "write the arguments in brackets, or separate a single {} with a space",
            "argument".fg(EXPR),
        ))
    }
}

/// A scope contained no expression at all.
#[derive(Debug, Clone, PartialEq)]
pub struct EmptyExpression;

impl ErrorKind for EmptyExpression {
    fn message(&self) -> String {
        "missing expression".into()
    }

    fn labels(&self) -> Vec<String> {
        vec!["add an expression here".into()]
    }
}

/// An argument separator appeared outside of a call argument list.
#[derive(Debug, Clone, PartialEq)]
pub struct UnexpectedSeparator;

impl ErrorKind for UnexpectedSeparator {
    fn message(&self) -> String {
        "unexpected argument separator".into()
    }

    fn labels(&self) -> Vec<String> {
        vec!["this separator is not inside a call".into()]
    }
}

/// A preprocessor could not be registered.
#[derive(Debug, Clone, PartialEq)]
pub struct InvalidPreprocessor {
    /// The rejected hook name.
    pub name: String,

    /// Why the registration failed.
    pub reason: String,
}

impl ErrorKind for InvalidPreprocessor {
    fn message(&self) -> String {
        format!("cannot register preprocessor `{}`: {}", self.name, self.reason)
    }

    fn labels(&self) -> Vec<String> {
        Vec::new()
    }
}

/// An identifier failed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct InvalidName {
    /// The rejected identifier.
    pub name: String,
}

impl ErrorKind for InvalidName {
    fn message(&self) -> String {
        format!("`{}` is not a valid name", self.name)
    }

    fn labels(&self) -> Vec<String> {
        vec!["here".into()]
    }

    fn help(&self) -> Option<String> {
        Some("names start with a letter or underscore, followed by letters, digits or underscores".into())
    }
}
