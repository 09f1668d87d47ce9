//! Error kinds raised by the kernel, the function registry and the evaluation driver.

use symbra_error::ErrorKind;

/// A term with multiplier zero was inverted or divided by.
#[derive(Debug, Clone, PartialEq)]
pub struct DivisionByZero;

impl ErrorKind for DivisionByZero {
    fn message(&self) -> String {
        "division by zero".into()
    }

    fn labels(&self) -> Vec<String> {
        vec!["this evaluates to zero".into()]
    }
}

/// An ordering was requested between terms that are not both numeric.
#[derive(Debug, Clone, PartialEq)]
pub struct NonNumericComparison;

impl ErrorKind for NonNumericComparison {
    fn message(&self) -> String {
        "cannot order non-numeric terms".into()
    }

    fn labels(&self) -> Vec<String> {
        vec!["this term is not a plain number".into()]
    }
}

/// The kernel was asked to perform a structurally impossible operation.
#[derive(Debug, Clone, PartialEq)]
pub struct InvalidOperation {
    /// What went wrong.
    pub reason: String,
}

impl ErrorKind for InvalidOperation {
    fn message(&self) -> String {
        format!("invalid operation: {}", self.reason)
    }

    fn labels(&self) -> Vec<String> {
        vec!["here".into()]
    }
}

/// A literal could not be read as a number.
#[derive(Debug, Clone, PartialEq)]
pub struct InvalidLiteral {
    /// The offending literal text.
    pub text: String,
}

impl ErrorKind for InvalidLiteral {
    fn message(&self) -> String {
        format!("`{}` is not a valid numeric literal", self.text)
    }

    fn labels(&self) -> Vec<String> {
        vec!["here".into()]
    }
}

/// A call named a function the registry does not know.
#[derive(Debug, Clone, PartialEq)]
pub struct UnknownFunction {
    /// The unknown name.
    pub name: String,

    /// Registered names within edit distance 1, as correction candidates.
    pub suggestions: Vec<String>,
}

impl ErrorKind for UnknownFunction {
    fn message(&self) -> String {
        format!("unknown function `{}`", self.name)
    }

    fn labels(&self) -> Vec<String> {
        vec!["this function is not registered".into()]
    }

    fn help(&self) -> Option<String> {
        if self.suggestions.is_empty() {
            None
        } else {
            Some(format!("did you mean {}?", self.suggestions.join(", ")))
        }
    }
}

/// A function was called with the wrong number of arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct ArityMismatch {
    /// The function name.
    pub name: String,

    /// The smallest accepted argument count.
    pub min: usize,

    /// The largest accepted argument count.
    pub max: usize,

    /// The number of arguments given.
    pub given: usize,
}

impl ErrorKind for ArityMismatch {
    fn message(&self) -> String {
        format!("`{}` called with {} argument(s)", self.name, self.given)
    }

    fn labels(&self) -> Vec<String> {
        vec!["in this call".into()]
    }

    fn help(&self) -> Option<String> {
        Some(if self.min == self.max {
            format!("`{}` takes {} argument(s)", self.name, self.min)
        } else {
            format!("`{}` takes between {} and {} arguments", self.name, self.min, self.max)
        })
    }
}
