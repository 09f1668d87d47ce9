//! Builds an operator tree from the nested token stream.
//!
//! Each scope is converted independently: operands (tokens and nested scopes) and operators are
//! shunted into postfix order honoring precedence and associativity, then folded into a single
//! [`Node`] with a work stack. Function tokens claim the scope that follows them as their
//! argument list; brackets that map to a function (such as `[` mapping to `vector`) become calls
//! to that function.

use crate::error::{kind, Error};
use crate::tokenizer::op::{Associativity, OpAction, OperatorDescriptor, PREFIX_PRECEDENCE};
use crate::tokenizer::token::{Scope, ScopeItem, ScopeKind, Token, TokenKind};
use std::ops::Range;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A node of the operator tree.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Node {
    /// A leaf: a literal, variable or unit token.
    Value(Token),

    /// A unary operator applied to one operand.
    Unary {
        op: Token,
        operand: Box<Node>,
    },

    /// A binary operator applied to two operands.
    Binary {
        op: Token,
        lhs: Box<Node>,
        rhs: Box<Node>,
    },

    /// A function applied to an argument list.
    Call {
        name: String,
        span: Range<usize>,
        args: Vec<Node>,
    },
}

impl Node {
    /// The source region this node covers, for error reporting.
    pub fn span(&self) -> Range<usize> {
        match self {
            Node::Value(token) => token.span.clone(),
            Node::Unary { op, operand } => {
                let inner = operand.span();
                op.span.start.min(inner.start)..op.span.end.max(inner.end)
            },
            Node::Binary { lhs, rhs, .. } => lhs.span().start..rhs.span().end,
            Node::Call { span, args, .. } => {
                let end = args.last().map_or(span.end, |arg| arg.span().end);
                span.start..span.end.max(end)
            },
        }
    }
}

/// Builds a single expression tree from a scope. Argument separators at this level are an error;
/// use [`build_sequence`] for scopes that represent argument lists.
pub fn build_tree(scope: Scope) -> Result<Node, Error> {
    let span = scope.span.clone();
    let entries = collect_entries(scope)?;
    shunt(entries, span)
}

/// Builds the comma-separated expression sequence of a scope, one tree per segment. An empty
/// scope is an empty sequence.
pub fn build_sequence(scope: Scope) -> Result<Vec<Node>, Error> {
    let kind = scope.kind.clone();
    let span = scope.span.clone();

    let mut segments: Vec<Vec<ScopeItem>> = vec![Vec::new()];
    for item in scope.items {
        let is_comma = matches!(
            &item,
            ScopeItem::Token(t) if t.op.as_ref().map_or(false, |op| op.action == OpAction::Comma)
        );
        if is_comma {
            segments.push(Vec::new());
        } else {
            segments.last_mut().expect("at least one segment").push(item);
        }
    }

    if segments.len() == 1 && segments[0].is_empty() {
        return Ok(Vec::new());
    }

    segments
        .into_iter()
        .map(|items| {
            build_tree(Scope { kind: kind.clone(), items, span: span.clone() })
        })
        .collect()
}

/// An intermediate entry: a fully built operand or a pending operator.
enum Entry {
    Operand(Node),
    Op(Token, OperatorDescriptor),
}

/// Resolves scope items into operands and operators, consuming function-argument scopes and
/// expanding bracket families that map to functions.
fn collect_entries(scope: Scope) -> Result<Vec<Entry>, Error> {
    let mut entries = Vec::new();
    let mut items = scope.items.into_iter().peekable();

    while let Some(item) = items.next() {
        match item {
            ScopeItem::Token(token) => match token.kind {
                TokenKind::Operator => {
                    let descriptor = token.op.clone().expect("operator tokens carry a descriptor");
                    entries.push(Entry::Op(token, descriptor));
                },
                TokenKind::Function => {
                    let args_scope = match items.peek() {
                        Some(ScopeItem::Scope(_)) => {
                            let Some(ScopeItem::Scope(scope)) = items.next() else {
                                unreachable!("peeked a scope");
                            };
                            scope
                        },
                        _ => {
                            return Err(Error::new(
                                vec![token.span.clone()],
                                kind::MissingFunctionArguments { name: token.value },
                            ));
                        },
                    };
                    let args = build_sequence(args_scope)?;
                    entries.push(Entry::Operand(Node::Call {
                        name: token.value,
                        span: token.span,
                        args,
                    }));
                },
                TokenKind::Value | TokenKind::Unit => {
                    entries.push(Entry::Operand(Node::Value(token)));
                },
            },
            ScopeItem::Scope(inner) => {
                let maps_to = match &inner.kind {
                    ScopeKind::Bracket { maps_to } => maps_to.clone(),
                    _ => None,
                };
                match maps_to {
                    Some(name) => {
                        let span = inner.span.clone();
                        let args = build_sequence(inner)?;
                        entries.push(Entry::Operand(Node::Call { name, span, args }));
                    },
                    None => {
                        entries.push(Entry::Operand(build_tree(inner)?));
                    },
                }
            },
        }
    }

    Ok(entries)
}

/// An operator waiting on the shunting stack.
enum Pending {
    Prefix(Token),
    Binary(Token, OperatorDescriptor),
}

impl Pending {
    fn precedence(&self) -> u8 {
        match self {
            Pending::Prefix(_) => PREFIX_PRECEDENCE,
            Pending::Binary(_, d) => d.precedence,
        }
    }
}

/// Folds one pending operator into the output stack.
fn apply(pending: Pending, output: &mut Vec<Node>) -> Result<(), Error> {
    match pending {
        Pending::Prefix(op) => {
            let operand = output.pop().ok_or_else(|| {
                Error::new(vec![op.span.clone()], kind::MissingOperand { glyph: op.value.clone() })
            })?;
            output.push(Node::Unary { op, operand: Box::new(operand) });
        },
        Pending::Binary(op, _) => {
            let rhs = output.pop().ok_or_else(|| {
                Error::new(vec![op.span.clone()], kind::MissingOperand { glyph: op.value.clone() })
            })?;
            let lhs = output.pop().ok_or_else(|| {
                Error::new(vec![op.span.clone()], kind::MissingOperand { glyph: op.value.clone() })
            })?;
            output.push(Node::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs) });
        },
    }
    Ok(())
}

/// Standard shunting over the entry sequence, with prefix and postfix handling driven by the
/// descriptors' position flags.
fn shunt(entries: Vec<Entry>, scope_span: Range<usize>) -> Result<Node, Error> {
    let mut output: Vec<Node> = Vec::new();
    let mut stack: Vec<Pending> = Vec::new();
    let mut expect_operand = true;
    let mut last_op: Option<Token> = None;

    for entry in entries {
        match entry {
            Entry::Operand(node) => {
                if !expect_operand {
                    return Err(Error::new(
                        vec![node.span()],
                        kind::MissingOperand { glyph: "*".into() },
                    ));
                }
                output.push(node);
                expect_operand = false;
            },
            Entry::Op(token, descriptor) => {
                if descriptor.action == OpAction::Comma {
                    return Err(Error::new(vec![token.span], kind::UnexpectedSeparator));
                }

                if expect_operand {
                    if !descriptor.prefix {
                        return Err(Error::new(
                            vec![token.span.clone()],
                            kind::MissingOperand { glyph: token.value },
                        ));
                    }
                    last_op = Some(token.clone());
                    stack.push(Pending::Prefix(token));
                } else if descriptor.postfix {
                    // postfix binds tighter than anything pending; fold it immediately
                    let operand = output.pop().expect("an operand was just produced");
                    output.push(Node::Unary { op: token, operand: Box::new(operand) });
                } else {
                    while let Some(top) = stack.last() {
                        let pop = top.precedence() > descriptor.precedence
                            || (top.precedence() == descriptor.precedence
                                && descriptor.associativity == Associativity::Left);
                        if !pop {
                            break;
                        }
                        let top = stack.pop().expect("just peeked");
                        apply(top, &mut output)?;
                    }
                    last_op = Some(token.clone());
                    stack.push(Pending::Binary(token, descriptor));
                    expect_operand = true;
                }
            },
        }
    }

    if expect_operand {
        if let Some(op) = last_op {
            return Err(Error::new(
                vec![op.span.clone()],
                kind::MissingOperand { glyph: op.value },
            ));
        }
        return Err(Error::new(vec![scope_span], kind::EmptyExpression));
    }

    while let Some(pending) = stack.pop() {
        apply(pending, &mut output)?;
    }

    match output.len() {
        1 => Ok(output.pop().expect("length checked")),
        _ => Err(Error::new(vec![scope_span], kind::EmptyExpression)),
    }
}

#[cfg(test)]
mod tests {
    use crate::tokenizer::op::{BracketTable, FunctionSet, OperatorDictionary, UnitTable};
    use crate::tokenizer::Tokenizer;
    use pretty_assertions::assert_eq;
    use super::*;

    fn tree(input: &str) -> Result<Node, Error> {
        let ops = OperatorDictionary::default();
        let brackets = BracketTable::default();
        let units = UnitTable::new();
        let oracle = FunctionSet::from_names(["sin", "cos", "sqrt", "max"]);
        let tokenizer = Tokenizer::new(&ops, &brackets, &units, &oracle);
        build_tree(tokenizer.tokenize(input)?)
    }

    /// Renders a tree as an s-expression for shape assertions.
    fn shape(node: &Node) -> String {
        match node {
            Node::Value(t) => t.value.clone(),
            Node::Unary { op, operand } => format!("({} {})", op.value, shape(operand)),
            Node::Binary { op, lhs, rhs } => {
                format!("({} {} {})", op.value, shape(lhs), shape(rhs))
            },
            Node::Call { name, args, .. } => {
                let args = args.iter().map(shape).collect::<Vec<_>>().join(" ");
                format!("({name} {args})")
            },
        }
    }

    #[test]
    fn precedence() {
        assert_eq!(shape(&tree("1+2*3").unwrap()), "(+ 1 (* 2 3))");
        assert_eq!(shape(&tree("1*2+3").unwrap()), "(+ (* 1 2) 3)");
    }

    #[test]
    fn pow_is_right_associative() {
        assert_eq!(shape(&tree("2^3^2").unwrap()), "(^ 2 (^ 3 2))");
        assert_eq!(shape(&tree("2-3-2").unwrap()), "(- (- 2 3) 2)");
    }

    #[test]
    fn prefix_binds_below_pow() {
        assert_eq!(shape(&tree("-x^2").unwrap()), "(- (^ x 2))");
        assert_eq!(shape(&tree("-x*y").unwrap()), "(* (- x) y)");
    }

    #[test]
    fn doubled_plus_reads_as_prefix() {
        // `++` is not a registered operator, so the run splits into a binary `+` followed by a
        // prefix `+`
        assert_eq!(shape(&tree("a++b").unwrap()), "(+ a (+ b))");
    }

    #[test]
    fn postfix_factorial() {
        assert_eq!(shape(&tree("3!").unwrap()), "(! 3)");
        assert_eq!(shape(&tree("3!^2").unwrap()), "(^ (! 3) 2)");
    }

    #[test]
    fn call_with_arguments() {
        assert_eq!(shape(&tree("max(1, 2)").unwrap()), "(max 1 2)");
    }

    #[test]
    fn space_scope_equals_brackets() {
        assert_eq!(shape(&tree("sin x + 1").unwrap()), shape(&tree("sin(x)+1").unwrap()));
    }

    #[test]
    fn mapped_bracket_becomes_call() {
        assert_eq!(shape(&tree("[1, 2]").unwrap()), "(vector 1 2)");
    }

    #[test]
    fn parens_are_transparent() {
        assert_eq!(shape(&tree("(x+1)*2").unwrap()), "(* (+ x 1) 2)");
    }

    #[test]
    fn separator_outside_call_is_an_error() {
        assert!(tree("1, 2").is_err());
    }

    #[test]
    fn dangling_operator_is_an_error() {
        assert!(tree("x*").is_err());
        assert!(tree("*x").is_err());
    }

    #[test]
    fn empty_parens_are_an_error() {
        assert!(tree("()").is_err());
    }
}
