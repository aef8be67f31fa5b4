//! # Lexing and postfix evaluation
//! A small expression-evaluation framework: a [Lexer] turns text into a
//! list of [Token]s according to registered rules, the token list is
//! checked by [validate_tokens], rewritten to postfix ordering by
//! [to_postfix] (shunting-yard) and finally folded into a value by
//! [eval_postfix]. The framework is generic over the expression result
//! type; the crate's regular expression parser instantiates it with NFA
//! fragments, and the tests instantiate it with plain integers.

use crate::MachineError;

pub mod lexer;

pub use lexer::Lexer;

/// A literal operand: takes no arguments and produces a value.
pub trait Literal<T> {
    fn value(&self) -> T;
}

/// A binary infix operator with a precedence (higher binds tighter).
pub trait InfixOperator<T> {
    fn precedence(&self) -> u32;
    fn apply(&self, left: T, right: T) -> T;
}

/// A unary postfix operator with a precedence (higher binds tighter).
pub trait PostfixOperator<T> {
    fn precedence(&self) -> u32;
    fn apply(&self, operand: T) -> T;
}

/// One lexed token: the matched text plus its rule object.
pub struct Token<T: 'static> {
    pub text: String,
    pub kind: TokenKind<T>,
}

pub enum TokenKind<T: 'static> {
    Literal(Box<dyn Literal<T>>),
    Infix(Box<dyn InfixOperator<T>>),
    Postfix(Box<dyn PostfixOperator<T>>),
    LeftParen,
    RightParen,
}

impl<T: 'static> std::fmt::Debug for Token<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Token")
            .field("text", &self.text)
            .field("kind", &self.kind)
            .finish()
    }
}

impl<T: 'static> std::fmt::Debug for TokenKind<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let variant = match self {
            TokenKind::Literal(_) => "Literal",
            TokenKind::Infix(_) => "Infix",
            TokenKind::Postfix(_) => "Postfix",
            TokenKind::LeftParen => "LeftParen",
            TokenKind::RightParen => "RightParen",
        };
        f.write_str(variant)
    }
}

/// The category of a token, used by the validation and shunting-yard
/// passes, which don't care about the rule objects themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenCategory {
    Literal,
    Infix,
    Postfix,
    LeftParen,
    RightParen,
}

impl<T: 'static> Token<T> {
    pub fn literal(text: impl Into<String>, rule: impl Literal<T> + 'static) -> Self {
        Token {
            text: text.into(),
            kind: TokenKind::Literal(Box::new(rule)),
        }
    }

    pub fn infix(text: impl Into<String>, rule: impl InfixOperator<T> + 'static) -> Self {
        Token {
            text: text.into(),
            kind: TokenKind::Infix(Box::new(rule)),
        }
    }

    pub fn postfix(text: impl Into<String>, rule: impl PostfixOperator<T> + 'static) -> Self {
        Token {
            text: text.into(),
            kind: TokenKind::Postfix(Box::new(rule)),
        }
    }

    pub fn left_paren() -> Self {
        Token {
            text: "(".to_string(),
            kind: TokenKind::LeftParen,
        }
    }

    pub fn right_paren() -> Self {
        Token {
            text: ")".to_string(),
            kind: TokenKind::RightParen,
        }
    }

    pub fn category(&self) -> TokenCategory {
        match &self.kind {
            TokenKind::Literal(_) => TokenCategory::Literal,
            TokenKind::Infix(_) => TokenCategory::Infix,
            TokenKind::Postfix(_) => TokenCategory::Postfix,
            TokenKind::LeftParen => TokenCategory::LeftParen,
            TokenKind::RightParen => TokenCategory::RightParen,
        }
    }

    fn operator_precedence(&self) -> Option<u32> {
        match &self.kind {
            TokenKind::Infix(op) => Some(op.precedence()),
            TokenKind::Postfix(op) => Some(op.precedence()),
            _ => None,
        }
    }
}

fn invalid(message: impl Into<String>) -> MachineError {
    MachineError::InvalidRegex(message.into())
}

/// Validates a token list in infix ordering. Rejected are: an operator at
/// the start of the expression, an infix operator followed by another
/// operator, a right paren or the end of input, a left paren followed by
/// an operator or a right paren, and unbalanced parentheses.
pub fn validate_tokens<T: 'static>(tokens: &[Token<T>]) -> Result<(), MachineError> {
    use TokenCategory::*;

    if let Some(first) = tokens.first() {
        if matches!(first.category(), Infix | Postfix) {
            return Err(invalid(format!(
                "'{}' cannot appear at the start of an expression",
                first.text
            )));
        }
    }

    let mut open_parens = 0usize;
    for (i, token) in tokens.iter().enumerate() {
        let next = tokens.get(i + 1);
        match token.category() {
            Infix => match next {
                None => {
                    return Err(invalid(format!(
                        "'{}' cannot appear at the end of an expression",
                        token.text
                    )))
                }
                Some(n) if matches!(n.category(), Infix | Postfix | RightParen) => {
                    return Err(invalid(format!(
                        "'{}' cannot appear immediately before '{}'",
                        token.text, n.text
                    )))
                }
                _ => {}
            },
            LeftParen => {
                open_parens += 1;
                if let Some(n) = next {
                    if matches!(n.category(), Infix | Postfix | RightParen) {
                        return Err(invalid(format!(
                            "'(' cannot appear immediately before '{}'",
                            n.text
                        )));
                    }
                }
            }
            RightParen => {
                open_parens = open_parens
                    .checked_sub(1)
                    .ok_or_else(|| invalid("expression has mismatched parentheses"))?;
            }
            Literal | Postfix => {}
        }
    }

    if open_parens != 0 {
        return Err(invalid("expression has unclosed parentheses"));
    }
    Ok(())
}

/// Rewrites a validated token list to postfix ordering with the
/// shunting-yard algorithm. Literals and postfix operators go straight to
/// the output; an infix operator first pops every stacked operator of
/// equal or higher precedence.
pub fn to_postfix<T: 'static>(tokens: Vec<Token<T>>) -> Vec<Token<T>> {
    use TokenCategory::*;

    let mut stack: Vec<Token<T>> = Vec::new();
    let mut output = Vec::with_capacity(tokens.len());

    for token in tokens {
        match token.category() {
            Literal | Postfix => output.push(token),
            LeftParen => stack.push(token),
            RightParen => {
                while stack
                    .last()
                    .map_or(false, |top| top.category() != LeftParen)
                {
                    output.push(stack.pop().expect("loop guard checked the stack"));
                }
                stack.pop();
            }
            Infix => {
                let precedence = token
                    .operator_precedence()
                    .expect("infix tokens carry a precedence");
                while stack.last().map_or(false, |top| {
                    top.category() == Infix
                        && precedence
                            <= top
                                .operator_precedence()
                                .expect("infix tokens carry a precedence")
                }) {
                    output.push(stack.pop().expect("loop guard checked the stack"));
                }
                stack.push(token);
            }
        }
    }

    while let Some(token) = stack.pop() {
        output.push(token);
    }
    output
}

/// Evaluates a postfix token stream with an operand stack. A single
/// residual value is the result; anything else means the stream wasn't a
/// well-formed expression.
pub fn eval_postfix<T: 'static>(tokens: Vec<Token<T>>) -> Result<T, MachineError> {
    let mut stack: Vec<T> = Vec::new();

    for token in tokens {
        match token.kind {
            TokenKind::Literal(rule) => stack.push(rule.value()),
            TokenKind::Infix(rule) => {
                let right = stack
                    .pop()
                    .ok_or_else(|| invalid(format!("'{}' is missing an operand", token.text)))?;
                let left = stack
                    .pop()
                    .ok_or_else(|| invalid(format!("'{}' is missing an operand", token.text)))?;
                stack.push(rule.apply(left, right));
            }
            TokenKind::Postfix(rule) => {
                let operand = stack
                    .pop()
                    .ok_or_else(|| invalid(format!("'{}' is missing an operand", token.text)))?;
                stack.push(rule.apply(operand));
            }
            TokenKind::LeftParen | TokenKind::RightParen => {
                return Err(invalid("parenthesis in postfix stream"));
            }
        }
    }

    let result = stack
        .pop()
        .ok_or_else(|| invalid("expression is empty"))?;
    if !stack.is_empty() {
        return Err(invalid("expression leaves dangling operands"));
    }
    Ok(result)
}
