use std::sync::LazyLock;

use regex::Regex;
use tracing::trace;

use crate::domain::{ModuleCode, Operator, module_code::MODULE_CODE_PATTERN};

static TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"{MODULE_CODE_PATTERN}| and | or |[(){{}}\[\]]"))
        .expect("token pattern is valid")
});

/// A lexical unit of a canonical prerequisite string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// A module code operand.
    Code(ModuleCode),
    /// A binary operator.
    Operator(Operator),
    /// An opening bracket of any kind.
    Open,
    /// A closing bracket of any kind.
    Close,
}

impl Token {
    /// Whether this token is a module code.
    #[must_use]
    pub const fn is_code(&self) -> bool {
        matches!(self, Self::Code(_))
    }
}

/// Splits canonical text into tokens, skipping everything that is not a
/// module code, a spaced operator word, or a bracket.
#[must_use]
pub fn tokenize(normalized: &str) -> Vec<Token> {
    TOKEN
        .find_iter(normalized)
        .map(|m| match m.as_str() {
            "(" | "[" | "{" => Token::Open,
            ")" | "]" | "}" => Token::Close,
            " and " => Token::Operator(Operator::And),
            " or " => Token::Operator(Operator::Or),
            code => Token::Code(ModuleCode::from_match(code)),
        })
        .collect()
}

/// Role of the most recently accepted token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Accepted {
    Nothing,
    Operand,
    Operator,
    Open,
    Close,
}

/// Drops operators that cannot be read as binary.
///
/// An operator is kept only when something other than an operator has been
/// accepted before it, and the token after it starts an operand (a module
/// code or an opening bracket). Everything else passes through.
fn accept_binary_operators(tokens: Vec<Token>) -> Vec<Token> {
    let mut accepted = Vec::with_capacity(tokens.len());
    let mut state = Accepted::Nothing;
    let mut tokens = tokens.into_iter().peekable();

    while let Some(token) = tokens.next() {
        state = match (&token, state) {
            (Token::Operator(_), Accepted::Operand | Accepted::Open | Accepted::Close)
                if matches!(tokens.peek(), Some(Token::Code(_) | Token::Open)) =>
            {
                Accepted::Operator
            }
            (Token::Operator(operator), _) => {
                trace!(%operator, "dropping operator without two operands");
                continue;
            }
            (Token::Code(_), _) => Accepted::Operand,
            (Token::Open, _) => Accepted::Open,
            (Token::Close, _) => Accepted::Close,
        };
        accepted.push(token);
    }

    accepted
}

/// Reorders infix tokens into postfix order (shunting-yard).
///
/// Operators whose rank is lower or equal to the incoming operator's are
/// popped first, so `AND` groups before `OR` and equal operators associate to
/// the left. Unmatched brackets are discarded.
#[must_use]
pub fn to_postfix(tokens: Vec<Token>) -> Vec<Token> {
    let mut output = Vec::new();
    let mut stack: Vec<Token> = Vec::new();

    for token in accept_binary_operators(tokens) {
        match token {
            Token::Code(_) => output.push(token),
            Token::Open => stack.push(token),
            Token::Close => {
                while let Some(top) = stack.pop() {
                    if top == Token::Open {
                        break;
                    }
                    output.push(top);
                }
            }
            Token::Operator(operator) => {
                while let Some(Token::Operator(top)) = stack.last() {
                    if top.rank() > operator.rank() {
                        break;
                    }
                    output.extend(stack.pop());
                }
                stack.push(token);
            }
        }
    }

    output.extend(stack.into_iter().rev().filter(|token| *token != Token::Open));
    output
}
