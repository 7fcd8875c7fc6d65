use async_trait::async_trait;
use serde_json::Map;
use serde_json::Value;
use switchboard_core::Agent;
use switchboard_core::AgentDescriptor;
use switchboard_core::Arguments;
use switchboard_core::ResponseEnvelope;
use switchboard_core::require_params;
use tracing::debug;

use super::string_argument;

/// Evaluates arithmetic found in `expression` or the routed `query`.
///
/// Only digits, `+ - * / ( ) .` and spaces survive extraction; `×` and `÷`
/// are accepted as aliases. Anything else in the text (keywords, CJK
/// characters) is dropped before parsing.
#[derive(Debug, Default)]
pub struct CalculatorAgent;

impl CalculatorAgent {
    pub const NAME: &'static str = "calculator";

    pub fn descriptor() -> AgentDescriptor {
        AgentDescriptor::new(
            Self::NAME,
            "Evaluates arithmetic with + - * / and parentheses",
        )
    }
}

#[async_trait]
impl Agent for CalculatorAgent {
    async fn execute(&self, arguments: Arguments) -> ResponseEnvelope {
        let Some(raw) = string_argument(&arguments, &["expression", "query"]) else {
            return match require_params(&arguments, &["expression"]) {
                Err(err) => ResponseEnvelope::error(err.to_string()),
                Ok(()) => ResponseEnvelope::error("expression must be a non-empty string"),
            };
        };

        let expression = extract_expression(raw);
        if expression.is_empty() {
            return ResponseEnvelope::error(format!("no arithmetic expression found in `{raw}`"));
        }

        match evaluate(&expression) {
            Ok(value) => {
                let result = format_number(value);
                debug!(%expression, %result, "evaluated expression");
                let mut data = Map::new();
                data.insert("expression".to_string(), Value::from(expression.clone()));
                data.insert("result".to_string(), Value::from(value));
                ResponseEnvelope::success(format!("{expression} = {result}")).with_data(data)
            }
            Err(err) => ResponseEnvelope::error(format!("cannot evaluate `{expression}`: {err}")),
        }
    }
}

fn extract_expression(raw: &str) -> String {
    let kept: String = raw
        .chars()
        .filter_map(|ch| match ch {
            '×' => Some('*'),
            '÷' => Some('/'),
            '0'..='9' | '+' | '-' | '*' | '/' | '(' | ')' | '.' | ' ' => Some(ch),
            _ => None,
        })
        .collect();
    kept.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.0}")
    } else {
        value.to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Number(f64),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
}

fn tokenize(expression: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = expression.chars().peekable();
    while let Some(&ch) = chars.peek() {
        match ch {
            ' ' => {
                chars.next();
            }
            '+' | '-' | '*' | '/' | '(' | ')' => {
                chars.next();
                tokens.push(match ch {
                    '+' => Token::Plus,
                    '-' => Token::Minus,
                    '*' => Token::Star,
                    '/' => Token::Slash,
                    '(' => Token::LParen,
                    _ => Token::RParen,
                });
            }
            '0'..='9' | '.' => {
                let mut literal = String::new();
                while let Some(&digit) = chars.peek() {
                    if digit.is_ascii_digit() || digit == '.' {
                        literal.push(digit);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let number = literal
                    .parse()
                    .map_err(|_| format!("invalid number `{literal}`"))?;
                tokens.push(Token::Number(number));
            }
            other => return Err(format!("unexpected character `{other}`")),
        }
    }
    Ok(tokens)
}

/// Deepest run of parentheses and unary signs accepted. Input comes from
/// free text, so recursion is bounded well below the worker stack size.
const MAX_NESTING: usize = 64;

/// Recursive descent over `expr := term (('+'|'-') term)*`,
/// `term := factor (('*'|'/') factor)*`, `factor := ('-'|'+') factor | number | '(' expr ')'`.
struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
        }
    }

    fn nested(&mut self, parse: fn(&mut Self) -> Result<f64, String>) -> Result<f64, String> {
        if self.depth >= MAX_NESTING {
            return Err("expression nested too deeply".to_string());
        }
        self.depth += 1;
        let value = parse(self);
        self.depth -= 1;
        value
    }

    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.peek();
        self.pos += 1;
        token
    }

    fn expr(&mut self) -> Result<f64, String> {
        let mut value = self.term()?;
        while let Some(op @ (Token::Plus | Token::Minus)) = self.peek() {
            self.advance();
            let rhs = self.term()?;
            if op == Token::Plus {
                value += rhs;
            } else {
                value -= rhs;
            }
        }
        Ok(value)
    }

    fn term(&mut self) -> Result<f64, String> {
        let mut value = self.factor()?;
        while let Some(op @ (Token::Star | Token::Slash)) = self.peek() {
            self.advance();
            let rhs = self.factor()?;
            if op == Token::Star {
                value *= rhs;
            } else if rhs == 0.0 {
                return Err("division by zero".to_string());
            } else {
                value /= rhs;
            }
        }
        Ok(value)
    }

    fn factor(&mut self) -> Result<f64, String> {
        match self.advance() {
            Some(Token::Number(value)) => Ok(value),
            Some(Token::Minus) => Ok(-self.nested(Self::factor)?),
            Some(Token::Plus) => self.nested(Self::factor),
            Some(Token::LParen) => {
                let value = self.nested(Self::expr)?;
                match self.advance() {
                    Some(Token::RParen) => Ok(value),
                    _ => Err("missing closing parenthesis".to_string()),
                }
            }
            Some(token) => Err(format!("unexpected token {token:?}")),
            None => Err("unexpected end of expression".to_string()),
        }
    }
}

fn evaluate(expression: &str) -> Result<f64, String> {
    let mut parser = Parser::new(tokenize(expression)?);
    let value = parser.expr()?;
    if let Some(token) = parser.peek() {
        return Err(format!("unexpected trailing token {token:?}"));
    }
    Ok(value)
}
