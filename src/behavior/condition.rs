//! Safe evaluator for trigger condition expressions
//!
//! Conditions are small boolean expressions over named context variables:
//! comparisons (`<`, `>`, `<=`, `>=`, `==`, `!=`), logical `&&`/`||`,
//! parentheses, and additive arithmetic. The text is checked against an
//! allow-listed character set before parsing; anything outside it rejects
//! the whole condition. A hand-rolled tokenizer plus recursive-descent
//! parser keeps the grammar fixed — there is no dynamic code path to
//! inject into.
//!
//! Grammar:
//! ```text
//! expr    := or
//! or      := and ("||" and)*
//! and     := cmp ("&&" cmp)*
//! cmp     := sum (("<" | ">" | "<=" | ">=" | "==" | "!=") sum)?
//! sum     := unary (("+" | "-") unary)*
//! unary   := "-" unary | primary
//! primary := number | identifier | "(" expr ")"
//! ```

use ahash::AHashMap;

/// A context variable value
#[derive(Debug, Clone, PartialEq)]
pub enum CtxValue {
    Num(f64),
    Text(String),
    Flag(bool),
}

/// The scheduler's mutable key/value context
pub type Context = AHashMap<String, CtxValue>;

impl CtxValue {
    fn truthy(&self) -> bool {
        match self {
            CtxValue::Num(n) => *n != 0.0,
            CtxValue::Text(s) => !s.is_empty(),
            CtxValue::Flag(b) => *b,
        }
    }
}

/// Evaluate a condition against the context. Any lexical, syntactic, or
/// type error is reported as `Err`; callers treat that as "false".
pub fn evaluate_condition(expr: &str, ctx: &Context) -> Result<bool, String> {
    if !is_allowed(expr) {
        return Err(format!("condition contains disallowed characters: {expr:?}"));
    }
    let tokens = tokenize(expr)?;
    if tokens.is_empty() {
        return Err("empty condition".to_string());
    }
    let mut parser = Parser {
        tokens: &tokens,
        pos: 0,
        ctx,
    };
    let value = parser.parse_or()?;
    if parser.pos != parser.tokens.len() {
        return Err(format!("trailing tokens in condition: {expr:?}"));
    }
    Ok(value.truthy())
}

/// Allow-list: word characters, whitespace, and the operator set. Quotes,
/// dots, semicolons and everything else are rejected up front.
fn is_allowed(expr: &str) -> bool {
    expr.chars().all(|c| {
        c.is_alphanumeric() || c == '_' || c.is_whitespace() || "<>=!&|()+-".contains(c)
    })
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Num(f64),
    Ident(String),
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
    And,
    Or,
    Plus,
    Minus,
    LParen,
    RParen,
}

fn tokenize(expr: &str) -> Result<Vec<Token>, String> {
    let chars: Vec<char> = expr.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '+' => {
                tokens.push(Token::Plus);
                i += 1;
            }
            '-' => {
                tokens.push(Token::Minus);
                i += 1;
            }
            '<' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::Le);
                    i += 2;
                } else {
                    tokens.push(Token::Lt);
                    i += 1;
                }
            }
            '>' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::Ge);
                    i += 2;
                } else {
                    tokens.push(Token::Gt);
                    i += 1;
                }
            }
            '=' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::Eq);
                    i += 2;
                } else {
                    return Err("single '=' is not an operator".to_string());
                }
            }
            '!' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::Ne);
                    i += 2;
                } else {
                    return Err("'!' is only valid in '!='".to_string());
                }
            }
            '&' => {
                if chars.get(i + 1) == Some(&'&') {
                    tokens.push(Token::And);
                    i += 2;
                } else {
                    return Err("single '&' is not an operator".to_string());
                }
            }
            '|' => {
                if chars.get(i + 1) == Some(&'|') {
                    tokens.push(Token::Or);
                    i += 2;
                } else {
                    return Err("single '|' is not an operator".to_string());
                }
            }
            c if c.is_ascii_digit() => {
                let start = i;
                while i < chars.len() && chars[i].is_ascii_digit() {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                let n = text
                    .parse::<f64>()
                    .map_err(|e| format!("bad number {text:?}: {e}"))?;
                tokens.push(Token::Num(n));
            }
            c if c.is_alphanumeric() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect()));
            }
            other => return Err(format!("unexpected character {other:?}")),
        }
    }
    Ok(tokens)
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    ctx: &'a Context,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn bump(&mut self) -> Option<&Token> {
        let tok = self.tokens.get(self.pos);
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn parse_or(&mut self) -> Result<CtxValue, String> {
        let mut value = self.parse_and()?;
        while self.peek() == Some(&Token::Or) {
            self.bump();
            let rhs = self.parse_and()?;
            value = CtxValue::Flag(value.truthy() || rhs.truthy());
        }
        Ok(value)
    }

    fn parse_and(&mut self) -> Result<CtxValue, String> {
        let mut value = self.parse_cmp()?;
        while self.peek() == Some(&Token::And) {
            self.bump();
            let rhs = self.parse_cmp()?;
            value = CtxValue::Flag(value.truthy() && rhs.truthy());
        }
        Ok(value)
    }

    fn parse_cmp(&mut self) -> Result<CtxValue, String> {
        let lhs = self.parse_sum()?;
        let op = match self.peek() {
            Some(Token::Lt) => Token::Lt,
            Some(Token::Gt) => Token::Gt,
            Some(Token::Le) => Token::Le,
            Some(Token::Ge) => Token::Ge,
            Some(Token::Eq) => Token::Eq,
            Some(Token::Ne) => Token::Ne,
            _ => return Ok(lhs),
        };
        self.bump();
        let rhs = self.parse_sum()?;
        compare(&lhs, &op, &rhs).map(CtxValue::Flag)
    }

    fn parse_sum(&mut self) -> Result<CtxValue, String> {
        let mut value = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => Token::Plus,
                Some(Token::Minus) => Token::Minus,
                _ => return Ok(value),
            };
            self.bump();
            let rhs = self.parse_unary()?;
            let (a, b) = match (&value, &rhs) {
                (CtxValue::Num(a), CtxValue::Num(b)) => (*a, *b),
                _ => return Err("arithmetic requires numeric operands".to_string()),
            };
            value = CtxValue::Num(if op == Token::Plus { a + b } else { a - b });
        }
    }

    fn parse_unary(&mut self) -> Result<CtxValue, String> {
        if self.peek() == Some(&Token::Minus) {
            self.bump();
            return match self.parse_unary()? {
                CtxValue::Num(n) => Ok(CtxValue::Num(-n)),
                _ => Err("unary '-' requires a numeric operand".to_string()),
            };
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<CtxValue, String> {
        match self.bump().cloned() {
            Some(Token::Num(n)) => Ok(CtxValue::Num(n)),
            Some(Token::Ident(name)) => match name.as_str() {
                "true" => Ok(CtxValue::Flag(true)),
                "false" => Ok(CtxValue::Flag(false)),
                _ => self
                    .ctx
                    .get(&name)
                    .cloned()
                    .ok_or_else(|| format!("unknown variable {name:?}")),
            },
            Some(Token::LParen) => {
                let value = self.parse_or()?;
                if self.bump() != Some(&Token::RParen) {
                    return Err("missing closing parenthesis".to_string());
                }
                Ok(value)
            }
            other => Err(format!("unexpected token {other:?}")),
        }
    }
}

fn compare(lhs: &CtxValue, op: &Token, rhs: &CtxValue) -> Result<bool, String> {
    match (lhs, rhs) {
        (CtxValue::Num(a), CtxValue::Num(b)) => Ok(match op {
            Token::Lt => a < b,
            Token::Gt => a > b,
            Token::Le => a <= b,
            Token::Ge => a >= b,
            Token::Eq => a == b,
            Token::Ne => a != b,
            _ => unreachable!(),
        }),
        (CtxValue::Text(a), CtxValue::Text(b)) => match op {
            Token::Eq => Ok(a == b),
            Token::Ne => Ok(a != b),
            _ => Err("strings only support '==' and '!='".to_string()),
        },
        (CtxValue::Flag(a), CtxValue::Flag(b)) => match op {
            Token::Eq => Ok(a == b),
            Token::Ne => Ok(a != b),
            _ => Err("booleans only support '==' and '!='".to_string()),
        },
        _ => Err("cannot compare values of different types".to_string()),
    }
}
