//! Expression language used by conditions, evaluate statements and text
//! interpolation.
//!
//! Syntax:
//! - literals: `12`, `1.5`, `"text"`, `'text'`, `true`, `false`
//! - names: `gold`, `intro.hall` (a block name evaluates to its visit count)
//! - operators, loosest first: `|| or`, `&& and`, `! not`,
//!   `== != < <= > >= is`, `+ -`, `* / %`, unary `-`
//! - calls: `random()`, `random(a, b)`, `min(..)`, `max(..)`, `abs(x)`, `floor(x)`
//! - statements: `x = e`, `x += e` (also `-= *= /= %=`), `delete x`,
//!   optionally prefixed by `var`, `store` or `assign`

use rand::rngs::StdRng;
use rand::Rng;
use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::schema::value::Value;

/// Values visible to an expression, keyed by name.
pub type Scope = FxHashMap<String, Value>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExprError {
    #[error("unexpected character '{0}' at {1}")]
    UnexpectedChar(char, usize),
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("unexpected token '{0}'")]
    UnexpectedToken(String),
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    #[error("unknown function: {0}")]
    UnknownFunction(String),
    #[error("division by zero")]
    DivisionByZero,
    #[error("cannot apply '{op}' to {left} and {right}")]
    TypeMismatch {
        op: &'static str,
        left: &'static str,
        right: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64, bool),
    Str(String),
    Ident(String),
    Op(&'static str),
    LParen,
    RParen,
    Comma,
}

const OPERATORS: &[&str] = &[
    "==", "!=", "<=", ">=", "&&", "||", "+=", "-=", "*=", "/=", "%=", "+", "-", "*", "/", "%",
    "<", ">", "!", "=",
];

fn tokenize(input: &str) -> Result<Vec<Token>, ExprError> {
    let chars: Vec<char> = input.chars().collect();
    let len = chars.len();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < len {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }

        if c.is_ascii_digit() {
            let start = i;
            let mut is_int = true;
            while i < len && (chars[i].is_ascii_digit() || chars[i] == '.') {
                if chars[i] == '.' {
                    is_int = false;
                }
                i += 1;
            }
            let text: String = chars[start..i].iter().collect();
            let n = text
                .parse::<f64>()
                .map_err(|_| ExprError::UnexpectedToken(text.clone()))?;
            tokens.push(Token::Number(n, is_int));
            continue;
        }

        if c.is_alphabetic() || c == '_' {
            let start = i;
            while i < len && (chars[i].is_alphanumeric() || chars[i] == '_' || chars[i] == '.') {
                i += 1;
            }
            tokens.push(Token::Ident(chars[start..i].iter().collect()));
            continue;
        }

        if c == '"' || c == '\'' {
            let quote = c;
            let mut text = String::new();
            i += 1;
            loop {
                if i >= len {
                    return Err(ExprError::UnterminatedString);
                }
                if chars[i] == '\\' && i + 1 < len {
                    text.push(chars[i + 1]);
                    i += 2;
                    continue;
                }
                if chars[i] == quote {
                    i += 1;
                    break;
                }
                text.push(chars[i]);
                i += 1;
            }
            tokens.push(Token::Str(text));
            continue;
        }

        match c {
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
                continue;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
                continue;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
                continue;
            }
            _ => {}
        }

        let rest: String = chars[i..(i + 2).min(len)].iter().collect();
        match OPERATORS.iter().find(|op| rest.starts_with(*op)) {
            Some(op) => {
                tokens.push(Token::Op(*op));
                i += op.len();
            }
            None => return Err(ExprError::UnexpectedChar(c, i)),
        }
    }

    Ok(tokens)
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum BinOp {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl BinOp {
    fn symbol(self) -> &'static str {
        match self {
            Self::Or => "||",
            Self::And => "&&",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Rem => "%",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Literal(Value),
    Var(String),
    Not(Box<Expr>),
    Neg(Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    Call(String, Vec<Expr>),
}

/// A parsed statement.
#[derive(Debug, Clone, PartialEq)]
enum Statement {
    Assign {
        name: String,
        op: Option<BinOp>,
        value: Expr,
    },
    Delete(String),
    Expr(Expr),
}

/// The effect of executing a statement against a scope.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Set `name` to `value`.
    Assign { name: String, value: Value },
    /// Remove `name`.
    Delete(String),
    /// Plain expression; nothing to write.
    Value(Value),
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        tok
    }

    fn eat_op(&mut self, ops: &[&str]) -> Option<&'static str> {
        match self.peek() {
            Some(Token::Op(op)) if ops.contains(op) => {
                let op = *op;
                self.pos += 1;
                Some(op)
            }
            _ => None,
        }
    }

    fn eat_word(&mut self, words: &[&str]) -> bool {
        match self.peek() {
            Some(Token::Ident(w)) if words.contains(&w.as_str()) => {
                self.pos += 1;
                true
            }
            _ => false,
        }
    }

    fn finish(&self) -> Result<(), ExprError> {
        match self.peek() {
            None => Ok(()),
            Some(tok) => Err(ExprError::UnexpectedToken(format!("{:?}", tok))),
        }
    }

    fn statement(&mut self) -> Result<Statement, ExprError> {
        self.eat_word(&["var", "store", "assign"]);

        if let (Some(Token::Ident(kw)), Some(Token::Ident(name))) =
            (self.tokens.get(self.pos), self.tokens.get(self.pos + 1))
        {
            if kw == "delete" {
                let name = name.clone();
                self.pos += 2;
                self.finish()?;
                return Ok(Statement::Delete(name));
            }
        }

        if let (Some(Token::Ident(name)), Some(Token::Op(op))) =
            (self.tokens.get(self.pos), self.tokens.get(self.pos + 1))
        {
            let op = match *op {
                "=" => Some(None),
                "+=" => Some(Some(BinOp::Add)),
                "-=" => Some(Some(BinOp::Sub)),
                "*=" => Some(Some(BinOp::Mul)),
                "/=" => Some(Some(BinOp::Div)),
                "%=" => Some(Some(BinOp::Rem)),
                _ => None,
            };
            if let Some(op) = op {
                let name = name.clone();
                self.pos += 2;
                let value = self.expr()?;
                self.finish()?;
                return Ok(Statement::Assign { name, op, value });
            }
        }

        let expr = self.expr()?;
        self.finish()?;
        Ok(Statement::Expr(expr))
    }

    fn expr(&mut self) -> Result<Expr, ExprError> {
        self.or()
    }

    fn or(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.and()?;
        while self.eat_op(&["||"]).is_some() || self.eat_word(&["or"]) {
            let right = self.and()?;
            left = Expr::Binary(BinOp::Or, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn and(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.not()?;
        while self.eat_op(&["&&"]).is_some() || self.eat_word(&["and"]) {
            let right = self.not()?;
            left = Expr::Binary(BinOp::And, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn not(&mut self) -> Result<Expr, ExprError> {
        if self.eat_op(&["!"]).is_some() || self.eat_word(&["not"]) {
            return Ok(Expr::Not(Box::new(self.not()?)));
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.additive()?;
        loop {
            let op = if let Some(op) = self.eat_op(&["==", "!=", "<=", ">=", "<", ">"]) {
                match op {
                    "==" => BinOp::Eq,
                    "!=" => BinOp::Ne,
                    "<=" => BinOp::Le,
                    ">=" => BinOp::Ge,
                    "<" => BinOp::Lt,
                    _ => BinOp::Gt,
                }
            } else if self.eat_word(&["is"]) {
                if self.eat_word(&["not"]) {
                    BinOp::Ne
                } else {
                    BinOp::Eq
                }
            } else {
                break;
            };
            let right = self.additive()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn additive(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.multiplicative()?;
        while let Some(op) = self.eat_op(&["+", "-"]) {
            let op = if op == "+" { BinOp::Add } else { BinOp::Sub };
            let right = self.multiplicative()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn multiplicative(&mut self) -> Result<Expr, ExprError> {
        let mut left = self.unary()?;
        while let Some(op) = self.eat_op(&["*", "/", "%"]) {
            let op = match op {
                "*" => BinOp::Mul,
                "/" => BinOp::Div,
                _ => BinOp::Rem,
            };
            let right = self.unary()?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn unary(&mut self) -> Result<Expr, ExprError> {
        if self.eat_op(&["-"]).is_some() {
            return Ok(Expr::Neg(Box::new(self.unary()?)));
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Expr, ExprError> {
        match self.next().ok_or(ExprError::UnexpectedEnd)? {
            Token::Number(n, true) if n.abs() < i64::MAX as f64 => {
                Ok(Expr::Literal(Value::Int(n as i64)))
            }
            Token::Number(n, _) => Ok(Expr::Literal(Value::Float(n))),
            Token::Str(s) => Ok(Expr::Literal(Value::String(s))),
            Token::LParen => {
                let inner = self.expr()?;
                match self.next() {
                    Some(Token::RParen) => Ok(inner),
                    Some(tok) => Err(ExprError::UnexpectedToken(format!("{:?}", tok))),
                    None => Err(ExprError::UnexpectedEnd),
                }
            }
            Token::Ident(name) => {
                match name.as_str() {
                    "true" => return Ok(Expr::Literal(Value::Bool(true))),
                    "false" => return Ok(Expr::Literal(Value::Bool(false))),
                    "undefined" | "none" => return Ok(Expr::Literal(Value::Undefined)),
                    _ => {}
                }
                if self.peek() != Some(&Token::LParen) {
                    return Ok(Expr::Var(name));
                }
                self.pos += 1;
                let mut args = Vec::new();
                if self.peek() == Some(&Token::RParen) {
                    self.pos += 1;
                    return Ok(Expr::Call(name, args));
                }
                loop {
                    args.push(self.expr()?);
                    match self.next() {
                        Some(Token::Comma) => continue,
                        Some(Token::RParen) => break,
                        Some(tok) => return Err(ExprError::UnexpectedToken(format!("{:?}", tok))),
                        None => return Err(ExprError::UnexpectedEnd),
                    }
                }
                Ok(Expr::Call(name, args))
            }
            tok => Err(ExprError::UnexpectedToken(format!("{:?}", tok))),
        }
    }
}

fn eval(expr: &Expr, scope: &Scope, rng: &mut StdRng) -> Result<Value, ExprError> {
    match expr {
        Expr::Literal(v) => Ok(v.clone()),
        Expr::Var(name) => Ok(scope.get(name).cloned().unwrap_or_default()),
        Expr::Not(inner) => Ok(Value::Bool(!eval(inner, scope, rng)?.is_truthy())),
        Expr::Neg(inner) => match eval(inner, scope, rng)? {
            Value::Int(i) => Ok(Value::Int(i.wrapping_neg())),
            Value::Float(f) => Ok(Value::Float(-f)),
            other => Err(ExprError::TypeMismatch {
                op: "-",
                left: "number",
                right: other.type_name(),
            }),
        },
        Expr::Binary(BinOp::And, l, r) => {
            let left = eval(l, scope, rng)?;
            if !left.is_truthy() {
                return Ok(Value::Bool(false));
            }
            Ok(Value::Bool(eval(r, scope, rng)?.is_truthy()))
        }
        Expr::Binary(BinOp::Or, l, r) => {
            let left = eval(l, scope, rng)?;
            if left.is_truthy() {
                return Ok(Value::Bool(true));
            }
            Ok(Value::Bool(eval(r, scope, rng)?.is_truthy()))
        }
        Expr::Binary(op, l, r) => {
            let left = eval(l, scope, rng)?;
            let right = eval(r, scope, rng)?;
            binary(*op, left, right)
        }
        Expr::Call(name, args) => {
            let values = args
                .iter()
                .map(|a| eval(a, scope, rng))
                .collect::<Result<Vec<_>, _>>()?;
            call(name, &values, rng)
        }
    }
}

fn binary(op: BinOp, left: Value, right: Value) -> Result<Value, ExprError> {
    use std::cmp::Ordering;

    match op {
        BinOp::Eq => return Ok(Value::Bool(left == right)),
        BinOp::Ne => return Ok(Value::Bool(left != right)),
        BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
            let ord = left.compare(&right);
            let result = match (op, ord) {
                (_, None) => false,
                (BinOp::Lt, Some(o)) => o == Ordering::Less,
                (BinOp::Le, Some(o)) => o != Ordering::Greater,
                (BinOp::Gt, Some(o)) => o == Ordering::Greater,
                (_, Some(o)) => o != Ordering::Less,
            };
            return Ok(Value::Bool(result));
        }
        _ => {}
    }

    if op == BinOp::Add {
        if let (Value::String(_), _) | (_, Value::String(_)) = (&left, &right) {
            return Ok(Value::String(format!("{}{}", left, right)));
        }
    }

    if let (Value::Int(a), Value::Int(b)) = (&left, &right) {
        let (a, b) = (*a, *b);
        let exact = match op {
            BinOp::Add => a.checked_add(b),
            BinOp::Sub => a.checked_sub(b),
            BinOp::Mul => a.checked_mul(b),
            BinOp::Div => {
                if b == 0 {
                    return Err(ExprError::DivisionByZero);
                }
                if a % b == 0 {
                    a.checked_div(b)
                } else {
                    None
                }
            }
            BinOp::Rem => {
                if b == 0 {
                    return Err(ExprError::DivisionByZero);
                }
                a.checked_rem(b)
            }
            _ => None,
        };
        if let Some(v) = exact {
            return Ok(Value::Int(v));
        }
    }

    let (a, b) = match (left.as_f64(), right.as_f64()) {
        (Some(a), Some(b)) => (a, b),
        _ => {
            return Err(ExprError::TypeMismatch {
                op: op.symbol(),
                left: left.type_name(),
                right: right.type_name(),
            })
        }
    };
    let result = match op {
        BinOp::Add => a + b,
        BinOp::Sub => a - b,
        BinOp::Mul => a * b,
        BinOp::Div | BinOp::Rem if b == 0.0 => return Err(ExprError::DivisionByZero),
        BinOp::Div => a / b,
        _ => a % b,
    };
    Ok(Value::Float(result))
}

fn call(name: &str, args: &[Value], rng: &mut StdRng) -> Result<Value, ExprError> {
    let numbers = || args.iter().filter_map(Value::as_f64);
    match name {
        "random" => match args {
            [] => Ok(Value::Float(rng.gen::<f64>())),
            [Value::Int(a), Value::Int(b)] => {
                let (lo, hi) = if a <= b { (*a, *b) } else { (*b, *a) };
                Ok(Value::Int(rng.gen_range(lo..=hi)))
            }
            [a, b] => match (a.as_f64(), b.as_f64()) {
                // Sampling panics unless the whole range is finite.
                (Some(a), Some(b)) if !(a.is_finite() && b.is_finite() && (b - a).is_finite()) => {
                    Ok(Value::Undefined)
                }
                (Some(a), Some(b)) if a < b => Ok(Value::Float(rng.gen_range(a..b))),
                (Some(a), Some(_)) => Ok(Value::Float(a)),
                _ => Ok(Value::Undefined),
            },
            _ => Ok(Value::Undefined),
        },
        "min" => Ok(numbers().reduce(f64::min).map(number).unwrap_or_default()),
        "max" => Ok(numbers().reduce(f64::max).map(number).unwrap_or_default()),
        "abs" => Ok(match args.first() {
            Some(Value::Int(i)) => Value::Int(i.wrapping_abs()),
            Some(v) => v.as_f64().map(|f| Value::Float(f.abs())).unwrap_or_default(),
            None => Value::Undefined,
        }),
        "floor" => Ok(args
            .first()
            .and_then(Value::as_f64)
            .map(|f| Value::Int(f.floor() as i64))
            .unwrap_or_default()),
        _ => Err(ExprError::UnknownFunction(name.to_string())),
    }
}

/// Whole floats collapse back to ints so `min(1, 2)` stays an int.
fn number(f: f64) -> Value {
    if f.is_finite() && f == f.floor() && f.abs() < 1e15 {
        Value::Int(f as i64)
    } else {
        Value::Float(f)
    }
}

/// Evaluate an expression against `scope`.
pub fn evaluate(input: &str, scope: &Scope, rng: &mut StdRng) -> Result<Value, ExprError> {
    let mut parser = Parser::new(tokenize(input)?);
    let expr = parser.expr()?;
    parser.finish()?;
    eval(&expr, scope, rng)
}

/// Execute a statement against `scope`, returning the write it implies.
/// The scope itself is not modified.
pub fn execute(input: &str, scope: &Scope, rng: &mut StdRng) -> Result<Effect, ExprError> {
    let mut parser = Parser::new(tokenize(input)?);
    match parser.statement()? {
        Statement::Assign { name, op, value } => {
            let rhs = eval(&value, scope, rng)?;
            let value = match op {
                None => rhs,
                Some(op) => {
                    let current = scope.get(&name).cloned().unwrap_or(Value::Int(0));
                    binary(op, current, rhs)?
                }
            };
            Ok(Effect::Assign { name, value })
        }
        Statement::Delete(name) => Ok(Effect::Delete(name)),
        Statement::Expr(expr) => Ok(Effect::Value(eval(&expr, scope, rng)?)),
    }
}

/// Parse an expression without evaluating it.
pub fn check(input: &str) -> Result<(), ExprError> {
    let mut parser = Parser::new(tokenize(input)?);
    parser.expr()?;
    parser.finish()
}

/// Parse a statement without executing it.
pub fn check_statement(input: &str) -> Result<(), ExprError> {
    Parser::new(tokenize(input)?).statement().map(|_| ())
}

/// Replace every `{expr}` in `template` with its evaluated value.
/// `{{` and `}}` produce literal braces. Failed interpolations render as
/// empty text; an unclosed brace is kept literally.
pub fn format(template: &str, scope: &Scope, rng: &mut StdRng) -> String {
    let chars: Vec<char> = template.chars().collect();
    let len = chars.len();
    let mut out = String::with_capacity(template.len());
    let mut i = 0;

    while i < len {
        match chars[i] {
            '{' if i + 1 < len && chars[i + 1] == '{' => {
                out.push('{');
                i += 2;
            }
            '}' if i + 1 < len && chars[i + 1] == '}' => {
                out.push('}');
                i += 2;
            }
            '{' => match chars[i + 1..].iter().position(|c| *c == '}') {
                Some(offset) => {
                    let inner: String = chars[i + 1..i + 1 + offset].iter().collect();
                    match evaluate(&inner, scope, rng) {
                        Ok(value) => out.push_str(&value.to_string()),
                        Err(e) => {
                            tracing::warn!(expression = %inner, error = %e, "interpolation failed")
                        }
                    }
                    i += offset + 2;
                }
                None => {
                    out.extend(&chars[i..]);
                    break;
                }
            },
            c => {
                out.push(c);
                i += 1;
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    fn scope() -> Scope {
        let mut s = Scope::default();
        s.insert("gold".to_string(), Value::Int(10));
        s.insert("name".to_string(), Value::from("Ada"));
        s.insert("intro.hall".to_string(), Value::Int(2));
        s
    }

    fn eval_str(input: &str) -> Value {
        evaluate(input, &scope(), &mut rng()).unwrap()
    }

    #[test]
    fn arithmetic_and_precedence() {
        assert_eq!(eval_str("2 + 3 * 4"), Value::Int(14));
        assert_eq!(eval_str("(2 + 3) * 4"), Value::Int(20));
        assert_eq!(eval_str("7 / 2"), Value::Float(3.5));
        assert_eq!(eval_str("6 / 2"), Value::Int(3));
        assert_eq!(eval_str("10 % 3"), Value::Int(1));
        assert_eq!(eval_str("-gold + 1"), Value::Int(-9));
    }

    #[test]
    fn comparison_and_logic() {
        assert_eq!(eval_str("gold > 5 && name == \"Ada\""), Value::Bool(true));
        assert_eq!(eval_str("gold < 5 or not false"), Value::Bool(true));
        assert_eq!(eval_str("name is 'Bob'"), Value::Bool(false));
        assert_eq!(eval_str("name is not 'Bob'"), Value::Bool(true));
        assert_eq!(eval_str("intro.hall >= 2"), Value::Bool(true));
    }

    #[test]
    fn unknown_variable_is_undefined() {
        assert_eq!(eval_str("missing"), Value::Undefined);
        assert_eq!(eval_str("!missing"), Value::Bool(true));
    }

    #[test]
    fn string_concatenation() {
        assert_eq!(eval_str("name + \" has \" + gold"), Value::from("Ada has 10"));
    }

    #[test]
    fn division_by_zero_is_an_error() {
        assert_eq!(
            evaluate("gold / 0", &scope(), &mut rng()),
            Err(ExprError::DivisionByZero)
        );
    }

    #[test]
    fn parse_errors() {
        assert!(evaluate("1 +", &scope(), &mut rng()).is_err());
        assert!(evaluate("(1", &scope(), &mut rng()).is_err());
        assert!(evaluate("\"open", &scope(), &mut rng()).is_err());
        assert!(evaluate("1 $ 2", &scope(), &mut rng()).is_err());
        assert!(evaluate("nope(1)", &scope(), &mut rng()).is_err());
    }

    #[test]
    fn assignment_statements() {
        let s = scope();
        assert_eq!(
            execute("gold += 5", &s, &mut rng()).unwrap(),
            Effect::Assign {
                name: "gold".to_string(),
                value: Value::Int(15)
            }
        );
        assert_eq!(
            execute("var met = true", &s, &mut rng()).unwrap(),
            Effect::Assign {
                name: "met".to_string(),
                value: Value::Bool(true)
            }
        );
        assert_eq!(
            execute("count += 1", &s, &mut rng()).unwrap(),
            Effect::Assign {
                name: "count".to_string(),
                value: Value::Int(1)
            }
        );
        assert_eq!(
            execute("delete gold", &s, &mut rng()).unwrap(),
            Effect::Delete("gold".to_string())
        );
        assert_eq!(
            execute("gold == 10", &s, &mut rng()).unwrap(),
            Effect::Value(Value::Bool(true))
        );
    }

    #[test]
    fn random_is_seeded() {
        let a = evaluate("random(1, 100)", &scope(), &mut rng()).unwrap();
        let b = evaluate("random(1, 100)", &scope(), &mut rng()).unwrap();
        assert_eq!(a, b);
        match a {
            Value::Int(n) => assert!((1..=100).contains(&n)),
            other => panic!("expected int, got {:?}", other),
        }
    }

    #[test]
    fn random_with_unbounded_range_is_undefined() {
        let overflowing = format!("random(0.5, 1{})", "0".repeat(400));
        assert_eq!(eval_str(&overflowing), Value::Undefined);

        let mut s = scope();
        s.insert("huge".to_string(), Value::Float(f64::MAX));
        assert_eq!(
            evaluate("random(-huge, huge)", &s, &mut rng()).unwrap(),
            Value::Undefined
        );
        assert_eq!(
            evaluate("random(0.5, 0.0 / 0.5 + huge * 2)", &s, &mut rng()).unwrap(),
            Value::Undefined
        );

        match eval_str("random(0.5, 1.5)") {
            Value::Float(f) => assert!((0.5..1.5).contains(&f)),
            other => panic!("expected float, got {:?}", other),
        }
    }

    #[test]
    fn builtin_functions() {
        assert_eq!(eval_str("min(3, 1, 2)"), Value::Int(1));
        assert_eq!(eval_str("max(3, 1.5)"), Value::Int(3));
        assert_eq!(eval_str("abs(-4)"), Value::Int(4));
        assert_eq!(eval_str("floor(2.7)"), Value::Int(2));
    }

    #[test]
    fn format_interpolates() {
        let s = scope();
        assert_eq!(
            format("{name} has {gold * 2} coins", &s, &mut rng()),
            "Ada has 20 coins"
        );
        assert_eq!(format("{{literal}}", &s, &mut rng()), "{literal}");
        assert_eq!(format("broken {1 +} end", &s, &mut rng()), "broken  end");
        assert_eq!(format("open {brace", &s, &mut rng()), "open {brace");
    }

    #[test]
    fn check_reports_syntax_only() {
        assert!(check("gold > 3 && unknown_var").is_ok());
        assert!(check("1 +").is_err());
        assert!(check_statement("gold += 1").is_ok());
        assert!(check_statement("delete gold").is_ok());
        assert!(check_statement("gold = = 1").is_err());
    }
}
