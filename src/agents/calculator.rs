//! Safe calculator over free text.
//!
//! Extracts a math expression from natural language ("compute (145 + 268) × 3
//! – 42"), normalizes it, and evaluates it with a small recursive-descent
//! parser. Only arithmetic operators, a fixed set of functions, and the
//! constants `pi`/`e` are allowed — there is no dynamic evaluation anywhere.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum CalcError {
    #[error("empty expression")]
    Empty,

    #[error("unexpected character: {0}")]
    UnexpectedChar(char),

    #[error("unknown symbol: {0}")]
    UnknownSymbol(String),

    #[error("unknown function: {0}")]
    UnknownFunction(String),

    #[error("division by zero")]
    DivisionByZero,

    #[error("malformed expression")]
    Malformed,
}

// ── Expression extraction / normalization ────────────────────────────

static MATH_BLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:sqrt|sin|cos|tan|log10|log|exp|deg|pi|\d|\s|[+\-*/().,^°²³%×∙·÷−–—])+")
        .unwrap()
});
static MATH_START_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(sqrt|sin|cos|tan|log10|log|exp|\d)").unwrap());
static SUPERSCRIPT2_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+)\s*²").unwrap());
static SUPERSCRIPT3_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+)\s*³").unwrap());
static TRIG_DEG_SUFFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(sin|cos|tan)\s*([0-9]+(?:\.[0-9]+)?)\s*(?:°|deg\b)").unwrap()
});
static INLINE_TRIG_DEG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(sin|cos|tan)\s*([0-9]+(?:\.[0-9]+)?)\b").unwrap()
});
static INLINE_FUNC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(sqrt|log10|log|exp)\s*([0-9]+(?:\.[0-9]+)?)\b").unwrap()
});
static PAREN_TRIG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(sin|cos|tan)\s*\(\s*([^)]+)\s*\)").unwrap());
static DEG_VALUE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*([0-9]+(?:\.[0-9]+)?)\s*(°|deg)\s*$").unwrap());

/// Extract and normalize a math expression from free text.
///
/// Handles comma decimals, unicode operators, `**`, superscripts, inline
/// degree forms (`sin45`, `sin 45°`), shorthand function calls (`sqrt16`),
/// and unbalanced parentheses. Returns an empty string when nothing
/// math-shaped is found.
pub fn extract_expression(text: &str) -> String {
    let raw = text.trim();
    if raw.is_empty() {
        return String::new();
    }

    // First math-looking block that actually contains a digit or a function
    // (a run of bare spaces also matches the block pattern), or everything
    // from the first math token as a last resort.
    let block = MATH_BLOCK_RE
        .find_iter(raw)
        .map(|m| m.as_str().trim())
        .find(|s| MATH_START_RE.is_match(s));
    let mut expr = match block {
        Some(s) => s.to_string(),
        None => match MATH_START_RE.find(raw) {
            Some(m) => raw[m.start()..].trim().to_string(),
            None => return String::new(),
        },
    };

    expr = expr.replace(',', ".");
    expr = expr.replace("**", "^");

    // Unicode operators pasted from documents
    expr = expr
        .replace('×', "*")
        .replace('∙', "*")
        .replace('·', "*")
        .replace('÷', "/")
        .replace('−', "-")
        .replace('–', "-")
        .replace('—', "-");

    expr = balance_parentheses(&expr);

    expr = SUPERSCRIPT2_RE.replace_all(&expr, "$1^2").into_owned();
    expr = SUPERSCRIPT3_RE.replace_all(&expr, "$1^3").into_owned();

    // "sin 45°" / "tan 30deg" → radians, before the bare inline form below
    // consumes the number and strands the degree sign.
    expr = TRIG_DEG_SUFFIX_RE
        .replace_all(&expr, |caps: &Captures| {
            let func = caps[1].to_lowercase();
            let deg: f64 = caps[2].parse().unwrap_or(0.0);
            format!("{func}({})", deg.to_radians())
        })
        .into_owned();

    // "sin45" means degrees; convert to radians up front.
    expr = INLINE_TRIG_DEG_RE
        .replace_all(&expr, |caps: &Captures| {
            let func = caps[1].to_lowercase();
            let deg: f64 = caps[2].parse().unwrap_or(0.0);
            format!("{func}({})", deg.to_radians())
        })
        .into_owned();

    // "sqrt16" / "log10 100" → add the parentheses.
    expr = INLINE_FUNC_RE.replace_all(&expr, "$1($2)").into_owned();

    // "sin(45°)" / "sin(45deg)" → radians; bare "sin(0.5)" stays radians.
    expr = PAREN_TRIG_RE
        .replace_all(&expr, |caps: &Captures| {
            let func = caps[1].to_lowercase();
            let inside = &caps[2];
            match DEG_VALUE_RE.captures(inside) {
                Some(deg_caps) => {
                    let deg: f64 = deg_caps[1].parse().unwrap_or(0.0);
                    format!("{func}({})", deg.to_radians())
                }
                None => format!("{func}({inside})"),
            }
        })
        .into_owned();

    expr.trim().to_string()
}

/// Drop unmatched closing parentheses and close any left open at the end.
fn balance_parentheses(s: &str) -> String {
    let mut open = 0usize;
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '(' => {
                open += 1;
                out.push(c);
            }
            ')' => {
                if open > 0 {
                    open -= 1;
                    out.push(c);
                }
            }
            _ => out.push(c),
        }
    }
    for _ in 0..open {
        out.push(')');
    }
    out
}

// ── Tokenizer ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Num(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Caret,
    LParen,
    RParen,
}

fn tokenize(expr: &str) -> Result<Vec<Token>, CalcError> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = expr.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' => i += 1,
            '+' => {
                tokens.push(Token::Plus);
                i += 1;
            }
            '-' => {
                tokens.push(Token::Minus);
                i += 1;
            }
            '*' => {
                tokens.push(Token::Star);
                i += 1;
            }
            '/' => {
                tokens.push(Token::Slash);
                i += 1;
            }
            '%' => {
                tokens.push(Token::Percent);
                i += 1;
            }
            '^' => {
                tokens.push(Token::Caret);
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '0'..='9' | '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let lit: String = chars[start..i].iter().collect();
                let value = lit.parse::<f64>().map_err(|_| CalcError::Malformed)?;
                tokens.push(Token::Num(value));
            }
            c if c.is_ascii_alphabetic() => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric()) {
                    i += 1;
                }
                let ident: String = chars[start..i].iter().collect();
                tokens.push(Token::Ident(ident.to_lowercase()));
            }
            other => return Err(CalcError::UnexpectedChar(other)),
        }
    }

    Ok(tokens)
}

// ── Parser / evaluator ───────────────────────────────────────────────

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.pos).cloned();
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn expect(&mut self, token: &Token) -> Result<(), CalcError> {
        match self.advance() {
            Some(ref t) if t == token => Ok(()),
            _ => Err(CalcError::Malformed),
        }
    }

    fn parse_expr(&mut self, min_prec: u8) -> Result<f64, CalcError> {
        let mut lhs = self.parse_unary()?;

        while let Some(token) = self.peek() {
            let (prec, right_assoc) = match token {
                Token::Plus | Token::Minus => (1, false),
                Token::Star | Token::Slash | Token::Percent => (2, false),
                Token::Caret => (3, true),
                _ => break,
            };
            if prec < min_prec {
                break;
            }

            let op = self.advance().ok_or(CalcError::Malformed)?;
            let next_min = if right_assoc { prec } else { prec + 1 };
            let rhs = self.parse_expr(next_min)?;

            lhs = match op {
                Token::Plus => lhs + rhs,
                Token::Minus => lhs - rhs,
                Token::Star => lhs * rhs,
                Token::Slash => {
                    if rhs == 0.0 {
                        return Err(CalcError::DivisionByZero);
                    }
                    lhs / rhs
                }
                Token::Percent => {
                    if rhs == 0.0 {
                        return Err(CalcError::DivisionByZero);
                    }
                    lhs % rhs
                }
                Token::Caret => lhs.powf(rhs),
                _ => unreachable!(),
            };
        }

        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<f64, CalcError> {
        if matches!(self.peek(), Some(Token::Minus)) {
            self.advance();
            return Ok(-self.parse_unary()?);
        }
        if matches!(self.peek(), Some(Token::Plus)) {
            self.advance();
            return self.parse_unary();
        }
        self.parse_atom()
    }

    fn parse_atom(&mut self) -> Result<f64, CalcError> {
        match self.advance() {
            Some(Token::Num(value)) => Ok(value),
            Some(Token::LParen) => {
                let value = self.parse_expr(1)?;
                self.expect(&Token::RParen)?;
                Ok(value)
            }
            Some(Token::Ident(name)) => {
                // A call if followed by '(', otherwise a constant.
                if matches!(self.peek(), Some(Token::LParen)) {
                    self.advance();
                    let arg = self.parse_expr(1)?;
                    self.expect(&Token::RParen)?;
                    apply_function(&name, arg)
                } else {
                    match name.as_str() {
                        "pi" => Ok(std::f64::consts::PI),
                        "e" => Ok(std::f64::consts::E),
                        _ => Err(CalcError::UnknownSymbol(name)),
                    }
                }
            }
            _ => Err(CalcError::Malformed),
        }
    }
}

fn apply_function(name: &str, arg: f64) -> Result<f64, CalcError> {
    match name {
        "sqrt" => Ok(arg.sqrt()),
        "sin" => Ok(arg.sin()),
        "cos" => Ok(arg.cos()),
        "tan" => Ok(arg.tan()),
        "log" | "ln" => Ok(arg.ln()),
        "log10" => Ok(arg.log10()),
        "exp" => Ok(arg.exp()),
        other => Err(CalcError::UnknownFunction(other.to_string())),
    }
}

/// Evaluate an already-normalized expression.
pub fn eval_expression(expr: &str) -> Result<f64, CalcError> {
    let tokens = tokenize(expr)?;
    if tokens.is_empty() {
        return Err(CalcError::Empty);
    }
    let mut parser = Parser { tokens, pos: 0 };
    let value = parser.parse_expr(1)?;
    if parser.pos != parser.tokens.len() {
        return Err(CalcError::Malformed);
    }
    Ok(value)
}

/// Format a result: integers render without decimals, everything else with
/// at most ten decimal places.
fn format_result(value: f64) -> String {
    if value.is_finite() && (value - value.round()).abs() < 1e-12 && value.abs() < 1e15 {
        return format!("{}", value.round() as i64);
    }
    let s = format!("{value:.10}");
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}

/// Evaluate a math expression contained in natural text and return a
/// display-ready markdown block.
pub fn calculate(text: &str) -> String {
    let normalized = extract_expression(text);
    if normalized.is_empty() {
        return "🛠️ Calculator\n\nRecognized expression: *none*\nResult: error: empty expression"
            .to_string();
    }

    match eval_expression(&normalized) {
        Ok(value) => format!(
            "🛠️ Calculator\n\nRecognized expression: `{normalized}`\nResult: **{}**",
            format_result(value)
        ),
        Err(e) => format!(
            "🛠️ Calculator\n\nRecognized expression: `{normalized}`\nResult: error: {e}"
        ),
    }
}
