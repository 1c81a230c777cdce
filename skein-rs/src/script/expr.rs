//! Expression lexer, AST, parser, and evaluator.
//!
//! Expressions appear in `if` conditions and in `eval` / `evalmath`, after
//! variable substitution has already happened, so there are no variable
//! references here: every operand is a word, a quoted string, or a
//! parenthesised sub-expression.
//!
//! Operator precedence (lowest → highest):
//!   or  →  and  →  relational  →  additive  →  multiplicative  →  unary  →
//!   primary
//!
//! Adjacent words with no operator between them form one text operand, so
//! `$lefthand == steel sword` compares against `"steel sword"`.

use super::value::Value;

// ── Token ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Word(String),
    Str(String),

    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Bang,

    Eq, // == or =
    Ne, // !=
    Lt,
    Le,
    Gt,
    Ge,

    And, // &&
    Or,  // ||

    LParen,
    RParen,
    Eof,
}

// ── Lexer ─────────────────────────────────────────────────────────────────────

struct Lexer<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Lexer { src, pos: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn peek2(&self) -> Option<char> {
        let mut it = self.src[self.pos..].chars();
        it.next();
        it.next()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn eat(&mut self, ch: char) -> bool {
        if self.peek() == Some(ch) {
            self.pos += ch.len_utf8();
            true
        } else {
            false
        }
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.advance();
        }
    }

    /// `%` directly followed by a letter is an unresolved variable reference
    /// and reads as part of a word, not as the modulo operator.
    fn percent_starts_word(&self) -> bool {
        self.peek() == Some('%') && self.peek2().is_some_and(|c| c.is_alphabetic() || c == '_')
    }

    fn is_word_char(&self, word_so_far: &str) -> bool {
        match self.peek() {
            None => false,
            Some(c) if c.is_whitespace() => false,
            Some('&') => self.peek2() != Some('&'),
            Some('|') => self.peek2() != Some('|'),
            Some('%') => self.percent_starts_word(),
            // Hyphenated text like `north-east` stays one word; `2-1` does not.
            Some('-') => word_so_far.chars().any(char::is_alphabetic),
            Some('(' | ')' | '=' | '!' | '<' | '>' | '+' | '*' | '/' | '"') => false,
            Some(_) => true,
        }
    }

    fn read_word(&mut self) -> Token {
        let start = self.pos;
        while self.is_word_char(&self.src[start..self.pos]) {
            self.advance();
        }
        Token::Word(self.src[start..self.pos].to_owned())
    }

    fn read_string(&mut self) -> Token {
        let mut s = String::new();
        loop {
            match self.advance() {
                None | Some('"') => break,
                Some('\\') => match self.advance() {
                    Some(c) => s.push(c),
                    None => break,
                },
                Some(c) => s.push(c),
            }
        }
        Token::Str(s)
    }

    fn next_token(&mut self) -> Result<Token, String> {
        self.skip_ws();
        if self.is_word_char("") {
            return Ok(self.read_word());
        }
        let ch = match self.advance() {
            None => return Ok(Token::Eof),
            Some(c) => c,
        };

        Ok(match ch {
            '"' => self.read_string(),
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' => Token::Star,
            '/' => Token::Slash,
            '%' => Token::Percent,
            '(' => Token::LParen,
            ')' => Token::RParen,
            '!' => {
                if self.eat('=') {
                    Token::Ne
                } else {
                    Token::Bang
                }
            }
            '=' => {
                self.eat('=');
                Token::Eq
            }
            '<' => {
                if self.eat('=') {
                    Token::Le
                } else {
                    Token::Lt
                }
            }
            '>' => {
                if self.eat('=') {
                    Token::Ge
                } else {
                    Token::Gt
                }
            }
            '&' => {
                self.eat('&');
                Token::And
            }
            '|' => {
                self.eat('|');
                Token::Or
            }
            c => return Err(format!("unexpected character '{c}'")),
        })
    }

    fn tokenize(mut self) -> Result<Vec<Token>, String> {
        let mut tokens = Vec::new();
        loop {
            let t = self.next_token()?;
            let done = t == Token::Eof;
            tokens.push(t);
            if done {
                break;
            }
        }
        Ok(tokens)
    }
}

// ── AST ───────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
}

// ── Parser ────────────────────────────────────────────────────────────────────

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Parser { tokens, pos: 0 }
    }

    fn peek(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&Token::Eof)
    }

    fn advance(&mut self) -> Token {
        let t = self.tokens.get(self.pos).cloned().unwrap_or(Token::Eof);
        self.pos += 1;
        t
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == expected {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    // ── Grammar ───────────────────────────────────────────────────────────────

    fn parse_expr(&mut self) -> Result<Expr, String> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Expr, String> {
        let mut lhs = self.parse_and()?;
        while self.eat(&Token::Or) {
            let rhs = self.parse_and()?;
            lhs = Expr::Binary(BinOp::Or, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr, String> {
        let mut lhs = self.parse_relational()?;
        while self.eat(&Token::And) {
            let rhs = self.parse_relational()?;
            lhs = Expr::Binary(BinOp::And, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_relational(&mut self) -> Result<Expr, String> {
        let mut lhs = self.parse_additive()?;
        loop {
            let op = match self.peek() {
                Token::Eq => BinOp::Eq,
                Token::Ne => BinOp::Ne,
                Token::Lt => BinOp::Lt,
                Token::Le => BinOp::Le,
                Token::Gt => BinOp::Gt,
                Token::Ge => BinOp::Ge,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.parse_additive()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_additive(&mut self) -> Result<Expr, String> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                Token::Plus => BinOp::Add,
                Token::Minus => BinOp::Sub,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.parse_multiplicative()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, String> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Token::Star => BinOp::Mul,
                Token::Slash => BinOp::Div,
                Token::Percent => BinOp::Rem,
                _ => break,
            };
            self.pos += 1;
            let rhs = self.parse_unary()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr, String> {
        if self.eat(&Token::Bang) {
            let inner = self.parse_unary()?;
            return Ok(Expr::Unary(UnaryOp::Not, Box::new(inner)));
        }
        if self.eat(&Token::Minus) {
            let inner = self.parse_unary()?;
            return Ok(Expr::Unary(UnaryOp::Neg, Box::new(inner)));
        }
        if self.eat(&Token::Plus) {
            return self.parse_unary();
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr, String> {
        match self.advance() {
            Token::LParen => {
                let inner = self.parse_expr()?;
                if !self.eat(&Token::RParen) {
                    return Err("expected ')'".into());
                }
                Ok(inner)
            }
            Token::Str(s) => Ok(Expr::Literal(Value::Text(s))),
            Token::Word(first) => {
                let mut words = vec![first];
                while let Token::Word(w) = self.peek() {
                    words.push(w.clone());
                    self.pos += 1;
                }
                Ok(Expr::Literal(if words.len() == 1 {
                    Value::parse(&words[0])
                } else {
                    Value::Text(words.join(" "))
                }))
            }
            Token::Eof => Err("unexpected end of expression".into()),
            t => Err(format!("unexpected token {t:?}")),
        }
    }
}

// ── Public entry points ───────────────────────────────────────────────────────

/// Parse `src` into an expression tree.
pub fn parse(src: &str) -> Result<Expr, String> {
    let tokens = Lexer::new(src).tokenize()?;
    let mut parser = Parser::new(tokens);
    let expr = parser.parse_expr()?;
    match parser.peek() {
        Token::Eof => Ok(expr),
        t => Err(format!("unexpected trailing token {t:?}")),
    }
}

/// Parse and evaluate `src`.
pub fn evaluate(src: &str) -> Result<Value, String> {
    eval(&parse(src)?)
}

/// Evaluate `src` as a condition.  Anything that fails to evaluate is false.
pub fn evaluate_logic(src: &str) -> bool {
    evaluate(src).map(|v| v.truthy()).unwrap_or(false)
}

/// Evaluate `src` as arithmetic.
pub fn evaluate_number(src: &str) -> Result<f64, String> {
    match evaluate(src)? {
        Value::Number(n) => Ok(n),
        other => Err(format!("'{other}' is not a number")),
    }
}

pub fn eval(expr: &Expr) -> Result<Value, String> {
    match expr {
        Expr::Literal(v) => Ok(v.clone()),
        Expr::Unary(UnaryOp::Not, inner) => Ok(Value::Bool(!eval(inner)?.truthy())),
        Expr::Unary(UnaryOp::Neg, inner) => match eval(inner)? {
            Value::Number(n) => Ok(Value::Number(-n)),
            other => Err(format!("cannot negate '{other}'")),
        },
        Expr::Binary(BinOp::And, lhs, rhs) => {
            Ok(Value::Bool(eval(lhs)?.logic_operand() && eval(rhs)?.logic_operand()))
        }
        Expr::Binary(BinOp::Or, lhs, rhs) => {
            Ok(Value::Bool(eval(lhs)?.logic_operand() || eval(rhs)?.logic_operand()))
        }
        Expr::Binary(op, lhs, rhs) => apply_binop(*op, eval(lhs)?, eval(rhs)?),
    }
}

fn apply_binop(op: BinOp, a: Value, b: Value) -> Result<Value, String> {
    use std::cmp::Ordering::*;
    Ok(match op {
        BinOp::Eq => Value::Bool(a.loose_eq(&b)),
        BinOp::Ne => Value::Bool(!a.loose_eq(&b)),
        BinOp::Lt => Value::Bool(a.compare(&b) == Less),
        BinOp::Le => Value::Bool(a.compare(&b) != Greater),
        BinOp::Gt => Value::Bool(a.compare(&b) == Greater),
        BinOp::Ge => Value::Bool(a.compare(&b) != Less),
        BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Rem => {
            let (Some(x), Some(y)) = (a.as_number(), b.as_number()) else {
                return Err(format!("cannot apply {op:?} to '{a}' and '{b}'"));
            };
            Value::Number(match op {
                BinOp::Add => x + y,
                BinOp::Sub => x - y,
                BinOp::Mul => x * y,
                BinOp::Div if y == 0.0 => return Err("division by zero".into()),
                BinOp::Div => x / y,
                BinOp::Rem if y == 0.0 => return Err("division by zero".into()),
                _ => x % y,
            })
        }
        BinOp::And => Value::Bool(a.logic_operand() && b.logic_operand()),
        BinOp::Or => Value::Bool(a.logic_operand() || b.logic_operand()),
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
