//! Expression parser
//!
//! A recursive descent parser with the usual arithmetic precedence:
//! additive < multiplicative < unary < primary.

use crate::ast::{BinaryOp, Expr, UnaryOp};
use tally_core::{Error, Position, Result};

/// Parse a bare expression string into an AST
///
/// The input is the expression *without* a leading formula marker; deciding
/// whether cell text is a formula at all is the engine's job.
///
/// # Example
/// ```rust
/// use tally_formula::parse_expression;
///
/// let ast = parse_expression("1+2").unwrap();
/// let ast = parse_expression("A1*(B2-3)").unwrap();
/// ```
pub fn parse_expression(input: &str) -> Result<Expr> {
    let mut parser = ExprParser::new(input);
    let expr = parser.parse_expression()?;

    // Make sure we consumed all input
    parser.check_scan_error()?;
    if !matches!(parser.current_token(), Token::Eof) {
        return Err(Error::FormulaParse(format!(
            "unexpected trailing input: '{}'",
            &parser.input[parser.token_start..]
        )));
    }

    Ok(expr)
}

/// Token types
#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ref(Position),

    Plus,
    Minus,
    Star,
    Slash,
    LeftParen,
    RightParen,

    Eof,
}

struct ExprParser<'a> {
    input: &'a str,
    pos: usize,
    /// Byte offset where the current token started (for error reporting)
    token_start: usize,
    current_token: Option<Result<Token>>,
}

impl<'a> ExprParser<'a> {
    fn new(input: &'a str) -> Self {
        let mut parser = Self {
            input,
            pos: 0,
            token_start: 0,
            current_token: None,
        };
        parser.advance_token();
        parser
    }

    // === Token scanning ===

    fn advance_token(&mut self) {
        self.skip_whitespace();
        self.token_start = self.pos;
        let token = self.scan_token();
        self.current_token = Some(token);
    }

    fn scan_token(&mut self) -> Result<Token> {
        let c = match self.peek_char() {
            Some(c) => c,
            None => return Ok(Token::Eof),
        };

        match c {
            '+' => {
                self.advance();
                return Ok(Token::Plus);
            }
            '-' => {
                self.advance();
                return Ok(Token::Minus);
            }
            '*' => {
                self.advance();
                return Ok(Token::Star);
            }
            '/' => {
                self.advance();
                return Ok(Token::Slash);
            }
            '(' => {
                self.advance();
                return Ok(Token::LeftParen);
            }
            ')' => {
                self.advance();
                return Ok(Token::RightParen);
            }
            _ => {}
        }

        if c.is_ascii_digit() || c == '.' {
            return self.scan_number();
        }

        if c.is_ascii_alphabetic() {
            return self.scan_reference();
        }

        Err(Error::FormulaParse(format!("unexpected character '{}'", c)))
    }

    fn scan_number(&mut self) -> Result<Token> {
        let start = self.pos;

        while self.peek_char().map_or(false, |c| c.is_ascii_digit()) {
            self.advance();
        }

        if self.peek_char() == Some('.') {
            self.advance();
            while self.peek_char().map_or(false, |c| c.is_ascii_digit()) {
                self.advance();
            }
        }

        if self.peek_char().map_or(false, |c| c == 'e' || c == 'E') {
            self.advance();
            if self.peek_char().map_or(false, |c| c == '+' || c == '-') {
                self.advance();
            }
            while self.peek_char().map_or(false, |c| c.is_ascii_digit()) {
                self.advance();
            }
        }

        let num_str = &self.input[start..self.pos];
        let num: f64 = num_str
            .parse()
            .map_err(|_| Error::FormulaParse(format!("invalid number '{}'", num_str)))?;
        Ok(Token::Number(num))
    }

    fn scan_reference(&mut self) -> Result<Token> {
        let start = self.pos;

        while self
            .peek_char()
            .map_or(false, |c| c.is_ascii_alphanumeric())
        {
            self.advance();
        }

        let text = &self.input[start..self.pos];
        let pos = Position::parse(text)
            .map_err(|_| Error::FormulaParse(format!("invalid cell reference '{}'", text)))?;
        Ok(Token::Ref(pos))
    }

    // === Helper methods ===

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek_char() {
            self.pos += c.len_utf8();
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek_char().map_or(false, |c| c.is_whitespace()) {
            self.advance();
        }
    }

    fn current_token(&self) -> &Token {
        match &self.current_token {
            Some(Ok(token)) => token,
            _ => &Token::Eof,
        }
    }

    fn consume(&mut self) -> Result<Token> {
        let token = self.current_token.take().unwrap_or(Ok(Token::Eof))?;
        self.advance_token();
        Ok(token)
    }

    fn check_scan_error(&mut self) -> Result<()> {
        if matches!(self.current_token, Some(Err(_))) {
            // Surface the tokenizer error exactly once
            if let Some(Err(e)) = self.current_token.take() {
                return Err(e);
            }
        }
        Ok(())
    }

    fn expect(&mut self, expected: Token) -> Result<()> {
        self.check_scan_error()?;
        if *self.current_token() == expected {
            self.consume()?;
            Ok(())
        } else {
            Err(Error::FormulaParse(format!(
                "expected {:?}, got {:?}",
                expected,
                self.current_token()
            )))
        }
    }

    // === Expression parsing with precedence ===

    fn parse_expression(&mut self) -> Result<Expr> {
        self.parse_additive()
    }

    fn parse_additive(&mut self) -> Result<Expr> {
        let mut left = self.parse_multiplicative()?;

        loop {
            let op = match self.current_token() {
                Token::Plus => BinaryOp::Add,
                Token::Minus => BinaryOp::Subtract,
                _ => break,
            };

            self.consume()?;
            let right = self.parse_multiplicative()?;
            left = Expr::BinaryOp {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr> {
        let mut left = self.parse_unary()?;

        loop {
            let op = match self.current_token() {
                Token::Star => BinaryOp::Multiply,
                Token::Slash => BinaryOp::Divide,
                _ => break,
            };

            self.consume()?;
            let right = self.parse_unary()?;
            left = Expr::BinaryOp {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        self.check_scan_error()?;

        let op = match self.current_token() {
            Token::Minus => Some(UnaryOp::Negate),
            Token::Plus => Some(UnaryOp::Plus),
            _ => None,
        };

        if let Some(op) = op {
            self.consume()?;
            let operand = self.parse_unary()?;
            return Ok(Expr::UnaryOp {
                op,
                operand: Box::new(operand),
            });
        }

        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        self.check_scan_error()?;

        match self.current_token().clone() {
            Token::Number(n) => {
                self.consume()?;
                Ok(Expr::Number(n))
            }

            Token::Ref(pos) => {
                self.consume()?;
                Ok(Expr::Ref(pos))
            }

            Token::LeftParen => {
                self.consume()?;
                let expr = self.parse_expression()?;
                self.expect(Token::RightParen)?;
                Ok(expr)
            }

            token => Err(Error::FormulaParse(format!(
                "unexpected token: {:?}",
                token
            ))),
        }
    }
}
