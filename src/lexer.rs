use crate::types::{Token, TokenKind};

/// Maximum length of a single token, in bytes.
const MAX_TOKEN_LENGTH: usize = 1000;

/// Characters that can start an operator symbol.
const OPERATOR_START: &str = "+-*/%&|^<>=!~";

/// The lexer struct, which produces tokens from an input string.
///
/// The lexer never fails: invalid input is reported as a [`TokenKind::Illegal`] token
/// whose text is the diagnostic message. After the last real token it yields a single
/// [`TokenKind::End`] token and is then exhausted.
#[derive(Clone)]
pub struct Lexer<'a> {
    input: &'a str,
    pub pos: usize,
    finished: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            finished: false,
        }
    }

    /// Peek at the current character.
    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    /// Peek at the character after the current one.
    fn peek_second(&self) -> Option<char> {
        let mut chars = self.input[self.pos..].chars();
        chars.next();
        chars.next()
    }

    /// Advance the position by one character.
    fn advance(&mut self) {
        if let Some(c) = self.peek() {
            self.pos += c.len_utf8();
        }
    }

    /// Skip whitespace and comments.
    ///
    /// Returns an illegal token if a block comment is never closed.
    fn skip_trivia(&mut self) -> Option<Token> {
        loop {
            while let Some(c) = self.peek() {
                if c.is_whitespace() {
                    self.advance();
                } else {
                    break;
                }
            }

            let rest = &self.input[self.pos..];
            if rest.starts_with("//") {
                match rest.find('\n') {
                    Some(offset) => self.pos += offset + 1,
                    None => self.pos = self.input.len(),
                }
            } else if rest.starts_with("/*") {
                match rest[2..].find("*/") {
                    Some(offset) => self.pos += offset + 4,
                    None => {
                        let start = self.pos;
                        self.pos = self.input.len();
                        return Some(Token::illegal("comment not terminated", start));
                    }
                }
            } else {
                return None;
            }
        }
    }

    /// Check if a token is too long
    fn check_token_length(&self, start_pos: usize, end_pos: usize) -> Result<(), String> {
        if end_pos - start_pos > MAX_TOKEN_LENGTH {
            return Err(format!(
                "token too long: {} characters (maximum is {})",
                end_pos - start_pos,
                MAX_TOKEN_LENGTH
            ));
        }
        Ok(())
    }

    /// Get the next token from the input.
    ///
    /// Returns `None` once the input is exhausted; unlike the [`Iterator`]
    /// implementation this never produces an `End` token.
    pub fn next_token(&mut self) -> Option<Token> {
        if let Some(illegal) = self.skip_trivia() {
            return Some(illegal);
        }
        let start_pos = self.pos;
        let c = self.peek()?;

        // Number (integer or float, possibly scientific notation)
        if c.is_ascii_digit() || (c == '.' && self.peek_second().is_some_and(|d| d.is_ascii_digit()))
        {
            return Some(self.lex_number(start_pos));
        }

        if c == '"' || c == '\'' {
            return Some(self.lex_string(start_pos, c));
        }

        // Operators, longest match first
        if OPERATOR_START.contains(c) {
            self.advance();
            let mut text = String::from(c);
            if let Some(nc) = self.peek() {
                match (c, nc) {
                    ('*', '*') | ('&', '&') | ('|', '|') | ('<', '<') | ('>', '>') | ('<', '>')
                    | ('<', '=') | ('>', '=') | ('=', '=') | ('!', '=') => {
                        text.push(nc);
                        self.advance();
                    }
                    _ => {}
                }
            }
            return Some(Token::new(TokenKind::Operator, text, start_pos));
        }

        // Identifier (function name)
        if c.is_ascii_alphabetic() || c == '_' {
            let mut end = self.pos;
            while let Some(nc) = self.input[end..].chars().next() {
                if nc.is_ascii_alphanumeric() || nc == '_' {
                    end += nc.len_utf8();
                } else {
                    break;
                }
            }
            self.pos = end;

            if let Err(err) = self.check_token_length(start_pos, end) {
                return Some(Token::illegal(err, start_pos));
            }
            return Some(Token::new(
                TokenKind::Identifier,
                &self.input[start_pos..end],
                start_pos,
            ));
        }

        // Other punctuation
        self.advance();
        let token = match c {
            '(' => Token::new(TokenKind::Open, "(", start_pos),
            ')' => Token::new(TokenKind::Close, ")", start_pos),
            ',' => Token::new(TokenKind::Separator, ",", start_pos),
            _ => Token::illegal(format!("unexpected character '{}'", c), start_pos),
        };
        Some(token)
    }

    fn lex_number(&mut self, start_pos: usize) -> Token {
        let mut saw_dot = false;
        let mut saw_e = false;
        let mut has_digits_after_e = false;

        while let Some(nc) = self.peek() {
            if nc.is_ascii_digit() {
                self.advance();
                if saw_e {
                    has_digits_after_e = true;
                }
            } else if nc == '.' && !saw_dot && !saw_e {
                saw_dot = true;
                self.advance();
            } else if (nc == 'e' || nc == 'E') && !saw_e {
                saw_e = true;
                self.advance();
                // Optional sign after e/E
                if let Some(sign) = self.peek() {
                    if sign == '+' || sign == '-' {
                        self.advance();
                    }
                }
            } else {
                break;
            }
        }

        let text = &self.input[start_pos..self.pos];
        if let Err(err) = self.check_token_length(start_pos, self.pos) {
            return Token::illegal(err, start_pos);
        }

        // Validate scientific notation has digits after 'e'
        if saw_e && !has_digits_after_e {
            return Token::illegal(format!("exponent has no digits: {}", text), start_pos);
        }

        if saw_dot || saw_e {
            match text.parse::<f64>() {
                Ok(_) => Token::new(TokenKind::Float, text, start_pos),
                Err(_) => Token::illegal(format!("invalid float literal: {}", text), start_pos),
            }
        } else {
            match text.parse::<i64>() {
                Ok(_) => Token::new(TokenKind::Integer, text, start_pos),
                Err(_) => Token::illegal(
                    format!("integer literal out of range: {}", text),
                    start_pos,
                ),
            }
        }
    }

    fn lex_string(&mut self, start_pos: usize, quote: char) -> Token {
        self.advance();
        while let Some(nc) = self.peek() {
            self.advance();
            if nc == quote {
                if let Err(err) = self.check_token_length(start_pos, self.pos) {
                    return Token::illegal(err, start_pos);
                }
                return Token::new(TokenKind::Str, &self.input[start_pos..self.pos], start_pos);
            }
        }
        Token::illegal("string literal not terminated", start_pos)
    }
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        if self.finished {
            return None;
        }
        match self.next_token() {
            Some(token) => Some(token),
            None => {
                self.finished = true;
                Some(Token::new(TokenKind::End, "", self.input.len()))
            }
        }
    }
}

/// Tokenizes `input` completely, including the trailing `End` token.
pub fn tokenize(input: &str) -> Vec<Token> {
    Lexer::new(input).collect()
}
