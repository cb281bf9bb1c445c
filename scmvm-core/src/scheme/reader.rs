//! Lisp reader: streaming tokenizer plus a one-token-lookahead
//! recursive-descent parser producing values straight into the heap.
//!
//! Accepted surface: `()` and `[]` lists (each closed by its own kind),
//! dotted pairs, `'` quote sugar, base-10 integers with an optional sign,
//! `#t`/`#f`, double-quoted strings with `\t \f \n \r \\ \"` escapes,
//! symbols (case-folded to upper case on interning), `;` line comments.
//! A literal containing `.` in digit position is rejected as an invalid
//! number literal; there are no floats.

use std::io::{self, Read};

use super::error::{ErrorKind, EvalResult, ParseErrorKind, Thrown};
use super::eval::Evaluator;
use super::value::Value;

const SYMBOL_PUNCT: &[u8] = b"+-*/%^><=!?&#";
/// Characters that end a number or symbol token without being part of it.
const TOKEN_DELIMS: &[u8] = b"()[]{};'`\"|";

#[derive(Debug, Clone, PartialEq)]
enum Token {
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    Quote,
    Dot,
    Int(i32),
    Bool(bool),
    Str(String),
    Symbol(String),
}

enum Closing {
    Paren,
    Bracket,
}

/// Streaming reader over an input source.  One byte of pushback, one token
/// of lookahead.
pub struct Reader<R> {
    input: R,
    pending_byte: Option<u8>,
    peeked: Option<Token>,
    consumed: usize,
}

impl<R: Read> Reader<R> {
    pub fn new(input: R) -> Self {
        Self {
            input,
            pending_byte: None,
            peeked: None,
            consumed: 0,
        }
    }

    /// Bytes consumed so far, not counting the pushback byte.  After a
    /// successful `read_form` this is the end of that form's last token,
    /// which lets an interactive driver drop evaluated input.
    pub fn offset(&self) -> usize {
        self.consumed - self.pending_byte.is_some() as usize
    }

    /// Read the next top-level form.  `Ok(None)` is clean EOF; EOF inside
    /// a form is a parse error.
    pub fn read_form(&mut self, ev: &mut Evaluator) -> Result<Option<Value>, Thrown> {
        match self.peek_token(ev)? {
            None => Ok(None),
            Some(_) => self.parse_form(ev).map(Some),
        }
    }

    // -----------------------------------------------------------------------
    // Parser
    // -----------------------------------------------------------------------

    fn parse_form(&mut self, ev: &mut Evaluator) -> EvalResult {
        let Some(token) = self.next_token(ev)? else {
            return Err(parse_error(
                ev,
                ParseErrorKind::UnexpectedEof,
                "unexpected eof while reading a form",
            ));
        };

        match token {
            Token::LeftParen => self.parse_list(ev, Closing::Paren),
            Token::LeftBracket => self.parse_list(ev, Closing::Bracket),
            Token::RightParen => Err(parse_error(
                ev,
                ParseErrorKind::UnexpectedClose,
                "unexpected ')'",
            )),
            Token::RightBracket => Err(parse_error(
                ev,
                ParseErrorKind::UnexpectedClose,
                "unexpected ']'",
            )),
            Token::Quote => {
                let quoted = self.parse_form(ev)?;
                let quote = Value::Symbol(ev.intern("quote"));
                let inner = ev.cons(quoted, Value::Nil);
                Ok(ev.cons(quote, inner))
            }
            Token::Dot => Err(parse_error(
                ev,
                ParseErrorKind::InvalidToken,
                "unexpected '.'",
            )),
            Token::Int(n) => Ok(Value::Int(n)),
            Token::Bool(b) => Ok(Value::Bool(b)),
            Token::Str(s) => Ok(ev.alloc_string(s)),
            Token::Symbol(name) => Ok(Value::Symbol(ev.intern(&name))),
        }
    }

    fn parse_list(&mut self, ev: &mut Evaluator, closing: Closing) -> EvalResult {
        let mut items = Vec::new();
        let mut tail = Value::Nil;
        loop {
            let Some(token) = self.peek_token(ev)? else {
                return Err(parse_error(
                    ev,
                    ParseErrorKind::UnexpectedEof,
                    "unexpected eof while reading a list",
                ));
            };
            match (token, &closing) {
                (Token::RightParen, Closing::Paren) | (Token::RightBracket, Closing::Bracket) => {
                    self.next_token(ev)?;
                    break;
                }
                (Token::RightParen, Closing::Bracket) => {
                    return Err(parse_error(
                        ev,
                        ParseErrorKind::UnexpectedClose,
                        "expected ']' but got ')'",
                    ));
                }
                (Token::RightBracket, Closing::Paren) => {
                    return Err(parse_error(
                        ev,
                        ParseErrorKind::UnexpectedClose,
                        "expected ')' but got ']'",
                    ));
                }
                (Token::Dot, _) => {
                    self.next_token(ev)?;
                    tail = self.parse_form(ev)?;
                    let closed = matches!(
                        (self.next_token(ev)?, &closing),
                        (Some(Token::RightParen), Closing::Paren)
                            | (Some(Token::RightBracket), Closing::Bracket)
                    );
                    if !closed {
                        return Err(parse_error(
                            ev,
                            ParseErrorKind::UnexpectedClose,
                            "expected closing delimiter after dotted tail",
                        ));
                    }
                    break;
                }
                _ => items.push(self.parse_form(ev)?),
            }
        }

        let mut acc = tail;
        for item in items.into_iter().rev() {
            acc = ev.cons(item, acc);
        }
        Ok(acc)
    }

    // -----------------------------------------------------------------------
    // Tokenizer
    // -----------------------------------------------------------------------

    fn peek_token(&mut self, ev: &mut Evaluator) -> Result<Option<Token>, Thrown> {
        if self.peeked.is_none() {
            self.peeked = self.scan_token(ev)?;
        }
        Ok(self.peeked.clone())
    }

    fn next_token(&mut self, ev: &mut Evaluator) -> Result<Option<Token>, Thrown> {
        if let Some(token) = self.peeked.take() {
            return Ok(Some(token));
        }
        self.scan_token(ev)
    }

    fn scan_token(&mut self, ev: &mut Evaluator) -> Result<Option<Token>, Thrown> {
        let Some(ch) = self.skip_blank(ev)? else {
            return Ok(None);
        };

        match ch {
            b'(' => Ok(Some(Token::LeftParen)),
            b')' => Ok(Some(Token::RightParen)),
            b'[' => Ok(Some(Token::LeftBracket)),
            b']' => Ok(Some(Token::RightBracket)),
            b'\'' => Ok(Some(Token::Quote)),
            b'.' => Ok(Some(Token::Dot)),
            b'0'..=b'9' => self.scan_number(ev, ch).map(Some),
            b'"' => self.scan_string(ev).map(Some),
            _ if is_symbol_start(ch) => self.scan_symbol(ev, ch).map(Some),
            other => Err(parse_error(
                ev,
                ParseErrorKind::InvalidToken,
                format!("invalid character: {:?}", other as char),
            )),
        }
    }

    /// Skip whitespace and `;` comments; return the first interesting byte.
    fn skip_blank(&mut self, ev: &mut Evaluator) -> Result<Option<u8>, Thrown> {
        loop {
            let Some(ch) = self.getc(ev)? else {
                return Ok(None);
            };
            if ch.is_ascii_whitespace() {
                continue;
            }
            if ch == b';' {
                while let Some(c) = self.getc(ev)? {
                    if c == b'\n' || c == b'\r' || c == b'\x0C' {
                        break;
                    }
                }
                continue;
            }
            return Ok(Some(ch));
        }
    }

    fn scan_number(&mut self, ev: &mut Evaluator, first: u8) -> Result<Token, Thrown> {
        let mut buf = String::new();
        buf.push(first as char);
        let mut has_dot = false;
        while let Some(ch) = self.getc(ev)? {
            if ch.is_ascii_digit() || ch == b'.' {
                has_dot |= ch == b'.';
                buf.push(ch as char);
            } else if ch.is_ascii_whitespace() {
                break;
            } else if TOKEN_DELIMS.contains(&ch) {
                self.ungetc(ch);
                break;
            } else {
                return Err(parse_error(
                    ev,
                    ParseErrorKind::InvalidToken,
                    format!("invalid token: {}{}", buf, ch as char),
                ));
            }
        }
        parse_int_token(ev, &buf, has_dot)
    }

    fn scan_symbol(&mut self, ev: &mut Evaluator, first: u8) -> Result<Token, Thrown> {
        let mut buf = String::new();
        buf.push(first as char);
        while let Some(ch) = self.getc(ev)? {
            if ch.is_ascii_alphanumeric() || SYMBOL_PUNCT.contains(&ch) {
                buf.push(ch as char);
            } else if ch.is_ascii_whitespace() {
                break;
            } else if TOKEN_DELIMS.contains(&ch) {
                self.ungetc(ch);
                break;
            } else {
                return Err(parse_error(
                    ev,
                    ParseErrorKind::InvalidToken,
                    format!("invalid token: {}{}", buf, ch as char),
                ));
            }
        }

        // `#`-initial tokens are boolean literals, nothing else.
        if buf.starts_with('#') {
            return match buf.to_uppercase().as_str() {
                "#T" => Ok(Token::Bool(true)),
                "#F" => Ok(Token::Bool(false)),
                _ => Err(parse_error(
                    ev,
                    ParseErrorKind::InvalidBoolean,
                    format!("invalid boolean: {buf}"),
                )),
            };
        }

        // A sign followed by digits is a signed integer literal.
        let bytes = buf.as_bytes();
        if (bytes[0] == b'+' || bytes[0] == b'-')
            && bytes.len() > 1
            && bytes[1..].iter().all(|b| b.is_ascii_digit() || *b == b'.')
        {
            let has_dot = bytes.contains(&b'.');
            return parse_int_token(ev, &buf, has_dot);
        }

        Ok(Token::Symbol(buf))
    }

    fn scan_string(&mut self, ev: &mut Evaluator) -> Result<Token, Thrown> {
        let mut buf = String::new();
        loop {
            let Some(ch) = self.getc(ev)? else {
                return Err(parse_error(
                    ev,
                    ParseErrorKind::UnexpectedEof,
                    "unexpected eof inside a string",
                ));
            };
            match ch {
                b'"' => return Ok(Token::Str(buf)),
                b'\\' => {
                    let Some(esc) = self.getc(ev)? else {
                        return Err(parse_error(
                            ev,
                            ParseErrorKind::UnexpectedEof,
                            "unexpected eof inside a string escape",
                        ));
                    };
                    match esc {
                        b't' => buf.push('\t'),
                        b'f' => buf.push('\x0C'),
                        b'n' => buf.push('\n'),
                        b'r' => buf.push('\r'),
                        b'\\' => buf.push('\\'),
                        b'"' => buf.push('"'),
                        other => {
                            return Err(parse_error(
                                ev,
                                ParseErrorKind::InvalidEscape,
                                format!("invalid escape sequence: \\{}", other as char),
                            ));
                        }
                    }
                }
                other => buf.push(other as char),
            }
        }
    }

    // -----------------------------------------------------------------------
    // Character stream
    // -----------------------------------------------------------------------

    fn getc(&mut self, ev: &mut Evaluator) -> Result<Option<u8>, Thrown> {
        if let Some(b) = self.pending_byte.take() {
            return Ok(Some(b));
        }
        let mut buf = [0u8; 1];
        loop {
            match self.input.read(&mut buf) {
                Ok(0) => return Ok(None),
                Ok(_) => {
                    self.consumed += 1;
                    return Ok(Some(buf[0]));
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    return Err(ev.throw(ErrorKind::Internal, format!("read failed: {e}")));
                }
            }
        }
    }

    fn ungetc(&mut self, b: u8) {
        debug_assert!(self.pending_byte.is_none());
        self.pending_byte = Some(b);
    }
}

fn is_symbol_start(ch: u8) -> bool {
    ch.is_ascii_alphabetic() || SYMBOL_PUNCT.contains(&ch)
}

fn parse_int_token(ev: &mut Evaluator, text: &str, has_dot: bool) -> Result<Token, Thrown> {
    if has_dot {
        return Err(parse_error(
            ev,
            ParseErrorKind::InvalidNumber,
            format!("invalid number literal: {text}"),
        ));
    }
    match text.parse::<i32>() {
        Ok(n) => Ok(Token::Int(n)),
        Err(_) => Err(parse_error(
            ev,
            ParseErrorKind::InvalidNumber,
            format!("invalid number literal: {text}"),
        )),
    }
}

fn parse_error(ev: &mut Evaluator, kind: ParseErrorKind, message: impl Into<String>) -> Thrown {
    ev.throw(ErrorKind::Parse(kind), message)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
