//! Error kinds and the exception-propagation channel.
//!
//! Every fallible interpreter operation returns `EvalResult`.  Raising an
//! error pushes a [`RaisedError`] onto the evaluator's exception list and
//! returns the zero-sized [`Thrown`] sentinel, which callers propagate with
//! `?`.  The most recent error is popped with `Evaluator::get_exception`.

use thiserror::Error;

use super::value::Value;

/// The closed set of error categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ErrorKind {
    #[error("parse error ({0})")]
    Parse(ParseErrorKind),
    #[error("type error")]
    Type,
    #[error("unbound variable")]
    Unbound,
    #[error("arity error")]
    Arity,
    #[error("out of memory")]
    OutOfMemory,
    #[error("internal error")]
    Internal,
}

/// Sub-kinds of parse errors.  Clean EOF at the top level is not an error:
/// the reader reports it as `Ok(None)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ParseErrorKind {
    #[error("unexpected eof")]
    UnexpectedEof,
    #[error("unexpected closing delimiter")]
    UnexpectedClose,
    #[error("invalid number literal")]
    InvalidNumber,
    #[error("invalid boolean literal")]
    InvalidBoolean,
    #[error("invalid token")]
    InvalidToken,
    #[error("invalid escape sequence")]
    InvalidEscape,
}

/// Marker that an error was raised and its payload pushed onto the
/// evaluator's exception list.  Carries no data of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thrown;

/// A raised error as stored on the exception list: category plus the
/// payload string formed at the raising site.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct RaisedError {
    pub kind: ErrorKind,
    pub message: String,
}

pub type EvalResult = Result<Value, Thrown>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = RaisedError {
            kind: ErrorKind::Type,
            message: "CAR: expected a pair".to_string(),
        };
        assert_eq!(err.to_string(), "type error: CAR: expected a pair");
    }

    #[test]
    fn parse_error_display() {
        let err = RaisedError {
            kind: ErrorKind::Parse(ParseErrorKind::UnexpectedEof),
            message: "unexpected eof while reading a list".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "parse error (unexpected eof): unexpected eof while reading a list"
        );
    }
}
