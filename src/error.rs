use thiserror::Error;

use crate::token::Span;
use crate::value::Value;

#[derive(Debug, Error)]
pub enum LoxideError {
    #[error("Could not read script: {0}")]
    Io(#[from] std::io::Error),

    #[error("Lexical error")]
    Scan { message: String, span: Span },

    #[error("Syntax error")]
    Parse { message: String, span: Span },

    #[error("Resolution error")]
    Resolution { message: String, span: Span },

    #[error("Runtime error")]
    Runtime { message: String, span: Span },

    /// Not an error: the non-local exit a `return` statement performs.
    /// Intercepted by function calls, never reported to the user.
    #[error("")]
    Return(Value),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error, ErrorKind};

    #[test]
    fn io_error_converts_to_loxide_error() {
        let io_err = Error::new(ErrorKind::NotFound, "file not found");
        let err: LoxideError = io_err.into();
        assert!(matches!(err, LoxideError::Io(_)));
    }

    #[test]
    fn io_error_keeps_the_cause_in_its_message() {
        let io_err = Error::new(ErrorKind::NotFound, "file not found");
        let err: LoxideError = io_err.into();
        assert_eq!(err.to_string(), "Could not read script: file not found");
    }

    #[test]
    fn scan_error_headline() {
        let err = LoxideError::Scan {
            message: "Unexpected character '@'.".to_string(),
            span: 10..11,
        };
        assert_eq!(err.to_string(), "Lexical error");
    }

    #[test]
    fn parse_error_headline() {
        let err = LoxideError::Parse {
            message: "Expect ')' after expression.".to_string(),
            span: 20..25,
        };
        assert_eq!(err.to_string(), "Syntax error");
    }

    #[test]
    fn resolution_error_headline() {
        let err = LoxideError::Resolution {
            message: "Variable with this name already declared in this scope.".to_string(),
            span: 40..45,
        };
        assert_eq!(err.to_string(), "Resolution error");
    }

    #[test]
    fn runtime_error_headline() {
        let err = LoxideError::Runtime {
            message: "Operand must be a number.".to_string(),
            span: 30..35,
        };
        assert_eq!(err.to_string(), "Runtime error");
    }
}
