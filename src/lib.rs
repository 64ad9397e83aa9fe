mod ast;
mod environment;
mod error;
mod interpreter;
mod optimizer;
mod parser;
mod repl;
mod report;
mod resolver;
mod scanner;
mod token;
mod value;

use std::io::Write;

pub use ast::{Expr, Stmt};
pub use error::LoxideError;
pub use parser::Parser;
pub use repl::ReplState;
pub use report::{report_error, report_warning};
pub use resolver::{Bindings, Resolutions, Resolver, Warning};
pub use scanner::{KEYWORDS, Scanner};
pub use token::{Literal, Span, Token, TokenType};
pub use value::Value;

/// The method name that makes a class method its constructor.
pub const INITIALIZER_NAME: &str = "init";

/// Everything one `run` produced besides program output. Errors gate the
/// pipeline phase by phase; warnings never block anything.
#[derive(Debug, Default)]
pub struct Outcome {
    pub errors: Vec<LoxideError>,
    pub warnings: Vec<Warning>,
}

impl Outcome {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

pub struct Loxide {
    interpreter: interpreter::Interpreter,
}

impl Default for Loxide {
    fn default() -> Self {
        Self::new()
    }
}

impl Loxide {
    pub fn new() -> Self {
        Self {
            interpreter: interpreter::Interpreter::new(),
        }
    }

    /// Run a program: scan, parse, fold, resolve, interpret. Each phase
    /// only runs if the previous one produced no errors. Interpreter state
    /// survives across calls, which is what makes the REPL stateful.
    pub fn run<O: Write>(&mut self, source: &str, mut stdout: O) -> Outcome {
        let mut outcome = Outcome::default();

        let mut tokens = Vec::new();
        for result in Scanner::new(source) {
            match result {
                Ok(token) => tokens.push(token),
                Err(e) => outcome.errors.push(e),
            }
        }
        if !outcome.is_clean() {
            return outcome;
        }

        let mut parser = Parser::new(tokens);
        let statements = parser.parse();
        outcome.errors.extend(parser.take_errors());
        if !outcome.is_clean() {
            return outcome;
        }

        let statements = optimizer::fold(statements);

        match Resolver::new().resolve(&statements) {
            Ok(bindings) => {
                outcome.warnings = bindings.warnings;
                self.interpreter.add_resolutions(bindings.resolutions);
            }
            Err(errors) => {
                outcome.errors = errors;
                return outcome;
            }
        }

        if let Err(e) = self.interpreter.interpret(&statements, &mut stdout) {
            outcome.errors.push(e);
        }

        outcome
    }
}
