//! Pluggable source parsing.
//!
//! Consumers see a [`Module`] of tagged nodes and never the back end's own
//! representation, so the back end can be swapped without touching the
//! subpath detector or the code rewriter.

pub mod ast;
mod lexer;

pub use ast::{Callee, Module, ModuleNode, Span, StringLiteral};
pub use lexer::LexerBackend;

/// Parse failure reported by a back end.
#[derive(Debug, Clone, thiserror::Error)]
#[error("parse error at byte {offset}: {message}")]
pub struct ParseError {
    pub offset: usize,
    pub message: String,
}

/// A JavaScript parser producing module-level nodes.
pub trait ParserBackend: Send + Sync {
    /// Back end name, for logs.
    fn name(&self) -> &'static str;

    /// Parse `source` into module nodes.
    ///
    /// # Errors
    /// Returns a [`ParseError`] when the back end rejects the input.
    fn parse(&self, source: &str) -> Result<Module, ParseError>;
}
