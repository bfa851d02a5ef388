//! Error kinds for the numerical P system pipeline (lexer through simulator).
//!
//! Every variant here corresponds to one of the fatal error kinds of the
//! input language: there is no local recovery anywhere in the pipeline,
//! so these propagate straight out to the CLI boundary.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PepError {
    #[error("line {line}, column {column}: unrecognized character")]
    Lex { line: usize, column: usize },

    #[error("line {line}, column {column}: expected {expected}, got {got}")]
    Parse {
        line: usize,
        column: usize,
        expected: String,
        got: String,
    },

    #[error("membrane '{membrane}': unresolved identifier '{name}'")]
    UnresolvedIdentifier { membrane: String, name: String },

    #[error("duplicate membrane '{0}' in H")]
    DuplicateMembrane(String),

    #[error("malformed membrane structure")]
    BadStructure,

    #[error("evaluation error: {0}")]
    Eval(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PepError>;
