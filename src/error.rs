//! Error types for the one collaborator allowed to fail loudly: the PACE
//! instance reader. Malformed input means the core is never constructed -
//! `main` reports this and exits before any `Graph` exists, so there's no
//! error threading through the algorithmic modules themselves.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReadError {
    #[error("I/O error reading instance: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed {section} section: {detail}")]
    MalformedSection { section: &'static str, detail: String },

    #[error("unexpected end of input while reading {expected}")]
    UnexpectedEof { expected: &'static str },
}
