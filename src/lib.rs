//! lexdfa: compiles regular expressions into longest-match DFA lexers
//!
//! Patterns are parsed by a table-driven LR(1) parser whose reductions build
//! Thompson-style NFA fragments over 16-bit code-point ranges. The fragments
//! of all lexer rules are joined and determinized by subset construction;
//! the resulting [`Dfa`] scans text one token at a time.
//!
//! ```
//! use lexdfa::LexerBuilder;
//!
//! let mut lexer = LexerBuilder::new()
//!     .rule("[0-9]+", "number", |text: &str| text.parse::<i64>().unwrap())
//!     .rule("[ ]+", "space", |_: &str| 0)
//!     .build()
//!     .unwrap();
//!
//! let sum: i64 = lexer.tokenize("1 20 300").unwrap().into_iter().sum();
//! assert_eq!(sum, 321);
//! ```
//!
//! A built automaton can be stored with [`Dfa::to_json`] and restored with
//! [`Dfa::from_json`], given a [`HandlerTable`] that supplies the handlers
//! by tag.

pub mod automaton;
pub mod lexer;
pub mod parser;
pub mod rbtree;
pub mod regexp;

pub use automaton::{Dfa, HandlerTable, NodeArena, NodeId, ScanError, SerializedDfa};
pub use lexer::{LexerBuilder, LexerRule};
pub use parser::ParseError;
pub use rbtree::RbTree;
pub use regexp::compile_regexp;

/// Errors raised while building or loading an automaton.
///
/// Failures while scanning input are reported separately as [`ScanError`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("malformed interval [{start}, {end}]")]
    MalformedInterval { start: u32, end: u32 },

    #[error("invalid escape `\\{escape}` at offset {position}")]
    InvalidEscape { escape: char, position: usize },

    #[error("pattern ends inside an escape sequence")]
    UnexpectedEof,

    #[error("code point U+{code:04X} at offset {position} is outside the 16-bit code space")]
    CodePointOutOfRange { code: u32, position: usize },

    #[error("character class is empty")]
    EmptyClass,

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("malformed parse table: {0}")]
    MalformedTable(String),

    #[error("automaton exceeds {limit} states")]
    TooManyStates { limit: usize },

    #[error("handler tag `{0}` is registered twice")]
    DuplicateTag(String),

    #[error("invalid serialized automaton: {0}")]
    Deserialize(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
