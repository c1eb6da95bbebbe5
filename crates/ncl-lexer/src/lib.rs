//! NCL Lexer
//!
//! Tokenizes `.ncl` source files into the stream of typed, positioned
//! tokens the parser consumes. Handles brace-delimited structure, quoted
//! string literals with `${`/`!{` template sequences, comments, and
//! grapheme-accurate position tracking.
//!
//! Scanning never fails: unclassifiable input becomes `Invalid` tokens and
//! the stream always ends with a single `Eof` sentinel.
//!
//! # Example
//!
//! ```
//! use ncl_lexer::Scanner;
//!
//! let tokens = Scanner::scan("", "empty.ncl");
//! assert_eq!(tokens.len(), 1); // Just EOF
//! ```

pub mod scanner;
pub mod span;
pub mod token;

pub use scanner::Scanner;
pub use span::{Pos, Range};
pub use token::{Token, TokenKind};
