use crate::span::Range;
use serde::Serialize;

/// Token classification for NCL source.
///
/// This is a closed set: the parser dispatches and pairs brackets over
/// exactly these kinds. Bracketer kinds come in opposite pairs
/// (brace/bracket/paren/quote/heredoc); the two template openers both
/// oppose the single `TemplateSeqEnd`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TokenKind {
    // Names and literals
    Ident,
    NumberLit,
    /// A run of literal text inside a quoted string.
    QuotedLit,
    /// A run of literal text outside quotes (heredoc and template bodies).
    StringLit,

    // Punctuation
    Equal,
    Comma,
    Dot,

    // Bracketers
    OBrace,
    CBrace,
    OBrack,
    CBrack,
    OParen,
    CParen,
    OQuote,
    CQuote,
    OHeredoc,
    CHeredoc,

    // Template sequences inside quoted strings: `${` and `!{`, both closed
    // by the same `}` token.
    TemplateInterp,
    TemplateControl,
    TemplateSeqEnd,

    // Structure
    Newline,

    /// A grapheme the scanner could not classify. The parser reports it;
    /// scanning itself never fails.
    Invalid,
    Eof,
}

/// A token produced by the NCL scanner.
///
/// `text` carries the raw source bytes of the token so the parser can
/// recover names and decode literal runs without re-reading the source.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub range: Range,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, range: Range) -> Self {
        Self {
            kind,
            text: text.into(),
            range,
        }
    }
}
