//! Escape decoding for string-literal tokens.
//!
//! Converts the raw bytes of a literal run into decoded text, resolving
//! backslash escapes and doubled template markers. Scanning proceeds one
//! grapheme cluster at a time, not one byte or code point, so that
//! multi-byte characters, combining marks and `\r\n` each advance the
//! reported column by exactly one and diagnostics land on exact source
//! coordinates.

use crate::diagnostics::Diagnostic;
use ncl_lexer::{Pos, Range, Token, TokenKind};
use unicode_segmentation::UnicodeSegmentation;

/// A partially consumed escape sequence.
#[derive(Clone, Copy)]
enum Esc {
    None,
    /// A backslash waiting for the grapheme that resolves it. Only entered
    /// in quoted mode; elsewhere a backslash has no escaping role.
    Backslash { start: Pos },
    /// One or two pending `$`/`!` marker characters. The marker becomes a
    /// real escape only as the three-character sequence `$${` / `!!{`;
    /// anything else flushes the buffered characters literally.
    Marker { marker: &'static str, doubled: bool },
}

/// Decode a literal-text token, resolving escape sequences.
///
/// `QuotedLit` runs live between quote marks and honor backslash escapes;
/// `StringLit` runs are bare template text where a backslash is ordinary
/// content. In both, a doubled `$` or `!` before `{` collapses to a single
/// marker, since that is how a template opener is escaped.
///
/// If error diagnostics are returned the text may be incomplete, but it is
/// always safe to keep using.
pub fn decode_string_lit(tok: &Token) -> (String, Vec<Diagnostic>) {
    let quoted = match tok.kind {
        TokenKind::QuotedLit => true,
        TokenKind::StringLit => false,
        other => {
            debug_assert!(false, "decode_string_lit on {other:?} token");
            return (tok.text.clone(), Vec::new());
        }
    };

    let mut out = String::with_capacity(tok.text.len());
    let mut diags = Vec::new();
    let mut esc = Esc::None;

    let mut new_pos = tok.range.start;
    for g in tok.text.graphemes(true) {
        let pos = new_pos;
        if matches!(g, "\n" | "\r\n") {
            new_pos.line += 1;
            new_pos.column = 1;
        } else {
            new_pos.column += 1;
        }
        new_pos.byte += g.len();

        match esc {
            Esc::Backslash { start } => {
                let replacement = match g {
                    "n" => Some("\n"),
                    "r" => Some("\r"),
                    "t" => Some("\t"),
                    "\"" => Some("\""),
                    "\\" => Some("\\"),
                    _ => None,
                };
                if let Some(replacement) = replacement {
                    out.push_str(replacement);
                } else {
                    let detail = if matches!(g, "$" | "!") {
                        format!(
                            "The characters \"\\{g}\" do not form a recognized escape sequence. To escape a \"{g}{{\" template sequence, use \"{g}{g}{{\"."
                        )
                    } else {
                        format!("The characters \"\\{g}\" do not form a recognized escape sequence.")
                    };
                    diags.push(Diagnostic::error(
                        "Invalid escape sequence",
                        detail,
                        Range::new(tok.range.filename.clone(), start, new_pos),
                    ));
                    // Substitute the offending grapheme alone so decoding
                    // can continue.
                    out.push_str(g);
                }
                esc = Esc::None;
            }

            Esc::Marker { marker, doubled } => {
                if !doubled {
                    if g == marker {
                        esc = Esc::Marker {
                            marker,
                            doubled: true,
                        };
                        continue;
                    }
                    // Not an escape attempt after all.
                    out.push_str(marker);
                    out.push_str(g);
                } else {
                    if g == "{" {
                        // Confirmed escape of a template opener: emit one
                        // marker character.
                        out.push_str(marker);
                    } else {
                        out.push_str(marker);
                        out.push_str(marker);
                    }
                    out.push_str(g);
                }
                esc = Esc::None;
            }

            Esc::None => match g {
                "\\" if quoted => esc = Esc::Backslash { start: pos },
                "$" => {
                    esc = Esc::Marker {
                        marker: "$",
                        doubled: false,
                    }
                }
                "!" => {
                    esc = Esc::Marker {
                        marker: "!",
                        doubled: false,
                    }
                }
                _ => out.push_str(g),
            },
        }
    }

    // A pending escape at the end of the literal is flushed literally.
    match esc {
        Esc::None => {}
        Esc::Backslash { .. } => out.push('\\'),
        Esc::Marker { marker, doubled } => {
            out.push_str(marker);
            if doubled {
                out.push_str(marker);
            }
        }
    }

    (out, diags)
}
