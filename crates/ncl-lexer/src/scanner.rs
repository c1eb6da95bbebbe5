use crate::span::{Pos, Range};
use crate::token::{Token, TokenKind};
use unicode_segmentation::UnicodeSegmentation;

/// Scanner mode determines how the next grapheme is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Inside a quoted string: graphemes accumulate into literal runs.
    Quote,
    /// Inside a `${` or `!{` sequence: expression tokens, with brace
    /// nesting tracked so the closing `}` can be told apart from `CBrace`.
    Template { braces: usize },
}

/// NCL source scanner.
///
/// Tokenizes `.ncl` source into the stream the parser consumes. Scanning
/// never fails: graphemes that fit no token class become `Invalid` tokens
/// and malformed strings simply stop producing literal runs, leaving the
/// parser to diagnose the damage with full position information.
///
/// The scanner walks grapheme clusters, not bytes or code points, so every
/// reported column counts user-perceived characters and `\r\n` advances the
/// position like a single newline.
pub struct Scanner<'a> {
    graphemes: Vec<&'a str>,
    filename: &'a str,
    pos: usize,
    line: usize,
    column: usize,
    byte: usize,
    tokens: Vec<Token>,
    modes: Vec<Mode>,
}

impl<'a> Scanner<'a> {
    fn new(source: &'a str, filename: &'a str) -> Self {
        Self {
            graphemes: source.graphemes(true).collect(),
            filename,
            pos: 0,
            line: 1,
            column: 1,
            byte: 0,
            tokens: Vec::new(),
            modes: Vec::new(),
        }
    }

    /// Tokenize the entire source into a vector of tokens.
    ///
    /// The result always ends with exactly one zero-width `Eof` token.
    pub fn scan(source: &'a str, filename: &'a str) -> Vec<Token> {
        let mut scanner = Scanner::new(source, filename);
        scanner.run();
        scanner.tokens
    }

    fn run(&mut self) {
        while !self.is_at_end() {
            match self.modes.last() {
                Some(Mode::Quote) => self.scan_quoted(),
                _ => self.scan_normal(),
            }
        }
        let p = self.mark();
        self.tokens.push(Token::new(
            TokenKind::Eof,
            "",
            Range::new(self.filename, p, p),
        ));
    }

    /// Scan one token outside of quoted-string context. Also used inside
    /// template sequences, where only the brace handling differs.
    fn scan_normal(&mut self) {
        let start = self.mark();
        let g = self.peek();

        match g {
            " " | "\t" => {
                self.advance();
            }

            "\n" | "\r\n" => {
                self.advance();
                self.push(TokenKind::Newline, start, g);
            }

            "#" => self.skip_line_comment(),
            "/" if self.peek_next() == Some("/") => self.skip_line_comment(),

            "\"" => {
                self.advance();
                self.push(TokenKind::OQuote, start, "\"");
                self.modes.push(Mode::Quote);
            }

            "=" => self.single(TokenKind::Equal),
            "," => self.single(TokenKind::Comma),
            "." => self.single(TokenKind::Dot),
            "[" => self.single(TokenKind::OBrack),
            "]" => self.single(TokenKind::CBrack),
            "(" => self.single(TokenKind::OParen),
            ")" => self.single(TokenKind::CParen),

            "{" => {
                if let Some(Mode::Template { braces }) = self.modes.last_mut() {
                    *braces += 1;
                }
                self.single(TokenKind::OBrace);
            }

            "}" => {
                match self.modes.last_mut() {
                    Some(Mode::Template { braces: 0 }) => {
                        self.advance();
                        self.push(TokenKind::TemplateSeqEnd, start, "}");
                        self.modes.pop();
                    }
                    Some(Mode::Template { braces }) => {
                        *braces -= 1;
                        self.single(TokenKind::CBrace);
                    }
                    _ => self.single(TokenKind::CBrace),
                }
            }

            _ if is_digit(g) => self.scan_number(),
            _ if is_ident_start(g) => self.scan_ident(),

            _ => {
                self.advance();
                self.push(TokenKind::Invalid, start, g);
            }
        }
    }

    /// Scan inside a quoted string: accumulate a raw literal run until the
    /// closing quote, a template opener, a line ending, or end of input.
    ///
    /// Escape sequences are carried through raw (`\"` does not close the
    /// string); decoding them is the parser's job. `$$` and `!!` stay in
    /// the run so the decoder can collapse them; `${` and `!{` end the run
    /// and open a template sequence.
    fn scan_quoted(&mut self) {
        let run_start = self.mark();
        let mut run = String::new();

        loop {
            if self.is_at_end() {
                self.flush_run(run_start, &run);
                return;
            }
            let g = self.peek();

            match g {
                "\"" => {
                    self.flush_run(run_start, &run);
                    let start = self.mark();
                    self.advance();
                    self.push(TokenKind::CQuote, start, "\"");
                    self.modes.pop();
                    return;
                }

                // Strings are single-line; a bare line ending abandons the
                // string and lets the parser report it.
                "\n" | "\r\n" => {
                    self.flush_run(run_start, &run);
                    self.modes.pop();
                    return;
                }

                "\\" => {
                    run.push_str(g);
                    self.advance();
                    if !self.is_at_end() {
                        let next = self.peek();
                        if !matches!(next, "\n" | "\r\n") {
                            run.push_str(next);
                            self.advance();
                        }
                    }
                }

                "$" | "!" => {
                    if self.peek_next() == Some(g) {
                        // Doubled marker: escaped, stays in the raw run.
                        run.push_str(g);
                        run.push_str(g);
                        self.advance();
                        self.advance();
                    } else if self.peek_next() == Some("{") {
                        self.flush_run(run_start, &run);
                        let start = self.mark();
                        let kind = if g == "$" {
                            TokenKind::TemplateInterp
                        } else {
                            TokenKind::TemplateControl
                        };
                        let text = format!("{g}{{");
                        self.advance();
                        self.advance();
                        self.push(kind, start, text);
                        self.modes.push(Mode::Template { braces: 0 });
                        return;
                    } else {
                        run.push_str(g);
                        self.advance();
                    }
                }

                _ => {
                    run.push_str(g);
                    self.advance();
                }
            }
        }
    }

    // --- Scanners ---

    /// Scan an identifier: letter or `_` first, then letters, digits, `_`,
    /// and `-` when followed by a letter or digit.
    fn scan_ident(&mut self) {
        let start = self.mark();
        let from = self.pos;

        self.advance();
        while !self.is_at_end() {
            let g = self.peek();
            let continues = is_ident_continue(g)
                || (g == "-" && self.peek_next().is_some_and(is_ident_continue));
            if !continues {
                break;
            }
            self.advance();
        }

        let text: String = self.graphemes[from..self.pos].concat();
        self.push(TokenKind::Ident, start, text);
    }

    /// Scan a number literal. Digits and dots are consumed greedily; the
    /// parser validates the result when it builds the literal value.
    fn scan_number(&mut self) {
        let start = self.mark();
        let from = self.pos;

        while !self.is_at_end() {
            let g = self.peek();
            if !(is_digit(g) || g == ".") {
                break;
            }
            self.advance();
        }

        let text: String = self.graphemes[from..self.pos].concat();
        self.push(TokenKind::NumberLit, start, text);
    }

    /// Skip a `#` or `//` comment up to (not including) the line ending.
    fn skip_line_comment(&mut self) {
        while !self.is_at_end() && !matches!(self.peek(), "\n" | "\r\n") {
            self.advance();
        }
    }

    // --- Navigation ---

    fn is_at_end(&self) -> bool {
        self.pos >= self.graphemes.len()
    }

    fn peek(&self) -> &'a str {
        self.graphemes[self.pos]
    }

    fn peek_next(&self) -> Option<&'a str> {
        self.graphemes.get(self.pos + 1).copied()
    }

    /// Consume one grapheme, advancing line/column/byte accounting.
    fn advance(&mut self) {
        let g = self.graphemes[self.pos];
        self.pos += 1;
        self.byte += g.len();
        if matches!(g, "\n" | "\r\n") {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
    }

    fn mark(&self) -> Pos {
        Pos::new(self.line, self.column, self.byte)
    }

    fn push(&mut self, kind: TokenKind, start: Pos, text: impl Into<String>) {
        let range = Range::new(self.filename, start, self.mark());
        self.tokens.push(Token::new(kind, text, range));
    }

    /// Emit a one-grapheme token.
    fn single(&mut self, kind: TokenKind) {
        let start = self.mark();
        let g = self.peek();
        self.advance();
        self.push(kind, start, g);
    }

    /// Emit the pending quoted-literal run, if any.
    fn flush_run(&mut self, start: Pos, run: &str) {
        if !run.is_empty() {
            self.push(TokenKind::QuotedLit, start, run);
        }
    }
}

fn is_digit(g: &str) -> bool {
    g.len() == 1 && g.as_bytes()[0].is_ascii_digit()
}

fn is_ident_start(g: &str) -> bool {
    g.chars().next().is_some_and(|c| c.is_alphabetic() || c == '_')
}

fn is_ident_continue(g: &str) -> bool {
    g.chars()
        .next()
        .is_some_and(|c| c.is_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Scanner::scan(source, "test.ncl")
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    fn texts(source: &str) -> Vec<String> {
        Scanner::scan(source, "test.ncl")
            .into_iter()
            .map(|t| t.text)
            .collect()
    }

    // =========================================================================
    // Basics
    // =========================================================================

    #[test]
    fn test_empty_source() {
        let tokens = Scanner::scan("", "test.ncl");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Eof);
        assert!(tokens[0].range.is_empty());
    }

    #[test]
    fn test_attribute_line() {
        assert_eq!(
            kinds("port = 8080\n"),
            vec![
                TokenKind::Ident,
                TokenKind::Equal,
                TokenKind::NumberLit,
                TokenKind::Newline,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_block_header() {
        assert_eq!(
            kinds("service \"web\" {\n}\n"),
            vec![
                TokenKind::Ident,
                TokenKind::OQuote,
                TokenKind::QuotedLit,
                TokenKind::CQuote,
                TokenKind::OBrace,
                TokenKind::Newline,
                TokenKind::CBrace,
                TokenKind::Newline,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_comments_are_skipped() {
        assert_eq!(
            kinds("# note\n// also\na = 1\n"),
            vec![
                TokenKind::Newline,
                TokenKind::Newline,
                TokenKind::Ident,
                TokenKind::Equal,
                TokenKind::NumberLit,
                TokenKind::Newline,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_invalid_grapheme() {
        assert_eq!(
            kinds("a = ;\n"),
            vec![
                TokenKind::Ident,
                TokenKind::Equal,
                TokenKind::Invalid,
                TokenKind::Newline,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_hyphenated_ident() {
        let t = Scanner::scan("load-balancer", "test.ncl");
        assert_eq!(t[0].kind, TokenKind::Ident);
        assert_eq!(t[0].text, "load-balancer");
    }

    // =========================================================================
    // Strings and templates
    // =========================================================================

    #[test]
    fn test_plain_string() {
        assert_eq!(
            texts("\"hello\""),
            vec!["\"", "hello", "\"", ""],
        );
    }

    #[test]
    fn test_escaped_quote_does_not_close() {
        let t = Scanner::scan("\"a\\\"b\"", "test.ncl");
        assert_eq!(t[1].kind, TokenKind::QuotedLit);
        assert_eq!(t[1].text, "a\\\"b");
        assert_eq!(t[2].kind, TokenKind::CQuote);
    }

    #[test]
    fn test_interpolation_tokens() {
        assert_eq!(
            kinds("\"a${x}b\""),
            vec![
                TokenKind::OQuote,
                TokenKind::QuotedLit,
                TokenKind::TemplateInterp,
                TokenKind::Ident,
                TokenKind::TemplateSeqEnd,
                TokenKind::QuotedLit,
                TokenKind::CQuote,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_control_sequence_tokens() {
        assert_eq!(
            kinds("\"!{x}\""),
            vec![
                TokenKind::OQuote,
                TokenKind::TemplateControl,
                TokenKind::Ident,
                TokenKind::TemplateSeqEnd,
                TokenKind::CQuote,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_doubled_marker_stays_literal() {
        let t = Scanner::scan("\"$${x}\"", "test.ncl");
        assert_eq!(t[1].kind, TokenKind::QuotedLit);
        assert_eq!(t[1].text, "$${x}");
    }

    #[test]
    fn test_lone_marker_stays_literal() {
        let t = Scanner::scan("\"$x\"", "test.ncl");
        assert_eq!(t[1].kind, TokenKind::QuotedLit);
        assert_eq!(t[1].text, "$x");
    }

    #[test]
    fn test_nested_braces_inside_template() {
        assert_eq!(
            kinds("\"${f({})}\""),
            vec![
                TokenKind::OQuote,
                TokenKind::TemplateInterp,
                TokenKind::Ident,
                TokenKind::OParen,
                TokenKind::OBrace,
                TokenKind::CBrace,
                TokenKind::CParen,
                TokenKind::TemplateSeqEnd,
                TokenKind::CQuote,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_unterminated_string_at_newline() {
        assert_eq!(
            kinds("\"abc\nx = 1\n"),
            vec![
                TokenKind::OQuote,
                TokenKind::QuotedLit,
                TokenKind::Newline,
                TokenKind::Ident,
                TokenKind::Equal,
                TokenKind::NumberLit,
                TokenKind::Newline,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_unterminated_string_at_eof() {
        assert_eq!(
            kinds("\"abc"),
            vec![TokenKind::OQuote, TokenKind::QuotedLit, TokenKind::Eof]
        );
    }

    // =========================================================================
    // Positions
    // =========================================================================

    #[test]
    fn test_positions_count_graphemes() {
        // "é" is two bytes but one column.
        let t = Scanner::scan("aé = 1", "test.ncl");
        assert_eq!(t[0].text, "aé");
        assert_eq!(t[0].range.start.column, 1);
        assert_eq!(t[0].range.end.column, 3);
        assert_eq!(t[0].range.end.byte, 3);
        // `=` sits at column 4.
        assert_eq!(t[1].range.start.column, 4);
    }

    #[test]
    fn test_crlf_is_one_newline() {
        let t = Scanner::scan("a\r\nb", "test.ncl");
        assert_eq!(t[1].kind, TokenKind::Newline);
        assert_eq!(t[2].range.start.line, 2);
        assert_eq!(t[2].range.start.column, 1);
    }

    #[test]
    fn test_line_tracking() {
        let t = Scanner::scan("a = 1\nbb = 2\n", "test.ncl");
        let bb = t
            .iter()
            .find(|t| t.text == "bb")
            .expect("bb token present");
        assert_eq!(bb.range.start.line, 2);
        assert_eq!(bb.range.start.column, 1);
        assert_eq!(bb.range.end.column, 3);
    }

    #[test]
    fn test_eof_range_is_zero_width_at_end() {
        let t = Scanner::scan("ab", "test.ncl");
        let eof = t.last().expect("eof");
        assert_eq!(eof.kind, TokenKind::Eof);
        assert_eq!(eof.range.start.byte, 2);
        assert!(eof.range.is_empty());
    }
}
