use serde::Serialize;
use std::fmt;

/// A position in source text.
///
/// `line` and `column` are 1-based; `column` counts grapheme clusters, not
/// bytes, so reported positions match what an editor shows. `byte` is the
/// 0-based byte offset into the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pos {
    pub line: usize,
    pub column: usize,
    pub byte: usize,
}

impl Pos {
    pub fn new(line: usize, column: usize, byte: usize) -> Self {
        Self { line, column, byte }
    }

    /// The position of the first grapheme of a file.
    pub fn start_of_file() -> Self {
        Self {
            line: 1,
            column: 1,
            byte: 0,
        }
    }
}

/// A source region: filename plus start (inclusive) and end (exclusive).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Range {
    pub filename: String,
    pub start: Pos,
    pub end: Pos,
}

impl Range {
    pub fn new(filename: impl Into<String>, start: Pos, end: Pos) -> Self {
        Self {
            filename: filename.into(),
            start,
            end,
        }
    }

    /// A zero-width range at the start of the named file.
    pub fn zero(filename: impl Into<String>) -> Self {
        let p = Pos::start_of_file();
        Self::new(filename, p, p)
    }

    /// The smallest range spanning both `a` and `b`.
    ///
    /// The filename is taken from `a`; combining ranges from different files
    /// is not meaningful.
    pub fn between(a: &Range, b: &Range) -> Range {
        let start = if a.start.byte <= b.start.byte {
            a.start
        } else {
            b.start
        };
        let end = if a.end.byte >= b.end.byte { a.end } else { b.end };
        Range {
            filename: a.filename.clone(),
            start,
            end,
        }
    }

    /// A zero-width range sitting at this range's end position.
    pub fn collapse_to_end(&self) -> Range {
        Range {
            filename: self.filename.clone(),
            start: self.end,
            end: self.end,
        }
    }

    /// Whether this range covers no graphemes.
    pub fn is_empty(&self) -> bool {
        self.start.byte == self.end.byte
    }
}

impl fmt::Display for Range {
    /// `file:1,5-12` when the range sits on one line, `file:1,5-2,3` when it
    /// spans lines. Used inside diagnostic details that cite another range.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start.line == self.end.line {
            write!(
                f,
                "{}:{},{}-{}",
                self.filename, self.start.line, self.start.column, self.end.column
            )
        } else {
            write!(
                f,
                "{}:{},{}-{},{}",
                self.filename, self.start.line, self.start.column, self.end.line, self.end.column
            )
        }
    }
}
