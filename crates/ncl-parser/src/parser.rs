//! Body parser for NCL.
//!
//! Parses a stream of source-level tokens (from `ncl-lexer`) into a `Body`
//! AST plus diagnostics. Recursive descent: the body loop reads one
//! identifier-led item at a time, classifies it as attribute or block, and
//! recurses into nested block bodies.
//!
//! Malformed input never aborts the parse. Two resynchronization
//! strategies (bracket-nesting-aware recovery to a terminator, and an
//! open-bracketer-stack scan to the next top-level item) guarantee
//! forward progress and let a single pass report as many independent
//! errors as possible.

use crate::ast::{Attribute, Block, Body, BodyItem};
use crate::diagnostics::{has_errors, Diagnostic};
use crate::eval::Value;
use crate::expr::{
    Expression, FunctionCall, LiteralValue, ScopeTraversal, Traversal, TraversalStep,
};
use crate::peeker::Peeker;
use crate::strings::decode_string_lit;
use ncl_lexer::{Range, Scanner, Token, TokenKind};
use std::collections::HashMap;

/// Default cap on block nesting depth. Nesting beyond the cap is reported
/// as a diagnostic and the offending block's body skipped, keeping native
/// recursion depth proportional to this bound rather than to the input.
pub const DEFAULT_MAX_NESTING: usize = 128;

/// NCL body parser.
pub struct Parser {
    peeker: Peeker,
    /// Set once any recovery is attempted. Used to reduce error noise by
    /// suppressing generic "bad token" diagnostics in recovery mode, on
    /// the assumption that the recovery heuristics may have left the
    /// peeker somewhere diagnostically misleading.
    recovery: bool,
    depth: usize,
    max_nesting: usize,
}

impl Parser {
    /// Create a parser over a token stream.
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            peeker: Peeker::new(tokens),
            recovery: false,
            depth: 0,
            max_nesting: DEFAULT_MAX_NESTING,
        }
    }

    /// Create a parser with a custom nesting cap.
    pub fn with_max_nesting(tokens: Vec<Token>, max_nesting: usize) -> Self {
        Self {
            max_nesting,
            ..Self::new(tokens)
        }
    }

    /// Parse a configuration file: scan `source` and parse the resulting
    /// stream as one body running to end of input.
    pub fn parse(source: &str, filename: &str) -> (Body, Vec<Diagnostic>) {
        let tokens = Scanner::scan(source, filename);
        let mut parser = Parser::new(tokens);
        parser.parse_body(TokenKind::Eof)
    }

    /// Parse body content until the given terminator token, consuming the
    /// terminator.
    pub fn parse_body(&mut self, end: TokenKind) -> (Body, Vec<Diagnostic>) {
        let mut attributes: HashMap<String, Attribute> = HashMap::new();
        let mut blocks = Vec::new();
        let mut diags = Vec::new();

        let start_range = self.peeker.prev_range();
        let end_range;

        loop {
            let next_kind = self.peeker.peek().kind;
            if next_kind == end {
                end_range = self.peeker.next_range();
                self.peeker.read();
                break;
            }

            match next_kind {
                // Newlines are insignificant between items.
                TokenKind::Newline => {
                    self.peeker.read();
                }

                TokenKind::Ident => {
                    let (item, item_diags) = self.parse_body_item();
                    diags.extend(item_diags);
                    match item {
                        Some(BodyItem::Block(block)) => blocks.push(block),
                        Some(BodyItem::Attribute(attr)) => {
                            if let Some(existing) = attributes.get(&attr.name) {
                                diags.push(Diagnostic::error(
                                    "Attribute redefined",
                                    format!(
                                        "The attribute {:?} was already defined at {}. Each attribute may be defined only once.",
                                        attr.name, existing.name_range
                                    ),
                                    attr.name_range.clone(),
                                ));
                            } else {
                                attributes.insert(attr.name.clone(), attr);
                            }
                        }
                        // The item parser hit a syntax error it has already
                        // reported, and recovered to a position where the
                        // next item can be tried.
                        None => {}
                    }
                }

                _ => {
                    let bad = self.peeker.read();
                    if !self.recovery {
                        if bad.kind == TokenKind::OQuote {
                            diags.push(Diagnostic::error(
                                "Invalid attribute name",
                                "Attribute names must not be quoted.",
                                bad.range.clone(),
                            ));
                        } else {
                            diags.push(Diagnostic::error(
                                "Attribute or block definition required",
                                "An attribute or block definition is required here.",
                                bad.range.clone(),
                            ));
                        }
                    }
                    // Arbitrary, but somewhere inside the body means better
                    // diagnostics than the recovery landing point.
                    end_range = self.peeker.prev_range();
                    self.recover(end);
                    break;
                }
            }
        }

        let body = Body {
            attributes,
            blocks,
            end_range: end_range.collapse_to_end(),
            src_range: Range::between(&start_range, &end_range),
        };
        (body, diags)
    }

    /// Parse one identifier-led item: an attribute (`name = value`) or a
    /// block (`type "label" ... { ... }`).
    fn parse_body_item(&mut self) -> (Option<BodyItem>, Vec<Diagnostic>) {
        let ident = self.peeker.read();
        if ident.kind != TokenKind::Ident {
            self.recover_after_body_item();
            return (
                None,
                vec![Diagnostic::error(
                    "Attribute or block definition required",
                    "An attribute or block definition is required here.",
                    ident.range,
                )],
            );
        }

        match self.peeker.peek().kind {
            TokenKind::Equal => self.finish_attribute(ident),
            TokenKind::OQuote | TokenKind::OBrace => {
                let (block, diags) = self.finish_block(ident);
                (Some(BodyItem::Block(block)), diags)
            }
            _ => {
                self.recover_after_body_item();
                (
                    None,
                    vec![Diagnostic::error(
                        "Attribute or block definition required",
                        "An attribute or block definition is required here. To define an attribute, use the equals sign \"=\" to introduce the attribute value.",
                        ident.range,
                    )],
                )
            }
        }
    }

    /// Parse the remainder of an attribute after its name: the equals sign,
    /// the value expression, and the terminating newline.
    fn finish_attribute(&mut self, ident: Token) -> (Option<BodyItem>, Vec<Diagnostic>) {
        let mut diags = Vec::new();
        self.peeker.read(); // the `=`

        let (expr, expr_diags) = self.parse_expression();
        diags.extend(expr_diags);
        let Some(expr) = expr else {
            // The expression parser reported and resynchronized already.
            return (None, diags);
        };

        let next_kind = self.peeker.peek().kind;
        if !matches!(
            next_kind,
            TokenKind::Newline | TokenKind::Eof | TokenKind::CBrace
        ) {
            if !self.recovery {
                diags.push(Diagnostic::error(
                    "Missing newline after attribute definition",
                    "An attribute definition must end with a newline.",
                    self.peeker.next_range(),
                ));
            }
            self.recover_after_body_item();
        } else if next_kind == TokenKind::Newline {
            self.peeker.read();
        }

        let src_range = Range::between(&ident.range, &expr.range());
        let attr = Attribute {
            name: ident.text.clone(),
            name_range: ident.range,
            expr,
            src_range,
        };
        (Some(BodyItem::Attribute(attr)), diags)
    }

    /// Parse the remainder of a block after its type name: zero or more
    /// quoted labels, the brace-delimited body, and the closing brace.
    fn finish_block(&mut self, ident: Token) -> (Block, Vec<Diagnostic>) {
        let mut diags = Vec::new();
        let mut labels = Vec::new();
        let mut label_ranges = Vec::new();

        let o_brace_range = loop {
            let tok_kind = self.peeker.peek().kind;
            match tok_kind {
                TokenKind::OBrace => break self.peeker.read().range,

                TokenKind::OQuote => {
                    let (label, label_range, label_diags) = self.parse_quoted_string_literal();
                    let failed = has_errors(&label_diags);
                    diags.extend(label_diags);
                    labels.push(label);
                    label_ranges.push(label_range);
                    if failed {
                        self.recover_after_body_item();
                        return (
                            partial_block(ident, labels, label_ranges),
                            diags,
                        );
                    }
                }

                _ => {
                    let tok_range = self.peeker.next_range();
                    let context = Range::between(&ident.range, &tok_range);
                    match tok_kind {
                        TokenKind::Equal => diags.push(
                            Diagnostic::error(
                                "Invalid block definition",
                                "The equals sign \"=\" indicates an attribute definition, and must not be used when defining a block.",
                                tok_range,
                            )
                            .with_context(context),
                        ),
                        TokenKind::Newline => diags.push(
                            Diagnostic::error(
                                "Invalid block definition",
                                "A block definition must have block content delimited by \"{\" and \"}\", starting on the same line as the block header.",
                                tok_range,
                            )
                            .with_context(context),
                        ),
                        _ => {
                            if !self.recovery {
                                diags.push(
                                    Diagnostic::error(
                                        "Invalid block definition",
                                        "Either a quoted string block label or an opening brace (\"{\") is expected here.",
                                        tok_range,
                                    )
                                    .with_context(context),
                                );
                            }
                        }
                    }
                    self.recover_after_body_item();
                    return (partial_block(ident, labels, label_ranges), diags);
                }
            }
        };

        if self.depth >= self.max_nesting {
            diags.push(
                Diagnostic::error(
                    "Block nesting limit exceeded",
                    format!(
                        "Blocks may not be nested more than {} levels deep.",
                        self.max_nesting
                    ),
                    o_brace_range.clone(),
                )
                .with_context(Range::between(&ident.range, &o_brace_range)),
            );
            // Skip the whole nested body instead of recursing into it.
            self.recover(TokenKind::CBrace);
            let c_brace_range = self.peeker.prev_range();
            let mut block = partial_block(ident, labels, label_ranges);
            block.open_brace_range = o_brace_range;
            block.close_brace_range = c_brace_range;
            return (block, diags);
        }

        // The peeker is just after the opening brace: parse the nested body.
        self.depth += 1;
        let (body, body_diags) = self.parse_body(TokenKind::CBrace);
        self.depth -= 1;
        diags.extend(body_diags);
        let c_brace_range = self.peeker.prev_range();

        let block = Block {
            block_type: ident.text.clone(),
            labels,
            body: Some(body),
            type_range: ident.range,
            label_ranges,
            open_brace_range: o_brace_range,
            close_brace_range: c_brace_range,
        };
        (block, diags)
    }

    /// Parse a quoted string that may not contain any template sequences,
    /// as used for block labels. Returns the decoded text and the range
    /// spanning opening through closing quote.
    fn parse_quoted_string_literal(&mut self) -> (String, Range, Vec<Diagnostic>) {
        let o_quote = self.peeker.read();
        if o_quote.kind != TokenKind::OQuote {
            let range = o_quote.range.clone();
            return (
                String::new(),
                range.clone(),
                vec![Diagnostic::error(
                    "Invalid string literal",
                    "A quoted string is required here.",
                    range,
                )],
            );
        }

        let mut diags = Vec::new();
        let mut ret = String::new();

        let end_range = loop {
            let tok = self.peeker.read();
            match tok.kind {
                TokenKind::CQuote => break tok.range,

                TokenKind::QuotedLit => {
                    let (s, s_diags) = decode_string_lit(&tok);
                    diags.extend(s_diags);
                    ret.push_str(&s);
                }

                TokenKind::TemplateInterp | TokenKind::TemplateControl => {
                    let which = if tok.kind == TokenKind::TemplateControl {
                        "!"
                    } else {
                        "$"
                    };
                    diags.push(
                        Diagnostic::error(
                            "Invalid string literal",
                            format!(
                                "Template sequences are not allowed in this string. To include a literal {which:?}, double it (as \"{which}{which}\") to escape it."
                            ),
                            tok.range.clone(),
                        )
                        .with_context(Range::between(&o_quote.range, &tok.range)),
                    );
                    // Skip the whole template sequence before continuing.
                    self.recover(TokenKind::TemplateSeqEnd);
                }

                TokenKind::Eof => {
                    diags.push(
                        Diagnostic::error(
                            "Unterminated string literal",
                            "Unable to find the closing quote mark before the end of the file.",
                            tok.range.clone(),
                        )
                        .with_context(Range::between(&o_quote.range, &tok.range)),
                    );
                    break tok.range;
                }

                _ => {
                    // Should never happen as long as the scanner is
                    // behaving itself.
                    diags.push(
                        Diagnostic::error(
                            "Invalid string literal",
                            "This item is not valid in a string literal.",
                            tok.range.clone(),
                        )
                        .with_context(Range::between(&o_quote.range, &tok.range)),
                    );
                    self.recover(TokenKind::OQuote);
                    break self.peeker.prev_range();
                }
            }
        };

        let range = Range::between(&o_quote.range, &end_range);
        (ret, range, diags)
    }

    // =========================================================================
    // Attribute values
    // =========================================================================

    /// Parse an attribute value. The grammar is deliberately small:
    /// literal values, dotted variable references, and function calls.
    /// Operator expressions are a separate concern and not guessed at
    /// here. On failure this reports, resynchronizes, and returns `None`.
    fn parse_expression(&mut self) -> (Option<Expression>, Vec<Diagnostic>) {
        match self.peeker.peek().kind {
            TokenKind::NumberLit => {
                let tok = self.peeker.read();
                match tok.text.parse::<f64>() {
                    Ok(n) => (
                        Some(Expression::Literal(LiteralValue {
                            value: Value::Number(n),
                            src_range: tok.range,
                        })),
                        Vec::new(),
                    ),
                    Err(_) => {
                        let diags = vec![Diagnostic::error(
                            "Invalid number literal",
                            format!("The characters {:?} do not form a valid number.", tok.text),
                            tok.range,
                        )];
                        self.recover_after_body_item();
                        (None, diags)
                    }
                }
            }

            TokenKind::OQuote => {
                let (text, range, diags) = self.parse_quoted_string_literal();
                if has_errors(&diags) {
                    self.recover_after_body_item();
                    return (None, diags);
                }
                (
                    Some(Expression::Literal(LiteralValue {
                        value: Value::String(text),
                        src_range: range,
                    })),
                    diags,
                )
            }

            TokenKind::Ident => self.parse_variable_or_call(),

            // Bracketed constructs (lists, objects, parenthesized
            // expressions) are not part of this grammar; skip over the
            // whole construct so the next item parses cleanly.
            kind @ (TokenKind::OBrack | TokenKind::OBrace | TokenKind::OParen) => {
                let mut diags = Vec::new();
                if !self.recovery {
                    diags.push(Diagnostic::error(
                        "Invalid expression",
                        "This construct is not supported in an attribute value.",
                        self.peeker.next_range(),
                    ));
                }
                self.recover_over(kind);
                (None, diags)
            }

            _ => {
                let mut diags = Vec::new();
                if !self.recovery {
                    diags.push(Diagnostic::error(
                        "Invalid expression",
                        "An expression is required here: a literal value, a variable reference, or a function call.",
                        self.peeker.next_range(),
                    ));
                }
                self.recover_after_body_item();
                (None, diags)
            }
        }
    }

    /// Parse an identifier-led value: a keyword literal, a dotted
    /// traversal, or a function call.
    fn parse_variable_or_call(&mut self) -> (Option<Expression>, Vec<Diagnostic>) {
        let ident = self.peeker.read();

        let keyword = match ident.text.as_str() {
            "true" => Some(Value::Bool(true)),
            "false" => Some(Value::Bool(false)),
            "null" => Some(Value::Null),
            _ => None,
        };
        if let Some(value) = keyword {
            return (
                Some(Expression::Literal(LiteralValue {
                    value,
                    src_range: ident.range,
                })),
                Vec::new(),
            );
        }

        if self.peeker.peek().kind == TokenKind::OParen {
            return self.finish_call(ident);
        }

        let mut steps = Vec::new();
        let mut end_range = ident.range.clone();
        while self.peeker.peek().kind == TokenKind::Dot {
            let dot = self.peeker.read();
            let name_tok = self.peeker.read();
            if name_tok.kind != TokenKind::Ident {
                let diags = vec![Diagnostic::error(
                    "Attribute name required",
                    "A dot must be followed by an attribute name.",
                    Range::between(&dot.range, &name_tok.range),
                )];
                self.recover_after_body_item();
                return (None, diags);
            }
            let step_range = Range::between(&dot.range, &name_tok.range);
            end_range = name_tok.range.clone();
            steps.push(TraversalStep::Attr {
                name: name_tok.text,
                range: step_range,
            });
        }

        let src_range = Range::between(&ident.range, &end_range);
        (
            Some(Expression::Traversal(ScopeTraversal {
                traversal: Traversal {
                    root: ident.text,
                    steps,
                    src_range,
                },
            })),
            Vec::new(),
        )
    }

    /// Parse a function call's argument list, the name already consumed
    /// and an opening parenthesis known to be next.
    fn finish_call(&mut self, name: Token) -> (Option<Expression>, Vec<Diagnostic>) {
        let mut diags = Vec::new();
        let open = self.peeker.read(); // the `(`
        let mut args: Vec<Expression> = Vec::new();
        let mut expect_comma = false;

        let close_range = loop {
            match self.peeker.peek().kind {
                TokenKind::CParen => break self.peeker.read().range,

                // Argument lists may span lines.
                TokenKind::Newline => {
                    self.peeker.read();
                    continue;
                }

                TokenKind::Eof => {
                    diags.push(
                        Diagnostic::error(
                            "Unterminated function call",
                            "Unable to find the closing parenthesis before the end of the file.",
                            Range::between(&name.range, &open.range),
                        )
                        .with_context(Range::between(&name.range, &self.peeker.next_range())),
                    );
                    return (None, diags);
                }

                _ => {}
            }

            if expect_comma {
                if self.peeker.peek().kind != TokenKind::Comma {
                    if !self.recovery {
                        diags.push(
                            Diagnostic::error(
                                "Missing argument separator",
                                "Function arguments must be separated by commas (\",\").",
                                self.peeker.next_range(),
                            )
                            .with_context(Range::between(&name.range, &self.peeker.next_range())),
                        );
                    }
                    self.recover(TokenKind::CParen);
                    break self.peeker.prev_range();
                }
                self.peeker.read(); // the `,`
                expect_comma = false;
                continue;
            }

            let (arg, arg_diags) = self.parse_expression();
            diags.extend(arg_diags);
            match arg {
                Some(arg) => {
                    args.push(arg);
                    expect_comma = true;
                }
                // The expression parser already resynchronized; the call
                // cannot be completed.
                None => return (None, diags),
            }
        };

        let call = FunctionCall {
            name: name.text.clone(),
            args,
            name_range: name.range,
            open_paren_range: open.range,
            close_paren_range: close_range,
        };
        (Some(Expression::Call(call)), diags)
    }

    // =========================================================================
    // Error recovery
    // =========================================================================

    /// Seek forward until the token after the end of the current
    /// `end`-delimited construct, counting nested instances of the
    /// opposite bracket. Best-effort on input with bad nesting; always
    /// terminates, at worst on `Eof`.
    fn recover(&mut self, end: TokenKind) {
        let start = opposite_bracket(end);
        self.recovery = true;

        let mut nest = 0usize;
        loop {
            let mut kind = self.peeker.read().kind;
            // The two template openers are asymmetrical with their shared
            // closer; normalize so both count as openers here.
            if end == TokenKind::TemplateSeqEnd && kind == TokenKind::TemplateControl {
                kind = TokenKind::TemplateInterp;
            }

            if Some(kind) == start {
                nest += 1;
            } else if kind == end {
                if nest == 0 {
                    return;
                }
                nest -= 1;
            } else if kind == TokenKind::Eof {
                return;
            }
        }
    }

    /// Seek forward to the next occurrence of `start` and then past the
    /// end of the construct it opens, leaving the peeker just after it.
    /// `start` must be an opening bracketer.
    fn recover_over(&mut self, start: TokenKind) {
        self.recovery = true;

        loop {
            let kind = self.peeker.read().kind;
            if kind == start || kind == TokenKind::Eof {
                break;
            }
        }
        if let Some(end) = opposite_bracket(start) {
            self.recover(end);
        }
    }

    /// Seek to the next point where a new body item could begin: a newline
    /// outside any bracketing construct, or end of input. An explicit
    /// stack of open bracketers tolerates mismatched and extra closers, so
    /// this makes progress even over unbalanced nesting.
    fn recover_after_body_item(&mut self) {
        self.recovery = true;
        let mut open: Vec<TokenKind> = Vec::new();

        loop {
            let tok = self.peeker.read();
            match tok.kind {
                TokenKind::Newline if open.is_empty() => break,

                TokenKind::Eof => break,

                TokenKind::OBrace
                | TokenKind::OBrack
                | TokenKind::OParen
                | TokenKind::OQuote
                | TokenKind::OHeredoc
                | TokenKind::TemplateInterp
                | TokenKind::TemplateControl => {
                    open.push(tok.kind);
                }

                TokenKind::CBrace
                | TokenKind::CBrack
                | TokenKind::CParen
                | TokenKind::CQuote
                | TokenKind::CHeredoc => {
                    // Pop down to and including the matching opener,
                    // discarding entries a mismatched closer stranded.
                    let opener = opposite_bracket(tok.kind);
                    while let Some(top) = open.pop() {
                        if Some(top) == opener {
                            break;
                        }
                    }
                }

                TokenKind::TemplateSeqEnd => {
                    while let Some(top) = open.pop() {
                        if matches!(
                            top,
                            TokenKind::TemplateInterp | TokenKind::TemplateControl
                        ) {
                            break;
                        }
                    }
                }

                _ => {}
            }
        }
    }
}

/// A block whose content could not be parsed: body absent and the type
/// range standing in for both brace ranges, so callers always receive
/// well-formed ranges.
fn partial_block(ident: Token, labels: Vec<String>, label_ranges: Vec<Range>) -> Block {
    Block {
        block_type: ident.text.clone(),
        labels,
        body: None,
        label_ranges,
        open_brace_range: ident.range.clone(),
        close_brace_range: ident.range.clone(),
        type_range: ident.range,
    }
}

/// The opposite end of a bracketing pair, or `None` for non-bracketers.
///
/// Both template openers map to the shared `TemplateSeqEnd`; the reverse
/// direction picks the interpolation opener, which is what `recover`'s
/// normalization assumes.
fn opposite_bracket(kind: TokenKind) -> Option<TokenKind> {
    use TokenKind::*;
    match kind {
        OBrace => Some(CBrace),
        OBrack => Some(CBrack),
        OParen => Some(CParen),
        OQuote => Some(CQuote),
        OHeredoc => Some(CHeredoc),
        CBrace => Some(OBrace),
        CBrack => Some(OBrack),
        CParen => Some(OParen),
        CQuote => Some(OQuote),
        CHeredoc => Some(OHeredoc),
        TemplateInterp | TemplateControl => Some(TemplateSeqEnd),
        TemplateSeqEnd => Some(TemplateInterp),
        _ => None,
    }
}
