//! Abstract Syntax Tree for NCL configuration bodies.
//!
//! A body is the content of one configuration scope: a set of uniquely
//! named attributes plus an ordered sequence of blocks, each block nesting
//! another body. Every node records the source ranges needed to point
//! diagnostics at it precisely.
//!
//! All nodes are built bottom-up in a single parse pass and never mutated
//! afterwards; ownership is strictly tree-shaped.

use crate::expr::Expression;
use ncl_lexer::Range;
use std::collections::HashMap;

/// The content of a configuration scope.
#[derive(Debug, Clone, PartialEq)]
pub struct Body {
    /// Attributes keyed by name. Uniqueness is enforced during parsing:
    /// a redefinition is diagnosed and the first definition kept.
    pub attributes: HashMap<String, Attribute>,
    /// Blocks in source order.
    pub blocks: Vec<Block>,
    /// The region covering the whole body, terminator included.
    pub src_range: Range,
    /// A zero-width range just past the body, for diagnostics that need to
    /// point at missing or empty content.
    pub end_range: Range,
}

impl Body {
    /// Look up an attribute by name.
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    /// Blocks of the given type, in source order.
    pub fn blocks_of_type<'a>(&'a self, block_type: &'a str) -> impl Iterator<Item = &'a Block> {
        self.blocks
            .iter()
            .filter(move |b| b.block_type == block_type)
    }
}

/// A name bound to an expression value within a body.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub expr: Expression,
    pub src_range: Range,
    pub name_range: Range,
}

/// A named, optionally labeled, nested body.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub block_type: String,
    pub labels: Vec<String>,
    /// `body` is `None` (not merely empty) when the block's content
    /// could not be parsed at all.
    pub body: Option<Body>,

    pub type_range: Range,
    /// Always the same length as `labels`.
    pub label_ranges: Vec<Range>,
    /// On a malformed header these two hold the type range as a
    /// placeholder, so callers always receive well-formed ranges.
    pub open_brace_range: Range,
    pub close_brace_range: Range,
}

impl Block {
    /// The region from the type name through the last header token.
    pub fn def_range(&self) -> Range {
        Range::between(&self.type_range, &self.open_brace_range)
    }
}

/// One item of a body: the closed set of things an identifier can begin.
#[derive(Debug, Clone, PartialEq)]
pub enum BodyItem {
    Attribute(Attribute),
    Block(Block),
}

impl BodyItem {
    pub fn range(&self) -> Range {
        match self {
            BodyItem::Attribute(attr) => attr.src_range.clone(),
            BodyItem::Block(block) => Range::between(
                &block.type_range,
                &block.close_brace_range,
            ),
        }
    }
}
