//! Static variable collection for dynamic blocks.
//!
//! A `dynamic` block describes the repeated expansion of another block:
//! its `for_each` attribute supplies the collection to iterate and its
//! `labels` attribute the labels of each generated block, with the
//! generated content nested under a `content` block. Tooling that prepares
//! an evaluation context needs to know which variables those expansion
//! attributes reference before any evaluation happens; this walk collects
//! them from a fully parsed tree.
//!
//! Only the tree structure and `Expression::free_variables` are used, so
//! this stays a plain consumer of the parser's public contract.

use crate::ast::{Block, Body};
use crate::expr::Traversal;

/// The attributes of a `dynamic` block that are resolved at expansion
/// time, in the order their variables are reported.
const EXPANSION_ATTRS: [&str; 2] = ["for_each", "labels"];

/// Collect the variables referenced by the expansion attributes of every
/// `dynamic` block in the tree.
///
/// Traversal order is tree order: a block's own expansion attributes come
/// before anything found inside its `content`, and siblings appear in
/// source order. Attributes of ordinary blocks are not collected; only
/// `dynamic` expansion attributes are resolved before evaluation.
pub fn dynamic_block_variables(body: &Body) -> Vec<Traversal> {
    let mut vars = Vec::new();
    collect_body(body, &mut vars);
    vars
}

fn collect_body(body: &Body, vars: &mut Vec<Traversal>) {
    for block in &body.blocks {
        collect_block(block, vars);
    }
}

fn collect_block(block: &Block, vars: &mut Vec<Traversal>) {
    let Some(body) = &block.body else {
        // A block that failed to parse has nothing to offer.
        return;
    };

    if block.block_type == "dynamic" {
        for name in EXPANSION_ATTRS {
            if let Some(attr) = body.attributes.get(name) {
                vars.extend(attr.expr.free_variables());
            }
        }
        for content in body.blocks_of_type("content") {
            if let Some(content_body) = &content.body {
                collect_body(content_body, vars);
            }
        }
    } else {
        collect_body(body, vars);
    }
}
