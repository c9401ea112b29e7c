//! Plain-text tree rendering

use std::fmt::Write;
use tmon_tree::{LiveHierarchy, ShadowTree};

/// Indented outline of the tree, two spaces per level, one node per line
#[must_use]
pub fn render_text<H: LiveHierarchy>(tree: &ShadowTree<H>) -> String {
    let mut out = String::new();
    for entry in tree.walk() {
        let _ = writeln!(out, "{}{}", "  ".repeat(entry.depth), entry.name);
    }
    out
}
