//! Tree view of dot-delimited document names
//!
//! ```text
//! ├── auth/ - Authentication overview
//! │   ├── jwt - JWT middleware
//! │   └── oauth - OAuth flow
//! └── database - Database layer
//! ```
//!
//! A segment can be both a document and a branch (`auth` next to
//! `auth.jwt`); such nodes render as a branch carrying the description.

use std::collections::BTreeMap;

use super::doc::DocSummary;

/// A node in the name hierarchy
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TreeNode {
    /// Description of the document at this exact name, if one exists
    pub description: Option<String>,

    /// Child segments, sorted alphabetically
    pub children: BTreeMap<String, TreeNode>,
}

impl TreeNode {
    pub fn is_branch(&self) -> bool {
        !self.children.is_empty()
    }
}

/// Builds the nested segment tree for a set of documents
pub fn build_tree(docs: &[DocSummary]) -> TreeNode {
    let mut root = TreeNode::default();

    for doc in docs {
        let mut node = &mut root;
        for segment in doc.name.segments() {
            node = node.children.entry(segment.to_string()).or_default();
        }
        node.description = Some(doc.description.clone());
    }

    root
}

/// Renders a tree with box-drawing connectors
pub fn render_tree(root: &TreeNode) -> String {
    let mut out = String::new();
    render_children(root, "", &mut out);
    out
}

/// Builds and renders in one step
pub fn format_tree(docs: &[DocSummary]) -> String {
    render_tree(&build_tree(docs))
}

fn render_children(node: &TreeNode, prefix: &str, out: &mut String) {
    let count = node.children.len();

    for (i, (segment, child)) in node.children.iter().enumerate() {
        let is_last = i + 1 == count;
        let connector = if is_last { "└── " } else { "├── " };

        out.push_str(prefix);
        out.push_str(connector);
        out.push_str(segment);
        if child.is_branch() {
            out.push('/');
        }
        if let Some(description) = &child.description {
            out.push_str(" - ");
            out.push_str(description);
        }
        out.push('\n');

        if child.is_branch() {
            let continuation = if is_last { "    " } else { "│   " };
            render_children(child, &format!("{}{}", prefix, continuation), out);
        }
    }
}
