//! Rewrites Skype's per-message XML markup (`body_xml`) into plain HTML.
//!
//! The fragment is wrapped in a synthetic `<msg>` root and parsed with `roxmltree`.
//! Every direct element child of that root is dispatched on its lower-cased tag name:
//!
//! | tag          | result                                         |
//! |--------------|------------------------------------------------|
//! | `ss`         | the tag's first text child (emoticons, quotes) |
//! | `files`      | one placeholder per element child, in order    |
//! | `uriobject`  | `[IMAGE]`                                      |
//! | `file`       | `[FILE <name>]`                                |
//! | anything else| passed through untouched                       |
//!
//! The parsed document is never mutated. The output is rebuilt from a flattened
//! list of [`Piece`]s, so an element that expands into several nodes simply
//! contributes several pieces at its position.

use crate::error::Result;
use crate::html::escape_text;
use roxmltree::{Document, Node};
use tracing::{debug, warn};

const ROOT_TAG: &str = "msg";

/// One output node of the rewritten fragment.
#[derive(Debug, Clone, PartialEq)]
pub enum Piece<'a, 'input> {
    /// A freshly created text node. Escaped on serialization.
    Text(String),
    /// A node of the parsed fragment, emitted exactly as it appeared in the source.
    Original(Node<'a, 'input>),
}

/// Replacement for a single root child.
#[derive(Debug, Clone, PartialEq)]
pub enum Rewrite<'a, 'input> {
    Single(Piece<'a, 'input>),
    Sequence(Vec<Piece<'a, 'input>>),
}

impl<'a, 'input> Rewrite<'a, 'input> {
    fn text(value: impl Into<String>) -> Self {
        Rewrite::Single(Piece::Text(value.into()))
    }
}

/// Transform a raw `body_xml` fragment into an HTML-safe fragment.
///
/// Malformed markup surfaces as [`crate::ExportError::Markup`]. That includes
/// namespace-prefixed tags whose prefix is never bound, such as `<a:b>z</a:b>`.
///
/// Top-level text is re-escaped from its decoded value, so CDATA sections come out
/// as ordinary escaped text.
pub fn transform(fragment: &str) -> Result<String> {
    let wrapped = format!("<{ROOT_TAG}>{fragment}</{ROOT_TAG}>");
    let doc = Document::parse(&wrapped)?;

    let mut out = String::with_capacity(fragment.len());
    for piece in rewrite_children(doc.root_element()) {
        match piece {
            Piece::Text(text) => out.push_str(&escape_text(&text)),
            Piece::Original(node) if node.is_text() => {
                out.push_str(&escape_text(node.text().unwrap_or("")))
            }
            Piece::Original(node) => out.push_str(&wrapped[node.range()]),
        }
    }
    Ok(out)
}

/// Map every child of `root` through [`rewrite_node`] and flatten the result.
pub fn rewrite_children<'a, 'input>(root: Node<'a, 'input>) -> Vec<Piece<'a, 'input>> {
    let mut pieces = Vec::new();
    for child in root.children() {
        if !child.is_element() {
            pieces.push(Piece::Original(child));
            continue;
        }
        match rewrite_node(child) {
            Rewrite::Single(piece) => pieces.push(piece),
            Rewrite::Sequence(run) => pieces.extend(run),
        }
    }
    pieces
}

/// Decide what replaces a single element node.
pub fn rewrite_node<'a, 'input>(node: Node<'a, 'input>) -> Rewrite<'a, 'input> {
    let tag = node.tag_name().name().to_lowercase();
    match tag.as_str() {
        "ss" => Rewrite::text(first_text(node)),
        "files" => Rewrite::Sequence(
            node.children()
                .filter(|c| c.is_element())
                .map(|c| Piece::Text(media_placeholder(c)))
                .collect(),
        ),
        "uriobject" | "file" => Rewrite::text(media_placeholder(node)),
        _ => {
            debug!(tag = %tag, "passing through unrecognized markup tag");
            Rewrite::Single(Piece::Original(node))
        }
    }
}

/// Lossy stand-in text for embedded media.
fn media_placeholder(node: Node<'_, '_>) -> String {
    let tag = node.tag_name().name();
    warn!(tag = %tag, "converting media tag, currently unsupported");
    debug!(xml = %source_of(node), "media tag source");

    match tag.to_lowercase().as_str() {
        "uriobject" => "[IMAGE]".to_string(),
        "file" => format!("[FILE {}]", first_text(node)),
        _ => String::new(),
    }
}

// Raw text of the first text child, or "" when the element has none.
fn first_text<'a>(node: Node<'a, '_>) -> &'a str {
    node.children()
        .find(|c| c.is_text())
        .and_then(|c| c.text())
        .unwrap_or("")
}

fn source_of<'input>(node: Node<'_, 'input>) -> &'input str {
    &node.document().input_text()[node.range()]
}
