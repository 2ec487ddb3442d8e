//! Minimal mutable XML document model.
//!
//! - [`Document`]: arena tree with parent links, supporting detach/replace/clear
//! - [`parse`] / [`parse_bytes`]: build a tree with quick-xml
//! - [`to_string`]: serialize a tree back to text
//!
//! The model keeps everything needed to write a DocBook file back out unchanged
//! apart from the edits made to it: declaration, DOCTYPE, comments, processing
//! instructions, CDATA, and entity references the parser does not know.

pub mod reader;
pub mod tree;
pub mod writer;

use thiserror::Error;

pub use reader::{parse, parse_bytes};
pub use tree::{Attribute, Declaration, Document, Element, NodeId, NodeKind};
pub use writer::{node_to_string, to_string};

/// Errors raised while parsing XML text
#[derive(Error, Debug)]
pub enum XmlError {
    #[error("XML syntax error at byte {position}: {source}")]
    Syntax {
        position: u64,
        #[source]
        source: quick_xml::Error,
    },

    #[error("Malformed XML: {0}")]
    Malformed(String),

    #[error("Element <{0}> is never closed")]
    Unclosed(String),

    #[error("Document has no root element")]
    NoRootElement,

    #[error("Invalid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
}
