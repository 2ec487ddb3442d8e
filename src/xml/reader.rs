//! Build a [`Document`] from XML text with quick-xml.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use super::XmlError;
use super::tree::{Attribute, Declaration, Document, Element, NodeId, NodeKind};

/// Parse a byte buffer, stripping a UTF-8 byte order mark.
pub fn parse_bytes(bytes: &[u8]) -> Result<Document, XmlError> {
    let content = std::str::from_utf8(strip_bom(bytes))?;
    parse(content)
}

/// Parse XML text into a mutable tree.
///
/// Entity references other than the five predefined ones and character
/// references are kept as [`NodeKind::EntityRef`] nodes.
pub fn parse(content: &str) -> Result<Document, XmlError> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(false);

    let mut doc = Document::new();
    let mut stack: Vec<NodeId> = vec![doc.document_node()];

    loop {
        let event = reader.read_event().map_err(|source| XmlError::Syntax {
            position: reader.buffer_position() as u64,
            source,
        })?;
        let parent = *stack.last().unwrap_or(&doc.document_node());

        match event {
            Event::Start(e) => {
                check_single_root(&doc, parent)?;
                let element = read_element(&e)?;
                let id = doc.create_node(NodeKind::Element(element));
                doc.append_child(parent, id);
                stack.push(id);
            }
            Event::Empty(e) => {
                check_single_root(&doc, parent)?;
                let element = read_element(&e)?;
                let id = doc.create_node(NodeKind::Element(element));
                doc.append_child(parent, id);
            }
            Event::End(_) => {
                // quick-xml already rejects mismatched end tags
                if stack.len() <= 1 {
                    return Err(XmlError::Malformed("unexpected end tag".to_string()));
                }
                stack.pop();
            }
            Event::Text(e) => {
                let text = std::str::from_utf8(e.as_ref())?;
                if parent == doc.document_node() && !text.trim().is_empty() {
                    return Err(XmlError::Malformed(
                        "text outside the root element".to_string(),
                    ));
                }
                push_text(&mut doc, parent, text);
            }
            Event::GeneralRef(e) => {
                let name = std::str::from_utf8(e.as_ref())?;
                if parent == doc.document_node() {
                    return Err(XmlError::Malformed(format!(
                        "reference &{}; outside the root element",
                        name
                    )));
                }
                match resolve_entity(name) {
                    Some(resolved) => push_text(&mut doc, parent, &resolved),
                    None => {
                        let id = doc.create_node(NodeKind::EntityRef(name.to_string()));
                        doc.append_child(parent, id);
                    }
                }
            }
            Event::CData(e) => {
                if parent == doc.document_node() {
                    return Err(XmlError::Malformed(
                        "CDATA outside the root element".to_string(),
                    ));
                }
                let text = std::str::from_utf8(e.as_ref())?.to_string();
                let id = doc.create_node(NodeKind::CData(text));
                doc.append_child(parent, id);
            }
            Event::Comment(e) => {
                let text = std::str::from_utf8(e.as_ref())?.to_string();
                let id = doc.create_node(NodeKind::Comment(text));
                doc.append_child(parent, id);
            }
            Event::PI(e) => {
                let text = std::str::from_utf8(e.as_ref())?.to_string();
                let id = doc.create_node(NodeKind::ProcessingInstruction(text));
                doc.append_child(parent, id);
            }
            Event::DocType(e) => {
                let text = std::str::from_utf8(e.as_ref())?.trim().to_string();
                let id = doc.create_node(NodeKind::DocType(text));
                doc.append_child(parent, id);
            }
            Event::Decl(e) => {
                let version = e
                    .version()
                    .map_err(|err| XmlError::Malformed(err.to_string()))?;
                let encoding = match e.encoding() {
                    Some(value) => Some(
                        String::from_utf8(
                            value
                                .map_err(|err| XmlError::Malformed(err.to_string()))?
                                .into_owned(),
                        )
                        .map_err(|err| err.utf8_error())?,
                    ),
                    None => None,
                };
                let standalone = match e.standalone() {
                    Some(value) => Some(
                        String::from_utf8(
                            value
                                .map_err(|err| XmlError::Malformed(err.to_string()))?
                                .into_owned(),
                        )
                        .map_err(|err| err.utf8_error())?,
                    ),
                    None => None,
                };
                let declaration = Declaration {
                    version: std::str::from_utf8(&version)?.to_string(),
                    encoding,
                    standalone,
                };
                let id = doc.create_node(NodeKind::Declaration(declaration));
                doc.append_child(parent, id);
            }
            Event::Eof => break,
        }
    }

    if stack.len() > 1 {
        let open = stack
            .last()
            .and_then(|&id| doc.name(id))
            .unwrap_or_default()
            .to_string();
        return Err(XmlError::Unclosed(open));
    }
    if doc.root_element().is_none() {
        return Err(XmlError::NoRootElement);
    }

    Ok(doc)
}

/// A document has exactly one top-level element.
fn check_single_root(doc: &Document, parent: NodeId) -> Result<(), XmlError> {
    if parent == doc.document_node() && doc.root_element().is_some() {
        return Err(XmlError::Malformed(
            "extra content at end of document".to_string(),
        ));
    }
    Ok(())
}

fn read_element(start: &BytesStart<'_>) -> Result<Element, XmlError> {
    let name = std::str::from_utf8(start.name().as_ref())?.to_string();
    let mut attributes = Vec::new();

    for attr in start.attributes() {
        let attr = attr.map_err(|err| XmlError::Malformed(err.to_string()))?;
        let key = std::str::from_utf8(attr.key.as_ref())?.to_string();
        let raw = std::str::from_utf8(&attr.value)?;
        let value = quick_xml::escape::unescape(raw)
            .map_err(|err| XmlError::Malformed(format!("attribute {}: {}", key, err)))?;
        attributes.push(Attribute {
            name: key,
            value: value.into_owned(),
        });
    }

    Ok(Element { name, attributes })
}

/// Append text to `parent`, merging with a preceding text node.
fn push_text(doc: &mut Document, parent: NodeId, text: &str) {
    if let Some(&last) = doc.children(parent).last()
        && let Some(existing) = doc.text_mut(last)
    {
        existing.push_str(text);
        return;
    }
    doc.append_text(parent, text);
}

/// Expand predefined entities and character references.
fn resolve_entity(entity: &str) -> Option<String> {
    if let Some(resolved) = quick_xml::escape::resolve_predefined_entity(entity) {
        return Some(resolved.to_string());
    }

    let code = if let Some(hex) = entity.strip_prefix("#x") {
        u32::from_str_radix(hex, 16).ok()?
    } else if let Some(dec) = entity.strip_prefix('#') {
        dec.parse::<u32>().ok()?
    } else {
        return None;
    };
    char::from_u32(code).map(|c| c.to_string())
}

fn strip_bom(data: &[u8]) -> &[u8] {
    if data.starts_with(&[0xEF, 0xBB, 0xBF]) {
        &data[3..]
    } else {
        data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_tree() {
        let doc = parse(r#"<chapter id="intro"><title>Introduction</title><para>Hi</para></chapter>"#)
            .unwrap();
        let root = doc.root_element().unwrap();

        assert_eq!(doc.name(root), Some("chapter"));
        assert_eq!(doc.attribute(root, "id"), Some("intro"));
        let title = doc.child_element(root, "title").unwrap();
        assert_eq!(doc.text_content(title), "Introduction");
    }

    #[test]
    fn test_predefined_and_char_refs_become_text() {
        let doc = parse("<para>a &amp; b &#65;&#x42;</para>").unwrap();
        let root = doc.root_element().unwrap();

        assert_eq!(doc.children(root).len(), 1);
        assert_eq!(doc.text_content(root), "a & b AB");
    }

    #[test]
    fn test_unknown_entity_kept_as_reference() {
        let doc = parse("<para>see &PRODUCT; now</para>").unwrap();
        let root = doc.root_element().unwrap();
        let kinds: Vec<_> = doc.children(root).iter().map(|&c| doc.kind(c).clone()).collect();

        assert_eq!(
            kinds,
            vec![
                NodeKind::Text("see ".into()),
                NodeKind::EntityRef("PRODUCT".into()),
                NodeKind::Text(" now".into()),
            ]
        );
    }

    #[test]
    fn test_attribute_values_are_unescaped() {
        let doc = parse(r#"<ulink url="a&amp;b.xml"/>"#).unwrap();
        let root = doc.root_element().unwrap();
        assert_eq!(doc.attribute(root, "url"), Some("a&b.xml"));
    }

    #[test]
    fn test_mismatched_end_tag_is_error() {
        assert!(parse("<chapter><para></chapter>").is_err());
    }

    #[test]
    fn test_second_top_level_element_is_error() {
        let result = parse(
            r#"<chapter id="x"><title>X</title></chapter><chapter id="y"><title>Y</title></chapter>"#,
        );
        assert!(matches!(result, Err(XmlError::Malformed(_))));
        assert!(matches!(parse("<a/><b/>"), Err(XmlError::Malformed(_))));
    }

    #[test]
    fn test_text_after_root_is_error() {
        assert!(matches!(
            parse("<chapter><title>X</title></chapter>stray text"),
            Err(XmlError::Malformed(_))
        ));
        assert!(matches!(
            parse("<chapter/>&PRODUCT;"),
            Err(XmlError::Malformed(_))
        ));
    }

    #[test]
    fn test_whitespace_and_comments_around_root_are_kept() {
        let doc = parse("<!-- head -->\n<chapter/>\n<!-- tail -->\n").unwrap();
        assert!(doc.root_element().is_some());
        let comments = doc
            .children(doc.document_node())
            .iter()
            .filter(|&&id| matches!(doc.kind(id), NodeKind::Comment(_)))
            .count();
        assert_eq!(comments, 2);
    }

    #[test]
    fn test_unclosed_element_is_error() {
        assert!(parse("<chapter><para>text").is_err());
    }

    #[test]
    fn test_empty_input_has_no_root() {
        assert!(matches!(parse("  "), Err(XmlError::NoRootElement)));
    }

    #[test]
    fn test_bom_is_stripped() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice(b"<chapter/>");
        let doc = parse_bytes(&bytes).unwrap();
        assert!(doc.root_element().is_some());
    }

    #[test]
    fn test_invalid_utf8_is_error() {
        assert!(matches!(
            parse_bytes(&[b'<', b'a', b'>', 0xFF, b'<', b'/', b'a', b'>']),
            Err(XmlError::Utf8(_))
        ));
    }
}
