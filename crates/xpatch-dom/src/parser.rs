//! XML parser that builds [`Document`] trees with source spans.

use crate::document::Document;
use crate::error::{Error, Result, TreeError};
use crate::node::{Attribute, NodeData, NodeId, NodeKind};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, BytesText, Event};
use xpatch_source_map::{FileId, SourceSpan};

/// Options controlling what the parser keeps.
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// File the spans refer to.
    pub file: Option<FileId>,
    /// Keep text nodes that contain only whitespace.
    pub preserve_whitespace: bool,
    /// Keep comments.
    pub keep_comments: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            file: None,
            preserve_whitespace: false,
            keep_comments: true,
        }
    }
}

impl ParseOptions {
    pub fn for_file(file: FileId) -> Self {
        Self {
            file: Some(file),
            ..Self::default()
        }
    }
}

/// Parse XML from a string with default options.
///
/// ```rust
/// use xpatch_dom::parse;
///
/// let doc = parse("<root><child/></root>").unwrap();
/// let root = doc.root_element().unwrap();
/// assert_eq!(doc.name(root), Some("root"));
/// assert_eq!(doc.children(root).len(), 1);
/// ```
///
/// # Errors
///
/// Returns an error if the XML is malformed or has no root element.
pub fn parse(content: &str) -> Result<Document> {
    parse_with_options(content, &ParseOptions::default())
}

pub fn parse_with_options(content: &str, options: &ParseOptions) -> Result<Document> {
    XmlParser::new(content, options).parse()
}

struct OpenElement {
    id: NodeId,
    name: String,
    name_span: SourceSpan,
    start_offset: usize,
}

struct XmlParser<'a> {
    reader: Reader<&'a [u8]>,
    options: &'a ParseOptions,
    doc: Document,
    stack: Vec<OpenElement>,
}

impl<'a> XmlParser<'a> {
    fn new(source: &'a str, options: &'a ParseOptions) -> Self {
        let mut reader = Reader::from_str(source);
        reader.config_mut().trim_text_start = false;
        reader.config_mut().trim_text_end = false;

        Self {
            reader,
            options,
            doc: Document::new(),
            stack: Vec::new(),
        }
    }

    fn span(&self, start: usize, end: usize) -> SourceSpan {
        SourceSpan::in_file(self.options.file, start, end)
    }

    fn position(&self) -> usize {
        self.reader.buffer_position() as usize
    }

    fn parse(mut self) -> Result<Document> {
        loop {
            let event_start = self.position();

            match self.reader.read_event() {
                Ok(Event::Start(e)) => {
                    let open = self.handle_start(&e, event_start)?;
                    self.stack.push(open);
                }
                Ok(Event::End(e)) => {
                    let end_name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    let open = self.stack.pop().ok_or_else(|| Error::InvalidStructure {
                        message: format!("Unexpected closing tag </{}>", end_name),
                        location: Some(self.span(event_start, self.position())),
                    })?;
                    if open.name != end_name {
                        return Err(Error::MismatchedEndTag {
                            expected: open.name,
                            found: end_name,
                            location: Some(open.name_span),
                        });
                    }
                    let span = self.span(open.start_offset, self.position());
                    self.doc.set_span(open.id, Some(span));
                }
                Ok(Event::Empty(e)) => {
                    let open = self.handle_start(&e, event_start)?;
                    let span = self.span(event_start, self.position());
                    self.doc.set_span(open.id, Some(span));
                }
                Ok(Event::Text(e)) => {
                    self.handle_text(&e, event_start)?;
                }
                Ok(Event::CData(e)) => {
                    let text = String::from_utf8_lossy(e.as_ref()).into_owned();
                    let span = self.span(event_start, self.position());
                    self.attach(NodeData::Text(text), span)?;
                }
                Ok(Event::Comment(e)) => {
                    if self.options.keep_comments {
                        let text = String::from_utf8_lossy(&e).into_owned();
                        let span = self.span(event_start, self.position());
                        self.attach(NodeData::Comment(text), span)?;
                    }
                }
                Ok(Event::PI(e)) => {
                    let raw = String::from_utf8_lossy(&e).into_owned();
                    let (target, data) = match raw.split_once(char::is_whitespace) {
                        Some((target, data)) => {
                            (target.to_string(), data.trim_start().to_string())
                        }
                        None => (raw, String::new()),
                    };
                    let span = self.span(event_start, self.position());
                    self.attach(NodeData::ProcessingInstruction { target, data }, span)?;
                }
                Ok(Event::Decl(_) | Event::DocType(_)) => {}
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(Error::XmlSyntax {
                        message: e.to_string(),
                        position: Some(self.reader.error_position()),
                    });
                }
            }
        }

        if let Some(open) = self.stack.last() {
            return Err(Error::UnexpectedEof {
                expected: format!("closing tag </{}>", open.name),
                location: Some(open.name_span),
            });
        }

        if self.doc.root_element().is_none() {
            return Err(Error::EmptyDocument);
        }

        Ok(self.doc)
    }

    fn current_parent(&self) -> NodeId {
        self.stack
            .last()
            .map(|open| open.id)
            .unwrap_or_else(|| self.doc.document_node())
    }

    /// Create a node under the innermost open element.
    fn attach(&mut self, data: NodeData, span: SourceSpan) -> Result<NodeId> {
        let parent = self.current_parent();
        let kind = data.kind();
        let id = self.doc.create_node(data, Some(span));
        self.doc.append_child(parent, id).map_err(|err| match err {
            TreeError::MultipleRoots => Error::MultipleRoots {
                location: Some(span),
            },
            TreeError::InvalidDocumentChild { .. } => Error::InvalidStructure {
                message: format!("Unexpected {} outside the root element", kind),
                location: Some(span),
            },
            other => Error::InvalidStructure {
                message: other.to_string(),
                location: Some(span),
            },
        })?;
        Ok(id)
    }

    fn handle_start(&mut self, e: &BytesStart<'_>, event_start: usize) -> Result<OpenElement> {
        let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
        let name_start = event_start + 1;
        let name_span = self.span(name_start, name_start + name.len());
        let attributes = self.parse_attributes(e, event_start)?;

        let span = self.span(event_start, self.position());
        let id = self.attach(
            NodeData::Element {
                name: name.clone(),
                attributes,
            },
            span,
        )?;

        Ok(OpenElement {
            id,
            name,
            name_span,
            start_offset: event_start,
        })
    }

    fn handle_text(&mut self, e: &BytesText<'_>, event_start: usize) -> Result<()> {
        let text = e
            .unescape()
            .map_err(|err| Error::XmlSyntax {
                message: format!("Invalid text content: {}", err),
                position: Some(event_start as u64),
            })?
            .into_owned();
        let span = self.span(event_start, self.position());

        if text.trim().is_empty() {
            if self.stack.is_empty() || !self.options.preserve_whitespace {
                return Ok(());
            }
        } else if self.stack.is_empty() {
            return Err(Error::InvalidStructure {
                message: format!("Unexpected {} outside the root element", NodeKind::Text),
                location: Some(span),
            });
        }

        self.attach(NodeData::Text(text), span)?;
        Ok(())
    }

    fn parse_attributes(&self, e: &BytesStart<'_>, tag_start: usize) -> Result<Vec<Attribute>> {
        let tag = String::from_utf8_lossy(e.as_ref()).into_owned();
        // Offsets in `tag` are relative to the byte after '<'.
        let base = tag_start + 1;
        let mut cursor = e.name().as_ref().len();
        let mut attributes: Vec<Attribute> = Vec::new();

        for attr in e.attributes() {
            let attr = attr?;
            let name = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr
                .unescape_value()
                .map_err(|err| Error::XmlSyntax {
                    message: format!("Invalid attribute value: {}", err),
                    position: Some(tag_start as u64),
                })?
                .into_owned();

            let (name_range, value_range) = locate_attribute(&tag, cursor, &name);
            if let Some((_, end)) = value_range {
                cursor = end;
            }

            attributes.push(Attribute {
                name,
                value,
                name_span: name_range.map(|(s, e)| self.span(base + s, base + e)),
                value_span: value_range.map(|(s, e)| self.span(base + s, base + e)),
            });
        }

        Ok(attributes)
    }
}

type Range = (usize, usize);

/// Find `name = "value"` in raw tag text at or after `from`. The value range
/// includes the quotes.
fn locate_attribute(tag: &str, from: usize, name: &str) -> (Option<Range>, Option<Range>) {
    let bytes = tag.as_bytes();
    let mut search = from.min(tag.len());

    while let Some(rel) = tag[search..].find(name) {
        let start = search + rel;
        let end = start + name.len();
        let preceded_by_space = start == 0 || bytes[start - 1].is_ascii_whitespace();

        let mut i = end;
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if preceded_by_space && i < bytes.len() && bytes[i] == b'=' {
            i += 1;
            while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                i += 1;
            }
            let value = match bytes.get(i) {
                Some(&quote) if quote == b'"' || quote == b'\'' => tag[i + 1..]
                    .find(quote as char)
                    .map(|close| (i, i + 1 + close + 1)),
                _ => None,
            };
            return (Some((start, end)), value);
        }
        search = end;
    }

    (None, None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple() {
        let doc = parse("<root/>").unwrap();
        let root = doc.root_element().unwrap();
        assert_eq!(doc.name(root), Some("root"));
        assert!(doc.children(root).is_empty());
        assert_eq!(doc.span(root).map(|s| (s.start, s.end)), Some((0, 7)));
    }

    #[test]
    fn test_parse_attributes_with_spans() {
        let src = r#"<Item Id="a"  v='1'/>"#;
        let doc = parse(src).unwrap();
        let item = doc.root_element().unwrap();
        let attrs = doc.attributes(item);
        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs[0].name, "Id");
        assert_eq!(attrs[0].value, "a");
        let name_span = attrs[0].name_span.unwrap();
        assert_eq!(&src[name_span.start..name_span.end], "Id");
        let value_span = attrs[1].value_span.unwrap();
        assert_eq!(&src[value_span.start..value_span.end], "'1'");
    }

    #[test]
    fn test_attribute_name_inside_value() {
        let src = r#"<a x="y=1" y="2"/>"#;
        let doc = parse(src).unwrap();
        let a = doc.root_element().unwrap();
        let span = doc.attributes(a)[1].name_span.unwrap();
        assert_eq!(span.start, 11);
        assert_eq!(&src[span.start..span.end], "y");
    }

    #[test]
    fn test_whitespace_dropped_by_default() {
        let doc = parse("<a>\n  <b/>\n  <c/>\n</a>").unwrap();
        let a = doc.root_element().unwrap();
        assert_eq!(doc.children(a).len(), 2);
    }

    #[test]
    fn test_whitespace_preserved_on_request() {
        let options = ParseOptions {
            preserve_whitespace: true,
            ..ParseOptions::default()
        };
        let doc = parse_with_options("<a> <b/> </a>", &options).unwrap();
        let a = doc.root_element().unwrap();
        assert_eq!(doc.children(a).len(), 3);
    }

    #[test]
    fn test_text_entities_unescaped() {
        let doc = parse("<a>x &amp; y</a>").unwrap();
        let a = doc.root_element().unwrap();
        assert_eq!(doc.string_value(a), "x & y");
    }

    #[test]
    fn test_cdata_becomes_text() {
        let doc = parse("<a><![CDATA[<raw>]]></a>").unwrap();
        let a = doc.root_element().unwrap();
        assert_eq!(doc.string_value(a), "<raw>");
    }

    #[test]
    fn test_comments_and_pis() {
        let doc = parse("<?xml version=\"1.0\"?><!--top--><a><?go fast now?><!--c--></a>").unwrap();
        let top = doc.children(doc.document_node())[0];
        assert_eq!(doc.kind(top), NodeKind::Comment);
        let a = doc.root_element().unwrap();
        let pi = doc.children(a)[0];
        assert_eq!(doc.name(pi), Some("go"));
        assert_eq!(doc.value(pi), Some("fast now"));
        assert_eq!(doc.value(doc.children(a)[1]), Some("c"));
    }

    #[test]
    fn test_comments_dropped_on_request() {
        let options = ParseOptions {
            keep_comments: false,
            ..ParseOptions::default()
        };
        let doc = parse_with_options("<a><!--c--><b/></a>", &options).unwrap();
        let a = doc.root_element().unwrap();
        assert_eq!(doc.children(a).len(), 1);
    }

    #[test]
    fn test_spans_carry_file() {
        let doc = parse_with_options("<a/>", &ParseOptions::for_file(FileId(3))).unwrap();
        let a = doc.root_element().unwrap();
        assert_eq!(doc.span(a).unwrap().file, Some(FileId(3)));
    }

    #[test]
    fn test_empty_document() {
        assert!(matches!(parse("<!-- nothing -->"), Err(Error::EmptyDocument)));
    }

    #[test]
    fn test_multiple_roots() {
        assert!(matches!(parse("<a/><b/>"), Err(Error::MultipleRoots { .. })));
    }

    #[test]
    fn test_unclosed_element() {
        assert!(matches!(
            parse("<a><b></b>"),
            Err(Error::UnexpectedEof { .. })
        ));
    }

    #[test]
    fn test_mismatched_end_tag() {
        assert!(parse("<a><b></a></b>").is_err());
    }

    #[test]
    fn test_text_outside_root() {
        assert!(matches!(
            parse("<a/>stray"),
            Err(Error::InvalidStructure { .. })
        ));
    }
}
