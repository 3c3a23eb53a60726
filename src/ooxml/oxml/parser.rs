//! Parse XML bytes into an [`XmlTree`].
//!
//! Namespace declarations are kept on the element that makes them and in
//! source order, so a later serialization reproduces them exactly. Blank
//! text between tags is dropped by default, matching how part XML is
//! normally loaded for editing.
use crate::ooxml::error::{OxmlError, Result};
use crate::ooxml::oxml::tree::{Attribute, Element, NamespaceDecl, NodeId, NodeKind, QName, XmlTree};
use quick_xml::Reader;
use quick_xml::escape::{resolve_predefined_entity, unescape};
use std::borrow::Cow;
use quick_xml::events::{BytesStart, Event};

/// Options controlling [`parse_xml_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    /// Drop whitespace-only text between tags (default: `true`)
    pub remove_blank_text: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            remove_blank_text: true,
        }
    }
}

impl ParseOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_remove_blank_text(mut self, remove: bool) -> Self {
        self.remove_blank_text = remove;
        self
    }
}

/// Parse UTF-8 XML into a tree using the default [`ParseOptions`].
pub fn parse_xml(xml: impl AsRef<[u8]>) -> Result<XmlTree> {
    parse_xml_with(xml, &ParseOptions::default())
}

/// Parse UTF-8 XML into a tree.
pub fn parse_xml_with(xml: impl AsRef<[u8]>, options: &ParseOptions) -> Result<XmlTree> {
    let mut reader = Reader::from_reader(xml.as_ref());
    reader.config_mut().trim_text(false);

    let mut builder = TreeBuilder::new(*options);

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => builder.start(&e, false)?,
            Ok(Event::Empty(e)) => builder.start(&e, true)?,
            Ok(Event::End(_)) => builder.end()?,
            Ok(Event::Text(e)) => {
                builder.text(&normalize_line_endings(std::str::from_utf8(e.as_ref())?), false)?
            },
            Ok(Event::CData(e)) => {
                builder.text(&normalize_line_endings(std::str::from_utf8(&e)?), true)?
            },
            Ok(Event::GeneralRef(e)) => {
                let resolved = match e
                    .resolve_char_ref()
                    .map_err(|err| OxmlError::Xml(err.to_string()))?
                {
                    Some(ch) => ch.to_string(),
                    None => {
                        let name = std::str::from_utf8(&e)?;
                        resolve_predefined_entity(name)
                            .ok_or_else(|| OxmlError::Xml(format!("Undefined entity: &{};", name)))?
                            .to_string()
                    },
                };
                builder.text(&resolved, true)?;
            },
            Ok(Event::Comment(e)) => {
                builder.comment(&normalize_line_endings(std::str::from_utf8(e.as_ref())?))?
            },
            Ok(Event::PI(e)) => {
                let target = std::str::from_utf8(e.target())?;
                let data = std::str::from_utf8(e.content())?.trim_start();
                builder.processing_instruction(target, data)?;
            },
            Ok(Event::Decl(_)) | Ok(Event::DocType(_)) => {},
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(OxmlError::Xml(format!(
                    "{} at byte {}",
                    e,
                    reader.error_position()
                )));
            },
        }
    }

    let tree = builder.finish()?;
    tracing::debug!(nodes = tree.len(), "parsed part xml");
    Ok(tree)
}

/// Text collected between two markup events.
struct PendingText {
    text: String,
    /// Came from CDATA or a reference, or contains non-whitespace
    significant: bool,
}

struct TreeBuilder {
    tree: XmlTree,
    open: Vec<NodeId>,
    pending: Option<PendingText>,
    options: ParseOptions,
}

impl TreeBuilder {
    fn new(options: ParseOptions) -> Self {
        Self {
            tree: XmlTree::new(),
            open: Vec::new(),
            pending: None,
            options,
        }
    }

    fn start(&mut self, start: &BytesStart<'_>, empty: bool) -> Result<()> {
        self.flush_text(false)?;

        let parent = self.open.last().copied();
        if parent.is_none() && self.tree.root().is_some() {
            return Err(OxmlError::Xml("Multiple root elements".to_string()));
        }

        let raw_name = std::str::from_utf8(start.name().as_ref())?.to_string();
        let mut namespaces = smallvec::SmallVec::new();
        let mut raw_attrs: Vec<(String, String)> = Vec::new();
        for attr in start.attributes() {
            let attr = attr?;
            let key = std::str::from_utf8(attr.key.as_ref())?;
            let raw = normalize_attribute_whitespace(std::str::from_utf8(&attr.value)?);
            let value = unescape(&raw)
                .map_err(|e| OxmlError::Xml(e.to_string()))?
                .into_owned();
            if key == "xmlns" {
                namespaces.push(NamespaceDecl::new(None, &value));
            } else if let Some(prefix) = key.strip_prefix("xmlns:") {
                namespaces.push(NamespaceDecl::new(Some(prefix), &value));
            } else {
                raw_attrs.push((key.to_string(), value));
            }
        }

        let mut element = Element::new(QName::local(&raw_name));
        element.namespaces = namespaces;
        let id = self.tree.push_node(NodeKind::Element(element), parent)?;
        if parent.is_none() {
            self.tree.set_root(id);
        }

        // Declarations on this element are now in scope for its own names
        let name = self.resolve(id, &raw_name, true)?;
        let mut attributes = Vec::with_capacity(raw_attrs.len());
        for (key, value) in raw_attrs {
            attributes.push(Attribute {
                name: self.resolve(id, &key, false)?,
                value,
            });
        }
        if let Some(element) = self.tree.element_mut(id) {
            element.name = name;
            element.attributes = attributes;
        }

        if !empty {
            self.open.push(id);
        }
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        self.flush_text(true)?;
        self.open
            .pop()
            .map(|_| ())
            .ok_or_else(|| OxmlError::Xml("Unexpected end tag".to_string()))
    }

    fn text(&mut self, text: &str, significant: bool) -> Result<()> {
        let significant = significant || !is_blank(text);
        match &mut self.pending {
            Some(pending) => {
                pending.text.push_str(text);
                pending.significant |= significant;
            },
            None => {
                self.pending = Some(PendingText {
                    text: text.to_string(),
                    significant,
                });
            },
        }
        Ok(())
    }

    fn comment(&mut self, text: &str) -> Result<()> {
        self.flush_text(false)?;
        if let Some(&parent) = self.open.last() {
            self.tree
                .push_node(NodeKind::Comment(text.to_string()), Some(parent))?;
        }
        Ok(())
    }

    fn processing_instruction(&mut self, target: &str, data: &str) -> Result<()> {
        self.flush_text(false)?;
        if let Some(&parent) = self.open.last() {
            self.tree.push_node(
                NodeKind::ProcessingInstruction {
                    target: target.to_string(),
                    data: data.to_string(),
                },
                Some(parent),
            )?;
        }
        Ok(())
    }

    /// Attach pending text to the open element. `closing` is set when the
    /// text is the last content before an end tag.
    fn flush_text(&mut self, closing: bool) -> Result<()> {
        let Some(pending) = self.pending.take() else {
            return Ok(());
        };

        let Some(&parent) = self.open.last() else {
            if pending.significant {
                return Err(OxmlError::Xml(
                    "Text content outside of the root element".to_string(),
                ));
            }
            return Ok(());
        };

        // Blank text is kept as the whole content of an element, or inside
        // mixed content that opened with text
        let children = self.tree.children(parent);
        let sole_content = closing && children.is_empty();
        let mixed = children.first().is_some_and(|&first| {
            matches!(self.tree.node(first).map(|n| &n.kind), Some(NodeKind::Text(_)))
        });
        if !pending.significant && self.options.remove_blank_text && !sole_content && !mixed {
            return Ok(());
        }
        self.tree
            .push_node(NodeKind::Text(pending.text), Some(parent))?;
        Ok(())
    }

    /// Resolve `prefix:local` against the declarations in scope at `id`.
    fn resolve(&self, id: NodeId, raw: &str, is_element: bool) -> Result<QName> {
        let (prefix, local) = match raw.split_once(':') {
            Some((prefix, local)) => (Some(prefix), local),
            None => (None, raw),
        };

        // Unprefixed attributes are in no namespace
        if prefix.is_none() && !is_element {
            return Ok(QName::local(local));
        }

        match self.tree.lookup_namespace(id, prefix) {
            Some("") | None if prefix.is_none() => Ok(QName::local(local)),
            Some(uri) => Ok(QName::new(prefix, local, Some(uri))),
            None => Err(OxmlError::Xml(format!(
                "Unbound namespace prefix in '{}'",
                raw
            ))),
        }
    }

    fn finish(mut self) -> Result<XmlTree> {
        self.flush_text(false)?;
        if !self.open.is_empty() {
            return Err(OxmlError::Xml("Unclosed element at end of input".to_string()));
        }
        if self.tree.root().is_none() {
            return Err(OxmlError::Xml("No root element".to_string()));
        }
        Ok(self.tree)
    }
}

/// Fold `\r\n` and lone `\r` into `\n`, as an XML processor does before
/// parsing.
fn normalize_line_endings(text: &str) -> Cow<'_, str> {
    if !text.contains('\r') {
        return Cow::Borrowed(text);
    }
    Cow::Owned(text.replace("\r\n", "\n").replace('\r', "\n"))
}

/// Replace literal tab, CR and LF in a raw attribute value with spaces.
/// Runs before references are resolved, so `&#10;` and friends survive.
fn normalize_attribute_whitespace(raw: &str) -> Cow<'_, str> {
    if !raw.contains(['\t', '\n', '\r']) {
        return Cow::Borrowed(raw);
    }
    Cow::Owned(
        raw.replace("\r\n", " ")
            .replace(['\t', '\n', '\r'], " "),
    )
}

/// Whether `text` consists only of XML whitespace.
#[inline]
pub(crate) fn is_blank(text: &str) -> bool {
    text.bytes().all(|b| matches!(b, b' ' | b'\t' | b'\n' | b'\r'))
}
