//! Render an [`XmlTree`] (or a subtree of it) back to XML.
use crate::common::xml::{escape_attr, escape_text};
use crate::ooxml::error::{OxmlError, Result};
use crate::ooxml::oxml::ns::{PYTYPE_NS, XSI_NS};
use crate::ooxml::oxml::parser::is_blank;
use crate::ooxml::oxml::tree::{Element, NamespaceDecl, NodeId, NodeKind, QName, XmlTree};
use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesPI, BytesStart, BytesText, Event};

/// XML declaration written ahead of every package part.
pub const PART_XML_DECLARATION: &[u8] =
    b"<?xml version='1.0' encoding='UTF-8' standalone='yes'?>\n";

/// Options controlling [`serialize_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerializeOptions {
    /// Emit [`PART_XML_DECLARATION`] before the markup
    pub xml_declaration: bool,
    /// Omit `py:*` and `xsi:type` type annotations
    pub strip_annotations: bool,
    /// Indent nested elements by two spaces
    pub pretty_print: bool,
}

impl Default for SerializeOptions {
    fn default() -> Self {
        Self::part()
    }
}

impl SerializeOptions {
    /// Compact output with declaration, as stored in a package.
    pub fn part() -> Self {
        Self {
            xml_declaration: true,
            strip_annotations: true,
            pretty_print: false,
        }
    }

    /// Indented output without declaration, for logs and test diffs.
    pub fn reading() -> Self {
        Self {
            xml_declaration: false,
            strip_annotations: true,
            pretty_print: true,
        }
    }

    pub fn with_xml_declaration(mut self, yes: bool) -> Self {
        self.xml_declaration = yes;
        self
    }

    pub fn with_strip_annotations(mut self, yes: bool) -> Self {
        self.strip_annotations = yes;
        self
    }

    pub fn with_pretty_print(mut self, yes: bool) -> Self {
        self.pretty_print = yes;
        self
    }
}

/// Serialize the subtree rooted at `root` to UTF-8 bytes.
///
/// The output root carries every namespace declaration in scope at `root`:
/// its own in source order, then inherited ones nearest ancestor first.
/// Fails with [`OxmlError::Serialization`] when `root` is not an element.
pub fn serialize_with(tree: &XmlTree, root: NodeId, options: &SerializeOptions) -> Result<Vec<u8>> {
    tree.require_element(root)
        .map_err(|e| OxmlError::Serialization(e.to_string()))?;

    let mut out = Vec::with_capacity(256);
    if options.xml_declaration {
        out.extend_from_slice(PART_XML_DECLARATION);
    }

    let mut writer = if options.pretty_print {
        Writer::new_with_indent(out, b' ', 2)
    } else {
        Writer::new(out)
    };
    PartWriter {
        tree,
        options,
        writer: &mut writer,
    }
    .write_node(root, true)?;

    Ok(writer.into_inner())
}

struct PartWriter<'t, 'w> {
    tree: &'t XmlTree,
    options: &'t SerializeOptions,
    writer: &'w mut Writer<Vec<u8>>,
}

impl PartWriter<'_, '_> {
    fn emit(&mut self, event: Event<'_>) -> Result<()> {
        self.writer
            .write_event(event)
            .map_err(|e| OxmlError::Serialization(e.to_string()))
    }

    fn write_node(&mut self, id: NodeId, is_root: bool) -> Result<()> {
        let tree = self.tree;
        let node = tree
            .node(id)
            .ok_or_else(|| OxmlError::Serialization(format!("dangling node {:?}", id)))?;

        match &node.kind {
            NodeKind::Element(element) => self.write_element(id, element, is_root),
            NodeKind::Text(text) => self.emit(Event::Text(BytesText::from_escaped(escape_text(text)))),
            NodeKind::Comment(text) => self.emit(Event::Comment(BytesText::from_escaped(text.as_str()))),
            NodeKind::ProcessingInstruction { target, data } => {
                let content = if data.is_empty() {
                    target.clone()
                } else {
                    format!("{} {}", target, data)
                };
                self.emit(Event::PI(BytesPI::new(content)))
            },
        }
    }

    fn write_element(&mut self, id: NodeId, element: &Element, is_root: bool) -> Result<()> {
        let tree = self.tree;
        let name = element.name.prefixed();
        let mut start = BytesStart::new(name.as_ref());

        let decls: Vec<&NamespaceDecl> = if is_root {
            tree.in_scope_namespaces(id)
        } else {
            element.namespaces.iter().collect()
        };
        for decl in decls {
            let key = match &decl.prefix {
                Some(prefix) => format!("xmlns:{}", prefix),
                None => "xmlns".to_string(),
            };
            start.push_attribute((key.as_bytes(), escape_attr(&decl.uri).as_bytes()));
        }

        for attr in &element.attributes {
            if self.options.strip_annotations && is_annotation(&attr.name) {
                continue;
            }
            let key = attr.name.prefixed();
            start.push_attribute((key.as_bytes(), escape_attr(&attr.value).as_bytes()));
        }

        let children = self.content_of(id);
        if children.is_empty() {
            return self.emit(Event::Empty(start));
        }

        self.emit(Event::Start(start))?;
        for child in children {
            self.write_node(child, false)?;
        }
        self.emit(Event::End(BytesEnd::new(name.as_ref())))
    }

    /// Children worth rendering. Blank text next to child elements is
    /// indentation and is left out, unless the element also holds real text.
    fn content_of(&self, id: NodeId) -> Vec<NodeId> {
        let children = self.tree.children(id);
        let has_element_child = children.iter().any(|&c| self.tree.element(c).is_some());
        let mixed = children.iter().any(|&c| {
            matches!(self.tree.node(c).map(|n| &n.kind), Some(NodeKind::Text(t)) if !is_blank(t))
        });
        let drop_blank = has_element_child && !mixed;

        children
            .iter()
            .copied()
            .filter(|&c| match self.tree.node(c).map(|n| &n.kind) {
                Some(NodeKind::Text(text)) => {
                    !text.is_empty() && !(drop_blank && is_blank(text))
                },
                Some(_) => true,
                None => false,
            })
            .collect()
    }
}

/// Whether an attribute is parser type metadata rather than content.
fn is_annotation(name: &QName) -> bool {
    match name.namespace.as_deref() {
        Some(PYTYPE_NS) => true,
        Some(XSI_NS) => name.local == "type",
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ooxml::oxml::parser::{ParseOptions, parse_xml, parse_xml_with};

    fn render(xml: &str, options: &SerializeOptions) -> String {
        let tree = parse_xml(xml).unwrap();
        let bytes = serialize_with(&tree, tree.root().unwrap(), options).unwrap();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn test_empty_element_self_closes() {
        let out = render("<r><a></a></r>", &SerializeOptions::part().with_xml_declaration(false));
        assert_eq!(out, "<r><a/></r>");
    }

    #[test]
    fn test_escaping() {
        let out = render(
            r#"<r v="a&quot;b&#10;c">x &lt; y &amp; z &gt; w</r>"#,
            &SerializeOptions::part().with_xml_declaration(false),
        );
        assert_eq!(out, r#"<r v="a&quot;b&#10;c">x &lt; y &amp; z &gt; w</r>"#);
    }

    #[test]
    fn test_keep_annotations_when_asked() {
        let xml = r#"<f:a xmlns:f="http://foo" xmlns:py="http://codespeak.net/lxml/objectify/pytype" py:pytype="int">1</f:a>"#;
        let out = render(xml, &SerializeOptions::part().with_xml_declaration(false).with_strip_annotations(false));
        assert_eq!(out, xml);
    }

    #[test]
    fn test_xsi_type_stripped_but_xsi_nil_kept() {
        let xml = r#"<f:a xmlns:f="http://foo" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xsi:type="xsd:string" xsi:nil="true"/>"#;
        let out = render(xml, &SerializeOptions::part().with_xml_declaration(false));
        assert_eq!(
            out,
            r#"<f:a xmlns:f="http://foo" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xsi:nil="true"/>"#
        );
    }

    #[test]
    fn test_subtree_inherits_ancestor_namespaces() {
        let xml = r#"<p:sld xmlns:a="http://a" xmlns:p="http://p"><p:cSld xmlns:x="http://x"><a:t>hi</a:t></p:cSld></p:sld>"#;
        let tree = parse_xml(xml).unwrap();
        let c_sld = tree.children(tree.root().unwrap())[0];
        let out = serialize_with(&tree, c_sld, &SerializeOptions::part().with_xml_declaration(false)).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            r#"<p:cSld xmlns:x="http://x" xmlns:a="http://a" xmlns:p="http://p"><a:t>hi</a:t></p:cSld>"#
        );
    }

    #[test]
    fn test_indentation_dropped_even_if_parsed() {
        let xml = "<r>\n  <a>t</a>\n  <!--c-->\n</r>";
        let tree = parse_xml_with(xml, &ParseOptions::new().with_remove_blank_text(false)).unwrap();
        let out = serialize_with(&tree, tree.root().unwrap(), &SerializeOptions::part()).unwrap();
        assert_eq!(
            out,
            b"<?xml version='1.0' encoding='UTF-8' standalone='yes'?>\n<r><a>t</a><!--c--></r>".to_vec()
        );
    }

    #[test]
    fn test_mixed_content_keeps_spaces() {
        let out = render(
            "<f:a xmlns:f=\"http://foo\">x<f:b/> <f:c/>y</f:a>",
            &SerializeOptions::part().with_xml_declaration(false),
        );
        assert_eq!(out, "<f:a xmlns:f=\"http://foo\">x<f:b/> <f:c/>y</f:a>");
    }

    #[test]
    fn test_crlf_text_round_trips_without_char_refs() {
        let out = render(
            "<f:a xmlns:f=\"http://foo\" v=\"a\nb\tc\">line1\r\nline2</f:a>",
            &SerializeOptions::part().with_xml_declaration(false),
        );
        assert_eq!(out, "<f:a xmlns:f=\"http://foo\" v=\"a b c\">line1\nline2</f:a>");
    }

    #[test]
    fn test_pretty_print() {
        let out = render("<r><a><b>t</b></a><c/></r>", &SerializeOptions::reading());
        assert_eq!(out, "<r>\n  <a>\n    <b>t</b>\n  </a>\n  <c/>\n</r>");
    }

    #[test]
    fn test_processing_instruction() {
        let out = render("<r><?target some data?></r>", &SerializeOptions::part().with_xml_declaration(false));
        assert_eq!(out, "<r><?target some data?></r>");
    }

    #[test]
    fn test_non_element_root_is_serialization_error() {
        let tree = parse_xml("<r>text</r>").unwrap();
        let text = tree.children(tree.root().unwrap())[0];
        let result = serialize_with(&tree, text, &SerializeOptions::part());
        assert!(matches!(result, Err(OxmlError::Serialization(_))));
    }
}
