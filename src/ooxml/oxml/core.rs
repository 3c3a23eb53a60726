//! Element helpers used when editing presentation parts.
//!
//! - [`get_or_add`] returns the child element with a given tag, creating it
//!   when missing.
//! - [`serialize_part_xml`] renders an element tree to the exact bytes
//!   stored in a package part.
use crate::ooxml::error::{OxmlError, Result};
use crate::ooxml::oxml::ns::NamespacePrefixedTag;
use crate::ooxml::oxml::serialize::{SerializeOptions, serialize_with};
use crate::ooxml::oxml::tree::{NodeId, QName, XmlTree};

/// Return the first direct child of `parent` whose tag is `nsptag`
/// (e.g. `"p:cSld"`), appending a new empty one if there is none.
///
/// An existing child is returned untouched. A new child is appended as the
/// last child of `parent`.
///
/// Fails with `InvalidTag` for a tag whose prefix is not in the namespace
/// table and with `NotAnElement` when `parent` is not an element; the tree
/// is not modified in either case.
///
/// The lookup and the append are not atomic: callers sharing a tree across
/// threads must hold a write lock across the call.
///
/// # Example
///
/// ```rust
/// use pptx_oxml::ooxml::oxml::{XmlTree, get_or_add};
///
/// let mut tree = XmlTree::new_root("p:sld")?;
/// let sld = tree.root().unwrap();
/// let c_sld = get_or_add(&mut tree, sld, "p:cSld")?;
/// assert_eq!(get_or_add(&mut tree, sld, "p:cSld")?, c_sld);
/// assert_eq!(tree.children(sld).len(), 1);
/// # Ok::<(), pptx_oxml::ooxml::OxmlError>(())
/// ```
pub fn get_or_add(tree: &mut XmlTree, parent: NodeId, nsptag: &str) -> Result<NodeId> {
    let tag = NamespacePrefixedTag::new(nsptag)?;
    tree.require_element(parent)?;

    if let Some(child) = tree.find_child(parent, Some(tag.nsuri()), tag.local_part()) {
        return Ok(child);
    }

    let child = tree.append_element(parent, QName::from(tag))?;
    tracing::trace!(%tag, ?parent, ?child, "appended child element");
    Ok(child)
}

/// Serialize the element tree rooted at `root` for writing into a package
/// part.
///
/// The result starts with
/// `<?xml version='1.0' encoding='UTF-8' standalone='yes'?>` and a newline,
/// followed by compact markup: no whitespace between tags, no parser type
/// annotations, and every namespace declared on the root kept in order
/// whether or not it is still used.
pub fn serialize_part_xml(tree: &XmlTree, root: NodeId) -> Result<Vec<u8>> {
    let xml = serialize_with(tree, root, &SerializeOptions::part())?;
    tracing::debug!(bytes = xml.len(), "serialized part xml");
    Ok(xml)
}

/// Serialize `root` as indented text without an XML declaration.
pub fn serialize_for_reading(tree: &XmlTree, root: NodeId) -> Result<String> {
    let xml = serialize_with(tree, root, &SerializeOptions::reading())?;
    // The writer only ever receives `str` data
    String::from_utf8(xml).map_err(|e| OxmlError::Serialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ooxml::oxml::ns::{nsdecls, qn};
    use crate::ooxml::oxml::parser::parse_xml;

    fn parent_tree() -> XmlTree {
        let xml = format!(
            "<p:foo {}><a:bar>foobar</a:bar></p:foo>",
            nsdecls(&["p", "a"]).unwrap()
        );
        parse_xml(xml).unwrap()
    }

    fn clark(tree: &XmlTree, id: NodeId) -> String {
        tree.element(id).unwrap().name.clark_name().into_owned()
    }

    #[test]
    fn test_returns_matching_child_if_present() {
        let mut tree = parent_tree();
        let parent = tree.root().unwrap();
        let known_child = tree.children(parent)[0];
        assert_eq!(clark(&tree, known_child), qn("a:bar").unwrap());

        let child = get_or_add(&mut tree, parent, "a:bar").unwrap();
        assert_eq!(child, known_child);
        assert_eq!(tree.children(parent).len(), 1);
        assert_eq!(tree.text(child).as_deref(), Some("foobar"));
    }

    #[test]
    fn test_creates_new_child_if_not_present() {
        let mut tree = parent_tree();
        let parent = tree.root().unwrap();

        let child = get_or_add(&mut tree, parent, "p:baz").unwrap();
        assert_eq!(clark(&tree, child), qn("p:baz").unwrap());
        assert_eq!(tree.parent(child), Some(parent));
        assert_eq!(tree.children(parent).last(), Some(&child));
        assert_eq!(tree.children(parent).len(), 2);

        let element = tree.element(child).unwrap();
        assert!(element.attributes.is_empty());
        assert!(element.namespaces.is_empty());
        assert!(tree.children(child).is_empty());
    }

    #[test]
    fn test_matches_direct_children_only() {
        let mut tree = parent_tree();
        let parent = tree.root().unwrap();
        let bar = tree.children(parent)[0];

        // p:foo/a:bar exists, but not as a child of a:bar
        let nested = get_or_add(&mut tree, bar, "a:bar").unwrap();
        assert_ne!(nested, bar);
        assert_eq!(tree.parent(nested), Some(bar));
    }

    #[test]
    fn test_matches_by_namespace_not_prefix() {
        let mut tree = parse_xml(
            r#"<p:sld xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"><pml:cSld xmlns:pml="http://schemas.openxmlformats.org/presentationml/2006/main"/></p:sld>"#,
        )
        .unwrap();
        let sld = tree.root().unwrap();
        let existing = tree.children(sld)[0];
        assert_eq!(get_or_add(&mut tree, sld, "p:cSld").unwrap(), existing);
    }

    #[test]
    fn test_new_child_declares_out_of_scope_prefix() {
        let mut tree = XmlTree::new_root("p:sld").unwrap();
        let sld = tree.root().unwrap();
        let t = get_or_add(&mut tree, sld, "a:t").unwrap();

        let xml = serialize_part_xml(&tree, sld).unwrap();
        assert!(String::from_utf8(xml).unwrap().ends_with(
            r#"<a:t xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main"/></p:sld>"#
        ));
        assert_eq!(tree.parent(t), Some(sld));
    }

    #[test]
    fn test_invalid_tag_does_not_mutate() {
        let mut tree = parent_tree();
        let parent = tree.root().unwrap();
        let before = tree.len();

        for bad in ["zz:baz", "baz", "p:"] {
            assert!(matches!(get_or_add(&mut tree, parent, bad), Err(OxmlError::InvalidTag(_))));
        }
        assert_eq!(tree.len(), before);
        assert_eq!(tree.children(parent).len(), 1);
    }

    #[test]
    fn test_non_element_parent_is_rejected() {
        let mut tree = parent_tree();
        let bar = tree.children(tree.root().unwrap())[0];
        let text = tree.children(bar)[0];
        assert!(matches!(get_or_add(&mut tree, text, "a:t"), Err(OxmlError::NotAnElement(_))));
    }

    fn part_xml_bytes() -> Vec<u8> {
        concat!(
            "<f:foo xmlns:py=\"http://codespeak.net/lxml/objectify/pytype\" xm",
            "lns:f=\"http://foo\" xmlns:b=\"http://bar\">\n",
            "  <f:bar py:pytype=\"str\">fØØbÅr</f:bar>\n",
            "</f:foo>\n",
        )
        .as_bytes()
        .to_vec()
    }

    fn expected_part_xml() -> Vec<u8> {
        concat!(
            "<?xml version='1.0' encoding='UTF-8' standalone='yes'?>\n",
            "<f:foo xmlns:py=\"http://codespeak.net/lxml/objectify/pytype\" xm",
            "lns:f=\"http://foo\" xmlns:b=\"http://bar\"><f:bar>fØØbÅr</f:bar></",
            "f:foo>",
        )
        .as_bytes()
        .to_vec()
    }

    #[test]
    fn test_serialize_part_xml_for_opc_part() {
        let tree = parse_xml(part_xml_bytes()).unwrap();
        let xml = serialize_part_xml(&tree, tree.root().unwrap()).unwrap();

        assert_eq!(xml, expected_part_xml());
        // 188 characters, 3 of them two bytes wide in UTF-8
        assert_eq!(String::from_utf8(xml.clone()).unwrap().chars().count(), 188);
        assert_eq!(xml.len(), 191);
    }

    #[test]
    fn test_serialize_part_xml_compacts_whitespace() {
        let tree = parse_xml("<f:foo xmlns:f=\"http://foo\" xmlns:b=\"http://bar\">\n  <f:bar>text</f:bar>\n</f:foo>\n").unwrap();
        let xml = String::from_utf8(serialize_part_xml(&tree, tree.root().unwrap()).unwrap()).unwrap();

        assert!(xml.contains(r#"xmlns:b="http://bar"><f:bar>text</f:bar></f:foo>"#));
        assert!(!xml.ends_with('\n'));
    }

    #[test]
    fn test_serialize_part_xml_declaration_line() {
        let tree = XmlTree::new_root("p:sld").unwrap();
        let xml = String::from_utf8(serialize_part_xml(&tree, tree.root().unwrap()).unwrap()).unwrap();
        let (first, rest) = xml.split_once('\n').unwrap();

        assert_eq!(first, "<?xml version='1.0' encoding='UTF-8' standalone='yes'?>");
        assert_eq!(
            rest,
            r#"<p:sld xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"/>"#
        );
    }

    #[test]
    fn test_serialize_for_reading() {
        let mut tree = XmlTree::new_root("p:sld").unwrap();
        let sld = tree.root().unwrap();
        let c_sld = get_or_add(&mut tree, sld, "p:cSld").unwrap();
        let sp_tree = get_or_add(&mut tree, c_sld, "p:spTree").unwrap();
        tree.append_text(sp_tree, "x").unwrap();

        assert_eq!(
            serialize_for_reading(&tree, sld).unwrap(),
            concat!(
                "<p:sld xmlns:p=\"http://schemas.openxmlformats.org/presentationml/2006/main\">\n",
                "  <p:cSld>\n",
                "    <p:spTree>x</p:spTree>\n",
                "  </p:cSld>\n",
                "</p:sld>",
            )
        );
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        /// Strategy for tags from a couple of known namespaces
        fn nsptag_strategy() -> impl Strategy<Value = String> {
            (prop_oneof![Just("p"), Just("a"), Just("r")], "[a-zA-Z][a-zA-Z0-9]{0,8}")
                .prop_map(|(prefix, local)| format!("{}:{}", prefix, local))
        }

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(64))]

            #[test]
            fn prop_get_or_add_is_idempotent(tags in prop::collection::vec(nsptag_strategy(), 1..12)) {
                let mut tree = XmlTree::new_root("p:sld").unwrap();
                let root = tree.root().unwrap();

                for tag in &tags {
                    let before = tree.children(root).len();
                    let first = get_or_add(&mut tree, root, tag).unwrap();
                    let after_first = tree.children(root).len();
                    prop_assert!(after_first == before || after_first == before + 1);
                    prop_assert_eq!(tree.parent(first), Some(root));
                    prop_assert_eq!(clark(&tree, first), qn(tag).unwrap());

                    let second = get_or_add(&mut tree, root, tag).unwrap();
                    prop_assert_eq!(first, second);
                    prop_assert_eq!(tree.children(root).len(), after_first);
                }

                let mut distinct = tags.clone();
                distinct.sort();
                distinct.dedup();
                prop_assert_eq!(tree.children(root).len(), distinct.len());
            }

            #[test]
            fn prop_leaf_text_survives_serialization(text in "[a-zA-Z0-9 ØÅé>'\"\n]{1,40}") {
                let mut tree = XmlTree::new_root("a:t").unwrap();
                let root = tree.root().unwrap();
                tree.append_text(root, &text).unwrap();

                let xml = serialize_part_xml(&tree, root).unwrap();
                let reparsed = parse_xml(&xml).unwrap();
                prop_assert_eq!(reparsed.text(reparsed.root().unwrap()), Some(text.clone()));
                prop_assert!(xml.len() >= text.len());
            }
        }
    }
}
