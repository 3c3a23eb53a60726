//! Element-tree layer for OOXML parts.
//!
//! Parts are loaded into an [`XmlTree`] with [`parse_xml`], edited through
//! [`get_or_add`] and the tree's own methods, and written back with
//! [`serialize_part_xml`].
//!
//! # Example
//!
//! ```rust
//! use pptx_oxml::ooxml::oxml::{get_or_add, parse_xml, serialize_part_xml};
//! use pptx_oxml::ooxml::oxml::ns::nsdecls;
//!
//! let xml = format!("<p:sld {}><p:cSld/></p:sld>", nsdecls(&["p"])?);
//! let mut tree = parse_xml(xml)?;
//! let sld = tree.root().unwrap();
//!
//! let c_sld = get_or_add(&mut tree, sld, "p:cSld")?;
//! get_or_add(&mut tree, c_sld, "p:spTree")?;
//!
//! let part = serialize_part_xml(&tree, sld)?;
//! assert!(part.starts_with(b"<?xml version='1.0' encoding='UTF-8' standalone='yes'?>\n<p:sld"));
//! assert!(part.ends_with(b"<p:cSld><p:spTree/></p:cSld></p:sld>"));
//! # Ok::<(), pptx_oxml::ooxml::OxmlError>(())
//! ```
pub mod core;
pub mod ns;
pub mod parser;
pub mod serialize;
pub mod tree;

pub use self::core::{get_or_add, serialize_for_reading, serialize_part_xml};
pub use ns::{NamespacePrefixedTag, nsdecls, nsuri, qn};
pub use parser::{ParseOptions, parse_xml, parse_xml_with};
pub use serialize::{PART_XML_DECLARATION, SerializeOptions, serialize_with};
pub use tree::{Attribute, Element, NamespaceDecl, NodeData, NodeId, NodeKind, QName, XmlTree};
