//! pptx-oxml - element-tree helpers for PresentationML parts
//!
//! Presentation parts (`/ppt/slides/slide1.xml` and friends) are edited as
//! element trees and written back as canonical bytes. This crate provides
//! the pieces that sit between a package reader/writer and the slide object
//! model:
//!
//! - **Namespace table**: `p:`, `a:`, `r:` and the other OOXML prefixes
//!   resolved from a static map
//! - **Element tree**: arena-backed nodes with ordered children and parent links
//! - **Get-or-add**: find a namespaced child element or append a new one
//! - **Part serialization**: XML declaration, compact markup, no type
//!   annotations, original namespace declarations
//!
//! # Example
//!
//! ```rust
//! use pptx_oxml::ooxml::oxml::{XmlTree, get_or_add, serialize_part_xml};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut tree = XmlTree::new_root("p:sld")?;
//! let sld = tree.root().unwrap();
//! let c_sld = get_or_add(&mut tree, sld, "p:cSld")?;
//! get_or_add(&mut tree, c_sld, "p:spTree")?;
//!
//! let bytes = serialize_part_xml(&tree, sld)?;
//! println!("{}", String::from_utf8(bytes)?);
//! # Ok(())
//! # }
//! ```

/// Common utilities shared across the crate
pub mod common;

/// OOXML element-tree helpers
pub mod ooxml;

// Re-export commonly used types for convenience
pub use ooxml::oxml::{NodeId, XmlTree, get_or_add, parse_xml, serialize_part_xml};
pub use ooxml::{OxmlError, Result};
