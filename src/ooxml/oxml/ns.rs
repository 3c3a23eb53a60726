//! Namespace prefix table and namespace-prefixed tag helpers.
//!
//! Prefixes used in PresentationML, DrawingML and OPC parts map to fixed
//! namespace URIs. Resolution is a compile-time perfect-hash lookup, not
//! per-document state.
//!
//! # Examples
//!
//! ```rust
//! use pptx_oxml::ooxml::oxml::ns::{nsdecls, qn};
//!
//! assert_eq!(
//!     qn("p:sld").unwrap(),
//!     "{http://schemas.openxmlformats.org/presentationml/2006/main}sld"
//! );
//! assert_eq!(
//!     nsdecls(&["a"]).unwrap(),
//!     r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main""#
//! );
//! ```
use crate::ooxml::error::{OxmlError, Result};
use phf::phf_map;
use std::fmt;

/// Namespace of the type annotations lxml.objectify attaches to parsed values.
pub const PYTYPE_NS: &str = "http://codespeak.net/lxml/objectify/pytype";

/// XML Schema instance namespace.
pub const XSI_NS: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// Namespace bound to the reserved `xml` prefix.
pub const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

/// Compile-time map of known namespace prefixes to their URIs.
static NSMAP: phf::Map<&'static str, &'static str> = phf_map! {
    "a" => "http://schemas.openxmlformats.org/drawingml/2006/main",
    "c" => "http://schemas.openxmlformats.org/drawingml/2006/chart",
    "cp" => "http://schemas.openxmlformats.org/package/2006/metadata/core-properties",
    "ct" => "http://schemas.openxmlformats.org/package/2006/content-types",
    "dc" => "http://purl.org/dc/elements/1.1/",
    "dcmitype" => "http://purl.org/dc/dcmitype/",
    "dcterms" => "http://purl.org/dc/terms/",
    "ep" => "http://schemas.openxmlformats.org/officeDocument/2006/extended-properties",
    "i" => "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image",
    "m" => "http://schemas.openxmlformats.org/officeDocument/2006/math",
    "mo" => "http://schemas.microsoft.com/office/mac/office/2008/main",
    "mv" => "urn:schemas-microsoft-com:mac:vml",
    "o" => "urn:schemas-microsoft-com:office:office",
    "p" => "http://schemas.openxmlformats.org/presentationml/2006/main",
    "pd" => "http://schemas.openxmlformats.org/drawingml/2006/presentationDrawing",
    "pic" => "http://schemas.openxmlformats.org/drawingml/2006/picture",
    "pr" => "http://schemas.openxmlformats.org/package/2006/relationships",
    "py" => "http://codespeak.net/lxml/objectify/pytype",
    "r" => "http://schemas.openxmlformats.org/officeDocument/2006/relationships",
    "sl" => "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout",
    "v" => "urn:schemas-microsoft-com:vml",
    "ve" => "http://schemas.openxmlformats.org/markup-compatibility/2006",
    "w" => "http://schemas.openxmlformats.org/wordprocessingml/2006/main",
    "w10" => "urn:schemas-microsoft-com:office:word",
    "wne" => "http://schemas.microsoft.com/office/word/2006/wordml",
    "wp" => "http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing",
    "xsi" => "http://www.w3.org/2001/XMLSchema-instance",
};

/// Look up the namespace URI for a known prefix.
pub fn nsuri(prefix: &str) -> Result<&'static str> {
    NSMAP
        .get(prefix)
        .copied()
        .ok_or_else(|| OxmlError::InvalidTag(format!("unknown namespace prefix '{}'", prefix)))
}

/// Look up the prefix the table assigns to a namespace URI.
pub fn nspfx(uri: &str) -> Option<&'static str> {
    // URIs in the table are unique
    NSMAP
        .entries()
        .find(|(_, u)| *u == &uri)
        .map(|(p, _)| *p)
}

/// Convert a namespace-prefixed tag such as `p:cSld` to Clark notation
/// (`{uri}cSld`).
pub fn qn(nsptag: &str) -> Result<String> {
    Ok(NamespacePrefixedTag::new(nsptag)?.clark_name())
}

/// Build the namespace declaration string for the given prefixes, suitable
/// for splicing into the start tag of a hand-written XML fragment.
pub fn nsdecls(prefixes: &[&str]) -> Result<String> {
    let mut out = String::with_capacity(prefixes.len() * 64);
    for (i, prefix) in prefixes.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        out.push_str("xmlns:");
        out.push_str(prefix);
        out.push_str("=\"");
        out.push_str(nsuri(prefix)?);
        out.push('"');
    }
    Ok(out)
}

/// A tag written as `prefix:local`, resolved against the prefix table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NamespacePrefixedTag<'a> {
    prefix: &'a str,
    local: &'a str,
    nsuri: &'static str,
}

impl<'a> NamespacePrefixedTag<'a> {
    /// Parse and resolve a `prefix:local` tag.
    ///
    /// Fails with [`OxmlError::InvalidTag`] when the tag has no prefix, an
    /// empty part, or a prefix missing from the table.
    pub fn new(nsptag: &'a str) -> Result<Self> {
        let (prefix, local) = nsptag
            .split_once(':')
            .ok_or_else(|| OxmlError::InvalidTag(format!("'{}' has no namespace prefix", nsptag)))?;
        if prefix.is_empty() || local.is_empty() || local.contains(':') {
            return Err(OxmlError::InvalidTag(format!("malformed tag '{}'", nsptag)));
        }
        Ok(Self {
            prefix,
            local,
            nsuri: nsuri(prefix)?,
        })
    }

    /// Build a tag from Clark notation (`{uri}local`) using the table's
    /// prefix for `uri`.
    pub fn from_clark_name(clark_name: &'a str) -> Result<Self> {
        let rest = clark_name
            .strip_prefix('{')
            .ok_or_else(|| OxmlError::InvalidTag(format!("'{}' is not a Clark name", clark_name)))?;
        let (uri, local) = rest
            .split_once('}')
            .ok_or_else(|| OxmlError::InvalidTag(format!("'{}' is not a Clark name", clark_name)))?;
        let prefix = nspfx(uri)
            .ok_or_else(|| OxmlError::InvalidTag(format!("unknown namespace '{}'", uri)))?;
        if local.is_empty() {
            return Err(OxmlError::InvalidTag(format!("malformed tag '{}'", clark_name)));
        }
        Ok(Self {
            prefix,
            local,
            nsuri: nsuri(prefix)?,
        })
    }

    #[inline]
    pub fn prefix(&self) -> &'a str {
        self.prefix
    }

    #[inline]
    pub fn local_part(&self) -> &'a str {
        self.local
    }

    #[inline]
    pub fn nsuri(&self) -> &'static str {
        self.nsuri
    }

    /// The tag in Clark notation, `{uri}local`.
    pub fn clark_name(&self) -> String {
        format!("{{{}}}{}", self.nsuri, self.local)
    }
}

impl fmt::Display for NamespacePrefixedTag<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.prefix, self.local)
    }
}
