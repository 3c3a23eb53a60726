//! Arena-backed element tree.
//!
//! Every node of a part lives in a `Vec<NodeData>` owned by [`XmlTree`] and
//! is addressed by a copyable [`NodeId`]. A parent owns the ordered list of
//! its children; the child's `parent` link is a plain index used only for
//! upward traversal, so there are no reference cycles and dropping the tree
//! frees everything at once.
//!
//! Two `NodeId`s are equal exactly when they name the same node, which is
//! the identity the get-or-add helpers promise.
//!
//! # Example
//!
//! ```rust
//! use pptx_oxml::ooxml::oxml::{QName, XmlTree};
//!
//! let mut tree = XmlTree::new_root("p:sld")?;
//! let root = tree.root().unwrap();
//! let c_sld = tree.append_element(root, QName::from_nsptag("p:cSld")?)?;
//! assert_eq!(tree.parent(c_sld), Some(root));
//! assert_eq!(tree.children(root), &[c_sld]);
//! # Ok::<(), pptx_oxml::ooxml::OxmlError>(())
//! ```
use crate::ooxml::error::{OxmlError, Result};
use crate::ooxml::oxml::ns::{NamespacePrefixedTag, XML_NS};
use smallvec::SmallVec;
use std::borrow::Cow;

/// Typed index of a node inside an [`XmlTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct NodeId(u32);

impl NodeId {
    #[inline]
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// A possibly namespace-qualified XML name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QName {
    /// Prefix as written in the source (`p` in `p:sld`)
    pub prefix: Option<String>,
    /// Local part of the name
    pub local: String,
    /// Namespace URI the prefix resolved to
    pub namespace: Option<String>,
}

impl QName {
    pub fn new(prefix: Option<&str>, local: &str, namespace: Option<&str>) -> Self {
        Self {
            prefix: prefix.map(str::to_string),
            local: local.to_string(),
            namespace: namespace.map(str::to_string),
        }
    }

    /// Name without prefix or namespace.
    pub fn local(local: &str) -> Self {
        Self::new(None, local, None)
    }

    /// Resolve a `prefix:local` tag against the known prefix table.
    pub fn from_nsptag(nsptag: &str) -> Result<Self> {
        Ok(Self::from(NamespacePrefixedTag::new(nsptag)?))
    }

    /// Whether this name has the given namespace URI and local part.
    #[inline]
    pub fn matches(&self, namespace: Option<&str>, local: &str) -> bool {
        self.local == local && self.namespace.as_deref() == namespace
    }

    /// Name as it appears in markup, `prefix:local` or `local`.
    pub fn prefixed(&self) -> Cow<'_, str> {
        match &self.prefix {
            Some(prefix) => Cow::Owned(format!("{}:{}", prefix, self.local)),
            None => Cow::Borrowed(&self.local),
        }
    }

    /// Name in Clark notation, `{uri}local` or `local`.
    pub fn clark_name(&self) -> Cow<'_, str> {
        match &self.namespace {
            Some(ns) => Cow::Owned(format!("{{{}}}{}", ns, self.local)),
            None => Cow::Borrowed(&self.local),
        }
    }
}

impl From<NamespacePrefixedTag<'_>> for QName {
    fn from(tag: NamespacePrefixedTag<'_>) -> Self {
        Self::new(Some(tag.prefix()), tag.local_part(), Some(tag.nsuri()))
    }
}

/// An attribute on an element. The value is stored unescaped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: QName,
    pub value: String,
}

/// A namespace declaration (`xmlns` or `xmlns:prefix`) on an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceDecl {
    /// `None` for the default namespace
    pub prefix: Option<String>,
    pub uri: String,
}

impl NamespaceDecl {
    pub fn new(prefix: Option<&str>, uri: &str) -> Self {
        Self {
            prefix: prefix.map(str::to_string),
            uri: uri.to_string(),
        }
    }
}

/// Payload of an element node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: QName,
    /// Attributes in document order
    pub attributes: Vec<Attribute>,
    /// Namespace declarations made on this element, in document order
    pub namespaces: SmallVec<[NamespaceDecl; 2]>,
}

impl Element {
    pub fn new(name: QName) -> Self {
        Self {
            name,
            attributes: Vec::new(),
            namespaces: SmallVec::new(),
        }
    }

    /// Value of the attribute with the given namespace and local name.
    pub fn attribute(&self, namespace: Option<&str>, local: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|attr| attr.name.matches(namespace, local))
            .map(|attr| attr.value.as_str())
    }
}

/// What a node holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Element(Element),
    Text(String),
    Comment(String),
    ProcessingInstruction { target: String, data: String },
}

impl NodeKind {
    fn describe(&self) -> &'static str {
        match self {
            NodeKind::Element(_) => "element",
            NodeKind::Text(_) => "text",
            NodeKind::Comment(_) => "comment",
            NodeKind::ProcessingInstruction { .. } => "processing instruction",
        }
    }
}

/// Storage for a single node.
#[derive(Debug, Clone)]
pub struct NodeData {
    pub kind: NodeKind,
    /// Non-owning link to the parent; `None` for the root or a detached node
    pub parent: Option<NodeId>,
    /// Children in document order, owned by this node
    pub children: Vec<NodeId>,
}

impl NodeData {
    fn new(kind: NodeKind, parent: Option<NodeId>) -> Self {
        Self {
            kind,
            parent,
            children: Vec::new(),
        }
    }
}

/// An element tree for one package part.
#[derive(Debug, Clone, Default)]
pub struct XmlTree {
    nodes: Vec<NodeData>,
    root: Option<NodeId>,
}

impl XmlTree {
    /// Create an empty tree with no root element.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a tree whose root element is `nsptag`, declaring the tag's
    /// namespace on the root.
    pub fn new_root(nsptag: &str) -> Result<Self> {
        let tag = NamespacePrefixedTag::new(nsptag)?;
        let mut element = Element::new(QName::from(tag));
        element
            .namespaces
            .push(NamespaceDecl::new(Some(tag.prefix()), tag.nsuri()));

        let mut tree = Self::new();
        let root = tree.push_node(NodeKind::Element(element), None)?;
        tree.root = Some(root);
        Ok(tree)
    }

    /// The root element, if any.
    #[inline]
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub(crate) fn set_root(&mut self, root: NodeId) {
        self.root = Some(root);
    }

    /// Number of nodes ever allocated in this tree, detached ones included.
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[inline]
    pub fn node(&self, id: NodeId) -> Option<&NodeData> {
        self.nodes.get(id.index())
    }

    /// The element payload of `id`, or `None` for non-element nodes.
    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match self.node(id).map(|n| &n.kind) {
            Some(NodeKind::Element(e)) => Some(e),
            _ => None,
        }
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        match self.nodes.get_mut(id.index()).map(|n| &mut n.kind) {
            Some(NodeKind::Element(e)) => Some(e),
            _ => None,
        }
    }

    /// The element payload of `id`, or [`OxmlError::NotAnElement`].
    pub(crate) fn require_element(&self, id: NodeId) -> Result<&Element> {
        match self.node(id) {
            Some(NodeData {
                kind: NodeKind::Element(e),
                ..
            }) => Ok(e),
            Some(other) => Err(OxmlError::NotAnElement(format!(
                "node {} is a {} node",
                id.0,
                other.kind.describe()
            ))),
            None => Err(OxmlError::NotAnElement(format!(
                "node {} does not belong to this tree",
                id.0
            ))),
        }
    }

    #[inline]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|n| n.parent)
    }

    /// Direct children of `id` in document order.
    #[inline]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// Direct children of `id` that are elements.
    pub fn child_elements(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id)
            .iter()
            .copied()
            .filter(move |&child| self.element(child).is_some())
    }

    /// First direct child element of `parent` with the given name.
    pub fn find_child(&self, parent: NodeId, namespace: Option<&str>, local: &str) -> Option<NodeId> {
        self.child_elements(parent).find(|&child| {
            self.element(child)
                .is_some_and(|e| e.name.matches(namespace, local))
        })
    }

    /// Allocate a node, appending it to `parent`'s children when given.
    /// Fails with `TreeFull` once node ids no longer fit in a `u32`.
    pub(crate) fn push_node(&mut self, kind: NodeKind, parent: Option<NodeId>) -> Result<NodeId> {
        let index = u32::try_from(self.nodes.len())
            .map_err(|_| OxmlError::TreeFull(self.nodes.len()))?;
        let id = NodeId(index);
        self.nodes.push(NodeData::new(kind, parent));
        if let Some(parent) = parent {
            self.nodes[parent.index()].children.push(id);
        }
        Ok(id)
    }

    /// Append a new empty element as the last child of `parent`.
    ///
    /// When the name's prefix is not bound to its namespace in `parent`'s
    /// scope, the new element declares it itself.
    pub fn append_element(&mut self, parent: NodeId, name: QName) -> Result<NodeId> {
        self.require_element(parent)?;

        let mut element = Element::new(name);
        if let Some(ns) = element.name.namespace.as_deref() {
            let prefix = element.name.prefix.as_deref();
            if self.lookup_namespace(parent, prefix) != Some(ns) {
                let decl = NamespaceDecl::new(prefix, ns);
                element.namespaces.push(decl);
            }
        }
        self.push_node(NodeKind::Element(element), Some(parent))
    }

    /// Append a text node as the last child of `parent`.
    pub fn append_text(&mut self, parent: NodeId, text: &str) -> Result<NodeId> {
        self.require_element(parent)?;
        self.push_node(NodeKind::Text(text.to_string()), Some(parent))
    }

    /// Concatenated direct text children of `id`, or `None` if it has none.
    pub fn text(&self, id: NodeId) -> Option<String> {
        let mut out: Option<String> = None;
        for &child in self.children(id) {
            if let Some(NodeKind::Text(t)) = self.node(child).map(|n| &n.kind) {
                out.get_or_insert_with(String::new).push_str(t);
            }
        }
        out
    }

    /// Replace the direct text children of `id` with a single text node
    /// placed before any other child.
    ///
    /// The first existing text node is rewritten in place and any others are
    /// detached, so repeated calls do not allocate new nodes.
    pub fn set_text(&mut self, id: NodeId, text: &str) -> Result<()> {
        self.require_element(id)?;

        let (text_nodes, mut kept): (Vec<NodeId>, Vec<NodeId>) = self
            .children(id)
            .iter()
            .copied()
            .partition(|&child| {
                matches!(self.node(child).map(|n| &n.kind), Some(NodeKind::Text(_)))
            });

        let text_id = match text_nodes.split_first() {
            Some((&reused, detached)) => {
                for &node in detached {
                    self.nodes[node.index()].parent = None;
                }
                self.nodes[reused.index()].kind = NodeKind::Text(text.to_string());
                reused
            },
            None => self.push_node(NodeKind::Text(text.to_string()), None)?,
        };
        self.nodes[text_id.index()].parent = Some(id);
        kept.insert(0, text_id);
        self.nodes[id.index()].children = kept;
        Ok(())
    }

    /// Value of an attribute on element `id`.
    pub fn attribute(&self, id: NodeId, namespace: Option<&str>, local: &str) -> Option<&str> {
        self.element(id).and_then(|e| e.attribute(namespace, local))
    }

    /// Set an attribute on element `id`, replacing an existing value in place.
    pub fn set_attribute(&mut self, id: NodeId, name: QName, value: &str) -> Result<()> {
        self.require_element(id)?;
        let element = self
            .element_mut(id)
            .ok_or_else(|| OxmlError::NotAnElement(format!("node {}", id.0)))?;

        match element
            .attributes
            .iter_mut()
            .find(|attr| attr.name.matches(name.namespace.as_deref(), &name.local))
        {
            Some(existing) => existing.value = value.to_string(),
            None => element.attributes.push(Attribute {
                name,
                value: value.to_string(),
            }),
        }
        Ok(())
    }

    /// Namespace URI bound to `prefix` (`None` = default namespace) at `id`.
    pub fn lookup_namespace(&self, id: NodeId, prefix: Option<&str>) -> Option<&str> {
        if prefix == Some("xml") {
            return Some(XML_NS);
        }
        let mut current = Some(id);
        while let Some(node_id) = current {
            if let Some(element) = self.element(node_id) {
                if let Some(decl) = element
                    .namespaces
                    .iter()
                    .find(|decl| decl.prefix.as_deref() == prefix)
                {
                    return Some(decl.uri.as_str());
                }
            }
            current = self.parent(node_id);
        }
        None
    }

    /// Every declaration visible at `id`: its own in document order, then
    /// those of each ancestor, nearest first, skipping shadowed prefixes.
    pub fn in_scope_namespaces(&self, id: NodeId) -> Vec<&NamespaceDecl> {
        let mut seen: Vec<&NamespaceDecl> = Vec::new();
        let mut current = Some(id);
        while let Some(node_id) = current {
            if let Some(element) = self.element(node_id) {
                for decl in &element.namespaces {
                    if !seen.iter().any(|d| d.prefix == decl.prefix) {
                        seen.push(decl);
                    }
                }
            }
            current = self.parent(node_id);
        }
        seen
    }
}
