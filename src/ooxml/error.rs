/// Error types for element-tree operations.
use thiserror::Error;

/// Result type for element-tree operations.
pub type Result<T> = std::result::Result<T, OxmlError>;

/// Error types for element-tree operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OxmlError {
    /// Tag string could not be resolved against the known prefix table
    #[error("Invalid tag: {0}")]
    InvalidTag(String),

    /// Node was expected to be an element
    #[error("Not an element: {0}")]
    NotAnElement(String),

    /// XML parsing error
    #[error("XML error: {0}")]
    Xml(String),

    /// Node ids for this tree are exhausted
    #[error("Tree is full: {0} nodes")]
    TreeFull(usize),

    /// Tree could not be rendered
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<quick_xml::Error> for OxmlError {
    fn from(err: quick_xml::Error) -> Self {
        OxmlError::Xml(err.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for OxmlError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        OxmlError::Xml(err.to_string())
    }
}

impl From<std::str::Utf8Error> for OxmlError {
    fn from(err: std::str::Utf8Error) -> Self {
        OxmlError::Xml(format!("Invalid UTF-8: {}", err))
    }
}
