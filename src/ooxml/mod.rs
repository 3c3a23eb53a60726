//! Office Open XML (OOXML) support.
//!
//! This module holds the element-tree helpers that presentation parts are
//! edited with before being written back into a package:
//!
//! - `oxml`: element tree, namespace table, parser and part serializer
//! - `error`: error and result types shared by the helpers
pub mod error;
pub mod oxml;

// Re-export error types
pub use error::{OxmlError, Result};
