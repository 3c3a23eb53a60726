//! XML text helpers shared by the writers.

pub mod escape;

pub use escape::{escape_attr, escape_text};
