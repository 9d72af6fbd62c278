//! XML payload handling.
//!
//! - `element`: the fragment tree handed to the store
//! - `namespaces`: the immutable URI -> prefix table
//! - `canonical`: deterministic serialization used for hashing and storage
//! - `reader`: parsing fragment files into trees

pub mod canonical;
pub mod element;
pub mod namespaces;
pub mod reader;

pub use canonical::CanonicalSerializer;
pub use element::{Attribute, Element};
pub use namespaces::NamespaceTable;
pub use reader::parse_fragment;
