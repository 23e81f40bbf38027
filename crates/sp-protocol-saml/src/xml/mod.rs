//! XML document model and canonicalization.

pub mod c14n;
pub mod dom;

pub use c14n::ExclusiveC14n;
pub use dom::{parse, parse_fragment, Attribute, Element, Node, NsDecl};
