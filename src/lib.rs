//! An in-memory, namespace-aware implementation of the
//! [Document Object Model (DOM) Level 3 Core](https://www.w3.org/TR/DOM-Level-3-Core/)
//! tree together with the
//! [DOM Level 2 Events](https://www.w3.org/TR/DOM-Level-2-Events/) dispatch model.
//!
//! The entry point is [`DocumentRef`](crate::dom::document::DocumentRef),
//! which owns the tree and creates every other kind of node.
//!
//! ```
//! use exdom::dom::{document::DocumentRef, node::Node};
//!
//! let doc = DocumentRef::new(None, Some("root"), None).unwrap();
//! let mut root = doc.document_element().unwrap();
//! let text = doc.create_text_node("hello");
//! root.append_child(text.into()).unwrap();
//! assert_eq!(root.text_content().as_deref(), Some("hello"));
//! ```

pub mod chvalid;
pub mod dom;
pub mod qname;
