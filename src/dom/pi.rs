use std::{
    cell::RefCell,
    mem::replace,
    rc::{Rc, Weak},
};

use super::{
    DOMException, NodeType, check_no_modification_allowed_err,
    document::{DocumentRef, DocumentWeakRef},
    events::EventListenerMap,
    node::{Node, NodeConnection, NodeRef, NodeWeakRef, SourceLocation},
};

/// Implementation of [ProcessingInstruction](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-1004215813)
/// interface on [1.5 Extended Interfaces: XML Module](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-E067D597)
pub struct ProcessingInstruction {
    /// [1.1.1 The DOM Structure Model](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-1590626202)
    /// - `Document`
    /// - `DocumentFragment`
    /// - `EntityReference`
    /// - `Element`
    /// - `Entity`
    parent_node: Option<NodeWeakRef>,
    owner_document: DocumentWeakRef,
    /// Implementation of `target` attribute for `ProcessingInstruction`.
    /// as same as `nodeName` for `Node`.
    target: Rc<str>,
    /// Implementation of `data` attribute for `ProcessingInstruction`.
    data: Rc<str>,

    listeners: EventListenerMap,
    location: Option<SourceLocation>,
}

/// Wrapper of `Rc<RefCell<ProcessingInstruction>>`.
#[derive(Clone)]
pub struct ProcessingInstructionRef(Rc<RefCell<ProcessingInstruction>>);

impl ProcessingInstructionRef {
    /// Create new [`ProcessingInstructionRef`] whose ownerDocument is `doc`.
    ///
    /// This method does not validate `target`.
    pub(super) fn new(doc: DocumentWeakRef, target: Rc<str>, data: Rc<str>) -> Self {
        Self(Rc::new(RefCell::new(ProcessingInstruction {
            parent_node: None,
            owner_document: doc,
            target,
            data,
            listeners: EventListenerMap::default(),
            location: None,
        })))
    }

    /// Implementation of `target` attribute.
    ///
    /// # Specification
    /// ```text
    /// The target of this processing instruction. XML defines this as being the first token
    /// following the markup that begins the processing instruction.
    /// ```
    pub fn target(&self) -> Rc<str> {
        self.0.borrow().target.clone()
    }

    /// Implementation of `data` attribute.
    ///
    /// # Specification
    /// ```text
    /// The content of this processing instruction. This is from the first non white space
    /// character after the target to the character immediately preceding the ?>.
    /// ```
    pub fn data(&self) -> Rc<str> {
        self.0.borrow().data.clone()
    }

    /// Implementation of `data` attribute.
    ///
    /// # Specification
    /// ```text
    /// Exceptions on setting
    ///     DOMException
    ///     NO_MODIFICATION_ALLOWED_ERR: Raised when the node is readonly.
    /// ```
    pub fn set_data(&mut self, data: &str) -> Result<(), DOMException> {
        check_no_modification_allowed_err(self)?;
        self.0.borrow_mut().data = data.into();
        Ok(())
    }

    /// Generate [`ProcessingInstructionWeakRef`] from `self`.
    pub fn downgrade(&self) -> ProcessingInstructionWeakRef {
        ProcessingInstructionWeakRef(Rc::downgrade(&self.0))
    }
}

impl Node for ProcessingInstructionRef {
    fn node_name(&self) -> Rc<str> {
        self.target()
    }

    fn node_value(&self) -> Option<Rc<str>> {
        Some(self.data())
    }

    fn set_node_value(&mut self, value: &str) -> Result<(), DOMException> {
        self.set_data(value)
    }

    fn node_type(&self) -> NodeType {
        NodeType::ProcessingInstruction
    }

    fn parent_node(&self) -> Option<NodeRef> {
        self.0
            .borrow()
            .parent_node
            .as_ref()
            .and_then(|par| par.upgrade())
    }

    fn owner_document(&self) -> Option<DocumentRef> {
        self.0.borrow().owner_document.upgrade()
    }

    fn clone_node(&self, _deep: bool) -> NodeRef {
        let pi = self.0.borrow();
        let mut new = Self::new(pi.owner_document.clone(), pi.target.clone(), pi.data.clone());
        new.set_location(pi.location);
        new.into()
    }

    fn text_content(&self) -> Option<String> {
        Some(self.data().to_string())
    }

    fn set_text_content(&mut self, text: &str) -> Result<(), DOMException> {
        self.set_data(text)
    }

    fn is_same_node(&self, other: &NodeRef) -> bool {
        let NodeRef::ProcessingInstruction(other) = other else {
            return false;
        };
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl NodeConnection for ProcessingInstructionRef {
    fn set_parent_node(&mut self, new_parent: Option<NodeRef>) -> Option<NodeRef> {
        replace(
            &mut self.0.borrow_mut().parent_node,
            new_parent.map(|par| par.downgrade()),
        )
        .and_then(|old| old.upgrade())
    }

    fn set_owner_document(&mut self, new_doc: DocumentRef) -> Option<DocumentRef> {
        replace(&mut self.0.borrow_mut().owner_document, new_doc.downgrade()).upgrade()
    }

    fn adopted_to(&mut self, new_doc: DocumentRef) {
        self.set_owner_document(new_doc);
    }

    fn event_listeners(&self) -> EventListenerMap {
        self.0.borrow().listeners.clone()
    }

    fn location(&self) -> Option<SourceLocation> {
        self.0.borrow().location
    }

    fn set_location(&mut self, location: Option<SourceLocation>) {
        self.0.borrow_mut().location = location;
    }
}

impl From<ProcessingInstructionRef> for NodeRef {
    fn from(value: ProcessingInstructionRef) -> Self {
        NodeRef::ProcessingInstruction(value)
    }
}

/// Wrapper of `Weak<RefCell<ProcessingInstruction>>`.
#[derive(Clone)]
pub struct ProcessingInstructionWeakRef(Weak<RefCell<ProcessingInstruction>>);

impl ProcessingInstructionWeakRef {
    /// Generate [`ProcessingInstructionRef`] from `self`.
    /// Success conditions are the same as for [`std::rc::Weak::upgrade`].
    pub fn upgrade(&self) -> Option<ProcessingInstructionRef> {
        self.0.upgrade().map(ProcessingInstructionRef)
    }
}
