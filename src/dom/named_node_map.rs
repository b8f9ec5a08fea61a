use std::{cell::RefCell, collections::HashMap, mem::replace, rc::Rc};

use super::{DOMException, node::Node};

/// Implementation of [NamedNodeMap](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-1780488922)
/// interface on [1.4 Fundamental Interfaces: Core Module](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-BBACDC08)
///
/// Since the data is shared by [`Rc`], [`clone`](NamedNodeMap::clone) means shallow copy,
/// not deep copy.\
/// Thus, a [`NamedNodeMap<AttrRef>`](crate::dom::attr::AttrRef) retrieved from an
/// [`Element`](crate::dom::element::Element) always reflects its current attributes.
///
/// Both the DOM Level 1 and the namespace aware API share one storage.
/// Each node is keyed by `(localName, namespaceURI)`, or by `(nodeName, null)`
/// if the node was created by a DOM Level 1 method and has no `localName`.
///
/// The modifiers are not public because the owner of the map has to keep its
/// back-references consistent. Use the methods of the owner instead.
#[derive(Clone)]
pub struct NamedNodeMap<N: Node + Clone> {
    index: Rc<RefCell<HashMap<(Rc<str>, Option<Rc<str>>), usize>>>,
    data: Rc<RefCell<Vec<N>>>,
}

impl<N: Node + Clone> NamedNodeMap<N> {
    /// Create new empty [`NamedNodeMap`]
    pub(super) fn new() -> Self {
        Self {
            index: Rc::new(RefCell::new(HashMap::new())),
            data: Rc::new(RefCell::new(vec![])),
        }
    }

    fn key_of(node: &N) -> (Rc<str>, Option<Rc<str>>) {
        match node.local_name() {
            Some(local_name) => (local_name, node.namespace_uri()),
            None => (node.node_name(), None),
        }
    }

    /// Implementation of `length` attribute.
    pub fn length(&self) -> usize {
        self.data.borrow().len()
    }

    /// Check if this map is empty.\
    /// In other words, check `self.length() == 0` is satisfied.
    pub fn is_empty(&self) -> bool {
        self.length() == 0
    }

    /// Implementation of `item` method.
    pub fn item(&self, index: usize) -> Option<N> {
        self.data.borrow().get(index).cloned()
    }

    /// Take a snapshot of this map in insertion order.
    pub fn to_vec(&self) -> Vec<N> {
        self.data.borrow().clone()
    }

    /// If `node` exists in this map, return the index of `node`.\
    /// Otherwise return `None`.
    ///
    /// This method checks the sameness of the `node`.
    pub fn index_of(&self, node: &N) -> Option<usize> {
        let node = node.clone().into();
        self.data
            .borrow()
            .iter()
            .position(|data| data.is_same_node(&node))
    }

    fn position_by_name(&self, name: &str) -> Option<usize> {
        if let Some(&index) = self.index.borrow().get(&(Rc::from(name), None)) {
            if self.data.borrow()[index].node_name().as_ref() == name {
                return Some(index);
            }
        }
        self.data
            .borrow()
            .iter()
            .position(|data| data.node_name().as_ref() == name)
    }

    fn position_by_ns(&self, ns_uri: Option<&str>, local_name: &str) -> Option<usize> {
        self.index
            .borrow()
            .get(&(Rc::from(local_name), ns_uri.map(Rc::from)))
            .copied()
    }

    /// Implementation of `getNamedItem` method.
    ///
    /// Nodes are matched by their `nodeName`.
    pub fn get_named_item(&self, name: &str) -> Option<N> {
        self.item(self.position_by_name(name)?)
    }

    /// Implementation of `getNamedItemNS` method.
    pub fn get_named_item_ns(&self, ns_uri: Option<&str>, local_name: &str) -> Option<N> {
        self.item(self.position_by_ns(ns_uri, local_name)?)
    }

    /// Implementation of `setNamedItem` method.
    ///
    /// If a node with the same `nodeName` is already present, it is replaced and returned.
    pub(super) fn set_named_item(&mut self, node: N) -> Option<N> {
        match self.position_by_name(&node.node_name()) {
            Some(index) => Some(self.replace_at(index, node)),
            None => {
                self.push(node);
                None
            }
        }
    }

    /// Implementation of `setNamedItemNS` method.
    ///
    /// If a node with the same `namespaceURI` and `localName` is already present,
    /// it is replaced and returned.
    pub(super) fn set_named_item_ns(&mut self, node: N) -> Option<N> {
        let key = Self::key_of(&node);
        let found = self.index.borrow().get(&key).copied();
        match found {
            Some(index) => Some(self.replace_at(index, node)),
            None => {
                self.push(node);
                None
            }
        }
    }

    /// Implementation of [`removeNamedItem`](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-D58B193) method.
    ///
    /// # Errors
    /// - If there is no node named `name` in this map, return `DOMException::NotFoundErr`.
    pub(super) fn remove_named_item(&mut self, name: &str) -> Result<N, DOMException> {
        let index = self
            .position_by_name(name)
            .ok_or(DOMException::NotFoundErr)?;
        Ok(self.remove_at(index))
    }

    /// Implementation of [`removeNamedItemNS`](https://www.w3.org/TR/2004/REC-DOM-Level-3-Core-20040407/DOM3-Core.html#core-ID-removeNamedItemNS) method.
    ///
    /// # Errors
    /// - If there is no node with the specified `ns_uri` and `local_name` in this map,
    ///   return `DOMException::NotFoundErr`.
    pub(super) fn remove_named_item_ns(
        &mut self,
        ns_uri: Option<&str>,
        local_name: &str,
    ) -> Result<N, DOMException> {
        let index = self
            .position_by_ns(ns_uri, local_name)
            .ok_or(DOMException::NotFoundErr)?;
        Ok(self.remove_at(index))
    }

    /// Remove elements for which `f` returns `false`.\
    /// The relative order of the elements is preserved.
    pub(super) fn retain(&mut self, f: impl Fn(&N) -> bool) {
        let remain = self
            .data
            .borrow()
            .iter()
            .filter(|data| f(data))
            .cloned()
            .collect::<Vec<_>>();
        *self.data.borrow_mut() = remain;
        self.rebuild_index();
    }

    /// Return a new map which has `f(node)` for every node of this map,
    /// keyed by the new nodes.
    pub(super) fn deep_clone(&self, mut f: impl FnMut(&N) -> N) -> Self {
        let mut new = Self::new();
        for data in self.to_vec() {
            new.push(f(&data));
        }
        new
    }

    fn push(&mut self, node: N) {
        let key = Self::key_of(&node);
        let index = self.data.borrow().len();
        self.data.borrow_mut().push(node);
        self.index.borrow_mut().insert(key, index);
    }

    fn replace_at(&mut self, index: usize, node: N) -> N {
        let old = replace(&mut self.data.borrow_mut()[index], node);
        self.rebuild_index();
        old
    }

    fn remove_at(&mut self, index: usize) -> N {
        let res = self.data.borrow_mut().remove(index);
        self.rebuild_index();
        res
    }

    fn rebuild_index(&mut self) {
        let mut map = HashMap::new();
        for (index, data) in self.data.borrow().iter().enumerate() {
            map.insert(Self::key_of(data), index);
        }
        *self.index.borrow_mut() = map;
    }
}

#[cfg(test)]
mod tests {
    use crate::dom::{attr::AttrRef, document::DocumentRef};

    use super::*;

    fn map_with_attrs() -> (DocumentRef, NamedNodeMap<AttrRef>) {
        let mut doc = DocumentRef::new(None, Some("root"), None).unwrap();
        let mut map = NamedNodeMap::new();
        map.set_named_item(doc.create_attribute("plain").unwrap());
        map.set_named_item_ns(
            doc.create_attribute_ns(Some("urn:a"), "a:foo", "1")
                .unwrap(),
        );
        map.set_named_item_ns(
            doc.create_attribute_ns(Some("urn:b"), "b:foo", "2")
                .unwrap(),
        );
        (doc, map)
    }

    #[test]
    fn lookup_by_name_and_namespace() {
        let (_, map) = map_with_attrs();
        assert_eq!(map.length(), 3);
        assert!(map.get_named_item("plain").is_some());
        assert_eq!(
            map.get_named_item_ns(Some("urn:a"), "foo")
                .unwrap()
                .value(),
            "1"
        );
        assert_eq!(
            map.get_named_item_ns(Some("urn:b"), "foo")
                .unwrap()
                .value(),
            "2"
        );
        assert_eq!(map.get_named_item("b:foo").unwrap().value(), "2");
        assert!(map.get_named_item_ns(Some("urn:c"), "foo").is_none());
        assert!(map.get_named_item_ns(None, "foo").is_none());
    }

    #[test]
    fn replace_and_remove() {
        let (mut doc, mut map) = map_with_attrs();
        let new = doc
            .create_attribute_ns(Some("urn:a"), "c:foo", "3")
            .unwrap();
        let old = map.set_named_item_ns(new.clone()).unwrap();
        assert_eq!(old.value(), "1");
        assert_eq!(map.length(), 3);
        assert_eq!(map.index_of(&new), Some(1));

        let removed = map.remove_named_item("plain").unwrap();
        assert_eq!(removed.name().as_ref(), "plain");
        assert_eq!(map.length(), 2);
        assert!(map.get_named_item("plain").is_none());
        assert!(matches!(
            map.remove_named_item("plain"),
            Err(DOMException::NotFoundErr)
        ));
        assert_eq!(map.index_of(&new), Some(0));
        assert_eq!(
            map.get_named_item_ns(Some("urn:b"), "foo")
                .unwrap()
                .value(),
            "2"
        );

        map.remove_named_item_ns(Some("urn:a"), "foo").unwrap();
        assert!(map.get_named_item_ns(Some("urn:a"), "foo").is_none());
        assert_eq!(map.length(), 1);
    }

    #[test]
    fn deep_clone_copies_nodes() {
        let (_, map) = map_with_attrs();

        let copy = map.deep_clone(|attr| attr.clone_node(true).as_attribute().unwrap());
        assert_eq!(copy.length(), map.length());
        for (orig, copied) in map.to_vec().into_iter().zip(copy.to_vec()) {
            assert!(!orig.is_same_node(&copied.clone().into()));
            assert!(orig.is_equal_node(&copied.into()));
        }
        assert_eq!(
            copy.get_named_item_ns(Some("urn:b"), "foo")
                .unwrap()
                .value(),
            "2"
        );
    }
}
