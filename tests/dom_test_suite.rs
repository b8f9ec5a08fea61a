use std::{cell::RefCell, rc::Rc};

use exdom::dom::{
    DOMException, XML_NS_NAMESPACE,
    character_data::CharacterData,
    document::DocumentRef,
    element::ElementRef,
    events::{
        DOM_NODE_INSERTED, DOM_NODE_REMOVED, Event, EventException, EventListener, EventPhase,
        EventTarget,
    },
    node::{Node, NodeRef},
};
use rand::{Rng, SeedableRng, rngs::StdRng};

fn new_document() -> (DocumentRef, ElementRef) {
    let doc = DocumentRef::new(None, Some("root"), None).unwrap();
    let root = doc.document_element().unwrap();
    (doc, root)
}

fn child_names(node: &impl Node) -> Vec<String> {
    node.child_nodes()
        .to_vec()
        .iter()
        .map(|child| child.node_name().to_string())
        .collect()
}

type Log = Rc<RefCell<Vec<String>>>;

fn recorder(log: &Log, label: &'static str) -> Rc<dyn EventListener> {
    let log = log.clone();
    Rc::new(move |event: &mut Event| -> anyhow::Result<()> {
        let current = event
            .current_target()
            .map(|node| node.node_name().to_string())
            .unwrap_or_default();
        log.borrow_mut().push(format!(
            "{label}:{}:{current}:{:?}",
            event.event_type().as_deref().unwrap_or_default(),
            event.event_phase()
        ));
        Ok(())
    })
}

/// Check that every parent reference in the subtree of `node` is reflected
/// by exactly one entry of the parent's child list, and vice versa.
fn assert_consistent(node: &NodeRef) {
    let children = node.child_nodes().to_vec();
    for (i, child) in children.iter().enumerate() {
        let parent = child
            .parent_node()
            .expect("a child must have its parent");
        assert!(parent.is_same_node(node), "{child:?} has a wrong parent");
        let occurrences = children
            .iter()
            .filter(|other| other.is_same_node(child))
            .count();
        assert_eq!(occurrences, 1, "{child:?} is linked more than once");

        let prev = child.previous_sibling();
        let next = child.next_sibling();
        match i.checked_sub(1) {
            Some(p) => assert!(prev.unwrap().is_same_node(&children[p])),
            None => assert!(prev.is_none()),
        }
        match children.get(i + 1) {
            Some(n) => assert!(next.unwrap().is_same_node(n)),
            None => assert!(next.is_none()),
        }
        assert_consistent(child);
    }
}

#[test]
fn random_mutations_keep_tree_consistent() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let (doc, root) = new_document();

    let mut pool: Vec<NodeRef> = vec![root.clone().into()];
    for i in 0..12 {
        pool.push(doc.create_element(&format!("e{i}")).unwrap().into());
    }
    for i in 0..6 {
        pool.push(doc.create_text_node(&format!("t{i}")).into());
    }

    for _ in 0..2000 {
        let mut parent = pool[rng.random_range(0..pool.len())].clone();
        let child = pool[rng.random_range(1..pool.len())].clone();
        let reference = parent
            .child_nodes()
            .item(rng.random_range(0..=parent.child_nodes().length()));
        let before = child_names(&parent);

        let res = match rng.random_range(0..4) {
            0 => parent.append_child(child.clone()).map(|_| ()),
            1 => parent.insert_before(child.clone(), reference).map(|_| ()),
            2 => match reference {
                Some(old) => parent.replace_child(child.clone(), old).map(|_| ()),
                None => parent.remove_child(child.clone()).map(|_| ()),
            },
            _ => parent.remove_child(child.clone()).map(|_| ()),
        };

        match res {
            Ok(()) => {}
            Err(DOMException::HierarchyRequestErr { .. }) | Err(DOMException::NotFoundErr) => {
                assert_eq!(child_names(&parent), before);
            }
            Err(err) => panic!("unexpected error: {err}"),
        }

        // no node may be its own ancestor
        for node in &pool {
            let mut depth = 0;
            let mut cur = node.parent_node();
            while let Some(par) = cur {
                assert!(!par.is_same_node(node));
                depth += 1;
                assert!(depth <= pool.len() + 1);
                cur = par.parent_node();
            }
        }
    }

    assert_consistent(&doc.clone().into());
    for node in &pool {
        if node.parent_node().is_none() {
            assert_consistent(node);
        }
    }
    // the document element is never detached by these mutations
    assert!(doc.document_element().unwrap().is_same_node(&root.into()));
}

#[test]
fn clone_shallow_and_deep() {
    let (doc, mut root) = new_document();
    root.set_attribute("id", "r").unwrap();
    let mut child = doc.create_element("child").unwrap();
    child.append_child(doc.create_text_node("x").into()).unwrap();
    root.append_child(child.into()).unwrap();
    root.append_child(doc.create_comment("c").into()).unwrap();

    let shallow = root.clone_node(false);
    assert!(shallow.parent_node().is_none());
    assert_eq!(shallow.node_name().as_ref(), "root");
    assert!(!shallow.has_child_nodes());
    assert_eq!(
        shallow.as_element().unwrap().get_attribute("id").as_deref(),
        Some("r")
    );

    let deep = root.clone_node(true);
    assert!(deep.parent_node().is_none());
    assert_eq!(child_names(&deep), ["child", "#comment"]);
    assert!(deep.is_equal_node(&root.clone().into()));
    assert!(!deep.is_same_node(&root.clone().into()));
    assert_consistent(&deep);

    // the copy is independent of the original
    let mut copied_child = deep.first_child().unwrap();
    copied_child.set_text_content("y").unwrap();
    assert_eq!(root.text_content().as_deref(), Some("x"));
    assert_eq!(deep.text_content().as_deref(), Some("y"));
}

#[test]
fn normalize_merges_adjacent_text() {
    let (doc, mut root) = new_document();
    let first = doc.create_text_node("a");
    root.append_child(first.clone().into()).unwrap();
    root.append_child(doc.create_text_node("").into()).unwrap();
    root.append_child(doc.create_text_node("b").into()).unwrap();

    let mut nested = doc.create_element("nested").unwrap();
    nested.append_child(doc.create_text_node("").into()).unwrap();
    root.append_child(nested.clone().into()).unwrap();
    root.append_child(doc.create_text_node("c").into()).unwrap();

    root.normalize().unwrap();
    assert_eq!(child_names(&root), ["#text", "nested", "#text"]);
    assert!(root.first_child().unwrap().is_same_node(&first.clone().into()));
    assert_eq!(first.data(), "ab");
    assert!(!nested.has_child_nodes());
    assert_consistent(&root.into());
}

#[test]
fn normalize_merges_every_character_data_run() {
    let (doc, mut root) = new_document();
    let first = doc.create_cdata_section("a");
    root.append_child(first.clone().into()).unwrap();
    root.append_child(doc.create_cdata_section("").into()).unwrap();
    root.append_child(doc.create_cdata_section("b").into()).unwrap();
    root.normalize().unwrap();
    assert_eq!(root.child_nodes().length(), 1);
    assert!(root.first_child().unwrap().is_same_node(&first.clone().into()));
    assert_eq!(first.data(), "ab");

    // a lone empty leaf is removed as well
    let mut lone = doc.create_element("lone").unwrap();
    lone.append_child(doc.create_comment("").into()).unwrap();
    lone.normalize().unwrap();
    assert!(!lone.has_child_nodes());

    // a run of mixed leaves is merged into its first leaf
    let mut mixed = doc.create_element("mixed").unwrap();
    let head = doc.create_text_node("x");
    mixed.append_child(head.clone().into()).unwrap();
    mixed.append_child(doc.create_comment("y").into()).unwrap();
    mixed.append_child(doc.create_cdata_section("z").into()).unwrap();
    mixed
        .append_child(doc.create_processing_instruction("pi", "").unwrap().into())
        .unwrap();
    mixed.append_child(doc.create_comment("w").into()).unwrap();
    mixed.normalize().unwrap();
    assert_eq!(child_names(&mixed), ["#text", "pi", "#comment"]);
    assert_eq!(head.data(), "xyz");
    assert_consistent(&mixed.into());
}

#[test]
fn normalize_fires_removal_events() {
    let (doc, mut root) = new_document();
    root.append_child(doc.create_text_node("a").into()).unwrap();
    root.append_child(doc.create_text_node("b").into()).unwrap();

    let log = Log::default();
    root.add_event_listener(DOM_NODE_REMOVED, recorder(&log, "removed"), false);
    root.normalize().unwrap();
    assert_eq!(
        log.borrow().as_slice(),
        ["removed:DOMNodeRemoved:root:Bubbling"]
    );
}

#[test]
fn capture_before_bubble() {
    let (doc, mut root) = new_document();
    let mut mid = doc.create_element("mid").unwrap();
    let mut leaf = doc.create_element("leaf").unwrap();
    root.append_child(mid.clone().into()).unwrap();
    mid.append_child(leaf.clone().into()).unwrap();

    let log = Log::default();
    let mut doc_target = doc.clone();
    doc_target.add_event_listener("custom", recorder(&log, "capture"), true);
    root.add_event_listener("custom", recorder(&log, "capture"), true);
    mid.add_event_listener("custom", recorder(&log, "bubble"), false);
    leaf.add_event_listener("custom", recorder(&log, "target"), false);
    // capture listeners of the target are not invoked
    leaf.add_event_listener("custom", recorder(&log, "ignored"), true);

    let mut event = Event::new();
    event.init_event("custom", true, false);
    assert!(leaf.dispatch_event(&mut event).unwrap());
    assert_eq!(
        log.borrow().as_slice(),
        [
            "capture:custom:#document:Capturing",
            "capture:custom:root:Capturing",
            "target:custom:leaf:AtTarget",
            "bubble:custom:mid:Bubbling",
        ]
    );
    assert_eq!(event.event_phase(), EventPhase::Done);
    assert!(event.target().unwrap().is_same_node(&leaf.into()));

    // a non-bubbling event stops at the target
    log.borrow_mut().clear();
    let mut event = Event::new();
    event.init_event("custom", false, false);
    assert!(mid.dispatch_event(&mut event).unwrap());
    assert_eq!(
        log.borrow().as_slice(),
        [
            "capture:custom:#document:Capturing",
            "capture:custom:root:Capturing",
            "bubble:custom:mid:AtTarget",
        ]
    );
}

#[test]
fn cancel_in_capture_phase() {
    let (doc, mut root) = new_document();
    let mut leaf = doc.create_element("leaf").unwrap();
    root.append_child(leaf.clone().into()).unwrap();

    let log = Log::default();
    root.add_event_listener(
        "custom",
        Rc::new(|event: &mut Event| -> anyhow::Result<()> {
            event.prevent_default();
            Ok(())
        }),
        true,
    );
    root.add_event_listener("custom", recorder(&log, "bubble"), false);
    leaf.add_event_listener("custom", recorder(&log, "target"), false);

    let mut event = Event::new();
    event.init_event("custom", true, true);
    assert!(!leaf.dispatch_event(&mut event).unwrap());
    assert!(event.default_prevented());
    assert!(log.borrow().is_empty());
}

#[test]
fn stop_propagation_finishes_current_target() {
    let (doc, mut root) = new_document();
    let mut leaf = doc.create_element("leaf").unwrap();
    root.append_child(leaf.clone().into()).unwrap();

    let log = Log::default();
    leaf.add_event_listener(
        "custom",
        Rc::new(|event: &mut Event| -> anyhow::Result<()> {
            event.stop_propagation();
            Ok(())
        }),
        false,
    );
    leaf.add_event_listener("custom", recorder(&log, "target"), false);
    root.add_event_listener("custom", recorder(&log, "bubble"), false);

    let mut event = Event::new();
    event.init_event("custom", true, false);
    assert!(leaf.dispatch_event(&mut event).unwrap());
    assert_eq!(log.borrow().as_slice(), ["target:custom:leaf:AtTarget"]);
}

#[test]
fn uninitialized_event_is_rejected() {
    let (_doc, root) = new_document();
    let mut event = Event::new();
    assert!(matches!(
        root.dispatch_event(&mut event),
        Err(EventException::UnspecifiedEventTypeErr)
    ));
}

#[test]
fn listener_registration_is_idempotent() {
    let (_doc, mut root) = new_document();
    let log = Log::default();
    let listener = recorder(&log, "once");
    root.add_event_listener("custom", listener.clone(), false);
    root.add_event_listener("custom", listener.clone(), false);

    let mut event = Event::new();
    event.init_event("custom", true, false);
    root.dispatch_event(&mut event).unwrap();
    assert_eq!(log.borrow().len(), 1);

    root.remove_event_listener("custom", &listener, false);
    // removing an unknown listener does nothing
    root.remove_event_listener("custom", &listener, true);
    let mut event = Event::new();
    event.init_event("custom", true, false);
    root.dispatch_event(&mut event).unwrap();
    assert_eq!(log.borrow().len(), 1);
}

#[test]
fn mutation_events() {
    let (mut doc, mut root) = new_document();
    let log = Log::default();
    root.add_event_listener(DOM_NODE_INSERTED, recorder(&log, "inserted"), false);
    root.add_event_listener(DOM_NODE_REMOVED, recorder(&log, "removed"), false);

    let related = Rc::new(RefCell::new(None));
    let slot = related.clone();
    root.add_event_listener(
        DOM_NODE_INSERTED,
        Rc::new(move |event: &mut Event| -> anyhow::Result<()> {
            *slot.borrow_mut() = event.related_node();
            Ok(())
        }),
        true,
    );

    let a = doc.create_element("a").unwrap();
    root.append_child(a.clone().into()).unwrap();
    assert!(
        related
            .borrow()
            .as_ref()
            .unwrap()
            .is_same_node(&root.clone().into())
    );

    // replacement is a removal followed by an insertion
    let b = doc.create_element("b").unwrap();
    root.replace_child(b.clone().into(), a.clone().into())
        .unwrap();
    root.remove_child(b.clone().into()).unwrap();
    assert_eq!(
        log.borrow().as_slice(),
        [
            "inserted:DOMNodeInserted:root:Bubbling",
            "removed:DOMNodeRemoved:root:Bubbling",
            "inserted:DOMNodeInserted:root:Bubbling",
            "removed:DOMNodeRemoved:root:Bubbling",
        ]
    );

    log.borrow_mut().clear();
    doc.set_events_enabled(false);
    root.append_child(a.into()).unwrap();
    root.append_child(b.into()).unwrap();
    assert!(log.borrow().is_empty());
}

#[test]
fn listener_failure_aborts_mutation() {
    let (doc, mut root) = new_document();
    root.add_event_listener(
        DOM_NODE_INSERTED,
        Rc::new(|_: &mut Event| -> anyhow::Result<()> { anyhow::bail!("rejected") }),
        false,
    );
    let elem = doc.create_element("a").unwrap();
    let err = root.append_child(elem.into()).unwrap_err();
    assert!(matches!(
        err,
        DOMException::EventErr(EventException::ListenerErr(_))
    ));
    assert_eq!(err.to_string(), "rejected");
}

#[test]
fn listener_may_mutate_tree() {
    let (doc, mut root) = new_document();
    let mut sink = doc.create_element("sink").unwrap();
    root.append_child(sink.clone().into()).unwrap();

    let target = root.clone();
    sink.add_event_listener(
        "custom",
        Rc::new(move |_: &mut Event| -> anyhow::Result<()> {
            let mut target = target.clone();
            let doc = target.owner_document().unwrap();
            target.append_child(doc.create_comment("from listener").into())?;
            Ok(())
        }),
        false,
    );
    let mut event = Event::new();
    event.init_event("custom", false, false);
    sink.dispatch_event(&mut event).unwrap();
    assert_eq!(child_names(&root), ["sink", "#comment"]);
}

#[test]
fn second_document_element_leaves_tree_unchanged() {
    let (mut doc, _) = new_document();
    let before = child_names(&doc);
    let elem = doc.create_element("extra").unwrap();
    let err = doc.append_child(elem.clone().into()).unwrap_err();
    assert!(matches!(
        &err,
        DOMException::HierarchyRequestErr { name } if name == "extra"
    ));
    assert_eq!(err.code(), 3);
    assert_eq!(child_names(&doc), before);
    assert!(elem.parent_node().is_none());

    let mut frag = doc.create_document_fragment();
    frag.append_child(doc.create_element("extra").unwrap().into())
        .unwrap();
    assert!(matches!(
        doc.append_child(frag.clone().into()),
        Err(DOMException::HierarchyRequestErr { .. })
    ));
    assert_eq!(child_names(&doc), before);
    assert_eq!(frag.child_nodes().length(), 1);
}

#[test]
fn document_element_stays_in_document() {
    let (mut doc, root) = new_document();
    let comment = doc.create_comment("c");
    let err = doc
        .replace_child(comment.clone().into(), root.clone().into())
        .unwrap_err();
    assert!(matches!(
        &err,
        DOMException::HierarchyRequestErr { name } if name == "root"
    ));
    assert!(doc.document_element().unwrap().is_same_node(&root.clone().into()));
    assert!(comment.parent_node().is_none());

    let mut detached = doc.create_element("detached").unwrap();
    assert!(matches!(
        detached.append_child(root.clone().into()),
        Err(DOMException::HierarchyRequestErr { .. })
    ));
    assert!(root.parent_node().unwrap().is_same_node(&doc.clone().into()));
    assert!(!detached.has_child_nodes());

    // moving within the document is allowed
    doc.append_child(comment.clone().into()).unwrap();
    doc.insert_before(comment.clone().into(), Some(root.clone().into()))
        .unwrap();
    doc.append_child(comment.clone().into()).unwrap();
    doc.insert_before(root.clone().into(), Some(comment.clone().into()))
        .unwrap();
    assert_eq!(child_names(&doc), ["root", "#comment"]);

    // a fragment carrying an element may replace the document element
    let mut frag = doc.create_document_fragment();
    frag.append_child(doc.create_comment("lead").into()).unwrap();
    let next = doc.create_element("next").unwrap();
    frag.append_child(next.clone().into()).unwrap();
    doc.replace_child(frag.into(), root.clone().into()).unwrap();
    assert_eq!(child_names(&doc), ["#comment", "next", "#comment"]);
    assert!(doc.document_element().unwrap().is_same_node(&next.into()));
    assert!(root.parent_node().is_none());
}

#[test]
fn namespaced_attributes() {
    let (doc, mut root) = new_document();
    root.set_attribute_ns(Some("urn:x"), "x:lang", "en").unwrap();
    assert_eq!(root.get_attribute_ns(Some("urn:x"), "lang").as_deref(), Some("en"));
    assert_eq!(root.get_attribute("x:lang").as_deref(), Some("en"));
    assert!(root.get_attribute_ns(Some("urn:y"), "lang").is_none());
    assert!(root.get_attribute_ns(None, "lang").is_none());

    // the prefix is replaced and the same node is kept
    let attr = root.get_attribute_node_ns(Some("urn:x"), "lang").unwrap();
    root.set_attribute_ns(Some("urn:x"), "y:lang", "fr").unwrap();
    assert_eq!(attr.name().as_ref(), "y:lang");
    assert_eq!(attr.value(), "fr");
    assert_eq!(root.attributes().unwrap().length(), 1);

    root.set_attribute_ns(Some(XML_NS_NAMESPACE), "xmlns:x", "urn:x")
        .unwrap();
    assert_eq!(root.lookup_prefix("urn:x").as_deref(), Some("x"));
    let mut child = doc.create_element("child").unwrap();
    root.append_child(child.clone().into()).unwrap();
    assert_eq!(
        child.lookup_namespace_uri(Some("x")).as_deref(),
        Some("urn:x")
    );

    assert!(matches!(
        child.set_attribute_ns(None, "x:lang", "en"),
        Err(DOMException::NamespaceErr)
    ));
    assert!(matches!(
        child.set_attribute_ns(Some("urn:x"), "xml:lang", "en"),
        Err(DOMException::NamespaceErr)
    ));

    root.remove_attribute_ns(Some("urn:x"), "lang").unwrap();
    assert!(!root.has_attribute_ns(Some("urn:x"), "lang"));
    assert!(attr.owner_element().is_none());
}

#[test]
fn attribute_in_use() {
    let (doc, mut root) = new_document();
    let mut other = doc.create_element("other").unwrap();
    let attr = doc.create_attribute("a").unwrap();
    root.set_attribute_node(attr.clone()).unwrap();
    assert!(matches!(
        other.set_attribute_node(attr.clone()),
        Err(DOMException::InuseAttributeErr)
    ));
    assert!(root.set_attribute_node(attr.clone()).unwrap().is_none());
    let removed = root.remove_attribute_node(attr).unwrap();
    other.set_attribute_node(removed).unwrap();
    assert!(other.has_attribute("a"));
}

#[test]
fn removing_non_child_is_not_found() {
    let (doc, mut root) = new_document();
    let mut a = doc.create_element("a").unwrap();
    let b = doc.create_element("b").unwrap();
    root.append_child(a.clone().into()).unwrap();
    a.append_child(b.clone().into()).unwrap();

    let before = child_names(&root);
    assert!(matches!(
        root.remove_child(b.clone().into()),
        Err(DOMException::NotFoundErr)
    ));
    assert_eq!(child_names(&root), before);
    assert!(b.parent_node().unwrap().is_same_node(&a.clone().into()));

    let orphan = doc.create_comment("orphan");
    assert!(matches!(
        root.insert_before(doc.create_comment("c").into(), Some(orphan.into())),
        Err(DOMException::NotFoundErr)
    ));
    assert_eq!(child_names(&root), before);
}

#[test]
fn ancestor_cannot_become_child() {
    let (doc, mut root) = new_document();
    let mut a = doc.create_element("a").unwrap();
    root.append_child(a.clone().into()).unwrap();
    assert!(matches!(
        a.append_child(root.clone().into()),
        Err(DOMException::HierarchyRequestErr { .. })
    ));
    assert!(matches!(
        a.append_child(a.clone().into()),
        Err(DOMException::HierarchyRequestErr { .. })
    ));
    assert!(matches!(
        root.append_child(doc.clone().into()),
        Err(DOMException::HierarchyRequestErr { .. })
    ));
    assert_consistent(&doc.into());
}

#[test]
fn fragment_children_move_in_order() {
    let (doc, mut root) = new_document();
    let mut frag = doc.create_document_fragment();
    frag.append_child(doc.create_element("a").unwrap().into())
        .unwrap();
    frag.append_child(doc.create_text_node("b").into()).unwrap();
    frag.append_child(doc.create_element("c").unwrap().into())
        .unwrap();
    let last = doc.create_comment("last");
    root.append_child(last.clone().into()).unwrap();

    let log = Log::default();
    root.add_event_listener(DOM_NODE_INSERTED, recorder(&log, "inserted"), false);
    root.insert_before(frag.clone().into(), Some(last.into()))
        .unwrap();
    assert_eq!(child_names(&root), ["a", "#text", "c", "#comment"]);
    assert!(!frag.has_child_nodes());
    assert_eq!(log.borrow().len(), 3);
    assert_consistent(&root.into());
}

#[test]
fn moving_node_between_documents_is_rejected() {
    let (_doc, mut root) = new_document();
    let (other, _) = new_document();
    let foreign = other.create_element("foreign").unwrap();
    assert!(matches!(
        root.append_child(foreign.clone().into()),
        Err(DOMException::WrongDocumentErr)
    ));
    assert!(foreign.owner_document().unwrap().is_same_node(&other.into()));
}

#[test]
fn split_text_keeps_siblings() {
    let (doc, mut root) = new_document();
    let mut text = doc.create_text_node("héllo");
    root.append_child(text.clone().into()).unwrap();
    root.append_child(doc.create_comment("c").into()).unwrap();

    assert!(matches!(text.split_text(2), Err(DOMException::IndexSizeErr)));
    let tail = text.split_text(3).unwrap();
    assert_eq!(text.data(), "hé");
    assert_eq!(tail.data(), "llo");
    assert_eq!(child_names(&root), ["#text", "#text", "#comment"]);
    assert_consistent(&root.into());
}
