//! Implement the event flow of [DOM Level 2 Events](https://www.w3.org/TR/DOM-Level-2-Events/).
//!
//! Every [`Node`] is an [`EventTarget`].\
//! The tree mutation methods of [`Node`] dispatch `DOMNodeInserted` and `DOMNodeRemoved`
//! if the owner document enables events.

use std::{cell::RefCell, collections::HashMap, rc::Rc, time::SystemTime};

use super::{
    DOMException,
    node::{Node, NodeConnection, NodeRef},
};

/// The type of the event dispatched after a node has been inserted into a parent.
pub const DOM_NODE_INSERTED: &str = "DOMNodeInserted";
/// The type of the event dispatched before a node is removed from its parent.
pub const DOM_NODE_REMOVED: &str = "DOMNodeRemoved";

/// Implementation of [EventException](https://www.w3.org/TR/DOM-Level-2-Events/events.html#Events-EventException)
#[derive(Debug, thiserror::Error)]
pub enum EventException {
    /// If the Event's type was not specified by initializing the event before
    /// the method was called.
    #[error("the event type is not specified")]
    UnspecifiedEventTypeErr,
    /// A listener failed while the event was dispatched.
    #[error(transparent)]
    ListenerErr(#[from] anyhow::Error),
}

impl EventException {
    /// Return the `EventExceptionCode` of this error.
    ///
    /// A listener failure has no code in the specification, so it is reported as `0`.
    pub fn code(&self) -> u16 {
        match self {
            Self::UnspecifiedEventTypeErr => 0,
            Self::ListenerErr(_) => 0,
        }
    }
}

/// Constants `PhaseType` in [Interface Event](https://www.w3.org/TR/DOM-Level-2-Events/events.html#Events-Event).
///
/// [`EventPhase::None`] and [`EventPhase::Done`] represent the states before and after
/// the dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EventPhase {
    #[default]
    None,
    Capturing,
    AtTarget,
    Bubbling,
    Done,
}

/// Implementation of [Event](https://www.w3.org/TR/DOM-Level-2-Events/events.html#Events-Event)
/// and [MutationEvent](https://www.w3.org/TR/DOM-Level-2-Events/events.html#Events-MutationEvent)
/// interface.
///
/// # Specification
/// ```text
/// The Event interface is used to provide contextual information about an event
/// to the handler processing the event. An object which implements the Event interface
/// is generally passed as the first parameter to an event handler.
/// ```
#[derive(Clone)]
pub struct Event {
    event_type: Option<Rc<str>>,
    bubbles: bool,
    cancelable: bool,
    phase: EventPhase,
    propagating: bool,
    default_action: bool,
    target: Option<NodeRef>,
    current_target: Option<NodeRef>,
    related_node: Option<NodeRef>,
    time_stamp: SystemTime,
}

impl Event {
    /// Create new uninitialized event.
    ///
    /// Before dispatched, the event must be initialized by [`Event::init_event`].
    pub fn new() -> Self {
        Self {
            event_type: None,
            bubbles: false,
            cancelable: false,
            phase: EventPhase::None,
            propagating: true,
            default_action: true,
            target: None,
            current_target: None,
            related_node: None,
            time_stamp: SystemTime::now(),
        }
    }

    /// Implementation of [`initEvent`](https://www.w3.org/TR/DOM-Level-2-Events/events.html#Events-Event-initEvent) method.
    ///
    /// # Specification
    /// ```text
    /// The initEvent method is used to initialize the value of an Event created through
    /// the DocumentEvent interface. This method may only be called before the Event has
    /// been dispatched via the dispatchEvent method, though it may be called multiple
    /// times during that phase if necessary. If called multiple times the final invocation
    /// takes precedence.
    /// ```
    pub fn init_event(&mut self, event_type: &str, can_bubble: bool, cancelable: bool) {
        self.event_type = Some(event_type.into());
        self.bubbles = can_bubble;
        self.cancelable = cancelable;
        self.propagating = true;
        self.default_action = true;
    }

    /// Implementation of `initMutationEvent` method.
    ///
    /// Only `relatedNode` is supported among the mutation specific attributes.
    pub fn init_mutation_event(
        &mut self,
        event_type: &str,
        can_bubble: bool,
        cancelable: bool,
        related_node: Option<NodeRef>,
    ) {
        self.init_event(event_type, can_bubble, cancelable);
        self.related_node = related_node;
    }

    /// Implementation of `type` attribute.
    pub fn event_type(&self) -> Option<Rc<str>> {
        self.event_type.clone()
    }

    /// Implementation of `bubbles` attribute.
    pub fn bubbles(&self) -> bool {
        self.bubbles
    }

    /// Implementation of `cancelable` attribute.
    pub fn cancelable(&self) -> bool {
        self.cancelable
    }

    /// Implementation of `eventPhase` attribute.
    pub fn event_phase(&self) -> EventPhase {
        self.phase
    }

    /// Implementation of `target` attribute.
    pub fn target(&self) -> Option<NodeRef> {
        self.target.clone()
    }

    /// Implementation of `currentTarget` attribute.
    pub fn current_target(&self) -> Option<NodeRef> {
        self.current_target.clone()
    }

    /// Implementation of `relatedNode` attribute of `MutationEvent`.
    pub fn related_node(&self) -> Option<NodeRef> {
        self.related_node.clone()
    }

    /// Implementation of `timeStamp` attribute.
    pub fn time_stamp(&self) -> SystemTime {
        self.time_stamp
    }

    /// Implementation of [`stopPropagation`](https://www.w3.org/TR/DOM-Level-2-Events/events.html#Events-Event-stopPropagation) method.
    ///
    /// The listeners of the current target are still invoked.
    ///
    /// # Specification
    /// ```text
    /// The stopPropagation method is used prevent further propagation of an event during
    /// event flow. If this method is called by any EventListener the event will cease
    /// propagating through the tree. The event will complete dispatch to all listeners
    /// on the current EventTarget before event flow stops.
    /// ```
    pub fn stop_propagation(&mut self) {
        self.propagating = false;
    }

    /// Implementation of [`preventDefault`](https://www.w3.org/TR/DOM-Level-2-Events/events.html#Events-Event-preventDefault) method.
    ///
    /// This implementation does not check `cancelable`.\
    /// If the default action is prevented during the capturing phase,
    /// neither the target nor the bubbling phase are performed.
    pub fn prevent_default(&mut self) {
        self.default_action = false;
    }

    /// Check if [`Event::prevent_default`] has been called.
    pub fn default_prevented(&self) -> bool {
        !self.default_action
    }
}

impl Default for Event {
    fn default() -> Self {
        Self::new()
    }
}

/// Implementation of [EventListener](https://www.w3.org/TR/DOM-Level-2-Events/events.html#Events-EventListener)
/// interface.
///
/// Closures that take `&mut Event` and return `anyhow::Result<()>` are also listeners.
pub trait EventListener {
    /// Implementation of `handleEvent` method.
    ///
    /// If this method returns `Err`, the dispatch is aborted
    /// and the error is returned to the caller of `dispatch_event`.
    fn handle_event(&self, event: &mut Event) -> anyhow::Result<()>;
}

impl<F: Fn(&mut Event) -> anyhow::Result<()>> EventListener for F {
    fn handle_event(&self, event: &mut Event) -> anyhow::Result<()> {
        self(event)
    }
}

#[derive(Default)]
struct ListenerRegistry {
    capture: HashMap<Rc<str>, Vec<Rc<dyn EventListener>>>,
    bubble: HashMap<Rc<str>, Vec<Rc<dyn EventListener>>>,
}

impl ListenerRegistry {
    fn phase_mut(&mut self, use_capture: bool) -> &mut HashMap<Rc<str>, Vec<Rc<dyn EventListener>>> {
        if use_capture {
            &mut self.capture
        } else {
            &mut self.bubble
        }
    }
}

/// The listeners registered on a node.
///
/// Since the data is shared by [`Rc`], [`clone`](EventListenerMap::clone) means shallow copy.
#[derive(Clone, Default)]
pub struct EventListenerMap(Rc<RefCell<ListenerRegistry>>);

impl EventListenerMap {
    pub(super) fn add(&self, event_type: &str, listener: Rc<dyn EventListener>, use_capture: bool) {
        let mut registry = self.0.borrow_mut();
        let listeners = registry
            .phase_mut(use_capture)
            .entry(event_type.into())
            .or_default();
        if !listeners.iter().any(|l| Rc::ptr_eq(l, &listener)) {
            listeners.push(listener);
        }
    }

    pub(super) fn remove(
        &self,
        event_type: &str,
        listener: &Rc<dyn EventListener>,
        use_capture: bool,
    ) {
        let mut registry = self.0.borrow_mut();
        if let Some(listeners) = registry.phase_mut(use_capture).get_mut(event_type) {
            listeners.retain(|l| !Rc::ptr_eq(l, listener));
        }
    }

    /// Copy the listeners for `event_type` so that the listeners can modify the registry
    /// while they are invoked.
    pub(super) fn snapshot(&self, event_type: &str, use_capture: bool) -> Vec<Rc<dyn EventListener>> {
        let registry = self.0.borrow();
        let listeners = if use_capture {
            &registry.capture
        } else {
            &registry.bubble
        };
        listeners.get(event_type).cloned().unwrap_or_default()
    }
}

/// Implementation of [EventTarget](https://www.w3.org/TR/DOM-Level-2-Events/events.html#Events-EventTarget)
/// interface.
///
/// This is implemented for all [`Node`]s.
pub trait EventTarget: Node {
    /// Implementation of `addEventListener` method.
    ///
    /// If the same listener (compared by the pointer of [`Rc`]) is already registered
    /// for the same `event_type` and phase, this method does nothing.
    fn add_event_listener(
        &mut self,
        event_type: &str,
        listener: Rc<dyn EventListener>,
        use_capture: bool,
    ) {
        self.event_listeners()
            .add(event_type, listener, use_capture);
    }

    /// Implementation of `removeEventListener` method.
    ///
    /// If `listener` is not registered, this method does nothing.
    fn remove_event_listener(
        &mut self,
        event_type: &str,
        listener: &Rc<dyn EventListener>,
        use_capture: bool,
    ) {
        self.event_listeners()
            .remove(event_type, listener, use_capture);
    }

    /// Implementation of [`dispatchEvent`](https://www.w3.org/TR/DOM-Level-2-Events/events.html#Events-EventTarget-dispatchEvent) method.
    ///
    /// Return `Ok(false)` if any listener called [`Event::prevent_default`],
    /// otherwise return `Ok(true)`.
    ///
    /// # Errors
    /// - If `event` is not initialized, return `UnspecifiedEventTypeErr`.
    /// - If a listener fails, the dispatch is aborted and its error is returned.
    ///
    /// # Specification
    /// ```text
    /// This method allows the dispatch of events into the implementations event model.
    /// Events dispatched in this manner will have the same capturing and bubbling behavior
    /// as events dispatched directly by the implementation. The target of the event is
    /// the EventTarget on which dispatchEvent is called.
    /// ```
    fn dispatch_event(&self, event: &mut Event) -> Result<bool, EventException> {
        let Some(event_type) = event.event_type() else {
            return Err(EventException::UnspecifiedEventTypeErr);
        };

        let target: NodeRef = self.clone().into();
        event.target = Some(target.clone());
        let mut ancestors = vec![];
        let mut par = target.parent_node();
        while let Some(node) = par {
            par = node.parent_node();
            ancestors.push(node);
        }

        tracing::trace!(
            event = %event_type,
            target = %target.node_name(),
            depth = ancestors.len(),
            "dispatch"
        );

        event.phase = EventPhase::Capturing;
        for node in ancestors.iter().rev() {
            if !event.propagating {
                break;
            }
            invoke_listeners(node, &event_type, true, event)?;
        }

        if event.default_action {
            event.phase = EventPhase::AtTarget;
            invoke_listeners(&target, &event_type, false, event)?;
        }

        if event.bubbles && event.default_action {
            event.phase = EventPhase::Bubbling;
            for node in &ancestors {
                if !event.propagating {
                    break;
                }
                invoke_listeners(node, &event_type, false, event)?;
            }
        }

        event.phase = EventPhase::Done;
        event.current_target = None;
        Ok(event.default_action)
    }
}

impl<N: Node> EventTarget for N {}

fn invoke_listeners(
    node: &NodeRef,
    event_type: &str,
    use_capture: bool,
    event: &mut Event,
) -> Result<(), EventException> {
    let listeners = node.event_listeners().snapshot(event_type, use_capture);
    if listeners.is_empty() {
        return Ok(());
    }
    tracing::trace!(
        event = %event_type,
        phase = ?event.phase,
        current = %node.node_name(),
        count = listeners.len(),
        "invoke listeners"
    );
    event.current_target = Some(node.clone());
    for listener in listeners {
        listener.handle_event(event)?;
    }
    Ok(())
}

/// Dispatch a structural mutation event at `node`.
///
/// `related` is the parent which `node` is inserted into or removed from.\
/// If the document that owns `related` disables events, this function does nothing.
pub(super) fn dispatch_mutation_event(
    node: &NodeRef,
    event_type: &str,
    related: &NodeRef,
) -> Result<(), DOMException> {
    let doc = match related {
        NodeRef::Document(doc) => Some(doc.clone()),
        other => other.owner_document(),
    };
    if !doc.is_some_and(|doc| doc.events_enabled()) {
        return Ok(());
    }

    let mut event = Event::new();
    event.init_mutation_event(event_type, true, false, Some(related.clone()));
    node.dispatch_event(&mut event)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use crate::dom::{document::DocumentRef, element::ElementRef};

    use super::*;

    fn tree() -> (DocumentRef, ElementRef, ElementRef) {
        let mut doc = DocumentRef::new(None, Some("root"), None).unwrap();
        let mut root = doc.document_element().unwrap();
        let mut mid = doc.create_element("mid").unwrap();
        let leaf = doc.create_element("leaf").unwrap();
        root.append_child(mid.clone().into()).unwrap();
        mid.append_child(leaf.clone().into()).unwrap();
        (doc, root, leaf)
    }

    fn recorder(log: &Rc<RefCell<Vec<String>>>, label: &'static str) -> Rc<dyn EventListener> {
        let log = log.clone();
        Rc::new(move |event: &mut Event| -> anyhow::Result<()> {
            log.borrow_mut()
                .push(format!("{label}:{:?}", event.event_phase()));
            Ok(())
        })
    }

    #[test]
    fn three_phase_order() {
        let (_doc, mut root, mut leaf) = tree();
        let log = Rc::new(RefCell::new(vec![]));
        root.add_event_listener("ping", recorder(&log, "root-capture"), true);
        root.add_event_listener("ping", recorder(&log, "root-bubble"), false);
        leaf.add_event_listener("ping", recorder(&log, "leaf"), false);
        leaf.add_event_listener("ping", recorder(&log, "leaf-capture"), true);

        let mut event = Event::new();
        event.init_event("ping", true, true);
        assert!(leaf.dispatch_event(&mut event).unwrap());
        assert_eq!(
            *log.borrow(),
            vec![
                "root-capture:Capturing",
                "leaf:AtTarget",
                "root-bubble:Bubbling"
            ]
        );
        assert_eq!(event.event_phase(), EventPhase::Done);
        assert!(
            event
                .target()
                .unwrap()
                .is_same_node(&leaf.clone().into())
        );
    }

    #[test]
    fn non_bubbling_event() {
        let (_doc, mut root, leaf) = tree();
        let log = Rc::new(RefCell::new(vec![]));
        root.add_event_listener("ping", recorder(&log, "root"), false);
        let mut event = Event::new();
        event.init_event("ping", false, false);
        assert!(leaf.dispatch_event(&mut event).unwrap());
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn prevent_default_in_capture() {
        let (_doc, mut root, mut leaf) = tree();
        let log = Rc::new(RefCell::new(vec![]));
        root.add_event_listener(
            "ping",
            Rc::new(|event: &mut Event| -> anyhow::Result<()> {
                event.prevent_default();
                Ok(())
            }),
            true,
        );
        leaf.add_event_listener("ping", recorder(&log, "leaf"), false);
        root.add_event_listener("ping", recorder(&log, "root"), false);

        let mut event = Event::new();
        event.init_event("ping", true, false);
        assert!(!leaf.dispatch_event(&mut event).unwrap());
        assert!(event.default_prevented());
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn stop_propagation_at_target() {
        let (_doc, mut root, mut leaf) = tree();
        let log = Rc::new(RefCell::new(vec![]));
        leaf.add_event_listener(
            "ping",
            Rc::new(|event: &mut Event| -> anyhow::Result<()> {
                event.stop_propagation();
                Ok(())
            }),
            false,
        );
        leaf.add_event_listener("ping", recorder(&log, "leaf"), false);
        root.add_event_listener("ping", recorder(&log, "root"), false);

        let mut event = Event::new();
        event.init_event("ping", true, true);
        assert!(leaf.dispatch_event(&mut event).unwrap());
        assert_eq!(*log.borrow(), vec!["leaf:AtTarget"]);
    }

    #[test]
    fn duplicate_and_removed_listeners() {
        let (_doc, _root, mut leaf) = tree();
        let log = Rc::new(RefCell::new(vec![]));
        let listener = recorder(&log, "leaf");
        leaf.add_event_listener("ping", listener.clone(), false);
        leaf.add_event_listener("ping", listener.clone(), false);

        let mut event = Event::new();
        event.init_event("ping", true, true);
        leaf.dispatch_event(&mut event).unwrap();
        assert_eq!(log.borrow().len(), 1);

        leaf.remove_event_listener("ping", &listener, false);
        leaf.remove_event_listener("ping", &listener, false);
        let mut event = Event::new();
        event.init_event("ping", true, true);
        leaf.dispatch_event(&mut event).unwrap();
        assert_eq!(log.borrow().len(), 1);
    }

    #[test]
    fn uninitialized_event() {
        let (_doc, _root, leaf) = tree();
        let mut event = Event::new();
        assert!(matches!(
            leaf.dispatch_event(&mut event),
            Err(EventException::UnspecifiedEventTypeErr)
        ));
    }

    #[test]
    fn listener_failure_aborts_dispatch() {
        let (_doc, mut root, mut leaf) = tree();
        let log = Rc::new(RefCell::new(vec![]));
        leaf.add_event_listener(
            "ping",
            Rc::new(|_: &mut Event| -> anyhow::Result<()> {
                Err(anyhow::anyhow!("listener failed"))
            }),
            false,
        );
        root.add_event_listener("ping", recorder(&log, "root"), false);

        let mut event = Event::new();
        event.init_event("ping", true, true);
        let err = leaf.dispatch_event(&mut event).unwrap_err();
        assert!(matches!(err, EventException::ListenerErr(_)));
        assert_eq!(err.to_string(), "listener failed");
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn mutation_events() {
        let (mut doc, mut root, _leaf) = tree();
        let log = Rc::new(RefCell::new(vec![]));
        let l = log.clone();
        root.add_event_listener(
            DOM_NODE_INSERTED,
            Rc::new(move |event: &mut Event| -> anyhow::Result<()> {
                let related = event.related_node().unwrap();
                l.borrow_mut()
                    .push(format!("inserted into {}", related.node_name()));
                Ok(())
            }),
            false,
        );
        let l = log.clone();
        root.add_event_listener(
            DOM_NODE_REMOVED,
            Rc::new(move |event: &mut Event| -> anyhow::Result<()> {
                // the node is still attached when the event is dispatched
                let target = event.target().unwrap();
                assert!(target.parent_node().is_some());
                l.borrow_mut()
                    .push(format!("removed {}", target.node_name()));
                Ok(())
            }),
            false,
        );

        let text = doc.create_text_node("x");
        root.append_child(text.clone().into()).unwrap();
        root.remove_child(text.clone().into()).unwrap();
        assert_eq!(*log.borrow(), vec!["inserted into root", "removed #text"]);

        doc.set_events_enabled(false);
        root.append_child(text.into()).unwrap();
        assert_eq!(log.borrow().len(), 2);
    }
}
