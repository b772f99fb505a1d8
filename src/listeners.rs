//! Namespaced listener table
//!
//! Bindings map (target, event kind, namespace) to a [`Handler`]. Handlers are
//! plain data naming what should happen; the page dispatcher interprets them.
//! A namespace groups bindings so they can be removed together without
//! touching anyone else's.

use crate::a11y::motion::CompletionId;
use crate::dom::NodeId;
use crate::event::EventKind;
use crate::modal::ModalHandle;

/// Where a listener is attached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListenerTarget {
    /// Above `html`; sees every bubbling event last
    Document,
    Node(NodeId),
}

/// Behaviour run when a binding matches
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Handler {
    /// Arm the trap's Tab handler when focus lands on a boundary
    TrapFocusIn(String),
    /// Disarm the trap's Tab handler
    TrapFocusOut(String),
    /// Wrap Tab / Shift+Tab at the trap boundaries
    TrapKeyDown(String),
    /// Click on an open trigger
    ModalOpen(ModalHandle),
    /// Click on a close trigger
    ModalClose(ModalHandle),
    /// Key-up of Escape while the modal is open
    ModalEscape(ModalHandle),
    /// Click anywhere on the modal container
    ModalBackdrop(ModalHandle),
    /// Click inside the modal content; stops the backdrop handler from seeing it
    ModalContentGuard,
    /// `drawerOpen` on the body
    ModalDrawerOpen(ModalHandle),
    /// Animation/transition end on the awaited element
    Completion(CompletionId),
    /// Swallow touch-move while scrolling is locked
    ScrollLock,
}

/// Identity of a binding, stable for its lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BindingId(u64);

#[derive(Debug, Clone)]
struct Binding {
    id: BindingId,
    target: ListenerTarget,
    kind: EventKind,
    namespace: Option<String>,
    handler: Handler,
}

impl Binding {
    fn matches(
        &self,
        target: ListenerTarget,
        kind: Option<&EventKind>,
        namespace: Option<&str>,
    ) -> bool {
        self.target == target
            && kind.is_none_or(|k| &self.kind == k)
            && namespace.is_none_or(|ns| self.namespace.as_deref() == Some(ns))
    }
}

/// All live bindings, in registration order
#[derive(Debug, Default)]
pub struct Listeners {
    bindings: Vec<Binding>,
    next_id: u64,
}

impl Listeners {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `handler` for `kind` events reaching `target`
    pub fn on(
        &mut self,
        target: ListenerTarget,
        kind: EventKind,
        namespace: Option<&str>,
        handler: Handler,
    ) -> BindingId {
        let id = BindingId(self.next_id);
        self.next_id += 1;
        self.bindings.push(Binding {
            id,
            target,
            kind,
            namespace: namespace.map(str::to_string),
            handler,
        });
        id
    }

    /// Remove bindings on `target`
    ///
    /// `None` for the kind matches every kind; `None` for the namespace
    /// matches every binding regardless of namespace. Returns how many went.
    pub fn off(
        &mut self,
        target: ListenerTarget,
        kind: Option<&EventKind>,
        namespace: Option<&str>,
    ) -> usize {
        let before = self.bindings.len();
        self.bindings.retain(|b| !b.matches(target, kind, namespace));
        before - self.bindings.len()
    }

    /// Remove every binding under `namespace`, on any target
    pub fn off_namespace(&mut self, namespace: &str) -> usize {
        let before = self.bindings.len();
        self.bindings
            .retain(|b| b.namespace.as_deref() != Some(namespace));
        before - self.bindings.len()
    }

    /// Snapshot of the handlers bound at `target` for `kind`
    pub fn handlers_for(&self, target: ListenerTarget, kind: &EventKind) -> Vec<(BindingId, Handler)> {
        self.bindings
            .iter()
            .filter(|b| b.target == target && &b.kind == kind)
            .map(|b| (b.id, b.handler.clone()))
            .collect()
    }

    pub fn is_bound(&self, id: BindingId) -> bool {
        self.bindings.iter().any(|b| b.id == id)
    }

    /// Number of bindings matching the filter, see [`Listeners::off`]
    pub fn count(
        &self,
        target: ListenerTarget,
        kind: Option<&EventKind>,
        namespace: Option<&str>,
    ) -> usize {
        self.bindings
            .iter()
            .filter(|b| b.matches(target, kind, namespace))
            .count()
    }

    /// Number of bindings under `namespace`, on any target
    pub fn namespace_len(&self, namespace: &str) -> usize {
        self.bindings
            .iter()
            .filter(|b| b.namespace.as_deref() == Some(namespace))
            .count()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;

    #[test]
    fn test_off_by_namespace_leaves_others() {
        let mut listeners = Listeners::new();
        listeners.on(
            ListenerTarget::Document,
            EventKind::FocusIn,
            Some("a"),
            Handler::TrapFocusIn("a".to_string()),
        );
        listeners.on(
            ListenerTarget::Document,
            EventKind::FocusIn,
            Some("b"),
            Handler::TrapFocusIn("b".to_string()),
        );

        let removed = listeners.off(ListenerTarget::Document, Some(&EventKind::FocusIn), Some("a"));
        assert_eq!(removed, 1);
        assert_eq!(
            listeners.handlers_for(ListenerTarget::Document, &EventKind::FocusIn)[0].1,
            Handler::TrapFocusIn("b".to_string())
        );
    }

    #[test]
    fn test_off_without_namespace_removes_all_of_kind() {
        let mut listeners = Listeners::new();
        listeners.on(ListenerTarget::Document, EventKind::KeyDown, Some("a"), Handler::ScrollLock);
        listeners.on(ListenerTarget::Document, EventKind::KeyDown, None, Handler::ScrollLock);
        listeners.on(ListenerTarget::Document, EventKind::KeyUp, None, Handler::ScrollLock);

        assert_eq!(listeners.off(ListenerTarget::Document, Some(&EventKind::KeyDown), None), 2);
        assert_eq!(listeners.len(), 1);
    }

    #[test]
    fn test_off_namespace_spans_targets() {
        let doc = Document::new();
        let mut listeners = Listeners::new();
        let html = ListenerTarget::Node(doc.html());
        let body = ListenerTarget::Node(doc.body());
        listeners.on(html, EventKind::KeyUp, Some("modal-x"), Handler::ModalContentGuard);
        listeners.on(body, EventKind::KeyUp, Some("modal-x"), Handler::ModalContentGuard);
        let kept = listeners.on(body, EventKind::KeyUp, Some("modal-y"), Handler::ModalContentGuard);

        assert_eq!(listeners.namespace_len("modal-x"), 2);
        assert_eq!(listeners.off_namespace("modal-x"), 2);
        assert!(listeners.is_bound(kept));
        assert_eq!(listeners.count(body, None, None), 1);
    }

    #[test]
    fn test_binding_ids_are_not_reused() {
        let mut listeners = Listeners::new();
        let first = listeners.on(ListenerTarget::Document, EventKind::Click, None, Handler::ScrollLock);
        listeners.off(ListenerTarget::Document, None, None);
        let second = listeners.on(ListenerTarget::Document, EventKind::Click, None, Handler::ScrollLock);
        assert_ne!(first, second);
        assert!(!listeners.is_bound(first));
        assert!(!listeners.is_empty());
    }
}
