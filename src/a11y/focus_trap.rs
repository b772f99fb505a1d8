//! Focus trap
//!
//! Engaging a trap snapshots the container's first and last focusable
//! descendants and binds three document listeners under the trap's namespace:
//! - focus-in on a boundary arms a key-down handler
//! - focus-out disarms it
//! - the armed key-down wraps Tab from last to first and Shift+Tab from first
//!   to last
//!
//! Tab between interior elements is left to the default traversal. Traps with
//! different namespaces are independent; engaging a namespace that is already
//! engaged replaces its bindings.

use crate::dom::{Document, NodeId, Selector};
use crate::event::{is_shift_tab, is_tab, DomEvent, EventKind};
use crate::host::Host;
use crate::listeners::{Handler, ListenerTarget};
use std::collections::HashMap;
use std::sync::LazyLock;
use tracing::debug;

/// Elements that take part in sequential focus navigation
static FOCUSABLE: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("button, [href], input, select, textarea, [tabindex]").unwrap()
});

/// Visible focusable descendants of `container` in document order
///
/// Anything with a negative `tabindex` is excluded.
pub fn focusable_elements(doc: &Document, container: NodeId) -> Vec<NodeId> {
    doc.query_all(Some(container), &FOCUSABLE)
        .into_iter()
        .filter(|n| !doc.attr(*n, "tabindex").is_some_and(|t| t.trim_start().starts_with('-')))
        .filter(|n| doc.is_visible(*n))
        .collect()
}

/// Arguments to [`trap_focus`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrapOptions {
    pub container: NodeId,
    /// Element focused on engage; the container itself when absent
    pub focus_target: Option<NodeId>,
    pub namespace: Option<String>,
}

impl TrapOptions {
    pub fn new(container: NodeId) -> Self {
        Self {
            container,
            focus_target: None,
            namespace: None,
        }
    }

    pub fn with_focus_target(mut self, target: NodeId) -> Self {
        self.focus_target = Some(target);
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }
}

/// Boundaries recorded when a trap was engaged
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrapSession {
    pub container: NodeId,
    pub first: Option<NodeId>,
    pub last: Option<NodeId>,
}

/// Engaged traps keyed by namespace
#[derive(Debug, Default)]
pub struct FocusTraps {
    sessions: HashMap<String, TrapSession>,
}

impl FocusTraps {
    pub fn get(&self, namespace: &str) -> Option<&TrapSession> {
        self.sessions.get(namespace)
    }

    pub fn is_engaged(&self, namespace: &str) -> bool {
        self.sessions.contains_key(namespace)
    }
}

/// Confine Tab navigation to `options.container`
///
/// Returns the namespace the trap was engaged under.
pub fn trap_focus(host: &mut Host, options: TrapOptions) -> String {
    let namespace = options
        .namespace
        .unwrap_or_else(|| host.config.default_trap_namespace.clone());

    let focusable = focusable_elements(&host.doc, options.container);
    let session = TrapSession {
        container: options.container,
        first: focusable.first().copied(),
        last: focusable.last().copied(),
    };

    host.doc.set_attr(options.container, "tabindex", "-1");
    host.focus(options.focus_target.unwrap_or(options.container));

    host.listeners
        .off(ListenerTarget::Document, None, Some(&namespace));
    host.listeners.on(
        ListenerTarget::Document,
        EventKind::FocusOut,
        Some(&namespace),
        Handler::TrapFocusOut(namespace.clone()),
    );
    host.listeners.on(
        ListenerTarget::Document,
        EventKind::FocusIn,
        Some(&namespace),
        Handler::TrapFocusIn(namespace.clone()),
    );

    debug!(
        namespace = %namespace,
        focusable = focusable.len(),
        "focus trap engaged"
    );
    host.traps.sessions.insert(namespace.clone(), session);
    namespace
}

/// Release the trap bound under `namespace`
pub fn remove_trap_focus(host: &mut Host, container: Option<NodeId>, namespace: Option<&str>) {
    let namespace = namespace
        .map(str::to_string)
        .unwrap_or_else(|| host.config.default_trap_namespace.clone());

    if let Some(container) = container {
        host.doc.remove_attr(container, "tabindex");
    }
    host.listeners
        .off(ListenerTarget::Document, None, Some(&namespace));
    if host.traps.sessions.remove(&namespace).is_some() {
        debug!(namespace = %namespace, "focus trap released");
    }
}

pub(crate) fn handle_focus_in(host: &mut Host, namespace: &str, target: NodeId) {
    let Some(session) = host.traps.get(namespace) else {
        return;
    };
    if session.first != Some(target) && session.last != Some(target) {
        return;
    }
    let armed = host.listeners.count(
        ListenerTarget::Document,
        Some(&EventKind::KeyDown),
        Some(namespace),
    );
    if armed == 0 {
        host.listeners.on(
            ListenerTarget::Document,
            EventKind::KeyDown,
            Some(namespace),
            Handler::TrapKeyDown(namespace.to_string()),
        );
    }
}

pub(crate) fn handle_focus_out(host: &mut Host, namespace: &str) {
    host.listeners.off(
        ListenerTarget::Document,
        Some(&EventKind::KeyDown),
        Some(namespace),
    );
}

pub(crate) fn handle_key_down(host: &mut Host, namespace: &str, event: &mut DomEvent) {
    let Some(key) = event.key else {
        return;
    };
    if !is_tab(&key) {
        return;
    }
    let Some(session) = host.traps.get(namespace).cloned() else {
        return;
    };
    let backwards = is_shift_tab(&key);

    if Some(event.target) == session.last && !backwards {
        event.prevent_default();
        if let Some(first) = session.first {
            host.focus(first);
        }
    }
    if Some(event.target) == session.first && backwards {
        event.prevent_default();
        if let Some(last) = session.last {
            host.focus(last);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuntimeConfig;

    fn dialog() -> (Host, NodeId, Vec<NodeId>) {
        let mut doc = Document::new();
        let container = doc.append_element(doc.body(), "div");
        let input = doc.append_element(container, "input");
        let link = doc.append_element(container, "a");
        doc.set_attr(link, "href", "/account");
        let skipped = doc.append_element(container, "button");
        doc.set_attr(skipped, "tabindex", "-1");
        let hidden = doc.append_element(container, "button");
        doc.set_hidden(hidden, true);
        let custom = doc.append_element(container, "div");
        doc.set_attr(custom, "tabindex", "0");
        (
            Host::new(doc, RuntimeConfig::default()),
            container,
            vec![input, link, custom],
        )
    }

    #[test]
    fn test_focusable_elements_filters_hidden_and_negative() {
        let (host, container, expected) = dialog();
        assert_eq!(focusable_elements(&host.doc, container), expected);
    }

    #[test]
    fn test_engage_records_boundaries_and_marks_container() {
        let (mut host, container, focusable) = dialog();
        let namespace = trap_focus(&mut host, TrapOptions::new(container));

        assert_eq!(namespace, "handleFocus");
        let session = host.traps.get("handleFocus").unwrap();
        assert_eq!(session.first, Some(focusable[0]));
        assert_eq!(session.last, Some(focusable[2]));
        assert_eq!(host.doc.attr(container, "tabindex"), Some("-1"));
        assert_eq!(host.doc.active_element(), Some(container));
        assert_eq!(host.listeners.namespace_len("handleFocus"), 2);
    }

    #[test]
    fn test_engage_twice_rebinds() {
        let (mut host, container, focusable) = dialog();
        let options = TrapOptions::new(container)
            .with_namespace("drawer")
            .with_focus_target(focusable[1]);
        trap_focus(&mut host, options.clone());
        trap_focus(&mut host, options);

        assert_eq!(host.listeners.namespace_len("drawer"), 2);
        assert!(host.traps.is_engaged("drawer"));
        assert_eq!(host.doc.active_element(), Some(focusable[1]));
    }

    #[test]
    fn test_focus_in_arms_only_on_boundaries() {
        let (mut host, container, focusable) = dialog();
        trap_focus(&mut host, TrapOptions::new(container).with_namespace("t"));
        let armed = |host: &Host| {
            host.listeners.count(
                ListenerTarget::Document,
                Some(&EventKind::KeyDown),
                Some("t"),
            )
        };

        handle_focus_in(&mut host, "t", focusable[1]);
        assert_eq!(armed(&host), 0);

        handle_focus_in(&mut host, "t", focusable[2]);
        handle_focus_in(&mut host, "t", focusable[2]);
        assert_eq!(armed(&host), 1);

        handle_focus_out(&mut host, "t");
        assert_eq!(armed(&host), 0);
    }

    #[test]
    fn test_remove_trap_focus_clears_everything() {
        let (mut host, container, focusable) = dialog();
        trap_focus(&mut host, TrapOptions::new(container).with_namespace("t"));
        handle_focus_in(&mut host, "t", focusable[0]);

        remove_trap_focus(&mut host, Some(container), Some("t"));

        assert!(!host.doc.has_attr(container, "tabindex"));
        assert_eq!(host.listeners.namespace_len("t"), 0);
        assert!(!host.traps.is_engaged("t"));
    }

    #[test]
    fn test_empty_container_never_redirects() {
        let mut doc = Document::new();
        let container = doc.append_element(doc.body(), "div");
        let mut host = Host::new(doc, RuntimeConfig::default());
        trap_focus(&mut host, TrapOptions::new(container));

        let session = host.traps.get("handleFocus").unwrap();
        assert_eq!(session.first, None);
        assert_eq!(host.doc.active_element(), Some(container));

        let key = crossterm::event::KeyEvent::new(
            crossterm::event::KeyCode::Tab,
            crossterm::event::KeyModifiers::NONE,
        );
        let mut event = DomEvent::new(EventKind::KeyDown, container).with_key(key);
        handle_key_down(&mut host, "handleFocus", &mut event);
        assert!(!event.is_default_prevented());
    }
}
