//! Touch scroll lock for full-page overlays

use crate::dom::NodeId;
use crate::event::{DomEvent, EventKind};
use crate::host::Host;
use crate::listeners::{Handler, ListenerTarget};

fn lock_targets(host: &Host, target: Option<NodeId>) -> Vec<NodeId> {
    match target {
        Some(target) => vec![target],
        None => vec![host.doc.html(), host.doc.body()],
    }
}

/// Swallow touch-move on `target` (default: `html` and `body`)
pub fn lock_scrolling(host: &mut Host, namespace: &str, target: Option<NodeId>) {
    for node in lock_targets(host, target) {
        host.listeners.on(
            ListenerTarget::Node(node),
            EventKind::TouchMove,
            Some(namespace),
            Handler::ScrollLock,
        );
    }
}

/// Drop everything bound under `namespace` on `target` (default: `html` and `body`)
pub fn unlock_scrolling(host: &mut Host, namespace: &str, target: Option<NodeId>) {
    for node in lock_targets(host, target) {
        host.listeners
            .off(ListenerTarget::Node(node), None, Some(namespace));
    }
}

pub(crate) fn handle_touch_move(event: &mut DomEvent) {
    event.prevent_default();
    event.stop_propagation();
}
