//! Host context - the state every component works against
//!
//! Bundles the document, the listener table, the scheduler, focus-trap
//! sessions, pending completions and the notification outbox. Components
//! receive `&mut Host`; only the page dispatches events.

use crate::a11y::focus_trap::FocusTraps;
use crate::a11y::motion::Completions;
use crate::config::RuntimeConfig;
use crate::dom::{Document, NodeId};
use crate::event::{DomEvent, EventKind};
use crate::listeners::Listeners;
use crate::scheduler::Scheduler;
use chrono::{DateTime, Local};
use std::collections::VecDeque;
use tracing::trace;

/// An outward notification fired on the body
#[derive(Debug, Clone)]
pub struct Notification {
    pub name: String,
    pub emitted_at: DateTime<Local>,
}

impl Notification {
    pub fn formatted_time(&self) -> String {
        self.emitted_at.format("%H:%M:%S%.3f").to_string()
    }
}

#[derive(Debug)]
pub struct Host {
    pub doc: Document,
    pub listeners: Listeners,
    pub scheduler: Scheduler,
    pub traps: FocusTraps,
    pub completions: Completions,
    pub config: RuntimeConfig,
    notifications: Vec<Notification>,
    queued: VecDeque<DomEvent>,
}

impl Host {
    pub fn new(doc: Document, config: RuntimeConfig) -> Self {
        Self {
            doc,
            listeners: Listeners::new(),
            scheduler: Scheduler::new(),
            traps: FocusTraps::default(),
            completions: Completions::default(),
            config,
            notifications: Vec::new(),
            queued: VecDeque::new(),
        }
    }

    /// Move focus to `node`
    ///
    /// The active element changes immediately; focus-out/focus-in are queued
    /// and dispatched once the current handler has returned.
    pub fn focus(&mut self, node: NodeId) {
        let previous = self.doc.active_element();
        if previous == Some(node) {
            return;
        }
        if let Some(previous) = previous {
            self.queued
                .push_back(DomEvent::new(EventKind::FocusOut, previous));
        }
        self.doc.set_active(Some(node));
        self.queued.push_back(DomEvent::new(EventKind::FocusIn, node));
    }

    /// Drop focus from whatever element holds it
    pub fn blur(&mut self) {
        if let Some(previous) = self.doc.active_element() {
            self.doc.set_active(None);
            self.queued.push_back(DomEvent::new(EventKind::Blur, previous));
            self.queued
                .push_back(DomEvent::new(EventKind::FocusOut, previous));
        }
    }

    /// Record a notification and fire it as a custom event on the body
    pub fn emit(&mut self, name: String) {
        trace!(notification = %name, "emit");
        let body = self.doc.body();
        self.queued
            .push_back(DomEvent::new(EventKind::Custom(name.clone()), body));
        self.notifications.push(Notification {
            name,
            emitted_at: Local::now(),
        });
    }

    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    pub(crate) fn next_queued(&mut self) -> Option<DomEvent> {
        self.queued.pop_front()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_focus_queues_out_then_in() {
        let mut doc = Document::new();
        let a = doc.append_element(doc.body(), "input");
        let b = doc.append_element(doc.body(), "input");
        let mut host = Host::new(doc, RuntimeConfig::default());

        host.focus(a);
        host.focus(b);
        host.focus(b);

        let kinds: Vec<(EventKind, NodeId)> =
            std::iter::from_fn(|| host.next_queued().map(|e| (e.kind, e.target))).collect();
        assert_eq!(
            kinds,
            vec![
                (EventKind::FocusIn, a),
                (EventKind::FocusOut, a),
                (EventKind::FocusIn, b),
            ]
        );
        assert_eq!(host.doc.active_element(), Some(b));
    }

    #[test]
    fn test_blur_without_focus_is_noop() {
        let mut host = Host::new(Document::new(), RuntimeConfig::default());
        host.blur();
        assert!(host.next_queued().is_none());
    }

    #[test]
    fn test_emit_records_and_queues() {
        let mut host = Host::new(Document::new(), RuntimeConfig::default());
        host.emit("modalOpen.LoginModal".to_string());
        assert_eq!(host.notifications().len(), 1);
        assert_eq!(host.notifications()[0].name, "modalOpen.LoginModal");
        let queued = host.next_queued().unwrap();
        assert_eq!(queued.kind, EventKind::Custom("modalOpen.LoginModal".to_string()));
        assert_eq!(queued.target, host.doc.body());
    }
}
