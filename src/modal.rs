//! Modal state machine
//!
//! A modal is bound to one container element and is either closed or open.
//! Opening applies the open classes, traps focus inside the container and
//! binds Escape / backdrop listeners under the modal's own namespace; closing
//! undoes all of it and hands focus back to the control that opened it.
//!
//! Notifications `modalOpen.<id>` and `modalClose.<id>` are emitted on the
//! body. A `drawerOpen` on the body closes the modal.

use crate::a11y::focus_trap::{remove_trap_focus, trap_focus, TrapOptions};
use crate::dom::{NodeId, Selector};
use crate::event::{DomEvent, EventKind};
use crate::host::Host;
use crate::listeners::{Handler, ListenerTarget};
use crate::scheduler::Task;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Options recognised by [`Modal`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ModalConfig {
    /// Close triggers inside the modal
    pub close: String,
    /// Open triggers anywhere on the page; `.js-modal-open-<name>` when unset
    pub open: Option<String>,
    /// Class on the modal while open
    pub open_class: String,
    /// Class on `html` and `body` while open
    pub body_open_class: String,
    /// Whether a click outside the content region closes the modal
    pub close_off_content_click: bool,
    /// Element focused on open; the modal container when unset
    pub focus_on_open: Option<String>,
    /// Content region that swallows its own clicks
    pub content: String,
}

impl Default for ModalConfig {
    fn default() -> Self {
        Self {
            close: ".js-modal-close".to_string(),
            open: None,
            open_class: "modal--is-active".to_string(),
            body_open_class: "modal-open".to_string(),
            close_off_content_click: true,
            focus_on_open: None,
            content: ".modal__inner".to_string(),
        }
    }
}

/// Index of a modal in [`Modals`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModalHandle(usize);

impl ModalHandle {
    #[cfg(test)]
    pub(crate) fn from_index(index: usize) -> Self {
        Self(index)
    }
}

/// Parse a configured selector, logging and dropping it when unsupported
fn parse_option(source: &str, option: &str) -> Option<Selector> {
    match Selector::parse(source) {
        Ok(selector) => Some(selector),
        Err(err) => {
            warn!(option, error = %err, "ignoring modal selector");
            None
        }
    }
}

#[derive(Debug)]
pub struct Modal {
    handle: ModalHandle,
    id: String,
    node: NodeId,
    content: Option<NodeId>,
    focus_on_open: NodeId,
    config: ModalConfig,
    is_open: bool,
    active_source: Option<NodeId>,
}

impl Modal {
    /// Bind a modal to the element with `id`; `None` if there is no such element
    fn new(host: &mut Host, handle: ModalHandle, id: &str, name: &str, config: ModalConfig) -> Option<Self> {
        let node = host.doc.get_element_by_id(id)?;

        let content = parse_option(&config.content, "content")
            .and_then(|s| host.doc.query(Some(node), &s));
        let focus_on_open = config
            .focus_on_open
            .as_deref()
            .and_then(|s| parse_option(s, "focusOnOpen"))
            .and_then(|s| host.doc.query(None, &s))
            .unwrap_or(node);

        let modal = Self {
            handle,
            id: id.to_string(),
            node,
            content,
            focus_on_open,
            config: ModalConfig {
                open: Some(
                    config
                        .open
                        .clone()
                        .unwrap_or_else(|| format!(".js-modal-open-{}", name)),
                ),
                ..config
            },
            is_open: false,
            active_source: None,
        };
        modal.init(host);
        Some(modal)
    }

    /// Wire the triggers that live for the page's lifetime
    fn init(&self, host: &mut Host) {
        let init_namespace = self.init_namespace();

        if let Some(open) = self.config.open.as_deref().and_then(|s| parse_option(s, "open")) {
            for trigger in host.doc.query_all(None, &open) {
                host.doc.set_attr(trigger, "aria-expanded", "false");
                host.listeners.on(
                    ListenerTarget::Node(trigger),
                    EventKind::Click,
                    Some(&init_namespace),
                    Handler::ModalOpen(self.handle),
                );
            }
        }

        if let Some(close) = parse_option(&self.config.close, "close") {
            for trigger in host.doc.query_all(Some(self.node), &close) {
                host.listeners.on(
                    ListenerTarget::Node(trigger),
                    EventKind::Click,
                    Some(&init_namespace),
                    Handler::ModalClose(self.handle),
                );
            }
        }

        let body = host.doc.body();
        host.listeners.on(
            ListenerTarget::Node(body),
            EventKind::Custom("drawerOpen".to_string()),
            Some(&init_namespace),
            Handler::ModalDrawerOpen(self.handle),
        );
    }

    pub fn handle(&self) -> ModalHandle {
        self.handle
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn config(&self) -> &ModalConfig {
        &self.config
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    /// Control that opened the modal, focused again on close
    pub fn active_source(&self) -> Option<NodeId> {
        self.active_source
    }

    /// Namespace of the listeners bound while open
    pub fn namespace(&self) -> String {
        format!("modal-{}", self.id)
    }

    /// Namespace of the focus trap engaged while open
    pub fn trap_namespace(&self) -> String {
        format!("modal_focus-{}", self.id)
    }

    fn init_namespace(&self) -> String {
        format!("modal-init-{}", self.id)
    }

    /// Open the modal; `trigger` is the click that asked for it, if any
    pub fn open(&mut self, host: &mut Host, trigger: Option<&mut DomEvent>) {
        if self.is_open {
            return;
        }

        if let Some(event) = trigger {
            event.prevent_default();
            // Keeps the click from reaching the backdrop handler bound below
            event.stop_propagation();
            if let ListenerTarget::Node(source) = event.current_target {
                host.doc.set_attr(source, "aria-expanded", "true");
                self.active_source = Some(source);
            }
        }

        host.doc.add_class(self.node, &self.config.open_class);
        for root in [host.doc.html(), host.doc.body()] {
            host.doc.add_class(root, &self.config.body_open_class);
        }
        host.scheduler.defer(Task::AnimateModal(self.handle));

        self.is_open = true;

        trap_focus(
            host,
            TrapOptions::new(self.node)
                .with_focus_target(self.focus_on_open)
                .with_namespace(self.trap_namespace()),
        );

        debug!(modal = %self.id, "modal opened");
        host.emit(format!("modalOpen.{}", self.id));

        self.bind_events(host);
    }

    pub fn close(&mut self, host: &mut Host) {
        if !self.is_open {
            return;
        }

        // Commit pending field changes before the content is hidden
        host.blur();

        host.doc.remove_class(self.node, &self.config.open_class);
        host.doc.remove_class(self.node, &host.config.animate_class);
        for root in [host.doc.html(), host.doc.body()] {
            host.doc.remove_class(root, &self.config.body_open_class);
        }

        self.is_open = false;

        remove_trap_focus(host, Some(self.node), Some(&self.trap_namespace()));

        if let Some(source) = self.active_source {
            if host.doc.attr(source, "aria-expanded") == Some("true") {
                host.doc.set_attr(source, "aria-expanded", "false");
                host.focus(source);
            }
        }

        debug!(modal = %self.id, "modal closed");
        host.emit(format!("modalClose.{}", self.id));

        self.unbind_events(host);
    }

    /// Second phase of open, run one scheduling turn later
    fn animate_in(&self, host: &mut Host) {
        if self.is_open {
            host.doc.add_class(self.node, &host.config.animate_class);
        }
    }

    fn bind_events(&self, host: &mut Host) {
        let namespace = self.namespace();

        for root in [host.doc.html(), host.doc.body()] {
            host.listeners.on(
                ListenerTarget::Node(root),
                EventKind::KeyUp,
                Some(&namespace),
                Handler::ModalEscape(self.handle),
            );
        }

        if self.config.close_off_content_click {
            host.listeners.on(
                ListenerTarget::Node(self.node),
                EventKind::Click,
                Some(&namespace),
                Handler::ModalBackdrop(self.handle),
            );
            if let Some(content) = self.content {
                host.listeners.on(
                    ListenerTarget::Node(content),
                    EventKind::Click,
                    Some(&namespace),
                    Handler::ModalContentGuard,
                );
            }
        }
    }

    fn unbind_events(&self, host: &mut Host) {
        host.listeners.off_namespace(&self.namespace());
    }
}

/// Every modal created on the page
#[derive(Debug, Default)]
pub struct Modals {
    entries: Vec<Modal>,
}

impl Modals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a modal to the element with `id`
    ///
    /// Returns `None` when the element does not exist; nothing is wired then.
    pub fn create(
        &mut self,
        host: &mut Host,
        id: &str,
        name: &str,
        config: ModalConfig,
    ) -> Option<ModalHandle> {
        let handle = ModalHandle(self.entries.len());
        let modal = Modal::new(host, handle, id, name, config)?;
        self.entries.push(modal);
        Some(handle)
    }

    pub fn get(&self, handle: ModalHandle) -> Option<&Modal> {
        self.entries.get(handle.0)
    }

    /// First modal bound to the element with `id`
    pub fn find(&self, id: &str) -> Option<&Modal> {
        self.entries.iter().find(|m| m.id == id)
    }

    pub fn open(&mut self, handle: ModalHandle, host: &mut Host, trigger: Option<&mut DomEvent>) {
        if let Some(modal) = self.entries.get_mut(handle.0) {
            modal.open(host, trigger);
        }
    }

    pub fn close(&mut self, handle: ModalHandle, host: &mut Host) {
        if let Some(modal) = self.entries.get_mut(handle.0) {
            modal.close(host);
        }
    }

    pub(crate) fn animate_in(&self, handle: ModalHandle, host: &mut Host) {
        if let Some(modal) = self.entries.get(handle.0) {
            modal.animate_in(host);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
