//! Page runtime - owns the host, the modals and the section controller
//!
//! Every host input (lifecycle event, click, key press, focus change, clock
//! advance) enters through [`Page`]. Each input runs to completion: its
//! handlers run, then any focus events they queued are dispatched, before
//! the call returns. Deferred tasks only run from [`Page::tick`] and
//! [`Page::advance`].

use crate::a11y::focus_trap::{self, focusable_elements, TrapOptions, TrapSession};
use crate::a11y::motion::{self, Completion, Motion};
use crate::a11y::scroll_lock;
use crate::config::RuntimeConfig;
use crate::dom::{Document, NodeId};
use crate::error::RuntimeError;
use crate::event::{is_escape, is_shift_tab, is_tab, DomEvent, EventKind, LifecycleEvent};
use crate::host::{Host, Notification};
use crate::listeners::{Handler, ListenerTarget};
use crate::modal::{Modal, ModalConfig, ModalHandle, Modals};
use crate::refresh::{LayoutRefresh, NoopRefresh};
use crate::scheduler::Task;
use crate::sections::{SectionConstructor, SectionInstance, Sections};
use crossterm::event::KeyEvent;
use tracing::{debug, trace};

pub struct Page {
    host: Host,
    modals: Modals,
    sections: Sections,
    refresh: Box<dyn LayoutRefresh>,
}

impl std::fmt::Debug for Page {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Page")
            .field("host", &self.host)
            .field("modals", &self.modals)
            .field("sections", &self.sections)
            .finish_non_exhaustive()
    }
}

impl Page {
    pub fn new(doc: Document, config: RuntimeConfig) -> Self {
        Self {
            host: Host::new(doc, config),
            modals: Modals::new(),
            sections: Sections::new(),
            refresh: Box::new(NoopRefresh),
        }
    }

    /// Use `refresh` for the re-measure requested after section loads
    pub fn with_layout_refresh(mut self, refresh: Box<dyn LayoutRefresh>) -> Self {
        self.refresh = refresh;
        self
    }

    pub fn document(&self) -> &Document {
        &self.host.doc
    }

    /// Mutable access for markup changes (e.g. the editor inserting a section)
    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.host.doc
    }

    pub fn host(&self) -> &Host {
        &self.host
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.host.config
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Sections
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn sections(&self) -> &Sections {
        &self.sections
    }

    /// Register a section type; see [`Sections::register`]
    pub fn register(
        &mut self,
        section_type: &str,
        constructor: SectionConstructor,
        scope: Option<NodeId>,
    ) -> usize {
        let created =
            self.sections
                .register(&mut self.host, &mut self.modals, section_type, constructor, scope);
        self.drain();
        created
    }

    pub fn create_instance(
        &mut self,
        container: NodeId,
        constructor: Option<SectionConstructor>,
        custom_scope: bool,
    ) -> Option<usize> {
        let index = self.sections.create_instance(
            &mut self.host,
            &mut self.modals,
            container,
            constructor,
            custom_scope,
        );
        self.drain();
        index
    }

    pub fn instances(&self) -> &[SectionInstance] {
        self.sections.instances()
    }

    pub fn find_instance(&self, id: &str) -> Option<&SectionInstance> {
        self.sections.find_instance(id)
    }

    pub fn reinit_section(&mut self, section_type: &str) {
        self.sections
            .reinit_section(&mut self.host, &mut self.modals, section_type);
        self.drain();
    }

    /// Create and load sub-sections inside `scope`, then re-measure layout
    pub fn load_sub_sections(&mut self, scope: Option<NodeId>) -> usize {
        let created = self
            .sections
            .load_sub_sections(&mut self.host, &mut self.modals, scope);
        self.refresh.refresh_hard();
        self.drain();
        created
    }

    pub fn handle_lifecycle(&mut self, event: LifecycleEvent) {
        debug!(kind = %event.kind(), section = %event.section_id(), "lifecycle event");
        self.sections.handle(
            &mut self.host,
            &mut self.modals,
            self.refresh.as_mut(),
            &event,
        );
        self.drain();
    }

    /// Deliver a named lifecycle event with a JSON payload
    ///
    /// `name` may carry the `shopify:` prefix.
    pub fn fire(
        &mut self,
        name: &str,
        target: NodeId,
        detail: serde_json::Value,
    ) -> Result<(), RuntimeError> {
        let event = LifecycleEvent::parse(name, target, detail)?;
        self.handle_lifecycle(event);
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Modals
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn create_modal(&mut self, id: &str, name: &str, config: ModalConfig) -> Option<ModalHandle> {
        self.modals.create(&mut self.host, id, name, config)
    }

    /// Open without a triggering click; focus is not handed back on close
    pub fn open_modal(&mut self, handle: ModalHandle) {
        self.modals.open(handle, &mut self.host, None);
        self.drain();
    }

    pub fn close_modal(&mut self, handle: ModalHandle) {
        self.modals.close(handle, &mut self.host);
        self.drain();
    }

    pub fn modal(&self, handle: ModalHandle) -> Option<&Modal> {
        self.modals.get(handle)
    }

    pub fn modals(&self) -> &Modals {
        &self.modals
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Accessibility
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn engage_trap(&mut self, options: TrapOptions) -> String {
        let namespace = focus_trap::trap_focus(&mut self.host, options);
        self.drain();
        namespace
    }

    pub fn disengage_trap(&mut self, container: Option<NodeId>, namespace: Option<&str>) {
        focus_trap::remove_trap_focus(&mut self.host, container, namespace);
        self.drain();
    }

    pub fn trap_session(&self, namespace: &str) -> Option<&TrapSession> {
        self.host.traps.get(namespace)
    }

    pub fn await_animation(&mut self, node: NodeId) -> Completion {
        motion::await_motion(&mut self.host, node, Motion::Animation)
    }

    pub fn await_transition(&mut self, node: NodeId) -> Completion {
        motion::await_motion(&mut self.host, node, Motion::Transition)
    }

    pub fn lock_scrolling(&mut self, namespace: &str, target: Option<NodeId>) {
        scroll_lock::lock_scrolling(&mut self.host, namespace, target);
    }

    pub fn unlock_scrolling(&mut self, namespace: &str, target: Option<NodeId>) {
        scroll_lock::unlock_scrolling(&mut self.host, namespace, target);
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Host input
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn focus(&mut self, node: NodeId) {
        self.host.focus(node);
        self.drain();
    }

    pub fn blur(&mut self) {
        self.host.blur();
        self.drain();
    }

    /// Click `node`; returns the event after dispatch
    pub fn click(&mut self, node: NodeId) -> DomEvent {
        self.trigger(node, EventKind::Click)
    }

    /// Dispatch `kind` at `node` and drain whatever it queued
    pub fn trigger(&mut self, node: NodeId, kind: EventKind) -> DomEvent {
        let event = self.dispatch(DomEvent::new(kind, node));
        self.drain();
        event
    }

    /// Press and release `key` on the focused element (the body when nothing
    /// has focus)
    ///
    /// An unprevented Tab moves focus to the next focusable element on the
    /// page, wrapping at either end. Returns the key-down event.
    pub fn press_key(&mut self, key: KeyEvent) -> DomEvent {
        let target = self.key_target();
        let down = self.dispatch(DomEvent::new(EventKind::KeyDown, target).with_key(key));
        self.drain();

        if is_tab(&key) && !down.is_default_prevented() {
            self.move_focus(is_shift_tab(&key));
        }

        let target = self.key_target();
        self.dispatch(DomEvent::new(EventKind::KeyUp, target).with_key(key));
        self.drain();
        down
    }

    fn key_target(&self) -> NodeId {
        self.host
            .doc
            .active_element()
            .unwrap_or_else(|| self.host.doc.body())
    }

    /// Sequential focus navigation
    ///
    /// Continues from the focused element's position in the document, even
    /// when that element is not itself tabbable. Wraps at either end.
    fn move_focus(&mut self, backwards: bool) {
        let doc = &self.host.doc;
        let order = focusable_elements(doc, doc.html());
        let positions = doc.document_order();
        let rank = |node: NodeId| positions.iter().position(|n| *n == node);
        let current = doc.active_element().and_then(rank);

        let next = match (current, backwards) {
            (None, false) => order.first(),
            (None, true) => order.last(),
            (Some(at), false) => order
                .iter()
                .find(|n| rank(**n).is_some_and(|r| r > at))
                .or_else(|| order.first()),
            (Some(at), true) => order
                .iter()
                .rev()
                .find(|n| rank(**n).is_some_and(|r| r < at))
                .or_else(|| order.last()),
        };
        if let Some(next) = next.copied() {
            self.focus(next);
        }
    }

    /// Run zero-delay tasks
    pub fn tick(&mut self) {
        let now = self.host.scheduler.now_ms();
        self.run_tasks(now);
    }

    /// Move the clock forward by `ms`, running every task that falls due
    pub fn advance(&mut self, ms: u64) {
        let until = self.host.scheduler.now_ms().saturating_add(ms);
        self.run_tasks(until);
    }

    fn run_tasks(&mut self, until_ms: u64) {
        while let Some(task) = self.host.scheduler.pop_due(until_ms) {
            trace!(?task, "running task");
            match task {
                Task::AnimateModal(handle) => self.modals.animate_in(handle, &mut self.host),
                Task::ExpireCompletion(id) => motion::expire(&mut self.host, id),
            }
            self.drain();
        }
        self.host.scheduler.set_now(until_ms);
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Notifications
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn notifications(&self) -> &[Notification] {
        self.host.notifications()
    }

    pub fn notification_count(&self, name: &str) -> usize {
        self.host
            .notifications()
            .iter()
            .filter(|n| n.name == name)
            .count()
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Dispatch
    // ═══════════════════════════════════════════════════════════════════════════

    /// Run handlers from the target outwards
    ///
    /// Handlers are looked up per target when the event gets there, and a
    /// binding removed by an earlier handler is skipped.
    fn dispatch(&mut self, mut event: DomEvent) -> DomEvent {
        let mut path = vec![ListenerTarget::Node(event.target)];
        if event.kind.bubbles() {
            path.extend(
                self.host
                    .doc
                    .ancestors(event.target)
                    .into_iter()
                    .map(ListenerTarget::Node),
            );
            path.push(ListenerTarget::Document);
        }

        for current in path {
            event.current_target = current;
            for (id, handler) in self.host.listeners.handlers_for(current, &event.kind) {
                if !self.host.listeners.is_bound(id) {
                    continue;
                }
                self.run_handler(handler, &mut event);
                if event.is_immediate_propagation_stopped() {
                    break;
                }
            }
            if event.is_propagation_stopped() {
                break;
            }
        }
        event
    }

    fn run_handler(&mut self, handler: Handler, event: &mut DomEvent) {
        trace!(?handler, kind = %event.kind, "handler");
        match handler {
            Handler::TrapFocusIn(namespace) => {
                focus_trap::handle_focus_in(&mut self.host, &namespace, event.target)
            }
            Handler::TrapFocusOut(namespace) => {
                focus_trap::handle_focus_out(&mut self.host, &namespace)
            }
            Handler::TrapKeyDown(namespace) => {
                focus_trap::handle_key_down(&mut self.host, &namespace, event)
            }
            Handler::ModalOpen(handle) => self.modals.open(handle, &mut self.host, Some(event)),
            Handler::ModalClose(handle)
            | Handler::ModalBackdrop(handle)
            | Handler::ModalDrawerOpen(handle) => self.modals.close(handle, &mut self.host),
            Handler::ModalEscape(handle) => {
                if event.key.is_some_and(|key| is_escape(&key)) {
                    self.modals.close(handle, &mut self.host);
                }
            }
            Handler::ModalContentGuard => event.stop_immediate_propagation(),
            Handler::Completion(id) => motion::handle_end_event(&mut self.host, id, event.target),
            Handler::ScrollLock => scroll_lock::handle_touch_move(event),
        }
    }

    /// Dispatch queued focus and notification events until none remain
    fn drain(&mut self) {
        while let Some(event) = self.host.next_queued() {
            self.dispatch(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::a11y::CompletionOutcome;
    use crossterm::event::{KeyCode, KeyModifiers};
    use futures::FutureExt;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    struct Newsletter {
        page: Page,
        handle: ModalHandle,
        trigger: NodeId,
        modal: NodeId,
        inner: NodeId,
        field: NodeId,
        close: NodeId,
    }

    fn newsletter(config: RuntimeConfig) -> Newsletter {
        let mut doc = Document::new();
        let body = doc.body();
        let trigger = doc.append_element(body, "button");
        doc.add_class(trigger, "js-modal-open-newsletter");
        let modal = doc.append_element(body, "div");
        doc.set_attr(modal, "id", "Newsletter");
        let inner = doc.append_element(modal, "div");
        doc.add_class(inner, "modal__inner");
        let field = doc.append_element(inner, "input");
        let close = doc.append_element(inner, "button");
        doc.add_class(close, "js-modal-close");

        let mut page = Page::new(doc, config);
        let handle = page
            .create_modal("Newsletter", "newsletter", ModalConfig::default())
            .expect("modal container exists");
        Newsletter {
            page,
            handle,
            trigger,
            modal,
            inner,
            field,
            close,
        }
    }

    #[test]
    fn test_open_is_idempotent() {
        let mut n = newsletter(RuntimeConfig::default());
        n.page.click(n.trigger);
        n.page.click(n.trigger);
        n.page.open_modal(n.handle);

        assert_eq!(n.page.notification_count("modalOpen.Newsletter"), 1);
        assert!(n.page.modal(n.handle).is_some_and(|m| m.is_open()));
    }

    #[test]
    fn test_open_close_round_trip() {
        let mut n = newsletter(RuntimeConfig::default());

        let click = n.page.click(n.trigger);
        assert!(click.is_default_prevented());
        let doc = n.page.document();
        assert!(doc.has_class(n.modal, "modal--is-active"));
        assert!(doc.has_class(doc.html(), "modal-open"));
        assert!(doc.has_class(doc.body(), "modal-open"));
        assert!(!doc.has_class(n.modal, "aos-animate"));
        assert_eq!(doc.attr(n.trigger, "aria-expanded"), Some("true"));
        assert_eq!(doc.active_element(), Some(n.modal));

        n.page.tick();
        assert!(n.page.document().has_class(n.modal, "aos-animate"));

        n.page.click(n.close);
        let doc = n.page.document();
        assert!(!doc.has_class(n.modal, "modal--is-active"));
        assert!(!doc.has_class(n.modal, "aos-animate"));
        assert!(!doc.has_class(doc.body(), "modal-open"));
        assert!(!doc.has_attr(n.modal, "tabindex"));
        assert_eq!(doc.attr(n.trigger, "aria-expanded"), Some("false"));
        assert_eq!(doc.active_element(), Some(n.trigger));
        assert!(n.page.trap_session("modal_focus-Newsletter").is_none());
        assert_eq!(n.page.host().listeners.namespace_len("modal-Newsletter"), 0);
        assert_eq!(n.page.host().listeners.namespace_len("modal_focus-Newsletter"), 0);

        let names: Vec<&str> = n.page.notifications().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["modalOpen.Newsletter", "modalClose.Newsletter"]);
    }

    #[test]
    fn test_close_when_closed_is_noop() {
        let mut n = newsletter(RuntimeConfig::default());
        n.page.close_modal(n.handle);
        assert!(n.page.notifications().is_empty());
    }

    #[test]
    fn test_programmatic_open_keeps_focus_on_close() {
        let mut n = newsletter(RuntimeConfig::default());
        n.page.open_modal(n.handle);
        n.page.close_modal(n.handle);

        assert_eq!(n.page.document().active_element(), None);
        assert_eq!(n.page.document().attr(n.trigger, "aria-expanded"), Some("false"));
    }

    #[test]
    fn test_first_tab_after_open_stays_in_modal() {
        let mut n = newsletter(RuntimeConfig::default());
        n.page.click(n.trigger);
        assert_eq!(n.page.document().active_element(), Some(n.modal));

        n.page.press_key(key(KeyCode::Tab));
        assert_eq!(n.page.document().active_element(), Some(n.field));
        n.page.press_key(key(KeyCode::Tab));
        assert_eq!(n.page.document().active_element(), Some(n.close));
        n.page.press_key(key(KeyCode::Tab));
        assert_eq!(n.page.document().active_element(), Some(n.field));
    }

    #[test]
    fn test_escape_closes_and_other_keys_do_not() {
        let mut n = newsletter(RuntimeConfig::default());
        n.page.click(n.trigger);

        n.page.press_key(key(KeyCode::Char('a')));
        assert!(n.page.modal(n.handle).is_some_and(|m| m.is_open()));

        n.page.press_key(key(KeyCode::Esc));
        assert!(n.page.modal(n.handle).is_some_and(|m| !m.is_open()));
        assert_eq!(n.page.notification_count("modalClose.Newsletter"), 1);
    }

    #[test]
    fn test_content_click_is_guarded_backdrop_click_closes() {
        let mut n = newsletter(RuntimeConfig::default());
        n.page.click(n.trigger);

        n.page.click(n.field);
        n.page.click(n.inner);
        assert!(n.page.modal(n.handle).is_some_and(|m| m.is_open()));

        n.page.click(n.modal);
        assert!(n.page.modal(n.handle).is_some_and(|m| !m.is_open()));
    }

    #[test]
    fn test_drawer_open_closes_modal() {
        let mut n = newsletter(RuntimeConfig::default());
        n.page.click(n.trigger);
        let body = n.page.document().body();

        n.page
            .trigger(body, EventKind::Custom("drawerOpen".to_string()));

        assert!(n.page.modal(n.handle).is_some_and(|m| !m.is_open()));
    }

    #[test]
    fn test_tab_wraps_inside_trap() {
        let mut doc = Document::new();
        let body = doc.body();
        let before = doc.append_element(body, "button");
        let dialog = doc.append_element(body, "div");
        let f0 = doc.append_element(dialog, "input");
        let f1 = doc.append_element(dialog, "select");
        let f2 = doc.append_element(dialog, "button");
        let after = doc.append_element(body, "button");
        let mut page = Page::new(doc, RuntimeConfig::default());

        let namespace = page.engage_trap(TrapOptions::new(dialog).with_focus_target(f0));
        assert_eq!(namespace, "handleFocus");

        let mut visited = vec![page.document().active_element()];
        for _ in 0..3 {
            page.press_key(key(KeyCode::Tab));
            visited.push(page.document().active_element());
        }
        assert_eq!(visited, vec![Some(f0), Some(f1), Some(f2), Some(f0)]);

        let back = page.press_key(key(KeyCode::BackTab));
        assert!(back.is_default_prevented());
        assert_eq!(page.document().active_element(), Some(f2));

        page.disengage_trap(Some(dialog), None);
        page.press_key(key(KeyCode::Tab));
        assert_eq!(page.document().active_element(), Some(after));
        page.press_key(key(KeyCode::Tab));
        assert_eq!(page.document().active_element(), Some(before));
    }

    #[test]
    fn test_concurrent_traps_do_not_interfere() {
        let mut doc = Document::new();
        let body = doc.body();
        let first = doc.append_element(body, "div");
        let a0 = doc.append_element(first, "input");
        let a1 = doc.append_element(first, "button");
        let second = doc.append_element(body, "div");
        let b0 = doc.append_element(second, "input");
        let b1 = doc.append_element(second, "button");
        let mut page = Page::new(doc, RuntimeConfig::default());

        page.engage_trap(TrapOptions::new(first).with_focus_target(a0).with_namespace("a"));
        page.engage_trap(TrapOptions::new(second).with_focus_target(b0).with_namespace("b"));

        page.focus(a1);
        page.press_key(key(KeyCode::Tab));
        assert_eq!(page.document().active_element(), Some(a0));

        page.focus(b1);
        page.press_key(key(KeyCode::Tab));
        assert_eq!(page.document().active_element(), Some(b0));
        page.press_key(key(KeyCode::BackTab));
        assert_eq!(page.document().active_element(), Some(b1));

        page.disengage_trap(Some(first), Some("a"));
        assert!(page.trap_session("a").is_none());
        assert!(page.trap_session("b").is_some());
        let armed = |page: &Page| {
            page.host()
                .listeners
                .count(ListenerTarget::Document, Some(&EventKind::KeyDown), Some("b"))
        };
        assert_eq!(armed(&page), 1);

        page.focus(a1);
        page.press_key(key(KeyCode::Tab));
        assert_eq!(page.document().active_element(), Some(b0));

        page.focus(b1);
        assert_eq!(armed(&page), 1);
        page.press_key(key(KeyCode::Tab));
        assert_eq!(page.document().active_element(), Some(b0));
    }

    #[test]
    fn test_awaiter_ignores_bubbled_end_events() {
        let mut doc = Document::new();
        let panel = doc.append_element(doc.body(), "div");
        let child = doc.append_element(panel, "span");
        doc.set_style(panel, "animation-duration", "0.3s");
        let mut page = Page::new(doc, RuntimeConfig::default());

        let done = page.await_animation(panel);
        page.trigger(child, EventKind::AnimationEnd);
        assert_eq!(done.clone().now_or_never(), None);

        page.trigger(panel, EventKind::AnimationEnd);
        assert_eq!(done.now_or_never(), Some(CompletionOutcome::Finished));
        assert!(page.host().listeners.is_empty());
    }

    #[test]
    fn test_awaiter_without_duration_is_ready() {
        let mut doc = Document::new();
        let panel = doc.append_element(doc.body(), "div");
        let mut page = Page::new(doc, RuntimeConfig::default());

        assert!(page.await_transition(panel).is_complete());
    }

    #[test]
    fn test_awaiter_times_out_when_configured() {
        let mut doc = Document::new();
        let panel = doc.append_element(doc.body(), "div");
        doc.set_style(panel, "transition-duration", "200ms");
        let config = RuntimeConfig {
            completion_timeout_ms: Some(500),
            ..RuntimeConfig::default()
        };
        let mut page = Page::new(doc, config);

        let done = page.await_transition(panel);
        page.advance(499);
        assert!(!done.is_complete());
        page.advance(1);
        assert_eq!(done.outcome(), Some(CompletionOutcome::TimedOut));
    }

    #[test]
    fn test_scroll_lock_swallows_touch_move() {
        let mut doc = Document::new();
        let content = doc.append_element(doc.body(), "div");
        let mut page = Page::new(doc, RuntimeConfig::default());

        page.lock_scrolling("drawer", None);
        assert!(page.trigger(content, EventKind::TouchMove).is_default_prevented());

        page.unlock_scrolling("drawer", None);
        assert!(!page.trigger(content, EventKind::TouchMove).is_default_prevented());
    }

    #[test]
    fn test_fire_validates_event_and_payload() {
        let mut page = Page::new(Document::new(), RuntimeConfig::default());
        let body = page.document().body();

        assert!(page
            .fire("shopify:section:select", body, json!({"sectionId": "abc"}))
            .is_ok());
        assert!(matches!(
            page.fire("section:explode", body, json!({})),
            Err(RuntimeError::UnknownEvent(_))
        ));
        assert!(matches!(
            page.fire("shopify:block:select", body, json!({"sectionId": "abc"})),
            Err(RuntimeError::MalformedDetail { .. })
        ));
    }
}
