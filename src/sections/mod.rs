//! Section lifecycle controller
//!
//! Maps section types to constructors and keeps the list of live instances.
//! Lifecycle events from the editor create, remove or forward to instances:
//! - `section:load` creates the instance (and any sub-sections inside it)
//! - `section:unload` removes it
//! - select/deselect and block select/deselect are forwarded to the instance
//!
//! Lookup is a linear scan and the first match wins. Ids are expected to be
//! unique but only the custom-scope path checks for an existing one.

pub mod password_header;
pub mod section;

pub use password_header::PasswordHeader;
pub use section::{
    constructor, InstanceInfo, Section, SectionConstructor, SectionContext, SectionInstance,
};

use crate::dom::{NodeId, Selector};
use crate::event::{LifecycleDetail, LifecycleEvent};
use crate::host::Host;
use crate::modal::Modals;
use crate::refresh::LayoutRefresh;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Attribute carrying a section's unique id
pub const SECTION_ID_ATTR: &str = "data-section-id";
/// Attribute carrying a section's type
pub const SECTION_TYPE_ATTR: &str = "data-section-type";
/// Marker for sections nested inside another section's markup
pub const SUBSECTION_ATTR: &str = "data-subsection";

/// Hook to run on an instance
#[derive(Debug, Clone, Copy)]
enum Hook<'e> {
    Load(&'e LifecycleEvent),
    Unload(&'e LifecycleEvent),
    Select(&'e LifecycleEvent),
    Deselect(&'e LifecycleEvent),
    BlockSelect(&'e LifecycleEvent),
    BlockDeselect(&'e LifecycleEvent),
    ForceReload,
}

impl Hook<'_> {
    fn name(&self) -> &'static str {
        match self {
            Hook::Load(_) => "onLoad",
            Hook::Unload(_) => "onUnload",
            Hook::Select(_) => "onSelect",
            Hook::Deselect(_) => "onDeselect",
            Hook::BlockSelect(_) => "onBlockSelect",
            Hook::BlockDeselect(_) => "onBlockDeselect",
            Hook::ForceReload => "forceReload",
        }
    }
}

fn run_hook(host: &mut Host, modals: &mut Modals, instance: &mut SectionInstance, hook: Hook<'_>) {
    let (info, component) = instance.parts_mut();
    let mut cx = SectionContext { host, modals, info };
    let result = match hook {
        Hook::Load(event) => component.on_load(&mut cx, event),
        Hook::Unload(event) => component.on_unload(&mut cx, event),
        Hook::Select(event) => component.on_select(&mut cx, event),
        Hook::Deselect(event) => component.on_deselect(&mut cx, event),
        Hook::BlockSelect(event) => component.on_block_select(&mut cx, event),
        Hook::BlockDeselect(event) => component.on_block_deselect(&mut cx, event),
        Hook::ForceReload => component.force_reload(&mut cx),
    };
    if let Err(err) = result {
        warn!(
            section = %info.id,
            hook = hook.name(),
            error = %err,
            "section hook failed"
        );
    }
}

/// Constructor registry plus live instances
#[derive(Default)]
pub struct Sections {
    constructors: HashMap<String, SectionConstructor>,
    instances: Vec<SectionInstance>,
}

impl std::fmt::Debug for Sections {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut types: Vec<&String> = self.constructors.keys().collect();
        types.sort();
        f.debug_struct("Sections")
            .field("types", &types)
            .field("instances", &self.instances)
            .finish()
    }
}

impl Sections {
    pub fn new() -> Self {
        Self::default()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Registry
    // ─────────────────────────────────────────────────────────────────────────

    /// Register `constructor` for `section_type` and instantiate every
    /// container of that type already on the page (or inside `scope`)
    ///
    /// A scoped registration skips containers whose id already has an
    /// instance. Returns the number of instances created.
    pub fn register(
        &mut self,
        host: &mut Host,
        modals: &mut Modals,
        section_type: &str,
        constructor: SectionConstructor,
        scope: Option<NodeId>,
    ) -> usize {
        self.constructors
            .insert(section_type.to_string(), constructor.clone());

        let selector = Selector::attr_equals(SECTION_TYPE_ATTR, section_type);
        let containers = host.doc.query_all(scope, &selector);
        containers
            .into_iter()
            .filter_map(|container| {
                self.create_instance(
                    host,
                    modals,
                    container,
                    Some(constructor.clone()),
                    scope.is_some(),
                )
            })
            .count()
    }

    pub fn is_registered(&self, section_type: &str) -> bool {
        self.constructors.contains_key(section_type)
    }

    /// Construct an instance for `container`
    ///
    /// The constructor defaults to the one registered for the container's
    /// type; with none registered this is a no-op. With `custom_scope` an
    /// existing instance for the same id also makes it a no-op. Returns the
    /// new instance's position.
    pub fn create_instance(
        &mut self,
        host: &mut Host,
        modals: &mut Modals,
        container: NodeId,
        constructor: Option<SectionConstructor>,
        custom_scope: bool,
    ) -> Option<usize> {
        let id = host
            .doc
            .attr(container, SECTION_ID_ATTR)
            .unwrap_or_default()
            .to_string();
        let section_type = host
            .doc
            .attr(container, SECTION_TYPE_ATTR)
            .unwrap_or_default()
            .to_string();

        let constructor = constructor.or_else(|| self.constructors.get(&section_type).cloned())?;

        if custom_scope && self.find_index(&id).is_some() {
            return None;
        }

        let info = InstanceInfo {
            namespace: format!("{}-{}", section_type, id),
            id,
            section_type,
            container,
        };
        let component = {
            let mut cx = SectionContext {
                host,
                modals,
                info: &info,
            };
            constructor(&mut cx)
        };

        debug!(section = %info.id, section_type = %info.section_type, "section instance created");
        self.instances.push(SectionInstance::new(info, component));
        Some(self.instances.len() - 1)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Instances
    // ─────────────────────────────────────────────────────────────────────────

    pub fn instances(&self) -> &[SectionInstance] {
        &self.instances
    }

    /// First live instance with `id`
    pub fn find_instance(&self, id: &str) -> Option<&SectionInstance> {
        self.instances.iter().find(|i| i.id() == id)
    }

    fn find_index(&self, id: &str) -> Option<usize> {
        self.instances.iter().position(|i| i.id() == id)
    }

    /// Remove at most one instance with `id`, scanning from the most recent
    fn remove_instance(&mut self, id: &str) -> Option<SectionInstance> {
        let index = self.instances.iter().rposition(|i| i.id() == id)?;
        Some(self.instances.remove(index))
    }

    /// Run `forceReload` on every live instance of `section_type`
    pub fn reinit_section(&mut self, host: &mut Host, modals: &mut Modals, section_type: &str) {
        for instance in self
            .instances
            .iter_mut()
            .filter(|i| i.section_type() == section_type)
        {
            run_hook(host, modals, instance, Hook::ForceReload);
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Lifecycle events
    // ─────────────────────────────────────────────────────────────────────────

    /// Apply one lifecycle event
    pub fn handle(
        &mut self,
        host: &mut Host,
        modals: &mut Modals,
        refresh: &mut dyn LayoutRefresh,
        event: &LifecycleEvent,
    ) {
        match &event.detail {
            LifecycleDetail::SectionLoad(_) => self.load_section(host, modals, refresh, event),
            LifecycleDetail::SectionUnload(_) => self.unload_section(host, modals, event),
            LifecycleDetail::SectionSelect(_) => {
                self.forward(host, modals, event, Hook::Select(event))
            }
            LifecycleDetail::SectionDeselect(_) => {
                self.forward(host, modals, event, Hook::Deselect(event))
            }
            LifecycleDetail::BlockSelect(_) => {
                self.forward(host, modals, event, Hook::BlockSelect(event))
            }
            LifecycleDetail::BlockDeselect(_) => {
                self.forward(host, modals, event, Hook::BlockDeselect(event))
            }
        }
    }

    fn load_section(
        &mut self,
        host: &mut Host,
        modals: &mut Modals,
        refresh: &mut dyn LayoutRefresh,
        event: &LifecycleEvent,
    ) {
        let Some(container) = host
            .doc
            .query(Some(event.target), &Selector::has_attr(SECTION_ID_ATTR))
        else {
            return;
        };

        let created = self.create_instance(host, modals, container, None, false);
        let index = created.or_else(|| self.find_index(event.section_id()));

        self.load_sub_sections(host, modals, Some(container));

        if let Some(index) = index {
            run_hook(host, modals, &mut self.instances[index], Hook::Load(event));
        }

        refresh.refresh_hard();
    }

    /// Create and load every sub-section inside `scope` (the whole page when
    /// `None`), in document order. Returns how many were created.
    pub fn load_sub_sections(
        &mut self,
        host: &mut Host,
        modals: &mut Modals,
        scope: Option<NodeId>,
    ) -> usize {
        let containers = host
            .doc
            .query_all(scope, &Selector::has_attr(SUBSECTION_ATTR));

        let mut created = 0;
        for container in containers {
            let Some(index) = self.create_instance(host, modals, container, None, false) else {
                continue;
            };
            created += 1;
            let event = LifecycleEvent::section_load(container, self.instances[index].id());
            run_hook(host, modals, &mut self.instances[index], Hook::Load(&event));
        }
        created
    }

    fn unload_section(&mut self, host: &mut Host, modals: &mut Modals, event: &LifecycleEvent) {
        if let Some(mut instance) = self.remove_instance(event.section_id()) {
            debug!(section = %instance.id(), "section instance removed");
            run_hook(host, modals, &mut instance, Hook::Unload(event));
        }
    }

    fn forward(
        &mut self,
        host: &mut Host,
        modals: &mut Modals,
        event: &LifecycleEvent,
        hook: Hook<'_>,
    ) {
        if let Some(index) = self.find_index(event.section_id()) {
            run_hook(host, modals, &mut self.instances[index], hook);
        }
    }
}
