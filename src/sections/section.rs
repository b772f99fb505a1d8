//! Section trait - Interface for section components
//!
//! A section component is constructed once per container and may react to
//! any of the lifecycle hooks below. Every hook is optional: the defaults do
//! nothing, so a component only implements what it cares about.

use crate::dom::NodeId;
use crate::event::LifecycleEvent;
use crate::host::Host;
use crate::modal::Modals;
use anyhow::Result;
use std::rc::Rc;

/// Identity the controller attaches to every instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceInfo {
    pub id: String,
    pub section_type: String,
    /// Host-owned element the instance is bound to
    pub container: NodeId,
    /// `<type>-<id>`, for scoping listeners the instance binds itself
    pub namespace: String,
}

/// Everything a section may touch while constructing or running a hook
pub struct SectionContext<'a> {
    pub host: &'a mut Host,
    pub modals: &'a mut Modals,
    pub info: &'a InstanceInfo,
}

/// Trait for section components
///
/// Hooks receive the lifecycle event unchanged. Returning an error is logged
/// by the controller and otherwise ignored.
pub trait Section {
    /// The section was (re)loaded in the editor
    fn on_load(&mut self, cx: &mut SectionContext<'_>, event: &LifecycleEvent) -> Result<()> {
        let _ = (cx, event);
        Ok(())
    }

    /// The section is about to disappear; the instance is already unregistered
    fn on_unload(&mut self, cx: &mut SectionContext<'_>, event: &LifecycleEvent) -> Result<()> {
        let _ = (cx, event);
        Ok(())
    }

    fn on_select(&mut self, cx: &mut SectionContext<'_>, event: &LifecycleEvent) -> Result<()> {
        let _ = (cx, event);
        Ok(())
    }

    fn on_deselect(&mut self, cx: &mut SectionContext<'_>, event: &LifecycleEvent) -> Result<()> {
        let _ = (cx, event);
        Ok(())
    }

    fn on_block_select(&mut self, cx: &mut SectionContext<'_>, event: &LifecycleEvent) -> Result<()> {
        let _ = (cx, event);
        Ok(())
    }

    fn on_block_deselect(
        &mut self,
        cx: &mut SectionContext<'_>,
        event: &LifecycleEvent,
    ) -> Result<()> {
        let _ = (cx, event);
        Ok(())
    }

    /// Refresh in place without an unload/load cycle
    fn force_reload(&mut self, cx: &mut SectionContext<'_>) -> Result<()> {
        let _ = cx;
        Ok(())
    }
}

/// Factory producing a section component for a container
pub type SectionConstructor = Rc<dyn Fn(&mut SectionContext<'_>) -> Box<dyn Section>>;

/// Wrap a closure building a concrete component into a [`SectionConstructor`]
pub fn constructor<S, F>(build: F) -> SectionConstructor
where
    S: Section + 'static,
    F: Fn(&mut SectionContext<'_>) -> S + 'static,
{
    Rc::new(move |cx: &mut SectionContext<'_>| Box::new(build(cx)) as Box<dyn Section>)
}

/// A live section: the component plus its identity
pub struct SectionInstance {
    pub info: InstanceInfo,
    component: Box<dyn Section>,
}

impl SectionInstance {
    pub(crate) fn new(info: InstanceInfo, component: Box<dyn Section>) -> Self {
        Self { info, component }
    }

    pub fn id(&self) -> &str {
        &self.info.id
    }

    pub fn section_type(&self) -> &str {
        &self.info.section_type
    }

    pub fn container(&self) -> NodeId {
        self.info.container
    }

    pub fn namespace(&self) -> &str {
        &self.info.namespace
    }

    pub(crate) fn parts_mut(&mut self) -> (&InstanceInfo, &mut Box<dyn Section>) {
        (&self.info, &mut self.component)
    }
}

impl std::fmt::Debug for SectionInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SectionInstance")
            .field("info", &self.info)
            .finish_non_exhaustive()
    }
}
