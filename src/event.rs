//! Events - DOM-level events and typed lifecycle events
//!
//! DOM events are what the host delivers for user interaction (focus, keys,
//! clicks, motion completion). Lifecycle events are the coarse section/block
//! notifications fired by the theme editor; their payloads are validated here
//! before they reach the section controller.

use crate::dom::NodeId;
use crate::error::RuntimeError;
use crate::listeners::ListenerTarget;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ═══════════════════════════════════════════════════════════════════════════════
// DOM Events
// ═══════════════════════════════════════════════════════════════════════════════

/// Kind of a DOM event
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventKind {
    FocusIn,
    FocusOut,
    Blur,
    KeyDown,
    KeyUp,
    Click,
    TouchMove,
    AnimationEnd,
    TransitionEnd,
    /// Any other event, matched by exact name (e.g. `modalOpen.LoginModal`)
    Custom(String),
}

impl EventKind {
    /// Parse a DOM event name, folding vendor-prefixed completion names
    pub fn from_name(name: &str) -> Self {
        match name {
            "focusin" => EventKind::FocusIn,
            "focusout" => EventKind::FocusOut,
            "blur" => EventKind::Blur,
            "keydown" => EventKind::KeyDown,
            "keyup" => EventKind::KeyUp,
            "click" => EventKind::Click,
            "touchmove" => EventKind::TouchMove,
            "animationend" | "webkitAnimationEnd" | "oAnimationEnd" => EventKind::AnimationEnd,
            "transitionend" | "webkitTransitionEnd" | "otransitionend" | "oTransitionEnd"
            | "msTransitionEnd" => EventKind::TransitionEnd,
            other => EventKind::Custom(other.to_string()),
        }
    }

    /// Whether the event travels from the target up to the document
    pub fn bubbles(&self) -> bool {
        !matches!(self, EventKind::Blur)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::FocusIn => write!(f, "focusin"),
            EventKind::FocusOut => write!(f, "focusout"),
            EventKind::Blur => write!(f, "blur"),
            EventKind::KeyDown => write!(f, "keydown"),
            EventKind::KeyUp => write!(f, "keyup"),
            EventKind::Click => write!(f, "click"),
            EventKind::TouchMove => write!(f, "touchmove"),
            EventKind::AnimationEnd => write!(f, "animationend"),
            EventKind::TransitionEnd => write!(f, "transitionend"),
            EventKind::Custom(name) => write!(f, "{}", name),
        }
    }
}

/// An event travelling through the page
#[derive(Debug, Clone)]
pub struct DomEvent {
    pub kind: EventKind,
    pub target: NodeId,
    /// Where the event currently is during dispatch
    pub current_target: ListenerTarget,
    pub key: Option<KeyEvent>,
    default_prevented: bool,
    propagation_stopped: bool,
    immediate_propagation_stopped: bool,
}

impl DomEvent {
    pub fn new(kind: EventKind, target: NodeId) -> Self {
        Self {
            kind,
            target,
            current_target: ListenerTarget::Node(target),
            key: None,
            default_prevented: false,
            propagation_stopped: false,
            immediate_propagation_stopped: false,
        }
    }

    pub fn with_key(mut self, key: KeyEvent) -> Self {
        self.key = Some(key);
        self
    }

    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    /// Stop propagation and skip the remaining handlers on the current target
    pub fn stop_immediate_propagation(&mut self) {
        self.propagation_stopped = true;
        self.immediate_propagation_stopped = true;
    }

    pub fn is_default_prevented(&self) -> bool {
        self.default_prevented
    }

    pub fn is_propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }

    pub fn is_immediate_propagation_stopped(&self) -> bool {
        self.immediate_propagation_stopped
    }
}

/// Tab or Shift+Tab (crossterm reports the latter as `BackTab`)
pub fn is_tab(key: &KeyEvent) -> bool {
    matches!(key.code, KeyCode::Tab | KeyCode::BackTab)
}

pub fn is_shift_tab(key: &KeyEvent) -> bool {
    key.code == KeyCode::BackTab
        || (key.code == KeyCode::Tab && key.modifiers.contains(KeyModifiers::SHIFT))
}

pub fn is_escape(key: &KeyEvent) -> bool {
    key.code == KeyCode::Esc
}

// ═══════════════════════════════════════════════════════════════════════════════
// Lifecycle Events
// ═══════════════════════════════════════════════════════════════════════════════

/// The six lifecycle notifications the section controller listens for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleKind {
    SectionLoad,
    SectionUnload,
    SectionSelect,
    SectionDeselect,
    BlockSelect,
    BlockDeselect,
}

impl LifecycleKind {
    pub fn all() -> [LifecycleKind; 6] {
        [
            LifecycleKind::SectionLoad,
            LifecycleKind::SectionUnload,
            LifecycleKind::SectionSelect,
            LifecycleKind::SectionDeselect,
            LifecycleKind::BlockSelect,
            LifecycleKind::BlockDeselect,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            LifecycleKind::SectionLoad => "section:load",
            LifecycleKind::SectionUnload => "section:unload",
            LifecycleKind::SectionSelect => "section:select",
            LifecycleKind::SectionDeselect => "section:deselect",
            LifecycleKind::BlockSelect => "block:select",
            LifecycleKind::BlockDeselect => "block:deselect",
        }
    }

    fn is_block(&self) -> bool {
        matches!(self, LifecycleKind::BlockSelect | LifecycleKind::BlockDeselect)
    }
}

impl FromStr for LifecycleKind {
    type Err = RuntimeError;

    /// Accepts the bare names and the editor's `shopify:`-prefixed names
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.strip_prefix("shopify:").unwrap_or(s);
        LifecycleKind::all()
            .into_iter()
            .find(|kind| kind.name() == name)
            .ok_or_else(|| RuntimeError::UnknownEvent(s.to_string()))
    }
}

impl fmt::Display for LifecycleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Detail payload of the section events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionDetail {
    pub section_id: String,
    /// Set when the event fires as part of the initial editor load
    #[serde(default)]
    pub load: bool,
}

/// Detail payload of the block events
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockDetail {
    pub section_id: String,
    pub block_id: String,
    #[serde(default)]
    pub load: bool,
}

/// Typed detail, one variant per lifecycle event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleDetail {
    SectionLoad(SectionDetail),
    SectionUnload(SectionDetail),
    SectionSelect(SectionDetail),
    SectionDeselect(SectionDetail),
    BlockSelect(BlockDetail),
    BlockDeselect(BlockDetail),
}

impl LifecycleDetail {
    pub fn kind(&self) -> LifecycleKind {
        match self {
            LifecycleDetail::SectionLoad(_) => LifecycleKind::SectionLoad,
            LifecycleDetail::SectionUnload(_) => LifecycleKind::SectionUnload,
            LifecycleDetail::SectionSelect(_) => LifecycleKind::SectionSelect,
            LifecycleDetail::SectionDeselect(_) => LifecycleKind::SectionDeselect,
            LifecycleDetail::BlockSelect(_) => LifecycleKind::BlockSelect,
            LifecycleDetail::BlockDeselect(_) => LifecycleKind::BlockDeselect,
        }
    }

    pub fn section_id(&self) -> &str {
        match self {
            LifecycleDetail::SectionLoad(d)
            | LifecycleDetail::SectionUnload(d)
            | LifecycleDetail::SectionSelect(d)
            | LifecycleDetail::SectionDeselect(d) => &d.section_id,
            LifecycleDetail::BlockSelect(d) | LifecycleDetail::BlockDeselect(d) => &d.section_id,
        }
    }

    pub fn block_id(&self) -> Option<&str> {
        match self {
            LifecycleDetail::BlockSelect(d) | LifecycleDetail::BlockDeselect(d) => {
                Some(&d.block_id)
            }
            _ => None,
        }
    }
}

/// A lifecycle event fired at an element of the page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleEvent {
    /// Element the host fired the event at (the section wrapper)
    pub target: NodeId,
    pub detail: LifecycleDetail,
}

impl LifecycleEvent {
    pub fn new(target: NodeId, detail: LifecycleDetail) -> Self {
        Self { target, detail }
    }

    /// `section:load` for `section_id`
    pub fn section_load(target: NodeId, section_id: &str) -> Self {
        Self::new(
            target,
            LifecycleDetail::SectionLoad(SectionDetail {
                section_id: section_id.to_string(),
                load: false,
            }),
        )
    }

    /// Validate an externally delivered event name and JSON detail
    pub fn parse(
        name: &str,
        target: NodeId,
        detail: serde_json::Value,
    ) -> Result<Self, RuntimeError> {
        let kind: LifecycleKind = name.parse()?;
        let malformed = |source| RuntimeError::MalformedDetail {
            event: kind.name(),
            source,
        };

        let detail = if kind.is_block() {
            let block: BlockDetail = serde_json::from_value(detail).map_err(malformed)?;
            match kind {
                LifecycleKind::BlockSelect => LifecycleDetail::BlockSelect(block),
                _ => LifecycleDetail::BlockDeselect(block),
            }
        } else {
            let section: SectionDetail = serde_json::from_value(detail).map_err(malformed)?;
            match kind {
                LifecycleKind::SectionLoad => LifecycleDetail::SectionLoad(section),
                LifecycleKind::SectionUnload => LifecycleDetail::SectionUnload(section),
                LifecycleKind::SectionSelect => LifecycleDetail::SectionSelect(section),
                _ => LifecycleDetail::SectionDeselect(section),
            }
        };

        Ok(Self { target, detail })
    }

    pub fn kind(&self) -> LifecycleKind {
        self.detail.kind()
    }

    pub fn section_id(&self) -> &str {
        self.detail.section_id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;
    use serde_json::json;

    #[test]
    fn test_event_kind_folds_vendor_names() {
        assert_eq!(EventKind::from_name("webkitAnimationEnd"), EventKind::AnimationEnd);
        assert_eq!(EventKind::from_name("msTransitionEnd"), EventKind::TransitionEnd);
        assert_eq!(
            EventKind::from_name("drawerOpen"),
            EventKind::Custom("drawerOpen".to_string())
        );
        assert!(!EventKind::Blur.bubbles());
        assert!(EventKind::FocusIn.bubbles());
    }

    #[test]
    fn test_tab_helpers() {
        let tab = KeyEvent::new(KeyCode::Tab, KeyModifiers::NONE);
        let shift_tab = KeyEvent::new(KeyCode::Tab, KeyModifiers::SHIFT);
        let back_tab = KeyEvent::new(KeyCode::BackTab, KeyModifiers::SHIFT);
        assert!(is_tab(&tab) && !is_shift_tab(&tab));
        assert!(is_tab(&shift_tab) && is_shift_tab(&shift_tab));
        assert!(is_tab(&back_tab) && is_shift_tab(&back_tab));
        assert!(is_escape(&KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE)));
    }

    #[test]
    fn test_propagation_flags() {
        let doc = Document::new();
        let mut event = DomEvent::new(EventKind::Click, doc.body());
        event.stop_immediate_propagation();
        assert!(event.is_propagation_stopped());
        assert!(event.is_immediate_propagation_stopped());
        assert!(!event.is_default_prevented());
    }

    #[test]
    fn test_lifecycle_kind_names() {
        for kind in LifecycleKind::all() {
            assert_eq!(kind.name().parse::<LifecycleKind>().unwrap(), kind);
        }
        assert_eq!(
            "shopify:block:select".parse::<LifecycleKind>().unwrap(),
            LifecycleKind::BlockSelect
        );
        assert!(matches!(
            "section:reorder".parse::<LifecycleKind>(),
            Err(RuntimeError::UnknownEvent(_))
        ));
    }

    #[test]
    fn test_parse_section_detail() {
        let doc = Document::new();
        let event =
            LifecycleEvent::parse("section:select", doc.body(), json!({ "sectionId": "abc" }))
                .unwrap();
        assert_eq!(event.kind(), LifecycleKind::SectionSelect);
        assert_eq!(event.section_id(), "abc");
        assert_eq!(event.detail.block_id(), None);
    }

    #[test]
    fn test_parse_block_detail() {
        let doc = Document::new();
        let event = LifecycleEvent::parse(
            "shopify:block:deselect",
            doc.body(),
            json!({ "sectionId": "abc", "blockId": "b1", "load": true }),
        )
        .unwrap();
        assert_eq!(event.kind(), LifecycleKind::BlockDeselect);
        assert_eq!(event.detail.block_id(), Some("b1"));
    }

    #[test]
    fn test_parse_rejects_malformed_detail() {
        let doc = Document::new();
        let result = LifecycleEvent::parse("block:select", doc.body(), json!({ "sectionId": "abc" }));
        assert!(matches!(
            result,
            Err(RuntimeError::MalformedDetail { event: "block:select", .. })
        ));
    }
}
