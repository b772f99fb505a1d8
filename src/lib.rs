//! storefront-runtime - section lifecycle and accessible modals for a storefront page
//!
//! - `page` - the runtime entry point; every host input goes through [`Page`]
//! - `sections` - section registry and lifecycle controller
//! - `modal` - modal state machine
//! - `a11y` - focus trap, motion completion and scroll lock
//! - `dom` - the element tree the runtime works against
//! - `fixture` / `script` - YAML page trees and replayable input

pub mod a11y;
pub mod config;
pub mod dom;
pub mod error;
pub mod event;
pub mod fixture;
pub mod host;
pub mod listeners;
pub mod modal;
pub mod page;
pub mod refresh;
pub mod scheduler;
pub mod script;
pub mod sections;

pub use config::RuntimeConfig;
pub use dom::{Document, NodeId, Selector};
pub use error::RuntimeError;
pub use event::{DomEvent, EventKind, LifecycleEvent, LifecycleKind};
pub use modal::{ModalConfig, ModalHandle};
pub use page::Page;
pub use sections::{Section, SectionContext};
