//! Accessibility helpers used by the modal and by section components
//!
//! - `focus_trap` - confine Tab navigation to a container
//! - `motion` - wait for an element's animation or transition to finish
//! - `scroll_lock` - swallow touch scrolling while an overlay is up

pub mod focus_trap;
pub mod motion;
pub mod scroll_lock;

pub use focus_trap::{focusable_elements, FocusTraps, TrapOptions, TrapSession};
pub use motion::{Completion, CompletionOutcome, Motion};
