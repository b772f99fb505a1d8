//! Animation/transition completion
//!
//! [`await_motion`] reads the element's duration properties and returns a
//! [`Completion`] future. With no positive duration it is already complete;
//! otherwise it completes on the first end event targeted at exactly that
//! element. Without `completion_timeout_ms` an end event that never arrives
//! leaves the completion pending forever.

use crate::dom::{Document, NodeId};
use crate::event::EventKind;
use crate::host::Host;
use crate::listeners::{Handler, ListenerTarget};
use crate::scheduler::Task;
use regex::Regex;
use std::cell::RefCell;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::sync::LazyLock;
use std::task::{Context, Poll, Waker};
use std::time::Duration;
use tracing::{debug, trace};

/// Leading number and unit of a CSS time value
static CSS_TIME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?)\s*(ms|s)?").unwrap()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Motion {
    Animation,
    Transition,
}

impl Motion {
    /// Duration properties in the order they are consulted
    pub fn properties(&self) -> [&'static str; 4] {
        match self {
            Motion::Animation => [
                "animation-duration",
                "-moz-animation-duration",
                "-webkit-animation-duration",
                "-o-animation-duration",
            ],
            Motion::Transition => [
                "transition-duration",
                "-moz-transition-duration",
                "-webkit-transition-duration",
                "-o-transition-duration",
            ],
        }
    }

    pub fn end_event(&self) -> EventKind {
        match self {
            Motion::Animation => EventKind::AnimationEnd,
            Motion::Transition => EventKind::TransitionEnd,
        }
    }
}

/// Parse the leading CSS time of a value, in seconds
fn parse_css_seconds(value: &str) -> Option<f64> {
    let caps = CSS_TIME_REGEX.captures(value)?;
    let number: f64 = caps.get(1)?.as_str().parse().ok()?;
    match caps.get(2).map(|m| m.as_str()) {
        Some("ms") => Some(number / 1000.0),
        _ => Some(number),
    }
}

/// Configured duration of `motion` on `node`, if positive
///
/// The first property with a non-zero value decides; a negative one means
/// no motion. Values too large for a `Duration` saturate.
pub fn motion_duration(doc: &Document, node: NodeId, motion: Motion) -> Option<Duration> {
    let seconds = motion
        .properties()
        .iter()
        .filter_map(|p| doc.style(node, p))
        .filter_map(parse_css_seconds)
        .find(|s| *s != 0.0)?;
    (seconds > 0.0).then(|| Duration::try_from_secs_f64(seconds).unwrap_or(Duration::MAX))
}

/// How a completion ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionOutcome {
    Finished,
    TimedOut,
}

#[derive(Debug, Default)]
struct CompletionState {
    outcome: Option<CompletionOutcome>,
    waker: Option<Waker>,
}

/// Single-resolution future for an animation or transition
#[derive(Debug, Clone, Default)]
pub struct Completion {
    state: Rc<RefCell<CompletionState>>,
}

impl Completion {
    fn ready() -> Self {
        let completion = Self::default();
        completion.state.borrow_mut().outcome = Some(CompletionOutcome::Finished);
        completion
    }

    fn resolve(&self, outcome: CompletionOutcome) {
        let mut state = self.state.borrow_mut();
        if state.outcome.is_some() {
            return;
        }
        state.outcome = Some(outcome);
        if let Some(waker) = state.waker.take() {
            waker.wake();
        }
    }

    pub fn is_complete(&self) -> bool {
        self.state.borrow().outcome.is_some()
    }

    pub fn outcome(&self) -> Option<CompletionOutcome> {
        self.state.borrow().outcome
    }
}

impl Future for Completion {
    type Output = CompletionOutcome;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut state = self.state.borrow_mut();
        match state.outcome {
            Some(outcome) => Poll::Ready(outcome),
            None => {
                state.waker = Some(cx.waker().clone());
                Poll::Pending
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CompletionId(u64);

impl CompletionId {
    #[cfg(test)]
    pub(crate) fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    fn namespace(&self) -> String {
        format!("completion-{}", self.0)
    }
}

#[derive(Debug)]
struct PendingCompletion {
    node: NodeId,
    completion: Completion,
}

/// Completions still waiting for their end event
#[derive(Debug, Default)]
pub struct Completions {
    pending: HashMap<CompletionId, PendingCompletion>,
    next_id: u64,
}

impl Completions {
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Wait for `node`'s animation or transition to end
pub fn await_motion(host: &mut Host, node: NodeId, motion: Motion) -> Completion {
    let Some(duration) = motion_duration(&host.doc, node, motion) else {
        return Completion::ready();
    };

    let id = CompletionId(host.completions.next_id);
    host.completions.next_id += 1;

    let completion = Completion::default();
    host.listeners.on(
        ListenerTarget::Node(node),
        motion.end_event(),
        Some(&id.namespace()),
        Handler::Completion(id),
    );
    if let Some(timeout_ms) = host.config.completion_timeout_ms {
        host.scheduler
            .schedule(timeout_ms, Task::ExpireCompletion(id));
    }
    host.completions.pending.insert(
        id,
        PendingCompletion {
            node,
            completion: completion.clone(),
        },
    );

    trace!(?motion, ?duration, "awaiting motion end");
    completion
}

/// End event reached the element the completion listens on
pub(crate) fn handle_end_event(host: &mut Host, id: CompletionId, target: NodeId) {
    let Some(pending) = host.completions.pending.get(&id) else {
        return;
    };
    // Bubbled from a descendant's own animation
    if pending.node != target {
        return;
    }
    finish(host, id, CompletionOutcome::Finished);
}

pub(crate) fn expire(host: &mut Host, id: CompletionId) {
    if host.completions.pending.contains_key(&id) {
        debug!("motion end never arrived, giving up");
        finish(host, id, CompletionOutcome::TimedOut);
    }
}

fn finish(host: &mut Host, id: CompletionId, outcome: CompletionOutcome) {
    if let Some(pending) = host.completions.pending.remove(&id) {
        host.listeners.off_namespace(&id.namespace());
        pending.completion.resolve(outcome);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuntimeConfig;
    use futures::FutureExt;

    #[test]
    fn test_parse_css_seconds() {
        assert_eq!(parse_css_seconds("0.3s"), Some(0.3));
        assert_eq!(parse_css_seconds("250ms"), Some(0.25));
        assert_eq!(parse_css_seconds("1s, 2s"), Some(1.0));
        assert_eq!(parse_css_seconds(".5s"), Some(0.5));
        assert_eq!(parse_css_seconds("none"), None);
    }

    #[test]
    fn test_duration_takes_first_non_zero_property() {
        let mut doc = Document::new();
        let node = doc.append_element(doc.body(), "div");
        assert_eq!(motion_duration(&doc, node, Motion::Animation), None);

        doc.set_style(node, "animation-duration", "0s");
        doc.set_style(node, "-webkit-animation-duration", "0.4s");
        doc.set_style(node, "-o-animation-duration", "2s");
        assert_eq!(
            motion_duration(&doc, node, Motion::Animation),
            Some(Duration::from_millis(400))
        );
        assert_eq!(motion_duration(&doc, node, Motion::Transition), None);
    }

    #[test]
    fn test_huge_duration_saturates() {
        let mut doc = Document::new();
        let node = doc.append_element(doc.body(), "div");
        doc.set_style(node, "animation-duration", "1e30s");
        doc.set_style(node, "transition-duration", "1e400s");
        assert_eq!(motion_duration(&doc, node, Motion::Animation), Some(Duration::MAX));
        assert_eq!(motion_duration(&doc, node, Motion::Transition), Some(Duration::MAX));

        let mut host = Host::new(doc, RuntimeConfig::default());
        let completion = await_motion(&mut host, node, Motion::Animation);
        assert!(!completion.is_complete());
        handle_end_event(&mut host, CompletionId(0), node);
        assert_eq!(completion.outcome(), Some(CompletionOutcome::Finished));
    }

    #[test]
    fn test_negative_duration_means_no_motion() {
        let mut doc = Document::new();
        let node = doc.append_element(doc.body(), "div");
        doc.set_style(node, "transition-duration", "-1s");
        doc.set_style(node, "-moz-transition-duration", "1s");
        assert_eq!(motion_duration(&doc, node, Motion::Transition), None);
    }

    #[test]
    fn test_no_duration_is_already_complete() {
        let mut doc = Document::new();
        let node = doc.append_element(doc.body(), "div");
        let mut host = Host::new(doc, RuntimeConfig::default());

        let completion = await_motion(&mut host, node, Motion::Transition);
        assert!(completion.is_complete());
        assert_eq!(completion.now_or_never(), Some(CompletionOutcome::Finished));
        assert!(host.listeners.is_empty());
    }

    #[test]
    fn test_end_event_resolves_once() {
        let mut doc = Document::new();
        let node = doc.append_element(doc.body(), "div");
        let child = doc.append_element(node, "span");
        doc.set_style(node, "animation-duration", "1s");
        let mut host = Host::new(doc, RuntimeConfig::default());

        let completion = await_motion(&mut host, node, Motion::Animation);
        assert_eq!(completion.clone().now_or_never(), None);

        handle_end_event(&mut host, CompletionId(0), child);
        assert!(!completion.is_complete());

        handle_end_event(&mut host, CompletionId(0), node);
        assert_eq!(completion.outcome(), Some(CompletionOutcome::Finished));
        assert!(host.listeners.is_empty());
        assert!(host.completions.is_empty());
    }

    #[test]
    fn test_expire_resolves_as_timed_out() {
        let mut doc = Document::new();
        let node = doc.append_element(doc.body(), "div");
        doc.set_style(node, "transition-duration", "300ms");
        let config = RuntimeConfig {
            completion_timeout_ms: Some(1000),
            ..RuntimeConfig::default()
        };
        let mut host = Host::new(doc, config);

        let completion = await_motion(&mut host, node, Motion::Transition);
        assert_eq!(host.scheduler.pending(), 1);

        expire(&mut host, CompletionId(0));
        assert_eq!(completion.outcome(), Some(CompletionOutcome::TimedOut));

        handle_end_event(&mut host, CompletionId(0), node);
        assert_eq!(completion.outcome(), Some(CompletionOutcome::TimedOut));
    }
}
