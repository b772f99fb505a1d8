//! Errors raised at the boundary where host input enters the runtime
//!
//! The runtime core never fails toward the host; these only surface when
//! validating externally supplied event names, payloads and selectors.

use crate::dom::SelectorError;

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("unknown lifecycle event `{0}`")]
    UnknownEvent(String),

    #[error("malformed detail for `{event}`: {source}")]
    MalformedDetail {
        event: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Selector(#[from] SelectorError),

    #[error("no element matches `{0}`")]
    MissingTarget(String),
}
