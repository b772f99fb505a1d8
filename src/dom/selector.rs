//! Selector subset
//!
//! Supports comma-separated compound selectors: an optional tag (or `*`)
//! followed by `#id`, `.class`, `[attr]`, `[attr=value]` and `[attr^=value]`
//! parts. Combinators are not supported.

use super::{Document, NodeId};
use regex::Regex;
use std::sync::LazyLock;

/// Regex for a whole compound selector
static COMPOUND_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\*|[A-Za-z][A-Za-z0-9-]*)?((?:[#.][A-Za-z0-9_-]+|\[[^\]]+\])*)$").unwrap()
});

/// Regex for the id/class/attribute parts of a compound selector
static PART_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"([#.])([A-Za-z0-9_-]+)|\[\s*([A-Za-z0-9_:-]+)\s*(?:(\^=|=)\s*(?:"([^"]*)"|'([^']*)'|([^\]\s"']*))\s*)?\]"#,
    )
    .unwrap()
});

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectorError {
    #[error("empty selector")]
    Empty,
    #[error("unsupported selector `{0}`")]
    Unsupported(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum AttrOp {
    Exists,
    Equals(String),
    Prefix(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AttrMatcher {
    name: String,
    op: AttrOp,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<AttrMatcher>,
}

impl Compound {
    fn parse(source: &str) -> Result<Self, SelectorError> {
        let unsupported = || SelectorError::Unsupported(source.to_string());
        let caps = COMPOUND_REGEX.captures(source).ok_or_else(unsupported)?;

        let mut compound = Compound {
            tag: caps
                .get(1)
                .map(|m| m.as_str())
                .filter(|t| *t != "*")
                .map(str::to_ascii_lowercase),
            ..Default::default()
        };

        let parts = caps.get(2).map_or("", |m| m.as_str());
        let mut consumed = 0;
        for part in PART_REGEX.captures_iter(parts) {
            let whole = part.get(0).ok_or_else(unsupported)?;
            if whole.start() != consumed {
                return Err(unsupported());
            }
            consumed = whole.end();

            if let (Some(sigil), Some(name)) = (part.get(1), part.get(2)) {
                match sigil.as_str() {
                    "#" => compound.id = Some(name.as_str().to_string()),
                    _ => compound.classes.push(name.as_str().to_string()),
                }
                continue;
            }

            let name = part.get(3).ok_or_else(unsupported)?.as_str().to_string();
            let value = part
                .get(5)
                .or_else(|| part.get(6))
                .or_else(|| part.get(7))
                .map(|m| m.as_str().to_string())
                .unwrap_or_default();
            let op = match part.get(4).map(|m| m.as_str()) {
                None => AttrOp::Exists,
                Some("^=") => AttrOp::Prefix(value),
                Some(_) => AttrOp::Equals(value),
            };
            compound.attrs.push(AttrMatcher { name, op });
        }
        if consumed != parts.len() {
            return Err(unsupported());
        }

        Ok(compound)
    }

    fn matches(&self, doc: &Document, node: NodeId) -> bool {
        if self.tag.as_deref().is_some_and(|tag| doc.tag(node) != tag) {
            return false;
        }
        if self
            .id
            .as_deref()
            .is_some_and(|id| doc.element_id(node) != Some(id))
        {
            return false;
        }
        if !self.classes.iter().all(|c| doc.has_class(node, c)) {
            return false;
        }
        self.attrs.iter().all(|m| match (&m.op, doc.attr(node, &m.name)) {
            (_, None) => false,
            (AttrOp::Exists, Some(_)) => true,
            (AttrOp::Equals(v), Some(actual)) => actual == v,
            (AttrOp::Prefix(v), Some(actual)) => actual.starts_with(v.as_str()),
        })
    }
}

/// A parsed selector list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    alternatives: Vec<Compound>,
}

impl Selector {
    pub fn parse(source: &str) -> Result<Self, SelectorError> {
        if source.trim().is_empty() {
            return Err(SelectorError::Empty);
        }
        let alternatives = source
            .split(',')
            .map(str::trim)
            .map(|part| match part {
                "" => Err(SelectorError::Empty),
                part => Compound::parse(part),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { alternatives })
    }

    /// Selector for `[name=value]`
    pub fn attr_equals(name: &str, value: &str) -> Self {
        Self {
            alternatives: vec![Compound {
                attrs: vec![AttrMatcher {
                    name: name.to_string(),
                    op: AttrOp::Equals(value.to_string()),
                }],
                ..Default::default()
            }],
        }
    }

    /// Selector for `[name]`
    pub fn has_attr(name: &str) -> Self {
        Self {
            alternatives: vec![Compound {
                attrs: vec![AttrMatcher {
                    name: name.to_string(),
                    op: AttrOp::Exists,
                }],
                ..Default::default()
            }],
        }
    }

    pub fn matches(&self, doc: &Document, node: NodeId) -> bool {
        self.alternatives.iter().any(|c| c.matches(doc, node))
    }
}
