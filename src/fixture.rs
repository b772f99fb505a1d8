//! Page fixtures - element trees described in YAML
//!
//! ```yaml
//! html_classes: [js]
//! body:
//!   - tag: div
//!     id: shopify-section-abc
//!     children:
//!       - tag: div
//!         attrs: { data-section-id: abc, data-section-type: password-header }
//! ```

use crate::dom::{Document, NodeId};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// One element and its subtree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementSpec {
    pub tag: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub classes: Vec<String>,
    #[serde(default)]
    pub attrs: BTreeMap<String, String>,
    #[serde(default)]
    pub style: BTreeMap<String, String>,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub children: Vec<ElementSpec>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageFixture {
    pub html_classes: Vec<String>,
    pub body_classes: Vec<String>,
    pub body: Vec<ElementSpec>,
}

impl PageFixture {
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).context("Failed to parse page fixture")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read page fixture {}", path.display()))?;
        Self::from_yaml(&content).with_context(|| format!("In {}", path.display()))
    }

    /// Build a fresh document from the fixture
    pub fn build(&self) -> Document {
        let mut doc = Document::new();
        let (html, body) = (doc.html(), doc.body());
        for class in &self.html_classes {
            doc.add_class(html, class);
        }
        for class in &self.body_classes {
            doc.add_class(body, class);
        }
        for spec in &self.body {
            append(&mut doc, body, spec);
        }
        doc
    }
}

fn append(doc: &mut Document, parent: NodeId, spec: &ElementSpec) -> NodeId {
    let node = doc.append_element(parent, &spec.tag);
    if let Some(id) = &spec.id {
        doc.set_attr(node, "id", id);
    }
    for class in &spec.classes {
        doc.add_class(node, class);
    }
    for (name, value) in &spec.attrs {
        doc.set_attr(node, name, value);
    }
    for (property, value) in &spec.style {
        doc.set_style(node, property, value);
    }
    if spec.hidden {
        doc.set_hidden(node, true);
    }
    for child in &spec.children {
        append(doc, node, child);
    }
    node
}
