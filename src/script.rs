//! Replayable host input
//!
//! A script is a YAML list of steps fed to a [`Page`] in order. Targets are
//! selectors; the first match in document order is used.
//!
//! ```yaml
//! - lifecycle:
//!     event: shopify:section:load
//!     target: "#shopify-section-abc"
//!     detail: { sectionId: abc }
//! - click: .js-modal-open-login-modal
//! - key: { code: tab, shift: true }
//! - tick
//! - advance: 300
//! ```

use crate::dom::NodeId;
use crate::error::RuntimeError;
use crate::event::EventKind;
use crate::page::Page;
use anyhow::{bail, Context, Result};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifecycleStep {
    pub event: String,
    pub target: String,
    #[serde(default)]
    pub detail: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyStep {
    pub code: String,
    #[serde(default)]
    pub shift: bool,
}

impl KeyStep {
    fn to_key_event(&self) -> Result<KeyEvent> {
        let code = match self.code.to_ascii_lowercase().as_str() {
            "tab" if self.shift => KeyCode::BackTab,
            "tab" => KeyCode::Tab,
            "esc" | "escape" => KeyCode::Esc,
            "enter" | "return" => KeyCode::Enter,
            "space" => KeyCode::Char(' '),
            other => {
                let mut chars = other.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => KeyCode::Char(c),
                    _ => bail!("Unknown key `{}`", self.code),
                }
            }
        };
        let modifiers = if self.shift {
            KeyModifiers::SHIFT
        } else {
            KeyModifiers::NONE
        };
        Ok(KeyEvent::new(code, modifiers))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerStep {
    pub target: String,
    pub event: String,
}

/// One host input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Lifecycle(LifecycleStep),
    Click(String),
    Focus(String),
    Blur,
    Key(KeyStep),
    Trigger(TriggerStep),
    Tick,
    Advance(u64),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Script {
    pub steps: Vec<Step>,
}

impl Script {
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).context("Failed to parse script")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read script {}", path.display()))?;
        Self::from_yaml(&content).with_context(|| format!("In {}", path.display()))
    }

    /// Feed every step to `page`, stopping at the first one that fails
    pub fn run(&self, page: &mut Page) -> Result<()> {
        for (index, step) in self.steps.iter().enumerate() {
            debug!(index, ?step, "step");
            run_step(page, step).with_context(|| format!("Step {} failed", index + 1))?;
        }
        Ok(())
    }
}

fn resolve(page: &Page, selector: &str) -> Result<NodeId, RuntimeError> {
    page.document()
        .select_all(None, selector)?
        .first()
        .copied()
        .ok_or_else(|| RuntimeError::MissingTarget(selector.to_string()))
}

fn run_step(page: &mut Page, step: &Step) -> Result<()> {
    match step {
        Step::Lifecycle(step) => {
            let target = resolve(page, &step.target)?;
            page.fire(&step.event, target, step.detail.clone())?;
        }
        Step::Click(selector) => {
            let target = resolve(page, selector)?;
            page.click(target);
        }
        Step::Focus(selector) => {
            let target = resolve(page, selector)?;
            page.focus(target);
        }
        Step::Blur => page.blur(),
        Step::Key(key) => {
            page.press_key(key.to_key_event()?);
        }
        Step::Trigger(step) => {
            let target = resolve(page, &step.target)?;
            page.trigger(target, EventKind::from_name(&step.event));
        }
        Step::Tick => page.tick(),
        Step::Advance(ms) => page.advance(*ms),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuntimeConfig;
    use crate::fixture::PageFixture;
    use crate::sections::PasswordHeader;
    use pretty_assertions::assert_eq;

    const PAGE: &str = r#"
body:
  - tag: div
    id: shopify-section-abc
    children:
      - tag: div
        attrs: { data-section-id: abc, data-section-type: password-header }
        children:
          - tag: button
            classes: [js-modal-open-login-modal]
          - tag: div
            id: LoginModal
            children:
              - tag: div
                classes: [modal__inner]
                children:
                  - tag: input
                    id: password
                  - tag: button
                    classes: [js-modal-close]
"#;

    const SCRIPT: &str = r##"
- lifecycle:
    event: shopify:section:select
    target: "#shopify-section-abc"
    detail: { sectionId: abc }
- click: .js-modal-open-login-modal
- tick
- key: { code: esc }
- advance: 100
"##;

    fn page() -> Page {
        let doc = PageFixture::from_yaml(PAGE).unwrap().build();
        let mut page = Page::new(doc, RuntimeConfig::default());
        page.register("password-header", PasswordHeader::constructor(), None);
        page
    }

    #[test]
    fn test_parse_steps() {
        let script = Script::from_yaml(SCRIPT).unwrap();
        assert_eq!(script.steps.len(), 5);
        assert_eq!(script.steps[1], Step::Click(".js-modal-open-login-modal".to_string()));
        assert_eq!(script.steps[2], Step::Tick);
        assert_eq!(script.steps[4], Step::Advance(100));
    }

    #[test]
    fn test_run_script() {
        let mut page = page();
        Script::from_yaml(SCRIPT).unwrap().run(&mut page).unwrap();

        let names: Vec<&str> = page.notifications().iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["modalOpen.LoginModal", "modalClose.LoginModal"]);
        assert_eq!(page.instances().len(), 1);
        assert_eq!(page.host().scheduler.now_ms(), 100);
    }

    #[test]
    fn test_missing_target_fails_the_step() {
        let mut page = page();
        let script = Script::from_yaml("- click: \"#nowhere\"\n").unwrap();

        let err = script.run(&mut page).unwrap_err();
        assert!(err
            .chain()
            .any(|cause| matches!(cause.downcast_ref::<RuntimeError>(), Some(RuntimeError::MissingTarget(_)))));
    }

    #[test]
    fn test_key_names() {
        let back = KeyStep {
            code: "Tab".to_string(),
            shift: true,
        };
        assert_eq!(back.to_key_event().unwrap().code, KeyCode::BackTab);
        let letter = KeyStep {
            code: "a".to_string(),
            shift: false,
        };
        assert_eq!(letter.to_key_event().unwrap().code, KeyCode::Char('a'));
        let bogus = KeyStep {
            code: "hyper".to_string(),
            shift: false,
        };
        assert!(bogus.to_key_event().is_err());
    }
}
