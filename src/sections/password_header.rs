//! Password page header
//!
//! Wires the storefront login modal and opens it straight away when the
//! login form came back with errors.

use super::section::{constructor, Section, SectionConstructor, SectionContext};
use crate::dom::Selector;
use crate::modal::{ModalConfig, ModalHandle};

pub const SECTION_TYPE: &str = "password-header";

const LOGIN_MODAL_ID: &str = "LoginModal";
const LOGIN_MODAL_NAME: &str = "login-modal";

#[derive(Debug, Default)]
pub struct PasswordHeader {
    modal: Option<ModalHandle>,
}

impl PasswordHeader {
    pub fn new(cx: &mut SectionContext<'_>) -> Self {
        let Some(node) = cx.host.doc.get_element_by_id(LOGIN_MODAL_ID) else {
            return Self::default();
        };

        let config = ModalConfig {
            focus_on_open: Some("#password".to_string()),
            close_off_content_click: false,
            ..ModalConfig::default()
        };
        let modal = cx
            .modals
            .create(cx.host, LOGIN_MODAL_ID, LOGIN_MODAL_NAME, config);

        let has_errors = Selector::parse(".errors")
            .is_ok_and(|errors| cx.host.doc.query(Some(node), &errors).is_some());
        if let (Some(handle), true) = (modal, has_errors) {
            cx.modals.open(handle, cx.host, None);
        }

        Self { modal }
    }

    /// The login modal, when the page has one
    pub fn modal(&self) -> Option<ModalHandle> {
        self.modal
    }

    pub fn constructor() -> SectionConstructor {
        constructor(PasswordHeader::new)
    }
}

impl Section for PasswordHeader {}
