//! Template submission flow and editor state
//!
//! `TemplateSubmission` walks a single "submit template" action through
//! validation and the taproot warning:
//!
//! ```text
//! Editing -> Submitted -> Rejected -> (edit) Editing
//!                      -> Accepted
//!                      -> TaprootWarningShown -> keep current type -> Accepted
//!                                             -> switch to taproot -> Accepted (taproot)
//! ```
//!
//! Every transition hands back one event for the screen to consume.

use serde::{Deserialize, Serialize};

use crate::console_log;
use crate::format::{to_compact_form, to_display_form_with, FormatOptions};
use crate::types::{AddressType, PolicyDecision};
use crate::validation::{submit_template, TemplateValidator};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SubmissionState {
    Editing,
    Submitted,
    Rejected { reason: String },
    TaprootWarningShown { template: String },
    Accepted { template: String, address_type: AddressType },
}

/// One-shot event for the screen layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SubmissionEvent {
    Success { template: String, address_type: AddressType },
    Error { message: String },
    ShowTaprootWarning { template: String },
    AddressTypeChangedToTaproot { template: String },
}

#[derive(Debug, Clone)]
pub struct TemplateSubmission {
    address_type: AddressType,
    state: SubmissionState,
}

impl TemplateSubmission {
    pub fn new(address_type: AddressType) -> Self {
        Self {
            address_type,
            state: SubmissionState::Editing,
        }
    }

    pub fn state(&self) -> &SubmissionState {
        &self.state
    }

    pub fn address_type(&self) -> AddressType {
        self.address_type
    }

    /// Submit the editor contents
    pub fn submit<V: TemplateValidator + ?Sized>(
        &mut self,
        validator: &V,
        text: &str,
    ) -> Result<SubmissionEvent, String> {
        match self.state {
            SubmissionState::Editing | SubmissionState::Rejected { .. } => {}
            _ => return Err(self.invalid_transition("submit")),
        }

        self.state = SubmissionState::Submitted;
        let event = match submit_template(validator, text, self.address_type) {
            PolicyDecision::Reject { reason } => {
                self.state = SubmissionState::Rejected {
                    reason: reason.clone(),
                };
                SubmissionEvent::Error { message: reason }
            }
            PolicyDecision::Accept { template } => self.accept(template, self.address_type),
            PolicyDecision::OfferTaprootUpgrade { template } => {
                self.state = SubmissionState::TaprootWarningShown {
                    template: template.clone(),
                };
                SubmissionEvent::ShowTaprootWarning { template }
            }
        };
        Ok(event)
    }

    /// Continue with the wallet's current address type after the warning
    pub fn keep_current_type(&mut self) -> Result<SubmissionEvent, String> {
        let template = self.pending_template("keep the current address type")?;
        Ok(self.accept(template, self.address_type))
    }

    /// Switch the wallet to taproot after the warning
    pub fn switch_to_taproot(&mut self) -> Result<SubmissionEvent, String> {
        let template = self.pending_template("switch to taproot")?;
        console_log!("Address type changed from {} to taproot", self.address_type);
        self.address_type = AddressType::Taproot;
        self.accept(template.clone(), AddressType::Taproot);
        Ok(SubmissionEvent::AddressTypeChangedToTaproot { template })
    }

    /// Go back to editing after a rejection or from the warning dialog
    pub fn edit(&mut self) -> Result<(), String> {
        match self.state {
            SubmissionState::Editing
            | SubmissionState::Rejected { .. }
            | SubmissionState::TaprootWarningShown { .. } => {
                self.state = SubmissionState::Editing;
                Ok(())
            }
            _ => Err(self.invalid_transition("edit")),
        }
    }

    fn pending_template(&self, action: &str) -> Result<String, String> {
        match &self.state {
            SubmissionState::TaprootWarningShown { template } => Ok(template.clone()),
            _ => Err(self.invalid_transition(action)),
        }
    }

    fn accept(&mut self, template: String, address_type: AddressType) -> SubmissionEvent {
        self.state = SubmissionState::Accepted {
            template: template.clone(),
            address_type,
        };
        SubmissionEvent::Success {
            template,
            address_type,
        }
    }

    fn invalid_transition(&self, action: &str) -> String {
        format!("Cannot {} while in state {:?}", action, self.state)
    }
}

/// Contents of the template editor
///
/// A template loaded into the editor, or pasted into it as one long line, is
/// shown in display form. Once the user starts typing, their text is kept
/// exactly as typed.
#[derive(Debug, Clone)]
pub struct TemplateEditor {
    options: FormatOptions,
    value: String,
    initial: String,
    edited: bool,
}

impl TemplateEditor {
    pub fn new(options: FormatOptions) -> Self {
        Self {
            options,
            value: String::new(),
            initial: String::new(),
            edited: false,
        }
    }

    /// Load a stored template for editing
    pub fn load(&mut self, template: &str) {
        let display = to_display_form_with(template, &self.options);
        self.value = display.clone();
        self.initial = display;
        self.edited = false;
    }

    pub fn on_value_change(&mut self, new_value: &str) {
        let first_edit = !self.edited && new_value != self.initial && !new_value.trim().is_empty();
        if first_edit
            && !new_value.contains('\n')
            && new_value.chars().count() > self.options.auto_format_min_len
        {
            self.value = to_display_form_with(new_value, &self.options);
        } else {
            self.value = new_value.to_string();
        }
        self.edited = true;
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn is_edited(&self) -> bool {
        self.edited
    }

    /// Whether there is anything to submit
    pub fn can_submit(&self) -> bool {
        !self.value.trim().is_empty()
    }

    /// The text that is handed to the validator
    pub fn compact(&self) -> String {
        to_compact_form(&self.value)
    }
}

impl Default for TemplateEditor {
    fn default() -> Self {
        Self::new(FormatOptions::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_editor_formats_first_long_paste() {
        let mut editor = TemplateEditor::default();
        editor.on_value_change("thresh(2,pk(A),s:pk(B),s:pk(C))");
        assert_eq!(editor.value(), "thresh(2, pk(A), s:pk(B), s:pk(C))");
        assert!(editor.is_edited());

        // Later edits are left alone
        editor.on_value_change("thresh(2,pk(A),s:pk(B),s:pk(C),s:pk(D))");
        assert_eq!(editor.value(), "thresh(2,pk(A),s:pk(B),s:pk(C),s:pk(D))");
    }

    #[test]
    fn test_editor_keeps_short_or_multiline_first_edit() {
        let mut editor = TemplateEditor::default();
        editor.on_value_change("pk(A)");
        assert_eq!(editor.value(), "pk(A)");

        let mut editor = TemplateEditor::default();
        editor.on_value_change("or_d(pk(A),\nand_v(v:pk(B),older(144)))");
        assert_eq!(editor.value(), "or_d(pk(A),\nand_v(v:pk(B),older(144)))");
    }

    #[test]
    fn test_editor_load_shows_display_form() {
        let mut editor = TemplateEditor::default();
        editor.load("andor(ln:older(12900),thresh(2,pk(A),s:pk(B),s:pk(C)),thresh(2,pk(A),s:pk(D),s:pk(E)))");
        assert!(editor.value().starts_with("andor(\n  ln:older(12900),"));
        assert!(!editor.is_edited());
        assert_eq!(
            editor.compact(),
            "andor(ln:older(12900),thresh(2,pk(A),s:pk(B),s:pk(C)),thresh(2,pk(A),s:pk(D),s:pk(E)))"
        );
    }

    #[test]
    fn test_editor_blank_cannot_submit() {
        let mut editor = TemplateEditor::default();
        assert!(!editor.can_submit());
        editor.on_value_change("   ");
        assert!(!editor.can_submit());
    }
}
