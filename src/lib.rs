//! Miniscript wallet templates
//!
//! Formatting, validation and the taproot policy decision behind the
//! "create wallet from a custom miniscript template" flow, usable natively
//! and from JavaScript through `wasm-bindgen`.

use std::collections::HashSet;

use serde::Serialize;
use wasm_bindgen::prelude::*;

pub mod format;
pub mod policy;
pub mod submission;
pub mod tree;
pub mod types;
pub mod utils;
pub mod validation;

pub use format::{to_compact_form, to_display_form, to_display_form_with, FormatOptions};
pub use policy::decide;
pub use submission::{SubmissionEvent, SubmissionState, TemplateEditor, TemplateSubmission};
pub use tree::{build_script_node, ScriptNode, ScriptNodeType, TimeLock, TimelockBased};
pub use types::{AddressType, PolicyDecision, TemplateCreationResult};
pub use validation::{submit_template, MiniscriptTemplateValidator, TemplateValidator};

use crate::types::{ScriptNodeResponse, TemplateResponse};

fn to_js<T: Serialize>(value: &T) -> JsValue {
    serde_wasm_bindgen::to_value(value).unwrap_or(JsValue::NULL)
}

#[wasm_bindgen]
pub fn format_miniscript(input: &str) -> String {
    to_display_form(input)
}

/// Format with options given as a JS object, e.g. `{ max_line_width: 60 }`
#[wasm_bindgen]
pub fn format_miniscript_with(input: &str, options: JsValue) -> String {
    let options: FormatOptions = serde_wasm_bindgen::from_value(options).unwrap_or_else(|e| {
        console_log!("Invalid format options, using defaults: {}", e);
        FormatOptions::default()
    });
    to_display_form_with(input, &options)
}

#[wasm_bindgen]
pub fn unformat_miniscript(input: &str) -> String {
    to_compact_form(input)
}

#[wasm_bindgen]
pub fn create_miniscript_template(template: &str, address_type: &str) -> JsValue {
    console_log!("Creating miniscript template with address type: {}", address_type);

    let result = AddressType::from_str(address_type)
        .and_then(|ty| MiniscriptTemplateValidator.create_template(template, ty));
    let response = match result {
        Ok(created) => TemplateResponse {
            success: true,
            error: None,
            normalized_template: Some(created.normalized_template),
            is_valid_tapscript: Some(created.is_valid_tapscript),
        },
        Err(e) => TemplateResponse {
            success: false,
            error: Some(e),
            normalized_template: None,
            is_valid_tapscript: None,
        },
    };

    to_js(&response)
}

/// Decide on a result obtained from the wallet backend
#[wasm_bindgen]
pub fn decide_template_policy(address_type: &str, normalized_template: &str, is_valid_tapscript: bool) -> JsValue {
    let decision = match AddressType::from_str(address_type) {
        Ok(ty) => decide(
            ty,
            &TemplateCreationResult {
                normalized_template: normalized_template.to_string(),
                is_valid_tapscript,
            },
        ),
        Err(reason) => PolicyDecision::Reject { reason },
    };
    to_js(&decision)
}

/// Validate edited text with rust-miniscript and decide on it
#[wasm_bindgen]
pub fn submit_miniscript_template(text: &str, address_type: &str) -> JsValue {
    console_log!("=== SUBMIT_MINISCRIPT_TEMPLATE CALLED ===");
    let decision = match AddressType::from_str(address_type) {
        Ok(ty) => submit_template(&MiniscriptTemplateValidator, text, ty),
        Err(reason) => PolicyDecision::Reject { reason },
    };
    to_js(&decision)
}

#[wasm_bindgen]
pub fn get_script_node(template: &str, address_type: &str) -> JsValue {
    let result = AddressType::from_str(address_type).and_then(|ty| build_script_node(template, ty));
    let response = match result {
        Ok(node) => ScriptNodeResponse {
            success: true,
            error: None,
            key_positions: Some(node.key_positions().into_iter().collect()),
            node: Some(node),
        },
        Err(e) => ScriptNodeResponse {
            success: false,
            error: Some(e),
            node: None,
            key_positions: None,
        },
    };
    to_js(&response)
}

/// Whether every placeholder key of the template has a signer; `assigned` is a JS array of key names
#[wasm_bindgen]
pub fn are_all_keys_assigned(template: &str, address_type: &str, assigned: JsValue) -> bool {
    let assigned: HashSet<String> = match serde_wasm_bindgen::from_value(assigned) {
        Ok(keys) => keys,
        Err(e) => {
            console_log!("Invalid key list: {}", e);
            return false;
        }
    };
    AddressType::from_str(address_type)
        .and_then(|ty| build_script_node(template, ty))
        .map(|node| node.are_all_keys_assigned(&assigned))
        .unwrap_or(false)
}

#[wasm_bindgen(start)]
pub fn main() {
    console_log!("=== MINISCRIPT TEMPLATE WASM MODULE LOADED ===");
}
