//! Tests for the template pipeline: validation, policy decision and submission
//!
//! These run the public API end-to-end with the rust-miniscript validator and
//! with stand-in validators for the backend.

use miniscript_template_wasm::validation::normalize_in_context;
use miniscript_template_wasm::types::ScriptContextKind;
use miniscript_template_wasm::{
    decide, submit_template, to_display_form, AddressType, MiniscriptTemplateValidator, PolicyDecision,
    TemplateCreationResult, TemplateValidator,
};
use serde_json::json;

const TIMELOCKED_TEMPLATE: &str =
    "andor(ln:older(12900),thresh(2,pk(A),s:pk(B),s:pk(C)),thresh(2,pk(A),s:pk(D),s:pk(E)))";

const ALL_ADDRESS_TYPES: [AddressType; 5] = [
    AddressType::Any,
    AddressType::Legacy,
    AddressType::NestedSegwit,
    AddressType::NativeSegwit,
    AddressType::Taproot,
];

/// Backend stand-in that always fails
struct UnreachableBackend;

impl TemplateValidator for UnreachableBackend {
    fn create_template(&self, _template: &str, _address_type: AddressType) -> Result<TemplateCreationResult, String> {
        Err("Network unavailable".to_string())
    }
}

/// Backend stand-in that replays a canned result
struct CannedBackend(TemplateCreationResult);

impl TemplateValidator for CannedBackend {
    fn create_template(&self, _template: &str, _address_type: AddressType) -> Result<TemplateCreationResult, String> {
        Ok(self.0.clone())
    }
}

fn created(template: &str, is_valid_tapscript: bool) -> TemplateCreationResult {
    TemplateCreationResult {
        normalized_template: template.to_string(),
        is_valid_tapscript,
    }
}

#[test]
fn test_decision_scenarios() {
    assert_eq!(
        decide(AddressType::NativeSegwit, &created("", false)),
        PolicyDecision::Reject { reason: "Format not supported".to_string() }
    );
    assert_eq!(
        decide(AddressType::NativeSegwit, &created("andor(...)", true)),
        PolicyDecision::OfferTaprootUpgrade { template: "andor(...)".to_string() }
    );
    assert_eq!(
        decide(AddressType::Taproot, &created("andor(...)", true)),
        PolicyDecision::Accept { template: "andor(...)".to_string() }
    );
    assert_eq!(
        decide(AddressType::Legacy, &created("thresh(2,pk(A),pk(B))", false)),
        PolicyDecision::Accept { template: "thresh(2,pk(A),pk(B))".to_string() }
    );
}

#[test]
fn test_decision_is_total() {
    for ty in ALL_ADDRESS_TYPES {
        for template in ["", "pk(A)"] {
            for tapscript in [false, true] {
                let decision = decide(ty, &created(template, tapscript));
                match decision {
                    PolicyDecision::Reject { .. } => assert!(template.is_empty()),
                    PolicyDecision::Accept { ref template } => {
                        assert_eq!(template, "pk(A)");
                        assert!(ty == AddressType::Taproot || !tapscript);
                    }
                    PolicyDecision::OfferTaprootUpgrade { ref template } => {
                        assert_eq!(template, "pk(A)");
                        assert!(ty != AddressType::Taproot && tapscript);
                    }
                }
            }
        }
    }
}

#[test]
fn test_decision_json_shape() {
    let reject = serde_json::to_value(PolicyDecision::Reject { reason: "Format not supported".to_string() }).unwrap();
    assert_eq!(reject, json!({"decision": "reject", "reason": "Format not supported"}));

    let upgrade = serde_json::to_value(PolicyDecision::OfferTaprootUpgrade { template: "pk(A)".to_string() }).unwrap();
    assert_eq!(upgrade, json!({"decision": "offer_taproot_upgrade", "template": "pk(A)"}));
}

#[test]
fn test_validator_accepts_segwit_template_without_taproot_flag() {
    let result = MiniscriptTemplateValidator
        .create_template("thresh(2,pk(A),s:pk(B))", AddressType::NativeSegwit)
        .unwrap();
    assert!(result.normalized_template.starts_with("thresh(2,"));
    assert!(!result.is_valid_tapscript);
}

#[test]
fn test_validator_flags_tapscript_only_template() {
    let result = MiniscriptTemplateValidator
        .create_template("multi_a(2,A,B,C)", AddressType::NativeSegwit)
        .unwrap();
    assert_eq!(
        result.normalized_template,
        normalize_in_context("multi_a(2,A,B,C)", ScriptContextKind::Tap).unwrap()
    );
    assert!(result.is_valid_tapscript);
}

#[test]
fn test_validator_rejects_segwit_only_fragment_for_taproot() {
    let result = MiniscriptTemplateValidator
        .create_template("multi(2,A,B,C)", AddressType::Taproot)
        .unwrap();
    assert!(result.normalized_template.is_empty());
}

#[test]
fn test_validator_unparseable_and_blank_input() {
    let result = MiniscriptTemplateValidator
        .create_template("thresh(2,pk(A)", AddressType::NativeSegwit)
        .unwrap();
    assert_eq!(result, TemplateCreationResult::unsupported());

    let err = MiniscriptTemplateValidator
        .create_template(" \n ", AddressType::NativeSegwit)
        .unwrap_err();
    assert_eq!(err, "Template is empty");
}

#[test]
fn test_submit_display_form_template() {
    let display = to_display_form(TIMELOCKED_TEMPLATE);
    assert!(display.contains('\n'));

    let decision = submit_template(&MiniscriptTemplateValidator, &display, AddressType::NativeSegwit);
    assert!(matches!(decision, PolicyDecision::Accept { .. }), "got {:?}", decision);

    let decision = submit_template(&MiniscriptTemplateValidator, &display, AddressType::Taproot);
    assert!(matches!(decision, PolicyDecision::Accept { .. }), "got {:?}", decision);
}

#[test]
fn test_submit_tapscript_only_template_offers_upgrade() {
    let decision = submit_template(&MiniscriptTemplateValidator, "multi_a(2,A,B,C)", AddressType::NativeSegwit);
    assert!(matches!(decision, PolicyDecision::OfferTaprootUpgrade { .. }), "got {:?}", decision);

    let decision = submit_template(&MiniscriptTemplateValidator, "multi_a(2,A,B,C)", AddressType::Taproot);
    assert!(matches!(decision, PolicyDecision::Accept { .. }), "got {:?}", decision);
}

#[test]
fn test_submit_unsupported_template() {
    let decision = submit_template(&MiniscriptTemplateValidator, "not a template", AddressType::Legacy);
    assert_eq!(decision, PolicyDecision::Reject { reason: "Format not supported".to_string() });
}

#[test]
fn test_submit_surfaces_backend_failure() {
    let decision = submit_template(&UnreachableBackend, TIMELOCKED_TEMPLATE, AddressType::NativeSegwit);
    assert_eq!(decision, PolicyDecision::Reject { reason: "Network unavailable".to_string() });
}

#[test]
fn test_submit_with_backend_result() {
    let backend = CannedBackend(created(TIMELOCKED_TEMPLATE, true));
    let decision = submit_template(&backend, &to_display_form(TIMELOCKED_TEMPLATE), AddressType::NestedSegwit);
    assert_eq!(
        decision,
        PolicyDecision::OfferTaprootUpgrade { template: TIMELOCKED_TEMPLATE.to_string() }
    );

    let validator: &dyn TemplateValidator = &backend;
    let decision = submit_template(validator, TIMELOCKED_TEMPLATE, AddressType::Taproot);
    assert_eq!(decision.template(), Some(TIMELOCKED_TEMPLATE));
}
