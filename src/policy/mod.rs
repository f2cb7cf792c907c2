//! Taproot policy decision for submitted templates

use crate::types::{AddressType, PolicyDecision, TemplateCreationResult};

/// Reason given when the validator could not normalize a template
pub const FORMAT_NOT_SUPPORTED: &str = "Format not supported";

/// Decide what happens to a template once the validator has looked at it
pub fn decide(requested: AddressType, result: &TemplateCreationResult) -> PolicyDecision {
    if result.normalized_template.is_empty() {
        return PolicyDecision::Reject {
            reason: FORMAT_NOT_SUPPORTED.to_string(),
        };
    }

    let template = result.normalized_template.clone();
    if !requested.is_taproot() && result.is_valid_tapscript {
        PolicyDecision::OfferTaprootUpgrade { template }
    } else {
        PolicyDecision::Accept { template }
    }
}
