//! Template validation
//!
//! The wallet backend owns the authoritative "create template" operation; it
//! is reached through [`TemplateValidator`]. [`MiniscriptTemplateValidator`]
//! answers the same question with rust-miniscript so the whole pipeline can
//! run without the backend.
//!
//! Templates use placeholder key names (`pk(A)`, `multi(2,KeyB,KeyC)`), so
//! they are parsed as `Miniscript<String, Ctx>`. Sanity rules such as
//! repeated keys are relaxed (placeholders are routinely reused across
//! spending paths) but the type system is still enforced.

use miniscript::{ExtParams, Legacy, Miniscript, ScriptContext, Segwitv0, Tap};

use crate::console_log;
use crate::format::to_compact_form;
use crate::policy::decide;
use crate::types::{AddressType, PolicyDecision, ScriptContextKind, TemplateCreationResult};

/// The "create template" operation of a wallet backend
pub trait TemplateValidator {
    /// Normalize `template` for `address_type`.
    ///
    /// An unparseable template is not an error: it yields an empty
    /// `normalized_template`. `Err` is reserved for failures of the call
    /// itself and carries a message for the user.
    fn create_template(
        &self,
        template: &str,
        address_type: AddressType,
    ) -> Result<TemplateCreationResult, String>;
}

/// Validator backed by rust-miniscript
#[derive(Debug, Clone, Copy, Default)]
pub struct MiniscriptTemplateValidator;

impl TemplateValidator for MiniscriptTemplateValidator {
    fn create_template(
        &self,
        template: &str,
        address_type: AddressType,
    ) -> Result<TemplateCreationResult, String> {
        let template = to_compact_form(template);
        if template.is_empty() {
            return Err("Template is empty".to_string());
        }

        console_log!("Creating template for {}: {}", address_type, template);

        let requested = normalize_in_context(&template, address_type.script_context());
        if address_type.is_taproot() {
            return Ok(match requested {
                Ok(normalized) => TemplateCreationResult {
                    normalized_template: normalized,
                    is_valid_tapscript: true,
                },
                Err(e) => {
                    console_log!("Tapscript parsing failed: {}", e);
                    TemplateCreationResult::unsupported()
                }
            });
        }

        match requested {
            Ok(normalized) => Ok(TemplateCreationResult {
                normalized_template: normalized,
                is_valid_tapscript: false,
            }),
            Err(e) => {
                console_log!("{} parsing failed: {}", address_type, e);
                // Fragments such as multi_a() only exist in tapscript
                match normalize_in_context(&template, ScriptContextKind::Tap) {
                    Ok(normalized) => Ok(TemplateCreationResult {
                        normalized_template: normalized,
                        is_valid_tapscript: true,
                    }),
                    Err(e) => {
                        console_log!("Tapscript parsing failed: {}", e);
                        Ok(TemplateCreationResult::unsupported())
                    }
                }
            }
        }
    }
}

/// Parse a placeholder-key template in one script context
pub fn parse_template<Ctx: ScriptContext>(template: &str) -> Result<Miniscript<String, Ctx>, String> {
    Miniscript::<String, Ctx>::from_str_ext(template, &ExtParams::insane())
        .map_err(|e| format!("Miniscript parsing failed: {}", e))
}

/// Parse and re-serialize a template in the given context
pub fn normalize_in_context(template: &str, context: ScriptContextKind) -> Result<String, String> {
    match context {
        ScriptContextKind::Legacy => parse_template::<Legacy>(template).map(|ms| ms.to_string()),
        ScriptContextKind::Segwitv0 => parse_template::<Segwitv0>(template).map(|ms| ms.to_string()),
        ScriptContextKind::Tap => parse_template::<Tap>(template).map(|ms| ms.to_string()),
    }
}

/// Run an edited template through the validator and the policy decision
///
/// `text` may be in display form. A failing validator call rejects the
/// submission with the validator's message; nothing is retried.
pub fn submit_template<V: TemplateValidator + ?Sized>(
    validator: &V,
    text: &str,
    address_type: AddressType,
) -> PolicyDecision {
    let compact = to_compact_form(text);
    match validator.create_template(&compact, address_type) {
        Ok(result) => decide(address_type, &result),
        Err(reason) => {
            console_log!("Template creation failed: {}", reason);
            PolicyDecision::Reject { reason }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multi_is_not_a_tapscript_fragment() {
        assert!(normalize_in_context("multi(2,A,B,C)", ScriptContextKind::Segwitv0).is_ok());
        assert!(normalize_in_context("multi(2,A,B,C)", ScriptContextKind::Tap).is_err());
    }

    #[test]
    fn test_multi_a_only_parses_as_tapscript() {
        assert!(normalize_in_context("multi_a(2,A,B,C)", ScriptContextKind::Tap).is_ok());
        assert!(normalize_in_context("multi_a(2,A,B,C)", ScriptContextKind::Segwitv0).is_err());
        assert!(normalize_in_context("multi_a(2,A,B,C)", ScriptContextKind::Legacy).is_err());
    }

    #[test]
    fn test_repeated_placeholder_keys_are_allowed() {
        let template =
            "andor(ln:older(12900),thresh(2,pk(A),s:pk(B),s:pk(C)),thresh(2,pk(A),s:pk(D),s:pk(E)))";
        assert!(normalize_in_context(template, ScriptContextKind::Segwitv0).is_ok());
        assert!(normalize_in_context(template, ScriptContextKind::Tap).is_ok());
    }

    #[test]
    fn test_type_errors_are_reported() {
        // thresh needs a B-type first argument
        let err = normalize_in_context("thresh(2,s:pk(A),pk(B))", ScriptContextKind::Segwitv0).unwrap_err();
        assert!(err.starts_with("Miniscript parsing failed"));
    }
}
