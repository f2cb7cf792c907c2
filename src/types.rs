//! Data structures shared by the template pipeline

use serde::{Deserialize, Serialize};
use std::fmt;

/// Script type a wallet (and therefore its template) is created for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressType {
    Any,
    Legacy,
    NestedSegwit,
    NativeSegwit,
    Taproot,
}

impl AddressType {
    /// Parse an address type name, accepting the usual script aliases
    pub fn from_str(s: &str) -> Result<Self, String> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "any" => Ok(AddressType::Any),
            "legacy" | "p2sh" => Ok(AddressType::Legacy),
            "nested_segwit" | "p2sh_p2wsh" | "sh_wsh" => Ok(AddressType::NestedSegwit),
            "native_segwit" | "segwit" | "p2wsh" | "wsh" => Ok(AddressType::NativeSegwit),
            "taproot" | "p2tr" | "tr" => Ok(AddressType::Taproot),
            _ => Err(format!(
                "Invalid address type: {}. Use 'legacy', 'nested_segwit', 'native_segwit', 'taproot' or 'any'",
                s
            )),
        }
    }

    pub fn is_taproot(self) -> bool {
        self == AddressType::Taproot
    }

    /// Miniscript context a template for this address type is checked in
    pub fn script_context(self) -> ScriptContextKind {
        match self {
            AddressType::Legacy => ScriptContextKind::Legacy,
            AddressType::Taproot => ScriptContextKind::Tap,
            AddressType::Any | AddressType::NestedSegwit | AddressType::NativeSegwit => {
                ScriptContextKind::Segwitv0
            }
        }
    }
}

impl fmt::Display for AddressType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AddressType::Any => "any",
            AddressType::Legacy => "legacy",
            AddressType::NestedSegwit => "nested_segwit",
            AddressType::NativeSegwit => "native_segwit",
            AddressType::Taproot => "taproot",
        };
        f.write_str(name)
    }
}

/// Miniscript script context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScriptContextKind {
    Legacy,
    Segwitv0,
    Tap,
}

/// Outcome of the "create template" operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateCreationResult {
    /// Empty when the input could not be parsed
    pub normalized_template: String,
    /// Only meaningful when `normalized_template` is non-empty
    pub is_valid_tapscript: bool,
}

impl TemplateCreationResult {
    pub fn unsupported() -> Self {
        Self {
            normalized_template: String::new(),
            is_valid_tapscript: false,
        }
    }
}

/// What to do with a submitted template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum PolicyDecision {
    Reject { reason: String },
    Accept { template: String },
    OfferTaprootUpgrade { template: String },
}

impl PolicyDecision {
    pub fn is_reject(&self) -> bool {
        matches!(self, PolicyDecision::Reject { .. })
    }

    /// The template carried by an accepting decision
    pub fn template(&self) -> Option<&str> {
        match self {
            PolicyDecision::Reject { .. } => None,
            PolicyDecision::Accept { template } | PolicyDecision::OfferTaprootUpgrade { template } => {
                Some(template)
            }
        }
    }
}

// ============================================================================
// Responses returned to JavaScript
// ============================================================================

/// Result structure returned to JavaScript for template creation
#[derive(Serialize, Deserialize)]
pub struct TemplateResponse {
    pub success: bool,
    pub error: Option<String>,
    pub normalized_template: Option<String>,
    pub is_valid_tapscript: Option<bool>,
}

/// Result structure returned to JavaScript for script node trees
#[derive(Serialize, Deserialize)]
pub struct ScriptNodeResponse {
    pub success: bool,
    pub error: Option<String>,
    pub node: Option<crate::tree::ScriptNode>,
    pub key_positions: Option<Vec<(String, String)>>,
}
