//! Script node tree of a template
//!
//! Walks the miniscript fragments of a template and turns them into the node
//! tree the wallet configuration screens walk: one node per condition, with
//! the placeholder keys that still need a signer, their positions, and
//! readable labels for timelocks.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use bitcoin::absolute::LOCK_TIME_THRESHOLD;
use bitcoin::{relative, Sequence};
use miniscript::{Legacy, Miniscript, ScriptContext, Segwitv0, Tap, Terminal};
use serde::{Deserialize, Serialize};

use crate::console_log;
use crate::format::to_compact_form;
use crate::types::{AddressType, ScriptContextKind};
use crate::utils::group_thousands;
use crate::validation::parse_template;

const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScriptNodeType {
    Pk,
    Older,
    After,
    Hash160,
    Hash256,
    Ripemd160,
    Sha256,
    And,
    Or,
    AndOr,
    Thresh,
    Multi,
    Trivial,
    Unsatisfiable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimelockBased {
    Height,
    Time,
}

/// Timelock of an `older` or `after` node
///
/// `value` is a block count or height for height based locks. For time based
/// locks it is a duration in seconds (`older`) or a unix timestamp (`after`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeLock {
    pub based: TimelockBased,
    pub value: u64,
}

impl TimeLock {
    /// From an `after()` argument (nLockTime semantics)
    pub fn absolute(consensus: u32) -> Self {
        let based = if consensus >= LOCK_TIME_THRESHOLD {
            TimelockBased::Time
        } else {
            TimelockBased::Height
        };
        Self {
            based,
            value: consensus as u64,
        }
    }

    /// From an `older()` argument (nSequence semantics)
    pub fn relative(consensus: u32) -> Option<Self> {
        match Sequence::from_consensus(consensus).to_relative_lock_time()? {
            relative::LockTime::Blocks(height) => Some(Self {
                based: TimelockBased::Height,
                value: height.value() as u64,
            }),
            relative::LockTime::Time(time) => Some(Self {
                based: TimelockBased::Time,
                value: time.value() as u64 * 512,
            }),
        }
    }

    pub fn is_timestamp(&self) -> bool {
        self.based == TimelockBased::Time
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptNode {
    /// 1-based child indices from the root; empty for the root
    pub id: Vec<usize>,
    pub node_type: ScriptNodeType,
    pub keys: Vec<String>,
    pub subs: Vec<ScriptNode>,
    pub k: usize,
    /// Hash of hashlock nodes
    pub data: Option<String>,
    pub timelock: Option<TimeLock>,
}

impl ScriptNode {
    fn leaf(id: Vec<usize>, node_type: ScriptNodeType) -> Self {
        Self {
            id,
            node_type,
            keys: vec![],
            subs: vec![],
            k: 0,
            data: None,
            timelock: None,
        }
    }

    /// Every placeholder key used anywhere below this node
    pub fn all_keys(&self) -> BTreeSet<String> {
        let mut keys: BTreeSet<String> = self.keys.iter().cloned().collect();
        for sub in &self.subs {
            keys.extend(sub.all_keys());
        }
        keys
    }

    /// Position label of every key, e.g. `"1.2.1"`; a key used twice keeps its last position
    pub fn key_positions(&self) -> BTreeMap<String, String> {
        let mut positions = BTreeMap::new();
        collect_key_positions(self, "", &mut positions);
        positions
    }

    pub fn are_all_keys_assigned(&self, assigned: &HashSet<String>) -> bool {
        self.all_keys().iter().all(|key| assigned.contains(key))
    }

    pub fn display_name(&self) -> String {
        match self.node_type {
            ScriptNodeType::Pk => "PK".to_string(),
            ScriptNodeType::Older => match self.timelock {
                Some(lock) if lock.is_timestamp() => format!("After {}", format_duration(lock.value)),
                Some(lock) if lock.value == 1 => "After 1 block".to_string(),
                Some(lock) => format!("After {} blocks", group_thousands(lock.value as i64)),
                None => "After 0 blocks".to_string(),
            },
            ScriptNodeType::After => match self.timelock {
                Some(lock) if lock.is_timestamp() => {
                    format!("After {}", format_unix_timestamp(lock.value as i64))
                }
                Some(lock) if lock.value == 1 => "After 1 block".to_string(),
                Some(lock) => format!("After block {}", group_thousands(lock.value as i64)),
                None => "After block 0".to_string(),
            },
            ScriptNodeType::Hash160 => "HASH160".to_string(),
            ScriptNodeType::Hash256 => "HASH256".to_string(),
            ScriptNodeType::Ripemd160 => "RIPEMD160".to_string(),
            ScriptNodeType::Sha256 => "SHA256".to_string(),
            ScriptNodeType::And => "AND".to_string(),
            ScriptNodeType::Or => "OR".to_string(),
            ScriptNodeType::AndOr => "AND OR".to_string(),
            ScriptNodeType::Thresh => format!("Thresh {}/{}", self.k, self.subs.len()),
            ScriptNodeType::Multi => format!("Multisig {}/{}", self.k, self.keys.len()),
            ScriptNodeType::Trivial => "Always".to_string(),
            ScriptNodeType::Unsatisfiable => "Never".to_string(),
        }
    }

    /// Explanation shown under the node name; `now_unix` dates absolute time locks
    pub fn description(&self, now_unix: i64) -> String {
        match self.node_type {
            ScriptNodeType::Pk => "Public key".to_string(),
            ScriptNodeType::Older => "From the time the coins are received.".to_string(),
            ScriptNodeType::After => match self.timelock {
                Some(lock) if lock.is_timestamp() => {
                    let diff = lock.value as i64 - now_unix;
                    // Round up: any part of a day left counts as a day
                    let days = (diff + SECONDS_PER_DAY - 1).div_euclid(SECONDS_PER_DAY);
                    match days {
                        d if d <= 0 => String::new(),
                        1 => "1 day from today.".to_string(),
                        d => format!("{} days from today.", d),
                    }
                }
                _ => "When the specified block height is reached.".to_string(),
            },
            ScriptNodeType::Hash160 => {
                "Requires a preimage that hashes to a given value with HASH160".to_string()
            }
            ScriptNodeType::Hash256 => {
                "Requires a preimage that hashes to a given value with HASH256".to_string()
            }
            ScriptNodeType::Ripemd160 => {
                "Requires a preimage that hashes to a given value with RIPEMD160".to_string()
            }
            ScriptNodeType::Sha256 => {
                "Requires a preimage that hashes to a given value with SHA256".to_string()
            }
            ScriptNodeType::And => "Both conditions must be satisfied.".to_string(),
            ScriptNodeType::Or => "Only one condition needs to be satisfied.".to_string(),
            ScriptNodeType::AndOr => "If the first condition is met, the second must also be met. \
                 If the first condition isn't met, the third must be met instead.\n\
                 (Note: Timelocks cannot revoke an earlier spend path.)"
                .to_string(),
            ScriptNodeType::Thresh => "Requires M of N conditions.".to_string(),
            ScriptNodeType::Multi => "Requires M of N keys.".to_string(),
            ScriptNodeType::Trivial | ScriptNodeType::Unsatisfiable => String::new(),
        }
    }

    /// Like [`ScriptNode::description`], but counts down to an `after` block height
    pub fn after_block_description(&self, current_height: u32, now_unix: i64) -> String {
        match (self.node_type, self.timelock) {
            (ScriptNodeType::After, Some(lock)) if !lock.is_timestamp() => {
                let diff = lock.value as i64 - current_height as i64;
                match diff {
                    d if d < 0 => String::new(),
                    1 => "1 block from the current block.".to_string(),
                    d => format!("{} blocks from the current block.", group_thousands(d)),
                }
            }
            _ => self.description(now_unix),
        }
    }
}

/// Build the node tree of a template for the given address type
pub fn build_script_node(template: &str, address_type: AddressType) -> Result<ScriptNode, String> {
    let template = to_compact_form(template);
    console_log!("Building script node for {}: {}", address_type, template);

    match address_type.script_context() {
        ScriptContextKind::Legacy => Ok(build_node(&parse_template::<Legacy>(&template)?, Vec::new())),
        ScriptContextKind::Segwitv0 => Ok(build_node(&parse_template::<Segwitv0>(&template)?, Vec::new())),
        ScriptContextKind::Tap => Ok(build_node(&parse_template::<Tap>(&template)?, Vec::new())),
    }
}

fn child_id(parent: &[usize], index: usize) -> Vec<usize> {
    let mut id = parent.to_vec();
    id.push(index + 1);
    id
}

fn is_false<Ctx: ScriptContext>(ms: &Miniscript<String, Ctx>) -> bool {
    matches!(ms.node, Terminal::False)
}

/// Recursively build the node for a miniscript fragment
///
/// Wrappers (`a:`, `s:`, `c:`, `d:`, `v:`, `j:`, `n:`, `t:`, `l:`, `u:`) are
/// transparent and keep the id of the fragment they wrap.
fn build_node<Ctx: ScriptContext>(ms: &Miniscript<String, Ctx>, id: Vec<usize>) -> ScriptNode {
    match &ms.node {
        Terminal::Alt(sub)
        | Terminal::Swap(sub)
        | Terminal::Check(sub)
        | Terminal::DupIf(sub)
        | Terminal::Verify(sub)
        | Terminal::NonZero(sub)
        | Terminal::ZeroNotEqual(sub) => build_node(sub, id),
        Terminal::AndV(left, right) if matches!(right.node, Terminal::True) => build_node(left, id),
        Terminal::OrI(left, right) if is_false(left) => build_node(right, id),
        Terminal::OrI(left, right) if is_false(right) => build_node(left, id),

        Terminal::True => ScriptNode::leaf(id, ScriptNodeType::Trivial),
        Terminal::False => ScriptNode::leaf(id, ScriptNodeType::Unsatisfiable),
        Terminal::PkK(pk) | Terminal::PkH(pk) => ScriptNode {
            keys: vec![pk.clone()],
            ..ScriptNode::leaf(id, ScriptNodeType::Pk)
        },
        Terminal::RawPkH(hash) => hash_node(id, ScriptNodeType::Pk, hash.to_string()),
        Terminal::After(t) => ScriptNode {
            timelock: Some(TimeLock::absolute(t.to_consensus_u32())),
            ..ScriptNode::leaf(id, ScriptNodeType::After)
        },
        Terminal::Older(t) => ScriptNode {
            timelock: TimeLock::relative(t.to_consensus_u32()),
            ..ScriptNode::leaf(id, ScriptNodeType::Older)
        },
        Terminal::Sha256(h) => hash_node(id, ScriptNodeType::Sha256, h.to_string()),
        Terminal::Hash256(h) => hash_node(id, ScriptNodeType::Hash256, h.to_string()),
        Terminal::Ripemd160(h) => hash_node(id, ScriptNodeType::Ripemd160, h.to_string()),
        Terminal::Hash160(h) => hash_node(id, ScriptNodeType::Hash160, h.to_string()),

        Terminal::AndV(left, right) | Terminal::AndB(left, right) => {
            branch_node(id, ScriptNodeType::And, [left.as_ref(), right.as_ref()])
        }
        // and_n(X,Y) is andor(X,Y,0)
        Terminal::AndOr(a, b, c) if is_false(c) => branch_node(id, ScriptNodeType::And, [a.as_ref(), b.as_ref()]),
        Terminal::AndOr(a, b, c) => branch_node(id, ScriptNodeType::AndOr, [a.as_ref(), b.as_ref(), c.as_ref()]),
        Terminal::OrB(left, right)
        | Terminal::OrD(left, right)
        | Terminal::OrC(left, right)
        | Terminal::OrI(left, right) => branch_node(id, ScriptNodeType::Or, [left.as_ref(), right.as_ref()]),

        Terminal::Thresh(thresh) => {
            let subs = thresh
                .iter()
                .enumerate()
                .map(|(i, sub)| build_node(sub, child_id(&id, i)))
                .collect();
            ScriptNode {
                subs,
                k: thresh.k(),
                ..ScriptNode::leaf(id, ScriptNodeType::Thresh)
            }
        }
        Terminal::Multi(thresh) => ScriptNode {
            keys: thresh.iter().cloned().collect(),
            k: thresh.k(),
            ..ScriptNode::leaf(id, ScriptNodeType::Multi)
        },
        Terminal::MultiA(thresh) => ScriptNode {
            keys: thresh.iter().cloned().collect(),
            k: thresh.k(),
            ..ScriptNode::leaf(id, ScriptNodeType::Multi)
        },
    }
}

fn branch_node<Ctx: ScriptContext, const N: usize>(
    id: Vec<usize>,
    node_type: ScriptNodeType,
    children: [&Miniscript<String, Ctx>; N],
) -> ScriptNode {
    let subs = children
        .iter()
        .enumerate()
        .map(|(i, sub)| build_node(sub, child_id(&id, i)))
        .collect();
    ScriptNode {
        subs,
        ..ScriptNode::leaf(id, node_type)
    }
}

fn hash_node(id: Vec<usize>, node_type: ScriptNodeType, hash: String) -> ScriptNode {
    ScriptNode {
        data: Some(hash),
        ..ScriptNode::leaf(id, node_type)
    }
}

fn collect_key_positions(node: &ScriptNode, prefix: &str, positions: &mut BTreeMap<String, String>) {
    let position = |index: usize| {
        if prefix.is_empty() {
            format!("{}", index + 1)
        } else {
            format!("{}.{}", prefix, index + 1)
        }
    };
    for (i, key) in node.keys.iter().enumerate() {
        positions.insert(key.clone(), position(i));
    }
    for (i, sub) in node.subs.iter().enumerate() {
        collect_key_positions(sub, &position(i), positions);
    }
}

/// Format a duration in seconds as `"2d 3h 15m"`, `"0d"` when under a minute
fn format_duration(seconds: u64) -> String {
    let days = seconds / SECONDS_PER_DAY as u64;
    let hours = (seconds % SECONDS_PER_DAY as u64) / 3600;
    let minutes = (seconds % 3600) / 60;

    let mut parts = Vec::new();
    if days > 0 {
        parts.push(format!("{}d", days));
    }
    if hours > 0 {
        parts.push(format!("{}h", hours));
    }
    if minutes > 0 {
        parts.push(format!("{}m", minutes));
    }

    if parts.is_empty() {
        "0d".to_string()
    } else {
        parts.join(" ")
    }
}

/// Format a unix timestamp as `MM/dd/yyyy`, with ` HH:mm` unless it is midnight (UTC)
fn format_unix_timestamp(timestamp: i64) -> String {
    let days_since_epoch = timestamp.div_euclid(SECONDS_PER_DAY);
    let seconds_of_day = timestamp.rem_euclid(SECONDS_PER_DAY);

    let mut year = 1970;
    let mut remaining_days = days_since_epoch;
    loop {
        let days_in_year = if is_leap_year(year) { 366 } else { 365 };
        if remaining_days < days_in_year {
            break;
        }
        remaining_days -= days_in_year;
        year += 1;
    }

    let days_in_months = if is_leap_year(year) {
        [31, 29, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31]
    } else {
        [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31]
    };

    let mut month = 12;
    for (i, &days) in days_in_months.iter().enumerate() {
        if remaining_days < days {
            month = i + 1;
            break;
        }
        remaining_days -= days;
    }
    let day = remaining_days + 1;

    let date = format!("{:02}/{:02}/{}", month, day, year);
    let hour = seconds_of_day / 3600;
    let minute = (seconds_of_day % 3600) / 60;
    if hour == 0 && minute == 0 {
        date
    } else {
        format!("{} {:02}:{:02}", date, hour, minute)
    }
}

fn is_leap_year(year: i64) -> bool {
    (year % 4 == 0 && year % 100 != 0) || (year % 400 == 0)
}
