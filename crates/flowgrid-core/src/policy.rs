//! Policy hits recorded on flow logs.
//!
//! A hit is stored as `"<order>|<tier>|<name>|<action>|<rule>"`, where:
//!
//! - `<order>` is the tier's position in evaluation order,
//! - `<name>` is `tier.policy` for global policies, `ns/tier.policy` for
//!   namespaced ones, `ns/knp.default.policy` for Kubernetes network policies
//!   and `__PROFILE__.kns.<ns>` for namespace profiles; a `staged:` marker in
//!   front of the policy part flags a staged policy,
//! - `<rule>` is the matching rule index or `-` when no specific rule matched.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

const PROFILE_TIER: &str = "__PROFILE__";
const PROFILE_PREFIX: &str = "__PROFILE__.kns.";
const STAGED_PREFIX: &str = "staged:";
const KNP_PREFIX: &str = "knp.default.";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PolicyHit {
    pub tier_order: i64,
    pub tier: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,
    pub name: String,
    pub action: String,
    /// `None` when the hit was not attributed to a specific rule.
    #[serde(default)]
    pub rule_index: Option<u32>,
    #[serde(default)]
    pub is_staged: bool,
    #[serde(default)]
    pub is_kubernetes: bool,
    #[serde(default)]
    pub is_profile: bool,
    pub count: i64,
}

impl PolicyHit {
    /// Parse a stored hit string. Exactly five `|`-separated fields are
    /// required.
    pub fn parse(hit: &str, count: i64) -> CoreResult<Self> {
        let fields: Vec<&str> = hit.split('|').collect();
        let [order, tier, full_name, action, rule] = fields.as_slice() else {
            return Err(CoreError::InvalidPolicyHit(format!(
                "{hit:?} has {} fields, expected 5",
                fields.len()
            )));
        };

        let tier_order = order
            .parse::<i64>()
            .map_err(|_| CoreError::InvalidPolicyHit(format!("{hit:?} has bad tier order")))?;
        if tier.is_empty() || full_name.is_empty() || action.is_empty() {
            return Err(CoreError::InvalidPolicyHit(format!(
                "{hit:?} has an empty field"
            )));
        }
        let rule_index = match *rule {
            "-" => None,
            n => Some(n.parse::<u32>().map_err(|_| {
                CoreError::InvalidPolicyHit(format!("{hit:?} has bad rule index"))
            })?),
        };

        let mut out = PolicyHit {
            tier_order,
            tier: tier.to_string(),
            namespace: String::new(),
            name: String::new(),
            action: action.to_string(),
            rule_index,
            is_staged: false,
            is_kubernetes: false,
            is_profile: false,
            count,
        };

        if *tier == PROFILE_TIER {
            let ns = full_name.strip_prefix(PROFILE_PREFIX).ok_or_else(|| {
                CoreError::InvalidPolicyHit(format!("{hit:?} has a malformed profile name"))
            })?;
            out.is_profile = true;
            out.name = format!("kns.{ns}");
            return Ok(out);
        }

        let mut rest = match full_name.split_once('/') {
            Some((ns, rest)) => {
                out.namespace = ns.to_string();
                rest
            }
            None => *full_name,
        };
        if let Some(r) = rest.strip_prefix(STAGED_PREFIX) {
            out.is_staged = true;
            rest = r;
        }
        if let Some(r) = rest.strip_prefix(KNP_PREFIX) {
            out.is_kubernetes = true;
            rest = r;
        } else {
            rest = rest
                .strip_prefix(*tier)
                .and_then(|r| r.strip_prefix('.'))
                .unwrap_or(rest);
            if let Some(r) = rest.strip_prefix(STAGED_PREFIX) {
                out.is_staged = true;
                rest = r;
            }
        }
        if rest.is_empty() {
            return Err(CoreError::InvalidPolicyHit(format!(
                "{hit:?} has no policy name"
            )));
        }
        out.name = rest.to_string();
        Ok(out)
    }

    /// Canonical stored form of this hit.
    pub fn to_hit_string(&self) -> String {
        let rule = self
            .rule_index
            .map(|r| r.to_string())
            .unwrap_or_else(|| "-".to_string());
        format!(
            "{}|{}|{}|{}|{rule}",
            self.tier_order,
            self.tier,
            self.stored_name(),
            self.action
        )
    }

    fn stored_name(&self) -> String {
        if self.is_profile {
            return format!("{PROFILE_TIER}.{}", self.name);
        }
        let staged = if self.is_staged { STAGED_PREFIX } else { "" };
        let policy = if self.is_kubernetes {
            format!("{staged}{KNP_PREFIX}{}", self.name)
        } else {
            format!("{}.{staged}{}", self.tier, self.name)
        };
        if self.namespace.is_empty() {
            policy
        } else {
            format!("{}/{policy}", self.namespace)
        }
    }

    /// Evaluation order: tier first, then rule. Hits without a rule index
    /// sort ahead of rule 0. Remaining ties fall back to tier, namespace,
    /// name and action so the order is total.
    pub fn evaluation_order(&self, other: &Self) -> Ordering {
        self.tier_order
            .cmp(&other.tier_order)
            .then_with(|| self.rule_index.cmp(&other.rule_index))
            .then_with(|| self.tier.cmp(&other.tier))
            .then_with(|| self.namespace.cmp(&other.namespace))
            .then_with(|| self.name.cmp(&other.name))
            .then_with(|| self.action.cmp(&other.action))
            .then_with(|| self.is_staged.cmp(&other.is_staged))
    }
}

impl fmt::Display for PolicyHit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hit_string())
    }
}
