//! Voting preference maps.

use std::collections::BTreeMap;

/// Agenda id to chosen option.
pub type VoteChoices = BTreeMap<String, String>;

/// Treasury key or tspend hash to policy.
pub type PolicyMap = BTreeMap<String, String>;

/// Values accepted in treasury and tspend policy maps.
pub const POLICY_VALUES: &[&str] = &["yes", "no", "abstain", "invalid"];
