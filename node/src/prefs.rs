//! Validation of voting preferences submitted by clients.

use vsp_store::Ticket;
use vsp_types::prefs::POLICY_VALUES;
use vsp_types::{ChainParams, PolicyMap, VoteChoices};

/// The three preference maps of a request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Preferences {
    pub vote_choices: VoteChoices,
    pub treasury_policy: PolicyMap,
    pub tspend_policy: PolicyMap,
}

pub fn validate_vote_choices(choices: &VoteChoices, params: &ChainParams) -> Result<(), String> {
    for (agenda_id, choice) in choices {
        let agenda = params.agenda(agenda_id).ok_or_else(|| {
            format!(
                "agenda {agenda_id:?} not found for vote version {}",
                params.vote_version
            )
        })?;
        if !agenda.has_choice(choice) {
            return Err(format!("choice {choice:?} not found for agenda {agenda_id:?}"));
        }
    }
    Ok(())
}

fn is_hex32(key: &str) -> bool {
    matches!(hex::decode(key), Ok(bytes) if bytes.len() == 32)
}

fn validate_policy(policy: &PolicyMap, what: &str) -> Result<(), String> {
    for (key, value) in policy {
        if !is_hex32(key) {
            return Err(format!("{what} {key:?} is not 32 bytes of hex"));
        }
        if !POLICY_VALUES.contains(&value.as_str()) {
            return Err(format!("policy {value:?} for {what} {key:?} is not valid"));
        }
    }
    Ok(())
}

/// Keys are treasury spend public keys.
pub fn validate_treasury_policy(policy: &PolicyMap) -> Result<(), String> {
    validate_policy(policy, "treasury key")
}

/// Keys are treasury spend transaction hashes.
pub fn validate_tspend_policy(policy: &PolicyMap) -> Result<(), String> {
    validate_policy(policy, "tspend hash")
}

impl Preferences {
    /// All three maps must be valid.
    pub fn validate(&self, params: &ChainParams) -> Result<(), String> {
        validate_vote_choices(&self.vote_choices, params)?;
        validate_treasury_policy(&self.treasury_policy)?;
        validate_tspend_policy(&self.tspend_policy)
    }

    /// Split into the maps that pass validation, logging each one rejected.
    pub fn keep_valid(self, params: &ChainParams) -> ValidPreferences {
        fn keep<T>(value: T, check: Result<(), String>, what: &str) -> Option<T> {
            match check {
                Ok(()) => Some(value),
                Err(e) => {
                    tracing::warn!(error = %e, "ignoring invalid {what}");
                    None
                }
            }
        }
        let choices_ok = validate_vote_choices(&self.vote_choices, params);
        let treasury_ok = validate_treasury_policy(&self.treasury_policy);
        let tspend_ok = validate_tspend_policy(&self.tspend_policy);
        ValidPreferences {
            vote_choices: keep(self.vote_choices, choices_ok, "vote choices"),
            treasury_policy: keep(self.treasury_policy, treasury_ok, "treasury policy"),
            tspend_policy: keep(self.tspend_policy, tspend_ok, "tspend policy"),
        }
    }
}

/// Submitted maps that passed validation; `None` where one was rejected.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidPreferences {
    pub vote_choices: Option<VoteChoices>,
    pub treasury_policy: Option<PolicyMap>,
    pub tspend_policy: Option<PolicyMap>,
}

impl ValidPreferences {
    /// Names of the submitted maps that failed validation.
    pub fn rejected(&self) -> Vec<&'static str> {
        [
            ("vote choices", self.vote_choices.is_none()),
            ("treasury policy", self.treasury_policy.is_none()),
            ("tspend policy", self.tspend_policy.is_none()),
        ]
        .into_iter()
        .filter_map(|(name, rejected)| rejected.then_some(name))
        .collect()
    }

    /// Replace each accepted map on the ticket; rejected maps leave it as it was.
    pub fn apply_to(&self, ticket: &mut Ticket) {
        if let Some(choices) = &self.vote_choices {
            ticket.vote_choices = choices.clone();
        }
        if let Some(policy) = &self.treasury_policy {
            ticket.treasury_policy = policy.clone();
        }
        if let Some(policy) = &self.tspend_policy {
            ticket.tspend_policy = policy.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vsp_types::NetworkId;

    fn params() -> &'static ChainParams {
        ChainParams::for_network(NetworkId::Testnet)
    }

    fn map(entries: &[(&str, &str)]) -> PolicyMap {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn vote_choices_must_name_known_agendas_and_options() {
        assert!(validate_vote_choices(&map(&[("blake3pow", "yes")]), params()).is_ok());
        assert!(validate_vote_choices(&map(&[("blake3pow", "maybe")]), params()).is_err());
        assert!(validate_vote_choices(&map(&[("nosuchagenda", "yes")]), params()).is_err());
    }

    #[test]
    fn policy_keys_are_32_byte_hex() {
        let key = "aa".repeat(32);
        assert!(validate_treasury_policy(&map(&[(key.as_str(), "no")])).is_ok());
        assert!(validate_treasury_policy(&map(&[("aabb", "no")])).is_err());
        assert!(validate_tspend_policy(&map(&[(key.as_str(), "perhaps")])).is_err());
        assert!(validate_tspend_policy(&map(&[("zz".repeat(32).as_str(), "yes")])).is_err());
    }

    #[test]
    fn rejected_maps_are_dropped_individually() {
        let key = "0f".repeat(32);
        let prefs = Preferences {
            vote_choices: map(&[("blake3pow", "sideways")]),
            treasury_policy: map(&[(key.as_str(), "yes")]),
            tspend_policy: map(&[("short", "yes")]),
        };
        assert!(prefs.validate(params()).is_err());
        let kept = prefs.keep_valid(params());
        assert!(kept.vote_choices.is_none());
        assert_eq!(kept.treasury_policy.as_ref().map(|m| m.len()), Some(1));
        assert!(kept.tspend_policy.is_none());
        assert_eq!(kept.rejected(), ["vote choices", "tspend policy"]);
    }
}
