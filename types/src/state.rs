//! Ticket state enums.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a ticket's fee payment.
///
/// Legal edges:
///
/// ```text
/// NoFee -> Pending -> Received -> Broadcast -> Confirmed
///                        |                        ^
///                        +------> Error ----------+
///                                   |
///                                   +-> Pending
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeeStatus {
    /// Registered but no fee address issued yet.
    NoFee,
    /// Fee address issued, waiting for the client to pay.
    Pending,
    /// Valid fee transaction received, not yet broadcast.
    Received,
    /// Fee transaction broadcast to the network.
    Broadcast,
    /// Fee transaction mined with enough confirmations.
    Confirmed,
    /// Broadcasting the fee transaction failed.
    Error,
}

impl FeeStatus {
    /// Whether `next` is a single legal step from `self`. Staying in place is legal.
    pub fn can_transition_to(self, next: FeeStatus) -> bool {
        use FeeStatus::*;
        self == next
            || matches!(
                (self, next),
                (NoFee, Pending)
                    | (Pending, Received)
                    | (Received, Broadcast)
                    | (Received, Error)
                    | (Broadcast, Confirmed)
                    | (Error, Confirmed)
                    | (Error, Pending)
            )
    }

    /// Whether `next` is reachable in one step or by passing through `Pending`.
    ///
    /// A single ledger write may carry a ticket from `NoFee` or `Error` straight
    /// to `Received`; both legs must be legal edges.
    pub fn can_reach(self, next: FeeStatus) -> bool {
        self.can_transition_to(next)
            || (self.can_transition_to(FeeStatus::Pending)
                && FeeStatus::Pending.can_transition_to(next))
    }

    /// A valid fee has been accepted for this ticket.
    pub fn is_received(self) -> bool {
        matches!(self, Self::Received | Self::Broadcast | Self::Confirmed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoFee => "none",
            Self::Pending => "pending",
            Self::Received => "received",
            Self::Broadcast => "broadcast",
            Self::Confirmed => "confirmed",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for FeeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Voting outcome of a ticket whose fee has been confirmed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TicketOutcome {
    /// Live and waiting to be selected.
    Voting,
    Voted,
    /// Never selected within its lifetime.
    Expired,
    /// Selected, but no vote made it into the block.
    Missed,
}

impl TicketOutcome {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Voting)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Voting => "voting",
            Self::Voted => "voted",
            Self::Expired => "expired",
            Self::Missed => "missed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::FeeStatus::*;
    use super::*;

    const ALL: [FeeStatus; 6] = [NoFee, Pending, Received, Broadcast, Confirmed, Error];

    #[test]
    fn only_backward_edge_is_error_to_pending() {
        let rank = |s: FeeStatus| match s {
            NoFee => 0,
            Pending => 1,
            Received => 2,
            Broadcast | Error => 3,
            Confirmed => 4,
        };
        for from in ALL {
            for to in ALL {
                if from != to && from.can_transition_to(to) && rank(to) <= rank(from) {
                    assert_eq!((from, to), (Error, Pending));
                }
            }
        }
    }

    #[test]
    fn confirmed_is_final() {
        for to in ALL {
            assert_eq!(Confirmed.can_transition_to(to), to == Confirmed);
        }
    }

    #[test]
    fn reach_through_pending() {
        assert!(Error.can_reach(Received));
        assert!(NoFee.can_reach(Received));
        assert!(!NoFee.can_reach(Broadcast));
        assert!(!Broadcast.can_reach(Received));
        assert!(!Confirmed.can_reach(Pending));
    }

    #[test]
    fn received_family() {
        assert!(Received.is_received());
        assert!(Broadcast.is_received());
        assert!(Confirmed.is_received());
        assert!(!Pending.is_received());
        assert!(!Error.is_received());
    }
}
