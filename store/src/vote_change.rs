//! Audit log of preference-changing requests.

use serde::{Deserialize, Serialize};
use vsp_types::TicketHash;

use crate::StoreError;

/// One accepted request and the signed response it produced.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteChangeRecord {
    /// Raw request body.
    pub request: String,
    /// Client signature header, as received.
    pub request_signature: String,
    /// Raw response body.
    pub response: String,
    /// Server signature over `response`, base64.
    pub response_signature: String,
}

/// Append-only per-ticket log, oldest records evicted past a cap.
pub trait VoteChangeStore: Send + Sync {
    /// Append `record`, then drop the oldest records beyond `max_records`.
    fn save_vote_change(
        &self,
        hash: &TicketHash,
        record: &VoteChangeRecord,
        max_records: usize,
    ) -> Result<(), StoreError>;

    /// All retained records for `hash`, oldest first.
    fn get_vote_changes(&self, hash: &TicketHash) -> Result<Vec<VoteChangeRecord>, StoreError>;

    /// Remove every record for `hash`.
    fn delete_vote_changes(&self, hash: &TicketHash) -> Result<(), StoreError>;
}
