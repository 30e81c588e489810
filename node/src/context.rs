//! Shared service handles and the per-request context.

use std::convert::Infallible;
use std::sync::Arc;

use serde::de::DeserializeOwned;

use vsp_network::{ChainOracle, ReplicaClient};
use vsp_store::{update_ticket, StoreError, Ticket, TicketLedger, UpdateError, VoteChangeRecord};
use vsp_types::{ChainParams, Clock, ErrorCode, FeeStatus, TicketHash, Timestamp};

use crate::auth::verify_client_signature;
use crate::coordinator::ReplicaCoordinator;
use crate::metrics::VspMetrics;
use crate::signing::{ResponseSigner, SignedResponse};
use crate::stats::{StatsCache, StatsReader};
use crate::{ApiError, NodeError, VspConfig};

/// Everything a request handler or the reconciler needs.
#[derive(Clone)]
pub struct VspCore {
    pub config: Arc<VspConfig>,
    pub params: &'static ChainParams,
    pub ledger: Arc<dyn TicketLedger>,
    pub oracle: Arc<dyn ChainOracle>,
    pub coordinator: Arc<ReplicaCoordinator>,
    pub signer: Arc<ResponseSigner>,
    pub clock: Arc<dyn Clock>,
    pub metrics: Arc<VspMetrics>,
    pub stats: StatsReader,
}

impl VspCore {
    /// Wire up the service. The returned cache is the write side of
    /// `stats` and belongs to the reconciler.
    pub fn new(
        config: VspConfig,
        ledger: Arc<dyn TicketLedger>,
        oracle: Arc<dyn ChainOracle>,
        replicas: Vec<Arc<dyn ReplicaClient>>,
        clock: Arc<dyn Clock>,
    ) -> Result<(Self, StatsCache), NodeError> {
        let seed = ledger.meta().signing_seed()?;
        let stats = StatsCache::new();
        let core = Self {
            params: config.chain_params(),
            coordinator: Arc::new(ReplicaCoordinator::new(
                replicas,
                config.rpc_timeout(),
                clock.clone(),
            )),
            signer: Arc::new(ResponseSigner::from_seed(&seed)),
            metrics: Arc::new(VspMetrics::new()?),
            stats: stats.reader(),
            config: Arc::new(config),
            ledger,
            oracle,
            clock,
        };
        Ok((core, stats))
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    /// The registered ticket, or `UnknownTicket`.
    pub fn known_ticket(&self, hash: &TicketHash) -> Result<Ticket, ApiError> {
        self.ledger
            .tickets()
            .get_ticket(hash)
            .map_err(|e| ApiError::internal("read ticket", e))?
            .ok_or_else(|| ApiError::new(ErrorCode::UnknownTicket))
    }

    /// Check the client signature against `commitment_address`.
    pub fn authenticate(&self, ctx: &RequestContext, commitment_address: &str) -> Result<(), ApiError> {
        verify_client_signature(
            &ctx.client_signature,
            &ctx.body,
            commitment_address,
            self.params.network,
        )
        .inspect_err(|_| {
            tracing::warn!(client = %ctx.client_ip, "request with a bad signature");
        })
    }

    /// Move a ticket's fee to `status` through the ledger's update entry point.
    pub fn set_fee_status(&self, hash: &TicketHash, status: FeeStatus) -> Result<Ticket, NodeError> {
        update_ticket(self.ledger.tickets(), hash, |t| {
            t.fee_tx_status = status;
            Ok::<(), Infallible>(())
        })
        .map_err(|e| match e {
            UpdateError::Store(e) => NodeError::Store(e),
            UpdateError::NotFound(hash) => NodeError::Store(StoreError::NotFound(format!("ticket {hash}"))),
            UpdateError::Aborted(never) => match never {},
        })
    }

    /// Append the exchange to the ticket's audit log. Failures are only logged.
    pub fn record_vote_change(&self, hash: &TicketHash, ctx: &RequestContext, response: &SignedResponse) {
        let record = VoteChangeRecord {
            request: String::from_utf8_lossy(&ctx.body).into_owned(),
            request_signature: ctx.client_signature.clone(),
            response: response.body.clone(),
            response_signature: response.signature.clone(),
        };
        if let Err(e) = self.ledger.vote_changes().save_vote_change(
            hash,
            &record,
            self.config.max_vote_change_records,
        ) {
            tracing::error!(ticket = %hash, error = %e, "failed to record vote change");
        }
    }
}

/// What the transport layer knows about one request.
#[derive(Clone, Debug)]
pub struct RequestContext {
    /// Exact request body; signatures cover these bytes.
    pub body: Vec<u8>,
    /// Value of the client signature header, empty if absent.
    pub client_signature: String,
    pub client_ip: String,
    pub received_at: Timestamp,
}

impl RequestContext {
    pub fn new(body: impl Into<Vec<u8>>, client_signature: impl Into<String>, received_at: Timestamp) -> Self {
        Self {
            body: body.into(),
            client_signature: client_signature.into(),
            client_ip: String::new(),
            received_at,
        }
    }

    pub fn with_client_ip(mut self, ip: impl Into<String>) -> Self {
        self.client_ip = ip.into();
        self
    }

    /// Decode the body, or `BadRequest`.
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        serde_json::from_slice(&self.body)
            .map_err(|e| ApiError::with_message(ErrorCode::BadRequest, e.to_string()))
    }
}

/// Decode a ticket hash from a request, or `BadRequest`.
pub fn parse_ticket_hash(s: &str) -> Result<TicketHash, ApiError> {
    TicketHash::from_hex(s)
        .map_err(|e| ApiError::with_message(ErrorCode::BadRequest, format!("invalid ticket hash: {e}")))
}

/// Map a failed ledger update to the client-visible error.
pub fn update_failure(err: UpdateError<ApiError>) -> ApiError {
    match err {
        UpdateError::Aborted(e) => e,
        UpdateError::NotFound(_) => ApiError::new(ErrorCode::UnknownTicket),
        UpdateError::Store(e) => ApiError::internal("update ticket", e),
    }
}
