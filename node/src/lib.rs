//! Voting service provider core.
//!
//! Accepts ticket registrations and fee payments, keeps the voting wallets'
//! configuration in line with the ticket ledger, and advances every ticket
//! through its life in a periodic background sweep.
//!
//! Request handlers take an explicit [`RequestContext`] and the shared
//! [`VspCore`]; the HTTP layer lives in `vsp-rpc`.

pub mod auth;
pub mod config;
pub mod context;
pub mod coordinator;
pub mod error;
pub mod fee_address;
pub mod info;
pub mod logging;
pub mod metrics;
pub mod node;
pub mod payfee;
pub mod prefs;
pub mod reconciler;
pub mod shutdown;
pub mod signing;
pub mod stats;
pub mod vote_change;

pub use auth::CLIENT_SIGNATURE_HEADER;
pub use config::VspConfig;
pub use context::{RequestContext, VspCore};
pub use coordinator::{ReconcileReport, ReplicaCoordinator, ReplicaHealth, SyncReport};
pub use error::{ApiError, NodeError};
pub use fee_address::issue_fee_address;
pub use info::vsp_info;
pub use logging::{init_logging, LogFormat};
pub use metrics::VspMetrics;
pub use node::VspNode;
pub use payfee::pay_fee;
pub use reconciler::{BackgroundReconciler, SweepReport};
pub use shutdown::ShutdownController;
pub use signing::{ResponseSigner, SignedResponse, SERVER_SIGNATURE_HEADER};
pub use stats::{CachedStats, StatsCache, StatsReader};
pub use vote_change::{set_vote_choices, ticket_status};
