//! HTTP API of the voting service provider.
//!
//! Thin transport over `vsp-node`: every handler turns the request into a
//! [`vsp_node::RequestContext`], calls the core, and signs whatever comes
//! back, errors included.

pub mod error;
pub mod handlers;
pub mod server;

pub use error::{status_for, RpcServerError};
pub use handlers::router;
pub use server::RpcServer;
