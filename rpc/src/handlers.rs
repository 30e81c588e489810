//! Routes of the `/api/v3` interface.

use std::future::Future;
use std::net::SocketAddr;

use axum::body::{Body, Bytes};
use axum::extract::{ConnectInfo, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use vsp_node::{
    ApiError, RequestContext, SignedResponse, VspCore, CLIENT_SIGNATURE_HEADER,
    SERVER_SIGNATURE_HEADER,
};

use crate::error::status_for;

/// Build the API router over `core`.
pub fn router(core: VspCore) -> Router {
    let mut router = Router::new()
        .route("/api/v3/vspinfo", get(vsp_info))
        .route("/api/v3/feeaddress", post(fee_address))
        .route("/api/v3/payfee", post(pay_fee))
        .route("/api/v3/setvotechoices", post(set_vote_choices))
        .route("/api/v3/ticketstatus", post(ticket_status));
    if core.config.enable_metrics {
        router = router.route("/metrics", get(metrics));
    }
    router.layer(TraceLayer::new_for_http()).with_state(core)
}

async fn vsp_info(State(core): State<VspCore>) -> Response {
    respond(&core, "vspinfo", vsp_node::vsp_info(&core))
}

async fn fee_address(
    State(core): State<VspCore>,
    client: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    handle(core, "feeaddress", client, &headers, body, |core, ctx| async move {
        vsp_node::issue_fee_address(&core, &ctx).await
    })
    .await
}

async fn pay_fee(
    State(core): State<VspCore>,
    client: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    handle(core, "payfee", client, &headers, body, |core, ctx| async move {
        vsp_node::pay_fee(&core, &ctx).await
    })
    .await
}

async fn set_vote_choices(
    State(core): State<VspCore>,
    client: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    handle(core, "setvotechoices", client, &headers, body, |core, ctx| async move {
        vsp_node::set_vote_choices(&core, &ctx).await
    })
    .await
}

async fn ticket_status(
    State(core): State<VspCore>,
    client: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    handle(core, "ticketstatus", client, &headers, body, |core, ctx| async move {
        vsp_node::ticket_status(&core, &ctx).await
    })
    .await
}

async fn metrics(State(core): State<VspCore>) -> Response {
    match core.metrics.encode() {
        Ok(text) => (
            [(CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "failed to encode metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn handle<F, Fut>(
    core: VspCore,
    endpoint: &'static str,
    client: Option<ConnectInfo<SocketAddr>>,
    headers: &HeaderMap,
    body: Bytes,
    call: F,
) -> Response
where
    F: FnOnce(VspCore, RequestContext) -> Fut,
    Fut: Future<Output = Result<SignedResponse, ApiError>>,
{
    let client_signature = headers
        .get(CLIENT_SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let mut ctx = RequestContext::new(body.to_vec(), client_signature, core.now());
    if let Some(ConnectInfo(addr)) = client {
        ctx = ctx.with_client_ip(addr.ip().to_string());
    }
    let result = call(core.clone(), ctx).await;
    respond(&core, endpoint, result)
}

/// Sign the outcome and count it.
fn respond(core: &VspCore, endpoint: &str, result: Result<SignedResponse, ApiError>) -> Response {
    let (status, signed) = match result {
        Ok(signed) => {
            core.metrics.count_request(endpoint, "ok");
            (StatusCode::OK, signed)
        }
        Err(err) => {
            tracing::debug!(endpoint, code = err.code.code(), message = %err.message, "request rejected");
            core.metrics
                .count_request(endpoint, &err.code.code().to_string());
            (status_for(err.code), core.signer.sign_error(&err))
        }
    };
    signed_response(status, signed)
}

fn signed_response(status: StatusCode, signed: SignedResponse) -> Response {
    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, "application/json; charset=utf-8")
        .header(SERVER_SIGNATURE_HEADER, signed.signature)
        .body(Body::from(signed.body))
        .unwrap_or_else(|e| {
            tracing::error!(error = %e, "failed to build response");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        })
}
