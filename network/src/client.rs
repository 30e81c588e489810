//! JSON-RPC 1.0 over HTTP(S) with basic authentication.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::RpcError;

/// Where and how to reach one JSON-RPC server.
#[derive(Clone, Debug)]
pub struct RpcEndpoint {
    /// `host:port`, or a full `http(s)://` URL.
    pub host: String,
    pub user: String,
    pub pass: String,
    /// PEM certificate the server's TLS certificate must chain to.
    pub cert_pem: Option<Vec<u8>>,
}

impl RpcEndpoint {
    fn url(&self) -> String {
        if self.host.starts_with("http://") || self.host.starts_with("https://") {
            self.host.clone()
        } else if self.cert_pem.is_some() {
            format!("https://{}", self.host)
        } else {
            format!("http://{}", self.host)
        }
    }
}

#[derive(Deserialize)]
struct RemoteError {
    code: i64,
    message: String,
}

#[derive(Deserialize)]
struct Response {
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<RemoteError>,
}

pub struct JsonRpcClient {
    http: reqwest::Client,
    url: String,
    user: String,
    pass: String,
    next_id: AtomicU64,
}

impl JsonRpcClient {
    /// Every call is bounded by `timeout`, connection setup included.
    pub fn new(endpoint: &RpcEndpoint, timeout: Duration) -> Result<Self, RpcError> {
        let mut builder = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout);
        if let Some(pem) = &endpoint.cert_pem {
            let cert = reqwest::Certificate::from_pem(pem)
                .map_err(|e| RpcError::Unreachable(format!("bad certificate: {e}")))?;
            builder = builder.add_root_certificate(cert);
        }
        let http = builder
            .build()
            .map_err(|e| RpcError::Unreachable(e.to_string()))?;
        Ok(Self {
            http,
            url: endpoint.url(),
            user: endpoint.user.clone(),
            pass: endpoint.pass.clone(),
            next_id: AtomicU64::new(1),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Call `method` and decode its result.
    pub async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<T, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "1.0",
            "id": id,
            "method": method,
            "params": params,
        });
        tracing::trace!(url = %self.url, method, id, "rpc call");

        let response = self
            .http
            .post(&self.url)
            .basic_auth(&self.user, Some(&self.pass))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(RpcError::Unreachable(format!("authentication failed ({status})")));
        }
        // Remote errors arrive with a 500 status and a normal body.
        let bytes = response.bytes().await?;
        let parsed: Response = serde_json::from_slice(&bytes).map_err(|e| {
            RpcError::Decode(format!("{method}: {e} (http status {status})"))
        })?;

        if let Some(err) = parsed.error {
            return Err(RpcError::from_remote(err.code, err.message));
        }
        Ok(serde_json::from_value(parsed.result)?)
    }
}
