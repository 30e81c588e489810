//! JSON-RPC clients against an in-process fake server.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};

use vsp_network::{
    ChainOracle, DaemonRpc, JsonRpcClient, ReplicaClient, RpcEndpoint, RpcError,
    TicketChainState, VotingConfig, VotingUpdate, WalletRpc,
};
use vsp_types::{ChainParams, NetworkId, TxHash};

type Responder = dyn Fn(&str, &Value) -> Result<Value, (i64, String)> + Send + Sync;

#[derive(Clone)]
struct Fake {
    calls: Arc<Mutex<Vec<(String, Value)>>>,
    respond: Arc<Responder>,
    delay: Duration,
}

async fn handle(
    State(fake): State<Fake>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    // "user:pass" in basic auth.
    if headers.get("authorization").and_then(|v| v.to_str().ok())
        != Some("Basic dXNlcjpwYXNz")
    {
        return (StatusCode::UNAUTHORIZED, Json(json!({})));
    }
    tokio::time::sleep(fake.delay).await;
    let method = body["method"].as_str().unwrap_or_default().to_string();
    let params = body["params"].clone();
    fake.calls.lock().unwrap().push((method.clone(), params.clone()));
    match (fake.respond)(&method, &params) {
        Ok(result) => (
            StatusCode::OK,
            Json(json!({"result": result, "error": null, "id": body["id"]})),
        ),
        Err((code, message)) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"result": null, "error": {"code": code, "message": message}, "id": body["id"]})),
        ),
    }
}

async fn serve<F>(delay: Duration, respond: F) -> (RpcEndpoint, Arc<Mutex<Vec<(String, Value)>>>)
where
    F: Fn(&str, &Value) -> Result<Value, (i64, String)> + Send + Sync + 'static,
{
    let calls = Arc::new(Mutex::new(Vec::new()));
    let fake = Fake {
        calls: calls.clone(),
        respond: Arc::new(respond),
        delay,
    };
    let app = Router::new().route("/", post(handle)).with_state(fake);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    let endpoint = RpcEndpoint {
        host: addr.to_string(),
        user: "user".into(),
        pass: "pass".into(),
        cert_pem: None,
    };
    (endpoint, calls)
}

fn daemon(endpoint: &RpcEndpoint) -> DaemonRpc {
    let client = JsonRpcClient::new(endpoint, Duration::from_secs(2)).unwrap();
    DaemonRpc::new(client, ChainParams::for_network(NetworkId::Testnet))
}

#[tokio::test]
async fn fetches_verbose_transaction() {
    let (endpoint, calls) = serve(Duration::ZERO, |method, _| match method {
        "getrawtransaction" => Ok(json!({"hex": "0100", "confirmations": 7, "blockheight": 1234})),
        _ => Err((-32601, "method not found".into())),
    })
    .await;
    let tx = daemon(&endpoint)
        .get_raw_transaction(&TxHash::new([1; 32]))
        .await
        .unwrap();
    assert_eq!(tx.hex, "0100");
    assert_eq!(tx.confirmations, 7);
    assert_eq!(tx.block_height, 1234);
    let calls = calls.lock().unwrap();
    assert_eq!(calls[0].1[0], json!(TxHash::new([1; 32]).to_string()));
    assert_eq!(calls[0].1[1], json!(1));
}

#[tokio::test]
async fn unknown_transaction_is_not_found() {
    let (endpoint, _) = serve(Duration::ZERO, |_, _| {
        Err((-5, "No information available about transaction".into()))
    })
    .await;
    let err = daemon(&endpoint)
        .get_raw_transaction(&TxHash::new([1; 32]))
        .await
        .unwrap_err();
    assert!(matches!(err, RpcError::NotFound(_)));
}

#[tokio::test]
async fn broadcast_error_classification() {
    let (endpoint, _) = serve(Duration::ZERO, |_, params| {
        match params[0].as_str().unwrap_or_default() {
            "known" => Err((-40, "rejected transaction: already have transaction".into())),
            "orphan" => Err((
                -22,
                "transaction references outputs of unknown or fully-spent transaction".into(),
            )),
            "bad" => Err((-22, "rejected transaction".into())),
            _ => Ok(json!("abcd")),
        }
    })
    .await;
    let oracle = daemon(&endpoint);
    assert!(oracle.send_raw_transaction("fresh").await.is_ok());
    assert!(oracle.send_raw_transaction("known").await.is_ok());
    assert!(matches!(
        oracle.send_raw_transaction("orphan").await,
        Err(RpcError::UnknownOutputs(_))
    ));
    assert!(matches!(
        oracle.send_raw_transaction("bad").await,
        Err(RpcError::Rpc { code: -22, .. })
    ));
}

#[tokio::test]
async fn resolves_missed_ticket() {
    let (endpoint, _) = serve(Duration::ZERO, |method, _| match method {
        "getrawtransaction" => Ok(json!({"hex": "00", "confirmations": 500, "blockheight": 1})),
        "existsliveticket" => Ok(json!(false)),
        "existsmissedtickets" => Ok(json!("01")),
        "existsexpiredtickets" => Ok(json!("00")),
        _ => Err((-32601, "method not found".into())),
    })
    .await;
    let state = daemon(&endpoint)
        .ticket_chain_state(&TxHash::new([2; 32]))
        .await
        .unwrap();
    assert_eq!(state, TicketChainState::Missed);
}

#[tokio::test]
async fn immature_ticket_is_live() {
    let (endpoint, calls) = serve(Duration::ZERO, |method, _| match method {
        "getrawtransaction" => Ok(json!({"hex": "00", "confirmations": 3, "blockheight": 1})),
        _ => Err((-32601, "method not found".into())),
    })
    .await;
    let state = daemon(&endpoint)
        .ticket_chain_state(&TxHash::new([2; 32]))
        .await
        .unwrap();
    assert_eq!(state, TicketChainState::Live);
    assert_eq!(calls.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn best_block_reads_pool_size() {
    let (endpoint, _) = serve(Duration::ZERO, |method, _| match method {
        "getbestblock" => Ok(json!({"hash": "ff", "height": 900})),
        "getblockheader" => Ok(json!({"height": 900, "poolsize": 41000})),
        _ => Err((-32601, "method not found".into())),
    })
    .await;
    let best = daemon(&endpoint).best_block().await.unwrap();
    assert_eq!((best.height, best.pool_size), (900, 41000));
}

#[tokio::test]
async fn bad_credentials_are_unreachable() {
    let (mut endpoint, _) = serve(Duration::ZERO, |_, _| Ok(json!(true))).await;
    endpoint.pass = "wrong".into();
    let err = daemon(&endpoint)
        .exists_live_ticket(&TxHash::new([1; 32]))
        .await
        .unwrap_err();
    assert!(err.is_unreachable());
}

#[tokio::test]
async fn slow_server_times_out() {
    let (endpoint, _) = serve(Duration::from_secs(5), |_, _| Ok(json!(true))).await;
    let client = JsonRpcClient::new(&endpoint, Duration::from_millis(200)).unwrap();
    let wallet = WalletRpc::new(client);
    assert_eq!(wallet.status().await.unwrap_err(), RpcError::Timeout);
}

#[tokio::test]
async fn wallet_push_writes_every_preference() {
    let (endpoint, calls) = serve(Duration::ZERO, |_, _| Ok(Value::Null)).await;
    let wallet = WalletRpc::new(JsonRpcClient::new(&endpoint, Duration::from_secs(2)).unwrap());
    let mut config = VotingConfig::default();
    config.vote_choices.insert("blake3pow".into(), "yes".into());
    config.treasury_policy.insert("aa".repeat(32), "no".into());
    config.tspend_policy.insert("bb".repeat(32), "abstain".into());
    let update = VotingUpdate {
        ticket: TxHash::new([3; 32]),
        voting_wif: "wif".into(),
        import_key: true,
        rescan_from: 77,
        config,
    };
    wallet.push(&update).await.unwrap();

    let methods: Vec<String> = calls.lock().unwrap().iter().map(|(m, _)| m.clone()).collect();
    assert_eq!(
        methods,
        ["importprivkey", "setvotechoice", "settreasurypolicy", "settspendpolicy"]
    );
    assert_eq!(calls.lock().unwrap()[0].1[3], json!(77));
}

#[tokio::test]
async fn known_ticket_is_updated_without_a_rescan() {
    let (endpoint, calls) = serve(Duration::ZERO, |_, _| Ok(Value::Null)).await;
    let wallet = WalletRpc::new(JsonRpcClient::new(&endpoint, Duration::from_secs(2)).unwrap());
    let mut config = VotingConfig::default();
    config.vote_choices.insert("blake3pow".into(), "no".into());
    let update = VotingUpdate {
        ticket: TxHash::new([3; 32]),
        voting_wif: "wif".into(),
        import_key: false,
        rescan_from: 77,
        config,
    };
    wallet.push(&update).await.unwrap();

    let calls = calls.lock().unwrap();
    assert!(calls.iter().all(|(m, _)| m != "importprivkey"));
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].1, json!(["blake3pow", "no", TxHash::new([3; 32]).to_string()]));
}

#[tokio::test]
async fn wallet_reports_configuration() {
    let (endpoint, _) = serve(Duration::ZERO, |method, params| match method {
        "gettransaction" if params[0] == json!(TxHash::new([9; 32]).to_string()) => {
            Err((-5, "No information for transaction".into()))
        }
        "gettransaction" => Ok(json!({})),
        "getvotechoices" => Ok(json!({"version": 11, "choices": [
            {"agendaid": "blake3pow", "choiceid": "yes"}
        ]})),
        "treasurypolicy" => Ok(json!([{"key": "aa", "policy": "no", "ticket": "x"}])),
        "tspendpolicy" => Ok(json!([])),
        "walletinfo" => Ok(json!({"daemonconnected": true, "unlocked": false, "voting": true})),
        _ => Err((-32601, "method not found".into())),
    })
    .await;
    let wallet = WalletRpc::new(JsonRpcClient::new(&endpoint, Duration::from_secs(2)).unwrap());

    assert!(wallet
        .voting_config(&TxHash::new([9; 32]))
        .await
        .unwrap()
        .is_none());
    let config = wallet
        .voting_config(&TxHash::new([3; 32]))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(config.vote_choices["blake3pow"], "yes");
    assert_eq!(config.treasury_policy["aa"], "no");
    assert!(config.tspend_policy.is_empty());

    let status = wallet.status().await.unwrap();
    assert!(status.daemon_connected && !status.unlocked);
    assert!(!status.is_healthy());
}
