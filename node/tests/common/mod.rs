//! A service wired to nullable backends, plus client-side request helpers.

#![allow(dead_code)]

use std::io;
use std::sync::{Arc, Mutex};

use serde::de::DeserializeOwned;
use serde::Serialize;

use vsp_crypto::{verify_signature, Address};
use vsp_network::{ChainOracle, ReplicaClient};
use vsp_node::{issue_fee_address, pay_fee, ApiError, RequestContext, SignedResponse, VspConfig, VspNode};
use vsp_nullables::{fee_tx, fee_xpub, NullChainOracle, NullClock, NullLedger, NullReplica, TicketFixture, TEST_NETWORK};
use vsp_store::{Ticket, TicketStore};
use vsp_types::api::{FeeAddressRequest, FeeAddressResponse, PayFeeRequest};
use vsp_types::{Amount, ChainParams, Clock, Signature, VoteChoices};

pub const START: u64 = 1_700_000_000;

/// Minimum fee for fixture tickets under [`config`].
pub const MIN_FEE: i64 = 200_000;

pub fn config() -> VspConfig {
    VspConfig {
        network: TEST_NETWORK,
        fee_percentage: 0.0005,
        min_fee_atoms: MIN_FEE,
        max_vote_change_records: 3,
        ..VspConfig::default()
    }
}

pub struct TestVsp {
    pub ledger: Arc<NullLedger>,
    pub oracle: Arc<NullChainOracle>,
    pub wallets: Vec<Arc<NullReplica>>,
    pub clock: Arc<NullClock>,
    pub node: VspNode,
}

impl TestVsp {
    pub fn new() -> Self {
        Self::with_config(config(), 2)
    }

    pub fn with_config(config: VspConfig, wallets: usize) -> Self {
        let xpub = fee_xpub(TEST_NETWORK).unwrap().encode();
        let ledger = Arc::new(NullLedger::initialized([42; 32], &xpub));
        let oracle = Arc::new(NullChainOracle::new());
        let clock = Arc::new(NullClock::new(START));
        let wallets: Vec<_> = (1..=wallets)
            .map(|i| Arc::new(NullReplica::new(format!("wallet-{i}"))))
            .collect();
        let node = VspNode::from_parts(
            config,
            ledger.clone(),
            oracle.clone() as Arc<dyn ChainOracle>,
            wallets
                .iter()
                .map(|w| w.clone() as Arc<dyn ReplicaClient>)
                .collect(),
            clock.clone(),
        )
        .unwrap();
        Self {
            ledger,
            oracle,
            wallets,
            clock,
            node,
        }
    }

    pub fn params(&self) -> &'static ChainParams {
        self.node.core.params
    }

    pub fn ticket(&self, fixture: &TicketFixture) -> Ticket {
        self.ledger.get_ticket(&fixture.hash()).unwrap().unwrap()
    }

    /// A context for `body` signed by the ticket's commitment key.
    pub fn signed(&self, fixture: &TicketFixture, body: &impl Serialize) -> RequestContext {
        let body = serde_json::to_vec(body).unwrap();
        let signature = fixture.sign_request(&body);
        RequestContext::new(body, signature, self.clock.now()).with_client_ip("127.0.0.1")
    }

    /// Mine `fixture` with `confirmations` and register it.
    pub async fn register(&self, fixture: &TicketFixture, confirmations: u32) -> FeeAddressResponse {
        self.oracle
            .add_transaction(fixture.hash(), fixture.hex(), confirmations);
        let ctx = self.signed(fixture, &self.fee_address_request(fixture));
        let response = issue_fee_address(&self.node.core, &ctx).await.unwrap();
        self.decode(&response)
    }

    pub fn fee_address_request(&self, fixture: &TicketFixture) -> FeeAddressRequest {
        FeeAddressRequest {
            timestamp: self.clock.now().as_secs() as i64,
            ticket_hash: fixture.hash().to_string(),
            ticket_hex: fixture.hex(),
        }
    }

    /// A fee payment of `atoms` to the ticket's fee address.
    pub fn payment(&self, fixture: &TicketFixture, atoms: i64) -> PayFeeRequest {
        let stored = self.ticket(fixture);
        let address = Address::decode(&stored.fee_address, self.params()).unwrap();
        PayFeeRequest {
            timestamp: self.clock.now().as_secs() as i64,
            ticket_hash: fixture.hash().to_string(),
            fee_tx: fee_tx(&address, Amount::from_atoms(atoms), stored.fee_address_index as u8).to_hex(),
            voting_key: fixture.voting_wif(),
            vote_choices: VoteChoices::from([("blake3pow".to_string(), "yes".to_string())]),
            tspend_policy: Default::default(),
            treasury_policy: Default::default(),
        }
    }

    pub async fn pay(&self, fixture: &TicketFixture, request: &PayFeeRequest) -> Result<SignedResponse, ApiError> {
        pay_fee(&self.node.core, &self.signed(fixture, request)).await
    }

    /// Verify the service signature and decode the body.
    pub fn decode<T: DeserializeOwned>(&self, response: &SignedResponse) -> T {
        let signature = Signature::from_base64(&response.signature).unwrap();
        assert!(verify_signature(
            response.body.as_bytes(),
            &signature,
            self.node.core.signer.public_key()
        ));
        serde_json::from_str(&response.body).unwrap()
    }
}

/// Collects log output of the current thread while installed.
#[derive(Clone, Default)]
pub struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl LogCapture {
    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        let writer = self.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}
