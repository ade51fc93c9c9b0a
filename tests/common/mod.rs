//! Shared utilities for integration testing: an in-process JSON-RPC node
//! that understands the Storage contract.

#![allow(dead_code)]

use alloy::consensus::transaction::SignerRecoverable;
use alloy::consensus::{Transaction, TxEnvelope};
use alloy::eips::eip2718::Decodable2718;
use alloy::primitives::{keccak256, Address, TxHash, TxKind, B256, U256};
use axum::{extract::State, routing::post, Json, Router};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use contract_deployer::compiler::{CompilationArtifact, ContractArtifact};
use contract_deployer::config::DeployConfig;

/// Anvil's first development account.
pub const TEST_PRIVATE_KEY: &str =
    "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
pub const TEST_ADDRESS: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";
pub const CHAIN_ID: u64 = 1337;

const GAS_PRICE: u128 = 20_000_000_000;
const GAS_ESTIMATE: u64 = 1_000_000;

/// Behaviour knobs for the simulated node.
#[derive(Debug, Clone)]
pub struct NodeOptions {
    pub chain_id: u64,
    /// Mine each accepted transaction immediately.
    pub auto_mine: bool,
    /// Receipt queries answered with `null` before a mined receipt shows up.
    pub pending_polls: u32,
    /// Reject every raw transaction with this message.
    pub reject_with: Option<String>,
    /// Produce an empty block whenever the head is queried.
    pub mine_on_block_query: bool,
    /// Answer `eth_estimateGas` with an execution error.
    pub fail_estimate: bool,
    /// Hold receipt responses back this long.
    pub receipt_delay: Duration,
}

impl Default for NodeOptions {
    fn default() -> Self {
        Self {
            chain_id: CHAIN_ID,
            auto_mine: true,
            pending_polls: 0,
            reject_with: None,
            mine_on_block_query: false,
            fail_estimate: false,
            receipt_delay: Duration::ZERO,
        }
    }
}

#[derive(Debug, Clone)]
struct MinedTx {
    from: Address,
    to: Option<Address>,
    contract_address: Option<Address>,
    block_number: u64,
    success: bool,
}

#[derive(Debug, Default)]
struct NodeState {
    block_number: u64,
    nonces: HashMap<Address, u64>,
    storage: HashMap<Address, U256>,
    receipts: HashMap<TxHash, MinedTx>,
    receipt_polls: HashMap<TxHash, u32>,
    submissions: usize,
    calls: Vec<String>,
}

struct Node {
    options: NodeOptions,
    state: Mutex<NodeState>,
}

/// Handle to a running simulated node.
#[derive(Clone)]
pub struct MockNode {
    pub addr: SocketAddr,
    node: Arc<Node>,
}

impl MockNode {
    pub async fn start(options: NodeOptions) -> Self {
        let node = Arc::new(Node {
            options,
            state: Mutex::new(NodeState::default()),
        });
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = Router::new()
            .route("/", post(handle_rpc))
            .with_state(node.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Self { addr, node }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Number of `eth_sendRawTransaction` requests seen, accepted or not.
    pub fn submissions(&self) -> usize {
        self.node.state.lock().unwrap().submissions
    }

    /// RPC methods in the order they were called.
    pub fn calls(&self) -> Vec<String> {
        self.node.state.lock().unwrap().calls.clone()
    }

    pub fn nonce_of(&self, address: Address) -> u64 {
        self.node
            .state
            .lock()
            .unwrap()
            .nonces
            .get(&address)
            .copied()
            .unwrap_or(0)
    }

    /// Pretend `address` already sent `nonce` transactions.
    pub fn set_nonce(&self, address: Address, nonce: u64) {
        self.node.state.lock().unwrap().nonces.insert(address, nonce);
    }

    pub fn stored_value(&self, contract: Address) -> Option<U256> {
        self.node.state.lock().unwrap().storage.get(&contract).copied()
    }
}

async fn handle_rpc(State(node): State<Arc<Node>>, Json(body): Json<Value>) -> Json<Value> {
    if !node.options.receipt_delay.is_zero() && asks_for_receipt(&body) {
        tokio::time::sleep(node.options.receipt_delay).await;
    }
    match body {
        Value::Array(batch) => Json(Value::Array(
            batch.into_iter().map(|req| node.dispatch(req)).collect(),
        )),
        req => Json(node.dispatch(req)),
    }
}

fn asks_for_receipt(body: &Value) -> bool {
    let is_receipt = |req: &Value| req["method"] == "eth_getTransactionReceipt";
    match body {
        Value::Array(batch) => batch.iter().any(is_receipt),
        req => is_receipt(req),
    }
}

type RpcResult = Result<Value, (i64, String)>;

impl Node {
    fn dispatch(&self, request: Value) -> Value {
        let id = request.get("id").cloned().unwrap_or(Value::Null);
        let method = request["method"].as_str().unwrap_or_default().to_string();
        let params = request.get("params").cloned().unwrap_or(json!([]));

        let result = {
            let mut state = self.state.lock().unwrap();
            state.calls.push(method.clone());
            self.execute(&mut state, &method, &params)
        };

        match result {
            Ok(result) => json!({"jsonrpc": "2.0", "id": id, "result": result}),
            Err((code, message)) => json!({
                "jsonrpc": "2.0",
                "id": id,
                "error": {"code": code, "message": message}
            }),
        }
    }

    fn execute(&self, state: &mut NodeState, method: &str, params: &Value) -> RpcResult {
        match method {
            "eth_chainId" => Ok(quantity(self.options.chain_id)),
            "eth_blockNumber" => {
                if self.options.mine_on_block_query {
                    state.block_number += 1;
                }
                Ok(quantity(state.block_number))
            }
            "eth_gasPrice" => Ok(json!(format!("{GAS_PRICE:#x}"))),
            "eth_estimateGas" if self.options.fail_estimate => {
                Err((3, "execution reverted".to_string()))
            }
            "eth_estimateGas" => Ok(quantity(GAS_ESTIMATE)),
            "eth_getTransactionCount" => {
                let address = param_address(params, 0)?;
                Ok(quantity(state.nonces.get(&address).copied().unwrap_or(0)))
            }
            "eth_sendRawTransaction" => self.send_raw(state, params),
            "eth_getTransactionReceipt" => {
                let hash: TxHash = param_str(params, 0)?
                    .parse()
                    .map_err(|_| invalid("bad transaction hash"))?;
                Ok(self.receipt(state, hash))
            }
            "eth_call" => call(state, params),
            other => Err((-32601, format!("method {other} not supported"))),
        }
    }

    fn send_raw(&self, state: &mut NodeState, params: &Value) -> RpcResult {
        state.submissions += 1;
        if let Some(message) = &self.options.reject_with {
            return Err((-32000, message.clone()));
        }

        let raw = alloy::hex::decode(param_str(params, 0)?).map_err(|_| invalid("bad hex"))?;
        let envelope =
            TxEnvelope::decode_2718(&mut raw.as_slice()).map_err(|_| invalid("bad envelope"))?;
        let from = envelope
            .recover_signer()
            .map_err(|_| invalid("invalid signature"))?;

        if let Some(chain_id) = envelope.chain_id() {
            if chain_id != self.options.chain_id {
                return Err((-32000, "invalid chain id for signer".to_string()));
            }
        }

        let expected = state.nonces.get(&from).copied().unwrap_or(0);
        if envelope.nonce() < expected {
            return Err((-32000, "nonce too low".to_string()));
        }
        if envelope.nonce() > expected {
            return Err((-32000, "nonce too high".to_string()));
        }
        state.nonces.insert(from, expected + 1);

        let hash = keccak256(&raw);
        if self.options.auto_mine {
            mine(state, hash, from, &envelope);
        }
        Ok(json!(hash.to_string()))
    }

    fn receipt(&self, state: &mut NodeState, hash: TxHash) -> Value {
        let polls = state.receipt_polls.entry(hash).or_insert(0);
        *polls += 1;
        if *polls <= self.options.pending_polls {
            return Value::Null;
        }

        match state.receipts.get(&hash) {
            Some(tx) => json!({
                "type": "0x0",
                "status": if tx.success { "0x1" } else { "0x0" },
                "cumulativeGasUsed": quantity(21_000),
                "logs": [],
                "logsBloom": format!("0x{}", "00".repeat(256)),
                "transactionHash": hash.to_string(),
                "transactionIndex": "0x0",
                "blockHash": keccak256(tx.block_number.to_be_bytes()).to_string(),
                "blockNumber": quantity(tx.block_number),
                "gasUsed": quantity(21_000),
                "effectiveGasPrice": format!("{GAS_PRICE:#x}"),
                "from": tx.from.to_string(),
                "to": tx.to.map(|a| a.to_string()),
                "contractAddress": tx.contract_address.map(|a| a.to_string()),
            }),
            None => Value::Null,
        }
    }
}

/// Apply a transaction to the Storage state machine and record its receipt.
fn mine(state: &mut NodeState, hash: TxHash, from: Address, envelope: &TxEnvelope) {
    state.block_number += 1;
    let (to, contract_address, success) = match envelope.kind() {
        TxKind::Create => {
            let address = from.create(envelope.nonce());
            state.storage.insert(address, U256::ZERO);
            (None, Some(address), true)
        }
        TxKind::Call(to) => {
            let success = match decode_store(envelope.input()) {
                Some(value) if state.storage.contains_key(&to) => {
                    state.storage.insert(to, value);
                    true
                }
                _ => false,
            };
            (Some(to), None, success)
        }
    };
    state.receipts.insert(
        hash,
        MinedTx {
            from,
            to,
            contract_address,
            block_number: state.block_number,
            success,
        },
    );
}

fn call(state: &NodeState, params: &Value) -> RpcResult {
    let request = params.get(0).ok_or_else(|| invalid("missing call object"))?;
    let to: Address = request["to"]
        .as_str()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| invalid("missing to"))?;
    let input = request
        .get("input")
        .or_else(|| request.get("data"))
        .and_then(Value::as_str)
        .and_then(|s| alloy::hex::decode(s).ok())
        .unwrap_or_default();

    let Some(value) = state.storage.get(&to) else {
        return Ok(json!("0x"));
    };
    if input[..] == selector("retrieve()")[..] {
        Ok(json!(B256::from(value.to_be_bytes::<32>()).to_string()))
    } else if decode_store(&input).is_some() {
        Ok(json!("0x"))
    } else {
        Err((3, "execution reverted".to_string()))
    }
}

fn decode_store(input: &[u8]) -> Option<U256> {
    if input.len() != 36 || input[..4] != selector("store(uint256)")[..] {
        return None;
    }
    Some(U256::from_be_slice(&input[4..]))
}

fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

fn quantity(value: u64) -> Value {
    json!(format!("{value:#x}"))
}

fn invalid(message: &str) -> (i64, String) {
    (-32602, message.to_string())
}

fn param_str(params: &Value, index: usize) -> Result<&str, (i64, String)> {
    params
        .get(index)
        .and_then(Value::as_str)
        .ok_or_else(|| invalid("missing parameter"))
}

fn param_address(params: &Value, index: usize) -> Result<Address, (i64, String)> {
    param_str(params, index)?
        .parse()
        .map_err(|_| invalid("bad address"))
}

/// Compiled `Storage` contract from the fixture.
pub fn storage_artifact() -> ContractArtifact {
    CompilationArtifact::from_slice(include_bytes!("../fixtures/storage_output.json"))
        .unwrap()
        .contract("SimpleStorage.sol", "Storage")
        .unwrap()
}

pub fn fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/storage_output.json")
}

/// Config pointing at `node` with fast polling.
pub fn test_config(node: &MockNode) -> DeployConfig {
    let mut config = DeployConfig::default();
    config.network.rpc_url = node.url();
    config.network.chain_id = CHAIN_ID;
    config.network.sender_address = TEST_ADDRESS.to_string();
    config.network.rpc_timeout_secs = 5;
    config.confirmation.timeout_secs = 5;
    config.confirmation.poll_interval_ms = 10;
    config.confirmation.max_poll_interval_ms = 50;
    config
}

pub fn test_address() -> Address {
    TEST_ADDRESS.parse().unwrap()
}
