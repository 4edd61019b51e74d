//! JSON-RPC client for the chain.
//!
//! Serves both view-level ports: `getTransactionHash` through `eth_call`
//! and contract detection through `eth_getCode`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use shared_types::{Address, Bytes, Hash};
use ss_03_approval_generator::{CodeInspector, InspectorError};
use ss_04_hash_verifier::abi::{decode_transaction_hash, get_transaction_hash_calldata};
use ss_04_hash_verifier::{ContractError, SafeContract, SafeTxData};
use tracing::debug;

#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    method: &'a str,
    params: Value,
    id: u64,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse<R> {
    result: Option<R>,
    error: Option<JsonRpcError>,
}

pub struct JsonRpcClient {
    client: Client,
    url: String,
    request_id: AtomicU64,
}

impl JsonRpcClient {
    pub fn new(url: impl Into<String>) -> Result<Self, ContractError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(20))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| ContractError::Rpc(e.to_string()))?;
        Ok(Self {
            client,
            url: url.into(),
            request_id: AtomicU64::new(1),
        })
    }

    fn next_id(&self) -> u64 {
        self.request_id.fetch_add(1, Ordering::Relaxed)
    }

    async fn call<R: DeserializeOwned>(&self, method: &str, params: Value) -> Result<R, String> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            method,
            params,
            id: self.next_id(),
        };
        debug!(method, url = %self.url, "JSON-RPC call");

        let response: JsonRpcResponse<R> = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| format!("{method}: {e}"))?
            .json()
            .await
            .map_err(|e| format!("{method}: malformed response: {e}"))?;

        if let Some(error) = response.error {
            return Err(format!("{method}: error {}: {}", error.code, error.message));
        }
        response
            .result
            .ok_or_else(|| format!("{method}: missing result"))
    }
}

fn eth_call_params(to: Address, data: &Bytes) -> Value {
    json!([{ "to": format!("{to:#x}"), "data": data.to_hex() }, "latest"])
}

#[async_trait]
impl SafeContract for JsonRpcClient {
    async fn get_transaction_hash(
        &self,
        safe: Address,
        tx: &SafeTxData,
    ) -> Result<Hash, ContractError> {
        let data = get_transaction_hash_calldata(tx);
        let output: Bytes = self
            .call("eth_call", eth_call_params(safe, &data))
            .await
            .map_err(ContractError::Rpc)?;
        decode_transaction_hash(output.as_slice())
    }
}

#[async_trait]
impl CodeInspector for JsonRpcClient {
    async fn has_code(&self, address: Address) -> Result<bool, InspectorError> {
        let code: Bytes = self
            .call("eth_getCode", json!([format!("{address:#x}"), "latest"]))
            .await
            .map_err(|message| InspectorError { address, message })?;
        Ok(!code.is_empty())
    }
}
