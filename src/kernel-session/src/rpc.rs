//! JSON-RPC over HTTP for the chain node, bundler and paymaster.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::SolCall;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::errors::RpcError;

#[derive(Deserialize)]
struct ErrorObject {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<Value>,
}

#[derive(Deserialize)]
struct Response {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<ErrorObject>,
}

/// One JSON-RPC endpoint. Cheap to clone; clones share the connection pool and request ids.
#[derive(Clone, Debug)]
pub struct RpcClient {
    http: reqwest::Client,
    url: String,
    next_id: Arc<AtomicU64>,
}

impl RpcClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), url)
    }

    pub fn with_client(http: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn request<P, R>(&self, method: &str, params: P) -> Result<R, RpcError>
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({ "jsonrpc": "2.0", "id": id, "method": method, "params": params });
        debug!(method, id, url = %self.url, "json-rpc request");

        let response = self.http.post(&self.url).json(&body).send().await?;
        let status = response.status();
        let text = response.text().await?;

        // Some services answer errors with a non-2xx status and a JSON-RPC body.
        let parsed: Response = match serde_json::from_str(&text) {
            Ok(parsed) => parsed,
            Err(e) if status.is_success() => return Err(RpcError::Json(e)),
            Err(_) => {
                return Err(RpcError::Status {
                    status: status.as_u16(),
                    body: text,
                })
            }
        };
        if let Some(error) = parsed.error {
            debug!(method, code = error.code, message = %error.message, "json-rpc error");
            return Err(RpcError::Rpc {
                code: error.code,
                message: error.message,
                data: error.data,
            });
        }
        if !status.is_success() {
            return Err(RpcError::Status {
                status: status.as_u16(),
                body: text,
            });
        }
        Ok(serde_json::from_value(parsed.result.unwrap_or(Value::Null))?)
    }

    /// `eth_call` at the latest block.
    pub async fn eth_call(&self, to: Address, data: Bytes) -> Result<Bytes, RpcError> {
        self.request("eth_call", (json!({ "to": to, "data": data }), "latest"))
            .await
    }

    /// ABI-typed `eth_call`.
    pub async fn call<C: SolCall>(&self, to: Address, call: &C) -> Result<C::Return, RpcError> {
        let output = self.eth_call(to, call.abi_encode().into()).await?;
        Ok(C::abi_decode_returns(&output, true)?)
    }

    pub async fn get_code(&self, address: Address) -> Result<Bytes, RpcError> {
        self.request("eth_getCode", (address, "latest")).await
    }

    pub async fn gas_price(&self) -> Result<U256, RpcError> {
        self.request("eth_gasPrice", json!([])).await
    }

    pub async fn max_priority_fee_per_gas(&self) -> Result<U256, RpcError> {
        self.request("eth_maxPriorityFeePerGas", json!([])).await
    }

    pub async fn chain_id(&self) -> Result<u64, RpcError> {
        let id: U256 = self.request("eth_chainId", json!([])).await?;
        u64::try_from(id).map_err(|_| RpcError::Rpc {
            code: -32000,
            message: format!("chain id {id} does not fit in u64"),
            data: None,
        })
    }
}
