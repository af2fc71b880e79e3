//! Read-side chain access and its JSON-RPC over HTTP implementation

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use alloy_primitives::{Bytes, U64};
use log::debug;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::RpcError;
use crate::types::{Address, Amount, ChainId, TxHash};

/// Mined transaction outcome.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TxReceipt {
    pub tx_hash: TxHash,
    pub block_number: u64,
    pub success: bool,
}

/// A value-carrying contract call to be signed by the wallet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionRequest {
    pub from: Address,
    pub to: Address,
    pub value: Amount,
    pub data: Vec<u8>,
}

impl TransactionRequest {
    pub fn to_json(&self) -> Value {
        json!({
            "from": self.from,
            "to": self.to,
            "value": self.value,
            "data": Bytes::copy_from_slice(&self.data),
        })
    }
}

/// Read-only chain queries the façades and the lifecycle controller rely on.
pub trait ChainRpc: Send + Sync {
    /// `eth_call` against the latest block; returns raw return data.
    fn call(
        &self,
        to: Address,
        data: Vec<u8>,
    ) -> impl Future<Output = Result<Vec<u8>, RpcError>> + Send;

    fn balance(&self, address: Address) -> impl Future<Output = Result<Amount, RpcError>> + Send;

    fn block_number(&self) -> impl Future<Output = Result<u64, RpcError>> + Send;

    /// `None` while the transaction is unknown or still pending.
    fn transaction_receipt(
        &self,
        tx: TxHash,
    ) -> impl Future<Output = Result<Option<TxReceipt>, RpcError>> + Send;
}

impl<T: ChainRpc> ChainRpc for std::sync::Arc<T> {
    fn call(
        &self,
        to: Address,
        data: Vec<u8>,
    ) -> impl Future<Output = Result<Vec<u8>, RpcError>> + Send {
        (**self).call(to, data)
    }

    fn balance(&self, address: Address) -> impl Future<Output = Result<Amount, RpcError>> + Send {
        (**self).balance(address)
    }

    fn block_number(&self) -> impl Future<Output = Result<u64, RpcError>> + Send {
        (**self).block_number()
    }

    fn transaction_receipt(
        &self,
        tx: TxHash,
    ) -> impl Future<Output = Result<Option<TxReceipt>, RpcError>> + Send {
        (**self).transaction_receipt(tx)
    }
}

#[derive(Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<JsonRpcErrorBody>,
}

#[derive(Deserialize)]
struct JsonRpcErrorBody {
    code: i64,
    message: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReceipt {
    transaction_hash: TxHash,
    block_number: Option<U64>,
    status: Option<U64>,
}

impl RawReceipt {
    fn into_receipt(self) -> Option<TxReceipt> {
        let block_number = self.block_number?;
        Some(TxReceipt {
            tx_hash: self.transaction_hash,
            block_number: block_number.to::<u64>(),
            // Pre-Byzantium receipts carry no status; treat them as successful.
            success: self.status.map_or(true, |status| status == U64::from(1)),
        })
    }
}

/// JSON-RPC client for an Ethereum-compatible node.
#[derive(Clone)]
pub struct HttpRpc {
    client: reqwest::Client,
    url: String,
    next_id: std::sync::Arc<AtomicU64>,
}

impl HttpRpc {
    pub fn new(url: impl Into<String>) -> Result<Self, RpcError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
            next_id: std::sync::Arc::new(AtomicU64::new(1)),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Issues one request; a JSON `null` result comes back as `Value::Null`.
    pub async fn request(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        debug!("rpc -> {} #{} {}", method, id, params);

        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        let response: JsonRpcResponse = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(err) = response.error {
            debug!("rpc <- {} #{} error {}: {}", method, id, err.code, err.message);
            return Err(RpcError::Rpc {
                code: err.code,
                message: err.message,
            });
        }
        Ok(response.result.unwrap_or(Value::Null))
    }

    /// Like [`HttpRpc::request`], decoding the result into `T`.
    pub async fn request_as<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<T, RpcError> {
        let result = self.request(method, params).await?;
        serde_json::from_value(result)
            .map_err(|e| RpcError::InvalidResponse(format!("{method} result: {e}")))
    }

    pub async fn chain_id(&self) -> Result<ChainId, RpcError> {
        let chain_id: U64 = self.request_as("eth_chainId", json!([])).await?;
        Ok(chain_id.to::<u64>())
    }

    pub async fn accounts(&self) -> Result<Vec<Address>, RpcError> {
        self.request_as("eth_accounts", json!([])).await
    }

    pub async fn send_transaction(&self, tx: &TransactionRequest) -> Result<TxHash, RpcError> {
        self.request_as("eth_sendTransaction", json!([tx.to_json()])).await
    }
}

impl ChainRpc for HttpRpc {
    async fn call(&self, to: Address, data: Vec<u8>) -> Result<Vec<u8>, RpcError> {
        let params = json!([{ "to": to, "data": Bytes::from(data) }, "latest"]);
        let result: Bytes = self.request_as("eth_call", params).await?;
        Ok(result.to_vec())
    }

    async fn balance(&self, address: Address) -> Result<Amount, RpcError> {
        self.request_as("eth_getBalance", json!([address, "latest"])).await
    }

    async fn block_number(&self) -> Result<u64, RpcError> {
        let block: U64 = self.request_as("eth_blockNumber", json!([])).await?;
        Ok(block.to::<u64>())
    }

    async fn transaction_receipt(&self, tx: TxHash) -> Result<Option<TxReceipt>, RpcError> {
        let raw: Option<RawReceipt> = self
            .request_as("eth_getTransactionReceipt", json!([tx]))
            .await?;
        Ok(raw.and_then(RawReceipt::into_receipt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_request_json() {
        let from: Address = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266".parse().unwrap();
        let to: Address = "0x5fbdb2315678afecb367f032d93f642f64180aa3".parse().unwrap();
        let tx = TransactionRequest {
            from,
            to,
            value: Amount::from(10_000_000_000_000_000u64),
            data: vec![0x2c, 0xfc, 0xc5, 0x39],
        };
        let body = tx.to_json();
        assert_eq!(body["value"], "0x2386f26fc10000");
        assert_eq!(body["data"], "0x2cfcc539");
        assert_eq!(serde_json::from_value::<Address>(body["from"].clone()).unwrap(), from);
        assert_eq!(serde_json::from_value::<Address>(body["to"].clone()).unwrap(), to);
    }

    #[test]
    fn test_receipt_decoding() {
        let hash = format!("0x{}", "ab".repeat(32));
        let pending: RawReceipt = serde_json::from_value(json!({
            "transactionHash": hash,
            "blockNumber": null,
            "status": "0x1",
        }))
        .unwrap();
        assert_eq!(pending.into_receipt(), None);

        let reverted: RawReceipt = serde_json::from_value(json!({
            "transactionHash": hash,
            "blockNumber": "0x2a",
            "status": "0x0",
        }))
        .unwrap();
        let receipt = reverted.into_receipt().unwrap();
        assert_eq!(receipt.block_number, 42);
        assert_eq!(receipt.tx_hash, TxHash::repeat_byte(0xab));
        assert!(!receipt.success);

        let legacy: RawReceipt = serde_json::from_value(json!({
            "transactionHash": hash,
            "blockNumber": "0x2b",
        }))
        .unwrap();
        assert!(legacy.into_receipt().unwrap().success);
    }

    #[test]
    fn test_quantities_wider_than_u128() {
        let wide: Amount =
            serde_json::from_value(json!("0x100000000000000000000000000000000")).unwrap();
        assert_eq!(wide, Amount::from(1u8) << 128usize);
        assert!(serde_json::from_value::<U64>(json!("0x10000000000000000")).is_err());
    }
}
