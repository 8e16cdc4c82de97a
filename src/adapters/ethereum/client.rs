//! Ethereum JSON-RPC client
//!
//! Speaks plain JSON-RPC 2.0 over `reqwest`. Quantities arrive as 0x hex
//! strings and are decoded through [`abi`](super::abi).

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::abi::{decode_hex, parse_address, parse_quantity};
use crate::adapters::http::{self, HttpError};
use crate::adapters::retry::RetryPolicy;
use crate::domain::Priority;
use crate::ports::{CallRequest, EthereumError, EvmClient, TransactionReceipt};

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReceipt {
    transaction_hash: String,
    block_number: Option<String>,
    gas_used: String,
    #[serde(default)]
    status: Option<String>,
}

/// Gas prices per priority, in wei
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GasPrices {
    pub low: u128,
    pub normal: u128,
    pub high: u128,
}

impl GasPrices {
    pub fn from_base(base_wei: u128) -> Self {
        Self {
            low: Priority::Low.apply(base_wei),
            normal: Priority::Normal.apply(base_wei),
            high: Priority::High.apply(base_wei),
        }
    }

    pub fn for_priority(&self, priority: Priority) -> u128 {
        match priority {
            Priority::Low => self.low,
            Priority::Normal => self.normal,
            Priority::High => self.high,
        }
    }
}

fn map_http_error(e: HttpError) -> EthereumError {
    match e {
        HttpError::Decode(msg) => EthereumError::InvalidResponse(msg),
        other => EthereumError::Transport(other.to_string()),
    }
}

/// JSON-RPC client for an Ethereum node
#[derive(Debug)]
pub struct EthereumClient {
    http: Client,
    rpc_url: String,
    retry: RetryPolicy,
    next_id: AtomicU64,
}

impl EthereumClient {
    pub fn new(rpc_url: &str, timeout: Duration, retry: RetryPolicy) -> Result<Self, EthereumError> {
        let http = http::build_client(timeout).map_err(map_http_error)?;
        Ok(Self {
            http,
            rpc_url: rpc_url.to_string(),
            retry,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }

    /// Issue one JSON-RPC call and return the raw `result`
    async fn rpc(&self, method: &str, params: Value) -> Result<Value, EthereumError> {
        let body = RpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };
        let request = self.http.post(&self.rpc_url).json(&body);

        let response: RpcResponse = http::send_json(&self.retry, method, request)
            .await
            .map_err(map_http_error)?;

        if let Some(err) = response.error {
            tracing::debug!(method, code = err.code, message = %err.message, "JSON-RPC error");
            return Err(EthereumError::Rpc {
                code: err.code,
                message: err.message,
            });
        }
        Ok(response.result.unwrap_or(Value::Null))
    }

    async fn rpc_typed<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, EthereumError> {
        let result = self.rpc(method, params).await?;
        serde_json::from_value(result)
            .map_err(|e| EthereumError::InvalidResponse(format!("{}: {}", method, e)))
    }

    async fn quantity(&self, method: &str, params: Value) -> Result<u128, EthereumError> {
        let hex: String = self.rpc_typed(method, params).await?;
        parse_quantity(&hex)
    }

    /// Current gas price scaled for each priority
    pub async fn gas_prices(&self) -> Result<GasPrices, EthereumError> {
        Ok(GasPrices::from_base(self.gas_price().await?))
    }
}

fn call_params(request: &CallRequest) -> Value {
    let mut obj = serde_json::Map::new();
    if let Some(from) = &request.from {
        obj.insert("from".into(), json!(from));
    }
    obj.insert("to".into(), json!(request.to));
    if let Some(data) = &request.data {
        obj.insert("data".into(), json!(data));
    }
    if let Some(value) = &request.value {
        obj.insert("value".into(), json!(value));
    }
    Value::Object(obj)
}

#[async_trait]
impl EvmClient for EthereumClient {
    async fn get_balance(&self, address: &str) -> Result<u128, EthereumError> {
        parse_address(address)?;
        self.quantity("eth_getBalance", json!([address, "latest"])).await
    }

    async fn gas_price(&self) -> Result<u128, EthereumError> {
        self.quantity("eth_gasPrice", json!([])).await
    }

    async fn block_number(&self) -> Result<u64, EthereumError> {
        let block = self.quantity("eth_blockNumber", json!([])).await?;
        u64::try_from(block).map_err(|_| EthereumError::InvalidResponse("block number out of range".into()))
    }

    async fn get_transaction_receipt(&self, tx_hash: &str) -> Result<Option<TransactionReceipt>, EthereumError> {
        let raw: Option<RawReceipt> = self
            .rpc_typed("eth_getTransactionReceipt", json!([tx_hash]))
            .await?;

        let Some(raw) = raw else {
            return Ok(None);
        };
        // A receipt without a block number is still pending on some nodes
        let Some(block) = raw.block_number else {
            return Ok(None);
        };

        let block_number = u64::try_from(parse_quantity(&block)?)
            .map_err(|_| EthereumError::InvalidResponse("block number out of range".into()))?;

        Ok(Some(TransactionReceipt {
            transaction_hash: raw.transaction_hash,
            block_number,
            gas_used: parse_quantity(&raw.gas_used)?,
            success: raw.status.as_deref() == Some("0x1"),
        }))
    }

    async fn call(&self, request: &CallRequest) -> Result<Vec<u8>, EthereumError> {
        let data: String = self
            .rpc_typed("eth_call", json!([call_params(request), "latest"]))
            .await?;
        decode_hex(&data)
    }

    async fn estimate_gas(&self, request: &CallRequest) -> Result<u64, EthereumError> {
        let gas = self.quantity("eth_estimateGas", json!([call_params(request)])).await?;
        u64::try_from(gas).map_err(|_| EthereumError::InvalidResponse("gas estimate out of range".into()))
    }

    async fn send_raw_transaction(&self, raw_tx: &str) -> Result<String, EthereumError> {
        let tx_hash: String = self
            .rpc_typed("eth_sendRawTransaction", json!([raw_tx]))
            .await?;
        tracing::info!(tx_hash = %tx_hash, "Submitted raw transaction");
        Ok(tx_hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn client(url: &str) -> EthereumClient {
        EthereumClient::new(url, Duration::from_secs(5), RetryPolicy::immediate(2)).unwrap()
    }

    #[tokio::test]
    async fn test_gas_price_decodes_quantity() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/")
            .match_body(Matcher::PartialJson(json!({"jsonrpc": "2.0", "method": "eth_gasPrice"})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"jsonrpc":"2.0","id":1,"result":"0x4a817c800"}"#)
            .create_async()
            .await;

        let client = client(&server.url());
        assert_eq!(client.gas_price().await.unwrap(), 20_000_000_000);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_gas_prices_scale_by_priority() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/")
            .with_status(200)
            .with_body(r#"{"jsonrpc":"2.0","id":1,"result":"0x2540be400"}"#)
            .create_async()
            .await;

        let prices = client(&server.url()).gas_prices().await.unwrap();
        assert_eq!(prices.normal, 10_000_000_000);
        assert_eq!(prices.low, 8_000_000_000);
        assert_eq!(prices.high, 13_000_000_000);
        assert_eq!(prices.for_priority(Priority::High), prices.high);
    }

    #[tokio::test]
    async fn test_rpc_error_is_surfaced() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/")
            .with_status(200)
            .with_body(r#"{"jsonrpc":"2.0","id":1,"error":{"code":-32000,"message":"nonce too low"}}"#)
            .create_async()
            .await;

        let err = client(&server.url()).send_raw_transaction("0xdead").await.unwrap_err();
        assert_eq!(
            err,
            EthereumError::Rpc {
                code: -32000,
                message: "nonce too low".into()
            }
        );
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_pending_receipt_is_none() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/")
            .with_status(200)
            .with_body(r#"{"jsonrpc":"2.0","id":1,"result":null}"#)
            .create_async()
            .await;

        assert_eq!(client(&server.url()).get_transaction_receipt("0xabc").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_receipt_decoding() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/")
            .with_status(200)
            .with_body(
                r#"{"jsonrpc":"2.0","id":1,"result":{"transactionHash":"0xabc","blockNumber":"0x10","gasUsed":"0x5208","status":"0x0"}}"#,
            )
            .create_async()
            .await;

        let receipt = client(&server.url())
            .get_transaction_receipt("0xabc")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(receipt.block_number, 16);
        assert_eq!(receipt.gas_used, 21_000);
        assert!(!receipt.success);
    }

    #[tokio::test]
    async fn test_call_decodes_return_data() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/")
            .match_body(Matcher::PartialJson(json!({"method": "eth_call"})))
            .with_status(200)
            .with_body(r#"{"jsonrpc":"2.0","id":1,"result":"0x0000000000000000000000000000000000000000000000000000000000000008"}"#)
            .create_async()
            .await;

        let request = CallRequest {
            to: "0x5f4eC3Df9cbd43714FE2740f5E3616155c5b8419".into(),
            data: Some("0x313ce567".into()),
            ..Default::default()
        };
        let data = client(&server.url()).call(&request).await.unwrap();
        assert_eq!(data.len(), 32);
        assert_eq!(data[31], 8);
    }

    #[tokio::test]
    async fn test_invalid_address_rejected_before_request() {
        let server = mockito::Server::new_async().await;
        let err = client(&server.url()).get_balance("not-an-address").await.unwrap_err();
        assert!(matches!(err, EthereumError::InvalidAddress(_)));
    }

    #[tokio::test]
    async fn test_server_error_becomes_transport() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/")
            .with_status(502)
            .expect(2)
            .create_async()
            .await;

        let err = client(&server.url()).block_number().await.unwrap_err();
        assert!(err.is_retryable());
        mock.assert_async().await;
    }
}
