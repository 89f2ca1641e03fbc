/// Chain balance adapter
/// Ethereum JSON-RPC client for native-coin balances, ERC-20 balances, and
/// ERC-20 Transfer logs. Pure request/response; all amounts are returned
/// pre-scaled to the token's display denomination as `Decimal`.
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// keccak256("Transfer(address,address,uint256)")
pub const TRANSFER_TOPIC: &str =
    "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef";

const NATIVE_DECIMALS: u32 = 18;

#[derive(Error, Debug)]
pub enum ChainError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),
    #[error("RPC returned error: {0}")]
    RpcError(String),
    #[error("invalid response format: {0}")]
    InvalidResponse(String),
    #[error("quantity out of range: {0}")]
    Overflow(String),
    #[error("network timeout")]
    Timeout,
}

/// A raw ERC-20 Transfer log entry
#[derive(Debug, Clone)]
pub struct TransferLog {
    pub contract: String,
    pub from: String,
    pub to: String,
    pub raw_amount: u128,
    pub block_number: u64,
    pub tx_hash: String,
    pub log_index: u64,
}

#[derive(Debug, Deserialize)]
struct RawLog {
    address: String,
    topics: Vec<String>,
    data: String,
    #[serde(rename = "blockNumber")]
    block_number: String,
    #[serde(rename = "transactionHash")]
    transaction_hash: String,
    #[serde(rename = "logIndex")]
    log_index: String,
}

/// Ethereum JSON-RPC client
pub struct EthRpcClient {
    endpoint: String,
    client: reqwest::Client,
    request_timeout: Duration,
}

impl EthRpcClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        let client = reqwest::ClientBuilder::new()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        EthRpcClient {
            endpoint: endpoint.into(),
            client,
            request_timeout: Duration::from_secs(30),
        }
    }

    /// Native ETH balance for an address, in ether
    pub async fn native_balance(&self, address: &str) -> Result<Decimal, ChainError> {
        let result = self
            .call("eth_getBalance", json!([address, "latest"]))
            .await?;
        let wei = result_hex_quantity(&result)?;
        scale_units(wei, NATIVE_DECIMALS)
    }

    /// ERC-20 balance via `balanceOf(address)`, scaled by the token's decimals
    pub async fn token_balance(
        &self,
        contract: &str,
        holder: &str,
        decimals: u32,
    ) -> Result<Decimal, ChainError> {
        let data = format!("0x70a08231{}", pad_address(holder)?);
        let result = self
            .call("eth_call", json!([{"to": contract, "data": data}, "latest"]))
            .await?;
        let raw = result_hex_quantity(&result)?;
        scale_units(raw, decimals)
    }

    /// Latest block number
    pub async fn latest_block(&self) -> Result<u64, ChainError> {
        let result = self.call("eth_blockNumber", json!([])).await?;
        let raw = result_hex_quantity(&result)?;
        u64::try_from(raw).map_err(|_| ChainError::Overflow(format!("{} does not fit in u64", raw)))
    }

    /// Timestamp of a block, as seconds since the epoch
    pub async fn block_timestamp(&self, block: u64) -> Result<u64, ChainError> {
        let result = self
            .call(
                "eth_getBlockByNumber",
                json!([format!("{:#x}", block), false]),
            )
            .await?;
        let timestamp = result
            .get("timestamp")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                ChainError::InvalidResponse("block response missing timestamp".to_string())
            })?;
        let raw = parse_hex_quantity(timestamp)?;
        u64::try_from(raw).map_err(|_| ChainError::Overflow(format!("{} does not fit in u64", raw)))
    }

    /// ERC-20 Transfer logs touching `wallet` for a token contract within a
    /// block range. Both directions are fetched (wallet as sender, wallet as
    /// recipient) and merged.
    pub async fn transfer_logs(
        &self,
        contract: &str,
        wallet: &str,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<TransferLog>, ChainError> {
        let wallet_topic = format!("0x{}", pad_address(wallet)?);

        let outgoing = self
            .fetch_logs(
                contract,
                from_block,
                to_block,
                json!([TRANSFER_TOPIC, wallet_topic]),
            )
            .await?;
        let incoming = self
            .fetch_logs(
                contract,
                from_block,
                to_block,
                json!([TRANSFER_TOPIC, Value::Null, wallet_topic]),
            )
            .await?;

        let mut logs = outgoing;
        logs.extend(incoming);
        logs.sort_by_key(|l| (l.block_number, l.log_index));
        logs.dedup_by_key(|l| (l.tx_hash.clone(), l.log_index));
        Ok(logs)
    }

    async fn fetch_logs(
        &self,
        contract: &str,
        from_block: u64,
        to_block: u64,
        topics: Value,
    ) -> Result<Vec<TransferLog>, ChainError> {
        let params = json!([{
            "address": contract,
            "fromBlock": format!("{:#x}", from_block),
            "toBlock": format!("{:#x}", to_block),
            "topics": topics,
        }]);
        let result = self.call("eth_getLogs", params).await?;

        let raw_logs: Vec<RawLog> = serde_json::from_value(result).map_err(|e| {
            ChainError::InvalidResponse(format!("failed to parse logs response: {}", e))
        })?;

        let mut logs = Vec::with_capacity(raw_logs.len());
        for raw in raw_logs {
            match decode_transfer_log(&raw) {
                Ok(log) => logs.push(log),
                Err(e) => warn!(
                    tx = raw.transaction_hash.as_str(),
                    error = %e,
                    "skipping undecodable transfer log"
                ),
            }
        }
        Ok(logs)
    }

    /// Single JSON-RPC call, returning the `result` field
    async fn call(&self, method: &str, params: Value) -> Result<Value, ChainError> {
        debug!(method, "rpc call to {}", self.endpoint);

        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ChainError::Timeout
                } else {
                    ChainError::RequestFailed(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            return Err(ChainError::RpcError(format!(
                "HTTP {}: {}",
                response.status(),
                response.text().await.unwrap_or_default()
            )));
        }

        let payload: Value = response.json().await.map_err(|e| {
            ChainError::InvalidResponse(format!("failed to parse RPC response: {}", e))
        })?;

        if let Some(error) = payload.get("error") {
            return Err(ChainError::RpcError(error.to_string()));
        }

        payload
            .get("result")
            .cloned()
            .ok_or_else(|| ChainError::InvalidResponse("RPC response missing result".to_string()))
    }
}

fn decode_transfer_log(raw: &RawLog) -> Result<TransferLog, ChainError> {
    if raw.topics.len() < 3 {
        return Err(ChainError::InvalidResponse(format!(
            "transfer log has {} topics, expected 3",
            raw.topics.len()
        )));
    }

    Ok(TransferLog {
        contract: raw.address.to_lowercase(),
        from: topic_to_address(&raw.topics[1])?,
        to: topic_to_address(&raw.topics[2])?,
        raw_amount: parse_hex_quantity(&raw.data)?,
        block_number: parse_hex_u64(&raw.block_number)?,
        tx_hash: raw.transaction_hash.to_lowercase(),
        log_index: parse_hex_u64(&raw.log_index)?,
    })
}

fn result_hex_quantity(result: &Value) -> Result<u128, ChainError> {
    let hex = result.as_str().ok_or_else(|| {
        ChainError::InvalidResponse("expected a hex string result".to_string())
    })?;
    parse_hex_quantity(hex)
}

/// Parse a 0x-prefixed hex quantity. Values wider than 128 bits are rejected
/// rather than silently truncated.
pub fn parse_hex_quantity(hex: &str) -> Result<u128, ChainError> {
    let digits = hex
        .strip_prefix("0x")
        .ok_or_else(|| ChainError::InvalidResponse(format!("`{}` is not 0x-prefixed", hex)))?;
    if digits.is_empty() {
        return Err(ChainError::InvalidResponse("empty hex quantity".to_string()));
    }

    let trimmed = digits.trim_start_matches('0');
    if trimmed.is_empty() {
        return Ok(0);
    }
    if trimmed.len() > 32 {
        return Err(ChainError::Overflow(format!(
            "`{}` exceeds 128 bits",
            hex
        )));
    }

    u128::from_str_radix(trimmed, 16)
        .map_err(|e| ChainError::InvalidResponse(format!("`{}` is not valid hex: {}", hex, e)))
}

fn parse_hex_u64(hex: &str) -> Result<u64, ChainError> {
    let raw = parse_hex_quantity(hex)?;
    u64::try_from(raw).map_err(|_| ChainError::Overflow(format!("{} does not fit in u64", raw)))
}

/// Scale raw integer token units into display units by the token's decimals
pub fn scale_units(raw: u128, decimals: u32) -> Result<Decimal, ChainError> {
    let signed = i128::try_from(raw)
        .map_err(|_| ChainError::Overflow(format!("{} exceeds decimal range", raw)))?;
    if decimals > 28 {
        return Err(ChainError::Overflow(format!(
            "{} decimals exceeds supported precision",
            decimals
        )));
    }
    Ok(Decimal::from_i128_with_scale(signed, decimals))
}

/// Left-pad an address to a 32-byte hex word (no 0x prefix)
fn pad_address(address: &str) -> Result<String, ChainError> {
    let stripped = address
        .strip_prefix("0x")
        .ok_or_else(|| ChainError::InvalidResponse(format!("`{}` is not 0x-prefixed", address)))?;
    if stripped.len() != 40 || !stripped.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ChainError::InvalidResponse(format!(
            "`{}` is not a 20-byte address",
            address
        )));
    }
    Ok(format!("{:0>64}", stripped.to_lowercase()))
}

/// Extract the 20-byte address from a 32-byte topic word
fn topic_to_address(topic: &str) -> Result<String, ChainError> {
    let stripped = topic
        .strip_prefix("0x")
        .ok_or_else(|| ChainError::InvalidResponse(format!("`{}` is not 0x-prefixed", topic)))?;
    if stripped.len() != 64 {
        return Err(ChainError::InvalidResponse(format!(
            "topic `{}` is not 32 bytes",
            topic
        )));
    }
    Ok(format!("0x{}", &stripped[24..].to_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn parses_hex_quantities() {
        assert_eq!(parse_hex_quantity("0x0").unwrap(), 0);
        assert_eq!(parse_hex_quantity("0x10").unwrap(), 16);
        assert_eq!(parse_hex_quantity("0xde0b6b3a7640000").unwrap(), 10u128.pow(18));
        // 32 bytes of zero-padding is fine
        let padded = format!("0x{:0>64}", "a");
        assert_eq!(parse_hex_quantity(&padded).unwrap(), 10);
    }

    #[test]
    fn rejects_malformed_quantities() {
        assert!(parse_hex_quantity("123").is_err());
        assert!(parse_hex_quantity("0x").is_err());
        assert!(parse_hex_quantity("0xzz").is_err());
        // 2^128 does not fit
        let too_wide = format!("0x1{}", "0".repeat(32));
        assert!(matches!(
            parse_hex_quantity(&too_wide),
            Err(ChainError::Overflow(_))
        ));
    }

    #[test]
    fn scales_wei_to_ether() {
        let one_eth = scale_units(10u128.pow(18), 18).unwrap();
        assert_eq!(one_eth, Decimal::ONE);

        let half = scale_units(5 * 10u128.pow(17), 18).unwrap();
        assert_eq!(half, Decimal::from_str("0.5").unwrap());

        let usdc_style = scale_units(1_250_000, 6).unwrap();
        assert_eq!(usdc_style, Decimal::from_str("1.25").unwrap());
    }

    #[test]
    fn pads_addresses_to_topic_width() {
        let padded = pad_address("0xAb5801a7D398351b8bE11C439e05C5B3259aeC9B").unwrap();
        assert_eq!(padded.len(), 64);
        assert!(padded.starts_with("000000000000000000000000ab5801a7"));
        assert!(pad_address("0x1234").is_err());
        assert!(pad_address("no-prefix").is_err());
    }

    #[test]
    fn extracts_address_from_topic() {
        let topic = "0x000000000000000000000000ab5801a7d398351b8be11c439e05c5b3259aec9b";
        assert_eq!(
            topic_to_address(topic).unwrap(),
            "0xab5801a7d398351b8be11c439e05c5b3259aec9b"
        );
        assert!(topic_to_address("0x1234").is_err());
    }

    #[test]
    fn decodes_transfer_log() {
        let raw = RawLog {
            address: "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2".to_string(),
            topics: vec![
                TRANSFER_TOPIC.to_string(),
                "0x000000000000000000000000ab5801a7d398351b8be11c439e05c5b3259aec9b"
                    .to_string(),
                "0x00000000000000000000000047ac0fb4f2d84898e4d9e7b4dab3c24507a6d503"
                    .to_string(),
            ],
            data: "0x0000000000000000000000000000000000000000000000000de0b6b3a7640000"
                .to_string(),
            block_number: "0x12d687".to_string(),
            transaction_hash: "0xabc123".to_string(),
            log_index: "0x2a".to_string(),
        };

        let log = decode_transfer_log(&raw).unwrap();
        assert_eq!(log.from, "0xab5801a7d398351b8be11c439e05c5b3259aec9b");
        assert_eq!(log.to, "0x47ac0fb4f2d84898e4d9e7b4dab3c24507a6d503");
        assert_eq!(log.raw_amount, 10u128.pow(18));
        assert_eq!(log.block_number, 1_234_567);
        assert_eq!(log.log_index, 42);
    }

    #[test]
    fn transfer_log_requires_indexed_topics() {
        let raw = RawLog {
            address: "0x0".to_string(),
            topics: vec![TRANSFER_TOPIC.to_string()],
            data: "0x0".to_string(),
            block_number: "0x1".to_string(),
            transaction_hash: "0x1".to_string(),
            log_index: "0x0".to_string(),
        };
        assert!(decode_transfer_log(&raw).is_err());
    }

    #[test]
    fn rpc_client_stores_endpoint() {
        let client = EthRpcClient::new("https://eth-mainnet.example.org");
        assert_eq!(client.endpoint, "https://eth-mainnet.example.org");
    }
}
