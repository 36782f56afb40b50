//! Soroban RPC client — polls `getEvents` and decodes EduFund events.
//!
//! ## Resilience
//!
//! * Exponential back-off is applied when the RPC returns an error or rate-limit
//!   response, up to [`MAX_BACKOFF_SECS`] seconds.
//! * Transient network errors (connection reset, timeout) are retried silently.
//!
//! ## Value format
//!
//! Events are requested with `xdrFormat: "json"`, so topics and bodies arrive
//! as tagged ScVal JSON (`{"symbol":"donated"}`, `{"map":[...]}`, ...).
//! [`flatten_scval`] turns those into plain JSON before fields are read.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use crate::errors::{IndexerError, Result};
use crate::events::{EduFundEvent, EventKind};

const MAX_BACKOFF_SECS: u64 = 60;
const INITIAL_BACKOFF_SECS: u64 = 2;

// ─────────────────────────────────────────────────────────
// JSON-RPC response shapes
// ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RpcResponse {
    pub result: Option<EventsResult>,
    pub error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct EventsResult {
    pub events: Vec<RawEvent>,
    pub cursor: Option<String>,
    #[serde(rename = "latestLedger")]
    pub latest_ledger: Option<u64>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct RawEvent {
    /// Topic list when the RPC answers in its default format.
    #[serde(default)]
    pub topic: Vec<Value>,
    /// Topic list when `xdrFormat: "json"` was requested.
    #[serde(rename = "topicJson")]
    pub topic_json: Option<Vec<Value>>,
    pub value: Option<Value>,
    #[serde(rename = "valueJson")]
    pub value_json: Option<Value>,
    #[serde(rename = "contractId")]
    pub contract_id: Option<String>,
    #[serde(rename = "txHash")]
    pub tx_hash: Option<String>,
    pub id: Option<String>,
    pub ledger: Option<u64>,
    #[serde(rename = "ledgerClosedAt")]
    pub ledger_closed_at: Option<String>,
    #[serde(rename = "inSuccessfulContractCall")]
    pub in_successful_contract_call: Option<bool>,
    #[serde(rename = "pagingToken")]
    pub paging_token: Option<String>,
}

// ─────────────────────────────────────────────────────────
// Public API
// ─────────────────────────────────────────────────────────

/// Fetch a page of events from the RPC.
///
/// * `start_ledger` — the ledger sequence to scan from (inclusive).
/// * `cursor`       — optional opaque pagination cursor from a previous response.
/// * `limit`        — maximum number of events to return.
///
/// Returns `(events, next_cursor, latest_ledger)`.
pub async fn fetch_events(
    client: &Client,
    rpc_url: &str,
    contract_id: &str,
    start_ledger: u32,
    cursor: Option<&str>,
    limit: u32,
) -> Result<(Vec<RawEvent>, Option<String>, Option<u64>)> {
    let mut backoff = INITIAL_BACKOFF_SECS;

    loop {
        let params = build_params(contract_id, start_ledger, cursor, limit);

        let response = client
            .post(rpc_url)
            .json(&json!({
                "jsonrpc": "2.0",
                "id": 1,
                "method": "getEvents",
                "params": params,
            }))
            .send()
            .await;

        match response {
            Err(e) => {
                warn!("RPC request failed (will retry in {backoff}s): {e}");
                tokio::time::sleep(Duration::from_secs(backoff)).await;
                backoff = (backoff * 2).min(MAX_BACKOFF_SECS);
                continue;
            }
            Ok(resp) => {
                let status = resp.status();
                if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                    warn!("Rate-limited by RPC (will retry in {backoff}s)");
                    tokio::time::sleep(Duration::from_secs(backoff)).await;
                    backoff = (backoff * 2).min(MAX_BACKOFF_SECS);
                    continue;
                }

                let body: RpcResponse = resp.json().await?;

                if let Some(err) = body.error {
                    // Code -32600 / -32601 are hard failures; everything else we retry
                    if err.code == -32600 || err.code == -32601 {
                        return Err(IndexerError::Rpc {
                            code: err.code,
                            message: err.message,
                        });
                    }
                    warn!(
                        "RPC soft error (will retry in {backoff}s): {} {}",
                        err.code, err.message
                    );
                    tokio::time::sleep(Duration::from_secs(backoff)).await;
                    backoff = (backoff * 2).min(MAX_BACKOFF_SECS);
                    continue;
                }

                let result = body.result.ok_or_else(|| {
                    IndexerError::Decode("Empty result from getEvents".to_string())
                })?;

                debug!(
                    "Fetched {} events (latest_ledger={:?})",
                    result.events.len(),
                    result.latest_ledger
                );

                return Ok((result.events, result.cursor, result.latest_ledger));
            }
        }
    }
}

fn build_params(contract_id: &str, start_ledger: u32, cursor: Option<&str>, limit: u32) -> Value {
    let mut params = json!({
        "filters": [
            {
                "type": "contract",
                "contractIds": [contract_id]
            }
        ],
        "pagination": {
            "limit": limit
        },
        "xdrFormat": "json"
    });

    if let Some(cur) = cursor {
        params["pagination"]["cursor"] = json!(cur);
    } else {
        params["startLedger"] = json!(start_ledger);
    }

    params
}

// ─────────────────────────────────────────────────────────
// Event decoding
// ─────────────────────────────────────────────────────────

/// Decode a list of raw RPC events into [`EduFundEvent`] structs.
///
/// Events without an id, without topics, or from failed contract calls
/// are dropped.
pub fn decode_events(raw: &[RawEvent], contract_id: &str) -> Vec<EduFundEvent> {
    raw.iter()
        .filter_map(|e| decode_single(e, contract_id))
        .collect()
}

fn decode_single(raw: &RawEvent, contract_id: &str) -> Option<EduFundEvent> {
    if raw.in_successful_contract_call == Some(false) {
        return None;
    }
    let event_id = raw.id.clone().or_else(|| raw.paging_token.clone())?;

    let topics: Vec<Value> = raw
        .topic_json
        .as_deref()
        .unwrap_or(&raw.topic)
        .iter()
        .map(topic_value)
        .collect();

    let kind = EventKind::from_topic(topics.first()?.as_str()?);

    let ledger = raw.ledger.unwrap_or(0) as i64;
    let timestamp = raw
        .ledger_closed_at
        .as_deref()
        .and_then(parse_iso_to_unix)
        .unwrap_or(0);

    let campaign_id = topics.get(1).and_then(scalar_string);

    let payload = raw
        .value_json
        .as_ref()
        .or(raw.value.as_ref())
        .map(flatten_scval)
        .unwrap_or(Value::Null);

    let (actor, amount) = decode_data(&payload, kind);

    Some(EduFundEvent {
        event_id,
        kind,
        campaign_id,
        actor,
        amount,
        payload,
        ledger,
        timestamp,
        contract_id: raw
            .contract_id
            .clone()
            .unwrap_or_else(|| contract_id.to_string()),
        tx_hash: raw.tx_hash.clone(),
    })
}

/// Pick the actor and amount columns out of a flattened event body.
fn decode_data(value: &Value, kind: EventKind) -> (Option<String>, Option<String>) {
    match kind {
        EventKind::CampaignCreated => (
            extract_field(value, &["owner"]),
            extract_field(value, &["goal"]),
        ),
        EventKind::DonationReceived => (
            extract_field(value, &["donor"]),
            extract_field(value, &["amount"]),
        ),
        EventKind::TransactionProposed => {
            let total = value
                .get("amounts")
                .and_then(Value::as_array)
                .map(|amounts| {
                    amounts
                        .iter()
                        .filter_map(scalar_string)
                        .filter_map(|a| a.parse::<i128>().ok())
                        .sum::<i128>()
                        .to_string()
                });
            (extract_field(value, &["owner"]), total)
        }
        EventKind::CampaignVoted => (extract_field(value, &["voter"]), None),
        EventKind::TransactionExecuted => (None, extract_field(value, &["amount"])),
        EventKind::CampaignMadeInactive
        | EventKind::FinalizingTransaction
        | EventKind::Unknown => (None, None),
    }
}

pub fn extract_field(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| value.get(key))
        .find_map(scalar_string)
}

/// Render a string, number or bool as a string.
pub fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Topics may arrive as JSON objects or as strings holding JSON.
fn topic_value(raw: &Value) -> Value {
    match raw {
        Value::String(s) => match serde_json::from_str::<Value>(s) {
            Ok(parsed @ Value::Object(_)) => flatten_scval(&parsed),
            _ => raw.clone(),
        },
        other => flatten_scval(other),
    }
}

/// Strip Soroban ScVal JSON tags, producing plain JSON.
///
/// * `{"map":[{"key":k,"val":v}, ...]}` becomes an object keyed by `k`.
/// * `{"vec":[...]}` becomes an array.
/// * Scalar tags (`symbol`, `string`, `address`, `u64`, `i128`, ...) become
///   their inner value; integers wider than 32 bits are kept as strings.
/// * `{"type":…, "value":…}` pairs become their value.
pub fn flatten_scval(value: &Value) -> Value {
    match value {
        Value::Object(map) if map.len() == 1 => {
            let Some((tag, inner)) = map.iter().next() else {
                return value.clone();
            };
            match tag.as_str() {
                "map" => match inner.as_array() {
                    Some(entries) => Value::Object(flatten_map_entries(entries)),
                    None => flatten_object(map),
                },
                "vec" => match inner.as_array() {
                    Some(items) => Value::Array(items.iter().map(flatten_scval).collect()),
                    None => Value::Null,
                },
                "symbol" | "string" | "address" | "bytes" | "bool" | "u32" | "i32" => {
                    inner.clone()
                }
                "u64" | "i64" | "u128" | "i128" | "u256" | "i256" | "timepoint" | "duration" => {
                    scalar_string(inner).map(Value::String).unwrap_or(Value::Null)
                }
                "void" => Value::Null,
                _ => flatten_object(map),
            }
        }
        Value::Object(map) if map.contains_key("type") && map.contains_key("value") => {
            flatten_scval(&map["value"])
        }
        Value::Object(map) => flatten_object(map),
        Value::Array(items) => Value::Array(items.iter().map(flatten_scval).collect()),
        other => other.clone(),
    }
}

fn flatten_object(map: &Map<String, Value>) -> Value {
    Value::Object(
        map.iter()
            .map(|(k, v)| (k.clone(), flatten_scval(v)))
            .collect(),
    )
}

fn flatten_map_entries(entries: &[Value]) -> Map<String, Value> {
    entries
        .iter()
        .filter_map(|entry| {
            let key = scalar_string(&flatten_scval(entry.get("key")?))?;
            let val = flatten_scval(entry.get("val")?);
            Some((key, val))
        })
        .collect()
}

/// Parse an ISO-8601 timestamp string into a Unix epoch (seconds).
fn parse_iso_to_unix(s: &str) -> Option<i64> {
    chrono::DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.timestamp())
}

// ─────────────────────────────────────────────────────────
// Unit tests
// ─────────────────────────────────────────────────────────
