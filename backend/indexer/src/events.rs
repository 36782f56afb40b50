//! Canonical event types emitted by the EduFund contract.
//!
//! These mirror the Soroban contract events defined in
//! `contracts/edufund/src/events.rs`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// All recognised event kinds from the EduFund contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A campaign was created (`created` topic).
    CampaignCreated,
    /// A campaign stopped accepting donations (`inactive` topic).
    CampaignMadeInactive,
    /// A donor contributed (`donated` topic).
    DonationReceived,
    /// The owner proposed how to spend the funds (`proposed` topic).
    TransactionProposed,
    /// A donor voted on the proposal (`voted` topic).
    CampaignVoted,
    /// The last donor voted; finalization follows (`finalize` topic).
    FinalizingTransaction,
    /// Funds were paid out or refunded (`executed` topic).
    TransactionExecuted,
    /// An event from this contract that we don't recognise yet.
    Unknown,
}

impl EventKind {
    /// Parse the leading topic symbol string produced by Soroban into an [`EventKind`].
    pub fn from_topic(topic: &str) -> Self {
        match topic {
            "created" => Self::CampaignCreated,
            "inactive" => Self::CampaignMadeInactive,
            "donated" => Self::DonationReceived,
            "proposed" => Self::TransactionProposed,
            "voted" => Self::CampaignVoted,
            "finalize" => Self::FinalizingTransaction,
            "executed" => Self::TransactionExecuted,
            _ => Self::Unknown,
        }
    }

    /// Return a short identifier string suitable for storage in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CampaignCreated => "campaign_created",
            Self::CampaignMadeInactive => "campaign_made_inactive",
            Self::DonationReceived => "donation_received",
            Self::TransactionProposed => "transaction_proposed",
            Self::CampaignVoted => "campaign_voted",
            Self::FinalizingTransaction => "finalizing_transaction",
            Self::TransactionExecuted => "transaction_executed",
            Self::Unknown => "unknown",
        }
    }
}

/// A fully decoded EduFund event, ready to be stored in the database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EduFundEvent {
    /// RPC event id; stable across re-deliveries.
    pub event_id: String,
    pub kind: EventKind,
    pub campaign_id: Option<String>,
    pub actor: Option<String>,
    pub amount: Option<String>,
    /// Event body with Soroban value wrappers flattened to plain JSON.
    pub payload: Value,
    pub ledger: i64,
    pub timestamp: i64,
    pub contract_id: String,
    pub tx_hash: Option<String>,
}

/// A raw event record as stored in / read from the database.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct EventRecord {
    pub id: i64,
    pub event_id: String,
    pub event_type: String,
    pub campaign_id: Option<String>,
    pub actor: Option<String>,
    pub amount: Option<String>,
    pub payload: String,
    pub ledger: i64,
    pub timestamp: i64,
    pub contract_id: String,
    pub tx_hash: Option<String>,
    pub created_at: i64,
}
