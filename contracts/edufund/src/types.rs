//! # Types
//!
//! Shared data structures used across all modules of the EduFund contract.
//!
//! ## Design decisions
//!
//! ### Config / State split
//!
//! A `Campaign` is internally stored as two separate ledger entries:
//!
//! - [`CampaignConfig`] — written once at creation; never mutated.
//! - [`CampaignState`] — written on every donation, proposal and finalization.
//!
//! The public API exposes the reconstructed [`Campaign`] struct for convenience.
//!
//! ### Status as a Finite-State Machine
//!
//! [`CampaignStatus`] replaces the `active` / `isTransactionProposed` /
//! `isTransactionExecuted` flag triple with a single forward-only tag:
//!
//! ```text
//! Open ──► Funded ───┐
//!   ├────► Inactive ─┤
//!   ├────► Expired ──┼──► Proposed ──► Finalized(Paid | Refunded)
//!   └────────────────┘
//! ```
//!
//! `Expired` is never written to storage. It is reported by reads for an
//! `Open` campaign whose deadline has passed.

use soroban_sdk::{contracttype, Address, String};

/// Which way the donors decided a proposal.
#[contracttype]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Outcome {
    /// Recipients were paid their allotted amounts.
    Paid,
    /// Every donor got their contribution back.
    Refunded,
}

/// Lifecycle status of a campaign.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CampaignStatus {
    /// Accepting donations.
    Open,
    /// Balance reached the goal exactly.
    Funded,
    /// Deactivated by the owner or the contract admin.
    Inactive,
    /// Deadline passed while still open. Derived on read only.
    Expired,
    /// A spending proposal is awaiting donor votes.
    Proposed,
    /// Terminal: funds were disbursed one way or the other.
    Finalized(Outcome),
}

impl CampaignStatus {
    /// `true` while the campaign accepts donations.
    pub fn is_active(&self) -> bool {
        matches!(self, CampaignStatus::Open)
    }

    /// `true` once a spending proposal has been submitted.
    pub fn is_transaction_proposed(&self) -> bool {
        matches!(self, CampaignStatus::Proposed | CampaignStatus::Finalized(_))
    }

    /// `true` once finalization has run.
    pub fn is_transaction_executed(&self) -> bool {
        matches!(self, CampaignStatus::Finalized(_))
    }
}

/// Immutable campaign configuration, written once at creation.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CampaignConfig {
    pub id: u64,
    pub owner: Address,
    pub title: String,
    pub description: String,
    pub goal: i128,
    pub deadline: u64,
}

/// Mutable campaign state, updated on donations, proposals and finalization.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CampaignState {
    pub balance: i128,
    pub status: CampaignStatus,
}

/// Full on-chain representation of a campaign.
///
/// Used as the public API return type; reconstructed internally from
/// the split `CampaignConfig` + `CampaignState` storage entries.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Campaign {
    /// Unique identifier (auto-incremented from 0).
    pub id: u64,
    /// Address that created the campaign.
    pub owner: Address,
    pub title: String,
    pub description: String,
    /// Target amount in the token's smallest unit.
    pub goal: i128,
    /// Donations currently held for this campaign.
    pub balance: i128,
    /// Ledger timestamp from which donations are rejected.
    pub deadline: u64,
    pub status: CampaignStatus,
}

/// One entry of a campaign's donation history.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Donation {
    pub campaign_id: u64,
    pub donor: Address,
    pub amount: i128,
}

/// One disbursement line of a spending proposal.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProposedTransaction {
    pub recipient: Address,
    pub amount: i128,
    pub description: String,
}

/// A donor's choice on the campaign's proposal.
#[contracttype]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u32)]
pub enum VoteChoice {
    No = 0,
    Yes = 1,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Vote {
    pub voter: Address,
    pub choice: VoteChoice,
}
