//! # Events
//!
//! Every state transition publishes one event with topics
//! `(symbol, campaign_id)` and one of the structs below as data. The
//! indexer in `backend/indexer` keys on the leading symbol.
//!
//! | Topic      | Data                    |
//! |------------|-------------------------|
//! | `created`  | [`CampaignCreated`]     |
//! | `inactive` | [`CampaignMadeInactive`]|
//! | `donated`  | [`DonationReceived`]    |
//! | `proposed` | [`TransactionProposed`] |
//! | `voted`    | [`CampaignVoted`]       |
//! | `finalize` | [`FinalizingTransaction`] |
//! | `executed` | [`TransactionExecuted`] |

use soroban_sdk::{contracttype, symbol_short, Address, Env, String, Symbol, Vec};

use crate::types::{Outcome, VoteChoice};

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CampaignCreated {
    pub owner: Address,
    pub campaign_id: u64,
    pub title: String,
    pub description: String,
    pub goal: i128,
    pub deadline: u64,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CampaignMadeInactive {
    pub campaign_id: u64,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DonationReceived {
    pub donor: Address,
    pub campaign_id: u64,
    pub amount: i128,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TransactionProposed {
    pub owner: Address,
    pub campaign_id: u64,
    pub recipients: Vec<Address>,
    pub amounts: Vec<i128>,
    pub descriptions: Vec<String>,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CampaignVoted {
    pub voter: Address,
    pub campaign_id: u64,
    /// Position of this vote in the campaign's vote list.
    pub vote_index: u32,
    pub vote: VoteChoice,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FinalizingTransaction {
    pub campaign_id: u64,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TransactionExecuted {
    pub campaign_id: u64,
    /// Number of transfers made.
    pub disbursements: u32,
    pub outcome: Outcome,
    /// Total amount moved out of the contract.
    pub amount: i128,
}

pub const CREATED: Symbol = symbol_short!("created");
pub const INACTIVE: Symbol = symbol_short!("inactive");
pub const DONATED: Symbol = symbol_short!("donated");
pub const PROPOSED: Symbol = symbol_short!("proposed");
pub const VOTED: Symbol = symbol_short!("voted");
pub const FINALIZE: Symbol = symbol_short!("finalize");
pub const EXECUTED: Symbol = symbol_short!("executed");

pub fn emit_campaign_created(env: &Env, event: CampaignCreated) {
    env.events().publish((CREATED, event.campaign_id), event);
}

pub fn emit_campaign_made_inactive(env: &Env, campaign_id: u64) {
    env.events().publish((INACTIVE, campaign_id), CampaignMadeInactive { campaign_id });
}

pub fn emit_donation_received(env: &Env, event: DonationReceived) {
    env.events().publish((DONATED, event.campaign_id), event);
}

pub fn emit_transaction_proposed(env: &Env, event: TransactionProposed) {
    env.events().publish((PROPOSED, event.campaign_id), event);
}

pub fn emit_campaign_voted(env: &Env, event: CampaignVoted) {
    env.events().publish((VOTED, event.campaign_id), event);
}

pub fn emit_finalizing_transaction(env: &Env, campaign_id: u64) {
    env.events().publish((FINALIZE, campaign_id), FinalizingTransaction { campaign_id });
}

pub fn emit_transaction_executed(env: &Env, event: TransactionExecuted) {
    env.events().publish((EXECUTED, event.campaign_id), event);
}
