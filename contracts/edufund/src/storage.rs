//! # Storage
//!
//! Provides typed helpers over Soroban's two storage tiers used by EduFund:
//!
//! ## Instance storage (contract-lifetime TTL)
//!
//! | Key              | Type      | Description                          |
//! |------------------|-----------|--------------------------------------|
//! | `CampaignCount`  | `u64`     | Auto-increment campaign ID counter   |
//! | `Admin`          | `Address` | Contract administrator               |
//! | `Token`          | `Address` | Token used for donations and payouts |
//!
//! Instance TTL is bumped by **7 days** whenever it falls below 1 day remaining.
//!
//! ## Persistent storage (per-entry TTL)
//!
//! | Key                      | Type                       | Description                      |
//! |--------------------------|----------------------------|----------------------------------|
//! | `CampConfig(id)`         | `CampaignConfig`           | Immutable campaign configuration |
//! | `CampState(id)`          | `CampaignState`            | Balance and status               |
//! | `Donation(id, donor)`    | `i128`                     | Amount given by one donor        |
//! | `Donations(id)`          | `Vec<Donation>`            | Donation history, in order       |
//! | `DonorCampaigns(donor)`  | `Vec<u64>`                 | Campaigns a donor has funded     |
//! | `Transactions(id)`       | `Vec<ProposedTransaction>` | The campaign's proposal          |
//! | `Votes(id)`              | `Vec<Vote>`                | Votes, in casting order          |
//! | `Voted(id, voter)`       | `bool`                     | Duplicate-vote guard             |
//!
//! Persistent TTL is bumped by **30 days** whenever it falls below 7 days remaining.

use soroban_sdk::{contracttype, panic_with_error, Address, Env, Vec};

use crate::types::{
    Campaign, CampaignConfig, CampaignState, CampaignStatus, Donation, ProposedTransaction, Vote,
};
use crate::Error;

// ── TTL Constants ────────────────────────────────────────────────────

/// Approximate ledgers per day (~5 seconds per ledger).
const DAY_IN_LEDGERS: u32 = 17_280;

const INSTANCE_BUMP_AMOUNT: u32 = 7 * DAY_IN_LEDGERS;
const INSTANCE_LIFETIME_THRESHOLD: u32 = DAY_IN_LEDGERS;

const PERSISTENT_BUMP_AMOUNT: u32 = 30 * DAY_IN_LEDGERS;
const PERSISTENT_LIFETIME_THRESHOLD: u32 = 7 * DAY_IN_LEDGERS;

// ── Storage Keys ─────────────────────────────────────────────────────

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DataKey {
    /// Global auto-increment counter for campaign IDs (Instance).
    CampaignCount,
    /// Contract administrator (Instance).
    Admin,
    /// Token contract used for all fund movement (Instance).
    Token,
    /// Immutable campaign configuration keyed by ID (Persistent).
    CampConfig(u64),
    /// Mutable campaign state keyed by ID (Persistent).
    CampState(u64),
    /// Contribution of one donor to one campaign (Persistent).
    Donation(u64, Address),
    /// Ordered donation history of a campaign (Persistent).
    Donations(u64),
    /// Campaign IDs a donor has contributed to (Persistent).
    DonorCampaigns(Address),
    /// Proposed transactions of a campaign (Persistent).
    Transactions(u64),
    /// Ordered vote list of a campaign (Persistent).
    Votes(u64),
    /// Set once `voter` has voted on the campaign (Persistent).
    Voted(u64, Address),
}

// ── Instance Storage Helpers ─────────────────────────────────────────

fn bump_instance(env: &Env) {
    env.storage()
        .instance()
        .extend_ttl(INSTANCE_LIFETIME_THRESHOLD, INSTANCE_BUMP_AMOUNT);
}

pub fn is_initialized(env: &Env) -> bool {
    env.storage().instance().has(&DataKey::Admin)
}

/// Store the admin and token written by `init`.
pub fn set_config(env: &Env, admin: &Address, token: &Address) {
    env.storage().instance().set(&DataKey::Admin, admin);
    env.storage().instance().set(&DataKey::Token, token);
    bump_instance(env);
}

/// Panics with `NotInitialized` if `init` has not run.
pub fn get_admin(env: &Env) -> Address {
    bump_instance(env);
    env.storage()
        .instance()
        .get(&DataKey::Admin)
        .unwrap_or_else(|| panic_with_error!(env, Error::NotInitialized))
}

/// Panics with `NotInitialized` if `init` has not run.
pub fn get_token(env: &Env) -> Address {
    bump_instance(env);
    env.storage()
        .instance()
        .get(&DataKey::Token)
        .unwrap_or_else(|| panic_with_error!(env, Error::NotInitialized))
}

/// Number of campaigns created so far; also the next ID to hand out.
pub fn campaign_count(env: &Env) -> u64 {
    bump_instance(env);
    env.storage()
        .instance()
        .get(&DataKey::CampaignCount)
        .unwrap_or(0)
}

/// Atomically reads, increments, and stores the campaign counter.
/// Returns the ID to use for the *current* campaign (pre-increment value).
pub fn get_and_increment_campaign_id(env: &Env) -> u64 {
    let current = campaign_count(env);
    env.storage()
        .instance()
        .set(&DataKey::CampaignCount, &(current + 1));
    current
}

// ── Persistent Storage Helpers ───────────────────────────────────────

fn bump_persistent(env: &Env, key: &DataKey) {
    env.storage()
        .persistent()
        .extend_ttl(key, PERSISTENT_LIFETIME_THRESHOLD, PERSISTENT_BUMP_AMOUNT);
}

fn read_persistent<T>(env: &Env, key: &DataKey) -> Option<T>
where
    T: soroban_sdk::TryFromVal<Env, soroban_sdk::Val>,
{
    let value = env.storage().persistent().get(key);
    if value.is_some() {
        bump_persistent(env, key);
    }
    value
}

fn write_persistent<T>(env: &Env, key: &DataKey, value: &T)
where
    T: soroban_sdk::IntoVal<Env, soroban_sdk::Val>,
{
    env.storage().persistent().set(key, value);
    bump_persistent(env, key);
}

/// Save both the immutable config and initial mutable state for a new campaign.
pub fn save_campaign(env: &Env, config: &CampaignConfig, state: &CampaignState) {
    write_persistent(env, &DataKey::CampConfig(config.id), config);
    write_persistent(env, &DataKey::CampState(config.id), state);
}

/// Load only the immutable campaign configuration.
/// Panics with `CampaignNotFound` for an unknown ID.
pub fn load_campaign_config(env: &Env, id: u64) -> CampaignConfig {
    read_persistent(env, &DataKey::CampConfig(id))
        .unwrap_or_else(|| panic_with_error!(env, Error::CampaignNotFound))
}

/// Load only the mutable campaign state, exactly as stored.
pub fn load_campaign_state(env: &Env, id: u64) -> CampaignState {
    read_persistent(env, &DataKey::CampState(id))
        .unwrap_or_else(|| panic_with_error!(env, Error::CampaignNotFound))
}

/// Save only the mutable campaign state.
pub fn save_campaign_state(env: &Env, id: u64, state: &CampaignState) {
    write_persistent(env, &DataKey::CampState(id), state);
}

/// Load the full `Campaign` by combining config and state.
///
/// An `Open` campaign whose deadline has passed is reported as `Expired`.
pub fn load_campaign(env: &Env, id: u64) -> Campaign {
    let config = load_campaign_config(env, id);
    let state = load_campaign_state(env, id);
    let status = match state.status {
        CampaignStatus::Open if env.ledger().timestamp() >= config.deadline => {
            CampaignStatus::Expired
        }
        status => status,
    };
    Campaign {
        id: config.id,
        owner: config.owner,
        title: config.title,
        description: config.description,
        goal: config.goal,
        balance: state.balance,
        deadline: config.deadline,
        status,
    }
}

// ── Donation ledger ──────────────────────────────────────────────────

/// Amount `donor` gave to the campaign, if any.
pub fn get_donation(env: &Env, id: u64, donor: &Address) -> Option<i128> {
    read_persistent(env, &DataKey::Donation(id, donor.clone()))
}

pub fn has_donated(env: &Env, id: u64, donor: &Address) -> bool {
    env.storage()
        .persistent()
        .has(&DataKey::Donation(id, donor.clone()))
}

pub fn get_donations(env: &Env, id: u64) -> Vec<Donation> {
    read_persistent(env, &DataKey::Donations(id)).unwrap_or_else(|| Vec::new(env))
}

/// Record a donation in the donor map, the campaign history and the
/// donor's campaign index.
pub fn record_donation(env: &Env, donation: &Donation) {
    let id = donation.campaign_id;
    write_persistent(
        env,
        &DataKey::Donation(id, donation.donor.clone()),
        &donation.amount,
    );

    let mut history = get_donations(env, id);
    history.push_back(donation.clone());
    write_persistent(env, &DataKey::Donations(id), &history);

    let mut campaigns = get_donor_campaigns(env, &donation.donor);
    campaigns.push_back(id);
    write_persistent(
        env,
        &DataKey::DonorCampaigns(donation.donor.clone()),
        &campaigns,
    );
}

pub fn get_donor_campaigns(env: &Env, donor: &Address) -> Vec<u64> {
    read_persistent(env, &DataKey::DonorCampaigns(donor.clone())).unwrap_or_else(|| Vec::new(env))
}

// ── Proposal & votes ─────────────────────────────────────────────────

pub fn get_transactions(env: &Env, id: u64) -> Vec<ProposedTransaction> {
    read_persistent(env, &DataKey::Transactions(id)).unwrap_or_else(|| Vec::new(env))
}

pub fn save_transactions(env: &Env, id: u64, transactions: &Vec<ProposedTransaction>) {
    write_persistent(env, &DataKey::Transactions(id), transactions);
}

pub fn get_votes(env: &Env, id: u64) -> Vec<Vote> {
    read_persistent(env, &DataKey::Votes(id)).unwrap_or_else(|| Vec::new(env))
}

pub fn has_voted(env: &Env, id: u64, voter: &Address) -> bool {
    env.storage()
        .persistent()
        .has(&DataKey::Voted(id, voter.clone()))
}

/// Append a vote and set the voter's guard. Returns the vote's index.
pub fn record_vote(env: &Env, id: u64, vote: &Vote) -> u32 {
    let mut votes = get_votes(env, id);
    votes.push_back(vote.clone());
    write_persistent(env, &DataKey::Votes(id), &votes);
    write_persistent(env, &DataKey::Voted(id, vote.voter.clone()), &true);
    votes.len() - 1
}
