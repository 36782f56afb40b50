//! # EduFund Contract
//!
//! Donor-governed crowdfunding. A campaign owner raises funds towards a
//! goal; once enough has been raised the owner proposes how to spend it,
//! and the donors vote. A YES majority pays the listed recipients, anything
//! else refunds every donor.
//!
//! | Phase        | Entry Point(s)                                   |
//! |--------------|--------------------------------------------------|
//! | Bootstrap    | [`EduFund::init`]                                |
//! | Registry     | [`EduFund::create_campaign`], [`EduFund::make_campaign_inactive`] |
//! | Funding      | [`EduFund::donate`]                              |
//! | Proposal     | [`EduFund::propose_transactions`]                |
//! | Voting       | [`EduFund::vote`]                                |
//! | Finalization | [`EduFund::finalize_transaction`]                |
//! | Queries      | `get_campaign`, `get_campaigns`, `get_donations`, `get_votes`, ... |
//!
//! ## Architecture
//!
//! Storage access is delegated to [`storage`], tallying and fund movement
//! to [`governance`], event shapes to [`events`]. Every precondition is
//! checked before the first write; a failed check panics with a typed
//! [`Error`] and the host discards the whole invocation.

#![no_std]

use soroban_sdk::{
    contract, contracterror, contractimpl, panic_with_error, token, Address, Env, String, Vec,
};

pub mod events;
mod governance;
mod storage;
mod types;

#[cfg(test)]
mod invariants;
#[cfg(test)]
mod test_voting;

use events::{CampaignCreated, CampaignVoted, DonationReceived, TransactionProposed};
pub use governance::Tally;
use storage::{
    campaign_count, get_and_increment_campaign_id, get_admin, get_donations, get_token,
    get_transactions, get_votes, has_donated, has_voted, is_initialized, load_campaign,
    load_campaign_config, load_campaign_state, record_donation, record_vote, save_campaign,
    save_campaign_state, save_transactions, set_config,
};
pub use types::{
    Campaign, CampaignStatus, Donation, Outcome, ProposedTransaction, Vote, VoteChoice,
};
use types::{CampaignConfig, CampaignState};

/// Share of the goal, in percent, a campaign must hold before its owner
/// may propose transactions. Reaching it exactly is enough.
pub const MIN_PROPOSAL_BALANCE_PERCENT: i128 = 20;

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum Error {
    // Input validation
    InvalidInput = 1,
    InvalidDeadline = 2,
    InvalidGoal = 3,
    InconsistentArrayLength = 4,
    // State preconditions
    CampaignNotFound = 5,
    CampaignNotActive = 6,
    CampaignExpired = 7,
    CampaignGoalReached = 8,
    TransactionAlreadyProposed = 9,
    TransactionIsNotYetProposed = 10,
    InsufficientBalanceForProposingTransaction = 11,
    InsufficientVotes = 12,
    // Authorization
    InvalidCampaignOwner = 13,
    OnlyDonatorsCanVote = 14,
    RecipientCannotBeDonator = 15,
    // Idempotency guards
    DonatorAlreadyDonated = 16,
    CampaignAlreadyVoted = 17,
    // Amounts and fund movement
    ContributionMustBeGreaterThanZero = 18,
    FundTransferFailed = 19,
    InvalidTransactionAmount = 20,
    ProposalExceedsBalance = 21,
    // Bootstrap
    AlreadyInitialized = 22,
    NotInitialized = 23,
}

/// Smallest balance that allows a proposal: the goal's
/// [`MIN_PROPOSAL_BALANCE_PERCENT`] share, rounded up.
///
/// Splits the goal at 100 so that no intermediate product can overflow.
pub fn proposal_threshold(goal: i128) -> i128 {
    let whole = goal / 100 * MIN_PROPOSAL_BALANCE_PERCENT;
    let rest = goal % 100 * MIN_PROPOSAL_BALANCE_PERCENT;
    whole + rest / 100 + i128::from(rest % 100 != 0)
}

#[contract]
pub struct EduFund;

#[contractimpl]
impl EduFund {
    // ─────────────────────────────────────────────────────────
    // Initialisation
    // ─────────────────────────────────────────────────────────

    /// Set the administrator and the token every campaign is funded in.
    ///
    /// Must be called exactly once after deployment.
    pub fn init(env: Env, admin: Address, token: Address) {
        if is_initialized(&env) {
            panic_with_error!(&env, Error::AlreadyInitialized);
        }
        admin.require_auth();
        set_config(&env, &admin, &token);
    }

    pub fn admin(env: Env) -> Address {
        get_admin(&env)
    }

    pub fn token(env: Env) -> Address {
        get_token(&env)
    }

    // ─────────────────────────────────────────────────────────
    // Campaign registry
    // ─────────────────────────────────────────────────────────

    /// Create a campaign and return its ID.
    ///
    /// `title` and `description` must be non-empty, `goal` positive and
    /// `deadline` strictly after the current ledger timestamp.
    pub fn create_campaign(
        env: Env,
        owner: Address,
        title: String,
        description: String,
        goal: i128,
        deadline: u64,
    ) -> u64 {
        owner.require_auth();
        if !is_initialized(&env) {
            panic_with_error!(&env, Error::NotInitialized);
        }

        if title.len() == 0 || description.len() == 0 {
            panic_with_error!(&env, Error::InvalidInput);
        }
        if deadline <= env.ledger().timestamp() {
            panic_with_error!(&env, Error::InvalidDeadline);
        }
        if goal <= 0 {
            panic_with_error!(&env, Error::InvalidGoal);
        }

        let id = get_and_increment_campaign_id(&env);
        let config = CampaignConfig {
            id,
            owner: owner.clone(),
            title: title.clone(),
            description: description.clone(),
            goal,
            deadline,
        };
        let state = CampaignState {
            balance: 0,
            status: CampaignStatus::Open,
        };
        save_campaign(&env, &config, &state);

        events::emit_campaign_created(
            &env,
            CampaignCreated {
                owner,
                campaign_id: id,
                title,
                description,
                goal,
                deadline,
            },
        );
        id
    }

    /// Stop an open campaign from accepting donations.
    ///
    /// `caller` must be the campaign owner or the contract admin.
    pub fn make_campaign_inactive(env: Env, caller: Address, campaign_id: u64) {
        caller.require_auth();
        let config = load_campaign_config(&env, campaign_id);
        if caller != config.owner && caller != get_admin(&env) {
            panic_with_error!(&env, Error::InvalidCampaignOwner);
        }

        let mut state = load_campaign_state(&env, campaign_id);
        if state.status != CampaignStatus::Open {
            panic_with_error!(&env, Error::CampaignNotActive);
        }

        state.status = CampaignStatus::Inactive;
        save_campaign_state(&env, campaign_id, &state);
        events::emit_campaign_made_inactive(&env, campaign_id);
    }

    // ─────────────────────────────────────────────────────────
    // Donation ledger
    // ─────────────────────────────────────────────────────────

    /// Donate `amount` of the contract token to a campaign.
    ///
    /// Each donor may give once per campaign, and a donation that would
    /// push the balance past the goal is refused rather than truncated.
    /// Reaching the goal exactly closes the campaign to further donations.
    pub fn donate(env: Env, campaign_id: u64, donor: Address, amount: i128) {
        donor.require_auth();

        let config = load_campaign_config(&env, campaign_id);
        let mut state = load_campaign_state(&env, campaign_id);

        if state.status != CampaignStatus::Open {
            panic_with_error!(&env, Error::CampaignNotActive);
        }
        if env.ledger().timestamp() >= config.deadline {
            panic_with_error!(&env, Error::CampaignExpired);
        }
        if amount <= 0 {
            panic_with_error!(&env, Error::ContributionMustBeGreaterThanZero);
        }
        if has_donated(&env, campaign_id, &donor) {
            panic_with_error!(&env, Error::DonatorAlreadyDonated);
        }
        let new_balance = match state.balance.checked_add(amount) {
            Some(balance) if balance <= config.goal => balance,
            _ => panic_with_error!(&env, Error::CampaignGoalReached),
        };

        let token_client = token::Client::new(&env, &get_token(&env));
        token_client.transfer(&donor, &env.current_contract_address(), &amount);

        state.balance = new_balance;
        if new_balance == config.goal {
            state.status = CampaignStatus::Funded;
        }
        save_campaign_state(&env, campaign_id, &state);

        let donation = Donation {
            campaign_id,
            donor: donor.clone(),
            amount,
        };
        record_donation(&env, &donation);

        events::emit_donation_received(
            &env,
            DonationReceived {
                donor,
                campaign_id,
                amount,
            },
        );
    }

    // ─────────────────────────────────────────────────────────
    // Proposal
    // ─────────────────────────────────────────────────────────

    /// Propose how the campaign's funds are spent.
    ///
    /// The three lists are parallel: entry `i` pays `amounts[i]` to
    /// `recipients[i]` for `descriptions[i]`. Only the owner may propose,
    /// only once, and only when the balance holds at least
    /// [`MIN_PROPOSAL_BALANCE_PERCENT`] of the goal. Donations stop.
    ///
    /// Checks run in this order: owner, list shape, amounts, an existing
    /// proposal, the balance threshold, the total against the balance, and
    /// recipients that are donors. A campaign that already has a proposal
    /// reports `TransactionAlreadyProposed` even after a refund emptied it.
    pub fn propose_transactions(
        env: Env,
        owner: Address,
        campaign_id: u64,
        recipients: Vec<Address>,
        amounts: Vec<i128>,
        descriptions: Vec<String>,
    ) {
        owner.require_auth();

        let config = load_campaign_config(&env, campaign_id);
        let mut state = load_campaign_state(&env, campaign_id);
        if owner != config.owner {
            panic_with_error!(&env, Error::InvalidCampaignOwner);
        }

        let len = recipients.len();
        if len == 0 || amounts.len() != len || descriptions.len() != len {
            panic_with_error!(&env, Error::InconsistentArrayLength);
        }

        let mut total: i128 = 0;
        for amount in amounts.iter() {
            if amount <= 0 {
                panic_with_error!(&env, Error::InvalidTransactionAmount);
            }
            total = match total.checked_add(amount) {
                Some(total) => total,
                None => panic_with_error!(&env, Error::ProposalExceedsBalance),
            };
        }

        if state.status.is_transaction_proposed() {
            panic_with_error!(&env, Error::TransactionAlreadyProposed);
        }
        if state.balance < proposal_threshold(config.goal) {
            panic_with_error!(&env, Error::InsufficientBalanceForProposingTransaction);
        }
        if total > state.balance {
            panic_with_error!(&env, Error::ProposalExceedsBalance);
        }
        for recipient in recipients.iter() {
            if has_donated(&env, campaign_id, &recipient) {
                panic_with_error!(&env, Error::RecipientCannotBeDonator);
            }
        }

        let mut transactions = Vec::new(&env);
        for i in 0..len {
            transactions.push_back(ProposedTransaction {
                recipient: recipients.get_unchecked(i),
                amount: amounts.get_unchecked(i),
                description: descriptions.get_unchecked(i),
            });
        }
        save_transactions(&env, campaign_id, &transactions);

        state.status = CampaignStatus::Proposed;
        save_campaign_state(&env, campaign_id, &state);

        events::emit_transaction_proposed(
            &env,
            TransactionProposed {
                owner,
                campaign_id,
                recipients,
                amounts,
                descriptions,
            },
        );
    }

    // ─────────────────────────────────────────────────────────
    // Voting
    // ─────────────────────────────────────────────────────────

    /// Cast a donor's vote on the campaign's proposal.
    ///
    /// The vote that completes the donor roll finalizes the campaign in
    /// the same invocation.
    pub fn vote(env: Env, campaign_id: u64, voter: Address, choice: VoteChoice) {
        voter.require_auth();

        let state = load_campaign_state(&env, campaign_id);
        if state.status != CampaignStatus::Proposed {
            panic_with_error!(&env, Error::TransactionIsNotYetProposed);
        }
        if !has_donated(&env, campaign_id, &voter) {
            panic_with_error!(&env, Error::OnlyDonatorsCanVote);
        }
        if has_voted(&env, campaign_id, &voter) {
            panic_with_error!(&env, Error::CampaignAlreadyVoted);
        }

        let vote_index = record_vote(
            &env,
            campaign_id,
            &Vote {
                voter: voter.clone(),
                choice,
            },
        );
        events::emit_campaign_voted(
            &env,
            CampaignVoted {
                voter,
                campaign_id,
                vote_index,
                vote: choice,
            },
        );

        let tally = governance::tally(&env, campaign_id);
        if tally.all_voted() {
            events::emit_finalizing_transaction(&env, campaign_id);
            if let Some(outcome) = tally.decided() {
                governance::execute(&env, campaign_id, outcome);
            }
        }
    }

    // ─────────────────────────────────────────────────────────
    // Finalization
    // ─────────────────────────────────────────────────────────

    /// Owner-initiated finalization.
    ///
    /// Succeeds as soon as the outcome can no longer change; see
    /// [`Tally::decided`].
    pub fn finalize_transaction(env: Env, caller: Address, campaign_id: u64) {
        caller.require_auth();

        let config = load_campaign_config(&env, campaign_id);
        if caller != config.owner {
            panic_with_error!(&env, Error::InvalidCampaignOwner);
        }
        let state = load_campaign_state(&env, campaign_id);
        if state.status != CampaignStatus::Proposed {
            panic_with_error!(&env, Error::TransactionIsNotYetProposed);
        }

        match governance::tally(&env, campaign_id).decided() {
            Some(outcome) => governance::execute(&env, campaign_id, outcome),
            None => panic_with_error!(&env, Error::InsufficientVotes),
        }
    }

    // ─────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────

    pub fn get_campaign(env: Env, campaign_id: u64) -> Campaign {
        load_campaign(&env, campaign_id)
    }

    pub fn get_campaign_count(env: Env) -> u64 {
        campaign_count(&env)
    }

    /// All campaigns in ID order.
    pub fn get_campaigns(env: Env) -> Vec<Campaign> {
        let mut campaigns = Vec::new(&env);
        for id in 0..campaign_count(&env) {
            campaigns.push_back(load_campaign(&env, id));
        }
        campaigns
    }

    /// Donation history of a campaign, in donation order.
    pub fn get_donations(env: Env, campaign_id: u64) -> Vec<Donation> {
        load_campaign_config(&env, campaign_id);
        get_donations(&env, campaign_id)
    }

    /// Amount `donor` gave to the campaign; 0 if they never donated.
    pub fn get_donation(env: Env, campaign_id: u64, donor: Address) -> i128 {
        storage::get_donation(&env, campaign_id, &donor).unwrap_or(0)
    }

    /// Every donation made by `donor`, across campaigns.
    pub fn get_donations_by_donor(env: Env, donor: Address) -> Vec<Donation> {
        let mut donations = Vec::new(&env);
        for campaign_id in storage::get_donor_campaigns(&env, &donor).iter() {
            if let Some(amount) = storage::get_donation(&env, campaign_id, &donor) {
                donations.push_back(Donation {
                    campaign_id,
                    donor: donor.clone(),
                    amount,
                });
            }
        }
        donations
    }

    pub fn get_proposed_transactions(env: Env, campaign_id: u64) -> Vec<ProposedTransaction> {
        load_campaign_config(&env, campaign_id);
        get_transactions(&env, campaign_id)
    }

    /// Votes on a campaign, in casting order.
    pub fn get_votes(env: Env, campaign_id: u64) -> Vec<Vote> {
        load_campaign_config(&env, campaign_id);
        get_votes(&env, campaign_id)
    }

    pub fn get_tally(env: Env, campaign_id: u64) -> (u32, u32, u32) {
        load_campaign_config(&env, campaign_id);
        let tally = governance::tally(&env, campaign_id);
        (tally.yes, tally.no, tally.remaining)
    }

    /// Campaigns whose proposal the owner can finalize right now.
    pub fn get_transaction_ready_campaigns(env: Env) -> Vec<Campaign> {
        let mut ready = Vec::new(&env);
        for id in 0..campaign_count(&env) {
            let campaign = load_campaign(&env, id);
            if campaign.status == CampaignStatus::Proposed
                && governance::tally(&env, id).decided().is_some()
            {
                ready.push_back(campaign);
            }
        }
        ready
    }
}
