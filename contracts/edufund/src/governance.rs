//! # Governance
//!
//! Vote tallying and the finalization engine.
//!
//! A proposal's outcome is *decided* once the donors who have not voted yet
//! can no longer change it:
//!
//! - payout is locked when `yes > no + remaining`,
//! - refund is locked when `yes + remaining <= no`.
//!
//! Ties refund. When every donor has voted `remaining == 0` and one of the
//! two always holds.

use soroban_sdk::{log, panic_with_error, token, Address, Env, Vec};

use crate::events::{self, TransactionExecuted};
use crate::storage::{
    get_donations, get_token, get_transactions, get_votes, load_campaign_state,
    save_campaign_state,
};
use crate::types::{CampaignStatus, Donation, Outcome, ProposedTransaction, Vote, VoteChoice};
use crate::Error;

/// Vote counts for one campaign.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Tally {
    pub yes: u32,
    pub no: u32,
    /// Donors that have not voted yet.
    pub remaining: u32,
}

impl Tally {
    pub fn count(votes: &Vec<Vote>, donors: u32) -> Self {
        let mut yes = 0u32;
        let mut no = 0u32;
        for vote in votes.iter() {
            match vote.choice {
                VoteChoice::Yes => yes += 1,
                VoteChoice::No => no += 1,
            }
        }
        Tally {
            yes,
            no,
            remaining: donors.saturating_sub(yes + no),
        }
    }

    /// The outcome if it can no longer change, `None` otherwise.
    pub fn decided(&self) -> Option<Outcome> {
        if self.yes > self.no + self.remaining {
            Some(Outcome::Paid)
        } else if self.yes + self.remaining <= self.no {
            Some(Outcome::Refunded)
        } else {
            None
        }
    }

    pub fn all_voted(&self) -> bool {
        self.remaining == 0
    }
}

/// Tally the current votes of a campaign.
pub fn tally(env: &Env, campaign_id: u64) -> Tally {
    let donors = get_donations(env, campaign_id).len();
    Tally::count(&get_votes(env, campaign_id), donors)
}

/// Run the decided outcome of a `Proposed` campaign.
///
/// The terminal status is written before any token moves. Every transfer
/// is checked; one failure panics with `FundTransferFailed`, which reverts
/// the status write and all earlier transfers of the invocation.
pub fn execute(env: &Env, campaign_id: u64, outcome: Outcome) {
    let mut state = load_campaign_state(env, campaign_id);
    if state.status != CampaignStatus::Proposed {
        panic_with_error!(env, Error::TransactionIsNotYetProposed);
    }

    let token = token::Client::new(env, &get_token(env));
    let contract = env.current_contract_address();

    let (disbursements, amount) = match outcome {
        Outcome::Paid => {
            let transactions = get_transactions(env, campaign_id);
            let total = sum_transactions(&transactions);
            state.balance -= total;
            state.status = CampaignStatus::Finalized(Outcome::Paid);
            save_campaign_state(env, campaign_id, &state);

            for tx in transactions.iter() {
                transfer(env, &token, &contract, &tx.recipient, tx.amount);
            }
            (transactions.len(), total)
        }
        Outcome::Refunded => {
            let donations = get_donations(env, campaign_id);
            let total = sum_donations(&donations);
            state.balance = 0;
            state.status = CampaignStatus::Finalized(Outcome::Refunded);
            save_campaign_state(env, campaign_id, &state);

            for donation in donations.iter() {
                transfer(env, &token, &contract, &donation.donor, donation.amount);
            }
            (donations.len(), total)
        }
    };

    log!(
        env,
        "campaign {} finalized: {} transfers, {} total",
        campaign_id,
        disbursements,
        amount
    );

    events::emit_transaction_executed(
        env,
        TransactionExecuted {
            campaign_id,
            disbursements,
            outcome,
            amount,
        },
    );
}

fn transfer(env: &Env, token: &token::Client, from: &Address, to: &Address, amount: i128) {
    match token.try_transfer(from, to, &amount) {
        Ok(Ok(())) => {}
        _ => panic_with_error!(env, Error::FundTransferFailed),
    }
}

pub fn sum_transactions(transactions: &Vec<ProposedTransaction>) -> i128 {
    transactions.iter().map(|tx| tx.amount).sum()
}

fn sum_donations(donations: &Vec<Donation>) -> i128 {
    donations.iter().map(|d| d.amount).sum()
}
