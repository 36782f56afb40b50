extern crate std;

use std::vec::Vec as StdVec;

use soroban_sdk::{
    testutils::{Address as _, IssuerFlags, Ledger},
    token, vec, Address, Env, String,
};

use crate::invariants::{assert_all_campaign_invariants, assert_balance_matches_donations};
use crate::{CampaignStatus, EduFund, EduFundClient, Error, Outcome, VoteChoice};

const GOAL: i128 = 20_000_000;
const HOUR: u64 = 3_600;

struct Setup {
    env: Env,
    client: EduFundClient<'static>,
    owner: Address,
    token: token::Client<'static>,
    minter: token::StellarAssetClient<'static>,
}

fn setup() -> Setup {
    let env = Env::default();
    env.mock_all_auths();
    env.ledger().set_timestamp(1_700_000_000);

    let client = EduFundClient::new(&env, &env.register(EduFund, ()));
    let admin = Address::generate(&env);
    let sac = env.register_stellar_asset_contract_v2(admin.clone());
    // Lets tests deauthorize a holder so a disbursement fails.
    sac.issuer().set_flag(IssuerFlags::RevocableFlag);
    client.init(&admin, &sac.address());

    Setup {
        owner: Address::generate(&env),
        token: token::Client::new(&env, &sac.address()),
        minter: token::StellarAssetClient::new(&env, &sac.address()),
        client,
        env,
    }
}

fn create_campaign(s: &Setup) -> u64 {
    s.client.create_campaign(
        &s.owner,
        &String::from_str(&s.env, "Test Campaign"),
        &String::from_str(&s.env, "Test Description"),
        &GOAL,
        &(s.env.ledger().timestamp() + HOUR),
    )
}

/// `n` donors giving `amount` each.
fn donate_many(s: &Setup, campaign_id: u64, n: usize, amount: i128) -> StdVec<Address> {
    (0..n)
        .map(|_| {
            let donor = Address::generate(&s.env);
            s.minter.mint(&donor, &amount);
            s.client.donate(&campaign_id, &donor, &amount);
            donor
        })
        .collect()
}

/// Proposes two payouts and returns the recipients.
fn propose(s: &Setup, campaign_id: u64, amounts: [i128; 2]) -> [Address; 2] {
    let r1 = Address::generate(&s.env);
    let r2 = Address::generate(&s.env);
    s.client.propose_transactions(
        &s.owner,
        &campaign_id,
        &vec![&s.env, r1.clone(), r2.clone()],
        &vec![&s.env, amounts[0], amounts[1]],
        &vec![
            &s.env,
            String::from_str(&s.env, "Books"),
            String::from_str(&s.env, "Laptop"),
        ],
    );
    [r1, r2]
}

fn cast(s: &Setup, campaign_id: u64, voters: &[Address], choice: VoteChoice) {
    for voter in voters {
        s.client.vote(&campaign_id, voter, &choice);
    }
}

// ── Voting guards ────────────────────────────────────────────

#[test]
fn test_vote_is_recorded_in_order() {
    let s = setup();
    let id = create_campaign(&s);
    let donors = donate_many(&s, id, 3, 2_000_000);
    propose(&s, id, [1_000_000, 1_000_000]);

    s.client.vote(&id, &donors[1], &VoteChoice::Yes);
    s.client.vote(&id, &donors[0], &VoteChoice::No);

    let votes = s.client.get_votes(&id);
    assert_eq!(votes.len(), 2);
    assert_eq!(votes.get(0).unwrap().voter, donors[1]);
    assert_eq!(votes.get(0).unwrap().choice, VoteChoice::Yes);
    assert_eq!(votes.get(1).unwrap().voter, donors[0]);
    assert_eq!(votes.get(1).unwrap().choice, VoteChoice::No);
    assert_eq!(s.client.get_tally(&id), (1, 1, 1));
    assert_eq!(s.client.get_campaign(&id).status, CampaignStatus::Proposed);
}

#[test]
#[should_panic(expected = "Error(Contract, #10)")]
fn test_vote_before_proposal() {
    let s = setup();
    let id = create_campaign(&s);
    let donors = donate_many(&s, id, 1, 5_000_000);
    s.client.vote(&id, &donors[0], &VoteChoice::Yes);
}

#[test]
#[should_panic(expected = "Error(Contract, #14)")]
fn test_only_donors_can_vote() {
    let s = setup();
    let id = create_campaign(&s);
    donate_many(&s, id, 2, 5_000_000);
    propose(&s, id, [1, 1]);
    s.client.vote(&id, &Address::generate(&s.env), &VoteChoice::Yes);
}

#[test]
#[should_panic(expected = "Error(Contract, #17)")]
fn test_vote_twice() {
    let s = setup();
    let id = create_campaign(&s);
    let donors = donate_many(&s, id, 2, 5_000_000);
    propose(&s, id, [1, 1]);
    s.client.vote(&id, &donors[0], &VoteChoice::Yes);
    s.client.vote(&id, &donors[0], &VoteChoice::Yes);
}

#[test]
fn test_revote_fails_regardless_of_order() {
    let s = setup();
    let id = create_campaign(&s);
    let donors = donate_many(&s, id, 4, 2_000_000);
    propose(&s, id, [1, 1]);

    s.client.vote(&id, &donors[2], &VoteChoice::No);
    s.client.vote(&id, &donors[0], &VoteChoice::Yes);
    assert!(s.client.try_vote(&id, &donors[2], &VoteChoice::Yes).is_err());
    s.client.vote(&id, &donors[1], &VoteChoice::Yes);
    assert!(s.client.try_vote(&id, &donors[0], &VoteChoice::No).is_err());
    assert_eq!(s.client.get_votes(&id).len(), 3);
}

// ── Finalization ─────────────────────────────────────────────

#[test]
fn test_three_yes_two_no_pays_recipients() {
    let s = setup();
    let id = create_campaign(&s);
    let donors = donate_many(&s, id, 5, 2_000_000);
    let [r1, r2] = propose(&s, id, [3_000_000, 4_000_000]);

    cast(&s, id, &donors[..3], VoteChoice::Yes);
    cast(&s, id, &donors[3..], VoteChoice::No);

    assert_eq!(s.token.balance(&r1), 3_000_000);
    assert_eq!(s.token.balance(&r2), 4_000_000);
    for donor in &donors {
        assert_eq!(s.token.balance(donor), 0);
    }
    assert_eq!(s.token.balance(&s.client.address), 3_000_000);

    let campaign = s.client.get_campaign(&id);
    assert_eq!(campaign.status, CampaignStatus::Finalized(Outcome::Paid));
    assert_eq!(campaign.balance, 3_000_000);
    assert!(campaign.status.is_transaction_executed());
    assert_all_campaign_invariants(&campaign);
    assert_balance_matches_donations(&campaign, &s.client.get_donations(&id));
}

#[test]
fn test_two_yes_three_no_refunds_donors() {
    let s = setup();
    let id = create_campaign(&s);
    let donors = donate_many(&s, id, 5, 2_000_000);
    let [r1, r2] = propose(&s, id, [3_000_000, 4_000_000]);

    cast(&s, id, &donors[..2], VoteChoice::Yes);
    cast(&s, id, &donors[2..], VoteChoice::No);

    for donor in &donors {
        assert_eq!(s.token.balance(donor), 2_000_000);
    }
    assert_eq!(s.token.balance(&r1), 0);
    assert_eq!(s.token.balance(&r2), 0);
    assert_eq!(s.token.balance(&s.client.address), 0);

    let campaign = s.client.get_campaign(&id);
    assert_eq!(campaign.status, CampaignStatus::Finalized(Outcome::Refunded));
    assert_eq!(campaign.balance, 0);
    assert_balance_matches_donations(&campaign, &s.client.get_donations(&id));
}

#[test]
fn test_tie_refunds() {
    let s = setup();
    let id = create_campaign(&s);
    let donors = donate_many(&s, id, 2, 3_000_000);
    propose(&s, id, [1, 1]);
    s.client.vote(&id, &donors[0], &VoteChoice::Yes);
    s.client.vote(&id, &donors[1], &VoteChoice::No);
    assert_eq!(
        s.client.get_campaign(&id).status,
        CampaignStatus::Finalized(Outcome::Refunded)
    );
}

#[test]
fn test_owner_finalizes_decided_majority_early() {
    let s = setup();
    let id = create_campaign(&s);
    let donors = donate_many(&s, id, 5, 2_000_000);
    let [r1, _] = propose(&s, id, [1_000_000, 1_000_000]);

    cast(&s, id, &donors[..3], VoteChoice::Yes);
    assert_eq!(s.client.get_transaction_ready_campaigns().len(), 1);

    s.client.finalize_transaction(&s.owner, &id);
    assert_eq!(s.token.balance(&r1), 1_000_000);
    assert_eq!(
        s.client.get_campaign(&id).status,
        CampaignStatus::Finalized(Outcome::Paid)
    );
    assert_eq!(s.client.get_transaction_ready_campaigns().len(), 0);
}

#[test]
#[should_panic(expected = "Error(Contract, #12)")]
fn test_owner_cannot_finalize_undecided() {
    let s = setup();
    let id = create_campaign(&s);
    let donors = donate_many(&s, id, 5, 2_000_000);
    propose(&s, id, [1, 1]);
    cast(&s, id, &donors[..2], VoteChoice::Yes);
    s.client.finalize_transaction(&s.owner, &id);
}

#[test]
#[should_panic(expected = "Error(Contract, #13)")]
fn test_only_owner_can_finalize() {
    let s = setup();
    let id = create_campaign(&s);
    let donors = donate_many(&s, id, 3, 2_000_000);
    propose(&s, id, [1, 1]);
    cast(&s, id, &donors[..2], VoteChoice::Yes);
    s.client.finalize_transaction(&donors[2], &id);
}

#[test]
#[should_panic(expected = "Error(Contract, #10)")]
fn test_finalize_without_proposal() {
    let s = setup();
    let id = create_campaign(&s);
    donate_many(&s, id, 1, 5_000_000);
    s.client.finalize_transaction(&s.owner, &id);
}

#[test]
fn test_failed_payout_reverts_whole_finalization() {
    let s = setup();
    let id = create_campaign(&s);
    let donors = donate_many(&s, id, 3, 5_000_000);
    let [r1, r2] = propose(&s, id, [1_000_000, 2_000_000]);
    s.minter.set_authorized(&r2, &false);

    cast(&s, id, &donors[..2], VoteChoice::Yes);
    let result = s.client.try_vote(&id, &donors[2], &VoteChoice::Yes);
    assert_eq!(result, Err(Ok(Error::FundTransferFailed.into())));

    let campaign = s.client.get_campaign(&id);
    assert_eq!(campaign.status, CampaignStatus::Proposed);
    assert_eq!(campaign.balance, 15_000_000);
    assert_eq!(s.token.balance(&r1), 0);
    assert_eq!(s.token.balance(&r2), 0);
    assert_eq!(s.token.balance(&s.client.address), 15_000_000);
    assert_eq!(s.client.get_votes(&id).len(), 2);
}

#[test]
fn test_refunded_campaign_cannot_be_proposed_again() {
    let s = setup();
    let id = create_campaign(&s);
    let donors = donate_many(&s, id, 2, 5_000_000);
    propose(&s, id, [1, 1]);
    cast(&s, id, &donors, VoteChoice::No);
    assert_eq!(s.client.get_campaign(&id).balance, 0);

    let result = s.client.try_propose_transactions(
        &s.owner,
        &id,
        &vec![&s.env, Address::generate(&s.env)],
        &vec![&s.env, 1i128],
        &vec![&s.env, String::from_str(&s.env, "again")],
    );
    assert_eq!(result, Err(Ok(Error::TransactionAlreadyProposed.into())));
}

#[test]
fn test_finalized_campaign_rejects_everything() {
    let s = setup();
    let id = create_campaign(&s);
    let donors = donate_many(&s, id, 2, 5_000_000);
    propose(&s, id, [1, 1]);
    cast(&s, id, &donors, VoteChoice::Yes);
    let campaign = s.client.get_campaign(&id);
    assert!(campaign.status.is_transaction_executed());

    let newcomer = Address::generate(&s.env);
    s.minter.mint(&newcomer, &1);
    assert!(s.client.try_donate(&id, &newcomer, &1).is_err());
    assert!(s
        .client
        .try_propose_transactions(
            &s.owner,
            &id,
            &vec![&s.env, Address::generate(&s.env)],
            &vec![&s.env, 1i128],
            &vec![&s.env, String::from_str(&s.env, "again")],
        )
        .is_err());
    assert!(s.client.try_vote(&id, &donors[0], &VoteChoice::No).is_err());
    assert!(s.client.try_finalize_transaction(&s.owner, &id).is_err());

    assert_eq!(s.client.get_campaign(&id), campaign);
}

#[test]
fn test_ready_campaigns_lists_only_decided_proposals() {
    let s = setup();
    let open = create_campaign(&s);
    donate_many(&s, open, 1, 5_000_000);

    let undecided = create_campaign(&s);
    let undecided_donors = donate_many(&s, undecided, 3, 2_000_000);
    propose(&s, undecided, [1, 1]);
    s.client.vote(&undecided, &undecided_donors[0], &VoteChoice::Yes);

    let decided = create_campaign(&s);
    let decided_donors = donate_many(&s, decided, 3, 2_000_000);
    propose(&s, decided, [1, 1]);
    cast(&s, decided, &decided_donors[..2], VoteChoice::No);

    let ready = s.client.get_transaction_ready_campaigns();
    assert_eq!(ready.len(), 1);
    assert_eq!(ready.get(0).unwrap().id, decided);
}

// ── End to end ───────────────────────────────────────────────

#[test]
fn test_full_lifecycle_seventeen_donors() {
    let s = setup();
    let id = create_campaign(&s);

    let share = GOAL / 17;
    let mut donors = donate_many(&s, id, 16, share);
    donors.extend(donate_many(&s, id, 1, GOAL - 16 * share));

    let campaign = s.client.get_campaign(&id);
    assert_eq!(campaign.balance, GOAL);
    assert_eq!(campaign.status, CampaignStatus::Funded);
    assert!(!campaign.status.is_active());

    let [r1, r2] = propose(&s, id, [5_000_000, 7_000_000]);
    assert!(s.client.get_campaign(&id).status.is_transaction_proposed());

    cast(&s, id, &donors[..9], VoteChoice::Yes);
    cast(&s, id, &donors[9..16], VoteChoice::No);
    assert_eq!(s.client.get_campaign(&id).status, CampaignStatus::Proposed);

    s.client.vote(&id, &donors[16], &VoteChoice::No);

    let campaign = s.client.get_campaign(&id);
    assert!(campaign.status.is_transaction_executed());
    assert_eq!(campaign.status, CampaignStatus::Finalized(Outcome::Paid));
    assert_eq!(s.token.balance(&r1), 5_000_000);
    assert_eq!(s.token.balance(&r2), 7_000_000);
    assert_eq!(campaign.balance, GOAL - 12_000_000);
    assert_all_campaign_invariants(&campaign);
}
