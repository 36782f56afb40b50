#![allow(dead_code)]

extern crate std;

use soroban_sdk::Vec;

use crate::types::{Campaign, CampaignStatus, Donation, Outcome};

/// INV-1: Campaign balance never exceeds the goal and is never negative.
pub fn assert_balance_within_goal(campaign: &Campaign) {
    assert!(
        campaign.balance >= 0 && campaign.balance <= campaign.goal,
        "INV-1 violated: campaign {} balance {} outside [0, {}]",
        campaign.id,
        campaign.balance,
        campaign.goal
    );
}

/// INV-2: Campaign goal must always be positive.
pub fn assert_goal_positive(campaign: &Campaign) {
    assert!(
        campaign.goal > 0,
        "INV-2 violated: campaign {} has non-positive goal ({})",
        campaign.id,
        campaign.goal
    );
}

/// INV-3: executed implies proposed implies inactive.
pub fn assert_flags_consistent(campaign: &Campaign) {
    let status = &campaign.status;
    if status.is_transaction_executed() {
        assert!(
            status.is_transaction_proposed(),
            "INV-3 violated: campaign {} executed without proposal",
            campaign.id
        );
    }
    if status.is_transaction_proposed() {
        assert!(
            !status.is_active(),
            "INV-3 violated: campaign {} proposed but still active",
            campaign.id
        );
    }
}

/// INV-4: Before finalization the balance equals the donation history sum;
/// a refunded campaign holds nothing.
pub fn assert_balance_matches_donations(campaign: &Campaign, donations: &Vec<Donation>) {
    let total: i128 = donations.iter().map(|d| d.amount).sum();
    match campaign.status {
        CampaignStatus::Finalized(Outcome::Refunded) => assert_eq!(
            campaign.balance, 0,
            "INV-4 violated: refunded campaign {} still holds {}",
            campaign.id, campaign.balance
        ),
        CampaignStatus::Finalized(Outcome::Paid) => assert!(
            campaign.balance <= total,
            "INV-4 violated: paid campaign {} holds more than was donated",
            campaign.id
        ),
        _ => assert_eq!(
            campaign.balance, total,
            "INV-4 violated: campaign {} balance {} != donations {}",
            campaign.id, campaign.balance, total
        ),
    }
}

/// INV-5: Each donor appears at most once in a campaign's history.
pub fn assert_unique_donors(donations: &Vec<Donation>) {
    for i in 0..donations.len() {
        for j in (i + 1)..donations.len() {
            assert_ne!(
                donations.get_unchecked(i).donor,
                donations.get_unchecked(j).donor,
                "INV-5 violated: donor appears twice in donation history"
            );
        }
    }
}

/// INV-6: Campaign IDs are sequential starting from 0.
pub fn assert_sequential_ids(campaigns: &Vec<Campaign>) {
    for (i, campaign) in campaigns.iter().enumerate() {
        assert_eq!(
            campaign.id, i as u64,
            "INV-6 violated: expected id {}, got {}",
            i, campaign.id
        );
    }
}

/// INV-7: Immutable fields never change after creation.
pub fn assert_campaign_immutable_fields(original: &Campaign, current: &Campaign) {
    assert_eq!(original.id, current.id, "INV-7 violated: id changed");
    assert_eq!(original.owner, current.owner, "INV-7 violated: owner changed");
    assert_eq!(original.title, current.title, "INV-7 violated: title changed");
    assert_eq!(
        original.description, current.description,
        "INV-7 violated: description changed"
    );
    assert_eq!(original.goal, current.goal, "INV-7 violated: goal changed");
    assert_eq!(
        original.deadline, current.deadline,
        "INV-7 violated: deadline changed"
    );
}

/// Run all stateless campaign invariants.
pub fn assert_all_campaign_invariants(campaign: &Campaign) {
    assert_balance_within_goal(campaign);
    assert_goal_positive(campaign);
    assert_flags_consistent(campaign);
}
