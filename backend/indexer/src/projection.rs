//! Campaign projection built from the event stream.
//!
//! Writes are commutative: each event kind owns its own columns or rows,
//! so replaying any permutation of the same events converges on the same
//! tables. Amounts are stored as decimal strings and summed in Rust when
//! read, since SQLite integers cannot hold an `i128`.

use serde::Serialize;
use serde_json::Value;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::warn;

use crate::errors::{IndexerError, Result};
use crate::events::{EduFundEvent, EventKind};
use crate::rpc::{extract_field, scalar_string};

// ─────────────────────────────────────────────────────────
// Writes
// ─────────────────────────────────────────────────────────

/// Fold a single, newly stored event into the projection tables.
pub async fn apply(conn: &mut SqliteConnection, ev: &EduFundEvent) -> Result<()> {
    let Some(campaign_id) = ev.campaign_id.as_deref() else {
        if ev.kind != EventKind::Unknown {
            warn!("Event {} ({}) carries no campaign id", ev.event_id, ev.kind.as_str());
        }
        return Ok(());
    };
    let body = &ev.payload;

    match ev.kind {
        EventKind::CampaignCreated => {
            sqlx::query(
                r#"
                INSERT INTO campaigns
                    (campaign_id, owner, title, description, goal, deadline, created_ledger)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                ON CONFLICT (campaign_id) DO UPDATE SET
                    owner          = excluded.owner,
                    title          = excluded.title,
                    description    = excluded.description,
                    goal           = excluded.goal,
                    deadline       = excluded.deadline,
                    created_ledger = excluded.created_ledger
                "#,
            )
            .bind(campaign_id)
            .bind(extract_field(body, &["owner"]))
            .bind(extract_field(body, &["title"]))
            .bind(extract_field(body, &["description"]))
            .bind(extract_field(body, &["goal"]))
            .bind(extract_field(body, &["deadline"]).and_then(|d| d.parse::<i64>().ok()))
            .bind(ev.ledger)
            .execute(&mut *conn)
            .await?;
        }
        EventKind::CampaignMadeInactive => {
            sqlx::query(
                r#"
                INSERT INTO campaigns (campaign_id, inactive) VALUES (?1, 1)
                ON CONFLICT (campaign_id) DO UPDATE SET inactive = 1
                "#,
            )
            .bind(campaign_id)
            .execute(&mut *conn)
            .await?;
        }
        EventKind::DonationReceived => {
            let (Some(donor), Some(amount)) = (ev.actor.as_deref(), ev.amount.as_deref()) else {
                warn!("Donation event {} is missing donor or amount", ev.event_id);
                return Ok(());
            };
            sqlx::query(
                r#"
                INSERT OR IGNORE INTO donations (event_id, campaign_id, donor, amount, ledger)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
            )
            .bind(&ev.event_id)
            .bind(campaign_id)
            .bind(donor)
            .bind(amount)
            .bind(ev.ledger)
            .execute(&mut *conn)
            .await?;
        }
        EventKind::TransactionProposed => {
            let column = |name: &str| -> Vec<String> {
                body.get(name)
                    .and_then(Value::as_array)
                    .map(|items| items.iter().filter_map(scalar_string).collect())
                    .unwrap_or_default()
            };
            let recipients = column("recipients");
            let amounts = column("amounts");
            let descriptions = column("descriptions");
            if recipients.len() != amounts.len() || recipients.len() != descriptions.len() {
                warn!("Proposal event {} has mismatched columns", ev.event_id);
                return Ok(());
            }

            for (position, ((recipient, amount), description)) in recipients
                .iter()
                .zip(&amounts)
                .zip(&descriptions)
                .enumerate()
            {
                sqlx::query(
                    r#"
                    INSERT OR REPLACE INTO proposed_transactions
                        (campaign_id, position, recipient, amount, description)
                    VALUES (?1, ?2, ?3, ?4, ?5)
                    "#,
                )
                .bind(campaign_id)
                .bind(position as i64)
                .bind(recipient)
                .bind(amount)
                .bind(description)
                .execute(&mut *conn)
                .await?;
            }

            sqlx::query(
                r#"
                INSERT INTO campaigns (campaign_id, proposed) VALUES (?1, 1)
                ON CONFLICT (campaign_id) DO UPDATE SET proposed = 1
                "#,
            )
            .bind(campaign_id)
            .execute(&mut *conn)
            .await?;
        }
        EventKind::CampaignVoted => {
            let Some(voter) = ev.actor.as_deref() else {
                warn!("Vote event {} has no voter", ev.event_id);
                return Ok(());
            };
            let Some(choice) = body.get("vote").and_then(vote_choice) else {
                warn!("Vote event {} has an unreadable choice", ev.event_id);
                return Ok(());
            };
            let vote_index =
                extract_field(body, &["vote_index"]).and_then(|i| i.parse::<i64>().ok());
            sqlx::query(
                r#"
                INSERT OR IGNORE INTO votes (event_id, campaign_id, voter, choice, vote_index, ledger)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
            )
            .bind(&ev.event_id)
            .bind(campaign_id)
            .bind(voter)
            .bind(choice)
            .bind(vote_index)
            .bind(ev.ledger)
            .execute(&mut *conn)
            .await?;
        }
        EventKind::TransactionExecuted => {
            let outcome = body.get("outcome").and_then(enum_name).map(|o| o.to_lowercase());
            sqlx::query(
                r#"
                INSERT INTO campaigns (campaign_id, executed, outcome, executed_amount)
                VALUES (?1, 1, ?2, ?3)
                ON CONFLICT (campaign_id) DO UPDATE SET
                    executed        = 1,
                    outcome         = excluded.outcome,
                    executed_amount = excluded.executed_amount
                "#,
            )
            .bind(campaign_id)
            .bind(outcome)
            .bind(ev.amount.as_deref())
            .execute(&mut *conn)
            .await?;
        }
        // Only kept in the raw log.
        EventKind::FinalizingTransaction | EventKind::Unknown => {}
    }

    Ok(())
}

/// Unit enum variants arrive either as a bare name or as a one-element vec.
fn enum_name(value: &Value) -> Option<String> {
    match value {
        Value::Array(items) => items.first().and_then(scalar_string),
        other => scalar_string(other),
    }
}

fn vote_choice(value: &Value) -> Option<&'static str> {
    match value {
        Value::Number(n) => match n.as_u64()? {
            0 => Some("no"),
            1 => Some("yes"),
            _ => None,
        },
        other => match enum_name(other)?.to_lowercase().as_str() {
            "0" | "no" => Some("no"),
            "1" | "yes" => Some("yes"),
            _ => None,
        },
    }
}

// ─────────────────────────────────────────────────────────
// Read models
// ─────────────────────────────────────────────────────────

#[derive(Debug, sqlx::FromRow)]
struct CampaignRow {
    campaign_id: String,
    owner: Option<String>,
    title: Option<String>,
    description: Option<String>,
    goal: Option<String>,
    deadline: Option<i64>,
    inactive: bool,
    proposed: bool,
    executed: bool,
    outcome: Option<String>,
    executed_amount: Option<String>,
}

/// A campaign as the chain would report it, reconstructed from events.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CampaignView {
    pub campaign_id: String,
    pub owner: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub goal: String,
    pub deadline: Option<i64>,
    /// Funds still escrowed for the campaign.
    pub balance: String,
    pub total_donated: String,
    pub donor_count: u32,
    pub status: String,
    pub outcome: Option<String>,
    pub yes_votes: u32,
    pub no_votes: u32,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct DonationView {
    pub event_id: String,
    pub campaign_id: String,
    pub donor: String,
    pub amount: String,
    pub ledger: i64,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct TransactionView {
    pub position: i64,
    pub recipient: String,
    pub amount: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct VoteView {
    pub event_id: String,
    pub voter: String,
    pub choice: String,
    pub vote_index: Option<i64>,
    pub ledger: i64,
}

fn parse_amount(raw: &str) -> i128 {
    raw.parse().unwrap_or_else(|_| {
        warn!("Unparseable amount {raw:?}, counting as 0");
        0
    })
}

fn derive_status(row: &CampaignRow, total_donated: i128, goal: i128, now: i64) -> String {
    if row.executed {
        return match row.outcome.as_deref() {
            Some(outcome) => format!("finalized_{outcome}"),
            None => "finalized".to_string(),
        };
    }
    let status = if row.proposed {
        "proposed"
    } else if row.inactive {
        "inactive"
    } else if goal > 0 && total_donated >= goal {
        "funded"
    } else if row.deadline.is_some_and(|d| d <= now) {
        "expired"
    } else {
        "open"
    };
    status.to_string()
}

async fn build_view(pool: &SqlitePool, row: CampaignRow, now: i64) -> Result<CampaignView> {
    let donations: Vec<(String,)> =
        sqlx::query_as("SELECT amount FROM donations WHERE campaign_id = ?1")
            .bind(&row.campaign_id)
            .fetch_all(pool)
            .await?;
    let total_donated: i128 = donations.iter().map(|(a,)| parse_amount(a)).sum();

    let (yes_votes, no_votes) = vote_counts(pool, &row.campaign_id).await?;

    // A refund pays back the whole balance, a payout leaves the rest escrowed.
    let spent = row.executed_amount.as_deref().map(parse_amount).unwrap_or(0);
    let balance = (total_donated - spent).max(0);

    let goal = row.goal.as_deref().map(parse_amount).unwrap_or(0);
    let status = derive_status(&row, total_donated, goal, now);

    Ok(CampaignView {
        goal: goal.to_string(),
        balance: balance.to_string(),
        total_donated: total_donated.to_string(),
        donor_count: donations.len() as u32,
        status,
        yes_votes,
        no_votes,
        campaign_id: row.campaign_id,
        owner: row.owner,
        title: row.title,
        description: row.description,
        deadline: row.deadline,
        outcome: row.outcome,
    })
}

async fn vote_counts(pool: &SqlitePool, campaign_id: &str) -> Result<(u32, u32)> {
    let (yes, no): (i64, i64) = sqlx::query_as(
        r#"
        SELECT COALESCE(SUM(choice = 'yes'), 0), COALESCE(SUM(choice = 'no'), 0)
        FROM   votes
        WHERE  campaign_id = ?1
        "#,
    )
    .bind(campaign_id)
    .fetch_one(pool)
    .await?;
    Ok((yes as u32, no as u32))
}

const CAMPAIGN_COLUMNS: &str = "campaign_id, owner, title, description, goal, deadline, \
                                inactive, proposed, executed, outcome, executed_amount";

pub async fn get_campaign(pool: &SqlitePool, campaign_id: &str, now: i64) -> Result<CampaignView> {
    let sql = format!("SELECT {CAMPAIGN_COLUMNS} FROM campaigns WHERE campaign_id = ?1");
    let row = sqlx::query_as::<_, CampaignRow>(&sql)
        .bind(campaign_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| IndexerError::CampaignNotFound(campaign_id.to_string()))?;
    build_view(pool, row, now).await
}

/// Every campaign with a `created` event, ordered by numeric id.
pub async fn list_campaigns(pool: &SqlitePool, now: i64) -> Result<Vec<CampaignView>> {
    let sql = format!(
        "SELECT {CAMPAIGN_COLUMNS} FROM campaigns WHERE owner IS NOT NULL \
         ORDER BY CAST(campaign_id AS INTEGER) ASC"
    );
    let rows = sqlx::query_as::<_, CampaignRow>(&sql)
        .fetch_all(pool)
        .await?;

    let mut views = Vec::with_capacity(rows.len());
    for row in rows {
        views.push(build_view(pool, row, now).await?);
    }
    Ok(views)
}

/// Proposed, not yet executed campaigns whose vote can no longer flip.
pub async fn ready_campaigns(pool: &SqlitePool, now: i64) -> Result<Vec<CampaignView>> {
    Ok(list_campaigns(pool, now)
        .await?
        .into_iter()
        .filter(|c| c.status == "proposed" && is_decided(c))
        .collect())
}

pub fn is_decided(campaign: &CampaignView) -> bool {
    let voted = campaign.yes_votes + campaign.no_votes;
    let remaining = campaign.donor_count.saturating_sub(voted);
    campaign.yes_votes > campaign.no_votes + remaining
        || campaign.yes_votes + remaining <= campaign.no_votes
}

pub async fn get_donations(pool: &SqlitePool, campaign_id: &str) -> Result<Vec<DonationView>> {
    let rows = sqlx::query_as::<_, DonationView>(
        r#"
        SELECT event_id, campaign_id, donor, amount, ledger
        FROM   donations
        WHERE  campaign_id = ?1
        ORDER  BY ledger ASC, event_id ASC
        "#,
    )
    .bind(campaign_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn get_donations_by_donor(pool: &SqlitePool, donor: &str) -> Result<Vec<DonationView>> {
    let rows = sqlx::query_as::<_, DonationView>(
        r#"
        SELECT event_id, campaign_id, donor, amount, ledger
        FROM   donations
        WHERE  donor = ?1
        ORDER  BY ledger ASC, event_id ASC
        "#,
    )
    .bind(donor)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn get_transactions(pool: &SqlitePool, campaign_id: &str) -> Result<Vec<TransactionView>> {
    let rows = sqlx::query_as::<_, TransactionView>(
        r#"
        SELECT position, recipient, amount, description
        FROM   proposed_transactions
        WHERE  campaign_id = ?1
        ORDER  BY position ASC
        "#,
    )
    .bind(campaign_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

pub async fn get_votes(pool: &SqlitePool, campaign_id: &str) -> Result<Vec<VoteView>> {
    let rows = sqlx::query_as::<_, VoteView>(
        r#"
        SELECT event_id, voter, choice, vote_index, ledger
        FROM   votes
        WHERE  campaign_id = ?1
        ORDER  BY COALESCE(vote_index, ledger) ASC, event_id ASC
        "#,
    )
    .bind(campaign_id)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
