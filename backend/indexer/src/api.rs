//! Axum REST API handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::error;

use crate::db;
use crate::errors::IndexerError;
use crate::events::EventRecord;
use crate::projection::{self, CampaignView, DonationView, TransactionView, VoteView};

#[derive(Clone)]
pub struct ApiState {
    pub pool: SqlitePool,
}

pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/events", get(get_all_events))
        .route("/campaigns", get(list_campaigns))
        .route("/campaigns/ready", get(ready_campaigns))
        .route("/campaigns/:id", get(get_campaign))
        .route("/campaigns/:id/events", get(get_campaign_events))
        .route("/campaigns/:id/donations", get(get_campaign_donations))
        .route("/campaigns/:id/transactions", get(get_campaign_transactions))
        .route("/campaigns/:id/votes", get(get_campaign_votes))
        .route("/donors/:address/donations", get(get_donor_donations))
        .with_state(state)
}

// ─────────────────────────────────────────────────────────
// Response shapes
// ─────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct EventsResponse {
    pub campaign_id: String,
    pub count: usize,
    pub events: Vec<EventRecord>,
}

#[derive(Serialize)]
pub struct AllEventsResponse {
    pub count: usize,
    pub events: Vec<EventRecord>,
}

#[derive(Serialize)]
pub struct CampaignsResponse {
    pub count: usize,
    pub campaigns: Vec<CampaignView>,
}

#[derive(Serialize)]
pub struct DonationsResponse {
    pub count: usize,
    pub donations: Vec<DonationView>,
}

#[derive(Serialize)]
pub struct TransactionsResponse {
    pub campaign_id: String,
    pub count: usize,
    pub transactions: Vec<TransactionView>,
}

#[derive(Serialize)]
pub struct VotesResponse {
    pub campaign_id: String,
    pub count: usize,
    pub votes: Vec<VoteView>,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Handler error: unknown campaigns map to 404, everything else to 500.
pub struct ApiError(IndexerError);

impl From<IndexerError> for ApiError {
    fn from(err: IndexerError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            IndexerError::CampaignNotFound(_) => StatusCode::NOT_FOUND,
            other => {
                error!("API request failed: {other}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (
            status,
            Json(ErrorResponse {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

// ─────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────

/// `GET /health`
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// `GET /events`
///
/// Returns all indexed events across all campaigns.
pub async fn get_all_events(State(state): State<Arc<ApiState>>) -> ApiResult<AllEventsResponse> {
    let events = db::get_all_events(&state.pool).await?;
    Ok(Json(AllEventsResponse {
        count: events.len(),
        events,
    }))
}

/// `GET /campaigns`
pub async fn list_campaigns(State(state): State<Arc<ApiState>>) -> ApiResult<CampaignsResponse> {
    let campaigns = projection::list_campaigns(&state.pool, now()).await?;
    Ok(Json(CampaignsResponse {
        count: campaigns.len(),
        campaigns,
    }))
}

/// `GET /campaigns/ready`
///
/// Proposed campaigns whose vote outcome is already locked in.
pub async fn ready_campaigns(State(state): State<Arc<ApiState>>) -> ApiResult<CampaignsResponse> {
    let campaigns = projection::ready_campaigns(&state.pool, now()).await?;
    Ok(Json(CampaignsResponse {
        count: campaigns.len(),
        campaigns,
    }))
}

/// `GET /campaigns/:id`
pub async fn get_campaign(
    State(state): State<Arc<ApiState>>,
    Path(campaign_id): Path<String>,
) -> ApiResult<CampaignView> {
    Ok(Json(
        projection::get_campaign(&state.pool, &campaign_id, now()).await?,
    ))
}

/// `GET /campaigns/:id/events`
pub async fn get_campaign_events(
    State(state): State<Arc<ApiState>>,
    Path(campaign_id): Path<String>,
) -> ApiResult<EventsResponse> {
    let events = db::get_events_for_campaign(&state.pool, &campaign_id).await?;
    Ok(Json(EventsResponse {
        campaign_id,
        count: events.len(),
        events,
    }))
}

/// `GET /campaigns/:id/donations`
pub async fn get_campaign_donations(
    State(state): State<Arc<ApiState>>,
    Path(campaign_id): Path<String>,
) -> ApiResult<DonationsResponse> {
    let donations = projection::get_donations(&state.pool, &campaign_id).await?;
    Ok(Json(DonationsResponse {
        count: donations.len(),
        donations,
    }))
}

/// `GET /campaigns/:id/transactions`
pub async fn get_campaign_transactions(
    State(state): State<Arc<ApiState>>,
    Path(campaign_id): Path<String>,
) -> ApiResult<TransactionsResponse> {
    let transactions = projection::get_transactions(&state.pool, &campaign_id).await?;
    Ok(Json(TransactionsResponse {
        campaign_id,
        count: transactions.len(),
        transactions,
    }))
}

/// `GET /campaigns/:id/votes`
pub async fn get_campaign_votes(
    State(state): State<Arc<ApiState>>,
    Path(campaign_id): Path<String>,
) -> ApiResult<VotesResponse> {
    let votes = projection::get_votes(&state.pool, &campaign_id).await?;
    Ok(Json(VotesResponse {
        campaign_id,
        count: votes.len(),
        votes,
    }))
}

/// `GET /donors/:address/donations`
pub async fn get_donor_donations(
    State(state): State<Arc<ApiState>>,
    Path(address): Path<String>,
) -> ApiResult<DonationsResponse> {
    let donations = projection::get_donations_by_donor(&state.pool, &address).await?;
    Ok(Json(DonationsResponse {
        count: donations.len(),
        donations,
    }))
}
