use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::{
    config::StoreFailurePolicy,
    constants::LEADERBOARD_DEFAULT_LIMIT,
    error::{AppError, Result},
    models::{
        LeaderboardResponse, LedgerOutcome, PersonalBestResponse, SubmitScoreRequest,
        SubmitScoreResponse,
    },
    services::{intake::validate_submission, ledger::mirror_score, reconciler::fallback_record},
};

use super::AppState;

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    pub limit: Option<i64>,
}

/// Body when the store is down and the boundary propagates the failure.
/// The ledger outcome is still reported: it happened independently.
#[derive(Debug, Serialize)]
struct StoreFailureResponse {
    success: bool,
    error: String,
    code: &'static str,
    ledger: LedgerOutcome,
}

/// POST /api/scores
pub async fn submit_score(
    State(state): State<AppState>,
    payload: std::result::Result<Json<SubmitScoreRequest>, JsonRejection>,
) -> Result<Response> {
    let Json(request) = payload.map_err(|rejection| {
        tracing::warn!("POST /api/scores unreadable body: {}", rejection.body_text());
        AppError::Validation("Failed to parse request body".to_string())
    })?;
    let submission = validate_submission(&request)?;
    let mirror = request
        .mirror_to_ledger
        .unwrap_or(state.config.ledger_mirror_on_submit);

    tracing::debug!(
        "POST /api/scores identity={} score={} mirror={}",
        submission.identity,
        submission.score,
        mirror
    );

    // Two independent channels; joined only to build the response.
    let reconciler = state.reconciler();
    let store_path = reconciler.reconcile(&submission);
    let ledger_path = async {
        if mirror {
            mirror_score(state.ledger.as_ref(), &submission).await
        } else {
            LedgerOutcome::Skipped
        }
    };
    let (stored, ledger) = tokio::join!(store_path, ledger_path);

    match stored {
        Ok(reconciled) => Ok(Json(SubmitScoreResponse {
            success: true,
            record: reconciled.record,
            is_new_high_score: reconciled.is_new_high_score,
            is_fallback: false,
            persisted: true,
            ledger,
        })
        .into_response()),
        Err(err) if err.is_transient() => match state.config.store_failure_policy {
            StoreFailurePolicy::Degrade => {
                tracing::warn!(
                    "Store unavailable for {}; answering with unpersisted fallback: {}",
                    submission.identity,
                    err
                );
                Ok(Json(SubmitScoreResponse {
                    success: true,
                    record: fallback_record(&submission, Utc::now()),
                    is_new_high_score: true,
                    is_fallback: true,
                    persisted: false,
                    ledger,
                })
                .into_response())
            }
            StoreFailurePolicy::Propagate => {
                tracing::error!("Store unavailable for {}: {}", submission.identity, err);
                let body = StoreFailureResponse {
                    success: false,
                    error: err.to_string(),
                    code: "STORE_UNAVAILABLE",
                    ledger,
                };
                Ok((StatusCode::SERVICE_UNAVAILABLE, Json(body)).into_response())
            }
        },
        Err(err) => Err(err),
    }
}

/// GET /api/scores?limit=N
pub async fn list_scores(
    State(state): State<AppState>,
    query: std::result::Result<Query<LeaderboardQuery>, QueryRejection>,
) -> Result<Json<LeaderboardResponse>> {
    let Query(query) = query.map_err(|rejection| {
        tracing::warn!("GET /api/scores bad query: {}", rejection.body_text());
        AppError::Validation("limit must be an integer".to_string())
    })?;
    let limit = query.limit.unwrap_or(LEADERBOARD_DEFAULT_LIMIT);

    match state.leaderboard().top_n(limit).await {
        Ok(top_scores) => Ok(Json(LeaderboardResponse {
            top_scores,
            success: true,
            is_fallback: false,
        })),
        Err(err)
            if err.is_transient()
                && state.config.store_failure_policy == StoreFailurePolicy::Degrade =>
        {
            tracing::warn!("Leaderboard read failed, answering empty fallback: {}", err);
            Ok(Json(LeaderboardResponse {
                top_scores: Vec::new(),
                success: true,
                is_fallback: true,
            }))
        }
        Err(err) => Err(err),
    }
}

/// GET /api/scores/{identity}
pub async fn get_personal_best(
    State(state): State<AppState>,
    Path(identity): Path<String>,
) -> Result<Json<PersonalBestResponse>> {
    let record = state.leaderboard().personal_best(identity.trim()).await?;
    Ok(Json(PersonalBestResponse {
        success: true,
        record,
    }))
}
