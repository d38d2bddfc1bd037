use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};

use crate::{
    error::{AppError, Result},
    models::{
        LedgerPlayerBestResponse, LedgerScoresResponse, LedgerWriteResponse, SubmitScoreRequest,
    },
    services::{intake::validate_submission, ledger::mirror_score},
};

use super::AppState;

/// GET /api/ledger/scores
pub async fn list_ledger_scores(
    State(state): State<AppState>,
) -> Result<Json<LedgerScoresResponse>> {
    let entries = state.ledger.high_scores().await?;
    Ok(Json(LedgerScoresResponse {
        success: true,
        entries,
    }))
}

/// GET /api/ledger/scores/{identity}
pub async fn get_ledger_best(
    State(state): State<AppState>,
    Path(identity): Path<String>,
) -> Result<Json<LedgerPlayerBestResponse>> {
    let identity = identity.trim().to_string();
    let best_score = state.ledger.player_best(&identity).await?;
    Ok(Json(LedgerPlayerBestResponse {
        success: true,
        identity,
        best_score,
    }))
}

/// POST /api/ledger/scores
///
/// Relayer path: writes to the ledger only. The score store is not touched.
pub async fn submit_ledger_score(
    State(state): State<AppState>,
    payload: std::result::Result<Json<SubmitScoreRequest>, JsonRejection>,
) -> Result<Json<LedgerWriteResponse>> {
    let Json(request) = payload
        .map_err(|_| AppError::Validation("Failed to parse request body".to_string()))?;
    let submission = validate_submission(&request)?;

    if !state.ledger.is_writable() {
        return Err(AppError::LedgerWriteFailure(
            "ledger mirror is not configured for writes".to_string(),
        ));
    }

    let ledger = mirror_score(state.ledger.as_ref(), &submission).await;
    Ok(Json(LedgerWriteResponse {
        success: ledger.is_confirmed(),
        ledger,
    }))
}
