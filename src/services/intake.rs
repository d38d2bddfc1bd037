use serde_json::Value;

use crate::{
    constants::MAX_SCORE,
    error::{AppError, Result},
    models::{ScoreSubmission, SubmitScoreRequest},
};

/// Validates a raw submission. Pure: no store or ledger access.
pub fn validate_submission(request: &SubmitScoreRequest) -> Result<ScoreSubmission> {
    let identity = validate_identity(request.identity.as_deref())?;
    let score = validate_score(request.score.as_ref())?;
    Ok(ScoreSubmission { identity, score })
}

pub fn validate_identity(identity: Option<&str>) -> Result<String> {
    let identity = identity.map(str::trim).unwrap_or_default();
    if identity.is_empty() {
        return Err(AppError::Validation("identity is required".to_string()));
    }
    Ok(identity.to_string())
}

fn validate_score(score: Option<&Value>) -> Result<i64> {
    let Some(value) = score else {
        return Err(AppError::Validation("score is required".to_string()));
    };
    let Value::Number(number) = value else {
        return Err(AppError::Validation(format!(
            "score must be a number, got {}",
            json_type_name(value)
        )));
    };

    if let Some(n) = number.as_u64() {
        return bounded(n);
    }
    if number.as_i64().is_some() {
        // as_u64 failed, so this is negative
        return Err(AppError::Validation("score must be non-negative".to_string()));
    }

    match number.as_f64() {
        Some(f) if !f.is_finite() => Err(AppError::Validation("score must be finite".to_string())),
        Some(f) if f < 0.0 => Err(AppError::Validation("score must be non-negative".to_string())),
        Some(f) if f.fract() != 0.0 => {
            Err(AppError::Validation("score must be an integer".to_string()))
        }
        Some(f) if f > MAX_SCORE as f64 => bounded(u64::MAX),
        Some(f) => bounded(f as u64),
        None => Err(AppError::Validation("score must be a number".to_string())),
    }
}

fn bounded(score: u64) -> Result<i64> {
    if score > MAX_SCORE {
        return Err(AppError::Validation(format!(
            "score must not exceed {}",
            MAX_SCORE
        )));
    }
    Ok(score as i64)
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(identity: Option<&str>, score: Option<Value>) -> SubmitScoreRequest {
        SubmitScoreRequest {
            identity: identity.map(str::to_string),
            score,
            mirror_to_ledger: None,
        }
    }

    #[test]
    fn accepts_identity_and_integer_score() {
        let submission = validate_submission(&request(Some("0xAA"), Some(json!(50)))).unwrap();
        assert_eq!(
            submission,
            ScoreSubmission {
                identity: "0xAA".to_string(),
                score: 50,
            }
        );
    }

    #[test]
    fn trims_identity() {
        let submission = validate_submission(&request(Some("  0xAA \n"), Some(json!(0)))).unwrap();
        assert_eq!(submission.identity, "0xAA");
        assert_eq!(submission.score, 0);
    }

    #[test]
    fn rejects_missing_or_blank_identity() {
        for identity in [None, Some(""), Some("   ")] {
            let err = validate_submission(&request(identity, Some(json!(1)))).unwrap_err();
            assert!(matches!(err, AppError::Validation(_)));
        }
    }

    #[test]
    fn rejects_missing_score() {
        let err = validate_submission(&request(Some("0xAA"), None)).unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg.contains("required")));
    }

    #[test]
    fn rejects_non_numeric_score() {
        for value in [json!("50"), json!(null), json!(true), json!([50])] {
            let err = validate_submission(&request(Some("0xAA"), Some(value))).unwrap_err();
            assert!(matches!(err, AppError::Validation(msg) if msg.contains("must be a number")));
        }
    }

    #[test]
    fn rejects_negative_and_fractional_scores() {
        let negative = validate_submission(&request(Some("0xAA"), Some(json!(-1)))).unwrap_err();
        assert!(matches!(negative, AppError::Validation(msg) if msg.contains("non-negative")));

        let fractional =
            validate_submission(&request(Some("0xAA"), Some(json!(12.5)))).unwrap_err();
        assert!(matches!(fractional, AppError::Validation(msg) if msg.contains("integer")));
    }

    #[test]
    fn accepts_integral_float() {
        let submission = validate_submission(&request(Some("0xAA"), Some(json!(42.0)))).unwrap();
        assert_eq!(submission.score, 42);
    }

    #[test]
    fn rejects_scores_beyond_storage_range() {
        let err =
            validate_submission(&request(Some("0xAA"), Some(json!(u64::MAX)))).unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg.contains("exceed")));
    }
}
