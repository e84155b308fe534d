use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use log::error;
use serde::Serialize;
use thiserror::Error;

/// Failures surfaced by the registry, the observation store and the tracker.
#[derive(Error, Debug)]
pub enum AppError {
    /// Malformed id, date, rate or payload.
    #[error("{0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(String),

    /// A pair with the same `from`/`to` is already registered.
    #[error("{0} already exists")]
    Conflict(String),

    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation(message.into())
    }

    /// Classifies a failed write: unique violations become `Conflict` on `subject`.
    pub fn on_write(err: sqlx::Error, subject: impl Into<String>) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                AppError::Conflict(subject.into())
            }
            _ => AppError::Storage(err),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            AppError::Storage(err) => {
                error!("Storage failure: {}", err);
                "internal storage error".to_string()
            }
            other => other.to_string(),
        };

        HttpResponse::build(self.status_code()).json(ErrorBody { error: &message })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    #[test]
    fn maps_taxonomy_to_status_codes() {
        assert_eq!(
            AppError::validation("bad").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::NotFound("pair 1".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Conflict("pair USD/IDR".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::Storage(sqlx::Error::RowNotFound).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn non_unique_write_failures_stay_storage_errors() {
        let err = AppError::on_write(sqlx::Error::PoolTimedOut, "pair USD/IDR");
        assert!(matches!(err, AppError::Storage(sqlx::Error::PoolTimedOut)));
    }

    #[actix_web::test]
    async fn error_body_carries_message() {
        let response = AppError::NotFound("pair 42".into()).error_response();
        let body = to_bytes(response.into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "pair 42 not found");
    }

    #[actix_web::test]
    async fn storage_details_are_not_leaked() {
        let response = AppError::Storage(sqlx::Error::PoolClosed).error_response();
        let body = to_bytes(response.into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "internal storage error");
    }
}
