// region:    --- Imports
use crate::bidding::validator::BidRejection;
use crate::store::StoreError;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use tracing::error;

// endregion: --- Imports

// region:    --- Auction Error
/// Error kinds surfaced to callers of the marketplace operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Authorization,
    Conflict,
    NotFound,
    Internal,
}

#[derive(Debug, Error)]
pub enum AuctionError {
    #[error("{0}")]
    Validation(String),

    #[error("authentication required")]
    Unauthenticated,

    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    BidRejected(BidRejection),

    #[error("{0} not found")]
    NotFound(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AuctionError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn not_found(resource: &str, id: i64) -> Self {
        Self::NotFound(format!("{} {}", resource, id))
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Unauthenticated | Self::InvalidCredentials | Self::Forbidden(_) => {
                ErrorKind::Authorization
            }
            Self::Conflict(_) | Self::BidRejected(_) => ErrorKind::Conflict,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Machine readable code returned in the response body
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION",
            Self::Unauthenticated => "UNAUTHENTICATED",
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::Conflict(_) => "CONFLICT",
            Self::BidRejected(rejection) => rejection.code(),
            Self::NotFound(_) => "NOT_FOUND",
            Self::Internal(_) => "INTERNAL",
        }
    }

    fn status(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::Authorization if matches!(self, Self::Forbidden(_)) => StatusCode::FORBIDDEN,
            ErrorKind::Authorization => StatusCode::UNAUTHORIZED,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for AuctionError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => Self::NotFound(what),
            StoreError::Conflict(msg) => Self::Conflict(msg),
            StoreError::Invalid(msg) => Self::Validation(msg),
            StoreError::Stale => Self::Conflict("auction changed concurrently".to_string()),
            StoreError::Database(e) => Self::Internal(e.to_string()),
        }
    }
}

// malformed request bodies, paths and query strings
impl From<JsonRejection> for AuctionError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for AuctionError {
    fn from(rejection: PathRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for AuctionError {
    fn from(rejection: QueryRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl IntoResponse for AuctionError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            Self::Internal(msg) => {
                error!("{:<12} --> Internal error: {}", "Error", msg);
                "an internal error occurred".to_string()
            }
            other => other.to_string(),
        };

        let mut body = serde_json::json!({
            "error": message,
            "code": self.code(),
        });
        if let Self::BidRejected(BidRejection::TooLow { minimum }) = &self {
            body["minimum_bid"] = serde_json::json!(minimum);
        }

        (status, Json(body)).into_response()
    }
}
// endregion: --- Auction Error

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bid_rejections_are_conflicts() {
        let err = AuctionError::BidRejected(BidRejection::Closed);
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(err.code(), "ALREADY_ENDED");
        assert_eq!(err.to_string(), "auction closed");
        assert_eq!(err.into_response().status(), StatusCode::CONFLICT);
    }

    #[test]
    fn stale_store_write_maps_to_conflict() {
        let err: AuctionError = StoreError::Stale.into();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[test]
    fn internal_details_are_not_leaked() {
        let response = AuctionError::Internal("password column missing".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn authorization_kinds_share_a_kind() {
        assert_eq!(AuctionError::Unauthenticated.kind(), ErrorKind::Authorization);
        assert_eq!(AuctionError::forbidden("nope").kind(), ErrorKind::Authorization);
        assert_eq!(
            AuctionError::forbidden("nope").into_response().status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AuctionError::InvalidCredentials.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn each_kind_has_one_status() {
        let cases = [
            (AuctionError::validation("bad"), StatusCode::BAD_REQUEST),
            (AuctionError::conflict("taken"), StatusCode::CONFLICT),
            (AuctionError::not_found("auction", 3), StatusCode::NOT_FOUND),
            (
                StoreError::Invalid("value too long".into()).into(),
                StatusCode::BAD_REQUEST,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(err.status(), status, "{}", err);
        }
    }
}
