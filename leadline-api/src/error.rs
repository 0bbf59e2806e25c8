use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use shared_types::ErrorResponse;

pub type Result<T, E = LeadError> = std::result::Result<T, E>;

/// Failure taxonomy of the lead engine.
///
/// `RaceLost`, `InvalidInput` and `StorageUnavailable` are recovered inside the
/// engine; callers only ever see `NotFound` or an infrastructure failure.
#[derive(Debug, thiserror::Error)]
pub enum LeadError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("claim lost to a concurrent dispatcher")]
    RaceLost,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl LeadError {
    pub fn not_found(entity: &'static str, id: i64) -> Self {
        LeadError::NotFound { entity, id }
    }
}

/// Turns `QueryReturnedNoRows` into a `NotFound` for the given entity.
pub(crate) trait OrNotFound<T> {
    fn or_not_found(self, entity: &'static str, id: i64) -> Result<T>;
}

impl<T> OrNotFound<T> for std::result::Result<T, rusqlite::Error> {
    fn or_not_found(self, entity: &'static str, id: i64) -> Result<T> {
        self.map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => LeadError::not_found(entity, id),
            other => LeadError::Database(other),
        })
    }
}

impl ResponseError for LeadError {
    fn status_code(&self) -> StatusCode {
        match self {
            LeadError::NotFound { .. } => StatusCode::NOT_FOUND,
            LeadError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            LeadError::RaceLost => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorResponse {
            error: self.to_string(),
        })
    }
}
