use thiserror::Error;

/// The error taxonomy from spec §7. Every adapter (storage, db, queue, CDN)
/// normalizes its native error into one of these before the pipeline or a
/// controller sees it, so retry/terminal classification (§4.5) is decided
/// in one place instead of re-derived per adapter.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("transient: {0}")]
    Transient(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("validation: {0}")]
    Validation(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("fatal: {0}")]
    Fatal(String),

    #[error("unsupported: {0}")]
    Unsupported(String),
}

impl CoreError {
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, CoreError::Transient(_))
    }

    /// Sanitized, human-readable message safe to store in
    /// `photos.error_message` — no stack traces, no secrets (spec §7).
    #[must_use]
    pub fn sanitized_message(&self) -> String {
        match self {
            CoreError::Transient(_) => "temporary failure, will retry".to_string(),
            CoreError::NotFound(m) | CoreError::Validation(m) | CoreError::Conflict(m) => {
                m.clone()
            }
            CoreError::Forbidden(_) | CoreError::Unauthorized(_) => "access denied".to_string(),
            CoreError::Fatal(_) => "internal configuration error".to_string(),
            CoreError::Unsupported(m) => m.clone(),
        }
    }
}

impl From<sea_orm::DbErr> for CoreError {
    fn from(err: sea_orm::DbErr) -> Self {
        match &err {
            sea_orm::DbErr::RecordNotFound(msg) => CoreError::NotFound(msg.clone()),
            sea_orm::DbErr::Conn(_) | sea_orm::DbErr::ConnectionAcquire(_) => {
                CoreError::Transient(err.to_string())
            }
            _ => CoreError::Transient(err.to_string()),
        }
    }
}

impl From<reqwest::Error> for CoreError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() {
            CoreError::Transient(err.to_string())
        } else if let Some(status) = err.status() {
            if status.is_server_error() {
                CoreError::Transient(err.to_string())
            } else {
                CoreError::Validation(err.to_string())
            }
        } else {
            CoreError::Transient(err.to_string())
        }
    }
}

impl From<CoreError> for loco_rs::Error {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NotFound(_) => loco_rs::Error::NotFound,
            CoreError::Validation(m) | CoreError::Conflict(m) => loco_rs::Error::BadRequest(m),
            CoreError::Forbidden(_) => loco_rs::Error::Forbidden,
            CoreError::Unauthorized(m) => loco_rs::Error::Unauthorized(m),
            other => loco_rs::Error::Message(other.sanitized_message()),
        }
    }
}
