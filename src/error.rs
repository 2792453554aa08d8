use thiserror::Error;

use crate::api::ApiError;
use crate::config::LoadError;
use crate::domain::posts::DraftError;
use crate::infra::error::InfraError;

/// Top-level error for the binary.
///
/// Configuration and draft validation problems are usage errors and exit
/// with status 2; everything else exits with status 1.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(#[from] LoadError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("invalid draft: {0}")]
    Draft(#[from] DraftError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

impl AppError {
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::Config(_) | AppError::Draft(_) => 2,
            AppError::Infra(_)
            | AppError::Api(_)
            | AppError::Io(_)
            | AppError::Json(_) => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_errors_exit_with_two() {
        let error = AppError::from(DraftError::EmptyTitle);
        assert_eq!(error.exit_code(), 2);
    }

    #[test]
    fn runtime_errors_exit_with_one() {
        let error = AppError::from(std::io::Error::other("pipe closed"));
        assert_eq!(error.exit_code(), 1);
    }
}
