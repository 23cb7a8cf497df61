use thiserror::Error;

/// Errors surfaced by the store, repository and service layers.
///
/// Cloneable so a single failure can be fanned out to every coordinator subscriber.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RecipeError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("recipe not found: {0}")]
    NotFound(String),

    #[error("storage error: {0}")]
    Storage(String),
}

impl From<anyhow::Error> for RecipeError {
    fn from(err: anyhow::Error) -> Self {
        Self::Storage(format!("{err:#}"))
    }
}

impl From<tokio::task::JoinError> for RecipeError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Storage(format!("storage task failed: {err}"))
    }
}

pub type Result<T, E = RecipeError> = std::result::Result<T, E>;
