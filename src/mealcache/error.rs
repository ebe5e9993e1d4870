use thiserror::Error;

#[derive(Error, Debug)]
pub enum MealError {
    #[error("Recipe not found: {0}")]
    RecipeNotFound(String),

    #[error("Category not found: {0}")]
    CategoryNotFound(String),

    #[error("Request cancelled")]
    Cancelled,

    #[error("Source error: {0}")]
    Source(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),
}

impl MealError {
    /// Cancellation is an expected outcome of abort-and-replace, not a failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, MealError::Cancelled)
    }
}

pub type Result<T> = std::result::Result<T, MealError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancelled_is_distinguished_from_failures() {
        assert!(MealError::Cancelled.is_cancelled());
        assert!(!MealError::Source("boom".into()).is_cancelled());
        assert!(!MealError::RecipeNotFound("a".into()).is_cancelled());
    }

    #[test]
    fn io_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk");
        let err: MealError = io.into();
        assert!(err.to_string().starts_with("IO error"));
    }
}
