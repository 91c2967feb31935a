use thiserror::Error;

/// Application error types for better error handling and user feedback.
#[derive(Debug, Clone, Error)]
pub enum AppError {
    /// Errors related to the persistent key-value store
    #[error("Storage error: {0}")]
    Storage(String),
    /// Errors related to registering or clearing one-shot timers
    #[error("Timer error: {0}")]
    Timer(String),
    /// Errors related to opening a prompt or notification surface
    #[error("Surface error: {0}")]
    Surface(String),
    /// Errors related to tone output
    #[error("Audio error: {0}")]
    Audio(String),
    /// Errors related to data validation
    #[error("Validation error: {0}")]
    Validation(String),
    /// Errors related to loading settings
    #[error("Config error: {0}")]
    Config(String),
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        AppError::Storage(error.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(error: serde_json::Error) -> Self {
        AppError::Storage(error.to_string())
    }
}

impl From<toml::de::Error> for AppError {
    fn from(error: toml::de::Error) -> Self {
        AppError::Config(error.to_string())
    }
}

// Convenience constructors
impl AppError {
    pub fn storage<S: Into<String>>(msg: S) -> Self {
        AppError::Storage(msg.into())
    }

    pub fn timer<S: Into<String>>(msg: S) -> Self {
        AppError::Timer(msg.into())
    }

    pub fn surface<S: Into<String>>(msg: S) -> Self {
        AppError::Surface(msg.into())
    }

    pub fn audio<S: Into<String>>(msg: S) -> Self {
        AppError::Audio(msg.into())
    }

    pub fn validation<S: Into<String>>(msg: S) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn config<S: Into<String>>(msg: S) -> Self {
        AppError::Config(msg.into())
    }

    /// The bare message, without the category prefix.
    pub fn message(&self) -> &str {
        match self {
            AppError::Storage(msg)
            | AppError::Timer(msg)
            | AppError::Surface(msg)
            | AppError::Audio(msg)
            | AppError::Validation(msg)
            | AppError::Config(msg) => msg,
        }
    }

    /// Validation failures are shown to the user as-is; everything else is logged.
    pub fn is_user_facing(&self) -> bool {
        matches!(self, AppError::Validation(_))
    }
}

/// Result type alias used across the crate
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AppError::storage("file not found");
        assert_eq!(err.to_string(), "Storage error: file not found");
    }

    #[test]
    fn test_error_constructors() {
        let storage_err = AppError::storage("test");
        assert!(matches!(storage_err, AppError::Storage(_)));

        let surface_err = AppError::surface("test");
        assert!(matches!(surface_err, AppError::Surface(_)));

        let timer_err = AppError::timer("test");
        assert!(matches!(timer_err, AppError::Timer(_)));
    }

    #[test]
    fn test_io_error_maps_to_storage() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: AppError = io.into();
        assert!(matches!(err, AppError::Storage(ref m) if m.contains("denied")));
    }

    #[test]
    fn test_toml_error_maps_to_config() {
        let err: AppError = toml::from_str::<toml::Value>("= nope").unwrap_err().into();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_only_validation_is_user_facing() {
        assert!(AppError::validation("empty title").is_user_facing());
        assert!(!AppError::storage("quota").is_user_facing());
        assert_eq!(AppError::validation("empty title").message(), "empty title");
    }
}
