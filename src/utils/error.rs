use thiserror::Error;

/// Structural violations found while assembling an outreach sequence.
///
/// These are recoverable: the operator fixes the named field and retries.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{channel} campaigns require a non-empty {field}")]
    MissingLeadMessage { channel: &'static str, field: String },

    #[error("{field} is {actual} characters, limit is {limit}")]
    CharacterLimitExceeded {
        field: String,
        limit: usize,
        actual: usize,
    },

    #[error("delay for step {step} must be a positive number of {unit}")]
    NonPositiveDelay { step: usize, unit: String },

    #[error("{channel} campaigns are not available")]
    ChannelUnavailable { channel: &'static str },

    #[error("sequence has {actual} steps, at most {max} are allowed")]
    TooManySteps { max: usize, actual: usize },
}

#[derive(Error, Debug)]
pub enum OutreachError {
    #[error("Sequence validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Pre-flight check unavailable: {message}")]
    PreflightUnavailable { message: String },

    #[error("Draft conflict: expected draft {expected}, store returned {returned}")]
    DraftConflict { expected: String, returned: String },

    #[error("Draft has been discarded")]
    DraftDiscarded,

    #[error("Nothing to launch: all {blocked} prospects were blocked by pre-flight")]
    NothingToLaunch { blocked: usize },

    #[error("Execution backend rejected the launch: {message}")]
    Execution { message: String },

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("API request to {url} failed with status: {status}")]
    ApiStatusError { url: String, status: u16 },

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration field: {field}")]
    MissingConfigError { field: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Collaborator,
    Draft,
    Configuration,
    Io,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl OutreachError {
    pub fn preflight_unavailable(message: impl Into<String>) -> Self {
        Self::PreflightUnavailable {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Validation(_) | Self::NothingToLaunch { .. } => ErrorCategory::Validation,
            Self::PreflightUnavailable { .. }
            | Self::Execution { .. }
            | Self::ApiError(_)
            | Self::ApiStatusError { .. } => ErrorCategory::Collaborator,
            Self::DraftConflict { .. } | Self::DraftDiscarded => ErrorCategory::Draft,
            Self::ConfigError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. }
            | Self::TomlError(_) => ErrorCategory::Configuration,
            Self::CsvError(_) | Self::IoError(_) | Self::SerializationError(_) => ErrorCategory::Io,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // The newest save survives under the returned id.
            Self::DraftConflict { .. } => ErrorSeverity::Low,
            Self::Validation(_) | Self::NothingToLaunch { .. } | Self::DraftDiscarded => {
                ErrorSeverity::Medium
            }
            Self::PreflightUnavailable { .. }
            | Self::Execution { .. }
            | Self::ApiError(_)
            | Self::ApiStatusError { .. } => ErrorSeverity::High,
            Self::CsvError(_) | Self::SerializationError(_) => ErrorSeverity::High,
            Self::ConfigError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. }
            | Self::TomlError(_)
            | Self::IoError(_) => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            Self::Validation(ValidationError::CharacterLimitExceeded { field, limit, .. }) => {
                format!("Shorten {} to at most {} characters", field, limit)
            }
            Self::Validation(ValidationError::MissingLeadMessage { field, .. }) => {
                format!("Write the {} before launching", field)
            }
            Self::Validation(_) => "Fix the sequence fields and try again".to_string(),
            Self::PreflightUnavailable { .. } => {
                "Check that the contact-history service is reachable, then re-run the pre-flight check"
                    .to_string()
            }
            Self::DraftConflict { .. } => {
                "Nothing was lost; the draft now lives under the id returned by the store".to_string()
            }
            Self::DraftDiscarded => "Start a new campaign draft".to_string(),
            Self::NothingToLaunch { .. } => {
                "Review the blocked prospects and their reasons, or import new prospects".to_string()
            }
            Self::Execution { .. } | Self::ApiError(_) | Self::ApiStatusError { .. } => {
                "Retry later; the campaign was not launched".to_string()
            }
            Self::CsvError(_) => "Check that the prospect file is valid CSV with a header row".to_string(),
            Self::IoError(_) => "Check file paths and permissions".to_string(),
            Self::SerializationError(_) => "Check the JSON payload format".to_string(),
            Self::ConfigError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. }
            | Self::TomlError(_) => {
                "Fix the configuration file and run again".to_string()
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::Validation(e) => format!("The message sequence is not valid: {}", e),
            Self::PreflightUnavailable { .. } => {
                "Could not verify prospects against previous campaigns, so nothing was launched".to_string()
            }
            Self::NothingToLaunch { blocked } => {
                format!("All {} prospects are blocked; see the pre-flight report", blocked)
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, OutreachError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_is_recoverable() {
        let err: OutreachError = ValidationError::CharacterLimitExceeded {
            field: "connection request".to_string(),
            limit: 275,
            actual: 276,
        }
        .into();

        assert_eq!(err.category(), ErrorCategory::Validation);
        assert_eq!(err.severity(), ErrorSeverity::Medium);
        assert!(err.to_string().contains("275"));
        assert!(err.recovery_suggestion().contains("275"));
    }

    #[test]
    fn test_preflight_unavailable_is_fatal_to_launch() {
        let err = OutreachError::preflight_unavailable("connection refused");
        assert_eq!(err.category(), ErrorCategory::Collaborator);
        assert!(err.severity() >= ErrorSeverity::High);
        assert!(err.user_friendly_message().contains("nothing was launched"));
    }
}
