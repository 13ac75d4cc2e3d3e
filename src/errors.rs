use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("{message}")]
    Validation { message: String },

    #[error("Authentication required")]
    Unauthorized,

    #[error("{message}")]
    Forbidden { message: String },

    #[error("Deliverable not found: {id}")]
    DeliverableNotFound { id: i64 },

    #[error("Package not found: {key}")]
    PackageNotFound { key: String },

    #[error("Project not found: {id}")]
    ProjectNotFound { id: i64 },

    #[error("Sprint draft not found: {id}")]
    SprintDraftNotFound { id: i64 },

    #[error("Project member not found: {email}")]
    MemberNotFound { email: String },

    #[error("Task not found: {id}")]
    TaskNotFound { id: i64 },

    #[error("Upstream service error: {message}")]
    Upstream { message: String },

    #[error("Upstream service timed out")]
    UpstreamTimeout,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Shorthand for a validation failure with the given message.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Shorthand for an authorization failure with the given message.
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    /// True for the "row does not exist" family of errors.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::DeliverableNotFound { .. }
                | Self::PackageNotFound { .. }
                | Self::ProjectNotFound { .. }
                | Self::SprintDraftNotFound { .. }
                | Self::MemberNotFound { .. }
                | Self::TaskNotFound { .. }
        )
    }
}

// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
