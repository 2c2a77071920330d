use thiserror::Error;

/// Domain-specific errors using thiserror
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("User not found: {id}")]
    UserNotFound { id: i64 },

    #[error("No users to delete")]
    NoUsers,

    #[error("Username or email already exists")]
    AlreadyExists,

    #[error("Missing username or email")]
    MissingFields,

    #[error("Invalid {field}: {message}")]
    InvalidField { field: String, message: String },

    #[error("Database error: {message}")]
    Database { message: String },
}

impl DomainError {
    pub fn user_not_found(id: i64) -> Self {
        Self::UserNotFound { id }
    }

    pub fn no_users() -> Self {
        Self::NoUsers
    }

    pub fn already_exists() -> Self {
        Self::AlreadyExists
    }

    pub fn missing_fields() -> Self {
        Self::MissingFields
    }

    pub fn invalid_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
        }
    }
}
