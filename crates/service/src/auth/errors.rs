use thiserror::Error;

/// Business errors for auth workflows
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    Validation(String),
    #[error("Given Email not found in the system. Please check with the admin.")]
    EmailNotFound,
    #[error("Password not set for user")]
    PasswordNotSet,
    #[error("Login Credentials Invalid")]
    InvalidCredentials,
    #[error("Account Inactive. Please contact administrator")]
    Inactive,
    #[error("Authorization Token Missing")]
    TokenMissing,
    #[error("Authorization Token Expired")]
    TokenExpired,
    #[error("Authorization Token Invalid")]
    TokenInvalid,
    #[error("Authorization Token Signature Mismatched")]
    TokenImmature,
    #[error("User not found or invalid token")]
    UserNotFound,
    #[error("hashing error: {0}")]
    HashError(String),
    #[error("token error: {0}")]
    TokenError(String),
    #[error("repository error: {0}")]
    Repository(String),
}
