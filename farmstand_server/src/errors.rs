use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use farmstand_engine::MarketplaceError;
use log::error;
use thiserror::Error;

/// Seconds a client should wait before retrying after a transient store conflict.
const RETRY_AFTER_SECS: &str = "1";

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("Could not read request path: {0}")]
    InvalidRequestPath(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("Authentication Error. {0}")]
    AuthenticationError(#[from] AuthError),
    #[error("{0}")]
    MarketplaceError(#[from] MarketplaceError),
}

impl ServerError {
    /// The machine-readable kind that accompanies every error body.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidRequestBody(_) | Self::InvalidRequestPath(_) => "ValidationError",
            Self::AuthenticationError(AuthError::InsufficientPermissions(_)) => "Forbidden",
            Self::AuthenticationError(_) => "Unauthorized",
            Self::MarketplaceError(e) => e.kind(),
            Self::InitializeError(_) | Self::IOError(_) | Self::ConfigurationError(_) => "ServerError",
        }
    }
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::InvalidRequestPath(_) => StatusCode::BAD_REQUEST,
            Self::AuthenticationError(e) => match e {
                AuthError::MissingCredentials => StatusCode::UNAUTHORIZED,
                AuthError::ValidationError(_) => StatusCode::UNAUTHORIZED,
                AuthError::TokenExpired => StatusCode::UNAUTHORIZED,
                AuthError::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
            },
            Self::MarketplaceError(e) => match e {
                MarketplaceError::ValidationError(_) => StatusCode::BAD_REQUEST,
                MarketplaceError::ProductNotFound(_) => StatusCode::NOT_FOUND,
                MarketplaceError::OrderNotFound(_) => StatusCode::NOT_FOUND,
                MarketplaceError::Forbidden => StatusCode::FORBIDDEN,
                MarketplaceError::InsufficientStock { .. } => StatusCode::CONFLICT,
                MarketplaceError::InvalidStatusTransition { .. } => StatusCode::CONFLICT,
                MarketplaceError::TransientStoreError(_) => StatusCode::SERVICE_UNAVAILABLE,
                MarketplaceError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            error!("💻️ {self}");
        }
        let mut response = HttpResponse::build(status);
        response.insert_header(ContentType::json());
        if status == StatusCode::SERVICE_UNAVAILABLE {
            response.insert_header(("Retry-After", RETRY_AFTER_SECS));
        }
        response.body(serde_json::json!({ "message": self.to_string(), "error": self.kind() }).to_string())
    }
}

#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("Missing or invalid Authorization header")]
    MissingCredentials,
    #[error("Invalid token. {0}")]
    ValidationError(String),
    #[error("The access token has expired")]
    TokenExpired,
    #[error("Insufficient Permissions. {0}")]
    InsufficientPermissions(String),
}
