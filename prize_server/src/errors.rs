use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use prize_engine::traits::{CompetitionApiError, MaintenanceError, PaymentGatewayError, WalletApiError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("Callback signature invalid or not provided")]
    InvalidSignature,
    #[error("Authentication required. {0}")]
    Unauthenticated(String),
    #[error("Insufficient Permissions. {0}")]
    InsufficientPermissions(String),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("The request conflicts with the current state. {0}")]
    StateConflict(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::InvalidSignature => StatusCode::BAD_REQUEST,
            Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::StateConflict(_) => StatusCode::CONFLICT,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

impl From<PaymentGatewayError> for ServerError {
    fn from(e: PaymentGatewayError) -> Self {
        match e {
            PaymentGatewayError::OrderNotFound(_) | PaymentGatewayError::TicketNotFound(_) => {
                Self::NoRecordFound(e.to_string())
            },
            PaymentGatewayError::OrderAlreadyExists(_) | PaymentGatewayError::OrderStateConflict(..) => {
                Self::StateConflict(e.to_string())
            },
            PaymentGatewayError::AmountMismatch { .. }
            | PaymentGatewayError::EmptyOrder
            | PaymentGatewayError::NotPurchasable(..)
            | PaymentGatewayError::StalePrice(_)
            | PaymentGatewayError::CompetitionNotFound(_) => Self::InvalidRequestBody(e.to_string()),
            PaymentGatewayError::DatabaseError(e) => Self::BackendError(e),
        }
    }
}

impl From<CompetitionApiError> for ServerError {
    fn from(e: CompetitionApiError) -> Self {
        match e {
            CompetitionApiError::CompetitionNotFound(_) => Self::NoRecordFound(e.to_string()),
            CompetitionApiError::SlugTaken(_) => Self::StateConflict(e.to_string()),
            CompetitionApiError::PrizeNumberOutOfRange(_) => Self::InvalidRequestBody(e.to_string()),
            CompetitionApiError::DatabaseError(e) => Self::BackendError(e),
        }
    }
}

impl From<WalletApiError> for ServerError {
    fn from(e: WalletApiError) -> Self {
        match e {
            WalletApiError::InsufficientBalance { .. } | WalletApiError::InvalidAmount(_) => {
                Self::InvalidRequestBody(e.to_string())
            },
            WalletApiError::DatabaseError(e) => Self::BackendError(e),
        }
    }
}

impl From<MaintenanceError> for ServerError {
    fn from(e: MaintenanceError) -> Self {
        match e {
            MaintenanceError::CompetitionNotFound(_) | MaintenanceError::DrawNotFound(_) => {
                Self::NoRecordFound(e.to_string())
            },
            MaintenanceError::AlreadyDrawn(_)
            | MaintenanceError::NotDrawable(..)
            | MaintenanceError::DuplicateFile(_) => Self::StateConflict(e.to_string()),
            MaintenanceError::NoTicketsSold(_) => Self::InvalidRequestBody(e.to_string()),
            MaintenanceError::DatabaseError(e) => Self::BackendError(e),
        }
    }
}
