use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use buy_order_engine::{
    AccountApiError,
    AnalyticsError,
    BuyOrderError,
    CatalogApiError,
    IntegrationApiError,
    NotificationApiError,
    PriceAlertError,
};
use log::error;
use storefront_tools::StorefrontApiError;
use stripe_tools::StripeApiError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("Could not read request path: {0}")]
    InvalidRequestPath(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("{0}")]
    AuthenticationError(#[from] AuthError),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("Insufficient Permissions. {0}")]
    InsufficientPermissions(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    PaymentRequired(String),
    #[error("An upstream service failed. {0}")]
    UpstreamError(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::InvalidRequestPath(_) => StatusCode::BAD_REQUEST,
            Self::AuthenticationError(e) => match e {
                AuthError::MissingToken => StatusCode::UNAUTHORIZED,
                AuthError::InvalidToken(_) => StatusCode::UNAUTHORIZED,
                AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
                AuthError::InvalidSignature(_) => StatusCode::UNAUTHORIZED,
                AuthError::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
                AuthError::WeakPassword(_) => StatusCode::BAD_REQUEST,
                AuthError::HashingError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::InsufficientPermissions(_) => StatusCode::FORBIDDEN,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::PaymentRequired(_) => StatusCode::PAYMENT_REQUIRED,
            Self::UpstreamError(_) => StatusCode::BAD_GATEWAY,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            error!("💻️ {self}");
        }
        HttpResponse::build(status)
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("Authentication required")]
    MissingToken,
    #[error("Invalid access token. {0}")]
    InvalidToken(String),
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Invalid signature. {0}")]
    InvalidSignature(String),
    #[error("Insufficient permissions. {0}")]
    InsufficientPermissions(String),
    #[error("Password rejected. {0}")]
    WeakPassword(String),
    #[error("Could not process password. {0}")]
    HashingError(String),
}

impl From<AccountApiError> for ServerError {
    fn from(e: AccountApiError) -> Self {
        match e {
            AccountApiError::DatabaseError(e) => Self::BackendError(format!("Database error: {e}")),
            AccountApiError::EmailAlreadyRegistered(_) => Self::Conflict(e.to_string()),
            AccountApiError::AccountNotFound => Self::NoRecordFound(e.to_string()),
            AccountApiError::InvalidInput(_) => Self::InvalidRequestBody(e.to_string()),
        }
    }
}

impl From<CatalogApiError> for ServerError {
    fn from(e: CatalogApiError) -> Self {
        match e {
            CatalogApiError::DatabaseError(e) => Self::BackendError(format!("Database error: {e}")),
            CatalogApiError::ProductNotFound(_) => Self::NoRecordFound(e.to_string()),
            CatalogApiError::InvalidPrice(_) | CatalogApiError::InvalidProduct(_) => {
                Self::InvalidRequestBody(e.to_string())
            },
            CatalogApiError::NotProductOwner(_) => Self::InsufficientPermissions(e.to_string()),
        }
    }
}

impl From<BuyOrderError> for ServerError {
    fn from(e: BuyOrderError) -> Self {
        use BuyOrderError::*;
        match e {
            DatabaseError(e) => Self::BackendError(format!("Database error: {e}")),
            AccountError(e) => e.into(),
            CatalogError(e) => e.into(),
            NotificationError(e) => e.into(),
            ProductNotFound(_) | MerchantNotFound(_) | CustomerNotFound(_) | OrderNotFound(_) | DiscountNotFound(_) => {
                Self::NoRecordFound(e.to_string())
            },
            LedgerEntryNotFound(_) | InconsistentEscrowState(_) => Self::BackendError(e.to_string()),
            NotProductOwner(_) | NotOrderOwner(_) => Self::InsufficientPermissions(e.to_string()),
            InvalidTargetPrice(_) | InvalidPrice(_) | InvalidExpiry(_) | InvalidDiscount(_) | MissingPaymentMethod => {
                Self::InvalidRequestBody(e.to_string())
            },
            PaymentAuthorizationFailed { .. } => Self::PaymentRequired(e.to_string()),
            PaymentProcessorError(_) => Self::UpstreamError(e.to_string()),
            MerchantPaymentsNotEnabled(_) |
            EscrowOperationInFlight(_) |
            OrderNotMonitoring(_, _) |
            OrderModificationForbidden(_) |
            OrderModificationNoOp |
            LedgerEntryNotPending(_) => Self::Conflict(e.to_string()),
        }
    }
}

impl From<NotificationApiError> for ServerError {
    fn from(e: NotificationApiError) -> Self {
        match e {
            NotificationApiError::DatabaseError(e) => Self::BackendError(format!("Database error: {e}")),
            NotificationApiError::NotificationNotFound(_) => Self::NoRecordFound(e.to_string()),
        }
    }
}

impl From<PriceAlertError> for ServerError {
    fn from(e: PriceAlertError) -> Self {
        match e {
            PriceAlertError::DatabaseError(e) => Self::BackendError(format!("Database error: {e}")),
            PriceAlertError::AlertNotFound(_) | PriceAlertError::ProductNotFound(_) => {
                Self::NoRecordFound(e.to_string())
            },
            PriceAlertError::InvalidTargetPrice(_) | PriceAlertError::InvalidEmail(_) => {
                Self::InvalidRequestBody(e.to_string())
            },
        }
    }
}

impl From<IntegrationApiError> for ServerError {
    fn from(e: IntegrationApiError) -> Self {
        match e {
            IntegrationApiError::DatabaseError(e) => Self::BackendError(format!("Database error: {e}")),
            IntegrationApiError::IntegrationNotFound(_) => Self::NoRecordFound(e.to_string()),
            IntegrationApiError::ShopAlreadyConnected(_) => Self::Conflict(e.to_string()),
            IntegrationApiError::InvalidIntegration(_) => Self::InvalidRequestBody(e.to_string()),
        }
    }
}

impl From<AnalyticsError> for ServerError {
    fn from(e: AnalyticsError) -> Self {
        match e {
            AnalyticsError::DatabaseError(e) => Self::BackendError(format!("Database error: {e}")),
            AnalyticsError::MerchantNotFound(_) => Self::NoRecordFound(e.to_string()),
        }
    }
}

impl From<StripeApiError> for ServerError {
    fn from(e: StripeApiError) -> Self {
        match e {
            StripeApiError::InvalidSignature(s) => Self::AuthenticationError(AuthError::InvalidSignature(s)),
            StripeApiError::Initialization(s) => Self::ConfigurationError(s),
            e => Self::UpstreamError(e.to_string()),
        }
    }
}

impl From<StorefrontApiError> for ServerError {
    fn from(e: StorefrontApiError) -> Self {
        match e {
            StorefrontApiError::Initialization(s) => Self::InvalidRequestBody(format!("Invalid storefront settings. {s}")),
            e => Self::UpstreamError(e.to_string()),
        }
    }
}
