use thiserror::Error;

use crate::db_types::{Customer, Merchant, NewAccount};

#[derive(Debug, Clone, Error)]
pub enum AccountApiError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("An account with email {0} is already registered")]
    EmailAlreadyRegistered(String),
    #[error("The requested account does not exist")]
    AccountNotFound,
    #[error("Invalid account details: {0}")]
    InvalidInput(String),
}

impl From<sqlx::Error> for AccountApiError {
    fn from(e: sqlx::Error) -> Self {
        AccountApiError::DatabaseError(e.to_string())
    }
}

/// The `AccountManagement` trait defines behaviour for registering and looking up the two kinds of account the
/// system knows about: customers, who place buy orders, and merchants, who own products and receive funds.
///
/// Emails are stored lowercased and are unique per account kind. Password hashes are opaque to the backend.
#[allow(async_fn_in_trait)]
pub trait AccountManagement {
    async fn register_customer(&self, account: NewAccount) -> Result<Customer, AccountApiError>;

    async fn register_merchant(&self, account: NewAccount) -> Result<Merchant, AccountApiError>;

    async fn fetch_customer(&self, id: i64) -> Result<Option<Customer>, AccountApiError>;

    async fn fetch_merchant(&self, id: i64) -> Result<Option<Merchant>, AccountApiError>;

    /// Fetches the customer with the given email, along with the stored password hash.
    async fn fetch_customer_by_email(&self, email: &str) -> Result<Option<(Customer, String)>, AccountApiError>;

    /// Fetches the merchant with the given email, along with the stored password hash.
    async fn fetch_merchant_by_email(&self, email: &str) -> Result<Option<(Merchant, String)>, AccountApiError>;

    /// Links a processor (Stripe Connect) account to the merchant and returns the updated merchant.
    async fn set_stripe_account(
        &self,
        merchant_id: i64,
        account_id: &str,
        charges_enabled: bool,
    ) -> Result<Merchant, AccountApiError>;

    /// Records whether the processor account may take payments. Returns `None` if no merchant owns the account.
    async fn update_charges_enabled(
        &self,
        account_id: &str,
        charges_enabled: bool,
    ) -> Result<Option<Merchant>, AccountApiError>;
}
