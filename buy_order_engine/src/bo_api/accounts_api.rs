//! Unifies API for accessing customer and merchant accounts.
use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{Customer, Merchant, NewAccount},
    traits::{AccountApiError, AccountManagement},
};

/// The `AccountApi` registers and looks up customers and merchants.
pub struct AccountApi<B> {
    db: B,
}

impl<B: Debug> Debug for AccountApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AccountApi ({:?})", self.db)
    }
}

impl<B: Clone> Clone for AccountApi<B> {
    fn clone(&self) -> Self {
        Self { db: self.db.clone() }
    }
}

impl<B> AccountApi<B>
where B: AccountManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    pub async fn register_customer(&self, account: NewAccount) -> Result<Customer, AccountApiError> {
        let account = validate(account)?;
        let customer = self.db.register_customer(account).await?;
        info!("👤️ Customer #{} registered ({})", customer.id, customer.email);
        Ok(customer)
    }

    pub async fn register_merchant(&self, account: NewAccount) -> Result<Merchant, AccountApiError> {
        let account = validate(account)?;
        let merchant = self.db.register_merchant(account).await?;
        info!("👤️ Merchant #{} registered ({})", merchant.id, merchant.email);
        Ok(merchant)
    }

    pub async fn fetch_customer(&self, id: i64) -> Result<Option<Customer>, AccountApiError> {
        self.db.fetch_customer(id).await
    }

    pub async fn fetch_merchant(&self, id: i64) -> Result<Option<Merchant>, AccountApiError> {
        self.db.fetch_merchant(id).await
    }

    /// Fetches the customer and their password hash, for login.
    pub async fn fetch_customer_by_email(&self, email: &str) -> Result<Option<(Customer, String)>, AccountApiError> {
        self.db.fetch_customer_by_email(&normalize_email(email)).await
    }

    /// Fetches the merchant and their password hash, for login.
    pub async fn fetch_merchant_by_email(&self, email: &str) -> Result<Option<(Merchant, String)>, AccountApiError> {
        self.db.fetch_merchant_by_email(&normalize_email(email)).await
    }

    /// Links the merchant to their payment processor account. The merchant can receive buy orders once the account
    /// is linked and charges are enabled on it.
    pub async fn set_stripe_account(
        &self,
        merchant_id: i64,
        account_id: &str,
        charges_enabled: bool,
    ) -> Result<Merchant, AccountApiError> {
        if account_id.trim().is_empty() {
            return Err(AccountApiError::InvalidInput("The processor account id cannot be empty".into()));
        }
        let merchant = self.db.set_stripe_account(merchant_id, account_id.trim(), charges_enabled).await?;
        info!("👤️ Merchant #{merchant_id} is linked to processor account {account_id}");
        Ok(merchant)
    }

    /// Applies the processor's latest view of whether an account may take payments.
    pub async fn update_charges_enabled(
        &self,
        account_id: &str,
        charges_enabled: bool,
    ) -> Result<Option<Merchant>, AccountApiError> {
        let merchant = self.db.update_charges_enabled(account_id, charges_enabled).await?;
        match &merchant {
            Some(m) if m.charges_enabled => info!("👤️ Merchant #{} can now accept payments", m.id),
            Some(m) => warn!("👤️ Charges are disabled on the processor account of merchant #{}", m.id),
            None => debug!("👤️ No merchant owns processor account {account_id}"),
        }
        Ok(merchant)
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn validate(mut account: NewAccount) -> Result<NewAccount, AccountApiError> {
    account.email = normalize_email(&account.email);
    account.name = account.name.trim().to_string();
    let valid_email = account
        .email
        .split_once('@')
        .is_some_and(|(user, domain)| !user.is_empty() && domain.contains('.') && !domain.starts_with('.'));
    if !valid_email {
        return Err(AccountApiError::InvalidInput(format!("{} is not a valid email address", account.email)));
    }
    if account.name.is_empty() {
        return Err(AccountApiError::InvalidInput("A name is required".into()));
    }
    Ok(account)
}
