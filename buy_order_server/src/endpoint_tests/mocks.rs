use buy_order_engine::{
    db_types::{Customer, Merchant, NewAccount},
    traits::{AccountApiError, AccountManagement},
};
use mockall::mock;

mock! {
    pub AccountManager {}
    impl AccountManagement for AccountManager {
        async fn register_customer(&self, account: NewAccount) -> Result<Customer, AccountApiError>;
        async fn register_merchant(&self, account: NewAccount) -> Result<Merchant, AccountApiError>;
        async fn fetch_customer(&self, id: i64) -> Result<Option<Customer>, AccountApiError>;
        async fn fetch_merchant(&self, id: i64) -> Result<Option<Merchant>, AccountApiError>;
        async fn fetch_customer_by_email(&self, email: &str) -> Result<Option<(Customer, String)>, AccountApiError>;
        async fn fetch_merchant_by_email(&self, email: &str) -> Result<Option<(Merchant, String)>, AccountApiError>;
        async fn set_stripe_account(&self, merchant_id: i64, account_id: &str, charges_enabled: bool) -> Result<Merchant, AccountApiError>;
        async fn update_charges_enabled(&self, account_id: &str, charges_enabled: bool) -> Result<Option<Merchant>, AccountApiError>;
    }
}
