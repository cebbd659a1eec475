use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewWebhook {
    pub topic: String,
    pub address: String,
    pub format: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Webhook {
    pub id: i64,
    pub address: String,
    pub topic: String,
    pub format: String,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}
