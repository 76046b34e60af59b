use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type ClientId = Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    pub id: ClientId,
    pub name: String,
    pub address: String,
    pub email: String,
    pub phone: String,
    pub created_at: DateTime<Utc>,
}

impl Client {
    pub fn new(name: String, address: String, email: String, phone: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            address,
            email,
            phone,
            created_at: Utc::now(),
        }
    }
}

/// Contact details copied onto a quote or invoice when it is saved,
/// so later edits to the client do not rewrite issued documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientSnapshot {
    pub client_id: ClientId,
    pub name: String,
    pub email: String,
    pub address: String,
    pub phone: String,
}

impl From<&Client> for ClientSnapshot {
    fn from(client: &Client) -> Self {
        Self {
            client_id: client.id,
            name: client.name.clone(),
            email: client.email.clone(),
            address: client.address.clone(),
            phone: client.phone.clone(),
        }
    }
}
