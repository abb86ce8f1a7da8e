//! Stored credentials, kept in the local [`Storage`] document.

use anyhow::{Context, Result};
use carbon_core::models::User;
use carbon_core::Storage;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

const SESSION_FIELD: &str = "session";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionData {
    pub uuid: String,
    pub verification_key: String,
}

impl SessionData {
    pub fn from_user(user: &User) -> Option<Self> {
        Some(Self {
            uuid: user.uuid()?.to_string(),
            verification_key: user.verification_key()?.to_string(),
        })
    }
}

pub struct Session {
    storage: Storage,
}

impl Session {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    pub fn load(&mut self) -> Option<SessionData> {
        let stored = self.storage.content().get(SESSION_FIELD)?.clone();
        match serde_json::from_value(stored) {
            Ok(data) => Some(data),
            Err(e) => {
                debug!(error = %e, "Ignoring malformed stored session");
                None
            }
        }
    }

    pub fn save(&mut self, data: &SessionData) -> Result<()> {
        let value = serde_json::to_value(data)?;
        let content = self.storage.content();
        if !content.is_object() {
            *content = Value::Object(Map::new());
        }
        if let Value::Object(map) = content {
            map.insert(SESSION_FIELD.to_string(), value);
        }
        self.storage.try_save().context("Failed to save session")
    }

    pub fn clear(&mut self) -> Result<()> {
        if let Value::Object(map) = self.storage.content() {
            map.remove(SESSION_FIELD);
        }
        self.storage.try_save().context("Failed to save session")
    }
}
