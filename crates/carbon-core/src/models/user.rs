//! The signed-in account and the session headers that go with it.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::api::{ApiClient, Headers, Method, Response, Transport};
use crate::entity::Entity;
use crate::events::{ErrorOrigin, Event, EventBus};
use crate::models::color::ColorTheme;
use crate::models::school::SchoolManager;

pub const UUID_HEADER: &str = "carbon-uuid";
pub const VERIFICATION_KEY_HEADER: &str = "carbon-verificationkey";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginBody {
    uuid: String,
    verification_key: String,
}

#[derive(Debug, Deserialize)]
struct UuidBody {
    uuid: String,
}

pub struct User {
    pub authorized: bool,
    uuid: Option<String>,
    verification_key: Option<String>,
    pub color_theme: ColorTheme,
    pub schools: SchoolManager,
    client: Arc<ApiClient>,
    events: Arc<EventBus>,
}

impl User {
    /// A signed-out user talking through `client`. The user owns a fresh
    /// event bus shared with its colour theme and schools.
    pub fn new(client: Arc<ApiClient>) -> Self {
        let events = Arc::new(EventBus::new());
        Self {
            authorized: false,
            uuid: None,
            verification_key: None,
            color_theme: ColorTheme::new(Arc::clone(&client), Arc::clone(&events)),
            schools: SchoolManager::for_user(Arc::clone(&client), Arc::clone(&events)),
            client,
            events,
        }
    }

    /// Resume a session from previously stored credentials.
    pub fn from_session(client: Arc<ApiClient>, uuid: String, verification_key: String) -> Self {
        let mut user = Self::new(client);
        user.set_session(uuid, verification_key);
        user
    }

    pub fn uuid(&self) -> Option<&str> {
        self.uuid.as_deref()
    }

    pub fn verification_key(&self) -> Option<&str> {
        self.verification_key.as_deref()
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    pub fn client(&self) -> &Arc<ApiClient> {
        &self.client
    }

    fn set_session(&mut self, uuid: String, verification_key: String) {
        self.authorized = true;
        self.uuid = Some(uuid);
        self.verification_key = Some(verification_key);
        self.update_headers();
    }

    /// Sign in. On success the session headers are attached to every later
    /// request and a login event is emitted.
    pub async fn login(&mut self, email: &str, password: &str) -> bool {
        let response: Response<LoginBody> = self
            .client
            .post_json("/api/login/", &json!({ "email": email, "password": password }))
            .await;
        match response {
            Response::Success { body, .. } => {
                info!(uuid = %body.uuid, "Logged in");
                self.set_session(body.uuid, body.verification_key);
                self.events.emit(Event::Login);
                true
            }
            Response::Failure { code, msg } => {
                self.events.emit_error(ErrorOrigin::Login, code, msg);
                false
            }
        }
    }

    pub async fn change_password(&self, new_password: &str) -> bool {
        if !self.authorized {
            debug!("Refusing to change password while signed out");
            return false;
        }
        match self
            .client
            .post("/api/me/password/", &json!({ "password": new_password }))
            .await
        {
            Response::Success { .. } => true,
            Response::Failure { code, msg } => {
                self.events.emit_error(ErrorOrigin::ChangePassword, code, msg);
                false
            }
        }
    }

    /// Rebuild the client's headers from the current session.
    pub fn update_headers(&self) {
        let mut headers = Headers::new();
        if let Some(uuid) = &self.uuid {
            headers.insert(UUID_HEADER.to_string(), uuid.clone());
        }
        if let Some(key) = &self.verification_key {
            headers.insert(VERIFICATION_KEY_HEADER.to_string(), key.clone());
        }
        self.client.set_headers(headers);
    }

    /// Create an account. No session is started.
    pub async fn register(
        transport: &dyn Transport,
        base_url: &str,
        email: &str,
        password: &str,
    ) -> bool {
        let body = json!({ "email": email, "password": password });
        let response = transport
            .send(Method::Post, &Headers::new(), base_url, Some(&body))
            .await;
        if let Response::Failure { code, msg } = &response {
            warn!(code = %code, message = %msg, "Registration failed");
        }
        response.is_success()
    }
}

async fn fetch_uuid(client: &ApiClient, events: &EventBus) -> Option<String> {
    let response: Response<UuidBody> = client.get_json("/api/me/uuid/").await;
    match response {
        Response::Success { body, .. } => Some(body.uuid),
        Response::Failure { code, msg } => {
            events.emit_error(ErrorOrigin::UpdateUuid, code, msg);
            None
        }
    }
}

#[async_trait]
impl Entity for User {
    fn unique_id(&self) -> String {
        self.uuid.clone().unwrap_or_default()
    }

    /// Refresh the uuid, colour theme and schools concurrently.
    async fn fetch(&mut self) -> &mut Self {
        let (uuid, _, schools) = tokio::join!(
            fetch_uuid(&self.client, &self.events),
            self.color_theme.fetch(),
            self.schools.fetch_all(false),
        );

        if let Some(uuid) = uuid {
            self.uuid = Some(uuid);
            self.update_headers();
        }
        if let Err(e) = schools {
            warn!(error = %e, "Failed to refresh schools");
        }
        self
    }

    fn to_json(&self) -> Value {
        json!({
            "uuid": self.uuid,
            "verificationKey": self.verification_key,
            "authorized": self.authorized,
            "schools": self.schools.to_json(),
            "colorTheme": self.color_theme.to_json(),
        })
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.uuid {
            Some(uuid) => write!(f, "<User {}>", uuid),
            None => write!(f, "<User>"),
        }
    }
}
