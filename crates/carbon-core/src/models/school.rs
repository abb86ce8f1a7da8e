//! Schools the user belongs to and the manager that caches them.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::api::{ApiClient, Response};
use crate::entity::Entity;
use crate::events::{ErrorOrigin, EventBus};
use crate::manager::{Loader, Manager};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchoolInfo {
    pub server_version: String,
    pub selfhosted: bool,
}

pub struct School {
    usid: String,
    pub info: Option<SchoolInfo>,
    client: Arc<ApiClient>,
    events: Arc<EventBus>,
}

impl School {
    pub fn new(client: Arc<ApiClient>, events: Arc<EventBus>, usid: impl Into<String>) -> Self {
        Self {
            usid: usid.into(),
            info: None,
            client,
            events,
        }
    }

    pub fn usid(&self) -> &str {
        &self.usid
    }

    async fn update_info(&mut self) {
        let path = format!("/api/school/{}/info", self.usid);
        let response: Response<SchoolInfo> = self.client.get_json(&path).await;
        match response {
            Response::Success { body, .. } => self.info = Some(body),
            Response::Failure { code, msg } => {
                self.events.emit_error(ErrorOrigin::FetchSchool, code, msg)
            }
        }
    }
}

#[async_trait]
impl Entity for School {
    fn unique_id(&self) -> String {
        self.usid.clone()
    }

    async fn fetch(&mut self) -> &mut Self {
        self.update_info().await;
        self
    }

    fn to_json(&self) -> Value {
        json!({
            "info": self.info,
            "usid": self.usid,
        })
    }
}

impl fmt::Display for School {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<School {}>", self.usid)
    }
}

/// Loads schools for the signed-in user.
pub struct SchoolLoader {
    client: Arc<ApiClient>,
    events: Arc<EventBus>,
}

impl SchoolLoader {
    pub fn new(client: Arc<ApiClient>, events: Arc<EventBus>) -> Self {
        Self { client, events }
    }
}

#[async_trait]
impl Loader for SchoolLoader {
    type Entity = School;

    async fn load_one(&self, id: &str) -> School {
        let mut school = School::new(Arc::clone(&self.client), Arc::clone(&self.events), id);
        school.fetch().await;
        school
    }

    async fn list_ids(&self) -> Vec<String> {
        let response: Response<Vec<String>> = self.client.get_json("/api/me/schools/").await;
        match response {
            Response::Success { body, .. } => body,
            Response::Failure { code, msg } => {
                self.events.emit_error(ErrorOrigin::GetSchools, code, msg);
                Vec::new()
            }
        }
    }
}

pub type SchoolManager = Manager<SchoolLoader>;

impl SchoolManager {
    pub fn for_user(client: Arc<ApiClient>, events: Arc<EventBus>) -> Self {
        Manager::new(SchoolLoader::new(client, events))
    }
}

impl fmt::Display for SchoolManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<SchoolManager>")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{FailureCode, Method};
    use crate::test_utils::{client, MockTransport};
    use futures::StreamExt;
    use parking_lot::Mutex;

    fn info(version: &str) -> Value {
        json!({ "serverVersion": version, "selfhosted": false })
    }

    fn school_transport() -> Arc<MockTransport> {
        Arc::new(
            MockTransport::new()
                .route(Method::Get, "/api/me/schools/", Response::success(json!(["s1", "s2"])))
                .route(Method::Get, "/api/school/s1/info", Response::success(info("1.0")))
                .route(Method::Get, "/api/school/s2/info", Response::success(info("2.0"))),
        )
    }

    #[tokio::test]
    async fn test_school_fetch() {
        let transport = school_transport();
        let mut school = School::new(client(&transport), Arc::new(EventBus::new()), "s1");
        assert!(school.info.is_none());

        school.fetch().await;

        assert_eq!(
            school.info,
            Some(SchoolInfo {
                server_version: "1.0".to_string(),
                selfhosted: false,
            })
        );
        assert_eq!(school.unique_id(), "s1");
        assert_eq!(school.to_string(), "<School s1>");
        assert_eq!(school.to_json()["info"]["serverVersion"], json!("1.0"));
    }

    #[tokio::test]
    async fn test_school_fetch_failure_keeps_state() {
        let transport = Arc::new(MockTransport::new());
        let events = Arc::new(EventBus::new());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = Arc::clone(&seen);
        events.on_error(move |e| s.lock().push((e.origin, e.code)));

        let mut school = School::new(client(&transport), events, "missing");
        school.fetch().await;

        assert!(school.info.is_none());
        assert_eq!(*seen.lock(), vec![(ErrorOrigin::FetchSchool, FailureCode::NotFound)]);
    }

    #[tokio::test]
    async fn test_manager_fetch_all_schools() {
        let transport = school_transport();
        let manager = SchoolManager::for_user(client(&transport), Arc::new(EventBus::new()));

        let all = manager.fetch_all(false).await.expect("fetch_all");

        assert_eq!(all.keys(), vec!["s1", "s2"]);
        assert_eq!(
            all.get("s2").and_then(|s| s.info.clone()).map(|i| i.server_version),
            Some("2.0".to_string())
        );
        assert_eq!(transport.call_count("/api/school/s1/info"), 1);

        manager.fetch_one("s1", false).await.expect("fetch_one");
        assert_eq!(transport.call_count("/api/school/s1/info"), 1);
        assert_eq!(manager.to_string(), "<SchoolManager>");
    }

    #[tokio::test]
    async fn test_manager_list_failure_emits_and_keeps_cache() {
        let transport = school_transport();
        let events = Arc::new(EventBus::new());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = Arc::clone(&seen);
        events.on_error(move |e| s.lock().push(e.origin));
        let manager = SchoolManager::for_user(client(&transport), events);

        manager.fetch_all(false).await.expect("fetch_all");
        transport.set_route(
            Method::Get,
            "/api/me/schools/",
            Response::failure(FailureCode::ServerError, "down"),
        );
        let all = manager.fetch_all(true).await.expect("fetch_all");

        assert_eq!(all.len(), 2);
        assert_eq!(*seen.lock(), vec![ErrorOrigin::GetSchools]);
    }

    #[tokio::test]
    async fn test_manager_stream_schools() {
        let transport = school_transport();
        let manager = SchoolManager::for_user(client(&transport), Arc::new(EventBus::new()));

        let ids: Vec<String> = manager
            .stream()
            .map(|s| s.expect("school").unique_id())
            .collect()
            .await;

        assert_eq!(ids, vec!["s1", "s2"]);
        assert_eq!(manager.len(), 2);
    }

    #[tokio::test]
    async fn test_manager_to_json() {
        let transport = school_transport();
        let manager = SchoolManager::for_user(client(&transport), Arc::new(EventBus::new()));
        manager.fetch_one("s1", false).await.expect("fetch_one");

        assert_eq!(
            manager.to_json(),
            json!({ "s1": { "usid": "s1", "info": info("1.0") } })
        );
    }
}
