//! JSON-over-HTTP collaborators: contact history, drafts and launches.

use crate::core::draft::{DraftRecord, StoredDraft};
use crate::core::launch::{LaunchPackage, LaunchReceipt};
use crate::domain::model::{ChannelType, ContactLookup, ContactRecord, SendCounters, SendWindow};
use crate::domain::ports::{ContactHistoryStore, DraftStore, ExecutionBackend};
use crate::utils::error::{OutreachError, Result};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
const API_KEY_HEADER: &str = "X-API-KEY";

#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>, timeout_seconds: u64) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            timeout: Duration::from_secs(timeout_seconds),
        }
    }

    pub fn url(&self, workspace_id: &str, path: &str) -> String {
        format!("{}/workspaces/{}/{}", self.base_url, workspace_id, path)
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let mut request = self
            .client
            .request(method, url)
            .header("Content-Type", "application/json")
            .timeout(self.timeout);

        if let Some(key) = &self.api_key {
            request = request.header(API_KEY_HEADER, key);
        }
        request
    }

    fn check(url: &str, response: Response) -> Result<Response> {
        tracing::debug!("📡 {} -> {}", url, response.status());
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(OutreachError::ApiStatusError {
                url: url.to_string(),
                status: response.status().as_u16(),
            })
        }
    }

    async fn post_json<B: Serialize + ?Sized, R: DeserializeOwned>(&self, url: &str, body: &B) -> Result<R> {
        let response = self.request(Method::POST, url).json(body).send().await?;
        let response = Self::check(url, response)?;
        Ok(response.json().await?)
    }
}

#[derive(Debug, Clone)]
pub struct HttpContactHistory {
    api: ApiClient,
}

impl HttpContactHistory {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

#[derive(Serialize)]
struct CounterQuery<'a> {
    channel: ChannelType,
    #[serde(flatten)]
    window: &'a SendWindow,
}

#[async_trait]
impl ContactHistoryStore for HttpContactHistory {
    async fn find_prior_contacts(
        &self,
        workspace_id: &str,
        lookup: &ContactLookup,
    ) -> Result<Vec<ContactRecord>> {
        let url = self.api.url(workspace_id, "contact-history");
        self.api.post_json(&url, lookup).await
    }

    async fn send_counters(
        &self,
        workspace_id: &str,
        channel: ChannelType,
        window: &SendWindow,
    ) -> Result<SendCounters> {
        let url = self.api.url(workspace_id, "send-counters");
        self.api.post_json(&url, &CounterQuery { channel, window }).await
    }
}

#[derive(Debug, Clone)]
pub struct HttpDraftStore {
    api: ApiClient,
}

impl HttpDraftStore {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

#[derive(Deserialize)]
struct SavedDraft {
    id: String,
}

#[async_trait]
impl DraftStore for HttpDraftStore {
    async fn save(&self, draft: &DraftRecord) -> Result<String> {
        let url = self.api.url(&draft.workspace_id, "drafts");
        let saved: SavedDraft = self.api.post_json(&url, draft).await?;
        Ok(saved.id)
    }

    async fn load(&self, workspace_id: &str, draft_id: &str) -> Result<Option<StoredDraft>> {
        let url = self.api.url(workspace_id, &format!("drafts/{}", draft_id));
        let response = self.api.request(Method::GET, &url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = ApiClient::check(&url, response)?;
        Ok(Some(response.json().await?))
    }

    async fn discard(&self, workspace_id: &str, draft_id: &str) -> Result<()> {
        let url = self.api.url(workspace_id, &format!("drafts/{}", draft_id));
        let response = self.api.request(Method::DELETE, &url).send().await?;
        // Already gone counts as discarded.
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        ApiClient::check(&url, response)?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct HttpExecutionBackend {
    api: ApiClient,
}

impl HttpExecutionBackend {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

#[async_trait]
impl ExecutionBackend for HttpExecutionBackend {
    async fn submit(&self, package: &LaunchPackage) -> Result<LaunchReceipt> {
        let url = self.api.url(package.workspace_id(), "launches");
        self.api.post_json(&url, package).await.map_err(|e| match e {
            OutreachError::ApiStatusError { status, .. } => OutreachError::Execution {
                message: format!("launch rejected with status {}", status),
            },
            other => other,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::sequence::SequenceFields;
    use httpmock::prelude::*;
    use serde_json::json;

    fn api(server: &MockServer) -> ApiClient {
        ApiClient::new(server.base_url(), Some("secret".to_string()), 5)
    }

    #[tokio::test]
    async fn test_contact_history_sends_lookup_and_api_key() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/workspaces/ws-1/contact-history")
                .header("X-API-KEY", "secret")
                .json_body(json!({
                    "prospect_ids": ["p1"],
                    "linkedin_slugs": ["jane"],
                    "emails": []
                }));
            then.status(200).json_body(json!([{
                "prospect_id": "p1",
                "campaign_name": "Q1",
                "campaign_type": "connector",
                "campaign_status": "active",
                "status": "connected"
            }]));
        });

        let history = HttpContactHistory::new(api(&server));
        let lookup = ContactLookup {
            prospect_ids: vec!["p1".to_string()],
            linkedin_slugs: vec!["jane".to_string()],
            emails: vec![],
        };
        let records = history.find_prior_contacts("ws-1", &lookup).await.unwrap();

        mock.assert();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].campaign_name, "Q1");
    }

    #[tokio::test]
    async fn test_history_server_error_is_reported() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/workspaces/ws-1/contact-history");
            then.status(503);
        });

        let history = HttpContactHistory::new(api(&server));
        let err = history
            .find_prior_contacts("ws-1", &ContactLookup::default())
            .await
            .unwrap_err();
        assert!(matches!(err, OutreachError::ApiStatusError { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_draft_round_trip() {
        let server = MockServer::start();
        let save = server.mock(|when, then| {
            when.method(POST).path("/workspaces/ws-1/drafts");
            then.status(200).json_body(json!({"id": "draft-9"}));
        });
        let missing = server.mock(|when, then| {
            when.method(GET).path("/workspaces/ws-1/drafts/unknown");
            then.status(404);
        });
        let delete = server.mock(|when, then| {
            when.method(DELETE).path("/workspaces/ws-1/drafts/draft-9");
            then.status(204);
        });

        let store = HttpDraftStore::new(api(&server));
        let record = DraftRecord {
            draft_id: None,
            workspace_id: "ws-1".to_string(),
            name: "Q3".to_string(),
            campaign_type: ChannelType::Connector,
            sequence: SequenceFields::with_lead("Hi"),
            prospect_ids: vec!["p1".to_string()],
            current_step: 1,
        };

        assert_eq!(store.save(&record).await.unwrap(), "draft-9");
        assert!(store.load("ws-1", "unknown").await.unwrap().is_none());
        store.discard("ws-1", "draft-9").await.unwrap();

        save.assert();
        missing.assert();
        delete.assert();
    }
}
