//! In-process collaborators for offline runs and tests.

use crate::core::draft::{DraftRecord, StoredDraft};
use crate::core::launch::{LaunchPackage, LaunchReceipt};
use crate::core::preflight::{normalize_email, normalize_linkedin_url};
use crate::domain::model::{ChannelType, ContactLookup, ContactRecord, SendCounters, SendWindow};
use crate::domain::ports::{ContactHistoryStore, DraftStore, ExecutionBackend};
use crate::utils::error::{OutreachError, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Clone, Default)]
pub struct InMemoryContactHistory {
    records: Arc<Mutex<Vec<ContactRecord>>>,
    counters: Arc<Mutex<HashMap<ChannelType, SendCounters>>>,
    unavailable: Arc<AtomicBool>,
}

impl InMemoryContactHistory {
    pub fn new(records: Vec<ContactRecord>) -> Self {
        Self {
            records: Arc::new(Mutex::new(records)),
            ..Self::default()
        }
    }

    pub async fn add_record(&self, record: ContactRecord) {
        self.records.lock().await.push(record);
    }

    pub async fn set_counters(&self, channel: ChannelType, counters: SendCounters) {
        self.counters.lock().await.insert(channel, counters);
    }

    /// Makes every call fail, as an unreachable store would.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(OutreachError::preflight_unavailable("contact history store is offline"));
        }
        Ok(())
    }
}

fn matches_lookup(record: &ContactRecord, lookup: &ContactLookup) -> bool {
    let by_id = record
        .prospect_id
        .as_ref()
        .is_some_and(|id| lookup.prospect_ids.contains(id));
    let by_slug = record
        .linkedin_url
        .as_deref()
        .and_then(normalize_linkedin_url)
        .is_some_and(|slug| lookup.linkedin_slugs.contains(&slug));
    let by_email = record
        .email
        .as_deref()
        .and_then(normalize_email)
        .is_some_and(|email| lookup.emails.contains(&email));
    by_id || by_slug || by_email
}

#[async_trait]
impl ContactHistoryStore for InMemoryContactHistory {
    async fn find_prior_contacts(
        &self,
        _workspace_id: &str,
        lookup: &ContactLookup,
    ) -> Result<Vec<ContactRecord>> {
        self.check_available()?;
        let records = self.records.lock().await;
        Ok(records
            .iter()
            .filter(|record| matches_lookup(record, lookup))
            .cloned()
            .collect())
    }

    async fn send_counters(
        &self,
        _workspace_id: &str,
        channel: ChannelType,
        _window: &SendWindow,
    ) -> Result<SendCounters> {
        self.check_available()?;
        Ok(self
            .counters
            .lock()
            .await
            .get(&channel)
            .copied()
            .unwrap_or_default())
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryDraftStore {
    drafts: Arc<Mutex<HashMap<(String, String), StoredDraft>>>,
    saves: Arc<AtomicUsize>,
}

impl InMemoryDraftStore {
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub async fn live_drafts(&self, workspace_id: &str) -> usize {
        self.drafts
            .lock()
            .await
            .keys()
            .filter(|(ws, _)| ws == workspace_id)
            .count()
    }

    /// Seeds a draft as an older version of the product would have stored it.
    pub async fn insert(&self, draft: StoredDraft) {
        self.drafts
            .lock()
            .await
            .insert((draft.workspace_id.clone(), draft.id.clone()), draft);
    }
}

#[async_trait]
impl DraftStore for InMemoryDraftStore {
    async fn save(&self, draft: &DraftRecord) -> Result<String> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        let id = draft
            .draft_id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        let stored = StoredDraft {
            id: id.clone(),
            workspace_id: draft.workspace_id.clone(),
            name: draft.name.clone(),
            campaign_type: Some(draft.campaign_type),
            sequence: draft.sequence.clone(),
            prospect_ids: draft.prospect_ids.clone(),
            legacy_prospect_ids: Vec::new(),
            current_step: draft.current_step,
            saved_at: Utc::now(),
        };
        self.drafts
            .lock()
            .await
            .insert((draft.workspace_id.clone(), id.clone()), stored);
        Ok(id)
    }

    async fn load(&self, workspace_id: &str, draft_id: &str) -> Result<Option<StoredDraft>> {
        let key = (workspace_id.to_string(), draft_id.to_string());
        Ok(self.drafts.lock().await.get(&key).cloned())
    }

    async fn discard(&self, workspace_id: &str, draft_id: &str) -> Result<()> {
        let key = (workspace_id.to_string(), draft_id.to_string());
        self.drafts.lock().await.remove(&key);
        Ok(())
    }
}

/// Accepts every package and keeps it for inspection.
#[derive(Debug, Clone, Default)]
pub struct InMemoryExecutionBackend {
    submitted: Arc<Mutex<Vec<LaunchPackage>>>,
}

impl InMemoryExecutionBackend {
    pub async fn submitted(&self) -> Vec<LaunchPackage> {
        self.submitted.lock().await.clone()
    }
}

#[async_trait]
impl ExecutionBackend for InMemoryExecutionBackend {
    async fn submit(&self, package: &LaunchPackage) -> Result<LaunchReceipt> {
        let receipt = LaunchReceipt {
            launch_id: uuid::Uuid::new_v4().to_string(),
            accepted: package.valid_prospect_ids().len(),
            location: None,
        };
        self.submitted.lock().await.push(package.clone());
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::sequence::SequenceFields;
    use crate::domain::model::{CampaignStatus, ContactStatus};

    fn record(linkedin_url: &str) -> ContactRecord {
        ContactRecord {
            prospect_id: None,
            linkedin_url: Some(linkedin_url.to_string()),
            email: Some("Jane@Acme.io".to_string()),
            campaign_name: "Q1".to_string(),
            campaign_type: ChannelType::Connector,
            campaign_status: CampaignStatus::Active,
            status: ContactStatus::Connected,
            error_message: None,
        }
    }

    #[tokio::test]
    async fn test_history_lookup_by_normalized_handles() {
        let history = InMemoryContactHistory::new(vec![record("https://www.linkedin.com/in/Jane/")]);

        let by_slug = ContactLookup {
            linkedin_slugs: vec!["jane".to_string()],
            ..ContactLookup::default()
        };
        assert_eq!(history.find_prior_contacts("ws", &by_slug).await.unwrap().len(), 1);

        let by_email = ContactLookup {
            emails: vec!["jane@acme.io".to_string()],
            ..ContactLookup::default()
        };
        assert_eq!(history.find_prior_contacts("ws", &by_email).await.unwrap().len(), 1);

        let other = ContactLookup {
            prospect_ids: vec!["nobody".to_string()],
            ..ContactLookup::default()
        };
        assert!(history.find_prior_contacts("ws", &other).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unavailable_history_fails() {
        let history = InMemoryContactHistory::default();
        history.set_unavailable(true);
        let err = history
            .find_prior_contacts("ws", &ContactLookup::default())
            .await
            .unwrap_err();
        assert!(matches!(err, OutreachError::PreflightUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_draft_store_updates_in_place() {
        let store = InMemoryDraftStore::default();
        let mut record = DraftRecord {
            draft_id: None,
            workspace_id: "ws".to_string(),
            name: "Q3".to_string(),
            campaign_type: ChannelType::Email,
            sequence: SequenceFields::with_lead("Hello"),
            prospect_ids: vec!["p1".to_string()],
            current_step: 0,
        };

        let id = store.save(&record).await.unwrap();
        record.draft_id = Some(id.clone());
        record.name = "Q3 renamed".to_string();
        assert_eq!(store.save(&record).await.unwrap(), id);

        assert_eq!(store.live_drafts("ws").await, 1);
        assert_eq!(store.save_count(), 2);
        let loaded = store.load("ws", &id).await.unwrap().unwrap();
        assert_eq!(loaded.name, "Q3 renamed");

        store.discard("ws", &id).await.unwrap();
        assert!(store.load("ws", &id).await.unwrap().is_none());
    }
}
