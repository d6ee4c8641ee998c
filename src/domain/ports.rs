use crate::core::draft::{DraftRecord, StoredDraft};
use crate::core::launch::{LaunchPackage, LaunchReceipt};
use crate::domain::model::{ChannelType, ContactLookup, ContactRecord, Prospect, SendCounters, SendWindow};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

#[async_trait]
pub trait ProspectSource: Send + Sync {
    async fn load_prospects(&self) -> Result<Vec<Prospect>>;
}

/// Prior campaign membership and send counters for pre-flight.
#[async_trait]
pub trait ContactHistoryStore: Send + Sync {
    /// Every record matching any id, LinkedIn slug or e-mail in `lookup`.
    async fn find_prior_contacts(
        &self,
        workspace_id: &str,
        lookup: &ContactLookup,
    ) -> Result<Vec<ContactRecord>>;

    async fn send_counters(
        &self,
        workspace_id: &str,
        channel: ChannelType,
        window: &SendWindow,
    ) -> Result<SendCounters>;
}

#[async_trait]
pub trait DraftStore: Send + Sync {
    /// Inserts when `draft.draft_id` is `None`, updates otherwise. Returns the
    /// authoritative id.
    async fn save(&self, draft: &DraftRecord) -> Result<String>;
    async fn load(&self, workspace_id: &str, draft_id: &str) -> Result<Option<StoredDraft>>;
    async fn discard(&self, workspace_id: &str, draft_id: &str) -> Result<()>;
}

#[async_trait]
pub trait ExecutionBackend: Send + Sync {
    async fn submit(&self, package: &LaunchPackage) -> Result<LaunchReceipt>;
}
