//! Autosave and recovery for a campaign that has not launched yet.
//!
//! State moves `Unsaved -> Saving -> Saved`, back through `Saving` on every
//! later save, and ends at `Discarded`. The draft id handed out by the first
//! successful save is reused for every later save of the same session.

use crate::core::resolver::ChannelSelection;
use crate::core::sequence::SequenceFields;
use crate::domain::model::ChannelType;
use crate::domain::ports::DraftStore;
use crate::utils::error::{OutreachError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(2000);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftState {
    Unsaved,
    Saving,
    Saved,
    Discarded,
}

/// The editable content of a campaign-in-progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftSnapshot {
    pub name: String,
    pub campaign_type: ChannelType,
    pub sequence: SequenceFields,
    pub prospect_ids: Vec<String>,
    #[serde(default)]
    pub current_step: u32,
}

impl DraftSnapshot {
    /// Nothing worth persisting yet: no message text or no prospects.
    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty() || self.prospect_ids.is_empty()
    }
}

/// Payload handed to the draft store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub draft_id: Option<String>,
    pub workspace_id: String,
    pub name: String,
    pub campaign_type: ChannelType,
    pub sequence: SequenceFields,
    pub prospect_ids: Vec<String>,
    pub current_step: u32,
}

impl DraftRecord {
    pub fn new(workspace_id: impl Into<String>, draft_id: Option<String>, snapshot: DraftSnapshot) -> Self {
        Self {
            draft_id,
            workspace_id: workspace_id.into(),
            name: snapshot.name,
            campaign_type: snapshot.campaign_type,
            sequence: snapshot.sequence,
            prospect_ids: snapshot.prospect_ids,
            current_step: snapshot.current_step,
        }
    }
}

/// A draft as read back from the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredDraft {
    pub id: String,
    pub workspace_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub campaign_type: Option<ChannelType>,
    #[serde(default)]
    pub sequence: SequenceFields,
    #[serde(default)]
    pub prospect_ids: Vec<String>,
    /// Prospect ids from the deprecated draft payload location.
    #[serde(default, alias = "legacyProspectIds")]
    pub legacy_prospect_ids: Vec<String>,
    #[serde(default)]
    pub current_step: u32,
    pub saved_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProspectOrigin {
    Session,
    Draft,
    Legacy,
    None,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveredSession {
    pub draft_id: String,
    pub name: String,
    pub selection: Option<ChannelSelection>,
    pub sequence: SequenceFields,
    pub prospect_ids: Vec<String>,
    pub prospect_origin: ProspectOrigin,
    pub current_step: u32,
}

/// Rebuilds a session from a stored draft. Prospects come from the session's
/// own selection first, then the draft, then the legacy location. A stored
/// campaign type is restored as an explicit choice.
pub fn recover(stored: StoredDraft, session_prospects: Option<Vec<String>>) -> RecoveredSession {
    let (prospect_ids, prospect_origin) = match session_prospects {
        Some(ids) if !ids.is_empty() => (ids, ProspectOrigin::Session),
        _ if !stored.prospect_ids.is_empty() => (stored.prospect_ids, ProspectOrigin::Draft),
        _ if !stored.legacy_prospect_ids.is_empty() => {
            tracing::debug!("Draft {} restored prospects from legacy location", stored.id);
            (stored.legacy_prospect_ids, ProspectOrigin::Legacy)
        }
        _ => (Vec::new(), ProspectOrigin::None),
    };

    RecoveredSession {
        draft_id: stored.id,
        name: stored.name,
        selection: stored.campaign_type.map(ChannelSelection::preselected),
        sequence: stored.sequence,
        prospect_ids,
        prospect_origin,
        current_step: stored.current_step,
    }
}

#[derive(Debug)]
struct Session {
    draft_id: Option<String>,
    state: DraftState,
    saved_at: Option<DateTime<Utc>>,
}

struct Inner<S> {
    store: S,
    workspace_id: String,
    session: Mutex<Session>,
    generation: AtomicU64,
}

impl<S: DraftStore> Inner<S> {
    /// Saves are serialised on the session lock so a second save always sees
    /// the id assigned by the first.
    async fn save(&self, snapshot: DraftSnapshot, forced: bool) -> Result<Option<String>> {
        let mut session = self.session.lock().await;

        if session.state == DraftState::Discarded {
            return Err(OutreachError::DraftDiscarded);
        }
        if !forced && snapshot.is_empty() {
            tracing::debug!("Skipping autosave of empty draft '{}'", snapshot.name);
            return Ok(None);
        }

        let settled = session.state;
        session.state = DraftState::Saving;
        let record = DraftRecord::new(&self.workspace_id, session.draft_id.clone(), snapshot);

        let returned = match self.store.save(&record).await {
            Ok(id) => id,
            Err(e) => {
                session.state = settled;
                return Err(e);
            }
        };

        match session.draft_id.clone() {
            Some(expected) if expected != returned => {
                // The returned record holds the newest content: adopt it and
                // retire the old one so only one draft stays live.
                tracing::warn!(
                    "⚠️ Draft store returned {} for draft {}, keeping the newer record",
                    returned,
                    expected
                );
                if let Err(e) = self.store.discard(&self.workspace_id, &expected).await {
                    tracing::warn!("Failed to discard superseded draft {}: {}", expected, e);
                }
                session.draft_id = Some(returned.clone());
                session.state = DraftState::Saved;
                session.saved_at = Some(Utc::now());
                Err(OutreachError::DraftConflict { expected, returned })
            }
            _ => {
                if session.draft_id.is_none() {
                    tracing::info!("💾 Created draft {}", returned);
                }
                session.draft_id = Some(returned.clone());
                session.state = DraftState::Saved;
                session.saved_at = Some(Utc::now());
                Ok(Some(returned))
            }
        }
    }
}

pub struct DraftManager<S> {
    inner: Arc<Inner<S>>,
    debounce: Duration,
    pending: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl<S: DraftStore + 'static> DraftManager<S> {
    pub fn new(store: S, workspace_id: impl Into<String>) -> Self {
        Self::build(store, workspace_id.into(), None, DraftState::Unsaved)
    }

    /// Continues a session whose draft already exists in the store.
    pub fn resume(store: S, workspace_id: impl Into<String>, draft_id: impl Into<String>) -> Self {
        Self::build(store, workspace_id.into(), Some(draft_id.into()), DraftState::Saved)
    }

    fn build(store: S, workspace_id: String, draft_id: Option<String>, state: DraftState) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                workspace_id,
                session: Mutex::new(Session {
                    draft_id,
                    state,
                    saved_at: None,
                }),
                generation: AtomicU64::new(0),
            }),
            debounce: DEFAULT_DEBOUNCE,
            pending: std::sync::Mutex::new(None),
        }
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub async fn state(&self) -> DraftState {
        self.inner.session.lock().await.state
    }

    pub async fn draft_id(&self) -> Option<String> {
        self.inner.session.lock().await.draft_id.clone()
    }

    pub async fn saved_at(&self) -> Option<DateTime<Utc>> {
        self.inner.session.lock().await.saved_at
    }

    /// Schedules an autosave after the quiet period. A later edit or a forced
    /// save supersedes it.
    pub fn edit(&self, snapshot: DraftSnapshot) {
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let inner = Arc::clone(&self.inner);
        let debounce = self.debounce;

        let handle = tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            if inner.generation.load(Ordering::SeqCst) != generation {
                return;
            }
            if let Err(e) = inner.save(snapshot, false).await {
                tracing::warn!("⚠️ Autosave failed: {}", e);
            }
        });

        if let Ok(mut pending) = self.pending.lock() {
            *pending = Some(handle);
        }
    }

    /// Saves now, bypassing the debounce and the empty-draft guard.
    pub async fn force_save(&self, snapshot: DraftSnapshot) -> Result<String> {
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        match self.inner.save(snapshot, true).await {
            Ok(Some(id)) => {
                tracing::info!("✅ Draft {} saved", id);
                Ok(id)
            }
            Ok(None) => Err(OutreachError::Execution {
                message: "forced draft save did not run".to_string(),
            }),
            Err(e) => {
                tracing::error!("❌ Draft save failed: {}", e);
                Err(e)
            }
        }
    }

    /// Waits for the most recently scheduled autosave, if any.
    pub async fn flush(&self) {
        let handle = self.pending.lock().ok().and_then(|mut pending| pending.take());
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }

    pub async fn discard(&self) -> Result<()> {
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        let mut session = self.inner.session.lock().await;
        if session.state == DraftState::Discarded {
            return Ok(());
        }
        if let Some(id) = &session.draft_id {
            self.inner.store.discard(&self.inner.workspace_id, id).await?;
            tracing::info!("🗑️ Discarded draft {}", id);
        }
        session.state = DraftState::Discarded;
        Ok(())
    }
}
