//! Pre-flight gate run immediately before a batch may launch.
//!
//! Every candidate ends up in exactly one of `valid` or `blocked`. Rules are
//! evaluated per prospect in a fixed order and the first match wins.

use crate::core::eligibility::classify;
use crate::domain::model::{
    ChannelType, ContactLookup, ContactRecord, Prospect, SendCounters, SendWindow,
};
use crate::domain::ports::ContactHistoryStore;
use crate::utils::error::{OutreachError, Result};
use chrono::{DateTime, Datelike, Duration, NaiveTime, TimeZone, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockReason {
    AlreadyContacted,
    PendingInvitation,
    DuplicateInBatch,
    NotApproved,
    WrongConnectionDegree,
    PreviouslyFailed,
}

impl BlockReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AlreadyContacted => "already_contacted",
            Self::PendingInvitation => "pending_invitation",
            Self::DuplicateInBatch => "duplicate_in_batch",
            Self::NotApproved => "not_approved",
            Self::WrongConnectionDegree => "wrong_connection_degree",
            Self::PreviouslyFailed => "previously_failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockedProspect {
    pub prospect: Prospect,
    pub reason: BlockReason,
    /// Operator-facing explanation, e.g. the campaign that already holds the prospect.
    pub detail: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreflightSummary {
    pub total: usize,
    pub can_proceed: usize,
    pub blocked: usize,
    pub already_contacted: usize,
    pub pending_invitation: usize,
    pub duplicate_in_batch: usize,
    pub not_approved: usize,
    pub wrong_connection_degree: usize,
    pub previously_failed: usize,
}

impl PreflightSummary {
    fn tally(total: usize, blocked: &[BlockedProspect]) -> Self {
        let mut summary = Self {
            total,
            can_proceed: total - blocked.len(),
            blocked: blocked.len(),
            ..Self::default()
        };
        for entry in blocked {
            let counter = match entry.reason {
                BlockReason::AlreadyContacted => &mut summary.already_contacted,
                BlockReason::PendingInvitation => &mut summary.pending_invitation,
                BlockReason::DuplicateInBatch => &mut summary.duplicate_in_batch,
                BlockReason::NotApproved => &mut summary.not_approved,
                BlockReason::WrongConnectionDegree => &mut summary.wrong_connection_degree,
                BlockReason::PreviouslyFailed => &mut summary.previously_failed,
            };
            *counter += 1;
        }
        summary
    }

    pub fn count(&self, reason: BlockReason) -> usize {
        match reason {
            BlockReason::AlreadyContacted => self.already_contacted,
            BlockReason::PendingInvitation => self.pending_invitation,
            BlockReason::DuplicateInBatch => self.duplicate_in_batch,
            BlockReason::NotApproved => self.not_approved,
            BlockReason::WrongConnectionDegree => self.wrong_connection_degree,
            BlockReason::PreviouslyFailed => self.previously_failed,
        }
    }
}

/// Daily/weekly ceilings for one channel; `None` means no ceiling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimit {
    #[serde(default)]
    pub daily: Option<u32>,
    #[serde(default)]
    pub weekly: Option<u32>,
}

impl RateLimit {
    pub const fn new(daily: Option<u32>, weekly: Option<u32>) -> Self {
        Self { daily, weekly }
    }

    pub fn is_unlimited(&self) -> bool {
        self.daily.is_none() && self.weekly.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateLimitPolicy {
    pub connector: RateLimit,
    pub messenger: RateLimit,
    pub email: RateLimit,
    pub open_inmail: RateLimit,
    pub warning_ratio: f64,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            connector: RateLimit::new(Some(20), Some(100)),
            messenger: RateLimit::new(Some(100), Some(700)),
            email: RateLimit::new(Some(40), None),
            open_inmail: RateLimit::default(),
            warning_ratio: 0.8,
        }
    }
}

impl RateLimitPolicy {
    pub fn limits(&self, channel: ChannelType) -> RateLimit {
        match channel {
            ChannelType::Connector => self.connector,
            ChannelType::Messenger => self.messenger,
            ChannelType::Email => self.email,
            ChannelType::OpenInmail => self.open_inmail,
            ChannelType::Multichannel => RateLimit::default(),
        }
    }
}

/// Counter windows: connector weeks are rolling 7 days, the others start on Monday.
pub fn send_window(channel: ChannelType, now: DateTime<Utc>) -> SendWindow {
    let today = now.date_naive();
    let day_start = Utc.from_utc_datetime(&today.and_time(NaiveTime::MIN));
    let week_start = match channel {
        ChannelType::Connector => now - Duration::days(7),
        _ => {
            let monday = today - Duration::days(i64::from(today.weekday().num_days_from_monday()));
            Utc.from_utc_datetime(&monday.and_time(NaiveTime::MIN))
        }
    };
    SendWindow {
        day_start,
        week_start,
    }
}

/// Advisory only: never blocks a prospect on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitStatus {
    pub channel: ChannelType,
    pub daily_used: u32,
    pub daily_limit: Option<u32>,
    pub weekly_used: u32,
    pub weekly_limit: Option<u32>,
    pub can_send: bool,
    pub batch_fits: bool,
    pub warning: bool,
}

impl RateLimitStatus {
    pub fn evaluate(
        channel: ChannelType,
        counters: SendCounters,
        limits: RateLimit,
        batch_size: usize,
        warning_ratio: f64,
    ) -> Self {
        let batch = u32::try_from(batch_size).unwrap_or(u32::MAX);
        let below = |used: u32, limit: Option<u32>| limit.map_or(true, |l| used < l);
        let fits = |used: u32, limit: Option<u32>| limit.map_or(true, |l| used.saturating_add(batch) <= l);
        let near = |used: u32, limit: Option<u32>| {
            limit.is_some_and(|l| l > 0 && f64::from(used) + 1e-9 >= f64::from(l) * warning_ratio)
        };

        Self {
            channel,
            daily_used: counters.daily,
            daily_limit: limits.daily,
            weekly_used: counters.weekly,
            weekly_limit: limits.weekly,
            can_send: below(counters.daily, limits.daily) && below(counters.weekly, limits.weekly),
            batch_fits: fits(counters.daily, limits.daily) && fits(counters.weekly, limits.weekly),
            warning: near(counters.daily, limits.daily) || near(counters.weekly, limits.weekly),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreflightOutcome {
    pub channel: ChannelType,
    pub valid: Vec<Prospect>,
    pub blocked: Vec<BlockedProspect>,
    pub summary: PreflightSummary,
    #[serde(default)]
    pub rate_limit_status: Option<RateLimitStatus>,
}

impl PreflightOutcome {
    pub fn can_proceed(&self) -> bool {
        !self.valid.is_empty()
    }

    pub fn valid_ids(&self) -> Vec<String> {
        self.valid.iter().map(|p| p.id.clone()).collect()
    }
}

fn slug_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)linkedin\.com/in/([^/?#]+)").expect("slug pattern is valid"))
}

/// Lowercased `/in/<vanity>` slug, or the trimmed lowercased URL when it has none.
pub fn normalize_linkedin_url(url: &str) -> Option<String> {
    let url = url.trim();
    if url.is_empty() {
        return None;
    }
    let normalized = match slug_pattern().captures(url) {
        Some(caps) => caps[1].to_lowercase(),
        None => url.trim_end_matches('/').to_lowercase(),
    };
    Some(normalized)
}

pub fn normalize_email(email: &str) -> Option<String> {
    let email = email.trim();
    (!email.is_empty()).then(|| email.to_lowercase())
}

/// The handle that identifies a prospect on `channel`.
fn channel_handle(prospect: &Prospect, channel: ChannelType) -> Option<String> {
    if channel == ChannelType::Email {
        prospect.email().and_then(normalize_email)
    } else {
        prospect.linkedin_url().and_then(normalize_linkedin_url)
    }
}

pub fn contact_lookup(prospects: &[Prospect]) -> ContactLookup {
    let mut lookup = ContactLookup::default();
    let mut seen = HashSet::new();
    for prospect in prospects {
        if seen.insert(format!("id:{}", prospect.id)) {
            lookup.prospect_ids.push(prospect.id.clone());
        }
        if let Some(slug) = prospect.linkedin_url().and_then(normalize_linkedin_url) {
            if seen.insert(format!("in:{}", slug)) {
                lookup.linkedin_slugs.push(slug);
            }
        }
        if let Some(email) = prospect.email().and_then(normalize_email) {
            if seen.insert(format!("mail:{}", email)) {
                lookup.emails.push(email);
            }
        }
    }
    lookup
}

/// History records indexed by every handle they carry.
struct HistoryIndex<'a> {
    by_id: HashMap<&'a str, Vec<&'a ContactRecord>>,
    by_slug: HashMap<String, Vec<&'a ContactRecord>>,
    by_email: HashMap<String, Vec<&'a ContactRecord>>,
}

impl<'a> HistoryIndex<'a> {
    fn new(records: &'a [ContactRecord], exclude_campaign: Option<&str>) -> Self {
        let mut index = Self {
            by_id: HashMap::new(),
            by_slug: HashMap::new(),
            by_email: HashMap::new(),
        };
        for record in records {
            if exclude_campaign.is_some_and(|name| name == record.campaign_name) {
                continue;
            }
            if let Some(id) = record.prospect_id.as_deref() {
                index.by_id.entry(id).or_default().push(record);
            }
            if let Some(slug) = record.linkedin_url.as_deref().and_then(normalize_linkedin_url) {
                index.by_slug.entry(slug).or_default().push(record);
            }
            if let Some(email) = record.email.as_deref().and_then(normalize_email) {
                index.by_email.entry(email).or_default().push(record);
            }
        }
        index
    }

    /// Records for this prospect whose campaign channel overlaps `channel`.
    fn matching(&self, prospect: &Prospect, channel: ChannelType) -> Vec<&'a ContactRecord> {
        let mut found: Vec<&'a ContactRecord> = Vec::new();
        let mut push = |records: Option<&Vec<&'a ContactRecord>>| {
            for record in records.into_iter().flatten() {
                if !found.iter().any(|seen| std::ptr::eq(*seen, *record)) {
                    found.push(*record);
                }
            }
        };

        push(self.by_id.get(prospect.id.as_str()));
        if let Some(handle) = channel_handle(prospect, channel) {
            if channel == ChannelType::Email {
                push(self.by_email.get(&handle));
            } else {
                push(self.by_slug.get(&handle));
            }
        }

        found.retain(|record| record.campaign_type.overlaps(channel));
        found
    }
}

fn has_usable_email(prospect: &Prospect) -> bool {
    prospect.email().is_some_and(|email| email.contains('@'))
}

fn wrong_degree_detail(channel: ChannelType) -> &'static str {
    match channel {
        ChannelType::Email => "no usable e-mail address",
        ChannelType::Messenger => "messenger campaigns need 1st-degree connections with a LinkedIn URL",
        ChannelType::Connector => "connector campaigns need 2nd/3rd-degree prospects with a LinkedIn URL",
        ChannelType::OpenInmail => "open InMail campaigns need a LinkedIn URL",
        ChannelType::Multichannel => "multichannel campaigns are not available",
    }
}

fn block_reason(
    prospect: &Prospect,
    channel: ChannelType,
    history: &HistoryIndex<'_>,
    batch_keys: &mut HashSet<String>,
) -> Option<(BlockReason, String)> {
    let records = history.matching(prospect, channel);

    if let Some(record) = records.iter().find(|r| {
        r.campaign_status.is_active_or_completed() && !r.status.is_failure()
    }) {
        return Some((
            BlockReason::AlreadyContacted,
            format!("already in campaign '{}' ({:?})", record.campaign_name, record.status),
        ));
    }

    if let Some(record) = records.iter().find(|r| r.status.is_outstanding_invitation()) {
        return Some((
            BlockReason::PendingInvitation,
            format!("invitation outstanding from campaign '{}'", record.campaign_name),
        ));
    }

    // Keys are registered for every prospect, blocked or not, so the first
    // occurrence is the one that is evaluated on its merits.
    let mut keys = vec![format!("id:{}", prospect.id)];
    if let Some(handle) = channel_handle(prospect, channel) {
        keys.push(format!("handle:{}", handle));
    }
    let duplicate = keys.iter().any(|key| batch_keys.contains(key));
    batch_keys.extend(keys);
    if duplicate {
        return Some((
            BlockReason::DuplicateInBatch,
            "appears earlier in this batch".to_string(),
        ));
    }

    if !prospect.is_approved() {
        return Some((
            BlockReason::NotApproved,
            format!("approval status is {:?}", prospect.approval_status),
        ));
    }

    let eligibility = classify(prospect);
    let fits = match channel {
        ChannelType::Email => has_usable_email(prospect),
        _ => eligibility.fits_channel(channel),
    };
    if !fits {
        return Some((
            BlockReason::WrongConnectionDegree,
            wrong_degree_detail(channel).to_string(),
        ));
    }

    if let Some(record) = records.iter().find(|r| r.status.is_failure()) {
        let detail = match &record.error_message {
            Some(message) => format!("failed in campaign '{}': {}", record.campaign_name, message),
            None => format!("failed in campaign '{}'", record.campaign_name),
        };
        return Some((BlockReason::PreviouslyFailed, detail));
    }

    None
}

/// Partitions `prospects` against already-fetched history. Pure.
pub fn evaluate(
    channel: ChannelType,
    prospects: &[Prospect],
    history: &[ContactRecord],
    exclude_campaign: Option<&str>,
) -> PreflightOutcome {
    let index = HistoryIndex::new(history, exclude_campaign);
    let mut batch_keys = HashSet::new();
    let mut valid = Vec::new();
    let mut blocked = Vec::new();

    for prospect in prospects {
        match block_reason(prospect, channel, &index, &mut batch_keys) {
            Some((reason, detail)) => {
                tracing::debug!("Prospect {} blocked: {} ({})", prospect.id, reason.as_str(), detail);
                blocked.push(BlockedProspect {
                    prospect: prospect.clone(),
                    reason,
                    detail,
                });
            }
            None => valid.push(prospect.clone()),
        }
    }

    let summary = PreflightSummary::tally(prospects.len(), &blocked);
    PreflightOutcome {
        channel,
        valid,
        blocked,
        summary,
        rate_limit_status: None,
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PreflightRequest<'a> {
    pub workspace_id: &'a str,
    pub channel: ChannelType,
    pub prospects: &'a [Prospect],
    /// The campaign being launched, whose own records are not prior contact.
    pub campaign_name: Option<&'a str>,
    pub now: DateTime<Utc>,
}

pub struct PreflightValidator<H: ContactHistoryStore> {
    history: H,
    rate_limits: RateLimitPolicy,
}

impl<H: ContactHistoryStore> PreflightValidator<H> {
    pub fn new(history: H, rate_limits: RateLimitPolicy) -> Self {
        Self {
            history,
            rate_limits,
        }
    }

    pub fn rate_limits(&self) -> &RateLimitPolicy {
        &self.rate_limits
    }

    /// Fails as a whole with `PreflightUnavailable` if history cannot be read.
    pub async fn check(&self, request: PreflightRequest<'_>) -> Result<PreflightOutcome> {
        tracing::info!(
            "🔍 Pre-flight: {} prospects for {} campaign",
            request.prospects.len(),
            request.channel
        );

        let lookup = contact_lookup(request.prospects);
        let records = if lookup.is_empty() {
            Vec::new()
        } else {
            self.history
                .find_prior_contacts(request.workspace_id, &lookup)
                .await
                .map_err(unavailable)?
        };

        let mut outcome = evaluate(request.channel, request.prospects, &records, request.campaign_name);

        let limits = self.rate_limits.limits(request.channel);
        if !limits.is_unlimited() {
            let window = send_window(request.channel, request.now);
            let counters = self
                .history
                .send_counters(request.workspace_id, request.channel, &window)
                .await
                .map_err(unavailable)?;
            let status = RateLimitStatus::evaluate(
                request.channel,
                counters,
                limits,
                outcome.valid.len(),
                self.rate_limits.warning_ratio,
            );
            if status.warning || !status.batch_fits {
                tracing::warn!(
                    "⚠️ Rate limit: {}/{:?} today, {}/{:?} this week for {}",
                    status.daily_used,
                    status.daily_limit,
                    status.weekly_used,
                    status.weekly_limit,
                    request.channel
                );
            }
            outcome.rate_limit_status = Some(status);
        }

        tracing::info!(
            "✅ Pre-flight complete: {} can proceed, {} blocked",
            outcome.summary.can_proceed,
            outcome.summary.blocked
        );
        Ok(outcome)
    }
}

fn unavailable(error: OutreachError) -> OutreachError {
    match error {
        OutreachError::PreflightUnavailable { .. } => error,
        other => OutreachError::preflight_unavailable(other.to_string()),
    }
}
