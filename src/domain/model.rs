use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl FromStr for ApprovalStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            other => Err(format!("unknown approval status '{}'", other)),
        }
    }
}

/// A degree signal as it arrives from imports: sometimes `2`, sometimes `"2nd"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DegreeValue {
    Number(u64),
    Text(String),
}

impl fmt::Display for DegreeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// Provider-shaped nested contact block (search results carry their fields here).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProspectContact {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, alias = "linkedinUrl")]
    pub linkedin_url: Option<String>,
    #[serde(default, alias = "connectionDegree")]
    pub connection_degree: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prospect {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, alias = "email_address")]
    pub email: Option<String>,
    #[serde(default, alias = "linkedinUrl", alias = "linkedinProfileUrl")]
    pub linkedin_url: Option<String>,
    #[serde(default, alias = "approvalStatus")]
    pub approval_status: ApprovalStatus,

    // Connection-degree aliases, in the order the classifier consults them.
    #[serde(default, alias = "connectionDegree")]
    pub connection_degree: Option<String>,
    #[serde(default)]
    pub degree: Option<DegreeValue>,
    #[serde(default, rename = "Connection")]
    pub connection_label: Option<String>,
    #[serde(default, rename = "Connection Degree")]
    pub connection_degree_label: Option<String>,
    #[serde(default)]
    pub linkedin_connection_degree: Option<String>,

    #[serde(default)]
    pub contact: Option<ProspectContact>,
}

fn non_blank(value: Option<&String>) -> Option<&str> {
    value.map(|s| s.trim()).filter(|s| !s.is_empty())
}

impl Prospect {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn approved(mut self) -> Self {
        self.approval_status = ApprovalStatus::Approved;
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_linkedin_url(mut self, url: impl Into<String>) -> Self {
        self.linkedin_url = Some(url.into());
        self
    }

    pub fn with_connection_degree(mut self, degree: impl Into<String>) -> Self {
        self.connection_degree = Some(degree.into());
        self
    }

    /// Trimmed e-mail from the top-level field, then the nested contact block.
    pub fn email(&self) -> Option<&str> {
        non_blank(self.email.as_ref())
            .or_else(|| non_blank(self.contact.as_ref().and_then(|c| c.email.as_ref())))
    }

    pub fn linkedin_url(&self) -> Option<&str> {
        non_blank(self.linkedin_url.as_ref())
            .or_else(|| non_blank(self.contact.as_ref().and_then(|c| c.linkedin_url.as_ref())))
    }

    pub fn is_approved(&self) -> bool {
        self.approval_status == ApprovalStatus::Approved
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelType {
    Connector,
    Messenger,
    #[serde(alias = "openInmail")]
    OpenInmail,
    Email,
    Multichannel,
}

impl ChannelType {
    pub const ALL: [ChannelType; 5] = [
        ChannelType::Connector,
        ChannelType::Messenger,
        ChannelType::OpenInmail,
        ChannelType::Email,
        ChannelType::Multichannel,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connector => "connector",
            Self::Messenger => "messenger",
            Self::OpenInmail => "open_inmail",
            Self::Email => "email",
            Self::Multichannel => "multichannel",
        }
    }

    pub fn is_linkedin(&self) -> bool {
        matches!(self, Self::Connector | Self::Messenger | Self::OpenInmail)
    }

    /// Multi-channel outreach is a permanent "not implemented" option.
    pub fn is_implemented(&self) -> bool {
        !matches!(self, Self::Multichannel)
    }

    /// Whether a contact made through `other` counts as contact through `self`.
    pub fn overlaps(&self, other: ChannelType) -> bool {
        if *self == Self::Multichannel || other == Self::Multichannel {
            return true;
        }
        self.is_linkedin() == other.is_linkedin()
    }
}

impl fmt::Display for ChannelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChannelType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
            // Upstream approval screens still send the legacy "linkedin" label.
            "connector" | "linkedin" => Ok(Self::Connector),
            "messenger" => Ok(Self::Messenger),
            "open_inmail" | "openinmail" => Ok(Self::OpenInmail),
            "email" => Ok(Self::Email),
            "multichannel" | "multi_channel" => Ok(Self::Multichannel),
            other => Err(format!("unknown campaign type '{}'", other)),
        }
    }
}

/// Which outbound accounts the workspace has connected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountConnections {
    #[serde(default, alias = "linkedinConnected")]
    pub linkedin: bool,
    #[serde(default, alias = "emailConnected")]
    pub email: bool,
}

impl AccountConnections {
    pub fn supports(&self, channel: ChannelType) -> bool {
        match channel {
            ChannelType::Email => self.email,
            ChannelType::Multichannel => self.linkedin && self.email,
            _ => self.linkedin,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignStatus {
    Draft,
    Active,
    Paused,
    Completed,
    Archived,
}

impl CampaignStatus {
    pub fn is_active_or_completed(&self) -> bool {
        matches!(self, Self::Active | Self::Completed)
    }
}

/// Outcome of a prior contact attempt as recorded by the history store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactStatus {
    Pending,
    ConnectionRequestSent,
    AlreadyInvited,
    Connected,
    Contacted,
    Messaging,
    Replied,
    Completed,
    Failed,
    Bounced,
}

impl ContactStatus {
    pub fn is_outstanding_invitation(&self) -> bool {
        matches!(self, Self::AlreadyInvited | Self::ConnectionRequestSent)
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed | Self::Bounced)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactRecord {
    #[serde(default)]
    pub prospect_id: Option<String>,
    #[serde(default)]
    pub linkedin_url: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    pub campaign_name: String,
    pub campaign_type: ChannelType,
    pub campaign_status: CampaignStatus,
    pub status: ContactStatus,
    #[serde(default)]
    pub error_message: Option<String>,
}

/// Normalised handles sent to the history store in one round trip.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactLookup {
    pub prospect_ids: Vec<String>,
    pub linkedin_slugs: Vec<String>,
    pub emails: Vec<String>,
}

impl ContactLookup {
    pub fn is_empty(&self) -> bool {
        self.prospect_ids.is_empty() && self.linkedin_slugs.is_empty() && self.emails.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendWindow {
    pub day_start: DateTime<Utc>,
    pub week_start: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendCounters {
    pub daily: u32,
    pub weekly: u32,
}
