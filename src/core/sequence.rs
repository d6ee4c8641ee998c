//! Outreach sequence editing and validation.
//!
//! Step 0 is the initial contact (connection request, direct message, InMail
//! or email body) and never carries a delay. Steps 1..N are follow-ups, each
//! with a positive delay relative to the previous step.

use crate::core::delay::{Delay, DelayUnit, RawDelay, DEFAULT_DELAY};
use crate::domain::model::ChannelType;
use crate::utils::error::ValidationError;
use serde::{Deserialize, Serialize};

pub const MAX_SEQUENCE_STEPS: usize = 15;
pub const CONNECTION_REQUEST_LIMIT: usize = 275;
pub const ALTERNATIVE_MESSAGE_LIMIT: usize = 115;
pub const LINKEDIN_MESSAGE_LIMIT: usize = 8000;
pub const INMAIL_BODY_LIMIT: usize = 1900;
pub const INMAIL_SUBJECT_LIMIT: usize = 200;

/// Character bounds a channel imposes; `None` means unconstrained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelLimits {
    #[serde(default)]
    pub lead: Option<usize>,
    #[serde(default)]
    pub alternative: Option<usize>,
    #[serde(default)]
    pub subject: Option<usize>,
    #[serde(default)]
    pub follow_up: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequencePolicy {
    pub max_steps: usize,
    /// Default delay for follow-up k is `delay_schedule[k - 1]`, the last entry beyond that.
    pub delay_schedule: Vec<Delay>,
    pub connector: ChannelLimits,
    pub messenger: ChannelLimits,
    pub open_inmail: ChannelLimits,
    pub email: ChannelLimits,
}

impl Default for SequencePolicy {
    fn default() -> Self {
        Self {
            max_steps: MAX_SEQUENCE_STEPS,
            delay_schedule: vec![
                Delay::days(3),
                Delay::days(5),
                Delay::new(1, DelayUnit::Weeks),
                Delay::new(2, DelayUnit::Weeks),
                Delay::new(1, DelayUnit::Months),
            ],
            connector: ChannelLimits {
                lead: Some(CONNECTION_REQUEST_LIMIT),
                alternative: Some(ALTERNATIVE_MESSAGE_LIMIT),
                subject: None,
                follow_up: Some(LINKEDIN_MESSAGE_LIMIT),
            },
            messenger: ChannelLimits::default(),
            open_inmail: ChannelLimits {
                lead: Some(INMAIL_BODY_LIMIT),
                alternative: None,
                subject: Some(INMAIL_SUBJECT_LIMIT),
                follow_up: Some(INMAIL_BODY_LIMIT),
            },
            email: ChannelLimits::default(),
        }
    }
}

impl SequencePolicy {
    pub fn limits(&self, channel: ChannelType) -> ChannelLimits {
        match channel {
            ChannelType::Connector => self.connector,
            ChannelType::Messenger => self.messenger,
            ChannelType::OpenInmail => self.open_inmail,
            ChannelType::Email => self.email,
            ChannelType::Multichannel => ChannelLimits::default(),
        }
    }

    pub fn default_delay_for(&self, follow_up_number: usize) -> Delay {
        follow_up_number
            .checked_sub(1)
            .and_then(|i| self.delay_schedule.get(i).or(self.delay_schedule.last()))
            .copied()
            .unwrap_or(DEFAULT_DELAY)
    }
}

fn default_raw_delay() -> RawDelay {
    DEFAULT_DELAY.into()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowUpField {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub text_b: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default = "default_raw_delay")]
    pub delay: RawDelay,
}

impl FollowUpField {
    pub fn new(text: impl Into<String>, delay: impl Into<RawDelay>) -> Self {
        Self {
            text: text.into(),
            text_b: None,
            subject: None,
            delay: delay.into(),
        }
    }
}

/// Operator-edited message fields, as held by the builder and by drafts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceFields {
    #[serde(default)]
    pub ab_testing: bool,
    #[serde(default)]
    pub lead: String,
    #[serde(default)]
    pub lead_b: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub subject_b: Option<String>,
    /// Short LinkedIn-alternative variant used alongside a connection request.
    #[serde(default)]
    pub alternative: Option<String>,
    #[serde(default)]
    pub alternative_b: Option<String>,
    #[serde(default)]
    pub follow_ups: Vec<FollowUpField>,
}

impl SequenceFields {
    pub fn with_lead(lead: impl Into<String>) -> Self {
        Self {
            lead: lead.into(),
            ..Self::default()
        }
    }

    /// True when there is no message text at all.
    pub fn is_empty(&self) -> bool {
        self.lead.trim().is_empty() && self.follow_ups.iter().all(|f| f.text.trim().is_empty())
    }

    pub fn step_count(&self) -> usize {
        1 + self.follow_ups.len()
    }
}

/// Index-addressed editing over step 0 (lead) and steps 1..N (follow-ups).
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceEditor {
    fields: SequenceFields,
    policy: SequencePolicy,
}

impl SequenceEditor {
    pub fn new(fields: SequenceFields, policy: SequencePolicy) -> Self {
        Self { fields, policy }
    }

    pub fn fields(&self) -> &SequenceFields {
        &self.fields
    }

    pub fn into_fields(self) -> SequenceFields {
        self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.step_count()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Appends an empty follow-up with the scheduled default delay. Returns
    /// its index, or `None` at the step cap.
    pub fn add_step(&mut self) -> Option<usize> {
        if self.len() >= self.policy.max_steps {
            tracing::warn!("Sequence already has {} steps, not adding another", self.len());
            return None;
        }
        let follow_up_number = self.fields.follow_ups.len() + 1;
        let delay = self.policy.default_delay_for(follow_up_number);
        self.fields.follow_ups.push(FollowUpField::new(String::new(), delay));
        Some(follow_up_number)
    }

    /// Removes step `index` together with its delay. A no-op when only one
    /// step remains or the index is out of range.
    pub fn remove_step(&mut self, index: usize) -> bool {
        if self.len() <= 1 || index >= self.len() {
            return false;
        }

        if index == 0 {
            // The first follow-up becomes the lead and drops its delay.
            let promoted = self.fields.follow_ups.remove(0);
            self.fields.lead = promoted.text;
            self.fields.lead_b = promoted.text_b;
            if promoted.subject.is_some() {
                self.fields.subject = promoted.subject;
            }
        } else {
            self.fields.follow_ups.remove(index - 1);
        }
        true
    }

    pub fn set_text(&mut self, index: usize, text: impl Into<String>) -> bool {
        match index {
            0 => self.fields.lead = text.into(),
            i => match self.fields.follow_ups.get_mut(i - 1) {
                Some(step) => step.text = text.into(),
                None => return false,
            },
        }
        true
    }

    pub fn set_variant_b(&mut self, index: usize, text: impl Into<String>) -> bool {
        match index {
            0 => self.fields.lead_b = Some(text.into()),
            i => match self.fields.follow_ups.get_mut(i - 1) {
                Some(step) => step.text_b = Some(text.into()),
                None => return false,
            },
        }
        true
    }

    /// Step 0 has no delay slot; `Ok(false)` for it and for unknown indices.
    pub fn set_delay(&mut self, index: usize, delay: Delay) -> Result<bool, ValidationError> {
        if !delay.is_positive() {
            return Err(ValidationError::NonPositiveDelay {
                step: index,
                unit: delay.unit.plural().to_string(),
            });
        }
        match index.checked_sub(1).and_then(|i| self.fields.follow_ups.get_mut(i)) {
            Some(step) => {
                step.delay = delay.into();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn delay(&self, index: usize) -> Option<Delay> {
        index
            .checked_sub(1)
            .and_then(|i| self.fields.follow_ups.get(i))
            .map(|step| Delay::normalize(&step.delay))
    }

    pub fn build(&self, channel: ChannelType) -> Result<CampaignSequence, ValidationError> {
        build_sequence(channel, &self.fields, &self.policy)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    ConnectionRequest,
    DirectMessage,
    InMail,
    Email,
    FollowUp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageStep {
    pub index: usize,
    pub kind: StepKind,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant_b: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_b: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay: Option<Delay>,
}

/// A validated sequence, ready for pre-flight and hand-off.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignSequence {
    pub campaign_type: ChannelType,
    pub ab_testing: bool,
    pub steps: Vec<MessageStep>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alternative_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alternative_message_b: Option<String>,
}

impl CampaignSequence {
    pub fn lead(&self) -> &MessageStep {
        &self.steps[0]
    }

    pub fn follow_ups(&self) -> &[MessageStep] {
        &self.steps[1..]
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

fn lead_label(channel: ChannelType) -> &'static str {
    match channel {
        ChannelType::Connector => "connection request",
        ChannelType::Messenger => "initial message",
        ChannelType::OpenInmail => "InMail message",
        ChannelType::Email => "email body",
        ChannelType::Multichannel => "initial message",
    }
}

fn lead_kind(channel: ChannelType) -> StepKind {
    match channel {
        ChannelType::Connector => StepKind::ConnectionRequest,
        ChannelType::OpenInmail => StepKind::InMail,
        ChannelType::Email => StepKind::Email,
        ChannelType::Messenger | ChannelType::Multichannel => StepKind::DirectMessage,
    }
}

fn check_length(field: &str, text: &str, limit: Option<usize>) -> Result<(), ValidationError> {
    let Some(limit) = limit else {
        return Ok(());
    };
    let actual = text.chars().count();
    if actual > limit {
        return Err(ValidationError::CharacterLimitExceeded {
            field: field.to_string(),
            limit,
            actual,
        });
    }
    Ok(())
}

/// Checks variant A and, when A/B testing is on, variant B under the same rule.
/// Every populated field needs its variant B while A/B testing is on.
fn check_variants(
    channel: ChannelType,
    field: &str,
    a: &str,
    b: Option<&str>,
    ab_testing: bool,
    limit: Option<usize>,
) -> Result<(), ValidationError> {
    check_length(field, a, limit)?;
    if ab_testing {
        let field_b = format!("{} (variant B)", field);
        match b {
            Some(b) => check_length(&field_b, b, limit)?,
            None => {
                return Err(ValidationError::MissingLeadMessage {
                    channel: channel.as_str(),
                    field: field_b,
                })
            }
        }
    }
    Ok(())
}

fn populated(text: Option<&String>) -> Option<String> {
    text.map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

pub fn build_sequence(
    channel: ChannelType,
    fields: &SequenceFields,
    policy: &SequencePolicy,
) -> Result<CampaignSequence, ValidationError> {
    if !channel.is_implemented() {
        return Err(ValidationError::ChannelUnavailable {
            channel: channel.as_str(),
        });
    }

    let limits = policy.limits(channel);
    let ab = fields.ab_testing;
    let label = lead_label(channel);

    let lead = fields.lead.trim();
    if lead.is_empty() {
        return Err(ValidationError::MissingLeadMessage {
            channel: channel.as_str(),
            field: label.to_string(),
        });
    }
    let lead_b = if ab { populated(fields.lead_b.as_ref()) } else { None };
    check_variants(channel, label, lead, lead_b.as_deref(), ab, limits.lead)?;

    let subject = populated(fields.subject.as_ref());
    let subject_b = if ab { populated(fields.subject_b.as_ref()) } else { None };
    if let Some(subject) = &subject {
        check_variants(channel, "subject", subject, subject_b.as_deref(), ab, limits.subject)?;
    }

    let alternative = populated(fields.alternative.as_ref());
    let alternative_b = if ab { populated(fields.alternative_b.as_ref()) } else { None };
    if let Some(alternative) = &alternative {
        check_variants(
            channel,
            "alternative message",
            alternative,
            alternative_b.as_deref(),
            ab,
            limits.alternative,
        )?;
    }

    let mut steps = vec![MessageStep {
        index: 0,
        kind: lead_kind(channel),
        text: lead.to_string(),
        variant_b: lead_b,
        subject,
        subject_b,
        delay: None,
    }];

    // Blank follow-ups are dropped along with their delays.
    for (position, follow_up) in fields.follow_ups.iter().enumerate() {
        let text = follow_up.text.trim();
        if text.is_empty() {
            continue;
        }
        let index = steps.len();
        let field = format!("follow-up {}", position + 1);
        let variant_b = if ab { populated(follow_up.text_b.as_ref()) } else { None };
        check_variants(channel, &field, text, variant_b.as_deref(), ab, limits.follow_up)?;

        let delay = Delay::normalize(&follow_up.delay);
        steps.push(MessageStep {
            index,
            kind: StepKind::FollowUp,
            text: text.to_string(),
            variant_b,
            subject: populated(follow_up.subject.as_ref()),
            subject_b: None,
            delay: Some(delay),
        });
    }

    if steps.len() > policy.max_steps {
        return Err(ValidationError::TooManySteps {
            max: policy.max_steps,
            actual: steps.len(),
        });
    }

    tracing::debug!("Built {} sequence with {} steps", channel, steps.len());

    Ok(CampaignSequence {
        campaign_type: channel,
        ab_testing: ab,
        steps,
        alternative_message: alternative,
        alternative_message_b: alternative_b,
    })
}
