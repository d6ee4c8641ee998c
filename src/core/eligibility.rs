//! Connection-degree classification and per-channel fitness.

use crate::domain::model::{ChannelType, Prospect};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionDegreeBucket {
    First,
    SecondOrThird,
    Unknown,
}

type DegreeAccessor = fn(&Prospect) -> Option<String>;

fn structured_degree(p: &Prospect) -> Option<String> {
    p.connection_degree.clone()
}

fn contact_degree(p: &Prospect) -> Option<String> {
    p.contact.as_ref().and_then(|c| c.connection_degree.clone())
}

fn numeric_degree(p: &Prospect) -> Option<String> {
    p.degree.as_ref().map(|d| d.to_string())
}

fn connection_label(p: &Prospect) -> Option<String> {
    p.connection_label.clone()
}

fn connection_degree_label(p: &Prospect) -> Option<String> {
    p.connection_degree_label.clone()
}

fn provider_degree(p: &Prospect) -> Option<String> {
    p.linkedin_connection_degree.clone()
}

/// Alias fields consulted in priority order; the first non-empty value wins.
const DEGREE_ACCESSORS: &[(&str, DegreeAccessor)] = &[
    ("connection_degree", structured_degree),
    ("contact.connection_degree", contact_degree),
    ("degree", numeric_degree),
    ("Connection", connection_label),
    ("Connection Degree", connection_degree_label),
    ("linkedin_connection_degree", provider_degree),
];

struct DegreeRule {
    bucket: ConnectionDegreeBucket,
    exact: &'static [&'static str],
    contains: &'static [&'static str],
}

/// Ordered: the 1st family is tested before the 2nd, the 2nd before the 3rd.
const DEGREE_RULES: &[DegreeRule] = &[
    DegreeRule {
        bucket: ConnectionDegreeBucket::First,
        exact: &["1", "1st", "first", "1st degree", "first_degree", "distance_1"],
        contains: &["1st"],
    },
    DegreeRule {
        bucket: ConnectionDegreeBucket::SecondOrThird,
        exact: &["2", "2nd", "second", "2nd degree", "second_degree", "distance_2"],
        contains: &["2nd"],
    },
    DegreeRule {
        bucket: ConnectionDegreeBucket::SecondOrThird,
        exact: &["3", "3rd", "third", "3rd degree", "3+", "third_degree", "distance_3"],
        contains: &["3rd", "3+"],
    },
];

/// Returns the alias name and raw value of the first populated degree field.
pub fn resolve_degree_signal(prospect: &Prospect) -> Option<(&'static str, String)> {
    DEGREE_ACCESSORS.iter().find_map(|(alias, accessor)| {
        accessor(prospect)
            .filter(|value| !value.trim().is_empty())
            .map(|value| (*alias, value))
    })
}

pub fn bucket_for(raw: Option<&str>) -> ConnectionDegreeBucket {
    let Some(raw) = raw else {
        return ConnectionDegreeBucket::Unknown;
    };
    let text = raw.trim().to_lowercase();

    DEGREE_RULES
        .iter()
        .find(|rule| {
            rule.exact.contains(&text.as_str())
                || rule.contains.iter().any(|needle| text.contains(needle))
        })
        .map(|rule| rule.bucket)
        .unwrap_or(ConnectionDegreeBucket::Unknown)
}

/// Classification of one prospect; `Unknown` is a valid terminal answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProspectEligibility {
    pub prospect_id: String,
    pub bucket: ConnectionDegreeBucket,
    pub has_email: bool,
    pub has_linkedin: bool,
    pub approved: bool,
}

impl ProspectEligibility {
    /// Whether the prospect's data fits `channel`, ignoring approval.
    pub fn fits_channel(&self, channel: ChannelType) -> bool {
        use ConnectionDegreeBucket::*;

        match channel {
            ChannelType::Email => self.has_email,
            // No URL means no LinkedIn channel, whatever the degree text says.
            _ if !self.has_linkedin => false,
            ChannelType::Messenger => self.bucket == First,
            ChannelType::Connector => matches!(self.bucket, SecondOrThird | Unknown),
            ChannelType::OpenInmail => true,
            ChannelType::Multichannel => false,
        }
    }

    pub fn is_eligible_for(&self, channel: ChannelType) -> bool {
        self.approved && self.fits_channel(channel)
    }
}

pub fn classify(prospect: &Prospect) -> ProspectEligibility {
    let signal = resolve_degree_signal(prospect);
    let bucket = bucket_for(signal.as_ref().map(|(_, value)| value.as_str()));

    if let Some((alias, value)) = &signal {
        tracing::trace!("Prospect {} degree '{}' from {} -> {:?}", prospect.id, value, alias, bucket);
    }

    ProspectEligibility {
        prospect_id: prospect.id.clone(),
        bucket,
        has_email: prospect.email().is_some(),
        has_linkedin: prospect.linkedin_url().is_some(),
        approved: prospect.is_approved(),
    }
}

pub fn classify_all(prospects: &[Prospect]) -> Vec<ProspectEligibility> {
    prospects.iter().map(classify).collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DegreeBreakdown {
    pub first: usize,
    pub second_or_third: usize,
    pub unknown: usize,
    pub total: usize,
}

impl DegreeBreakdown {
    /// Counts over approved prospects only.
    pub fn of(population: &[ProspectEligibility]) -> Self {
        population
            .iter()
            .filter(|p| p.approved)
            .fold(Self::default(), |mut acc, p| {
                match p.bucket {
                    ConnectionDegreeBucket::First => acc.first += 1,
                    ConnectionDegreeBucket::SecondOrThird => acc.second_or_third += 1,
                    ConnectionDegreeBucket::Unknown => acc.unknown += 1,
                }
                acc.total += 1;
                acc
            })
    }

    pub fn first_share(&self) -> f64 {
        share(self.first, self.total)
    }

    pub fn second_or_third_share(&self) -> f64 {
        share(self.second_or_third, self.total)
    }

    pub fn unknown_share(&self) -> f64 {
        share(self.unknown, self.total)
    }
}

fn share(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64
    }
}
